pub mod archive;
pub mod browser;
pub mod cache;
pub mod http;
pub mod installer;
pub mod platform;
pub mod resolver;
pub mod runtime;
pub mod version;
