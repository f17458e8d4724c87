use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// cdri - ChromeDriver Release Installer
///
/// Detects the installed Chrome/Chromium, downloads the matching chromedriver
/// build into a per-major-version cache, and prints its location.
///
/// Examples:
///   cdri install        # Download the chromedriver matching the local Chrome
///   cdri path           # Print the cache root directory
#[derive(Parser, Debug)]
#[command(author, version = env!("CDRI_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Cache root directory (overrides the default; also via CDRI_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "CDRI_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub cache_root: Option<PathBuf>,

    /// Release index URL (defaults to the Chrome for Testing milestone index)
    #[arg(long = "index-url", value_name = "URL", global = true)]
    pub index_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Download and cache the matching chromedriver, printing its path
    Install(InstallArgs),

    /// Print the cache root directory
    Path,
}

#[derive(clap::Args, Debug)]
pub struct InstallArgs {
    /// Download over plain http instead of https
    #[arg(long = "no-ssl")]
    pub no_ssl: bool,

    /// Install into the current working directory instead of the cache root
    #[arg(long = "cwd")]
    pub cwd: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = cdri::runtime::RealRuntime;

    match cli.command {
        Commands::Install(args) => {
            let target = if args.cwd {
                use cdri::runtime::Runtime;
                Some(runtime.current_dir()?)
            } else {
                cli.cache_root
            };
            if let Some(driver_path) =
                cdri::installer::install(runtime, target, args.no_ssl, cli.index_url).await?
            {
                println!("{}", driver_path.display());
            }
        }
        Commands::Path => {
            let root = match cli.cache_root {
                Some(path) => path,
                None => cdri::installer::default_cache_root(&runtime)?,
            };
            println!("{}", root.display());
        }
    }
    Ok(())
}
