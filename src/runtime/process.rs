//! Subprocess invocation.

use anyhow::{Result, anyhow};
use std::path::Path;
use std::process::Command;

use super::RealRuntime;

impl RealRuntime {
    #[tracing::instrument(skip(self))]
    pub(crate) fn command_stdout_impl(&self, program: &Path, args: &[String]) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| anyhow!("Failed to run {:?}: {}", program, e))?;

        if !output.status.success() {
            return Err(anyhow!(
                "{:?} exited with {}: {}",
                program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
