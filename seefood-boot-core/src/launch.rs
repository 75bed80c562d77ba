//! Process launcher.
//!
//! The last step of the sequence hands the process over to the API server.
//! On Unix this is a true `exec`: the server keeps the bootstrap's PID, so
//! the container's signal delivery (SIGTERM on stop) reaches the server
//! directly with no shell or supervisor in between, and the bootstrap's
//! exit status *is* the server's.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::{Error, Result};

/// Fully resolved server invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl LaunchSpec {
    /// Build the server command line from configuration.
    ///
    /// The database URL and bind address are injected into the child
    /// environment; the server reads them the same way this tool does.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut parts = config.server.command.iter();
        let program = parts
            .next()
            .cloned()
            .ok_or_else(|| Error::Config("server.command is empty".to_string()))?;
        let args = parts.cloned().collect();

        let env = vec![
            ("DATABASE_URL".to_string(), config.database.url.clone()),
            (
                "SEEFOOD_SERVER_HOST".to_string(),
                config.server.host.clone(),
            ),
            (
                "SEEFOOD_SERVER_PORT".to_string(),
                config.server.port.to_string(),
            ),
        ];

        Ok(Self { program, args, env })
    }

    fn command(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }
        cmd
    }
}

/// Locate `program` the way the shell would.
///
/// A name containing a path separator is checked as-is; a bare name is
/// searched on `PATH`.
pub fn resolve_program(program: &str) -> Option<PathBuf> {
    let as_path = Path::new(program);
    if as_path.components().count() > 1 {
        return as_path.is_file().then(|| as_path.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Replace this process with the server.
///
/// Returns only on failure; on success the server owns the PID from here on.
#[cfg(unix)]
pub fn exec(spec: &LaunchSpec) -> std::io::Error {
    use std::os::unix::process::CommandExt;
    spec.command().exec()
}

/// Without `exec`, run the server as a child and forward its exit status.
#[cfg(not(unix))]
pub fn exec(spec: &LaunchSpec) -> std::io::Error {
    match spec.command().status() {
        Ok(status) => std::process::exit(status.code().unwrap_or(1)),
        Err(e) => e,
    }
}
