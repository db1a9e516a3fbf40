//! Raw app logs from the external orchestration CLI.
//!
//! The fetcher is a pass-through: it runs the configured command and hands
//! back whatever the tool printed, or the tool's failure, unchanged.

use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::config::LogsConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {output}", exit_status(.code))]
    Exit {
        program: String,
        code: Option<i32>,
        /// Combined stdout and stderr of the failed run.
        output: String,
    },
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Fetches the raw log text of an app.
pub trait LogFetcher: Send + Sync {
    fn fetch_logs(&self, app: &str) -> Result<String, FetchError>;
}

/// Runs an external command, `flynn -a {app} log` by default.
#[derive(Debug, Clone)]
pub struct CommandLogFetcher {
    program: String,
    args: Vec<String>,
}

impl CommandLogFetcher {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &LogsConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }

    fn command(&self, app: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args.iter().map(|arg| arg.replace("{app}", app)));
        cmd
    }
}

impl Default for CommandLogFetcher {
    fn default() -> Self {
        Self::from_config(&LogsConfig::default())
    }
}

impl LogFetcher for CommandLogFetcher {
    fn fetch_logs(&self, app: &str) -> Result<String, FetchError> {
        let mut cmd = self.command(app);
        debug!("Running: {:?}", cmd);

        let output = cmd.output().map_err(|source| FetchError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // stdout first, then stderr.
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(FetchError::Exit {
                program: self.program.clone(),
                code: output.status.code(),
                output: combined,
            });
        }
        Ok(combined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandLogFetcher {
        CommandLogFetcher::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn substitutes_app_into_args() {
        let fetcher = CommandLogFetcher::new("echo", vec!["-n".into(), "logs of {app}".into()]);
        assert_eq!(fetcher.fetch_logs("app1").unwrap(), "logs of app1");
    }

    #[test]
    fn combines_stdout_and_stderr() {
        let out = sh("echo out; echo err 1>&2").fetch_logs("app1").unwrap();
        assert_eq!(out, "out\nerr\n");
    }

    #[test]
    fn nonzero_exit_passes_output_through() {
        let err = sh("echo 'app not found' 1>&2; exit 3")
            .fetch_logs("app1")
            .unwrap_err();
        match err {
            FetchError::Exit { code, output, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(output, "app not found\n");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let fetcher = CommandLogFetcher::new("/nonexistent/orchestrator", Vec::new());
        assert!(matches!(
            fetcher.fetch_logs("app1"),
            Err(FetchError::Spawn { .. })
        ));
    }

    #[test]
    fn default_runs_flynn() {
        let fetcher = CommandLogFetcher::default();
        let cmd = fetcher.command("app1");
        assert_eq!(cmd.get_program(), "flynn");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["-a", "app1", "log"]);
    }
}
