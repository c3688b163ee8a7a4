use crate::gcloud::GcloudError;
use std::path::PathBuf;

/// Per-invocation process settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOptions {
    /// Directory the process runs in; inherits ours when `None`.
    pub cwd: Option<PathBuf>,
    /// Extra environment variables for the child process.
    pub envs: Vec<(String, String)>,
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    /// Successful output carrying only `stdout`.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and `stderr`.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Turn a non-zero exit into [`GcloudError::CommandFailed`].
    ///
    /// `command` is the display form of the invocation, used in the message.
    /// When the process wrote nothing to stderr the exit code is reported
    /// instead.
    pub fn check(self, command: &str) -> Result<Self, GcloudError> {
        if self.exit_code == 0 {
            return Ok(self);
        }

        let message = if self.stderr.trim().is_empty() {
            format!(
                "command exited {}, but stderr had no output",
                self.exit_code
            )
        } else {
            self.stderr.trim().to_owned()
        };

        Err(GcloudError::CommandFailed {
            command: command.to_owned(),
            message,
        })
    }
}

/// Abstraction over process execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait CommandExecutor: Send + Sync {
    /// Run `program` with `args` to completion, capturing both output streams.
    ///
    /// A non-zero exit is not an error here; callers decide via
    /// [`ExecOutput::check`].
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> Result<ExecOutput, GcloudError>;
}

/// Real process executor.
pub struct RealExecutor;

impl CommandExecutor for RealExecutor {
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> Result<ExecOutput, GcloudError> {
        use std::process::Stdio;

        let mut command = tokio::process::Command::new(program);
        command
            .args(args)
            .envs(options.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(cwd) = &options.cwd {
            command.current_dir(cwd);
        }

        let output = command
            .output()
            .await
            .map_err(|e| GcloudError::NotFound {
                program: program.to_owned(),
                source: e,
            })?;

        let stdout =
            String::from_utf8(output.stdout).map_err(|e| GcloudError::InvalidUtf8 { source: e })?;
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let exit_code = output
            .status
            .code()
            // arch-lint: allow(no-silent-result-drop) reason="a process killed by a signal has no exit code; -1 stands in for it"
            .unwrap_or(-1);

        Ok(ExecOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}
