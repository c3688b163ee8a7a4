//! gcloud SDK lifecycle: presence, installation, components, authentication.
//!
//! The deploy flow only needs the [`ToolManager`] capability; [`GcloudSdk`]
//! implements it against an already installed `gcloud` binary.

use crate::command::command_string;
use crate::executor::{CommandExecutor, ExecOptions, RealExecutor};
use crate::gcloud::GcloudError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// An installed gcloud SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolHandle {
    pub version: String,
    /// Program to invoke.
    pub command: String,
}

/// Where service account credentials come from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Path to a JSON key file.
    KeyFile(PathBuf),
    /// JSON key passed inline (deprecated in favor of workload identity).
    KeyJson(SecretString),
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    project_id: Option<String>,
}

impl CredentialSource {
    /// The `project_id` recorded in the service account key, if any.
    pub fn project_id(&self) -> Result<Option<String>, ToolError> {
        let key: ServiceAccountKey = match self {
            Self::KeyFile(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|e| ToolError::CredentialsRead {
                        path: path.clone(),
                        source: e,
                    })?;
                serde_json::from_str(&content)
            }
            Self::KeyJson(json) => serde_json::from_str(json.expose_secret()),
        }
        .map_err(|e| ToolError::CredentialsParse { source: e })?;

        Ok(key.project_id.filter(|id| !id.is_empty()))
    }
}

/// SDK management capability used by the deploy flow.
#[allow(async_fn_in_trait)]
pub trait ToolManager: Send + Sync {
    /// Whether the given SDK version is available.
    async fn is_installed(&self, version: &str) -> bool;

    /// Concrete version to use when "latest" is requested.
    async fn resolve_latest_version(&self) -> Result<String, ToolError>;

    async fn install(&self, version: &str) -> Result<ToolHandle, ToolError>;

    async fn authenticate(&self, credentials: &CredentialSource) -> Result<(), ToolError>;

    async fn is_authenticated(&self) -> bool;

    /// Program used for every gcloud invocation.
    fn invocation_command(&self) -> String;

    /// Install an SDK component such as `alpha` or `beta`.
    async fn install_component(&self, name: &str) -> Result<(), ToolError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(
        "gcloud {version} is not installed and cannot be installed automatically; \
         install: https://cloud.google.com/sdk/docs/install"
    )]
    InstallUnsupported { version: String },

    #[error("gcloud command failed")]
    Command { source: GcloudError },

    #[error("failed to read credentials from {path}")]
    CredentialsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("credentials are not a valid service account key")]
    CredentialsParse { source: serde_json::Error },

    #[error("failed to stage inline credentials")]
    CredentialsStage { source: std::io::Error },

    #[error("unexpected `gcloud version` output")]
    VersionProbe { source: serde_json::Error },
}

/// [`ToolManager`] backed by the `gcloud` found on `PATH` (or an explicit
/// program path), parameterized over the executor for testability.
pub struct GcloudSdk<E: CommandExecutor = RealExecutor> {
    executor: E,
    program: String,
    options: ExecOptions,
}

impl GcloudSdk<RealExecutor> {
    pub fn new() -> Self {
        Self::with_executor(RealExecutor)
    }
}

impl Default for GcloudSdk<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CommandExecutor> GcloudSdk<E> {
    pub fn with_executor(executor: E) -> Self {
        Self {
            executor,
            program: "gcloud".to_owned(),
            options: ExecOptions::default(),
        }
    }

    /// Use a specific gcloud binary instead of the one on `PATH`.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Environment applied to every SDK management command.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.envs.push((key.into(), value.into()));
        self
    }

    async fn run(&self, args: &[String]) -> Result<String, GcloudError> {
        let output = self.executor.exec(&self.program, args, &self.options).await?;
        let output = output.check(&command_string(&self.program, args))?;
        Ok(output.stdout)
    }

    async fn installed_version(&self) -> Result<String, ToolError> {
        let stdout = self
            .run(&args(["version", "--format", "json"]))
            .await
            .map_err(|e| ToolError::Command { source: e })?;

        #[derive(Deserialize)]
        struct VersionInfo {
            #[serde(rename = "Google Cloud SDK")]
            sdk: String,
        }

        let info: VersionInfo =
            serde_json::from_str(&stdout).map_err(|e| ToolError::VersionProbe { source: e })?;
        Ok(info.sdk)
    }

    async fn activate_key_file(&self, path: &Path) -> Result<(), ToolError> {
        let key_file = path.to_string_lossy();
        self.run(&args([
            "auth",
            "activate-service-account",
            "--key-file",
            &key_file,
            "--quiet",
        ]))
        .await
        .map_err(|e| ToolError::Command { source: e })?;
        Ok(())
    }
}

impl<E: CommandExecutor> ToolManager for GcloudSdk<E> {
    async fn is_installed(&self, version: &str) -> bool {
        match self.installed_version().await {
            Ok(installed) => version.is_empty() || version == "latest" || installed == version,
            Err(e) => {
                tracing::debug!(error = %e, "gcloud version probe failed");
                false
            }
        }
    }

    async fn resolve_latest_version(&self) -> Result<String, ToolError> {
        // Without an installer, the latest usable version is the installed one.
        match self.installed_version().await {
            Ok(version) => Ok(version),
            Err(e) => {
                tracing::debug!(error = %e, "gcloud version probe failed");
                Err(ToolError::InstallUnsupported {
                    version: "latest".to_owned(),
                })
            }
        }
    }

    async fn install(&self, version: &str) -> Result<ToolHandle, ToolError> {
        Err(ToolError::InstallUnsupported {
            version: version.to_owned(),
        })
    }

    async fn authenticate(&self, credentials: &CredentialSource) -> Result<(), ToolError> {
        match credentials {
            CredentialSource::KeyFile(path) => self.activate_key_file(path).await,
            CredentialSource::KeyJson(json) => {
                let mut staged = tempfile::NamedTempFile::new()
                    .map_err(|e| ToolError::CredentialsStage { source: e })?;
                staged
                    .write_all(json.expose_secret().as_bytes())
                    .map_err(|e| ToolError::CredentialsStage { source: e })?;
                staged
                    .flush()
                    .map_err(|e| ToolError::CredentialsStage { source: e })?;

                // `staged` is deleted when it goes out of scope.
                self.activate_key_file(staged.path()).await
            }
        }
    }

    async fn is_authenticated(&self) -> bool {
        let listed = self
            .run(&args([
                "auth",
                "list",
                "--filter",
                "status:ACTIVE",
                "--format",
                "value(account)",
            ]))
            .await;

        match listed {
            Ok(accounts) => !accounts.trim().is_empty(),
            Err(e) => {
                tracing::debug!(error = %e, "could not list active gcloud accounts");
                false
            }
        }
    }

    fn invocation_command(&self) -> String {
        self.program.clone()
    }

    async fn install_component(&self, name: &str) -> Result<(), ToolError> {
        self.run(&args(["components", "install", name, "--quiet"]))
            .await
            .map_err(|e| ToolError::Command { source: e })?;
        Ok(())
    }
}

fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}
