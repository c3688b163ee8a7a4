//! End-to-end App Engine deployment.
//!
//! `validate deliverables → (resolve manifest → merge env → rewrite) →
//! ensure SDK → authenticate → deploy → parse → describe → parse → outputs`
//!
//! A rewritten manifest is restored on every exit path, including failures.

use crate::command::{
    DeployOptions, build_deploy_command, build_describe_command, command_string,
};
use crate::executor::{CommandExecutor, ExecOptions, ExecOutput, RealExecutor};
use crate::gcloud::GcloudError;
use crate::response::{
    DeployedVersion, DescribeResponse, ResponseError, extract_target_url,
    parse_deploy_response, parse_deploy_response_tolerant, parse_describe_response,
};
use crate::toolchain::{CredentialSource, ToolError, ToolManager};
use appship_core::config::{parse_promote, split_deliverables};
use appship_core::manifest::{
    BUILD_ENV_VARIABLES_KEY, ENV_VARIABLES_KEY, ensure_deliverables_exist, find_manifest,
};
use appship_core::{
    AppshipConfig, EnvVarBlock, ErrorKind, Manifest, ManifestGuard, OutputFormat, ParseMode,
    ReleaseChannel, envvars, flags,
};
use indexmap::IndexMap;
use std::path::PathBuf;

/// Environment variable gcloud reads to attribute usage to a client.
pub const GCLOUD_METRICS_ENV_VAR: &str = "CLOUDSDK_METRICS_ENVIRONMENT";
pub const GCLOUD_METRICS_LABEL: &str = "appship-deploy-appengine";

/// Fully validated inputs for one deployment.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub working_dir: PathBuf,
    pub deliverables: Vec<String>,
    pub project_id: Option<String>,
    /// Used when neither `project_id` nor the credentials name a project.
    pub fallback_project_id: Option<String>,
    pub image_url: Option<String>,
    pub version: Option<String>,
    pub promote: bool,
    pub flags: Vec<String>,
    pub env_vars: EnvVarBlock,
    pub build_env_vars: EnvVarBlock,
    pub channel: ReleaseChannel,
    pub gcloud_version: String,
    pub credentials: Option<CredentialSource>,
    pub output_format: OutputFormat,
    pub parse_mode: ParseMode,
}

impl DeployRequest {
    /// Validate raw configuration into a request rooted at `working_dir`.
    pub fn from_config(
        config: &AppshipConfig,
        working_dir: impl Into<PathBuf>,
    ) -> appship_core::Result<Self> {
        let deploy = &config.deploy;
        let gcloud = &config.gcloud;

        Ok(Self {
            working_dir: working_dir.into(),
            deliverables: split_deliverables(&deploy.deliverables.join(" ")),
            project_id: non_empty(deploy.project_id.as_deref()),
            fallback_project_id: None,
            image_url: non_empty(deploy.image_url.as_deref()),
            version: non_empty(deploy.version.as_deref()),
            promote: parse_promote(deploy.promote.as_deref()),
            flags: flags::tokenize(raw_input(&deploy.flags)),
            env_vars: envvars::parse_pairs(raw_input(&deploy.env_vars))?,
            build_env_vars: envvars::parse_pairs(raw_input(&deploy.build_env_vars))?,
            channel: ReleaseChannel::parse(raw_input(&gcloud.component))?,
            gcloud_version: gcloud.version.clone(),
            credentials: gcloud.credentials_file.clone().map(CredentialSource::KeyFile),
            output_format: deploy.output_format,
            parse_mode: deploy.parse_mode,
        })
    }

    fn has_env_overrides(&self) -> bool {
        !self.env_vars.is_empty() || !self.build_env_vars.is_empty()
    }
}

/// Unset text inputs read as empty.
fn raw_input(value: &Option<String>) -> &str {
    match value {
        Some(v) => v.as_str(),
        None => "",
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Named outputs handed back to the caller, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployOutputs(IndexMap<String, String>);

impl DeployOutputs {
    pub fn from_describe(described: &DescribeResponse) -> Self {
        let mut outputs = Self::default();
        outputs.set("name", &described.name);
        outputs.set("runtime", &described.runtime);
        outputs.set("service_account_email", &described.service_account_email);
        outputs.set("serving_status", &described.serving_status);
        outputs.set("version_id", &described.version_id);
        outputs.set("version_url", &described.version_url);
        outputs.set_legacy(&described.service_account_email, &described.version_url);
        outputs
    }

    pub fn from_version(version: &DeployedVersion) -> Self {
        let mut outputs = Self::default();
        outputs.set("name", &version.name);
        outputs.set("service_account_email", &version.service_account_email);
        outputs.set("version_url", &version.version_url);
        outputs.set_legacy(&version.service_account_email, &version.version_url);
        outputs
    }

    pub fn from_url(url: &str) -> Self {
        let mut outputs = Self::default();
        outputs.set("url", url);
        outputs
    }

    // Aliases kept for callers written against older releases.
    fn set_legacy(&mut self, service_account_email: &str, version_url: &str) {
        self.set("serviceAccountEmail", service_account_email);
        self.set("versionURL", version_url);
        self.set("url", version_url);
    }

    fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_owned(), value.to_owned());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Input(#[from] appship_core::Error),

    #[error("failed to prepare the gcloud SDK")]
    Tool { source: ToolError },

    #[error("Error authenticating the Cloud SDK.")]
    NotAuthenticated,

    #[error(transparent)]
    Execution(#[from] GcloudError),

    #[error(transparent)]
    Response(#[from] ResponseError),
}

impl DeployError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Input(e) => e.kind(),
            Self::Tool { source } => match source {
                ToolError::InstallUnsupported { .. } | ToolError::CredentialsRead { .. } => {
                    ErrorKind::NotFound
                }
                ToolError::CredentialsParse { .. } | ToolError::VersionProbe { .. } => {
                    ErrorKind::Parse
                }
                ToolError::Command { .. } | ToolError::CredentialsStage { .. } => {
                    ErrorKind::Execution
                }
            },
            Self::NotAuthenticated | Self::Execution(_) => ErrorKind::Execution,
            Self::Response(e) if e.is_missing_data() => ErrorKind::MissingData,
            Self::Response(_) => ErrorKind::Parse,
        }
    }
}

/// Runs deployments through a [`ToolManager`] and a [`CommandExecutor`].
pub struct Deployer<T: ToolManager, E: CommandExecutor = RealExecutor> {
    tool: T,
    executor: E,
}

impl<T: ToolManager> Deployer<T, RealExecutor> {
    pub fn new(tool: T) -> Self {
        Self::with_executor(tool, RealExecutor)
    }
}

impl<T: ToolManager, E: CommandExecutor> Deployer<T, E> {
    pub fn with_executor(tool: T, executor: E) -> Self {
        Self { tool, executor }
    }

    pub async fn deploy(&self, request: &DeployRequest) -> Result<DeployOutputs, DeployError> {
        ensure_deliverables_exist(&request.working_dir, &request.deliverables)?;

        let guard = self.apply_env_overrides(request).await?;
        let result = self.run(request).await;

        let Some(guard) = guard else {
            return result;
        };

        match (result, guard.restore()) {
            (Ok(outputs), Ok(())) => Ok(outputs),
            (Ok(_), Err(restore)) => Err(restore.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore)) => {
                tracing::error!(error = %restore, "failed to restore manifest after failed deploy");
                Err(e)
            }
        }
    }

    /// Write env overrides into the service manifest. Nothing is touched when
    /// no overrides were requested.
    async fn apply_env_overrides(
        &self,
        request: &DeployRequest,
    ) -> Result<Option<ManifestGuard>, DeployError> {
        if !request.has_env_overrides() {
            return Ok(None);
        }

        let candidates: Vec<PathBuf> = request
            .deliverables
            .iter()
            .map(|d| request.working_dir.join(d))
            .collect();
        let path = find_manifest(&candidates).await?;

        let mut manifest = Manifest::load(&path)?;
        manifest.merge_env_block(ENV_VARIABLES_KEY, &request.env_vars);
        manifest.merge_env_block(BUILD_ENV_VARIABLES_KEY, &request.build_env_vars);

        Ok(Some(manifest.rewrite()?))
    }

    async fn run(&self, request: &DeployRequest) -> Result<DeployOutputs, DeployError> {
        self.ensure_sdk(request).await?;
        self.authenticate(request).await?;
        let project_id = self.resolve_project_id(request)?;

        let deploy_args = build_deploy_command(&DeployOptions {
            channel: request.channel,
            deliverables: request.deliverables.clone(),
            project_id,
            image_url: request.image_url.clone(),
            version: request.version.clone(),
            promote: request.promote,
            json_output: request.output_format == OutputFormat::Json,
            flags: request.flags.clone(),
        });
        let deployed = self.exec(request, &deploy_args).await?;

        if request.output_format == OutputFormat::Text {
            let combined = format!("{}{}", deployed.stdout, deployed.stderr);
            return Ok(match extract_target_url(&combined) {
                Some(url) => DeployOutputs::from_url(&url),
                None => {
                    tracing::warn!("could not find the deployed URL in gcloud output");
                    DeployOutputs::default()
                }
            });
        }

        match request.parse_mode {
            ParseMode::Tolerant => match parse_deploy_response_tolerant(&deployed.stdout)? {
                Some(version) => Ok(DeployOutputs::from_version(&version)),
                None => {
                    tracing::warn!("deploy reported no version details (was it promoted?)");
                    Ok(DeployOutputs::default())
                }
            },
            ParseMode::Mandatory => {
                let response = parse_deploy_response(&deployed.stdout)?;
                tracing::info!(
                    project = %response.project,
                    service = %response.service,
                    version = %response.version_id,
                    "deployed version"
                );

                let describe_args = build_describe_command(&response, request.channel);
                let described = self.exec(request, &describe_args).await?;
                let description = parse_describe_response(&described.stdout)?;
                Ok(DeployOutputs::from_describe(&description))
            }
        }
    }

    async fn ensure_sdk(&self, request: &DeployRequest) -> Result<(), DeployError> {
        let requested = request.gcloud_version.trim();
        let version = if requested.is_empty() || requested == "latest" {
            self.tool
                .resolve_latest_version()
                .await
                .map_err(|e| DeployError::Tool { source: e })?
        } else {
            requested.to_owned()
        };

        if !self.tool.is_installed(&version).await {
            tracing::info!(version = %version, "installing gcloud SDK");
            let handle = self
                .tool
                .install(&version)
                .await
                .map_err(|e| DeployError::Tool { source: e })?;
            tracing::debug!(version = %handle.version, command = %handle.command, "gcloud SDK installed");
        }

        if let Some(component) = request.channel.prefix() {
            self.tool
                .install_component(component)
                .await
                .map_err(|e| DeployError::Tool { source: e })?;
        }

        Ok(())
    }

    async fn authenticate(&self, request: &DeployRequest) -> Result<(), DeployError> {
        if let Some(credentials) = &request.credentials {
            if matches!(credentials, CredentialSource::KeyJson(_)) {
                tracing::warn!(
                    "inline credentials are deprecated; prefer workload identity federation \
                     or a key file"
                );
            }
            self.tool
                .authenticate(credentials)
                .await
                .map_err(|e| DeployError::Tool { source: e })?;
        }

        if !self.tool.is_authenticated().await {
            return Err(DeployError::NotAuthenticated);
        }
        Ok(())
    }

    fn resolve_project_id(&self, request: &DeployRequest) -> Result<Option<String>, DeployError> {
        if let Some(project_id) = &request.project_id {
            return Ok(Some(project_id.clone()));
        }

        if let Some(credentials) = &request.credentials {
            let from_key = credentials
                .project_id()
                .map_err(|e| DeployError::Tool { source: e })?;
            if from_key.is_some() {
                tracing::info!("using project ID from service account key");
                return Ok(from_key);
            }
        }

        if request.fallback_project_id.is_some() {
            tracing::info!("using project ID from GCLOUD_PROJECT");
        }
        Ok(request.fallback_project_id.clone())
    }

    async fn exec(&self, request: &DeployRequest, args: &[String]) -> Result<ExecOutput, DeployError> {
        let program = self.tool.invocation_command();
        let command = command_string(&program, args);
        tracing::info!("Running: {command}");

        let options = ExecOptions {
            cwd: Some(request.working_dir.clone()),
            envs: vec![(
                GCLOUD_METRICS_ENV_VAR.to_owned(),
                GCLOUD_METRICS_LABEL.to_owned(),
            )],
        };

        let output = self.executor.exec(&program, args, &options).await?;
        Ok(output.check(&command)?)
    }
}
