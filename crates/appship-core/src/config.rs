use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the optional config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "appship.toml";

/// appship.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppshipConfig {
    #[serde(default)]
    pub deploy: DeployConfig,
    #[serde(default)]
    pub gcloud: GcloudConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// GCP project ID (falls back to the credentials key, then GCLOUD_PROJECT)
    #[serde(default)]
    pub project_id: Option<String>,
    /// Files passed to `gcloud app deploy`, relative to the working directory
    #[serde(default = "default_deliverables")]
    pub deliverables: Vec<String>,
    /// Prebuilt container image to deploy instead of building from source
    #[serde(default)]
    pub image_url: Option<String>,
    /// Version ID; gcloud generates one when unset
    #[serde(default)]
    pub version: Option<String>,
    /// Raw promote input; see [`parse_promote`]
    #[serde(default)]
    pub promote: Option<String>,
    /// Extra flags appended verbatim after the canonical ones
    #[serde(default)]
    pub flags: Option<String>,
    /// Runtime environment overrides as KEY=VALUE pairs
    #[serde(default)]
    pub env_vars: Option<String>,
    /// Build environment overrides as KEY=VALUE pairs
    #[serde(default)]
    pub build_env_vars: Option<String>,
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default)]
    pub parse_mode: ParseMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GcloudConfig {
    /// SDK version to require, or "latest"
    #[serde(default = "default_gcloud_version")]
    pub version: String,
    /// Command group channel ("alpha" or "beta"); empty for GA
    #[serde(default)]
    pub component: Option<String>,
    /// Path to a service account key file
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            deliverables: default_deliverables(),
            image_url: None,
            version: None,
            promote: None,
            flags: None,
            env_vars: None,
            build_env_vars: None,
            output_format: OutputFormat::default(),
            parse_mode: ParseMode::default(),
        }
    }
}

impl Default for GcloudConfig {
    fn default() -> Self {
        Self {
            version: default_gcloud_version(),
            component: None,
            credentials_file: None,
        }
    }
}

impl AppshipConfig {
    /// Load from appship.toml in the given directory, or return defaults if not found.
    pub fn load(dir: &Path) -> crate::Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            Ok(Self::default())
        }
    }
}

/// How gcloud is asked to report the deployment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `--format json`, followed by a describe call.
    #[default]
    Json,
    /// Human-readable output; only the target URL is scraped.
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown output format {other:?} (expected json or text)")),
        }
    }
}

/// Tolerance of the deploy response parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseMode {
    /// `versions[0]` must be present; its project, service and id drive the
    /// describe call.
    #[default]
    Mandatory,
    /// Only the nested `versions[0].version` object is read, and its absence
    /// (e.g. a `--no-promote` deploy) is not an error.
    Tolerant,
}

impl FromStr for ParseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mandatory" => Ok(Self::Mandatory),
            "tolerant" => Ok(Self::Tolerant),
            other => Err(format!(
                "unknown parse mode {other:?} (expected mandatory or tolerant)"
            )),
        }
    }
}

/// gcloud command group channel. GA commands have no prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReleaseChannel {
    #[default]
    Ga,
    Alpha,
    Beta,
}

impl ReleaseChannel {
    /// Parse the `component` input. Empty means GA.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        match raw.trim() {
            "" => Ok(Self::Ga),
            "alpha" => Ok(Self::Alpha),
            "beta" => Ok(Self::Beta),
            other => Err(crate::Error::InvalidChannel(other.to_owned())),
        }
    }

    /// Leading gcloud token, also the name of the component to install.
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Ga => None,
            Self::Alpha => Some("alpha"),
            Self::Beta => Some("beta"),
        }
    }
}

/// Interpret the raw `promote` input.
///
/// `true`/`false` are matched case-insensitively. Empty input, and anything
/// that is not a boolean, promotes.
pub fn parse_promote(raw: Option<&str>) -> bool {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return true;
    };

    match raw.to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        _ => {
            tracing::warn!(promote = raw, "promote is not a boolean, defaulting to true");
            true
        }
    }
}

/// Split the whitespace-separated deliverables input, defaulting to
/// `app.yaml` when empty.
pub fn split_deliverables(raw: &str) -> Vec<String> {
    let deliverables: Vec<String> = raw.split_whitespace().map(str::to_owned).collect();
    if deliverables.is_empty() {
        default_deliverables()
    } else {
        deliverables
    }
}

fn default_deliverables() -> Vec<String> {
    vec!["app.yaml".to_owned()]
}

fn default_gcloud_version() -> String {
    "latest".to_owned()
}
