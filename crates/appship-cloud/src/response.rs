//! Parsing of gcloud's machine-readable (and legacy human-readable) output.
//!
//! Deploy output has two parsers:
//! [`parse_deploy_response`] requires `versions[0]` because the describe
//! call depends on it, while [`parse_deploy_response_tolerant`] treats a
//! missing nested `version` object (nothing promoted) as "nothing to report".

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;

/// Identifiers of the version created by `gcloud app deploy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResponse {
    pub project: String,
    pub service: String,
    pub version_id: String,
}

/// Details of the nested `versions[0].version` resource in deploy output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeployedVersion {
    /// Full resource name, e.g. `apps/p/services/default/versions/123`.
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "serviceAccount")]
    pub service_account_email: String,
    #[serde(default, rename = "versionUrl")]
    pub version_url: String,
}

/// Output of `gcloud app versions describe`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DescribeResponse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub runtime: String,
    #[serde(default, rename = "serviceAccount")]
    pub service_account_email: String,
    #[serde(default, rename = "servingStatus")]
    pub serving_status: String,
    #[serde(default, rename = "id")]
    pub version_id: String,
    #[serde(default, rename = "versionUrl")]
    pub version_url: String,
}

/// Outer version wrapper in deploy output. The identifiers live here, not in
/// the nested `version` object, which is `null` for unpromoted deploys.
#[derive(Deserialize)]
struct VersionWrapper {
    project: Option<String>,
    service: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Deploy,
    Describe,
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deploy => "deploy",
            Self::Describe => "describe",
        })
    }
}

/// Underlying reason a response could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ResponseFault {
    #[error("empty response")]
    Empty,

    #[error("empty JSON response")]
    EmptyJson,

    #[error("missing or empty \"versions\"")]
    MissingVersions,

    #[error("missing \"{0}\" in versions[0]")]
    MissingField(&'static str),

    #[error("{source}")]
    Syntax { source: serde_json::Error },

    #[error("unexpected response shape: {source}")]
    Shape { source: serde_json::Error },
}

#[derive(Debug, thiserror::Error)]
#[error("failed to parse {kind} response: {fault}, stdout: {stdout}")]
pub struct ResponseError {
    pub kind: ResponseKind,
    #[source]
    pub fault: ResponseFault,
    /// Raw output, kept so failures can be diagnosed without a rerun.
    pub stdout: String,
}

impl ResponseError {
    fn new(kind: ResponseKind, fault: ResponseFault, stdout: &str) -> Self {
        Self {
            kind,
            fault,
            stdout: stdout.to_owned(),
        }
    }

    /// True when the output was well-formed but lacked required data.
    pub fn is_missing_data(&self) -> bool {
        matches!(
            self.fault,
            ResponseFault::Empty
                | ResponseFault::EmptyJson
                | ResponseFault::MissingVersions
                | ResponseFault::MissingField(_)
        )
    }
}

// ── Deploy ──

/// Parse `gcloud app deploy --format json` output, requiring `versions[0]`
/// and its `project`, `service`, and `id`.
pub fn parse_deploy_response(stdout: &str) -> Result<DeployResponse, ResponseError> {
    deploy_identifiers(stdout).map_err(|f| ResponseError::new(ResponseKind::Deploy, f, stdout))
}

fn deploy_identifiers(stdout: &str) -> Result<DeployResponse, ResponseFault> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(ResponseFault::Empty);
    }

    let json: Value =
        serde_json::from_str(trimmed).map_err(|e| ResponseFault::Syntax { source: e })?;

    let first = json
        .get("versions")
        .and_then(|versions| versions.get(0))
        .filter(|version| !version.is_null())
        .ok_or(ResponseFault::MissingVersions)?;

    let wrapper = VersionWrapper::deserialize(first)
        .map_err(|e| ResponseFault::Shape { source: e })?;

    Ok(DeployResponse {
        project: wrapper.project.ok_or(ResponseFault::MissingField("project"))?,
        service: wrapper.service.ok_or(ResponseFault::MissingField("service"))?,
        version_id: wrapper.id.ok_or(ResponseFault::MissingField("id"))?,
    })
}

/// Parse deploy output, returning `None` rather than an error when there is
/// nothing to report: blank output, `{}`, `[]`, or no nested
/// `versions[0].version` object.
pub fn parse_deploy_response_tolerant(
    stdout: &str,
) -> Result<Option<DeployedVersion>, ResponseError> {
    deployed_version(stdout).map_err(|f| ResponseError::new(ResponseKind::Deploy, f, stdout))
}

fn deployed_version(stdout: &str) -> Result<Option<DeployedVersion>, ResponseFault> {
    let trimmed = stdout.trim();
    if is_empty_payload(trimmed) {
        return Ok(None);
    }

    let json: Value =
        serde_json::from_str(trimmed).map_err(|e| ResponseFault::Syntax { source: e })?;

    let Some(version) = json
        .get("versions")
        .and_then(|versions| versions.get(0))
        .and_then(|first| first.get("version"))
        .filter(|version| !version.is_null())
    else {
        return Ok(None);
    };

    DeployedVersion::deserialize(version)
        .map(Some)
        .map_err(|e| ResponseFault::Shape { source: e })
}

// ── Describe ──

/// Parse `gcloud app versions describe --format json` output. Empty output is
/// always an error.
pub fn parse_describe_response(stdout: &str) -> Result<DescribeResponse, ResponseError> {
    describe(stdout).map_err(|f| ResponseError::new(ResponseKind::Describe, f, stdout))
}

fn describe(stdout: &str) -> Result<DescribeResponse, ResponseFault> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(ResponseFault::Empty);
    }

    let json: Value =
        serde_json::from_str(trimmed).map_err(|e| ResponseFault::Syntax { source: e })?;
    if json.is_null() {
        return Err(ResponseFault::EmptyJson);
    }
    if is_empty_container(&json) {
        return Err(ResponseFault::Empty);
    }

    let described =
        DescribeResponse::deserialize(&json).map_err(|e| ResponseFault::Shape { source: e })?;
    if described == DescribeResponse::default() {
        return Err(ResponseFault::Empty);
    }
    Ok(described)
}

fn is_empty_container(json: &Value) -> bool {
    json.as_object().is_some_and(|o| o.is_empty()) || json.as_array().is_some_and(|a| a.is_empty())
}

fn is_empty_payload(trimmed: &str) -> bool {
    matches!(trimmed, "" | "{}" | "[]")
}

// ── Legacy text output ──

static TARGET_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"target url:\s+\[(.*?)\]").expect("target url pattern is valid")
});

/// Extract the deployed URL from human-readable deploy output.
///
/// gcloud prints one `target url: [...]` line per service; when there are
/// several, the second one is the tagged service URL and is preferred.
pub fn extract_target_url(output: &str) -> Option<String> {
    let urls: Vec<&str> = TARGET_URL
        .captures_iter(output)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect();

    urls.get(1).or_else(|| urls.first()).map(|url| (*url).to_owned())
}
