//! Argument vectors for `gcloud app deploy` and `gcloud app versions describe`.
//!
//! Token order is part of the contract: free-form flags always come last so
//! they override the canonical flags (gcloud keeps the last occurrence).

use crate::response::DeployResponse;
use appship_core::ReleaseChannel;

/// Inputs for `gcloud app deploy`.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub channel: ReleaseChannel,
    pub deliverables: Vec<String>,
    pub project_id: Option<String>,
    pub image_url: Option<String>,
    pub version: Option<String>,
    pub promote: bool,
    /// Request `--format json`.
    pub json_output: bool,
    /// Already tokenized extra flags.
    pub flags: Vec<String>,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            channel: ReleaseChannel::Ga,
            deliverables: vec!["app.yaml".to_owned()],
            project_id: None,
            image_url: None,
            version: None,
            promote: true,
            json_output: true,
            flags: Vec::new(),
        }
    }
}

pub fn build_deploy_command(options: &DeployOptions) -> Vec<String> {
    let mut cmd = base(options.channel, &["app", "deploy"]);
    cmd.push("--quiet".to_owned());

    if options.json_output {
        cmd.extend(["--format".to_owned(), "json".to_owned()]);
    }

    cmd.extend(options.deliverables.iter().cloned());

    push_flag(&mut cmd, "--project", options.project_id.as_deref());
    push_flag(&mut cmd, "--image-url", options.image_url.as_deref());
    push_flag(&mut cmd, "--version", options.version.as_deref());

    cmd.push(if options.promote { "--promote" } else { "--no-promote" }.to_owned());

    cmd.extend(options.flags.iter().cloned());
    cmd
}

/// Describe the version a deploy just created.
pub fn build_describe_command(deployed: &DeployResponse, channel: ReleaseChannel) -> Vec<String> {
    let mut cmd = base(channel, &["app", "versions", "describe"]);
    cmd.extend(
        [
            "--quiet",
            "--format",
            "json",
            "--project",
            deployed.project.as_str(),
            "--service",
            deployed.service.as_str(),
            deployed.version_id.as_str(),
        ]
        .map(str::to_owned),
    );
    cmd
}

/// Display form of an invocation for logs and error messages.
pub fn command_string(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

fn base(channel: ReleaseChannel, subcommand: &[&str]) -> Vec<String> {
    channel
        .prefix()
        .into_iter()
        .chain(subcommand.iter().copied())
        .map(str::to_owned)
        .collect()
}

fn push_flag(cmd: &mut Vec<String>, flag: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        cmd.push(flag.to_owned());
        cmd.push(value.to_owned());
    }
}
