use appship_cloud::toolchain::CredentialSource;
use appship_cloud::{DeployOutputs, DeployRequest, Deployer, GcloudSdk};
use appship_core::config::split_deliverables;
use appship_core::{AppshipConfig, OutputFormat, ParseMode};
use secrecy::SecretString;
use std::path::PathBuf;

#[derive(clap::Args)]
pub struct DeployArgs {
    /// Directory containing the deliverables (and an optional appship.toml)
    #[arg(long, default_value = ".")]
    working_directory: PathBuf,
    /// Space-separated deliverables, relative to the working directory
    #[arg(long)]
    deliverables: Option<String>,
    /// GCP project ID
    #[arg(long)]
    project_id: Option<String>,
    /// Prebuilt container image to deploy
    #[arg(long)]
    image_url: Option<String>,
    /// Version ID to deploy as
    #[arg(long)]
    version: Option<String>,
    /// Route all traffic to the new version (true/false)
    #[arg(long)]
    promote: Option<String>,
    /// Extra flags passed to `gcloud app deploy`
    #[arg(long, allow_hyphen_values = true)]
    flags: Option<String>,
    /// Runtime environment overrides (KEY=VALUE, comma or newline separated)
    #[arg(long)]
    env_vars: Option<String>,
    /// Build environment overrides (KEY=VALUE, comma or newline separated)
    #[arg(long)]
    build_env_vars: Option<String>,
    /// gcloud SDK version to require, or "latest"
    #[arg(long)]
    gcloud_version: Option<String>,
    /// gcloud command channel (alpha or beta)
    #[arg(long)]
    gcloud_component: Option<String>,
    /// Service account key file
    #[arg(long)]
    credentials_file: Option<PathBuf>,
    /// Service account key JSON (deprecated, prefer --credentials-file)
    #[arg(long, env = "APPSHIP_CREDENTIALS", hide_env_values = true)]
    credentials: Option<String>,
    /// Project used when nothing else names one
    #[arg(long, env = "GCLOUD_PROJECT", hide = true)]
    fallback_project_id: Option<String>,
    /// How gcloud reports the deployment (json or text)
    #[arg(long)]
    output_format: Option<OutputFormat>,
    /// Deploy response parsing (mandatory or tolerant)
    #[arg(long)]
    parse_mode: Option<ParseMode>,
    /// Print outputs as key=value lines or one JSON object
    #[arg(long, value_enum, default_value_t = Emit::Text)]
    emit: Emit,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Emit {
    Text,
    Json,
}

/// Deploy to App Engine and print the resulting outputs.
pub async fn deploy(args: DeployArgs) -> anyhow::Result<()> {
    let mut config = AppshipConfig::load(&args.working_directory)?;
    apply_overrides(&mut config, &args);

    let mut request = DeployRequest::from_config(&config, &args.working_directory)?;
    request.fallback_project_id = args.fallback_project_id.filter(|p| !p.trim().is_empty());
    if request.credentials.is_none() {
        request.credentials = args
            .credentials
            .filter(|c| !c.trim().is_empty())
            .map(|c| CredentialSource::KeyJson(SecretString::from(c)));
    }

    let deployer = Deployer::new(GcloudSdk::new());
    let outputs = deployer.deploy(&request).await?;

    match args.emit {
        Emit::Text => print_lines(&outputs),
        Emit::Json => println!("{}", to_json(&outputs)),
    }

    Ok(())
}

fn apply_overrides(config: &mut AppshipConfig, args: &DeployArgs) {
    let deploy = &mut config.deploy;
    if let Some(deliverables) = &args.deliverables {
        deploy.deliverables = split_deliverables(deliverables);
    }
    override_opt(&mut deploy.project_id, &args.project_id);
    override_opt(&mut deploy.image_url, &args.image_url);
    override_opt(&mut deploy.version, &args.version);
    override_opt(&mut deploy.promote, &args.promote);
    override_opt(&mut deploy.flags, &args.flags);
    override_opt(&mut deploy.env_vars, &args.env_vars);
    override_opt(&mut deploy.build_env_vars, &args.build_env_vars);
    if let Some(format) = args.output_format {
        deploy.output_format = format;
    }
    if let Some(mode) = args.parse_mode {
        deploy.parse_mode = mode;
    }

    let gcloud = &mut config.gcloud;
    if let Some(version) = &args.gcloud_version {
        gcloud.version = version.clone();
    }
    override_opt(&mut gcloud.component, &args.gcloud_component);
    if let Some(path) = &args.credentials_file {
        gcloud.credentials_file = Some(path.clone());
    }
}

fn override_opt(slot: &mut Option<String>, value: &Option<String>) {
    if value.is_some() {
        slot.clone_from(value);
    }
}

fn print_lines(outputs: &DeployOutputs) {
    if outputs.is_empty() {
        eprintln!("Deployed (no outputs reported)");
        return;
    }
    for (key, value) in outputs.iter() {
        println!("{key}={value}");
    }
}

fn to_json(outputs: &DeployOutputs) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = outputs
        .iter()
        .map(|(k, v)| (k.to_owned(), serde_json::Value::String(v.to_owned())))
        .collect();
    serde_json::Value::Object(map)
}
