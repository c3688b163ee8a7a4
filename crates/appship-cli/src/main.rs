mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "appship", about = "Deploy App Engine applications with gcloud")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the deliverables in a working directory to App Engine
    Deploy(commands::DeployArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the deploy outputs; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                // arch-lint: allow(no-silent-result-drop) reason="an unset or invalid RUST_LOG falls back to the info level"
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Deploy(args) => commands::deploy(args).await?,
    }

    Ok(())
}
