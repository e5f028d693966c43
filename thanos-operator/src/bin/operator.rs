//! Thanos Kubernetes Operator binary.
//!
//! Runs one controller each for the Querier, Store and Receiver custom
//! resources, or prints their CRDs with `--generate-crds`.

use clap::Parser;
use kube::{Client, CustomResourceExt};
use std::path::PathBuf;
use std::sync::Arc;
use thanos_operator::controller::{runner, ControllerContext};
use thanos_operator::crd::{Querier, Receiver, Role, Store};
use thanos_operator::OperatorConfig;

/// Kubernetes operator for Thanos components.
#[derive(Parser)]
#[command(name = "thanos-operator")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML file overriding builder defaults and requeue delays
    #[arg(short, long, env = "THANOS_OPERATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Print the CustomResourceDefinitions as YAML and exit
    #[arg(long)]
    generate_crds: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.generate_crds {
        generate_crds()?;
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("thanos_operator=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .init();

    tracing::info!("Starting Thanos Kubernetes Operator");

    let config = match &cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading operator configuration");
            OperatorConfig::load(path)?
        }
        None => OperatorConfig::default(),
    };

    let client = Client::try_default().await?;
    tracing::info!("Connected to Kubernetes cluster");

    let ctx = Arc::new(ControllerContext::from_client(client.clone(), config));

    let querier = runner::run(client.clone(), Role::Querier, ctx.clone());
    let store = runner::run(client.clone(), Role::Store, ctx.clone());
    let receiver = runner::run(client, Role::Receiver, ctx);

    // Each controller returns once shutdown is signalled.
    tokio::select! {
        _ = querier => tracing::info!("Querier controller exited"),
        _ = store => tracing::info!("Store controller exited"),
        _ = receiver => tracing::info!("Receiver controller exited"),
    }

    Ok(())
}

/// Print CRD YAML documents.
fn generate_crds() -> anyhow::Result<()> {
    println!("---");
    println!("{}", serde_yaml::to_string(&Querier::crd())?);
    println!("---");
    println!("{}", serde_yaml::to_string(&Store::crd())?);
    println!("---");
    println!("{}", serde_yaml::to_string(&Receiver::crd())?);
    Ok(())
}
