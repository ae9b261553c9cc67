//! hostproxy-operator: Kubernetes operator for Hostproxy resources.
//!
//! Runs the Hostproxy controller and the health probe server as concurrent
//! tokio tasks within a single binary.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use kube::runtime::events::Reporter;
use kube::Client;
use tracing::{info, warn};
use warp::Filter;

use hostproxy_operator::controller::hostproxy::{self, Context};
use hostproxy_operator::helpers::{OperatorConfig, IMAGE_ENV_VAR};
use hostproxy_operator::notify::KubeEventNotifier;
use hostproxy_operator::store::KubeStore;

#[derive(Parser, Debug)]
#[command(
    name = "hostproxy-operator",
    about = "Kubernetes operator exposing cluster services on host ports"
)]
struct Args {
    /// Container image of the proxy deployed for every Hostproxy.
    #[arg(long, env = "HOSTPROXY_IMAGE")]
    hostproxy_image: Option<String>,

    /// Seconds to wait before retrying a failed reconcile.
    #[arg(long, default_value = "30", env = "ERROR_REQUEUE_SECS")]
    error_requeue_secs: u64,

    /// Bind address for health probe endpoints (/healthz, /readyz).
    #[arg(long, default_value = ":8081", env = "HEALTH_PROBE_BIND_ADDRESS")]
    health_probe_bind_address: String,

    /// Log format: "text" for human-readable, "json" for structured.
    #[arg(long, default_value = "text", env = "LOG_FORMAT")]
    log_format: String,
}

/// Parse a probe bind address, accepting the `:8081` shorthand.
fn parse_bind_address(raw: &str) -> anyhow::Result<SocketAddr> {
    raw.strip_prefix(':')
        .map(|port| format!("0.0.0.0:{port}"))
        .unwrap_or_else(|| raw.to_string())
        .parse()
        .with_context(|| format!("invalid --health-probe-bind-address {raw:?}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,kube=warn,hyper=warn,tower=warn,warp=warn".into());

    if args.log_format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = OperatorConfig {
        hostproxy_image: args.hostproxy_image,
        error_requeue: Duration::from_secs(args.error_requeue_secs),
    };
    if config.hostproxy_image.is_none() {
        warn!("{IMAGE_ENV_VAR} is not set; no Hostproxy can be reconciled until it is");
    }

    let health_addr = parse_bind_address(&args.health_probe_bind_address)?;
    let client = Client::try_default().await?;

    info!(
        image = config.hostproxy_image.as_deref().unwrap_or_default(),
        %health_addr,
        "starting hostproxy-operator"
    );

    let reporter = Reporter {
        controller: "hostproxy-operator".into(),
        instance: std::env::var("POD_NAME").ok(),
    };
    let ctx = Arc::new(Context::new(
        Arc::new(KubeStore::new(client.clone())),
        Arc::new(KubeEventNotifier::new(client.clone(), reporter)),
        config,
    ));

    let healthz = warp::get()
        .and(warp::path("healthz"))
        .and(warp::path::end())
        .map(|| warp::reply::with_status("ok", warp::http::StatusCode::OK));
    let readyz = warp::get()
        .and(warp::path("readyz"))
        .and(warp::path::end())
        .map(|| warp::reply::with_status("ok", warp::http::StatusCode::OK));
    let health_routes = healthz.or(readyz);

    tokio::select! {
        _ = hostproxy::run(client, ctx) => {},
        _ = warp::serve(health_routes).run(health_addr) => {},
    }

    Ok(())
}
