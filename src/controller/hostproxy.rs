//! Hostproxy controller: the main reconciler.
//!
//! Wires the kube-rs `Controller` (Hostproxies plus the Deployments and
//! Services they own), fetches the Hostproxy by key on every notification
//! and hands it to the pipeline in `super::pipeline`.

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
use kube::{
    api::Api,
    runtime::{
        controller::{Action, Controller},
        watcher::Config as WatcherConfig,
    },
    Client,
};
use tracing::{debug, info, warn};

use crate::crd::hostproxy::Hostproxy;
use crate::error::{Error, Result};
use crate::helpers::OperatorConfig;
use crate::notify::EventNotifier;
use crate::store::{ObjectKey, ObjectStore};

use super::pipeline::{run_pipeline, Outcome, Pass};

// ── Shared context passed to every reconcile call ─────────────────────────────

pub struct Context {
    pub store: Arc<dyn ObjectStore>,
    pub events: Arc<dyn EventNotifier>,
    pub config: OperatorConfig,
}

impl Context {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        events: Arc<dyn EventNotifier>,
        config: OperatorConfig,
    ) -> Self {
        Self {
            store,
            events,
            config,
        }
    }
}

// ── Controller entry point ────────────────────────────────────────────────────

/// Start the Hostproxy controller. Returns a future that runs forever.
pub async fn run(client: Client, ctx: Arc<Context>) {
    let hostproxies: Api<Hostproxy> = Api::all(client.clone());
    let deployments: Api<Deployment> = Api::all(client.clone());
    let services: Api<Service> = Api::all(client);

    Controller::new(hostproxies, WatcherConfig::default())
        .owns(deployments, WatcherConfig::default())
        .owns(services, WatcherConfig::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, action)) => debug!(%obj, ?action, "reconciled"),
                Err(e) => warn!("reconcile failed: {e}"),
            }
        })
        .await;
}

// ── Reconcile ─────────────────────────────────────────────────────────────────

async fn reconcile(hostproxy: Arc<Hostproxy>, ctx: Arc<Context>) -> Result<Action> {
    let key = ObjectKey::of(hostproxy.as_ref());
    reconcile_key(&key, &ctx).await.map(Action::from)
}

fn error_policy(hostproxy: Arc<Hostproxy>, error: &Error, ctx: Arc<Context>) -> Action {
    let key = ObjectKey::of(hostproxy.as_ref());
    // A re-fetch mid-pass can find the object already gone; the deletion
    // itself will not produce another event worth waiting for.
    if error.is_not_found() {
        debug!(%key, "object already deleted, skipping requeue");
        return Action::await_change();
    }
    let delay = ctx.config.error_requeue;
    warn!(%key, %error, requeue_secs = delay.as_secs(), "reconcile error, requeuing");
    Action::requeue(delay)
}

/// Run one reconcile pass for the Hostproxy identified by `key`.
///
/// A Hostproxy that no longer exists is not an error: it was deleted and
/// needs nothing further, so the pass finishes with [`Outcome::Done`].
pub async fn reconcile_key(key: &ObjectKey, ctx: &Context) -> Result<Outcome> {
    debug!(%key, "reconciling Hostproxy");

    let hostproxy = match ctx.store.get_hostproxy(key).await {
        Ok(Some(hostproxy)) => hostproxy,
        Ok(None) => {
            info!(%key, "hostproxy resource not found, ignoring since object must be deleted");
            return Ok(Outcome::Done);
        }
        Err(e) => {
            warn!(%key, %e, "failed to get hostproxy");
            return Err(e);
        }
    };

    let mut pass = Pass::new(key.clone(), hostproxy);
    run_pipeline(&mut pass, ctx).await
}
