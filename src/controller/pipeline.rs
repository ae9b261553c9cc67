//! Ordered reconcile pipeline for Hostproxy.
//!
//! A pass walks [`PIPELINE`] front to back.  Each phase (via the [`Phase`]
//! trait) either lets the pass continue or finishes it with an [`Outcome`]
//! for the controller runtime; errors short-circuit the pass and are retried
//! by the runtime's error policy.
//!
//! Phases never sleep or spawn: every delay is expressed as an `Outcome`.
//! Each phase also declares its early exits so the table can be rendered as
//! a diagram (see the `pipeline_diagram` binary).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::controller::Action;
use tracing::{debug, warn};

use crate::crd::hostproxy::Hostproxy;
use crate::error::{Error, Result};
use crate::store::ObjectKey;

use super::conditions::{new_condition, set_condition, ConditionStatus};
use super::hostproxy::Context;
use super::phases::{
    AttachFinalizer, ConvergeDeployment, ConvergeScale, ConvergeService, DeletionCheck,
    InitStatus, SteadyState,
};

/// Delay after creating a dependent, giving the store time to settle.
pub const CREATE_REQUEUE: Duration = Duration::from_secs(60);

// ── Outcomes ────────────────────────────────────────────────────────────────

/// How a pass that did not fail asks to be scheduled next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing left to do until something changes.
    Done,
    /// Run again without deliberate delay.
    RequeueNow,
    /// Run again after the given delay.
    RequeueAfter(Duration),
}

impl From<Outcome> for Action {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Done => Action::await_change(),
            Outcome::RequeueNow => Action::requeue(Duration::ZERO),
            Outcome::RequeueAfter(delay) => Action::requeue(delay),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "done"),
            Self::RequeueNow => write!(f, "requeue"),
            Self::RequeueAfter(delay) => write!(f, "requeue after {}s", delay.as_secs()),
        }
    }
}

/// Result of a single phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Continue,
    Finish(Outcome),
}

/// A documented early exit of a phase: the condition under which it fires
/// and the outcome it finishes the pass with.
#[derive(Clone, Copy, Debug)]
pub struct Exit {
    pub guard: &'static str,
    pub outcome: Outcome,
}

// ── Pass ────────────────────────────────────────────────────────────────────

/// State threaded through one reconcile pass.
///
/// `hostproxy` always holds the latest version this pass has seen: every
/// store write replaces it with the object the store returned.
pub struct Pass {
    pub key: ObjectKey,
    pub hostproxy: Hostproxy,
    /// Deployment found by `ConvergeDeployment`, read by `ConvergeScale`.
    pub deployment: Option<Deployment>,
}

impl Pass {
    pub fn new(key: ObjectKey, hostproxy: Hostproxy) -> Self {
        Self {
            key,
            hostproxy,
            deployment: None,
        }
    }

    /// Re-read the Hostproxy so the next write is based on its latest version.
    pub async fn refresh(&mut self, ctx: &Context) -> Result<()> {
        match ctx.store.get_hostproxy(&self.key).await {
            Ok(Some(latest)) => {
                self.hostproxy = latest;
                Ok(())
            }
            Ok(None) => Err(Error::not_found(format!("hostproxy {}", self.key))),
            Err(e) => {
                warn!(key = %self.key, %e, "failed to re-fetch hostproxy");
                Err(e)
            }
        }
    }

    /// Record a condition and persist the status if it changed.
    pub async fn write_condition(
        &mut self,
        ctx: &Context,
        type_: &str,
        status: ConditionStatus,
        reason: &str,
        message: impl Into<String>,
    ) -> Result<()> {
        let condition = new_condition(
            type_,
            status,
            reason,
            message,
            self.hostproxy.metadata.generation,
        );
        if !set_condition(self.hostproxy.conditions_mut(), condition) {
            return Ok(());
        }
        match ctx.store.update_hostproxy_status(&self.hostproxy).await {
            Ok(updated) => {
                debug!(key = %self.key, %type_, %status, %reason, "status condition updated");
                self.hostproxy = updated;
                Ok(())
            }
            Err(e) => {
                warn!(key = %self.key, %e, "failed to update Hostproxy status");
                Err(e)
            }
        }
    }
}

// ── Phases ──────────────────────────────────────────────────────────────────

/// One named step of the pipeline.  Must be safe to run on every pass.
#[async_trait]
pub trait Phase: Send + Sync {
    fn name(&self) -> &'static str;

    /// Early exits other than errors, for documentation and diagrams.
    fn exits(&self) -> &'static [Exit] {
        &[]
    }

    async fn run(&self, pass: &mut Pass, ctx: &Context) -> Result<Step>;
}

/// The complete pipeline, in execution order.
pub static PIPELINE: &[&dyn Phase] = &[
    &InitStatus,
    &AttachFinalizer,
    &DeletionCheck,
    &ConvergeDeployment,
    &ConvergeService,
    &ConvergeScale,
    &SteadyState,
];

/// Drive `pass` through the pipeline until a phase finishes it.
pub async fn run_pipeline(pass: &mut Pass, ctx: &Context) -> Result<Outcome> {
    for phase in PIPELINE {
        match phase.run(pass, ctx).await? {
            Step::Continue => {}
            Step::Finish(outcome) => {
                debug!(key = %pass.key, phase = phase.name(), %outcome, "pass finished");
                return Ok(outcome);
            }
        }
    }
    Ok(Outcome::Done)
}
