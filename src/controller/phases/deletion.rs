use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{info, warn};

use crate::controller::conditions::{ConditionStatus, DEGRADED, REASON_FINALIZING};
use crate::controller::helpers::{has_finalizer, remove_finalizer, FINALIZER};
use crate::crd::hostproxy::Hostproxy;
use crate::error::Result;
use crate::notify::EventSeverity;

use super::{Context, Exit, Outcome, Pass, Phase, Step};

const EXITS: &[Exit] = &[
    Exit {
        guard: "terminating && !finalizer",
        outcome: Outcome::Done,
    },
    Exit {
        guard: "finalizer refused",
        outcome: Outcome::RequeueNow,
    },
    Exit {
        guard: "finalizer removed",
        outcome: Outcome::Done,
    },
];

/// DeletionCheck: once deletion is requested, run the finalizer and release
/// the Hostproxy.  Always finishes the pass for a terminating Hostproxy, so
/// no dependent is created or touched past this point.
pub struct DeletionCheck;

#[async_trait]
impl Phase for DeletionCheck {
    fn name(&self) -> &'static str {
        "DeletionCheck"
    }

    fn exits(&self) -> &'static [Exit] {
        EXITS
    }

    async fn run(&self, pass: &mut Pass, ctx: &Context) -> Result<Step> {
        if !pass.hostproxy.is_marked_for_deletion() {
            return Ok(Step::Continue);
        }
        if !has_finalizer(&pass.hostproxy, FINALIZER) {
            return Ok(Step::Finish(Outcome::Done));
        }

        let name = pass.hostproxy.name_any();
        info!(%name, "performing finalizer operations for Hostproxy before delete CR");

        pass.write_condition(
            ctx,
            DEGRADED,
            ConditionStatus::Unknown,
            REASON_FINALIZING,
            format!("Performing finalizer operations for the custom resource: {name}"),
        )
        .await?;

        finalize(&pass.hostproxy, ctx).await;

        pass.refresh(ctx).await?;
        pass.write_condition(
            ctx,
            DEGRADED,
            ConditionStatus::True,
            REASON_FINALIZING,
            format!("Finalizer operations for custom resource {name} name were successfully accomplished"),
        )
        .await?;

        info!(%name, "removing finalizer for Hostproxy after successfully performing the operations");
        if !remove_finalizer(&mut pass.hostproxy, FINALIZER) {
            warn!(%name, "failed to remove finalizer for Hostproxy");
            return Ok(Step::Finish(Outcome::RequeueNow));
        }
        match ctx.store.update_hostproxy(&pass.hostproxy).await {
            Ok(updated) => {
                pass.hostproxy = updated;
                Ok(Step::Finish(Outcome::Done))
            }
            Err(e) => {
                warn!(%name, %e, "failed to remove finalizer for Hostproxy");
                Err(e)
            }
        }
    }
}

/// Work that must happen before the Hostproxy may disappear.
///
/// Dependents are owner-referenced and go with it through the garbage
/// collector, so for now this only announces the deletion.
async fn finalize(hostproxy: &Hostproxy, ctx: &Context) {
    let name = hostproxy.name_any();
    let ns = hostproxy.namespace().unwrap_or_default();
    ctx.events
        .record(
            hostproxy,
            EventSeverity::Warning,
            "Deleting",
            format!("Custom Resource {name} is being deleted from the namespace {ns}"),
        )
        .await;
}
