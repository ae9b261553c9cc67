use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{info, warn};

use crate::controller::helpers::{add_finalizer, has_finalizer, FINALIZER};
use crate::error::Result;

use super::{Context, Exit, Outcome, Pass, Phase, Step};

const EXITS: &[Exit] = &[Exit {
    guard: "finalizer refused",
    outcome: Outcome::RequeueNow,
}];

/// AttachFinalizer: make sure deletion of the Hostproxy waits for us.
///
/// Skipped for a Hostproxy that is already terminating; the API server
/// refuses new finalizers on such objects and `DeletionCheck` handles it.
pub struct AttachFinalizer;

#[async_trait]
impl Phase for AttachFinalizer {
    fn name(&self) -> &'static str {
        "AttachFinalizer"
    }

    fn exits(&self) -> &'static [Exit] {
        EXITS
    }

    async fn run(&self, pass: &mut Pass, ctx: &Context) -> Result<Step> {
        if pass.hostproxy.is_marked_for_deletion() || has_finalizer(&pass.hostproxy, FINALIZER) {
            return Ok(Step::Continue);
        }

        let name = pass.hostproxy.name_any();
        info!(%name, "adding finalizer for Hostproxy");
        if !add_finalizer(&mut pass.hostproxy, FINALIZER) {
            warn!(%name, "failed to add finalizer into the custom resource");
            return Ok(Step::Finish(Outcome::RequeueNow));
        }

        match ctx.store.update_hostproxy(&pass.hostproxy).await {
            Ok(updated) => {
                pass.hostproxy = updated;
                Ok(Step::Continue)
            }
            Err(e) => {
                warn!(%name, %e, "failed to update custom resource to add finalizer");
                Err(e)
            }
        }
    }
}
