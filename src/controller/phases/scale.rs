use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{info, warn};

use crate::controller::child_resources::{deployment_replicas, HOSTPROXY_REPLICAS};
use crate::controller::conditions::{ConditionStatus, AVAILABLE, REASON_RESIZING};
use crate::error::{Error, Result};

use super::{Context, Exit, Outcome, Pass, Phase, Step};

const EXITS: &[Exit] = &[Exit {
    guard: "replicas resized",
    outcome: Outcome::RequeueNow,
}];

/// ConvergeScale: pin the Deployment to [`HOSTPROXY_REPLICAS`].  After a
/// resize the pass is requeued so the next one observes the corrected
/// Deployment before declaring steady state.
pub struct ConvergeScale;

#[async_trait]
impl Phase for ConvergeScale {
    fn name(&self) -> &'static str {
        "ConvergeScale"
    }

    fn exits(&self) -> &'static [Exit] {
        EXITS
    }

    async fn run(&self, pass: &mut Pass, ctx: &Context) -> Result<Step> {
        let Some(mut deployment) = pass.deployment.take() else {
            return Err(Error::reconcile(format!(
                "no Deployment found for {} before scale check",
                pass.key
            )));
        };

        let current = deployment_replicas(&deployment);
        if current == Some(HOSTPROXY_REPLICAS) {
            pass.deployment = Some(deployment);
            return Ok(Step::Continue);
        }

        let name = pass.hostproxy.name_any();
        info!(%name, from = ?current, to = HOSTPROXY_REPLICAS, "scaling deployment");
        deployment.spec.get_or_insert_with(Default::default).replicas = Some(HOSTPROXY_REPLICAS);

        match ctx.store.update_deployment(&deployment).await {
            Ok(updated) => {
                pass.deployment = Some(updated);
                Ok(Step::Finish(Outcome::RequeueNow))
            }
            Err(e) => {
                warn!(%name, %e, "failed to update Deployment");
                pass.refresh(ctx).await?;
                pass.write_condition(
                    ctx,
                    AVAILABLE,
                    ConditionStatus::False,
                    REASON_RESIZING,
                    format!("Failed to update the size for the custom resource ({name}): ({e})"),
                )
                .await?;
                Err(e)
            }
        }
    }
}
