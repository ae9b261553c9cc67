use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{info, warn};

use crate::controller::child_resources::deployment_for;
use crate::controller::conditions::{ConditionStatus, AVAILABLE, REASON_RECONCILING};
use crate::controller::pipeline::CREATE_REQUEUE;
use crate::error::Result;
use crate::notify::EventSeverity;

use super::{Context, Exit, Outcome, Pass, Phase, Step};

const EXITS: &[Exit] = &[Exit {
    guard: "deployment created",
    outcome: Outcome::RequeueAfter(CREATE_REQUEUE),
}];

/// ConvergeDeployment: create the proxy Deployment if it does not exist yet.
/// An existing Deployment is handed on to `ConvergeScale`.
pub struct ConvergeDeployment;

#[async_trait]
impl Phase for ConvergeDeployment {
    fn name(&self) -> &'static str {
        "ConvergeDeployment"
    }

    fn exits(&self) -> &'static [Exit] {
        EXITS
    }

    async fn run(&self, pass: &mut Pass, ctx: &Context) -> Result<Step> {
        match ctx.store.get_deployment(&pass.key).await {
            Ok(Some(found)) => {
                pass.deployment = Some(found);
                return Ok(Step::Continue);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key = %pass.key, %e, "failed to get Deployment");
                return Err(e);
            }
        }

        let name = pass.hostproxy.name_any();
        let created = match deployment_for(&pass.hostproxy, &ctx.config) {
            Ok(dep) => {
                info!(ns = %pass.key.namespace, %name, "creating a new Deployment");
                ctx.store.create_deployment(&dep).await
            }
            Err(e) => Err(e),
        };

        match created {
            Ok(_) => {
                ctx.events
                    .record(
                        &pass.hostproxy,
                        EventSeverity::Normal,
                        "Created",
                        format!("Created Deployment {name}"),
                    )
                    .await;
                Ok(Step::Finish(Outcome::RequeueAfter(CREATE_REQUEUE)))
            }
            Err(e) => {
                warn!(%name, %e, "failed to create Deployment for Hostproxy");
                pass.write_condition(
                    ctx,
                    AVAILABLE,
                    ConditionStatus::False,
                    REASON_RECONCILING,
                    format!("Failed to create Deployment for the custom resource ({name}): ({e})"),
                )
                .await?;
                Err(e)
            }
        }
    }
}
