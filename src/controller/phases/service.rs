use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{info, warn};

use crate::controller::child_resources::service_for;
use crate::controller::conditions::{ConditionStatus, AVAILABLE, REASON_RECONCILING};
use crate::controller::pipeline::CREATE_REQUEUE;
use crate::error::Result;
use crate::notify::EventSeverity;

use super::{Context, Exit, Outcome, Pass, Phase, Step};

const EXITS: &[Exit] = &[Exit {
    guard: "service created",
    outcome: Outcome::RequeueAfter(CREATE_REQUEUE),
}];

/// ConvergeService: create the headless Service.  Only reached once the
/// Deployment exists.
pub struct ConvergeService;

#[async_trait]
impl Phase for ConvergeService {
    fn name(&self) -> &'static str {
        "ConvergeService"
    }

    fn exits(&self) -> &'static [Exit] {
        EXITS
    }

    async fn run(&self, pass: &mut Pass, ctx: &Context) -> Result<Step> {
        match ctx.store.get_service(&pass.key).await {
            Ok(Some(_)) => return Ok(Step::Continue),
            Ok(None) => {}
            Err(e) => {
                warn!(key = %pass.key, %e, "failed to get Service");
                return Err(e);
            }
        }

        let name = pass.hostproxy.name_any();
        let created = match service_for(&pass.hostproxy, &ctx.config) {
            Ok(svc) => {
                info!(ns = %pass.key.namespace, %name, "creating a new Service");
                ctx.store.create_service(&svc).await
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
                        format!("Created Service {name}"),
                    )
                    .await;
                Ok(Step::Finish(Outcome::RequeueAfter(CREATE_REQUEUE)))
            }
            Err(e) => {
                warn!(%name, %e, "failed to create Service for Hostproxy");
                pass.write_condition(
                    ctx,
                    AVAILABLE,
                    ConditionStatus::False,
                    REASON_RECONCILING,
                    format!("Failed to create Service for the custom resource ({name}): ({e})"),
                )
                .await?;
                Err(e)
            }
        }
    }
}
