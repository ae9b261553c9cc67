use async_trait::async_trait;
use kube::ResourceExt;

use crate::controller::child_resources::HOSTPROXY_REPLICAS;
use crate::controller::conditions::{ConditionStatus, AVAILABLE, REASON_RECONCILING};
use crate::error::Result;

use super::{Context, Exit, Outcome, Pass, Phase, Step};

const EXITS: &[Exit] = &[Exit {
    guard: "converged",
    outcome: Outcome::Done,
}];

/// SteadyState: everything is in place.  Reports `Available=True`; the status
/// write is skipped when the condition is already recorded.
pub struct SteadyState;

#[async_trait]
impl Phase for SteadyState {
    fn name(&self) -> &'static str {
        "SteadyState"
    }

    fn exits(&self) -> &'static [Exit] {
        EXITS
    }

    async fn run(&self, pass: &mut Pass, ctx: &Context) -> Result<Step> {
        let name = pass.hostproxy.name_any();
        pass.write_condition(
            ctx,
            AVAILABLE,
            ConditionStatus::True,
            REASON_RECONCILING,
            format!(
                "Deployment for custom resource ({name}) with {HOSTPROXY_REPLICAS} replicas created successfully"
            ),
        )
        .await?;
        Ok(Step::Finish(Outcome::Done))
    }
}
