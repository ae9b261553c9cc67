use async_trait::async_trait;

use crate::controller::conditions::{ConditionStatus, AVAILABLE, REASON_RECONCILING};
use crate::error::Result;

use super::{Context, Pass, Phase, Step};

/// InitStatus: a Hostproxy seen for the first time gets `Available=Unknown`
/// before anything else happens.
pub struct InitStatus;

#[async_trait]
impl Phase for InitStatus {
    fn name(&self) -> &'static str {
        "InitStatus"
    }

    async fn run(&self, pass: &mut Pass, ctx: &Context) -> Result<Step> {
        if !pass.hostproxy.conditions().is_empty() {
            return Ok(Step::Continue);
        }

        pass.write_condition(
            ctx,
            AVAILABLE,
            ConditionStatus::Unknown,
            REASON_RECONCILING,
            "Starting reconciliation",
        )
        .await?;

        // The status write moved resourceVersion on; later metadata writes
        // must start from the stored copy or they will conflict.
        pass.refresh(ctx).await?;
        Ok(Step::Continue)
    }
}
