//! Trigger one period job on the control plane.

use std::collections::BTreeMap;

use anyhow::Result;
use tracing::info;

use crate::domains::backfill::models::Period;
use crate::kernel::ServerDeps;

/// Input name the period job reads its month from.
pub const PERIOD_PARAM: &str = "period";

pub fn dispatch_params(period: &Period) -> BTreeMap<String, String> {
    BTreeMap::from([(PERIOD_PARAM.to_string(), period.to_string())])
}

/// Fire-and-forget dispatch. `Ok` only means the trigger was accepted; the run
/// still has to be discovered.
pub async fn dispatch_period(period: &Period, deps: &ServerDeps) -> Result<()> {
    let job_name = &deps.settings.job_name;
    info!(period = %period, job = %job_name, "Dispatching period job");

    deps.control_plane
        .dispatch(job_name, &dispatch_params(period))
        .await
}
