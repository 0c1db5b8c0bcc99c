use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Extension, http::StatusCode, Json};
use serde::Serialize;

use crate::kernel::BaseControlPlane;

/// Dependencies of the health endpoint
#[derive(Clone)]
pub struct HealthState {
    pub control_plane: Arc<dyn BaseControlPlane>,
    pub job_name: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    control_plane: ControlPlaneHealth,
}

#[derive(Serialize)]
pub struct ControlPlaneHealth {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Probes the control plane with a one-run listing of the period job.
/// Returns 200 OK when it answers within 5s, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<HealthState>,
) -> (StatusCode, Json<HealthResponse>) {
    let control_plane = match tokio::time::timeout(
        Duration::from_secs(5),
        state.control_plane.list_recent_runs(&state.job_name, 1),
    )
    .await
    {
        Ok(Ok(_)) => ControlPlaneHealth {
            status: "ok".to_string(),
            error: None,
        },
        Ok(Err(e)) => ControlPlaneHealth {
            status: "error".to_string(),
            error: Some(format!("Listing runs failed: {}", e)),
        },
        Err(_) => ControlPlaneHealth {
            status: "error".to_string(),
            error: Some("Control plane timeout (>5s)".to_string()),
        },
    };

    let is_healthy = control_plane.status == "ok";
    let (status_code, overall_status) = if is_healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(HealthResponse {
            status: overall_status.to_string(),
            control_plane,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::backfill::models::RunStatus;
    use crate::kernel::TestDependencies;

    #[tokio::test]
    async fn test_healthy_when_listing_succeeds() {
        let test = TestDependencies::new()
            .with_control_plane(|cp| cp.spawning_runs(RunStatus::Queued, None));
        let state = HealthState {
            control_plane: test.control_plane.clone(),
            job_name: test.settings.job_name.clone(),
        };

        let (status, Json(body)) = health_handler(Extension(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "healthy");
        assert_eq!(test.control_plane.list_calls(), 1);
    }
}
