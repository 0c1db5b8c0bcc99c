//! Backfill virtual object
//!
//! One instance, keyed `pipeline`. Exclusive handlers serialize every command
//! and wake-up; `status` is a shared read. The stored record and the next
//! wake-up are produced inside a single journaled step, so a replay never
//! re-runs a command against the control plane.

use restate_sdk::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::common::auth::restate_auth::{credential_header, require_operator};
use crate::common::EmptyRequest;
use crate::domains::backfill::actor::{
    ActorOutcome, BackfillActor, BackfillRequest, StartRequest, StatusView,
};
use crate::domains::backfill::errors::OrchestratorError;
use crate::impl_restate_serde;
use crate::kernel::ServerDeps;

/// The only accepted object key.
pub const PIPELINE_KEY: &str = "pipeline";

/// State key of the persisted orchestrator record.
pub const STATE_KEY: &str = "orchestrator_state";

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeRequest {
    pub token: Uuid,
}

impl_restate_serde!(WakeRequest);
impl_restate_serde!(StartRequest);
impl_restate_serde!(StatusView);
impl_restate_serde!(ActorOutcome);

fn terminal(e: OrchestratorError) -> HandlerError {
    TerminalError::new_with_code(e.status_code(), e.to_string()).into()
}

fn ensure_pipeline(key: &str) -> Result<(), HandlerError> {
    if key == PIPELINE_KEY {
        Ok(())
    } else {
        Err(terminal(OrchestratorError::UnknownInstance(key.to_string())))
    }
}

// =============================================================================
// Virtual object definition
// =============================================================================

#[restate_sdk::object]
#[name = "Backfill"]
pub trait BackfillObject {
    async fn start(req: StartRequest) -> Result<StatusView, HandlerError>;
    async fn pause(req: EmptyRequest) -> Result<StatusView, HandlerError>;
    async fn resume(req: EmptyRequest) -> Result<StatusView, HandlerError>;
    async fn retry(req: EmptyRequest) -> Result<StatusView, HandlerError>;
    async fn reset(req: EmptyRequest) -> Result<StatusView, HandlerError>;
    async fn wake(req: WakeRequest) -> Result<StatusView, HandlerError>;

    #[shared]
    async fn status(req: EmptyRequest) -> Result<StatusView, HandlerError>;
}

pub struct BackfillObjectImpl {
    deps: Arc<ServerDeps>,
}

impl BackfillObjectImpl {
    pub fn with_deps(deps: Arc<ServerDeps>) -> Self {
        Self { deps }
    }

    async fn execute(
        &self,
        ctx: ObjectContext<'_>,
        request: BackfillRequest,
    ) -> Result<StatusView, HandlerError> {
        ensure_pipeline(ctx.key())?;

        let command = request.name();
        let credential = credential_header(ctx.headers()).map(str::to_string);
        let stored = ctx.get::<String>(STATE_KEY).await?;
        let actor = BackfillActor::new(self.deps.clone());

        let outcome = ctx
            .run(|| async {
                actor
                    .handle(stored.as_deref(), credential.as_deref(), request.clone())
                    .await
                    .map_err(terminal)
            })
            .await?;

        if let Some(record) = outcome.record {
            ctx.set(STATE_KEY, record);
        }

        if let Some(wake) = outcome.wake {
            tracing::debug!(command, token = %wake.token, after_secs = wake.after.as_secs(), "Scheduling wake");
            ctx.object_client::<BackfillObjectClient>(PIPELINE_KEY)
                .wake(WakeRequest { token: wake.token })
                .send_after(wake.after);
        }

        Ok(outcome.view)
    }
}

impl BackfillObject for BackfillObjectImpl {
    async fn start(
        &self,
        ctx: ObjectContext<'_>,
        req: StartRequest,
    ) -> Result<StatusView, HandlerError> {
        self.execute(ctx, BackfillRequest::Start(req)).await
    }

    async fn pause(
        &self,
        ctx: ObjectContext<'_>,
        _req: EmptyRequest,
    ) -> Result<StatusView, HandlerError> {
        self.execute(ctx, BackfillRequest::Pause).await
    }

    async fn resume(
        &self,
        ctx: ObjectContext<'_>,
        _req: EmptyRequest,
    ) -> Result<StatusView, HandlerError> {
        self.execute(ctx, BackfillRequest::Resume).await
    }

    async fn retry(
        &self,
        ctx: ObjectContext<'_>,
        _req: EmptyRequest,
    ) -> Result<StatusView, HandlerError> {
        self.execute(ctx, BackfillRequest::Retry).await
    }

    async fn reset(
        &self,
        ctx: ObjectContext<'_>,
        _req: EmptyRequest,
    ) -> Result<StatusView, HandlerError> {
        self.execute(ctx, BackfillRequest::Reset).await
    }

    async fn wake(
        &self,
        ctx: ObjectContext<'_>,
        req: WakeRequest,
    ) -> Result<StatusView, HandlerError> {
        self.execute(ctx, BackfillRequest::Wake { token: req.token })
            .await
    }

    async fn status(
        &self,
        ctx: SharedObjectContext<'_>,
        _req: EmptyRequest,
    ) -> Result<StatusView, HandlerError> {
        ensure_pipeline(ctx.key())?;
        let _operator = require_operator(ctx.headers(), &self.deps.credentials)?;

        let stored = ctx.get::<String>(STATE_KEY).await?;
        Ok(BackfillActor::new(self.deps.clone()).view(stored.as_deref()))
    }
}
