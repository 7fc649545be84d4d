use std::{convert::Infallible, time::Duration};

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tokio_util::sync::DropGuard;

use crate::domain::value_objects::op_context::OpContext;

/// Deadline applied to every storage operation started by a request.
#[derive(Debug, Clone, Copy)]
pub struct RequestTimeout(pub Duration);

/// Operation context bound to the lifetime of one request. When the client goes
/// away axum drops the handler future, the guard fires, and any in-flight
/// transaction rolls back instead of committing.
pub struct OperationScope {
    ctx: OpContext,
    _cancel_on_drop: DropGuard,
}

impl OperationScope {
    pub fn ctx(&self) -> &OpContext {
        &self.ctx
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OperationScope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = match parts.extensions.get::<RequestTimeout>() {
            Some(RequestTimeout(timeout)) => OpContext::with_timeout(*timeout),
            None => OpContext::background(),
        };
        let guard = ctx.cancel_on_drop();

        Ok(OperationScope {
            ctx,
            _cancel_on_drop: guard,
        })
    }
}
