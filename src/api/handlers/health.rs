/*
 * Responsibility
 * - GET /health (疎通用)
 * - dispatcher を通る最小の action
 */
use async_trait::async_trait;
use serde_json::json;

use crate::dispatch::{Action, ActionOutput, DispatchError};
use crate::http::context::RequestContext;
use crate::routing::RouteArgs;

pub struct Health;

#[async_trait]
impl Action for Health {
    async fn call(
        &self,
        _ctx: &mut RequestContext,
        _args: &RouteArgs,
    ) -> Result<ActionOutput, DispatchError> {
        Ok(json!({ "status": "ok" }).into())
    }
}
