/*
 * Responsibility
 * - route に束縛される action の契約 (Action trait)
 * - action の戻り値 → ActionOutput (false / Response / 文字列 / その他)
 * - action 名 → 実体の解決 (ActionRegistry)
 */
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::dispatch::error::DispatchError;
use crate::http::context::RequestContext;
use crate::http::response::Response;
use crate::routing::RouteArgs;

/// What an action hands back to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutput {
    /// The action signalled failure; rendered through the error route (404).
    NotFound,
    /// Passed through unchanged, status included.
    Response(Response),
    Html(String),
    Json(Value),
}

impl From<bool> for ActionOutput {
    fn from(value: bool) -> Self {
        if value {
            ActionOutput::Json(Value::Bool(true))
        } else {
            ActionOutput::NotFound
        }
    }
}

impl From<String> for ActionOutput {
    fn from(value: String) -> Self {
        ActionOutput::Html(value)
    }
}

impl From<&str> for ActionOutput {
    fn from(value: &str) -> Self {
        ActionOutput::Html(value.to_string())
    }
}

impl From<Response> for ActionOutput {
    fn from(value: Response) -> Self {
        ActionOutput::Response(value)
    }
}

impl From<Value> for ActionOutput {
    fn from(value: Value) -> Self {
        ActionOutput::Json(value)
    }
}

impl<T: Into<ActionOutput>> From<Option<T>> for ActionOutput {
    fn from(value: Option<T>) -> Self {
        value.map_or(ActionOutput::NotFound, Into::into)
    }
}

#[async_trait]
pub trait Action: Send + Sync {
    async fn call(
        &self,
        ctx: &mut RequestContext,
        args: &RouteArgs,
    ) -> Result<ActionOutput, DispatchError>;
}

/// Adapter for actions that only need the route arguments.
pub struct FnAction<F>(F);

pub fn action_fn<F, Fut, O>(f: F) -> FnAction<F>
where
    F: Fn(RouteArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: Into<ActionOutput> + 'static,
{
    FnAction(f)
}

#[async_trait]
impl<F, Fut, O> Action for FnAction<F>
where
    F: Fn(RouteArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: Into<ActionOutput> + 'static,
{
    async fn call(
        &self,
        _ctx: &mut RequestContext,
        args: &RouteArgs,
    ) -> Result<ActionOutput, DispatchError> {
        Ok((self.0)(args.clone()).await.into())
    }
}

#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, action: impl Action + 'static) -> &mut Self {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Action>, DispatchError> {
        self.actions
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::UnresolvedAction(name.to_string()))
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.actions.keys().collect();
        names.sort();
        f.debug_struct("ActionRegistry").field("actions", &names).finish()
    }
}
