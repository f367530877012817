/*
 * Responsibility
 * - page controller の契約: query → template scope へ追加する値
 * - controller 名 → 実体の解決 (ControllerLoader / ControllerRegistry)
 */
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::dispatch::error::DispatchError;
use crate::http::context::RequestContext;

/// Template argument scope.
pub type Scope = Map<String, Value>;

#[async_trait]
pub trait Controller: Send + Sync {
    /// Returns entries to merge into the template scope, or `None` to leave it as is.
    async fn call(
        &self,
        ctx: &mut RequestContext,
        query: &Scope,
    ) -> Result<Option<Scope>, DispatchError>;
}

pub trait ControllerLoader: Send + Sync {
    fn load(&self, name: &str) -> Option<Arc<dyn Controller>>;
}

/// Adapter for controllers that only need the query.
pub struct FnController<F>(F);

pub fn controller_fn<F, Fut>(f: F) -> FnController<F>
where
    F: Fn(Scope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Scope>> + Send + 'static,
{
    FnController(f)
}

#[async_trait]
impl<F, Fut> Controller for FnController<F>
where
    F: Fn(Scope) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<Scope>> + Send + 'static,
{
    async fn call(
        &self,
        _ctx: &mut RequestContext,
        query: &Scope,
    ) -> Result<Option<Scope>, DispatchError> {
        Ok((self.0)(query.clone()).await)
    }
}

#[derive(Clone, Default)]
pub struct ControllerRegistry {
    controllers: HashMap<String, Arc<dyn Controller>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        controller: impl Controller + 'static,
    ) -> &mut Self {
        self.controllers.insert(name.into(), Arc::new(controller));
        self
    }
}

impl ControllerLoader for ControllerRegistry {
    fn load(&self, name: &str) -> Option<Arc<dyn Controller>> {
        self.controllers.get(name).cloned()
    }
}
