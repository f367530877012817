/*
 * Responsibility
 * - route の登録 (index route の自動登録を含む)
 * - path → Route の解決 → firewall → template / action の実行
 * - 実行結果を Response (content + content type + status) に正規化
 * - 見つからない場合は error route で 404 を生成 (例外にはしない)
 */
use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::dispatch::action::{ActionOutput, ActionRegistry};
use crate::dispatch::controller::{ControllerLoader, Scope};
use crate::dispatch::error::DispatchError;
use crate::dispatch::template::TemplateRenderer;
use crate::http::context::RequestContext;
use crate::http::response::Response;
use crate::routing::{Route, RouteArgs, RouteBinding, RouteDefinition, RouteTable};
use crate::services::auth::{Access, Auth};

pub struct Dispatcher {
    routes: RwLock<RouteTable>,
    actions: ActionRegistry,
    controllers: Arc<dyn ControllerLoader>,
    templates: Arc<dyn TemplateRenderer>,
    auth: Option<Arc<Auth>>,
    index_route: RouteDefinition,
    error_route: RouteDefinition,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("actions", &self.actions)
            .field("index_route", &self.index_route)
            .field("error_route", &self.error_route)
            .finish()
    }
}

impl Dispatcher {
    /// Index route defaults to the `home` template, error route to `error`.
    pub fn new(
        templates: Arc<dyn TemplateRenderer>,
        controllers: Arc<dyn ControllerLoader>,
        actions: ActionRegistry,
    ) -> Self {
        Self {
            routes: RwLock::new(RouteTable::new()),
            actions,
            controllers,
            templates,
            auth: None,
            index_route: RouteDefinition::template("home"),
            error_route: RouteDefinition::template("error"),
        }
    }

    /// Definition used for `/` when nothing else is registered there.
    pub fn with_index_route(mut self, definition: RouteDefinition) -> Self {
        self.index_route = definition;
        self
    }

    pub fn with_error_route(mut self, definition: RouteDefinition) -> Self {
        self.error_route = definition;
        self
    }

    /// Auth used to enforce firewalled routes.
    pub fn with_auth(mut self, auth: Arc<Auth>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub async fn register(&self, pattern: &str, definition: RouteDefinition) {
        self.routes.write().await.register(pattern, definition);
    }

    /// Run the matcher only.
    pub async fn find(&self, path: &str) -> Option<Route> {
        self.routes.read().await.find(path)
    }

    async fn ensure_index_route(&self) {
        if self.routes.read().await.contains("/") {
            return;
        }
        let mut routes = self.routes.write().await;
        if !routes.contains("/") {
            routes.register("/", self.index_route.clone());
        }
    }

    /// Dispatch one request path.
    ///
    /// Unmatched paths and actions that signal failure produce a 404 response;
    /// only unresolvable action/controller names and collaborator failures
    /// come back as `Err`.
    pub async fn run(
        &self,
        ctx: &mut RequestContext,
        path: &str,
    ) -> Result<Response, DispatchError> {
        self.ensure_index_route().await;

        let Some(route) = self.find(path).await else {
            debug!(path, "no route");
            return self.error(ctx).await;
        };

        if let Some(options) = route.firewall() {
            let auth = self
                .auth
                .as_ref()
                .ok_or_else(|| DispatchError::MissingAuth(route.pattern().to_string()))?;
            if let Access::Denied(res) = auth.firewall(ctx, options).await? {
                debug!(pattern = route.pattern(), "firewall redirect");
                return Ok(res);
            }
        }

        match route.binding() {
            RouteBinding::Template(template) => {
                let mut scope = Scope::new();
                scope.insert(
                    "query".to_string(),
                    Value::Object(route.arguments().to_query()),
                );
                let html = self
                    .view(ctx, template, route.controller(), scope)
                    .await?;
                Ok(Response::html(html))
            }
            RouteBinding::Action(name) => {
                let action = self.actions.resolve(name)?;
                let output = action.call(ctx, route.arguments()).await?;
                self.wrap(ctx, output).await
            }
            RouteBinding::None => {
                warn!(pattern = route.pattern(), "route has neither template nor action");
                self.error(ctx).await
            }
        }
    }

    async fn wrap(
        &self,
        ctx: &mut RequestContext,
        output: ActionOutput,
    ) -> Result<Response, DispatchError> {
        match output {
            ActionOutput::NotFound => self.error(ctx).await,
            ActionOutput::Response(res) => Ok(res),
            ActionOutput::Html(html) => Ok(Response::html(html)),
            ActionOutput::Json(value) => Ok(Response::json(value)),
        }
    }

    /// Render a template, letting its page controller extend the scope first.
    ///
    /// An explicitly named controller must exist; the implicit one (named
    /// after the template) is optional.
    async fn view(
        &self,
        ctx: &mut RequestContext,
        template: &str,
        controller: Option<&str>,
        mut scope: Scope,
    ) -> Result<String, DispatchError> {
        let controller = match controller {
            Some(name) => Some(
                self.controllers
                    .load(name)
                    .ok_or_else(|| DispatchError::UnresolvedController(name.to_string()))?,
            ),
            None => self.controllers.load(template),
        };

        if let Some(controller) = controller {
            let query = scope
                .get("query")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            if let Some(extra) = controller.call(ctx, &query).await? {
                scope.extend(extra);
            }
        }

        Ok(self.templates.render(template, &scope).await?)
    }

    /// The 404 response, rendered through the error route.
    async fn error(&self, ctx: &mut RequestContext) -> Result<Response, DispatchError> {
        let route = &self.error_route;

        let response = match &route.binding {
            RouteBinding::Template(template) => {
                let mut scope = Scope::new();
                scope.insert(
                    "query".to_string(),
                    Value::Object(
                        RouteArgs::new(route.defaults.clone(), Vec::new()).to_query(),
                    ),
                );
                Response::html(
                    self.view(ctx, template, route.controller.as_deref(), scope)
                        .await?,
                )
            }
            RouteBinding::Action(name) => {
                let action = self.actions.resolve(name)?;
                let args = RouteArgs::new(route.defaults.clone(), Vec::new());
                match action.call(ctx, &args).await? {
                    ActionOutput::NotFound => Response::html(String::new()),
                    ActionOutput::Response(res) if res.is_redirect() => return Ok(res),
                    ActionOutput::Response(res) => res,
                    ActionOutput::Html(html) => Response::html(html),
                    ActionOutput::Json(value) => Response::json(value),
                }
            }
            RouteBinding::None => Response::html(String::new()),
        };

        Ok(response.with_status(StatusCode::NOT_FOUND))
    }
}
