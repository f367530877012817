/*
 * Responsibility
 * - auth.login / auth.logout の built-in action
 * - LoginOutcome → ActionOutput (資格情報なし = NotFound, それ以外は Response)
 */
use std::sync::Arc;

use async_trait::async_trait;

use crate::dispatch::{Action, ActionOutput, DispatchError};
use crate::http::context::RequestContext;
use crate::routing::RouteArgs;
use crate::services::auth::{Auth, LoginOutcome};

impl From<LoginOutcome> for ActionOutput {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::MissingCredentials => ActionOutput::NotFound,
            LoginOutcome::AlreadyAuthenticated(res)
            | LoginOutcome::Rejected(res)
            | LoginOutcome::LoggedIn(res) => ActionOutput::Response(res),
        }
    }
}

/// Reads `username` / `password` from the request input.
pub struct Login {
    auth: Arc<Auth>,
    redirect: String,
}

impl Login {
    pub fn new(auth: Arc<Auth>, redirect: impl Into<String>) -> Self {
        Self {
            auth,
            redirect: redirect.into(),
        }
    }
}

#[async_trait]
impl Action for Login {
    async fn call(
        &self,
        ctx: &mut RequestContext,
        _args: &RouteArgs,
    ) -> Result<ActionOutput, DispatchError> {
        Ok(self.auth.login(ctx, &self.redirect).await?.into())
    }
}

pub struct Logout {
    auth: Arc<Auth>,
    redirect: String,
}

impl Logout {
    pub fn new(auth: Arc<Auth>, redirect: impl Into<String>) -> Self {
        Self {
            auth,
            redirect: redirect.into(),
        }
    }
}

#[async_trait]
impl Action for Logout {
    async fn call(
        &self,
        ctx: &mut RequestContext,
        _args: &RouteArgs,
    ) -> Result<ActionOutput, DispatchError> {
        Ok(self.auth.logout(ctx, &self.redirect).await?.into())
    }
}
