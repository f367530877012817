use thiserror::Error;

use crate::dispatch::template::TemplateError;
use crate::services::auth::AuthError;

/// Hard dispatch failures. "Not found" is never one of these; it is a 404 response.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("route references unknown action `{0}`")]
    UnresolvedAction(String),
    #[error("route references unknown controller `{0}`")]
    UnresolvedController(String),
    #[error("route `{0}` is firewalled but no auth is configured")]
    MissingAuth(String),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl DispatchError {
    /// True for deployment/programming mistakes (a dangling action or controller
    /// name, a firewall without auth).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DispatchError::UnresolvedAction(_)
                | DispatchError::UnresolvedController(_)
                | DispatchError::MissingAuth(_)
        )
    }
}
