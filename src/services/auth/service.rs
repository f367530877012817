use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::http::context::{CurrentUser, RequestContext};
use crate::http::cookie::SetCookie;
use crate::http::response::Response;
use crate::repos::user_repo::{UserRecord, UserStore};
use crate::services::auth::password::verify_password;
use crate::services::auth::token::generate_token;
use crate::services::session::{SessionError, SessionStore};

/// The only message a failed login ever shows.
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("session store failure: {0}")]
    Session(#[from] SessionError),
    #[error("random source unavailable: {0}")]
    Random(getrandom::Error),
}

impl From<getrandom::Error> for AuthError {
    fn from(e: getrandom::Error) -> Self {
        AuthError::Random(e)
    }
}

#[derive(Debug, Clone)]
pub struct AuthPolicy {
    pub cookie_name: String,
    // Lifetime of the auth cookie and of the session entry behind it.
    pub expires: Duration,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            cookie_name: "auth".to_string(),
            expires: Duration::from_secs(60 * 60 * 24),
        }
    }
}

/// A user record bound to the session token it was resolved from.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    record: UserRecord,
    token: String,
}

impl AuthenticatedUser {
    pub fn new(record: UserRecord, token: String) -> Self {
        Self { record, token }
    }

    pub fn username(&self) -> &str {
        self.record.username()
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn record(&self) -> &UserRecord {
        &self.record
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallOptions {
    pub redirect: String,
    // Reset the session before redirecting.
    pub logout: bool,
}

impl Default for FirewallOptions {
    fn default() -> Self {
        Self {
            redirect: "login".to_string(),
            logout: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Access {
    Granted(AuthenticatedUser),
    Denied(Response),
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// A valid session already exists; nothing was rotated.
    AlreadyAuthenticated(Response),
    /// Username or password was empty.
    MissingCredentials,
    /// Unknown user, mismatching name or wrong password. Always the same response.
    Rejected(Response),
    LoggedIn(Response),
}

/// Session-backed authentication.
///
/// Shared across requests; everything request-specific (cookies, input,
/// the current-user memo) lives in the `RequestContext` passed to each call.
pub struct Auth {
    sessions: Arc<dyn SessionStore>,
    users: Arc<dyn UserStore>,
    policy: AuthPolicy,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("sessions", &self.sessions.backend_name())
            .field("policy", &self.policy)
            .finish()
    }
}

fn session_key(token: &str) -> String {
    format!("auth.{token}")
}

impl Auth {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        users: Arc<dyn UserStore>,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            sessions,
            users,
            policy,
        }
    }

    /// The authenticated user of this request, if any.
    ///
    /// Resolved at most once per request; the outcome (including "anonymous")
    /// is memoized in `ctx` until the next `reset`.
    pub async fn user(&self, ctx: &mut RequestContext) -> Option<AuthenticatedUser> {
        match ctx.current_user() {
            CurrentUser::Authenticated(user) => return Some(user.clone()),
            CurrentUser::Anonymous => return None,
            CurrentUser::Unresolved => {}
        }

        let resolved = self.resolve(ctx).await;
        ctx.set_current_user(match &resolved {
            Some(user) => CurrentUser::Authenticated(user.clone()),
            None => CurrentUser::Anonymous,
        });
        resolved
    }

    async fn resolve(&self, ctx: &RequestContext) -> Option<AuthenticatedUser> {
        let token = ctx
            .cookie(&self.policy.cookie_name)
            .filter(|t| !t.is_empty())?
            .to_string();

        let username = match self.sessions.get(&session_key(&token)).await {
            Ok(Some(username)) if !username.is_empty() => username,
            Ok(_) => {
                debug!("auth token has no session");
                return None;
            }
            Err(e) => {
                warn!(error = %e, backend = self.sessions.backend_name(), "session lookup failed");
                return None;
            }
        };

        let record = match self.users.load_user(&username).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(username = %username, "session user no longer exists");
                return None;
            }
            Err(e) => {
                warn!(error = %e, username = %username, "user lookup failed");
                return None;
            }
        };

        if record.username() != username {
            debug!(username = %username, "session user name mismatch");
            return None;
        }

        Some(AuthenticatedUser::new(record, token))
    }

    /// Drop to anonymous: issue a fresh token cookie and restart the session
    /// bound to the previous one.
    pub async fn reset(&self, ctx: &mut RequestContext) -> Result<(), AuthError> {
        ctx.set_current_user(CurrentUser::Anonymous);

        let previous = ctx.cookie(&self.policy.cookie_name).map(str::to_string);

        let token = generate_token()?;
        ctx.set_cookie(SetCookie::new(
            self.policy.cookie_name.clone(),
            token,
            self.policy.expires,
        ));

        if let Some(previous) = previous.filter(|t| !t.is_empty())
            && let Err(e) = self.sessions.restart(&session_key(&previous)).await
        {
            warn!(error = %e, backend = self.sessions.backend_name(), "session restart failed");
        }

        Ok(())
    }

    /// Log in with the `username` / `password` request parameters.
    ///
    /// The token is rotated before the credentials are looked at, so even a
    /// failed attempt leaves the client with a fresh, unbound token.
    pub async fn login(
        &self,
        ctx: &mut RequestContext,
        redirect: &str,
    ) -> Result<LoginOutcome, AuthError> {
        if self.user(ctx).await.is_some() {
            return Ok(LoginOutcome::AlreadyAuthenticated(Response::redirect(redirect)));
        }

        self.reset(ctx).await?;

        let username = ctx.input("username").unwrap_or_default().to_lowercase();
        let password = ctx.input("password").unwrap_or_default().to_string();

        if username.is_empty() || password.is_empty() {
            debug!("login without credentials");
            return Ok(LoginOutcome::MissingCredentials);
        }

        let record = match self.users.load_user(&username).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(username = %username, "login rejected: unknown user");
                return Ok(rejected());
            }
            Err(e) => {
                warn!(error = %e, username = %username, "login rejected: user lookup failed");
                return Ok(rejected());
            }
        };

        if record.username().to_lowercase() != username {
            info!(username = %username, "login rejected: name mismatch");
            return Ok(rejected());
        }

        if !Self::attempt(&password, Some(&record)) {
            info!(username = %username, "login rejected: bad password");
            return Ok(rejected());
        }

        let token = generate_token()?;
        self.sessions
            .set(&session_key(&token), record.username(), self.policy.expires)
            .await?;
        ctx.set_cookie(SetCookie::new(
            self.policy.cookie_name.clone(),
            token.clone(),
            self.policy.expires,
        ));

        info!(username = %record.username(), "login succeeded");
        ctx.set_current_user(CurrentUser::Authenticated(AuthenticatedUser::new(
            record, token,
        )));

        Ok(LoginOutcome::LoggedIn(Response::redirect(redirect)))
    }

    /// `reset` followed by a redirect.
    pub async fn logout(
        &self,
        ctx: &mut RequestContext,
        redirect: &str,
    ) -> Result<Response, AuthError> {
        self.reset(ctx).await?;
        Ok(Response::redirect(redirect))
    }

    /// Verify `password` against the stored hash of `user`.
    ///
    /// No user, an empty password or an empty stored hash never verifies.
    pub fn attempt(password: &str, user: Option<&UserRecord>) -> bool {
        let Some(user) = user else {
            return false;
        };
        if password.is_empty() || user.password().is_empty() {
            return false;
        }
        verify_password(password, user.password())
    }

    /// `attempt` against the current user of the request.
    pub async fn attempt_current(&self, ctx: &mut RequestContext, password: &str) -> bool {
        let user = self.user(ctx).await;
        Self::attempt(password, user.as_ref().map(AuthenticatedUser::record))
    }

    /// Gate for handlers: grant access to an authenticated user, otherwise
    /// (optionally) reset and redirect.
    pub async fn firewall(
        &self,
        ctx: &mut RequestContext,
        options: &FirewallOptions,
    ) -> Result<Access, AuthError> {
        if let Some(user) = self.user(ctx).await {
            return Ok(Access::Granted(user));
        }

        if options.logout {
            self.reset(ctx).await?;
        }
        debug!(redirect = %options.redirect, "firewall denied anonymous request");
        Ok(Access::Denied(Response::redirect(&options.redirect)))
    }
}

fn rejected() -> LoginOutcome {
    LoginOutcome::Rejected(Response::error(INVALID_CREDENTIALS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::error::RepoResult;
    use crate::services::auth::password::hash_password;
    use crate::services::cache::CacheError;
    use crate::services::session::{MemorySessionStore, SessionResult};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::collections::HashMap;

    struct StaticUsers(HashMap<String, UserRecord>);

    #[async_trait]
    impl UserStore for StaticUsers {
        async fn load_user(&self, username: &str) -> RepoResult<Option<UserRecord>> {
            Ok(self.0.get(&username.to_lowercase()).cloned())
        }
    }

    struct BrokenSessions;

    #[async_trait]
    impl SessionStore for BrokenSessions {
        fn backend_name(&self) -> &'static str {
            "broken"
        }

        async fn get(&self, _key: &str) -> SessionResult<Option<String>> {
            Err(CacheError::BackendConnection("down".into()).into())
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> SessionResult<()> {
            Err(CacheError::BackendConnection("down".into()).into())
        }

        async fn restart(&self, _key: &str) -> SessionResult<()> {
            Err(CacheError::BackendConnection("down".into()).into())
        }
    }

    fn users() -> Arc<StaticUsers> {
        let mut map = HashMap::new();
        map.insert(
            "alice".to_string(),
            UserRecord::new("alice", hash_password("wonderland")),
        );
        map.insert("nopass".to_string(), UserRecord::new("nopass", ""));
        map.insert(
            "mixed".to_string(),
            UserRecord::new("Mixed", hash_password("case")),
        );
        Arc::new(StaticUsers(map))
    }

    fn setup() -> (Auth, Arc<MemorySessionStore>) {
        let sessions = Arc::new(MemorySessionStore::new());
        let auth = Auth::new(sessions.clone(), users(), AuthPolicy::default());
        (auth, sessions)
    }

    async fn logged_in_token(auth: &Auth) -> String {
        let mut ctx = RequestContext::new()
            .with_input("username", "alice")
            .with_input("password", "wonderland");
        let outcome = auth.login(&mut ctx, "/").await.unwrap();
        assert!(matches!(outcome, LoginOutcome::LoggedIn(_)));
        ctx.cookie("auth").unwrap().to_string()
    }

    #[tokio::test]
    async fn anonymous_without_cookie() {
        let (auth, _) = setup();
        let mut ctx = RequestContext::new();
        assert!(auth.user(&mut ctx).await.is_none());
        assert!(matches!(ctx.current_user(), CurrentUser::Anonymous));
    }

    #[tokio::test]
    async fn anonymous_result_is_memoized_per_request() {
        let (auth, sessions) = setup();
        let mut ctx = RequestContext::new().with_cookie("auth", "tok");
        assert!(auth.user(&mut ctx).await.is_none());

        sessions
            .set("auth.tok", "alice", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(auth.user(&mut ctx).await.is_none());

        let mut next_request = RequestContext::new().with_cookie("auth", "tok");
        assert_eq!(
            auth.user(&mut next_request).await.unwrap().username(),
            "alice"
        );
    }

    #[tokio::test]
    async fn session_username_must_match_record_exactly() {
        let (auth, sessions) = setup();
        sessions
            .set("auth.tok", "mixed", Duration::from_secs(60))
            .await
            .unwrap();

        let mut ctx = RequestContext::new().with_cookie("auth", "tok");
        assert!(auth.user(&mut ctx).await.is_none());
    }

    #[tokio::test]
    async fn login_success_binds_a_new_token() {
        let (auth, sessions) = setup();
        let mut ctx = RequestContext::new()
            .with_cookie("auth", "stale")
            .with_input("username", "ALICE")
            .with_input("password", "wonderland");

        let outcome = auth.login(&mut ctx, "/dashboard").await.unwrap();
        let LoginOutcome::LoggedIn(res) = outcome else {
            panic!("expected successful login, got {outcome:?}");
        };
        assert_eq!(res.location(), Some("/dashboard"));

        let token = ctx.cookie("auth").unwrap().to_string();
        assert_ne!(token, "stale");
        assert_eq!(
            sessions.get(&format!("auth.{token}")).await.unwrap().as_deref(),
            Some("alice")
        );
        assert_eq!(ctx.outgoing_cookies().len(), 1);
        assert_eq!(auth.user(&mut ctx).await.unwrap().token(), token);

        let mut next_request = RequestContext::new().with_cookie("auth", token.as_str());
        assert_eq!(
            auth.user(&mut next_request).await.unwrap().username(),
            "alice"
        );
    }

    #[tokio::test]
    async fn login_with_empty_password_only_rotates_the_token() {
        let (auth, sessions) = setup();
        let mut ctx = RequestContext::new()
            .with_cookie("auth", "old")
            .with_input("username", "alice")
            .with_input("password", "");

        let outcome = auth.login(&mut ctx, "/").await.unwrap();
        assert!(matches!(outcome, LoginOutcome::MissingCredentials));

        assert_eq!(sessions.len().await, 0);
        assert_ne!(ctx.cookie("auth"), Some("old"));
        assert_eq!(ctx.outgoing_cookies().len(), 1);
        assert!(auth.user(&mut ctx).await.is_none());
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (auth, _) = setup();

        let mut unknown = RequestContext::new()
            .with_input("username", "mallory")
            .with_input("password", "x");
        let mut wrong = RequestContext::new()
            .with_input("username", "alice")
            .with_input("password", "x");
        let mut no_hash = RequestContext::new()
            .with_input("username", "nopass")
            .with_input("password", "x");

        let a = auth.login(&mut unknown, "/").await.unwrap();
        let b = auth.login(&mut wrong, "/").await.unwrap();
        let c = auth.login(&mut no_hash, "/").await.unwrap();

        let (LoginOutcome::Rejected(a), LoginOutcome::Rejected(b), LoginOutcome::Rejected(c)) =
            (a, b, c)
        else {
            panic!("expected three rejections");
        };
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.status(), StatusCode::BAD_REQUEST);
        assert!(auth.user(&mut wrong).await.is_none());
    }

    #[tokio::test]
    async fn login_when_authenticated_short_circuits() {
        let (auth, sessions) = setup();
        let token = logged_in_token(&auth).await;

        let mut ctx = RequestContext::new().with_cookie("auth", token.as_str());
        let outcome = auth.login(&mut ctx, "/home").await.unwrap();

        let LoginOutcome::AlreadyAuthenticated(res) = outcome else {
            panic!("expected short-circuit");
        };
        assert_eq!(res.location(), Some("/home"));
        assert!(ctx.outgoing_cookies().is_empty());
        assert_eq!(sessions.len().await, 1);
    }

    #[tokio::test]
    async fn logout_restarts_the_session() {
        let (auth, sessions) = setup();
        let token = logged_in_token(&auth).await;

        let mut ctx = RequestContext::new().with_cookie("auth", token.as_str());
        let res = auth.logout(&mut ctx, "login").await.unwrap();

        assert_eq!(res.location(), Some("/login"));
        assert_eq!(sessions.len().await, 0);
        assert_ne!(ctx.cookie("auth"), Some(token.as_str()));
        assert!(auth.user(&mut ctx).await.is_none());
    }

    #[test]
    fn attempt_rules() {
        let alice = UserRecord::new("alice", hash_password("wonderland"));
        let empty = UserRecord::new("empty", "");

        assert!(Auth::attempt("wonderland", Some(&alice)));
        assert!(!Auth::attempt("nope", Some(&alice)));
        assert!(!Auth::attempt("", Some(&alice)));
        assert!(!Auth::attempt("", Some(&empty)));
        assert!(!Auth::attempt("anything", Some(&empty)));
        assert!(!Auth::attempt("wonderland", None));
    }

    #[tokio::test]
    async fn attempt_current_uses_the_session_user() {
        let (auth, _) = setup();
        let token = logged_in_token(&auth).await;

        let mut ctx = RequestContext::new().with_cookie("auth", token.as_str());
        assert!(auth.attempt_current(&mut ctx, "wonderland").await);

        let mut anonymous = RequestContext::new();
        assert!(!auth.attempt_current(&mut anonymous, "wonderland").await);
    }

    #[tokio::test]
    async fn firewall_redirects_and_resets_by_default() {
        let (auth, _) = setup();
        let mut ctx = RequestContext::new();

        let access = auth
            .firewall(&mut ctx, &FirewallOptions::default())
            .await
            .unwrap();

        let Access::Denied(res) = access else {
            panic!("anonymous request must be denied");
        };
        assert_eq!(res.location(), Some("/login"));
        assert_eq!(ctx.outgoing_cookies().len(), 1);
    }

    #[tokio::test]
    async fn firewall_without_logout_keeps_cookies() {
        let (auth, _) = setup();
        let mut ctx = RequestContext::new();
        let options = FirewallOptions {
            redirect: "/signin".into(),
            logout: false,
        };

        let Access::Denied(res) = auth.firewall(&mut ctx, &options).await.unwrap() else {
            panic!("anonymous request must be denied");
        };
        assert_eq!(res.location(), Some("/signin"));
        assert!(ctx.outgoing_cookies().is_empty());
    }

    #[tokio::test]
    async fn firewall_grants_authenticated_user() {
        let (auth, _) = setup();
        let token = logged_in_token(&auth).await;

        let mut ctx = RequestContext::new().with_cookie("auth", token.as_str());
        let access = auth
            .firewall(&mut ctx, &FirewallOptions::default())
            .await
            .unwrap();
        assert!(matches!(access, Access::Granted(u) if u.username() == "alice"));
    }

    #[tokio::test]
    async fn broken_session_store_means_anonymous() {
        let auth = Auth::new(Arc::new(BrokenSessions), users(), AuthPolicy::default());

        let mut ctx = RequestContext::new().with_cookie("auth", "tok");
        assert!(auth.user(&mut ctx).await.is_none());

        // reset tolerates the failed restart
        auth.reset(&mut ctx).await.unwrap();

        let mut login = RequestContext::new()
            .with_input("username", "alice")
            .with_input("password", "wonderland");
        assert!(matches!(
            auth.login(&mut login, "/").await,
            Err(AuthError::Session(_))
        ));
    }
}
