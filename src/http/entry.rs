/*
 * Responsibility
 * - axum の fallback handler: すべての path を Dispatcher へ流す
 * - Cookie / query / form body → RequestContext
 * - Response + 送出 cookie → axum Response (Set-Cookie)
 */
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, Uri, header},
    response::{IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use tracing::warn;

use crate::error::AppError;
use crate::http::context::RequestContext;
use crate::state::AppState;

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/x-www-form-urlencoded"))
}

/// Percent-decode each path segment on its own. A segment that is not UTF-8
/// or that would decode to a `/` stays encoded, so segment boundaries never move.
fn decode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match percent_decode_str(segment).decode_utf8() {
            Ok(decoded) if !decoded.contains('/') => decoded.into_owned(),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn append_cookies(res: &mut Response, ctx: &RequestContext, secure: bool) {
    for cookie in ctx.outgoing_cookies() {
        match HeaderValue::from_str(&cookie.to_header_value(secure)) {
            Ok(value) => {
                res.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(_) => warn!(cookie = %cookie.name, "dropping cookie with invalid header value"),
        }
    }
}

/// Cookies queued before a failure (a rotated auth token) are sent with the
/// error response too.
pub async fn dispatch(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let form: &[u8] = if is_form(&headers) { &body[..] } else { &[] };
    let mut ctx = RequestContext::from_request(&headers, uri.query(), form);

    let path = decode_path(uri.path());
    let mut res = match state.dispatcher.run(&mut ctx, &path).await {
        Ok(response) => response.into_response(),
        Err(e) => AppError::from(e).into_response(),
    };

    append_cookies(&mut res, &ctx, state.secure_cookies);
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::{Router, body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use crate::api::handlers::auth::Login;
    use crate::dispatch::{
        Action, ActionOutput, ActionRegistry, ControllerRegistry, DispatchError, Dispatcher,
        Scope, TemplateError, TemplateRenderer, action_fn,
    };
    use crate::http::cookie::SetCookie;
    use crate::repos::error::RepoResult;
    use crate::repos::user_repo::{UserRecord, UserStore};
    use crate::routing::{RouteArgs, RouteDefinition};
    use crate::services::auth::password::hash_password;
    use crate::services::auth::{Auth, AuthPolicy};
    use crate::services::cache::CacheError;
    use crate::services::session::{SessionResult, SessionStore};

    struct Plain;

    #[async_trait]
    impl TemplateRenderer for Plain {
        async fn render(&self, name: &str, _scope: &Scope) -> Result<String, TemplateError> {
            Ok(format!("<p>{name}</p>"))
        }
    }

    /// Echoes `name` from the input and remembers it in a cookie.
    struct Greet;

    #[async_trait]
    impl Action for Greet {
        async fn call(
            &self,
            ctx: &mut RequestContext,
            _args: &RouteArgs,
        ) -> Result<ActionOutput, DispatchError> {
            let name = ctx.input("name").unwrap_or("nobody").to_string();
            ctx.set_cookie(SetCookie::new("seen", name.clone(), Duration::from_secs(60)));
            Ok(format!("hello {name}").into())
        }
    }

    async fn app(secure_cookies: bool) -> Router {
        let mut actions = ActionRegistry::new();
        actions.register("greet", Greet).register(
            "user",
            action_fn(|args: RouteArgs| async move {
                format!("id={}", args.get("id").unwrap_or("-"))
            }),
        );
        let dispatcher = Dispatcher::new(
            Arc::new(Plain),
            Arc::new(ControllerRegistry::new()),
            actions,
        );
        dispatcher.register("/greet", RouteDefinition::action("greet")).await;
        dispatcher.register("/broken", RouteDefinition::action("ghost")).await;
        dispatcher.register("/user/:id", RouteDefinition::action("user")).await;
        dispatcher.register("/über", RouteDefinition::action("user")).await;

        Router::new()
            .fallback(dispatch)
            .with_state(AppState::new(Arc::new(dispatcher), secure_cookies))
    }

    async fn body_string(res: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn form_body_reaches_the_action_and_cookies_are_sent() {
        let res = app(true)
            .await
            .oneshot(
                Request::post("/greet?name=query")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("name=form"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("seen=form; "));
        assert!(cookie.contains("; Max-Age=60"));
        assert!(cookie.split("; ").any(|a| a == "Secure"));
        assert_eq!(body_string(res).await, "hello form");
    }

    #[tokio::test]
    async fn non_form_body_is_ignored() {
        let res = app(false)
            .await
            .oneshot(
                Request::post("/greet?name=query")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("name=form"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body_string(res).await, "hello query");
    }

    #[tokio::test]
    async fn unknown_path_is_404_html() {
        let res = app(false)
            .await
            .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_string(res).await, "<p>error</p>");
    }

    #[tokio::test]
    async fn configuration_error_is_500_json() {
        let res = app(false)
            .await
            .oneshot(Request::get("/broken").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: serde_json::Value = serde_json::from_str(&body_string(res).await).unwrap();
        assert_eq!(body["error"]["code"], "INTERNAL_SERVER_ERROR");
    }

    #[test]
    fn path_segments_are_decoded_one_by_one() {
        assert_eq!(decode_path("/user/J%C3%B6rg"), "/user/Jörg");
        assert_eq!(decode_path("/%C3%BCber/"), "/über/");
        assert_eq!(decode_path("/a%2Fb/c"), "/a%2Fb/c");
        assert_eq!(decode_path("/bad/%FF"), "/bad/%FF");
        assert_eq!(decode_path("/"), "/");
    }

    #[tokio::test]
    async fn encoded_paths_match_decoded_patterns() {
        let app = app(false).await;

        let res = app
            .clone()
            .oneshot(Request::get("/user/J%C3%B6rg").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "id=Jörg");

        let res = app
            .oneshot(Request::get("/%C3%BCber").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "id=-");
    }

    /// Reads miss, writes fail.
    struct ReadOnlySessions;

    #[async_trait]
    impl SessionStore for ReadOnlySessions {
        fn backend_name(&self) -> &'static str {
            "read-only"
        }

        async fn get(&self, _key: &str) -> SessionResult<Option<String>> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> SessionResult<()> {
            Err(CacheError::BackendCommand("READONLY".into()).into())
        }

        async fn restart(&self, _key: &str) -> SessionResult<()> {
            Err(CacheError::BackendCommand("READONLY".into()).into())
        }
    }

    struct Bob;

    #[async_trait]
    impl UserStore for Bob {
        async fn load_user(&self, username: &str) -> RepoResult<Option<UserRecord>> {
            Ok((username == "bob").then(|| UserRecord::new("bob", hash_password("builder"))))
        }
    }

    #[tokio::test]
    async fn rotated_token_survives_a_failed_dispatch() {
        let auth = Arc::new(Auth::new(
            Arc::new(ReadOnlySessions),
            Arc::new(Bob),
            AuthPolicy::default(),
        ));
        let mut actions = ActionRegistry::new();
        actions.register("login", Login::new(auth, "/"));
        let dispatcher = Dispatcher::new(
            Arc::new(Plain),
            Arc::new(ControllerRegistry::new()),
            actions,
        );
        dispatcher.register("/login", RouteDefinition::action("login")).await;
        let app = Router::new()
            .fallback(dispatch)
            .with_state(AppState::new(Arc::new(dispatcher), false));

        let res = app
            .oneshot(
                Request::post("/login")
                    .header(header::COOKIE, "auth=old")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("username=bob&password=builder"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("auth="));
        assert!(!cookie.starts_with("auth=old;"));
    }
}
