/*
 * Responsibility
 * - 1 リクエスト分の状態 (cookie, 入力値, 送出 cookie, 認証ユーザーの memo)
 * - グローバルな singleton の代わりに dispatch / action / Auth へ明示的に渡す
 */
use std::collections::HashMap;

use axum::http::HeaderMap;

use crate::http::cookie::{SetCookie, parse_cookie_header};
use crate::services::auth::AuthenticatedUser;

/// Memo of the current user for the lifetime of one request.
#[derive(Debug, Clone, Default)]
pub enum CurrentUser {
    #[default]
    Unresolved,
    Anonymous,
    Authenticated(AuthenticatedUser),
}

#[derive(Debug, Default)]
pub struct RequestContext {
    cookies: HashMap<String, String>,
    input: HashMap<String, String>,
    outgoing: Vec<SetCookie>,
    current_user: CurrentUser,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from request headers, the raw query string and an urlencoded body.
    /// Body fields override query fields of the same name.
    pub fn from_request(headers: &HeaderMap, query: Option<&str>, form: &[u8]) -> Self {
        let mut input: HashMap<String, String> = HashMap::new();
        if let Some(query) = query {
            input.extend(url::form_urlencoded::parse(query.as_bytes()).into_owned());
        }
        input.extend(url::form_urlencoded::parse(form).into_owned());

        Self {
            cookies: parse_cookie_header(headers),
            input,
            ..Self::default()
        }
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.input.insert(name.into(), value.into());
        self
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Queue a `Set-Cookie`; the new value is visible to `cookie()` right away.
    pub fn set_cookie(&mut self, cookie: SetCookie) {
        self.cookies.insert(cookie.name.clone(), cookie.value.clone());
        self.outgoing.retain(|c| c.name != cookie.name);
        self.outgoing.push(cookie);
    }

    pub fn outgoing_cookies(&self) -> &[SetCookie] {
        &self.outgoing
    }

    /// Request parameter from the query string or form body.
    pub fn input(&self, name: &str) -> Option<&str> {
        self.input.get(name).map(String::as_str)
    }

    pub fn current_user(&self) -> &CurrentUser {
        &self.current_user
    }

    pub fn set_current_user(&mut self, user: CurrentUser) {
        self.current_user = user;
    }
}
