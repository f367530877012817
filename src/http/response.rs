/*
 * Responsibility
 * - dispatch 結果の正規化された Response (content + content type + status)
 * - redirect / login エラーなどの組み立て
 * - axum の IntoResponse への変換
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse},
};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Json,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Html => "html",
            ContentType::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Html(String),
    Json(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    content: Content,
    status: StatusCode,
    location: Option<String>,
}

impl Response {
    pub fn html(content: impl Into<String>) -> Self {
        Self {
            content: Content::Html(content.into()),
            status: StatusCode::OK,
            location: None,
        }
    }

    pub fn json(content: Value) -> Self {
        Self {
            content: Content::Json(content),
            status: StatusCode::OK,
            location: None,
        }
    }

    /// `302 Found` to `target`. Relative targets are made site-absolute,
    /// so `login` becomes `/login`.
    pub fn redirect(target: &str) -> Self {
        Self {
            content: Content::Html(String::new()),
            status: StatusCode::FOUND,
            location: Some(site_url(target)),
        }
    }

    /// User-visible error: `{ "status": "error", "message": .., "code": 400 }`.
    pub fn error(message: &str) -> Self {
        let status = StatusCode::BAD_REQUEST;
        Self {
            content: Content::Json(json!({
                "status": "error",
                "message": message,
                "code": status.as_u16(),
            })),
            status,
            location: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn content_type(&self) -> ContentType {
        match self.content {
            Content::Html(_) => ContentType::Html,
            Content::Json(_) => ContentType::Json,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }
}

fn site_url(target: &str) -> String {
    if target.starts_with('/') || target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("/{target}")
    }
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        let mut res = match self.content {
            Content::Html(body) => Html(body).into_response(),
            Content::Json(body) => Json(body).into_response(),
        };
        *res.status_mut() = self.status;

        if let Some(location) = self.location {
            match HeaderValue::from_str(&location) {
                Ok(value) => {
                    res.headers_mut().insert(header::LOCATION, value);
                }
                Err(e) => tracing::warn!(error = %e, location = %location, "invalid redirect location"),
            }
        }

        res
    }
}
