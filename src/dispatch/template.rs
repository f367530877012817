//! Template collaborator.
//!
//! A placeholder behind the `TemplateRenderer` seam, not a general engine.
//!
//! `FileTemplates` maps a logical name to `<views>/<name>.html` and fills
//! `{{ key }}` / `{{ key.nested }}` placeholders from the scope, HTML-escaped.
//! Anything richer belongs to a real template engine behind the same trait.

use std::path::{Component, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::dispatch::controller::Scope;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait TemplateRenderer: Send + Sync {
    async fn render(&self, name: &str, scope: &Scope) -> Result<String, TemplateError>;
}

#[derive(Debug, Clone)]
pub struct FileTemplates {
    views: PathBuf,
}

impl FileTemplates {
    pub fn new(views: impl Into<PathBuf>) -> Self {
        Self {
            views: views.into(),
        }
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        let relative = PathBuf::from(format!("{}.html", name.trim_matches('/')));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        (!escapes).then(|| self.views.join(relative))
    }
}

#[async_trait]
impl TemplateRenderer for FileTemplates {
    async fn render(&self, name: &str, scope: &Scope) -> Result<String, TemplateError> {
        let path = self
            .path_for(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;

        let source = match tokio::fs::read_to_string(&path).await {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TemplateError::NotFound(name.to_string()));
            }
            Err(source) => return Err(TemplateError::Io { path, source }),
        };

        Ok(fill(&source, scope))
    }
}

/// Replace `{{ path }}` placeholders; unknown keys render as nothing.
pub fn fill(source: &str, scope: &Scope) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);

        let key = rest[start + 2..start + 2 + len].trim();
        if let Some(value) = lookup(scope, key) {
            out.push_str(&escape_html(&display(value)));
        }
        rest = &rest[start + 2 + len + 2..];
    }

    out.push_str(rest);
    out
}

fn lookup<'a>(scope: &'a Scope, key: &str) -> Option<&'a Value> {
    let mut parts = key.split('.');
    let mut value = scope.get(parts.next()?)?;
    for part in parts {
        value = match value {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
