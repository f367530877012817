//! Route definitions stored as JSON files in `app/routes`.
//!
//! Each file holds one definition:
//!
//! ```json
//! { "pattern": "/user/:id", "action": "users.show", "defaults": { "tab": "profile" } }
//! ```
//!
//! `pattern` falls back to the file stem. A `view` wins over an `action`.
//! `"firewall": true` (or `{ "redirect": "..", "logout": false }`) restricts
//! the route to authenticated users.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::finder::Finder;
use crate::routing::table::{RouteBinding, RouteDefinition};
use crate::services::auth::FirewallOptions;

#[derive(Debug, Error)]
pub enum RouteLoadError {
    #[error("failed to read route file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid route file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RouteFile {
    pattern: Option<String>,
    view: Option<String>,
    action: Option<String>,
    controller: Option<String>,
    #[serde(default)]
    defaults: BTreeMap<String, String>,
    firewall: Option<FirewallFile>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FirewallFile {
    Enabled(bool),
    Options {
        redirect: Option<String>,
        logout: Option<bool>,
    },
}

impl FirewallFile {
    fn into_options(self) -> Option<FirewallOptions> {
        let defaults = FirewallOptions::default();
        match self {
            FirewallFile::Enabled(false) => None,
            FirewallFile::Enabled(true) => Some(defaults),
            FirewallFile::Options { redirect, logout } => Some(FirewallOptions {
                redirect: non_empty(redirect).unwrap_or(defaults.redirect),
                logout: logout.unwrap_or(defaults.logout),
            }),
        }
    }
}

impl RouteFile {
    fn into_definition(self) -> RouteDefinition {
        let binding = match (non_empty(self.view), non_empty(self.action)) {
            (Some(view), _) => RouteBinding::Template(view),
            (None, Some(action)) => RouteBinding::Action(action),
            (None, None) => RouteBinding::None,
        };

        RouteDefinition {
            binding,
            controller: non_empty(self.controller),
            defaults: self.defaults.into_iter().collect(),
            firewall: self.firewall.and_then(FirewallFile::into_options),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse a single route file into `(pattern, definition)`.
pub fn parse_route_file(path: &Path, contents: &str) -> Result<(String, RouteDefinition), RouteLoadError> {
    let file: RouteFile = serde_json::from_str(contents).map_err(|source| RouteLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let pattern = non_empty(file.pattern.clone()).unwrap_or_else(|| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    });

    Ok((pattern, file.into_definition()))
}

/// Load every `*.json` route file, in file name order.
pub async fn load_routes(finder: &Finder) -> Result<Vec<(String, RouteDefinition)>, RouteLoadError> {
    let files = finder
        .scan(&finder.routes, "json")
        .await
        .map_err(|source| RouteLoadError::Io {
            path: finder.routes.clone(),
            source,
        })?;

    let mut routes = Vec::with_capacity(files.len());
    for path in files {
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| RouteLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let (pattern, definition) = parse_route_file(&path, &contents)?;
        debug!(file = %path.display(), pattern = %pattern, "loaded route file");
        routes.push((pattern, definition));
    }

    Ok(routes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_defaults_to_file_stem() {
        let (pattern, def) =
            parse_route_file(Path::new("/app/routes/about.json"), r#"{ "view": "about" }"#).unwrap();
        assert_eq!(pattern, "about");
        assert_eq!(def.binding, RouteBinding::Template("about".into()));
    }

    #[test]
    fn view_wins_over_action() {
        let (_, def) = parse_route_file(
            Path::new("x.json"),
            r#"{ "pattern": "/x", "view": "page", "action": "act", "controller": "ctl" }"#,
        )
        .unwrap();
        assert_eq!(def.binding, RouteBinding::Template("page".into()));
        assert_eq!(def.controller.as_deref(), Some("ctl"));
    }

    #[test]
    fn blank_fields_are_ignored() {
        let (pattern, def) = parse_route_file(
            Path::new("ping.json"),
            r#"{ "pattern": " ", "view": "", "action": "ping", "defaults": { "a": "1" } }"#,
        )
        .unwrap();
        assert_eq!(pattern, "ping");
        assert_eq!(def.binding, RouteBinding::Action("ping".into()));
        assert_eq!(def.defaults, vec![("a".to_string(), "1".to_string())]);
    }

    #[test]
    fn firewall_flag_and_options() {
        let (_, def) =
            parse_route_file(Path::new("a.json"), r#"{ "view": "a", "firewall": true }"#).unwrap();
        assert_eq!(def.firewall, Some(FirewallOptions::default()));

        let (_, def) =
            parse_route_file(Path::new("b.json"), r#"{ "view": "b", "firewall": false }"#).unwrap();
        assert_eq!(def.firewall, None);

        let (_, def) = parse_route_file(
            Path::new("c.json"),
            r#"{ "action": "c", "firewall": { "redirect": "/signin", "logout": false } }"#,
        )
        .unwrap();
        assert_eq!(
            def.firewall,
            Some(FirewallOptions {
                redirect: "/signin".into(),
                logout: false,
            })
        );

        let (_, def) =
            parse_route_file(Path::new("d.json"), r#"{ "view": "d", "firewall": {} }"#).unwrap();
        assert_eq!(def.firewall, Some(FirewallOptions::default()));
    }

    #[test]
    fn invalid_json_is_reported() {
        let err = parse_route_file(Path::new("bad.json"), "{").unwrap_err();
        assert!(matches!(err, RouteLoadError::Parse { .. }));
    }

    #[tokio::test]
    async fn loads_files_from_routes_dir() {
        let root = tempfile::tempdir().unwrap();
        let finder = Finder::new(root.path());
        tokio::fs::create_dir_all(&finder.routes).await.unwrap();
        tokio::fs::write(finder.routes.join("a.json"), r#"{ "view": "a" }"#)
            .await
            .unwrap();
        tokio::fs::write(
            finder.routes.join("b.json"),
            r#"{ "pattern": "/b/:id", "action": "b" }"#,
        )
        .await
        .unwrap();

        let routes = load_routes(&finder).await.unwrap();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].0, "a");
        assert_eq!(routes[1].0, "/b/:id");
    }
}
