/*
 * Responsibility
 * - pattern → RouteDefinition の保持 (登録順を保持)
 * - request path に対する最適 route の選択 (Matcher)
 *   1. literal のみの pattern は完全一致で最優先 (登録順に依存しない)
 *   2. capture/catch-all を含む pattern は後から登録されたものが勝つ
 * - 照合結果 (Route) の提供
 */
use serde_json::{Map, Value};
use tracing::debug;

use crate::routing::pattern::{RoutePattern, split_path};
use crate::services::auth::FirewallOptions;

/// What a matched route renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteBinding {
    /// Logical template name rendered through the template collaborator.
    Template(String),
    /// Name of an action resolved through the action registry.
    Action(String),
    /// Neither template nor action; dispatched as not found.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pub binding: RouteBinding,
    /// Page controller for template routes. Defaults to the template name.
    pub controller: Option<String>,
    /// Arguments applied when the pattern does not capture them.
    pub defaults: Vec<(String, String)>,
    /// Only authenticated users get past this route; others are redirected.
    pub firewall: Option<FirewallOptions>,
}

impl RouteDefinition {
    pub fn template(name: impl Into<String>) -> Self {
        Self::with_binding(RouteBinding::Template(name.into()))
    }

    pub fn action(name: impl Into<String>) -> Self {
        Self::with_binding(RouteBinding::Action(name.into()))
    }

    pub fn empty() -> Self {
        Self::with_binding(RouteBinding::None)
    }

    fn with_binding(binding: RouteBinding) -> Self {
        Self {
            binding,
            controller: None,
            defaults: Vec::new(),
            firewall: None,
        }
    }

    pub fn controller(mut self, name: impl Into<String>) -> Self {
        self.controller = Some(name.into());
        self
    }

    pub fn default_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.push((name.into(), value.into()));
        self
    }

    pub fn firewall(mut self, options: FirewallOptions) -> Self {
        self.firewall = Some(options);
        self
    }
}

/// Arguments extracted from a request path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteArgs {
    named: Vec<(String, String)>,
    remainder: Vec<String>,
    catch_all: Option<String>,
}

impl RouteArgs {
    pub fn new(named: Vec<(String, String)>, remainder: Vec<String>) -> Self {
        Self {
            named,
            remainder,
            catch_all: None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.named
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Named arguments in pattern order, defaults last.
    pub fn named(&self) -> &[(String, String)] {
        &self.named
    }

    /// Segments consumed by a trailing catch-all.
    pub fn remainder(&self) -> &[String] {
        &self.remainder
    }

    /// Arguments as a template/controller query object.
    ///
    /// A named catch-all appears under its name as the joined remainder.
    pub fn to_query(&self) -> Map<String, Value> {
        let mut query: Map<String, Value> = self
            .named
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        if let Some(name) = &self.catch_all {
            query.insert(name.clone(), Value::String(self.remainder.join("/")));
        }

        query
    }
}

/// A resolved match: the winning definition plus its arguments.
#[derive(Debug, Clone)]
pub struct Route {
    pattern: String,
    definition: RouteDefinition,
    arguments: RouteArgs,
}

impl Route {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn binding(&self) -> &RouteBinding {
        &self.definition.binding
    }

    pub fn is_template(&self) -> bool {
        matches!(self.definition.binding, RouteBinding::Template(_))
    }

    pub fn is_action(&self) -> bool {
        matches!(self.definition.binding, RouteBinding::Action(_))
    }

    pub fn template(&self) -> Option<&str> {
        match &self.definition.binding {
            RouteBinding::Template(name) => Some(name),
            _ => None,
        }
    }

    pub fn action(&self) -> Option<&str> {
        match &self.definition.binding {
            RouteBinding::Action(name) => Some(name),
            _ => None,
        }
    }

    pub fn controller(&self) -> Option<&str> {
        self.definition.controller.as_deref()
    }

    pub fn firewall(&self) -> Option<&FirewallOptions> {
        self.definition.firewall.as_ref()
    }

    pub fn arguments(&self) -> &RouteArgs {
        &self.arguments
    }
}

#[derive(Debug, Clone)]
struct RouteEntry {
    pattern: RoutePattern,
    definition: RouteDefinition,
}

/// Registered routes, oldest first.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the definition bound to `pattern`.
    ///
    /// A replaced pattern counts as the most recent registration.
    pub fn register(&mut self, pattern: &str, definition: RouteDefinition) {
        let pattern = RoutePattern::parse(pattern);

        if let Some(pos) = self.position(pattern.key()) {
            debug!(pattern = %pattern, "replacing route");
            self.entries.remove(pos);
        } else {
            debug!(pattern = %pattern, "registering route");
        }

        self.entries.push(RouteEntry {
            pattern,
            definition,
        });
    }

    pub fn contains(&self, pattern: &str) -> bool {
        self.position(RoutePattern::parse(pattern).key()).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.pattern.key() == key)
    }

    /// Find the best route for `path`. `None` means no route, never an error.
    pub fn find(&self, path: &str) -> Option<Route> {
        let segments = split_path(path);

        let literal = self
            .entries
            .iter()
            .filter(|e| e.pattern.is_literal())
            .find_map(|e| e.pattern.matches(&segments).map(|c| (e, c)));

        let (entry, captures) = match literal {
            Some(hit) => hit,
            None => self
                .entries
                .iter()
                .rev()
                .filter(|e| !e.pattern.is_literal())
                .find_map(|e| e.pattern.matches(&segments).map(|c| (e, c)))?,
        };

        let mut named = captures.named;
        for (name, value) in &entry.definition.defaults {
            if !named.iter().any(|(k, _)| k == name) {
                named.push((name.clone(), value.clone()));
            }
        }

        debug!(path, pattern = %entry.pattern, "route matched");

        Some(Route {
            pattern: entry.pattern.key().to_string(),
            definition: entry.definition.clone(),
            arguments: RouteArgs {
                named,
                remainder: captures.remainder,
                catch_all: captures.catch_all,
            },
        })
    }
}
