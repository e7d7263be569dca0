//! Declarative route table and the access decision for each navigation.
//!
//! - Rules pair a path pattern with an access level: public, authenticated,
//!   or a named role. `:param` segments match any single segment.
//! - [`RouteTable::decide`] is a pure function of (path, session state):
//!   no I/O, no side effects, deterministic. Callers re-run it whenever the
//!   session state changes.
//! - Decision ordering is fixed: an unfinished bootstrap holds rendering,
//!   unauthenticated goes to the login path, a missing role goes to the
//!   landing path, everything else renders.
//! - Tables can be loaded from YAML; the built-in console table is the
//!   default.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::session::SessionState;

// ==============================
// Model
// ==============================

/// Access level required by a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteAccess {
    /// Renderable by anyone, signed in or not.
    Public,
    /// Any proven session.
    Authenticated,
    /// A proven session holding the named role.
    Role(String),
}

/// What the caller should do with a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Bootstrap still running; render nothing yet and re-ask later.
    Hold,
    /// Render the requested route.
    Render,
    /// Navigate to the given path instead.
    Redirect(String),
}

/// One pattern/access pair. Patterns use `/`-separated literals and `:param`
/// placeholders, e.g. `/product/:id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRule {
    pub pattern: String,
    pub access: RouteAccess,
    #[serde(skip)]
    matcher: Option<Regex>,
}

impl RouteRule {
    pub fn new(pattern: impl Into<String>, access: RouteAccess) -> Self {
        let mut rule = Self {
            pattern: pattern.into(),
            access,
            matcher: None,
        };
        rule.compile();
        rule
    }

    fn compile(&mut self) {
        self.matcher = compile_pattern(&self.pattern);
    }

    pub fn matches(&self, path: &str) -> bool {
        match &self.matcher {
            Some(regex) => regex.is_match(path),
            // Uncompiled (hand-built via serde): fall back to literal match.
            None => self.pattern == path,
        }
    }
}

/// Translate `/a/:b/c` into an anchored regex. Literal segments are escaped,
/// so in practice every pattern string compiles.
fn compile_pattern(pattern: &str) -> Option<Regex> {
    let mut expr = String::from("^");
    for (i, segment) in pattern.split('/').enumerate() {
        if i > 0 {
            expr.push('/');
        }
        if segment.starts_with(':') && segment.len() > 1 {
            expr.push_str("[^/]+");
        } else {
            expr.push_str(&regex::escape(segment));
        }
    }
    expr.push('$');
    match Regex::new(&expr) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "Route pattern failed to compile");
            None
        }
    }
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum RouteConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

// ==============================
// Table
// ==============================

/// Ordered rule list plus the two redirect targets. First matching rule wins;
/// an unmatched path redirects to `landing_path` (whose own rule then applies
/// on the follow-up decision).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTable {
    #[serde(default)]
    pub rules: Vec<RouteRule>,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
}

fn default_login_path() -> String {
    "/login".into()
}

fn default_landing_path() -> String {
    "/home".into()
}

static CONSOLE_ROUTES: Lazy<RouteTable> = Lazy::new(|| {
    RouteTable::with_rules(vec![
        ("/login", RouteAccess::Public),
        ("/home", RouteAccess::Authenticated),
        ("/products", RouteAccess::Authenticated),
        ("/product/:id", RouteAccess::Authenticated),
        ("/admin/users", RouteAccess::Role("admin".into())),
        ("/admin/products", RouteAccess::Role("admin".into())),
    ])
});

impl Default for RouteTable {
    fn default() -> Self {
        RouteTable::console().clone()
    }
}

impl RouteTable {
    /// The built-in admin console table.
    pub fn console() -> &'static RouteTable {
        &CONSOLE_ROUTES
    }

    pub fn with_rules(rules: Vec<(&str, RouteAccess)>) -> Self {
        let rules = rules
            .into_iter()
            .map(|(pattern, access)| RouteRule::new(pattern, access))
            .collect();
        Self {
            rules,
            login_path: default_login_path(),
            landing_path: default_landing_path(),
        }
    }

    /// Parse a table from YAML and compile every pattern.
    pub fn from_yaml_str(text: &str) -> Result<Self, RouteConfigError> {
        let mut table: RouteTable = serde_yaml::from_str(text)?;
        for rule in &mut table.rules {
            rule.compile();
        }
        debug!(rules = table.rules.len(), "Loaded route table");
        Ok(table)
    }

    pub fn from_yaml_file(path: &str) -> Result<Self, RouteConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Decide what to do with a navigation to `path` given the session state.
    pub fn decide(&self, path: &str, session: &SessionState) -> RouteDecision {
        let path = normalize_path(path);

        if matches!(
            session,
            SessionState::Uninitialized | SessionState::Bootstrapping
        ) {
            return RouteDecision::Hold;
        }

        let Some(rule) = self.rules.iter().find(|r| r.matches(path)) else {
            return RouteDecision::Redirect(self.landing_path.clone());
        };

        match (&rule.access, session) {
            (RouteAccess::Public, _) => RouteDecision::Render,
            (RouteAccess::Authenticated, SessionState::Authenticated(_)) => RouteDecision::Render,
            (RouteAccess::Authenticated, _) => RouteDecision::Redirect(self.login_path.clone()),
            (RouteAccess::Role(role), SessionState::Authenticated(profile)) => {
                if profile.roles.iter().any(|r| r == role) {
                    RouteDecision::Render
                } else {
                    RouteDecision::Redirect(self.landing_path.clone())
                }
            }
            (RouteAccess::Role(_), _) => RouteDecision::Redirect(self.login_path.clone()),
        }
    }
}

/// Trailing slashes are not significant (except for the root itself).
fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}
