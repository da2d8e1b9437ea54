//! services/api/src/adapters/policy.rs
//!
//! A static role/path/method table implementing the `PolicyEnforcer` port.
//!
//! The table is a CSV file of `p, <role>, <path>, <method>` lines. Blank lines
//! and lines starting with `#` are ignored. A path ending in `*` matches any
//! route template with that prefix, and a method of `*` matches every method.

use shop_core::domain::UserRole;
use shop_core::ports::PolicyEnforcer;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy file {0}: {1}")]
    Io(String, std::io::Error),
    #[error("malformed policy at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    fn parse(raw: &str) -> Self {
        match raw.strip_suffix('*') {
            Some(prefix) => PathPattern::Prefix(prefix.to_string()),
            None => PathPattern::Exact(raw.to_string()),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(expected) => expected == path,
            PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PolicyRule {
    role: UserRole,
    path: PathPattern,
    /// `None` is the `*` wildcard.
    method: Option<String>,
}

impl PolicyRule {
    fn allows(&self, role: UserRole, path: &str, method: &str) -> bool {
        self.role == role
            && self.path.matches(path)
            && self
                .method
                .as_deref()
                .map_or(true, |m| m.eq_ignore_ascii_case(method))
    }
}

/// Deny-by-default: a request is allowed only when some rule grants it.
#[derive(Debug, Clone, Default)]
pub struct PolicyTable {
    rules: Vec<PolicyRule>,
}

impl PolicyTable {
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PolicyError::Io(path.display().to_string(), e))?;
        Self::from_csv(&raw)
    }

    pub fn from_csv(raw: &str) -> Result<Self, PolicyError> {
        let mut rules = Vec::new();
        for (index, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let malformed = |reason: String| PolicyError::Malformed {
                line: index + 1,
                reason,
            };

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let [kind, role, path, method] = fields.as_slice() else {
                return Err(malformed(format!("expected 4 fields, found {}", fields.len())));
            };
            if *kind != "p" {
                return Err(malformed(format!("unknown rule kind '{}'", kind)));
            }
            let role = role
                .parse::<UserRole>()
                .map_err(|_| malformed(format!("unknown role '{}'", role)))?;
            if !path.starts_with('/') {
                return Err(malformed(format!("path '{}' must start with '/'", path)));
            }

            rules.push(PolicyRule {
                role,
                path: PathPattern::parse(path),
                method: (*method != "*").then(|| method.to_ascii_uppercase()),
            });
        }
        Ok(Self { rules })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl PolicyEnforcer for PolicyTable {
    fn enforce(&self, role: UserRole, path: &str, method: &str) -> bool {
        self.rules.iter().any(|rule| rule.allows(role, path, method))
    }
}
