//! In-process rules.
//!
//! Each rule inspects one file at a time and reports at most one file-level
//! finding. Rules are looked up by id in a [`RuleRegistry`].

mod line_endings;

pub use line_endings::LineEndings;

use std::collections::HashMap;
use std::path::Path;

use crate::{Finding, LinterError};

/// A rule evaluated inside the linter process.
pub trait FileRule: Send + Sync {
    /// Catalog id the rule is registered under.
    fn id(&self) -> &'static str;

    /// Checks one file.
    ///
    /// The returned finding's severity is overwritten with the catalog
    /// severity by the caller.
    fn check(&self, path: &Path) -> Result<Option<Finding>, LinterError>;
}

/// Rule implementations keyed by id.
#[derive(Default)]
pub struct RuleRegistry {
    rules: HashMap<&'static str, Box<dyn FileRule>>,
}

impl RuleRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in rule.
    pub fn with_builtin_rules() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(LineEndings));
        registry
    }

    /// Registers `rule`, replacing any rule with the same id.
    pub fn register(&mut self, rule: Box<dyn FileRule>) {
        self.rules.insert(rule.id(), rule);
    }

    pub fn get(&self, id: &str) -> Option<&dyn FileRule> {
        self.rules.get(id).map(|rule| rule.as_ref())
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.rules.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
