use std::collections::{BTreeSet, HashMap};

use axum::http::Method;
use thiserror::Error;

/// Per-resource declaration of which actions exist and how requests map to
/// them. Immutable once built; every resource handler supplies one.
///
/// Invariants enforced at build time:
/// - verb mappings and the default action must name allowed actions
/// - protected actions are a subset of allowed actions
/// - a verb may be mapped at most once (a duplicate declaration would
///   otherwise silently shadow the earlier one)
#[derive(Debug, Clone)]
pub struct Capabilities {
    allowed_actions: BTreeSet<String>,
    verb_to_action: HashMap<Method, String>,
    default_action: Option<String>,
    protected_actions: BTreeSet<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CapabilityError {
    #[error("at least one allowed action is required")]
    Empty,

    #[error("duplicate mapping for HTTP verb {0}")]
    DuplicateVerb(Method),

    #[error("verb {verb} maps to '{action}' which is not an allowed action")]
    VerbActionNotAllowed { verb: Method, action: String },

    #[error("default action '{0}' is not an allowed action")]
    DefaultNotAllowed(String),

    #[error("protected action '{0}' is not an allowed action")]
    ProtectedNotAllowed(String),
}

impl Capabilities {
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder::default()
    }

    pub fn is_allowed(&self, action: &str) -> bool {
        self.allowed_actions.contains(action)
    }

    pub fn is_protected(&self, action: &str) -> bool {
        self.protected_actions.contains(action)
    }

    pub fn action_for_verb(&self, verb: &Method) -> Option<&str> {
        self.verb_to_action.get(verb).map(String::as_str)
    }

    pub fn default_action(&self) -> Option<&str> {
        self.default_action.as_deref()
    }

    /// Allowed actions in stable (sorted) order, for error hints.
    pub fn allowed_list(&self) -> Vec<String> {
        self.allowed_actions.iter().cloned().collect()
    }
}

#[derive(Debug, Default)]
pub struct CapabilitiesBuilder {
    allowed: Vec<String>,
    verbs: Vec<(Method, String)>,
    default_action: Option<String>,
    protected: Vec<String>,
}

impl CapabilitiesBuilder {
    pub fn allow(mut self, action: impl Into<String>) -> Self {
        self.allowed.push(action.into());
        self
    }

    pub fn verb(mut self, verb: Method, action: impl Into<String>) -> Self {
        self.verbs.push((verb, action.into()));
        self
    }

    pub fn default_action(mut self, action: impl Into<String>) -> Self {
        self.default_action = Some(action.into());
        self
    }

    pub fn protect(mut self, action: impl Into<String>) -> Self {
        self.protected.push(action.into());
        self
    }

    pub fn build(self) -> Result<Capabilities, CapabilityError> {
        let allowed_actions: BTreeSet<String> = self.allowed.into_iter().collect();
        if allowed_actions.is_empty() {
            return Err(CapabilityError::Empty);
        }

        let mut verb_to_action = HashMap::new();
        for (verb, action) in self.verbs {
            if !allowed_actions.contains(&action) {
                return Err(CapabilityError::VerbActionNotAllowed { verb, action });
            }
            if verb_to_action.insert(verb.clone(), action).is_some() {
                return Err(CapabilityError::DuplicateVerb(verb));
            }
        }

        if let Some(default) = &self.default_action {
            if !allowed_actions.contains(default) {
                return Err(CapabilityError::DefaultNotAllowed(default.clone()));
            }
        }

        let mut protected_actions = BTreeSet::new();
        for action in self.protected {
            if !allowed_actions.contains(&action) {
                return Err(CapabilityError::ProtectedNotAllowed(action));
            }
            protected_actions.insert(action);
        }

        Ok(Capabilities {
            allowed_actions,
            verb_to_action,
            default_action: self.default_action,
            protected_actions,
        })
    }
}
