use std::collections::BTreeSet;

use super::domain::ActorId;
use crate::config::AuthorizationConfig;

/// Capability check supplied by the identity provider.
pub trait AuthorizationProvider: Send + Sync {
    fn is_authorized_reviewer(&self, actor: &ActorId) -> bool;
    fn is_authorized_inspector(&self, actor: &ActorId) -> bool;
}

/// Fixed reviewer and inspector rosters, usually loaded from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticAuthorization {
    reviewers: BTreeSet<ActorId>,
    inspectors: BTreeSet<ActorId>,
}

impl StaticAuthorization {
    pub fn new<R, I>(reviewers: R, inspectors: I) -> Self
    where
        R: IntoIterator<Item = ActorId>,
        I: IntoIterator<Item = ActorId>,
    {
        Self {
            reviewers: reviewers.into_iter().filter(|actor| !actor.is_blank()).collect(),
            inspectors: inspectors
                .into_iter()
                .filter(|actor| !actor.is_blank())
                .collect(),
        }
    }

    pub fn with_reviewer(mut self, actor: impl Into<String>) -> Self {
        self.reviewers.insert(ActorId::new(actor));
        self
    }

    pub fn with_inspector(mut self, actor: impl Into<String>) -> Self {
        self.inspectors.insert(ActorId::new(actor));
        self
    }
}

impl AuthorizationProvider for StaticAuthorization {
    fn is_authorized_reviewer(&self, actor: &ActorId) -> bool {
        self.reviewers.contains(actor)
    }

    fn is_authorized_inspector(&self, actor: &ActorId) -> bool {
        self.inspectors.contains(actor)
    }
}

impl From<&AuthorizationConfig> for StaticAuthorization {
    fn from(config: &AuthorizationConfig) -> Self {
        Self::new(
            config.reviewers.iter().map(ActorId::new),
            config.inspectors.iter().map(ActorId::new),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_rosters_drop_blank_identities() {
        let config = AuthorizationConfig {
            reviewers: vec!["clerk-1".to_string(), "  ".to_string()],
            inspectors: vec!["inspector-9".to_string()],
        };
        let authorization = StaticAuthorization::from(&config);

        assert!(authorization.is_authorized_reviewer(&ActorId::new("clerk-1")));
        assert!(!authorization.is_authorized_reviewer(&ActorId::new("  ")));
        assert!(!authorization.is_authorized_reviewer(&ActorId::new("inspector-9")));
        assert!(authorization.is_authorized_inspector(&ActorId::new("inspector-9")));
    }
}
