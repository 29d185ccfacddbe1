//! Registry configuration

/// What to do when a participant registers under an id that is already live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateIdPolicy {
    /// Replace the existing entry and hand the superseded connection back to
    /// the caller
    #[default]
    Replace,
    /// Refuse the new registration and keep the existing entry
    Reject,
}

/// Registry configuration options
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Collision handling for `register`
    pub duplicate_policy: DuplicateIdPolicy,
}

impl RegistryConfig {
    /// Set the duplicate id policy
    pub fn duplicate_policy(mut self, policy: DuplicateIdPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_replaces() {
        assert_eq!(
            RegistryConfig::default().duplicate_policy,
            DuplicateIdPolicy::Replace
        );
    }

    #[test]
    fn test_builder_policy() {
        let config = RegistryConfig::default().duplicate_policy(DuplicateIdPolicy::Reject);
        assert_eq!(config.duplicate_policy, DuplicateIdPolicy::Reject);
    }
}
