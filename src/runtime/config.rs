use std::env;

/// Environment variable overriding [`RuntimeConfig::reference_budget`].
pub const REFERENCE_BUDGET_VAR: &str = "NATIVE_BRIDGE_REFERENCE_BUDGET";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Most class handles the cache keeps pinned at once. Zero disables the
    /// class table.
    pub reference_budget: usize,
}

impl RuntimeConfig {
    pub const DEFAULT_REFERENCE_BUDGET: usize = 1500;

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = env::var(REFERENCE_BUDGET_VAR) {
            match value.trim().parse() {
                Ok(budget) => config.reference_budget = budget,
                Err(err) => log::warn!(
                    "ignoring {REFERENCE_BUDGET_VAR}={value:?}: {err}, using {}",
                    config.reference_budget
                ),
            }
        }
        config
    }

    pub fn with_reference_budget(mut self, reference_budget: usize) -> Self {
        self.reference_budget = reference_budget;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            reference_budget: Self::DEFAULT_REFERENCE_BUDGET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_builder() {
        assert_eq!(RuntimeConfig::default().reference_budget, 1500);
        assert_eq!(
            RuntimeConfig::default()
                .with_reference_budget(3)
                .reference_budget,
            3
        );
    }
}
