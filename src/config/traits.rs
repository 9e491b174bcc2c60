/// Config validator for checking configuration consistency.
pub trait ConfigValidator: Send + Sync {
    /// Validate a configuration, returning a list of warnings/errors.
    fn validate(&self, config: &super::Config) -> Vec<ConfigIssue>;
    /// Return the validator name.
    fn name(&self) -> &str;
}

/// Severity level for configuration issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueSeverity {
    Warning,
    Error,
}

/// A single configuration issue found during validation.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigIssueSeverity,
    pub field: String,
    pub message: String,
}
