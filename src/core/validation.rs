use std::fmt;

/// Represents an issue found during a registration pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A hard error: the unit must not be scheduled.
    Error(String),
    /// A warning: the unit can run, but something looks off.
    Warning(String),
}

impl ValidationIssue {
    pub fn message(&self) -> &str {
        match self {
            ValidationIssue::Error(msg) | ValidationIssue::Warning(msg) => msg,
        }
    }
}

/// The result of a registration pass over one unit or a whole tree of units.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, msg: impl Into<String>) {
        self.issues.push(ValidationIssue::Error(msg.into()));
    }

    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.issues.push(ValidationIssue::Warning(msg.into()));
    }

    /// Appends every issue of `other`, keeping their order.
    pub fn merge(&mut self, other: &ValidationResult) {
        self.issues.extend(other.issues.iter().cloned());
    }

    pub fn is_safe(&self) -> bool {
        !self.issues.iter().any(|i| matches!(i, ValidationIssue::Error(_)))
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| matches!(i, ValidationIssue::Warning(_)))
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().filter_map(|i| match i {
            ValidationIssue::Error(msg) => Some(msg.as_str()),
            ValidationIssue::Warning(_) => None,
        })
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn log_summary(&self) {
        if self.is_safe() && !self.has_warnings() {
            log::info!("Registration passed: every unit is fully configured.");
            return;
        }

        for issue in &self.issues {
            match issue {
                ValidationIssue::Error(msg) => log::error!("validation error: {}", msg),
                ValidationIssue::Warning(msg) => log::warn!("validation warning: {}", msg),
            }
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.issues.iter().map(ValidationIssue::message).collect();
        write!(f, "{}", messages.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_make_result_unsafe() {
        let mut result = ValidationResult::new();
        assert!(result.is_safe());

        result.add_warning("odd but fine");
        assert!(result.is_safe());
        assert!(result.has_warnings());

        result.add_error("Func is required.");
        assert!(!result.is_safe());
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors().collect::<Vec<_>>(), vec!["Func is required."]);
    }

    #[test]
    fn test_display_joins_messages() {
        let mut result = ValidationResult::new();
        result.add_error("a");
        result.add_error("b");
        assert_eq!(result.to_string(), "a; b");
    }

    #[test]
    fn test_merge_keeps_order() {
        let mut first = ValidationResult::new();
        first.add_error("first");
        let mut second = ValidationResult::new();
        second.add_warning("second");

        first.merge(&second);
        assert_eq!(first.issues.len(), 2);
        assert_eq!(first.issues[1], ValidationIssue::Warning("second".into()));
    }
}
