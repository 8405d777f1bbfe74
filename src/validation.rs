//! Advisory argument validation.
//!
//! Action definitions may check their arguments before a caller decides to
//! run them. Checks use stillwater's `Validation`, so every failing check is
//! reported at once instead of stopping at the first one.
//!
//! # Example
//!
//! ```rust
//! use modeler::validation::{ArgumentError, ValidationRules};
//!
//! let rules = ValidationRules::<(String, u32)>::new()
//!     .require_pred("name", |(name, _)| !name.is_empty(), "must not be empty")
//!     .require_pred("quantity", |(_, quantity)| *quantity > 0, "must be positive");
//!
//! let errors = rules.errors(&(String::new(), 0));
//! assert_eq!(errors.len(), 2);
//! assert_eq!(errors[0], ArgumentError::new("name", "must not be empty"));
//! ```

use serde::{Deserialize, Serialize};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// One failed argument check.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Invalid argument {argument}: {message}")]
pub struct ArgumentError {
    pub argument: String,
    pub message: String,
}

impl ArgumentError {
    pub fn new(argument: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            message: message.into(),
        }
    }
}

/// Result of validating an argument list.
pub type ArgumentValidation = Validation<(), NonEmptyVec<ArgumentError>>;

/// Type alias for argument check functions
pub type ArgumentCheck<A> = Box<dyn Fn(&A) -> ArgumentValidation + Send + Sync>;

/// Succeeds when `condition` holds, fails with one error otherwise.
pub fn ensure(
    condition: bool,
    argument: impl Into<String>,
    message: impl Into<String>,
) -> ArgumentValidation {
    if condition {
        Validation::success(())
    } else {
        Validation::fail(ArgumentError::new(argument, message))
    }
}

/// Combine checks, accumulating ALL failures.
pub fn collect(checks: Vec<ArgumentValidation>) -> ArgumentValidation {
    Validation::all_vec(checks).map(|_| ())
}

/// Flatten a validation into the list of its failures.
pub fn into_errors(validation: ArgumentValidation) -> Vec<ArgumentError> {
    match validation {
        Validation::Success(()) => Vec::new(),
        Validation::Failure(errors) => errors.iter().cloned().collect(),
    }
}

/// A reusable set of checks over one argument type.
pub struct ValidationRules<A> {
    checks: Vec<ArgumentCheck<A>>,
}

impl<A> ValidationRules<A> {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Add a custom validation check
    pub fn require<F>(mut self, check: F) -> Self
    where
        F: Fn(&A) -> ArgumentValidation + Send + Sync + 'static,
    {
        self.checks.push(Box::new(check));
        self
    }

    /// Add a predicate check on one named argument
    pub fn require_pred<F>(
        mut self,
        argument: impl Into<String>,
        predicate: F,
        message: impl Into<String>,
    ) -> Self
    where
        F: Fn(&A) -> bool + Send + Sync + 'static,
    {
        let argument = argument.into();
        let message = message.into();
        self.checks.push(Box::new(move |args: &A| {
            ensure(predicate(args), argument.clone(), message.clone())
        }));
        self
    }

    /// Run every check against `args`.
    pub fn validate(&self, args: &A) -> ArgumentValidation {
        collect(self.checks.iter().map(|check| check(args)).collect())
    }

    /// Run every check and list the failures.
    pub fn errors(&self, args: &A) -> Vec<ArgumentError> {
        into_errors(self.validate(args))
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl<A> Default for ValidationRules<A> {
    fn default() -> Self {
        Self::new()
    }
}
