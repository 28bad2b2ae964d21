//! Utility macros used across the crate.

/// Returns early with an error if a condition is not met.
///
/// This is similar to `assert!`, but returns an error instead of panicking,
/// which makes it the tool of choice for validating configuration and
/// wire input.
///
/// ```ignore
/// ensure!(capacity > 0, ConfigError::zero_capacity("queue_capacity"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
