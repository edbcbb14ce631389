//! Utility macros shared across the crate.

/// Returns early with an error if a condition is not met.
///
/// Like `assert!`, but yields `Err($error)` instead of panicking, which keeps
/// precondition checks on the error path of the caller.
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
