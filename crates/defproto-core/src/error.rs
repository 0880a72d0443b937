//! The single failure mode of a descriptor conversion.
//!
//! Every allocation a conversion makes is charged to the caller's [`Arena`];
//! when the arena reports exhaustion, the whole conversion is abandoned. No
//! other runtime error exists in this subsystem: malformed input (a dangling
//! handle, a default value naming a missing enum constant) is a caller
//! contract violation and asserts instead of returning an error.
//!
//! [`Arena`]: crate::Arena

use thiserror::Error;

/// Result type alias threaded through every internal converter.
pub type Result<T> = std::result::Result<T, ArenaExhausted>;

/// The arena backing a conversion could not satisfy an allocation.
///
/// This error unwinds straight from the failing allocation site to the entry
/// point that started the conversion, which surfaces it to the caller as an
/// absent result. Partially built output is abandoned in place.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("descriptor conversion aborted: arena allocation failed")]
pub struct ArenaExhausted;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArenaExhausted;
        assert!(err.to_string().contains("arena allocation failed"));
    }
}
