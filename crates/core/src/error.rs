//! Exit codes: the structural error taxonomy shared by every crate in this workspace.

use thiserror::Error;

/// Structural failure codes returned up the call chain.
///
/// These map 1:1 onto the exit taxonomy of the emulator substrate: every
/// fallible core operation either succeeds or fails with exactly one of
/// these. Domain errors (bad argument, no such method, incorrect checksum)
/// are *not* represented here — they travel as `(nil, message)` return
/// pairs written into a `CallFrame`, never as a Rust `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Exit {
    #[error("out of memory")]
    NoMem,
    #[error("over the limit")]
    Limit,
    #[error("stack underflow")]
    BelowStack,
    #[error("stack overflow")]
    NoStack,
    #[error("bad invocation")]
    BadCall,
    #[error("bad state")]
    BadState,
}

impl Exit {
    /// The fixed human-readable message installed into a Computer's error
    /// buffer by `setErrorFromExit`. `BadCall` is deliberately excluded from
    /// callers of this — its message is whatever the handler set explicitly.
    pub fn canonical_message(self) -> &'static str {
        match self {
            Exit::NoMem => "out of memory",
            Exit::Limit => "over the limit",
            Exit::BelowStack => "stack underflow",
            Exit::NoStack => "stack overflow",
            Exit::BadCall => "bad call",
            Exit::BadState => "bad state",
        }
    }
}

/// Result alias used throughout the workspace for structural failures.
pub type NnResult<T> = Result<T, Exit>;
