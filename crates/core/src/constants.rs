//! Named limits shared across the workspace.
//!
//! These mirror the constants table of the emulated machine. The workspace
//! standardizes on the legacy (non-rewrite) limits where the two historical
//! variants disagreed; see DESIGN.md for the reasoning.

pub const KIB: u64 = 1024;
pub const MIB: u64 = 1024 * KIB;
pub const GIB: u64 = 1024 * MIB;

pub const NN_MAX_STACK: usize = 256;
pub const NN_MAX_PATH: usize = 256;
pub const NN_MAX_READ: usize = 65536;
pub const NN_MAX_OPENFILES: usize = 128;
pub const NN_MAX_SIGNAL_SIZE: usize = 8192;
pub const NN_MAX_SIGNALS: usize = 32;
pub const NN_MAX_SIGNAL_VALS: usize = 32;
pub const NN_MAX_PORT: u16 = 65535;
pub const NN_PORT_CLOSEALL: u16 = 0;
pub const NN_MAX_ARCHITECTURES: usize = 16;
pub const NN_TUNNEL_PORT: u16 = 0;
pub const NN_MAX_UNICODE_BUFFER: usize = 4;
pub const NN_MAX_ERROR_SIZE: usize = 1024;
pub const NN_LABEL_SIZE: usize = 128;
pub const NN_OVERHEAT_MIN: f64 = 100.0;
pub const NN_CALL_COST: f64 = 1.0;
pub const NN_INDIRECT_CALL_LATENCY: f64 = 0.05;
pub const NN_MAX_ARGS: usize = 32;
pub const NN_MAX_RETS: usize = 32;
pub const NN_MAX_METHODS: usize = 32;
pub const NN_MAX_USERS: usize = 128;
pub const NN_MAX_USERNAME: usize = 128;
pub const NN_MAX_USERDATA: usize = 64;
pub const NN_COMPONENT_CALLBUDGET: f64 = 1.0;
pub const NN_MAX_SCREEN_KEYBOARDS: usize = 16;

/// Runtime-overridable subset of the constants above, for hosts that need
/// a different ceiling than the compiled-in defaults (e.g. a test harness
/// exercising LIMIT paths with a tiny signal queue).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-types", derive(serde::Serialize, serde::Deserialize))]
pub struct Limits {
    pub max_stack: usize,
    pub max_signals: usize,
    pub max_signal_vals: usize,
    pub max_signal_size: usize,
    pub max_architectures: usize,
    pub max_users: usize,
    pub max_args: usize,
    pub max_rets: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_stack: NN_MAX_STACK,
            max_signals: NN_MAX_SIGNALS,
            max_signal_vals: NN_MAX_SIGNAL_VALS,
            max_signal_size: NN_MAX_SIGNAL_SIZE,
            max_architectures: NN_MAX_ARCHITECTURES,
            max_users: NN_MAX_USERS,
            max_args: NN_MAX_ARGS,
            max_rets: NN_MAX_RETS,
        }
    }
}
