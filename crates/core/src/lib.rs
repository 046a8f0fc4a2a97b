//! Core primitives for the NeoNucleus emulator substrate: the host-injected
//! [`Context`](context::Context), the polymorphic [`Value`](value::Value)
//! system, the structural [`Exit`](error::Exit) error taxonomy, and a
//! handful of pure helper functions (CRC32, path simplification, text
//! width) shared by every peripheral adapter.

pub mod constants;
pub mod context;
pub mod crc32;
pub mod error;
pub mod path;
pub mod unicode;
pub mod value;

pub use context::{Clock, Context, Lock, LockFactory, Rng};
pub use error::{Exit, NnResult};
pub use value::Value;
