//! The adapter through which a guest interpreter is plugged into a Computer.
//!
//! Grounded on `examples/original_source/rewrite/neonucleus.h`'s
//! `nn_Architecture`/`nn_ArchitectureAction` (INIT/DEINIT/TICK/FREEMEM),
//! re-expressed as a Rust trait rather than a struct of function pointers
//! plus an action enum, per SPEC_FULL.md §9's "per-instance opaque state
//! blobs" guidance.

use nn_core::NnResult;

use crate::computer::Computer;

/// A pluggable guest interpreter, addressed by name within a Universe.
///
/// Implementors own whatever per-computer interpreter state they need;
/// this workspace does not prescribe a representation for it, matching the
/// "concrete guest interpreters are out of scope" note in SPEC_FULL.md §1.
pub trait Architecture: Send {
    /// The name this architecture is registered and selected under.
    fn name(&self) -> &str;

    /// Dispatches `ARCH_INIT`: called once, the tick a Computer leaves
    /// BOOTUP. An `Err` here moves the Computer straight to CRASHED.
    fn init(&mut self, computer: &mut Computer) -> NnResult<()>;

    /// Dispatches `ARCH_TICK`: called every tick while RUNNING. An `Err`
    /// here moves the Computer to CRASHED and no further ticks run.
    fn tick(&mut self, computer: &mut Computer) -> NnResult<()>;

    /// Dispatches `ARCH_DEINIT`: called once when the Computer is torn down
    /// or switching away from this architecture.
    fn deinit(&mut self, _computer: &mut Computer) {}

    /// Dispatches `ARCH_FREEMEM`: an out-of-band query answering guest
    /// memory-introspection calls. Default: report zero used, matching an
    /// architecture that does not track memory.
    fn memory_used(&self) -> u64 {
        0
    }

    /// Produces the opaque persisted-state blob for `serialize`. The core
    /// never interprets this.
    fn serialize(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Restores from a blob previously produced by `serialize`.
    fn deserialize(&mut self, _blob: &[u8]) -> NnResult<()> {
        Ok(())
    }
}
