//! Concrete ("volatile", in-memory) peripheral adapters for the NeoNucleus
//! emulator substrate: EEPROM, Filesystem, Drive, GPU, Screen, Modem,
//! Tunnel, and DiskDrive.
//!
//! Each module owns one [`nn_runtime::ComponentHandler`] implementation.
//! They are example collaborators, not the only possible backend for a
//! given contract — a host is free to implement its own handler against
//! the same `nn-runtime` traits (e.g. a real-file-backed Filesystem).

pub mod disk_drive;
pub mod drive;
pub mod eeprom;
pub mod filesystem;
pub mod gpu;
pub mod modem;
pub mod palette;
pub mod screen;
pub mod support;
pub mod tunnel;

pub use disk_drive::DiskDriveHandler;
pub use drive::DriveHandler;
pub use eeprom::EepromHandler;
pub use filesystem::{FilesystemHandler, FilesystemTier};
pub use gpu::GpuHandler;
pub use modem::ModemHandler;
pub use screen::ScreenHandler;
pub use tunnel::TunnelHandler;
