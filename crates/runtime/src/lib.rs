//! Universe/Computer/Component lifecycle and dispatch machinery for the
//! NeoNucleus emulator substrate.

pub mod architecture;
pub mod callframe;
pub mod component;
pub mod computer;
pub mod device_info;
pub mod method;
pub mod resources;
pub mod signal;
pub mod universe;

pub use architecture::Architecture;
pub use callframe::CallFrame;
pub use component::Component;
pub use computer::{Computer, ComputerState};
pub use device_info::{DeviceInfo, DeviceInfoList};
pub use method::{ComponentContext, ComponentHandler, Method, MethodFlags, MethodTable};
pub use resources::ResourceAccounting;
pub use signal::{Signal, SignalQueue};
pub use universe::Universe;
