//! DiskDrive: a slot peripheral that holds (at most) one removable
//! floppy-shaped Filesystem component.
//!
//! Grounded on `examples/original_source/src/components/diskDrive.c`
//! (`isEmpty`/`eject`/`media`, eject taking an optional "velocity" that
//! this in-memory backend records but does not otherwise act on).

use std::any::Any;

use nn_core::{NnResult, Value};
use nn_runtime::{ComponentContext, ComponentHandler, Method};

use crate::support::{arg_int_or, fail};

const METHODS: &[Method] = &[
    Method::direct("isEmpty", "boolean"),
    Method::indirect("eject", "(velocity:number=0):boolean; false if already empty"),
    Method::direct("media", "string; the inserted floppy's component address, or nil"),
];

struct DiskDriveState {
    media_address: Option<String>,
    last_eject_velocity: i64,
}

/// Volatile DiskDrive backend. `insert`/`media_address` are plain Rust
/// methods rather than CALL-dispatched ones: inserting media is a host/
/// world action (placing a floppy item in the drive), not something the
/// guest computer invokes on itself.
pub struct DiskDriveHandler {
    initial_media: Option<String>,
}

impl DiskDriveHandler {
    pub fn empty() -> Self {
        DiskDriveHandler { initial_media: None }
    }

    pub fn with_media(address: impl Into<String>) -> Self {
        DiskDriveHandler {
            initial_media: Some(address.into()),
        }
    }
}

impl ComponentHandler for DiskDriveHandler {
    fn type_name(&self) -> &str {
        "disk_drive"
    }

    fn methods(&self) -> &[Method] {
        METHODS
    }

    fn init(&self, _cx: &mut ComponentContext) -> NnResult<Box<dyn Any + Send>> {
        Ok(Box::new(DiskDriveState {
            media_address: self.initial_media.clone(),
            last_eject_velocity: 0,
        }))
    }

    fn call(
        &self,
        state: &mut (dyn Any + Send),
        method: &str,
        cx: &mut ComponentContext,
    ) -> NnResult<()> {
        let state = state.downcast_mut::<DiskDriveState>().expect("disk drive state");

        match method {
            "isEmpty" => {
                cx.frame.push_return(Value::boolean(state.media_address.is_none()));
            }
            "eject" => {
                state.last_eject_velocity = arg_int_or(cx, 0, 0);
                match state.media_address.take() {
                    Some(_) => {
                        cx.charge_component(1.0, 16.0);
                        cx.frame.push_return(Value::boolean(true));
                    }
                    None => cx.frame.push_return(Value::boolean(false)),
                }
            }
            "media" => match &state.media_address {
                Some(address) => cx.frame.push_return(Value::string(address.clone())),
                None => cx.frame.push_return(Value::Nil),
            },
            _ => return fail(cx, "no such method"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nn_runtime::{CallFrame, ResourceAccounting, SignalQueue};

    fn call(
        handler: &DiskDriveHandler,
        state: &mut (dyn Any + Send),
        method: &str,
        args: Vec<Value>,
    ) -> CallFrame {
        let mut frame = CallFrame::new(32, 32, 256);
        for a in args {
            frame.add_argument(a);
        }
        let mut resources = ResourceAccounting::new(100.0, 30.0, 256.0);
        let mut signals = SignalQueue::new(32, 32, 8192);
        let mut budget = 0.0;
        let mut cx = ComponentContext {
            frame: &mut frame,
            resources: &mut resources,
            signals: &mut signals,
            component_budget: &mut budget,
            address: "disk-drive-0",
        };
        handler.call(state, method, &mut cx).unwrap();
        frame
    }

    #[test]
    fn eject_empties_the_drive_once() {
        let handler = DiskDriveHandler::with_media("floppy-1");
        let mut frame = CallFrame::new(32, 32, 256);
        let mut resources = ResourceAccounting::new(100.0, 30.0, 256.0);
        let mut signals = SignalQueue::new(32, 32, 8192);
        let mut budget = 0.0;
        let mut cx = ComponentContext {
            frame: &mut frame,
            resources: &mut resources,
            signals: &mut signals,
            component_budget: &mut budget,
            address: "disk-drive-0",
        };
        let mut state = handler.init(&mut cx).unwrap();

        let frame = call(&handler, state.as_mut(), "isEmpty", vec![]);
        assert!(!frame.get_return(0).to_boolean());

        let frame = call(&handler, state.as_mut(), "eject", vec![]);
        assert!(frame.get_return(0).to_boolean());

        let frame = call(&handler, state.as_mut(), "eject", vec![]);
        assert!(!frame.get_return(0).to_boolean());

        let frame = call(&handler, state.as_mut(), "media", vec![]);
        assert!(frame.get_return(0).is_nil());
    }
}
