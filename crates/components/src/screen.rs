//! Screen: a shared rectangular character buffer a GPU can bind to.
//!
//! Grounded on `examples/original_source/src/components/screen.c` and
//! `screen.h` (buffer dimensions/viewport, per-cell `(codepoint, fg, bg,
//! isFgPalette, isBgPalette)`, associated keyboards, power/precise/
//! inverted-touch flags, dirty bit). The reference implementation reaches
//! a Screen from a GPU through a shared void-pointer; this workspace
//! models that as a process-wide `Arc<parking_lot::Mutex<ScreenBuffer>>>`
//! registry keyed by address (§5's "Screen objects when multiple GPUs
//! could race" resolution), since `ComponentHandler::call` only receives
//! its own instance's state, never another component's.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use nn_core::constants::NN_MAX_SCREEN_KEYBOARDS;
use nn_core::{NnResult, Value};
use nn_runtime::{ComponentContext, ComponentHandler, Method};
use tracing::debug;

use crate::support::{arg_bool_or, fail};

#[derive(Debug, Clone, Copy)]
pub struct Cell {
    pub codepoint: char,
    pub fg: i32,
    pub bg: i32,
    pub is_fg_palette: bool,
    pub is_bg_palette: bool,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            codepoint: ' ',
            fg: 0xFFFFFF,
            bg: 0x000000,
            is_fg_palette: false,
            is_bg_palette: false,
        }
    }
}

/// The shared, mutable buffer backing one Screen component. Reachable both
/// from the owning Screen handler and from any GPU bound to it, via
/// [`lookup`].
pub struct ScreenBuffer {
    pub width: i32,
    pub height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub cells: Vec<Cell>,
    pub keyboards: Vec<String>,
    pub is_on: bool,
    pub is_precise: bool,
    pub is_touch_mode_inverted: bool,
    pub dirty: bool,
    pub bound_gpu: Option<String>,
}

impl ScreenBuffer {
    pub fn new(max_width: i32, max_height: i32) -> Self {
        let mut buffer = ScreenBuffer {
            width: max_width,
            height: max_height,
            max_width,
            max_height,
            cells: Vec::new(),
            keyboards: Vec::new(),
            is_on: true,
            is_precise: false,
            is_touch_mode_inverted: false,
            dirty: false,
            bound_gpu: None,
        };
        buffer.resize_cells();
        buffer
    }

    fn resize_cells(&mut self) {
        let count = (self.width.max(0) as usize) * (self.height.max(0) as usize);
        self.cells = vec![Cell::default(); count];
    }

    pub fn index(&self, x0: i32, y0: i32) -> Option<usize> {
        if x0 < 0 || y0 < 0 || x0 >= self.width || y0 >= self.height {
            return None;
        }
        Some((y0 as usize) * (self.width as usize) + (x0 as usize))
    }

    pub fn set_resolution(&mut self, width: i32, height: i32) -> bool {
        if width < 1 || height < 1 || width > self.max_width || height > self.max_height {
            return false;
        }
        if width == self.width && height == self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.resize_cells();
        self.dirty = true;
        true
    }
}

type Registry = Lazy<Mutex<HashMap<String, Arc<Mutex<ScreenBuffer>>>>>;
static SCREENS: Registry = Lazy::new(|| Mutex::new(HashMap::new()));

pub fn register(address: &str, buffer: Arc<Mutex<ScreenBuffer>>) {
    debug!(address, "screen registered");
    SCREENS.lock().insert(address.to_string(), buffer);
}

pub fn unregister(address: &str) {
    debug!(address, "screen unregistered");
    SCREENS.lock().remove(address);
}

pub fn lookup(address: &str) -> Option<Arc<Mutex<ScreenBuffer>>> {
    SCREENS.lock().get(address).cloned()
}

const METHODS: &[Method] = &[
    Method::direct("isOn", "boolean"),
    Method::indirect("turnOn", "():boolean; true if this changed the state"),
    Method::indirect("turnOff", "():boolean; true if this changed the state"),
    Method::direct("getKeyboards", "table; addresses of associated keyboards"),
    Method::direct("isPrecise", "boolean"),
    Method::direct("setPrecise", "(enabled:boolean):boolean; previous value"),
    Method::direct("isTouchModeInverted", "boolean"),
    Method::direct("setTouchModeInverted", "(enabled:boolean):boolean; previous value"),
];

struct ScreenState {
    buffer: Arc<Mutex<ScreenBuffer>>,
}

/// Volatile (in-memory) Screen backend.
pub struct ScreenHandler {
    max_width: i32,
    max_height: i32,
}

impl ScreenHandler {
    pub fn new(max_width: i32, max_height: i32) -> Self {
        ScreenHandler { max_width, max_height }
    }
}

impl ComponentHandler for ScreenHandler {
    fn type_name(&self) -> &str {
        "screen"
    }

    fn methods(&self) -> &[Method] {
        METHODS
    }

    fn init(&self, cx: &mut ComponentContext) -> NnResult<Box<dyn Any + Send>> {
        let buffer = Arc::new(Mutex::new(ScreenBuffer::new(self.max_width, self.max_height)));
        register(cx.address, Arc::clone(&buffer));
        Ok(Box::new(ScreenState { buffer }))
    }

    fn deinit(&self, _state: &mut (dyn Any + Send), cx: &mut ComponentContext) {
        unregister(cx.address);
    }

    fn call(
        &self,
        state: &mut (dyn Any + Send),
        method: &str,
        cx: &mut ComponentContext,
    ) -> NnResult<()> {
        let state = state.downcast_mut::<ScreenState>().expect("screen state");
        let mut buffer = state.buffer.lock();

        match method {
            "isOn" => {
                cx.frame.push_return(Value::boolean(buffer.is_on));
            }
            "turnOn" => {
                let changed = !buffer.is_on;
                buffer.is_on = true;
                cx.frame.push_return(Value::boolean(changed));
            }
            "turnOff" => {
                let changed = buffer.is_on;
                buffer.is_on = false;
                cx.frame.push_return(Value::boolean(changed));
            }
            "getKeyboards" => {
                let list = Value::array(buffer.keyboards.len().min(NN_MAX_SCREEN_KEYBOARDS));
                for (i, kb) in buffer
                    .keyboards
                    .iter()
                    .take(NN_MAX_SCREEN_KEYBOARDS)
                    .enumerate()
                {
                    nn_core::value::array_set(&list, i, Value::string(kb.clone()));
                }
                cx.frame.push_return(list);
            }
            "isPrecise" => {
                cx.frame.push_return(Value::boolean(buffer.is_precise));
            }
            "setPrecise" => {
                let previous = buffer.is_precise;
                buffer.is_precise = arg_bool_or(cx, 0, previous);
                cx.frame.push_return(Value::boolean(previous));
            }
            "isTouchModeInverted" => {
                cx.frame.push_return(Value::boolean(buffer.is_touch_mode_inverted));
            }
            "setTouchModeInverted" => {
                let previous = buffer.is_touch_mode_inverted;
                buffer.is_touch_mode_inverted = arg_bool_or(cx, 0, previous);
                cx.frame.push_return(Value::boolean(previous));
            }
            _ => {
                drop(buffer);
                return fail(cx, "no such method");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nn_runtime::{CallFrame, ResourceAccounting, SignalQueue};

    fn call(
        handler: &ScreenHandler,
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
            address: "screen-test-turn",
        };
        handler.call(state, method, &mut cx).unwrap();
        frame
    }

    #[test]
    fn turn_off_then_on_reports_change() {
        let handler = ScreenHandler::new(80, 25);
        let mut frame = CallFrame::new(32, 32, 256);
        let mut resources = ResourceAccounting::new(100.0, 30.0, 256.0);
        let mut signals = SignalQueue::new(32, 32, 8192);
        let mut budget = 0.0;
        let mut cx = ComponentContext {
            frame: &mut frame,
            resources: &mut resources,
            signals: &mut signals,
            component_budget: &mut budget,
            address: "screen-test-turn",
        };
        let mut state = handler.init(&mut cx).unwrap();

        let frame = call(&handler, state.as_mut(), "turnOff", vec![]);
        assert!(frame.get_return(0).to_boolean());
        let frame = call(&handler, state.as_mut(), "turnOff", vec![]);
        assert!(!frame.get_return(0).to_boolean());

        handler.deinit(state.as_mut(), &mut cx);
    }

    #[test]
    fn registry_exposes_buffer_to_other_holders() {
        let handler = ScreenHandler::new(50, 16);
        let mut frame = CallFrame::new(32, 32, 256);
        let mut resources = ResourceAccounting::new(100.0, 30.0, 256.0);
        let mut signals = SignalQueue::new(32, 32, 8192);
        let mut budget = 0.0;
        let mut cx = ComponentContext {
            frame: &mut frame,
            resources: &mut resources,
            signals: &mut signals,
            component_budget: &mut budget,
            address: "screen-registry-test",
        };
        let mut state = handler.init(&mut cx).unwrap();
        assert!(lookup("screen-registry-test").is_some());
        handler.deinit(state.as_mut(), &mut cx);
        assert!(lookup("screen-registry-test").is_none());
    }
}
