//! GPU: writes to a bound Screen's character buffer.
//!
//! Grounded on `examples/original_source/src/components/gpu.c` (bind/reset,
//! 1-based coordinates, palette-aware foreground/background, `setResolution`
//! and the palette accessor pair implemented per SPEC_FULL.md §9's
//! resolution of the reference's declared-but-missing methods).

use std::any::Any;

use nn_core::unicode::char_width;
use nn_core::{NnResult, Value};
use nn_runtime::{ComponentContext, ComponentHandler, Method};
use tracing::debug;

use crate::palette::{DEFAULT_PALETTE, PALETTE_SIZE};
use crate::screen::{self, Cell, ScreenBuffer};
use crate::support::{arg_bool_or, arg_int, arg_int_or, arg_string, fail};

const METHODS: &[Method] = &[
    Method::indirect("bind", "(screenAddr:string, reset:boolean=false):boolean"),
    Method::direct("getScreen", "string; bound screen address, or nil"),
    Method::direct("getResolution", "(width:number, height:number)"),
    Method::indirect("setResolution", "(width:number, height:number):boolean"),
    Method::direct("maxResolution", "(width:number, height:number)"),
    Method::direct("getViewport", "(width:number, height:number); no separate viewport, mirrors resolution"),
    Method::direct("getDepth", "number; bits per pixel"),
    Method::indirect("setDepth", "(depth:number):number; previous depth"),
    Method::direct("maxDepth", "number"),
    Method::direct("getForeground", "(color:number, isPalette:boolean)"),
    Method::indirect("setForeground", "(color:number, isPalette:boolean=false):(number, boolean)"),
    Method::direct("getBackground", "(color:number, isPalette:boolean)"),
    Method::indirect("setBackground", "(color:number, isPalette:boolean=false):(number, boolean)"),
    Method::direct("getPaletteColor", "(index:number):number"),
    Method::indirect("setPaletteColor", "(index:number, color:number):number; previous value"),
    Method::indirect("get", "(x:number, y:number):(char, fg, bg, fgIndex, bgIndex)"),
    Method::indirect("set", "(x:number, y:number, value:string, vertical:boolean=false):boolean"),
    Method::indirect("fill", "(x:number, y:number, width:number, height:number, char:string):boolean"),
    Method::indirect("copy", "(x:number, y:number, width:number, height:number, tx:number, ty:number):boolean"),
];

struct GpuState {
    bound: Option<(String, std::sync::Arc<parking_lot::Mutex<ScreenBuffer>>)>,
    foreground: i32,
    fg_is_palette: bool,
    background: i32,
    bg_is_palette: bool,
    depth: i32,
    palette: [i32; PALETTE_SIZE],
}

impl Default for GpuState {
    fn default() -> Self {
        GpuState {
            bound: None,
            foreground: 0xFFFFFF,
            fg_is_palette: false,
            background: 0x000000,
            bg_is_palette: false,
            depth: 4,
            palette: *DEFAULT_PALETTE,
        }
    }
}

/// Volatile GPU backend. `max_depth` is bits per pixel (1, 4, or 8).
pub struct GpuHandler {
    max_depth: i32,
}

impl GpuHandler {
    pub fn new(max_depth: i32) -> Self {
        GpuHandler { max_depth }
    }
}

impl Default for GpuHandler {
    fn default() -> Self {
        GpuHandler::new(8)
    }
}

impl ComponentHandler for GpuHandler {
    fn type_name(&self) -> &str {
        "gpu"
    }

    fn methods(&self) -> &[Method] {
        METHODS
    }

    fn init(&self, _cx: &mut ComponentContext) -> NnResult<Box<dyn Any + Send>> {
        Ok(Box::new(GpuState::default()))
    }

    fn call(
        &self,
        state: &mut (dyn Any + Send),
        method: &str,
        cx: &mut ComponentContext,
    ) -> NnResult<()> {
        let state = state.downcast_mut::<GpuState>().expect("gpu state");

        macro_rules! bound_or_fail {
            () => {
                match &state.bound {
                    Some((_, buf)) => std::sync::Arc::clone(buf),
                    None => return fail(cx, "no screen bound"),
                }
            };
        }

        match method {
            "bind" => {
                let address = arg_string(cx, 0).unwrap_or_default();
                let reset = arg_bool_or(cx, 1, false);
                let buffer = match screen::lookup(&address) {
                    Some(b) => b,
                    None => return fail(cx, "no such screen"),
                };
                {
                    let mut locked = buffer.lock();
                    locked.bound_gpu = Some(address.clone());
                    if reset {
                        let fg = Cell {
                            codepoint: ' ',
                            fg: state.foreground,
                            bg: state.background,
                            is_fg_palette: state.fg_is_palette,
                            is_bg_palette: state.bg_is_palette,
                        };
                        let count = locked.cells.len();
                        locked.cells = vec![fg; count];
                        locked.dirty = true;
                    }
                }
                cx.resources.remove_energy(0.1);
                cx.charge_component(1.0, 64.0);
                debug!(gpu = cx.address, screen = %address, reset, "gpu bound to screen");
                state.bound = Some((address, buffer));
                cx.frame.push_return(Value::boolean(true));
            }
            "getScreen" => match &state.bound {
                Some((address, _)) => cx.frame.push_return(Value::string(address.clone())),
                None => cx.frame.push_return(Value::Nil),
            },
            "getResolution" => {
                let buffer = bound_or_fail!();
                let locked = buffer.lock();
                cx.frame.push_return(Value::int(locked.width as i64));
                cx.frame.push_return(Value::int(locked.height as i64));
            }
            "setResolution" => {
                let buffer = bound_or_fail!();
                let width = arg_int(cx, 0) as i32;
                let height = arg_int(cx, 1) as i32;
                let mut locked = buffer.lock();
                let changed = locked.set_resolution(width, height);
                drop(locked);
                cx.charge_component(1.0, 32.0);
                cx.frame.push_return(Value::boolean(changed));
            }
            "getViewport" => {
                let buffer = bound_or_fail!();
                let locked = buffer.lock();
                cx.frame.push_return(Value::int(locked.width as i64));
                cx.frame.push_return(Value::int(locked.height as i64));
            }
            "maxResolution" => {
                let buffer = bound_or_fail!();
                let locked = buffer.lock();
                cx.frame.push_return(Value::int(locked.max_width as i64));
                cx.frame.push_return(Value::int(locked.max_height as i64));
            }
            "getDepth" => {
                cx.frame.push_return(Value::int(state.depth as i64));
            }
            "setDepth" => {
                let requested = arg_int(cx, 0) as i32;
                if ![1, 4, 8].contains(&requested) || requested > self.max_depth {
                    return fail(cx, "unsupported depth");
                }
                let previous = state.depth;
                state.depth = requested;
                cx.frame.push_return(Value::int(previous as i64));
            }
            "maxDepth" => {
                cx.frame.push_return(Value::int(self.max_depth as i64));
            }
            "getForeground" => {
                cx.frame.push_return(Value::int(state.foreground as i64));
                cx.frame.push_return(Value::boolean(state.fg_is_palette));
            }
            "setForeground" => {
                let color = arg_int(cx, 0) as i32;
                let is_palette = arg_bool_or(cx, 1, false);
                let previous = state.foreground;
                let previous_is_palette = state.fg_is_palette;
                state.foreground = color;
                state.fg_is_palette = is_palette;
                cx.frame.push_return(Value::int(previous as i64));
                cx.frame.push_return(Value::boolean(previous_is_palette));
            }
            "getBackground" => {
                cx.frame.push_return(Value::int(state.background as i64));
                cx.frame.push_return(Value::boolean(state.bg_is_palette));
            }
            "setBackground" => {
                let color = arg_int(cx, 0) as i32;
                let is_palette = arg_bool_or(cx, 1, false);
                let previous = state.background;
                let previous_is_palette = state.bg_is_palette;
                state.background = color;
                state.bg_is_palette = is_palette;
                cx.frame.push_return(Value::int(previous as i64));
                cx.frame.push_return(Value::boolean(previous_is_palette));
            }
            "getPaletteColor" => {
                let index = arg_int(cx, 0) as usize;
                match state.palette.get(index) {
                    Some(color) => cx.frame.push_return(Value::int(*color as i64)),
                    None => return fail(cx, "invalid palette index"),
                }
            }
            "setPaletteColor" => {
                let index = arg_int(cx, 0) as usize;
                let color = arg_int(cx, 1) as i32;
                match state.palette.get_mut(index) {
                    Some(slot) => {
                        let previous = *slot;
                        *slot = color;
                        cx.frame.push_return(Value::int(previous as i64));
                    }
                    None => return fail(cx, "invalid palette index"),
                }
            }
            "get" => {
                let buffer = bound_or_fail!();
                let x = arg_int(cx, 0) as i32 - 1;
                let y = arg_int(cx, 1) as i32 - 1;
                let locked = buffer.lock();
                let index = match locked.index(x, y) {
                    Some(i) => i,
                    None => return fail(cx, "index out of bounds"),
                };
                let cell = locked.cells[index];
                cx.frame.push_return(Value::string(cell.codepoint.to_string()));
                cx.frame.push_return(Value::int(cell.fg as i64));
                cx.frame.push_return(Value::int(cell.bg as i64));
                cx.frame.push_return(Value::boolean(cell.is_fg_palette));
                cx.frame.push_return(Value::boolean(cell.is_bg_palette));
            }
            "set" => {
                let buffer = bound_or_fail!();
                let x = arg_int(cx, 0) as i32 - 1;
                let y = arg_int(cx, 1) as i32 - 1;
                let text = arg_string(cx, 2).unwrap_or_default();
                let vertical = arg_bool_or(cx, 3, false);
                let mut locked = buffer.lock();
                let mut cursor_x = x;
                let mut cursor_y = y;
                for ch in text.chars() {
                    if let Some(index) = locked.index(cursor_x, cursor_y) {
                        locked.cells[index] = Cell {
                            codepoint: ch,
                            fg: state.foreground,
                            bg: state.background,
                            is_fg_palette: state.fg_is_palette,
                            is_bg_palette: state.bg_is_palette,
                        };
                    }
                    let width = char_width(ch) as i32;
                    if vertical {
                        cursor_y += width.max(1);
                    } else {
                        cursor_x += width.max(1);
                    }
                }
                locked.dirty = true;
                drop(locked);
                cx.charge_component(text.chars().count().max(1) as f64, 64.0);
                cx.frame.push_return(Value::boolean(true));
            }
            "fill" => {
                let buffer = bound_or_fail!();
                let x = arg_int(cx, 0) as i32 - 1;
                let y = arg_int(cx, 1) as i32 - 1;
                let width = arg_int(cx, 2) as i32;
                let height = arg_int(cx, 3) as i32;
                let ch = arg_string(cx, 4).unwrap_or_else(|| " ".to_string());
                let ch = ch.chars().next().unwrap_or(' ');
                let mut locked = buffer.lock();
                for row in y..y + height {
                    for col in x..x + width {
                        if let Some(index) = locked.index(col, row) {
                            locked.cells[index] = Cell {
                                codepoint: ch,
                                fg: state.foreground,
                                bg: state.background,
                                is_fg_palette: state.fg_is_palette,
                                is_bg_palette: state.bg_is_palette,
                            };
                        }
                    }
                }
                locked.dirty = true;
                drop(locked);
                cx.charge_component((width.max(0) * height.max(0)).max(1) as f64, 32.0);
                cx.frame.push_return(Value::boolean(true));
            }
            "copy" => {
                let buffer = bound_or_fail!();
                let x = arg_int(cx, 0) as i32 - 1;
                let y = arg_int(cx, 1) as i32 - 1;
                let width = arg_int(cx, 2) as i32;
                let height = arg_int(cx, 3) as i32;
                let tx = arg_int_or(cx, 4, 0) as i32;
                let ty = arg_int_or(cx, 5, 0) as i32;
                let mut locked = buffer.lock();
                let mut patch = Vec::with_capacity((width.max(0) * height.max(0)) as usize);
                for row in y..y + height {
                    for col in x..x + width {
                        patch.push(locked.index(col, row).map(|i| locked.cells[i]));
                    }
                }
                let mut k = 0;
                for row in y..y + height {
                    for col in x..x + width {
                        if let (Some(cell), Some(dst)) =
                            (patch[k], locked.index(col + tx, row + ty))
                        {
                            locked.cells[dst] = cell;
                        }
                        k += 1;
                    }
                }
                locked.dirty = true;
                drop(locked);
                cx.charge_component((width.max(0) * height.max(0)).max(1) as f64, 32.0);
                cx.frame.push_return(Value::boolean(true));
            }
            _ => return fail(cx, "no such method"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::ScreenHandler;
    use nn_runtime::{CallFrame, ResourceAccounting, SignalQueue};

    fn cx_call<H: ComponentHandler + ?Sized>(
        handler: &H,
        state: &mut (dyn Any + Send),
        method: &str,
        args: Vec<Value>,
        address: &str,
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
            address,
        };
        handler.call(state, method, &mut cx).unwrap();
        frame
    }

    fn init<H: ComponentHandler + ?Sized>(handler: &H, address: &str) -> Box<dyn Any + Send> {
        let mut frame = CallFrame::new(32, 32, 256);
        let mut resources = ResourceAccounting::new(100.0, 30.0, 256.0);
        let mut signals = SignalQueue::new(32, 32, 8192);
        let mut budget = 0.0;
        let mut cx = ComponentContext {
            frame: &mut frame,
            resources: &mut resources,
            signals: &mut signals,
            component_budget: &mut budget,
            address,
        };
        handler.init(&mut cx).unwrap()
    }

    #[test]
    fn bind_then_set_writes_through_to_screen_buffer() {
        let screen_handler = ScreenHandler::new(20, 5);
        let mut screen_state = init(&screen_handler, "gpu-test-screen");

        let gpu_handler = GpuHandler::default();
        let mut gpu_state = init(&gpu_handler, "gpu-test-gpu");

        cx_call(
            &gpu_handler,
            gpu_state.as_mut(),
            "bind",
            vec![Value::string("gpu-test-screen"), Value::boolean(false)],
            "gpu-test-gpu",
        );
        cx_call(
            &gpu_handler,
            gpu_state.as_mut(),
            "set",
            vec![Value::int(1), Value::int(1), Value::string("hi"), Value::boolean(false)],
            "gpu-test-gpu",
        );

        let frame = cx_call(
            &gpu_handler,
            gpu_state.as_mut(),
            "get",
            vec![Value::int(1), Value::int(1)],
            "gpu-test-gpu",
        );
        assert_eq!(frame.get_return(0).to_str().unwrap(), "h");

        screen_handler.deinit(screen_state.as_mut(), &mut ComponentContext {
            frame: &mut CallFrame::new(1, 1, 1),
            resources: &mut ResourceAccounting::new(1.0, 1.0, 1.0),
            signals: &mut SignalQueue::new(1, 1, 1),
            component_budget: &mut 0.0,
            address: "gpu-test-screen",
        });
    }

    #[test]
    fn set_depth_rejects_above_max() {
        let gpu_handler = GpuHandler::new(4);
        let mut gpu_state = init(&gpu_handler, "gpu-depth-test");
        let frame = cx_call(
            &gpu_handler,
            gpu_state.as_mut(),
            "setDepth",
            vec![Value::int(8)],
            "gpu-depth-test",
        );
        assert!(frame.get_return(0).is_nil());
    }

    #[test]
    fn get_viewport_mirrors_resolution() {
        let screen_handler = ScreenHandler::new(20, 5);
        let mut screen_state = init(&screen_handler, "gpu-viewport-screen");

        let gpu_handler = GpuHandler::default();
        let mut gpu_state = init(&gpu_handler, "gpu-viewport-gpu");
        cx_call(
            &gpu_handler,
            gpu_state.as_mut(),
            "bind",
            vec![Value::string("gpu-viewport-screen"), Value::boolean(false)],
            "gpu-viewport-gpu",
        );

        let frame = cx_call(
            &gpu_handler,
            gpu_state.as_mut(),
            "getViewport",
            vec![],
            "gpu-viewport-gpu",
        );
        assert_eq!(frame.get_return(0).to_int(), 20);
        assert_eq!(frame.get_return(1).to_int(), 5);

        screen_handler.deinit(screen_state.as_mut(), &mut ComponentContext {
            frame: &mut CallFrame::new(1, 1, 1),
            resources: &mut ResourceAccounting::new(1.0, 1.0, 1.0),
            signals: &mut SignalQueue::new(1, 1, 1),
            component_budget: &mut 0.0,
            address: "gpu-viewport-screen",
        });
    }
}
