//! EEPROM: a small read-mostly code blob plus a smaller writable data blob.
//!
//! Grounded on `examples/original_source/rewrite/neonucleus.c`'s
//! `nn_eeprom_handler`/`nn_createVEEPROM`/`nn_veeprom_handler` (default
//! 4 KiB code / 256 B data, CRC32-gated `makeReadonly`).

use std::any::Any;

use nn_core::constants::NN_LABEL_SIZE;
use nn_core::crc32::crc32_hex;
use nn_core::{NnResult, Value};
use nn_runtime::{ComponentContext, ComponentHandler, Method};
use tracing::debug;

use crate::support::{arg_bytes, arg_string, fail, truncate_label};

pub const DEFAULT_CODE_SIZE: usize = 4 * 1024;
pub const DEFAULT_DATA_SIZE: usize = 256;

const METHODS: &[Method] = &[
    Method::direct("getSize", "number; maximum code size in bytes"),
    Method::direct("getDataSize", "number; maximum data size in bytes"),
    Method::direct("get", "string; the current code"),
    Method::indirect("set", "(code:string); replaces the code, unless read-only"),
    Method::direct("getData", "string; the current data"),
    Method::indirect("setData", "(data:string); replaces the data"),
    Method::direct("getLabel", "string; the current label"),
    Method::direct("setLabel", "(label:string):string; sets and returns the truncated label"),
    Method::direct("isReadonly", "boolean"),
    Method::indirect(
        "makeReadonly",
        "(checksum:string):boolean; requires the current CRC32 of the code, irreversible",
    ),
    // Legacy capitalization accepted by some BIOS releases; same dispatch arm.
    Method::indirect("makeReadOnly", "alias of makeReadonly"),
    Method::direct("getChecksum", "string; lowercase-hex CRC32 of the current code"),
];

struct EepromState {
    code: Vec<u8>,
    data: Vec<u8>,
    label: String,
    readonly: bool,
}

/// Volatile (in-memory) EEPROM backend.
pub struct EepromHandler {
    code_size: usize,
    data_size: usize,
    initial_code: Vec<u8>,
    initial_label: String,
}

impl EepromHandler {
    pub fn new(code_size: usize, data_size: usize) -> Self {
        EepromHandler {
            code_size,
            data_size,
            initial_code: Vec::new(),
            initial_label: String::new(),
        }
    }

    /// Preloads the instance with a fixed code blob and label, e.g. to
    /// emulate firmware baked into a factory-fresh EEPROM.
    pub fn with_code(mut self, code: impl Into<Vec<u8>>, label: impl Into<String>) -> Self {
        self.initial_code = code.into();
        self.initial_label = label.into();
        self
    }
}

impl Default for EepromHandler {
    fn default() -> Self {
        EepromHandler::new(DEFAULT_CODE_SIZE, DEFAULT_DATA_SIZE)
    }
}

impl ComponentHandler for EepromHandler {
    fn type_name(&self) -> &str {
        "eeprom"
    }

    fn methods(&self) -> &[Method] {
        METHODS
    }

    fn init(&self, _cx: &mut ComponentContext) -> NnResult<Box<dyn Any + Send>> {
        let mut code = self.initial_code.clone();
        code.truncate(self.code_size);
        Ok(Box::new(EepromState {
            code,
            data: Vec::new(),
            label: truncate_label(&self.initial_label, NN_LABEL_SIZE),
            readonly: false,
        }))
    }

    fn call(
        &self,
        state: &mut (dyn Any + Send),
        method: &str,
        cx: &mut ComponentContext,
    ) -> NnResult<()> {
        let state = state.downcast_mut::<EepromState>().expect("eeprom state");

        match method {
            "getSize" => {
                cx.frame.push_return(Value::int(self.code_size as i64));
            }
            "getDataSize" => {
                cx.frame.push_return(Value::int(self.data_size as i64));
            }
            "get" => {
                cx.charge_component(1.0, 32.0);
                cx.frame.push_return(Value::string(state.code.clone()));
            }
            "set" => {
                if state.readonly {
                    return fail(cx, "storage is read only");
                }
                let mut code = arg_bytes(cx, 0).unwrap_or_default();
                if code.len() > self.code_size {
                    return fail(cx, "not enough space");
                }
                code.truncate(self.code_size);
                cx.charge_component(code.len() as f64, 32.0);
                state.code = code;
            }
            "getData" => {
                cx.frame.push_return(Value::string(state.data.clone()));
            }
            "setData" => {
                let mut data = arg_bytes(cx, 0).unwrap_or_default();
                if data.len() > self.data_size {
                    return fail(cx, "not enough space");
                }
                data.truncate(self.data_size);
                cx.charge_component(data.len() as f64, 32.0);
                state.data = data;
            }
            "getLabel" => {
                cx.frame.push_return(Value::string(state.label.clone()));
            }
            "setLabel" => {
                let requested = arg_string(cx, 0).unwrap_or_default();
                state.label = truncate_label(&requested, NN_LABEL_SIZE);
                cx.frame.push_return(Value::string(state.label.clone()));
            }
            "isReadonly" => {
                cx.frame.push_return(Value::boolean(state.readonly));
            }
            "makeReadonly" | "makeReadOnly" => {
                if state.readonly {
                    cx.frame.push_return(Value::boolean(true));
                    return Ok(());
                }
                let given = arg_string(cx, 0).unwrap_or_default();
                if given != crc32_hex(&state.code) {
                    return fail(cx, "incorrect checksum");
                }
                state.readonly = true;
                debug!(address = cx.address, "eeprom made read-only");
                cx.frame.push_return(Value::boolean(true));
            }
            "getChecksum" => {
                cx.frame.push_return(Value::string(crc32_hex(&state.code)));
            }
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
        handler: &EepromHandler,
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
            address: "eeprom-0",
        };
        handler.call(state, method, &mut cx).unwrap();
        frame
    }

    #[test]
    fn checksum_matches_known_vector() {
        let handler = EepromHandler::default().with_code(*b"ABC", "");
        let mut cx_budget = 0.0;
        let mut frame = CallFrame::new(32, 32, 256);
        let mut resources = ResourceAccounting::new(100.0, 30.0, 256.0);
        let mut signals = SignalQueue::new(32, 32, 8192);
        let mut cx = ComponentContext {
            frame: &mut frame,
            resources: &mut resources,
            signals: &mut signals,
            component_budget: &mut cx_budget,
            address: "a",
        };
        let mut state = handler.init(&mut cx).unwrap();
        let frame = call(&handler, state.as_mut(), "getChecksum", vec![]);
        assert_eq!(frame.get_return(0).to_str().unwrap(), "a3830348");
    }

    #[test]
    fn make_readonly_rejects_wrong_checksum_then_accepts_correct_one() {
        let handler = EepromHandler::default().with_code(*b"ABC", "");
        let mut init_budget = 0.0;
        let mut init_frame = CallFrame::new(32, 32, 256);
        let mut init_resources = ResourceAccounting::new(100.0, 30.0, 256.0);
        let mut init_signals = SignalQueue::new(32, 32, 8192);
        let mut init_cx = ComponentContext {
            frame: &mut init_frame,
            resources: &mut init_resources,
            signals: &mut init_signals,
            component_budget: &mut init_budget,
            address: "a",
        };
        let mut state = handler.init(&mut init_cx).unwrap();

        let frame = call(
            &handler,
            state.as_mut(),
            "makeReadonly",
            vec![Value::string("deadbeef")],
        );
        assert!(frame.get_return(0).is_nil());
        assert_eq!(frame.get_return(1).to_str().unwrap(), "incorrect checksum");

        let frame = call(
            &handler,
            state.as_mut(),
            "makeReadonly",
            vec![Value::string("a3830348")],
        );
        assert!(frame.get_return(0).to_boolean());

        let frame = call(
            &handler,
            state.as_mut(),
            "set",
            vec![Value::string("XYZ")],
        );
        assert!(frame.get_return(0).is_nil());
        assert_eq!(frame.get_return(1).to_str().unwrap(), "storage is read only");
    }
}
