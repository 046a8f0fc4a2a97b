//! Modem: a wireless/wired network card with a small fixed-capacity
//! open-port set.
//!
//! Grounded on `examples/original_source/src/components/loopbackModem.c`:
//! a fixed-size open-ports array, `NN_PORT_CLOSEALL` (0) as the
//! close-all-ports sentinel, and the loopback implementation's choice to
//! use the sender's own address as the receiver field on broadcast.

use std::any::Any;

use nn_core::constants::NN_PORT_CLOSEALL;
use nn_core::value::measure_packet_size;
use nn_core::{NnResult, Value};
use nn_runtime::{ComponentContext, ComponentHandler, Method};
use tracing::trace;

use crate::support::{arg_int, fail};

const MAX_OPEN_PORTS: usize = 16;

const METHODS: &[Method] = &[
    Method::direct("isWireless", "boolean"),
    Method::direct("getStrength", "number; wireless range, 0 if wired"),
    Method::indirect("setStrength", "(range:number):number; previous value"),
    Method::direct("isOpen", "(port:number):boolean"),
    Method::indirect("open", "(port:number):boolean"),
    Method::indirect("close", "(port:number=NN_PORT_CLOSEALL):boolean"),
    Method::indirect("send", "(address:string, port:number, ...values):boolean"),
    Method::indirect("broadcast", "(port:number, ...values):boolean"),
];

struct ModemState {
    open_ports: Vec<u16>,
    strength: f64,
}

/// Volatile (loopback) Modem backend: `send`/`broadcast` push
/// `modem_message` signals onto this same Computer's queue, matching the
/// reference loopback implementation rather than routing across Computers.
pub struct ModemHandler {
    wireless: bool,
    max_packet_size: usize,
}

impl ModemHandler {
    pub fn new(wireless: bool, max_packet_size: usize) -> Self {
        ModemHandler {
            wireless,
            max_packet_size,
        }
    }
}

impl ComponentHandler for ModemHandler {
    fn type_name(&self) -> &str {
        "modem"
    }

    fn methods(&self) -> &[Method] {
        METHODS
    }

    fn init(&self, _cx: &mut ComponentContext) -> NnResult<Box<dyn Any + Send>> {
        Ok(Box::new(ModemState {
            open_ports: Vec::new(),
            strength: 0.0,
        }))
    }

    fn call(
        &self,
        state: &mut (dyn Any + Send),
        method: &str,
        cx: &mut ComponentContext,
    ) -> NnResult<()> {
        let state = state.downcast_mut::<ModemState>().expect("modem state");

        match method {
            "isWireless" => {
                cx.frame.push_return(Value::boolean(self.wireless));
            }
            "getStrength" => {
                cx.frame.push_return(Value::number(state.strength));
            }
            "setStrength" => {
                if !self.wireless {
                    return fail(cx, "not a wireless modem");
                }
                let previous = state.strength;
                state.strength = cx.frame.get_argument(0).to_number().max(0.0);
                cx.frame.push_return(Value::number(previous));
            }
            "isOpen" => {
                let port = arg_int(cx, 0) as u16;
                cx.frame.push_return(Value::boolean(state.open_ports.contains(&port)));
            }
            "open" => {
                let port = arg_int(cx, 0) as u16;
                if port == NN_PORT_CLOSEALL {
                    return fail(cx, "invalid port number");
                }
                if state.open_ports.contains(&port) {
                    cx.frame.push_return(Value::boolean(false));
                } else if state.open_ports.len() >= MAX_OPEN_PORTS {
                    return fail(cx, "too many open ports");
                } else {
                    state.open_ports.push(port);
                    trace!(address = cx.address, port, "modem port opened");
                    cx.frame.push_return(Value::boolean(true));
                }
            }
            "close" => {
                let port = arg_int(cx, 0) as u16;
                if port == NN_PORT_CLOSEALL {
                    let had_any = !state.open_ports.is_empty();
                    state.open_ports.clear();
                    cx.frame.push_return(Value::boolean(had_any));
                } else {
                    let before = state.open_ports.len();
                    state.open_ports.retain(|&p| p != port);
                    cx.frame.push_return(Value::boolean(state.open_ports.len() != before));
                }
            }
            "send" => {
                let receiver = cx.frame.get_argument(0);
                let port = cx.frame.get_argument(1).to_int() as i64;
                let values: Vec<Value> = cx.frame.arguments().iter().skip(2).map(Value::retain).collect();
                if measure_packet_size(&values).unwrap_or(usize::MAX) > self.max_packet_size {
                    return fail(cx, "packet too big");
                }
                let mut packet = vec![
                    Value::cstr("modem_message"),
                    receiver,
                    Value::string(cx.address.to_string()),
                    Value::int(port),
                    Value::number(0.0),
                ];
                packet.extend(values);
                cx.charge_component(1.0, 64.0);
                let _ = cx.signals.push(packet);
                cx.frame.push_return(Value::boolean(true));
            }
            "broadcast" => {
                let port = cx.frame.get_argument(0).to_int();
                let values: Vec<Value> = cx.frame.arguments().iter().skip(1).map(Value::retain).collect();
                if measure_packet_size(&values).unwrap_or(usize::MAX) > self.max_packet_size {
                    return fail(cx, "packet too big");
                }
                let mut packet = vec![
                    Value::cstr("modem_message"),
                    Value::string(cx.address.to_string()),
                    Value::string(cx.address.to_string()),
                    Value::int(port),
                    Value::number(0.0),
                ];
                packet.extend(values);
                cx.charge_component(1.0, 64.0);
                let _ = cx.signals.push(packet);
                cx.frame.push_return(Value::boolean(true));
            }
            _ => return fail(cx, "no such method"),
        }
        Ok(())
    }
}
