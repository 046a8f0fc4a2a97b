//! Tunnel: a simplified point-to-point modem with no open-port bookkeeping.
//!
//! Grounded on `examples/original_source/src/components/loopbackTunnel.c`:
//! a single fixed channel (`"loopback"`), the `NN_TUNNEL_PORT` constant
//! (always 0) as the implicit port on every `modem_message`, and the
//! loopback implementation delivering every send back to the same
//! Computer's signal queue.

use std::any::Any;

use nn_core::constants::NN_TUNNEL_PORT;
use nn_core::value::measure_packet_size;
use nn_core::{NnResult, Value};
use nn_runtime::{ComponentContext, ComponentHandler, Method};

use crate::support::fail;

const METHODS: &[Method] = &[
    Method::direct("getChannel", "string; the tunnel's fixed channel name"),
    Method::indirect("send", "(...values):boolean"),
];

struct TunnelState {
    channel: String,
}

/// Volatile (loopback) Tunnel backend.
pub struct TunnelHandler {
    max_packet_size: usize,
}

impl TunnelHandler {
    pub fn new(max_packet_size: usize) -> Self {
        TunnelHandler { max_packet_size }
    }
}

impl Default for TunnelHandler {
    fn default() -> Self {
        TunnelHandler::new(8192)
    }
}

impl ComponentHandler for TunnelHandler {
    fn type_name(&self) -> &str {
        "tunnel"
    }

    fn methods(&self) -> &[Method] {
        METHODS
    }

    fn init(&self, _cx: &mut ComponentContext) -> NnResult<Box<dyn Any + Send>> {
        Ok(Box::new(TunnelState {
            channel: "loopback".to_string(),
        }))
    }

    fn call(
        &self,
        state: &mut (dyn Any + Send),
        method: &str,
        cx: &mut ComponentContext,
    ) -> NnResult<()> {
        let state = state.downcast_mut::<TunnelState>().expect("tunnel state");

        match method {
            "getChannel" => {
                cx.frame.push_return(Value::string(state.channel.clone()));
            }
            "send" => {
                let values: Vec<Value> = cx.frame.arguments().iter().map(Value::retain).collect();
                if measure_packet_size(&values).unwrap_or(usize::MAX) > self.max_packet_size {
                    return fail(cx, "packet too big");
                }
                let mut packet = vec![
                    Value::cstr("modem_message"),
                    Value::string(cx.address.to_string()),
                    Value::string(cx.address.to_string()),
                    Value::int(NN_TUNNEL_PORT as i64),
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

#[cfg(test)]
mod tests {
    use super::*;
    use nn_runtime::{CallFrame, ResourceAccounting, SignalQueue};

    #[test]
    fn send_wakes_self_with_fixed_port() {
        let handler = TunnelHandler::default();
        let mut signals = SignalQueue::new(32, 32, 8192);
        let mut frame = CallFrame::new(32, 32, 256);
        let mut resources = ResourceAccounting::new(100.0, 30.0, 256.0);
        let mut budget = 0.0;
        let mut cx = ComponentContext {
            frame: &mut frame,
            resources: &mut resources,
            signals: &mut signals,
            component_budget: &mut budget,
            address: "tunnel-0",
        };
        let mut state = handler.init(&mut cx).unwrap();

        let mut frame = CallFrame::new(32, 32, 256);
        frame.add_argument(Value::string("hi"));
        let mut cx = ComponentContext {
            frame: &mut frame,
            resources: &mut resources,
            signals: &mut signals,
            component_budget: &mut budget,
            address: "tunnel-0",
        };
        handler.call(state.as_mut(), "send", &mut cx).unwrap();

        let values = signals.pop().unwrap();
        assert_eq!(values[3].to_int(), NN_TUNNEL_PORT as i64);
        assert_eq!(values[5].to_str().unwrap(), "hi");
    }
}
