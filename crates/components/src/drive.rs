//! Drive: a raw block device addressed in 1-indexed sectors.
//!
//! Grounded on `examples/original_source/src/components/drive.c` (sector
//! size/platter count/capacity accessors, `readByte`/`writeByte` expressed
//! in terms of whole-sector reads so every code path shares the same cost
//! hook).

use std::any::Any;

use nn_core::{NnResult, Value};
use nn_runtime::{ComponentContext, ComponentHandler, Method};

use crate::support::{arg_bytes, fail};

pub const DEFAULT_SECTOR_SIZE: usize = 512;
pub const DEFAULT_PLATTER_COUNT: i64 = 1;

const METHODS: &[Method] = &[
    Method::direct("getSectorSize", "number; bytes per sector"),
    Method::direct("getPlatterCount", "number; physical platter count"),
    Method::direct("getCapacity", "number; total bytes"),
    Method::indirect("readSector", "(sector:number):string"),
    Method::indirect("writeSector", "(sector:number, data:string)"),
    Method::indirect("readByte", "(offset:number):number"),
    Method::indirect("writeByte", "(offset:number, value:number)"),
];

struct DriveState {
    sectors: Vec<Vec<u8>>,
}

/// Volatile (in-memory) Drive backend.
pub struct DriveHandler {
    sector_size: usize,
    sector_count: usize,
    platter_count: i64,
}

impl DriveHandler {
    pub fn new(sector_size: usize, sector_count: usize, platter_count: i64) -> Self {
        DriveHandler {
            sector_size,
            sector_count,
            platter_count,
        }
    }

    pub fn capacity(&self) -> usize {
        self.sector_size * self.sector_count
    }
}

impl ComponentHandler for DriveHandler {
    fn type_name(&self) -> &str {
        "drive"
    }

    fn methods(&self) -> &[Method] {
        METHODS
    }

    fn init(&self, _cx: &mut ComponentContext) -> NnResult<Box<dyn Any + Send>> {
        Ok(Box::new(DriveState {
            sectors: vec![vec![0u8; self.sector_size]; self.sector_count],
        }))
    }

    fn call(
        &self,
        state: &mut (dyn Any + Send),
        method: &str,
        cx: &mut ComponentContext,
    ) -> NnResult<()> {
        let state = state.downcast_mut::<DriveState>().expect("drive state");

        match method {
            "getSectorSize" => {
                cx.frame.push_return(Value::int(self.sector_size as i64));
            }
            "getPlatterCount" => {
                cx.frame.push_return(Value::int(self.platter_count));
            }
            "getCapacity" => {
                cx.frame.push_return(Value::int(self.capacity() as i64));
            }
            "readSector" => {
                let sector = sector_index(cx, state.sectors.len())?;
                let sector = match sector {
                    Some(s) => s,
                    None => return fail(cx, "invalid sector"),
                };
                cx.resources.remove_energy(0.05);
                cx.charge_component(self.sector_size as f64, 256.0);
                cx.frame.push_return(Value::string(state.sectors[sector].clone()));
            }
            "writeSector" => {
                let sector = sector_index(cx, state.sectors.len())?;
                let sector = match sector {
                    Some(s) => s,
                    None => return fail(cx, "invalid sector"),
                };
                let mut data = arg_bytes(cx, 1).unwrap_or_default();
                data.resize(self.sector_size, 0);
                cx.resources.remove_energy(0.05);
                cx.charge_component(self.sector_size as f64, 128.0);
                state.sectors[sector] = data;
            }
            "readByte" => {
                let offset = cx.frame.get_argument(0).to_int();
                let byte = byte_at(&state.sectors, self.sector_size, offset);
                cx.charge_component(1.0, 256.0);
                match byte {
                    Some(b) => cx.frame.push_return(Value::int(b as i64)),
                    None => return fail(cx, "invalid offset"),
                }
            }
            "writeByte" => {
                let offset = cx.frame.get_argument(0).to_int();
                let value = cx.frame.get_argument(1).to_int() as u8;
                cx.charge_component(1.0, 128.0);
                if !write_byte_at(&mut state.sectors, self.sector_size, offset, value) {
                    return fail(cx, "invalid offset");
                }
            }
            _ => return fail(cx, "no such method"),
        }
        Ok(())
    }
}

/// Converts the 1-indexed `sector` argument to a 0-indexed `Vec` index.
/// `Ok(None)` denotes an out-of-range sector (a domain error); `Err` is
/// reserved for structural failures, of which there are none here.
fn sector_index(cx: &ComponentContext, sector_count: usize) -> NnResult<Option<usize>> {
    let requested = cx.frame.get_argument(0).to_int();
    if requested < 1 || requested as usize > sector_count {
        return Ok(None);
    }
    Ok(Some(requested as usize - 1))
}

fn byte_at(sectors: &[Vec<u8>], sector_size: usize, offset: i64) -> Option<u8> {
    if offset < 0 {
        return None;
    }
    let offset = offset as usize;
    let sector = offset / sector_size;
    let within = offset % sector_size;
    sectors.get(sector).and_then(|s| s.get(within)).copied()
}

fn write_byte_at(sectors: &mut [Vec<u8>], sector_size: usize, offset: i64, value: u8) -> bool {
    if offset < 0 {
        return false;
    }
    let offset = offset as usize;
    let sector = offset / sector_size;
    let within = offset % sector_size;
    match sectors.get_mut(sector).and_then(|s| s.get_mut(within)) {
        Some(byte) => {
            *byte = value;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nn_runtime::{CallFrame, ResourceAccounting, SignalQueue};

    fn new_cx<'a>(
        frame: &'a mut CallFrame,
        resources: &'a mut ResourceAccounting,
        signals: &'a mut SignalQueue,
        budget: &'a mut f64,
    ) -> ComponentContext<'a> {
        ComponentContext {
            frame,
            resources,
            signals,
            component_budget: budget,
            address: "drive-0",
        }
    }

    #[test]
    fn sectors_are_one_indexed_and_round_trip() {
        let handler = DriveHandler::new(512, 4, 1);
        let mut frame = CallFrame::new(32, 32, 256);
        let mut resources = ResourceAccounting::new(100.0, 30.0, 256.0);
        let mut signals = SignalQueue::new(32, 32, 8192);
        let mut budget = 0.0;
        let mut cx = new_cx(&mut frame, &mut resources, &mut signals, &mut budget);
        let mut state = handler.init(&mut cx).unwrap();

        let mut frame = CallFrame::new(32, 32, 256);
        frame.add_argument(Value::int(1));
        frame.add_argument(Value::string("hello".as_bytes().to_vec()));
        let mut cx = new_cx(&mut frame, &mut resources, &mut signals, &mut budget);
        handler.call(state.as_mut(), "writeSector", &mut cx).unwrap();

        let mut frame = CallFrame::new(32, 32, 256);
        frame.add_argument(Value::int(1));
        let mut cx = new_cx(&mut frame, &mut resources, &mut signals, &mut budget);
        handler.call(state.as_mut(), "readSector", &mut cx).unwrap();
        let bytes = frame.get_return(0).to_bytes().unwrap().to_vec();
        assert_eq!(&bytes[..5], b"hello");

        let mut frame = CallFrame::new(32, 32, 256);
        frame.add_argument(Value::int(0));
        let mut cx = new_cx(&mut frame, &mut resources, &mut signals, &mut budget);
        handler.call(state.as_mut(), "readSector", &mut cx).unwrap();
        assert!(frame.get_return(0).is_nil());
    }

    #[test]
    fn read_write_byte_share_sector_backing() {
        let handler = DriveHandler::new(16, 2, 1);
        let mut frame = CallFrame::new(32, 32, 256);
        let mut resources = ResourceAccounting::new(100.0, 30.0, 256.0);
        let mut signals = SignalQueue::new(32, 32, 8192);
        let mut budget = 0.0;
        let mut cx = new_cx(&mut frame, &mut resources, &mut signals, &mut budget);
        let mut state = handler.init(&mut cx).unwrap();

        let mut frame = CallFrame::new(32, 32, 256);
        frame.add_argument(Value::int(20));
        frame.add_argument(Value::int(42));
        let mut cx = new_cx(&mut frame, &mut resources, &mut signals, &mut budget);
        handler.call(state.as_mut(), "writeByte", &mut cx).unwrap();

        let mut frame = CallFrame::new(32, 32, 256);
        frame.add_argument(Value::int(20));
        let mut cx = new_cx(&mut frame, &mut resources, &mut signals, &mut budget);
        handler.call(state.as_mut(), "readByte", &mut cx).unwrap();
        assert_eq!(frame.get_return(0).to_int(), 42);
    }
}
