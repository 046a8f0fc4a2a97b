//! Filesystem: a tree of files and directories behind a chunked cost model.
//!
//! Grounded on `examples/original_source/src/components/filesystem.c` (path
//! validation via [`nn_core::path`], open-mode semantics, chunked
//! read/write/seek costing) and the reference rewrite's
//! `nn_defaultFilesystems`/`nn_defaultFloppy` capacity-tier presets
//! (`examples/original_source/rewrite/neonucleus.c`, ~line 2198), supplemented
//! here as named constructors per SPEC_FULL.md §4.9.

use std::any::Any;
use std::collections::BTreeMap;

use nn_core::constants::{NN_LABEL_SIZE, NN_MAX_OPENFILES};
use nn_core::path::simplify;
use nn_core::{NnResult, Value};
use nn_runtime::{ComponentContext, ComponentHandler, Method};

use crate::support::{arg_bytes, arg_int, arg_int_or, arg_string, fail, truncate_label};

/// A capacity/latency preset, mirroring the reference implementation's
/// named filesystem tiers.
#[derive(Debug, Clone, Copy)]
pub struct FilesystemTier {
    pub capacity: usize,
    pub reads_per_tick: u32,
    pub writes_per_tick: u32,
    pub data_energy_cost_per_mib: f64,
}

impl FilesystemTier {
    pub const TIER1: FilesystemTier = FilesystemTier {
        capacity: 1024 * 1024,
        reads_per_tick: 4,
        writes_per_tick: 2,
        data_energy_cost_per_mib: 256.0,
    };
    pub const TIER2: FilesystemTier = FilesystemTier {
        capacity: 2 * 1024 * 1024,
        reads_per_tick: 4,
        writes_per_tick: 2,
        data_energy_cost_per_mib: 512.0,
    };
    pub const TIER3: FilesystemTier = FilesystemTier {
        capacity: 4 * 1024 * 1024,
        reads_per_tick: 7,
        writes_per_tick: 3,
        data_energy_cost_per_mib: 1024.0,
    };
    pub const TIER4: FilesystemTier = FilesystemTier {
        capacity: 8 * 1024 * 1024,
        reads_per_tick: 13,
        writes_per_tick: 5,
        data_energy_cost_per_mib: 2048.0,
    };
    pub const FLOPPY: FilesystemTier = FilesystemTier {
        capacity: 512 * 1024,
        reads_per_tick: 1,
        writes_per_tick: 1,
        data_energy_cost_per_mib: 8.0,
    };
}

const PRETEND_CHUNK_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenMode {
    Read,
    Write,
    Append,
}

struct OpenHandle {
    path: String,
    mode: OpenMode,
    position: usize,
}

struct Node {
    file: Option<Vec<u8>>,
    modified_ms: i64,
}

struct FilesystemState {
    label: String,
    nodes: BTreeMap<String, Node>,
    directories: std::collections::BTreeSet<String>,
    handles: BTreeMap<i32, OpenHandle>,
    next_handle: i32,
    space_used: usize,
    /// Monotonic write counter, scaled to UNIX-ms-like units (a multiple of
    /// 1000 per §4.9's `lastModified` contract). There is no wall clock
    /// reachable from a `ComponentHandler::call` (`ComponentContext` does
    /// not carry one), so this stands in for it: every write bumps it, which
    /// is enough to give callers a total order over modification events
    /// without claiming real wall-clock fidelity.
    write_clock_ms: i64,
}

impl FilesystemState {
    fn new(label: &str) -> Self {
        let mut directories = std::collections::BTreeSet::new();
        directories.insert(String::new());
        FilesystemState {
            label: label.to_string(),
            nodes: BTreeMap::new(),
            directories,
            handles: BTreeMap::new(),
            next_handle: 1,
            space_used: 0,
            write_clock_ms: 0,
        }
    }

    fn tick_write_clock(&mut self) -> i64 {
        self.write_clock_ms += 1000;
        self.write_clock_ms
    }

    fn is_directory(&self, path: &str) -> bool {
        self.directories.contains(path)
    }

    fn exists(&self, path: &str) -> bool {
        self.nodes.contains_key(path) || self.is_directory(path)
    }

    fn parent_exists_as_directory(&self, path: &str) -> bool {
        match path.rsplit_once('/') {
            Some((parent, _)) => self.is_directory(parent),
            None => true,
        }
    }
}

const METHODS: &[Method] = &[
    Method::direct("spaceTotal", "number; total capacity in bytes"),
    Method::direct("spaceUsed", "number; bytes currently stored"),
    Method::direct("isReadOnly", "boolean"),
    Method::direct("getLabel", "string"),
    Method::direct("setLabel", "(label:string):string"),
    Method::indirect("exists", "(path:string):boolean"),
    Method::indirect("size", "(path:string):number"),
    Method::indirect("lastModified", "(path:string):number; UNIX ms"),
    Method::indirect("isDirectory", "(path:string):boolean"),
    Method::indirect("list", "(path:string):table; entries, directories suffixed with '/'"),
    Method::indirect("makeDirectory", "(path:string):boolean"),
    Method::indirect("remove", "(path:string):boolean"),
    Method::indirect("rename", "(from:string, to:string):boolean"),
    Method::indirect("open", "(path:string, mode:string='r'):number; handle"),
    Method::indirect("close", "(handle:number)"),
    Method::indirect("read", "(handle:number, count:number):string; empty string on EOF"),
    Method::indirect("write", "(handle:number, data:string):boolean"),
    Method::indirect("seek", "(handle:number, whence:string, offset:number):number; new position"),
];

/// Volatile (in-memory) Filesystem backend.
pub struct FilesystemHandler {
    tier: FilesystemTier,
    read_only: bool,
    label: String,
}

impl FilesystemHandler {
    pub fn new(tier: FilesystemTier, read_only: bool, label: impl Into<String>) -> Self {
        FilesystemHandler {
            tier,
            read_only,
            label: label.into(),
        }
    }
}

impl ComponentHandler for FilesystemHandler {
    fn type_name(&self) -> &str {
        "filesystem"
    }

    fn methods(&self) -> &[Method] {
        METHODS
    }

    fn init(&self, _cx: &mut ComponentContext) -> NnResult<Box<dyn Any + Send>> {
        Ok(Box::new(FilesystemState::new(&truncate_label(
            &self.label,
            NN_LABEL_SIZE,
        ))))
    }

    fn call(
        &self,
        state: &mut (dyn Any + Send),
        method: &str,
        cx: &mut ComponentContext,
    ) -> NnResult<()> {
        let state = state
            .downcast_mut::<FilesystemState>()
            .expect("filesystem state");

        match method {
            "spaceTotal" => {
                cx.frame.push_return(Value::int(self.tier.capacity as i64));
            }
            "spaceUsed" => {
                cx.frame.push_return(Value::int(state.space_used as i64));
            }
            "isReadOnly" => {
                cx.frame.push_return(Value::boolean(self.read_only));
            }
            "getLabel" => {
                cx.frame.push_return(Value::string(state.label.clone()));
            }
            "setLabel" => {
                if self.read_only {
                    return fail(cx, "filesystem is read only");
                }
                let requested = arg_string(cx, 0).unwrap_or_default();
                state.label = truncate_label(&requested, NN_LABEL_SIZE);
                cx.frame.push_return(Value::string(state.label.clone()));
            }
            "exists" => {
                let path = match simplified_path(cx, 0) {
                    Ok(p) => p,
                    Err(_) => return fail(cx, "bad path"),
                };
                cx.frame.push_return(Value::boolean(state.exists(&path)));
            }
            "size" => {
                let path = match simplified_path(cx, 0) {
                    Ok(p) => p,
                    Err(_) => return fail(cx, "bad path"),
                };
                let size = state.nodes.get(&path).and_then(|n| n.file.as_ref()).map(|f| f.len()).unwrap_or(0);
                cx.frame.push_return(Value::int(size as i64));
            }
            "lastModified" => {
                let path = match simplified_path(cx, 0) {
                    Ok(p) => p,
                    Err(_) => return fail(cx, "bad path"),
                };
                let when = state.nodes.get(&path).map(|n| n.modified_ms).unwrap_or(0);
                cx.frame.push_return(Value::int(when));
            }
            "isDirectory" => {
                let path = match simplified_path(cx, 0) {
                    Ok(p) => p,
                    Err(_) => return fail(cx, "bad path"),
                };
                cx.frame.push_return(Value::boolean(state.is_directory(&path)));
            }
            "list" => {
                let path = match simplified_path(cx, 0) {
                    Ok(p) => p,
                    Err(_) => return fail(cx, "bad path"),
                };
                if !state.is_directory(&path) {
                    return fail(cx, "no such directory");
                }
                let entries = list_directory(state, &path);
                let listing = Value::array(entries.len());
                for (i, entry) in entries.into_iter().enumerate() {
                    nn_core::value::array_set(&listing, i, Value::string(entry));
                }
                cx.frame.push_return(listing);
            }
            "makeDirectory" => {
                if self.read_only {
                    return fail(cx, "filesystem is read only");
                }
                let path = match simplified_path(cx, 0) {
                    Ok(p) => p,
                    Err(_) => return fail(cx, "bad path"),
                };
                if state.exists(&path) {
                    return fail(cx, "file already exists");
                }
                if !state.parent_exists_as_directory(&path) {
                    return fail(cx, "no such directory");
                }
                state.directories.insert(path);
                cx.frame.push_return(Value::boolean(true));
            }
            "remove" => {
                if self.read_only {
                    return fail(cx, "filesystem is read only");
                }
                let path = match simplified_path(cx, 0) {
                    Ok(p) => p,
                    Err(_) => return fail(cx, "bad path"),
                };
                let removed = if let Some(node) = state.nodes.remove(&path) {
                    state.space_used -= node.file.map(|f| f.len()).unwrap_or(0);
                    true
                } else if state.directories.remove(&path) {
                    true
                } else {
                    false
                };
                cx.frame.push_return(Value::boolean(removed));
            }
            "rename" => {
                if self.read_only {
                    return fail(cx, "filesystem is read only");
                }
                let from = match simplified_path(cx, 0) {
                    Ok(p) => p,
                    Err(_) => return fail(cx, "bad path"),
                };
                let to = match simplified_path(cx, 1) {
                    Ok(p) => p,
                    Err(_) => return fail(cx, "bad path"),
                };
                if let Some(node) = state.nodes.remove(&from) {
                    state.nodes.insert(to, node);
                    cx.frame.push_return(Value::boolean(true));
                } else {
                    cx.frame.push_return(Value::boolean(false));
                }
            }
            "open" => {
                if state.handles.len() >= NN_MAX_OPENFILES {
                    return fail(cx, "too many open handles");
                }
                let path = match simplified_path(cx, 0) {
                    Ok(p) => p,
                    Err(_) => return fail(cx, "bad path"),
                };
                let mode_str = arg_string(cx, 1).unwrap_or_else(|| "r".to_string());
                let mode = match mode_str.as_str() {
                    "r" => OpenMode::Read,
                    "w" => OpenMode::Write,
                    "a" => OpenMode::Append,
                    _ => return fail(cx, "unsupported mode"),
                };
                if mode != OpenMode::Read && self.read_only {
                    return fail(cx, "filesystem is read only");
                }
                if mode == OpenMode::Read && !state.nodes.contains_key(&path) {
                    return fail(cx, "no such file");
                }
                if mode == OpenMode::Write {
                    let stamp = state.tick_write_clock();
                    state.nodes.insert(
                        path.clone(),
                        Node {
                            file: Some(Vec::new()),
                            modified_ms: stamp,
                        },
                    );
                } else if mode == OpenMode::Append && !state.nodes.contains_key(&path) {
                    let stamp = state.tick_write_clock();
                    state.nodes.insert(
                        path.clone(),
                        Node {
                            file: Some(Vec::new()),
                            modified_ms: stamp,
                        },
                    );
                }
                let position = if mode == OpenMode::Append {
                    state.nodes.get(&path).and_then(|n| n.file.as_ref()).map(|f| f.len()).unwrap_or(0)
                } else {
                    0
                };
                let handle = state.next_handle;
                state.next_handle += 1;
                state.handles.insert(handle, OpenHandle { path, mode, position });
                cx.frame.push_return(Value::int(handle as i64));
            }
            "close" => {
                let handle = arg_int(cx, 0) as i32;
                state.handles.remove(&handle);
            }
            "read" => {
                let handle_id = arg_int(cx, 0) as i32;
                let count = arg_int_or(cx, 1, 0).max(0) as usize;
                let handle = match state.handles.get(&handle_id) {
                    Some(h) if h.mode == OpenMode::Read => h,
                    _ => return fail(cx, "bad file descriptor"),
                };
                let bytes = match state.nodes.get(&handle.path).and_then(|n| n.file.as_ref()) {
                    Some(b) => b,
                    None => return fail(cx, "no such file"),
                };
                let start = handle.position.min(bytes.len());
                let end = (start + count).min(bytes.len());
                let chunk = bytes[start..end].to_vec();
                let new_position = end;
                let chunks = div_ceil(chunk.len().max(1), PRETEND_CHUNK_SIZE);
                cx.charge_component(chunks as f64, self.tier.reads_per_tick as f64);
                cx.resources.remove_energy(
                    (chunk.len() as f64 / (1024.0 * 1024.0)) * self.tier.data_energy_cost_per_mib,
                );
                if let Some(handle) = state.handles.get_mut(&handle_id) {
                    handle.position = new_position;
                }
                cx.frame.push_return(Value::string(chunk));
            }
            "write" => {
                if self.read_only {
                    return fail(cx, "filesystem is read only");
                }
                let handle_id = arg_int(cx, 0) as i32;
                let data = arg_bytes(cx, 1).unwrap_or_default();
                let (path, position) = match state.handles.get(&handle_id) {
                    Some(h) if h.mode != OpenMode::Read => (h.path.clone(), h.position),
                    _ => return fail(cx, "bad file descriptor"),
                };
                let additional = data.len();
                let current_used = state
                    .nodes
                    .get(&path)
                    .and_then(|n| n.file.as_ref())
                    .map(|f| f.len())
                    .unwrap_or(0);
                if state.space_used - current_used.min(state.space_used) + position + additional
                    > self.tier.capacity
                {
                    return fail(cx, "not enough space");
                }
                let chunks = div_ceil(additional.max(1), PRETEND_CHUNK_SIZE);
                cx.charge_component(chunks as f64, self.tier.writes_per_tick as f64);
                cx.resources.remove_energy(
                    (additional as f64 / (1024.0 * 1024.0)) * self.tier.data_energy_cost_per_mib,
                );
                let stamp = state.tick_write_clock();
                let node = state.nodes.entry(path.clone()).or_insert_with(|| Node {
                    file: Some(Vec::new()),
                    modified_ms: stamp,
                });
                node.modified_ms = stamp;
                let file = node.file.get_or_insert_with(Vec::new);
                if position + additional > file.len() {
                    file.resize(position + additional, 0);
                }
                file[position..position + additional].copy_from_slice(&data);
                state.space_used = state.nodes.values().filter_map(|n| n.file.as_ref()).map(|f| f.len()).sum();
                if let Some(handle) = state.handles.get_mut(&handle_id) {
                    handle.position += additional;
                }
                cx.frame.push_return(Value::boolean(true));
            }
            "seek" => {
                let handle_id = arg_int(cx, 0) as i32;
                let whence = arg_string(cx, 1).unwrap_or_else(|| "cur".to_string());
                let offset = arg_int(cx, 2);
                let length = match state.handles.get(&handle_id) {
                    Some(h) => state
                        .nodes
                        .get(&h.path)
                        .and_then(|n| n.file.as_ref())
                        .map(|f| f.len())
                        .unwrap_or(0),
                    None => return fail(cx, "bad file descriptor"),
                };
                let handle = state.handles.get_mut(&handle_id).unwrap();
                let base = match whence.as_str() {
                    "set" => 0i64,
                    "cur" => handle.position as i64,
                    "end" => length as i64,
                    _ => return fail(cx, "invalid whence"),
                };
                let target = (base + offset).clamp(0, length as i64) as usize;
                handle.position = target;
                cx.frame.push_return(Value::int(target as i64));
            }
            _ => return fail(cx, "no such method"),
        }
        Ok(())
    }
}

fn div_ceil(n: usize, d: usize) -> usize {
    (n + d - 1) / d
}

fn simplified_path(cx: &ComponentContext, index: usize) -> NnResult<String> {
    let raw = arg_string(cx, index).unwrap_or_default();
    simplify(&raw)
}

fn list_directory(state: &FilesystemState, path: &str) -> Vec<String> {
    let prefix = if path.is_empty() {
        String::new()
    } else {
        format!("{path}/")
    };
    let mut entries = Vec::new();
    for file in state.nodes.keys() {
        if let Some(rest) = file.strip_prefix(&prefix) {
            if !rest.is_empty() && !rest.contains('/') {
                entries.push(rest.to_string());
            }
        }
    }
    for dir in &state.directories {
        if dir.is_empty() {
            continue;
        }
        if let Some(rest) = dir.strip_prefix(&prefix) {
            if !rest.is_empty() && !rest.contains('/') {
                entries.push(format!("{rest}/"));
            }
        }
    }
    entries.sort();
    entries.dedup();
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use nn_runtime::{CallFrame, ResourceAccounting, SignalQueue};

    fn call(
        handler: &FilesystemHandler,
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
            address: "fs-0",
        };
        handler.call(state, method, &mut cx).unwrap();
        frame
    }

    fn init(handler: &FilesystemHandler) -> Box<dyn Any + Send> {
        let mut frame = CallFrame::new(32, 32, 256);
        let mut resources = ResourceAccounting::new(100.0, 30.0, 256.0);
        let mut signals = SignalQueue::new(32, 32, 8192);
        let mut budget = 0.0;
        let mut cx = ComponentContext {
            frame: &mut frame,
            resources: &mut resources,
            signals: &mut signals,
            component_budget: &mut budget,
            address: "fs-0",
        };
        handler.init(&mut cx).unwrap()
    }

    #[test]
    fn last_modified_is_a_nonzero_multiple_of_1000_after_a_write() {
        let handler = FilesystemHandler::new(FilesystemTier::TIER1, false, "disk");
        let mut state = init(&handler);

        let frame = call(&handler, state.as_mut(), "open", vec![Value::string("a.txt"), Value::string("w")]);
        let handle = frame.get_return(0).to_int();
        call(&handler, state.as_mut(), "write", vec![Value::int(handle), Value::string("hello")]);

        let frame = call(&handler, state.as_mut(), "lastModified", vec![Value::string("a.txt")]);
        let when = frame.get_return(0).to_int();
        assert!(when > 0);
        assert_eq!(when % 1000, 0);
    }

    #[test]
    fn write_then_read_round_trips() {
        let handler = FilesystemHandler::new(FilesystemTier::TIER1, false, "disk");
        let mut state = init(&handler);

        let frame = call(&handler, state.as_mut(), "open", vec![Value::string("a.txt"), Value::string("w")]);
        let handle = frame.get_return(0).to_int();

        call(&handler, state.as_mut(), "write", vec![Value::int(handle), Value::string("hello")]);
        call(&handler, state.as_mut(), "seek", vec![Value::int(handle), Value::string("set"), Value::int(0)]);
        let frame = call(&handler, state.as_mut(), "read", vec![Value::int(handle), Value::int(5)]);
        assert_eq!(frame.get_return(0).to_bytes().unwrap(), b"hello");

        let frame = call(&handler, state.as_mut(), "read", vec![Value::int(handle), Value::int(5)]);
        assert_eq!(frame.get_return(0).to_bytes().unwrap(), b"");
    }

    #[test]
    fn list_reports_files_and_directories_with_trailing_slash() {
        let handler = FilesystemHandler::new(FilesystemTier::TIER1, false, "disk");
        let mut state = init(&handler);
        call(&handler, state.as_mut(), "makeDirectory", vec![Value::string("dir")]);
        let frame = call(&handler, state.as_mut(), "open", vec![Value::string("dir/a.txt"), Value::string("w")]);
        let handle = frame.get_return(0).to_int();
        call(&handler, state.as_mut(), "write", vec![Value::int(handle), Value::string("x")]);
        call(&handler, state.as_mut(), "close", vec![Value::int(handle)]);

        let frame = call(&handler, state.as_mut(), "list", vec![Value::string("")]);
        let listing = frame.get_return(0);
        let names: Vec<String> = (0..2)
            .map(|i| nn_core::value::array_get(&listing, i).to_str().unwrap().into_owned())
            .collect();
        assert!(names.contains(&"dir/".to_string()));
    }

    #[test]
    fn read_only_filesystem_rejects_writes() {
        let handler = FilesystemHandler::new(FilesystemTier::TIER1, true, "rom");
        let mut state = init(&handler);
        let frame = call(&handler, state.as_mut(), "open", vec![Value::string("a.txt"), Value::string("w")]);
        assert!(frame.get_return(0).is_nil());
        assert_eq!(frame.get_return(1).to_str().unwrap(), "filesystem is read only");
    }
}
