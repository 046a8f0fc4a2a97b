//! The VM: lifecycle state machine, component registry, signal queue,
//! resource counters, architecture binding, per-tick driver.
//!
//! Grounded primarily on `examples/original_source/src/computer.c` (field
//! set, lifecycle, resource accounting, frame-based call API, signal
//! push/pop), with the call-budget split and per-component budget ledger
//! supplemented from `examples/original_source/rewrite/neonucleus.c`'s
//! `nn_addComponent`/`nn_call`/`nn_componentsOverused`.

use std::rc::Rc;

use nn_core::constants::{
    NN_MAX_ARCHITECTURES, NN_MAX_ARGS, NN_MAX_RETS, NN_MAX_SIGNALS, NN_MAX_SIGNAL_VALS,
    NN_MAX_SIGNAL_SIZE, NN_MAX_STACK, NN_MAX_USERNAME, NN_MAX_USERS,
};
use nn_core::{Context, Exit, NnResult, Value};
use tracing::{debug, warn};

use crate::architecture::Architecture;
use crate::callframe::CallFrame;
use crate::component::Component;
use crate::device_info::DeviceInfoList;
use crate::method::{ComponentContext, MethodTable};
use crate::resources::ResourceAccounting;
use crate::signal::SignalQueue;

/// Lifecycle states a Computer can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputerState {
    /// Entered at creation, before the first tick's ARCH_INIT dispatch.
    Bootup,
    Running,
    /// Per-tick call budget exhausted; reset to Running on the next tick.
    Overworked,
    /// Energy reached zero; host must restore energy or delete.
    Blackout,
    /// Guest requested shutdown, terminal.
    Poweroff,
    /// Guest requested restart; host re-creates the computer.
    Restart,
    /// Guest requested an architecture switch; host rebinds and re-ticks.
    Switch,
    /// Architecture reported a fatal error; terminal.
    Crashed,
}

/// The VM: one bound architecture, a registry of components, a signal
/// queue, resource counters, and the call-frame conventions guest code
/// uses to invoke component methods.
pub struct Computer {
    context: Context,
    address: String,
    tmp_address: Option<String>,

    state: ComputerState,
    architecture: Option<Box<dyn Architecture>>,
    architecture_name: Option<String>,
    desired_architecture: Option<String>,
    supported_architectures: Vec<String>,

    components: Vec<Component>,
    component_cap: usize,
    device_info: DeviceInfoList,

    frame: CallFrame,
    signals: SignalQueue,
    users: Vec<String>,
    resources: ResourceAccounting,

    memory_total: u64,

    error_message: Option<String>,
    created_at: f64,
}

impl Computer {
    pub fn new(
        context: Context,
        component_cap: usize,
        max_energy: f64,
        room_temperature: f64,
        total_call_budget: f64,
        memory_total: u64,
    ) -> Self {
        let address = context.new_address();
        let created_at = context.now();
        Computer {
            context,
            address,
            tmp_address: None,
            state: ComputerState::Bootup,
            architecture: None,
            architecture_name: None,
            desired_architecture: None,
            supported_architectures: Vec::new(),
            components: Vec::new(),
            component_cap,
            device_info: DeviceInfoList::new(),
            frame: CallFrame::new(NN_MAX_ARGS, NN_MAX_RETS, NN_MAX_STACK),
            signals: SignalQueue::new(NN_MAX_SIGNALS, NN_MAX_SIGNAL_VALS, NN_MAX_SIGNAL_SIZE),
            users: Vec::new(),
            resources: ResourceAccounting::new(max_energy, room_temperature, total_call_budget),
            memory_total,
            error_message: None,
            created_at,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn tmp_address(&self) -> Option<&str> {
        self.tmp_address.as_deref()
    }

    pub fn set_tmp_address(&mut self, address: impl Into<String>) {
        self.tmp_address = Some(address.into());
    }

    pub fn state(&self) -> ComputerState {
        self.state
    }

    pub fn set_state(&mut self, state: ComputerState) {
        self.state = state;
    }

    pub fn uptime(&self) -> f64 {
        self.context.now() - self.created_at
    }

    pub fn frame(&self) -> &CallFrame {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut CallFrame {
        &mut self.frame
    }

    pub fn resources(&self) -> &ResourceAccounting {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceAccounting {
        &mut self.resources
    }

    // --- error buffer ---

    pub fn error(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    fn set_error_from_exit(&mut self, exit: Exit) {
        self.error_message = Some(exit.canonical_message().to_string());
    }

    // --- architectures ---

    pub fn add_supported_architecture(&mut self, name: impl Into<String>) -> NnResult<()> {
        if self.supported_architectures.len() >= NN_MAX_ARCHITECTURES {
            return Err(Exit::Limit);
        }
        self.supported_architectures.push(name.into());
        Ok(())
    }

    pub fn supported_architectures(&self) -> &[String] {
        &self.supported_architectures
    }

    /// Binds the initial architecture. Only legal in BOOTUP.
    pub fn set_architecture(&mut self, architecture: Box<dyn Architecture>) {
        self.architecture_name = Some(architecture.name().to_string());
        self.architecture = Some(architecture);
    }

    pub fn architecture_name(&self) -> Option<&str> {
        self.architecture_name.as_deref()
    }

    pub fn set_desired_architecture(&mut self, name: impl Into<String>) {
        self.desired_architecture = Some(name.into());
    }

    pub fn desired_architecture(&self) -> Option<&str> {
        self.desired_architecture.as_deref()
    }

    /// Tears down the current architecture and swaps in `next`, used when
    /// handling the SWITCH/CHARCH state.
    pub fn switch_architecture(&mut self, next: Box<dyn Architecture>) {
        if let Some(mut old) = self.architecture.take() {
            old.deinit(self);
        }
        self.desired_architecture = None;
        self.set_architecture(next);
        self.state = ComputerState::Bootup;
    }

    pub fn memory_used(&self) -> u64 {
        self.architecture.as_ref().map(|a| a.memory_used()).unwrap_or(0)
    }

    pub fn memory_total(&self) -> u64 {
        self.memory_total
    }

    // --- lifecycle ---

    /// One invocation of the architecture's TICK handler plus surrounding
    /// bookkeeping (budget reset, state check, error clear).
    pub fn tick(&mut self) -> NnResult<ComputerState> {
        self.resources.reset_call_budget();
        for component in &mut self.components {
            component.reset_budget();
        }
        self.frame.clear_stack();
        self.frame.reset_call();
        self.clear_error();

        match self.state {
            ComputerState::Bootup => {
                let mut arch = self.architecture.take().ok_or(Exit::BadState)?;
                let result = arch.init(self);
                self.architecture = Some(arch);
                self.finish_arch_dispatch(result, ComputerState::Running)?;
            }
            ComputerState::Overworked => {
                self.state = ComputerState::Running;
                self.run_tick()?;
            }
            ComputerState::Running => {
                self.run_tick()?;
            }
            _ => return Err(Exit::BadState),
        }
        Ok(self.state)
    }

    fn run_tick(&mut self) -> NnResult<()> {
        let mut arch = self.architecture.take().ok_or(Exit::BadState)?;
        let result = arch.tick(self);
        self.architecture = Some(arch);
        self.finish_arch_dispatch(result, self.state)
    }

    fn finish_arch_dispatch(&mut self, result: NnResult<()>, on_ok: ComputerState) -> NnResult<()> {
        match result {
            Ok(()) => {
                self.state = on_ok;
                Ok(())
            }
            Err(e) => {
                self.set_error_from_exit(e);
                self.state = ComputerState::Crashed;
                Err(e)
            }
        }
    }

    // --- users ---

    pub fn has_user(&self, name: &str) -> bool {
        self.users.is_empty() || self.users.iter().any(|u| u == name)
    }

    pub fn add_user(&mut self, name: impl Into<String>) -> NnResult<()> {
        if self.users.len() >= NN_MAX_USERS {
            return Err(Exit::Limit);
        }
        let name = name.into();
        let name = if name.len() > NN_MAX_USERNAME {
            name[..NN_MAX_USERNAME].to_string()
        } else {
            name
        };
        self.users.push(name);
        Ok(())
    }

    /// Removes every entry matching `name`; returns whether any were
    /// removed.
    pub fn remove_user(&mut self, name: &str) -> bool {
        let before = self.users.len();
        self.users.retain(|u| u != name);
        self.users.len() != before
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    // --- device info ---

    pub fn device_info(&self) -> &DeviceInfoList {
        &self.device_info
    }

    pub fn device_info_mut(&mut self) -> &mut DeviceInfoList {
        &mut self.device_info
    }

    // --- signals ---

    /// Signals only exist while RUNNING: a non-running computer silently
    /// drops the values and reports success.
    pub fn push_signal(&mut self, values: Vec<Value>) -> NnResult<()> {
        if self.state != ComputerState::Running && self.state != ComputerState::Overworked {
            return Ok(());
        }
        self.signals.push(values)
    }

    /// Transfers the head signal's values onto the call frame's argument
    /// slots in order.
    pub fn pop_signal(&mut self) -> NnResult<()> {
        let values = self.signals.pop()?;
        self.frame.set_arguments(values);
        Ok(())
    }

    pub fn signal_queue_len(&self) -> usize {
        self.signals.len()
    }

    pub fn peek_signal(&self) -> Option<&[Value]> {
        self.signals.peek().map(|s| s.values())
    }

    // --- components ---

    pub fn has_component(&self, address: &str) -> bool {
        self.components.iter().any(|c| c.address == address)
    }

    pub fn has_method(&self, address: &str, method: &str) -> bool {
        self.components
            .iter()
            .find(|c| c.address == address)
            .map(|c| {
                let has_method = c.table.find_method(method).is_some();
                has_method && c.table.handler.enabled(c.state.as_ref(), method)
            })
            .unwrap_or(false)
    }

    pub fn component_address(&self, index: usize) -> Option<&str> {
        self.components.get(index).map(|c| c.address.as_str())
    }

    pub fn component_type_name(&self, address: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|c| c.address == address)
            .map(|c| c.type_name())
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Adds a new component instance. Fails with `Limit` if the registry
    /// is full. If the Computer is already RUNNING (not BOOTUP), emits a
    /// `("component_added", address, typename)` signal.
    pub fn add_component(
        &mut self,
        table: Rc<MethodTable>,
        address: impl Into<String>,
        slot: i32,
    ) -> NnResult<()> {
        if self.components.len() >= self.component_cap {
            return Err(Exit::Limit);
        }
        let address = address.into();
        let type_name = table.type_name.clone();

        let mut init_budget = 0.0f64;
        let state = {
            let mut cx = ComponentContext {
                frame: &mut self.frame,
                resources: &mut self.resources,
                signals: &mut self.signals,
                component_budget: &mut init_budget,
                address: &address,
            };
            table.handler.init(&mut cx)?
        };

        self.components
            .push(Component::new(address.clone(), slot, table, state));

        if self.state == ComputerState::Running {
            let _ = self.push_signal(vec![
                Value::cstr("component_added"),
                Value::string(address),
                Value::string(type_name),
            ]);
        }
        debug!(component_count = self.components.len(), "component added");
        Ok(())
    }

    /// Removes a component by address, invoking its handler's DEINIT.
    /// Returns `BadState` if no component has that address.
    pub fn remove_component(&mut self, address: &str) -> NnResult<()> {
        let index = self
            .components
            .iter()
            .position(|c| c.address == address)
            .ok_or(Exit::BadState)?;

        let mut component = self.components.remove(index);
        {
            let address = component.address.clone();
            let handler = Rc::clone(&component.table.handler);
            let mut cx = ComponentContext {
                frame: &mut self.frame,
                resources: &mut self.resources,
                signals: &mut self.signals,
                component_budget: &mut component.budget_used,
                address: &address,
            };
            handler.deinit(component.state.as_mut(), &mut cx);
        }

        if self.state == ComputerState::Running {
            let type_name = component.type_name().to_string();
            let _ = self.push_signal(vec![
                Value::cstr("component_removed"),
                Value::string(component.address.clone()),
                Value::string(type_name),
            ]);
        }
        Ok(())
    }

    pub fn components_overused(&self) -> bool {
        self.resources.is_overworked() || self.components.iter().any(|c| c.is_overused())
    }

    /// Invokes `method` on the component at `address`.
    ///
    /// `no such component`/`no such method` are transport failures: the
    /// call frame is left empty (already reset this tick / by the previous
    /// call) and `Exit::BadCall` is returned with the message installed in
    /// the error buffer. A method that runs but fails for a domain reason
    /// (bad argument, checksum mismatch, ...) instead returns `Ok(())`
    /// having pushed exactly `(nil, message)` onto the frame itself.
    pub fn invoke(&mut self, address: &str, method: &str) -> NnResult<()> {
        let index = match self.components.iter().position(|c| c.address == address) {
            Some(i) => i,
            None => {
                self.set_error("no such component");
                return Err(Exit::BadCall);
            }
        };

        let descriptor = match self.components[index].table.find_method(method) {
            Some(m) => *m,
            None => {
                self.set_error("no such method");
                return Err(Exit::BadCall);
            }
        };

        let enabled = {
            let comp = &self.components[index];
            comp.table.handler.enabled(comp.state.as_ref(), method)
        };
        if !enabled {
            self.set_error("no such method");
            return Err(Exit::BadCall);
        }

        let exhausted = self.resources.call_cost(nn_core::constants::NN_CALL_COST);
        if exhausted {
            self.state = ComputerState::Overworked;
        }
        if !descriptor.is_direct() {
            self.resources.zero_remaining_budget();
            self.state = ComputerState::Overworked;
            self.busy_sleep(nn_core::constants::NN_INDIRECT_CALL_LATENCY);
        }

        let handler = Rc::clone(&self.components[index].table.handler);
        let mut state = std::mem::replace(&mut self.components[index].state, Box::new(()));
        let address_owned = self.components[index].address.clone();

        let result = {
            let mut cx = ComponentContext {
                frame: &mut self.frame,
                resources: &mut self.resources,
                signals: &mut self.signals,
                component_budget: &mut self.components[index].budget_used,
                address: &address_owned,
            };
            handler.call(state.as_mut(), method, &mut cx)
        };

        self.components[index].state = state;

        // Mirrors `nn_removeEnergy`'s blackout transition (see
        // examples/original_source/src/computer.c:268-275): whichever
        // component call drained energy to zero is responsible for the
        // Computer entering BLACKOUT, not just for reporting it.
        if self.resources.energy() <= 0.0 {
            self.state = ComputerState::Blackout;
        }

        match result {
            Ok(()) => {
                self.frame.clear_arguments();
                Ok(())
            }
            Err(Exit::BadCall) => Err(Exit::BadCall),
            Err(e) => {
                self.set_error_from_exit(e);
                self.frame.reset_call();
                Err(e)
            }
        }
    }

    /// A deliberate, short spin used to emulate component latency. This
    /// workspace accounts for it rather than performing a real sleep, so
    /// tests stay deterministic and fast; see SPEC_FULL.md §5.
    pub fn busy_sleep(&self, seconds: f64) {
        if seconds > 0.0 {
            warn!(seconds, "busy_sleep accounted (no real delay taken)");
        }
    }
}
