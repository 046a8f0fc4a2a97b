//! Method descriptors, the `ComponentHandler` trait, and `MethodTable`
//! (a.k.a. ComponentType).
//!
//! Grounded on `examples/original_source/src/component.c` (method table
//! construction, `invokeComponentMethod`'s direct/indirect busy-sleep
//! distinction) with the void-pointer generic-handler style replaced by a
//! `Box<dyn ComponentHandler>` trait object, structurally modeled on the
//! teacher's `crates/extensions/src/plugin.rs` `Plugin` trait (synchronous;
//! the async machinery is dropped since no scheduler is in scope).

use std::any::Any;

use bitflags::bitflags;
use nn_core::constants::NN_COMPONENT_CALLBUDGET;
use nn_core::NnResult;

use crate::callframe::CallFrame;
use crate::resources::ResourceAccounting;
use crate::signal::SignalQueue;

bitflags! {
    /// Per-method flags. `DIRECT` methods are safe to call synchronously
    /// without forcing a yield; everything else is indirect. `GETTER`,
    /// `SETTER`, and `FIELD` mirror the OpenComputers field abstraction and
    /// are informational for this workspace's handlers (they do not change
    /// dispatch behavior beyond direct/indirect).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodFlags: u8 {
        const DIRECT = 0b0001;
        const GETTER = 0b0010;
        const SETTER = 0b0100;
        const FIELD  = 0b1000;
    }
}

/// A single named, doc-stringed method descriptor.
#[derive(Debug, Clone, Copy)]
pub struct Method {
    pub name: &'static str,
    pub doc: &'static str,
    pub flags: MethodFlags,
}

impl Method {
    pub const fn direct(name: &'static str, doc: &'static str) -> Self {
        Method {
            name,
            doc,
            flags: MethodFlags::DIRECT,
        }
    }

    pub const fn indirect(name: &'static str, doc: &'static str) -> Self {
        Method {
            name,
            doc,
            flags: MethodFlags::empty(),
        }
    }

    pub fn is_direct(&self) -> bool {
        self.flags.contains(MethodFlags::DIRECT)
    }
}

/// Everything a `ComponentHandler::call` implementation needs besides its
/// own per-instance state: the call frame to read arguments from and write
/// returns to, the resource-accounting hooks (§4.6), the owning computer's
/// signal queue (for peripherals that push signals, e.g. the modem), and
/// this component instance's own address.
pub struct ComponentContext<'a> {
    pub frame: &'a mut CallFrame,
    pub resources: &'a mut ResourceAccounting,
    pub signals: &'a mut SignalQueue,
    /// This instance's normalized per-tick budget accumulator (§4.6
    /// supplement). Handlers charge it via `charge_component` instead of
    /// touching the `Component` directly, since the handler only ever sees
    /// this context, never the owning `Computer`.
    pub component_budget: &'a mut f64,
    pub address: &'a str,
}

impl<'a> ComponentContext<'a> {
    /// Accumulates `amount / per_tick * NN_COMPONENT_CALLBUDGET` into this
    /// instance's normalized budget ledger, matching `nn_costComponent`.
    pub fn charge_component(&mut self, amount: f64, per_tick: f64) {
        if per_tick > 0.0 {
            *self.component_budget += (NN_COMPONENT_CALLBUDGET * amount) / per_tick;
        }
    }
}

/// A dynamically registered peripheral type: the trait-object-dispatch
/// replacement for the reference implementation's void-pointer + generic
/// request-enum handler.
pub trait ComponentHandler: Send {
    /// The type name components of this handler are registered under.
    fn type_name(&self) -> &str;

    /// The static method table advertised for this type.
    fn methods(&self) -> &[Method];

    /// Builds a new instance's per-instance state. An `Err` aborts
    /// `addComponent` with the returned code (mapped to the handler's
    /// message, if any, by the caller).
    fn init(&self, cx: &mut ComponentContext) -> NnResult<Box<dyn Any + Send>>;

    /// Tears down an instance's state. Invoked exactly once, either when
    /// `removeComponent` is called or when the owning Computer is torn
    /// down.
    fn deinit(&self, _state: &mut (dyn Any + Send), _cx: &mut ComponentContext) {}

    /// Whether `state` currently exposes `method`. Defaults to `true`,
    /// matching the reference implementation's "handlers that don't
    /// implement ENABLED still report enabled" behavior.
    fn enabled(&self, _state: &(dyn Any + Send), _method: &str) -> bool {
        true
    }

    /// Dispatches a CALL. Implementations read arguments via
    /// `cx.frame.get_argument`, apply whatever cost hooks apply, and write
    /// results via `cx.frame.push_return`. The frame's argument list still
    /// holds the caller's arguments when this is invoked; the caller
    /// (`Computer::invoke`) resets it to hold only the returns afterward.
    fn call(
        &self,
        state: &mut (dyn Any + Send),
        method: &str,
        cx: &mut ComponentContext,
    ) -> NnResult<()>;
}

/// The static description of a peripheral type: its name, methods, and
/// handler. Outlives any Component instance bound to it.
pub struct MethodTable {
    pub type_name: String,
    pub handler: std::rc::Rc<dyn ComponentHandler>,
}

impl MethodTable {
    pub fn new(handler: std::rc::Rc<dyn ComponentHandler>) -> Self {
        MethodTable {
            type_name: handler.type_name().to_string(),
            handler,
        }
    }

    pub fn find_method(&self, name: &str) -> Option<&Method> {
        self.handler.methods().iter().find(|m| m.name == name)
    }
}
