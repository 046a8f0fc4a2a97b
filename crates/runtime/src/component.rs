//! A bound instance of a [`MethodTable`] at a specific address/slot.
//!
//! Grounded on `examples/original_source/src/computer.c`'s
//! `nn_newComponent`/`nn_destroyComponent` and the reference rewrite's
//! `nn_addComponent`/`nn_removeComponent` compaction strategy.

use std::any::Any;
use std::rc::Rc;

use nn_core::constants::NN_COMPONENT_CALLBUDGET;

use crate::method::MethodTable;

/// A live component instance bound to a Computer.
pub struct Component {
    pub address: String,
    pub slot: i32,
    pub table: Rc<MethodTable>,
    pub state: Box<dyn Any + Send>,
    /// Normalized per-tick budget accumulator (§4.6 supplement): incremented
    /// by `cost(amount, per_tick)`, reset every tick alongside the
    /// Computer's call-cost total. `pub(crate)` so `Computer` can hand a
    /// disjoint `&mut` into a `ComponentContext` without aliasing `state`.
    pub(crate) budget_used: f64,
}

impl Component {
    pub fn new(
        address: impl Into<String>,
        slot: i32,
        table: Rc<MethodTable>,
        state: Box<dyn Any + Send>,
    ) -> Self {
        Component {
            address: address.into(),
            slot,
            table,
            state,
            budget_used: 0.0,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.table.type_name
    }

    /// Accumulates `amount / per_tick * NN_COMPONENT_CALLBUDGET` into this
    /// component's normalized budget ledger. Exposed to handlers through
    /// `ComponentContext::charge_component`, which borrows this accumulator
    /// for the duration of a single `call`.
    pub fn cost(&mut self, amount: f64, per_tick: f64) {
        if per_tick > 0.0 {
            self.budget_used += (NN_COMPONENT_CALLBUDGET * amount) / per_tick;
        }
    }

    pub fn is_overused(&self) -> bool {
        self.budget_used >= NN_COMPONENT_CALLBUDGET
    }

    pub fn reset_budget(&mut self) {
        self.budget_used = 0.0;
    }
}
