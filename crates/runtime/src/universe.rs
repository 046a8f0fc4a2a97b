//! Process-wide container of shared VTables and the clock; multiple
//! Computers share one Universe.
//!
//! Grounded on `examples/original_source/rewrite/neonucleus.h`'s
//! `nn_Universe`/`nn_createUniverse`, with the string-keyed named-userdata
//! map kept (rather than replaced by a compile-time-tagged registry) since
//! this workspace's component types genuinely are registered dynamically
//! by name at runtime, matching the teacher's own `once_cell`-backed
//! static-registry idiom for the lookup itself.

use std::rc::Rc;
use std::sync::Arc;

use hashbrown::HashMap;
use nn_core::constants::NN_MAX_USERDATA;
use nn_core::{Clock, Context, Exit, NnResult};

use crate::method::MethodTable;

/// Process-wide container shared by every Computer created from it.
pub struct Universe {
    context: Context,
    component_types: HashMap<String, Rc<MethodTable>>,
    /// Clock binding independent of `Context.clock`, for test injection
    /// without having to rebuild the whole Context.
    clock_override: Option<Arc<dyn Clock>>,
}

impl Universe {
    pub fn new(context: Context) -> Self {
        Universe {
            context,
            component_types: HashMap::new(),
            clock_override: None,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock_override = Some(clock);
    }

    pub fn now(&self) -> f64 {
        match &self.clock_override {
            Some(clock) => clock.now(),
            None => self.context.now(),
        }
    }

    /// Registers a component type's MethodTable once per universe. Fails
    /// with `Limit` once `NN_MAX_USERDATA` distinct types are registered.
    pub fn register_component_type(&mut self, table: MethodTable) -> NnResult<Rc<MethodTable>> {
        if self.component_types.len() >= NN_MAX_USERDATA {
            return Err(Exit::Limit);
        }
        let name = table.type_name.clone();
        let rc = Rc::new(table);
        self.component_types.insert(name, Rc::clone(&rc));
        Ok(rc)
    }

    pub fn component_type(&self, name: &str) -> Option<Rc<MethodTable>> {
        self.component_types.get(name).cloned()
    }

    pub fn new_address(&self) -> String {
        self.context.new_address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::{ComponentContext, ComponentHandler, Method};
    use std::any::Any;

    struct Noop;
    impl ComponentHandler for Noop {
        fn type_name(&self) -> &str {
            "noop"
        }
        fn methods(&self) -> &[Method] {
            &[]
        }
        fn init(&self, _cx: &mut ComponentContext) -> NnResult<Box<dyn Any + Send>> {
            Ok(Box::new(()))
        }
        fn call(
            &self,
            _state: &mut (dyn Any + Send),
            _method: &str,
            _cx: &mut ComponentContext,
        ) -> NnResult<()> {
            Ok(())
        }
    }

    #[test]
    fn register_and_lookup_component_type() {
        let mut universe = Universe::new(Context::single_threaded());
        let table = MethodTable::new(Rc::new(Noop));
        universe.register_component_type(table).unwrap();
        assert!(universe.component_type("noop").is_some());
        assert!(universe.component_type("missing").is_none());
    }
}
