//! Controller container: resolves a [`ControllerId`] to a wired instance.

use crate::controller::{Controller, ControllerId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct Container {
    controllers: HashMap<ControllerId, Arc<dyn Controller>>,
}

impl Container {
    pub fn new() -> Self {
        Container::default()
    }

    /// Register a ready controller; a later registration of the same type replaces it.
    pub fn provide<C: Controller>(&mut self, controller: C) -> ControllerId {
        self.provide_arc(Arc::new(controller))
    }

    pub fn provide_arc<C: Controller>(&mut self, controller: Arc<C>) -> ControllerId {
        let id = ControllerId::of::<C>();
        self.controllers.insert(id, controller);
        id
    }

    pub fn resolve(&self, id: ControllerId) -> Option<Arc<dyn Controller>> {
        self.controllers.get(&id).cloned()
    }

    pub fn contains(&self, id: ControllerId) -> bool {
        self.controllers.contains_key(&id)
    }
}
