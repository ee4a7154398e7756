//! Lazily-populated side table of derived facts about symbols.
//!
//! Cached fields follow a fill-once-then-reuse discipline: a `None` means
//! "not computed yet", never "known absent".

use rustc_hash::FxHashMap;
use sema_ast::types::{SymbolId, TypeId};

/// Derived facts cached for one symbol.
#[derive(Debug, Clone, Default)]
pub struct Links {
    /// The type of a value symbol (e.g. a property's annotated type).
    pub type_of: Option<TypeId>,
    /// The declared type of a type symbol (class instance type, interface
    /// type, alias target).
    pub declared_type: Option<TypeId>,
}

/// Side table keyed by symbol id.
#[derive(Debug, Default)]
pub struct SymbolLinks {
    map: FxHashMap<SymbolId, Links>,
}

impl SymbolLinks {
    pub fn new() -> Self {
        Self {
            map: FxHashMap::default(),
        }
    }

    pub fn get(&self, id: SymbolId) -> Option<&Links> {
        self.map.get(&id)
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Links {
        self.map.entry(id).or_default()
    }

    /// The cached type of a value symbol, if resolved.
    pub fn type_of(&self, id: SymbolId) -> Option<TypeId> {
        self.map.get(&id).and_then(|links| links.type_of)
    }

    /// Record the resolved type of a value symbol. Fill-once: a second call
    /// with a different type is ignored.
    pub fn set_type_of(&mut self, id: SymbolId, type_id: TypeId) {
        let links = self.get_mut(id);
        if links.type_of.is_none() {
            links.type_of = Some(type_id);
        }
    }

    pub fn declared_type(&self, id: SymbolId) -> Option<TypeId> {
        self.map.get(&id).and_then(|links| links.declared_type)
    }

    pub fn set_declared_type(&mut self, id: SymbolId, type_id: TypeId) {
        let links = self.get_mut(id);
        if links.declared_type.is_none() {
            links.declared_type = Some(type_id);
        }
    }
}
