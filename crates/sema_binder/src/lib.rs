//! sema_binder: Symbol table construction and scope analysis.
//!
//! The binder walks a syntax tree and creates symbols, links declarations,
//! and builds the container and block-scope tables downstream phases
//! resolve names against.

mod binder;
mod links;
mod symbol;

pub use binder::{BindError, BindResult, Binder};
pub use links::{Links, SymbolLinks};
pub use symbol::{
    escape_identifier, internal_names, unescape_identifier, Symbol, SymbolArena, SymbolTable,
};
