//! sema_ast: Syntax-tree definitions for the sema analyzer.
//!
//! The analyzer does not parse text; trees are produced externally and
//! handed over. This crate defines the closed node-kind vocabulary, the
//! id-handle node arena, the flag bitsets shared by the binder and the
//! relation engine, and a builder that wires parent back-references.

pub mod node;
pub mod syntax_kind;
pub mod types;

pub use node::{Node, NodeData, SyntaxTree, TreeBuilder};
pub use syntax_kind::SyntaxKind;
pub use types::{
    ModifierFlags, NodeFlags, NodeId, ObjectFlags, SymbolFlags, SymbolId, TypeFlags, TypeId,
    Variance,
};
