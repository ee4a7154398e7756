//! sema_relations: The structural type model and the relation engine.
//!
//! Types live in an id-keyed arena (`TypeTable`); `RelationChecker`
//! answers identity / subtype / assignability / comparability queries over
//! pairs of them, terminating on recursive and generic structures through
//! caching, an assumption stack, and bounded depth. Variance of generic
//! type parameters is measured by marker-instantiation probes.

mod instantiate;
mod relate;
mod types;
mod variance;

pub use instantiate::{InstantiationCache, Instantiator, TypeMapper};
pub use relate::{
    IntersectionState, MarkerTypes, Relation, RelationCaches, RelationChecker, RelationKey,
    Ternary,
};
pub use types::{
    make_property, member_table, member_types, IndexInfo, ObjectShape, Signature,
    SignatureParameter, Type, TypeKind, TypeTable,
};
