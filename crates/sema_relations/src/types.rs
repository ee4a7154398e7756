//! Type system representation.
//!
//! Types are stored in a `TypeTable` (type arena) and referenced by
//! `TypeId`. Two types are "the same type" iff they have the same id, never
//! by deep value equality; every cache in the relation engine builds on
//! that identity. Regular literal types and generic references are interned
//! so equal shapes share an id.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use sema_ast::types::{ObjectFlags, SymbolFlags, SymbolId, TypeFlags, TypeId};
use sema_binder::{escape_identifier, SymbolArena, SymbolLinks, SymbolTable};
use sema_core::intern::StringInterner;

/// A type in the analyzed type system.
#[derive(Debug, Clone)]
pub struct Type {
    /// Unique identity key, used in relation-cache keys.
    pub id: TypeId,
    /// Type flags describing what kind of type this is.
    pub flags: TypeFlags,
    /// The symbol that produced this type (object, class, interface, enum,
    /// generic reference).
    pub symbol: Option<SymbolId>,
    /// The specific kind of type.
    pub kind: TypeKind,
}

/// The specific data for each type kind.
#[derive(Debug, Clone)]
pub enum TypeKind {
    /// Intrinsic types: any, unknown, string, number, boolean, bigint,
    /// symbol, void, undefined, null, never, object.
    Intrinsic { name: &'static str },
    /// String literal type. Fresh literals point at their widened regular
    /// form.
    StringLiteral {
        value: String,
        fresh: bool,
        regular: Option<TypeId>,
    },
    /// Number literal type.
    NumberLiteral {
        value: f64,
        fresh: bool,
        regular: Option<TypeId>,
    },
    /// Boolean literal type (true/false).
    BooleanLiteral { value: bool },
    /// An enum type; the symbol back-reference identifies the enum.
    Enum,
    /// An enum member literal type; the symbol back-reference identifies
    /// the member, whose parent is the enum.
    EnumLiteral { value: Option<f64> },
    /// Object type (class instance, interface, object literal, function).
    Object(ObjectShape),
    /// Union type (A | B | C).
    Union { types: Vec<TypeId> },
    /// Intersection type (A & B & C).
    Intersection { types: Vec<TypeId> },
    /// Type parameter (T).
    TypeParameter {
        constraint: Option<TypeId>,
        default: Option<TypeId>,
    },
    /// keyof T.
    Index { target: TypeId },
    /// Indexed access type (T[K]).
    IndexedAccess {
        object_type: TypeId,
        index_type: TypeId,
    },
    /// Conditional type (T extends U ? X : Y).
    Conditional {
        check_type: TypeId,
        extends_type: TypeId,
        true_type: TypeId,
        false_type: TypeId,
    },
    /// Mapped type ({ [K in C]: T }).
    Mapped {
        type_parameter: TypeId,
        constraint_type: TypeId,
        template_type: Option<TypeId>,
    },
    /// Generic instantiation of a target type.
    Reference {
        target: TypeId,
        type_arguments: Vec<TypeId>,
    },
}

/// Structural payload of an object type. Members are property *symbols*
/// (accessibility and optionality live on the symbol); their types hang off
/// `SymbolLinks`.
#[derive(Debug, Clone, Default)]
pub struct ObjectShape {
    pub object_flags: ObjectFlags,
    pub members: SymbolTable,
    pub call_signatures: Vec<Signature>,
    pub construct_signatures: Vec<Signature>,
    pub string_index: Option<IndexInfo>,
    pub number_index: Option<IndexInfo>,
    /// Type parameters of a generic class/interface target.
    pub type_parameters: Vec<TypeId>,
    /// Base types, used for protected-member derivation checks.
    pub base_types: Vec<TypeId>,
}

/// A function/method signature.
#[derive(Debug, Clone)]
pub struct Signature {
    pub type_parameters: Vec<TypeId>,
    pub parameters: Vec<SignatureParameter>,
    pub return_type: TypeId,
    pub min_argument_count: u32,
    pub has_rest_parameter: bool,
}

/// A parameter in a signature.
#[derive(Debug, Clone)]
pub struct SignatureParameter {
    pub name: String,
    pub type_id: TypeId,
    pub optional: bool,
}

/// An index signature (string or number indexer).
#[derive(Debug, Clone)]
pub struct IndexInfo {
    pub value_type: TypeId,
    pub is_readonly: bool,
}

/// The type table stores all types of one analysis session and provides
/// access by `TypeId`. Ids are monotonic and never reused.
#[derive(Debug)]
pub struct TypeTable {
    types: Vec<Type>,
    // Well-known intrinsic types, created up front.
    pub any_type: TypeId,
    pub unknown_type: TypeId,
    pub string_type: TypeId,
    pub number_type: TypeId,
    pub boolean_type: TypeId,
    pub bigint_type: TypeId,
    pub es_symbol_type: TypeId,
    pub void_type: TypeId,
    pub undefined_type: TypeId,
    pub null_type: TypeId,
    pub never_type: TypeId,
    pub non_primitive_type: TypeId,
    pub true_type: TypeId,
    pub false_type: TypeId,
    // Interning caches: regular literals and generic references share ids.
    string_literals: FxHashMap<String, TypeId>,
    number_literals: FxHashMap<u64, TypeId>,
    references: FxHashMap<(TypeId, Vec<TypeId>), TypeId>,
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::with_capacity(1024),
            any_type: TypeId(0),
            unknown_type: TypeId(1),
            string_type: TypeId(2),
            number_type: TypeId(3),
            boolean_type: TypeId(4),
            bigint_type: TypeId(5),
            es_symbol_type: TypeId(6),
            void_type: TypeId(7),
            undefined_type: TypeId(8),
            null_type: TypeId(9),
            never_type: TypeId(10),
            non_primitive_type: TypeId(11),
            true_type: TypeId(12),
            false_type: TypeId(13),
            string_literals: FxHashMap::default(),
            number_literals: FxHashMap::default(),
            references: FxHashMap::default(),
        };

        table.create_intrinsic(TypeFlags::ANY, "any");
        table.create_intrinsic(TypeFlags::UNKNOWN, "unknown");
        table.create_intrinsic(TypeFlags::STRING, "string");
        table.create_intrinsic(TypeFlags::NUMBER, "number");
        table.create_intrinsic(TypeFlags::BOOLEAN, "boolean");
        table.create_intrinsic(TypeFlags::BIG_INT, "bigint");
        table.create_intrinsic(TypeFlags::ES_SYMBOL, "symbol");
        table.create_intrinsic(TypeFlags::VOID, "void");
        table.create_intrinsic(TypeFlags::UNDEFINED, "undefined");
        table.create_intrinsic(TypeFlags::NULL, "null");
        table.create_intrinsic(TypeFlags::NEVER, "never");
        table.create_intrinsic(TypeFlags::NON_PRIMITIVE, "object");
        table.add_type(
            TypeFlags::BOOLEAN_LITERAL,
            TypeKind::BooleanLiteral { value: true },
        );
        table.add_type(
            TypeFlags::BOOLEAN_LITERAL,
            TypeKind::BooleanLiteral { value: false },
        );

        table
    }

    fn create_intrinsic(&mut self, flags: TypeFlags, name: &'static str) -> TypeId {
        self.add_type(flags, TypeKind::Intrinsic { name })
    }

    /// Add a new type to the table and return its ID.
    pub fn add_type(&mut self, flags: TypeFlags, kind: TypeKind) -> TypeId {
        self.add_type_with_symbol(flags, kind, None)
    }

    /// Add a new type carrying a back-reference to its originating symbol.
    pub fn add_type_with_symbol(
        &mut self,
        flags: TypeFlags,
        kind: TypeKind,
        symbol: Option<SymbolId>,
    ) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(Type {
            id,
            flags,
            symbol,
            kind,
        });
        id
    }

    /// Get a type by its ID.
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.index()]
    }

    /// Get a mutable reference to a type by its ID.
    pub fn get_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.index()]
    }

    /// Get the total number of types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    // ========================================================================
    // Factories
    // ========================================================================

    /// The regular (widened identity) string literal type for a value.
    /// Interned: equal values share an id.
    pub fn string_literal(&mut self, value: &str) -> TypeId {
        if let Some(&id) = self.string_literals.get(value) {
            return id;
        }
        let id = self.add_type(
            TypeFlags::STRING_LITERAL,
            TypeKind::StringLiteral {
                value: value.to_string(),
                fresh: false,
                regular: None,
            },
        );
        self.string_literals.insert(value.to_string(), id);
        id
    }

    /// A fresh string literal type pointing at its regular form.
    pub fn fresh_string_literal(&mut self, value: &str) -> TypeId {
        let regular = self.string_literal(value);
        self.add_type(
            TypeFlags::STRING_LITERAL,
            TypeKind::StringLiteral {
                value: value.to_string(),
                fresh: true,
                regular: Some(regular),
            },
        )
    }

    /// The regular number literal type for a value. Interned by bit pattern.
    pub fn number_literal(&mut self, value: f64) -> TypeId {
        let key = value.to_bits();
        if let Some(&id) = self.number_literals.get(&key) {
            return id;
        }
        let id = self.add_type(
            TypeFlags::NUMBER_LITERAL,
            TypeKind::NumberLiteral {
                value,
                fresh: false,
                regular: None,
            },
        );
        self.number_literals.insert(key, id);
        id
    }

    /// A fresh number literal type pointing at its regular form.
    pub fn fresh_number_literal(&mut self, value: f64) -> TypeId {
        let regular = self.number_literal(value);
        self.add_type(
            TypeFlags::NUMBER_LITERAL,
            TypeKind::NumberLiteral {
                value,
                fresh: true,
                regular: Some(regular),
            },
        )
    }

    /// A union over the given constituents. Nested unions flatten, exact
    /// duplicates collapse, and a single constituent is returned as-is.
    pub fn union(&mut self, types: Vec<TypeId>) -> TypeId {
        let mut flat = Vec::new();
        for t in types {
            match &self.get(t).kind {
                TypeKind::Union { types } => flat.extend(types.iter().copied()),
                _ => flat.push(t),
            }
        }
        let mut seen = Vec::new();
        flat.retain(|t| {
            if seen.contains(t) {
                false
            } else {
                seen.push(*t);
                true
            }
        });
        match flat.len() {
            0 => self.never_type,
            1 => flat[0],
            _ => self.add_type(TypeFlags::UNION, TypeKind::Union { types: flat }),
        }
    }

    /// An intersection over the given constituents.
    pub fn intersection(&mut self, types: Vec<TypeId>) -> TypeId {
        let mut flat = Vec::new();
        for t in types {
            match &self.get(t).kind {
                TypeKind::Intersection { types } => flat.extend(types.iter().copied()),
                _ => flat.push(t),
            }
        }
        let mut seen = Vec::new();
        flat.retain(|t| {
            if seen.contains(t) {
                false
            } else {
                seen.push(*t);
                true
            }
        });
        match flat.len() {
            0 => self.unknown_type,
            1 => flat[0],
            _ => self.add_type(
                TypeFlags::INTERSECTION,
                TypeKind::Intersection { types: flat },
            ),
        }
    }

    /// An object type from a shape.
    pub fn object(&mut self, shape: ObjectShape, symbol: Option<SymbolId>) -> TypeId {
        self.add_type_with_symbol(TypeFlags::OBJECT, TypeKind::Object(shape), symbol)
    }

    /// A type parameter.
    pub fn type_parameter(&mut self, symbol: Option<SymbolId>, constraint: Option<TypeId>) -> TypeId {
        self.add_type_with_symbol(
            TypeFlags::TYPE_PARAMETER,
            TypeKind::TypeParameter {
                constraint,
                default: None,
            },
            symbol,
        )
    }

    /// A generic reference. Interned: the same (target, arguments) pair
    /// always yields the same id, which is what lets structurally-equal
    /// instantiations share relation-cache entries.
    pub fn reference(&mut self, target: TypeId, type_arguments: Vec<TypeId>) -> TypeId {
        let key = (target, type_arguments.clone());
        if let Some(&id) = self.references.get(&key) {
            return id;
        }
        let symbol = self.get(target).symbol;
        let id = self.add_type_with_symbol(
            TypeFlags::OBJECT,
            TypeKind::Reference {
                target,
                type_arguments,
            },
            symbol,
        );
        self.references.insert(key, id);
        id
    }

    /// keyof T.
    pub fn index_type(&mut self, target: TypeId) -> TypeId {
        self.add_type(TypeFlags::INDEX, TypeKind::Index { target })
    }

    /// T[K].
    pub fn indexed_access(&mut self, object_type: TypeId, index_type: TypeId) -> TypeId {
        self.add_type(
            TypeFlags::INDEXED_ACCESS,
            TypeKind::IndexedAccess {
                object_type,
                index_type,
            },
        )
    }

    /// T extends U ? X : Y.
    pub fn conditional(
        &mut self,
        check_type: TypeId,
        extends_type: TypeId,
        true_type: TypeId,
        false_type: TypeId,
    ) -> TypeId {
        self.add_type(
            TypeFlags::CONDITIONAL,
            TypeKind::Conditional {
                check_type,
                extends_type,
                true_type,
                false_type,
            },
        )
    }

    /// { [K in C]: T }.
    pub fn mapped(
        &mut self,
        type_parameter: TypeId,
        constraint_type: TypeId,
        template_type: Option<TypeId>,
    ) -> TypeId {
        self.add_type(
            TypeFlags::OBJECT,
            TypeKind::Mapped {
                type_parameter,
                constraint_type,
                template_type,
            },
        )
    }

    /// An enum type for an enum symbol.
    pub fn enum_type(&mut self, symbol: SymbolId) -> TypeId {
        self.add_type_with_symbol(TypeFlags::ENUM, TypeKind::Enum, Some(symbol))
    }

    /// An enum member literal type for a member symbol.
    pub fn enum_literal(&mut self, symbol: SymbolId, value: Option<f64>) -> TypeId {
        let mut flags = TypeFlags::ENUM_LITERAL;
        if value.is_some() {
            flags |= TypeFlags::NUMBER_LITERAL;
        }
        self.add_type_with_symbol(flags, TypeKind::EnumLiteral { value }, Some(symbol))
    }

    /// The regular form of a fresh literal type; other types are their own
    /// regular form.
    pub fn regular_type_of(&self, id: TypeId) -> TypeId {
        match &self.get(id).kind {
            TypeKind::StringLiteral {
                regular: Some(regular),
                fresh: true,
                ..
            }
            | TypeKind::NumberLiteral {
                regular: Some(regular),
                fresh: true,
                ..
            } => *regular,
            _ => id,
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a transient property symbol with a resolved type, for building
/// object types programmatically.
pub fn make_property(
    symbols: &mut SymbolArena,
    links: &mut SymbolLinks,
    interner: &StringInterner,
    name: &str,
    type_id: TypeId,
    optional: bool,
) -> SymbolId {
    let escaped = escape_identifier(interner, interner.intern(name));
    let mut flags = SymbolFlags::PROPERTY | SymbolFlags::TRANSIENT;
    if optional {
        flags |= SymbolFlags::OPTIONAL;
    }
    let id = symbols.alloc(escaped, flags);
    links.set_type_of(id, type_id);
    id
}

/// Build a member table from property symbols.
pub fn member_table(symbols: &SymbolArena, properties: &[SymbolId]) -> SymbolTable {
    let mut table = SymbolTable::new();
    for &prop in properties {
        table.set(symbols.get(prop).escaped_name, prop);
    }
    table
}

/// An ordered name -> type view of an object's members, for debugging and
/// printing. Optional properties are suffixed with `?`.
pub fn member_types(
    table: &SymbolTable,
    symbols: &SymbolArena,
    links: &SymbolLinks,
    interner: &StringInterner,
) -> IndexMap<String, Option<TypeId>> {
    let mut out = IndexMap::new();
    for (name, &sym) in table.iter() {
        let mut display = interner.resolve(*name).to_string();
        if symbols.get(sym).flags.contains(SymbolFlags::OPTIONAL) {
            display.push('?');
        }
        out.insert(display, links.type_of(sym));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsics_preseeded() {
        let table = TypeTable::new();
        assert!(table.get(table.any_type).flags.contains(TypeFlags::ANY));
        assert!(table.get(table.never_type).flags.contains(TypeFlags::NEVER));
        assert!(table
            .get(table.true_type)
            .flags
            .contains(TypeFlags::BOOLEAN_LITERAL));
    }

    #[test]
    fn test_regular_literals_interned() {
        let mut table = TypeTable::new();
        let a = table.string_literal("x");
        let b = table.string_literal("x");
        assert_eq!(a, b);
        let fresh = table.fresh_string_literal("x");
        assert_ne!(fresh, a);
        assert_eq!(table.regular_type_of(fresh), a);
    }

    #[test]
    fn test_union_flattens_and_dedups() {
        let mut table = TypeTable::new();
        let s = table.string_type;
        let n = table.number_type;
        let inner = table.union(vec![s, n]);
        let outer = table.union(vec![inner, s]);
        match &table.get(outer).kind {
            TypeKind::Union { types } => assert_eq!(types, &vec![s, n]),
            other => panic!("expected union, got {:?}", other),
        }
        assert_eq!(table.union(vec![s]), s);
    }

    #[test]
    fn test_references_interned() {
        let mut table = TypeTable::new();
        let target = table.object(ObjectShape::default(), None);
        let arg = table.string_type;
        let a = table.reference(target, vec![arg]);
        let b = table.reference(target, vec![arg]);
        assert_eq!(a, b);
        let c = table.reference(target, vec![table.number_type]);
        assert_ne!(a, c);
    }
}
