//! Flag types and id handles shared across the analyzer.
//!
//! Ports the relevant portions of TypeScript's NodeFlags, ModifierFlags,
//! SymbolFlags, TypeFlags, and ObjectFlags bitsets.

use std::fmt;

bitflags::bitflags! {
    /// Flags for AST nodes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u32 {
        const NONE               = 0;
        const LET                = 1 << 0;
        const CONST              = 1 << 1;
        const NESTED_NAMESPACE   = 1 << 2;
        const SYNTHESIZED        = 1 << 3;
        const NAMESPACE          = 1 << 4;
        const EXPORT_CONTEXT     = 1 << 5;
        const AMBIENT            = 1 << 6;
        const HAS_STRICT_DIRECTIVE = 1 << 7;

        const BLOCK_SCOPED = Self::LET.bits() | Self::CONST.bits();
    }
}

bitflags::bitflags! {
    /// Modifier flags for declarations.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModifierFlags: u32 {
        const NONE      = 0;
        const EXPORT    = 1 << 0;
        const AMBIENT   = 1 << 1;
        const PUBLIC    = 1 << 2;
        const PRIVATE   = 1 << 3;
        const PROTECTED = 1 << 4;
        const STATIC    = 1 << 5;
        const READONLY  = 1 << 6;
        const ABSTRACT  = 1 << 7;
        const CONST     = 1 << 8;
        const DEFAULT   = 1 << 9;

        const ACCESSIBILITY_MODIFIER = Self::PUBLIC.bits() | Self::PRIVATE.bits() | Self::PROTECTED.bits();
        const NON_PUBLIC_ACCESSIBILITY_MODIFIER = Self::PRIVATE.bits() | Self::PROTECTED.bits();
    }
}

bitflags::bitflags! {
    /// Symbol flags used by the binder, matching TypeScript's SymbolFlags.
    ///
    /// The `*_EXCLUDES` constants are the conflict masks passed to
    /// `declare_symbol`: an existing symbol whose flags intersect the mask
    /// cannot merge with a new declaration of the given kind.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SymbolFlags: u32 {
        const NONE                     = 0;
        const FUNCTION_SCOPED_VARIABLE = 1 << 0;
        const BLOCK_SCOPED_VARIABLE    = 1 << 1;
        const PROPERTY                 = 1 << 2;
        const ENUM_MEMBER              = 1 << 3;
        const FUNCTION                 = 1 << 4;
        const CLASS                    = 1 << 5;
        const INTERFACE                = 1 << 6;
        const CONST_ENUM               = 1 << 7;
        const REGULAR_ENUM             = 1 << 8;
        const VALUE_MODULE             = 1 << 9;
        const NAMESPACE_MODULE         = 1 << 10;
        const TYPE_LITERAL             = 1 << 11;
        const OBJECT_LITERAL           = 1 << 12;
        const METHOD                   = 1 << 13;
        const CONSTRUCTOR              = 1 << 14;
        const GET_ACCESSOR             = 1 << 15;
        const SET_ACCESSOR             = 1 << 16;
        const SIGNATURE                = 1 << 17;
        const TYPE_PARAMETER           = 1 << 18;
        const TYPE_ALIAS               = 1 << 19;
        const EXPORT_VALUE             = 1 << 20;
        const ALIAS                    = 1 << 21;
        const PROTOTYPE                = 1 << 22;
        const EXPORT_STAR              = 1 << 23;
        const OPTIONAL                 = 1 << 24;
        const TRANSIENT                = 1 << 25;
        /// Accessibility/modifier mirror bits carried on member symbols.
        const PRIVATE                  = 1 << 26;
        const PROTECTED                = 1 << 27;
        const STATIC                   = 1 << 28;

        const ENUM = Self::REGULAR_ENUM.bits() | Self::CONST_ENUM.bits();
        const VARIABLE = Self::FUNCTION_SCOPED_VARIABLE.bits() | Self::BLOCK_SCOPED_VARIABLE.bits();
        const VALUE = Self::VARIABLE.bits()
            | Self::PROPERTY.bits()
            | Self::ENUM_MEMBER.bits()
            | Self::OBJECT_LITERAL.bits()
            | Self::FUNCTION.bits()
            | Self::CLASS.bits()
            | Self::ENUM.bits()
            | Self::VALUE_MODULE.bits()
            | Self::METHOD.bits()
            | Self::GET_ACCESSOR.bits()
            | Self::SET_ACCESSOR.bits();
        const TYPE = Self::CLASS.bits()
            | Self::INTERFACE.bits()
            | Self::ENUM.bits()
            | Self::ENUM_MEMBER.bits()
            | Self::TYPE_LITERAL.bits()
            | Self::TYPE_PARAMETER.bits()
            | Self::TYPE_ALIAS.bits();
        const NAMESPACE = Self::VALUE_MODULE.bits()
            | Self::NAMESPACE_MODULE.bits()
            | Self::ENUM.bits();
        const MODULE = Self::VALUE_MODULE.bits() | Self::NAMESPACE_MODULE.bits();
        const ACCESSOR = Self::GET_ACCESSOR.bits() | Self::SET_ACCESSOR.bits();

        const CLASS_MEMBER = Self::METHOD.bits()
            | Self::ACCESSOR.bits()
            | Self::PROPERTY.bits();

        // Conflict masks.
        const FUNCTION_SCOPED_VARIABLE_EXCLUDES = Self::VALUE.bits() & !Self::FUNCTION_SCOPED_VARIABLE.bits();
        const BLOCK_SCOPED_VARIABLE_EXCLUDES = Self::VALUE.bits();
        const PARAMETER_EXCLUDES = Self::VALUE.bits();
        const PROPERTY_EXCLUDES = Self::NONE.bits();
        const ENUM_MEMBER_EXCLUDES = Self::VALUE.bits() | Self::TYPE.bits();
        const FUNCTION_EXCLUDES = Self::VALUE.bits()
            & !(Self::FUNCTION.bits() | Self::VALUE_MODULE.bits() | Self::CLASS.bits());
        const CLASS_EXCLUDES = (Self::VALUE.bits() | Self::TYPE.bits())
            & !(Self::VALUE_MODULE.bits() | Self::INTERFACE.bits() | Self::FUNCTION.bits());
        const INTERFACE_EXCLUDES = Self::TYPE.bits()
            & !(Self::INTERFACE.bits() | Self::CLASS.bits());
        const REGULAR_ENUM_EXCLUDES = (Self::VALUE.bits() | Self::TYPE.bits())
            & !(Self::REGULAR_ENUM.bits() | Self::VALUE_MODULE.bits());
        const CONST_ENUM_EXCLUDES = (Self::VALUE.bits() | Self::TYPE.bits())
            & !Self::CONST_ENUM.bits();
        const VALUE_MODULE_EXCLUDES = Self::VALUE.bits()
            & !(Self::FUNCTION.bits() | Self::CLASS.bits() | Self::REGULAR_ENUM.bits() | Self::VALUE_MODULE.bits());
        const NAMESPACE_MODULE_EXCLUDES = Self::NONE.bits();
        const METHOD_EXCLUDES = Self::VALUE.bits() & !Self::METHOD.bits();
        const GET_ACCESSOR_EXCLUDES = Self::VALUE.bits() & !Self::SET_ACCESSOR.bits();
        const SET_ACCESSOR_EXCLUDES = Self::VALUE.bits() & !Self::GET_ACCESSOR.bits();
        const TYPE_PARAMETER_EXCLUDES = Self::TYPE.bits() & !Self::TYPE_PARAMETER.bits();
        const TYPE_ALIAS_EXCLUDES = Self::TYPE.bits();
        const ALIAS_EXCLUDES = Self::ALIAS.bits();
    }
}

bitflags::bitflags! {
    /// Type flags used by the relation engine, matching TypeScript's TypeFlags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeFlags: u32 {
        const NONE              = 0;
        const ANY               = 1 << 0;
        const UNKNOWN           = 1 << 1;
        const STRING            = 1 << 2;
        const NUMBER            = 1 << 3;
        const BOOLEAN           = 1 << 4;
        const ENUM              = 1 << 5;
        const BIG_INT           = 1 << 6;
        const STRING_LITERAL    = 1 << 7;
        const NUMBER_LITERAL    = 1 << 8;
        const BOOLEAN_LITERAL   = 1 << 9;
        const ENUM_LITERAL      = 1 << 10;
        const BIG_INT_LITERAL   = 1 << 11;
        const ES_SYMBOL         = 1 << 12;
        const VOID              = 1 << 13;
        const UNDEFINED         = 1 << 14;
        const NULL              = 1 << 15;
        const NEVER             = 1 << 16;
        const TYPE_PARAMETER    = 1 << 17;
        const OBJECT            = 1 << 18;
        const UNION             = 1 << 19;
        const INTERSECTION      = 1 << 20;
        const INDEX             = 1 << 21;
        const INDEXED_ACCESS    = 1 << 22;
        const CONDITIONAL       = 1 << 23;
        const NON_PRIMITIVE     = 1 << 24;

        const LITERAL = Self::STRING_LITERAL.bits()
            | Self::NUMBER_LITERAL.bits()
            | Self::BOOLEAN_LITERAL.bits()
            | Self::ENUM_LITERAL.bits()
            | Self::BIG_INT_LITERAL.bits();

        const UNIT = Self::LITERAL.bits()
            | Self::UNDEFINED.bits()
            | Self::NULL.bits();

        const STRING_LIKE = Self::STRING.bits() | Self::STRING_LITERAL.bits();
        const NUMBER_LIKE = Self::NUMBER.bits() | Self::NUMBER_LITERAL.bits() | Self::ENUM.bits();
        const BIG_INT_LIKE = Self::BIG_INT.bits() | Self::BIG_INT_LITERAL.bits();
        const BOOLEAN_LIKE = Self::BOOLEAN.bits() | Self::BOOLEAN_LITERAL.bits();
        const ENUM_LIKE = Self::ENUM.bits() | Self::ENUM_LITERAL.bits();
        const VOID_LIKE = Self::VOID.bits() | Self::UNDEFINED.bits();
        const NULLABLE = Self::UNDEFINED.bits() | Self::NULL.bits();
        const PRIMITIVE = Self::STRING.bits()
            | Self::NUMBER.bits()
            | Self::BIG_INT.bits()
            | Self::BOOLEAN.bits()
            | Self::ENUM.bits()
            | Self::ES_SYMBOL.bits()
            | Self::VOID.bits()
            | Self::UNDEFINED.bits()
            | Self::NULL.bits()
            | Self::LITERAL.bits();

        const UNION_OR_INTERSECTION = Self::UNION.bits() | Self::INTERSECTION.bits();
        const STRUCTURED = Self::OBJECT.bits() | Self::UNION.bits() | Self::INTERSECTION.bits();
        const TYPE_VARIABLE = Self::TYPE_PARAMETER.bits() | Self::INDEXED_ACCESS.bits();
        const INSTANTIABLE = Self::TYPE_VARIABLE.bits()
            | Self::INDEX.bits()
            | Self::CONDITIONAL.bits();
        const STRUCTURED_OR_INSTANTIABLE = Self::STRUCTURED.bits() | Self::INSTANTIABLE.bits();
    }
}

bitflags::bitflags! {
    /// Object type flags, matching TypeScript's ObjectFlags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ObjectFlags: u32 {
        const NONE               = 0;
        const CLASS              = 1 << 0;
        const INTERFACE          = 1 << 1;
        const REFERENCE          = 1 << 2;
        const ANONYMOUS          = 1 << 3;
        const MAPPED             = 1 << 4;
        const INSTANTIATED       = 1 << 5;
        const OBJECT_LITERAL     = 1 << 6;
        const FRESH_LITERAL      = 1 << 7;
        const CLASS_OR_INTERFACE = Self::CLASS.bits() | Self::INTERFACE.bits();
    }
}

/// Classification of how a generic type parameter's relatedness propagates
/// to the containing type's relatedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variance {
    /// Parameter unwitnessed in the type; arguments never affect relatedness.
    Independent,
    Covariant,
    Contravariant,
    /// Related in both directions regardless of argument order.
    Bivariant,
    Invariant,
}

/// The type ID is a lightweight handle to a type stored in the type arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct TypeId(pub u32);

impl TypeId {
    pub const INVALID: TypeId = TypeId(u32::MAX);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// The symbol ID is a lightweight handle to a symbol in the symbol arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub const INVALID: SymbolId = SymbolId(u32::MAX);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Node ID for referencing AST nodes by index.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const INVALID: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excludes_masks() {
        // A block-scoped variable conflicts with any other value.
        assert!(SymbolFlags::BLOCK_SCOPED_VARIABLE_EXCLUDES.contains(SymbolFlags::FUNCTION));
        // A function may merge with another function or a namespace.
        assert!(!SymbolFlags::FUNCTION_EXCLUDES.contains(SymbolFlags::FUNCTION));
        assert!(!SymbolFlags::FUNCTION_EXCLUDES.contains(SymbolFlags::VALUE_MODULE));
        // A class conflicts with a function but not an interface.
        assert!(SymbolFlags::CLASS_EXCLUDES.contains(SymbolFlags::FUNCTION));
        assert!(!SymbolFlags::CLASS_EXCLUDES.contains(SymbolFlags::INTERFACE));
    }

    #[test]
    fn test_like_flags() {
        assert!(TypeFlags::STRING_LIKE.contains(TypeFlags::STRING_LITERAL));
        assert!(TypeFlags::NUMBER_LIKE.contains(TypeFlags::ENUM));
        assert!(!TypeFlags::NUMBER_LIKE.contains(TypeFlags::STRING));
    }
}
