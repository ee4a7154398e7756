//! Symbol and symbol table definitions.

use sema_ast::syntax_kind::SyntaxKind;
use sema_ast::types::{NodeId, SymbolFlags, SymbolId};
use sema_core::collections::OrderedMap;
use sema_core::intern::{InternedString, StringInterner};

/// Reserved internal symbol names. User identifiers can never collide with
/// these because names starting with two underscores are escaped with an
/// extra one before they reach a table.
pub mod internal_names {
    /// A declaration whose name could not be resolved.
    pub const MISSING: &str = "__missing";
    /// An anonymous object literal.
    pub const OBJECT: &str = "__object";
    /// An anonymous type literal.
    pub const TYPE: &str = "__type";
    /// An unnamed function or class expression.
    pub const FUNCTION: &str = "__function";
    pub const CLASS: &str = "__class";
    /// A computed property name.
    pub const COMPUTED: &str = "__computed";
    /// The synthetic prototype property of a class constructor.
    pub const PROTOTYPE: &str = "prototype";
}

/// Escape a declaration name: identifiers starting with two underscores get
/// one extra leading underscore so they cannot collide with internal
/// reserved names.
pub fn escape_identifier(interner: &StringInterner, name: InternedString) -> InternedString {
    let text = interner.resolve(name);
    if text.len() >= 2 && text.as_bytes()[0] == b'_' && text.as_bytes()[1] == b'_' {
        interner.intern(&format!("_{}", text))
    } else {
        name
    }
}

/// Undo `escape_identifier` for display purposes.
pub fn unescape_identifier<'a>(text: &'a str) -> &'a str {
    if text.len() >= 3 && text.starts_with("___") {
        &text[1..]
    } else {
        text
    }
}

/// A symbol represents a named entity in the program (variable, function,
/// class, interface, type alias, module, member, ...). A symbol accumulates
/// every declaration that contributes to it.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Unique identifier, assigned at creation, never reused.
    pub id: SymbolId,
    /// The (escaped) name of this symbol.
    pub escaped_name: InternedString,
    /// Symbol flags describing what kind of entity this is. Flags only ever
    /// accumulate; no declaration removes a flag.
    pub flags: SymbolFlags,
    /// The declarations that contribute to this symbol, in source order.
    pub declarations: Vec<NodeId>,
    /// The first value-producing declaration, preferring non-module
    /// declarations.
    pub value_declaration: Option<NodeId>,
    /// Kind of `value_declaration`, kept so the module-displacement rule
    /// needs no tree access.
    value_declaration_kind: Option<SyntaxKind>,
    /// Members of this symbol (instance members of classes, members of
    /// interfaces and type/object literals). Created lazily.
    pub members: Option<SymbolTable>,
    /// Exports of this symbol (module exports, class statics, enum
    /// members). Created lazily.
    pub exports: Option<SymbolTable>,
    /// The owning container symbol.
    pub parent: Option<SymbolId>,
    /// For the local half of an exported module member: the symbol in the
    /// container's exports table.
    pub export_symbol: Option<SymbolId>,
    /// Prototype-assignment declarations produce symbols that a later
    /// non-replaceable declaration of the same name may discard.
    pub is_replaceable_by_method: bool,
    /// Constant value of a numeric enum member.
    pub constant_value: Option<f64>,
}

impl Symbol {
    pub fn new(id: SymbolId, escaped_name: InternedString, flags: SymbolFlags) -> Self {
        Self {
            id,
            escaped_name,
            flags,
            declarations: Vec::new(),
            value_declaration: None,
            value_declaration_kind: None,
            members: None,
            exports: None,
            parent: None,
            export_symbol: None,
            is_replaceable_by_method: false,
            constant_value: None,
        }
    }
}

/// A symbol table maps escaped names to symbols, preserving declaration
/// order.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    table: OrderedMap<InternedString, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            table: OrderedMap::new(),
        }
    }

    pub fn get(&self, name: &InternedString) -> Option<SymbolId> {
        self.table.get(name).copied()
    }

    pub fn set(&mut self, name: InternedString, symbol: SymbolId) {
        self.table.insert(name, symbol);
    }

    pub fn has(&self, name: &InternedString) -> bool {
        self.table.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InternedString, &SymbolId)> {
        self.table.iter()
    }
}

/// The symbol arena owns every symbol of an analysis session and allocates
/// monotonically increasing ids.
#[derive(Debug, Default)]
pub struct SymbolArena {
    symbols: Vec<Symbol>,
}

impl SymbolArena {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
        }
    }

    /// Allocate a fresh symbol.
    pub fn alloc(&mut self, escaped_name: InternedString, flags: SymbolFlags) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol::new(id, escaped_name, flags));
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// Fold a declaration into a symbol: OR the include flags in, append the
    /// node in source order, and maintain `value_declaration` (first value
    /// declaration wins, except that a module declaration is displaced by a
    /// later non-module value declaration).
    pub fn add_declaration(
        &mut self,
        id: SymbolId,
        node: NodeId,
        node_kind: SyntaxKind,
        includes: SymbolFlags,
    ) {
        let symbol = self.get_mut(id);
        symbol.flags |= includes;
        symbol.declarations.push(node);
        if includes.intersects(SymbolFlags::VALUE) {
            let displace = match symbol.value_declaration_kind {
                None => true,
                Some(kind) => {
                    kind == SyntaxKind::ModuleDeclaration
                        && node_kind != SyntaxKind::ModuleDeclaration
                }
            };
            if displace {
                symbol.value_declaration = Some(node);
                symbol.value_declaration_kind = Some(node_kind);
            }
        }
    }

    /// Ensure the members table exists and return the symbol id.
    pub fn members_mut(&mut self, id: SymbolId) -> &mut SymbolTable {
        let symbol = self.get_mut(id);
        symbol.members.get_or_insert_with(SymbolTable::new)
    }

    /// Ensure the exports table exists and return the symbol id.
    pub fn exports_mut(&mut self, id: SymbolId) -> &mut SymbolTable {
        let symbol = self.get_mut(id);
        symbol.exports.get_or_insert_with(SymbolTable::new)
    }

    /// The fully-qualified display name of a symbol, following `parent`
    /// links (e.g. `NS.Inner.value`).
    pub fn qualified_name(&self, interner: &StringInterner, id: SymbolId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(sym_id) = current {
            let symbol = self.get(sym_id);
            parts.push(unescape_identifier(interner.resolve(symbol.escaped_name)).to_string());
            current = symbol.parent;
        }
        parts.reverse();
        parts.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sema_core::intern::StringInterner;

    #[test]
    fn test_escape_reserved_prefix() {
        let interner = StringInterner::new();
        let plain = interner.intern("value");
        assert_eq!(escape_identifier(&interner, plain), plain);

        let reserved = interner.intern("__proto");
        let escaped = escape_identifier(&interner, reserved);
        assert_eq!(interner.resolve(escaped), "___proto");
        assert_eq!(unescape_identifier(interner.resolve(escaped)), "__proto");
    }

    #[test]
    fn test_arena_ids_monotonic() {
        let interner = StringInterner::new();
        let mut arena = SymbolArena::new();
        let a = arena.alloc(interner.intern("a"), SymbolFlags::NONE);
        let b = arena.alloc(interner.intern("b"), SymbolFlags::NONE);
        assert!(a < b);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_flags_accumulate() {
        let interner = StringInterner::new();
        let mut arena = SymbolArena::new();
        let id = arena.alloc(interner.intern("f"), SymbolFlags::NONE);
        arena.add_declaration(id, NodeId(0), SyntaxKind::FunctionDeclaration, SymbolFlags::FUNCTION);
        arena.add_declaration(id, NodeId(1), SyntaxKind::ModuleDeclaration, SymbolFlags::VALUE_MODULE);
        let sym = arena.get(id);
        assert!(sym.flags.contains(SymbolFlags::FUNCTION | SymbolFlags::VALUE_MODULE));
        assert_eq!(sym.declarations.len(), 2);
        assert_eq!(sym.value_declaration, Some(NodeId(0)));
    }

    #[test]
    fn test_value_declaration_prefers_non_module() {
        let interner = StringInterner::new();
        let mut arena = SymbolArena::new();
        let id = arena.alloc(interner.intern("ns"), SymbolFlags::NONE);
        arena.add_declaration(id, NodeId(0), SyntaxKind::ModuleDeclaration, SymbolFlags::VALUE_MODULE);
        assert_eq!(arena.get(id).value_declaration, Some(NodeId(0)));
        arena.add_declaration(id, NodeId(1), SyntaxKind::FunctionDeclaration, SymbolFlags::FUNCTION);
        // The later non-module value declaration displaces the module one.
        assert_eq!(arena.get(id).value_declaration, Some(NodeId(1)));
    }
}
