//! The binder implementation.
//!
//! Walks the syntax tree depth-first and builds symbol tables. Handles:
//! - Symbol creation for all declarations
//! - Container and block-scope tracking
//! - Declaration merging with include/exclude flag conflict detection
//! - Module export/local symbol splitting
//! - Class instance/static member splitting
//! - Enum member binding with constant values
//! - Import/export alias binding
//! - Strict-mode diagnostics

use crate::links::SymbolLinks;
use crate::symbol::{escape_identifier, internal_names, unescape_identifier, SymbolArena, SymbolTable};
use rustc_hash::FxHashMap;
use sema_ast::node::{NodeData, SyntaxTree};
use sema_ast::syntax_kind::SyntaxKind;
use sema_ast::types::{ModifierFlags, NodeFlags, NodeId, SymbolFlags, SymbolId};
use sema_core::intern::{InternedString, StringInterner};
use sema_diagnostics::{messages, Diagnostic, DiagnosticCollection};
use thiserror::Error;
use tracing::{debug, trace};

/// Fatal programming-invariant failures. These indicate the surrounding
/// tree violates a precondition the binder assumes, and abort the pass.
/// Recoverable problems (duplicate identifiers, strict-mode violations) are
/// reported as diagnostics instead and never abort.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error("declaration has a dynamic name where a static name is required")]
    DynamicName(NodeId),
    #[error("node has no parent link; the tree producer must set parents before binding")]
    UnsetParent(NodeId),
    #[error("expected a source file at the tree root")]
    RootIsNotSourceFile(NodeId),
}

/// Which symbol table a declaration lands in.
#[derive(Debug, Clone, Copy)]
enum TableTarget {
    /// The `locals` table attached to a scope node.
    Locals(NodeId),
    /// The `members` table of a container symbol.
    Members(SymbolId),
    /// The `exports` table of a container symbol.
    Exports(SymbolId),
}

/// One entry of the container stack: the nearest enclosing declaration
/// scope and, when it has one, its symbol.
#[derive(Debug, Clone, Copy)]
struct ContainerFrame {
    node: NodeId,
    symbol: Option<SymbolId>,
}

/// Everything the binder produces for one tree.
#[derive(Debug)]
pub struct BindResult {
    pub symbols: SymbolArena,
    pub links: SymbolLinks,
    /// Scope node -> locals table.
    pub locals: FxHashMap<NodeId, SymbolTable>,
    /// Declaration node -> its symbol.
    pub node_symbols: FxHashMap<NodeId, SymbolId>,
    /// The symbol of the source file itself.
    pub file_symbol: SymbolId,
    pub diagnostics: DiagnosticCollection,
}

impl BindResult {
    /// Resolve a name lexically, starting from `node` and walking parent
    /// links through every scope that carries a locals table.
    pub fn resolve_from(
        &self,
        tree: &SyntaxTree,
        from: NodeId,
        name: InternedString,
    ) -> Option<SymbolId> {
        let mut current = from;
        loop {
            if let Some(table) = self.locals.get(&current) {
                if let Some(symbol) = table.get(&name) {
                    return Some(symbol);
                }
            }
            let parent = tree.get(current).parent;
            if parent == NodeId::INVALID {
                return None;
            }
            current = parent;
        }
    }

    /// The symbol bound for a declaration node, if any.
    pub fn symbol_of(&self, node: NodeId) -> Option<SymbolId> {
        self.node_symbols.get(&node).copied()
    }
}

/// The binder creates symbols and links declarations.
pub struct Binder<'a> {
    tree: &'a SyntaxTree,
    interner: &'a StringInterner,
    file_name: String,
    symbols: SymbolArena,
    links: SymbolLinks,
    locals: FxHashMap<NodeId, SymbolTable>,
    node_symbols: FxHashMap<NodeId, SymbolId>,
    diagnostics: DiagnosticCollection,
    /// Nearest enclosing declaration scopes, innermost last.
    container_stack: Vec<ContainerFrame>,
    /// Nearest enclosing block scopes, innermost last.
    block_scope_stack: Vec<NodeId>,
    in_strict_mode: bool,
    in_ambient_context: bool,
    /// Inside an ambient module body every declaration is implicitly
    /// exported.
    in_export_context: bool,
    is_external_module: bool,
    file_symbol: SymbolId,
}

impl<'a> Binder<'a> {
    pub fn new(tree: &'a SyntaxTree, interner: &'a StringInterner, file_name: &str) -> Self {
        Self {
            tree,
            interner,
            file_name: file_name.to_string(),
            symbols: SymbolArena::new(),
            links: SymbolLinks::new(),
            locals: FxHashMap::default(),
            node_symbols: FxHashMap::default(),
            diagnostics: DiagnosticCollection::new(),
            container_stack: Vec::new(),
            block_scope_stack: Vec::new(),
            in_strict_mode: false,
            in_ambient_context: false,
            in_export_context: false,
            is_external_module: false,
            file_symbol: SymbolId::INVALID,
        }
    }

    /// Bind the whole tree, producing scoped symbol tables.
    pub fn bind(mut self) -> Result<BindResult, BindError> {
        let root = self.tree.root();
        let root_node = self.tree.get(root);
        let statements = match &root_node.data {
            NodeData::SourceFile { statements } => statements.clone(),
            _ => return Err(BindError::RootIsNotSourceFile(root)),
        };

        self.in_strict_mode = root_node.flags.contains(NodeFlags::HAS_STRICT_DIRECTIVE);
        self.is_external_module = statements.iter().any(|&stmt| {
            let node = self.tree.get(stmt);
            matches!(
                node.kind,
                SyntaxKind::ImportDeclaration | SyntaxKind::ExportDeclaration
            ) || node.modifiers.contains(ModifierFlags::EXPORT)
        });
        // External modules are always strict.
        self.in_strict_mode |= self.is_external_module;

        let module_name = self.interner.intern(&format!("\"{}\"", self.file_name));
        self.file_symbol = self.symbols.alloc(module_name, SymbolFlags::VALUE_MODULE);
        debug!(file = %self.file_name, external = self.is_external_module, "binding source file");

        self.container_stack.push(ContainerFrame {
            node: root,
            symbol: Some(self.file_symbol),
        });
        self.block_scope_stack.push(root);
        self.locals.entry(root).or_default();

        for stmt in statements {
            self.bind_node(stmt)?;
        }

        self.container_stack.pop();
        self.block_scope_stack.pop();

        Ok(BindResult {
            symbols: self.symbols,
            links: self.links,
            locals: self.locals,
            node_symbols: self.node_symbols,
            file_symbol: self.file_symbol,
            diagnostics: self.diagnostics,
        })
    }

    // ========================================================================
    // Node dispatch
    // ========================================================================

    fn bind_node(&mut self, node: NodeId) -> Result<(), BindError> {
        self.check_parent_link(node)?;
        match self.tree.get(node).kind {
            SyntaxKind::VariableStatement => self.bind_variable_statement(node),
            SyntaxKind::FunctionDeclaration => self.bind_function_declaration(node),
            SyntaxKind::ClassDeclaration => self.bind_class_declaration(node),
            SyntaxKind::InterfaceDeclaration => self.bind_interface_declaration(node),
            SyntaxKind::TypeAliasDeclaration => self.bind_type_alias_declaration(node),
            SyntaxKind::EnumDeclaration => self.bind_enum_declaration(node),
            SyntaxKind::ModuleDeclaration => self.bind_module_declaration(node),
            SyntaxKind::ImportDeclaration => self.bind_import_declaration(node),
            SyntaxKind::ExportDeclaration => self.bind_export_declaration(node),
            SyntaxKind::Block => self.bind_block(node),
            SyntaxKind::ExpressionStatement => {
                let expression = match &self.tree.get(node).data {
                    NodeData::ExpressionStatement { expression } => *expression,
                    _ => return Ok(()),
                };
                self.bind_expression(expression)
            }
            SyntaxKind::PrototypePropertyAssignment => {
                self.bind_prototype_property_assignment(node)
            }
            _ => Ok(()),
        }
    }

    fn check_parent_link(&self, node: NodeId) -> Result<(), BindError> {
        if node != self.tree.root() && self.tree.get(node).parent == NodeId::INVALID {
            return Err(BindError::UnsetParent(node));
        }
        Ok(())
    }

    // ========================================================================
    // Statement binding
    // ========================================================================

    fn bind_variable_statement(&mut self, node: NodeId) -> Result<(), BindError> {
        let (declarations, is_block_scoped) = {
            let stmt = self.tree.get(node);
            let declarations = match &stmt.data {
                NodeData::VariableStatement { declarations } => declarations.clone(),
                _ => return Ok(()),
            };
            (declarations, stmt.flags.intersects(NodeFlags::BLOCK_SCOPED))
        };

        for decl in declarations {
            let (name, initializer) = match &self.tree.get(decl).data {
                NodeData::VariableDeclaration { name, initializer } => (*name, *initializer),
                _ => continue,
            };
            // A variable declaration name is always statically known; a
            // computed name here means the tree is malformed.
            if self.tree.static_name_text(name).is_none() {
                return Err(BindError::DynamicName(decl));
            }
            self.check_strict_mode_identifier(name);
            if is_block_scoped {
                self.bind_block_scoped_declaration(
                    decl,
                    SymbolFlags::BLOCK_SCOPED_VARIABLE,
                    SymbolFlags::BLOCK_SCOPED_VARIABLE_EXCLUDES,
                )?;
            } else {
                self.declare_symbol_and_add_to_table(
                    decl,
                    SymbolFlags::FUNCTION_SCOPED_VARIABLE,
                    SymbolFlags::FUNCTION_SCOPED_VARIABLE_EXCLUDES,
                )?;
            }
            if let Some(init) = initializer {
                self.bind_expression(init)?;
            }
        }
        Ok(())
    }

    fn bind_function_declaration(&mut self, node: NodeId) -> Result<(), BindError> {
        let symbol = self.declare_symbol_and_add_to_table(
            node,
            SymbolFlags::FUNCTION,
            SymbolFlags::FUNCTION_EXCLUDES,
        )?;
        self.bind_function_like_body(node, Some(symbol))
    }

    /// Shared walk for every function-like container: push the container
    /// and block scope, bind type parameters, parameters, and the body.
    fn bind_function_like_body(
        &mut self,
        node: NodeId,
        symbol: Option<SymbolId>,
    ) -> Result<(), BindError> {
        let (type_parameters, parameters, body) = match &self.tree.get(node).data {
            NodeData::FunctionLike {
                type_parameters,
                parameters,
                body,
                ..
            } => (type_parameters.clone(), parameters.clone(), *body),
            _ => return Ok(()),
        };

        self.container_stack.push(ContainerFrame { node, symbol });
        self.block_scope_stack.push(node);
        self.locals.entry(node).or_default();

        for tp in type_parameters {
            self.bind_type_parameter(tp)?;
        }
        for param in parameters {
            self.bind_parameter(param)?;
        }
        if let Some(body) = body {
            match &self.tree.get(body).data {
                NodeData::Block { statements } => {
                    for stmt in statements.clone() {
                        self.bind_node(stmt)?;
                    }
                }
                _ => self.bind_expression(body)?,
            }
        }

        self.block_scope_stack.pop();
        self.container_stack.pop();
        Ok(())
    }

    fn bind_parameter(&mut self, node: NodeId) -> Result<(), BindError> {
        let (name, initializer) = match &self.tree.get(node).data {
            NodeData::Parameter {
                name, initializer, ..
            } => (*name, *initializer),
            _ => return Ok(()),
        };
        self.check_strict_mode_identifier(name);
        self.declare_symbol_and_add_to_table(
            node,
            SymbolFlags::FUNCTION_SCOPED_VARIABLE,
            SymbolFlags::PARAMETER_EXCLUDES,
        )?;
        if let Some(init) = initializer {
            self.bind_expression(init)?;
        }
        Ok(())
    }

    fn bind_type_parameter(&mut self, node: NodeId) -> Result<(), BindError> {
        self.declare_symbol_and_add_to_table(
            node,
            SymbolFlags::TYPE_PARAMETER,
            SymbolFlags::TYPE_PARAMETER_EXCLUDES,
        )?;
        Ok(())
    }

    fn bind_class_declaration(&mut self, node: NodeId) -> Result<(), BindError> {
        let symbol = self.bind_block_scoped_declaration(
            node,
            SymbolFlags::CLASS,
            SymbolFlags::CLASS_EXCLUDES,
        )?;
        self.bind_class_like_members(node, symbol)
    }

    fn bind_class_like_members(
        &mut self,
        node: NodeId,
        symbol: SymbolId,
    ) -> Result<(), BindError> {
        let (type_parameters, members) = match &self.tree.get(node).data {
            NodeData::ClassLike {
                type_parameters,
                members,
                ..
            } => (type_parameters.clone(), members.clone()),
            _ => return Ok(()),
        };

        // Class bodies are always strict.
        let saved_strict = self.in_strict_mode;
        self.in_strict_mode = true;

        self.container_stack.push(ContainerFrame {
            node,
            symbol: Some(symbol),
        });
        self.locals.entry(node).or_default();

        for tp in type_parameters {
            self.bind_type_parameter(tp)?;
        }
        for member in members {
            self.bind_class_element(member)?;
        }

        // The synthetic prototype property lives in the static side. A
        // user-written static member of the same name is a duplicate.
        let prototype_name = self.interner.intern(internal_names::PROTOTYPE);
        let existing = self.symbols.exports_mut(symbol).get(&prototype_name);
        if existing.is_some() {
            self.diagnostics.add(Diagnostic::new(
                &messages::DUPLICATE_IDENTIFIER_0,
                &[internal_names::PROTOTYPE],
            ));
        } else {
            let prototype = self
                .symbols
                .alloc(prototype_name, SymbolFlags::PROPERTY | SymbolFlags::PROTOTYPE);
            self.symbols.get_mut(prototype).parent = Some(symbol);
            self.symbols.exports_mut(symbol).set(prototype_name, prototype);
        }

        self.container_stack.pop();
        self.in_strict_mode = saved_strict;
        Ok(())
    }

    fn bind_class_element(&mut self, node: NodeId) -> Result<(), BindError> {
        let kind = self.tree.get(node).kind;
        let modifiers = self.tree.get(node).modifiers;
        let visibility = Self::visibility_flags(modifiers);
        match kind {
            SyntaxKind::PropertyDeclaration => {
                let (optional, initializer) = match &self.tree.get(node).data {
                    NodeData::PropertyDeclaration {
                        optional,
                        initializer,
                        ..
                    } => (*optional, *initializer),
                    _ => return Ok(()),
                };
                let mut includes = SymbolFlags::PROPERTY | visibility;
                if optional {
                    includes |= SymbolFlags::OPTIONAL;
                }
                self.declare_symbol_and_add_to_table(
                    node,
                    includes,
                    SymbolFlags::PROPERTY_EXCLUDES,
                )?;
                if let Some(init) = initializer {
                    self.bind_expression(init)?;
                }
                Ok(())
            }
            SyntaxKind::MethodDeclaration => {
                self.declare_symbol_and_add_to_table(
                    node,
                    SymbolFlags::METHOD | visibility,
                    SymbolFlags::METHOD_EXCLUDES,
                )?;
                self.bind_function_like_body(node, None)
            }
            SyntaxKind::Constructor => {
                self.declare_symbol_and_add_to_table(
                    node,
                    SymbolFlags::CONSTRUCTOR,
                    SymbolFlags::NONE,
                )?;
                self.bind_function_like_body(node, None)
            }
            SyntaxKind::GetAccessor => {
                self.declare_symbol_and_add_to_table(
                    node,
                    SymbolFlags::GET_ACCESSOR | visibility,
                    SymbolFlags::GET_ACCESSOR_EXCLUDES,
                )?;
                self.bind_function_like_body(node, None)
            }
            SyntaxKind::SetAccessor => {
                self.declare_symbol_and_add_to_table(
                    node,
                    SymbolFlags::SET_ACCESSOR | visibility,
                    SymbolFlags::SET_ACCESSOR_EXCLUDES,
                )?;
                self.bind_function_like_body(node, None)
            }
            SyntaxKind::IndexSignature => {
                self.declare_symbol_and_add_to_table(
                    node,
                    SymbolFlags::SIGNATURE,
                    SymbolFlags::NONE,
                )?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Convert AST modifier flags to symbol accessibility flags.
    fn visibility_flags(modifiers: ModifierFlags) -> SymbolFlags {
        let mut flags = SymbolFlags::NONE;
        if modifiers.contains(ModifierFlags::PRIVATE) {
            flags |= SymbolFlags::PRIVATE;
        }
        if modifiers.contains(ModifierFlags::PROTECTED) {
            flags |= SymbolFlags::PROTECTED;
        }
        if modifiers.contains(ModifierFlags::STATIC) {
            flags |= SymbolFlags::STATIC;
        }
        flags
    }

    fn bind_interface_declaration(&mut self, node: NodeId) -> Result<(), BindError> {
        let symbol = self.declare_symbol_and_add_to_table(
            node,
            SymbolFlags::INTERFACE,
            SymbolFlags::INTERFACE_EXCLUDES,
        )?;
        let (type_parameters, members) = match &self.tree.get(node).data {
            NodeData::InterfaceDeclaration {
                type_parameters,
                members,
                ..
            } => (type_parameters.clone(), members.clone()),
            _ => return Ok(()),
        };

        self.container_stack.push(ContainerFrame {
            node,
            symbol: Some(symbol),
        });
        self.locals.entry(node).or_default();
        for tp in type_parameters {
            self.bind_type_parameter(tp)?;
        }
        for member in members {
            self.bind_type_member(member)?;
        }
        self.container_stack.pop();
        Ok(())
    }

    fn bind_type_member(&mut self, node: NodeId) -> Result<(), BindError> {
        match self.tree.get(node).kind {
            SyntaxKind::PropertySignature => {
                let optional = match &self.tree.get(node).data {
                    NodeData::PropertySignature { optional, .. } => *optional,
                    _ => false,
                };
                let mut includes = SymbolFlags::PROPERTY;
                if optional {
                    includes |= SymbolFlags::OPTIONAL;
                }
                self.declare_symbol_and_add_to_table(
                    node,
                    includes,
                    SymbolFlags::PROPERTY_EXCLUDES,
                )?;
                Ok(())
            }
            SyntaxKind::MethodSignature => {
                self.declare_symbol_and_add_to_table(
                    node,
                    SymbolFlags::METHOD,
                    SymbolFlags::METHOD_EXCLUDES,
                )?;
                Ok(())
            }
            SyntaxKind::IndexSignature => {
                self.declare_symbol_and_add_to_table(
                    node,
                    SymbolFlags::SIGNATURE,
                    SymbolFlags::NONE,
                )?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn bind_type_alias_declaration(&mut self, node: NodeId) -> Result<(), BindError> {
        let symbol = self.declare_symbol_and_add_to_table(
            node,
            SymbolFlags::TYPE_ALIAS,
            SymbolFlags::TYPE_ALIAS_EXCLUDES,
        )?;
        let type_parameters = match &self.tree.get(node).data {
            NodeData::TypeAliasDeclaration {
                type_parameters, ..
            } => type_parameters.clone(),
            _ => return Ok(()),
        };
        if !type_parameters.is_empty() {
            self.container_stack.push(ContainerFrame {
                node,
                symbol: Some(symbol),
            });
            self.locals.entry(node).or_default();
            for tp in type_parameters {
                self.bind_type_parameter(tp)?;
            }
            self.container_stack.pop();
        }
        Ok(())
    }

    fn bind_enum_declaration(&mut self, node: NodeId) -> Result<(), BindError> {
        let is_const = self.tree.get(node).modifiers.contains(ModifierFlags::CONST);
        let (includes, excludes) = if is_const {
            (SymbolFlags::CONST_ENUM, SymbolFlags::CONST_ENUM_EXCLUDES)
        } else {
            (SymbolFlags::REGULAR_ENUM, SymbolFlags::REGULAR_ENUM_EXCLUDES)
        };
        let symbol = self.bind_block_scoped_declaration(node, includes, excludes)?;

        let members = match &self.tree.get(node).data {
            NodeData::EnumDeclaration { members, .. } => members.clone(),
            _ => return Ok(()),
        };

        self.container_stack.push(ContainerFrame {
            node,
            symbol: Some(symbol),
        });

        // Enum members auto-increment from the previous numeric value.
        let mut next_value: Option<f64> = Some(0.0);
        for member in members {
            let initializer = match &self.tree.get(member).data {
                NodeData::EnumMember { initializer, .. } => *initializer,
                _ => None,
            };
            let member_symbol = self.declare_symbol_and_add_to_table(
                member,
                SymbolFlags::ENUM_MEMBER,
                SymbolFlags::ENUM_MEMBER_EXCLUDES,
            )?;
            let value = match initializer {
                Some(init) => match &self.tree.get(init).data {
                    NodeData::NumericLiteral { value } => Some(*value),
                    _ => None,
                },
                None => next_value,
            };
            self.symbols.get_mut(member_symbol).constant_value = value;
            next_value = value.map(|v| v + 1.0);
        }

        self.container_stack.pop();
        Ok(())
    }

    fn bind_module_declaration(&mut self, node: NodeId) -> Result<(), BindError> {
        let symbol = self.declare_symbol_and_add_to_table(
            node,
            SymbolFlags::VALUE_MODULE,
            SymbolFlags::VALUE_MODULE_EXCLUDES,
        )?;
        let body = match &self.tree.get(node).data {
            NodeData::ModuleDeclaration { body, .. } => *body,
            _ => return Ok(()),
        };

        let is_ambient = self.in_ambient_context
            || self.tree.get(node).modifiers.contains(ModifierFlags::AMBIENT);
        let saved_ambient = self.in_ambient_context;
        let saved_export = self.in_export_context;
        self.in_ambient_context = is_ambient;

        self.container_stack.push(ContainerFrame {
            node,
            symbol: Some(symbol),
        });
        self.locals.entry(node).or_default();

        if let Some(body) = body {
            match &self.tree.get(body).data {
                NodeData::ModuleBlock { statements } => {
                    // Ambient module bodies are export contexts: every
                    // declaration is implicitly exported.
                    self.in_export_context = is_ambient
                        || self
                            .tree
                            .get(body)
                            .flags
                            .contains(NodeFlags::EXPORT_CONTEXT);
                    self.block_scope_stack.push(body);
                    for stmt in statements.clone() {
                        self.bind_node(stmt)?;
                    }
                    self.block_scope_stack.pop();
                }
                NodeData::ModuleDeclaration { .. } => {
                    self.bind_module_declaration(body)?;
                }
                _ => {}
            }
        }

        self.container_stack.pop();
        self.in_ambient_context = saved_ambient;
        self.in_export_context = saved_export;
        Ok(())
    }

    fn bind_import_declaration(&mut self, node: NodeId) -> Result<(), BindError> {
        let (default_name, bindings) = match &self.tree.get(node).data {
            NodeData::ImportDeclaration {
                default_name,
                bindings,
            } => (*default_name, bindings.clone()),
            _ => return Ok(()),
        };
        if default_name.is_some() {
            self.declare_symbol_and_add_to_table(
                node,
                SymbolFlags::ALIAS,
                SymbolFlags::ALIAS_EXCLUDES,
            )?;
        }
        for binding in bindings {
            match self.tree.get(binding).kind {
                SyntaxKind::NamespaceImport | SyntaxKind::ImportSpecifier => {
                    self.declare_symbol_and_add_to_table(
                        binding,
                        SymbolFlags::ALIAS,
                        SymbolFlags::ALIAS_EXCLUDES,
                    )?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn bind_export_declaration(&mut self, node: NodeId) -> Result<(), BindError> {
        let elements = match &self.tree.get(node).data {
            NodeData::ExportDeclaration { elements } => elements.clone(),
            _ => return Ok(()),
        };
        let container_symbol = self.current_container().symbol;
        for element in elements {
            if self.tree.get(element).kind != SyntaxKind::ExportSpecifier {
                continue;
            }
            if let Some(container) = container_symbol {
                self.declare_symbol(
                    TableTarget::Exports(container),
                    Some(container),
                    element,
                    SymbolFlags::ALIAS,
                    SymbolFlags::ALIAS_EXCLUDES,
                    false,
                )?;
            }
        }
        Ok(())
    }

    fn bind_block(&mut self, node: NodeId) -> Result<(), BindError> {
        let statements = match &self.tree.get(node).data {
            NodeData::Block { statements } => statements.clone(),
            _ => return Ok(()),
        };
        self.block_scope_stack.push(node);
        self.locals.entry(node).or_default();
        for stmt in statements {
            self.bind_node(stmt)?;
        }
        self.block_scope_stack.pop();
        Ok(())
    }

    /// `target.prototype.name = <function>`: declares a replaceable method
    /// member on the target function's symbol.
    fn bind_prototype_property_assignment(&mut self, node: NodeId) -> Result<(), BindError> {
        let (target, initializer) = match &self.tree.get(node).data {
            NodeData::PrototypePropertyAssignment {
                target,
                initializer,
                ..
            } => (*target, *initializer),
            _ => return Ok(()),
        };
        let target_name = match self.tree.static_name_text(target) {
            Some(text) => escape_identifier(self.interner, text),
            None => return Err(BindError::DynamicName(node)),
        };
        if let Some(function_symbol) = self.resolve_name_in_scope(node, target_name) {
            self.declare_symbol(
                TableTarget::Members(function_symbol),
                Some(function_symbol),
                node,
                SymbolFlags::METHOD,
                SymbolFlags::NONE,
                true,
            )?;
        }
        if let Some(init) = initializer {
            self.bind_expression(init)?;
        }
        Ok(())
    }

    // ========================================================================
    // Expression binding
    // ========================================================================

    fn bind_expression(&mut self, node: NodeId) -> Result<(), BindError> {
        match self.tree.get(node).kind {
            SyntaxKind::ObjectLiteralExpression => self.bind_object_literal(node),
            SyntaxKind::FunctionExpression | SyntaxKind::ArrowFunction => {
                let symbol = self.bind_anonymous_declaration(
                    node,
                    SymbolFlags::FUNCTION,
                    internal_names::FUNCTION,
                );
                self.bind_function_like_body(node, Some(symbol))
            }
            SyntaxKind::ClassExpression => {
                let symbol = self.bind_anonymous_declaration(
                    node,
                    SymbolFlags::CLASS,
                    internal_names::CLASS,
                );
                self.bind_class_like_members(node, symbol)
            }
            _ => Ok(()),
        }
    }

    fn bind_object_literal(&mut self, node: NodeId) -> Result<(), BindError> {
        let properties = match &self.tree.get(node).data {
            NodeData::ObjectLiteral { properties } => properties.clone(),
            _ => return Ok(()),
        };
        let symbol =
            self.bind_anonymous_declaration(node, SymbolFlags::OBJECT_LITERAL, internal_names::OBJECT);

        self.container_stack.push(ContainerFrame {
            node,
            symbol: Some(symbol),
        });

        // Duplicate non-computed property names are a strict-mode error.
        let mut seen: FxHashMap<InternedString, ()> = FxHashMap::default();
        for property in properties {
            let (name, initializer) = match &self.tree.get(property).data {
                NodeData::PropertyAssignment { name, initializer } => (*name, *initializer),
                _ => continue,
            };
            if let Some(text) = self.tree.static_name_text(name) {
                if self.in_strict_mode && seen.insert(text, ()).is_some() {
                    self.diagnostics.add(Diagnostic::new(
                        &messages::AN_OBJECT_LITERAL_CANNOT_HAVE_MULTIPLE_PROPERTIES_WITH_THE_SAME_NAME,
                        &[],
                    ));
                }
            }
            self.declare_symbol_and_add_to_table(
                property,
                SymbolFlags::PROPERTY,
                SymbolFlags::PROPERTY_EXCLUDES,
            )?;
            if let Some(init) = initializer {
                self.bind_expression(init)?;
            }
        }

        self.container_stack.pop();
        Ok(())
    }

    /// Anonymous declarations get a fresh symbol that is not inserted into
    /// any table; it is only reachable through the node.
    fn bind_anonymous_declaration(
        &mut self,
        node: NodeId,
        flags: SymbolFlags,
        fallback_name: &str,
    ) -> SymbolId {
        let name = self
            .tree
            .name_of(node)
            .and_then(|n| self.tree.static_name_text(n))
            .map(|text| escape_identifier(self.interner, text))
            .unwrap_or_else(|| self.interner.intern(fallback_name));
        let symbol = self.symbols.alloc(name, SymbolFlags::NONE);
        self.symbols
            .add_declaration(symbol, node, self.tree.get(node).kind, flags);
        self.node_symbols.insert(node, symbol);
        symbol
    }

    // ========================================================================
    // Declaration destinations
    // ========================================================================

    fn current_container(&self) -> ContainerFrame {
        *self
            .container_stack
            .last()
            .expect("container stack is never empty while binding")
    }

    /// Where a symbol lands depends on the container kind, not the
    /// declaration kind.
    fn declare_symbol_and_add_to_table(
        &mut self,
        node: NodeId,
        includes: SymbolFlags,
        excludes: SymbolFlags,
    ) -> Result<SymbolId, BindError> {
        let container = self.current_container();
        match self.tree.get(container.node).kind {
            SyntaxKind::SourceFile => {
                if self.is_external_module {
                    self.declare_module_member(node, includes, excludes)
                } else {
                    self.declare_symbol(
                        TableTarget::Locals(container.node),
                        None,
                        node,
                        includes,
                        excludes,
                        false,
                    )
                }
            }
            SyntaxKind::ModuleDeclaration => self.declare_module_member(node, includes, excludes),
            SyntaxKind::ClassDeclaration | SyntaxKind::ClassExpression => {
                let symbol = container.symbol.expect("class containers carry a symbol");
                let is_static = self.tree.get(node).modifiers.contains(ModifierFlags::STATIC);
                let target = if is_static {
                    TableTarget::Exports(symbol)
                } else {
                    TableTarget::Members(symbol)
                };
                self.declare_symbol(target, Some(symbol), node, includes, excludes, false)
            }
            SyntaxKind::EnumDeclaration => {
                let symbol = container.symbol.expect("enum containers carry a symbol");
                self.declare_symbol(
                    TableTarget::Exports(symbol),
                    Some(symbol),
                    node,
                    includes,
                    excludes,
                    false,
                )
            }
            SyntaxKind::InterfaceDeclaration
            | SyntaxKind::TypeLiteral
            | SyntaxKind::ObjectLiteralExpression => {
                let symbol = container
                    .symbol
                    .expect("member containers carry a symbol");
                self.declare_symbol(
                    TableTarget::Members(symbol),
                    Some(symbol),
                    node,
                    includes,
                    excludes,
                    false,
                )
            }
            // Function-like containers and type aliases keep everything in
            // their own locals.
            _ => self.declare_symbol(
                TableTarget::Locals(container.node),
                None,
                node,
                includes,
                excludes,
                false,
            ),
        }
    }

    /// Module members split into exported and implicitly-local symbols. The
    /// local half of an exported value carries `EXPORT_VALUE` and points at
    /// the exports-table symbol, so local references resolve without
    /// qualification.
    fn declare_module_member(
        &mut self,
        node: NodeId,
        includes: SymbolFlags,
        excludes: SymbolFlags,
    ) -> Result<SymbolId, BindError> {
        let container = self.current_container();
        let container_symbol = container
            .symbol
            .expect("module containers carry a symbol");
        let has_export_modifier = self
            .tree
            .get(node)
            .modifiers
            .contains(ModifierFlags::EXPORT)
            || (self.in_export_context
                && !includes.intersects(SymbolFlags::ALIAS));

        if !has_export_modifier {
            return self.declare_symbol(
                TableTarget::Locals(container.node),
                None,
                node,
                includes,
                excludes,
                false,
            );
        }

        // Exports always require a resolvable static name.
        if self.declaration_name(node)?.is_none() {
            return Err(BindError::DynamicName(node));
        }

        let export_kind = if includes.intersects(SymbolFlags::VALUE) {
            SymbolFlags::EXPORT_VALUE
        } else {
            SymbolFlags::NONE
        };
        let local = self.declare_symbol(
            TableTarget::Locals(container.node),
            None,
            node,
            export_kind,
            SymbolFlags::NONE,
            false,
        )?;
        let exported = self.declare_symbol(
            TableTarget::Exports(container_symbol),
            Some(container_symbol),
            node,
            includes,
            excludes,
            false,
        )?;
        self.symbols.get_mut(local).export_symbol = Some(exported);
        Ok(local)
    }

    /// Block-scoped declarations bind into the nearest block scope, except
    /// at module or external-module-file level, where the export/local
    /// split applies.
    fn bind_block_scoped_declaration(
        &mut self,
        node: NodeId,
        includes: SymbolFlags,
        excludes: SymbolFlags,
    ) -> Result<SymbolId, BindError> {
        let block = *self
            .block_scope_stack
            .last()
            .expect("block scope stack is never empty while binding");
        match self.tree.get(block).kind {
            SyntaxKind::ModuleBlock => self.declare_module_member(node, includes, excludes),
            SyntaxKind::SourceFile if self.is_external_module => {
                self.declare_module_member(node, includes, excludes)
            }
            _ => self.declare_symbol(TableTarget::Locals(block), None, node, includes, excludes, false),
        }
    }

    // ========================================================================
    // The declare-and-merge core
    // ========================================================================

    /// Declare a symbol for `node` into `target`, merging with an existing
    /// symbol of the same name when the exclude masks permit it.
    fn declare_symbol(
        &mut self,
        target: TableTarget,
        parent: Option<SymbolId>,
        node: NodeId,
        includes: SymbolFlags,
        excludes: SymbolFlags,
        is_replaceable_by_method: bool,
    ) -> Result<SymbolId, BindError> {
        let name = self.declaration_name(node)?;
        let symbol = match name {
            // Nodes without a resolvable name bind to a fresh "missing"
            // sentinel symbol that lands in no table.
            None => {
                let missing = self.interner.intern(internal_names::MISSING);
                self.symbols.alloc(missing, SymbolFlags::NONE)
            }
            Some(name) => match self.table_get(target, name) {
                None => {
                    // Flags start at NONE so a symbol never excludes its own
                    // first declaration.
                    let id = self.symbols.alloc(name, SymbolFlags::NONE);
                    self.table_set(target, name, id);
                    id
                }
                Some(existing) => {
                    let existing_flags = self.symbols.get(existing).flags;
                    if existing_flags.intersects(excludes) {
                        let replaceable = self.symbols.get(existing).is_replaceable_by_method;
                        if replaceable && !is_replaceable_by_method {
                            // A prototype-assignment symbol gives way to a
                            // real declaration of the same name.
                            let id = self.symbols.alloc(name, SymbolFlags::NONE);
                            self.table_set(target, name, id);
                            id
                        } else {
                            // Duplicate identifier: report and keep the new
                            // declaration on a standalone symbol that does
                            // not merge.
                            let display =
                                unescape_identifier(self.interner.resolve(name)).to_string();
                            self.diagnostics.add(Diagnostic::with_span(
                                self.tree.get(node).span,
                                &messages::DUPLICATE_IDENTIFIER_0,
                                &[&display],
                            ));
                            self.symbols.alloc(name, SymbolFlags::NONE)
                        }
                    } else {
                        existing
                    }
                }
            },
        };

        self.symbols
            .add_declaration(symbol, node, self.tree.get(node).kind, includes);
        if is_replaceable_by_method {
            self.symbols.get_mut(symbol).is_replaceable_by_method = true;
        }
        if let Some(parent) = parent {
            self.symbols.get_mut(symbol).parent = Some(parent);
        }
        self.node_symbols.insert(node, symbol);
        trace!(
            symbol = symbol.0,
            flags = ?includes,
            "declared symbol"
        );
        Ok(symbol)
    }

    /// The escaped declaration name of a node, or None when the name is
    /// dynamic or absent. Unnamed constructors and index signatures use
    /// reserved internal names.
    fn declaration_name(&self, node: NodeId) -> Result<Option<InternedString>, BindError> {
        match self.tree.get(node).kind {
            SyntaxKind::Constructor => {
                return Ok(Some(self.interner.intern("__constructor")));
            }
            SyntaxKind::IndexSignature => {
                return Ok(Some(self.interner.intern("__index")));
            }
            _ => {}
        }
        let name_node = match self.tree.name_of(node) {
            Some(name) => name,
            None => return Ok(None),
        };
        Ok(self
            .tree
            .static_name_text(name_node)
            .map(|text| escape_identifier(self.interner, text)))
    }

    fn table_get(&mut self, target: TableTarget, name: InternedString) -> Option<SymbolId> {
        match target {
            TableTarget::Locals(node) => self.locals.entry(node).or_default().get(&name),
            TableTarget::Members(symbol) => self
                .symbols
                .get(symbol)
                .members
                .as_ref()
                .and_then(|t| t.get(&name)),
            TableTarget::Exports(symbol) => self
                .symbols
                .get(symbol)
                .exports
                .as_ref()
                .and_then(|t| t.get(&name)),
        }
    }

    fn table_set(&mut self, target: TableTarget, name: InternedString, id: SymbolId) {
        match target {
            TableTarget::Locals(node) => {
                self.locals.entry(node).or_default().set(name, id);
            }
            TableTarget::Members(symbol) => {
                self.symbols.members_mut(symbol).set(name, id);
            }
            TableTarget::Exports(symbol) => {
                self.symbols.exports_mut(symbol).set(name, id);
            }
        }
    }

    // ========================================================================
    // Name resolution during binding
    // ========================================================================

    /// Resolve a name lexically from a node, using the locals tables built
    /// so far.
    fn resolve_name_in_scope(&self, from: NodeId, name: InternedString) -> Option<SymbolId> {
        let mut current = from;
        loop {
            if let Some(table) = self.locals.get(&current) {
                if let Some(symbol) = table.get(&name) {
                    return Some(symbol);
                }
            }
            let parent = self.tree.get(current).parent;
            if parent == NodeId::INVALID {
                return None;
            }
            current = parent;
        }
    }

    // ========================================================================
    // Strict-mode checks
    // ========================================================================

    /// Reserved words used as declaration names are a recoverable
    /// diagnostic in strict mode.
    fn check_strict_mode_identifier(&mut self, name: NodeId) {
        if !self.in_strict_mode {
            return;
        }
        if let Some(text) = self.tree.static_name_text(name) {
            let resolved = self.interner.resolve(text);
            if is_reserved_in_strict_mode(resolved) {
                let display = resolved.to_string();
                self.diagnostics.add(Diagnostic::with_span(
                    self.tree.get(name).span,
                    &messages::INVALID_USE_OF_0_IN_STRICT_MODE,
                    &[&display],
                ));
            }
        }
    }
}

/// Identifiers that may not be bound in strict mode.
fn is_reserved_in_strict_mode(name: &str) -> bool {
    matches!(
        name,
        "eval"
            | "arguments"
            | "implements"
            | "interface"
            | "let"
            | "package"
            | "private"
            | "protected"
            | "public"
            | "static"
            | "yield"
    )
}
