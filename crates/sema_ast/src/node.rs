//! Node definitions and the syntax-tree arena.
//!
//! Nodes live in a `Vec` arena inside `SyntaxTree` and reference each other
//! by `NodeId`, so parent back-references and other cycles never involve
//! owning pointers. The tree is produced externally (tests use
//! `TreeBuilder`); `TreeBuilder::finish` wires every node's `parent` before
//! the tree reaches the binder.

use crate::syntax_kind::SyntaxKind;
use crate::types::{ModifierFlags, NodeFlags, NodeId};
use sema_core::intern::InternedString;
use sema_core::text::TextSpan;

/// A syntax node: kind tag, flag sets, span, parent back-reference, and
/// kind-specific children reachable by name through `NodeData`.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: SyntaxKind,
    pub flags: NodeFlags,
    pub modifiers: ModifierFlags,
    pub span: TextSpan,
    /// Set by the tree producer before binding; `NodeId::INVALID` on the root.
    pub parent: NodeId,
    pub data: NodeData,
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone)]
pub enum NodeData {
    None,
    Identifier {
        text: InternedString,
    },
    StringLiteral {
        value: InternedString,
    },
    NumericLiteral {
        value: f64,
    },
    ComputedPropertyName {
        expression: Option<NodeId>,
    },
    SourceFile {
        statements: Vec<NodeId>,
    },
    VariableStatement {
        declarations: Vec<NodeId>,
    },
    VariableDeclaration {
        name: NodeId,
        initializer: Option<NodeId>,
    },
    FunctionLike {
        name: Option<NodeId>,
        type_parameters: Vec<NodeId>,
        parameters: Vec<NodeId>,
        body: Option<NodeId>,
    },
    Parameter {
        name: NodeId,
        optional: bool,
        initializer: Option<NodeId>,
    },
    Block {
        statements: Vec<NodeId>,
    },
    ExpressionStatement {
        expression: NodeId,
    },
    ClassLike {
        name: Option<NodeId>,
        type_parameters: Vec<NodeId>,
        members: Vec<NodeId>,
    },
    PropertyDeclaration {
        name: NodeId,
        optional: bool,
        initializer: Option<NodeId>,
    },
    InterfaceDeclaration {
        name: NodeId,
        type_parameters: Vec<NodeId>,
        members: Vec<NodeId>,
    },
    PropertySignature {
        name: NodeId,
        optional: bool,
    },
    IndexSignature {
        parameter: NodeId,
    },
    TypeAliasDeclaration {
        name: NodeId,
        type_parameters: Vec<NodeId>,
    },
    TypeParameter {
        name: NodeId,
    },
    EnumDeclaration {
        name: NodeId,
        members: Vec<NodeId>,
    },
    EnumMember {
        name: NodeId,
        initializer: Option<NodeId>,
    },
    ModuleDeclaration {
        name: NodeId,
        body: Option<NodeId>,
    },
    ModuleBlock {
        statements: Vec<NodeId>,
    },
    ImportDeclaration {
        default_name: Option<NodeId>,
        bindings: Vec<NodeId>,
    },
    ImportSpecifier {
        name: NodeId,
    },
    NamespaceImport {
        name: NodeId,
    },
    ExportDeclaration {
        elements: Vec<NodeId>,
    },
    ExportSpecifier {
        name: NodeId,
    },
    ObjectLiteral {
        properties: Vec<NodeId>,
    },
    PropertyAssignment {
        name: NodeId,
        initializer: Option<NodeId>,
    },
    TypeLiteral {
        members: Vec<NodeId>,
    },
    /// `target.prototype.name = <function>` assignment-declaration pattern.
    PrototypePropertyAssignment {
        target: NodeId,
        name: NodeId,
        initializer: Option<NodeId>,
    },
}

impl NodeData {
    /// Collect the child node ids of this node, in source order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut push = |id: &NodeId| out.push(*id);
        match self {
            NodeData::None
            | NodeData::Identifier { .. }
            | NodeData::StringLiteral { .. }
            | NodeData::NumericLiteral { .. } => {}
            NodeData::ComputedPropertyName { expression } => {
                expression.iter().for_each(&mut push);
            }
            NodeData::SourceFile { statements }
            | NodeData::Block { statements }
            | NodeData::ModuleBlock { statements } => statements.iter().for_each(&mut push),
            NodeData::VariableStatement { declarations } => {
                declarations.iter().for_each(&mut push)
            }
            NodeData::VariableDeclaration { name, initializer } => {
                push(name);
                initializer.iter().for_each(&mut push);
            }
            NodeData::FunctionLike {
                name,
                type_parameters,
                parameters,
                body,
            } => {
                name.iter().for_each(&mut push);
                type_parameters.iter().for_each(&mut push);
                parameters.iter().for_each(&mut push);
                body.iter().for_each(&mut push);
            }
            NodeData::Parameter {
                name, initializer, ..
            } => {
                push(name);
                initializer.iter().for_each(&mut push);
            }
            NodeData::ExpressionStatement { expression } => push(expression),
            NodeData::ClassLike {
                name,
                type_parameters,
                members,
            } => {
                name.iter().for_each(&mut push);
                type_parameters.iter().for_each(&mut push);
                members.iter().for_each(&mut push);
            }
            NodeData::PropertyDeclaration {
                name, initializer, ..
            }
            | NodeData::PropertyAssignment { name, initializer } => {
                push(name);
                initializer.iter().for_each(&mut push);
            }
            NodeData::InterfaceDeclaration {
                name,
                type_parameters,
                members,
            } => {
                push(name);
                type_parameters.iter().for_each(&mut push);
                members.iter().for_each(&mut push);
            }
            NodeData::PropertySignature { name, .. } => push(name),
            NodeData::IndexSignature { parameter } => push(parameter),
            NodeData::TypeAliasDeclaration {
                name,
                type_parameters,
            } => {
                push(name);
                type_parameters.iter().for_each(&mut push);
            }
            NodeData::TypeParameter { name } => push(name),
            NodeData::EnumDeclaration { name, members } => {
                push(name);
                members.iter().for_each(&mut push);
            }
            NodeData::EnumMember { name, initializer } => {
                push(name);
                initializer.iter().for_each(&mut push);
            }
            NodeData::ModuleDeclaration { name, body } => {
                push(name);
                body.iter().for_each(&mut push);
            }
            NodeData::ImportDeclaration {
                default_name,
                bindings,
            } => {
                default_name.iter().for_each(&mut push);
                bindings.iter().for_each(&mut push);
            }
            NodeData::ImportSpecifier { name }
            | NodeData::NamespaceImport { name }
            | NodeData::ExportSpecifier { name } => push(name),
            NodeData::ExportDeclaration { elements } => elements.iter().for_each(&mut push),
            NodeData::ObjectLiteral { properties } => properties.iter().for_each(&mut push),
            NodeData::TypeLiteral { members } => members.iter().for_each(&mut push),
            NodeData::PrototypePropertyAssignment {
                target,
                name,
                initializer,
            } => {
                push(target);
                push(name);
                initializer.iter().for_each(&mut push);
            }
        }
        out
    }
}

/// The syntax tree: an arena of nodes plus the root id.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The declaration-name node of a declaration, if it has one.
    pub fn name_of(&self, id: NodeId) -> Option<NodeId> {
        match &self.get(id).data {
            NodeData::VariableDeclaration { name, .. }
            | NodeData::Parameter { name, .. }
            | NodeData::PropertyDeclaration { name, .. }
            | NodeData::InterfaceDeclaration { name, .. }
            | NodeData::PropertySignature { name, .. }
            | NodeData::TypeAliasDeclaration { name, .. }
            | NodeData::TypeParameter { name }
            | NodeData::EnumDeclaration { name, .. }
            | NodeData::EnumMember { name, .. }
            | NodeData::ModuleDeclaration { name, .. }
            | NodeData::ImportSpecifier { name }
            | NodeData::NamespaceImport { name }
            | NodeData::ExportSpecifier { name }
            | NodeData::PropertyAssignment { name, .. }
            | NodeData::PrototypePropertyAssignment { name, .. } => Some(*name),
            NodeData::FunctionLike { name, .. } | NodeData::ClassLike { name, .. } => *name,
            // A default import's binding name names the whole declaration.
            NodeData::ImportDeclaration { default_name, .. } => *default_name,
            _ => None,
        }
    }

    /// The interned text of a statically-known name node.
    /// Computed property names have no static text.
    pub fn static_name_text(&self, name: NodeId) -> Option<InternedString> {
        match &self.get(name).data {
            NodeData::Identifier { text } => Some(*text),
            NodeData::StringLiteral { value } => Some(*value),
            _ => None,
        }
    }
}

/// Builds a `SyntaxTree` programmatically. The external producer (or a
/// test) adds nodes bottom-up, then `finish` fixes the root and computes
/// every parent back-reference.
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Add a node with explicit flag sets.
    pub fn add_full(
        &mut self,
        kind: SyntaxKind,
        flags: NodeFlags,
        modifiers: ModifierFlags,
        data: NodeData,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            kind,
            flags,
            modifiers,
            span: TextSpan::empty(0),
            parent: NodeId::INVALID,
            data,
        });
        id
    }

    /// Add a node with no flags or modifiers.
    pub fn add(&mut self, kind: SyntaxKind, data: NodeData) -> NodeId {
        self.add_full(kind, NodeFlags::NONE, ModifierFlags::NONE, data)
    }

    /// Set modifier flags on an already-added node.
    pub fn set_modifiers(&mut self, id: NodeId, modifiers: ModifierFlags) {
        self.nodes[id.index()].modifiers = modifiers;
    }

    /// Set node flags on an already-added node.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) {
        self.nodes[id.index()].flags = flags;
    }

    // ------------------------------------------------------------------
    // Convenience constructors for common shapes
    // ------------------------------------------------------------------

    pub fn ident(&mut self, text: InternedString) -> NodeId {
        self.add(SyntaxKind::Identifier, NodeData::Identifier { text })
    }

    pub fn computed_name(&mut self) -> NodeId {
        self.add(
            SyntaxKind::ComputedPropertyName,
            NodeData::ComputedPropertyName { expression: None },
        )
    }

    pub fn var_decl(&mut self, name: NodeId, initializer: Option<NodeId>) -> NodeId {
        self.add(
            SyntaxKind::VariableDeclaration,
            NodeData::VariableDeclaration { name, initializer },
        )
    }

    pub fn var_stmt(&mut self, flags: NodeFlags, declarations: Vec<NodeId>) -> NodeId {
        self.add_full(
            SyntaxKind::VariableStatement,
            flags,
            ModifierFlags::NONE,
            NodeData::VariableStatement { declarations },
        )
    }

    pub fn parameter(&mut self, name: NodeId) -> NodeId {
        self.add(
            SyntaxKind::Parameter,
            NodeData::Parameter {
                name,
                optional: false,
                initializer: None,
            },
        )
    }

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.add(SyntaxKind::Block, NodeData::Block { statements })
    }

    pub fn func_decl(
        &mut self,
        name: Option<NodeId>,
        parameters: Vec<NodeId>,
        body: Option<NodeId>,
    ) -> NodeId {
        self.add(
            SyntaxKind::FunctionDeclaration,
            NodeData::FunctionLike {
                name,
                type_parameters: Vec::new(),
                parameters,
                body,
            },
        )
    }

    pub fn method(&mut self, name: NodeId, parameters: Vec<NodeId>, body: Option<NodeId>) -> NodeId {
        self.add(
            SyntaxKind::MethodDeclaration,
            NodeData::FunctionLike {
                name: Some(name),
                type_parameters: Vec::new(),
                parameters,
                body,
            },
        )
    }

    pub fn class_decl(&mut self, name: Option<NodeId>, members: Vec<NodeId>) -> NodeId {
        self.add(
            SyntaxKind::ClassDeclaration,
            NodeData::ClassLike {
                name,
                type_parameters: Vec::new(),
                members,
            },
        )
    }

    pub fn property_decl(&mut self, name: NodeId, initializer: Option<NodeId>) -> NodeId {
        self.add(
            SyntaxKind::PropertyDeclaration,
            NodeData::PropertyDeclaration {
                name,
                optional: false,
                initializer,
            },
        )
    }

    pub fn interface_decl(&mut self, name: NodeId, members: Vec<NodeId>) -> NodeId {
        self.add(
            SyntaxKind::InterfaceDeclaration,
            NodeData::InterfaceDeclaration {
                name,
                type_parameters: Vec::new(),
                members,
            },
        )
    }

    pub fn property_sig(&mut self, name: NodeId, optional: bool) -> NodeId {
        self.add(
            SyntaxKind::PropertySignature,
            NodeData::PropertySignature { name, optional },
        )
    }

    pub fn type_alias(&mut self, name: NodeId, type_parameters: Vec<NodeId>) -> NodeId {
        self.add(
            SyntaxKind::TypeAliasDeclaration,
            NodeData::TypeAliasDeclaration {
                name,
                type_parameters,
            },
        )
    }

    pub fn type_param(&mut self, name: NodeId) -> NodeId {
        self.add(SyntaxKind::TypeParameter, NodeData::TypeParameter { name })
    }

    pub fn enum_decl(&mut self, name: NodeId, members: Vec<NodeId>) -> NodeId {
        self.add(
            SyntaxKind::EnumDeclaration,
            NodeData::EnumDeclaration { name, members },
        )
    }

    pub fn enum_member(&mut self, name: NodeId, initializer: Option<NodeId>) -> NodeId {
        self.add(
            SyntaxKind::EnumMember,
            NodeData::EnumMember { name, initializer },
        )
    }

    pub fn module_decl(&mut self, name: NodeId, body: Option<NodeId>) -> NodeId {
        self.add(
            SyntaxKind::ModuleDeclaration,
            NodeData::ModuleDeclaration { name, body },
        )
    }

    pub fn module_block(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.add(SyntaxKind::ModuleBlock, NodeData::ModuleBlock { statements })
    }

    pub fn object_literal(&mut self, properties: Vec<NodeId>) -> NodeId {
        self.add(
            SyntaxKind::ObjectLiteralExpression,
            NodeData::ObjectLiteral { properties },
        )
    }

    pub fn property_assignment(&mut self, name: NodeId, initializer: Option<NodeId>) -> NodeId {
        self.add(
            SyntaxKind::PropertyAssignment,
            NodeData::PropertyAssignment { name, initializer },
        )
    }

    pub fn expr_stmt(&mut self, expression: NodeId) -> NodeId {
        self.add(
            SyntaxKind::ExpressionStatement,
            NodeData::ExpressionStatement { expression },
        )
    }

    pub fn source_file(&mut self, statements: Vec<NodeId>) -> NodeId {
        self.add(SyntaxKind::SourceFile, NodeData::SourceFile { statements })
    }

    /// Finish the tree: record the root and wire parent back-references by
    /// walking the child lists top-down.
    pub fn finish(mut self, root: NodeId) -> SyntaxTree {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            for child in self.nodes[id.index()].data.children() {
                self.nodes[child.index()].parent = id;
                stack.push(child);
            }
        }
        SyntaxTree {
            nodes: self.nodes,
            root,
        }
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
