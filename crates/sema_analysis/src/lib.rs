//! sema_analysis: Analysis orchestration.
//!
//! An `AnalysisSession` owns everything one analysis needs: the interner,
//! the bound tree, the symbol and type arenas, and the relation caches.
//! Independent sessions share no state, so id allocation and cache
//! contents reset cleanly between analyses.

use sema_ast::node::SyntaxTree;
use sema_ast::types::{SymbolId, TypeId, Variance};
use sema_binder::{BindError, BindResult, Binder, SymbolArena, SymbolLinks};
use sema_core::intern::{InternedString, StringInterner};
use sema_diagnostics::DiagnosticCollection;
use sema_options::AnalyzerOptions;
use sema_relations::{Relation, RelationCaches, RelationChecker, Ternary, TypeTable};

/// One complete analysis: a tree bound into symbol tables plus a type
/// table the relation engine answers queries over.
pub struct AnalysisSession {
    pub options: AnalyzerOptions,
    interner: StringInterner,
    file_name: String,
    types: TypeTable,
    caches: RelationCaches,
    bound: Option<BindResult>,
    /// Arenas used before a tree is bound (standalone type construction).
    standalone_symbols: SymbolArena,
    standalone_links: SymbolLinks,
}

impl AnalysisSession {
    pub fn new(file_name: &str, options: AnalyzerOptions) -> Self {
        Self {
            options,
            interner: StringInterner::new(),
            file_name: file_name.to_string(),
            types: TypeTable::new(),
            caches: RelationCaches::new(),
            bound: None,
            standalone_symbols: SymbolArena::new(),
            standalone_links: SymbolLinks::new(),
        }
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn intern(&self, text: &str) -> InternedString {
        self.interner.intern(text)
    }

    /// Bind a tree into this session. The binder's arenas become the
    /// session's arenas.
    pub fn bind(&mut self, tree: &SyntaxTree) -> Result<&BindResult, BindError> {
        let binder = Binder::new(tree, &self.interner, &self.file_name);
        let result = binder.bind()?;
        self.bound = Some(result);
        Ok(self.bound.as_ref().expect("just bound"))
    }

    pub fn bind_result(&self) -> Option<&BindResult> {
        self.bound.as_ref()
    }

    pub fn diagnostics(&self) -> Option<&DiagnosticCollection> {
        self.bound.as_ref().map(|b| &b.diagnostics)
    }

    pub fn type_table(&self) -> &TypeTable {
        &self.types
    }

    pub fn type_table_mut(&mut self) -> &mut TypeTable {
        &mut self.types
    }

    /// The symbol arena: the bound tree's if a tree was bound, otherwise
    /// the session's standalone arena.
    pub fn symbols(&self) -> &SymbolArena {
        match &self.bound {
            Some(bound) => &bound.symbols,
            None => &self.standalone_symbols,
        }
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolArena {
        match &mut self.bound {
            Some(bound) => &mut bound.symbols,
            None => &mut self.standalone_symbols,
        }
    }

    pub fn links_mut(&mut self) -> &mut SymbolLinks {
        match &mut self.bound {
            Some(bound) => &mut bound.links,
            None => &mut self.standalone_links,
        }
    }

    /// Run a closure with a relation checker over this session's state.
    pub fn with_checker<R>(&mut self, f: impl FnOnce(&mut RelationChecker<'_>) -> R) -> R {
        let (symbols, links) = match &mut self.bound {
            Some(bound) => (&mut bound.symbols, &mut bound.links),
            None => (&mut self.standalone_symbols, &mut self.standalone_links),
        };
        let mut checker = RelationChecker::new(
            &mut self.types,
            symbols,
            links,
            &self.interner,
            &self.options,
            &mut self.caches,
        );
        f(&mut checker)
    }

    /// Decide whether `source` relates to `target` under `relation`.
    pub fn is_related(&mut self, source: TypeId, target: TypeId, relation: Relation) -> Ternary {
        self.with_checker(|checker| checker.is_related(source, target, relation))
    }

    /// Boolean convenience over `is_related`.
    pub fn check_related(&mut self, source: TypeId, target: TypeId, relation: Relation) -> bool {
        self.with_checker(|checker| checker.check_related(source, target, relation))
    }

    /// Measured variances of a generic target's type parameters.
    pub fn variances(&mut self, target: TypeId) -> Vec<Variance> {
        self.with_checker(|checker| checker.variances(target))
    }

    /// The fully-qualified display name of a symbol.
    pub fn qualified_name(&self, symbol: SymbolId) -> String {
        self.symbols().qualified_name(&self.interner, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_are_isolated() {
        let mut a = AnalysisSession::new("a.ts", AnalyzerOptions::default());
        let mut b = AnalysisSession::new("b.ts", AnalyzerOptions::default());
        let lit_a = a.type_table_mut().string_literal("x");
        let lit_b = b.type_table_mut().string_literal("y");
        // Fresh sessions allocate from their own arenas.
        assert_eq!(lit_a, lit_b);
        assert_eq!(a.type_table().len(), b.type_table().len());
    }
}
