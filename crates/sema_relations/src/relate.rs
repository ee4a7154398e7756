//! The relation engine: decides whether two types are related under a
//! given relation kind.
//!
//! The engine is a pure query surface over the type table: it never
//! mutates its inputs, only its caches (and the type table, when generic
//! instantiation materializes new types). Termination on recursive and
//! generic structures comes from three mechanisms working together:
//! a per-relation succeed/fail cache, an assumption stack that answers
//! `Maybe` for in-progress comparisons, and a hard depth cap backed by a
//! deeply-nested-type heuristic for infinitely-expanding instantiations.

use crate::instantiate::{Instantiator, TypeMapper};
use crate::types::{ObjectShape, Signature, TypeKind, TypeTable};
use rustc_hash::FxHashMap;
use sema_ast::types::{ObjectFlags, SymbolFlags, SymbolId, TypeFlags, TypeId, Variance};
use sema_binder::{SymbolArena, SymbolLinks};
use sema_core::intern::StringInterner;
use sema_options::AnalyzerOptions;
use tracing::trace;

/// Which comparison rules and cache partition apply. A relation is always
/// passed explicitly; the engine keeps no ambient relation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Identity,
    Subtype,
    Assignable,
    DefinitelyAssignable,
    Comparable,
}

impl Relation {
    fn index(self) -> usize {
        match self {
            Relation::Identity => 0,
            Relation::Subtype => 1,
            Relation::Assignable => 2,
            Relation::DefinitelyAssignable => 3,
            Relation::Comparable => 4,
        }
    }

    /// The relations that carry the historical assignability carve-outs
    /// (`any` source, numeric sources against numeric enum targets).
    fn is_assignable_like(self) -> bool {
        matches!(
            self,
            Relation::Assignable | Relation::DefinitelyAssignable | Relation::Comparable
        )
    }
}

/// Three-valued relation result. `Maybe` means "related under the
/// assumptions currently on the stack".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Ternary {
    False,
    Maybe,
    True,
}

impl Ternary {
    /// Combine conjunctively: False dominates, then Maybe.
    #[inline]
    pub fn and(self, other: Ternary) -> Ternary {
        self.min(other)
    }

    #[inline]
    pub fn is_related(self) -> bool {
        self != Ternary::False
    }
}

/// Key of one (source, target) comparison in a relation's cache.
/// Generic references over unconstrained type parameters use a
/// structural text key so equivalent instantiations share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RelationKey {
    Ids(u32, u32),
    Text(String),
}

/// Marker type-parameter types used to probe variance.
#[derive(Debug, Clone, Copy)]
pub struct MarkerTypes {
    pub sub: TypeId,
    pub super_: TypeId,
    pub other: TypeId,
}

/// Per-session relation caches. Never evicted within a session; callers
/// needing isolation between analyses use fresh instances.
#[derive(Debug, Default)]
pub struct RelationCaches {
    /// One succeed/fail partition per relation kind.
    partitions: [FxHashMap<RelationKey, bool>; 5],
    /// Enum-to-enum relatedness by symbol-id pair.
    enum_relation: FxHashMap<(SymbolId, SymbolId), bool>,
    /// Measured variances per generic target. An empty vector marks an
    /// in-progress measurement.
    pub(crate) variances: FxHashMap<TypeId, Vec<Variance>>,
    /// Instantiation memo shared with the instantiator.
    pub(crate) instantiations: crate::instantiate::InstantiationCache,
    pub(crate) markers: Option<MarkerTypes>,
}

impl RelationCaches {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, relation: Relation) -> &FxHashMap<RelationKey, bool> {
        &self.partitions[relation.index()]
    }

    fn partition_mut(&mut self, relation: Relation) -> &mut FxHashMap<RelationKey, bool> {
        &mut self.partitions[relation.index()]
    }
}

/// Whether the current comparison sits inside an intersection constituent,
/// threaded explicitly through the comparison calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntersectionState {
    None,
    Target,
}

const EXPANDING_NONE: u8 = 0;
const EXPANDING_SOURCE: u8 = 1;
const EXPANDING_TARGET: u8 = 2;
const EXPANDING_BOTH: u8 = 3;

/// Comparisons deeper than this abort with a sticky overflow.
const MAX_RELATION_DEPTH: u32 = 100;

/// A symbol recurring this often among stacked object types at this depth
/// marks an infinitely-expanding instantiation.
const EXPANSION_DEPTH: usize = 5;
const EXPANSION_COUNT: usize = 5;

/// The relation engine. Borrows the session's arenas and caches; owns only
/// the in-flight comparison state.
pub struct RelationChecker<'a> {
    pub types: &'a mut TypeTable,
    pub symbols: &'a mut SymbolArena,
    pub links: &'a mut SymbolLinks,
    pub interner: &'a StringInterner,
    pub options: &'a AnalyzerOptions,
    pub caches: &'a mut RelationCaches,
    maybe_keys: Vec<RelationKey>,
    source_stack: Vec<TypeId>,
    target_stack: Vec<TypeId>,
    depth: u32,
    expanding_flags: u8,
    overflow: bool,
    structural_comparisons: usize,
}

impl<'a> RelationChecker<'a> {
    pub fn new(
        types: &'a mut TypeTable,
        symbols: &'a mut SymbolArena,
        links: &'a mut SymbolLinks,
        interner: &'a StringInterner,
        options: &'a AnalyzerOptions,
        caches: &'a mut RelationCaches,
    ) -> Self {
        Self {
            types,
            symbols,
            links,
            interner,
            options,
            caches,
            maybe_keys: Vec::new(),
            source_stack: Vec::new(),
            target_stack: Vec::new(),
            depth: 0,
            expanding_flags: EXPANDING_NONE,
            overflow: false,
            structural_comparisons: 0,
        }
    }

    /// Decide whether `source` is related to `target` under `relation`.
    /// Pure with respect to its inputs; every input produces a Ternary.
    pub fn is_related(&mut self, source: TypeId, target: TypeId, relation: Relation) -> Ternary {
        self.overflow = false;
        let result = self.is_related_to(source, target, relation, IntersectionState::None);
        // At the outer boundary every surviving assumption has been
        // committed, so Maybe means related.
        if result == Ternary::Maybe {
            Ternary::True
        } else {
            result
        }
    }

    /// Boolean convenience: related unless definitely not.
    pub fn check_related(&mut self, source: TypeId, target: TypeId, relation: Relation) -> bool {
        self.is_related(source, target, relation).is_related()
    }

    /// Whether the last `is_related` query hit the recursion cap. An
    /// overflowed `False` means "not proven related", not a guarantee.
    pub fn overflowed(&self) -> bool {
        self.overflow
    }

    /// How many structural comparisons have run; cache-idempotence tests
    /// observe this.
    pub fn structural_comparisons(&self) -> usize {
        self.structural_comparisons
    }

    // ========================================================================
    // Fast paths
    // ========================================================================

    /// Cheap, non-recursive checks evaluated before any structural
    /// comparison.
    fn simple_type_related_to(&mut self, source: TypeId, target: TypeId, relation: Relation) -> bool {
        let s = self.types.get(source).flags;
        let t = self.types.get(target).flags;

        if t.contains(TypeFlags::ANY) || t.contains(TypeFlags::UNKNOWN) || s.contains(TypeFlags::NEVER)
        {
            return true;
        }
        if t.contains(TypeFlags::NEVER) {
            return false;
        }

        // Literal-like sources widen to their general primitive.
        if s.intersects(TypeFlags::STRING_LIKE) && t.contains(TypeFlags::STRING) {
            return true;
        }
        if s.intersects(TypeFlags::NUMBER_LIKE) && t.contains(TypeFlags::NUMBER) {
            return true;
        }
        if s.intersects(TypeFlags::BIG_INT_LIKE) && t.contains(TypeFlags::BIG_INT) {
            return true;
        }
        if s.intersects(TypeFlags::BOOLEAN_LIKE) && t.contains(TypeFlags::BOOLEAN) {
            return true;
        }
        if s.contains(TypeFlags::ES_SYMBOL) && t.contains(TypeFlags::ES_SYMBOL) {
            return true;
        }
        if s.contains(TypeFlags::VOID) && t.contains(TypeFlags::VOID) {
            return true;
        }

        // Enums relate through their symbols.
        if s.contains(TypeFlags::ENUM) && t.contains(TypeFlags::ENUM) {
            if let (Some(ss), Some(ts)) = (self.types.get(source).symbol, self.types.get(target).symbol)
            {
                if self.is_enum_type_related_to(ss, ts, relation) {
                    return true;
                }
            }
        }
        if s.contains(TypeFlags::ENUM_LITERAL) {
            let source_member = self.types.get(source).symbol;
            let target_symbol = self.types.get(target).symbol;
            if t.contains(TypeFlags::ENUM_LITERAL) {
                // Members relate when their names match and their enums do.
                if let (Some(sm), Some(tm)) = (source_member, target_symbol) {
                    let same_name =
                        self.symbols.get(sm).escaped_name == self.symbols.get(tm).escaped_name;
                    let sp = self.symbols.get(sm).parent;
                    let tp = self.symbols.get(tm).parent;
                    if same_name {
                        if let (Some(sp), Some(tp)) = (sp, tp) {
                            if self.is_enum_type_related_to(sp, tp, relation) {
                                return true;
                            }
                        }
                    }
                }
            } else if t.contains(TypeFlags::ENUM) {
                // A member relates to its (or a superset) enum.
                if let (Some(sm), Some(ts)) = (source_member, target_symbol) {
                    if let Some(sp) = self.symbols.get(sm).parent {
                        if self.is_enum_type_related_to(sp, ts, relation) {
                            return true;
                        }
                    }
                }
            }
        }

        // Nullable sources, gated by strictNullChecks.
        let strict_null = self.options.effective_strict_null_checks();
        if s.contains(TypeFlags::UNDEFINED)
            && (!strict_null || t.intersects(TypeFlags::UNDEFINED | TypeFlags::VOID))
        {
            return true;
        }
        if s.contains(TypeFlags::NULL) && (!strict_null || t.contains(TypeFlags::NULL)) {
            return true;
        }

        if s.contains(TypeFlags::OBJECT) && t.contains(TypeFlags::NON_PRIMITIVE) {
            return true;
        }

        if relation.is_assignable_like() {
            if s.contains(TypeFlags::ANY) {
                return true;
            }
            // Backward-compatibility carve-out, preserved deliberately:
            // numeric sources relate to numeric enum targets.
            if s.intersects(TypeFlags::NUMBER | TypeFlags::NUMBER_LITERAL)
                && !s.contains(TypeFlags::ENUM_LITERAL)
                && t.intersects(TypeFlags::ENUM_LIKE)
            {
                if self.numeric_source_relates_to_enum_target(source, target) {
                    return true;
                }
            }
        }

        false
    }

    fn numeric_source_relates_to_enum_target(&self, source: TypeId, target: TypeId) -> bool {
        let t = self.types.get(target);
        if t.flags.contains(TypeFlags::ENUM_LITERAL) {
            let value = match &t.kind {
                TypeKind::EnumLiteral { value } => *value,
                _ => None,
            };
            match (value, &self.types.get(source).kind) {
                (Some(member_value), TypeKind::NumberLiteral { value, .. }) => {
                    *value == member_value
                }
                (Some(_), _) => true,
                (None, _) => false,
            }
        } else if let Some(symbol) = t.symbol {
            self.is_numeric_enum(symbol)
        } else {
            false
        }
    }

    /// All members carry a constant numeric value.
    fn is_numeric_enum(&self, enum_symbol: SymbolId) -> bool {
        match &self.symbols.get(enum_symbol).exports {
            Some(exports) => exports
                .iter()
                .all(|(_, &member)| self.symbols.get(member).constant_value.is_some()),
            None => false,
        }
    }

    /// Enum-to-enum relatedness: identity for strict relations; for
    /// assignable-like relations a name-equality member-superset check,
    /// cached by symbol-id pair.
    fn is_enum_type_related_to(
        &mut self,
        source_symbol: SymbolId,
        target_symbol: SymbolId,
        relation: Relation,
    ) -> bool {
        if source_symbol == target_symbol {
            return true;
        }
        if !relation.is_assignable_like() {
            return false;
        }
        let key = (source_symbol, target_symbol);
        if let Some(&cached) = self.caches.enum_relation.get(&key) {
            return cached;
        }
        let related = {
            let source_exports = &self.symbols.get(source_symbol).exports;
            let target_exports = &self.symbols.get(target_symbol).exports;
            match (source_exports, target_exports) {
                (Some(source_exports), Some(target_exports)) => source_exports
                    .iter()
                    .all(|(name, _)| target_exports.get(name).is_some()),
                _ => false,
            }
        };
        self.caches.enum_relation.insert(key, related);
        related
    }

    // ========================================================================
    // Structural path
    // ========================================================================

    fn is_related_to(
        &mut self,
        source: TypeId,
        target: TypeId,
        relation: Relation,
        intersection_state: IntersectionState,
    ) -> Ternary {
        // Fresh literal types compare as their regular forms.
        let source = self.types.regular_type_of(source);
        let target = self.types.regular_type_of(target);

        // Reflexive short-circuit on identity.
        if source == target {
            return Ternary::True;
        }

        if relation == Relation::Identity {
            return self.is_identical_to(source, target);
        }

        if self.simple_type_related_to(source, target, relation) {
            return Ternary::True;
        }

        let s = self.types.get(source).flags;
        let t = self.types.get(target).flags;

        if s.contains(TypeFlags::UNION) {
            // Comparable: any constituent suffices; everything else needs
            // every constituent related.
            return if relation == Relation::Comparable {
                self.some_type_related_to_type(source, target, relation)
            } else {
                self.each_type_related_to_type(source, target, relation)
            };
        }
        if t.contains(TypeFlags::UNION) {
            return self.type_related_to_some_type(source, target, relation);
        }
        if t.contains(TypeFlags::INTERSECTION) {
            return self.type_related_to_each_type(source, target, relation);
        }
        if s.contains(TypeFlags::INTERSECTION) {
            // No whole-intersection match was found; some constituent
            // relating is enough.
            return self.some_type_related_to_type(source, target, relation);
        }

        if s.intersects(TypeFlags::STRUCTURED_OR_INSTANTIABLE)
            || t.intersects(TypeFlags::STRUCTURED_OR_INSTANTIABLE)
        {
            return self.recursive_type_related_to(source, target, relation, intersection_state);
        }

        Ternary::False
    }

    fn each_type_related_to_type(
        &mut self,
        source: TypeId,
        target: TypeId,
        relation: Relation,
    ) -> Ternary {
        let constituents = match &self.types.get(source).kind {
            TypeKind::Union { types } => types.clone(),
            _ => return Ternary::False,
        };
        let mut result = Ternary::True;
        for constituent in constituents {
            let related = self.is_related_to(constituent, target, relation, IntersectionState::None);
            if related == Ternary::False {
                return Ternary::False;
            }
            result = result.and(related);
        }
        result
    }

    fn some_type_related_to_type(
        &mut self,
        source: TypeId,
        target: TypeId,
        relation: Relation,
    ) -> Ternary {
        let constituents = match &self.types.get(source).kind {
            TypeKind::Union { types } | TypeKind::Intersection { types } => types.clone(),
            _ => return Ternary::False,
        };
        for constituent in constituents {
            let related = self.is_related_to(constituent, target, relation, IntersectionState::None);
            if related != Ternary::False {
                return related;
            }
        }
        Ternary::False
    }

    fn type_related_to_some_type(
        &mut self,
        source: TypeId,
        target: TypeId,
        relation: Relation,
    ) -> Ternary {
        let constituents = match &self.types.get(target).kind {
            TypeKind::Union { types } => types.clone(),
            _ => return Ternary::False,
        };
        for constituent in constituents {
            let related = self.is_related_to(source, constituent, relation, IntersectionState::None);
            if related != Ternary::False {
                return related;
            }
        }
        Ternary::False
    }

    fn type_related_to_each_type(
        &mut self,
        source: TypeId,
        target: TypeId,
        relation: Relation,
    ) -> Ternary {
        let constituents = match &self.types.get(target).kind {
            TypeKind::Intersection { types } => types.clone(),
            _ => return Ternary::False,
        };
        let mut result = Ternary::True;
        for constituent in constituents {
            let related =
                self.is_related_to(source, constituent, relation, IntersectionState::Target);
            if related == Ternary::False {
                return Ternary::False;
            }
            result = result.and(related);
        }
        result
    }

    // ========================================================================
    // Identity
    // ========================================================================

    fn is_identical_to(&mut self, source: TypeId, target: TypeId) -> Ternary {
        let s = self.types.get(source).flags;
        let t = self.types.get(target).flags;
        if s != t {
            return Ternary::False;
        }
        if s.intersects(TypeFlags::UNION_OR_INTERSECTION) {
            // Each constituent must relate to some constituent, both ways.
            let mut result = self.each_related_to_some(source, target);
            if result != Ternary::False {
                result = result.and(self.each_related_to_some(target, source));
            }
            return result;
        }
        if s.intersects(TypeFlags::STRUCTURED_OR_INSTANTIABLE) {
            return self.recursive_type_related_to(
                source,
                target,
                Relation::Identity,
                IntersectionState::None,
            );
        }
        Ternary::False
    }

    fn each_related_to_some(&mut self, source: TypeId, target: TypeId) -> Ternary {
        let source_constituents = match &self.types.get(source).kind {
            TypeKind::Union { types } | TypeKind::Intersection { types } => types.clone(),
            _ => return Ternary::False,
        };
        let target_constituents = match &self.types.get(target).kind {
            TypeKind::Union { types } | TypeKind::Intersection { types } => types.clone(),
            _ => return Ternary::False,
        };
        let mut result = Ternary::True;
        'outer: for s in source_constituents {
            for &t in &target_constituents {
                let related = self.is_related_to(s, t, Relation::Identity, IntersectionState::None);
                if related != Ternary::False {
                    result = result.and(related);
                    continue 'outer;
                }
            }
            return Ternary::False;
        }
        result
    }

    // ========================================================================
    // Recursion and caching
    // ========================================================================

    /// The central termination mechanism: cache consult, assumption stack,
    /// depth cap, expansion heuristic, then the structural comparison.
    fn recursive_type_related_to(
        &mut self,
        source: TypeId,
        target: TypeId,
        relation: Relation,
        intersection_state: IntersectionState,
    ) -> Ternary {
        if self.overflow {
            return Ternary::False;
        }

        let key = self.relation_key(source, target);
        if let Some(&succeeded) = self.caches.partition(relation).get(&key) {
            return if succeeded {
                Ternary::True
            } else {
                Ternary::False
            };
        }

        // An in-progress comparison higher up the call stack: assume
        // related for now. This is what lets recursive and corecursive
        // types terminate.
        if self.maybe_keys.contains(&key) {
            return Ternary::Maybe;
        }

        if self.depth == MAX_RELATION_DEPTH {
            trace!(source_id = source.0, target_id = target.0, "relation depth cap reached");
            self.overflow = true;
            return Ternary::False;
        }

        let maybe_start = self.maybe_keys.len();
        self.maybe_keys.push(key.clone());
        self.source_stack.push(source);
        self.target_stack.push(target);
        self.depth += 1;

        let saved_expanding = self.expanding_flags;
        if self.expanding_flags & EXPANDING_SOURCE == 0
            && self.is_deeply_nested_type(source, &self.source_stack)
        {
            self.expanding_flags |= EXPANDING_SOURCE;
        }
        if self.expanding_flags & EXPANDING_TARGET == 0
            && self.is_deeply_nested_type(target, &self.target_stack)
        {
            self.expanding_flags |= EXPANDING_TARGET;
        }

        let result = if self.expanding_flags == EXPANDING_BOTH {
            // Both sides are expanding instantiations; comparing further
            // cannot decide anything new.
            Ternary::Maybe
        } else {
            self.structured_type_related_to(source, target, relation, intersection_state)
        };

        self.expanding_flags = saved_expanding;
        self.depth -= 1;
        self.source_stack.pop();
        self.target_stack.pop();

        if result != Ternary::False {
            if result == Ternary::True || self.depth == 0 {
                // Every assumption this sub-call leaned on held up; commit
                // them all as succeeded.
                for committed in self.maybe_keys.drain(maybe_start..) {
                    self.caches.partition_mut(relation).insert(committed, true);
                }
            }
        } else {
            // A relation that fails under no assumptions fails universally;
            // record only the exact key. An overflow-induced False is
            // "not proven related" and stays out of the cache.
            if !self.overflow {
                self.caches.partition_mut(relation).insert(key, false);
            }
            self.maybe_keys.truncate(maybe_start);
        }
        result
    }

    /// Relation key from type identities, with the specialized form for
    /// generic references over unconstrained type parameters so that
    /// structurally-equivalent instantiations share a cache entry.
    fn relation_key(&self, source: TypeId, target: TypeId) -> RelationKey {
        if let (
            TypeKind::Reference {
                target: source_target,
                type_arguments: source_args,
            },
            TypeKind::Reference {
                target: target_target,
                type_arguments: target_args,
            },
        ) = (&self.types.get(source).kind, &self.types.get(target).kind)
        {
            if source_target == target_target
                && source_args
                    .iter()
                    .chain(target_args.iter())
                    .all(|&arg| self.is_unconstrained_type_parameter(arg))
            {
                let mut ordinals: Vec<TypeId> = Vec::new();
                let mut encode = |args: &[TypeId], ordinals: &mut Vec<TypeId>| {
                    args.iter()
                        .map(|arg| {
                            let ordinal = match ordinals.iter().position(|o| o == arg) {
                                Some(pos) => pos,
                                None => {
                                    ordinals.push(*arg);
                                    ordinals.len() - 1
                                }
                            };
                            ordinal.to_string()
                        })
                        .collect::<Vec<_>>()
                        .join(",")
                };
                let source_key = encode(source_args, &mut ordinals);
                let target_key = encode(target_args, &mut ordinals);
                return RelationKey::Text(format!(
                    "{}={};{}",
                    source_target.0, source_key, target_key
                ));
            }
        }
        RelationKey::Ids(source.0, target.0)
    }

    fn is_unconstrained_type_parameter(&self, t: TypeId) -> bool {
        matches!(
            self.types.get(t).kind,
            TypeKind::TypeParameter {
                constraint: None,
                ..
            }
        )
    }

    /// A side is "expanding" when the same originating symbol appears
    /// often enough among stacked object types at sufficient depth; such
    /// instantiations grow forever and comparing deeper proves nothing.
    fn is_deeply_nested_type(&self, t: TypeId, stack: &[TypeId]) -> bool {
        let depth = stack.len();
        if depth < EXPANSION_DEPTH {
            return false;
        }
        let candidate = self.types.get(t);
        if !candidate.flags.contains(TypeFlags::OBJECT) {
            return false;
        }
        let symbol = match candidate.symbol {
            Some(symbol) => symbol,
            None => return false,
        };
        let mut count = 0;
        for &entry in stack.iter() {
            let entry_type = self.types.get(entry);
            if entry_type.flags.contains(TypeFlags::OBJECT) && entry_type.symbol == Some(symbol) {
                count += 1;
                if count >= EXPANSION_COUNT {
                    return true;
                }
            }
        }
        false
    }

    // ========================================================================
    // Structured comparison
    // ========================================================================

    fn structured_type_related_to(
        &mut self,
        source: TypeId,
        target: TypeId,
        relation: Relation,
        intersection_state: IntersectionState,
    ) -> Ternary {
        self.structural_comparisons += 1;

        if relation == Relation::Identity {
            return self.structured_identical_to(source, target);
        }

        let source_kind = self.types.get(source).kind.clone();
        let target_kind = self.types.get(target).kind.clone();

        // A type parameter relates through its constraint.
        if let TypeKind::TypeParameter { constraint, .. } = &source_kind {
            return match *constraint {
                Some(constraint) => {
                    self.is_related_to(constraint, target, relation, intersection_state)
                }
                None => Ternary::False,
            };
        }

        // keyof is contravariant in its operand: keyof B covers keyof A
        // whenever A covers B's keys.
        if let (TypeKind::Index { target: source_of }, TypeKind::Index { target: target_of }) =
            (&source_kind, &target_kind)
        {
            return self.is_related_to(*target_of, *source_of, relation, IntersectionState::None);
        }

        // Indexed accesses compare via their resolution when the object
        // and index are concrete enough.
        if matches!(target_kind, TypeKind::IndexedAccess { .. }) {
            if let (
                TypeKind::IndexedAccess {
                    object_type: so,
                    index_type: si,
                },
                TypeKind::IndexedAccess {
                    object_type: to,
                    index_type: ti,
                },
            ) = (&source_kind, &target_kind)
            {
                let objects = self.is_related_to(*so, *to, Relation::Identity, IntersectionState::None);
                if objects == Ternary::True {
                    let indexes =
                        self.is_related_to(*si, *ti, Relation::Identity, IntersectionState::None);
                    if indexes == Ternary::True {
                        return Ternary::True;
                    }
                }
            }
            if let Some(resolved) = self.resolve_indexed_access(target) {
                return self.is_related_to(source, resolved, relation, intersection_state);
            }
            return Ternary::False;
        }
        if matches!(source_kind, TypeKind::IndexedAccess { .. }) {
            if let Some(resolved) = self.resolve_indexed_access(source) {
                return self.is_related_to(resolved, target, relation, intersection_state);
            }
            return Ternary::False;
        }

        // Conditionals relate branch-wise over identical check/extends.
        if let (
            TypeKind::Conditional {
                check_type: sc,
                extends_type: se,
                true_type: st,
                false_type: sf,
            },
            TypeKind::Conditional {
                check_type: tc,
                extends_type: te,
                true_type: tt,
                false_type: tf,
            },
        ) = (&source_kind, &target_kind)
        {
            let checks = self.is_related_to(*sc, *tc, Relation::Identity, IntersectionState::None);
            let extends = self.is_related_to(*se, *te, Relation::Identity, IntersectionState::None);
            if checks == Ternary::True && extends == Ternary::True {
                let true_related = self.is_related_to(*st, *tt, relation, IntersectionState::None);
                if true_related == Ternary::False {
                    return Ternary::False;
                }
                let false_related = self.is_related_to(*sf, *tf, relation, IntersectionState::None);
                if false_related == Ternary::False {
                    return Ternary::False;
                }
                return true_related.and(false_related);
            }
            return Ternary::False;
        }

        // Generic mapped types: constraints contravariant, templates
        // covariant.
        if let (
            TypeKind::Mapped {
                constraint_type: sc,
                template_type: st,
                ..
            },
            TypeKind::Mapped {
                constraint_type: tc,
                template_type: tt,
                ..
            },
        ) = (&source_kind, &target_kind)
        {
            let constraints = self.is_related_to(*tc, *sc, relation, IntersectionState::None);
            if constraints == Ternary::False {
                return Ternary::False;
            }
            let any = self.types.any_type;
            let source_template = st.unwrap_or(any);
            let target_template = tt.unwrap_or(any);
            let templates =
                self.is_related_to(source_template, target_template, relation, IntersectionState::None);
            if templates == Ternary::False {
                return Ternary::False;
            }
            return constraints.and(templates);
        }

        // References to the same target compare argument-wise using the
        // target's measured variances; a failed or unmeasurable variance
        // pass falls back to full structural comparison.
        if let (
            TypeKind::Reference {
                target: source_target,
                type_arguments: source_args,
            },
            TypeKind::Reference {
                target: target_target,
                type_arguments: target_args,
            },
        ) = (&source_kind, &target_kind)
        {
            if source_target == target_target {
                let generic_target = *source_target;
                let source_args = source_args.clone();
                let target_args = target_args.clone();
                if let Some(result) =
                    self.relate_type_arguments(generic_target, &source_args, &target_args, relation)
                {
                    if result != Ternary::False {
                        return result;
                    }
                }
            }
        }

        // Object structural comparison over resolved structures.
        let source_resolved = self.resolve_structure(source);
        let target_resolved = self.resolve_structure(target);
        let source_is_object = matches!(self.types.get(source_resolved).kind, TypeKind::Object(_));
        let target_is_object = matches!(self.types.get(target_resolved).kind, TypeKind::Object(_));
        if source_is_object && target_is_object {
            let mut result = self.properties_related_to(
                source_resolved,
                target_resolved,
                relation,
                intersection_state,
            );
            if result != Ternary::False {
                let calls =
                    self.signatures_related_to(source_resolved, target_resolved, false, relation);
                if calls == Ternary::False {
                    return Ternary::False;
                }
                result = result.and(calls);
                let constructs =
                    self.signatures_related_to(source_resolved, target_resolved, true, relation);
                if constructs == Ternary::False {
                    return Ternary::False;
                }
                result = result.and(constructs);
                let indexes =
                    self.index_infos_related_to(source_resolved, target_resolved, relation);
                if indexes == Ternary::False {
                    return Ternary::False;
                }
                result = result.and(indexes);
            }
            return result;
        }

        Ternary::False
    }

    /// Resolve a reference to its structural form; other types are their
    /// own structure.
    fn resolve_structure(&mut self, t: TypeId) -> TypeId {
        if matches!(self.types.get(t).kind, TypeKind::Reference { .. }) {
            self.instantiator().resolve_reference(t)
        } else {
            t
        }
    }

    fn instantiator(&mut self) -> Instantiator<'_> {
        Instantiator {
            types: &mut *self.types,
            symbols: &mut *self.symbols,
            links: &mut *self.links,
            cache: &mut self.caches.instantiations,
        }
    }

    /// T[K] for a concrete object and literal (or indexable) key.
    fn resolve_indexed_access(&mut self, t: TypeId) -> Option<TypeId> {
        let (object_type, index_type) = match &self.types.get(t).kind {
            TypeKind::IndexedAccess {
                object_type,
                index_type,
            } => (*object_type, *index_type),
            _ => return None,
        };
        let object_resolved = self.resolve_structure(object_type);
        let shape = match &self.types.get(object_resolved).kind {
            TypeKind::Object(shape) => shape.clone(),
            _ => return None,
        };
        let index_regular = self.types.regular_type_of(index_type);
        match self.types.get(index_regular).kind.clone() {
            TypeKind::StringLiteral { value, .. } => {
                let name = self.interner.intern(&value);
                if let Some(property) = shape.members.get(&name) {
                    return self.links.type_of(property).or(Some(self.types.any_type));
                }
                shape.string_index.as_ref().map(|info| info.value_type)
            }
            TypeKind::NumberLiteral { .. } => shape
                .number_index
                .as_ref()
                .or(shape.string_index.as_ref())
                .map(|info| info.value_type),
            TypeKind::Intrinsic { .. }
                if self.types.get(index_regular).flags.contains(TypeFlags::STRING) =>
            {
                shape.string_index.as_ref().map(|info| info.value_type)
            }
            TypeKind::Intrinsic { .. }
                if self.types.get(index_regular).flags.contains(TypeFlags::NUMBER) =>
            {
                shape
                    .number_index
                    .as_ref()
                    .or(shape.string_index.as_ref())
                    .map(|info| info.value_type)
            }
            _ => None,
        }
    }

    // ========================================================================
    // Identity over structures
    // ========================================================================

    fn structured_identical_to(&mut self, source: TypeId, target: TypeId) -> Ternary {
        let source_kind = self.types.get(source).kind.clone();
        let target_kind = self.types.get(target).kind.clone();

        if let (
            TypeKind::Reference {
                target: st,
                type_arguments: sa,
            },
            TypeKind::Reference {
                target: tt,
                type_arguments: ta,
            },
        ) = (&source_kind, &target_kind)
        {
            if st == tt && sa.len() == ta.len() {
                let pairs: Vec<(TypeId, TypeId)> =
                    sa.iter().copied().zip(ta.iter().copied()).collect();
                let mut result = Ternary::True;
                for (s, t) in pairs {
                    let related =
                        self.is_related_to(s, t, Relation::Identity, IntersectionState::None);
                    if related == Ternary::False {
                        return Ternary::False;
                    }
                    result = result.and(related);
                }
                return result;
            }
            // References to different targets fall through to structural
            // comparison of their resolved forms.
        }

        if let (TypeKind::Index { target: so }, TypeKind::Index { target: to }) =
            (&source_kind, &target_kind)
        {
            return self.is_related_to(*so, *to, Relation::Identity, IntersectionState::None);
        }

        let source_resolved = self.resolve_structure(source);
        let target_resolved = self.resolve_structure(target);
        let source_shape = match &self.types.get(source_resolved).kind {
            TypeKind::Object(shape) => shape.clone(),
            _ => return Ternary::False,
        };
        let target_shape = match &self.types.get(target_resolved).kind {
            TypeKind::Object(shape) => shape.clone(),
            _ => return Ternary::False,
        };

        if source_shape.members.len() != target_shape.members.len()
            || source_shape.call_signatures.len() != target_shape.call_signatures.len()
            || source_shape.construct_signatures.len() != target_shape.construct_signatures.len()
            || source_shape.string_index.is_some() != target_shape.string_index.is_some()
            || source_shape.number_index.is_some() != target_shape.number_index.is_some()
        {
            return Ternary::False;
        }

        let mut result = Ternary::True;
        let target_members: Vec<(sema_core::intern::InternedString, SymbolId)> = target_shape
            .members
            .iter()
            .map(|(name, &id)| (*name, id))
            .collect();
        for (name, target_prop) in target_members {
            let source_prop = match source_shape.members.get(&name) {
                Some(prop) => prop,
                None => return Ternary::False,
            };
            let source_optional = self
                .symbols
                .get(source_prop)
                .flags
                .contains(SymbolFlags::OPTIONAL);
            let target_optional = self
                .symbols
                .get(target_prop)
                .flags
                .contains(SymbolFlags::OPTIONAL);
            if source_optional != target_optional {
                return Ternary::False;
            }
            let any = self.types.any_type;
            let source_type = self.links.type_of(source_prop).unwrap_or(any);
            let target_type = self.links.type_of(target_prop).unwrap_or(any);
            let related =
                self.is_related_to(source_type, target_type, Relation::Identity, IntersectionState::None);
            if related == Ternary::False {
                return Ternary::False;
            }
            result = result.and(related);
        }

        for (s_sig, t_sig) in source_shape
            .call_signatures
            .iter()
            .zip(target_shape.call_signatures.iter())
            .chain(
                source_shape
                    .construct_signatures
                    .iter()
                    .zip(target_shape.construct_signatures.iter()),
            )
        {
            if s_sig.parameters.len() != t_sig.parameters.len() {
                return Ternary::False;
            }
            let pairs: Vec<(TypeId, TypeId)> = s_sig
                .parameters
                .iter()
                .map(|p| p.type_id)
                .zip(t_sig.parameters.iter().map(|p| p.type_id))
                .chain(std::iter::once((s_sig.return_type, t_sig.return_type)))
                .collect();
            for (s, t) in pairs {
                let related = self.is_related_to(s, t, Relation::Identity, IntersectionState::None);
                if related == Ternary::False {
                    return Ternary::False;
                }
                result = result.and(related);
            }
        }

        let index_pairs: Vec<(TypeId, TypeId)> = source_shape
            .string_index
            .iter()
            .zip(target_shape.string_index.iter())
            .chain(
                source_shape
                    .number_index
                    .iter()
                    .zip(target_shape.number_index.iter()),
            )
            .map(|(s, t)| (s.value_type, t.value_type))
            .collect();
        for (s, t) in index_pairs {
            let related = self.is_related_to(s, t, Relation::Identity, IntersectionState::None);
            if related == Ternary::False {
                return Ternary::False;
            }
            result = result.and(related);
        }

        result
    }

    // ========================================================================
    // Property comparison
    // ========================================================================

    fn properties_related_to(
        &mut self,
        source: TypeId,
        target: TypeId,
        relation: Relation,
        intersection_state: IntersectionState,
    ) -> Ternary {
        let source_shape = match &self.types.get(source).kind {
            TypeKind::Object(shape) => shape.clone(),
            _ => return Ternary::False,
        };
        let target_members: Vec<SymbolId> = match &self.types.get(target).kind {
            TypeKind::Object(shape) => shape.members.iter().map(|(_, &id)| id).collect(),
            _ => return Ternary::False,
        };

        let mut result = Ternary::True;
        for target_prop in target_members {
            let target_flags = self.symbols.get(target_prop).flags;
            // The synthetic prototype property takes no part in structural
            // comparison.
            if target_flags.contains(SymbolFlags::PROTOTYPE) {
                continue;
            }
            let name = self.symbols.get(target_prop).escaped_name;
            let source_prop = source_shape.members.get(&name);

            let source_prop = match source_prop {
                None => {
                    if target_flags.contains(SymbolFlags::OPTIONAL) {
                        continue;
                    }
                    return Ternary::False;
                }
                Some(prop) => prop,
            };

            let source_flags = self.symbols.get(source_prop).flags;

            // Private properties must originate from the same declaration.
            if (source_flags | target_flags).contains(SymbolFlags::PRIVATE) {
                let source_parent = self.symbols.get(source_prop).parent;
                let target_parent = self.symbols.get(target_prop).parent;
                if source_parent != target_parent {
                    return Ternary::False;
                }
            } else if target_flags.contains(SymbolFlags::PROTECTED) {
                // The source must derive from the property's declaring
                // class.
                if let Some(declaring) = self.symbols.get(target_prop).parent {
                    if !self.type_derives_from_symbol(source, declaring) {
                        return Ternary::False;
                    }
                }
            } else if source_flags.contains(SymbolFlags::PROTECTED) {
                // A protected source property cannot satisfy a public
                // target property.
                return Ternary::False;
            }

            // Stricter relations refuse an optional source for a required
            // target.
            if matches!(relation, Relation::Subtype | Relation::DefinitelyAssignable)
                && source_flags.contains(SymbolFlags::OPTIONAL)
                && !target_flags.contains(SymbolFlags::OPTIONAL)
            {
                return Ternary::False;
            }

            let any = self.types.any_type;
            let source_type = self.links.type_of(source_prop).unwrap_or(any);
            let target_type = self.links.type_of(target_prop).unwrap_or(any);
            let related = self.is_related_to(source_type, target_type, relation, intersection_state);
            if related == Ternary::False {
                return Ternary::False;
            }
            result = result.and(related);
        }
        result
    }

    /// Whether a type's symbol or any of its base types' symbols is the
    /// given class symbol.
    fn type_derives_from_symbol(&mut self, t: TypeId, class_symbol: SymbolId) -> bool {
        let resolved = self.resolve_structure(t);
        if self.types.get(resolved).symbol == Some(class_symbol) {
            return true;
        }
        let bases = match &self.types.get(resolved).kind {
            TypeKind::Object(shape) => shape.base_types.clone(),
            _ => return false,
        };
        bases
            .into_iter()
            .any(|base| self.type_derives_from_symbol(base, class_symbol))
    }

    // ========================================================================
    // Signature comparison
    // ========================================================================

    fn signatures_related_to(
        &mut self,
        source: TypeId,
        target: TypeId,
        construct: bool,
        relation: Relation,
    ) -> Ternary {
        let pick = |shape: &ObjectShape| {
            if construct {
                shape.construct_signatures.clone()
            } else {
                shape.call_signatures.clone()
            }
        };
        let source_sigs = match &self.types.get(source).kind {
            TypeKind::Object(shape) => pick(shape),
            _ => return Ternary::False,
        };
        let target_sigs = match &self.types.get(target).kind {
            TypeKind::Object(shape) => pick(shape),
            _ => return Ternary::False,
        };
        if target_sigs.is_empty() {
            return Ternary::True;
        }

        // Different instantiations of the exact same anonymous origin
        // agree signature-for-signature with type parameters erased; skip
        // the cross-product.
        let same_origin = {
            let s = self.types.get(source);
            let t = self.types.get(target);
            s.symbol.is_some()
                && s.symbol == t.symbol
                && self.object_flags(source).contains(ObjectFlags::INSTANTIATED)
                && self.object_flags(target).contains(ObjectFlags::INSTANTIATED)
        };
        if same_origin && source_sigs.len() == target_sigs.len() {
            let mut result = Ternary::True;
            for (s_sig, t_sig) in source_sigs.iter().zip(target_sigs.iter()) {
                let s_erased = self.erased_signature(s_sig);
                let t_erased = self.erased_signature(t_sig);
                let related = self.signature_related_to(&s_erased, &t_erased, relation);
                if related == Ternary::False {
                    return Ternary::False;
                }
                result = result.and(related);
            }
            return result;
        }

        let mut result = Ternary::True;
        'outer: for t_sig in &target_sigs {
            for s_sig in &source_sigs {
                let related = self.signature_related_to(s_sig, t_sig, relation);
                if related != Ternary::False {
                    result = result.and(related);
                    continue 'outer;
                }
            }
            return Ternary::False;
        }
        result
    }

    fn object_flags(&self, t: TypeId) -> ObjectFlags {
        match &self.types.get(t).kind {
            TypeKind::Object(shape) => shape.object_flags,
            _ => ObjectFlags::NONE,
        }
    }

    /// Erase a signature's own type parameters to `any`.
    fn erased_signature(&mut self, signature: &Signature) -> Signature {
        if signature.type_parameters.is_empty() {
            return signature.clone();
        }
        let any = self.types.any_type;
        let args: Vec<TypeId> = signature.type_parameters.iter().map(|_| any).collect();
        let mapper = TypeMapper::new(&signature.type_parameters, &args);
        let mut instantiator = self.instantiator();
        let parameters = signature
            .parameters
            .iter()
            .map(|p| crate::types::SignatureParameter {
                name: p.name.clone(),
                type_id: instantiator.instantiate(p.type_id, &mapper),
                optional: p.optional,
            })
            .collect();
        let return_type = instantiator.instantiate(signature.return_type, &mapper);
        Signature {
            type_parameters: Vec::new(),
            parameters,
            return_type,
            min_argument_count: signature.min_argument_count,
            has_rest_parameter: signature.has_rest_parameter,
        }
    }

    fn signature_related_to(
        &mut self,
        source: &Signature,
        target: &Signature,
        relation: Relation,
    ) -> Ternary {
        // The source may not demand more arguments than the target
        // supplies.
        if source.min_argument_count as usize > target.parameters.len()
            && !target.has_rest_parameter
        {
            return Ternary::False;
        }

        let strict = self.options.effective_strict_function_types()
            || relation == Relation::DefinitelyAssignable;
        let count = source.parameters.len().min(target.parameters.len());
        let mut result = Ternary::True;
        for i in 0..count {
            let s_param = source.parameters[i].type_id;
            let t_param = target.parameters[i].type_id;
            // Parameters check contravariantly; bivariantly when strict
            // function types are off.
            let mut related = self.is_related_to(t_param, s_param, relation, IntersectionState::None);
            if related == Ternary::False && !strict {
                related = self.is_related_to(s_param, t_param, relation, IntersectionState::None);
            }
            if related == Ternary::False {
                return Ternary::False;
            }
            result = result.and(related);
        }

        // A void-returning target absorbs any source return type.
        if !self
            .types
            .get(target.return_type)
            .flags
            .contains(TypeFlags::VOID)
        {
            let related = self.is_related_to(
                source.return_type,
                target.return_type,
                relation,
                IntersectionState::None,
            );
            if related == Ternary::False {
                return Ternary::False;
            }
            result = result.and(related);
        }
        result
    }

    // ========================================================================
    // Index signature comparison
    // ========================================================================

    fn index_infos_related_to(
        &mut self,
        source: TypeId,
        target: TypeId,
        relation: Relation,
    ) -> Ternary {
        let (source_string, source_number) = match &self.types.get(source).kind {
            TypeKind::Object(shape) => (shape.string_index.clone(), shape.number_index.clone()),
            _ => return Ternary::False,
        };
        let (target_string, target_number) = match &self.types.get(target).kind {
            TypeKind::Object(shape) => (shape.string_index.clone(), shape.number_index.clone()),
            _ => return Ternary::False,
        };

        let mut result = Ternary::True;
        if let Some(target_info) = target_string {
            let source_info = match source_string.clone() {
                Some(info) => info,
                None => return Ternary::False,
            };
            let related = self.is_related_to(
                source_info.value_type,
                target_info.value_type,
                relation,
                IntersectionState::None,
            );
            if related == Ternary::False {
                return Ternary::False;
            }
            result = result.and(related);
        }
        if let Some(target_info) = target_number {
            // A numeric index is satisfiable by the source's numeric or
            // string indexer.
            let source_info = match source_number.or(source_string) {
                Some(info) => info,
                None => return Ternary::False,
            };
            let related = self.is_related_to(
                source_info.value_type,
                target_info.value_type,
                relation,
                IntersectionState::None,
            );
            if related == Ternary::False {
                return Ternary::False;
            }
            result = result.and(related);
        }
        result
    }

    // ========================================================================
    // Variance-aware generic references
    // ========================================================================

    /// Compare two instantiations of one generic target argument-by-
    /// argument, guided by the target's measured variances. Returns None
    /// when variances are unmeasurable (measurement in progress), telling
    /// the caller to fall back to structural comparison.
    fn relate_type_arguments(
        &mut self,
        generic_target: TypeId,
        source_args: &[TypeId],
        target_args: &[TypeId],
        relation: Relation,
    ) -> Option<Ternary> {
        if source_args.len() != target_args.len() {
            return Some(Ternary::False);
        }
        let variances = self.variances(generic_target);
        if variances.len() != source_args.len() {
            return None;
        }
        let mut result = Ternary::True;
        for (i, variance) in variances.iter().enumerate() {
            let s = source_args[i];
            let t = target_args[i];
            let related = match variance {
                Variance::Independent | Variance::Bivariant => Ternary::True,
                Variance::Covariant => self.is_related_to(s, t, relation, IntersectionState::None),
                Variance::Contravariant => {
                    self.is_related_to(t, s, relation, IntersectionState::None)
                }
                Variance::Invariant => {
                    let forward = self.is_related_to(s, t, relation, IntersectionState::None);
                    if forward == Ternary::False {
                        Ternary::False
                    } else {
                        forward.and(self.is_related_to(t, s, relation, IntersectionState::None))
                    }
                }
            };
            if related == Ternary::False {
                return Some(Ternary::False);
            }
            result = result.and(related);
        }
        Some(result)
    }
}

/// Saved in-flight comparison state. Variance probes swap the state out so
/// a measurement runs in a fresh comparison context, neither inheriting
/// nor corrupting the assumptions of the query that triggered it.
pub(crate) struct SavedComparison {
    maybe_keys: Vec<RelationKey>,
    source_stack: Vec<TypeId>,
    target_stack: Vec<TypeId>,
    depth: u32,
    expanding_flags: u8,
    overflow: bool,
}

impl<'a> RelationChecker<'a> {
    pub(crate) fn save_comparison_state(&mut self) -> SavedComparison {
        SavedComparison {
            maybe_keys: std::mem::take(&mut self.maybe_keys),
            source_stack: std::mem::take(&mut self.source_stack),
            target_stack: std::mem::take(&mut self.target_stack),
            depth: std::mem::take(&mut self.depth),
            expanding_flags: std::mem::replace(&mut self.expanding_flags, EXPANDING_NONE),
            overflow: std::mem::take(&mut self.overflow),
        }
    }

    pub(crate) fn restore_comparison_state(&mut self, saved: SavedComparison) {
        self.maybe_keys = saved.maybe_keys;
        self.source_stack = saved.source_stack;
        self.target_stack = saved.target_stack;
        self.depth = saved.depth;
        self.expanding_flags = saved.expanding_flags;
        self.overflow = saved.overflow;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ternary_and() {
        assert_eq!(Ternary::True.and(Ternary::True), Ternary::True);
        assert_eq!(Ternary::True.and(Ternary::Maybe), Ternary::Maybe);
        assert_eq!(Ternary::Maybe.and(Ternary::False), Ternary::False);
        assert!(Ternary::Maybe.is_related());
        assert!(!Ternary::False.is_related());
    }

    #[test]
    fn test_relation_partitions_are_disjoint() {
        let mut caches = RelationCaches::new();
        caches
            .partition_mut(Relation::Assignable)
            .insert(RelationKey::Ids(1, 2), true);
        assert!(caches
            .partition(Relation::Subtype)
            .get(&RelationKey::Ids(1, 2))
            .is_none());
        assert_eq!(
            caches
                .partition(Relation::Assignable)
                .get(&RelationKey::Ids(1, 2)),
            Some(&true)
        );
    }
}
