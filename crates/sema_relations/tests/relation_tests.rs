//! Relation engine integration tests.
//!
//! Builds type descriptors by hand and verifies the relation rules:
//! fast paths, union/intersection decomposition, structural comparison,
//! caching, termination, and variance inference.

use sema_ast::types::{ObjectFlags, SymbolFlags, SymbolId, TypeId, Variance};
use sema_binder::{SymbolArena, SymbolLinks};
use sema_core::intern::StringInterner;
use sema_options::AnalyzerOptions;
use sema_relations::{
    make_property, member_table, ObjectShape, Relation, RelationCaches, RelationChecker,
    Signature, SignatureParameter, Ternary, TypeTable,
};

/// Everything one analysis session owns.
struct Fixture {
    interner: StringInterner,
    types: TypeTable,
    symbols: SymbolArena,
    links: SymbolLinks,
    options: AnalyzerOptions,
    caches: RelationCaches,
}

impl Fixture {
    fn new() -> Self {
        Self::with_options(AnalyzerOptions::default())
    }

    fn strict() -> Self {
        Self::with_options(AnalyzerOptions {
            strict: Some(true),
            ..Default::default()
        })
    }

    fn with_options(options: AnalyzerOptions) -> Self {
        Self {
            interner: StringInterner::new(),
            types: TypeTable::new(),
            symbols: SymbolArena::new(),
            links: SymbolLinks::new(),
            options,
            caches: RelationCaches::new(),
        }
    }

    fn checker(&mut self) -> RelationChecker<'_> {
        RelationChecker::new(
            &mut self.types,
            &mut self.symbols,
            &mut self.links,
            &self.interner,
            &self.options,
            &mut self.caches,
        )
    }

    /// An anonymous object type from (name, type, optional) triples.
    fn object(&mut self, properties: &[(&str, TypeId, bool)]) -> TypeId {
        let props: Vec<SymbolId> = properties
            .iter()
            .map(|(name, type_id, optional)| {
                make_property(
                    &mut self.symbols,
                    &mut self.links,
                    &self.interner,
                    name,
                    *type_id,
                    *optional,
                )
            })
            .collect();
        let members = member_table(&self.symbols, &props);
        self.types.object(
            ObjectShape {
                object_flags: ObjectFlags::ANONYMOUS,
                members,
                ..Default::default()
            },
            None,
        )
    }

    /// A function type with one call signature.
    fn function(&mut self, parameters: &[TypeId], return_type: TypeId) -> TypeId {
        let signature = Signature {
            type_parameters: Vec::new(),
            parameters: parameters
                .iter()
                .enumerate()
                .map(|(i, &type_id)| SignatureParameter {
                    name: format!("arg{}", i),
                    type_id,
                    optional: false,
                })
                .collect(),
            return_type,
            min_argument_count: parameters.len() as u32,
            has_rest_parameter: false,
        };
        self.types.object(
            ObjectShape {
                object_flags: ObjectFlags::ANONYMOUS,
                call_signatures: vec![signature],
                ..Default::default()
            },
            None,
        )
    }

    /// An enum symbol with members, plus its enum type.
    fn enum_with_members(&mut self, name: &str, members: &[(&str, f64)]) -> (SymbolId, TypeId) {
        let enum_symbol = self
            .symbols
            .alloc(self.interner.intern(name), SymbolFlags::REGULAR_ENUM);
        for (member_name, value) in members {
            let member = self
                .symbols
                .alloc(self.interner.intern(member_name), SymbolFlags::ENUM_MEMBER);
            self.symbols.get_mut(member).parent = Some(enum_symbol);
            self.symbols.get_mut(member).constant_value = Some(*value);
            let interned = self.interner.intern(member_name);
            self.symbols.exports_mut(enum_symbol).set(interned, member);
        }
        let enum_type = self.types.enum_type(enum_symbol);
        (enum_symbol, enum_type)
    }
}

// ============================================================================
// Fast paths
// ============================================================================

#[test]
fn test_any_and_never_absorption() {
    let mut f = Fixture::new();
    let (any, never, string) = (f.types.any_type, f.types.never_type, f.types.string_type);
    let mut checker = f.checker();
    assert_eq!(checker.is_related(string, any, Relation::Assignable), Ternary::True);
    assert_eq!(checker.is_related(never, string, Relation::Assignable), Ternary::True);
    assert_eq!(checker.is_related(string, never, Relation::Assignable), Ternary::False);
    assert_eq!(checker.is_related(any, string, Relation::Assignable), Ternary::True);
    // `any` source only relates to everything under assignable-like
    // relations.
    assert_eq!(checker.is_related(any, string, Relation::Subtype), Ternary::False);
}

#[test]
fn test_literal_widening() {
    let mut f = Fixture::new();
    let lit = f.types.string_literal("x");
    let three = f.types.number_literal(3.0);
    let (string, number, boolean) = (f.types.string_type, f.types.number_type, f.types.boolean_type);
    let true_type = f.types.true_type;
    let mut checker = f.checker();
    assert!(checker.check_related(lit, string, Relation::Assignable));
    assert!(checker.check_related(three, number, Relation::Assignable));
    assert!(checker.check_related(true_type, boolean, Relation::Assignable));
    assert!(!checker.check_related(string, lit, Relation::Assignable));
    assert!(!checker.check_related(lit, number, Relation::Assignable));
}

#[test]
fn test_fresh_literals_normalize_to_regular() {
    let mut f = Fixture::new();
    let regular = f.types.string_literal("x");
    let fresh = f.types.fresh_string_literal("x");
    assert_ne!(regular, fresh);
    let mut checker = f.checker();
    assert_eq!(checker.is_related(fresh, regular, Relation::Identity), Ternary::True);
    assert_eq!(checker.is_related(regular, fresh, Relation::Assignable), Ternary::True);
}

#[test]
fn test_nullable_gated_by_strict_null_checks() {
    let mut f = Fixture::new();
    let (undefined, null, string) = (f.types.undefined_type, f.types.null_type, f.types.string_type);
    let mut checker = f.checker();
    assert!(checker.check_related(undefined, string, Relation::Assignable));
    assert!(checker.check_related(null, string, Relation::Assignable));

    let mut f = Fixture::strict();
    let (undefined, void_type, string) =
        (f.types.undefined_type, f.types.void_type, f.types.string_type);
    let null = f.types.null_type;
    let mut checker = f.checker();
    assert!(!checker.check_related(undefined, string, Relation::Assignable));
    assert!(!checker.check_related(null, string, Relation::Assignable));
    // undefined still reaches void.
    assert!(checker.check_related(undefined, void_type, Relation::Assignable));
}

// ============================================================================
// Enum relations
// ============================================================================

#[test]
fn test_enum_member_superset() {
    let mut f = Fixture::new();
    let (_, small) = f.enum_with_members("Small", &[("A", 0.0), ("B", 1.0)]);
    let (_, big) = f.enum_with_members("Big", &[("A", 0.0), ("B", 1.0), ("C", 2.0)]);
    let mut checker = f.checker();
    assert!(checker.check_related(small, big, Relation::Assignable));
    assert!(!checker.check_related(big, small, Relation::Assignable));
    // Strict relations require identity.
    assert!(!checker.check_related(small, big, Relation::Subtype));
}

#[test]
fn test_enum_member_relates_to_its_enum() {
    let mut f = Fixture::new();
    let (enum_symbol, enum_type) = f.enum_with_members("Color", &[("Red", 0.0), ("Green", 1.0)]);
    let member_symbol = f
        .symbols
        .get(enum_symbol)
        .exports
        .as_ref()
        .unwrap()
        .get(&f.interner.intern("Red"))
        .unwrap();
    let member_type = f.types.enum_literal(member_symbol, Some(0.0));
    let mut checker = f.checker();
    assert!(checker.check_related(member_type, enum_type, Relation::Assignable));
    assert!(!checker.check_related(enum_type, member_type, Relation::Assignable));
}

#[test]
fn test_numeric_enum_carve_out() {
    let mut f = Fixture::new();
    let (_, color) = f.enum_with_members("Color", &[("Red", 0.0), ("Green", 1.0)]);
    let one = f.types.number_literal(1.0);
    let number = f.types.number_type;
    let mut checker = f.checker();
    // Deliberate compatibility behavior: numeric sources relate to numeric
    // enum targets, but only under assignable-like relations.
    assert!(checker.check_related(one, color, Relation::Assignable));
    assert!(checker.check_related(number, color, Relation::Comparable));
    assert!(!checker.check_related(number, color, Relation::Subtype));
}

// ============================================================================
// Unions and intersections
// ============================================================================

#[test]
fn test_literal_union_against_string() {
    let mut f = Fixture::new();
    let x = f.types.string_literal("x");
    let y = f.types.string_literal("y");
    let union = f.types.union(vec![x, y]);
    let string = f.types.string_type;
    let mut checker = f.checker();
    assert_eq!(checker.is_related(union, string, Relation::Assignable), Ternary::True);
    assert_eq!(checker.is_related(string, union, Relation::Assignable), Ternary::False);
}

#[test]
fn test_literal_against_union_target() {
    let mut f = Fixture::new();
    let x = f.types.string_literal("x");
    let y = f.types.string_literal("y");
    let z = f.types.string_literal("z");
    let union = f.types.union(vec![x, y]);
    let mut checker = f.checker();
    assert!(checker.check_related(x, union, Relation::Assignable));
    assert!(!checker.check_related(z, union, Relation::Assignable));
}

#[test]
fn test_comparable_union_uses_some_constituent() {
    let mut f = Fixture::new();
    let x = f.types.string_literal("x");
    let three = f.types.number_literal(3.0);
    let union = f.types.union(vec![x, three]);
    let string = f.types.string_type;
    let mut checker = f.checker();
    // Some constituent relates, so the union is comparable but not
    // assignable.
    assert!(checker.check_related(union, string, Relation::Comparable));
    assert!(!checker.check_related(union, string, Relation::Assignable));
}

#[test]
fn test_intersection_target_requires_each() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let string = f.types.string_type;
    let a = f.object(&[("a", number, false)]);
    let b = f.object(&[("b", string, false)]);
    let both = f.object(&[("a", number, false), ("b", string, false)]);
    let target = f.types.intersection(vec![a, b]);
    let mut checker = f.checker();
    assert!(checker.check_related(both, target, Relation::Assignable));
    let a_only = f.object(&[("a", number, false)]);
    let mut checker = f.checker();
    assert!(!checker.check_related(a_only, target, Relation::Assignable));
}

#[test]
fn test_intersection_source_some_constituent() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let string = f.types.string_type;
    let a = f.object(&[("a", number, false)]);
    let b = f.object(&[("b", string, false)]);
    let source = f.types.intersection(vec![a, b]);
    let target = f.object(&[("a", number, false)]);
    let mut checker = f.checker();
    assert!(checker.check_related(source, target, Relation::Assignable));
}

#[test]
fn test_union_identity_ignores_order() {
    let mut f = Fixture::new();
    let string = f.types.string_type;
    let number = f.types.number_type;
    let a = f.types.union(vec![string, number]);
    let b = f.types.union(vec![number, string]);
    assert_ne!(a, b);
    let mut checker = f.checker();
    assert_eq!(checker.is_related(a, b, Relation::Identity), Ternary::True);
}

// ============================================================================
// Object structural comparison
// ============================================================================

#[test]
fn test_missing_required_property() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let string = f.types.string_type;
    let source = f.object(&[("a", number, false)]);
    let target = f.object(&[("a", number, false), ("b", string, false)]);
    let mut checker = f.checker();
    assert_eq!(checker.is_related(source, target, Relation::Assignable), Ternary::False);
}

#[test]
fn test_missing_optional_property_is_fine() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let string = f.types.string_type;
    let source = f.object(&[("a", number, false)]);
    let target = f.object(&[("a", number, false), ("b", string, true)]);
    let mut checker = f.checker();
    assert_eq!(checker.is_related(source, target, Relation::Assignable), Ternary::True);
}

#[test]
fn test_extra_source_properties_are_fine() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let string = f.types.string_type;
    let source = f.object(&[("a", number, false), ("b", string, false)]);
    let target = f.object(&[("a", number, false)]);
    let mut checker = f.checker();
    assert!(checker.check_related(source, target, Relation::Assignable));
}

#[test]
fn test_property_type_mismatch() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let string = f.types.string_type;
    let source = f.object(&[("a", string, false)]);
    let target = f.object(&[("a", number, false)]);
    let mut checker = f.checker();
    assert!(!checker.check_related(source, target, Relation::Assignable));
}

#[test]
fn test_optional_source_fails_stricter_relations() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let source = f.object(&[("a", number, true)]);
    let target = f.object(&[("a", number, false)]);
    let mut checker = f.checker();
    assert!(checker.check_related(source, target, Relation::Assignable));
    assert!(!checker.check_related(source, target, Relation::DefinitelyAssignable));
    assert!(!checker.check_related(source, target, Relation::Subtype));
}

#[test]
fn test_object_identity() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let string = f.types.string_type;
    let a = f.object(&[("a", number, false)]);
    let b = f.object(&[("a", number, false)]);
    let c = f.object(&[("a", string, false)]);
    let d = f.object(&[("a", number, true)]);
    let mut checker = f.checker();
    assert_eq!(checker.is_related(a, b, Relation::Identity), Ternary::True);
    assert_eq!(checker.is_related(a, c, Relation::Identity), Ternary::False);
    // Optionality must agree exactly under identity.
    assert_eq!(checker.is_related(a, d, Relation::Identity), Ternary::False);
}

#[test]
fn test_reflexivity_for_identity() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let object = f.object(&[("a", number, false)]);
    let union = f.types.union(vec![object, number]);
    let mut checker = f.checker();
    for t in [number, object, union] {
        assert_eq!(checker.is_related(t, t, Relation::Identity), Ternary::True);
    }
}

// ============================================================================
// Accessibility
// ============================================================================

#[test]
fn test_private_properties_require_same_declaration() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let class_a = f.symbols.alloc(f.interner.intern("A"), SymbolFlags::CLASS);
    let class_b = f.symbols.alloc(f.interner.intern("B"), SymbolFlags::CLASS);

    let make_private = |f: &mut Fixture, parent: SymbolId| {
        let prop = make_property(&mut f.symbols, &mut f.links, &f.interner, "secret", number, false);
        f.symbols.get_mut(prop).flags |= SymbolFlags::PRIVATE;
        f.symbols.get_mut(prop).parent = Some(parent);
        prop
    };

    let p1 = make_private(&mut f, class_a);
    let p2 = make_private(&mut f, class_a);
    let p3 = make_private(&mut f, class_b);

    let members1 = member_table(&f.symbols, &[p1]);
    let members2 = member_table(&f.symbols, &[p2]);
    let members3 = member_table(&f.symbols, &[p3]);
    let t1 = f.types.object(ObjectShape { members: members1, ..Default::default() }, Some(class_a));
    let t2 = f.types.object(ObjectShape { members: members2, ..Default::default() }, Some(class_a));
    let t3 = f.types.object(ObjectShape { members: members3, ..Default::default() }, Some(class_b));

    let mut checker = f.checker();
    assert!(checker.check_related(t1, t2, Relation::Assignable));
    assert!(!checker.check_related(t1, t3, Relation::Assignable));
}

#[test]
fn test_protected_properties_require_derivation() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let base_symbol = f.symbols.alloc(f.interner.intern("Base"), SymbolFlags::CLASS);
    let derived_symbol = f.symbols.alloc(f.interner.intern("Derived"), SymbolFlags::CLASS);
    let other_symbol = f.symbols.alloc(f.interner.intern("Other"), SymbolFlags::CLASS);

    let target_prop =
        make_property(&mut f.symbols, &mut f.links, &f.interner, "state", number, false);
    f.symbols.get_mut(target_prop).flags |= SymbolFlags::PROTECTED;
    f.symbols.get_mut(target_prop).parent = Some(base_symbol);
    let target_members = member_table(&f.symbols, &[target_prop]);
    let base_type = f.types.object(
        ObjectShape { members: target_members, ..Default::default() },
        Some(base_symbol),
    );

    let derived_prop =
        make_property(&mut f.symbols, &mut f.links, &f.interner, "state", number, false);
    f.symbols.get_mut(derived_prop).flags |= SymbolFlags::PROTECTED;
    f.symbols.get_mut(derived_prop).parent = Some(base_symbol);
    let derived_members = member_table(&f.symbols, &[derived_prop]);
    let derived_type = f.types.object(
        ObjectShape {
            members: derived_members,
            base_types: vec![base_type],
            ..Default::default()
        },
        Some(derived_symbol),
    );

    let other_prop =
        make_property(&mut f.symbols, &mut f.links, &f.interner, "state", number, false);
    f.symbols.get_mut(other_prop).flags |= SymbolFlags::PROTECTED;
    f.symbols.get_mut(other_prop).parent = Some(other_symbol);
    let other_members = member_table(&f.symbols, &[other_prop]);
    let other_type = f.types.object(
        ObjectShape { members: other_members, ..Default::default() },
        Some(other_symbol),
    );

    let mut checker = f.checker();
    assert!(checker.check_related(derived_type, base_type, Relation::Assignable));
    assert!(!checker.check_related(other_type, base_type, Relation::Assignable));
}

// ============================================================================
// Signatures
// ============================================================================

#[test]
fn test_return_type_covariance_and_void_absorption() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let string = f.types.string_type;
    let void_type = f.types.void_type;
    let returns_number = f.function(&[], number);
    let returns_string = f.function(&[], string);
    let returns_void = f.function(&[], void_type);
    let mut checker = f.checker();
    assert!(checker.check_related(returns_number, returns_void, Relation::Assignable));
    assert!(!checker.check_related(returns_number, returns_string, Relation::Assignable));
}

#[test]
fn test_parameter_bivariance_depends_on_strict_function_types() {
    // Animal/Dog: Dog has every Animal property plus one.
    let build = |f: &mut Fixture| {
        let string = f.types.string_type;
        let animal = f.object(&[("name", string, false)]);
        let dog = f.object(&[("name", string, false), ("breed", string, false)]);
        let void_type = f.types.void_type;
        let takes_animal = f.function(&[animal], void_type);
        let takes_dog = f.function(&[dog], void_type);
        (takes_animal, takes_dog)
    };

    let mut f = Fixture::new();
    let (takes_animal, takes_dog) = build(&mut f);
    let mut checker = f.checker();
    // Bivariant when strictFunctionTypes is off: both directions hold.
    assert!(checker.check_related(takes_animal, takes_dog, Relation::Assignable));
    assert!(checker.check_related(takes_dog, takes_animal, Relation::Assignable));

    let mut f = Fixture::strict();
    let (takes_animal, takes_dog) = build(&mut f);
    let mut checker = f.checker();
    // Contravariant under strictFunctionTypes.
    assert!(checker.check_related(takes_animal, takes_dog, Relation::Assignable));
    assert!(!checker.check_related(takes_dog, takes_animal, Relation::Assignable));
}

#[test]
fn test_arity_mismatch() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let void_type = f.types.void_type;
    let takes_two = f.function(&[number, number], void_type);
    let takes_one = f.function(&[number], void_type);
    let mut checker = f.checker();
    // A source demanding more arguments than the target supplies fails.
    assert!(!checker.check_related(takes_two, takes_one, Relation::Assignable));
    assert!(checker.check_related(takes_one, takes_two, Relation::Assignable));
}

// ============================================================================
// keyof / indexed access / mapped / conditional
// ============================================================================

#[test]
fn test_keyof_is_contravariant() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let small = f.object(&[("a", number, false)]);
    let big = f.object(&[("a", number, false), ("b", number, false)]);
    let keyof_small = f.types.index_type(small);
    let keyof_big = f.types.index_type(big);
    let mut checker = f.checker();
    assert!(checker.check_related(keyof_small, keyof_big, Relation::Assignable));
    assert!(!checker.check_related(keyof_big, keyof_small, Relation::Assignable));
}

#[test]
fn test_indexed_access_resolution() {
    let mut f = Fixture::new();
    let string = f.types.string_type;
    let number = f.types.number_type;
    let person = f.object(&[("name", string, false)]);
    let name_key = f.types.string_literal("name");
    let access = f.types.indexed_access(person, name_key);
    let mut checker = f.checker();
    assert!(checker.check_related(access, string, Relation::Assignable));
    assert!(!checker.check_related(access, number, Relation::Assignable));
}

#[test]
fn test_mapped_types_relate_by_constraint_and_template() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let string = f.types.string_type;
    let source_obj = f.object(&[("a", number, false)]);
    let constraint = f.types.index_type(source_obj);
    let tp = f.types.type_parameter(None, None);
    let m1 = f.types.mapped(tp, constraint, Some(string));
    let m2 = f.types.mapped(tp, constraint, Some(string));
    let m3 = f.types.mapped(tp, constraint, Some(number));
    let mut checker = f.checker();
    assert!(checker.check_related(m1, m2, Relation::Assignable));
    assert!(!checker.check_related(m1, m3, Relation::Assignable));
}

#[test]
fn test_conditional_types_relate_branchwise() {
    let mut f = Fixture::new();
    let string = f.types.string_type;
    let number = f.types.number_type;
    let check = f.types.type_parameter(None, None);
    let lit = f.types.string_literal("x");
    let c1 = f.types.conditional(check, string, lit, number);
    let c2 = f.types.conditional(check, string, string, number);
    let mut checker = f.checker();
    // True branch "x" is assignable to true branch string.
    assert!(checker.check_related(c1, c2, Relation::Assignable));
    assert!(!checker.check_related(c2, c1, Relation::Assignable));
}

#[test]
fn test_type_parameter_relates_through_constraint() {
    let mut f = Fixture::new();
    let string = f.types.string_type;
    let number = f.types.number_type;
    let constrained = f.types.type_parameter(None, Some(string));
    let unconstrained = f.types.type_parameter(None, None);
    let mut checker = f.checker();
    assert!(checker.check_related(constrained, string, Relation::Assignable));
    assert!(!checker.check_related(constrained, number, Relation::Assignable));
    assert!(!checker.check_related(unconstrained, string, Relation::Assignable));
}

// ============================================================================
// Caching
// ============================================================================

#[test]
fn test_cache_idempotence() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let string = f.types.string_type;
    let source = f.object(&[("a", number, false)]);
    let target = f.object(&[("a", number, false), ("b", string, false)]);
    let mut checker = f.checker();

    let first = checker.is_related(source, target, Relation::Assignable);
    let after_first = checker.structural_comparisons();
    let second = checker.is_related(source, target, Relation::Assignable);
    let after_second = checker.structural_comparisons();

    assert_eq!(first, second);
    assert_eq!(
        after_first, after_second,
        "second query must not re-enter the structural comparator"
    );
}

#[test]
fn test_cache_partitions_by_relation() {
    let mut f = Fixture::new();
    let number = f.types.number_type;
    let source = f.object(&[("a", number, true)]);
    let target = f.object(&[("a", number, false)]);
    let mut checker = f.checker();
    // Assignable succeeds while Subtype fails for the same pair; the
    // partitions must not bleed into each other.
    assert!(checker.check_related(source, target, Relation::Assignable));
    assert!(!checker.check_related(source, target, Relation::Subtype));
    assert!(checker.check_related(source, target, Relation::Assignable));
}

#[test]
fn test_recursive_types_relate_via_assumption() {
    let mut f = Fixture::new();
    // a = { next: a }, b = { next: b }. The property's type is filled in
    // after the object exists, closing the cycle through the links table.
    let make_cycle = |f: &mut Fixture| {
        let prop = f.symbols.alloc(
            f.interner.intern("next"),
            SymbolFlags::PROPERTY | SymbolFlags::TRANSIENT,
        );
        let members = member_table(&f.symbols, &[prop]);
        let object = f.types.object(
            ObjectShape {
                members,
                ..Default::default()
            },
            None,
        );
        f.links.set_type_of(prop, object);
        object
    };
    let a = make_cycle(&mut f);
    let b = make_cycle(&mut f);

    let mut checker = f.checker();
    // The in-progress assumption carries the comparison; committed at the
    // outer boundary it reads back as True, on this and every later query.
    assert_eq!(checker.is_related(a, b, Relation::Assignable), Ternary::True);
    assert_eq!(checker.is_related(a, b, Relation::Assignable), Ternary::True);
}

// ============================================================================
// Termination
// ============================================================================

#[test]
fn test_expanding_generic_terminates_within_cap() {
    let mut f = Fixture::new();
    // type Box<T> = { next: Box<Box<T>>, value: T }
    let box_symbol = f.symbols.alloc(f.interner.intern("Box"), SymbolFlags::INTERFACE);
    let t_param = f.types.type_parameter(None, None);

    let next_prop = f.symbols.alloc(
        f.interner.intern("next"),
        SymbolFlags::PROPERTY | SymbolFlags::TRANSIENT,
    );
    let value_prop = make_property(&mut f.symbols, &mut f.links, &f.interner, "value", t_param, false);
    let members = member_table(&f.symbols, &[next_prop, value_prop]);
    let box_target = f.types.object(
        ObjectShape {
            object_flags: ObjectFlags::INTERFACE,
            members,
            type_parameters: vec![t_param],
            ..Default::default()
        },
        Some(box_symbol),
    );
    let inner = f.types.reference(box_target, vec![t_param]);
    let nested = f.types.reference(box_target, vec![inner]);
    f.links.set_type_of(next_prop, nested);

    let box_string = {
        let string = f.types.string_type;
        f.types.reference(box_target, vec![string])
    };
    let box_number = {
        let number = f.types.number_type;
        f.types.reference(box_target, vec![number])
    };

    let mut checker = f.checker();
    let result = checker.is_related(box_string, box_number, Relation::Assignable);
    assert_eq!(result, Ternary::False);
    // The expansion heuristic, not the depth cap, must be what stops the
    // comparison.
    assert!(!checker.overflowed());
}

#[test]
fn test_depth_cap_sets_sticky_overflow() {
    let mut f = Fixture::new();
    // Two 120-deep chains of distinct anonymous objects that differ only
    // at the bottom. No shared symbols, so the expansion heuristic cannot
    // fire and the depth cap must.
    let build_chain = |f: &mut Fixture, leaf: TypeId| {
        let mut current = f.object(&[("p", leaf, false)]);
        for _ in 0..120 {
            current = f.object(&[("p", current, false)]);
        }
        current
    };
    let string = f.types.string_type;
    let number = f.types.number_type;
    let source = build_chain(&mut f, string);
    let target = build_chain(&mut f, number);

    let mut checker = f.checker();
    let result = checker.is_related(source, target, Relation::Assignable);
    assert_eq!(result, Ternary::False);
    assert!(checker.overflowed(), "the depth cap should have tripped");
}

// ============================================================================
// Variance inference
// ============================================================================

/// A generic `Box<T>` whose single member is built from `T` by the given
/// closure.
fn generic_with_member(
    f: &mut Fixture,
    member_name: &str,
    member_type: impl FnOnce(&mut Fixture, TypeId) -> TypeId,
) -> TypeId {
    let symbol = f.symbols.alloc(f.interner.intern("Box"), SymbolFlags::INTERFACE);
    let t_param = f.types.type_parameter(None, None);
    let member = member_type(f, t_param);
    let prop = make_property(&mut f.symbols, &mut f.links, &f.interner, member_name, member, false);
    let members = member_table(&f.symbols, &[prop]);
    f.types.object(
        ObjectShape {
            object_flags: ObjectFlags::INTERFACE,
            members,
            type_parameters: vec![t_param],
            ..Default::default()
        },
        Some(symbol),
    )
}

#[test]
fn test_getter_infers_covariant() {
    // Box<T> = { get(): T }
    let mut f = Fixture::strict();
    let target = generic_with_member(&mut f, "get", |f, t| f.function(&[], t));
    let mut checker = f.checker();
    assert_eq!(checker.variances(target), vec![Variance::Covariant]);
}

#[test]
fn test_setter_infers_contravariant() {
    // Box<T> = { set(v: T): void }
    let mut f = Fixture::strict();
    let target = generic_with_member(&mut f, "set", |f, t| {
        let void_type = f.types.void_type;
        f.function(&[t], void_type)
    });
    let mut checker = f.checker();
    assert_eq!(checker.variances(target), vec![Variance::Contravariant]);
}

#[test]
fn test_getter_and_setter_infer_invariant() {
    // Box<T> = { access(v: T): T }
    let mut f = Fixture::strict();
    let target = generic_with_member(&mut f, "access", |f, t| f.function(&[t], t));
    let mut checker = f.checker();
    assert_eq!(checker.variances(target), vec![Variance::Invariant]);
}

#[test]
fn test_unused_parameter_infers_independent() {
    // Box<T> = { tag: string } with T never witnessed.
    let mut f = Fixture::strict();
    let symbol = f.symbols.alloc(f.interner.intern("Box"), SymbolFlags::INTERFACE);
    let t_param = f.types.type_parameter(None, None);
    let string = f.types.string_type;
    let prop = make_property(&mut f.symbols, &mut f.links, &f.interner, "tag", string, false);
    let members = member_table(&f.symbols, &[prop]);
    let target = f.types.object(
        ObjectShape {
            object_flags: ObjectFlags::INTERFACE,
            members,
            type_parameters: vec![t_param],
            ..Default::default()
        },
        Some(symbol),
    );
    let mut checker = f.checker();
    assert_eq!(checker.variances(target), vec![Variance::Independent]);
}

#[test]
fn test_variances_are_memoized() {
    let mut f = Fixture::strict();
    let target = generic_with_member(&mut f, "get", |f, t| f.function(&[], t));
    let mut checker = f.checker();
    let first = checker.variances(target);
    let count = checker.structural_comparisons();
    let second = checker.variances(target);
    assert_eq!(first, second);
    assert_eq!(count, checker.structural_comparisons());
}

#[test]
fn test_covariant_reference_arguments() {
    // With Box<T> covariant, Box<"x"> relates to Box<string> and not back.
    let mut f = Fixture::strict();
    let target = generic_with_member(&mut f, "get", |f, t| f.function(&[], t));
    let lit = f.types.string_literal("x");
    let string = f.types.string_type;
    let box_lit = f.types.reference(target, vec![lit]);
    let box_string = f.types.reference(target, vec![string]);
    let mut checker = f.checker();
    assert!(checker.check_related(box_lit, box_string, Relation::Assignable));
    assert!(!checker.check_related(box_string, box_lit, Relation::Assignable));
}
