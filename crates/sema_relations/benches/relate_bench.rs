//! Relation engine benchmarks.
//!
//! Measures relation queries over synthetic object, union, and generic
//! types, with and without warm caches.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sema_ast::types::{ObjectFlags, SymbolFlags, TypeId};
use sema_binder::{SymbolArena, SymbolLinks};
use sema_core::intern::StringInterner;
use sema_options::AnalyzerOptions;
use sema_relations::{
    make_property, member_table, ObjectShape, Relation, RelationCaches, RelationChecker,
    TypeTable,
};

struct Session {
    interner: StringInterner,
    types: TypeTable,
    symbols: SymbolArena,
    links: SymbolLinks,
    options: AnalyzerOptions,
    caches: RelationCaches,
}

impl Session {
    fn new() -> Self {
        Self {
            interner: StringInterner::new(),
            types: TypeTable::new(),
            symbols: SymbolArena::new(),
            links: SymbolLinks::new(),
            options: AnalyzerOptions::default(),
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

    /// An object with `width` number-typed properties.
    fn wide_object(&mut self, width: usize) -> TypeId {
        let number = self.types.number_type;
        let props: Vec<_> = (0..width)
            .map(|i| {
                make_property(
                    &mut self.symbols,
                    &mut self.links,
                    &self.interner,
                    &format!("p{}", i),
                    number,
                    false,
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
}

fn bench_wide_object_assignability(c: &mut Criterion) {
    c.bench_function("assignable_wide_object_cold", |b| {
        b.iter_with_setup(
            || {
                let mut session = Session::new();
                let source = session.wide_object(64);
                let target = session.wide_object(48);
                (session, source, target)
            },
            |(mut session, source, target)| {
                let mut checker = session.checker();
                black_box(checker.check_related(source, target, Relation::Assignable))
            },
        );
    });

    c.bench_function("assignable_wide_object_warm", |b| {
        let mut session = Session::new();
        let source = session.wide_object(64);
        let target = session.wide_object(48);
        let mut checker = session.checker();
        checker.check_related(source, target, Relation::Assignable);
        b.iter(|| black_box(checker.check_related(source, target, Relation::Assignable)));
    });
}

fn bench_union_decomposition(c: &mut Criterion) {
    c.bench_function("assignable_literal_union", |b| {
        let mut session = Session::new();
        let literals: Vec<TypeId> = (0..128)
            .map(|i| session.types.string_literal(&format!("lit{}", i)))
            .collect();
        let union = session.types.union(literals);
        let string = session.types.string_type;
        let mut checker = session.checker();
        b.iter(|| black_box(checker.check_related(union, string, Relation::Assignable)));
    });
}

fn bench_generic_variance(c: &mut Criterion) {
    c.bench_function("variance_probe_and_reference_compare", |b| {
        b.iter_with_setup(
            || {
                let mut session = Session::new();
                let symbol = session
                    .symbols
                    .alloc(session.interner.intern("Box"), SymbolFlags::INTERFACE);
                let t_param = session.types.type_parameter(None, None);
                let prop = make_property(
                    &mut session.symbols,
                    &mut session.links,
                    &session.interner,
                    "value",
                    t_param,
                    false,
                );
                let members = member_table(&session.symbols, &[prop]);
                let target = session.types.object(
                    ObjectShape {
                        object_flags: ObjectFlags::INTERFACE,
                        members,
                        type_parameters: vec![t_param],
                        ..Default::default()
                    },
                    Some(symbol),
                );
                let lit = session.types.string_literal("x");
                let string = session.types.string_type;
                let box_lit = session.types.reference(target, vec![lit]);
                let box_string = session.types.reference(target, vec![string]);
                (session, box_lit, box_string)
            },
            |(mut session, box_lit, box_string)| {
                let mut checker = session.checker();
                black_box(checker.check_related(box_lit, box_string, Relation::Assignable))
            },
        );
    });
}

criterion_group!(
    benches,
    bench_wide_object_assignability,
    bench_union_decomposition,
    bench_generic_variance
);
criterion_main!(benches);
