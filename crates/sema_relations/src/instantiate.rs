//! Generic instantiation: substituting type arguments for type parameters.
//!
//! Instantiation rebuilds structured types under a `TypeMapper`. Results
//! are memoized per (type, mapper) pair, and a type none of whose parts
//! change keeps its identity, so concrete types never spawn copies.

use crate::types::{ObjectShape, Signature, SignatureParameter, TypeKind, TypeTable};
use rustc_hash::FxHashMap;
use sema_ast::types::{ObjectFlags, SymbolFlags, TypeFlags, TypeId};
use sema_binder::{SymbolArena, SymbolLinks, SymbolTable};

/// A substitution from type parameters to type arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMapper {
    pairs: Vec<(TypeId, TypeId)>,
}

impl TypeMapper {
    pub fn new(parameters: &[TypeId], arguments: &[TypeId]) -> Self {
        debug_assert_eq!(parameters.len(), arguments.len());
        Self {
            pairs: parameters
                .iter()
                .copied()
                .zip(arguments.iter().copied())
                .collect(),
        }
    }

    /// A single-parameter substitution.
    pub fn single(parameter: TypeId, argument: TypeId) -> Self {
        Self {
            pairs: vec![(parameter, argument)],
        }
    }

    pub fn map(&self, t: TypeId) -> Option<TypeId> {
        self.pairs
            .iter()
            .find(|(param, _)| *param == t)
            .map(|(_, arg)| *arg)
    }

    /// A hashable key identifying this substitution.
    pub fn key(&self) -> Vec<(TypeId, TypeId)> {
        self.pairs.clone()
    }
}

/// Memo for instantiation results, owned by the session caches.
pub type InstantiationCache = FxHashMap<(TypeId, Vec<(TypeId, TypeId)>), TypeId>;

/// Borrows the arenas an instantiation writes into.
pub struct Instantiator<'a> {
    pub types: &'a mut TypeTable,
    pub symbols: &'a mut SymbolArena,
    pub links: &'a mut SymbolLinks,
    pub cache: &'a mut InstantiationCache,
}

impl<'a> Instantiator<'a> {
    /// Resolve a generic reference to its structural form: the target's
    /// shape with type arguments substituted for type parameters.
    pub fn resolve_reference(&mut self, reference: TypeId) -> TypeId {
        let (target, arguments) = match &self.types.get(reference).kind {
            TypeKind::Reference {
                target,
                type_arguments,
            } => (*target, type_arguments.clone()),
            _ => return reference,
        };
        let parameters = match &self.types.get(target).kind {
            TypeKind::Object(shape) => shape.type_parameters.clone(),
            _ => return target,
        };
        if parameters.len() != arguments.len() {
            return target;
        }
        let mapper = TypeMapper::new(&parameters, &arguments);
        let cache_key = (target, mapper.key());
        if let Some(&resolved) = self.cache.get(&cache_key) {
            return resolved;
        }
        let resolved = self.instantiate_object_target(target, &mapper);
        self.cache.insert(cache_key, resolved);
        resolved
    }

    /// Instantiate a type under a mapper.
    pub fn instantiate(&mut self, t: TypeId, mapper: &TypeMapper) -> TypeId {
        let flags = self.types.get(t).flags;
        // Only structured and instantiable types can mention a parameter.
        if !flags.intersects(TypeFlags::STRUCTURED_OR_INSTANTIABLE) {
            return t;
        }
        if flags.contains(TypeFlags::TYPE_PARAMETER) {
            return mapper.map(t).unwrap_or(t);
        }
        let cache_key = (t, mapper.key());
        if let Some(&cached) = self.cache.get(&cache_key) {
            return cached;
        }
        let result = self.instantiate_worker(t, mapper);
        self.cache.insert(cache_key, result);
        result
    }

    fn instantiate_worker(&mut self, t: TypeId, mapper: &TypeMapper) -> TypeId {
        match self.types.get(t).kind.clone() {
            TypeKind::Union { types } => {
                let mapped: Vec<TypeId> = types.iter().map(|&c| self.instantiate(c, mapper)).collect();
                if mapped == types {
                    t
                } else {
                    self.types.union(mapped)
                }
            }
            TypeKind::Intersection { types } => {
                let mapped: Vec<TypeId> = types.iter().map(|&c| self.instantiate(c, mapper)).collect();
                if mapped == types {
                    t
                } else {
                    self.types.intersection(mapped)
                }
            }
            TypeKind::Reference {
                target,
                type_arguments,
            } => {
                let mapped: Vec<TypeId> = type_arguments
                    .iter()
                    .map(|&a| self.instantiate(a, mapper))
                    .collect();
                if mapped == type_arguments {
                    t
                } else {
                    self.types.reference(target, mapped)
                }
            }
            TypeKind::Index { target } => {
                let mapped = self.instantiate(target, mapper);
                if mapped == target {
                    t
                } else {
                    self.types.index_type(mapped)
                }
            }
            TypeKind::IndexedAccess {
                object_type,
                index_type,
            } => {
                let object_mapped = self.instantiate(object_type, mapper);
                let index_mapped = self.instantiate(index_type, mapper);
                if object_mapped == object_type && index_mapped == index_type {
                    t
                } else {
                    self.types.indexed_access(object_mapped, index_mapped)
                }
            }
            TypeKind::Conditional {
                check_type,
                extends_type,
                true_type,
                false_type,
            } => {
                let check = self.instantiate(check_type, mapper);
                let extends = self.instantiate(extends_type, mapper);
                let true_t = self.instantiate(true_type, mapper);
                let false_t = self.instantiate(false_type, mapper);
                if (check, extends, true_t, false_t)
                    == (check_type, extends_type, true_type, false_type)
                {
                    t
                } else {
                    self.types.conditional(check, extends, true_t, false_t)
                }
            }
            TypeKind::Mapped {
                type_parameter,
                constraint_type,
                template_type,
            } => {
                let constraint = self.instantiate(constraint_type, mapper);
                let template = template_type.map(|tt| self.instantiate(tt, mapper));
                if constraint == constraint_type && template == template_type {
                    t
                } else {
                    self.types.mapped(type_parameter, constraint, template)
                }
            }
            TypeKind::Object(_) => self.instantiate_object(t, mapper, ObjectFlags::INSTANTIATED),
            _ => t,
        }
    }

    /// Instantiate a generic target's shape for `resolve_reference`.
    fn instantiate_object_target(&mut self, target: TypeId, mapper: &TypeMapper) -> TypeId {
        self.instantiate_object(
            target,
            mapper,
            ObjectFlags::INSTANTIATED | ObjectFlags::REFERENCE,
        )
    }

    fn instantiate_object(
        &mut self,
        t: TypeId,
        mapper: &TypeMapper,
        extra_flags: ObjectFlags,
    ) -> TypeId {
        let (shape, symbol) = match &self.types.get(t).kind {
            TypeKind::Object(shape) => (shape.clone(), self.types.get(t).symbol),
            _ => return t,
        };

        let mut changed = false;

        let mut members = SymbolTable::new();
        for (name, &prop) in shape.members.iter() {
            let prop_type = self.links.type_of(prop);
            let mapped_type = prop_type.map(|pt| self.instantiate(pt, mapper));
            if mapped_type == prop_type {
                members.set(*name, prop);
            } else {
                changed = true;
                let original = self.symbols.get(prop);
                let flags = original.flags | SymbolFlags::TRANSIENT;
                let parent = original.parent;
                let declarations = original.declarations.clone();
                let clone = self.symbols.alloc(*name, flags);
                self.symbols.get_mut(clone).parent = parent;
                self.symbols.get_mut(clone).declarations = declarations;
                if let Some(mapped) = mapped_type {
                    self.links.set_type_of(clone, mapped);
                }
                members.set(*name, clone);
            }
        }

        let call_signatures = self.instantiate_signatures(&shape.call_signatures, mapper, &mut changed);
        let construct_signatures =
            self.instantiate_signatures(&shape.construct_signatures, mapper, &mut changed);

        let string_index = shape.string_index.as_ref().map(|info| {
            let mapped = self.instantiate(info.value_type, mapper);
            if mapped != info.value_type {
                changed = true;
            }
            crate::types::IndexInfo {
                value_type: mapped,
                is_readonly: info.is_readonly,
            }
        });
        let number_index = shape.number_index.as_ref().map(|info| {
            let mapped = self.instantiate(info.value_type, mapper);
            if mapped != info.value_type {
                changed = true;
            }
            crate::types::IndexInfo {
                value_type: mapped,
                is_readonly: info.is_readonly,
            }
        });

        let base_types: Vec<TypeId> = shape
            .base_types
            .iter()
            .map(|&b| self.instantiate(b, mapper))
            .collect();
        if base_types != shape.base_types {
            changed = true;
        }

        // A generic target always resolves to a distinct structural type,
        // even when no member mentions a parameter.
        if !changed && shape.type_parameters.is_empty() {
            return t;
        }

        self.types.object(
            ObjectShape {
                object_flags: shape.object_flags | extra_flags,
                members,
                call_signatures,
                construct_signatures,
                string_index,
                number_index,
                type_parameters: Vec::new(),
                base_types,
            },
            symbol,
        )
    }

    fn instantiate_signatures(
        &mut self,
        signatures: &[Signature],
        mapper: &TypeMapper,
        changed: &mut bool,
    ) -> Vec<Signature> {
        signatures
            .iter()
            .map(|sig| {
                let parameters: Vec<SignatureParameter> = sig
                    .parameters
                    .iter()
                    .map(|p| {
                        let mapped = self.instantiate(p.type_id, mapper);
                        if mapped != p.type_id {
                            *changed = true;
                        }
                        SignatureParameter {
                            name: p.name.clone(),
                            type_id: mapped,
                            optional: p.optional,
                        }
                    })
                    .collect();
                let return_type = self.instantiate(sig.return_type, mapper);
                if return_type != sig.return_type {
                    *changed = true;
                }
                Signature {
                    type_parameters: sig.type_parameters.clone(),
                    parameters,
                    return_type,
                    min_argument_count: sig.min_argument_count,
                    has_rest_parameter: sig.has_rest_parameter,
                }
            })
            .collect()
    }
}
