//! Variance inference for generic type parameters.
//!
//! Variance is measured, not declared: for each parameter the target is
//! instantiated with a marker subtype and a marker supertype, and
//! assignability is probed in both directions. A parameter that measures
//! bivariant is re-probed with an unrelated marker to distinguish genuine
//! bivariance from a parameter the type never witnesses. Results are
//! memoized per generic target.

use crate::relate::{MarkerTypes, Relation, RelationChecker, Ternary};
use crate::types::TypeKind;
use sema_ast::types::{TypeId, Variance};
use tracing::trace;

const MEASURED_COVARIANT: u8 = 1;
const MEASURED_CONTRAVARIANT: u8 = 2;

impl<'a> RelationChecker<'a> {
    /// The measured variances of a generic target's type parameters.
    /// Returns an empty vector for non-generic types and while a
    /// measurement of the same target is already in progress (callers fall
    /// back to structural comparison in that case).
    pub fn variances(&mut self, target: TypeId) -> Vec<Variance> {
        if let Some(cached) = self.caches.variances.get(&target) {
            return cached.clone();
        }
        let parameters = match &self.types.get(target).kind {
            TypeKind::Object(shape) => shape.type_parameters.clone(),
            _ => return Vec::new(),
        };
        if parameters.is_empty() {
            return Vec::new();
        }

        // In-progress sentinel: a recursive request for this target's
        // variances sees an empty vector and compares structurally.
        self.caches.variances.insert(target, Vec::new());

        let markers = self.marker_types();
        let mut variances = Vec::with_capacity(parameters.len());
        for i in 0..parameters.len() {
            let type_with_super = self.marker_reference(target, &parameters, i, markers.super_);
            let type_with_sub = self.marker_reference(target, &parameters, i, markers.sub);

            let mut measured = 0u8;
            if self.probe_assignable(type_with_sub, type_with_super) {
                measured |= MEASURED_COVARIANT;
            }
            if self.probe_assignable(type_with_super, type_with_sub) {
                measured |= MEASURED_CONTRAVARIANT;
            }
            let mut variance = match measured {
                MEASURED_COVARIANT => Variance::Covariant,
                MEASURED_CONTRAVARIANT => Variance::Contravariant,
                0 => Variance::Invariant,
                _ => Variance::Bivariant,
            };
            if variance == Variance::Bivariant {
                // Related in both directions can also mean the parameter is
                // never witnessed; an unrelated marker decides.
                let type_with_other = self.marker_reference(target, &parameters, i, markers.other);
                if self.probe_assignable(type_with_other, type_with_super) {
                    variance = Variance::Independent;
                }
            }
            trace!(generic = target.0, parameter = i, ?variance, "measured variance");
            variances.push(variance);
        }

        self.caches.variances.insert(target, variances.clone());
        variances
    }

    /// An instantiation of the target with one parameter replaced by a
    /// marker and all others left as themselves.
    fn marker_reference(
        &mut self,
        target: TypeId,
        parameters: &[TypeId],
        index: usize,
        marker: TypeId,
    ) -> TypeId {
        let arguments: Vec<TypeId> = parameters
            .iter()
            .enumerate()
            .map(|(j, &p)| if j == index { marker } else { p })
            .collect();
        self.types.reference(target, arguments)
    }

    /// Probe assignability in a fresh comparison context, so measurements
    /// neither inherit nor corrupt the in-flight state of the query that
    /// triggered them.
    fn probe_assignable(&mut self, source: TypeId, target: TypeId) -> bool {
        let saved = self.save_comparison_state();
        let related = self.is_related(source, target, Relation::Assignable);
        self.restore_comparison_state(saved);
        related != Ternary::False
    }

    /// The three marker type parameters, created once per session. The
    /// sub marker's constraint is the super marker, so sub relates to
    /// super and nothing else relates at all.
    fn marker_types(&mut self) -> MarkerTypes {
        if let Some(markers) = self.caches.markers {
            return markers;
        }
        let super_ = self.types.type_parameter(None, None);
        let sub = self.types.type_parameter(None, Some(super_));
        let other = self.types.type_parameter(None, None);
        let markers = MarkerTypes { sub, super_, other };
        self.caches.markers = Some(markers);
        markers
    }
}

