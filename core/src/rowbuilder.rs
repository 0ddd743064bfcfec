//! §C3 — the row builder: a single entry point every §C4 instantiator calls
//! to append one constraint row, written either as a dense `nv`-wide vector
//! or as `(chain, values)` pairs depending on the resolved Jacobian mode.
//! Leaves the solver-facing fields (`vel`, `aref`, `force`, `state`, `K`,
//! `B`, `I`, `P`, `R`, `D`) at their defaults; [`crate::update`] fills those
//! in during `referenceConstraint`/`constraintUpdate`.

use crate::arena::{ConstraintArena, RowMeta, RowWrite};
use crate::data::Warning;
use crate::types::{ConstraintType, ResolvedJacobian};

pub struct RowSpec {
    pub efc_type: ConstraintType,
    pub id: usize,
    pub solref: [f64; crate::constants::MJ_NREF],
    pub solimp: [f64; crate::constants::MJ_NIMP],
    pub margin: f64,
    pub frictionloss: f64,
    pub diag_hint: f64,
    /// Signed constraint position error/violation, a purely geometric
    /// quantity already known at instantiation time.
    pub pos: f64,
}

impl RowSpec {
    fn into_meta(self) -> RowMeta {
        RowMeta {
            efc_type: self.efc_type,
            id: self.id,
            solref: self.solref,
            solimp: self.solimp,
            margin: self.margin,
            frictionloss: self.frictionloss,
            diag_hint: self.diag_hint,
            kbip: [0.0; 4],
            r: 0.0,
            d: 0.0,
            pos: self.pos,
            vel: 0.0,
            aref: 0.0,
            force: 0.0,
            state: crate::types::RowState::Quadratic,
        }
    }
}

/// Appends one row over `chain` (ascending dof indices) with `local_vals`
/// (same length as `chain`). Returns `false` without mutating `arena` if
/// capacity was exhausted, recording a [`Warning`] in that case.
pub fn add_constraint(
    arena: &mut ConstraintArena,
    resolved: ResolvedJacobian,
    nv: usize,
    chain: &[usize],
    local_vals: &[f64],
    spec: RowSpec,
    warnings: &mut Vec<Warning>,
) -> bool {
    debug_assert_eq!(chain.len(), local_vals.len());

    // §4.3's empty-guard: a non-contact constraint whose Jacobian block is
    // identically zero contributes no rows. Contact types always retain
    // theirs (a grazing contact's zero row still needs its slot in the arena).
    if !spec.efc_type.is_contact() && local_vals.iter().all(|&v| v == 0.0) {
        return true;
    }

    let capacity_rows = arena.capacity_rows();
    let ok = match resolved {
        ResolvedJacobian::Dense => {
            let mut row = vec![0.0; nv];
            for (&dof, &val) in chain.iter().zip(local_vals.iter()) {
                row[dof] = val;
            }
            arena.try_push_row(spec.into_meta(), RowWrite::Dense(&row))
        }
        ResolvedJacobian::Sparse => {
            arena.try_push_row(spec.into_meta(), RowWrite::Sparse { cols: chain, vals: local_vals })
        }
    };
    if !ok {
        warnings.push(Warning::RowCapacityExceeded { needed: arena.len_rows() + 1, capacity: capacity_rows });
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> RowSpec {
        RowSpec {
            efc_type: ConstraintType::Equality,
            id: 0,
            solref: crate::constants::DEFAULT_SOLREF,
            solimp: crate::constants::DEFAULT_SOLIMP,
            margin: 0.0,
            frictionloss: 0.0,
            diag_hint: 1.0,
            pos: 0.5,
        }
    }

    #[test]
    fn dense_row_scatters_chain_into_full_width() {
        let mut arena = ConstraintArena::new_dense(4, 2);
        let mut warnings = Vec::new();
        assert!(add_constraint(&mut arena, ResolvedJacobian::Dense, 4, &[1, 3], &[2.0, 5.0], spec(), &mut warnings));
        if let crate::arena::JacobianStorage::Dense(d) = &arena.jac {
            assert_eq!(d.rows[0], vec![0.0, 2.0, 0.0, 5.0]);
        } else {
            panic!()
        }
    }

    #[test]
    fn capacity_exhaustion_is_reported_as_warning() {
        let mut arena = ConstraintArena::new_dense(4, 0);
        let mut warnings = Vec::new();
        assert!(!add_constraint(&mut arena, ResolvedJacobian::Dense, 4, &[0], &[1.0], spec(), &mut warnings));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn zero_jacobian_equality_row_is_dropped_without_error() {
        let mut arena = ConstraintArena::new_dense(4, 2);
        let mut warnings = Vec::new();
        assert!(add_constraint(&mut arena, ResolvedJacobian::Dense, 4, &[1, 3], &[0.0, 0.0], spec(), &mut warnings));
        assert_eq!(arena.len_rows(), 0);
        assert!(warnings.is_empty());
    }

    #[test]
    fn zero_jacobian_contact_row_is_retained() {
        let mut arena = ConstraintArena::new_dense(4, 2);
        let mut warnings = Vec::new();
        let mut contact_spec = spec();
        contact_spec.efc_type = ConstraintType::ContactFrictionless;
        assert!(add_constraint(&mut arena, ResolvedJacobian::Dense, 4, &[1, 3], &[0.0, 0.0], contact_spec, &mut warnings));
        assert_eq!(arena.len_rows(), 1);
    }
}
