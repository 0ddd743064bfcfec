//! Top-level orchestration: precount, build, and reference a full
//! constraint set for one step. This is the crate's single public entry
//! point; everything else is a collaborator it calls in sequence.

use crate::arena::ConstraintArena;
use crate::data::Data;
use crate::error::{EngineError, Result};
use crate::instantiate::{contact, equality, friction, limit};
use crate::model::Model;
use crate::precount::precount;
use crate::projected_inertia::projected_inertia;
use crate::types::DisableBits;
use crate::update::reference_constraint;

/// Builds every active constraint row for the current `data` against
/// `model`, then runs `referenceConstraint` so the result is ready for a
/// solver to consume. Returns the realized row counts `(ne, nf, nl, nc)`.
///
/// # Errors
/// Returns [`EngineError`] only for the invariant violations in §7 kind 3:
/// a mismatch between the pre-counted and realized row/non-zero counts, or
/// a resolved-sparse build with a null dof chain. Capacity exhaustion and
/// bad solver parameters are non-fatal; they accumulate in `data.warnings`.
pub fn make_constraint(model: &Model, data: &mut Data) -> Result<(usize, usize, usize, usize)> {
    let pre = precount(model, data);

    if model.opt.disable.contains(DisableBits::CONSTRAINT) {
        data.constraints = Some(ConstraintArena::new_dense(model.nv, 0));
        return Ok((0, 0, 0, 0));
    }

    let resolved = model.opt.jacobian.resolve(model.nv);

    let mut arena = match resolved {
        crate::types::ResolvedJacobian::Dense => ConstraintArena::new_dense(model.nv, pre.total_rows()),
        crate::types::ResolvedJacobian::Sparse => ConstraintArena::new_sparse(model.nv, pre.total_rows(), pre.nnz),
    };

    let disable = model.opt.disable;
    let mut warnings = Vec::new();

    if !disable.contains(DisableBits::EQUALITY) {
        equality::instantiate(model, data, &mut arena, resolved, &mut warnings);
    }
    if !disable.contains(DisableBits::FRICTIONLOSS) {
        friction::instantiate(model, data, &mut arena, resolved, &mut warnings);
    }
    if !disable.contains(DisableBits::LIMIT) {
        limit::instantiate(model, data, &mut arena, resolved, &mut warnings);
    }
    if !disable.contains(DisableBits::CONTACT) {
        contact::instantiate(model, data, &mut arena, resolved, &mut warnings);
    }

    let real = count_by_type(&arena);
    if real != (pre.ne, pre.nf, pre.nl, pre.nc) {
        return Err(EngineError::PrecountMismatch {
            pre_ne: pre.ne,
            pre_nf: pre.nf,
            pre_nl: pre.nl,
            pre_nc: pre.nc,
            real_ne: real.0,
            real_nf: real.1,
            real_nl: real.2,
            real_nc: real.3,
        });
    }

    if let crate::arena::JacobianStorage::Sparse(s) = &arena.jac {
        let realized_nnz = s.colind.len();
        if realized_nnz != pre.nnz {
            return Err(EngineError::NnzMismatch { precounted: pre.nnz, realized: realized_nnz });
        }
        if model.nv > 0 && s.rownnz.iter().any(|&n| n == 0) {
            return Err(EngineError::NullChainInSparseMode { nv: model.nv });
        }
    }

    reference_constraint(model, data, &mut arena, &mut warnings);

    data.projected_inertia = if model.opt.solver.is_dual() {
        let r: Vec<f64> = arena.meta.iter().map(|m| m.r).collect();
        Some(projected_inertia(&model.mass, &arena.jac, &r))
    } else {
        None
    };

    data.warnings.extend(warnings);
    data.constraints = Some(arena);
    Ok(real)
}

fn count_by_type(arena: &ConstraintArena) -> (usize, usize, usize, usize) {
    let mut ne = 0;
    let mut nf = 0;
    let mut nl = 0;
    let mut nc = 0;
    for m in &arena.meta {
        if m.efc_type.is_equality() {
            ne += 1;
        } else if m.efc_type.is_friction() {
            nf += 1;
        } else if m.efc_type.is_contact() {
            nc += 1;
        } else {
            nl += 1;
        }
    }
    (ne, nf, nl, nc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MassCholesky, Options};

    #[test]
    fn no_constraints_yields_empty_arena() {
        let model = Model::new(
            1,
            1,
            vec![0],
            vec![1],
            vec![-1],
            vec![(1.0, 1.0)],
            vec![1.0],
            MassCholesky::identity(1),
            Options::default(),
        );
        let mut data = Data::new(1);
        let counts = make_constraint(&model, &mut data).unwrap();
        assert_eq!(counts, (0, 0, 0, 0));
        assert_eq!(data.summary().total, 0);
    }

    #[test]
    fn disabled_constraint_bit_short_circuits() {
        let mut opt = Options::default();
        opt.disable = DisableBits::CONSTRAINT;
        let model = Model::new(
            1,
            1,
            vec![0],
            vec![1],
            vec![-1],
            vec![(1.0, 1.0)],
            vec![1.0],
            MassCholesky::identity(1),
            opt,
        );
        let mut data = Data::new(1);
        data.jnt_qpos.push(0.0);
        let counts = make_constraint(&model, &mut data).unwrap();
        assert_eq!(counts, (0, 0, 0, 0));
    }
}
