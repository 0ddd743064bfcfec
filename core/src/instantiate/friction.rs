//! Dof and tendon frictionloss constraints. These rows have no position
//! error of their own (`pos = 0`): frictionloss is a velocity-only
//! inequality, always present once `frictionloss > 0`, regardless of motion.

use crate::arena::ConstraintArena;
use crate::data::Warning;
use crate::model::Model;
use crate::rowbuilder::{add_constraint, RowSpec};
use crate::types::{ConstraintType, ResolvedJacobian};

pub fn instantiate(
    model: &Model,
    data: &crate::data::Data,
    arena: &mut ConstraintArena,
    resolved: ResolvedJacobian,
    warnings: &mut Vec<Warning>,
) -> bool {
    for dof in 0..model.nv {
        if model.dof_frictionloss[dof] <= 0.0 {
            continue;
        }
        let spec = RowSpec {
            efc_type: ConstraintType::FrictionDof,
            id: dof,
            solref: model.dof_solref_friction[dof],
            solimp: model.dof_solimp_friction[dof],
            margin: 0.0,
            frictionloss: model.dof_frictionloss[dof],
            diag_hint: model.dof_invweight0[dof],
            pos: 0.0,
        };
        if !add_constraint(arena, resolved, model.nv, &[dof], &[1.0], spec, warnings) {
            return false;
        }
    }

    for tendon in &model.tendons {
        if tendon.frictionloss <= 0.0 {
            continue;
        }
        let pattern = &data.tendon_jac[tendon.id];
        let chain: Vec<usize> = pattern.iter().map(|&(d, _)| d).collect();
        let vals: Vec<f64> = pattern.iter().map(|&(_, v)| v).collect();
        let spec = RowSpec {
            efc_type: ConstraintType::FrictionTendon,
            id: tendon.id,
            solref: tendon.solref_friction,
            solimp: tendon.solimp_friction,
            margin: 0.0,
            frictionloss: tendon.frictionloss,
            diag_hint: tendon.invweight0,
            pos: 0.0,
        };
        if !add_constraint(arena, resolved, model.nv, &chain, &vals, spec, warnings) {
            return false;
        }
    }
    true
}
