//! Joint and tendon limit constraints. Jacobians live directly in
//! joint/tendon-length space; limits never touch a Cartesian chain.

use crate::arena::ConstraintArena;
use crate::data::{Data, Warning};
use crate::model::Model;
use crate::precount::{joint_limit_active_sides, tendon_limit_active_sides};
use crate::rowbuilder::{add_constraint, RowSpec};
use crate::types::{ConstraintType, JointType, ResolvedJacobian};

pub fn instantiate(
    model: &Model,
    data: &Data,
    arena: &mut ConstraintArena,
    resolved: ResolvedJacobian,
    warnings: &mut Vec<Warning>,
) -> bool {
    for joint in &model.joints {
        let (lower_active, upper_active) = joint_limit_active_sides(joint, data);
        if !lower_active && !upper_active {
            continue;
        }

        match joint.jtype {
            JointType::Ball => {
                // Ball limits stay single-sided: only the upper (max angle) bound applies.
                let quat = data.jnt_quat[joint.id].unwrap_or_default();
                let angle = quat.angle();
                let axis = quat.axis().map(|a| a.into_inner()).unwrap_or(nalgebra::Vector3::z());
                let chain = vec![joint.dofadr, joint.dofadr + 1, joint.dofadr + 2];
                let vals = vec![-axis.x, -axis.y, -axis.z];
                let diag: f64 =
                    (joint.dofadr..joint.dofadr + joint.jtype.dof_count()).map(|d| model.dof_invweight0[d]).sum();
                let spec = RowSpec {
                    efc_type: ConstraintType::LimitJoint,
                    id: joint.id,
                    solref: joint.solref_limit,
                    solimp: joint.solimp_limit,
                    margin: joint.margin,
                    frictionloss: 0.0,
                    diag_hint: diag,
                    pos: joint.range.1 - angle,
                };
                if !add_constraint(arena, resolved, model.nv, &chain, &vals, spec, warnings) {
                    return false;
                }
            }
            _ => {
                let q = data.jnt_qpos[joint.id];
                let diag = model.dof_invweight0[joint.dofadr];
                // Lower before upper (§5 row ordering).
                if lower_active {
                    let slack = q - joint.range.0;
                    let spec = RowSpec {
                        efc_type: ConstraintType::LimitJoint,
                        id: joint.id,
                        solref: joint.solref_limit,
                        solimp: joint.solimp_limit,
                        margin: joint.margin,
                        frictionloss: 0.0,
                        diag_hint: diag,
                        pos: slack,
                    };
                    if !add_constraint(arena, resolved, model.nv, &[joint.dofadr], &[1.0], spec, warnings) {
                        return false;
                    }
                }
                if upper_active {
                    let slack = joint.range.1 - q;
                    let spec = RowSpec {
                        efc_type: ConstraintType::LimitJoint,
                        id: joint.id,
                        solref: joint.solref_limit,
                        solimp: joint.solimp_limit,
                        margin: joint.margin,
                        frictionloss: 0.0,
                        diag_hint: diag,
                        pos: slack,
                    };
                    if !add_constraint(arena, resolved, model.nv, &[joint.dofadr], &[-1.0], spec, warnings) {
                        return false;
                    }
                }
            }
        }
    }

    for tendon in &model.tendons {
        let (lower_active, upper_active) = tendon_limit_active_sides(tendon, data);
        if !lower_active && !upper_active {
            continue;
        }
        let l = data.tendon_length[tendon.id];
        let pattern = &data.tendon_jac[tendon.id];
        let chain: Vec<usize> = pattern.iter().map(|&(d, _)| d).collect();

        if lower_active {
            let slack = l - tendon.range.0;
            let vals: Vec<f64> = pattern.iter().map(|&(_, v)| v).collect();
            let spec = RowSpec {
                efc_type: ConstraintType::LimitTendon,
                id: tendon.id,
                solref: tendon.solref_limit,
                solimp: tendon.solimp_limit,
                margin: tendon.margin,
                frictionloss: 0.0,
                diag_hint: tendon.invweight0,
                pos: slack,
            };
            if !add_constraint(arena, resolved, model.nv, &chain, &vals, spec, warnings) {
                return false;
            }
        }
        if upper_active {
            let slack = tendon.range.1 - l;
            let vals: Vec<f64> = pattern.iter().map(|&(_, v)| -v).collect();
            let spec = RowSpec {
                efc_type: ConstraintType::LimitTendon,
                id: tendon.id,
                solref: tendon.solref_limit,
                solimp: tendon.solimp_limit,
                margin: tendon.margin,
                frictionloss: 0.0,
                diag_hint: tendon.invweight0,
                pos: slack,
            };
            if !add_constraint(arena, resolved, model.nv, &chain, &vals, spec, warnings) {
                return false;
            }
        }
    }
    true
}
