//! Frictionless, pyramidal, and elliptic-cone contact constraints.
//!
//! Row 0 is always along the contact normal. The remaining `dim - 1`
//! directions are tangential (x2), torsional (x1, `dim >= 4`), and rolling
//! (x2, `dim == 6`), drawn from `Contact::friction` in that order. Elliptic
//! cones emit one row per direction (`dim` rows total, jointly coupled by
//! [`crate::params::contact_row_r`] downstream); pyramidal cones emit two
//! non-negative edge rows per direction (`2*(dim-1)` rows, normal absorbed
//! into each edge).

use nalgebra::Vector3;

use crate::arena::ConstraintArena;
use crate::data::{Data, Warning};
use crate::dofchain::{merge_dof_chain, single_chain};
use crate::model::Model;
use crate::rowbuilder::{add_constraint, RowSpec};
use crate::types::{ConeType, ConstraintType};

pub fn instantiate(
    model: &Model,
    data: &mut Data,
    arena: &mut ConstraintArena,
    resolved: crate::types::ResolvedJacobian,
    warnings: &mut Vec<Warning>,
) -> bool {
    for idx in 0..data.contacts.len() {
        let c = data.contacts[idx].clone();
        if c.dist - c.margin >= c.includemargin {
            continue;
        }
        if !one_contact(model, data, idx, arena, resolved, warnings) {
            return false;
        }
    }
    true
}

fn one_contact(
    model: &Model,
    data: &mut Data,
    idx: usize,
    arena: &mut ConstraintArena,
    resolved: crate::types::ResolvedJacobian,
    warnings: &mut Vec<Warning>,
) -> bool {
    let c = data.contacts[idx].clone();
    let merged = merge_dof_chain(model, c.body1, c.body2);
    if merged.is_empty() {
        data.contacts[idx].exclude = 3;
        data.contacts[idx].efc_address = -1;
        return true;
    }
    let chain_a = single_chain(model, c.body1);
    let chain_b = single_chain(model, c.body2);

    let jac_pa = crate::spatial::point_jacobian(&data.cdof, &chain_a, &c.pos);
    let jac_pb = crate::spatial::point_jacobian(&data.cdof, &chain_b, &c.pos);
    let paired_point = crate::spatial::paired_difference(&jac_pa, &chain_a, &jac_pb, &chain_b, &merged);

    let jac_ra = crate::spatial::angular_jacobian(&data.cdof, &chain_a);
    let jac_rb = crate::spatial::angular_jacobian(&data.cdof, &chain_b);
    let paired_ang = crate::spatial::paired_difference(&jac_ra, &chain_a, &jac_rb, &chain_b, &merged);

    let project_point = |axis: &Vector3<f64>| -> Vec<f64> {
        (0..merged.len())
            .map(|j| axis.x * paired_point[(0, j)] + axis.y * paired_point[(1, j)] + axis.z * paired_point[(2, j)])
            .collect()
    };
    let project_angular = |axis: &Vector3<f64>| -> Vec<f64> {
        (0..merged.len())
            .map(|j| axis.x * paired_ang[(0, j)] + axis.y * paired_ang[(1, j)] + axis.z * paired_ang[(2, j)])
            .collect()
    };

    let [normal, t1, t2] = c.frame;
    let normal_row = project_point(&normal);
    let diag_trans = model.body_invweight0[c.body1].0 + model.body_invweight0[c.body2].0;
    let diag_normal = crate::params::diag_approx(diag_trans, 1.0);
    let diag_friction = crate::params::diag_approx(diag_trans, model.opt.impratio);

    let efc_address = arena.len_rows() as i32;
    let ok = if c.dim <= 1 {
        let spec = RowSpec {
            efc_type: ConstraintType::ContactFrictionless,
            id: c.id,
            solref: c.solref,
            solimp: c.solimp,
            margin: c.margin,
            frictionloss: 0.0,
            diag_hint: diag_normal,
            pos: c.dist,
        };
        add_constraint(arena, resolved, model.nv, &merged, &normal_row, spec, warnings)
    } else {
        // direction rows in friction[] order: tangential x2, torsional, rolling x2
        let mut dirs: Vec<Vec<f64>> = vec![project_point(&t1), project_point(&t2)];
        if c.dim >= 4 {
            dirs.push(project_angular(&normal));
        }
        if c.dim >= 6 {
            dirs.push(project_angular(&t1));
            dirs.push(project_angular(&t2));
        }

        let efc_type = match model.opt.cone {
            ConeType::Elliptic => ConstraintType::ContactElliptic,
            ConeType::Pyramidal => ConstraintType::ContactPyramidal,
        };

        (|| -> bool {
            match model.opt.cone {
                ConeType::Elliptic => {
                    let spec = RowSpec {
                        efc_type,
                        id: c.id,
                        solref: c.solref,
                        solimp: c.solimp,
                        margin: c.margin,
                        frictionloss: 0.0,
                        diag_hint: diag_normal,
                        pos: c.dist,
                    };
                    if !add_constraint(arena, resolved, model.nv, &merged, &normal_row, spec, warnings) {
                        return false;
                    }
                    for (dir_idx, dir_row) in dirs.iter().enumerate() {
                        let mu = c.friction[dir_idx].max(crate::constants::MJ_MINVAL);
                        let spec = RowSpec {
                            efc_type,
                            id: c.id,
                            solref: c.solref,
                            solimp: c.solimp,
                            margin: c.margin,
                            frictionloss: 0.0,
                            diag_hint: diag_friction / (mu * mu),
                            pos: c.dist,
                        };
                        if !add_constraint(arena, resolved, model.nv, &merged, dir_row, spec, warnings) {
                            return false;
                        }
                    }
                }
                ConeType::Pyramidal => {
                    for (dir_idx, dir_row) in dirs.iter().enumerate() {
                        let mu = c.friction[dir_idx].max(crate::constants::MJ_MINVAL);
                        for sign in [1.0, -1.0] {
                            let edge: Vec<f64> =
                                normal_row.iter().zip(dir_row.iter()).map(|(&n, &d)| n + sign * d / mu).collect();
                            let spec = RowSpec {
                                efc_type,
                                id: c.id,
                                solref: c.solref,
                                solimp: c.solimp,
                                margin: c.margin,
                                frictionloss: 0.0,
                                diag_hint: diag_friction / (mu * mu),
                                pos: c.dist,
                            };
                            if !add_constraint(arena, resolved, model.nv, &merged, &edge, spec, warnings) {
                                return false;
                            }
                        }
                    }
                }
            }
            true
        })()
    };

    if ok {
        data.contacts[idx].exclude = 0;
        data.contacts[idx].efc_address = efc_address;
        data.contacts[idx].mu = c.friction[0].max(crate::constants::MJ_MINVAL);
    }
    ok
}
