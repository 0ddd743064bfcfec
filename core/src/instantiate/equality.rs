//! Connect, Weld, and the Joint/Tendon cubic-coupling equality constraints.

use crate::arena::ConstraintArena;
use crate::data::{Data, Warning};
use crate::dofchain::merge_dof_chain;
use crate::model::{EqualityDef, Model, ObjRef};
use crate::rowbuilder::{add_constraint, RowSpec};
use crate::types::{ConstraintType, EqualityKind, ResolvedJacobian};

pub fn instantiate(
    model: &Model,
    data: &Data,
    arena: &mut ConstraintArena,
    resolved: ResolvedJacobian,
    warnings: &mut Vec<Warning>,
) -> bool {
    for eq in &model.equalities {
        let ok = match eq.kind {
            EqualityKind::Connect => connect(model, data, eq, arena, resolved, warnings),
            EqualityKind::Weld => weld(model, data, eq, arena, resolved, warnings),
            EqualityKind::Joint => joint_coupling(model, data, eq, arena, resolved, warnings),
            EqualityKind::Tendon => tendon_coupling(model, data, eq, arena, resolved, warnings),
        };
        if !ok {
            return false;
        }
    }
    true
}

fn body_of(obj: ObjRef, model: &Model) -> usize {
    match obj {
        ObjRef::Body(b) => b,
        ObjRef::Joint(j) => model.joints[j].body,
        ObjRef::Tendon(_) => 0,
    }
}

fn connect(
    model: &Model,
    data: &Data,
    eq: &EqualityDef,
    arena: &mut ConstraintArena,
    resolved: ResolvedJacobian,
    warnings: &mut Vec<Warning>,
) -> bool {
    let body_a = body_of(eq.obj1, model);
    let body_b = body_of(eq.obj2.unwrap_or(eq.obj1), model);
    let merged = merge_dof_chain(model, body_a, body_b);
    let chain_a = crate::dofchain::single_chain(model, body_a);
    let chain_b = crate::dofchain::single_chain(model, body_b);

    let anchor_a_local = eq.connect_anchor0();
    let anchor_b_local = eq.connect_anchor1();
    let world_a = data.body_xpos[body_a] + data.body_xquat[body_a] * anchor_a_local;
    let world_b = data.body_xpos[body_b] + data.body_xquat[body_b] * anchor_b_local;

    let jac_a = crate::spatial::point_jacobian(&data.cdof, &chain_a, &world_a);
    let jac_b = crate::spatial::point_jacobian(&data.cdof, &chain_b, &world_b);
    let paired = crate::spatial::paired_difference(&jac_a, &chain_a, &jac_b, &chain_b, &merged);
    let violation = world_a - world_b;
    let diag_trans = model.body_invweight0[body_a].0 + model.body_invweight0[body_b].0;

    for row in 0..3 {
        let vals: Vec<f64> = (0..merged.len()).map(|c| paired[(row, c)]).collect();
        let spec = RowSpec {
            efc_type: ConstraintType::Equality,
            id: eq.id,
            solref: eq.solref,
            solimp: eq.solimp,
            margin: 0.0,
            frictionloss: 0.0,
            diag_hint: diag_trans,
            pos: violation[row],
        };
        if !add_constraint(arena, resolved, model.nv, &merged, &vals, spec, warnings) {
            return false;
        }
    }
    true
}

fn weld(
    model: &Model,
    data: &Data,
    eq: &EqualityDef,
    arena: &mut ConstraintArena,
    resolved: ResolvedJacobian,
    warnings: &mut Vec<Warning>,
) -> bool {
    let body_a = body_of(eq.obj1, model);
    let body_b = body_of(eq.obj2.unwrap_or(eq.obj1), model);
    let merged = merge_dof_chain(model, body_a, body_b);
    let chain_a = crate::dofchain::single_chain(model, body_a);
    let chain_b = crate::dofchain::single_chain(model, body_b);

    let anchor_a_local = eq.connect_anchor0();
    let anchor_b_local = eq.connect_anchor1();
    let world_a = data.body_xpos[body_a] + data.body_xquat[body_a] * anchor_a_local;
    let world_b = data.body_xpos[body_b] + data.body_xquat[body_b] * anchor_b_local;

    let jac_pa = crate::spatial::point_jacobian(&data.cdof, &chain_a, &world_a);
    let jac_pb = crate::spatial::point_jacobian(&data.cdof, &chain_b, &world_b);
    let paired_pos = crate::spatial::paired_difference(&jac_pa, &chain_a, &jac_pb, &chain_b, &merged);
    let violation_pos = world_a - world_b;

    let relpose = eq.weld_relpose();
    let torquescale = eq.weld_torquescale();
    let q0 = *data.body_xquat[body_a].quaternion();
    let q1_inv = *data.body_xquat[body_b].inverse().quaternion();
    let relpose_q = *relpose.quaternion();
    let q_err = q1_inv * q0 * relpose_q;
    let violation_rot = torquescale * 2.0 * q_err.imag();

    // Each rotational column is the sandwich q1^-1 * c_spatial * q0 * relpose
    // (§4.4's per-column Jacobian for Weld): +0.5 for a dof driving body_a's
    // orientation, -0.5 for one driving body_b's. A dof in both chains (only
    // possible when body_a == body_b) cancels to zero.
    let mut rot_cols: Vec<nalgebra::Vector3<f64>> = vec![nalgebra::Vector3::zeros(); merged.len()];
    for (col, &dof) in merged.iter().enumerate() {
        let c_spatial = nalgebra::Quaternion::from_parts(0.0, data.cdof[dof].angular);
        let sandwich = q1_inv * c_spatial * q0 * relpose_q;
        let mut v = nalgebra::Vector3::zeros();
        if chain_a.contains(&dof) {
            v += 0.5 * sandwich.imag();
        }
        if chain_b.contains(&dof) {
            v -= 0.5 * sandwich.imag();
        }
        rot_cols[col] = v;
    }

    let diag_trans = model.body_invweight0[body_a].0 + model.body_invweight0[body_b].0;
    let diag_rot = model.body_invweight0[body_a].1 + model.body_invweight0[body_b].1;

    for row in 0..3 {
        let vals: Vec<f64> = (0..merged.len()).map(|c| paired_pos[(row, c)]).collect();
        let spec = RowSpec {
            efc_type: ConstraintType::Equality,
            id: eq.id,
            solref: eq.solref,
            solimp: eq.solimp,
            margin: 0.0,
            frictionloss: 0.0,
            diag_hint: diag_trans,
            pos: violation_pos[row],
        };
        if !add_constraint(arena, resolved, model.nv, &merged, &vals, spec, warnings) {
            return false;
        }
    }
    for row in 0..3 {
        let vals: Vec<f64> = rot_cols.iter().map(|v| torquescale * v[row]).collect();
        let spec = RowSpec {
            efc_type: ConstraintType::Equality,
            id: eq.id,
            solref: eq.solref,
            solimp: eq.solimp,
            margin: 0.0,
            frictionloss: 0.0,
            diag_hint: diag_rot,
            pos: violation_rot[row],
        };
        if !add_constraint(arena, resolved, model.nv, &merged, &vals, spec, warnings) {
            return false;
        }
    }
    true
}

fn joint_coupling(
    model: &Model,
    data: &Data,
    eq: &EqualityDef,
    arena: &mut ConstraintArena,
    resolved: ResolvedJacobian,
    warnings: &mut Vec<Warning>,
) -> bool {
    let j1 = match eq.obj1 {
        ObjRef::Joint(j) => j,
        _ => return true,
    };
    let dof1 = model.joints[j1].dofadr;
    let pos1 = data.jnt_qpos[j1];
    let [a0, a1, a2, a3, a4] = eq.polycoef();

    let (chain, vals, pos, diag) = match eq.obj2 {
        Some(ObjRef::Joint(j2)) => {
            let dof2 = model.joints[j2].dofadr;
            let pos2 = data.jnt_qpos[j2];
            let d = pos2 - eq.ref1;
            let poly = a0 + a1 * d + a2 * d * d + a3 * d.powi(3) + a4 * d.powi(4);
            let dpoly = a1 + 2.0 * a2 * d + 3.0 * a3 * d * d + 4.0 * a4 * d.powi(3);
            let violation = (pos1 - eq.ref0) - poly;
            let (chain, vals) = if dof1 < dof2 {
                (vec![dof1, dof2], vec![1.0, -dpoly])
            } else {
                (vec![dof2, dof1], vec![-dpoly, 1.0])
            };
            let diag = model.dof_invweight0[dof1] + model.dof_invweight0[dof2];
            (chain, vals, violation, diag)
        }
        _ => {
            let d = pos1 - eq.ref0;
            (vec![dof1], vec![1.0], d, model.dof_invweight0[dof1])
        }
    };

    let spec = RowSpec {
        efc_type: ConstraintType::Equality,
        id: eq.id,
        solref: eq.solref,
        solimp: eq.solimp,
        margin: 0.0,
        frictionloss: 0.0,
        diag_hint: diag,
        pos,
    };
    add_constraint(arena, resolved, model.nv, &chain, &vals, spec, warnings)
}

fn tendon_coupling(
    model: &Model,
    data: &Data,
    eq: &EqualityDef,
    arena: &mut ConstraintArena,
    resolved: ResolvedJacobian,
    warnings: &mut Vec<Warning>,
) -> bool {
    let t1 = match eq.obj1 {
        ObjRef::Tendon(t) => t,
        _ => return true,
    };
    let len1 = data.tendon_length[t1];
    let [a0, a1, a2, a3, a4] = eq.polycoef();

    let mut merged: std::collections::BTreeMap<usize, f64> = std::collections::BTreeMap::new();
    let pos;
    let diag;

    match eq.obj2 {
        Some(ObjRef::Tendon(t2)) => {
            let len2 = data.tendon_length[t2];
            let d = len2 - eq.ref1;
            let poly = a0 + a1 * d + a2 * d * d + a3 * d.powi(3) + a4 * d.powi(4);
            let dpoly = a1 + 2.0 * a2 * d + 3.0 * a3 * d * d + 4.0 * a4 * d.powi(3);
            pos = (len1 - eq.ref0) - poly;
            diag = model.tendons[t1].invweight0 + model.tendons[t2].invweight0;
            for &(dof, v) in &data.tendon_jac[t1] {
                *merged.entry(dof).or_insert(0.0) += v;
            }
            for &(dof, v) in &data.tendon_jac[t2] {
                *merged.entry(dof).or_insert(0.0) -= dpoly * v;
            }
        }
        _ => {
            let d = len1 - eq.ref0;
            pos = d;
            diag = model.tendons[t1].invweight0;
            for &(dof, v) in &data.tendon_jac[t1] {
                *merged.entry(dof).or_insert(0.0) += v;
            }
        }
    }

    let chain: Vec<usize> = merged.keys().copied().collect();
    let vals: Vec<f64> = merged.values().copied().collect();
    let spec = RowSpec {
        efc_type: ConstraintType::Equality,
        id: eq.id,
        solref: eq.solref,
        solimp: eq.solimp,
        margin: 0.0,
        frictionloss: 0.0,
        diag_hint: diag,
        pos,
    };
    add_constraint(arena, resolved, model.nv, &chain, &vals, spec, warnings)
}
