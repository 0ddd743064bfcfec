//! §C5 — the pre-counter. Walks the same activation predicates the §C4
//! instantiators use, without writing any rows, so the arena can be sized
//! exactly before the real pass runs. `driver::make_constraint` treats any
//! mismatch between this count and what §C4 actually produced as the fatal
//! `PrecountMismatch`/`NnzMismatch` invariant violation (§7 kind 3).

use crate::data::Data;
use crate::dofchain::{merge_dof_chain, single_chain};
use crate::model::{JointDef, Model, TendonDef};
use crate::types::{ConeType, DisableBits, JointType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Precount {
    pub ne: usize,
    pub nf: usize,
    pub nl: usize,
    pub nc: usize,
    pub nnz: usize,
}

impl Precount {
    pub fn total_rows(&self) -> usize {
        self.ne + self.nf + self.nl + self.nc
    }
}

/// Signed slack before a hinge/slide joint hits its lower bound.
pub fn joint_limit_slack_lower(joint: &JointDef, data: &Data) -> f64 {
    data.jnt_qpos[joint.id] - joint.range.0
}

/// Signed slack before a hinge/slide joint hits its upper bound.
pub fn joint_limit_slack_upper(joint: &JointDef, data: &Data) -> f64 {
    joint.range.1 - data.jnt_qpos[joint.id]
}

/// Signed slack before either end of a joint's range; negative once past it.
/// Ball joints only ever limit the total rotation angle against the upper
/// bound (max angle); Slide/Hinge report the tighter of their two sides.
pub fn joint_limit_slack(joint: &JointDef, data: &Data) -> f64 {
    match joint.jtype {
        JointType::Ball => {
            let angle = data.jnt_quat[joint.id].map(|q| q.angle()).unwrap_or(0.0);
            joint.range.1 - angle
        }
        _ => joint_limit_slack_lower(joint, data).min(joint_limit_slack_upper(joint, data)),
    }
}

/// Which sides of a joint's range currently sit inside their margin,
/// independently. Ball joints only ever contribute through the upper slot.
pub fn joint_limit_active_sides(joint: &JointDef, data: &Data) -> (bool, bool) {
    if !joint.limited {
        return (false, false);
    }
    match joint.jtype {
        JointType::Ball => (false, joint_limit_slack(joint, data) < joint.margin),
        _ => (
            joint_limit_slack_lower(joint, data) < joint.margin,
            joint_limit_slack_upper(joint, data) < joint.margin,
        ),
    }
}

pub fn tendon_limit_slack_lower(tendon: &TendonDef, data: &Data) -> f64 {
    data.tendon_length[tendon.id] - tendon.range.0
}

pub fn tendon_limit_slack_upper(tendon: &TendonDef, data: &Data) -> f64 {
    tendon.range.1 - data.tendon_length[tendon.id]
}

pub fn tendon_limit_slack(tendon: &TendonDef, data: &Data) -> f64 {
    tendon_limit_slack_lower(tendon, data).min(tendon_limit_slack_upper(tendon, data))
}

/// Which sides of a tendon's range currently sit inside their margin,
/// independently.
pub fn tendon_limit_active_sides(tendon: &TendonDef, data: &Data) -> (bool, bool) {
    if !tendon.limited {
        return (false, false);
    }
    (tendon_limit_slack_lower(tendon, data) < tendon.margin, tendon_limit_slack_upper(tendon, data) < tendon.margin)
}

/// Total efc rows one contact contributes: 1 for frictionless, otherwise
/// `dim` for an elliptic cone (one row per direction, jointly Hessian-coupled)
/// or `2*(dim-1)` pyramidal edge rows.
pub fn contact_row_count(dim: usize, cone: ConeType) -> usize {
    if dim <= 1 {
        1
    } else {
        match cone {
            ConeType::Elliptic => dim,
            ConeType::Pyramidal => 2 * (dim - 1),
        }
    }
}

pub fn precount(model: &Model, data: &Data) -> Precount {
    let disable = model.opt.disable;
    let mut p = Precount::default();

    if disable.contains(DisableBits::CONSTRAINT) {
        return p;
    }

    if !disable.contains(DisableBits::EQUALITY) {
        for eq in &model.equalities {
            let rows = match eq.kind {
                crate::types::EqualityKind::Connect => 3,
                crate::types::EqualityKind::Weld => 6,
                crate::types::EqualityKind::Joint | crate::types::EqualityKind::Tendon => 1,
            };
            p.ne += rows;
            p.nnz += rows * equality_chain_len(model, data, eq);
        }
    }

    if !disable.contains(DisableBits::FRICTIONLOSS) {
        for dof in 0..model.nv {
            if model.dof_frictionloss[dof] > 0.0 {
                p.nf += 1;
                p.nnz += 1;
            }
        }
        for tendon in &model.tendons {
            if tendon.frictionloss > 0.0 {
                p.nf += 1;
                p.nnz += data.tendon_jac[tendon.id].len();
            }
        }
    }

    if !disable.contains(DisableBits::LIMIT) {
        for joint in &model.joints {
            let (lower, upper) = joint_limit_active_sides(joint, data);
            if lower {
                p.nl += 1;
                p.nnz += joint.jtype.dof_count();
            }
            if upper {
                p.nl += 1;
                p.nnz += joint.jtype.dof_count();
            }
        }
        for tendon in &model.tendons {
            let (lower, upper) = tendon_limit_active_sides(tendon, data);
            if lower {
                p.nl += 1;
                p.nnz += data.tendon_jac[tendon.id].len();
            }
            if upper {
                p.nl += 1;
                p.nnz += data.tendon_jac[tendon.id].len();
            }
        }
    }

    if !disable.contains(DisableBits::CONTACT) {
        for c in &data.contacts {
            if c.dist - c.margin >= c.includemargin {
                continue;
            }
            let rows = contact_row_count(c.dim, model.opt.cone);
            p.nc += rows;
            p.nnz += rows * merge_dof_chain(model, c.body1, c.body2).len();
        }
    }

    p
}

/// Mirrors the chain each `equality.rs` row builder actually walks: Connect
/// and Weld rows are Cartesian (merged dof-chain over the two bodies), while
/// Joint and Tendon coupling rows act directly in joint/tendon-length space
/// and so only ever touch one or two dofs/tendon patterns.
fn equality_chain_len(model: &Model, data: &Data, eq: &crate::model::EqualityDef) -> usize {
    use crate::model::ObjRef;
    use crate::types::EqualityKind;
    match eq.kind {
        EqualityKind::Connect | EqualityKind::Weld => match (eq.obj1, eq.obj2) {
            (ObjRef::Body(a), Some(ObjRef::Body(b))) => merge_dof_chain(model, a, b).len(),
            (ObjRef::Body(a), None) => single_chain(model, a).len(),
            _ => model.nv,
        },
        EqualityKind::Joint => match eq.obj2 {
            Some(_) => 2,
            None => 1,
        },
        EqualityKind::Tendon => match eq.obj2 {
            Some(ObjRef::Tendon(t2)) => {
                let t1 = match eq.obj1 {
                    ObjRef::Tendon(t) => t,
                    _ => return model.nv,
                };
                (data.tendon_jac[t1].len() + data.tendon_jac[t2].len()).max(1)
            }
            _ => match eq.obj1 {
                ObjRef::Tendon(t) => data.tendon_jac[t].len(),
                _ => model.nv,
            },
        },
    }
}
