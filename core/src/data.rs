//! The per-step `Data` (§3): kinematic state supplied by the external
//! kinematics collaborator, plus the constraint rows this crate builds from
//! it. Mutated once per call to [`crate::driver::make_constraint`].

use nalgebra::{UnitQuaternion, Vector3};
use thiserror::Error;

use crate::arena::ConstraintArena;
use crate::spatial::DofMotionAxis;

/// Non-fatal reports (§7 kinds 1 and 2): capacity exhaustion and input
/// sanitization. Collected on [`Data`] rather than aborting the build.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Warning {
    #[error("constraint row capacity exhausted: needed at least {needed}, capacity {capacity}")]
    RowCapacityExceeded { needed: usize, capacity: usize },

    #[error("Jacobian non-zero capacity exhausted: needed at least {needed}, capacity {capacity}")]
    NnzCapacityExceeded { needed: usize, capacity: usize },

    #[error("solref {context} was malformed and replaced with the default")]
    BadSolref { context: String },

    #[error("solimp {context} was malformed and replaced with the default")]
    BadSolimp { context: String },

    #[error("friction coefficient {context} was non-positive and clamped to {clamped_to}")]
    BadFriction { context: String, clamped_to: f64 },
}

/// One potential contact between two bodies, supplied by the (external)
/// collision-detection collaborator. `id`, `exclude`, `efc_address`, and
/// `mu` are the fields the constraint core itself mutates during the build
/// (§3); every other field is a read-only collision-detection input.
#[derive(Debug, Clone)]
pub struct Contact {
    /// This contact's own index, assigned by the collision-detection
    /// collaborator (mirrors `JointDef`/`TendonDef`'s `id == index` contract).
    pub id: usize,
    pub body1: usize,
    pub body2: usize,
    /// Contact point in world coordinates.
    pub pos: Vector3<f64>,
    /// Contact frame: `[normal, tangent1, tangent2]`, world-expressed,
    /// `normal` pointing from body1 to body2.
    pub frame: [Vector3<f64>; 3],
    /// Signed penetration depth (negative means separated).
    pub dist: f64,
    pub margin: f64,
    pub includemargin: f64,
    /// `[tangential1, tangential2, torsional, rolling1, rolling2]`.
    pub friction: [f64; 5],
    pub solref: [f64; crate::constants::MJ_NREF],
    pub solimp: [f64; crate::constants::MJ_NIMP],
    /// 1 = frictionless, 3/4/6 = pyramidal/elliptic with increasing friction dims.
    pub dim: usize,
    /// 0 = active, 3 = excluded because the two bodies share no dofs
    /// (merged chain is empty). Written by the core; read-only otherwise.
    pub exclude: i32,
    /// Index of this contact's first efc row, or -1 while excluded.
    pub efc_address: i32,
    /// Regularized primary friction coefficient, written by the core once
    /// the contact's rows are built.
    pub mu: f64,
}

#[derive(Debug, Clone)]
pub struct Data {
    // --- kinematic inputs, supplied externally ---
    /// One spatial motion axis per dof, world frame about the world origin.
    pub cdof: Vec<DofMotionAxis>,
    pub qvel: Vec<f64>,
    pub body_xpos: Vec<Vector3<f64>>,
    pub body_xquat: Vec<UnitQuaternion<f64>>,
    /// Scalar joint position: angle (Hinge) or displacement (Slide). Unused
    /// for Ball/Free, whose orientation lives in `jnt_quat`.
    pub jnt_qpos: Vec<f64>,
    pub jnt_quat: Vec<Option<UnitQuaternion<f64>>>,
    pub tendon_length: Vec<f64>,
    /// Tendon Jacobian rows, already expressed over arbitrary dofs (tendon
    /// wrapping kinematics are out of scope; this is consumed as given).
    pub tendon_jac: Vec<Vec<(usize, f64)>>,
    pub contacts: Vec<Contact>,

    // --- build outputs ---
    pub constraints: Option<ConstraintArena>,
    /// `A_R = J M^-1 J^T + diag(R)` (§C8), built only for dual solvers
    /// (`model.opt.solver.is_dual()`); `None` otherwise.
    pub projected_inertia: Option<nalgebra::DMatrix<f64>>,
    pub warnings: Vec<Warning>,
}

impl Data {
    pub fn new(nv: usize) -> Self {
        Data {
            cdof: vec![DofMotionAxis::ZERO; nv],
            qvel: vec![0.0; nv],
            body_xpos: Vec::new(),
            body_xquat: Vec::new(),
            jnt_qpos: Vec::new(),
            jnt_quat: Vec::new(),
            tendon_length: Vec::new(),
            tendon_jac: Vec::new(),
            contacts: Vec::new(),
            constraints: None,
            projected_inertia: None,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, w: Warning) {
        log::warn!("{w}");
        self.warnings.push(w);
    }

    /// Row counts by kind, for callers (and tests) who don't want to walk
    /// `constraints.meta` themselves.
    pub fn summary(&self) -> ConstraintSummary {
        let mut s = ConstraintSummary::default();
        if let Some(arena) = &self.constraints {
            for m in &arena.meta {
                s.total += 1;
                if m.efc_type.is_equality() {
                    s.ne += 1;
                } else if m.efc_type.is_friction() {
                    s.nf += 1;
                } else if m.efc_type.is_contact() {
                    s.nc += 1;
                } else {
                    s.nl += 1;
                }
            }
        }
        s
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstraintSummary {
    pub total: usize,
    pub ne: usize,
    pub nf: usize,
    pub nl: usize,
    pub nc: usize,
}
