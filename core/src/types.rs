//! Shared enums and small value types used across the constraint core.

use bitflags::bitflags;

/// `mjCONE_*` — friction cone model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConeType {
    Pyramidal,
    Elliptic,
}

/// `mjJAC_*` — Jacobian storage layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JacobianMode {
    Dense,
    Sparse,
    Auto,
}

impl JacobianMode {
    /// Resolve `Auto` against `nv` using the §6 default threshold.
    pub fn resolve(self, nv: usize) -> ResolvedJacobian {
        match self {
            JacobianMode::Dense => ResolvedJacobian::Dense,
            JacobianMode::Sparse => ResolvedJacobian::Sparse,
            JacobianMode::Auto => {
                if nv >= crate::constants::SPARSE_AUTO_THRESHOLD_NV {
                    ResolvedJacobian::Sparse
                } else {
                    ResolvedJacobian::Dense
                }
            }
        }
    }
}

/// The layout actually used for one step, after resolving `Auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedJacobian {
    Dense,
    Sparse,
}

/// `mjSOL_*` — which solver will consume the constructed rows. The core
/// itself never iterates a solver; this only gates whether §C8's projected
/// inertia is built (dual solvers need it, primal solvers don't).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverType {
    PrimalCg,
    PrimalNewton,
    Pgs,
}

impl SolverType {
    pub fn is_dual(self) -> bool {
        matches!(self, SolverType::Pgs)
    }
}

/// `mjEQ_*` — equality constraint subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EqualityKind {
    Connect,
    Weld,
    Joint,
    Tendon,
}

/// `mjJNT_*` — joint subtype, as relevant to limits and dof counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JointType {
    Free,
    Ball,
    Slide,
    Hinge,
}

impl JointType {
    pub fn dof_count(self) -> usize {
        match self {
            JointType::Free => 6,
            JointType::Ball => 3,
            JointType::Slide | JointType::Hinge => 1,
        }
    }
}

/// `efc_type` — the taxonomy from §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    Equality,
    FrictionDof,
    FrictionTendon,
    LimitJoint,
    LimitTendon,
    ContactFrictionless,
    ContactPyramidal,
    ContactElliptic,
}

impl ConstraintType {
    pub fn is_equality(self) -> bool {
        matches!(self, ConstraintType::Equality)
    }

    pub fn is_friction(self) -> bool {
        matches!(self, ConstraintType::FrictionDof | ConstraintType::FrictionTendon)
    }

    pub fn is_contact(self) -> bool {
        matches!(
            self,
            ConstraintType::ContactFrictionless
                | ConstraintType::ContactPyramidal
                | ConstraintType::ContactElliptic
        )
    }
}

/// Per-row classification produced by `constraintUpdate` (§4.9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Quadratic,
    LinearNeg,
    LinearPos,
    Satisfied,
    Cone,
}

bitflags! {
    /// Disable/enable bitmask consumed from `model.opt` (§6, §12).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DisableBits: u32 {
        /// Disables the entire constraint core: `make_constraint` yields zero rows.
        const CONSTRAINT   = 1 << 0;
        const EQUALITY     = 1 << 1;
        const FRICTIONLOSS = 1 << 2;
        const LIMIT        = 1 << 3;
        const CONTACT      = 1 << 4;
        /// Disables the `solref[0] >= 2*timestep` safety clamp in §4.6.
        const REFSAFE      = 1 << 5;
        /// Forces every row to adopt `opt.o_solref/o_solimp/o_margin` (§4.6, §9).
        const OVERRIDE     = 1 << 6;
    }
}
