//! The read-only `Model` (§3): static geometry, joints, tendons, equality
//! definitions, solver-reference parameters, and the cached mass-matrix
//! Cholesky factor. Nothing here is mutated once a step begins.

use crate::constants::{MJ_NEQDATA, MJ_NIMP, MJ_NREF};
use crate::types::{ConeType, DisableBits, EqualityKind, JacobianMode, JointType, SolverType};

/// A reference to the object an equality constraint's side binds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjRef {
    Body(usize),
    Joint(usize),
    Tendon(usize),
}

#[derive(Debug, Clone)]
pub struct EqualityDef {
    pub id: usize,
    pub kind: EqualityKind,
    pub obj1: ObjRef,
    pub obj2: Option<ObjRef>,
    /// Connect: anchor0(3)+anchor1(3). Weld: anchor0(3)+anchor1(3)+relpose(4)+torquescale(1).
    /// Joint/Tendon: polycoef a0..a4 in data[0..5].
    pub data: [f64; MJ_NEQDATA],
    /// Reference position/length for object 1, used by the Joint/Tendon cubic coupling.
    pub ref0: f64,
    /// Reference position/length for object 2.
    pub ref1: f64,
    pub solref: [f64; MJ_NREF],
    pub solimp: [f64; MJ_NIMP],
}

impl EqualityDef {
    pub fn connect_anchor0(&self) -> nalgebra::Vector3<f64> {
        nalgebra::Vector3::new(self.data[0], self.data[1], self.data[2])
    }
    pub fn connect_anchor1(&self) -> nalgebra::Vector3<f64> {
        nalgebra::Vector3::new(self.data[3], self.data[4], self.data[5])
    }
    pub fn weld_relpose(&self) -> nalgebra::UnitQuaternion<f64> {
        nalgebra::UnitQuaternion::new_normalize(nalgebra::Quaternion::new(
            self.data[6],
            self.data[7],
            self.data[8],
            self.data[9],
        ))
    }
    pub fn weld_torquescale(&self) -> f64 {
        self.data[10]
    }
    pub fn polycoef(&self) -> [f64; 5] {
        [self.data[0], self.data[1], self.data[2], self.data[3], self.data[4]]
    }
}

#[derive(Debug, Clone)]
pub struct JointDef {
    pub id: usize,
    pub jtype: JointType,
    /// First dof index owned by this joint; `jtype.dof_count()` dofs follow.
    pub dofadr: usize,
    pub body: usize,
    pub limited: bool,
    /// `(lower, upper)`. For Ball joints this is `(_, max_angle)`; lower is unused.
    pub range: (f64, f64),
    pub margin: f64,
    pub solref_limit: [f64; MJ_NREF],
    pub solimp_limit: [f64; MJ_NIMP],
}

#[derive(Debug, Clone)]
pub struct TendonDef {
    pub id: usize,
    pub limited: bool,
    pub range: (f64, f64),
    pub margin: f64,
    pub frictionloss: f64,
    pub solref_limit: [f64; MJ_NREF],
    pub solimp_limit: [f64; MJ_NIMP],
    pub solref_friction: [f64; MJ_NREF],
    pub solimp_friction: [f64; MJ_NIMP],
    pub invweight0: f64,
}

/// Sparse Cholesky half-factor of the mass matrix, `M = L D L^T` with `L`
/// unit lower-triangular in dof-parent order (§3, §4.8). Factorization
/// itself is a Non-goal: this is consumed as given.
#[derive(Debug, Clone)]
pub struct MassCholesky {
    pub nv: usize,
    /// Per dof `i`, the off-diagonal entries `(ancestor j, L(i, j))`, ordered
    /// from the nearest parent outward to the root (mirrors `qLD`/`Madr`).
    pub l_entries: Vec<Vec<(usize, f64)>>,
    /// `1 / sqrt(D_ii)`, i.e. `qLDiagSqrtInv`.
    pub diag_sqrt_inv: Vec<f64>,
}

impl MassCholesky {
    pub fn identity(nv: usize) -> Self {
        MassCholesky {
            nv,
            l_entries: vec![Vec::new(); nv],
            diag_sqrt_inv: vec![1.0; nv],
        }
    }

    /// Materialize `L` as a dense unit-lower-triangular `nv x nv` matrix, for
    /// the dense §4.8 path.
    pub fn to_dense_l(&self) -> nalgebra::DMatrix<f64> {
        let mut l = nalgebra::DMatrix::identity(self.nv, self.nv);
        for (i, entries) in self.l_entries.iter().enumerate() {
            for &(j, val) in entries {
                l[(i, j)] = val;
            }
        }
        l
    }
}

#[derive(Debug, Clone)]
pub struct Options {
    pub cone: ConeType,
    pub jacobian: JacobianMode,
    pub solver: SolverType,
    pub impratio: f64,
    pub timestep: f64,
    pub noslip_iterations: u32,
    pub disable: DisableBits,
    pub o_solref: [f64; MJ_NREF],
    pub o_solimp: [f64; MJ_NIMP],
    pub o_margin: f64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            cone: ConeType::Pyramidal,
            jacobian: JacobianMode::Auto,
            solver: SolverType::PrimalNewton,
            impratio: 1.0,
            timestep: 0.002,
            noslip_iterations: 0,
            disable: DisableBits::empty(),
            o_solref: crate::constants::DEFAULT_SOLREF,
            o_solimp: crate::constants::DEFAULT_SOLIMP,
            o_margin: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    pub nv: usize,
    pub nbody: usize,

    /// First dof of each body, or `-1` if `body_dofnum[b] == 0` (fixed body).
    pub body_dofadr: Vec<i32>,
    pub body_dofnum: Vec<usize>,
    /// `dof_parentid[d]` is the next dof up the kinematic chain, `-1` at the root.
    pub dof_parentid: Vec<i32>,
    /// Translational/rotational inverse-inertia upper bound, per body.
    pub body_invweight0: Vec<(f64, f64)>,
    /// Inverse-inertia upper bound, per dof (used by friction/limit diagApprox).
    pub dof_invweight0: Vec<f64>,
    pub dof_frictionloss: Vec<f64>,
    pub dof_solref_friction: Vec<[f64; MJ_NREF]>,
    pub dof_solimp_friction: Vec<[f64; MJ_NIMP]>,

    pub joints: Vec<JointDef>,
    pub tendons: Vec<TendonDef>,
    pub equalities: Vec<EqualityDef>,

    pub mass: MassCholesky,
    pub opt: Options,

    /// Derived: true when a body's dof chain has no further ancestor dofs,
    /// enabling the §4.2 fast path.
    body_simple: Vec<bool>,
}

impl Model {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nv: usize,
        nbody: usize,
        body_dofadr: Vec<i32>,
        body_dofnum: Vec<usize>,
        dof_parentid: Vec<i32>,
        body_invweight0: Vec<(f64, f64)>,
        dof_invweight0: Vec<f64>,
        mass: MassCholesky,
        opt: Options,
    ) -> Self {
        assert_eq!(body_dofadr.len(), nbody);
        assert_eq!(body_dofnum.len(), nbody);
        assert_eq!(dof_parentid.len(), nv);
        assert_eq!(body_invweight0.len(), nbody);
        assert_eq!(dof_invweight0.len(), nv);

        let body_simple = (0..nbody)
            .map(|b| {
                if body_dofnum[b] == 0 {
                    true
                } else {
                    dof_parentid[body_dofadr[b] as usize] < 0
                }
            })
            .collect();

        Model {
            nv,
            nbody,
            body_dofadr,
            body_dofnum,
            dof_parentid,
            body_invweight0,
            dof_invweight0,
            dof_frictionloss: vec![0.0; nv],
            dof_solref_friction: vec![crate::constants::DEFAULT_SOLREF; nv],
            dof_solimp_friction: vec![crate::constants::DEFAULT_SOLIMP; nv],
            joints: Vec::new(),
            tendons: Vec::new(),
            equalities: Vec::new(),
            mass,
            opt,
            body_simple,
        }
    }

    pub fn is_body_simple(&self, body: usize) -> bool {
        self.body_simple[body]
    }

    /// Leaf-most dof of `body`'s own chain, or `None` if it is fixed.
    pub fn body_leaf_dof(&self, body: usize) -> Option<usize> {
        if self.body_dofnum[body] == 0 {
            None
        } else {
            Some((self.body_dofadr[body] as usize) + self.body_dofnum[body] - 1)
        }
    }

    pub fn body_dof_range(&self, body: usize) -> std::ops::Range<usize> {
        if self.body_dofnum[body] == 0 {
            0..0
        } else {
            let start = self.body_dofadr[body] as usize;
            start..(start + self.body_dofnum[body])
        }
    }
}
