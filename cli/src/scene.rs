//! JSON scene loading: a flat, serde-driven description of a [`Model`] and
//! its [`Data`] for one step, used by the `build`/`inspect` subcommands.
//! Forward kinematics are the caller's job — a scene supplies `cdof` and
//! body/joint poses directly, exactly as the real kinematics collaborator
//! would hand them to this crate.

use anyhow::{Context, Result};
use rbconstraint_core::data::{Contact, Data};
use rbconstraint_core::model::{EqualityDef, JointDef, MassCholesky, Model, ObjRef, Options, TendonDef};
use rbconstraint_core::types::{ConeType, DisableBits, EqualityKind, JacobianMode, JointType, SolverType};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SceneFile {
    pub nv: usize,
    pub nbody: usize,
    pub body_dofadr: Vec<i32>,
    pub body_dofnum: Vec<usize>,
    pub dof_parentid: Vec<i32>,
    #[serde(default = "default_invweight_pairs")]
    pub body_invweight0: Vec<(f64, f64)>,
    #[serde(default)]
    pub dof_invweight0: Vec<f64>,
    #[serde(default)]
    pub options: SceneOptions,
    #[serde(default)]
    pub joints: Vec<SceneJoint>,
    #[serde(default)]
    pub tendons: Vec<SceneTendon>,
    #[serde(default)]
    pub equalities: Vec<SceneEquality>,

    #[serde(default)]
    pub qvel: Vec<f64>,
    #[serde(default)]
    pub body_xpos: Vec<[f64; 3]>,
    /// `[w, x, y, z]` per body.
    #[serde(default)]
    pub body_xquat: Vec<[f64; 4]>,
    #[serde(default)]
    pub jnt_qpos: Vec<f64>,
    /// `[w, x, y, z]` per joint, `null` for non-ball/free joints.
    #[serde(default)]
    pub jnt_quat: Vec<Option<[f64; 4]>>,
    /// One six-number `[angular.xyz, linear.xyz]` entry per dof.
    #[serde(default)]
    pub cdof: Vec<[f64; 6]>,
    #[serde(default)]
    pub tendon_length: Vec<f64>,
    #[serde(default)]
    pub tendon_jac: Vec<Vec<(usize, f64)>>,
    #[serde(default)]
    pub contacts: Vec<SceneContact>,
}

fn default_invweight_pairs() -> Vec<(f64, f64)> {
    Vec::new()
}

#[derive(Debug, Default, Deserialize)]
pub struct SceneOptions {
    #[serde(default)]
    pub cone: Option<ConeType>,
    #[serde(default)]
    pub jacobian: Option<JacobianMode>,
    #[serde(default)]
    pub solver: Option<SolverType>,
    #[serde(default)]
    pub impratio: Option<f64>,
    #[serde(default)]
    pub timestep: Option<f64>,
    #[serde(default)]
    pub disable: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SceneJoint {
    pub jtype: JointType,
    pub dofadr: usize,
    pub body: usize,
    #[serde(default)]
    pub limited: bool,
    #[serde(default)]
    pub range: (f64, f64),
    #[serde(default)]
    pub margin: f64,
    #[serde(default = "default_solref")]
    pub solref_limit: [f64; 2],
    #[serde(default = "default_solimp")]
    pub solimp_limit: [f64; 5],
}

#[derive(Debug, Deserialize)]
pub struct SceneTendon {
    #[serde(default)]
    pub limited: bool,
    #[serde(default)]
    pub range: (f64, f64),
    #[serde(default)]
    pub margin: f64,
    #[serde(default)]
    pub frictionloss: f64,
    #[serde(default = "default_solref")]
    pub solref_limit: [f64; 2],
    #[serde(default = "default_solimp")]
    pub solimp_limit: [f64; 5],
    #[serde(default = "default_solref")]
    pub solref_friction: [f64; 2],
    #[serde(default = "default_solimp")]
    pub solimp_friction: [f64; 5],
    #[serde(default)]
    pub invweight0: f64,
}

#[derive(Debug, Deserialize)]
pub struct SceneEquality {
    pub kind: EqualityKind,
    pub obj1_body: Option<usize>,
    pub obj1_joint: Option<usize>,
    pub obj1_tendon: Option<usize>,
    pub obj2_body: Option<usize>,
    pub obj2_joint: Option<usize>,
    pub obj2_tendon: Option<usize>,
    #[serde(default)]
    pub data: Vec<f64>,
    #[serde(default)]
    pub ref0: f64,
    #[serde(default)]
    pub ref1: f64,
    #[serde(default = "default_solref")]
    pub solref: [f64; 2],
    #[serde(default = "default_solimp")]
    pub solimp: [f64; 5],
}

#[derive(Debug, Deserialize)]
pub struct SceneContact {
    pub body1: usize,
    pub body2: usize,
    pub pos: [f64; 3],
    /// `[normal, tangent1, tangent2]`.
    pub frame: [[f64; 3]; 3],
    pub dist: f64,
    #[serde(default)]
    pub margin: f64,
    #[serde(default)]
    pub includemargin: f64,
    #[serde(default = "default_friction5")]
    pub friction: [f64; 5],
    #[serde(default = "default_solref")]
    pub solref: [f64; 2],
    #[serde(default = "default_solimp")]
    pub solimp: [f64; 5],
    pub dim: usize,
}

fn default_solref() -> [f64; 2] {
    rbconstraint_core::constants::DEFAULT_SOLREF
}
fn default_solimp() -> [f64; 5] {
    rbconstraint_core::constants::DEFAULT_SOLIMP
}
fn default_friction5() -> [f64; 5] {
    [1.0, 1.0, 0.005, 0.0001, 0.0001]
}

fn obj_ref(body: Option<usize>, joint: Option<usize>, tendon: Option<usize>) -> Option<ObjRef> {
    body.map(ObjRef::Body).or(joint.map(ObjRef::Joint)).or(tendon.map(ObjRef::Tendon))
}

pub fn build(scene: &SceneFile) -> Result<(Model, Data)> {
    let mut opt = Options::default();
    if let Some(c) = scene.options.cone {
        opt.cone = c;
    }
    if let Some(j) = scene.options.jacobian {
        opt.jacobian = j;
    }
    if let Some(s) = scene.options.solver {
        opt.solver = s;
    }
    if let Some(i) = scene.options.impratio {
        opt.impratio = i;
    }
    if let Some(t) = scene.options.timestep {
        opt.timestep = t;
    }
    for flag in &scene.options.disable {
        opt.disable |= match flag.as_str() {
            "constraint" => DisableBits::CONSTRAINT,
            "equality" => DisableBits::EQUALITY,
            "frictionloss" => DisableBits::FRICTIONLOSS,
            "limit" => DisableBits::LIMIT,
            "contact" => DisableBits::CONTACT,
            "refsafe" => DisableBits::REFSAFE,
            "override" => DisableBits::OVERRIDE,
            other => anyhow::bail!("unknown disable flag '{other}'"),
        };
    }

    let body_invweight0 = if scene.body_invweight0.is_empty() {
        vec![(1.0, 1.0); scene.nbody]
    } else {
        scene.body_invweight0.clone()
    };
    let dof_invweight0 =
        if scene.dof_invweight0.is_empty() { vec![1.0; scene.nv] } else { scene.dof_invweight0.clone() };

    let mut model = Model::new(
        scene.nv,
        scene.nbody,
        scene.body_dofadr.clone(),
        scene.body_dofnum.clone(),
        scene.dof_parentid.clone(),
        body_invweight0,
        dof_invweight0,
        MassCholesky::identity(scene.nv),
        opt,
    );

    for (id, j) in scene.joints.iter().enumerate() {
        model.joints.push(JointDef {
            id,
            jtype: j.jtype,
            dofadr: j.dofadr,
            body: j.body,
            limited: j.limited,
            range: j.range,
            margin: j.margin,
            solref_limit: j.solref_limit,
            solimp_limit: j.solimp_limit,
        });
    }

    for (id, t) in scene.tendons.iter().enumerate() {
        model.tendons.push(TendonDef {
            id,
            limited: t.limited,
            range: t.range,
            margin: t.margin,
            frictionloss: t.frictionloss,
            solref_limit: t.solref_limit,
            solimp_limit: t.solimp_limit,
            solref_friction: t.solref_friction,
            solimp_friction: t.solimp_friction,
            invweight0: t.invweight0,
        });
    }

    for (id, e) in scene.equalities.iter().enumerate() {
        let obj1 = obj_ref(e.obj1_body, e.obj1_joint, e.obj1_tendon)
            .with_context(|| format!("equality {id} has no obj1"))?;
        let obj2 = obj_ref(e.obj2_body, e.obj2_joint, e.obj2_tendon);
        let mut data = [0.0; rbconstraint_core::constants::MJ_NEQDATA];
        for (slot, &v) in data.iter_mut().zip(e.data.iter()) {
            *slot = v;
        }
        model.equalities.push(EqualityDef {
            id,
            kind: e.kind,
            obj1,
            obj2,
            data,
            ref0: e.ref0,
            ref1: e.ref1,
            solref: e.solref,
            solimp: e.solimp,
        });
    }

    let mut data = Data::new(scene.nv);
    if !scene.qvel.is_empty() {
        data.qvel = scene.qvel.clone();
    }
    data.body_xpos = scene.body_xpos.iter().map(|p| nalgebra::Vector3::new(p[0], p[1], p[2])).collect();
    data.body_xquat = scene
        .body_xquat
        .iter()
        .map(|q| nalgebra::UnitQuaternion::new_normalize(nalgebra::Quaternion::new(q[0], q[1], q[2], q[3])))
        .collect();
    data.jnt_qpos = scene.jnt_qpos.clone();
    data.jnt_quat = scene
        .jnt_quat
        .iter()
        .map(|maybe| {
            maybe.map(|q| nalgebra::UnitQuaternion::new_normalize(nalgebra::Quaternion::new(q[0], q[1], q[2], q[3])))
        })
        .collect();
    if !scene.cdof.is_empty() {
        data.cdof = scene
            .cdof
            .iter()
            .map(|c| rbconstraint_core::spatial::DofMotionAxis {
                angular: nalgebra::Vector3::new(c[0], c[1], c[2]),
                linear: nalgebra::Vector3::new(c[3], c[4], c[5]),
            })
            .collect();
    }
    data.tendon_length = scene.tendon_length.clone();
    data.tendon_jac = scene.tendon_jac.clone();
    data.contacts = scene
        .contacts
        .iter()
        .enumerate()
        .map(|(id, c)| Contact {
            id,
            body1: c.body1,
            body2: c.body2,
            pos: nalgebra::Vector3::new(c.pos[0], c.pos[1], c.pos[2]),
            frame: [
                nalgebra::Vector3::new(c.frame[0][0], c.frame[0][1], c.frame[0][2]),
                nalgebra::Vector3::new(c.frame[1][0], c.frame[1][1], c.frame[1][2]),
                nalgebra::Vector3::new(c.frame[2][0], c.frame[2][1], c.frame[2][2]),
            ],
            dist: c.dist,
            margin: c.margin,
            includemargin: c.includemargin,
            friction: c.friction,
            solref: c.solref,
            solimp: c.solimp,
            dim: c.dim,
            exclude: 0,
            efc_address: -1,
            mu: 0.0,
        })
        .collect();

    Ok((model, data))
}
