//! End-to-end scenarios driving `make_constraint` directly, without the CLI's
//! JSON layer: a handful of concrete kinematic configurations exercising
//! every constraint family and a couple of solver-parameter edge cases.

use nalgebra::{UnitQuaternion, Vector3};
use rbconstraint_core::model::{EqualityDef, JointDef, MassCholesky, ObjRef, Options, TendonDef};
use rbconstraint_core::spatial::DofMotionAxis;
use rbconstraint_core::types::{ConeType, EqualityKind, JointType};
use rbconstraint_core::{make_constraint, Data, Model};

fn one_dof_model() -> Model {
    Model::new(
        1,
        1,
        vec![0],
        vec![1],
        vec![-1],
        vec![(1.0, 1.0)],
        vec![1.0],
        MassCholesky::identity(1),
        Options::default(),
    )
}

#[test]
fn free_floating_point_mass_has_no_constraints() {
    let model = one_dof_model();
    let mut data = Data::new(1);
    data.cdof[0] = DofMotionAxis { angular: Vector3::zeros(), linear: Vector3::x() };
    let (ne, nf, nl, nc) = make_constraint(&model, &mut data).unwrap();
    assert_eq!((ne, nf, nl, nc), (0, 0, 0, 0));
    assert_eq!(data.warnings.len(), 0);
}

#[test]
fn hinge_past_upper_limit_produces_one_active_row() {
    let mut model = one_dof_model();
    model.joints.push(JointDef {
        id: 0,
        jtype: JointType::Hinge,
        dofadr: 0,
        body: 0,
        limited: true,
        range: (-1.0, 1.0),
        margin: 0.05,
        solref_limit: rbconstraint_core::constants::DEFAULT_SOLREF,
        solimp_limit: rbconstraint_core::constants::DEFAULT_SOLIMP,
    });
    let mut data = Data::new(1);
    data.jnt_qpos.push(0.98);
    let (ne, nf, nl, nc) = make_constraint(&model, &mut data).unwrap();
    assert_eq!((ne, nf, nl, nc), (0, 0, 1, 0));
    let row = &data.constraints.as_ref().unwrap().meta[0];
    assert!(row.pos < model.joints[0].margin);
    // pos is inside the margin band (adjusted_pos < 0), so aref pushes back out.
    assert!(row.aref > 0.0, "limit inside its margin should reference a restoring acceleration");
}

#[test]
fn hinge_within_limit_produces_no_rows() {
    let mut model = one_dof_model();
    model.joints.push(JointDef {
        id: 0,
        jtype: JointType::Hinge,
        dofadr: 0,
        body: 0,
        limited: true,
        range: (-1.0, 1.0),
        margin: 0.05,
        solref_limit: rbconstraint_core::constants::DEFAULT_SOLREF,
        solimp_limit: rbconstraint_core::constants::DEFAULT_SOLIMP,
    });
    let mut data = Data::new(1);
    data.jnt_qpos.push(0.0);
    let (_, _, nl, _) = make_constraint(&model, &mut data).unwrap();
    assert_eq!(nl, 0);
}

fn two_body_connect_model() -> Model {
    // dof 0: body 0's slide along x. dof 1: body 1's slide along x, independent chain.
    Model::new(
        2,
        2,
        vec![0, 1],
        vec![1, 1],
        vec![-1, -1],
        vec![(1.0, 1.0), (1.0, 1.0)],
        vec![1.0, 1.0],
        MassCholesky::identity(2),
        Options::default(),
    )
}

#[test]
fn connect_equality_reports_three_rows_and_nonzero_violation() {
    let mut model = two_body_connect_model();
    let mut data = [0.0; rbconstraint_core::constants::MJ_NEQDATA];
    data[3] = 0.0; // anchor1 at body-local origin
    model.equalities.push(EqualityDef {
        id: 0,
        kind: EqualityKind::Connect,
        obj1: ObjRef::Body(0),
        obj2: Some(ObjRef::Body(1)),
        data,
        ref0: 0.0,
        ref1: 0.0,
        solref: rbconstraint_core::constants::DEFAULT_SOLREF,
        solimp: rbconstraint_core::constants::DEFAULT_SOLIMP,
    });

    let mut d = Data::new(2);
    d.cdof[0] = DofMotionAxis { angular: Vector3::zeros(), linear: Vector3::x() };
    d.cdof[1] = DofMotionAxis { angular: Vector3::zeros(), linear: Vector3::x() };
    d.body_xpos = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.3, 0.0, 0.0)];
    d.body_xquat = vec![UnitQuaternion::identity(), UnitQuaternion::identity()];

    let (ne, nf, nl, nc) = make_constraint(&model, &mut d).unwrap();
    assert_eq!((ne, nf, nl, nc), (3, 0, 0, 0));
    let rows = &d.constraints.as_ref().unwrap().meta;
    assert!((rows[0].pos + 0.3).abs() < 1e-12);
}

fn three_dof_contact_model() -> Model {
    // Two independent single-dof (x-slide) bodies; a contact couples them.
    Model::new(
        2,
        2,
        vec![0, 1],
        vec![1, 1],
        vec![-1, -1],
        vec![(2.0, 1.0), (2.0, 1.0)],
        vec![2.0, 2.0],
        MassCholesky::identity(2),
        Options::default(),
    )
}

fn make_contact(dist: f64) -> rbconstraint_core::Contact {
    rbconstraint_core::Contact {
        id: 0,
        body1: 0,
        body2: 1,
        pos: Vector3::new(0.5, 0.0, 0.0),
        frame: [Vector3::x(), Vector3::y(), Vector3::z()],
        dist,
        margin: 0.0,
        includemargin: 0.0,
        friction: [1.0, 1.0, 0.005, 0.0001, 0.0001],
        solref: rbconstraint_core::constants::DEFAULT_SOLREF,
        solimp: rbconstraint_core::constants::DEFAULT_SOLIMP,
        dim: 3,
        exclude: 0,
        efc_address: -1,
        mu: 0.0,
    }
}

#[test]
fn elliptic_contact_produces_dim_rows() {
    let mut model = three_dof_contact_model();
    model.opt.cone = ConeType::Elliptic;
    let mut data = Data::new(2);
    data.cdof[0] = DofMotionAxis { angular: Vector3::zeros(), linear: Vector3::x() };
    data.cdof[1] = DofMotionAxis { angular: Vector3::zeros(), linear: -Vector3::x() };
    data.contacts.push(make_contact(-0.01));

    let (_, _, _, nc) = make_constraint(&model, &mut data).unwrap();
    assert_eq!(nc, 3);
    let rows = &data.constraints.as_ref().unwrap().meta;
    // normal row should carry the penetration depth as its position.
    assert!((rows[0].pos + 0.01).abs() < 1e-12);
}

#[test]
fn pyramidal_contact_doubles_tangential_rows() {
    let mut model = three_dof_contact_model();
    model.opt.cone = ConeType::Pyramidal;
    let mut data = Data::new(2);
    data.cdof[0] = DofMotionAxis { angular: Vector3::zeros(), linear: Vector3::x() };
    data.cdof[1] = DofMotionAxis { angular: Vector3::zeros(), linear: -Vector3::x() };
    data.contacts.push(make_contact(-0.01));

    let (_, _, _, nc) = make_constraint(&model, &mut data).unwrap();
    assert_eq!(nc, 2 * (3 - 1));
}

#[test]
fn contact_beyond_margin_is_skipped() {
    let model = three_dof_contact_model();
    let mut data = Data::new(2);
    data.cdof[0] = DofMotionAxis { angular: Vector3::zeros(), linear: Vector3::x() };
    data.cdof[1] = DofMotionAxis { angular: Vector3::zeros(), linear: -Vector3::x() };
    data.contacts.push(make_contact(1.0));

    let (_, _, _, nc) = make_constraint(&model, &mut data).unwrap();
    assert_eq!(nc, 0);
}

#[test]
fn malformed_solref_is_sanitized_and_warned() {
    let mut model = one_dof_model();
    model.joints.push(JointDef {
        id: 0,
        jtype: JointType::Hinge,
        dofadr: 0,
        body: 0,
        limited: true,
        range: (-1.0, 1.0),
        margin: 0.0,
        solref_limit: [0.02, -1.0], // mixed signs: invalid
        solimp_limit: rbconstraint_core::constants::DEFAULT_SOLIMP,
    });
    let mut data = Data::new(1);
    data.jnt_qpos.push(0.99);
    make_constraint(&model, &mut data).unwrap();
    assert!(data.warnings.iter().any(|w| matches!(w, rbconstraint_core::Warning::BadSolref { .. })));
}

#[test]
fn refsafe_clamps_a_too_fast_timeconst() {
    let mut model = one_dof_model();
    model.opt.timestep = 0.01;
    model.joints.push(JointDef {
        id: 0,
        jtype: JointType::Hinge,
        dofadr: 0,
        body: 0,
        limited: true,
        range: (-1.0, 1.0),
        margin: 0.0,
        solref_limit: [0.001, 1.0], // timeconst < 2*timestep
        solimp_limit: rbconstraint_core::constants::DEFAULT_SOLIMP,
    });
    let mut data = Data::new(1);
    data.jnt_qpos.push(0.99);
    make_constraint(&model, &mut data).unwrap();
    let row = &data.constraints.as_ref().unwrap().meta[0];
    // K = 1/timeconst^2 with the clamped timeconst (0.02), not the raw 0.001.
    let expected_k = 1.0 / (0.02 * 0.02);
    assert!((row.kbip[0] - expected_k).abs() / expected_k < 1e-6);
}

#[test]
fn joint_coupling_equality_acts_directly_on_two_dofs() {
    let mut model = two_body_connect_model();
    model.joints.push(JointDef {
        id: 0,
        jtype: JointType::Slide,
        dofadr: 0,
        body: 0,
        limited: false,
        range: (0.0, 0.0),
        margin: 0.0,
        solref_limit: rbconstraint_core::constants::DEFAULT_SOLREF,
        solimp_limit: rbconstraint_core::constants::DEFAULT_SOLIMP,
    });
    model.joints.push(JointDef {
        id: 1,
        jtype: JointType::Slide,
        dofadr: 1,
        body: 1,
        limited: false,
        range: (0.0, 0.0),
        margin: 0.0,
        solref_limit: rbconstraint_core::constants::DEFAULT_SOLREF,
        solimp_limit: rbconstraint_core::constants::DEFAULT_SOLIMP,
    });
    let mut eq_data = [0.0; rbconstraint_core::constants::MJ_NEQDATA];
    eq_data[1] = 2.0; // linear coefficient a1 = 2: joint1 should track 2*joint2
    model.equalities.push(EqualityDef {
        id: 0,
        kind: EqualityKind::Joint,
        obj1: ObjRef::Joint(0),
        obj2: Some(ObjRef::Joint(1)),
        data: eq_data,
        ref0: 0.0,
        ref1: 0.0,
        solref: rbconstraint_core::constants::DEFAULT_SOLREF,
        solimp: rbconstraint_core::constants::DEFAULT_SOLIMP,
    });

    let mut data = Data::new(2);
    data.jnt_qpos = vec![0.0, 0.5]; // joint1 should be at 1.0 (2x joint2's 0.5), but is at 0.0
    let (ne, _, _, _) = make_constraint(&model, &mut data).unwrap();
    assert_eq!(ne, 1);
    let row = &data.constraints.as_ref().unwrap().meta[0];
    assert!((row.pos - (0.0 - 1.0)).abs() < 1e-12);
}

#[test]
fn tendon_friction_row_uses_external_sparse_pattern() {
    let mut model = two_body_connect_model();
    model.tendons.push(TendonDef {
        id: 0,
        limited: false,
        range: (0.0, 0.0),
        margin: 0.0,
        frictionloss: 0.3,
        solref_limit: rbconstraint_core::constants::DEFAULT_SOLREF,
        solimp_limit: rbconstraint_core::constants::DEFAULT_SOLIMP,
        solref_friction: rbconstraint_core::constants::DEFAULT_SOLREF,
        solimp_friction: rbconstraint_core::constants::DEFAULT_SOLIMP,
        invweight0: 1.0,
    });
    let mut data = Data::new(2);
    data.tendon_length.push(0.0);
    data.tendon_jac.push(vec![(0, 1.0), (1, -1.0)]);
    let (_, nf, _, _) = make_constraint(&model, &mut data).unwrap();
    assert_eq!(nf, 1);
}
