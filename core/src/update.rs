//! §C9 — `referenceConstraint` and `constraintUpdate`: the per-row pass that
//! turns a built arena's raw position/Jacobian data into solver-ready
//! `(K, B, I, P, R, D, vel, aref, state)`, plus cost/force/cone-Hessian
//! evaluation given a trial force.

use crate::arena::ConstraintArena;
use crate::data::{Data, Warning};
use crate::jacobian::mul_jac_vec;
use crate::model::Model;
use crate::params::{impedance_and_deriv, kb_from_solref, r_and_d, sanitize_solimp, sanitize_solref};
use crate::types::{ConstraintType, DisableBits, RowState};

/// Fills in `vel`, `K`/`B`/`I`/`P`, `R`/`D`, and `aref` for every row
/// currently in `arena.meta`. Must run after all of §C4's instantiators.
pub fn reference_constraint(model: &Model, data: &Data, arena: &mut ConstraintArena, warnings: &mut Vec<Warning>) {
    let vel = mul_jac_vec(&arena.jac, &data.qvel);
    let disable = model.opt.disable;
    let override_all = disable.contains(DisableBits::OVERRIDE);
    let refsafe = !disable.contains(DisableBits::REFSAFE);

    for (i, m) in arena.meta.iter_mut().enumerate() {
        let (solref, solimp, margin) = if override_all {
            (model.opt.o_solref, model.opt.o_solimp, model.opt.o_margin)
        } else {
            (m.solref, m.solimp, m.margin)
        };
        let context = format!("row {i} ({:?} id={})", m.efc_type, m.id);
        let solref = sanitize_solref(solref, model.opt.timestep, refsafe, &context, warnings);
        let solimp = sanitize_solimp(solimp, &context, warnings);

        let adjusted_pos = m.pos - margin;
        let (imp, dimp) = impedance_and_deriv(solimp, adjusted_pos);
        let (k, b) = kb_from_solref(solref, imp);
        let (r, d) = r_and_d(m.diag_hint, imp);

        m.vel = vel[i];
        m.kbip = [k, b, imp, dimp];
        m.r = r;
        m.d = d;
        // aref: the reference (desired) constraint acceleration driving the
        // Baumgarte-style soft constraint toward zero violation.
        m.aref = -b * m.vel - k * imp * adjusted_pos;
    }
}

/// Classifies row `i` and returns `(cost, force)` for a trial constraint
/// force `force_trial` (§4.9). Equality rows are always quadratic; friction
/// and limit/contact rows split into the penetrating/active/satisfied
/// regions their cone type defines.
pub fn constraint_update(arena: &mut ConstraintArena, row: usize, force_trial: f64) -> (f64, f64) {
    let m = &mut arena.meta[row];
    let (state, force) = classify(m.efc_type, m.frictionloss, m.aref, m.d, force_trial);
    m.state = state;
    m.force = force;
    let cost = row_cost(state, m.r, m.aref, force);
    (cost, force)
}

fn classify(efc_type: ConstraintType, frictionloss: f64, aref: f64, d: f64, force_trial: f64) -> (RowState, f64) {
    if efc_type.is_equality() {
        return (RowState::Quadratic, force_trial);
    }
    if efc_type.is_friction() {
        let bound = frictionloss;
        if force_trial > bound {
            return (RowState::LinearPos, bound);
        }
        if force_trial < -bound {
            return (RowState::LinearNeg, -bound);
        }
        return (RowState::Quadratic, force_trial);
    }
    // limit / contact: unilateral, non-negative force, only active when
    // pushed past its reference acceleration.
    let _ = d;
    if aref >= 0.0 && force_trial <= 0.0 {
        (RowState::Satisfied, 0.0)
    } else if force_trial < 0.0 {
        (RowState::Satisfied, 0.0)
    } else {
        (RowState::Quadratic, force_trial)
    }
}

fn row_cost(state: RowState, r: f64, aref: f64, force: f64) -> f64 {
    match state {
        RowState::Satisfied => 0.0,
        RowState::LinearPos | RowState::LinearNeg => force * aref - 0.5 * r * force * force,
        RowState::Quadratic | RowState::Cone => force * aref - 0.5 * r * force * force,
    }
}

/// Classifies and updates a contiguous elliptic-cone contact block (§4.9).
/// `rows[0]` is the block's normal row, `rows[1..]` its tangential/
/// torsional/rolling rows in `Contact::friction` order. `mu` is the
/// contact's scalar friction coefficient; `mu_k` holds the per-direction
/// coefficient for each row in `rows[1..]` (so `mu_k.len() == rows.len() -
/// 1`). Every row in the block shares one state label. Returns the block's
/// summed cost and, only in the CONE state, the coupled cone Hessian — elsewhere
/// the Hessian is diagonal in `R` and needs no separate representation.
pub fn constraint_update_elliptic_block(
    arena: &mut ConstraintArena,
    rows: &[usize],
    mu: f64,
    mu_k: &[f64],
) -> (f64, Option<nalgebra::DMatrix<f64>>) {
    let jar: Vec<f64> = rows.iter().map(|&row| arena.meta[row].aref).collect();
    let d: Vec<f64> = rows.iter().map(|&row| arena.meta[row].d).collect();
    let r: Vec<f64> = rows.iter().map(|&row| arena.meta[row].r).collect();

    let u: Vec<f64> = std::iter::once(jar[0] * mu)
        .chain(jar[1..].iter().zip(mu_k).map(|(j, m)| j * m))
        .collect();
    let n = u[0];
    let t = u[1..].iter().map(|x| x * x).sum::<f64>().sqrt();
    let tangent_is_zero = t <= crate::constants::MJ_MINVAL;

    let (state, forces, cost, hessian) = if (tangent_is_zero && n >= 0.0) || (!tangent_is_zero && n >= mu * t) {
        (RowState::Satisfied, vec![0.0; rows.len()], 0.0, None)
    } else if (tangent_is_zero && n < 0.0) || (!tangent_is_zero && mu * n + t <= 0.0) {
        let forces: Vec<f64> = jar.iter().zip(&d).map(|(&j, &dj)| -dj * j).collect();
        let cost = jar.iter().zip(&d).map(|(&j, &dj)| 0.5 * dj * j * j).sum();
        (RowState::Quadratic, forces, cost, None)
    } else {
        let dm = d[0] / (mu * mu * (1.0 + mu * mu));
        let delta_nt = n - mu * t;
        let cost = 0.5 * dm * delta_nt * delta_nt;
        let f0 = -dm * delta_nt * mu;
        let mut forces = vec![f0];
        for k in 1..rows.len() {
            forces.push(-f0 / t * u[k] * mu_k[k - 1]);
        }
        let tangential_forces = forces[1..].to_vec();
        let hessian = cone_hessian(&r, forces[0], &tangential_forces);
        (RowState::Cone, forces, cost, Some(hessian))
    };

    for (&row, &force) in rows.iter().zip(&forces) {
        arena.meta[row].state = state;
        arena.meta[row].force = force;
    }
    (cost, hessian)
}

/// Cone-Hessian contribution for an elliptic-cone contact group (§4.9): the
/// second derivative of the group's cost with respect to its `dim` forces,
/// needed by Newton-style dual solvers. Diagonal in `R` away from the cone
/// boundary; `top`/`bottom` zones of the cone couple the normal force to
/// every tangential direction through the shared cone constraint.
pub fn cone_hessian(r: &[f64], normal_force: f64, tangential_forces: &[f64]) -> nalgebra::DMatrix<f64> {
    let n = 1 + tangential_forces.len();
    let mut h = nalgebra::DMatrix::zeros(n, n);
    let tangent_norm: f64 = tangential_forces.iter().map(|f| f * f).sum::<f64>().sqrt();

    if tangent_norm <= crate::constants::MJ_MINVAL {
        for i in 0..n {
            h[(i, i)] = 1.0 / r[i].max(crate::constants::MJ_MINVAL);
        }
        return h;
    }

    // Middle zone: inside the cone, diagonal like a quadratic cost.
    if tangent_norm < normal_force {
        for i in 0..n {
            h[(i, i)] = 1.0 / r[i].max(crate::constants::MJ_MINVAL);
        }
        return h;
    }

    // Top/bottom zones: project onto the cone surface, coupling normal and
    // tangential directions through the unit tangent direction.
    let unit: Vec<f64> = tangential_forces.iter().map(|f| f / tangent_norm).collect();
    let r0 = r[0].max(crate::constants::MJ_MINVAL);
    h[(0, 0)] = 1.0 / r0;
    for i in 0..tangential_forces.len() {
        let ri = r[i + 1].max(crate::constants::MJ_MINVAL);
        h[(0, i + 1)] = unit[i] / r0;
        h[(i + 1, 0)] = unit[i] / r0;
        for j in 0..tangential_forces.len() {
            let scale = if i == j { 1.0 } else { 0.0 };
            h[(i + 1, j + 1)] = (scale - unit[i] * unit[j]) / ri + unit[i] * unit[j] / r0;
        }
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{ConstraintArena, RowMeta, RowWrite};
    use crate::model::{MassCholesky, Options};
    use crate::types::ConstraintType;

    fn simple_model(nv: usize) -> Model {
        Model::new(
            nv,
            1,
            vec![0],
            vec![nv],
            vec![-1; nv],
            vec![(1.0, 1.0)],
            vec![1.0; nv],
            MassCholesky::identity(nv),
            Options::default(),
        )
    }

    #[test]
    fn reference_constraint_fills_nonzero_aref_for_violation() {
        let model = simple_model(1);
        let mut data = Data::new(1);
        data.qvel[0] = 0.0;
        let mut arena = ConstraintArena::new_dense(1, 1);
        let mut meta = RowMeta::blank(ConstraintType::Equality, 0);
        meta.solref = crate::constants::DEFAULT_SOLREF;
        meta.solimp = crate::constants::DEFAULT_SOLIMP;
        meta.diag_hint = 1.0;
        meta.pos = 0.1;
        arena.try_push_row(meta, RowWrite::Dense(&[1.0]));
        let mut warnings = Vec::new();
        reference_constraint(&model, &data, &mut arena, &mut warnings);
        assert!(arena.meta[0].aref < 0.0);
        assert!(arena.meta[0].r > 0.0);
    }

    #[test]
    fn friction_row_saturates_at_frictionloss_bound() {
        let (state, force) = classify(ConstraintType::FrictionDof, 2.0, 0.0, 1.0, 5.0);
        assert_eq!(state, RowState::LinearPos);
        assert_eq!(force, 2.0);
    }

    #[test]
    fn limit_row_is_satisfied_for_non_positive_trial_force_when_not_violated() {
        let (state, force) = classify(ConstraintType::LimitJoint, 0.0, 1.0, 1.0, -3.0);
        assert_eq!(state, RowState::Satisfied);
        assert_eq!(force, 0.0);
    }

    #[test]
    fn cone_hessian_is_diagonal_inside_the_cone() {
        let r = [1.0, 1.0, 1.0];
        let h = cone_hessian(&r, 10.0, &[1.0, 1.0]);
        assert!((h[(0, 1)]).abs() < 1e-12);
    }

    fn elliptic_block_arena(jar: [f64; 3], d: f64, r: f64) -> (ConstraintArena, Vec<usize>) {
        let mut arena = ConstraintArena::new_dense(1, 3);
        for j in jar {
            let mut meta = RowMeta::blank(ConstraintType::ContactElliptic, 0);
            meta.aref = j;
            meta.d = d;
            meta.r = r;
            arena.try_push_row(meta, RowWrite::Dense(&[1.0]));
        }
        (arena, vec![0, 1, 2])
    }

    #[test]
    fn elliptic_block_top_zone_is_satisfied_with_zero_force() {
        let (mut arena, rows) = elliptic_block_arena([1.0, 0.0, 0.0], 1.0, 1.0);
        let (cost, hessian) = constraint_update_elliptic_block(&mut arena, &rows, 1.0, &[1.0, 1.0]);
        assert_eq!(cost, 0.0);
        assert!(hessian.is_none());
        for &row in &rows {
            assert_eq!(arena.meta[row].state, RowState::Satisfied);
            assert_eq!(arena.meta[row].force, 0.0);
        }
    }

    #[test]
    fn elliptic_block_bottom_zone_is_quadratic_per_row() {
        let (mut arena, rows) = elliptic_block_arena([-1.0, 0.0, 0.0], 1.0, 1.0);
        let (cost, hessian) = constraint_update_elliptic_block(&mut arena, &rows, 1.0, &[1.0, 1.0]);
        assert!(hessian.is_none());
        assert_eq!(arena.meta[0].state, RowState::Quadratic);
        assert_eq!(arena.meta[0].force, 1.0);
        assert!((cost - 0.5).abs() < 1e-12);
    }

    #[test]
    fn elliptic_block_middle_zone_is_cone_with_hessian() {
        let (mut arena, rows) = elliptic_block_arena([0.5, 1.0, 0.0], 1.0, 1.0);
        let (_, hessian) = constraint_update_elliptic_block(&mut arena, &rows, 1.0, &[1.0, 1.0]);
        assert_eq!(arena.meta[0].state, RowState::Cone);
        assert_eq!(arena.meta[1].state, RowState::Cone);
        assert!(hessian.is_some());
    }
}
