//! §C6 — parameter assembly: solver-reference sanitization, the impedance
//! profile, `(K, B, I, P)`, the `R`/`D` relation, and the friction-cone `R`
//! coupling for multi-row contacts.

use crate::constants::{DEFAULT_SOLIMP, DEFAULT_SOLREF, MJ_MAXIMP, MJ_MINIMP, MJ_MINVAL};
use crate::data::Warning;
use crate::types::ConeType;

/// Validate and, if necessary, replace a malformed `solref` pair (§4.6).
/// Standard form requires both entries positive; direct form requires both
/// non-positive. Anything else is replaced with [`DEFAULT_SOLREF`].
pub fn sanitize_solref(
    solref: [f64; 2],
    timestep: f64,
    refsafe: bool,
    context: &str,
    warnings: &mut Vec<Warning>,
) -> [f64; 2] {
    let standard = solref[0] > 0.0 && solref[1] > 0.0;
    let direct = solref[0] <= 0.0 && solref[1] <= 0.0;
    let mut out = if standard || direct {
        solref
    } else {
        warnings.push(Warning::BadSolref { context: context.to_string() });
        DEFAULT_SOLREF
    };
    if refsafe && out[0] > 0.0 {
        out[0] = out[0].max(2.0 * timestep);
    }
    out
}

/// Validate and, if necessary, replace a malformed `solimp` tuple (§4.6).
pub fn sanitize_solimp(solimp: [f64; 5], context: &str, warnings: &mut Vec<Warning>) -> [f64; 5] {
    let [d0, d1, width, midpoint, power] = solimp;
    let valid = d0 >= MJ_MINIMP
        && d0 <= MJ_MAXIMP
        && d1 >= MJ_MINIMP
        && d1 <= MJ_MAXIMP
        && width > 0.0
        && midpoint > 0.0
        && midpoint < 1.0
        && power >= 1.0;
    if valid {
        solimp
    } else {
        warnings.push(Warning::BadSolimp { context: context.to_string() });
        DEFAULT_SOLIMP
    }
}

/// Impedance profile `I(x)`: a smooth ramp from `solimp[0]` to `solimp[1]`
/// centered on the `midpoint` fraction of `width`, raised to `power`.
pub fn impedance(solimp: [f64; 5], pos: f64) -> f64 {
    impedance_and_deriv(solimp, pos).0
}

/// `(I(x), dI/dx)` — the impedance and its derivative with respect to
/// (signed) constraint position, needed by Newton-style dual solvers. The
/// ramp is a power law scaled to pass through `(midpoint, midpoint)`,
/// mirrored across the midpoint so both halves land smoothly at `x=0`/`x=1`.
pub fn impedance_and_deriv(solimp: [f64; 5], pos: f64) -> (f64, f64) {
    let [dmin, dmax, width, midpoint, power] = solimp;
    let width = width.max(MJ_MINVAL);
    let sign = if pos < 0.0 { -1.0 } else { 1.0 };
    let x = pos.abs() / width;

    if x >= 1.0 {
        return (dmax.clamp(MJ_MINIMP, MJ_MAXIMP), 0.0);
    }
    if x <= 0.0 {
        return (dmin.clamp(MJ_MINIMP, MJ_MAXIMP), 0.0);
    }

    let (y, dy_dx) = if (power - 1.0).abs() < MJ_MINVAL {
        (x, 1.0)
    } else if x <= midpoint {
        let m = midpoint.max(MJ_MINVAL);
        let scale = 1.0 / m.powf(power - 1.0);
        (scale * x.powf(power), scale * power * x.powf(power - 1.0))
    } else {
        let span = (1.0 - midpoint).max(MJ_MINVAL);
        let scale = 1.0 / span.powf(power - 1.0);
        let u = 1.0 - x;
        (1.0 - scale * u.powf(power), scale * power * u.powf(power - 1.0))
    };

    let imp = (dmin + y * (dmax - dmin)).clamp(MJ_MINIMP, MJ_MAXIMP);
    let dimp = dy_dx * sign * (dmax - dmin) / width;
    (imp, dimp)
}

/// `(K, B)` stiffness/damping from a sanitized `solref`, either the direct
/// form (`solref` negative, scaled by impedance) or the standard
/// timeconst/dampratio form.
pub fn kb_from_solref(solref: [f64; 2], imp: f64) -> (f64, f64) {
    if solref[0] <= 0.0 || solref[1] <= 0.0 {
        let imp = imp.max(MJ_MINVAL);
        (-solref[0] / (imp * imp), -solref[1] / imp)
    } else {
        let timeconst = solref[0].max(MJ_MINVAL);
        let dampratio = solref[1];
        (1.0 / (timeconst * timeconst * dampratio * dampratio), 2.0 / timeconst)
    }
}

/// Diagonal inertia approximation feeding `R`: the inverse-weight supplied by
/// the model for this row's dofs/bodies/tendon, optionally scaled by
/// `impratio` (contacts only: tangential/torsional/rolling rows are softer
/// than the normal row by this ratio).
pub fn diag_approx(invweight: f64, impratio: f64) -> f64 {
    (invweight * impratio).max(MJ_MINVAL)
}

/// `R` (compliance) and `D = 1/R` from the diagonal approximation and
/// impedance (§4.6's R/D relation).
pub fn r_and_d(diag: f64, imp: f64) -> (f64, f64) {
    let imp = imp.clamp(MJ_MINIMP, MJ_MAXIMP);
    let r = (diag * (1.0 - imp) / imp).max(MJ_MINVAL);
    (r, 1.0 / r)
}

/// Couples a friction row's `R` to its contact's normal-row `R` by the
/// corresponding friction coefficient (§4.6): direction `i` (1-indexed
/// within the contact, `0` is the normal) softens by `1/friction[i-1]^2`.
/// `row_in_group` is the row's position within its contact's pyramidal
/// pair/elliptic direction group; for pyramidal cones, two edges per
/// tangential direction share the same coupled `R`.
pub fn contact_row_r(normal_r: f64, friction_index: Option<usize>, friction: &[f64; 5]) -> f64 {
    match friction_index {
        None => normal_r,
        Some(i) => {
            let mu = friction[i].max(MJ_MINVAL);
            normal_r / (mu * mu)
        }
    }
}

/// Maps a contact row's position within its group (0 = normal) to the
/// `friction[]` index it's coupled to, for both cone types.
pub fn friction_index_for_row(row_in_group: usize, dim: usize, cone: ConeType) -> Option<usize> {
    if row_in_group == 0 {
        return None;
    }
    match cone {
        ConeType::Elliptic => Some(row_in_group - 1),
        ConeType::Pyramidal => {
            let _ = dim;
            Some((row_in_group - 1) / 2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solref_standard_form_passes_through() {
        let mut w = Vec::new();
        let r = sanitize_solref([0.02, 1.0], 0.002, false, "x", &mut w);
        assert_eq!(r, [0.02, 1.0]);
        assert!(w.is_empty());
    }

    #[test]
    fn solref_mixed_signs_are_rejected() {
        let mut w = Vec::new();
        let r = sanitize_solref([0.02, -1.0], 0.002, false, "x", &mut w);
        assert_eq!(r, DEFAULT_SOLREF);
        assert_eq!(w.len(), 1);
    }

    #[test]
    fn refsafe_clamps_small_timeconst() {
        let mut w = Vec::new();
        let r = sanitize_solref([0.0001, 1.0], 0.002, true, "x", &mut w);
        assert_eq!(r[0], 0.004);
    }

    #[test]
    fn impedance_is_monotonic_and_bounded() {
        let solimp = DEFAULT_SOLIMP;
        let i0 = impedance(solimp, 0.0);
        let i1 = impedance(solimp, 10.0);
        assert!(i0 >= MJ_MINIMP && i0 <= MJ_MAXIMP);
        assert!(i1 >= MJ_MINIMP && i1 <= MJ_MAXIMP);
        assert!(i1 >= i0);
    }

    #[test]
    fn r_and_d_are_reciprocal() {
        let (r, d) = r_and_d(1.0, 0.9);
        assert!((r * d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn direct_solref_scales_by_impedance() {
        let (k, b) = kb_from_solref([-100.0, -10.0], 0.5);
        assert!((k - 400.0).abs() < 1e-9);
        assert!((b - 20.0).abs() < 1e-9);
    }

    #[test]
    fn impedance_with_non_default_midpoint_passes_through_it() {
        // dmin=0.5, dmax=0.9, width=1.0, midpoint=0.3, power=2.
        let solimp = [0.5, 0.9, 1.0, 0.3, 2.0];
        let (imp_at_mid, _) = impedance_and_deriv(solimp, 0.3);
        assert!((imp_at_mid - (0.5 + 0.3 * 0.4)).abs() < 1e-9);

        let (imp, dimp) = impedance_and_deriv(solimp, 0.15);
        // y = (1/0.3) * 0.15^2 = 0.075, imp = 0.5 + 0.075*0.4
        assert!((imp - (0.5 + 0.075 * 0.4)).abs() < 1e-9);
        // dy/dx = (1/0.3)*2*0.15 = 1.0, dimp = 1.0 * 0.4 / 1.0
        assert!((dimp - 0.4).abs() < 1e-9);
    }
}
