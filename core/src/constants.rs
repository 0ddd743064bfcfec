//! Numerical constants that must match bit-for-bit across the core (§6).

/// Smallest value treated as nonzero; floor for `efc_R` and various divisions.
pub const MJ_MINVAL: f64 = 1e-15;
/// Lower bound for impedance `I`.
pub const MJ_MINIMP: f64 = 1e-4;
/// Upper bound for impedance `I`.
pub const MJ_MAXIMP: f64 = 1.0 - 1e-4;
/// Number of `solref` scalars.
pub const MJ_NREF: usize = 2;
/// Number of `solimp` scalars.
pub const MJ_NIMP: usize = 5;
/// Number of scalars in an equality constraint's `eq_data` payload.
pub const MJ_NEQDATA: usize = 11;
/// `jacobian = auto` resolves to sparse when `nv` is at least this large.
pub const SPARSE_AUTO_THRESHOLD_NV: usize = 60;

/// Default `solref` used when malformed input is sanitized.
pub const DEFAULT_SOLREF: [f64; MJ_NREF] = [0.02, 1.0];
/// Default `solimp` used when malformed input is sanitized.
pub const DEFAULT_SOLIMP: [f64; MJ_NIMP] = [0.9, 0.95, 0.001, 0.5, 2.0];
