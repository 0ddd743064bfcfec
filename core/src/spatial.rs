//! Spatial-vector helpers consumed from the kinematics collaborator (§1, §9).
//!
//! Body/tendon kinematics are an external collaborator: we never compute
//! joint axes or propagate configurations ourselves. What we *do* consume is
//! `Data::cdof`, one spatial motion axis per dof expressed in the world
//! frame about the world origin (the same convention MuJoCo's `cdof` uses).
//! From that, this module builds point/frame Jacobian columns and the
//! "paired Jacobian difference" operation that Connect, Weld, and Contact
//! all need (§9 design notes).

use nalgebra::{DMatrix, Vector3};

/// One dof's spatial motion axis: angular part, and linear part taken about
/// the world origin (a Plücker line, not about the dof's own anchor).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DofMotionAxis {
    pub angular: Vector3<f64>,
    pub linear: Vector3<f64>,
}

impl DofMotionAxis {
    pub const ZERO: DofMotionAxis = DofMotionAxis {
        angular: Vector3::new(0.0, 0.0, 0.0),
        linear: Vector3::new(0.0, 0.0, 0.0),
    };

    /// Linear velocity contribution of this dof at `point` (world frame).
    pub fn linear_at(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.linear + self.angular.cross(point)
    }
}

/// Translational Jacobian (3 rows) of a world point rigidly attached to a
/// body, restricted to `chain` (ascending dof indices from §C2). Column `j`
/// of the result corresponds to `chain[j]`.
pub fn point_jacobian(cdof: &[DofMotionAxis], chain: &[usize], point: &Vector3<f64>) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(3, chain.len());
    for (j, &dof) in chain.iter().enumerate() {
        let v = cdof[dof].linear_at(point);
        out[(0, j)] = v.x;
        out[(1, j)] = v.y;
        out[(2, j)] = v.z;
    }
    out
}

/// Angular-velocity Jacobian (3 rows) restricted to `chain`.
pub fn angular_jacobian(cdof: &[DofMotionAxis], chain: &[usize]) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(3, chain.len());
    for (j, &dof) in chain.iter().enumerate() {
        let a = cdof[dof].angular;
        out[(0, j)] = a.x;
        out[(1, j)] = a.y;
        out[(2, j)] = a.z;
    }
    out
}

/// Six-row [linear; angular] Jacobian restricted to `chain`.
pub fn frame_jacobian(cdof: &[DofMotionAxis], chain: &[usize], point: &Vector3<f64>) -> DMatrix<f64> {
    let jp = point_jacobian(cdof, chain, point);
    let jr = angular_jacobian(cdof, chain);
    let mut out = DMatrix::zeros(6, chain.len());
    out.view_mut((0, 0), (3, chain.len())).copy_from(&jp);
    out.view_mut((3, 0), (3, chain.len())).copy_from(&jr);
    out
}

/// Scatter a Jacobian block computed over `local_chain` into a wider block
/// over `merged_chain` (a superset, ascending). `merged_chain` is typically
/// the output of the dof-chain merger (§C2) for a body pair; `local_chain`
/// is the chain for just one of the two bodies. Columns of `local_chain`
/// not present in `merged_chain` are a caller error and are skipped.
pub fn scatter_into(block: &DMatrix<f64>, local_chain: &[usize], merged_chain: &[usize]) -> DMatrix<f64> {
    let rows = block.nrows();
    let mut out = DMatrix::zeros(rows, merged_chain.len());
    for (lj, &dof) in local_chain.iter().enumerate() {
        if let Ok(mj) = merged_chain.binary_search(&dof) {
            for r in 0..rows {
                out[(r, mj)] = block[(r, lj)];
            }
        }
    }
    out
}

/// The "paired Jacobian difference" (§9): Jacobian of a quantity anchored on
/// `body_b` minus the same quantity anchored on `body_a`, both expressed
/// over the merged chain of the pair.
pub fn paired_difference(
    block_a: &DMatrix<f64>,
    chain_a: &[usize],
    block_b: &DMatrix<f64>,
    chain_b: &[usize],
    merged_chain: &[usize],
) -> DMatrix<f64> {
    let a = scatter_into(block_a, chain_a, merged_chain);
    let b = scatter_into(block_b, chain_b, merged_chain);
    b - a
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis_x_translate() -> DofMotionAxis {
        DofMotionAxis {
            angular: Vector3::zeros(),
            linear: Vector3::new(1.0, 0.0, 0.0),
        }
    }

    fn axis_z_rotate() -> DofMotionAxis {
        DofMotionAxis {
            angular: Vector3::new(0.0, 0.0, 1.0),
            linear: Vector3::zeros(),
        }
    }

    #[test]
    fn point_jacobian_translation_is_identity_column() {
        let cdof = vec![axis_x_translate()];
        let j = point_jacobian(&cdof, &[0], &Vector3::new(3.0, 4.0, 5.0));
        assert_eq!(j.column(0), nalgebra::DVector::from_vec(vec![1.0, 0.0, 0.0]).column(0));
    }

    #[test]
    fn point_jacobian_rotation_crosses_lever_arm() {
        let cdof = vec![axis_z_rotate()];
        let point = Vector3::new(2.0, 0.0, 0.0);
        let j = point_jacobian(&cdof, &[0], &point);
        // omega=(0,0,1) x r=(2,0,0) = (0,2,0)
        assert!((j[(0, 0)] - 0.0).abs() < 1e-12);
        assert!((j[(1, 0)] - 2.0).abs() < 1e-12);
        assert!((j[(2, 0)] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn scatter_into_places_columns_at_merged_positions() {
        let block = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let out = scatter_into(&block, &[1, 3], &[0, 1, 2, 3]);
        assert_eq!(out.ncols(), 4);
        assert_eq!(out[(0, 0)], 0.0);
        assert_eq!(out[(0, 1)], 1.0);
        assert_eq!(out[(0, 2)], 0.0);
        assert_eq!(out[(0, 3)], 2.0);
    }

    #[test]
    fn paired_difference_subtracts_over_union_chain() {
        let a = DMatrix::from_row_slice(1, 1, &[5.0]);
        let b = DMatrix::from_row_slice(1, 1, &[9.0]);
        let out = paired_difference(&a, &[0], &b, &[2], &[0, 2]);
        assert_eq!(out[(0, 0)], -5.0);
        assert_eq!(out[(0, 1)], 9.0);
    }
}
