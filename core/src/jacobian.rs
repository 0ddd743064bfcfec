//! §C7 — Jacobian products against the arena's stored rows, dense or sparse.

use nalgebra::DVector;

use crate::arena::JacobianStorage;

/// `J * v`, producing one scalar per constraint row.
pub fn mul_jac_vec(jac: &JacobianStorage, v: &[f64]) -> DVector<f64> {
    match jac {
        JacobianStorage::Dense(d) => {
            let mut out = DVector::zeros(d.rows.len());
            for (r, row) in d.rows.iter().enumerate() {
                let mut acc = 0.0;
                for (c, &val) in row.iter().enumerate() {
                    if val != 0.0 {
                        acc += val * v[c];
                    }
                }
                out[r] = acc;
            }
            out
        }
        JacobianStorage::Sparse(s) => {
            let nrows = s.rownnz.len();
            let mut out = DVector::zeros(nrows);
            for r in 0..nrows {
                let (cols, vals) = s.row(r);
                let mut acc = 0.0;
                for (&c, &val) in cols.iter().zip(vals.iter()) {
                    acc += val * v[c as usize];
                }
                out[r] = acc;
            }
            out
        }
    }
}

/// `J^T * f`, producing one scalar per dof (`nv`-long).
pub fn mul_jac_t_vec(jac: &JacobianStorage, f: &[f64]) -> DVector<f64> {
    match jac {
        JacobianStorage::Dense(d) => {
            let mut out = DVector::zeros(d.nv);
            for (r, row) in d.rows.iter().enumerate() {
                let fr = f[r];
                if fr == 0.0 {
                    continue;
                }
                for (c, &val) in row.iter().enumerate() {
                    out[c] += val * fr;
                }
            }
            out
        }
        JacobianStorage::Sparse(s) => {
            let mut out = DVector::zeros(s.nv);
            for r in 0..s.rownnz.len() {
                let fr = f[r];
                if fr == 0.0 {
                    continue;
                }
                let (cols, vals) = s.row(r);
                for (&c, &val) in cols.iter().zip(vals.iter()) {
                    out[c as usize] += val * fr;
                }
            }
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{ConstraintArena, RowMeta, RowWrite};
    use crate::types::ConstraintType;

    #[test]
    fn dense_and_sparse_agree_on_same_logical_jacobian() {
        let mut dense = ConstraintArena::new_dense(4, 2);
        dense.try_push_row(RowMeta::blank(ConstraintType::Equality, 0), RowWrite::Dense(&[1.0, 0.0, 2.0, 0.0]));
        dense.try_push_row(RowMeta::blank(ConstraintType::Equality, 0), RowWrite::Dense(&[0.0, 3.0, 0.0, 0.0]));

        let mut sparse = ConstraintArena::new_sparse(4, 2, 8);
        sparse.try_push_row(
            RowMeta::blank(ConstraintType::Equality, 0),
            RowWrite::Sparse { cols: &[0, 2], vals: &[1.0, 2.0] },
        );
        sparse.try_push_row(
            RowMeta::blank(ConstraintType::Equality, 0),
            RowWrite::Sparse { cols: &[1], vals: &[3.0] },
        );

        let v = [1.0, 2.0, 3.0, 4.0];
        let jd = mul_jac_vec(&dense.jac, &v);
        let js = mul_jac_vec(&sparse.jac, &v);
        assert_eq!(jd.as_slice(), js.as_slice());

        let f = [5.0, 6.0];
        let td = mul_jac_t_vec(&dense.jac, &f);
        let ts = mul_jac_t_vec(&sparse.jac, &f);
        assert_eq!(td.as_slice(), ts.as_slice());
    }
}
