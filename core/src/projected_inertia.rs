//! §C8 — projected constraint inertia `A_R = J M^-1 J^T + diag(R)`, needed
//! only by dual solvers ([`crate::types::SolverType::is_dual`]). Built from
//! the cached mass Cholesky half-factor by back-substitution against each
//! constraint row; the factorization itself is a Non-goal.

use std::collections::BTreeMap;

use nalgebra::DMatrix;

use crate::arena::JacobianStorage;
use crate::model::MassCholesky;

/// One row of `X`, where `X^T X = J M^-1 J^T`: sparse `(dof, value)` pairs,
/// ascending by dof.
fn solve_row_sparse(mass: &MassCholesky, cols: &[i32], vals: &[f64]) -> Vec<(usize, f64)> {
    let mut acc: BTreeMap<usize, f64> =
        cols.iter().zip(vals.iter()).map(|(&c, &v)| (c as usize, v)).collect();
    let mut x = Vec::with_capacity(acc.len());
    while let Some((&dof, _)) = acc.iter().next_back() {
        let val = acc.remove(&dof).unwrap();
        let xi = val * mass.diag_sqrt_inv[dof];
        for &(anc, lval) in &mass.l_entries[dof] {
            *acc.entry(anc).or_insert(0.0) -= lval * xi;
        }
        x.push((dof, xi));
    }
    x.sort_unstable_by_key(|&(d, _)| d);
    x
}

fn dot_sparse(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

fn solve_row_dense(l: &DMatrix<f64>, diag_sqrt_inv: &[f64], row: &[f64]) -> Vec<f64> {
    let nv = row.len();
    let mut y = vec![0.0; nv];
    for i in 0..nv {
        let mut acc = row[i];
        for j in 0..i {
            if l[(i, j)] != 0.0 {
                acc -= l[(i, j)] * y[j];
            }
        }
        y[i] = acc;
    }
    (0..nv).map(|i| y[i] * diag_sqrt_inv[i]).collect()
}

/// Build `A_R` for every row currently in `jac`, adding `r[row]` to the
/// diagonal.
pub fn projected_inertia(mass: &MassCholesky, jac: &JacobianStorage, r: &[f64]) -> DMatrix<f64> {
    match jac {
        JacobianStorage::Dense(d) => {
            let l = mass.to_dense_l();
            let xs: Vec<Vec<f64>> =
                d.rows.iter().map(|row| solve_row_dense(&l, &mass.diag_sqrt_inv, row)).collect();
            let n = xs.len();
            let mut a = DMatrix::zeros(n, n);
            for i in 0..n {
                for j in 0..n {
                    a[(i, j)] = xs[i].iter().zip(xs[j].iter()).map(|(a, b)| a * b).sum();
                }
                a[(i, i)] += r[i];
            }
            a
        }
        JacobianStorage::Sparse(s) => {
            let n = s.rownnz.len();
            let xs: Vec<Vec<(usize, f64)>> = (0..n)
                .map(|row| {
                    let (cols, vals) = s.row(row);
                    solve_row_sparse(mass, cols, vals)
                })
                .collect();
            let mut a = DMatrix::zeros(n, n);
            for i in 0..n {
                for j in 0..n {
                    a[(i, j)] = dot_sparse(&xs[i], &xs[j]);
                }
                a[(i, i)] += r[i];
            }
            a
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{ConstraintArena, RowMeta, RowWrite};
    use crate::types::ConstraintType;

    #[test]
    fn identity_mass_reduces_to_j_jt_plus_diag_r() {
        let mass = MassCholesky::identity(3);
        let mut arena = ConstraintArena::new_dense(3, 2);
        arena.try_push_row(RowMeta::blank(ConstraintType::Equality, 0), RowWrite::Dense(&[1.0, 0.0, 0.0]));
        arena.try_push_row(RowMeta::blank(ConstraintType::Equality, 0), RowWrite::Dense(&[0.0, 1.0, 1.0]));
        let r = [0.1, 0.2];
        let a = projected_inertia(&mass, &arena.jac, &r);
        assert!((a[(0, 0)] - 1.1).abs() < 1e-12);
        assert!((a[(1, 1)] - 2.2).abs() < 1e-12);
        assert!((a[(0, 1)] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn dense_and_sparse_agree() {
        let mut mass = MassCholesky::identity(3);
        mass.l_entries[2].push((0, 0.5));
        mass.diag_sqrt_inv = vec![1.0, 1.0, 0.8];

        let mut dense = ConstraintArena::new_dense(3, 1);
        dense.try_push_row(RowMeta::blank(ConstraintType::Equality, 0), RowWrite::Dense(&[1.0, 0.0, 1.0]));
        let mut sparse = ConstraintArena::new_sparse(3, 1, 4);
        sparse.try_push_row(
            RowMeta::blank(ConstraintType::Equality, 0),
            RowWrite::Sparse { cols: &[0, 2], vals: &[1.0, 1.0] },
        );

        let r = [0.0];
        let ad = projected_inertia(&mass, &dense.jac, &r);
        let as_ = projected_inertia(&mass, &sparse.jac, &r);
        assert!((ad[(0, 0)] - as_[(0, 0)]).abs() < 1e-9);
    }
}
