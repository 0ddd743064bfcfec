//! §C1 — the constraint-row arena. Rows and Jacobian non-zeros are bump
//! allocated into pre-sized buffers after a precount (§C5); nothing here
//! grows past the capacity fixed at construction, by design: `try_push_row`
//! reports `CapacityExceeded` instead of reallocating, mirroring the original
//! fixed-buffer allocator this is translated from.

use crate::types::{ConstraintType, RowState};

/// Per-row metadata, independent of the Jacobian storage layout.
#[derive(Debug, Clone)]
pub struct RowMeta {
    pub efc_type: ConstraintType,
    /// Id of the owning joint/tendon/equality/contact in the model, for
    /// traceability (`efc_id`).
    pub id: usize,
    pub solref: [f64; crate::constants::MJ_NREF],
    pub solimp: [f64; crate::constants::MJ_NIMP],
    pub margin: f64,
    pub frictionloss: f64,
    /// Diagonal inertia approximation for this row (§C6 `diagApprox`),
    /// precomputed by the instantiator that knows which dofs/bodies/tendon
    /// it is built from and whether `impratio` applies.
    pub diag_hint: f64,
    /// `(k, b, i, p)` — stiffness, damping, impedance, impedance derivative.
    pub kbip: [f64; 4],
    pub r: f64,
    pub d: f64,
    pub pos: f64,
    pub vel: f64,
    pub aref: f64,
    pub force: f64,
    pub state: RowState,
}

impl RowMeta {
    pub(crate) fn blank(efc_type: ConstraintType, id: usize) -> Self {
        RowMeta {
            efc_type,
            id,
            solref: [0.0; crate::constants::MJ_NREF],
            solimp: [0.0; crate::constants::MJ_NIMP],
            margin: 0.0,
            frictionloss: 0.0,
            diag_hint: 1.0,
            kbip: [0.0; 4],
            r: 0.0,
            d: 0.0,
            pos: 0.0,
            vel: 0.0,
            aref: 0.0,
            force: 0.0,
            state: RowState::Quadratic,
        }
    }
}

/// Dense Jacobian storage: `nv`-wide rows, one per constraint.
#[derive(Debug, Clone)]
pub struct DenseJacobian {
    pub nv: usize,
    pub rows: Vec<Vec<f64>>,
}

impl DenseJacobian {
    fn with_capacity(nv: usize, capacity_rows: usize) -> Self {
        DenseJacobian { nv, rows: Vec::with_capacity(capacity_rows) }
    }

    fn push_row(&mut self, row: Vec<f64>) {
        debug_assert_eq!(row.len(), self.nv);
        self.rows.push(row);
    }
}

/// Sparse Jacobian storage, CSR-like with a supernode count per row (§C1,
/// §C3). `rowsuper[r]` is how many rows from `r` onward (inclusive) share
/// exactly the same column pattern as `r` — rows built back to back for a
/// single multi-dof constraint collapse into one supernode.
#[derive(Debug, Clone)]
pub struct SparseJacobian {
    pub nv: usize,
    pub rowadr: Vec<usize>,
    pub rownnz: Vec<usize>,
    pub rowsuper: Vec<usize>,
    pub colind: Vec<i32>,
    pub data: Vec<f64>,
    capacity_nnz: usize,
}

impl SparseJacobian {
    fn with_capacity(nv: usize, capacity_rows: usize, capacity_nnz: usize) -> Self {
        SparseJacobian {
            nv,
            rowadr: Vec::with_capacity(capacity_rows),
            rownnz: Vec::with_capacity(capacity_rows),
            rowsuper: Vec::with_capacity(capacity_rows),
            colind: Vec::with_capacity(capacity_nnz),
            data: Vec::with_capacity(capacity_nnz),
            capacity_nnz,
        }
    }

    fn remaining_nnz(&self) -> usize {
        self.capacity_nnz - self.colind.len()
    }

    /// `cols` must be strictly ascending dof indices (a dof-chain slice).
    fn push_row(&mut self, cols: &[usize], vals: &[f64]) {
        debug_assert_eq!(cols.len(), vals.len());
        let adr = self.colind.len();
        self.rowadr.push(adr);
        self.rownnz.push(cols.len());
        for (&c, &v) in cols.iter().zip(vals.iter()) {
            self.colind.push(c as i32);
            self.data.push(v);
        }
        self.rowsuper.push(1);
        self.recompute_supernode_for_new_row(cols);
    }

    fn recompute_supernode_for_new_row(&mut self, cols: &[usize]) {
        let new_row = self.rownnz.len() - 1;
        if new_row == 0 {
            return;
        }
        let prev_adr = self.rowadr[new_row - 1];
        let prev_nnz = self.rownnz[new_row - 1];
        let prev_cols = &self.colind[prev_adr..prev_adr + prev_nnz];
        let same_pattern =
            prev_cols.len() == cols.len() && prev_cols.iter().zip(cols.iter()).all(|(&a, &b)| a as usize == b);
        if same_pattern {
            // extend every supernode run that ends at new_row - 1 backward by one.
            let mut r = new_row;
            loop {
                if r == 0 {
                    break;
                }
                r -= 1;
                if self.rowsuper[r] >= new_row - r {
                    self.rowsuper[r] = new_row - r + 1;
                } else {
                    break;
                }
                if r == 0 {
                    break;
                }
            }
        }
    }

    pub fn row(&self, r: usize) -> (&[i32], &[f64]) {
        let adr = self.rowadr[r];
        let nnz = self.rownnz[r];
        (&self.colind[adr..adr + nnz], &self.data[adr..adr + nnz])
    }
}

#[derive(Debug, Clone)]
pub enum JacobianStorage {
    Dense(DenseJacobian),
    Sparse(SparseJacobian),
}

#[derive(Debug, Clone)]
pub struct ConstraintArena {
    capacity_rows: usize,
    pub meta: Vec<RowMeta>,
    pub jac: JacobianStorage,
}

pub enum RowWrite<'a> {
    Dense(&'a [f64]),
    Sparse { cols: &'a [usize], vals: &'a [f64] },
}

impl ConstraintArena {
    pub fn new_dense(nv: usize, capacity_rows: usize) -> Self {
        ConstraintArena {
            capacity_rows,
            meta: Vec::with_capacity(capacity_rows),
            jac: JacobianStorage::Dense(DenseJacobian::with_capacity(nv, capacity_rows)),
        }
    }

    pub fn new_sparse(nv: usize, capacity_rows: usize, capacity_nnz: usize) -> Self {
        ConstraintArena {
            capacity_rows,
            meta: Vec::with_capacity(capacity_rows),
            jac: JacobianStorage::Sparse(SparseJacobian::with_capacity(nv, capacity_rows, capacity_nnz)),
        }
    }

    pub fn len_rows(&self) -> usize {
        self.meta.len()
    }

    pub fn capacity_rows(&self) -> usize {
        self.capacity_rows
    }

    pub fn is_full(&self) -> bool {
        self.meta.len() >= self.capacity_rows
    }

    /// Appends one row. Returns `false` (and leaves the arena untouched) if
    /// row or non-zero capacity would be exceeded; the caller is expected to
    /// surface this as a non-fatal [`crate::data::Warning`].
    pub fn try_push_row(&mut self, meta: RowMeta, write: RowWrite<'_>) -> bool {
        if self.is_full() {
            return false;
        }
        match (&mut self.jac, write) {
            (JacobianStorage::Dense(d), RowWrite::Dense(row)) => {
                d.push_row(row.to_vec());
            }
            (JacobianStorage::Sparse(s), RowWrite::Sparse { cols, vals }) => {
                if vals.len() > s.remaining_nnz() {
                    return false;
                }
                s.push_row(cols, vals);
            }
            _ => panic!("row write kind does not match arena jacobian storage"),
        }
        self.meta.push(meta);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_meta() -> RowMeta {
        RowMeta::blank(ConstraintType::Equality, 0)
    }

    #[test]
    fn dense_arena_rejects_past_capacity() {
        let mut arena = ConstraintArena::new_dense(3, 1);
        assert!(arena.try_push_row(blank_meta(), RowWrite::Dense(&[1.0, 0.0, 0.0])));
        assert!(!arena.try_push_row(blank_meta(), RowWrite::Dense(&[0.0, 1.0, 0.0])));
        assert_eq!(arena.len_rows(), 1);
    }

    #[test]
    fn sparse_arena_tracks_supernodes_for_identical_patterns() {
        let mut arena = ConstraintArena::new_sparse(4, 4, 16);
        for _ in 0..3 {
            assert!(arena.try_push_row(blank_meta(), RowWrite::Sparse { cols: &[0, 2], vals: &[1.0, 2.0] }));
        }
        if let JacobianStorage::Sparse(s) = &arena.jac {
            assert_eq!(s.rowsuper[0], 3);
            assert_eq!(s.rowsuper[1], 2);
            assert_eq!(s.rowsuper[2], 1);
        } else {
            panic!("expected sparse storage");
        }
    }

    #[test]
    fn sparse_arena_rejects_past_nnz_capacity() {
        let mut arena = ConstraintArena::new_sparse(4, 8, 2);
        assert!(arena.try_push_row(blank_meta(), RowWrite::Sparse { cols: &[0, 1], vals: &[1.0, 1.0] }));
        assert!(!arena.try_push_row(blank_meta(), RowWrite::Sparse { cols: &[2], vals: &[1.0] }));
    }
}
