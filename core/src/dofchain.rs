//! §C2 — dof-chain merger. A two-body constraint only touches the dofs on
//! the kinematic path from each body up to the world, so every Jacobian row
//! is built over the *union* of those two chains rather than all `nv` dofs.

use crate::model::Model;

/// Ascending list of dofs on `body`'s own path to the world (its chain of
/// ancestors via `dof_parentid`, walked from the leaf dof back to the root).
pub fn single_chain(model: &Model, body: usize) -> Vec<usize> {
    let mut chain = Vec::new();
    let Some(mut dof) = model.body_leaf_dof(body) else {
        return chain;
    };
    loop {
        chain.push(dof);
        match model.dof_parentid[dof] {
            p if p >= 0 => dof = p as usize,
            _ => break,
        }
    }
    chain.reverse();
    chain
}

/// Ascending union of `body_a`'s and `body_b`'s chains. Built by walking both
/// chains from their leaves toward the root simultaneously, always emitting
/// the larger current dof index and advancing whichever side(s) produced it,
/// then reversing the descending output to ascending order.
pub fn merge_dof_chain(model: &Model, body_a: usize, body_b: usize) -> Vec<usize> {
    if model.is_body_simple(body_a) && model.is_body_simple(body_b) {
        // Fast path: with no shared ancestry possible for either side, the
        // union is just each chain concatenated and sorted.
        let mut merged: Vec<usize> = single_chain(model, body_a)
            .into_iter()
            .chain(single_chain(model, body_b))
            .collect();
        merged.sort_unstable();
        merged.dedup();
        return merged;
    }

    let mut a = model.body_leaf_dof(body_a);
    let mut b = model.body_leaf_dof(body_b);
    let mut descending = Vec::new();

    loop {
        match (a, b) {
            (None, None) => break,
            (Some(da), None) => {
                descending.push(da);
                a = advance(model, da);
            }
            (None, Some(db)) => {
                descending.push(db);
                b = advance(model, db);
            }
            (Some(da), Some(db)) => {
                if da == db {
                    descending.push(da);
                    a = advance(model, da);
                    b = advance(model, db);
                } else if da > db {
                    descending.push(da);
                    a = advance(model, da);
                } else {
                    descending.push(db);
                    b = advance(model, db);
                }
            }
        }
    }

    descending.reverse();
    descending
}

fn advance(model: &Model, dof: usize) -> Option<usize> {
    match model.dof_parentid[dof] {
        p if p >= 0 => Some(p as usize),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MassCholesky, Options};

    fn chain_model() -> Model {
        // dof layout: 0 (root of body1's chain), 1 (child of 0, body1's leaf),
        // 2 (root of body2's chain, independent), 3 (child of 2, body2's leaf).
        // body 0: dofs 0,1 ; body 1: dofs 2,3 ; no shared ancestry (simple).
        let nv = 4;
        let nbody = 2;
        Model::new(
            nv,
            nbody,
            vec![0, 2],
            vec![2, 2],
            vec![-1, 0, -1, 2],
            vec![(1.0, 1.0); nbody],
            vec![1.0; nv],
            MassCholesky::identity(nv),
            Options::default(),
        )
    }

    #[test]
    fn simple_bodies_merge_to_sorted_union() {
        let model = chain_model();
        let merged = merge_dof_chain(&model, 0, 1);
        assert_eq!(merged, vec![0, 1, 2, 3]);
    }

    #[test]
    fn shared_ancestry_is_deduplicated() {
        // body2 shares dof 1 as an ancestor of its own dof 2 (not simple).
        let nv = 3;
        let model = Model::new(
            nv,
            2,
            vec![0, 2],
            vec![2, 1],
            vec![-1, 0, 1],
            vec![(1.0, 1.0); 2],
            vec![1.0; nv],
            MassCholesky::identity(nv),
            Options::default(),
        );
        let merged = merge_dof_chain(&model, 0, 1);
        assert_eq!(merged, vec![0, 1, 2]);
    }
}
