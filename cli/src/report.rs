//! Plain-text diagnostics for a built constraint set: row-count summary and,
//! optionally, a per-row dump of the solver-facing fields.

use rbconstraint_core::types::ConstraintType;
use rbconstraint_core::update::{constraint_update, constraint_update_elliptic_block};
use rbconstraint_core::Data;

/// Runs `constraint_update` for every row using each row's own unconstrained
/// optimum (`force = aref * d`) as the trial force, since this CLI has no
/// solver attached to supply one. Elliptic-cone contact blocks (contiguous
/// rows sharing a contact id) are routed through
/// `constraint_update_elliptic_block` instead, since the cone's zones are
/// classified jointly across the block rather than row by row. Returns the
/// summed cost. Mutates `data.constraints` in place (state/force are filled
/// in as a side effect).
pub fn evaluate_unconstrained(data: &mut Data) -> f64 {
    let contacts = data.contacts.clone();
    let Some(arena) = data.constraints.as_mut() else {
        return 0.0;
    };
    let trials: Vec<f64> = arena.meta.iter().map(|m| m.aref * m.d).collect();
    let mut total = 0.0;
    let mut row = 0;
    while row < arena.meta.len() {
        if arena.meta[row].efc_type == ConstraintType::ContactElliptic {
            let id = arena.meta[row].id;
            let mut end = row + 1;
            while end < arena.meta.len()
                && arena.meta[end].efc_type == ConstraintType::ContactElliptic
                && arena.meta[end].id == id
            {
                end += 1;
            }
            let rows: Vec<usize> = (row..end).collect();
            let contact = &contacts[id];
            let mu_k = &contact.friction[0..rows.len() - 1];
            let (cost, _hessian) = constraint_update_elliptic_block(arena, &rows, contact.mu, mu_k);
            total += cost;
            row = end;
        } else {
            let (cost, _force) = constraint_update(arena, row, trials[row]);
            total += cost;
            row += 1;
        }
    }
    total
}

pub fn print_summary(data: &Data) {
    let s = data.summary();
    println!("rows: total={} ne={} nf={} nl={} nc={}", s.total, s.ne, s.nf, s.nl, s.nc);
    if data.warnings.is_empty() {
        println!("warnings: none");
    } else {
        println!("warnings:");
        for w in &data.warnings {
            println!("  - {w}");
        }
    }
}

pub fn print_rows(data: &Data) {
    let Some(arena) = &data.constraints else {
        println!("(no constraint arena built)");
        return;
    };
    for (i, m) in arena.meta.iter().enumerate() {
        println!(
            "row {i:>4}: type={:?} id={:<3} pos={:>10.6} vel={:>10.6} aref={:>10.6} r={:>10.6} d={:>10.6} state={:?}",
            m.efc_type, m.id, m.pos, m.vel, m.aref, m.r, m.d, m.state
        );
    }
}
