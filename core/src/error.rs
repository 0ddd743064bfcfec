//! §7 error handling: invariant violations are the only kind that abort the
//! build. Capacity exhaustion and input-sanity problems are non-fatal and
//! are reported as warnings (see [`crate::data::Warning`]) instead.

use thiserror::Error;

/// Fatal engine errors (§7 kind 3). These can only be raised by the driver
/// after a full build, never by an individual instantiator.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error(
        "constraint row precount mismatch: precounted ne={pre_ne} nf={pre_nf} nl={pre_nl} nc={pre_nc} \
         but realized ne={real_ne} nf={real_nf} nl={real_nl} nc={real_nc}"
    )]
    PrecountMismatch {
        pre_ne: usize,
        pre_nf: usize,
        pre_nl: usize,
        pre_nc: usize,
        real_ne: usize,
        real_nf: usize,
        real_nl: usize,
        real_nc: usize,
    },

    #[error("precounted nnzJ={precounted} but realized nnzJ={realized}")]
    NnzMismatch { precounted: usize, realized: usize },

    #[error("unknown constraint type encountered during {stage}")]
    UnknownConstraintType { stage: &'static str },

    #[error("sparse row construction requires a non-empty dof chain when NV={nv} > 0")]
    NullChainInSparseMode { nv: usize },

    #[error("dof index {dof} out of range for nv={nv}")]
    DofOutOfRange { dof: usize, nv: usize },
}

pub type Result<T> = std::result::Result<T, EngineError>;
