//! Constraint construction and update core: builds `efc_*` rows (equality,
//! friction, limit, contact) for one step from a read-only [`Model`] and the
//! kinematic state in [`Data`], and reference/updates them against a trial
//! solver force. Forward kinematics, collision detection, and the actual
//! solve are out of scope — those are external collaborators.

pub mod arena;
pub mod constants;
pub mod data;
pub mod dofchain;
pub mod driver;
pub mod error;
pub mod instantiate;
pub mod jacobian;
pub mod model;
pub mod params;
pub mod precount;
pub mod projected_inertia;
pub mod rowbuilder;
pub mod spatial;
pub mod types;
pub mod update;

pub use data::{Contact, Data, Warning};
pub use driver::make_constraint;
pub use error::{EngineError, Result};
pub use model::{EqualityDef, JointDef, MassCholesky, Model, ObjRef, Options, TendonDef};
