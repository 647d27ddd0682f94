//! Transaction pipeline
//!
//! Turns an assembled instruction list into a confirmed on-chain
//! transaction:
//! - **errors**: pipeline error taxonomy and the transient-failure predicate
//! - **estimate**: simulation-backed compute budget discovery
//! - **build**: compute-budget directives + v0 message compilation
//! - **submit**: sign, broadcast, confirm with a timeout race and an
//!   unbounded retry loop over transient failure reasons
//!
//! The submission layer deliberately resubmits the same signed transaction;
//! duplicate-vote protection lives in the vote-state gate upstream, not
//! here.

pub mod build;
pub mod errors;
pub mod estimate;
pub mod submit;

pub use build::{build_transaction, PreparedTransaction, COMPUTE_UNIT_CEILING};
pub use errors::{is_transient_failure, TxError};
pub use estimate::{estimate_compute_units, EstimateOptions, FALLBACK_COMPUTE_UNITS};
pub use submit::{sign_transaction, submit_transaction, CONFIRMATION_TIMEOUT};
