//! Dam to reservoir association
//!
//! The pipeline per round: query the spatial index at the round's tolerance, turn
//! the hits into candidate pairs, then reduce them to a one-to-one table. The
//! driver runs a strict round and a relaxed round over whatever stayed unmatched.

pub mod diagnostics;
pub mod driver;
pub mod index;
pub mod optimizer;
pub mod selector;

pub use diagnostics::Diagnostics;
pub use driver::{RetrievalOutcome, Retriever, RoundOutcome};
pub use index::{Nearby, SpatialIndex};
pub use optimizer::{AreaRejection, AssociationOptimizer, Resolution};
pub use selector::{CandidateSelector, CandidateSet};
