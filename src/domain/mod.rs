pub mod assignment;
pub mod candidate;
pub mod dam;
pub mod reservoir;

pub use assignment::{Assignment, AssignmentTable, Round, Stage};
pub use candidate::CandidatePair;
pub use dam::{DamId, DamPoint};
pub use reservoir::{PolygonId, ReservoirPolygon};
