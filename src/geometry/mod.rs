pub mod bounds;
pub mod projection;
pub mod proximity;
pub mod validation;

pub use bounds::GeoBounds;
pub use projection::{METERS_PER_DEGREE, Projector, wrap_longitude};
pub use proximity::{Proximity, measure};
pub use validation::validate_geometry;
