//! resmatch - Associate dam points with reservoir polygons from water-mask datasets

pub mod config;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod io;
pub mod retrieval;
