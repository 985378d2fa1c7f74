pub mod landmark;

pub use landmark::{Landmark, LandmarkFrame, LandmarkIndex, Point3};
