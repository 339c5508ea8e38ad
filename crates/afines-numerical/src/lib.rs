//! Small, dependency-light 2D math used across the afines simulation crates:
//! vectors and 2x2 tensors (`vec2`) and the bending-angle geometry (`geometry`)
//! shared by the filament and motor force models.

pub mod geometry;
pub mod vec2;

pub use geometry::{angle, bend_harmonic, BendResult};
pub use vec2::{Mat2x2, Vec2};
