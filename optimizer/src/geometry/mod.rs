//! CPU-side geometry types and generators.
//!
//! - [`AttributeBuffer`] / [`BufferData`] / [`ElementType`] - Typed vertex attributes
//! - [`Geometry`] - Named attributes, optional [`IndexBuffer`], draw [`Group`]s and morph targets
//! - [`BoundingBox`] / [`BoundingSphere`] - Bounds recomputed from positions
//! - Generators for common shapes (box, sphere)

mod bounds;
mod buffer;
mod data;
pub mod generators;

pub use bounds::{BoundingBox, BoundingSphere};
pub use buffer::{AttributeBuffer, BufferData, ElementType};
pub use data::{names, Geometry, GeometryStats, Group, IndexBuffer, IndexFormat};
