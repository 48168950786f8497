mod cluster;
mod geometry;
mod projection;
mod renderer;

pub use cluster::{cluster_markers, hit_test, Cluster};
pub use projection::{Bounds, Viewport};
pub use renderer::{Basemap, BasemapLayers, LineString, Lod};
