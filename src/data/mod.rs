mod basemap;
mod sites;

pub use basemap::{load_basemap, simple_world};
pub use sites::{load_sites, parse_sites, DataSource};
