//! Interactive terminal map of project sites: a braille basemap with site
//! markers, facet filters, free-text search and popup detail views.

pub mod app;
pub mod braille;
pub mod config;
pub mod controls;
pub mod data;
pub mod error;
pub mod filter;
pub mod logging;
pub mod map;
pub mod marker;
pub mod site;
pub mod ui;
