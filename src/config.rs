use crate::data::DataSource;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Terminals narrower than this get docked popups in `auto` mode
pub const COMPACT_WIDTH: u16 = 100;

/// Command line and environment configuration.
#[derive(Debug, Parser)]
#[command(name = "site-map", version, about = "Interactive terminal map of project sites")]
pub struct Cli {
    /// Dataset location: a file path or an http(s) URL
    #[arg(long, env = "SITE_MAP_DATA", default_value = "data/projects.sample.json")]
    pub data: String,

    /// Directory holding Natural Earth GeoJSON basemap files
    #[arg(long, env = "SITE_MAP_BASEMAP_DIR", default_value = "data")]
    pub basemap_dir: PathBuf,

    /// Draw every marker on its own instead of grouping nearby ones
    #[arg(long)]
    pub no_cluster: bool,

    /// Grouping distance in braille pixels
    #[arg(long, default_value_t = 12)]
    pub cluster_radius: u32,

    /// Extra margin around the visible sites when fitting the view, as a
    /// fraction of their extent
    #[arg(long, default_value_t = 0.2)]
    pub fit_padding: f64,

    /// Allow scrolling past the top and bottom of the world
    #[arg(long)]
    pub no_clamp: bool,

    /// Dock popups at the bottom of the map instead of next to the marker
    #[arg(long, value_enum, default_value_t = PopupMode::Auto)]
    pub compact_popups: PopupMode,

    /// Log file (the terminal itself is owned by the UI)
    #[arg(long, env = "SITE_MAP_LOG_FILE", default_value = "site-map.log")]
    pub log_file: PathBuf,
}

impl Cli {
    pub fn data_source(&self) -> DataSource {
        DataSource::parse(&self.data)
    }

    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            clustering: !self.no_cluster,
            cluster_radius: self.cluster_radius,
            fit_padding: self.fit_padding.max(0.0),
            clamp_vertical: !self.no_clamp,
            popup_mode: self.compact_popups,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PopupMode {
    /// Docked when the terminal is narrow
    Auto,
    Always,
    Never,
}

impl PopupMode {
    pub fn is_compact(self, terminal_width: u16) -> bool {
        match self {
            PopupMode::Auto => terminal_width < COMPACT_WIDTH,
            PopupMode::Always => true,
            PopupMode::Never => false,
        }
    }
}

/// Map behaviours that differ between deployments.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub clustering: bool,
    pub cluster_radius: u32,
    pub fit_padding: f64,
    pub clamp_vertical: bool,
    pub popup_mode: PopupMode,
}

impl MapOptions {
    /// Radius handed to the clusterer; 0 turns grouping off.
    pub fn effective_cluster_radius(&self) -> u32 {
        if self.clustering {
            self.cluster_radius
        } else {
            0
        }
    }
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            clustering: true,
            cluster_radius: 12,
            fit_padding: 0.2,
            clamp_vertical: true,
            popup_mode: PopupMode::Auto,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_match_map_options_default() {
        let cli = Cli::try_parse_from(["site-map", "--data", "sites.json"]).unwrap();
        assert_eq!(cli.map_options(), MapOptions::default());
        assert_eq!(cli.data_source(), DataSource::File(PathBuf::from("sites.json")));
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "site-map",
            "--data",
            "https://example.org/projects.json",
            "--no-cluster",
            "--no-clamp",
            "--fit-padding",
            "0.5",
            "--compact-popups",
            "always",
        ])
        .unwrap();
        let options = cli.map_options();
        assert!(!options.clustering);
        assert_eq!(options.effective_cluster_radius(), 0);
        assert!(!options.clamp_vertical);
        assert_eq!(options.fit_padding, 0.5);
        assert_eq!(options.popup_mode, PopupMode::Always);
        assert!(matches!(cli.data_source(), DataSource::Url(_)));
    }

    #[test]
    fn test_popup_mode() {
        assert!(PopupMode::Auto.is_compact(80));
        assert!(!PopupMode::Auto.is_compact(140));
        assert!(PopupMode::Always.is_compact(200));
        assert!(!PopupMode::Never.is_compact(20));
    }
}
