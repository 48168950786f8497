use crate::config::MapOptions;
use crate::controls::FilterControls;
use crate::error::LoadError;
use crate::filter::{visible_set, FilterState};
use crate::map::{cluster_markers, hit_test, Basemap, Bounds, Cluster, Lod, Viewport};
use crate::marker::{present, Marker};
use crate::site::SiteRecord;

/// Minimum zoom used when a marker is selected
const SELECT_ZOOM: f64 = 4.0;
/// Pixels kept free on the left/right of an opened popup's anchor
const POPUP_SIDE_PADDING: i32 = 4;
/// Hit tolerance for mouse clicks, in braille pixels
const HIT_TOLERANCE: i32 = 3;

/// Controller lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
    Filtering,
    /// Terminal; holds the message shown to the user
    LoadFailed(String),
}

/// Which part of the screen receives keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Map,
    Search,
    Filters,
}

/// Screen rectangle of the map's inner area, in terminal cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapArea {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub basemap: Basemap,
    pub options: MapOptions,
    pub phase: Phase,
    pub focus: Focus,
    pub controls: FilterControls,
    /// Raw search text as typed
    pub search_input: String,
    pub should_quit: bool,
    /// Transient message for the status bar
    pub notice: Option<String>,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    map_area: MapArea,
    terminal_width: u16,
    sites: Vec<SiteRecord>,
    filter: FilterState,
    markers: Vec<Marker>,
    /// Index into `markers` of the open popup
    selected: Option<usize>,
    /// Cluster under the mouse, for the tooltip
    hovered: Option<Cluster>,
}

impl App {
    pub fn new(map_area: MapArea, terminal_width: u16, options: MapOptions) -> Self {
        let mut viewport = Viewport::world(map_area.width as usize * 2, map_area.height as usize * 4);
        viewport.clamp_vertical = options.clamp_vertical;

        Self {
            viewport,
            basemap: Basemap::new(),
            options,
            phase: Phase::Loading,
            focus: Focus::Map,
            controls: FilterControls::default(),
            search_input: String::new(),
            should_quit: false,
            notice: None,
            last_mouse: None,
            map_area,
            terminal_width,
            sites: Vec::new(),
            filter: FilterState::new(),
            markers: Vec::new(),
            selected: None,
            hovered: None,
        }
    }

    /// Update the map area when the terminal resizes
    pub fn resize(&mut self, map_area: MapArea, terminal_width: u16) {
        self.map_area = map_area;
        self.terminal_width = terminal_width;
        self.viewport.width = map_area.width as usize * 2;
        self.viewport.height = map_area.height as usize * 4;
        // Screen positions are stale after a resize
        self.hovered = None;
    }

    pub fn map_area(&self) -> MapArea {
        self.map_area
    }

    /// Filters, search and marker interaction only work once data is loaded.
    pub fn is_interactive(&self) -> bool {
        matches!(self.phase, Phase::Ready | Phase::Filtering)
    }

    /// Dataset arrived: build the filter controls, then draw everything.
    pub fn on_loaded(&mut self, sites: Vec<SiteRecord>) {
        if self.phase != Phase::Loading {
            return;
        }

        let missing = sites.iter().filter(|s| s.lon_lat().is_none()).count();
        for site in sites.iter().filter(|s| s.lon_lat().is_none()) {
            tracing::debug!(site = site.label(), "site has no numeric coordinates, not shown");
        }
        tracing::info!(sites = sites.len(), without_coordinates = missing, "dataset ready");

        self.controls = FilterControls::build(&sites);
        self.sites = sites;
        self.phase = Phase::Ready;
        self.rerender();
    }

    pub fn on_load_failed(&mut self, error: &LoadError) {
        tracing::error!(error = %error, "failed to load site dataset");
        self.phase = Phase::LoadFailed(format!(
            "Could not load project data. Check the data path or URL.\n{error}"
        ));
    }

    /// Recompute the visible set from scratch and rebuild every marker.
    /// Refits the view when something is visible; otherwise the view stays.
    pub fn rerender(&mut self) {
        self.selected = None;
        self.hovered = None;
        self.markers = visible_set(&self.sites, &self.filter)
            .into_iter()
            .filter_map(|i| present(i, &self.sites[i]))
            .collect();

        tracing::debug!(visible = self.markers.len(), "rendered markers");

        if let Some(bounds) = Bounds::around(self.markers.iter().map(|m| (m.lon, m.lat))) {
            self.viewport.fit_bounds(bounds.pad(self.options.fit_padding));
        }
    }

    fn after_mutation(&mut self) {
        self.phase = Phase::Filtering;
        self.rerender();
    }

    pub fn sites(&self) -> &[SiteRecord] {
        &self.sites
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Dataset indices of the visible sites, in dataset order.
    pub fn visible_sites(&self) -> Vec<usize> {
        self.markers.iter().map(|m| m.site).collect()
    }

    /// Flip the filter checkbox at flat index `index`.
    pub fn toggle_filter(&mut self, index: usize) {
        if self.is_interactive() && self.controls.toggle(index, &mut self.filter) {
            self.after_mutation();
        }
    }

    pub fn toggle_filter_at_cursor(&mut self) {
        self.toggle_filter(self.controls.cursor());
    }

    pub fn set_search(&mut self, text: &str) {
        if !self.is_interactive() {
            return;
        }
        self.search_input = text.to_string();
        self.filter.set_search(text);
        self.after_mutation();
    }

    pub fn push_search_char(&mut self, ch: char) {
        let mut text = self.search_input.clone();
        text.push(ch);
        self.set_search(&text);
    }

    pub fn pop_search_char(&mut self) {
        let mut text = self.search_input.clone();
        if text.pop().is_some() {
            self.set_search(&text);
        }
    }

    /// Clear every filter, the search box and the checkboxes.
    pub fn reset_filters(&mut self) {
        if !self.is_interactive() {
            return;
        }
        self.controls.reset(&mut self.filter);
        self.search_input.clear();
        self.after_mutation();
    }

    /// Markers grouped for the current viewport.
    pub fn clusters(&self) -> Vec<Cluster> {
        cluster_markers(&self.markers, &self.viewport, self.options.effective_cluster_radius())
    }

    pub fn selected_marker(&self) -> Option<&Marker> {
        self.selected.and_then(|i| self.markers.get(i))
    }

    pub fn hovered(&self) -> Option<&Cluster> {
        self.hovered.as_ref()
    }

    /// Whether popups dock at the bottom of the map.
    pub fn compact_popups(&self) -> bool {
        self.options.popup_mode.is_compact(self.terminal_width)
    }

    /// Open the popup of `markers[index]` and bring it into view.
    pub fn open_popup(&mut self, index: usize) {
        let Some(marker) = self.markers.get(index) else {
            return;
        };
        let (lon, lat) = (marker.lon, marker.lat);
        self.selected = Some(index);
        self.viewport.set_view(lon, lat, self.viewport.zoom.max(SELECT_ZOOM));
        self.on_popup_opened();
    }

    /// Nudge the view so the popup's anchor keeps room for the popup itself.
    fn on_popup_opened(&mut self) {
        let Some(marker) = self.selected_marker() else {
            return;
        };
        let (lon, lat) = (marker.lon, marker.lat);
        // Border rows plus content, in braille pixels
        let popup_px = (marker.popup.line_count() as i32 + 2) * 4;
        let (top, bottom) = if self.compact_popups() {
            (POPUP_SIDE_PADDING, popup_px)
        } else {
            (popup_px, POPUP_SIDE_PADDING)
        };
        self.viewport.pan_inside(lon, lat, top, bottom, POPUP_SIDE_PADDING);
    }

    pub fn close_popup(&mut self) {
        self.selected = None;
    }

    /// Step the open popup through the visible markers.
    pub fn cycle_selection(&mut self, forward: bool) {
        if !self.is_interactive() || self.markers.is_empty() {
            return;
        }
        let n = self.markers.len();
        let next = match (self.selected, forward) {
            (None, true) => 0,
            (None, false) => n - 1,
            (Some(i), true) => (i + 1) % n,
            (Some(i), false) => (i + n - 1) % n,
        };
        self.open_popup(next);
    }

    /// Refit the view to the visible set without changing filters.
    pub fn fit_visible(&mut self) {
        if let Some(bounds) = Bounds::around(self.markers.iter().map(|m| (m.lon, m.lat))) {
            self.viewport.fit_bounds(bounds.pad(self.options.fit_padding));
        }
    }

    /// Convert a terminal cell to braille pixel coordinates in the map.
    fn cell_to_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let area = self.map_area;
        let inside = col >= area.x
            && row >= area.y
            && col < area.x + area.width
            && row < area.y + area.height;
        // Aim at the middle of the cell
        inside.then(|| {
            (
                i32::from(col - area.x) * 2 + 1,
                i32::from(row - area.y) * 4 + 2,
            )
        })
    }

    /// Mouse click on the map: open a single marker or zoom into a cluster.
    pub fn click(&mut self, col: u16, row: u16) {
        if !self.is_interactive() {
            return;
        }
        let Some((px, py)) = self.cell_to_pixel(col, row) else {
            return;
        };
        let clusters = self.clusters();
        let Some(hit) = hit_test(&clusters, px, py, HIT_TOLERANCE) else {
            return;
        };
        let cluster = &clusters[hit];

        if cluster.is_single() {
            self.open_popup(cluster.members[0]);
            return;
        }

        let before = self.viewport.zoom;
        if let Some(bounds) = cluster.bounds(&self.markers) {
            self.viewport.fit_bounds(bounds.pad(self.options.fit_padding));
        }
        // Co-located sites never split; show the first one instead
        if self.viewport.zoom <= before {
            self.open_popup(cluster.members[0]);
        }
    }

    /// Mouse moved: track the cluster under the cursor for the tooltip.
    pub fn hover(&mut self, col: u16, row: u16) {
        self.hovered = self
            .cell_to_pixel(col, row)
            .and_then(|(px, py)| {
                let clusters = self.clusters();
                hit_test(&clusters, px, py, HIT_TOLERANCE).map(|i| clusters[i].clone())
            });
    }

    /// Tooltip text for the hovered cluster.
    pub fn tooltip(&self) -> Option<String> {
        let cluster = self.hovered.as_ref()?;
        match cluster.members.as_slice() {
            [single] => self.markers.get(*single).map(|m| m.tooltip.clone()),
            members => Some(format!("{} sites", members.len())),
        }
    }

    /// Open the selected popup's detail link with the system opener.
    pub fn open_selected_link(&mut self) {
        let Some(link) = self.selected_marker().and_then(|m| m.popup.link.clone()) else {
            return;
        };
        match open::that(&link) {
            Ok(()) => {
                tracing::info!(link = %link, "opened detail link");
                self.notice = Some(format!("Opened {link}"));
            }
            Err(e) => {
                tracing::warn!(link = %link, error = %e, "failed to open detail link");
                self.notice = Some(format!("Could not open {link}"));
            }
        }
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    /// Zoom in towards a screen position (terminal column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_pixel(col, row) {
            self.viewport.zoom_in_at(px, py);
        }
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.cell_to_pixel(col, row) {
            self.viewport.zoom_out_at(px, py);
        }
    }

    /// Pan by mouse drag, scaled so the map follows the cursor
    pub fn handle_drag(&mut self, col: u16, row: u16) {
        if let Some((last_col, last_row)) = self.last_mouse {
            let dx = (i32::from(last_col) - i32::from(col)) * 2;
            let dy = (i32::from(last_row) - i32::from(row)) * 4;
            self.pan(dx, dy);
        }
        self.last_mouse = Some((col, row));
    }

    pub fn end_drag(&mut self) {
        self.last_mouse = None;
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.viewport.zoom)
    }

    pub fn lod_level(&self) -> &'static str {
        Lod::from_zoom(self.viewport.zoom).label()
    }

    pub fn center_coords(&self) -> String {
        format!(
            "{:.1}°{}, {:.1}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Facet;
    use pretty_assertions::assert_eq;

    fn area() -> MapArea {
        MapArea { x: 0, y: 0, width: 100, height: 40 }
    }

    fn site(name: &str, category: &str, region: &str, coords: Option<(f64, f64)>) -> SiteRecord {
        SiteRecord {
            name: name.into(),
            category: Some(category.into()),
            region: Some(region.into()),
            lat: coords.map(|c| c.0),
            lng: coords.map(|c| c.1),
            ..Default::default()
        }
    }

    fn loaded() -> App {
        let mut app = App::new(area(), 140, MapOptions::default());
        app.on_loaded(vec![
            site("A", "Field Research", "Africa", Some((1.0, 1.0))),
            site("B", "Laboratory & Testing", "Asia", Some((2.0, 2.0))),
            site("C", "Field Research", "Asia", None),
        ]);
        app
    }

    fn index_of(app: &App, facet: Facet, value: &str) -> usize {
        (0..app.controls.len())
            .find(|&i| {
                app.controls
                    .get(i)
                    .is_some_and(|(f, t)| f == facet && t.value == value)
            })
            .unwrap()
    }

    #[test]
    fn test_load_builds_controls_and_renders() {
        let app = loaded();
        assert_eq!(app.phase, Phase::Ready);
        assert_eq!(app.visible_sites(), vec![0, 1]);
        // Region: Africa, Asia; Type: Field Research, Laboratory & Testing
        assert_eq!(app.controls.len(), 4);
    }

    #[test]
    fn test_region_scenario() {
        let mut app = loaded();
        let asia = index_of(&app, Facet::Region, "Asia");
        app.toggle_filter(asia);
        assert_eq!(app.phase, Phase::Filtering);
        assert_eq!(app.visible_sites(), vec![1]);
    }

    #[test]
    fn test_rerender_is_idempotent() {
        let mut app = loaded();
        app.set_search("b");
        let first = app.visible_sites();
        let zoom = app.viewport.zoom;
        app.rerender();
        assert_eq!(app.visible_sites(), first);
        assert_eq!(app.viewport.zoom, zoom);
    }

    #[test]
    fn test_reset_restores_full_set() {
        let mut app = loaded();
        let lab = index_of(&app, Facet::Type, "Laboratory & Testing");
        app.toggle_filter(lab);
        app.set_search("zzz");
        assert!(app.visible_sites().is_empty());

        app.reset_filters();
        assert_eq!(app.visible_sites(), vec![0, 1]);
        assert!(app.search_input.is_empty());
        assert!(app.filter().is_empty());
        assert!(app.controls.get(lab).is_some_and(|(_, t)| !t.checked));
    }

    #[test]
    fn test_empty_result_keeps_view() {
        let mut app = loaded();
        let before = (app.viewport.center_lon, app.viewport.center_lat, app.viewport.zoom);
        app.set_search("nothing matches this");
        assert!(app.markers().is_empty());
        assert_eq!(
            (app.viewport.center_lon, app.viewport.center_lat, app.viewport.zoom),
            before
        );
    }

    #[test]
    fn test_search_editing() {
        let mut app = loaded();
        app.push_search_char('A');
        assert_eq!(app.search_input, "A");
        assert_eq!(app.filter().search(), "a");
        app.pop_search_char();
        assert_eq!(app.visible_sites(), vec![0, 1]);
    }

    #[test]
    fn test_load_failure_blocks_interaction() {
        let mut app = App::new(area(), 140, MapOptions::default());
        let err = crate::data::parse_sites(b"nope".to_vec()).unwrap_err();
        app.on_load_failed(&err);
        assert!(matches!(app.phase, Phase::LoadFailed(_)));

        app.set_search("x");
        app.reset_filters();
        app.cycle_selection(true);
        assert!(matches!(app.phase, Phase::LoadFailed(_)));
        assert!(app.search_input.is_empty());

        // A late dataset does not revive a failed session
        app.on_loaded(vec![site("A", "Field Research", "Africa", Some((1.0, 1.0)))]);
        assert!(app.sites().is_empty());
    }

    #[test]
    fn test_cycle_selection_opens_popups() {
        let mut app = loaded();
        app.cycle_selection(true);
        assert_eq!(app.selected_marker().map(|m| m.site), Some(0));
        app.cycle_selection(true);
        assert_eq!(app.selected_marker().map(|m| m.site), Some(1));
        app.cycle_selection(true);
        assert_eq!(app.selected_marker().map(|m| m.site), Some(0));
        app.cycle_selection(false);
        assert_eq!(app.selected_marker().map(|m| m.site), Some(1));
        assert!(app.viewport.zoom >= SELECT_ZOOM);

        // Any filter change clears the popup
        app.set_search("a");
        assert!(app.selected_marker().is_none());
    }

    #[test]
    fn test_click_single_marker_opens_popup() {
        let mut app = App::new(area(), 140, MapOptions { clustering: false, ..MapOptions::default() });
        app.on_loaded(vec![
            site("A", "Field Research", "Africa", Some((0.0, 0.0))),
            site("B", "Field Research", "Africa", Some((30.0, 30.0))),
        ]);
        let (px, py) = app.viewport.project(0.0, 0.0);
        app.click((px / 2) as u16, (py / 4) as u16);
        assert_eq!(app.selected_marker().map(|m| m.site), Some(0));
    }

    #[test]
    fn test_tooltip_for_hovered_marker() {
        let mut app = App::new(area(), 140, MapOptions { clustering: false, ..MapOptions::default() });
        let mut a = site("A", "Field Research", "Africa", Some((0.0, 0.0)));
        a.country = Some("Kenya".into());
        app.on_loaded(vec![a, site("B", "Field Research", "Africa", Some((30.0, 30.0)))]);

        let (px, py) = app.viewport.project(0.0, 0.0);
        app.hover((px / 2) as u16, (py / 4) as u16);
        assert_eq!(app.tooltip().as_deref(), Some("A – Kenya"));

        app.hover(0, 0);
        assert_eq!(app.tooltip(), None);
    }

    #[test]
    fn test_resize_clears_hover() {
        let mut app = App::new(area(), 140, MapOptions { clustering: false, ..MapOptions::default() });
        app.on_loaded(vec![
            site("A", "Field Research", "Africa", Some((0.0, 0.0))),
            site("B", "Field Research", "Africa", Some((30.0, 30.0))),
        ]);
        let (px, py) = app.viewport.project(0.0, 0.0);
        app.hover((px / 2) as u16, (py / 4) as u16);
        assert!(app.hovered().is_some());

        app.resize(MapArea { x: 0, y: 0, width: 100, height: 0 }, 140);
        assert!(app.hovered().is_none());
        assert_eq!(app.tooltip(), None);
    }
}
