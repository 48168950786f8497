use crate::app::{App, Focus, MapArea, Phase};
use crate::braille::BrailleCanvas;
use crate::map::Cluster;
use crate::marker::{IconClass, Marker, Popup};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
    Frame,
};

/// Width of the search/filter panel
const SIDEBAR_WIDTH: u16 = 34;
/// Width of a floating popup
const POPUP_WIDTH: u16 = 44;

struct Areas {
    sidebar: Rect,
    map: Rect,
    status: Rect,
}

fn split(area: Rect) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
        .split(rows[0]);
    Areas {
        sidebar: cols[0],
        map: cols[1],
        status: rows[1],
    }
}

fn map_block() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " Project Sites ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Inner map rectangle for a terminal of the given size.
pub fn map_area(terminal: Rect) -> MapArea {
    let inner = map_block().inner(split(terminal).map);
    MapArea {
        x: inner.x,
        y: inner.y,
        width: inner.width,
        height: inner.height,
    }
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let areas = split(frame.area());
    render_sidebar(frame, app, areas.sidebar);
    render_map(frame, app, areas.map);
    render_status_bar(frame, app, areas.status);

    if let Phase::LoadFailed(message) = &app.phase {
        render_notice(frame, areas.map, " Load failed ", message, Color::Red);
    } else if app.phase == Phase::Loading {
        render_notice(frame, areas.map, " Loading ", "Loading project sites…", Color::Yellow);
    }
}

fn icon_color(icon: IconClass) -> Color {
    match icon {
        IconClass::Lab => Color::Magenta,
        IconClass::Field => Color::Green,
        IconClass::Water => Color::Blue,
        IconClass::Data => Color::Yellow,
        IconClass::Hub => Color::LightRed,
    }
}

fn focus_style(focused: bool) -> Style {
    Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray })
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let search_focused = app.focus == Focus::Search;
    let mut search_text = vec![Span::raw(app.search_input.clone())];
    if search_focused {
        search_text.push(Span::styled("▏", Style::default().fg(Color::Cyan)));
    }
    let search = Paragraph::new(Line::from(search_text)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(search_focused))
            .title(" Search [/] "),
    );
    frame.render_widget(search, chunks[0]);

    let filters_focused = app.focus == Focus::Filters;
    let mut lines = Vec::new();
    let mut cursor_line = 0;
    let mut flat = 0;
    for group in app.controls.groups() {
        if group.toggles.is_empty() {
            continue;
        }
        lines.push(Line::from(Span::styled(
            group.facet.title(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        for toggle in &group.toggles {
            let at_cursor = filters_focused && flat == app.controls.cursor();
            if at_cursor {
                cursor_line = lines.len();
            }
            let mut style = Style::default();
            if toggle.checked {
                style = style.fg(Color::Green);
            }
            if at_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            let mark = if toggle.checked { "[x] " } else { "[ ] " };
            lines.push(Line::from(Span::styled(format!("{mark}{}", toggle.value), style)));
            flat += 1;
        }
    }

    let inner_height = chunks[1].height.saturating_sub(2) as usize;
    let scroll = cursor_line.saturating_sub(inner_height.saturating_sub(1)) as u16;
    let filters = Paragraph::new(lines).scroll((scroll, 0)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(focus_style(filters_focused))
            .title(" Filters [f]  reset [R] "),
    );
    frame.render_widget(filters, chunks[1]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = map_block();
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Braille gives 2x4 resolution per character
    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;
    let layers = app
        .basemap
        .render(inner.width as usize, inner.height as usize, &viewport);

    let widget = MapWidget {
        coastlines: &layers.coastlines,
        borders: &layers.borders,
        clusters: app.clusters(),
        markers: app.markers(),
        selected: app.selected_marker().map(|m| m.site),
    };
    frame.render_widget(widget, inner);

    // Nothing fits over a collapsed map
    if inner.width == 0 || inner.height == 0 {
        return;
    }
    if let Some(marker) = app.selected_marker() {
        render_popup(frame, app, marker, inner);
    } else if let (Some(text), Some(cluster)) = (app.tooltip(), app.hovered()) {
        render_tooltip(frame, &text, cluster, inner);
    }
}

/// Basemap line work with site markers and cluster counts on top.
struct MapWidget<'a> {
    coastlines: &'a BrailleCanvas,
    borders: &'a BrailleCanvas,
    clusters: Vec<Cluster>,
    markers: &'a [Marker],
    /// Dataset index of the site whose popup is open
    selected: Option<usize>,
}

impl MapWidget<'_> {
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (col, row, ch) in canvas.glyphs() {
            if col >= area.width as usize || row >= area.height as usize {
                continue;
            }
            buf[(area.x + col as u16, area.y + row as u16)]
                .set_char(ch)
                .set_fg(color);
        }
    }
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Self::render_layer(self.coastlines, Color::DarkGray, area, buf);
        Self::render_layer(self.borders, Color::Rgb(70, 70, 90), area, buf);

        for cluster in &self.clusters {
            let (col, row) = (cluster.px.div_euclid(2), cluster.py.div_euclid(4));
            if col < 0 || row < 0 || col >= i32::from(area.width) || row >= i32::from(area.height) {
                continue;
            }
            let (x, y) = (area.x + col as u16, area.y + row as u16);

            if let [single] = cluster.members.as_slice() {
                let Some(marker) = self.markers.get(*single) else {
                    continue;
                };
                let mut style = Style::default()
                    .fg(icon_color(marker.icon))
                    .add_modifier(Modifier::BOLD);
                if self.selected == Some(marker.site) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                buf[(x, y)].set_char(marker.icon.glyph()).set_style(style);
            } else {
                let count = cluster.members.len();
                let label = if count > 99 { "99+".to_string() } else { count.to_string() };
                let style = Style::default()
                    .fg(Color::Black)
                    .bg(Color::Yellow)
                    .add_modifier(Modifier::BOLD);
                for (i, ch) in label.chars().enumerate() {
                    let cx = x + i as u16;
                    if cx < area.x + area.width {
                        buf[(cx, y)].set_char(ch).set_style(style);
                    }
                }
            }
        }
    }
}

fn popup_lines(popup: &Popup) -> Vec<Line<'static>> {
    let label_style = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(Span::styled(
            popup.title.clone(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(popup.summary.clone(), label_style)),
    ];
    if popup.needs_verification {
        lines.push(Line::from(Span::styled(
            " Needs verification ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )));
    }
    if let Some(image) = &popup.image {
        lines.push(Line::from(vec![
            Span::styled("Image: ", label_style),
            Span::raw(image.clone()),
        ]));
    }
    if !popup.description.is_empty() {
        lines.push(Line::from(popup.description.clone()));
    }
    for meta in &popup.meta {
        if meta.label.is_empty() {
            lines.push(Line::from(Span::styled(meta.text.clone(), label_style)));
        } else {
            lines.push(Line::from(vec![
                Span::styled(format!("{}: ", meta.label), label_style.add_modifier(Modifier::BOLD)),
                Span::raw(meta.text.clone()),
            ]));
        }
    }
    if let Some(link) = &popup.link {
        lines.push(Line::from(vec![
            Span::styled("[o] View gallery & details ", Style::default().fg(Color::Cyan)),
            Span::styled(link.clone(), label_style),
        ]));
    }
    lines
}

/// Rows needed for `lines` wrapped at `width` columns
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    lines
        .iter()
        .map(|l| l.width().max(1).div_ceil(width) as u16)
        .sum()
}

fn render_popup(frame: &mut Frame, app: &App, marker: &Marker, map: Rect) {
    let lines = popup_lines(&marker.popup);

    let rect = if app.compact_popups() {
        let height = (wrapped_height(&lines, map.width.saturating_sub(2)) + 2).min(map.height);
        Rect::new(map.x, map.y + map.height - height, map.width, height)
    } else {
        let width = POPUP_WIDTH.min(map.width);
        let height = (wrapped_height(&lines, width.saturating_sub(2)) + 2).min(map.height);
        let (px, py) = app.viewport.project(marker.lon, marker.lat);
        let anchor_col = map.x as i32 + px / 2;
        let anchor_row = map.y as i32 + py / 4;

        let max_x = (map.x + map.width - width) as i32;
        let x = (anchor_col - width as i32 / 2).clamp(map.x as i32, max_x);
        // Above the marker, or below when there is no room
        let above = anchor_row - height as i32;
        let y = if above >= map.y as i32 { above } else { anchor_row + 1 };
        let y = y.clamp(map.y as i32, (map.y + map.height - height) as i32);
        Rect::new(x as u16, y as u16, width, height)
    };

    frame.render_widget(Clear, rect);
    let popup = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(icon_color(marker.icon)))
            .title(format!(" {} ", marker.icon.class_name())),
    );
    frame.render_widget(popup, rect);
}

fn render_tooltip(frame: &mut Frame, text: &str, cluster: &Cluster, map: Rect) {
    let width = (text.chars().count() as u16 + 2).min(map.width);
    let col = map.x as i32 + cluster.px / 2;
    let row = map.y as i32 + cluster.py / 4 - 1;
    let max_x = (map.x + map.width - width) as i32;
    let x = (col - width as i32 / 2).clamp(map.x as i32, max_x.max(map.x as i32));
    let y = row.clamp(map.y as i32, (map.y + map.height).saturating_sub(1) as i32);

    let rect = Rect::new(x as u16, y as u16, width, 1);
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(format!(" {text} "))
            .style(Style::default().fg(Color::Black).bg(Color::Gray)),
        rect,
    );
}

fn render_notice(frame: &mut Frame, map: Rect, title: &str, message: &str, color: Color) {
    let width = 60u16.min(map.width);
    let lines: Vec<Line> = message.lines().map(|l| Line::from(l.to_string())).collect();
    let height = (wrapped_height(&lines, width.saturating_sub(2)) + 2).min(map.height);
    let rect = Rect::new(
        map.x + (map.width - width) / 2,
        map.y + (map.height - height) / 2,
        width,
        height,
    );

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: true }).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(Span::styled(
                    title.to_string(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )),
        ),
        rect,
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let mut spans = vec![
        Span::styled(" Sites: ", dim),
        Span::styled(
            format!("{}/{}", app.markers().len(), app.sites().len()),
            Style::default().fg(Color::Green),
        ),
        Span::styled(" | Zoom: ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" (", dim),
        Span::styled(app.lod_level(), Style::default().fg(Color::Magenta)),
        Span::styled(") | ", dim),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
    ];

    match &app.notice {
        Some(notice) => spans.push(Span::styled(format!(" | {notice}"), Style::default().fg(Color::White))),
        None => spans.push(Span::styled(
            " | hjkl:pan +/-:zoom n/N:next site o:open 0:fit b:borders q:quit",
            dim,
        )),
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapOptions;
    use crate::site::SiteRecord;
    use ratatui::{backend::TestBackend, Terminal};

    fn buffer_text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    fn draw(app: &App) -> String {
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        buffer_text(terminal.backend().buffer())
    }

    fn app() -> App {
        let area = map_area(Rect::new(0, 0, 120, 40));
        App::new(area, 120, MapOptions::default())
    }

    #[test]
    fn test_loading_notice() {
        assert!(draw(&app()).contains("Loading project sites"));
    }

    #[test]
    fn test_load_failed_notice() {
        let mut app = app();
        let err = crate::data::parse_sites(b"{".to_vec()).unwrap_err();
        app.on_load_failed(&err);
        assert!(draw(&app).contains("Could not load project data"));
    }

    #[test]
    fn test_filters_and_popup_drawn() {
        let mut app = app();
        app.on_loaded(vec![SiteRecord {
            name: "Okavango Camp".into(),
            region: Some("Africa".into()),
            status: Some("Planned".into()),
            lat: Some(-19.0),
            lng: Some(23.0),
            ..Default::default()
        }]);
        let text = draw(&app);
        assert!(text.contains("[ ] Africa"));
        assert!(text.contains("[ ] Planned"));

        app.cycle_selection(true);
        let text = draw(&app);
        assert!(text.contains("Okavango Camp"));
        assert!(text.contains("Needs verification"));
    }

    #[test]
    fn test_wrapped_height() {
        let lines = vec![Line::from("abcdef"), Line::from("")];
        assert_eq!(wrapped_height(&lines, 4), 3);
    }

    #[test]
    fn test_tiny_terminal_with_hover_and_popup() {
        let mut app = App::new(
            map_area(Rect::new(0, 0, 120, 40)),
            120,
            MapOptions { clustering: false, ..MapOptions::default() },
        );
        app.on_loaded(vec![
            SiteRecord { name: "A".into(), lat: Some(0.0), lng: Some(0.0), ..Default::default() },
            SiteRecord { name: "B".into(), lat: Some(30.0), lng: Some(30.0), ..Default::default() },
        ]);
        let area = app.map_area();
        let (px, py) = app.viewport.project(0.0, 0.0);
        app.hover(area.x + (px / 2) as u16, area.y + (py / 4) as u16);
        assert!(app.tooltip().is_some());

        for height in 1..=5 {
            let mut terminal = Terminal::new(TestBackend::new(120, height)).unwrap();
            terminal.draw(|frame| render(frame, &app)).unwrap();
        }

        app.cycle_selection(true);
        for height in 1..=5 {
            let mut terminal = Terminal::new(TestBackend::new(120, height)).unwrap();
            terminal.draw(|frame| render(frame, &app)).unwrap();
        }
    }
}
