use crate::braille::BrailleCanvas;
use crate::map::geometry::LinePoints;
use crate::map::projection::Viewport;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Level of detail for basemap data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lod {
    Low,    // 110m - world view
    Medium, // 50m - continental
    High,   // 10m - regional
}

impl Lod {
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 2.0 {
            Lod::Low
        } else if zoom < 8.0 {
            Lod::Medium
        } else {
            Lod::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Lod::Low => "110m",
            Lod::Medium => "50m",
            Lod::High => "10m",
        }
    }
}

/// Rendered basemap line work, one canvas per colour.
pub struct BasemapLayers {
    pub coastlines: BrailleCanvas,
    pub borders: BrailleCanvas,
}

/// Coastlines and country borders drawn underneath the site markers.
pub struct Basemap {
    coastlines: [Vec<LineString>; 3],
    borders: [Vec<LineString>; 2],
    pub show_borders: bool,
}

impl Basemap {
    pub fn new() -> Self {
        Self {
            coastlines: Default::default(),
            borders: Default::default(),
            show_borders: true,
        }
    }

    pub fn add_coastline(&mut self, line: LineString, lod: Lod) {
        let slot = match lod {
            Lod::Low => 0,
            Lod::Medium => 1,
            Lod::High => 2,
        };
        self.coastlines[slot].push(line);
    }

    pub fn add_border(&mut self, line: LineString, lod: Lod) {
        let slot = if lod == Lod::High { 1 } else { 0 };
        self.borders[slot].push(line);
    }

    pub fn has_data(&self) -> bool {
        self.coastlines.iter().any(|c| !c.is_empty())
    }

    pub fn toggle_borders(&mut self) {
        self.show_borders = !self.show_borders;
    }

    /// Finest available coastline set at or below `lod`
    fn coastlines_for(&self, lod: Lod) -> &[LineString] {
        let finest = match lod {
            Lod::Low => 0,
            Lod::Medium => 1,
            Lod::High => 2,
        };
        (0..=finest)
            .rev()
            .map(|i| &self.coastlines[i])
            .find(|c| !c.is_empty())
            .map_or(&[][..], Vec::as_slice)
    }

    fn borders_for(&self, lod: Lod) -> &[LineString] {
        if lod == Lod::High && !self.borders[1].is_empty() {
            &self.borders[1]
        } else {
            &self.borders[0]
        }
    }

    /// Draw the basemap onto fresh canvases of `cols` x `rows` characters.
    pub fn render(&self, cols: usize, rows: usize, viewport: &Viewport) -> BasemapLayers {
        let lod = Lod::from_zoom(viewport.zoom);
        let mut layers = BasemapLayers {
            coastlines: BrailleCanvas::new(cols, rows),
            borders: BrailleCanvas::new(cols, rows),
        };

        for line in self.coastlines_for(lod) {
            draw_linestring(&mut layers.coastlines, line, viewport);
        }
        if self.show_borders {
            for line in self.borders_for(lod) {
                draw_linestring(&mut layers.borders, line, viewport);
            }
        }
        layers
    }
}

impl Default for Basemap {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw a linestring, skipping segments that are off-canvas or wrap the antimeridian.
fn draw_linestring(canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport) {
    let projected = line.iter().map(|&(lon, lat)| viewport.project(lon, lat));
    let mut prev: Option<(i32, i32)> = None;

    for point in projected {
        if let Some(p) = prev {
            let dist = ((point.0 - p.0).abs() + (point.1 - p.1).abs()) as usize;
            if dist < viewport.width && viewport.line_might_be_visible(p, point) {
                for (x, y) in LinePoints::new(p, point) {
                    canvas.set_pixel_signed(x, y);
                }
            }
        }
        prev = Some(point);
    }
}
