use std::f64::consts::PI;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 100.0;
/// Upper zoom bound for fit-to-bounds (a single site would otherwise zoom forever)
pub const FIT_MAX_ZOOM: f64 = 16.0;
/// Web Mercator latitude limit
pub const MAX_LAT: f64 = 85.0511;

/// Normalized Web Mercator x in [0, 1]
#[inline]
fn mercator_x(lon: f64) -> f64 {
    (lon + 180.0) / 360.0
}

/// Normalized Web Mercator y in [0, 1], 0 at the north edge
#[inline]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

#[inline]
fn lat_from_mercator_y(y: f64) -> f64 {
    (PI * (1.0 - 2.0 * y)).sinh().atan().to_degrees()
}

/// Geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// Smallest box around all points, `None` for an empty iterator.
    pub fn around(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc, (lon, lat)| {
            Some(match acc {
                None => Bounds { min_lon: lon, min_lat: lat, max_lon: lon, max_lat: lat },
                Some(b) => Bounds {
                    min_lon: b.min_lon.min(lon),
                    min_lat: b.min_lat.min(lat),
                    max_lon: b.max_lon.max(lon),
                    max_lat: b.max_lat.max(lat),
                },
            })
        })
    }

    /// Grow each side by `ratio` of the box's extent.
    pub fn pad(self, ratio: f64) -> Self {
        let dlon = (self.max_lon - self.min_lon) * ratio;
        let dlat = (self.max_lat - self.min_lat) * ratio;
        Bounds {
            min_lon: (self.min_lon - dlon).max(-180.0),
            min_lat: (self.min_lat - dlat).max(-MAX_LAT),
            max_lon: (self.max_lon + dlon).min(180.0),
            max_lat: (self.max_lat + dlat).min(MAX_LAT),
        }
    }
}

/// Viewport representing the visible map area and zoom level
#[derive(Debug, Clone)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-90 to 90)
    pub center_lat: f64,
    /// Zoom level (1.0 = whole world across the canvas width)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
    /// Keep the view inside the Mercator world vertically
    pub clamp_vertical: bool,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
            clamp_vertical: false,
        }
    }

    /// Initial world view
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(10.0, 15.0, 1.0, width, height)
    }

    #[inline]
    fn scale(&self) -> f64 {
        self.zoom * self.width.max(1) as f64
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        let (px, py) = (
            self.width as f64 / 2.0 + dx as f64,
            self.height as f64 / 2.0 + dy as f64,
        );
        let (lon, lat) = self.unproject_f(px, py);
        self.center_lon = lon;
        self.center_lat = lat.clamp(-MAX_LAT, MAX_LAT);

        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }

        self.apply_clamp();
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
        self.apply_clamp();
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
        self.apply_clamp();
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor, keeping the point under (px, py) in place
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        let (lon, lat) = self.unproject(px, py);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Center on a point at the given zoom.
    pub fn set_view(&mut self, lon: f64, lat: f64, zoom: f64) {
        self.center_lon = lon;
        self.center_lat = lat.clamp(-MAX_LAT, MAX_LAT);
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.apply_clamp();
    }

    /// Center and zoom so `bounds` fills the canvas.
    pub fn fit_bounds(&mut self, bounds: Bounds) {
        let x0 = mercator_x(bounds.min_lon);
        let x1 = mercator_x(bounds.max_lon);
        let y0 = mercator_y(bounds.max_lat);
        let y1 = mercator_y(bounds.min_lat);

        let center_lon = (x0 + x1) / 2.0 * 360.0 - 180.0;
        let center_lat = lat_from_mercator_y((y0 + y1) / 2.0);

        let width = self.width.max(1) as f64;
        let height = self.height.max(1) as f64;
        let zoom_x = if x1 > x0 { 1.0 / (x1 - x0) } else { f64::INFINITY };
        let zoom_y = if y1 > y0 { height / (width * (y1 - y0)) } else { f64::INFINITY };
        let zoom = zoom_x.min(zoom_y).clamp(MIN_ZOOM, FIT_MAX_ZOOM);

        self.set_view(center_lon, center_lat, zoom);
    }

    /// Pan the minimum amount so (lon, lat) sits inside the canvas with
    /// `top`/`bottom` pixels free above/below it and `side` pixels left and right.
    pub fn pan_inside(&mut self, lon: f64, lat: f64, top: i32, bottom: i32, side: i32) {
        let (px, py) = self.project(lon, lat);
        let (w, h) = (self.width as i32, self.height as i32);

        let dx = if px < side {
            px - side
        } else if px > w - side {
            px - (w - side)
        } else {
            0
        };
        let dy = if py < top {
            py - top
        } else if py > h - bottom {
            py - (h - bottom)
        } else {
            0
        };

        if dx != 0 || dy != 0 {
            self.pan(dx, dy);
        }
    }

    /// Keep the visible window inside the Mercator square vertically.
    fn apply_clamp(&mut self) {
        if !self.clamp_vertical {
            return;
        }
        let half = self.height as f64 / 2.0 / self.scale();
        let y = if half >= 0.5 {
            0.5
        } else {
            mercator_y(self.center_lat).clamp(half, 1.0 - half)
        };
        self.center_lat = lat_from_mercator_y(y);
    }

    fn unproject_f(&self, px: f64, py: f64) -> (f64, f64) {
        let scale = self.scale();
        let x = (px - self.width as f64 / 2.0) / scale + mercator_x(self.center_lon);
        let y = (py - self.height as f64 / 2.0) / scale + mercator_y(self.center_lat);
        (x * 360.0 - 180.0, lat_from_mercator_y(y))
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        self.unproject_f(px as f64, py as f64)
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let scale = self.scale();
        let px = (mercator_x(lon) - mercator_x(self.center_lon)) * scale + self.width as f64 / 2.0;
        let py = (mercator_y(lat) - mercator_y(self.center_lat)) * scale + self.height as f64 / 2.0;
        (px.round() as i32, py.round() as i32)
    }

    /// Check if a projected point lands on the canvas
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= 0 && py >= 0 && px < self.width as i32 && py < self.height as i32
    }

    /// Rough bounding box check for a line segment
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0 && min_x < self.width as i32 && max_y >= 0 && min_y < self.height as i32
    }
}
