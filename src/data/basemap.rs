use crate::map::{Basemap, LineString, Lod};
use anyhow::Result;
use geojson::{GeoJson, Geometry, Value};
use std::fs;
use std::path::Path;

/// Coastline files by level of detail, tried in order.
const COASTLINE_FILES: [(&str, Lod); 4] = [
    ("ne_110m_coastline.json", Lod::Low),
    ("natural-earth.json", Lod::Medium),
    ("ne_50m_coastline.json", Lod::Medium),
    ("ne_10m_coastline.json", Lod::High),
];

const BORDER_FILES: [(&str, Lod); 2] = [
    ("ne_50m_borders.json", Lod::Medium),
    ("ne_10m_borders.json", Lod::High),
];

/// Load whatever Natural Earth GeoJSON files exist in `data_dir`.
/// A broken file is logged and skipped; the basemap is decoration, never fatal.
pub fn load_basemap(basemap: &mut Basemap, data_dir: &Path) {
    for (filename, lod) in COASTLINE_FILES {
        let path = data_dir.join(filename);
        if !path.exists() {
            continue;
        }
        match read_lines(&path) {
            Ok(lines) => {
                tracing::debug!(file = filename, lines = lines.len(), "loaded coastlines");
                lines.into_iter().for_each(|line| basemap.add_coastline(line, lod));
            }
            Err(e) => tracing::warn!(file = filename, error = %e, "failed to load coastlines"),
        }
    }

    for (filename, lod) in BORDER_FILES {
        let path = data_dir.join(filename);
        if !path.exists() {
            continue;
        }
        match read_lines(&path) {
            Ok(lines) => {
                tracing::debug!(file = filename, lines = lines.len(), "loaded borders");
                lines.into_iter().for_each(|line| basemap.add_border(line, lod));
            }
            Err(e) => tracing::warn!(file = filename, error = %e, "failed to load borders"),
        }
    }
}

fn read_lines(path: &Path) -> Result<Vec<LineString>> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;
    let mut lines = Vec::new();
    collect_lines(&geojson, &mut lines);
    Ok(lines)
}

/// Flatten every line-like geometry (polygon exteriors included) into lines.
fn collect_lines(geojson: &GeoJson, out: &mut Vec<LineString>) {
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for geometry in fc.features.iter().filter_map(|f| f.geometry.as_ref()) {
                collect_geometry(geometry, out);
            }
        }
        GeoJson::Feature(f) => {
            if let Some(geometry) = &f.geometry {
                collect_geometry(geometry, out);
            }
        }
        GeoJson::Geometry(geometry) => collect_geometry(geometry, out),
    }
}

fn collect_geometry(geometry: &Geometry, out: &mut Vec<LineString>) {
    let to_line = |coords: &Vec<Vec<f64>>| -> LineString {
        coords
            .iter()
            .filter(|c| c.len() >= 2)
            .map(|c| (c[0], c[1]))
            .collect()
    };

    match &geometry.value {
        Value::LineString(coords) => out.push(to_line(coords)),
        Value::MultiLineString(lines) => out.extend(lines.iter().map(to_line)),
        Value::Polygon(rings) => out.extend(rings.first().map(to_line)),
        Value::MultiPolygon(polygons) => {
            out.extend(polygons.iter().filter_map(|rings| rings.first()).map(to_line));
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_geometry(g, out);
            }
        }
        Value::Point(_) | Value::MultiPoint(_) => {}
    }
}

/// Rough continent outlines, used when no GeoJSON is available.
pub fn simple_world(basemap: &mut Basemap) {
    const OUTLINES: [&[(f64, f64)]; 6] = [
        // North America
        &[
            (-168.0, 65.0), (-141.0, 60.0), (-125.0, 48.0), (-117.0, 32.0),
            (-110.0, 25.0), (-97.0, 25.0), (-82.0, 24.0), (-81.0, 31.0),
            (-75.0, 35.0), (-70.0, 41.0), (-65.0, 47.0), (-55.0, 52.0),
            (-64.0, 60.0), (-80.0, 63.0), (-95.0, 62.0), (-110.0, 68.0),
            (-145.0, 70.0), (-168.0, 65.0),
        ],
        // South America
        &[
            (-80.0, 10.0), (-70.0, 5.0), (-50.0, 0.0), (-35.0, -5.0),
            (-38.0, -15.0), (-48.0, -25.0), (-58.0, -38.0), (-68.0, -50.0),
            (-75.0, -52.0), (-72.0, -40.0), (-70.0, -20.0), (-80.0, -5.0),
            (-80.0, 10.0),
        ],
        // Europe
        &[
            (-10.0, 36.0), (0.0, 38.0), (10.0, 44.0), (20.0, 40.0),
            (30.0, 40.0), (40.0, 43.0), (40.0, 55.0), (30.0, 60.0),
            (20.0, 70.0), (10.0, 71.0), (5.0, 58.0), (-10.0, 52.0),
            (-5.0, 43.0), (-10.0, 36.0),
        ],
        // Africa
        &[
            (-17.0, 15.0), (-15.0, 28.0), (-5.0, 35.0), (10.0, 37.0),
            (35.0, 30.0), (42.0, 12.0), (50.0, 12.0), (35.0, -5.0),
            (35.0, -25.0), (20.0, -35.0), (15.0, -30.0), (10.0, -15.0),
            (10.0, 0.0), (-10.0, 5.0), (-17.0, 15.0),
        ],
        // Asia
        &[
            (40.0, 43.0), (55.0, 37.0), (65.0, 25.0), (75.0, 15.0),
            (80.0, 8.0), (88.0, 22.0), (100.0, 14.0), (105.0, 10.0),
            (120.0, 22.0), (130.0, 35.0), (145.0, 45.0), (140.0, 55.0),
            (130.0, 52.0), (120.0, 40.0), (90.0, 50.0), (60.0, 55.0),
            (40.0, 43.0),
        ],
        // Australia
        &[
            (115.0, -20.0), (130.0, -12.0), (145.0, -15.0), (153.0, -30.0),
            (145.0, -38.0), (130.0, -32.0), (115.0, -35.0), (115.0, -20.0),
        ],
    ];

    for outline in OUTLINES {
        basemap.add_coastline(outline.to_vec(), Lod::Low);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_polygon_exterior_only() {
        let geojson: GeoJson = r#"{"type": "Polygon", "coordinates": [
            [[0, 0], [1, 0], [1, 1], [0, 0]],
            [[0.2, 0.2], [0.3, 0.2], [0.2, 0.2]]
        ]}"#
        .parse()
        .unwrap();
        let mut lines = Vec::new();
        collect_lines(&geojson, &mut lines);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 4);
    }

    #[test]
    fn test_load_basemap_reads_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("ne_110m_coastline.json"),
            r#"{"type": "FeatureCollection", "features": [
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "LineString", "coordinates": [[0, 0], [10, 10]]}}
            ]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("ne_50m_borders.json"), "not json").unwrap();

        let mut basemap = Basemap::new();
        load_basemap(&mut basemap, dir.path());
        assert!(basemap.has_data());
    }

    #[test]
    fn test_simple_world_has_data() {
        let mut basemap = Basemap::new();
        simple_world(&mut basemap);
        assert!(basemap.has_data());
    }
}
