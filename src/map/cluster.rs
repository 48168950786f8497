use crate::map::projection::{Bounds, Viewport};
use crate::marker::Marker;
use std::collections::HashMap;

/// One drawable map symbol: a lone marker or a group of nearby markers.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Indices into the marker list, in input order
    pub members: Vec<usize>,
    /// Mean pixel position of the members
    pub px: i32,
    pub py: i32,
}

impl Cluster {
    pub fn is_single(&self) -> bool {
        self.members.len() == 1
    }

    /// Geographic bounds of the members.
    pub fn bounds(&self, markers: &[Marker]) -> Option<Bounds> {
        Bounds::around(
            self.members
                .iter()
                .filter_map(|&i| markers.get(i))
                .map(|m| (m.lon, m.lat)),
        )
    }
}

/// Greedy distance clustering in screen space.
///
/// Markers are visited in order; each joins the first existing cluster whose
/// seed lies within `radius` pixels, otherwise it seeds a new cluster. Seeds are
/// bucketed in a grid of `radius`-sized cells so only the 3x3 neighbourhood is
/// searched. A `radius` of 0 disables grouping.
pub fn cluster_markers(markers: &[Marker], viewport: &Viewport, radius: u32) -> Vec<Cluster> {
    let projected: Vec<(i32, i32)> = markers
        .iter()
        .map(|m| viewport.project(m.lon, m.lat))
        .collect();

    if radius == 0 {
        return projected
            .iter()
            .enumerate()
            .map(|(i, &(px, py))| Cluster { members: vec![i], px, py })
            .collect();
    }

    let r = radius as i32;
    let r2 = i64::from(r) * i64::from(r);
    let cell_of = |(x, y): (i32, i32)| (x.div_euclid(r), y.div_euclid(r));

    let mut seeds: Vec<(i32, i32)> = Vec::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut grid: HashMap<(i32, i32), Vec<usize>> = HashMap::new();

    for (i, &p) in projected.iter().enumerate() {
        let (cx, cy) = cell_of(p);
        let nearest = (-1..=1)
            .flat_map(|dy| (-1..=1).map(move |dx| (cx + dx, cy + dy)))
            .filter_map(|cell| grid.get(&cell))
            .flatten()
            .copied()
            .filter(|&g| {
                let (sx, sy) = seeds[g];
                let (dx, dy) = (i64::from(sx - p.0), i64::from(sy - p.1));
                dx * dx + dy * dy <= r2
            })
            .min();

        match nearest {
            Some(g) => groups[g].push(i),
            None => {
                grid.entry((cx, cy)).or_default().push(groups.len());
                seeds.push(p);
                groups.push(vec![i]);
            }
        }
    }

    groups
        .into_iter()
        .map(|members| {
            let n = members.len() as i64;
            let (sx, sy) = members.iter().fold((0i64, 0i64), |(ax, ay), &i| {
                (ax + i64::from(projected[i].0), ay + i64::from(projected[i].1))
            });
            Cluster {
                px: (sx / n) as i32,
                py: (sy / n) as i32,
                members,
            }
        })
        .collect()
}

/// Cluster drawn at (px, py) within `tolerance` pixels, preferring the closest.
pub fn hit_test(clusters: &[Cluster], px: i32, py: i32, tolerance: i32) -> Option<usize> {
    clusters
        .iter()
        .enumerate()
        .filter(|(_, c)| (c.px - px).abs() <= tolerance && (c.py - py).abs() <= tolerance)
        .min_by_key(|(_, c)| (c.px - px).abs() + (c.py - py).abs())
        .map(|(i, _)| i)
}
