/// Pixels of the segment (x0, y0) -> (x1, y1), endpoints included (Bresenham).
pub struct LinePoints {
    x: i32,
    y: i32,
    x1: i32,
    y1: i32,
    dx: i32,
    dy: i32,
    sx: i32,
    sy: i32,
    err: i32,
    done: bool,
}

impl LinePoints {
    pub fn new((x0, y0): (i32, i32), (x1, y1): (i32, i32)) -> Self {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        Self {
            x: x0,
            y: y0,
            x1,
            y1,
            dx,
            dy,
            sx: if x0 < x1 { 1 } else { -1 },
            sy: if y0 < y1 { 1 } else { -1 },
            err: dx + dy,
            done: false,
        }
    }
}

impl Iterator for LinePoints {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let point = (self.x, self.y);
        if self.x == self.x1 && self.y == self.y1 {
            self.done = true;
            return Some(point);
        }

        let e2 = 2 * self.err;
        if e2 >= self.dy {
            self.err += self.dy;
            self.x += self.sx;
        }
        if e2 <= self.dx {
            self.err += self.dx;
            self.y += self.sy;
        }
        Some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let points: Vec<_> = LinePoints::new((0, 0), (3, 0)).collect();
        assert_eq!(points, vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn test_diagonal_reversed() {
        let points: Vec<_> = LinePoints::new((2, 2), (0, 0)).collect();
        assert_eq!(points, vec![(2, 2), (1, 1), (0, 0)]);
    }

    #[test]
    fn test_single_point() {
        assert_eq!(LinePoints::new((5, 5), (5, 5)).count(), 1);
    }
}
