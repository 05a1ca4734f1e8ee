//! 2-D Delaunay triangulation with barycentric point location.

/// Barycentric weights below this are treated as zero, so mesh points on a
/// hull edge still land in a triangle.
const CONTAINMENT_EPS: f64 = 1e-9;

/// Triangles with a smaller doubled area are dropped as degenerate.
const AREA_EPS: f64 = 1e-14;

/// A triangulation of a planar point set.
#[derive(Debug, Clone)]
pub struct Triangulation {
    points: Vec<[f64; 2]>,
    triangles: Vec<[usize; 3]>,
}

impl Triangulation {
    /// Triangulate `points`. Every triangle indexes into `points`.
    ///
    /// Fewer than three points, or a collinear set, yields no triangles.
    pub fn new(points: &[[f64; 2]]) -> Self {
        if points.len() < 3 {
            return Self {
                points: points.to_vec(),
                triangles: Vec::new(),
            };
        }

        let delaunator_points: Vec<delaunator::Point> = points
            .iter()
            .map(|p| delaunator::Point { x: p[0], y: p[1] })
            .collect();
        let triangulation = delaunator::triangulate(&delaunator_points);

        let triangles = triangulation
            .triangles
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .filter(|tri| doubled_area(points, tri).abs() > AREA_EPS)
            .collect();

        Self {
            points: points.to_vec(),
            triangles,
        }
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Find the triangle containing `p` and its barycentric weights.
    ///
    /// When `p` lies on a shared edge any adjacent triangle may be returned;
    /// the interpolated value is the same along that edge.
    pub fn locate(&self, p: [f64; 2]) -> Option<(usize, [f64; 3])> {
        let mut best: Option<(usize, [f64; 3], f64)> = None;

        for (ti, tri) in self.triangles.iter().enumerate() {
            let Some(weights) = barycentric(&self.points, tri, p) else {
                continue;
            };
            let worst = weights[0].min(weights[1]).min(weights[2]);
            if worst >= 0.0 {
                return Some((ti, weights));
            }
            if worst >= -CONTAINMENT_EPS && best.map_or(true, |(_, _, w)| worst > w) {
                best = Some((ti, weights, worst));
            }
        }

        best.map(|(ti, weights, _)| (ti, weights))
    }
}

fn doubled_area(points: &[[f64; 2]], tri: &[usize; 3]) -> f64 {
    let [a, b, c] = [points[tri[0]], points[tri[1]], points[tri[2]]];
    (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])
}

fn barycentric(points: &[[f64; 2]], tri: &[usize; 3], p: [f64; 2]) -> Option<[f64; 3]> {
    let [x1, y1] = points[tri[0]];
    let [x2, y2] = points[tri[1]];
    let [x3, y3] = points[tri[2]];

    let denom = (y2 - y3) * (x1 - x3) + (x3 - x2) * (y1 - y3);
    if denom.abs() < AREA_EPS {
        return None;
    }

    let l1 = ((y2 - y3) * (p[0] - x3) + (x3 - x2) * (p[1] - y3)) / denom;
    let l2 = ((y3 - y1) * (p[0] - x3) + (x1 - x3) * (p[1] - y3)) / denom;
    Some([l1, l2, 1.0 - l1 - l2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::scattered_unit_points;

    fn lattice(nx: usize, ny: usize) -> Vec<[f64; 2]> {
        let mut points = Vec::new();
        for j in 0..ny {
            for i in 0..nx {
                points.push([i as f64 / (nx - 1) as f64, j as f64 / (ny - 1) as f64]);
            }
        }
        points
    }

    fn total_area(tri: &Triangulation) -> f64 {
        tri.triangles()
            .iter()
            .map(|t| doubled_area(tri.points(), t).abs() / 2.0)
            .sum()
    }

    #[test]
    fn test_square_two_triangles() {
        let tri = Triangulation::new(&lattice(2, 2));
        assert_eq!(tri.triangles().len(), 2);
        assert!((total_area(&tri) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lattice_covers_hull() {
        let tri = Triangulation::new(&lattice(5, 4));
        assert!((total_area(&tri) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_scattered_points_cover_hull() {
        for seed in [1, 8, 42, 117, 2024] {
            let points: Vec<[f64; 2]> = scattered_unit_points(seed, 60)
                .into_iter()
                .map(|(x, y)| [x, y])
                .collect();
            let tri = Triangulation::new(&points);
            let area = total_area(&tri);
            assert!((area - 1.0).abs() < 1e-9, "seed {}: area {}", seed, area);
        }
    }

    #[test]
    fn test_collinear_yields_no_triangles() {
        let points = vec![[0.0, 0.0], [0.5, 0.0], [1.0, 0.0]];
        assert!(Triangulation::new(&points).is_empty());
    }

    #[test]
    fn test_locate_inside_and_outside() {
        let points = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let tri = Triangulation::new(&points);
        let (_, w) = tri.locate([0.25, 0.25]).unwrap();
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(w.iter().all(|&x| x >= 0.0));

        // On the hypotenuse
        assert!(tri.locate([0.5, 0.5]).is_some());
        assert!(tri.locate([0.8, 0.8]).is_none());
    }
}
