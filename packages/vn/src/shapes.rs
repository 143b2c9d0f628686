use crate::{Curve, VectorNetwork, VertexId, DEFAULT_EPSILON};
use kurbo::{BezPath, Ellipse, PathEl, Point, QuadBez, Rect, Vec2};

/// Control point distance for a quarter circle approximated by one cubic
const KAPPA: f64 = 0.552_284_749_8;

impl VectorNetwork {
    /// Open chain through `points`
    pub fn polyline(points: &[Point]) -> Self {
        let mut vn = VectorNetwork::new();
        let ids: Vec<VertexId> = points.iter().map(|p| vn.add_vertex(*p)).collect();
        for pair in ids.windows(2) {
            let _ = vn.add_edge(pair[0], pair[1], None);
        }
        vn
    }

    /// Closed loop through `points`
    pub fn polygon(points: &[Point]) -> Self {
        let mut vn = Self::polyline(points);
        if points.len() > 2 {
            let first = vn.vertices().next().map(|(id, _)| id);
            let last = vn.vertices().last().map(|(id, _)| id);
            if let (Some(first), Some(last)) = (first, last) {
                let _ = vn.add_edge(last, first, None);
            }
        }
        vn
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::polygon(&[
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ])
    }

    /// Four cubic arcs through the axis extremes of an axis-aligned ellipse
    pub fn from_ellipse(ellipse: Ellipse) -> Self {
        let center = ellipse.center();
        let radii = ellipse.radii();
        let (rx, ry) = (radii.x, radii.y);
        let (kx, ky) = (rx * KAPPA, ry * KAPPA);

        let mut vn = VectorNetwork::new();
        let right = vn.add_vertex(center + Vec2::new(rx, 0.0));
        let bottom = vn.add_vertex(center + Vec2::new(0.0, ry));
        let left = vn.add_vertex(center + Vec2::new(-rx, 0.0));
        let top = vn.add_vertex(center + Vec2::new(0.0, -ry));

        let arcs = [
            (right, bottom, Vec2::new(0.0, ky), Vec2::new(kx, 0.0)),
            (bottom, left, Vec2::new(-kx, 0.0), Vec2::new(0.0, ky)),
            (left, top, Vec2::new(0.0, -ky), Vec2::new(-kx, 0.0)),
            (top, right, Vec2::new(kx, 0.0), Vec2::new(0.0, -ky)),
        ];
        for (a, b, ta, tb) in arcs {
            let _ = vn.add_edge(a, b, Some(Curve::new(ta, tb)));
        }
        vn
    }

    /// Convert path elements into a network. Quadratic segments are elevated
    /// to cubics; a segment ending on its subpath's start reuses that vertex.
    pub fn from_bez_path(path: &BezPath) -> Self {
        let mut vn = VectorNetwork::new();
        let mut start: Option<(VertexId, Point)> = None;
        let mut current: Option<(VertexId, Point)> = None;

        for el in path.elements() {
            match *el {
                PathEl::MoveTo(p) => {
                    let id = vn.add_vertex(p);
                    start = Some((id, p));
                    current = start;
                }
                PathEl::LineTo(p) => {
                    if let Some((from, _)) = current {
                        let to = vn.endpoint(p, start, from);
                        let _ = vn.add_edge(from, to, None);
                        current = Some((to, p));
                    }
                }
                PathEl::QuadTo(p1, p2) => {
                    if let Some((from, p0)) = current {
                        let cubic = QuadBez::new(p0, p1, p2).raise();
                        let to = vn.endpoint(p2, start, from);
                        let curve = Curve::new(cubic.p1 - cubic.p0, cubic.p2 - cubic.p3);
                        let _ = vn.add_edge(from, to, Some(curve));
                        current = Some((to, p2));
                    }
                }
                PathEl::CurveTo(p1, p2, p3) => {
                    if let Some((from, p0)) = current {
                        let to = vn.endpoint(p3, start, from);
                        let _ = vn.add_edge(from, to, Some(Curve::new(p1 - p0, p2 - p3)));
                        current = Some((to, p3));
                    }
                }
                PathEl::ClosePath => {
                    if let (Some((first, p)), Some((last, _))) = (start, current) {
                        if first != last {
                            let _ = vn.add_edge(last, first, None);
                        }
                        current = Some((first, p));
                    }
                }
            }
        }
        vn
    }

    /// Vertex for a segment ending at `p`: the subpath start when `p` lands on
    /// it, a fresh vertex otherwise
    fn endpoint(&mut self, p: Point, start: Option<(VertexId, Point)>, from: VertexId) -> VertexId {
        match start {
            Some((id, s)) if id != from && (p - s).hypot() <= DEFAULT_EPSILON => id,
            _ => self.add_vertex(p),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;

    #[test]
    fn test_polyline_is_open() {
        let vn = VectorNetwork::polyline(&[
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
            Point::new(10.0, 0.0),
        ]);
        let paths = vn.resolve_paths();
        assert_eq!(paths.len(), 1);
        assert!(!paths[0].closed);
        assert_eq!(vn.edge_count(), 2);
    }

    #[test]
    fn test_rect_is_closed_square() {
        let vn = VectorNetwork::from_rect(Rect::new(0.0, 0.0, 4.0, 2.0));
        let paths = vn.resolve_paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].closed);
        assert_eq!(vn.bounding_box(), Rect::new(0.0, 0.0, 4.0, 2.0));
    }

    #[test]
    fn test_ellipse_hits_axis_extremes() {
        let vn = VectorNetwork::from_ellipse(Ellipse::new((50.0, 50.0), (20.0, 10.0), 0.0));
        let bbox = vn.bounding_box();
        assert!((bbox.x0 - 30.0).abs() < 1e-9);
        assert!((bbox.x1 - 70.0).abs() < 1e-9);
        assert!((bbox.y0 - 40.0).abs() < 1e-9);
        assert!((bbox.y1 - 60.0).abs() < 1e-9);
        assert!(vn.resolve_paths()[0].closed);
    }

    #[test]
    fn test_from_bez_path_closes_onto_start() {
        let mut path = BezPath::new();
        path.move_to((0.0, 0.0));
        path.line_to((10.0, 0.0));
        path.quad_to((15.0, 5.0), (10.0, 10.0));
        path.line_to((0.0, 0.0));
        path.close_path();

        let vn = VectorNetwork::from_bez_path(&path);

        // The final line lands on the start vertex, close adds nothing
        assert_eq!(vn.vertex_count(), 3);
        assert_eq!(vn.edge_count(), 3);
        let paths = vn.resolve_paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].closed);
    }

    #[test]
    fn test_from_bez_path_keeps_subpaths_apart() {
        let mut path = Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1);
        let second = Rect::new(20.0, 0.0, 30.0, 10.0).to_path(0.1);
        path.extend(second.elements().iter().copied());

        let vn = VectorNetwork::from_bez_path(&path);

        let paths = vn.resolve_paths();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.closed));
    }
}
