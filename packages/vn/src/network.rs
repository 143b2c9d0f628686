use crate::{VnError, VnResult};
use kurbo::{BezPath, CubicBez, Line, ParamCurve, ParamCurveExtrema, PathSeg, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Default tolerance used when merging coincident vertices
pub const DEFAULT_EPSILON: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub u32);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Cubic control data for an edge.
///
/// Tangents are relative to their endpoint: the first control point of the
/// cubic is `a + ta`, the second is `b + tb`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub ta: Vec2,
    pub tb: Vec2,
}

impl Curve {
    pub fn new(ta: Vec2, tb: Vec2) -> Self {
        Self { ta, tb }
    }

    /// The same curve traversed from `b` to `a`
    pub fn reversed(self) -> Self {
        Self {
            ta: self.tb,
            tb: self.ta,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: VertexId,
    pub b: VertexId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<Curve>,
}

impl Edge {
    /// Geometry of this edge given its endpoint positions
    pub fn segment(&self, a: Point, b: Point) -> PathSeg {
        match self.curve {
            Some(curve) => PathSeg::Cubic(CubicBez::new(a, a + curve.ta, b + curve.tb, b)),
            None => PathSeg::Line(Line::new(a, b)),
        }
    }

    /// The endpoint opposite to `v`
    pub fn other(&self, v: VertexId) -> VertexId {
        if self.a == v {
            self.b
        } else {
            self.a
        }
    }
}

/// Editable vertex/edge graph.
///
/// Ids are allocated monotonically and never reused, so `EdgeId` order is
/// edge insertion order. Path resolution relies on that for tie-breaking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "NetworkRepr", try_from = "NetworkRepr")]
pub struct VectorNetwork {
    vertices: BTreeMap<VertexId, Point>,
    edges: BTreeMap<EdgeId, Edge>,
    next_vertex: u32,
    next_edge: u32,
}

impl VectorNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, pos: Point) -> VertexId {
        let id = VertexId(self.next_vertex);
        self.next_vertex += 1;
        self.vertices.insert(id, pos);
        id
    }

    /// Connect two vertices. A straight edge from a vertex to itself is rejected;
    /// a curved self-loop is allowed.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId, curve: Option<Curve>) -> VnResult<EdgeId> {
        self.require_vertex(a)?;
        self.require_vertex(b)?;
        if a == b && curve.is_none() {
            return Err(VnError::DegenerateEdge(a));
        }

        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.edges.insert(id, Edge { a, b, curve });
        Ok(id)
    }

    /// Split an edge at parameter `t`, replacing it with two edges that meet at a
    /// new vertex. Curved edges are subdivided exactly.
    pub fn split_edge(&mut self, edge_id: EdgeId, t: f64) -> VnResult<(VertexId, EdgeId, EdgeId)> {
        let edge = *self.edge(edge_id).ok_or(VnError::EdgeNotFound(edge_id))?;
        if !(t > 0.0 && t < 1.0) {
            return Err(VnError::InvalidSplit { edge: edge_id, t });
        }

        let (p0, p3) = self.endpoints(edge_id, &edge)?;

        let (mid, first, second) = match edge.curve {
            None => (p0.lerp(p3, t), None, None),
            Some(curve) => {
                let cubic = CubicBez::new(p0, p0 + curve.ta, p3 + curve.tb, p3);
                let left = cubic.subsegment(0.0..t);
                let right = cubic.subsegment(t..1.0);
                (
                    left.p3,
                    Some(Curve::new(left.p1 - left.p0, left.p2 - left.p3)),
                    Some(Curve::new(right.p1 - right.p0, right.p2 - right.p3)),
                )
            }
        };

        self.edges.remove(&edge_id);
        let v = self.add_vertex(mid);
        let e1 = self.add_edge(edge.a, v, first)?;
        let e2 = self.add_edge(v, edge.b, second)?;

        tracing::trace!(edge = %edge_id, t, vertex = %v, "split edge");
        Ok((v, e1, e2))
    }

    /// Remove a vertex and every edge incident to it
    pub fn remove_vertex(&mut self, id: VertexId) -> VnResult<Point> {
        let pos = self.vertices.remove(&id).ok_or(VnError::VertexNotFound(id))?;
        self.edges.retain(|_, e| e.a != id && e.b != id);
        Ok(pos)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> VnResult<Edge> {
        self.edges.remove(&id).ok_or(VnError::EdgeNotFound(id))
    }

    pub fn move_vertex(&mut self, id: VertexId, pos: Point) -> VnResult<()> {
        let slot = self.vertices.get_mut(&id).ok_or(VnError::VertexNotFound(id))?;
        *slot = pos;
        Ok(())
    }

    pub fn set_curve(&mut self, id: EdgeId, curve: Option<Curve>) -> VnResult<()> {
        let edge = self.edges.get_mut(&id).ok_or(VnError::EdgeNotFound(id))?;
        if edge.a == edge.b && curve.is_none() {
            return Err(VnError::DegenerateEdge(edge.a));
        }
        edge.curve = curve;
        Ok(())
    }

    pub fn translate(&mut self, delta: Vec2) {
        for pos in self.vertices.values_mut() {
            *pos += delta;
        }
    }

    pub fn vertex(&self, id: VertexId) -> Option<Point> {
        self.vertices.get(&id).copied()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, Point)> + '_ {
        self.vertices.iter().map(|(id, p)| (*id, *p))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges.iter().map(|(id, e)| (*id, e))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Edges touching `v`, in insertion order
    pub fn incident_edges(&self, v: VertexId) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|(_, e)| e.a == v || e.b == v)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Geometry of an edge
    pub fn segment(&self, id: EdgeId) -> Option<PathSeg> {
        let edge = self.edges.get(&id)?;
        let (a, b) = self.endpoints(id, edge).ok()?;
        Some(edge.segment(a, b))
    }

    fn endpoints(&self, id: EdgeId, edge: &Edge) -> VnResult<(Point, Point)> {
        let point = |v: VertexId| {
            self.vertices
                .get(&v)
                .copied()
                .ok_or(VnError::DanglingEdge { edge: id, vertex: v })
        };
        Ok((point(edge.a)?, point(edge.b)?))
    }

    /// Exact bounds of all edge geometry plus isolated vertices
    pub fn bounding_box(&self) -> Rect {
        let mut bounds: Option<Rect> = None;
        let mut grow = |r: Rect| {
            bounds = Some(match bounds {
                Some(b) => b.union(r),
                None => r,
            });
        };

        for id in self.edges.keys() {
            if let Some(seg) = self.segment(*id) {
                grow(ParamCurveExtrema::bounding_box(&seg));
            }
        }
        for (id, p) in &self.vertices {
            if self.incident_edges(*id).is_empty() {
                grow(Rect::from_points(*p, *p));
            }
        }

        bounds.unwrap_or(Rect::ZERO)
    }

    /// Merge vertices closer than `epsilon`, drop degenerate and duplicate
    /// edges, then drop vertices no edge uses.
    ///
    /// Returns a new network; ids are reassigned in the original order.
    pub fn normalize(&self, epsilon: f64) -> VectorNetwork {
        let mut out = VectorNetwork::new();
        let mut remap: BTreeMap<VertexId, VertexId> = BTreeMap::new();

        let used: BTreeSet<VertexId> = self.edges.values().flat_map(|e| [e.a, e.b]).collect();

        for (id, p) in &self.vertices {
            if !used.contains(id) {
                continue;
            }
            let existing = out
                .vertices
                .iter()
                .find(|(_, q)| (q.x - p.x).abs() <= epsilon && (q.y - p.y).abs() <= epsilon)
                .map(|(qid, _)| *qid);
            let target = match existing {
                Some(qid) => qid,
                None => out.add_vertex(*p),
            };
            remap.insert(*id, target);
        }

        for edge in self.edges.values() {
            let (Some(&a), Some(&b)) = (remap.get(&edge.a), remap.get(&edge.b)) else {
                continue;
            };
            if a == b && edge.curve.is_none() {
                continue;
            }
            if out.has_equivalent_edge(a, b, edge.curve, epsilon) {
                continue;
            }
            // a and b exist in `out`, and the degenerate case was skipped above
            let _ = out.add_edge(a, b, edge.curve);
        }

        out
    }

    fn has_equivalent_edge(&self, a: VertexId, b: VertexId, curve: Option<Curve>, epsilon: f64) -> bool {
        let same_curve = |x: Option<Curve>, y: Option<Curve>| match (x, y) {
            (None, None) => true,
            (Some(x), Some(y)) => {
                (x.ta - y.ta).hypot() <= epsilon && (x.tb - y.tb).hypot() <= epsilon
            }
            _ => false,
        };

        self.edges.values().any(|e| {
            (e.a == a && e.b == b && same_curve(e.curve, curve))
                || (e.a == b && e.b == a && same_curve(e.curve, curve.map(Curve::reversed)))
        })
    }

    /// Every edge as its own subpath, in edge order
    pub fn to_edge_path(&self) -> BezPath {
        let mut path = BezPath::new();
        for id in self.edges.keys() {
            if let Some(seg) = self.segment(*id) {
                path.move_to(seg.start());
                match seg {
                    PathSeg::Line(l) => path.line_to(l.p1),
                    PathSeg::Cubic(c) => path.curve_to(c.p1, c.p2, c.p3),
                    PathSeg::Quad(q) => path.quad_to(q.p1, q.p2),
                }
            }
        }
        path
    }

    /// Render-ready path: resolved loops are closed, chains stay open
    pub fn to_bez_path(&self) -> BezPath {
        let mut out = BezPath::new();
        for path in self.resolve_paths() {
            for el in self.path_geometry(&path).elements() {
                out.push(*el);
            }
        }
        out
    }

    pub fn to_svg_path(&self) -> String {
        self.to_bez_path().to_svg()
    }

    fn require_vertex(&self, id: VertexId) -> VnResult<()> {
        if self.vertices.contains_key(&id) {
            Ok(())
        } else {
            Err(VnError::VertexNotFound(id))
        }
    }
}

/// Serialized form; counters are optional and never trusted below the ids in use
#[derive(Serialize, Deserialize)]
struct NetworkRepr {
    vertices: BTreeMap<VertexId, Point>,
    edges: BTreeMap<EdgeId, Edge>,
    #[serde(default)]
    next_vertex: u32,
    #[serde(default)]
    next_edge: u32,
}

impl From<VectorNetwork> for NetworkRepr {
    fn from(vn: VectorNetwork) -> Self {
        NetworkRepr {
            vertices: vn.vertices,
            edges: vn.edges,
            next_vertex: vn.next_vertex,
            next_edge: vn.next_edge,
        }
    }
}

impl TryFrom<NetworkRepr> for VectorNetwork {
    type Error = VnError;

    fn try_from(repr: NetworkRepr) -> Result<Self, Self::Error> {
        for (id, edge) in &repr.edges {
            for v in [edge.a, edge.b] {
                if !repr.vertices.contains_key(&v) {
                    return Err(VnError::DanglingEdge { edge: *id, vertex: v });
                }
            }
            if edge.a == edge.b && edge.curve.is_none() {
                return Err(VnError::DegenerateEdge(edge.a));
            }
        }
        let after = |last: Option<u32>| last.map_or(0, |id| id.saturating_add(1));
        Ok(VectorNetwork {
            next_vertex: repr.next_vertex.max(after(repr.vertices.keys().next_back().map(|v| v.0))),
            next_edge: repr.next_edge.max(after(repr.edges.keys().next_back().map(|e| e.0))),
            vertices: repr.vertices,
            edges: repr.edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_network() -> (VectorNetwork, VertexId, VertexId, EdgeId) {
        let mut vn = VectorNetwork::new();
        let a = vn.add_vertex(Point::new(0.0, 0.0));
        let b = vn.add_vertex(Point::new(100.0, 0.0));
        let e = vn.add_edge(a, b, None).unwrap();
        (vn, a, b, e)
    }

    #[test]
    fn test_add_edge_requires_vertices() {
        let mut vn = VectorNetwork::new();
        let a = vn.add_vertex(Point::ZERO);
        let err = vn.add_edge(a, VertexId(42), None).unwrap_err();
        assert_eq!(err, VnError::VertexNotFound(VertexId(42)));
    }

    #[test]
    fn test_straight_self_loop_rejected() {
        let mut vn = VectorNetwork::new();
        let a = vn.add_vertex(Point::ZERO);
        assert_eq!(vn.add_edge(a, a, None), Err(VnError::DegenerateEdge(a)));

        let curve = Curve::new(Vec2::new(10.0, -10.0), Vec2::new(-10.0, -10.0));
        assert!(vn.add_edge(a, a, Some(curve)).is_ok());
    }

    #[test]
    fn test_split_straight_edge() {
        let (mut vn, a, b, e) = line_network();

        let (v, e1, e2) = vn.split_edge(e, 0.25).unwrap();

        assert_eq!(vn.vertex(v), Some(Point::new(25.0, 0.0)));
        assert!(vn.edge(e).is_none());
        assert_eq!(vn.edge(e1).map(|x| (x.a, x.b)), Some((a, v)));
        assert_eq!(vn.edge(e2).map(|x| (x.a, x.b)), Some((v, b)));
        assert_eq!(vn.edge_count(), 2);
    }

    #[test]
    fn test_split_curved_edge_preserves_geometry() {
        let mut vn = VectorNetwork::new();
        let a = vn.add_vertex(Point::new(0.0, 0.0));
        let b = vn.add_vertex(Point::new(100.0, 0.0));
        let curve = Curve::new(Vec2::new(30.0, 60.0), Vec2::new(-30.0, 60.0));
        let e = vn.add_edge(a, b, Some(curve)).unwrap();
        let original = CubicBez::new(
            Point::new(0.0, 0.0),
            Point::new(30.0, 60.0),
            Point::new(70.0, 60.0),
            Point::new(100.0, 0.0),
        );

        let (v, e1, e2) = vn.split_edge(e, 0.5).unwrap();

        let mid = vn.vertex(v).unwrap();
        assert!((mid - original.eval(0.5)).hypot() < 1e-9);

        // Halves evaluate onto the original curve
        let left = vn.segment(e1).unwrap();
        let right = vn.segment(e2).unwrap();
        assert!((left.eval(0.5) - original.eval(0.25)).hypot() < 1e-9);
        assert!((right.eval(0.5) - original.eval(0.75)).hypot() < 1e-9);
    }

    #[test]
    fn test_split_rejects_out_of_range() {
        let (mut vn, _, _, e) = line_network();
        assert!(matches!(vn.split_edge(e, 0.0), Err(VnError::InvalidSplit { .. })));
        assert!(matches!(vn.split_edge(e, 1.0), Err(VnError::InvalidSplit { .. })));
        assert!(matches!(vn.split_edge(EdgeId(99), 0.5), Err(VnError::EdgeNotFound(_))));
        assert_eq!(vn.edge_count(), 1);
    }

    #[test]
    fn test_remove_vertex_cascades() {
        let (mut vn, a, b, _) = line_network();
        let c = vn.add_vertex(Point::new(50.0, 50.0));
        vn.add_edge(b, c, None).unwrap();

        vn.remove_vertex(b).unwrap();

        assert_eq!(vn.edge_count(), 0);
        assert!(vn.vertex(a).is_some());
        assert!(vn.vertex(c).is_some());
    }

    #[test]
    fn test_ids_never_reused() {
        let (mut vn, _, b, _) = line_network();
        vn.remove_vertex(b).unwrap();
        let fresh = vn.add_vertex(Point::ZERO);
        assert_ne!(fresh, b);
    }

    #[test]
    fn test_normalize_merges_close_vertices_and_duplicates() {
        let mut vn = VectorNetwork::new();
        let a = vn.add_vertex(Point::new(0.0, 0.0));
        let b = vn.add_vertex(Point::new(10.0, 0.0));
        let b2 = vn.add_vertex(Point::new(10.0005, 0.0));
        let lonely = vn.add_vertex(Point::new(99.0, 99.0));
        vn.add_edge(a, b, None).unwrap();
        vn.add_edge(b2, a, None).unwrap();
        vn.add_edge(b, b2, None).unwrap();
        let _ = lonely;

        let normalized = vn.normalize(DEFAULT_EPSILON);

        assert_eq!(normalized.vertex_count(), 2);
        assert_eq!(normalized.edge_count(), 1);
    }

    #[test]
    fn test_bounding_box_includes_curve_extrema() {
        let mut vn = VectorNetwork::new();
        let a = vn.add_vertex(Point::new(0.0, 0.0));
        let b = vn.add_vertex(Point::new(100.0, 0.0));
        vn.add_edge(a, b, Some(Curve::new(Vec2::new(0.0, 40.0), Vec2::new(0.0, 40.0))))
            .unwrap();

        let bbox = vn.bounding_box();
        assert_eq!(bbox.x0, 0.0);
        assert_eq!(bbox.x1, 100.0);
        assert!((bbox.y1 - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_serde_keeps_topology() {
        let (vn, ..) = line_network();
        let json = serde_json::to_string(&vn).unwrap();
        let back: VectorNetwork = serde_json::from_str(&json).unwrap();
        assert_eq!(vn, back);
    }

    #[test]
    fn test_deserialize_rejects_dangling_edge() {
        let json = r#"{"vertices":{"0":[0,0]},"edges":{"0":{"a":0,"b":5}},"next_vertex":1,"next_edge":1}"#;
        let err = serde_json::from_str::<VectorNetwork>(json).unwrap_err();
        assert!(err.to_string().contains("v5"));
    }

    #[test]
    fn test_deserialize_raises_stale_counters() {
        let json = r#"{"vertices":{"0":[0,0],"3":[10,0]},"edges":{"7":{"a":0,"b":3}},"next_vertex":0,"next_edge":2}"#;
        let mut vn: VectorNetwork = serde_json::from_str(json).unwrap();
        assert_eq!(vn.bounding_box(), Rect::new(0.0, 0.0, 10.0, 0.0));

        let v = vn.add_vertex(Point::new(5.0, 5.0));
        assert_eq!(v, VertexId(4));
        assert_eq!(vn.add_edge(VertexId(3), v, None).unwrap(), EdgeId(8));
    }

    #[test]
    fn test_serde_keeps_counters() {
        let (mut vn, a, b, e) = line_network();
        vn.remove_edge(e).unwrap();
        let back: VectorNetwork = serde_json::from_str(&serde_json::to_string(&vn).unwrap()).unwrap();
        assert_eq!(back, vn);

        let mut back = back;
        assert_eq!(back.add_edge(a, b, None).unwrap(), EdgeId(1));
    }
}
