//! Path resolution: turn the edge graph into closed loops and open chains.
//!
//! Closed loops are extracted first from the cycle core of the graph (what is
//! left after repeatedly pruning vertices of degree one), then the remaining
//! forest is walked leaf to leaf into open chains. Every edge lands in exactly
//! one path.
//!
//! At a vertex with several unused edges the walk takes the edge with the
//! smallest clockwise turn from the incoming direction (y axis pointing down).
//! Turns within [`ANGLE_EPSILON`] of each other are ties, broken by edge
//! insertion order.

use crate::{EdgeId, VectorNetwork, VertexId};
use kurbo::{BezPath, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::f64::consts::TAU;

const ANGLE_EPSILON: f64 = 1e-9;

/// One edge traversal inside a resolved path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub edge: EdgeId,
    /// True when the edge is walked from `b` to `a`
    pub reversed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPath {
    pub closed: bool,
    /// Visited vertices in walk order. Closed paths do not repeat the first vertex.
    pub vertices: Vec<VertexId>,
    pub steps: Vec<PathStep>,
}

#[derive(Debug, Clone, Copy)]
struct HalfEdge {
    edge: EdgeId,
    from: VertexId,
    to: VertexId,
    reversed: bool,
}

impl VectorNetwork {
    /// Resolve the network into closed loops followed by open chains
    pub fn resolve_paths(&self) -> Vec<ResolvedPath> {
        let adjacency = self.adjacency();
        let mut used: BTreeSet<EdgeId> = BTreeSet::new();
        let mut paths = Vec::new();

        loop {
            let core = self.cycle_core(&adjacency, &used);
            let Some(start) = core.iter().next().copied() else {
                break;
            };
            let path = self.trace_loop(start, &adjacency, &core);
            used.extend(path.steps.iter().map(|s| s.edge));
            paths.push(path);
        }

        while let Some(start) = self.chain_start(&adjacency, &used) {
            let path = self.trace_chain(start, &adjacency, &used);
            used.extend(path.steps.iter().map(|s| s.edge));
            paths.push(path);
        }

        tracing::trace!(
            closed = paths.iter().filter(|p| p.closed).count(),
            open = paths.iter().filter(|p| !p.closed).count(),
            "resolved vector network"
        );
        paths
    }

    /// Geometry for one resolved path
    pub fn path_geometry(&self, path: &ResolvedPath) -> BezPath {
        let mut bez = BezPath::new();
        let Some(first) = path.vertices.first().and_then(|v| self.vertex(*v)) else {
            return bez;
        };
        bez.move_to(first);

        for step in &path.steps {
            let Some(edge) = self.edge(step.edge) else {
                continue;
            };
            let (from, to, curve) = if step.reversed {
                (edge.b, edge.a, edge.curve.map(|c| c.reversed()))
            } else {
                (edge.a, edge.b, edge.curve)
            };
            let (Some(p0), Some(p3)) = (self.vertex(from), self.vertex(to)) else {
                continue;
            };
            match curve {
                Some(c) => bez.curve_to(p0 + c.ta, p3 + c.tb, p3),
                None => bez.line_to(p3),
            }
        }

        if path.closed {
            bez.close_path();
        }
        bez
    }

    fn adjacency(&self) -> BTreeMap<VertexId, Vec<HalfEdge>> {
        let mut adjacency: BTreeMap<VertexId, Vec<HalfEdge>> = BTreeMap::new();
        for (id, edge) in self.edges() {
            adjacency.entry(edge.a).or_default().push(HalfEdge {
                edge: id,
                from: edge.a,
                to: edge.b,
                reversed: false,
            });
            if edge.a != edge.b {
                adjacency.entry(edge.b).or_default().push(HalfEdge {
                    edge: id,
                    from: edge.b,
                    to: edge.a,
                    reversed: true,
                });
            }
        }
        adjacency
    }

    /// Unused edges that lie on at least one cycle
    fn cycle_core(
        &self,
        adjacency: &BTreeMap<VertexId, Vec<HalfEdge>>,
        used: &BTreeSet<EdgeId>,
    ) -> BTreeSet<EdgeId> {
        let mut alive: BTreeSet<EdgeId> = self
            .edges()
            .map(|(id, _)| id)
            .filter(|id| !used.contains(id))
            .collect();

        loop {
            let mut pruned = false;
            for half_edges in adjacency.values() {
                let live: Vec<&HalfEdge> =
                    half_edges.iter().filter(|h| alive.contains(&h.edge)).collect();
                // A curved self-loop counts twice toward degree
                let degree: usize = live.iter().map(|h| if h.from == h.to { 2 } else { 1 }).sum();
                if degree == 1 {
                    alive.remove(&live[0].edge);
                    pruned = true;
                }
            }
            if !pruned {
                return alive;
            }
        }
    }

    /// Walk from `start` inside the cycle core until a vertex repeats
    fn trace_loop(
        &self,
        start: EdgeId,
        adjacency: &BTreeMap<VertexId, Vec<HalfEdge>>,
        core: &BTreeSet<EdgeId>,
    ) -> ResolvedPath {
        let first = adjacency
            .values()
            .flatten()
            .find(|h| h.edge == start && !h.reversed)
            .copied();
        let Some(mut current) = first else {
            return ResolvedPath {
                closed: false,
                vertices: Vec::new(),
                steps: Vec::new(),
            };
        };

        let mut vertices = vec![current.from];
        let mut steps = vec![PathStep {
            edge: current.edge,
            reversed: current.reversed,
        }];
        let mut walked: BTreeSet<EdgeId> = BTreeSet::from([current.edge]);

        loop {
            if let Some(pos) = vertices.iter().position(|v| *v == current.to) {
                let mut loop_vertices = vertices.split_off(pos);
                let mut loop_steps = steps.split_off(pos);
                rotate_to_lowest(&mut loop_vertices, &mut loop_steps);
                return ResolvedPath {
                    closed: true,
                    vertices: loop_vertices,
                    steps: loop_steps,
                };
            }

            vertices.push(current.to);
            let incoming = self.arrival_direction(&current);
            let candidates = adjacency
                .get(&current.to)
                .into_iter()
                .flatten()
                .filter(|h| core.contains(&h.edge) && !walked.contains(&h.edge));

            // Every core vertex has a second core edge, so this only fails on a
            // network whose core was computed inconsistently.
            let Some(next) = self.pick_turn(incoming, candidates) else {
                return ResolvedPath {
                    closed: false,
                    steps,
                    vertices,
                };
            };

            walked.insert(next.edge);
            steps.push(PathStep {
                edge: next.edge,
                reversed: next.reversed,
            });
            current = next;
        }
    }

    /// Lowest vertex with exactly one unused edge, or any vertex with unused
    /// edges when only even-degree vertices remain
    fn chain_start(
        &self,
        adjacency: &BTreeMap<VertexId, Vec<HalfEdge>>,
        used: &BTreeSet<EdgeId>,
    ) -> Option<VertexId> {
        let degree = |v: &VertexId| {
            adjacency
                .get(v)
                .map(|hs| hs.iter().filter(|h| !used.contains(&h.edge)).count())
                .unwrap_or(0)
        };

        adjacency
            .keys()
            .find(|v| degree(v) == 1)
            .or_else(|| adjacency.keys().find(|v| degree(v) > 0))
            .copied()
    }

    fn trace_chain(
        &self,
        start: VertexId,
        adjacency: &BTreeMap<VertexId, Vec<HalfEdge>>,
        used: &BTreeSet<EdgeId>,
    ) -> ResolvedPath {
        let mut vertices = vec![start];
        let mut steps = Vec::new();
        let mut walked: BTreeSet<EdgeId> = BTreeSet::new();
        let mut at = start;
        let mut incoming: Option<Vec2> = None;

        loop {
            let candidates = adjacency
                .get(&at)
                .into_iter()
                .flatten()
                .filter(|h| !used.contains(&h.edge) && !walked.contains(&h.edge));

            let next = match incoming {
                Some(dir) => self.pick_turn(dir, candidates),
                None => candidates.min_by_key(|h| h.edge).copied(),
            };
            let Some(next) = next else {
                break;
            };

            walked.insert(next.edge);
            steps.push(PathStep {
                edge: next.edge,
                reversed: next.reversed,
            });
            vertices.push(next.to);
            incoming = Some(self.arrival_direction(&next));
            at = next.to;
        }

        ResolvedPath {
            closed: false,
            vertices,
            steps,
        }
    }

    fn pick_turn<'a>(
        &self,
        incoming: Vec2,
        candidates: impl Iterator<Item = &'a HalfEdge>,
    ) -> Option<HalfEdge> {
        let mut best: Option<(f64, HalfEdge)> = None;
        for candidate in candidates {
            let turn = clockwise_turn(incoming, self.departure_direction(candidate));
            let better = match &best {
                None => true,
                Some((best_turn, best_edge)) => {
                    turn < best_turn - ANGLE_EPSILON
                        || ((turn - best_turn).abs() <= ANGLE_EPSILON && candidate.edge < best_edge.edge)
                }
            };
            if better {
                best = Some((turn, *candidate));
            }
        }
        best.map(|(_, h)| h)
    }

    /// Direction of travel when leaving `h.from`
    fn departure_direction(&self, h: &HalfEdge) -> Vec2 {
        let chord = self.chord(h);
        let tangent = self.edge(h.edge).and_then(|e| e.curve).map(|c| {
            if h.reversed {
                c.tb
            } else {
                c.ta
            }
        });
        match tangent {
            Some(t) if t.hypot2() > 0.0 => t,
            _ => chord,
        }
    }

    /// Direction of travel when arriving at `h.to`
    fn arrival_direction(&self, h: &HalfEdge) -> Vec2 {
        let chord = self.chord(h);
        let tangent = self.edge(h.edge).and_then(|e| e.curve).map(|c| {
            if h.reversed {
                c.ta
            } else {
                c.tb
            }
        });
        match tangent {
            Some(t) if t.hypot2() > 0.0 => -t,
            _ => chord,
        }
    }

    fn chord(&self, h: &HalfEdge) -> Vec2 {
        match (self.vertex(h.from), self.vertex(h.to)) {
            (Some(a), Some(b)) => b - a,
            _ => Vec2::ZERO,
        }
    }
}

/// Clockwise angle from `incoming` to `outgoing` in `[0, 2π)`, y axis down
fn clockwise_turn(incoming: Vec2, outgoing: Vec2) -> f64 {
    let angle = incoming.cross(outgoing).atan2(incoming.dot(outgoing));
    let turn = angle.rem_euclid(TAU);
    if turn >= TAU - ANGLE_EPSILON {
        0.0
    } else {
        turn
    }
}

fn rotate_to_lowest(vertices: &mut [VertexId], steps: &mut [PathStep]) {
    let Some((pos, _)) = vertices.iter().enumerate().min_by_key(|(_, v)| **v) else {
        return;
    };
    vertices.rotate_left(pos);
    steps.rotate_left(pos);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Curve;
    use kurbo::Point;

    fn square(order: &[(usize, usize)]) -> VectorNetwork {
        let mut vn = VectorNetwork::new();
        let corners = [
            vn.add_vertex(Point::new(0.0, 0.0)),
            vn.add_vertex(Point::new(10.0, 0.0)),
            vn.add_vertex(Point::new(10.0, 10.0)),
            vn.add_vertex(Point::new(0.0, 10.0)),
        ];
        for (a, b) in order {
            vn.add_edge(corners[*a], corners[*b], None).unwrap();
        }
        vn
    }

    #[test]
    fn test_square_resolves_to_one_closed_path() {
        let vn = square(&[(0, 1), (1, 2), (2, 3), (3, 0)]);
        let paths = vn.resolve_paths();

        assert_eq!(paths.len(), 1);
        assert!(paths[0].closed);
        assert_eq!(paths[0].vertices.len(), 4);
        assert_eq!(paths[0].steps.len(), 4);
    }

    #[test]
    fn test_square_independent_of_edge_order() {
        let orders: [&[(usize, usize)]; 4] = [
            &[(0, 1), (1, 2), (2, 3), (3, 0)],
            &[(3, 0), (2, 3), (1, 2), (0, 1)],
            &[(2, 3), (0, 1), (3, 0), (1, 2)],
            &[(1, 0), (3, 2), (2, 1), (0, 3)],
        ];

        for order in orders {
            let paths = square(order).resolve_paths();
            assert_eq!(paths.len(), 1, "order {order:?}");
            assert!(paths[0].closed);
            assert_eq!(paths[0].vertices.len(), 4);
            assert_eq!(paths[0].vertices[0], VertexId(0));
        }
    }

    #[test]
    fn test_open_chain_starts_at_endpoint() {
        let mut vn = VectorNetwork::new();
        let a = vn.add_vertex(Point::new(0.0, 0.0));
        let b = vn.add_vertex(Point::new(10.0, 0.0));
        let c = vn.add_vertex(Point::new(20.0, 5.0));
        vn.add_edge(b, c, None).unwrap();
        vn.add_edge(a, b, None).unwrap();

        let paths = vn.resolve_paths();

        assert_eq!(paths.len(), 1);
        assert!(!paths[0].closed);
        assert_eq!(paths[0].vertices, vec![a, b, c]);
    }

    #[test]
    fn test_loop_with_dangling_tail() {
        // Triangle plus a tail hanging off one corner
        let mut vn = VectorNetwork::new();
        let a = vn.add_vertex(Point::new(0.0, 0.0));
        let b = vn.add_vertex(Point::new(10.0, 0.0));
        let c = vn.add_vertex(Point::new(5.0, 10.0));
        let tail = vn.add_vertex(Point::new(-10.0, -10.0));
        vn.add_edge(tail, a, None).unwrap();
        vn.add_edge(a, b, None).unwrap();
        vn.add_edge(b, c, None).unwrap();
        vn.add_edge(c, a, None).unwrap();

        let paths = vn.resolve_paths();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].closed);
        assert_eq!(paths[0].vertices.len(), 3);
        assert!(!paths[1].closed);
        // The remaining stub is walked from its lowest leaf
        assert_eq!(paths[1].vertices, vec![a, tail]);
    }

    #[test]
    fn test_branching_prefers_smallest_clockwise_turn() {
        // Walking east into the hub, a southward exit is a 90° clockwise turn
        // (y down) and a northward exit is 270°.
        let mut vn = VectorNetwork::new();
        let west = vn.add_vertex(Point::new(-10.0, 0.0));
        let hub = vn.add_vertex(Point::new(0.0, 0.0));
        let north = vn.add_vertex(Point::new(0.0, -10.0));
        let south = vn.add_vertex(Point::new(0.0, 10.0));
        vn.add_edge(west, hub, None).unwrap();
        vn.add_edge(hub, north, None).unwrap();
        vn.add_edge(hub, south, None).unwrap();

        let paths = vn.resolve_paths();

        // Chains start from the lowest leaf (west) and turn south first
        assert_eq!(paths[0].vertices, vec![west, hub, south]);
        assert_eq!(paths[1].vertices, vec![hub, north]);
    }

    #[test]
    fn test_antiparallel_tie_breaks_by_insertion_order() {
        let mut vn = VectorNetwork::new();
        let west = vn.add_vertex(Point::new(-10.0, 0.0));
        let hub = vn.add_vertex(Point::new(0.0, 0.0));
        let first = vn.add_vertex(Point::new(10.0, 0.0));
        let second = vn.add_vertex(Point::new(20.0, 0.0));
        vn.add_edge(west, hub, None).unwrap();
        let _a = vn.add_edge(hub, first, None).unwrap();
        let _b = vn.add_edge(hub, second, None).unwrap();

        let paths = vn.resolve_paths();
        assert_eq!(paths[0].vertices, vec![west, hub, first]);
    }

    #[test]
    fn test_curved_self_loop_is_closed() {
        let mut vn = VectorNetwork::new();
        let a = vn.add_vertex(Point::new(0.0, 0.0));
        vn.add_edge(
            a,
            a,
            Some(Curve::new(Vec2::new(20.0, -20.0), Vec2::new(-20.0, -20.0))),
        )
        .unwrap();

        let paths = vn.resolve_paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].closed);
        assert_eq!(paths[0].vertices, vec![a]);
    }

    #[test]
    fn test_path_geometry_closes_loops() {
        let vn = square(&[(0, 1), (1, 2), (2, 3), (3, 0)]);
        let svg = vn.to_svg_path();
        assert!(svg.starts_with('M'));
        assert!(svg.trim_end().ends_with('Z'));
    }

    #[test]
    fn test_empty_network_resolves_to_nothing() {
        assert!(VectorNetwork::new().resolve_paths().is_empty());
    }
}
