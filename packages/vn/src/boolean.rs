//! Boolean composition of vector networks.
//!
//! Operands are resolved into closed regions first; open chains take no part.
//! Regions are compared by containment: a region is inside another when every
//! one of its vertices has non-zero winding in the other or lies on its
//! outline. Partially overlapping regions are kept whole, so the result is
//! exact for nested and disjoint shapes and conservative for crossing ones.
//!
//! The combined regions are copied into a fresh network and normalized, so the
//! output never carries duplicate vertices or dangling edges.

use crate::{ResolvedPath, VectorNetwork, VertexId};
use kurbo::{BezPath, ParamCurveNearest, Point, Shape};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BooleanOp {
    Union,
    Subtract,
    Intersect,
}

struct Region<'a> {
    network: &'a VectorNetwork,
    path: ResolvedPath,
    shape: BezPath,
}

impl Region<'_> {
    fn inside(&self, other: &Region<'_>, epsilon: f64) -> bool {
        self.path
            .vertices
            .iter()
            .filter_map(|v| self.network.vertex(*v))
            .all(|p| other.covers(p, epsilon))
    }

    fn covers(&self, p: Point, epsilon: f64) -> bool {
        if self.shape.winding(p) != 0 {
            return true;
        }
        let tolerance = epsilon * epsilon;
        self.shape
            .segments()
            .any(|seg| seg.nearest(p, 1e-9).distance_sq <= tolerance)
    }
}

fn regions(network: &VectorNetwork) -> Vec<Region<'_>> {
    network
        .resolve_paths()
        .into_iter()
        .filter(|p| p.closed)
        .map(|path| Region {
            shape: network.path_geometry(&path),
            network,
            path,
        })
        .collect()
}

/// Combine `a` and `b`. Vertices closer than `epsilon` are merged in the result.
pub fn boolean(a: &VectorNetwork, b: &VectorNetwork, op: BooleanOp, epsilon: f64) -> VectorNetwork {
    let lhs = regions(a);
    let rhs = regions(b);
    let inside = |r: &Region<'_>, s: &Region<'_>| r.inside(s, epsilon);

    // (region, reversed)
    let mut kept: Vec<(&Region<'_>, bool)> = Vec::new();

    match op {
        BooleanOp::Union => {
            // Equal regions (mutually inside) keep the left operand's copy
            for r in &lhs {
                if !rhs.iter().any(|s| inside(r, s) && !inside(s, r)) {
                    kept.push((r, false));
                }
            }
            for s in &rhs {
                if !lhs.iter().any(|r| inside(s, r)) {
                    kept.push((s, false));
                }
            }
        }
        BooleanOp::Intersect => {
            for r in &lhs {
                if rhs.iter().any(|s| inside(r, s)) {
                    kept.push((r, false));
                }
            }
            for s in &rhs {
                if lhs.iter().any(|r| inside(s, r) && !inside(r, s)) {
                    kept.push((s, false));
                }
            }
        }
        BooleanOp::Subtract => {
            let survivors: Vec<&Region<'_>> = lhs
                .iter()
                .filter(|r| !rhs.iter().any(|s| inside(r, s)))
                .collect();
            kept.extend(survivors.iter().map(|r| (*r, false)));
            // Regions of `b` inside a surviving outline become holes
            for s in &rhs {
                if survivors.iter().any(|r| inside(s, r)) {
                    kept.push((s, true));
                }
            }
        }
    }

    let mut out = VectorNetwork::new();
    for (region, reversed) in kept {
        append_region(&mut out, region, reversed);
    }

    let result = out.normalize(epsilon);
    tracing::debug!(
        ?op,
        lhs = lhs.len(),
        rhs = rhs.len(),
        edges = result.edge_count(),
        "boolean composition"
    );
    result
}

fn append_region(out: &mut VectorNetwork, region: &Region<'_>, reversed: bool) {
    let src = region.network;
    let mut remap: BTreeMap<VertexId, VertexId> = BTreeMap::new();
    for v in &region.path.vertices {
        if let Some(p) = src.vertex(*v) {
            remap.insert(*v, out.add_vertex(p));
        }
    }

    for step in &region.path.steps {
        let Some(edge) = src.edge(step.edge) else {
            continue;
        };
        let (Some(&a), Some(&b)) = (remap.get(&edge.a), remap.get(&edge.b)) else {
            continue;
        };
        // Reversing a region flips its winding; the edge keeps its own curve data
        let flip = step.reversed != reversed;
        let (from, to, curve) = if flip {
            (b, a, edge.curve.map(|c| c.reversed()))
        } else {
            (a, b, edge.curve)
        };
        // Both endpoints were just added, and a straight self-loop cannot be in a
        // resolved path
        let _ = out.add_edge(from, to, curve);
    }
}
