//! Parameter-space triangulation.
//!
//! Loops arrive as closed rings of `(uv, xyz)` pairs. Rings without holes
//! that are monotone in `u` go through a sweep-line triangulation, which
//! produces well-shaped strips on the rectangle-like rings that curved
//! faces unwrap to. Everything else gets its holes bridged into the outer
//! ring and is ear-clipped.
//!
//! Only boundary points are used; no interior points are inserted. Every
//! boundary segment therefore shows up as exactly one triangle edge per
//! face, which is what the watertightness of the final mesh rests on.

use stepmill_geom::{Point2, Point3, Vec2};
use stepmill_mesh::MeshBuilder;

/// A ring vertex: parameter-space position plus the 3D point it came from.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopVertex {
    pub uv: Point2,
    pub position: Point3,
}

/// Signed area of a closed ring (positive for counterclockwise).
pub(crate) fn signed_area(ring: &[LoopVertex]) -> f64 {
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = ring[i].uv;
        let b = ring[(i + 1) % ring.len()].uv;
        sum += a.x * b.y - b.x * a.y;
    }
    0.5 * sum
}

/// Triangulate a face region into `out`.
///
/// `outer` must be counterclockwise and holes clockwise. When `flip` is set
/// the emitted winding is reversed (face normal opposes the surface normal).
pub(crate) fn triangulate(
    outer: Vec<LoopVertex>,
    holes: Vec<Vec<LoopVertex>>,
    flip: bool,
    out: &mut MeshBuilder,
) {
    if outer.len() < 3 {
        return;
    }
    let eps = cross_eps(&outer);
    if holes.is_empty() && is_u_monotone(&outer) {
        sweep_monotone(&outer, flip, out);
    } else {
        let ring = bridge_holes(outer, holes, eps);
        ear_clip(ring, flip, eps, out);
    }
}

/// Emit one triangle, normalized to counterclockwise in uv before the
/// optional flip.
fn emit(a: &LoopVertex, b: &LoopVertex, c: &LoopVertex, flip: bool, out: &mut MeshBuilder) {
    let area = cross2(b.uv - a.uv, c.uv - a.uv);
    let (b, c) = if area < 0.0 { (c, b) } else { (b, c) };
    let (b, c) = if flip { (c, b) } else { (b, c) };
    out.push_triangle(pt(a), pt(b), pt(c));
}

fn pt(v: &LoopVertex) -> [f64; 3] {
    [v.position.x, v.position.y, v.position.z]
}

fn cross2(a: Vec2, b: Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Area epsilon scaled to the ring's extent.
fn cross_eps(ring: &[LoopVertex]) -> f64 {
    let mut lo = ring[0].uv;
    let mut hi = ring[0].uv;
    for v in ring {
        lo.x = lo.x.min(v.uv.x);
        lo.y = lo.y.min(v.uv.y);
        hi.x = hi.x.max(v.uv.x);
        hi.y = hi.y.max(v.uv.y);
    }
    let diag = (hi - lo).norm().max(1e-12);
    1e-10 * diag * diag
}

// ---------------------------------------------------------------------------
// Monotone sweep
// ---------------------------------------------------------------------------

fn lex_less(a: Point2, b: Point2) -> bool {
    (a.x, a.y) < (b.x, b.y)
}

/// A ring is u-monotone when walking it changes lexicographic direction
/// exactly twice (once at the minimum, once at the maximum).
pub(crate) fn is_u_monotone(ring: &[LoopVertex]) -> bool {
    let n = ring.len();
    let mut changes = 0;
    for i in 0..n {
        let a = lex_less(ring[i].uv, ring[(i + 1) % n].uv);
        let b = lex_less(ring[(i + 1) % n].uv, ring[(i + 2) % n].uv);
        if a != b {
            changes += 1;
        }
    }
    changes == 2
}

/// Classic monotone-polygon sweep. `ring` is counterclockwise, so the
/// forward walk from the lexicographic minimum to the maximum is the lower
/// chain.
fn sweep_monotone(ring: &[LoopVertex], flip: bool, out: &mut MeshBuilder) {
    let n = ring.len();
    let min_i = (0..n)
        .min_by(|&a, &b| ring[a].uv.x.total_cmp(&ring[b].uv.x).then(ring[a].uv.y.total_cmp(&ring[b].uv.y)))
        .unwrap_or(0);
    let max_i = (0..n)
        .max_by(|&a, &b| ring[a].uv.x.total_cmp(&ring[b].uv.x).then(ring[a].uv.y.total_cmp(&ring[b].uv.y)))
        .unwrap_or(0);

    // (vertex, on_lower_chain), merged in lexicographic order.
    let mut lower = Vec::new();
    let mut i = min_i;
    while i != max_i {
        lower.push(i);
        i = (i + 1) % n;
    }
    lower.push(max_i);
    let mut upper = Vec::new();
    let mut i = max_i;
    while i != min_i {
        i = (i + 1) % n;
        if i != min_i {
            upper.push(i);
        }
    }
    upper.reverse(); // now lexicographically increasing

    let mut merged: Vec<(usize, bool)> = Vec::with_capacity(n);
    let (mut li, mut ui) = (0, 0);
    while li < lower.len() || ui < upper.len() {
        let take_lower = match (lower.get(li), upper.get(ui)) {
            (Some(&l), Some(&u)) => lex_less(ring[l].uv, ring[u].uv),
            (Some(_), None) => true,
            _ => false,
        };
        if take_lower {
            merged.push((lower[li], true));
            li += 1;
        } else {
            merged.push((upper[ui], false));
            ui += 1;
        }
    }

    let mut stack: Vec<(usize, bool)> = vec![merged[0], merged[1]];
    for j in 2..merged.len() {
        let (vj, on_lower) = merged[j];
        let same_chain = stack.last().map(|&(_, c)| c == on_lower).unwrap_or(false);
        // The final vertex is adjacent to both chains and sees the entire
        // remaining stack; fan it the same way as an opposite-chain vertex.
        if !same_chain || j == merged.len() - 1 {
            let old_top = stack.last().copied();
            while stack.len() >= 2 {
                if let (Some(a), Some(&b)) = (stack.pop(), stack.last()) {
                    emit(&ring[vj], &ring[a.0], &ring[b.0], flip, out);
                }
            }
            stack.clear();
            if let Some(top) = old_top {
                stack.push(top);
            }
            stack.push((vj, on_lower));
        } else if let Some(mut last) = stack.pop() {
            while let Some(&top) = stack.last() {
                let a = ring[top.0].uv;
                let b = ring[last.0].uv;
                let c = ring[vj].uv;
                let turn = cross2(b - a, c - b);
                // Pop while the diagonal from vj to the next vertex down
                // stays inside the polygon.
                let inside = if on_lower { turn > 0.0 } else { turn < 0.0 };
                if !inside {
                    break;
                }
                emit(&ring[top.0], &ring[last.0], &ring[vj], flip, out);
                last = top;
                stack.pop();
            }
            stack.push(last);
            stack.push((vj, on_lower));
        }
    }
}

// ---------------------------------------------------------------------------
// Hole bridging + ear clipping
// ---------------------------------------------------------------------------

/// Splice holes into the outer ring with zero-width bridges.
///
/// Holes are processed rightmost-first; each connects its rightmost vertex
/// to the nearest visible ring vertex. Bridge vertices are duplicated, so
/// bridge segments appear twice (once per direction) and cancel out in the
/// edge pairing.
fn bridge_holes(
    mut ring: Vec<LoopVertex>,
    mut holes: Vec<Vec<LoopVertex>>,
    eps: f64,
) -> Vec<LoopVertex> {
    holes.retain(|h| h.len() >= 3);
    holes.sort_by(|a, b| max_u(b).total_cmp(&max_u(a)));
    for hole in holes {
        let j = rightmost(&hole);
        let m = hole[j].uv;

        let mut best: Option<(usize, f64)> = None;
        for (i, v) in ring.iter().enumerate() {
            if v.uv.x < m.x - eps {
                continue;
            }
            let d2 = (v.uv - m).norm_squared();
            if best.map(|(_, bd)| d2 < bd).unwrap_or(true) && visible(&ring, i, m) {
                best = Some((i, d2));
            }
        }
        // Visibility can fail on degenerate input; fall back to the nearest
        // ring vertex so the result stays a single ring.
        let anchor = best.map(|(i, _)| i).unwrap_or_else(|| nearest(&ring, m));

        let mut next = Vec::with_capacity(ring.len() + hole.len() + 2);
        next.extend_from_slice(&ring[..=anchor]);
        next.extend_from_slice(&hole[j..]);
        next.extend_from_slice(&hole[..=j]);
        next.push(ring[anchor]);
        next.extend_from_slice(&ring[anchor + 1..]);
        ring = next;
    }
    ring
}

fn max_u(ring: &[LoopVertex]) -> f64 {
    ring.iter().fold(f64::NEG_INFINITY, |m, v| m.max(v.uv.x))
}

fn rightmost(ring: &[LoopVertex]) -> usize {
    let mut best = 0;
    for (i, v) in ring.iter().enumerate() {
        if v.uv.x > ring[best].uv.x {
            best = i;
        }
    }
    best
}

fn nearest(ring: &[LoopVertex], m: Point2) -> usize {
    let mut best = 0;
    for (i, v) in ring.iter().enumerate() {
        if (v.uv - m).norm_squared() < (ring[best].uv - m).norm_squared() {
            best = i;
        }
    }
    best
}

/// Whether the segment from `m` to ring vertex `i` crosses any ring edge.
fn visible(ring: &[LoopVertex], i: usize, m: Point2) -> bool {
    let p = ring[i].uv;
    let n = ring.len();
    for k in 0..n {
        if k == i || (k + 1) % n == i {
            continue;
        }
        if segments_cross(m, p, ring[k].uv, ring[(k + 1) % n].uv) {
            return false;
        }
    }
    true
}

fn segments_cross(a: Point2, b: Point2, c: Point2, d: Point2) -> bool {
    let d1 = cross2(b - a, c - a);
    let d2 = cross2(b - a, d - a);
    let d3 = cross2(d - c, a - c);
    let d4 = cross2(d - c, b - c);
    (d1 * d2 < 0.0) && (d3 * d4 < 0.0)
}

/// Ear clipping on a counterclockwise ring.
///
/// Strictly convex ears are preferred; collinear ears are only taken when
/// no convex ear exists, and the zero-area triangles they produce keep the
/// boundary edge pairing closed. If numeric trouble leaves no ear at all,
/// the remainder is fanned.
fn ear_clip(mut ring: Vec<LoopVertex>, flip: bool, eps: f64, out: &mut MeshBuilder) {
    while ring.len() > 3 {
        let ear = find_ear(&ring, eps, false).or_else(|| find_ear(&ring, eps, true));
        match ear {
            Some(i) => {
                let n = ring.len();
                emit(
                    &ring[(i + n - 1) % n],
                    &ring[i],
                    &ring[(i + 1) % n],
                    flip,
                    out,
                );
                ring.remove(i);
            }
            None => {
                for i in 1..ring.len() - 1 {
                    emit(&ring[0], &ring[i], &ring[i + 1], flip, out);
                }
                return;
            }
        }
    }
    if ring.len() == 3 {
        emit(&ring[0], &ring[1], &ring[2], flip, out);
    }
}

fn find_ear(ring: &[LoopVertex], eps: f64, allow_collinear: bool) -> Option<usize> {
    let n = ring.len();
    'candidate: for i in 0..n {
        let a = ring[(i + n - 1) % n].uv;
        let b = ring[i].uv;
        let c = ring[(i + 1) % n].uv;
        let turn = cross2(b - a, c - b);
        if turn < -eps {
            continue; // reflex
        }
        if !allow_collinear && turn <= eps {
            continue;
        }
        for (k, v) in ring.iter().enumerate() {
            if k == i || k == (i + n - 1) % n || k == (i + 1) % n {
                continue;
            }
            if point_in_triangle(v.uv, a, b, c, eps) {
                continue 'candidate;
            }
        }
        return Some(i);
    }
    None
}

/// Strict containment; points on the boundary do not count.
fn point_in_triangle(p: Point2, a: Point2, b: Point2, c: Point2, eps: f64) -> bool {
    let d1 = cross2(b - a, p - a);
    let d2 = cross2(c - b, p - b);
    let d3 = cross2(a - c, p - c);
    d1 > eps && d2 > eps && d3 > eps
}
