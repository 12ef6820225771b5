//! Planar polygon helpers for custom vertex bodies
//!
//! A vertex body is an arbitrary simple outline. Before it reaches the
//! engine it is cleaned, checked, re-wound counter-clockwise and recentred
//! on its centroid; concave outlines are then split into convex pieces
//! (ear clipping, followed by Hertel–Mehlhorn merging of the triangles).

use log::debug;

use crate::error::ShapeError;
use crate::simulation::engine::polygon_area;
use crate::simulation::states::NVec2;

const EPS: f64 = 1e-9;

/// z component of (b - a) × (c - b)
fn turn(a: NVec2, b: NVec2, c: NVec2) -> f64 {
    let ab = b - a;
    let bc = c - b;
    ab.x * bc.y - ab.y * bc.x
}

/// Area-weighted centroid. Falls back to the vertex mean for zero area.
pub fn centroid(points: &[NVec2]) -> NVec2 {
    let area = polygon_area(points);
    if area.abs() < EPS {
        let sum = points.iter().fold(NVec2::zeros(), |acc, p| acc + p);
        return sum / points.len().max(1) as f64;
    }
    let n = points.len();
    let mut c = NVec2::zeros();
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let cross = a.x * b.y - b.x * a.y;
        c += (a + b) * cross;
    }
    c / (6.0 * area)
}

/// Reverse the outline if it is wound clockwise
pub fn normalize_ccw(points: &mut [NVec2]) {
    if polygon_area(points) < 0.0 {
        points.reverse();
    }
}

pub fn is_convex(points: &[NVec2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let sign = polygon_area(points).signum();
    (0..n).all(|i| {
        let t = turn(points[i], points[(i + 1) % n], points[(i + 2) % n]);
        t * sign >= -EPS
    })
}

fn orientation(a: NVec2, b: NVec2, c: NVec2) -> i8 {
    let v = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if v > EPS {
        1
    } else if v < -EPS {
        -1
    } else {
        0
    }
}

fn on_segment(a: NVec2, b: NVec2, p: NVec2) -> bool {
    p.x <= a.x.max(b.x) + EPS
        && p.x >= a.x.min(b.x) - EPS
        && p.y <= a.y.max(b.y) + EPS
        && p.y >= a.y.min(b.y) - EPS
}

fn segments_intersect(p1: NVec2, p2: NVec2, q1: NVec2, q2: NVec2) -> bool {
    let o1 = orientation(p1, p2, q1);
    let o2 = orientation(p1, p2, q2);
    let o3 = orientation(q1, q2, p1);
    let o4 = orientation(q1, q2, p2);

    if o1 != o2 && o3 != o4 && o1 != 0 && o2 != 0 && o3 != 0 && o4 != 0 {
        return true;
    }
    (o1 == 0 && on_segment(p1, p2, q1))
        || (o2 == 0 && on_segment(p1, p2, q2))
        || (o3 == 0 && on_segment(q1, q2, p1))
        || (o4 == 0 && on_segment(q1, q2, p2))
}

/// First pair of non-adjacent edges that touch or cross, if any.
/// Edge `i` runs from `points[i]` to `points[i + 1]`.
pub fn find_self_intersection(points: &[NVec2]) -> Option<(usize, usize)> {
    let n = points.len();
    for i in 0..n {
        let (a1, a2) = (points[i], points[(i + 1) % n]);
        for j in (i + 1)..n {
            // neighbours share an endpoint
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let (b1, b2) = (points[j], points[(j + 1) % n]);
            if segments_intersect(a1, a2, b1, b2) {
                return Some((i, j));
            }
        }
    }
    None
}

/// Drop repeated consecutive points (including a closing duplicate)
fn dedup_closed(points: &[NVec2]) -> Vec<NVec2> {
    let mut out: Vec<NVec2> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last().map_or(true, |q| (p - q).norm() > EPS) {
            out.push(p);
        }
    }
    while out.len() > 1 && (out[0] - out[out.len() - 1]).norm() <= EPS {
        out.pop();
    }
    out
}

/// Clean, validate, wind CCW and recentre an outline.
/// Returns the recentred outline and the centroid it was moved by.
pub fn prepare_outline(points: &[NVec2]) -> Result<(Vec<NVec2>, NVec2), ShapeError> {
    if points.len() < 3 {
        return Err(ShapeError::TooFewVertices(points.len()));
    }
    let mut outline = dedup_closed(points);
    if outline.len() < 3 {
        return Err(ShapeError::TooFewVertices(outline.len()));
    }
    if let Some((i, j)) = find_self_intersection(&outline) {
        return Err(ShapeError::SelfIntersecting(i, j));
    }
    if polygon_area(&outline).abs() < EPS {
        return Err(ShapeError::Degenerate);
    }
    normalize_ccw(&mut outline);
    let c = centroid(&outline);
    for p in outline.iter_mut() {
        *p -= c;
    }
    Ok((outline, c))
}

fn point_in_triangle(p: NVec2, a: NVec2, b: NVec2, c: NVec2) -> bool {
    let d1 = orientation(a, b, p);
    let d2 = orientation(b, c, p);
    let d3 = orientation(c, a, p);
    let has_neg = d1 < 0 || d2 < 0 || d3 < 0;
    let has_pos = d1 > 0 || d2 > 0 || d3 > 0;
    !(has_neg && has_pos)
}

fn is_ear(points: &[NVec2], remaining: &[usize], prev: usize, curr: usize, next: usize) -> bool {
    let (a, b, c) = (points[prev], points[curr], points[next]);
    if turn(a, b, c) <= EPS {
        return false; // reflex or flat
    }
    remaining.iter().all(|&idx| {
        if idx == prev || idx == curr || idx == next {
            return true;
        }
        let p = points[idx];
        // a vertex sitting exactly on an ear corner does not block it
        if (p - a).norm() <= EPS || (p - b).norm() <= EPS || (p - c).norm() <= EPS {
            return true;
        }
        !point_in_triangle(p, a, b, c)
    })
}

/// Triangulate a simple CCW outline. `None` when clipping gets stuck.
pub fn ear_clip(points: &[NVec2]) -> Option<Vec<[usize; 3]>> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let mut remaining: Vec<usize> = (0..n).collect();
    let mut triangles = Vec::with_capacity(n - 2);

    while remaining.len() > 3 {
        let m = remaining.len();
        let ear = (0..m).find(|&i| {
            let prev = remaining[(i + m - 1) % m];
            let next = remaining[(i + 1) % m];
            is_ear(points, &remaining, prev, remaining[i], next)
        })?;
        let prev = remaining[(ear + m - 1) % m];
        let next = remaining[(ear + 1) % m];
        triangles.push([prev, remaining[ear], next]);
        remaining.remove(ear);
    }
    triangles.push([remaining[0], remaining[1], remaining[2]]);
    Some(triangles)
}

/// Position of the directed edge `a -> b` in `poly`, if present
fn directed_edge(poly: &[usize], a: usize, b: usize) -> Option<usize> {
    let n = poly.len();
    (0..n).find(|&i| poly[i] == a && poly[(i + 1) % n] == b)
}

/// Join two CCW polygons across their shared edge `a -> b` (in `p`)
fn join(p: &[usize], q: &[usize], at_p: usize) -> Vec<usize> {
    let n = p.len();
    let a = p[at_p];
    let b = p[(at_p + 1) % n];
    // walk p from b round to a
    let mut out: Vec<usize> = (0..n).map(|k| p[(at_p + 1 + k) % n]).collect();
    // then q strictly between a and b
    if let Some(start) = q.iter().position(|&v| v == a) {
        let m = q.len();
        for k in 1..m {
            let v = q[(start + k) % m];
            if v == b {
                break;
            }
            out.push(v);
        }
    }
    out
}

/// Hertel–Mehlhorn: greedily remove diagonals while the union stays convex
pub fn merge_convex(points: &[NVec2], triangles: &[[usize; 3]]) -> Vec<Vec<usize>> {
    let mut pieces: Vec<Vec<usize>> = triangles.iter().map(|t| t.to_vec()).collect();

    let mut merged = true;
    while merged {
        merged = false;
        'search: for i in 0..pieces.len() {
            for j in 0..pieces.len() {
                if i == j {
                    continue;
                }
                let n = pieces[i].len();
                for e in 0..n {
                    let a = pieces[i][e];
                    let b = pieces[i][(e + 1) % n];
                    if directed_edge(&pieces[j], b, a).is_none() {
                        continue;
                    }
                    let candidate = join(&pieces[i], &pieces[j], e);
                    let outline: Vec<NVec2> = candidate.iter().map(|&k| points[k]).collect();
                    if is_convex(&outline) {
                        pieces[i] = candidate;
                        pieces.remove(j);
                        merged = true;
                        break 'search;
                    }
                }
            }
        }
    }
    pieces
}

/// Split a prepared (CCW, simple) outline into convex pieces
pub fn decompose(outline: &[NVec2]) -> Result<Vec<Vec<NVec2>>, ShapeError> {
    if is_convex(outline) {
        return Ok(vec![outline.to_vec()]);
    }
    let triangles = ear_clip(outline).ok_or(ShapeError::Decomposition)?;
    let pieces = merge_convex(outline, &triangles);
    debug!(
        "decomposed {}-gon into {} convex pieces ({} triangles)",
        outline.len(),
        pieces.len(),
        triangles.len()
    );
    Ok(pieces
        .into_iter()
        .map(|piece| piece.into_iter().map(|k| outline[k]).collect())
        .collect())
}
