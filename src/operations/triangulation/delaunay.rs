// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use std::cmp::Ordering;
use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use smallvec::SmallVec;

use crate::geometry::{aabb::Aabb, point::Point3, triangle::Triangle};
use crate::kernel::predicates::{cmp_distance_xy, incircle, orient2d, orient2d_direction};
use crate::operations::triangulation::{
    NearestTriangle, TriangulationProvider, face_index::FaceIndex,
};

/// Indices 0..3 of the vertex buffer hold the enclosing super triangle.
const SUPER_VERTICES: usize = 3;

/// Super vertex `k` lies at infinity along `SUPER_DIRECTIONS[k]` from the
/// super center. Equal lengths, counter-clockwise.
const SUPER_DIRECTIONS: [Point3; SUPER_VERTICES] = [
    Point3::new(0.0, 5.0, 0.0),
    Point3::new(-4.0, -3.0, 0.0),
    Point3::new(4.0, -3.0, 0.0),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Edge(usize, usize);

impl Edge {
    #[inline]
    fn new(a: usize, b: usize) -> Self {
        if a < b { Edge(a, b) } else { Edge(b, a) }
    }
}

/// Vertex indices of a face, counter-clockwise in xy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Tri(usize, usize, usize);

impl Tri {
    #[inline]
    fn touches_super(&self) -> bool {
        self.0 < SUPER_VERTICES || self.1 < SUPER_VERTICES || self.2 < SUPER_VERTICES
    }
}

#[derive(Clone, Default)]
struct Adj {
    // undirected edge -> up to 2 triangle slots
    edge2tris: AHashMap<Edge, SmallVec<[usize; 2]>>,
}

impl Adj {
    #[inline]
    fn add_tri(&mut self, ti: usize, t: Tri) {
        for (a, b) in tri_edges(t) {
            self.edge2tris.entry(Edge::new(a, b)).or_default().push(ti);
        }
    }

    #[inline]
    fn remove_tri(&mut self, ti: usize, t: Tri) {
        for (a, b) in tri_edges(t) {
            let e = Edge::new(a, b);
            if let Some(v) = self.edge2tris.get_mut(&e) {
                if let Some(pos) = v.iter().position(|&x| x == ti) {
                    v.swap_remove(pos);
                }
                if v.is_empty() {
                    self.edge2tris.remove(&e);
                }
            }
        }
    }

    /// The triangle on the other side of `e` from `ti`.
    #[inline]
    fn across(&self, e: Edge, ti: usize) -> Option<usize> {
        self.edge2tris
            .get(&e)
            .and_then(|v| v.iter().copied().find(|&x| x != ti))
    }
}

/// Incremental Bowyer-Watson TIN over the xy projection, carrying z.
///
/// The super triangle stays in the structure between passes so new points
/// can be inserted without rebuilding; faces that touch it are never
/// reported. Its vertices are symbolic points at infinity, so the reported
/// faces always cover the convex hull whatever the spread of the points.
#[derive(Clone)]
pub struct DelaunayTin {
    points: Vec<Point3>,
    triangles: Vec<Option<Tri>>,
    free: Vec<usize>,
    adj: Adj,
    xy_keys: AHashSet<(u64, u64)>,
    // points[SUPER_VERTICES..SUPER_VERTICES + inserted] are in the mesh
    inserted: usize,
    built: bool,
    super_center: Point3,
    last_tri: usize,
    range: Aabb,
    faces: FaceIndex,
}

impl Default for DelaunayTin {
    fn default() -> Self {
        Self::new()
    }
}

impl DelaunayTin {
    pub fn new() -> Self {
        DelaunayTin {
            points: vec![Point3::default(); SUPER_VERTICES],
            triangles: Vec::new(),
            free: Vec::new(),
            adj: Adj::default(),
            xy_keys: AHashSet::default(),
            inserted: 0,
            built: false,
            super_center: Point3::default(),
            last_tri: 0,
            range: Aabb::empty(),
            faces: FaceIndex::default(),
        }
    }

    /// Builds a TIN from `pts` in one go. Duplicate xy are ignored.
    pub fn build(pts: &[Point3]) -> Self {
        let mut tin = DelaunayTin::new();
        for p in pts {
            tin.add_point(*p);
        }
        tin.triangulate();
        tin
    }

    #[inline]
    fn real_count(&self) -> usize {
        self.points.len() - SUPER_VERTICES
    }

    /// Resets the mesh to the super triangle, centered on `self.range`.
    fn reset_super_triangle(&mut self) {
        self.super_center = self.range.center();
        self.triangles.clear();
        self.free.clear();
        self.adj = Adj::default();
        self.push_tri(Tri(0, 1, 2));
        self.last_tri = 0;
        self.inserted = 0;
        self.built = true;
    }

    fn push_tri(&mut self, t: Tri) -> usize {
        let ti = if let Some(slot) = self.free.pop() {
            self.triangles[slot] = Some(t);
            slot
        } else {
            self.triangles.push(Some(t));
            self.triangles.len() - 1
        };
        self.adj.add_tri(ti, t);
        ti
    }

    fn kill_tri(&mut self, ti: usize) {
        if let Some(t) = self.triangles[ti].take() {
            self.adj.remove_tri(ti, t);
            self.free.push(ti);
        }
    }

    /// Walks from the last touched face towards `p`.
    fn locate(&self, p: &Point3) -> Option<usize> {
        let mut ti = match self.triangles.get(self.last_tri) {
            Some(Some(_)) => self.last_tri,
            _ => self.triangles.iter().position(Option::is_some)?,
        };

        let max_steps = self.triangles.len() + 16;
        'walk: for _ in 0..max_steps {
            let t = self.triangles[ti]?;
            for (a, b) in tri_edges(t) {
                if self.orient(a, b, p) == Ordering::Less {
                    match self.adj.across(Edge::new(a, b), ti) {
                        Some(next) => {
                            ti = next;
                            continue 'walk;
                        }
                        None => return None,
                    }
                }
            }
            return Some(ti);
        }

        // the walk cycled; scan
        self.triangles.iter().position(|t| {
            t.is_some_and(|t| {
                tri_edges(t)
                    .iter()
                    .all(|&(a, b)| self.orient(a, b, p) != Ordering::Less)
            })
        })
    }

    /// Orientation of `p` relative to the directed edge `u -> v`.
    ///
    /// A super vertex `s` stands for `center + r * dir(s)` with `r` growing
    /// without bound: the sign is the one of the leading term in `r`, the
    /// lower terms breaking ties.
    fn orient(&self, u: usize, v: usize, p: &Point3) -> Ordering {
        let center = &self.super_center;
        match (u < SUPER_VERTICES, v < SUPER_VERTICES) {
            (false, false) => orient2d(&self.points[u], &self.points[v], p),
            (false, true) => {
                let a = &self.points[u];
                match orient2d_direction(a, &SUPER_DIRECTIONS[v], p) {
                    Ordering::Equal => orient2d(a, center, p),
                    side => side,
                }
            }
            (true, false) => {
                let b = &self.points[v];
                match orient2d_direction(b, &SUPER_DIRECTIONS[u], p) {
                    Ordering::Equal => orient2d(center, b, p),
                    side => side.reverse(),
                }
            }
            (true, true) => orient2d_direction(
                &Point3::default(),
                &SUPER_DIRECTIONS[u],
                &SUPER_DIRECTIONS[v],
            ),
        }
    }

    /// Whether `p` is strictly inside the circumcircle of `t`, super
    /// vertices taken at infinity.
    fn in_circumcircle(&self, t: Tri, p: &Point3) -> bool {
        let v = [t.0, t.1, t.2];
        let is_super = v.map(|i| i < SUPER_VERTICES);
        match is_super.iter().filter(|&&s| s).count() {
            0 => {
                incircle(&self.points[t.0], &self.points[t.1], &self.points[t.2], p)
                    == Ordering::Greater
            }
            1 => {
                // the circle degenerates to the open half-plane left of a -> b
                let k = is_super.iter().position(|&s| s).unwrap_or(0);
                let a = &self.points[v[(k + 1) % 3]];
                let b = &self.points[v[(k + 2) % 3]];
                match orient2d(a, b, p) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => strictly_between(a, b, p),
                }
            }
            2 => {
                // half-plane right of the line through a parallel to si -> sj
                let k = is_super.iter().position(|&s| !s).unwrap_or(0);
                let a = &self.points[v[k]];
                let si = &SUPER_DIRECTIONS[v[(k + 1) % 3]];
                let sj = &SUPER_DIRECTIONS[v[(k + 2) % 3]];
                let dir = Point3::new(sj.x - si.x, sj.y - si.y, 0.0);
                match orient2d_direction(a, &dir, p) {
                    Ordering::Less => true,
                    Ordering::Greater => false,
                    Ordering::Equal => {
                        cmp_distance_xy(&self.super_center, p, a) == Ordering::Less
                    }
                }
            }
            _ => true,
        }
    }

    /// Inserts `points[pid]` into the current mesh.
    fn insert_point(&mut self, pid: usize) {
        let p = self.points[pid];

        // 1) containing face
        let Some(start) = self.locate(&p) else {
            return;
        };

        // 2) grow the cavity of faces whose circumcircle holds p
        let mut in_cavity: AHashSet<usize> = AHashSet::default();
        let mut cavity: Vec<usize> = vec![start];
        in_cavity.insert(start);
        let mut queue = VecDeque::from([start]);
        while let Some(ti) = queue.pop_front() {
            let Some(t) = self.triangles[ti] else { continue };
            for (a, b) in tri_edges(t) {
                if let Some(nb) = self.adj.across(Edge::new(a, b), ti) {
                    if in_cavity.contains(&nb) {
                        continue;
                    }
                    if let Some(nt) = self.triangles[nb] {
                        if self.in_circumcircle(nt, &p) {
                            in_cavity.insert(nb);
                            cavity.push(nb);
                            queue.push_back(nb);
                        }
                    }
                }
            }
        }

        // 3) directed boundary edges, kept in the cavity faces' winding
        let mut boundary: Vec<(usize, usize)> = Vec::with_capacity(cavity.len() + 2);
        for &ti in &cavity {
            let Some(t) = self.triangles[ti] else { continue };
            for (a, b) in tri_edges(t) {
                let outside = self
                    .adj
                    .across(Edge::new(a, b), ti)
                    .is_none_or(|nb| !in_cavity.contains(&nb));
                if outside {
                    boundary.push((a, b));
                }
            }
        }

        // 4) replace the cavity by a fan around p
        for &ti in &cavity {
            self.kill_tri(ti);
        }
        for (a, b) in boundary {
            self.last_tri = self.push_tri(Tri(a, b, pid));
        }
    }

    fn refresh_faces(&mut self) {
        let faces: Vec<Triangle> = self
            .triangles
            .iter()
            .flatten()
            .filter(|t| !t.touches_super())
            .map(|t| Triangle::new(self.points[t.0], self.points[t.1], self.points[t.2]))
            .collect();
        self.faces = FaceIndex::build(faces);
    }
}

impl TriangulationProvider for DelaunayTin {
    fn add_point(&mut self, p: Point3) -> bool {
        if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return false;
        }
        let key = (xy_bits(p.x), xy_bits(p.y));
        if !self.xy_keys.insert(key) {
            return false;
        }
        self.points.push(p);
        self.range.extend(&p);
        true
    }

    fn triangulate(&mut self) -> usize {
        let real = self.real_count();
        if self.built && self.inserted == real {
            return self.faces.len();
        }
        if real < 3 {
            self.faces = FaceIndex::default();
            return 0;
        }

        if !self.built {
            self.reset_super_triangle();
        }

        for pid in (SUPER_VERTICES + self.inserted)..self.points.len() {
            self.insert_point(pid);
        }
        self.inserted = real;
        self.refresh_faces();
        self.faces.len()
    }

    fn triangle_count(&self) -> usize {
        self.faces.len()
    }

    fn point_count(&self) -> usize {
        self.real_count()
    }

    fn all_points(&self) -> Vec<Point3> {
        self.points[SUPER_VERTICES..].to_vec()
    }

    fn faces(&self) -> Vec<[Point3; 3]> {
        self.faces.faces().iter().map(|t| *t.points()).collect()
    }

    fn find_nearest_triangle(&self, p: &Point3) -> Option<NearestTriangle> {
        let triangle = *self.faces.nearest(p)?;
        let distance = triangle.signed_distance(p)?;
        Some(NearestTriangle { triangle, distance })
    }

    fn range(&self) -> Aabb {
        self.range
    }

    fn clear(&mut self) {
        *self = DelaunayTin::new();
    }

    fn snapshot(&self) -> Box<dyn TriangulationProvider> {
        Box::new(self.clone())
    }

    fn memory_size(&self) -> usize {
        self.points.capacity() * std::mem::size_of::<Point3>()
            + self.triangles.capacity() * std::mem::size_of::<Option<Tri>>()
            + self.faces.len() * std::mem::size_of::<Triangle>()
    }
}

#[inline(always)]
fn xy_bits(v: f64) -> u64 {
    if v == 0.0 { 0 } else { v.to_bits() }
}

/// `p`, collinear with `a` and `b`, lies strictly between them.
fn strictly_between(a: &Point3, b: &Point3, p: &Point3) -> bool {
    let (lo, hi, v) = if a.x != b.x {
        (a.x.min(b.x), a.x.max(b.x), p.x)
    } else {
        (a.y.min(b.y), a.y.max(b.y), p.y)
    };
    lo < v && v < hi
}

#[inline]
fn tri_edges(t: Tri) -> [(usize, usize); 3] {
    [(t.0, t.1), (t.1, t.2), (t.2, t.0)]
}
