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

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::geometry::{point::Point3, triangle::Triangle, util::floor_sat_i64};

/// Uniform xy hash of face footprints for nearest-face queries.
///
/// Each face is registered in every cell its bounding box overlaps. The
/// index is immutable once built, so lookups can run concurrently.
#[derive(Clone, Debug, Default)]
pub struct FaceIndex {
    faces: Vec<Triangle>,
    cell: f64,
    hash_inv: f64,
    origin: (f64, f64),
    dims: (i64, i64),
    buckets: AHashMap<(i64, i64), SmallVec<[u32; 8]>>,
}

impl FaceIndex {
    pub fn build(faces: Vec<Triangle>) -> Self {
        if faces.is_empty() {
            return FaceIndex::default();
        }

        let (mut minx, mut miny) = (f64::INFINITY, f64::INFINITY);
        let (mut maxx, mut maxy) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for f in &faces {
            let r = f.range();
            minx = minx.min(r.min.x);
            miny = miny.min(r.min.y);
            maxx = maxx.max(r.max.x);
            maxy = maxy.max(r.max.y);
        }

        // about one face per cell
        let area = (maxx - minx) * (maxy - miny);
        let mut cell = (area / faces.len() as f64).sqrt();
        if !cell.is_finite() || cell <= 0.0 {
            cell = ((maxx - minx).max(maxy - miny)).max(1e-6);
        }

        let mut index = FaceIndex {
            faces,
            cell,
            hash_inv: 1.0 / cell,
            origin: (minx, miny),
            dims: (0, 0),
            buckets: AHashMap::default(),
        };
        index.dims = (
            index.key_of(maxx, maxy).0 + 1,
            index.key_of(maxx, maxy).1 + 1,
        );

        for (fi, f) in index.faces.iter().enumerate() {
            let r = f.range();
            let (x0, y0) = index.key_of(r.min.x, r.min.y);
            let (x1, y1) = index.key_of(r.max.x, r.max.y);
            for kx in x0..=x1 {
                for ky in y0..=y1 {
                    index.buckets.entry((kx, ky)).or_default().push(fi as u32);
                }
            }
        }
        index
    }

    #[inline(always)]
    fn key_of(&self, x: f64, y: f64) -> (i64, i64) {
        (
            floor_sat_i64((x - self.origin.0) * self.hash_inv),
            floor_sat_i64((y - self.origin.1) * self.hash_inv),
        )
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn faces(&self) -> &[Triangle] {
        &self.faces
    }

    /// Face whose footprint contains `p`, else the footprint nearest to it
    /// in xy. Ties go to the lowest face index.
    pub fn nearest(&self, p: &Point3) -> Option<&Triangle> {
        if self.faces.is_empty() || !p.x.is_finite() || !p.y.is_finite() {
            return None;
        }
        let (kx, ky) = self.key_of(p.x, p.y);
        if kx < 0 || ky < 0 || kx >= self.dims.0 || ky >= self.dims.1 {
            return self.nearest_linear(p);
        }
        let reach = self.dims.0.max(self.dims.1);

        let mut best: Option<(f64, u32)> = None;
        let mut k = 0i64;
        loop {
            self.visit_ring(kx, ky, k, |fi| {
                let d = xy_distance_to_footprint(&self.faces[fi as usize], p);
                let better = match best {
                    None => true,
                    Some((bd, bi)) => d < bd || (d == bd && fi < bi),
                };
                if better {
                    best = Some((d, fi));
                }
            });
            if let Some((bd, _)) = best {
                if bd <= k as f64 * self.cell {
                    break;
                }
            }
            if k >= reach {
                break;
            }
            k += 1;
        }
        best.map(|(_, fi)| &self.faces[fi as usize])
    }

    fn nearest_linear(&self, p: &Point3) -> Option<&Triangle> {
        let mut best: Option<(f64, usize)> = None;
        for (fi, f) in self.faces.iter().enumerate() {
            let d = xy_distance_to_footprint(f, p);
            if best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, fi));
            }
        }
        best.map(|(_, fi)| &self.faces[fi])
    }

    fn visit_ring(&self, kx: i64, ky: i64, k: i64, mut f: impl FnMut(u32)) {
        let mut visit = |x: i64, y: i64| {
            if x < 0 || y < 0 || x >= self.dims.0 || y >= self.dims.1 {
                return;
            }
            if let Some(list) = self.buckets.get(&(x, y)) {
                for &fi in list {
                    f(fi);
                }
            }
        };
        if k == 0 {
            visit(kx, ky);
            return;
        }
        for dx in -k..=k {
            visit(kx.saturating_add(dx), ky.saturating_sub(k));
            visit(kx.saturating_add(dx), ky.saturating_add(k));
        }
        for dy in (-k + 1)..k {
            visit(kx.saturating_sub(k), ky.saturating_add(dy));
            visit(kx.saturating_add(k), ky.saturating_add(dy));
        }
    }
}

/// Zero inside the xy footprint (edges included), else the xy distance
/// to the closest edge.
pub fn xy_distance_to_footprint(t: &Triangle, p: &Point3) -> f64 {
    let [a, b, c] = t.points();
    let s0 = side(a, b, p);
    let s1 = side(b, c, p);
    let s2 = side(c, a, p);
    let has_neg = s0 < 0.0 || s1 < 0.0 || s2 < 0.0;
    let has_pos = s0 > 0.0 || s1 > 0.0 || s2 > 0.0;
    if !(has_neg && has_pos) {
        return 0.0;
    }
    segment_distance_xy(a, b, p)
        .min(segment_distance_xy(b, c, p))
        .min(segment_distance_xy(c, a, p))
}

#[inline(always)]
fn side(a: &Point3, b: &Point3, p: &Point3) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn segment_distance_xy(a: &Point3, b: &Point3, p: &Point3) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return a.distance_xy_to(p);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0);
    let q = Point3::new(a.x + t * dx, a.y + t * dy, 0.0);
    (p.x - q.x).hypot(p.y - q.y)
}
