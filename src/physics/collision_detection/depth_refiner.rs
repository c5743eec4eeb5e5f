use glam::{Quat, Vec3};

use super::support_finder::{SupportFinder, SupportVertex};

const MAX_GJK_ITERATIONS: usize = 64;
const MAX_EPA_ITERATIONS: usize = 64;
/// Relative progress under which GJK stops improving the closest point.
const GJK_TOLERANCE: f32 = 1e-6;
/// Squared distance from the origin under which the cores are treated as overlapping.
const OVERLAP_DISTANCE_SQUARED: f32 = 1e-10;
/// Absolute progress under which EPA accepts its closest face.
const EPA_TOLERANCE: f32 = 1e-4;
const DEGENERATE_EPSILON: f32 = 1e-5;

/// Up to four Minkowski difference vertices with the barycentric weights of the point closest to the origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simplex {
    vertices: [SupportVertex; 4],
    weights: [f32; 4],
    count: usize,
}

impl Simplex {
    #[inline(always)]
    pub fn vertices(&self) -> &[SupportVertex] {
        &self.vertices[..self.count]
    }

    fn push(&mut self, vertex: SupportVertex) {
        self.vertices[self.count] = vertex;
        self.weights[self.count] = 0.0;
        self.count += 1;
    }

    pub fn closest_point(&self) -> Vec3 {
        (0..self.count).map(|i| self.vertices[i].w * self.weights[i]).sum()
    }

    /// Points on A's and B's cores whose difference is the closest point.
    pub fn witness_points(&self) -> (Vec3, Vec3) {
        (0..self.count).fold((Vec3::ZERO, Vec3::ZERO), |(a, b), i| {
            (a + self.vertices[i].a * self.weights[i], b + self.vertices[i].b * self.weights[i])
        })
    }

    fn contains(&self, vertex: &SupportVertex) -> bool {
        self.vertices().iter().any(|v| v.w.distance_squared(vertex.w) <= OVERLAP_DISTANCE_SQUARED)
    }

    /// Shrinks to the smallest sub-simplex supporting the point closest to the origin. Returns true when the
    /// origin is enclosed by a tetrahedron.
    fn reduce(&mut self) -> bool {
        let w = self.vertices.map(|v| v.w);
        let weights = match self.count {
            1 => [1.0, 0.0, 0.0, 0.0],
            2 => {
                let [u, v] = segment_weights(w[0], w[1]);
                [u, v, 0.0, 0.0]
            }
            3 => {
                let [u, v, t] = triangle_weights(w[0], w[1], w[2]);
                [u, v, t, 0.0]
            }
            _ => match tetrahedron_weights(w) {
                Some(weights) => weights,
                None => {
                    self.weights = [0.25; 4];
                    return true;
                }
            },
        };
        let mut count = 0;
        for i in 0..self.count {
            if weights[i] > 0.0 {
                self.vertices[count] = self.vertices[i];
                self.weights[count] = weights[i];
                count += 1;
            }
        }
        self.count = count;
        false
    }
}

#[inline(always)]
fn segment_weights(a: Vec3, b: Vec3) -> [f32; 2] {
    let ab = b - a;
    let length_squared = ab.length_squared();
    if length_squared <= f32::MIN_POSITIVE {
        return [1.0, 0.0];
    }
    let t = -a.dot(ab) / length_squared;
    if t <= 0.0 {
        [1.0, 0.0]
    } else if t >= 1.0 {
        [0.0, 1.0]
    } else {
        [1.0 - t, t]
    }
}

/// Barycentric weights of the point of triangle `abc` closest to the origin.
fn triangle_weights(a: Vec3, b: Vec3, c: Vec3) -> [f32; 3] {
    let ab = b - a;
    let ac = c - a;
    let d1 = ab.dot(-a);
    let d2 = ac.dot(-a);
    if d1 <= 0.0 && d2 <= 0.0 {
        return [1.0, 0.0, 0.0];
    }
    let d3 = ab.dot(-b);
    let d4 = ac.dot(-b);
    if d3 >= 0.0 && d4 <= d3 {
        return [0.0, 1.0, 0.0];
    }
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return [1.0 - v, v, 0.0];
    }
    let d5 = ab.dot(-c);
    let d6 = ac.dot(-c);
    if d6 >= 0.0 && d5 <= d6 {
        return [0.0, 0.0, 1.0];
    }
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return [1.0 - w, 0.0, w];
    }
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return [0.0, 1.0 - w, w];
    }
    let total = va + vb + vc;
    if total <= f32::MIN_POSITIVE {
        // Collinear; the closest edge decides.
        let edges = [(0, 1, a, b), (1, 2, b, c), (0, 2, a, c)];
        let mut best = [1.0, 0.0, 0.0];
        let mut best_distance = f32::INFINITY;
        for (i, j, p, q) in edges {
            let [u, v] = segment_weights(p, q);
            let distance = (p * u + q * v).length_squared();
            if distance < best_distance {
                best_distance = distance;
                best = [0.0; 3];
                best[i] = u;
                best[j] = v;
            }
        }
        return best;
    }
    let v = vb / total;
    let w = vc / total;
    [1.0 - v - w, v, w]
}

/// Faces of a tetrahedron, indexed by the vertex they exclude.
const TETRAHEDRON_FACES: [[usize; 3]; 4] = [[1, 2, 3], [0, 3, 2], [0, 1, 3], [0, 2, 1]];

/// Weights of the closest point on the tetrahedron's boundary, or `None` when it encloses the origin.
fn tetrahedron_weights(p: [Vec3; 4]) -> Option<[f32; 4]> {
    let mut best = None;
    let mut best_distance = f32::INFINITY;
    for (opposite, face) in TETRAHEDRON_FACES.iter().enumerate() {
        let (a, b, c) = (p[face[0]], p[face[1]], p[face[2]]);
        let normal = (b - a).cross(c - a);
        let origin_side = normal.dot(-a);
        let vertex_side = normal.dot(p[opposite] - a);
        let flat = vertex_side * vertex_side
            <= DEGENERATE_EPSILON * DEGENERATE_EPSILON * normal.length_squared() * (p[opposite] - a).length_squared();
        if !flat && origin_side * vertex_side >= 0.0 {
            continue;
        }
        let face_weights = triangle_weights(a, b, c);
        let distance = (a * face_weights[0] + b * face_weights[1] + c * face_weights[2]).length_squared();
        if distance < best_distance {
            best_distance = distance;
            let mut weights = [0.0; 4];
            for (k, &index) in face.iter().enumerate() {
                weights[index] = face_weights[k];
            }
            best = Some(weights);
        }
    }
    best
}

/// Outcome of the distance query between two convex cores.
#[derive(Debug, Clone, Copy)]
pub enum GjkResult {
    /// Closest points on A's and B's cores.
    Separated { point_a: Vec3, point_b: Vec3 },
    /// The cores overlap; the simplex holds the last vertices visited.
    Overlapping(Simplex),
}

/// Deepest penetration of two overlapping cores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Outward normal of the Minkowski difference face closest to the origin. Moving A by `-normal * depth`
    /// brings the cores into touching contact.
    pub normal: Vec3,
    pub depth: f32,
    pub point_a: Vec3,
    pub point_b: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct PolytopeFace {
    indices: [usize; 3],
    normal: Vec3,
    distance: f32,
}

impl PolytopeFace {
    fn new(vertices: &[SupportVertex], indices: [usize; 3], interior: Vec3) -> Option<Self> {
        let a = vertices[indices[0]].w;
        let normal = (vertices[indices[1]].w - a).cross(vertices[indices[2]].w - a).try_normalize()?;
        let (indices, normal) = if normal.dot(a - interior) < 0.0 {
            ([indices[0], indices[2], indices[1]], -normal)
        } else {
            (indices, normal)
        };
        Some(Self {
            indices,
            normal,
            distance: normal.dot(a),
        })
    }

    fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.indices;
        [(a, b), (b, c), (c, a)]
    }
}

/// Closest point queries (GJK) and penetration depth refinement (EPA) between convex cores.
pub struct DepthRefiner;

impl DepthRefiner {
    pub fn closest_points(finder: &SupportFinder) -> GjkResult {
        let mut simplex = Simplex::default();
        let seed = finder.interior_point();
        simplex.push(finder.support(if seed.length_squared() > OVERLAP_DISTANCE_SQUARED { -seed } else { Vec3::X }));
        simplex.weights[0] = 1.0;

        for _ in 0..MAX_GJK_ITERATIONS {
            let closest = simplex.closest_point();
            let distance_squared = closest.length_squared();
            if distance_squared <= OVERLAP_DISTANCE_SQUARED {
                return GjkResult::Overlapping(simplex);
            }
            let vertex = finder.support(-closest);
            if distance_squared - closest.dot(vertex.w) <= GJK_TOLERANCE * distance_squared || simplex.contains(&vertex) {
                break;
            }
            let previous = simplex;
            simplex.push(vertex);
            if simplex.reduce() {
                return GjkResult::Overlapping(simplex);
            }
            if simplex.closest_point().length_squared() >= distance_squared {
                simplex = previous;
                break;
            }
        }
        let (point_a, point_b) = simplex.witness_points();
        GjkResult::Separated { point_a, point_b }
    }

    /// Expands the simplex of an overlapping query into a polytope and finds the face closest to the origin.
    /// Returns `None` when the Minkowski difference is too flat to enclose a volume.
    pub fn penetration(finder: &SupportFinder, simplex: &Simplex) -> Option<Penetration> {
        let mut vertices: Vec<SupportVertex> = simplex.vertices().to_vec();
        Self::blow_up(finder, &mut vertices);
        if vertices.len() < 4 {
            return None;
        }
        let interior = vertices.iter().map(|v| v.w).sum::<Vec3>() * 0.25;
        let mut faces: Vec<PolytopeFace> = TETRAHEDRON_FACES
            .iter()
            .filter_map(|&face| PolytopeFace::new(&vertices, face, interior))
            .collect();
        if faces.len() < 4 {
            return None;
        }

        let mut edges: Vec<(usize, usize)> = Vec::new();
        let mut best = Self::closest_face(&faces);
        for _ in 0..MAX_EPA_ITERATIONS {
            let support = finder.support(best.normal);
            if support.w.dot(best.normal) - best.distance <= EPA_TOLERANCE {
                break;
            }
            let new_index = vertices.len();
            vertices.push(support);
            edges.clear();
            faces.retain(|face| {
                let visible = face.normal.dot(support.w - vertices[face.indices[0]].w) > 1e-6;
                if visible {
                    for (i, j) in face.edges() {
                        if let Some(shared) = edges.iter().position(|&edge| edge == (j, i)) {
                            edges.swap_remove(shared);
                        } else {
                            edges.push((i, j));
                        }
                    }
                }
                !visible
            });
            for &(i, j) in &edges {
                if let Some(face) = PolytopeFace::new(&vertices, [i, j, new_index], interior) {
                    faces.push(face);
                }
            }
            if faces.is_empty() {
                break;
            }
            best = Self::closest_face(&faces);
        }

        let [a, b, c] = best.indices.map(|i| vertices[i]);
        let weights = barycentric(best.normal * best.distance, a.w, b.w, c.w);
        Some(Penetration {
            normal: best.normal,
            depth: best.distance.max(0.0),
            point_a: a.a * weights[0] + b.a * weights[1] + c.a * weights[2],
            point_b: a.b * weights[0] + b.b * weights[1] + c.b * weights[2],
        })
    }

    fn closest_face(faces: &[PolytopeFace]) -> PolytopeFace {
        let mut best = faces[0];
        for face in &faces[1..] {
            if face.distance < best.distance {
                best = *face;
            }
        }
        best
    }

    /// Adds support vertices until the simplex is a tetrahedron, if the shapes allow it.
    fn blow_up(finder: &SupportFinder, vertices: &mut Vec<SupportVertex>) {
        if vertices.len() == 1 {
            let origin = vertices[0].w;
            for direction in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
                let support = finder.support(direction);
                if support.w.distance_squared(origin) > DEGENERATE_EPSILON * DEGENERATE_EPSILON {
                    vertices.push(support);
                    break;
                }
            }
        }
        if vertices.len() == 2 {
            let Some(axis) = (vertices[1].w - vertices[0].w).try_normalize() else {
                return;
            };
            let rotation = Quat::from_axis_angle(axis, std::f32::consts::FRAC_PI_3);
            let mut direction = axis.any_orthonormal_vector();
            for _ in 0..6 {
                let support = finder.support(direction);
                let offset = support.w - vertices[0].w;
                if (offset - axis * offset.dot(axis)).length_squared() > DEGENERATE_EPSILON * DEGENERATE_EPSILON {
                    vertices.push(support);
                    break;
                }
                direction = rotation * direction;
            }
        }
        if vertices.len() == 3 {
            let Some(normal) = (vertices[1].w - vertices[0].w).cross(vertices[2].w - vertices[0].w).try_normalize()
            else {
                return;
            };
            for direction in [normal, -normal] {
                let support = finder.support(direction);
                if (support.w - vertices[0].w).dot(normal).abs() > DEGENERATE_EPSILON {
                    vertices.push(support);
                    break;
                }
            }
        }
    }
}

fn barycentric(point: Vec3, a: Vec3, b: Vec3, c: Vec3) -> [f32; 3] {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = point - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denominator = d00 * d11 - d01 * d01;
    if denominator.abs() <= f32::MIN_POSITIVE {
        return [1.0, 0.0, 0.0];
    }
    let v = (d11 * d20 - d01 * d21) / denominator;
    let w = (d00 * d21 - d01 * d20) / denominator;
    [1.0 - v - w, v, w]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body_properties::RigidPose;
    use crate::physics::collidables::box_shape::BoxShape;
    use crate::physics::collidables::sphere::Sphere;

    #[test]
    fn sphere_above_box_is_separated() {
        let sphere = Sphere::new(Vec3::ZERO, 0.5);
        let cube = BoxShape::from_half_extents(Vec3::splat(0.5));
        let pose_a = RigidPose::from_position(Vec3::new(0.0, 1.2, 0.0));
        let pose_b = RigidPose::IDENTITY;
        let finder = SupportFinder::new(&sphere, &pose_a, &cube, &pose_b);
        match DepthRefiner::closest_points(&finder) {
            GjkResult::Separated { point_a, point_b } => {
                assert!(point_a.abs_diff_eq(Vec3::new(0.0, 1.2, 0.0), 1e-5));
                assert!(point_b.abs_diff_eq(Vec3::new(0.0, 0.5, 0.0), 1e-4), "{point_b}");
            }
            GjkResult::Overlapping(_) => panic!("expected separation"),
        }
    }

    #[test]
    fn overlapping_boxes_report_shallowest_axis() {
        let cube = BoxShape::from_half_extents(Vec3::splat(0.5));
        let pose_a = RigidPose::from_position(Vec3::new(0.3, 0.9, 0.2));
        let pose_b = RigidPose::IDENTITY;
        let finder = SupportFinder::new(&cube, &pose_a, &cube, &pose_b);
        let GjkResult::Overlapping(simplex) = DepthRefiner::closest_points(&finder) else {
            panic!("expected overlap");
        };
        let penetration = DepthRefiner::penetration(&finder, &simplex).unwrap();
        assert!(penetration.normal.abs_diff_eq(Vec3::NEG_Y, 1e-3), "{}", penetration.normal);
        assert!((penetration.depth - 0.1).abs() < 1e-3);
    }

    #[test]
    fn closest_point_of_triangle_edge() {
        let weights = triangle_weights(Vec3::new(-1.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 0.0), Vec3::new(0.0, 3.0, 0.0));
        assert!((weights[0] - 0.5).abs() < 1e-6 && (weights[1] - 0.5).abs() < 1e-6 && weights[2] == 0.0);
    }
}
