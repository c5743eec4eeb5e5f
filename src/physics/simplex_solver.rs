use glam::Vec3;

const EPSILON: f32 = 1e-5;

/// Contact plane as seen from a moving shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal pointing from the surface towards the shape.
    pub normal: Vec3,
    /// Separation between the shape and the surface along the normal.
    pub distance: f32,
}

impl Plane {
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }
}

/// A surface the simplex solver keeps a shape from moving through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceConstraintInfo {
    pub plane: Plane,
    /// Velocity of the surface, e.g. a moving platform.
    pub velocity: Vec3,
    /// Tie break between planes; see `PlaneOrdering`.
    pub priority: i32,
    /// Set once the shape has reached the plane during a solve.
    pub touched: bool,
}

impl SurfaceConstraintInfo {
    pub fn new(plane: Plane, velocity: Vec3, priority: i32) -> Self {
        Self {
            plane,
            velocity,
            priority,
            touched: false,
        }
    }

    /// Velocity of `velocity` relative to the plane, along its normal. Negative values move into the plane.
    #[inline(always)]
    pub fn relative_normal_velocity(&self, velocity: Vec3) -> f32 {
        (velocity - self.velocity).dot(self.plane.normal)
    }
}

/// Order in which planes are applied when several have to be solved one after the other. The plane solved last
/// has the final word, so this decides the result whenever the planes disagree.
pub trait PlaneOrdering {
    /// Whether `a` is solved before `b`.
    fn precedes(&self, a: &SurfaceConstraintInfo, b: &SurfaceConstraintInfo) -> bool;
}

/// Lower `priority` values are solved first. Equal priorities keep their order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityOrdering;

impl PlaneOrdering for PriorityOrdering {
    #[inline(always)]
    fn precedes(&self, a: &SurfaceConstraintInfo, b: &SurfaceConstraintInfo) -> bool {
        a.priority <= b.priority
    }
}

/// Removes the part of `velocity` that moves into the plane faster than the plane itself recedes.
#[inline(always)]
pub fn solve_1d(constraint: &SurfaceConstraintInfo, velocity: &mut Vec3) {
    let relative = constraint.relative_normal_velocity(*velocity);
    if relative < 0.0 {
        *velocity -= constraint.plane.normal * relative;
    }
}

/// Whether `velocity` still moves into the plane.
#[inline(always)]
pub fn test_1d(constraint: &SurfaceConstraintInfo, velocity: Vec3) -> bool {
    constraint.relative_normal_velocity(velocity) < -EPSILON
}

#[inline(always)]
pub fn swap_planes(a: &mut SurfaceConstraintInfo, b: &mut SurfaceConstraintInfo) {
    std::mem::swap(a, b);
}

#[inline(always)]
fn clamp_to_max_length(max_length: f32, velocity: &mut Vec3) {
    let length_squared = velocity.length_squared();
    if length_squared > max_length * max_length {
        *velocity *= max_length / length_squared.sqrt();
    }
}

/// Velocity solver for a shape sliding along at most four contact planes at once, as used by character
/// controllers. Planes are hit in time order; each hit becomes an active plane and the active set is reduced
/// to the planes that actually constrain the velocity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexSolver<O: PlaneOrdering = PriorityOrdering> {
    ordering: O,
}

impl SimplexSolver<PriorityOrdering> {
    pub fn new() -> Self {
        Self {
            ordering: PriorityOrdering,
        }
    }
}

impl<O: PlaneOrdering> SimplexSolver<O> {
    pub fn with_ordering(ordering: O) -> Self {
        Self { ordering }
    }

    /// Orders two planes for sequential solving.
    #[inline(always)]
    pub fn sort_2d(&self, a: &mut SurfaceConstraintInfo, b: &mut SurfaceConstraintInfo) {
        if !self.ordering.precedes(a, b) {
            swap_planes(a, b);
        }
    }

    #[inline(always)]
    pub fn sort_3d(&self, a: &mut SurfaceConstraintInfo, b: &mut SurfaceConstraintInfo, c: &mut SurfaceConstraintInfo) {
        self.sort_2d(a, b);
        self.sort_2d(b, c);
        self.sort_2d(a, b);
    }

    /// Keeps `velocity` on both planes, moving freely along their crease. Parallel planes are solved one after
    /// the other.
    pub fn solve_2d(&self, a: &SurfaceConstraintInfo, b: &SurfaceConstraintInfo, velocity: &mut Vec3) {
        let (n0, n1) = (a.plane.normal, b.plane.normal);
        let crease = n0.cross(n1);
        let crease_length_squared = crease.length_squared();
        if crease_length_squared < EPSILON {
            let (mut first, mut second) = (*a, *b);
            self.sort_2d(&mut first, &mut second);
            solve_1d(&first, velocity);
            solve_1d(&second, velocity);
            return;
        }
        let crease_length = crease_length_squared.sqrt();
        let axis = crease / crease_length;
        let c0 = a.velocity.dot(n0);
        let c1 = b.velocity.dot(n1);
        let in_planes = (n1.cross(axis) * c0 + axis.cross(n0) * c1) / crease_length;
        *velocity = in_planes + axis * velocity.dot(axis);
    }

    /// Keeps `velocity` on all three planes. Degenerate triples fall back to pairwise solves in plane order.
    pub fn solve_3d(
        &self,
        a: &SurfaceConstraintInfo,
        b: &SurfaceConstraintInfo,
        c: &SurfaceConstraintInfo,
        velocity: &mut Vec3,
    ) {
        let (n0, n1, n2) = (a.plane.normal, b.plane.normal, c.plane.normal);
        let m0 = n1.cross(n2);
        let m1 = n2.cross(n0);
        let m2 = n0.cross(n1);
        let determinant = n0.dot(m0);
        if determinant.abs() < EPSILON {
            let (mut p0, mut p1, mut p2) = (*a, *b, *c);
            self.sort_3d(&mut p0, &mut p1, &mut p2);
            self.solve_2d(&p0, &p1, velocity);
            self.solve_2d(&p0, &p2, velocity);
            self.solve_2d(&p1, &p2, velocity);
            return;
        }
        *velocity = (m0 * a.velocity.dot(n0) + m1 * b.velocity.dot(n1) + m2 * c.velocity.dot(n2)) / determinant;
    }

    /// Solves the active planes and drops the ones that no longer constrain the result. The most recently
    /// added plane sits last and is always kept.
    pub fn examine_active_planes(
        &self,
        planes: &mut [SurfaceConstraintInfo; 4],
        plane_count: &mut usize,
        velocity: &mut Vec3,
    ) {
        match *plane_count {
            0 => {}
            1 => solve_1d(&planes[0], velocity),
            2 => {
                let mut candidate = *velocity;
                solve_1d(&planes[1], &mut candidate);
                if test_1d(&planes[0], candidate) {
                    self.solve_2d(&planes[0], &planes[1], velocity);
                } else {
                    planes[0] = planes[1];
                    *plane_count = 1;
                    *velocity = candidate;
                }
            }
            3 => {
                let mut candidate = *velocity;
                solve_1d(&planes[2], &mut candidate);
                if !test_1d(&planes[0], candidate) && !test_1d(&planes[1], candidate) {
                    planes[0] = planes[2];
                    *plane_count = 1;
                    *velocity = candidate;
                    return;
                }
                for kept in 0..2 {
                    let mut candidate = *velocity;
                    self.solve_2d(&planes[kept], &planes[2], &mut candidate);
                    if !test_1d(&planes[1 - kept], candidate) {
                        planes[0] = planes[kept];
                        planes[1] = planes[2];
                        *plane_count = 2;
                        *velocity = candidate;
                        return;
                    }
                }
                self.solve_3d(&planes[0], &planes[1], &planes[2], velocity);
            }
            4 => {
                for dropped in 0..3 {
                    let mut candidate = *velocity;
                    self.solve_3d(&planes[(dropped + 1) % 3], &planes[(dropped + 2) % 3], &planes[3], &mut candidate);
                    if !test_1d(&planes[dropped], candidate) {
                        planes[dropped] = planes[2];
                        planes[2] = planes[3];
                        *plane_count = 3;
                        *velocity = candidate;
                        return;
                    }
                }
                // No plane can go. A shape squeezed from all sides stops.
                *velocity = self.solve_4d(planes, *velocity).unwrap_or(Vec3::ZERO);
            }
            count => panic!("at most 4 active planes are supported, got {count}"),
        }
    }

    /// Smallest change of `velocity` that respects all four planes, found by solving every single plane, pair
    /// and triple. `None` when the planes leave no admissible velocity.
    fn solve_4d(&self, planes: &[SurfaceConstraintInfo; 4], velocity: Vec3) -> Option<Vec3> {
        let respects_all = |candidate: Vec3| planes.iter().all(|plane| !test_1d(plane, candidate));
        let mut best: Option<Vec3> = None;
        let mut consider = |candidate: Vec3| {
            let closer = best.map_or(true, |current| {
                candidate.distance_squared(velocity) < current.distance_squared(velocity)
            });
            if closer && candidate.is_finite() && respects_all(candidate) {
                best = Some(candidate);
            }
        };
        for i in 0..4 {
            let mut candidate = velocity;
            solve_1d(&planes[i], &mut candidate);
            consider(candidate);
            for j in i + 1..4 {
                let mut candidate = velocity;
                self.solve_2d(&planes[i], &planes[j], &mut candidate);
                consider(candidate);
                for k in j + 1..4 {
                    let mut candidate = velocity;
                    self.solve_3d(&planes[i], &planes[j], &planes[k], &mut candidate);
                    consider(candidate);
                }
            }
        }
        best
    }

    /// Moves `position` by `velocity` for `timestep`, sliding along `constraints` as they are hit.
    ///
    /// Steps shorter than `min_timestep` are not integrated. `velocity` is clamped to `max_velocity` and
    /// holds the final sliding velocity on return. Returns the time actually integrated.
    pub fn solve(
        &self,
        timestep: f32,
        min_timestep: f32,
        max_velocity: f32,
        constraints: &mut [SurfaceConstraintInfo],
        position: &mut Vec3,
        velocity: &mut Vec3,
    ) -> f32 {
        let mut active = [SurfaceConstraintInfo::new(Plane::new(Vec3::Y, 0.0), Vec3::ZERO, 0); 4];
        let mut active_count = 0;
        let mut remaining_time = timestep;
        let mut integrated_time = 0.0;
        clamp_to_max_length(max_velocity, velocity);

        while remaining_time > 0.0 {
            let mut hit = None;
            let mut hit_time = remaining_time;
            for (index, constraint) in constraints.iter().enumerate() {
                if constraint.touched {
                    continue;
                }
                let approach = -constraint.relative_normal_velocity(*velocity);
                if approach <= 0.0 {
                    continue;
                }
                // Penetration is handled by the plane velocity.
                let distance = constraint.plane.distance.max(0.0);
                if distance <= hit_time * approach {
                    hit_time = distance / approach;
                    hit = Some(index);
                }
            }

            if hit_time > min_timestep {
                integrated_time += hit_time;
                remaining_time -= hit_time;
                *position += *velocity * hit_time;
            }

            let Some(hit_index) = hit else {
                break;
            };
            constraints[hit_index].touched = true;
            if active_count == active.len() {
                // A fifth plane replaces the oldest one.
                active.rotate_left(1);
                active_count -= 1;
            }
            active[active_count] = constraints[hit_index];
            active_count += 1;

            self.examine_active_planes(&mut active, &mut active_count, velocity);
            clamp_to_max_length(max_velocity, velocity);
            if velocity.length_squared() < EPSILON {
                break;
            }
        }
        integrated_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane(normal: Vec3, priority: i32) -> SurfaceConstraintInfo {
        SurfaceConstraintInfo::new(Plane::new(normal.normalize(), 0.0), Vec3::ZERO, priority)
    }

    fn moving_plane(normal: Vec3, speed: f32) -> SurfaceConstraintInfo {
        let normal = normal.normalize();
        SurfaceConstraintInfo::new(Plane::new(normal, 0.0), normal * speed, 0)
    }

    #[test]
    fn one_plane_removes_only_the_violating_part() {
        let floor = plane(Vec3::Y, 0);
        let mut velocity = Vec3::new(1.0, -2.0, 0.0);
        solve_1d(&floor, &mut velocity);
        assert_eq!(velocity, Vec3::new(1.0, 0.0, 0.0));

        let mut separating = Vec3::new(1.0, 2.0, 0.0);
        solve_1d(&floor, &mut separating);
        assert_eq!(separating, Vec3::new(1.0, 2.0, 0.0));

        // The floor drops away at 1; falling at 3 only loses the difference.
        let receding = SurfaceConstraintInfo::new(Plane::new(Vec3::Y, 0.0), Vec3::new(0.0, -1.0, 0.0), 0);
        let mut falling = Vec3::new(0.0, -3.0, 0.0);
        solve_1d(&receding, &mut falling);
        assert_eq!(falling, Vec3::new(0.0, -1.0, 0.0));
        assert!(!test_1d(&receding, falling));
        assert!(test_1d(&receding, Vec3::new(0.0, -1.5, 0.0)));
    }

    #[test]
    fn sorting_follows_priority() {
        let solver = SimplexSolver::new();
        let (mut a, mut b, mut c) = (plane(Vec3::X, 3), plane(Vec3::Y, 1), plane(Vec3::Z, 2));
        solver.sort_2d(&mut a, &mut b);
        assert_eq!((a.priority, b.priority), (1, 3));
        solver.sort_3d(&mut b, &mut c, &mut a);
        assert_eq!((b.priority, c.priority, a.priority), (1, 2, 3));
        swap_planes(&mut a, &mut b);
        assert_eq!((a.priority, b.priority), (1, 3));
    }

    #[test]
    fn parallel_planes_resolve_to_the_fastest_plane() {
        let solver = SimplexSolver::new();
        let low = SurfaceConstraintInfo::new(Plane::new(Vec3::Y, 0.0), Vec3::new(0.0, 1.0, 0.0), 0);
        let high = SurfaceConstraintInfo::new(Plane::new(Vec3::Y, 0.0), Vec3::new(0.0, 2.0, 0.0), 5);
        let mut velocity = Vec3::new(0.0, -1.0, 0.0);
        solver.solve_2d(&high, &low, &mut velocity);
        assert_eq!(velocity, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn identical_planes_reduce_to_one() {
        let solver = SimplexSolver::new();
        let mut planes = [plane(Vec3::Y, 0); 4];
        let mut count = 3;
        let mut velocity = Vec3::new(1.0, -1.0, 0.0);
        solver.examine_active_planes(&mut planes, &mut count, &mut velocity);
        assert_eq!(count, 1);
        assert_eq!(velocity, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn orthogonal_planes_are_both_kept() {
        let solver = SimplexSolver::new();
        let mut planes = [plane(Vec3::Y, 0), plane(Vec3::X, 0), plane(Vec3::Z, 0), plane(Vec3::Z, 0)];
        let mut count = 2;
        let mut velocity = Vec3::new(-1.0, -1.0, 0.5);
        solver.examine_active_planes(&mut planes, &mut count, &mut velocity);
        assert_eq!(count, 2);
        assert!(velocity.abs_diff_eq(Vec3::new(0.0, 0.0, 0.5), 1e-6));
    }

    #[test]
    fn separating_plane_is_dropped() {
        let solver = SimplexSolver::new();
        let mut planes = [plane(Vec3::Y, 0), plane(Vec3::new(1.0, 1.0, 0.0), 0), plane(Vec3::Z, 0), plane(Vec3::Z, 0)];
        let mut count = 2;
        let mut velocity = Vec3::new(-1.0, 0.5, 0.0);
        solver.examine_active_planes(&mut planes, &mut count, &mut velocity);
        assert_eq!(count, 1);
        assert_eq!(planes[0].plane.normal, Vec3::new(1.0, 1.0, 0.0).normalize());
        assert!(velocity.dot(planes[0].plane.normal).abs() < 1e-6);
    }

    #[test]
    fn static_corner_stops_the_shape() {
        let solver = SimplexSolver::new();
        let mut planes = [plane(Vec3::X, 0), plane(Vec3::Y, 0), plane(Vec3::Z, 0), plane(Vec3::Z, 0)];
        let mut count = 3;
        let mut velocity = Vec3::new(-1.0, -2.0, -3.0);
        solver.examine_active_planes(&mut planes, &mut count, &mut velocity);
        assert_eq!(count, 3);
        assert!(velocity.abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn squeezing_corner_stops_the_shape() {
        let solver = SimplexSolver::new();
        let mut planes = [
            moving_plane(Vec3::X, 1.0),
            moving_plane(Vec3::Y, 1.0),
            moving_plane(Vec3::Z, 1.0),
            moving_plane(Vec3::new(-1.0, -1.0, -1.0), 1.0),
        ];
        let mut count = 4;
        let mut velocity = Vec3::ZERO;
        solver.examine_active_planes(&mut planes, &mut count, &mut velocity);
        assert_eq!(count, 4);
        assert_eq!(velocity, Vec3::ZERO);
    }

    #[test]
    fn four_planes_keep_a_velocity_that_respects_each_of_them() {
        let solver = SimplexSolver::new();
        // The receding fourth plane makes every triple that drops one of the walls move into that wall.
        let mut planes = [
            plane(Vec3::X, 0),
            plane(Vec3::Y, 0),
            plane(Vec3::Z, 0),
            moving_plane(Vec3::ONE, -10.0),
        ];
        let mut count = 4;
        let mut velocity = Vec3::new(-1.0, -2.0, 3.0);
        solver.examine_active_planes(&mut planes, &mut count, &mut velocity);
        assert_eq!(count, 4);
        assert!(velocity.abs_diff_eq(Vec3::new(0.0, 0.0, 3.0), 1e-5));
        for plane in &planes {
            assert!(!test_1d(plane, velocity), "{velocity} moves into {:?}", plane.plane);
        }
    }

    #[test]
    fn three_planes_meeting_in_a_line_fall_back() {
        let solver = SimplexSolver::new();
        let a = plane(Vec3::Y, 0);
        let b = plane(Vec3::new(1.0, 1.0, 0.0), 1);
        let c = plane(Vec3::new(-1.0, 1.0, 0.0), 2);
        let mut velocity = Vec3::new(0.0, -1.0, 2.0);
        solver.solve_3d(&a, &b, &c, &mut velocity);
        assert!(velocity.is_finite());
        assert!(velocity.abs_diff_eq(Vec3::new(0.0, 0.0, 2.0), 1e-5));
    }

    #[test]
    fn slides_along_the_floor_after_landing() {
        let solver = SimplexSolver::new();
        let mut constraints = [SurfaceConstraintInfo::new(Plane::new(Vec3::Y, 0.5), Vec3::ZERO, 0)];
        let mut position = Vec3::ZERO;
        let mut velocity = Vec3::new(1.0, -2.0, 0.0);
        let integrated = solver.solve(1.0, 1e-4, 100.0, &mut constraints, &mut position, &mut velocity);
        assert!((integrated - 1.0).abs() < 1e-6);
        assert!(position.abs_diff_eq(Vec3::new(1.0, -0.5, 0.0), 1e-6));
        assert_eq!(velocity, Vec3::new(1.0, 0.0, 0.0));
        assert!(constraints[0].touched);
    }

    #[test]
    fn velocity_is_clamped() {
        let solver = SimplexSolver::new();
        let mut position = Vec3::ZERO;
        let mut velocity = Vec3::new(10.0, 0.0, 0.0);
        solver.solve(1.0, 0.0, 2.0, &mut [], &mut position, &mut velocity);
        assert_eq!(velocity, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(position, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn custom_ordering_sorts_descending() {
        struct Descending;
        impl PlaneOrdering for Descending {
            fn precedes(&self, a: &SurfaceConstraintInfo, b: &SurfaceConstraintInfo) -> bool {
                a.priority >= b.priority
            }
        }
        let solver = SimplexSolver::with_ordering(Descending);
        let (mut a, mut b, mut c) = (plane(Vec3::X, 1), plane(Vec3::Y, 3), plane(Vec3::Z, 2));
        solver.sort_3d(&mut a, &mut b, &mut c);
        assert_eq!((a.priority, b.priority, c.priority), (3, 2, 1));
    }
}
