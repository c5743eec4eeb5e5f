/// How two material coefficients are merged. When the two bodies disagree, the policy ranked higher in
/// declaration order is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum CombinePolicy {
    #[default]
    GeometricMean,
    Minimum,
    Maximum,
    ArithmeticMean,
}

impl CombinePolicy {
    #[inline(always)]
    pub fn resolve(a: CombinePolicy, b: CombinePolicy) -> CombinePolicy {
        a.max(b)
    }

    #[inline(always)]
    pub fn combine(self, a: f32, b: f32) -> f32 {
        match self {
            CombinePolicy::GeometricMean => (a * b).sqrt(),
            CombinePolicy::Minimum => a.min(b),
            CombinePolicy::Maximum => a.max(b),
            CombinePolicy::ArithmeticMean => (a + b) * 0.5,
        }
    }
}

/// What the narrowphase does with a colliding pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollisionResponsePolicy {
    /// Solve contacts.
    #[default]
    Collide,
    /// Solve contacts and report collision events.
    CollideRaiseCollisionEvents,
    /// Do not solve; report trigger events.
    RaiseTriggerEvents,
    /// Ignore the pair entirely.
    None,
}

impl CollisionResponsePolicy {
    /// Pairwise resolution. Ignoring beats triggering, triggering beats colliding, and either side asking for
    /// collision events gets them.
    pub fn resolve(a: CollisionResponsePolicy, b: CollisionResponsePolicy) -> CollisionResponsePolicy {
        use CollisionResponsePolicy::*;
        match (a, b) {
            (None, _) | (_, None) => None,
            (RaiseTriggerEvents, _) | (_, RaiseTriggerEvents) => RaiseTriggerEvents,
            (CollideRaiseCollisionEvents, _) | (_, CollideRaiseCollisionEvents) => CollideRaiseCollisionEvents,
            (Collide, Collide) => Collide,
        }
    }
}

/// Surface properties of a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub friction: f32,
    pub restitution: f32,
    pub friction_combine_policy: CombinePolicy,
    pub restitution_combine_policy: CombinePolicy,
    pub collision_response: CollisionResponsePolicy,
    /// User bits carried into events.
    pub custom_tags: u8,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
            friction_combine_policy: CombinePolicy::GeometricMean,
            restitution_combine_policy: CombinePolicy::Maximum,
            collision_response: CollisionResponsePolicy::Collide,
            custom_tags: 0,
        }
    }
}

impl Material {
    pub fn get_combined_friction(a: &Material, b: &Material) -> f32 {
        CombinePolicy::resolve(a.friction_combine_policy, b.friction_combine_policy)
            .combine(a.friction, b.friction)
    }

    pub fn get_combined_restitution(a: &Material, b: &Material) -> f32 {
        CombinePolicy::resolve(a.restitution_combine_policy, b.restitution_combine_policy)
            .combine(a.restitution, b.restitution)
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.friction.is_finite()
            && self.friction >= 0.0
            && self.restitution.is_finite()
            && self.restitution >= 0.0
    }
}

/// Layer based pair filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollisionFilter {
    /// Layers this collider belongs to.
    pub belongs_to: u32,
    /// Layers this collider can collide with.
    pub collides_with: u32,
    /// Nonzero group indices override the layer masks for colliders sharing the group: positive always
    /// collide, negative never do.
    pub group_index: i32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl CollisionFilter {
    /// Collides with everything.
    pub const DEFAULT: Self = Self {
        belongs_to: u32::MAX,
        collides_with: u32::MAX,
        group_index: 0,
    };

    /// Collides with nothing.
    pub const ZERO: Self = Self {
        belongs_to: 0,
        collides_with: 0,
        group_index: 0,
    };

    pub fn is_collision_enabled(a: &CollisionFilter, b: &CollisionFilter) -> bool {
        if a.group_index != 0 && a.group_index == b.group_index {
            return a.group_index > 0;
        }
        (a.belongs_to & b.collides_with) != 0 && (b.belongs_to & a.collides_with) != 0
    }

    /// Union of two filters; used for compound colliders.
    pub fn create_union(a: &CollisionFilter, b: &CollisionFilter) -> CollisionFilter {
        CollisionFilter {
            belongs_to: a.belongs_to | b.belongs_to,
            collides_with: a.collides_with | b.collides_with,
            group_index: if a.group_index == b.group_index { a.group_index } else { 0 },
        }
    }
}
