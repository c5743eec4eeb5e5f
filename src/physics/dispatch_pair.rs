use std::fmt;

use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::physics::handles::{BodyIndexPair, JointIndex};

/// A collision or joint pair awaiting constraint construction, packed into 64 bits.
///
/// Layout, high to low: body index A (24 bits), body index B (24 bits), joint index (15 bits), joint flag (1
/// bit). Body A occupies the most significant bits so that ordering the packed value orders by body A first,
/// then body B.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DispatchPair(u64);

impl DispatchPair {
    pub const BODY_INDEX_BITS: u32 = 24;
    pub const JOINT_INDEX_BITS: u32 = 15;
    /// Largest body index a pair can carry. The all-ones value is reserved for `INVALID`.
    pub const MAX_BODY_INDEX: usize = (1 << Self::BODY_INDEX_BITS) - 2;
    pub const MAX_JOINT_INDEX: usize = (1 << Self::JOINT_INDEX_BITS) - 1;

    const BODY_INDEX_MASK: u64 = (1 << Self::BODY_INDEX_BITS) - 1;
    const JOINT_INDEX_MASK: u64 = (1 << Self::JOINT_INDEX_BITS) - 1;
    const BODY_A_SHIFT: u32 = 40;
    const BODY_B_SHIFT: u32 = 16;
    const JOINT_INDEX_SHIFT: u32 = 1;
    const JOINT_FLAG: u64 = 1;

    pub const INVALID: DispatchPair = DispatchPair(u64::MAX);

    #[inline(always)]
    fn check_body_index(index: usize) -> PhysicsResult<u64> {
        if index > Self::MAX_BODY_INDEX {
            return Err(PhysicsError::DispatchPairIndexOverflow {
                index,
                bits: Self::BODY_INDEX_BITS,
            });
        }
        Ok(index as u64)
    }

    #[inline(always)]
    fn pack_bodies(pair: BodyIndexPair) -> PhysicsResult<u64> {
        let a = Self::check_body_index(pair.body_index_a)?;
        let b = Self::check_body_index(pair.body_index_b)?;
        Ok((a << Self::BODY_A_SHIFT) | (b << Self::BODY_B_SHIFT))
    }

    pub fn create_collision_pair(pair: BodyIndexPair) -> PhysicsResult<DispatchPair> {
        Ok(DispatchPair(Self::pack_bodies(pair)?))
    }

    pub fn create_joint(pair: BodyIndexPair, joint_index: JointIndex) -> PhysicsResult<DispatchPair> {
        if joint_index.0 > Self::MAX_JOINT_INDEX {
            return Err(PhysicsError::DispatchPairIndexOverflow {
                index: joint_index.0,
                bits: Self::JOINT_INDEX_BITS,
            });
        }
        Ok(DispatchPair(
            Self::pack_bodies(pair)? | ((joint_index.0 as u64) << Self::JOINT_INDEX_SHIFT) | Self::JOINT_FLAG,
        ))
    }

    #[inline(always)]
    pub fn body_index_a(&self) -> usize {
        ((self.0 >> Self::BODY_A_SHIFT) & Self::BODY_INDEX_MASK) as usize
    }

    #[inline(always)]
    pub fn body_index_b(&self) -> usize {
        ((self.0 >> Self::BODY_B_SHIFT) & Self::BODY_INDEX_MASK) as usize
    }

    #[inline(always)]
    pub fn body_pair(&self) -> BodyIndexPair {
        BodyIndexPair::new(self.body_index_a(), self.body_index_b())
    }

    #[inline(always)]
    pub fn joint_index(&self) -> JointIndex {
        JointIndex(((self.0 >> Self::JOINT_INDEX_SHIFT) & Self::JOINT_INDEX_MASK) as usize)
    }

    #[inline(always)]
    pub fn is_joint(&self) -> bool {
        self.is_valid() && (self.0 & Self::JOINT_FLAG) != 0
    }

    #[inline(always)]
    pub fn is_collision_pair(&self) -> bool {
        self.is_valid() && (self.0 & Self::JOINT_FLAG) == 0
    }

    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    #[inline(always)]
    pub fn packed(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for DispatchPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            write!(f, "DispatchPair(INVALID)")
        } else if self.is_joint() {
            write!(
                f,
                "DispatchPair(joint {} on {}, {})",
                self.joint_index().0,
                self.body_index_a(),
                self.body_index_b()
            )
        } else {
            write!(f, "DispatchPair({}, {})", self.body_index_a(), self.body_index_b())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packing_roundtrips_fields() {
        let pair = DispatchPair::create_joint(BodyIndexPair::new(70_000, 12), JointIndex(32_767)).unwrap();
        assert_eq!(pair.body_index_a(), 70_000);
        assert_eq!(pair.body_index_b(), 12);
        assert_eq!(pair.joint_index(), JointIndex(32_767));
        assert!(pair.is_joint());
        assert!(!pair.is_collision_pair());

        let collision = DispatchPair::create_collision_pair(BodyIndexPair::new(3, 9)).unwrap();
        assert!(collision.is_collision_pair());
        assert_eq!(collision.body_pair(), BodyIndexPair::new(3, 9));
        assert!(!DispatchPair::INVALID.is_joint());
        assert!(!DispatchPair::INVALID.is_collision_pair());
    }

    #[test]
    fn packed_order_is_body_a_major() {
        let low_a = DispatchPair::create_joint(BodyIndexPair::new(1, 1000), JointIndex(500)).unwrap();
        let high_a = DispatchPair::create_collision_pair(BodyIndexPair::new(2, 0)).unwrap();
        assert!(low_a < high_a);
        let low_b = DispatchPair::create_joint(BodyIndexPair::new(2, 0), JointIndex(1)).unwrap();
        let high_b = DispatchPair::create_collision_pair(BodyIndexPair::new(2, 1)).unwrap();
        assert!(low_b < high_b);
    }

    #[test]
    fn overflowing_indices_are_rejected() {
        let too_big = DispatchPair::MAX_BODY_INDEX + 1;
        assert_eq!(
            DispatchPair::create_collision_pair(BodyIndexPair::new(too_big, 0)),
            Err(PhysicsError::DispatchPairIndexOverflow {
                index: too_big,
                bits: DispatchPair::BODY_INDEX_BITS
            })
        );
        assert!(DispatchPair::create_joint(BodyIndexPair::new(0, 1), JointIndex(1 << 15)).is_err());
    }
}
