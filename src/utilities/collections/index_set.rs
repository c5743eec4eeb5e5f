/// Collection of unique indices supporting add, remove, and contains operations.
/// Uses packed bitfields where each bit represents one index's containment state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IndexSet {
    /// Packed bitfields representing index containment.
    flags: Vec<u64>,
}

impl IndexSet {
    const SHIFT: usize = 6;
    const MASK: usize = 63;

    /// Gets the bundle capacity needed for the given count.
    #[inline(always)]
    pub fn get_bundle_capacity(count: usize) -> usize {
        (count + Self::MASK) >> Self::SHIFT
    }

    /// Creates a new IndexSet able to hold indices below `initial_capacity` without resizing.
    pub fn new(initial_capacity: usize) -> Self {
        Self {
            flags: vec![0; Self::get_bundle_capacity(initial_capacity)],
        }
    }

    /// Checks if an index is contained in the set.
    #[inline(always)]
    pub fn contains(&self, index: usize) -> bool {
        let packed_index = index >> Self::SHIFT;
        packed_index < self.flags.len() && (self.flags[packed_index] & (1u64 << (index & Self::MASK))) != 0
    }

    /// Gets whether the set could hold the specified indices without any of them already being present.
    #[inline(always)]
    pub fn can_fit(&self, index_list: &[usize]) -> bool {
        index_list.iter().all(|&index| !self.contains(index))
    }

    /// Adds an index to the set, growing the backing storage as needed.
    #[inline(always)]
    pub fn add(&mut self, index: usize) {
        let bundle_index = index >> Self::SHIFT;
        if bundle_index >= self.flags.len() {
            self.flags.resize(bundle_index + 1, 0);
        }
        self.flags[bundle_index] |= 1u64 << (index & Self::MASK);
    }

    /// Removes an index from the set if it is present.
    #[inline(always)]
    pub fn remove(&mut self, index: usize) {
        let bundle_index = index >> Self::SHIFT;
        if bundle_index < self.flags.len() {
            self.flags[bundle_index] &= !(1u64 << (index & Self::MASK));
        }
    }

    /// Clears all indices while keeping the allocation.
    pub fn clear(&mut self) {
        self.flags.fill(0);
    }

    /// Number of indices in the set.
    pub fn count(&self) -> usize {
        self.flags.iter().map(|bundle| bundle.count_ones() as usize).sum()
    }
}
