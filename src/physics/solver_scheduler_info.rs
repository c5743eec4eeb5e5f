use std::ops::Range;

use thiserror::Error;

use crate::physics::dispatch_pair::DispatchPair;
use crate::utilities::collections::IndexSet;

/// Number of dispatch pairs consumed per batch during phase assignment.
pub const BATCH_SIZE: usize = 8;
/// Number of phases, including the trailing sequential phase.
pub const NUM_PHASES: usize = 16;
/// Phase that receives batches which fit no parallel phase. Its pairs are solved one at a time.
pub const SEQUENTIAL_PHASE_INDEX: usize = NUM_PHASES - 1;

/// Location of one phase within the phased dispatch pair array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PhaseInfo {
    pub first_dispatch_pair_index: usize,
    pub dispatch_pair_count: usize,
    pub first_batch_index: usize,
    pub batch_count: usize,
    /// Set only on the sequential phase, whenever it holds pairs. Those pairs may share dynamic bodies, so they
    /// are solved one at a time, in order, on the calling thread.
    pub contains_duplicate_indices: bool,
}

impl PhaseInfo {
    #[inline(always)]
    pub fn dispatch_pair_range(&self) -> Range<usize> {
        self.first_dispatch_pair_index..self.first_dispatch_pair_index + self.dispatch_pair_count
    }

    #[inline(always)]
    pub fn batch_range(&self) -> Range<usize> {
        self.first_batch_index..self.first_batch_index + self.batch_count
    }
}

/// Phase partition of one step's dispatch pairs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SolverSchedulerInfo {
    pub phase_info: [PhaseInfo; NUM_PHASES],
    /// Number of phases holding at least one pair.
    pub num_active_phases: usize,
    /// Dispatch pair range of every batch, in phase order.
    pub batches: Vec<Range<usize>>,
}

/// Broken scheduling invariants. These indicate a sequencer bug rather than bad input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerIntegrityError {
    #[error("phase {phase} reuses dynamic body {body_index} across batches")]
    OverlappingBatches { phase: usize, body_index: usize },

    #[error("phases hold {actual} dispatch pairs but {expected} were scheduled")]
    PairCountMismatch { expected: usize, actual: usize },

    #[error("{actual} active phases reported but {expected} phases hold pairs")]
    ActivePhaseMismatch { expected: usize, actual: usize },

    #[error("phase {phase} does not start where the previous phase ended")]
    NonContiguousPhase { phase: usize },

    #[error("batch {batch} covers {actual} pairs; batches hold between 1 and {limit}")]
    MalformedBatch { batch: usize, actual: usize, limit: usize },
}

impl SolverSchedulerInfo {
    #[inline(always)]
    pub fn total_dispatch_pair_count(&self) -> usize {
        self.phase_info.iter().map(|phase| phase.dispatch_pair_count).sum()
    }

    #[inline(always)]
    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Batch ranges of one phase.
    #[inline(always)]
    pub fn phase_batches(&self, phase_index: usize) -> &[Range<usize>] {
        &self.batches[self.phase_info[phase_index].batch_range()]
    }

    /// Verifies the partition produced for `phased_pairs`.
    ///
    /// Within every parallel phase no dynamic body may appear in two different batches; a single batch is
    /// solved by one worker and may repeat bodies. Phases must tile the pair array in order, and the active
    /// phase count must match the non-empty phases.
    pub fn check_integrity(
        &self,
        phased_pairs: &[DispatchPair],
        num_dynamic_bodies: usize,
    ) -> Result<(), SchedulerIntegrityError> {
        let total = self.total_dispatch_pair_count();
        if total != phased_pairs.len() {
            return Err(SchedulerIntegrityError::PairCountMismatch {
                expected: phased_pairs.len(),
                actual: total,
            });
        }

        let mut expected_start = 0;
        let mut expected_batch = 0;
        for (phase, info) in self.phase_info.iter().enumerate() {
            if info.first_dispatch_pair_index != expected_start || info.first_batch_index != expected_batch {
                return Err(SchedulerIntegrityError::NonContiguousPhase { phase });
            }
            if info.batch_range().end > self.batches.len() {
                return Err(SchedulerIntegrityError::NonContiguousPhase { phase });
            }
            let mut batch_start = info.first_dispatch_pair_index;
            for range in self.phase_batches(phase) {
                if range.start != batch_start {
                    return Err(SchedulerIntegrityError::NonContiguousPhase { phase });
                }
                batch_start = range.end;
            }
            if batch_start != info.dispatch_pair_range().end {
                return Err(SchedulerIntegrityError::NonContiguousPhase { phase });
            }
            expected_start += info.dispatch_pair_count;
            expected_batch += info.batch_count;
        }
        if expected_batch != self.batches.len() {
            return Err(SchedulerIntegrityError::NonContiguousPhase {
                phase: SEQUENTIAL_PHASE_INDEX,
            });
        }
        for (batch, range) in self.batches.iter().enumerate() {
            if range.is_empty() || range.len() > BATCH_SIZE {
                return Err(SchedulerIntegrityError::MalformedBatch {
                    batch,
                    actual: range.len(),
                    limit: BATCH_SIZE,
                });
            }
        }

        let mut claimed = IndexSet::new(num_dynamic_bodies);
        let mut batch_bodies = IndexSet::new(num_dynamic_bodies);
        for phase in 0..SEQUENTIAL_PHASE_INDEX {
            claimed.clear();
            for range in self.phase_batches(phase) {
                batch_bodies.clear();
                for pair in &phased_pairs[range.clone()] {
                    for body_index in [pair.body_index_a(), pair.body_index_b()] {
                        if body_index >= num_dynamic_bodies {
                            continue;
                        }
                        if claimed.contains(body_index) {
                            return Err(SchedulerIntegrityError::OverlappingBatches { phase, body_index });
                        }
                        batch_bodies.add(body_index);
                    }
                }
                for pair in &phased_pairs[range.clone()] {
                    for body_index in [pair.body_index_a(), pair.body_index_b()] {
                        if batch_bodies.contains(body_index) {
                            claimed.add(body_index);
                        }
                    }
                }
            }
        }

        let expected_active = self
            .phase_info
            .iter()
            .filter(|phase| phase.dispatch_pair_count > 0)
            .count();
        if expected_active != self.num_active_phases {
            return Err(SchedulerIntegrityError::ActivePhaseMismatch {
                expected: expected_active,
                actual: self.num_active_phases,
            });
        }
        Ok(())
    }
}
