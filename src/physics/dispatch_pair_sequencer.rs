use std::collections::HashSet;

use tracing::trace;

use crate::physics::constraints::joint::Joint;
use crate::physics::dispatch_pair::DispatchPair;
use crate::physics::error::PhysicsResult;
use crate::physics::handles::{BodyIndexPair, JointIndex};
use crate::physics::solver_scheduler_info::{
    PhaseInfo, SolverSchedulerInfo, BATCH_SIZE, NUM_PHASES, SEQUENTIAL_PHASE_INDEX,
};
use crate::utilities::collections::lsb_radix_sort;
use crate::utilities::collections::IndexSet;
use crate::utilities::memory::DisjointBuffer;
use crate::utilities::thread_dispatcher::{for_each_job, ThreadDispatcher};

/// Dispatch pairs grouped by phase, with the partition describing them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhasedDispatchPairs {
    pub pairs: Vec<DispatchPair>,
    pub info: SolverSchedulerInfo,
}

/// Orders one step's collision and joint pairs and partitions them into phases whose batches touch disjoint
/// dynamic bodies.
pub struct DispatchPairSequencer;

impl DispatchPairSequencer {
    /// Creates the unsorted dispatch pairs for a step.
    ///
    /// Collision pairs between two static bodies are dropped, as are collision pairs whose bodies are connected
    /// by a joint that disables collision. Dynamic-dynamic collision pairs are ordered by index and
    /// dynamic-static ones put the dynamic body first. Joints need at least one dynamic body to be scheduled.
    pub fn create_dispatch_pairs(
        body_pairs: &[BodyIndexPair],
        joints: &[Joint],
        num_dynamic_bodies: usize,
    ) -> PhysicsResult<Vec<DispatchPair>> {
        let is_dynamic = |index: usize| index < num_dynamic_bodies;
        let unordered = |pair: BodyIndexPair| {
            (
                pair.body_index_a.min(pair.body_index_b),
                pair.body_index_a.max(pair.body_index_b),
            )
        };
        let blocked: HashSet<(usize, usize)> = joints
            .iter()
            .filter(|joint| !joint.enable_collision)
            .map(|joint| unordered(joint.body_pair))
            .collect();

        let mut pairs = Vec::with_capacity(body_pairs.len() + joints.len());
        for &pair in body_pairs {
            let (a, b) = (pair.body_index_a, pair.body_index_b);
            if a == b || (!is_dynamic(a) && !is_dynamic(b)) || blocked.contains(&unordered(pair)) {
                continue;
            }
            let pair = if is_dynamic(a) && is_dynamic(b) {
                BodyIndexPair::new(a.min(b), a.max(b))
            } else if is_dynamic(a) {
                pair
            } else {
                pair.swapped()
            };
            pairs.push(DispatchPair::create_collision_pair(pair)?);
        }
        for (joint_index, joint) in joints.iter().enumerate() {
            let (a, b) = (joint.body_pair.body_index_a, joint.body_pair.body_index_b);
            // Unset joint slots point body 0 at itself.
            if a == b || (!is_dynamic(a) && !is_dynamic(b)) {
                continue;
            }
            pairs.push(DispatchPair::create_joint(joint.body_pair, JointIndex(joint_index))?);
        }
        Ok(pairs)
    }

    /// Sorts pairs by their packed value.
    ///
    /// Body A is sorted first with a radix sort whose digit count follows the largest body A index; each run of
    /// equal body A is then sorted by the full packed value. Runs are independent, so they are spread across
    /// the dispatcher's workers when one is given.
    pub fn sort_dispatch_pairs(pairs: &mut Vec<DispatchPair>, dispatcher: Option<&dyn ThreadDispatcher>) {
        if pairs.len() < 2 {
            return;
        }
        let max_body_index = pairs.iter().map(|pair| pair.body_index_a()).max().unwrap_or(0);
        let mut scratch = Vec::with_capacity(pairs.len());
        lsb_radix_sort::sort_by_key(pairs, &mut scratch, max_body_index as u32, |pair| {
            pair.body_index_a() as u32
        });

        let mut runs: Vec<&mut [DispatchPair]> = pairs
            .chunk_by_mut(|a, b| a.body_index_a() == b.body_index_a())
            .filter(|run| run.len() > 1)
            .collect();
        let run_count = runs.len();
        let run_buffer = DisjointBuffer::new(&mut runs);
        for_each_job(dispatcher, run_count, &|run_index| {
            // SAFETY: each run index is claimed by exactly one job.
            let run = unsafe { run_buffer.get_mut(run_index) };
            run.sort_unstable();
        });
    }

    /// Consumes sorted pairs in batches of `BATCH_SIZE` and places each batch into the first parallel phase
    /// that has not yet claimed any of its dynamic bodies. Batches that fit nowhere go to the sequential phase.
    pub fn assign_phases(sorted_pairs: &[DispatchPair], num_dynamic_bodies: usize) -> PhasedDispatchPairs {
        let mut claimed: Vec<IndexSet> = (0..SEQUENTIAL_PHASE_INDEX)
            .map(|_| IndexSet::new(num_dynamic_bodies))
            .collect();
        let mut phase_batches: [Vec<std::ops::Range<usize>>; NUM_PHASES] = Default::default();
        let mut batch_bodies = Vec::with_capacity(BATCH_SIZE * 2);

        for batch_start in (0..sorted_pairs.len()).step_by(BATCH_SIZE) {
            let batch_end = (batch_start + BATCH_SIZE).min(sorted_pairs.len());
            batch_bodies.clear();
            for pair in &sorted_pairs[batch_start..batch_end] {
                for body_index in [pair.body_index_a(), pair.body_index_b()] {
                    if body_index < num_dynamic_bodies {
                        batch_bodies.push(body_index);
                    }
                }
            }
            let phase = claimed
                .iter()
                .position(|set| set.can_fit(&batch_bodies))
                .unwrap_or(SEQUENTIAL_PHASE_INDEX);
            if phase != SEQUENTIAL_PHASE_INDEX {
                for &body_index in &batch_bodies {
                    claimed[phase].add(body_index);
                }
            }
            phase_batches[phase].push(batch_start..batch_end);
        }

        let mut phased = PhasedDispatchPairs {
            pairs: Vec::with_capacity(sorted_pairs.len()),
            info: SolverSchedulerInfo::default(),
        };
        for (phase, batches) in phase_batches.iter().enumerate() {
            let mut info = PhaseInfo {
                first_dispatch_pair_index: phased.pairs.len(),
                first_batch_index: phased.info.batches.len(),
                ..PhaseInfo::default()
            };
            for range in batches {
                let start = phased.pairs.len();
                phased.pairs.extend_from_slice(&sorted_pairs[range.clone()]);
                phased.info.batches.push(start..phased.pairs.len());
            }
            info.dispatch_pair_count = phased.pairs.len() - info.first_dispatch_pair_index;
            info.batch_count = batches.len();
            info.contains_duplicate_indices = phase == SEQUENTIAL_PHASE_INDEX && info.batch_count > 0;
            phased.info.phase_info[phase] = info;
        }
        phased.info.num_active_phases = phased
            .info
            .phase_info
            .iter()
            .filter(|info| info.dispatch_pair_count > 0)
            .count();
        phased
    }

    /// Creates, sorts and phases the dispatch pairs of a step.
    pub fn create_phased_dispatch_pairs(
        body_pairs: &[BodyIndexPair],
        joints: &[Joint],
        num_dynamic_bodies: usize,
        dispatcher: Option<&dyn ThreadDispatcher>,
    ) -> PhysicsResult<PhasedDispatchPairs> {
        let mut pairs = Self::create_dispatch_pairs(body_pairs, joints, num_dynamic_bodies)?;
        Self::sort_dispatch_pairs(&mut pairs, dispatcher);
        let phased = Self::assign_phases(&pairs, num_dynamic_bodies);
        trace!(
            pairs = phased.pairs.len(),
            batches = phased.info.batch_count(),
            active_phases = phased.info.num_active_phases,
            sequential_pairs = phased.info.phase_info[SEQUENTIAL_PHASE_INDEX].dispatch_pair_count,
            "phased dispatch pairs"
        );
        Ok(phased)
    }
}
