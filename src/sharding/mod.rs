//! Partitioning of a submission's learners into shards
//!
//! Shards are contiguous, disjoint and exhaustive: concatenating them in
//! index order reproduces the learner sequence exactly.

use crate::model::{Header, Learner, Submission};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use tracing::debug;

/// Default maximum number of learners per shard
pub const DEFAULT_SHARD_SIZE: usize = 500;

/// How records are split into shards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardPolicy {
    max_records_per_shard: NonZeroUsize,
}

impl ShardPolicy {
    pub fn new(max_records_per_shard: NonZeroUsize) -> Self {
        Self {
            max_records_per_shard,
        }
    }

    /// Policy for a raw size; `None` when the size is zero
    pub fn with_max_records(max_records_per_shard: usize) -> Option<Self> {
        NonZeroUsize::new(max_records_per_shard).map(Self::new)
    }

    pub fn max_records_per_shard(&self) -> usize {
        self.max_records_per_shard.get()
    }
}

impl Default for ShardPolicy {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(DEFAULT_SHARD_SIZE).unwrap_or(NonZeroUsize::MIN))
    }
}

/// One unit of parallel work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shard {
    /// Zero-based position in partition order
    pub index: usize,
    pub header: Header,
    pub learners: Vec<Learner>,
}

impl Shard {
    pub fn len(&self) -> usize {
        self.learners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.learners.is_empty()
    }
}

/// Split `records` into order-preserving chunks of at most `size` elements
pub fn partition_records<T: Clone>(records: &[T], size: NonZeroUsize) -> Vec<Vec<T>> {
    records.chunks(size.get()).map(<[T]>::to_vec).collect()
}

#[derive(Debug, Clone, Default)]
pub struct ShardingService {
    policy: ShardPolicy,
}

impl ShardingService {
    pub fn new(policy: ShardPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ShardPolicy {
        self.policy
    }

    /// Partition the learners of `submission`; no learners means no shards
    pub fn partition(&self, submission: &Submission) -> Vec<Shard> {
        let shards: Vec<Shard> =
            partition_records(&submission.learners, self.policy.max_records_per_shard)
                .into_iter()
                .enumerate()
                .map(|(index, learners)| Shard {
                    index,
                    header: submission.header.clone(),
                    learners,
                })
                .collect();

        debug!(
            learners = submission.learners.len(),
            shard_size = self.policy.max_records_per_shard(),
            shards = shards.len(),
            "Partitioned submission"
        );
        shards
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use proptest::prelude::*;

    fn service(size: usize) -> ShardingService {
        ShardingService::new(ShardPolicy::with_max_records(size).unwrap())
    }

    #[test]
    fn test_seven_learners_shard_size_three() {
        let submission = fixtures::submission(fixtures::learners(7));
        let shards = service(3).partition(&submission);

        let sizes: Vec<_> = shards.iter().map(Shard::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        let indexes: Vec<_> = shards.iter().map(|s| s.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert_eq!(shards[1].learners[0].learn_ref_number, "LRN004");
    }

    #[test]
    fn test_degenerate_cases() {
        let empty = fixtures::submission(Vec::new());
        assert!(service(3).partition(&empty).is_empty());

        let small = fixtures::submission(fixtures::learners(2));
        assert_eq!(service(500).partition(&small).len(), 1);

        let exact = fixtures::submission(fixtures::learners(6));
        assert_eq!(service(3).partition(&exact).len(), 2);
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(ShardPolicy::with_max_records(0).is_none());
        assert_eq!(ShardPolicy::default().max_records_per_shard(), DEFAULT_SHARD_SIZE);
    }

    proptest! {
        #[test]
        fn test_partition_is_lossless(
            records in prop::collection::vec(any::<u32>(), 0..200),
            size in 1usize..50,
        ) {
            let size = NonZeroUsize::new(size).unwrap();
            let chunks = partition_records(&records, size);

            let rejoined: Vec<u32> = chunks.iter().flatten().copied().collect();
            prop_assert_eq!(&rejoined, &records);
            prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= size.get()));
            prop_assert_eq!(chunks.len(), records.len().div_ceil(size.get()));
        }
    }
}
