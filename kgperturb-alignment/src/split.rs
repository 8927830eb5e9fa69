//! Seeded test/train split of aligned pairs.

use rand::{SeedableRng, rngs::SmallRng, seq::SliceRandom};

/// Seed of the shuffle that precedes the split.
pub const SPLIT_SEED: u64 = 42;

/// Percentage of shuffled pairs assigned to the test set.
pub const TEST_PERCENT: usize = 57;

/// One aligned pair of integer identifiers.
pub type AlignedPair = (u64, u64);

/// Shuffled pairs divided into test and train sets.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PairSplit {
    shuffled: Vec<AlignedPair>,
    test_len: usize,
}

impl PairSplit {
    /// Shuffles `pairs` with [`SPLIT_SEED`] and assigns the first
    /// `floor(len * 57 / 100)` to the test set.
    ///
    /// # Examples
    /// ```
    /// use kgperturb_alignment::PairSplit;
    ///
    /// let split = PairSplit::new((0..10).map(|n| (n, n + 10)).collect());
    /// assert_eq!(split.all().len(), 10);
    /// assert_eq!(split.test().len(), 5);
    /// assert_eq!(split.train().len(), 5);
    /// ```
    #[must_use]
    pub fn new(mut pairs: Vec<AlignedPair>) -> Self {
        let mut rng = SmallRng::seed_from_u64(SPLIT_SEED);
        pairs.shuffle(&mut rng);
        let test_len = pairs.len() * TEST_PERCENT / 100;
        Self {
            shuffled: pairs,
            test_len,
        }
    }

    /// Every pair in shuffled order.
    #[must_use]
    pub fn all(&self) -> &[AlignedPair] {
        &self.shuffled
    }

    /// Leading pairs used for evaluation.
    #[must_use]
    pub fn test(&self) -> &[AlignedPair] {
        self.shuffled.get(..self.test_len).unwrap_or_default()
    }

    /// Remaining pairs used for supervision.
    #[must_use]
    pub fn train(&self) -> &[AlignedPair] {
        self.shuffled.get(self.test_len..).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use kgperturb_test_support::ci::property_test_profile::ProptestRunProfile;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, 0)]
    #[case(1, 0)]
    #[case(2, 1)]
    #[case(7, 3)]
    #[case(100, 57)]
    fn test_share_is_floored(#[case] len: u64, #[case] expected: usize) {
        let split = PairSplit::new((0..len).map(|n| (n, n)).collect());
        assert_eq!(split.test().len(), expected);
        assert_eq!(split.train().len(), usize::try_from(len).expect("small") - expected);
    }

    #[rstest]
    fn the_shuffle_is_reproducible() {
        let pairs: Vec<AlignedPair> = (0..50).map(|n| (n, n + 100)).collect();
        assert_eq!(PairSplit::new(pairs.clone()), PairSplit::new(pairs));
    }

    fn split_proptest_config() -> ProptestConfig {
        let profile = ProptestRunProfile::load(64, false);
        ProptestConfig {
            cases: profile.cases(),
            fork: profile.fork(),
            ..ProptestConfig::default()
        }
    }

    proptest! {
        #![proptest_config(split_proptest_config())]

        #[test]
        fn split_partitions_the_pairs(
            pairs in proptest::collection::vec((0_u64..500, 0_u64..500), 0..200),
        ) {
            let split = PairSplit::new(pairs.clone());
            let mut rejoined = split.test().to_vec();
            rejoined.extend_from_slice(split.train());
            prop_assert_eq!(rejoined.as_slice(), split.all());

            let mut expected = pairs;
            let mut actual = split.all().to_vec();
            expected.sort_unstable();
            actual.sort_unstable();
            prop_assert_eq!(actual, expected);
            prop_assert_eq!(split.test().len(), split.all().len() * TEST_PERCENT / 100);
        }
    }
}
