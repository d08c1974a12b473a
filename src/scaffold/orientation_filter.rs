use std::cmp::Ordering;
use tracing::debug;

use crate::scaffold::mate_pair_mapper::{pair_count, ContigMatePairs, ValidMatePair};

/// Keeps one direction of evidence per contig pair.
///
/// Pairs within a single contig are dropped. When evidence exists in both
/// directions the larger side wins; equal sides are merged into the direction
/// starting at the lower contig index.
#[derive(Debug, Clone)]
pub struct OrientationBasedMatePairFilter {
    redundancy: usize,
}

impl Default for OrientationBasedMatePairFilter {
    fn default() -> Self {
        Self::new(2)
    }
}

impl OrientationBasedMatePairFilter {
    pub fn new(redundancy: usize) -> Self {
        Self { redundancy }
    }

    pub fn redundancy(&self) -> usize {
        self.redundancy
    }

    pub fn filter_paired_reads(&self, mut pairs: ContigMatePairs) -> ContigMatePairs {
        let before = pair_count(&pairs);
        let keys: Vec<(usize, usize)> = pairs
            .iter()
            .flat_map(|(&a, targets)| targets.keys().map(move |&b| (a, b)))
            .collect();

        let mut filtered = ContigMatePairs::new();
        for (a, b) in keys {
            if a == b {
                continue;
            }
            let forward = take(&mut pairs, a, b);
            let backward = take(&mut pairs, b, a);
            if forward.is_empty() && backward.is_empty() {
                continue;
            }

            let (key, survivors, keep) = match forward.len().cmp(&backward.len()) {
                Ordering::Greater => {
                    let keep = forward.len() >= self.redundancy;
                    ((a, b), forward, keep)
                }
                Ordering::Less => {
                    let keep = backward.len() >= self.redundancy;
                    ((b, a), backward, keep)
                }
                Ordering::Equal => {
                    let key = (a.min(b), a.max(b));
                    let (mut merged, other) = if key == (a, b) {
                        (forward, backward)
                    } else {
                        (backward, forward)
                    };
                    merged.extend(other);
                    let keep = merged.len() > self.redundancy;
                    (key, merged, keep)
                }
            };

            if keep {
                filtered.entry(key.0).or_default().insert(key.1, survivors);
            }
        }

        debug!(
            "Orientation filter kept {} of {} mate pairs (redundancy {})",
            pair_count(&filtered),
            before,
            self.redundancy
        );
        filtered
    }
}

fn take(pairs: &mut ContigMatePairs, from: usize, to: usize) -> Vec<ValidMatePair> {
    pairs
        .get_mut(&from)
        .and_then(|targets| targets.remove(&to))
        .unwrap_or_default()
}
