//! Contig distance estimation from mate pairs
//!
//! Every pair yields two gap estimates: one with the reverse contig kept as is and
//! one with it reverse-complemented:
//!
//! ```text
//! gap = mean_insert - (forward_contig_len - forward_read_start) - (reverse_read_end + 1)
//! ```
//!
//! Estimates within three standard deviations of each other are bundled into an
//! inverse-variance weighted mean. The remaining bundles of a contig pair are
//! reduced to one weight-averaged edge.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::data_structures::Contig;
use crate::scaffold::clone_library::CloneLibrary;
use crate::scaffold::mate_pair_mapper::{ContigMatePairs, ValidMatePair};

const MIN_DEVIATION: f64 = 1e-6;

/// One or more merged distance estimates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceBundle {
    pub distances: [f64; 2],
    pub standard_deviations: [f64; 2],
    pub weight: usize,
}

/// Final edge between two contigs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContigPairDistance {
    pub from: usize,
    pub to: usize,
    pub estimate: DistanceBundle,
    /// Pairs placing both contigs in the same orientation
    pub same_orientation_votes: usize,
    /// Pairs placing the second contig reverse-complemented
    pub reversed_votes: usize,
}

impl ContigPairDistance {
    /// Ties keep the second contig in its orientation
    pub fn reverse_complemented(&self) -> bool {
        self.reversed_votes > self.same_orientation_votes
    }

    pub fn gap(&self) -> f64 {
        self.estimate.distances[self.orientation_index()]
    }

    pub fn standard_deviation(&self) -> f64 {
        self.estimate.standard_deviations[self.orientation_index()]
    }

    fn orientation_index(&self) -> usize {
        usize::from(self.reverse_complemented())
    }
}

pub struct DistanceCalculator<'a> {
    library: &'a CloneLibrary,
}

impl<'a> DistanceCalculator<'a> {
    pub fn new(library: &'a CloneLibrary) -> Self {
        Self { library }
    }

    /// Fill per-pair estimates in `pairs` and reduce each contig pair to one edge.
    pub fn calculate_distance(
        &self,
        pairs: &mut ContigMatePairs,
        contigs: &[Contig],
    ) -> Vec<ContigPairDistance> {
        let mut work: Vec<(usize, usize, &mut Vec<ValidMatePair>)> = pairs
            .iter_mut()
            .flat_map(|(&from, targets)| {
                targets
                    .iter_mut()
                    .map(move |(&to, list)| (from, to, list))
            })
            .collect();

        let distances: Vec<ContigPairDistance> = work
            .par_iter_mut()
            .filter_map(|(from, to, list)| {
                let bundles: Vec<DistanceBundle> = list
                    .iter_mut()
                    .filter_map(|pair| self.estimate(pair, contigs))
                    .collect();
                let bundles = edge_bundling(bundles);
                debug!("Contig pair {}->{}: {} bundles", from, to, bundles.len());
                let estimate = weighted_edge(&bundles)?;
                let same = list.iter().filter(|p| p.supports_same_orientation()).count();
                Some(ContigPairDistance {
                    from: *from,
                    to: *to,
                    estimate,
                    same_orientation_votes: same,
                    reversed_votes: list.len() - same,
                })
            })
            .collect();

        info!("Estimated distances for {} contig pairs", distances.len());
        distances
    }

    /// Both gap estimates of one pair, also stored on the pair
    fn estimate(&self, pair: &mut ValidMatePair, contigs: &[Contig]) -> Option<DistanceBundle> {
        let info = self.library.get(&pair.pair.library)?;
        let length = contigs.get(pair.forward_contig)?.length as f64;
        let outer = info.mean_length - (length - pair.forward_read_start as f64);

        pair.distances = [
            outer - (pair.reverse_read_start as f64 + 1.0),
            outer - (pair.reverse_read_reverse_complement_start as f64 + 1.0),
        ];
        pair.standard_deviations = [info.standard_deviation; 2];
        pair.weight = 1;

        Some(DistanceBundle {
            distances: pair.distances,
            standard_deviations: pair.standard_deviations,
            weight: 1,
        })
    }
}

/// Merge estimates lying within three standard deviations of each other.
///
/// Scanning restarts from the first entry after every merge.
pub fn edge_bundling(mut bundles: Vec<DistanceBundle>) -> Vec<DistanceBundle> {
    let mut index = 0;
    while index < bundles.len() {
        let center = bundles[index].distances[0];
        let tolerance = 3.0 * bundles[index].standard_deviations[0];
        let (group, rest): (Vec<DistanceBundle>, Vec<DistanceBundle>) = bundles
            .iter()
            .copied()
            .partition(|b| (b.distances[0] - center).abs() <= tolerance);

        if group.len() > 1 {
            bundles = rest;
            bundles.push(merge_bundle(&group));
            index = 0;
        } else {
            index += 1;
        }
    }
    bundles
}

fn merge_bundle(group: &[DistanceBundle]) -> DistanceBundle {
    let mut distances = [0.0; 2];
    let mut standard_deviations = [0.0; 2];
    for orientation in 0..2 {
        let (weighted, precision) = group.iter().fold((0.0, 0.0), |(p, q), b| {
            let deviation = b.standard_deviations[orientation].max(MIN_DEVIATION);
            let inverse_variance = 1.0 / (deviation * deviation);
            (p + b.distances[orientation] * inverse_variance, q + inverse_variance)
        });
        distances[orientation] = weighted / precision;
        standard_deviations[orientation] = 1.0 / precision.sqrt();
    }
    DistanceBundle {
        distances,
        standard_deviations,
        weight: group.iter().map(|b| b.weight).sum(),
    }
}

/// Weight-averaged edge over the bundles of a contig pair.
///
/// Bundles lighter than half of the heaviest are discarded first.
pub fn weighted_edge(bundles: &[DistanceBundle]) -> Option<DistanceBundle> {
    let heaviest = bundles.iter().map(|b| b.weight).max()?;
    let kept: Vec<&DistanceBundle> = bundles
        .iter()
        .filter(|b| b.weight * 2 >= heaviest)
        .collect();
    let weight: usize = kept.iter().map(|b| b.weight).sum();
    if weight == 0 {
        return None;
    }

    let mut distances = [0.0; 2];
    let mut standard_deviations = [0.0; 2];
    for orientation in 0..2 {
        for bundle in &kept {
            distances[orientation] += bundle.distances[orientation] * bundle.weight as f64;
            standard_deviations[orientation] +=
                bundle.standard_deviations[orientation] * bundle.weight as f64;
        }
        distances[orientation] /= weight as f64;
        standard_deviations[orientation] /= weight as f64;
    }

    Some(DistanceBundle {
        distances,
        standard_deviations,
        weight,
    })
}
