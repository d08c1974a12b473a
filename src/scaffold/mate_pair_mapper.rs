use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::core::data_structures::Contig;
use crate::core::paired_reads::MatePair;
use crate::scaffold::clone_library::CloneLibrary;
use crate::scaffold::read_mapper::ReadMappings;
use crate::utils::configuration::AssemblyError;

/// A mate pair whose reads are fully contained in contigs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidMatePair {
    pub pair: MatePair,
    pub forward_contig: usize,
    pub reverse_contig: usize,
    /// Start of the forward read in its contig
    pub forward_read_start: usize,
    /// Last base of the reverse read in its contig
    pub reverse_read_start: usize,
    /// The same position counted from the end of the reverse contig
    pub reverse_read_reverse_complement_start: usize,
    pub forward_complemented: bool,
    pub reverse_complemented: bool,
    /// Estimated gap with the reverse contig kept as is (`[0]`) or reverse-complemented (`[1]`)
    pub distances: [f64; 2],
    pub standard_deviations: [f64; 2],
    /// Number of mate pairs merged into this entry
    pub weight: usize,
}

impl ValidMatePair {
    /// The reads sit on opposite strands, which places both contigs in the same orientation.
    pub fn supports_same_orientation(&self) -> bool {
        self.forward_complemented != self.reverse_complemented
    }
}

/// Evidence between contigs: forward contig -> reverse contig -> pairs
pub type ContigMatePairs = BTreeMap<usize, BTreeMap<usize, Vec<ValidMatePair>>>;

/// Total number of pairs held in a `ContigMatePairs`
pub fn pair_count(pairs: &ContigMatePairs) -> usize {
    pairs
        .values()
        .flat_map(|targets| targets.values())
        .map(Vec::len)
        .sum()
}

#[derive(Debug, Clone, Default)]
pub struct MatePairMapping {
    pub pairs: ContigMatePairs,
    /// Pairs dropped because their library is unknown
    pub skipped: usize,
}

pub struct MatePairMapper<'a> {
    library: &'a CloneLibrary,
}

impl<'a> MatePairMapper<'a> {
    pub fn new(library: &'a CloneLibrary) -> Self {
        Self { library }
    }

    /// Combine every full-overlap placement of the forward read with every one of the reverse read.
    pub fn map_contigs_to_mate_pairs(
        &self,
        mate_pairs: &[MatePair],
        mappings: &ReadMappings,
        contigs: &[Contig],
    ) -> MatePairMapping {
        let results: Vec<Option<Vec<ValidMatePair>>> = mate_pairs
            .par_iter()
            .map(|pair| {
                if self.library.get(&pair.library).is_none() {
                    warn!(
                        "Skipping mate pair {}: {}",
                        pair.forward_read_id,
                        AssemblyError::UnknownLibrary {
                            library: pair.library.clone()
                        }
                    );
                    return None;
                }
                Some(self.combine(pair, mappings, contigs))
            })
            .collect();

        let mut mapping = MatePairMapping::default();
        for result in results {
            let Some(valid) = result else {
                mapping.skipped += 1;
                continue;
            };
            for pair in valid {
                mapping
                    .pairs
                    .entry(pair.forward_contig)
                    .or_default()
                    .entry(pair.reverse_contig)
                    .or_default()
                    .push(pair);
            }
        }

        debug!(
            "{} mate pair placements across {} forward contigs",
            pair_count(&mapping.pairs),
            mapping.pairs.len()
        );
        mapping
    }

    fn combine(
        &self,
        pair: &MatePair,
        mappings: &ReadMappings,
        contigs: &[Contig],
    ) -> Vec<ValidMatePair> {
        let mut valid = Vec::new();
        for (forward_contig, forward) in mappings.full_overlaps(&pair.forward_read_id) {
            for (reverse_contig, reverse) in mappings.full_overlaps(&pair.reverse_read_id) {
                let Some(reverse_length) = contigs.get(reverse_contig).map(|c| c.length) else {
                    continue;
                };
                valid.push(ValidMatePair {
                    pair: pair.clone(),
                    forward_contig,
                    reverse_contig,
                    forward_read_start: forward.contig_start,
                    reverse_read_start: reverse.contig_start + reverse.length - 1,
                    reverse_read_reverse_complement_start: reverse_length
                        .saturating_sub(reverse.contig_start + 1),
                    forward_complemented: forward.is_complemented,
                    reverse_complemented: reverse.is_complemented,
                    distances: [0.0; 2],
                    standard_deviations: [0.0; 2],
                    weight: 1,
                });
            }
        }
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_structures::{ContigType, SequenceRead};
    use crate::core::paired_reads::pair_reads;
    use crate::scaffold::read_mapper::ReadContigMapper;

    fn contigs() -> Vec<Contig> {
        vec![
            Contig::new(0, "GATCTGATAAGG".to_string(), 1.0, ContigType::Linear),
            Contig::new(1, "TTTTTGATGGCA".to_string(), 1.0, ContigType::Linear),
        ]
    }

    #[test]
    fn test_pairs_keyed_by_forward_contig() {
        let reads = vec![
            SequenceRead::new("a.X1:0.5K", "GATCTGATAA"),
            SequenceRead::new("b.F:0.5K", "ATCTGATAAG"),
            SequenceRead::new("c.2:0.5K", "TCTGATAAGG"),
            SequenceRead::new("a.Y1:0.5K", "TTTTTGATGG"),
            SequenceRead::new("b.R:0.5K", "TTTTGATGGC"),
            SequenceRead::new("c.1:0.5K", "TTTGATGGCA"),
        ];
        let contigs = contigs();
        let mappings = ReadContigMapper::new(&contigs, 6).unwrap().map_reads(&reads);
        let library = CloneLibrary::with_defaults();
        let mapping = MatePairMapper::new(&library).map_contigs_to_mate_pairs(
            &pair_reads(&reads),
            &mappings,
            &contigs,
        );

        assert_eq!(mapping.skipped, 0);
        assert_eq!(mapping.pairs[&0][&1].len(), 2);
        assert_eq!(mapping.pairs[&1][&0].len(), 1);

        let first = &mapping.pairs[&0][&1][0];
        assert_eq!(first.forward_read_start, 0);
        assert_eq!(first.reverse_read_start, 9);
        assert_eq!(first.reverse_read_reverse_complement_start, 11);
        assert!(!first.supports_same_orientation());
    }

    #[test]
    fn test_unknown_library_skipped() {
        let reads = vec![
            SequenceRead::new("a.X1:7K", "GATCTGATAA"),
            SequenceRead::new("a.Y1:7K", "TTTTTGATGG"),
        ];
        let contigs = contigs();
        let mappings = ReadContigMapper::new(&contigs, 6).unwrap().map_reads(&reads);
        let library = CloneLibrary::with_defaults();
        let mapping = MatePairMapper::new(&library).map_contigs_to_mate_pairs(
            &pair_reads(&reads),
            &mappings,
            &contigs,
        );
        assert_eq!(mapping.skipped, 1);
        assert!(mapping.pairs.is_empty());
    }
}
