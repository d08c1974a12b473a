//! Read to contig mapping
//!
//! Contig k-mers are indexed under their canonical form. Each read k-mer is
//! looked up and hits are chained into spans while they stay continuous in both
//! the read and the contig. A span covering the whole read is a full overlap.

use ahash::{AHashMap, AHashSet};
use anyhow::{anyhow, Result};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::core::data_structures::{Contig, ReadMap, ReadOverlap, SequenceRead};
use crate::core::kmer::{KmerIter, PackedKmer, MAX_KMER_LENGTH};
use crate::utils::configuration::AssemblyError;

/// Occurrence of an indexed k-mer inside a contig
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct KmerHit {
    contig: usize,
    position: usize,
    /// The contig carries the canonical form at this position
    forward: bool,
}

/// Spans of one read, keyed by contig index
pub type ReadPlacements = BTreeMap<usize, Vec<ReadMap>>;

#[derive(Debug, Clone, Default)]
pub struct ReadMappings {
    pub placements: AHashMap<String, ReadPlacements>,
    pub unmapped: Vec<String>,
    /// Reads skipped because their id was already seen
    pub duplicates: Vec<String>,
}

impl ReadMappings {
    pub fn get(&self, read_id: &str) -> Option<&ReadPlacements> {
        self.placements.get(read_id)
    }

    /// Full-overlap placements of a read as `(contig, map)`
    pub fn full_overlaps<'a>(&'a self, read_id: &str) -> impl Iterator<Item = (usize, &'a ReadMap)> + 'a {
        self.placements
            .get(read_id)
            .into_iter()
            .flat_map(|placements| {
                placements.iter().flat_map(|(&contig, maps)| {
                    maps.iter()
                        .filter(|m| m.overlap == ReadOverlap::FullOverlap)
                        .map(move |m| (contig, m))
                })
            })
    }

    pub fn mapped_count(&self) -> usize {
        self.placements.len()
    }
}

pub struct ReadContigMapper {
    k: usize,
    index: AHashMap<PackedKmer, Vec<KmerHit>>,
}

impl ReadContigMapper {
    pub fn new(contigs: &[Contig], k: usize) -> Result<Self> {
        if k == 0 || k > MAX_KMER_LENGTH {
            return Err(anyhow!(AssemblyError::InvalidKmerLength {
                k,
                reason: format!("must be within 1..={MAX_KMER_LENGTH}"),
            }));
        }

        let mut index = contigs
            .par_iter()
            .enumerate()
            .fold(AHashMap::new, |mut local: AHashMap<PackedKmer, Vec<KmerHit>>, (contig, c)| {
                for (position, kmer) in KmerIter::new(&c.sequence, k) {
                    let (canonical, forward) = kmer.canonical(k);
                    local.entry(canonical).or_default().push(KmerHit {
                        contig,
                        position,
                        forward,
                    });
                }
                local
            })
            .reduce(AHashMap::new, |mut a, b| {
                for (kmer, hits) in b {
                    a.entry(kmer).or_default().extend(hits);
                }
                a
            });

        index
            .par_iter_mut()
            .for_each(|(_, hits)| hits.sort_unstable_by_key(|h| (h.contig, h.position)));

        debug!("Indexed {} distinct contig k-mers", index.len());
        Ok(Self { k, index })
    }

    pub fn kmer_length(&self) -> usize {
        self.k
    }

    /// Spans of one read on every contig it touches
    pub fn map_read(&self, read: &SequenceRead) -> ReadPlacements {
        let k = self.k;
        let mut placements: ReadPlacements = BTreeMap::new();

        for (read_position, kmer) in KmerIter::new(&read.sequence, k) {
            let (canonical, read_forward) = kmer.canonical(k);
            let Some(hits) = self.index.get(&canonical) else {
                continue;
            };
            let same_strand = hits.iter().any(|h| h.forward == read_forward);

            for hit in hits.iter().filter(|h| (h.forward == read_forward) == same_strand) {
                let is_complemented = !same_strand;
                let spans = placements.entry(hit.contig).or_default();
                let extended = spans
                    .iter_mut()
                    .filter(|s| s.is_complemented == is_complemented)
                    .find(|s| continues(s, hit.position, read_position, k));
                match extended {
                    Some(span) => {
                        span.length += 1;
                        span.contig_start = span.contig_start.min(hit.position);
                    }
                    None => spans.push(ReadMap {
                        contig_start: hit.position,
                        read_start: read_position,
                        length: k,
                        overlap: ReadOverlap::PartialOverlap,
                        is_complemented,
                    }),
                }
            }
        }

        for span in placements.values_mut().flatten() {
            if span.length == read.len() {
                span.overlap = ReadOverlap::FullOverlap;
            }
        }
        placements
    }

    /// Map all reads in parallel. Repeated read ids are skipped with a warning.
    pub fn map_reads(&self, reads: &[SequenceRead]) -> ReadMappings {
        let mut seen: AHashSet<&str> = AHashSet::with_capacity(reads.len());
        let mut unique = Vec::with_capacity(reads.len());
        let mut duplicates = Vec::new();
        for read in reads {
            if seen.insert(read.id.as_str()) {
                unique.push(read);
            } else {
                warn!("{}", AssemblyError::DuplicateReadId { id: read.id.clone() });
                duplicates.push(read.id.clone());
            }
        }

        let mapped: Vec<(String, ReadPlacements)> = unique
            .par_iter()
            .map(|read| (read.id.clone(), self.map_read(read)))
            .collect();

        let mut mappings = ReadMappings {
            duplicates,
            ..Default::default()
        };
        for (id, placements) in mapped {
            if placements.is_empty() {
                mappings.unmapped.push(id);
            } else {
                mappings.placements.insert(id, placements);
            }
        }

        info!(
            "Mapped {} reads onto contigs, {} unmapped, {} duplicates skipped",
            mappings.placements.len(),
            mappings.unmapped.len(),
            mappings.duplicates.len()
        );
        mappings
    }
}

/// Whether a hit at (`position`, `read_position`) extends `span` by one base
fn continues(span: &ReadMap, position: usize, read_position: usize, k: usize) -> bool {
    let offset = span.length - k + 1;
    let read_next = span.read_start + offset == read_position;
    if span.is_complemented {
        read_next && span.contig_start == position + 1
    } else {
        read_next && span.contig_start + offset == position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_structures::ContigType;
    use crate::core::kmer::reverse_complement;

    fn contig(sequence: &str) -> Contig {
        Contig::new(0, sequence.to_string(), 1.0, ContigType::Linear)
    }

    fn single_map(mapper: &ReadContigMapper, read: &str) -> ReadMap {
        let placements = mapper.map_read(&SequenceRead::new("r", read));
        assert_eq!(placements.len(), 1);
        let maps = &placements[&0];
        assert_eq!(maps.len(), 1);
        maps[0].clone()
    }

    #[test]
    fn test_forward_and_complemented_read() {
        let mapper = ReadContigMapper::new(&[contig("TCTGATAAGG")], 6).unwrap();

        let forward = single_map(&mapper, "CTGATAAGG");
        assert_eq!(forward.length, 9);
        assert_eq!(forward.contig_start, 1);
        assert_eq!(forward.read_start, 0);
        assert_eq!(forward.overlap, ReadOverlap::FullOverlap);
        assert!(!forward.is_complemented);

        let reverse = single_map(&mapper, "CCTTATCAG");
        assert_eq!(reverse.length, 9);
        assert_eq!(reverse.contig_start, 1);
        assert_eq!(reverse.read_start, 0);
        assert_eq!(reverse.overlap, ReadOverlap::FullOverlap);
        assert!(reverse.is_complemented);
    }

    #[test]
    fn test_reads_inside_contig() {
        let mapper = ReadContigMapper::new(&[contig("GATGCCTCCTATC")], 6).unwrap();
        for (read, length, start) in [
            ("GATGCCTC", 8, 0),
            ("CCTCCTAT", 8, 4),
            ("TCCTATC", 7, 6),
            ("GCCTCCTAT", 9, 3),
            ("TGCCTCCT", 8, 2),
        ] {
            for sequence in [read.to_string(), reverse_complement(read)] {
                let map = single_map(&mapper, &sequence);
                assert_eq!(map.length, length, "{sequence}");
                assert_eq!(map.contig_start, start, "{sequence}");
                assert_eq!(map.overlap, ReadOverlap::FullOverlap);
            }
        }
    }

    #[test]
    fn test_overhanging_read_is_partial() {
        let mapper = ReadContigMapper::new(&[contig("GATGCCTCCTATC")], 6).unwrap();
        let map = single_map(&mapper, "CCTATCGGGG");
        assert_eq!(map.overlap, ReadOverlap::PartialOverlap);
        assert_eq!(map.length, 6);
        assert_eq!(map.contig_start, 7);
    }

    #[test]
    fn test_unmapped_and_duplicate_reads() {
        let mapper = ReadContigMapper::new(&[contig("GATGCCTCCTATC")], 6).unwrap();
        let reads = vec![
            SequenceRead::new("a", "GATGCCTC"),
            SequenceRead::new("b", "AAAAAAAAAA"),
            SequenceRead::new("a", "CCTCCTAT"),
        ];
        let mappings = mapper.map_reads(&reads);
        assert_eq!(mappings.mapped_count(), 1);
        assert_eq!(mappings.unmapped, vec!["b".to_string()]);
        assert_eq!(mappings.duplicates, vec!["a".to_string()]);
        assert_eq!(mappings.full_overlaps("a").count(), 1);
        assert_eq!(mappings.get("a").unwrap()[&0][0].contig_start, 0);
    }

    #[test]
    fn test_invalid_kmer_length() {
        assert!(ReadContigMapper::new(&[], 0).is_err());
        assert!(ReadContigMapper::new(&[], 32).is_err());
    }
}
