//! Core data structures shared by the assembly and scaffolding stages.
//! Everything here outlives the De Bruijn graph of a run.

use crate::core::kmer::{is_unambiguous, reverse_complement};
use serde::{Deserialize, Serialize};

/// An input read with a stable display identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRead {
    pub id: String,
    pub sequence: String,
}

impl SequenceRead {
    pub fn new(id: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sequence: sequence.into(),
        }
    }

    /// Build reads with positional ids ("0", "1", ...), handy for unpaired data.
    pub fn from_sequences<S: AsRef<str>>(sequences: &[S]) -> Vec<Self> {
        sequences
            .iter()
            .enumerate()
            .map(|(i, s)| Self::new(i.to_string(), s.as_ref()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// True when the read only contains A, C, G and T.
    pub fn is_unambiguous(&self) -> bool {
        is_unambiguous(&self.sequence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContigType {
    Linear,
    /// Emitted from an isolated cycle; the sequence starts at an arbitrary node.
    Circular,
}

/// Placement of one input read inside a contig
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledRead {
    pub read_id: String,
    /// Offset of the placement in the contig
    pub contig_position: usize,
    /// Offset of the placement in the read
    pub read_position: usize,
    /// Length of the overlap
    pub length: usize,
    /// Whether the read had to be reverse-complemented to fit the contig
    pub is_complemented: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contig {
    pub id: usize,
    pub sequence: String,
    pub length: usize,
    /// Mean k-mer coverage along the path
    pub coverage: f64,
    pub contig_type: ContigType,
    pub assembled_reads: Vec<AssembledRead>,
}

impl Contig {
    pub fn new(id: usize, sequence: String, coverage: f64, contig_type: ContigType) -> Self {
        Self {
            id,
            length: sequence.len(),
            sequence,
            coverage,
            contig_type,
            assembled_reads: Vec::new(),
        }
    }

    /// Orientation-independent key: the smaller of the sequence and its reverse complement.
    pub fn canonical_sequence(&self) -> String {
        let rc = reverse_complement(&self.sequence);
        if rc < self.sequence {
            rc
        } else {
            self.sequence.clone()
        }
    }
}

/// How a read span relates to the contig it was mapped onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadOverlap {
    /// The whole read is contained in the contig
    FullOverlap,
    /// Only part of the read matches (it overhangs a contig end or is interrupted)
    PartialOverlap,
}

/// A maximal run of continuous k-mer matches between a read and a contig
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadMap {
    pub contig_start: usize,
    pub read_start: usize,
    pub length: usize,
    pub overlap: ReadOverlap,
    /// The read matched the reverse complement of the contig
    pub is_complemented: bool,
}

impl ReadMap {
    pub fn strand(&self) -> Strand {
        if self.is_complemented {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }
}

/// One contig inside a scaffold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaffoldPlacement {
    /// Index into the contig collection the scaffold was built from
    pub contig: usize,
    pub is_complemented: bool,
    /// Estimated distance to the previous contig (negative means overlap); `None` for the first
    pub gap: Option<f64>,
    /// Offset of the (possibly trimmed) contig in the scaffold sequence
    pub offset: usize,
    /// Leading bases of the contig dropped to resolve a negative gap
    pub trimmed: usize,
}

/// Ordered, oriented, gap-annotated chain of contigs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaffold {
    pub id: usize,
    pub sequence: String,
    pub placements: Vec<ScaffoldPlacement>,
}

impl Scaffold {
    pub fn is_singleton(&self) -> bool {
        self.placements.len() == 1
    }

    pub fn contig_indices(&self) -> Vec<usize> {
        self.placements.iter().map(|p| p.contig).collect()
    }
}

/// Run-level counters, reported alongside the results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblyStats {
    pub kmer_length: usize,
    pub input_reads: usize,
    pub ambiguous_reads_removed: usize,
    pub empty_reads_removed: usize,
    pub kmer_windows: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
    pub dangling_nodes_removed: usize,
    pub redundant_nodes_removed: usize,
    pub low_coverage_nodes_removed: usize,
    pub num_contigs: usize,
    pub total_contig_length: usize,
    pub n50: usize,
    pub num_scaffolds: usize,
    pub skipped_items: usize,
}

impl AssemblyStats {
    /// Fill the contig summary fields.
    pub fn record_contigs(&mut self, contigs: &[Contig]) {
        self.num_contigs = contigs.len();
        self.total_contig_length = contigs.iter().map(|c| c.length).sum();
        self.n50 = calculate_n50(contigs.iter().map(|c| c.length).collect());
    }
}

/// N50 of a set of lengths
pub fn calculate_n50(mut lengths: Vec<usize>) -> usize {
    if lengths.is_empty() {
        return 0;
    }
    lengths.sort_unstable_by(|a, b| b.cmp(a));
    let total: usize = lengths.iter().sum();
    let mut running = 0;
    for length in lengths {
        running += length;
        if running * 2 >= total {
            return length;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contig_canonical_sequence() {
        let contig = Contig::new(0, "TTGCA".to_string(), 2.0, ContigType::Linear);
        assert_eq!(contig.length, 5);
        assert_eq!(contig.canonical_sequence(), "TGCAA");
    }

    #[test]
    fn test_read_ambiguity() {
        assert!(SequenceRead::new("r1", "ACGT").is_unambiguous());
        assert!(!SequenceRead::new("r2", "ACNT").is_unambiguous());
    }

    #[test]
    fn test_n50() {
        assert_eq!(calculate_n50(vec![]), 0);
        assert_eq!(calculate_n50(vec![10, 20, 30, 40]), 30);
        assert_eq!(calculate_n50(vec![100]), 100);
    }

    #[test]
    fn test_stats_record_contigs() {
        let contigs = vec![
            Contig::new(0, "ACGTACGT".to_string(), 3.0, ContigType::Linear),
            Contig::new(1, "ACG".to_string(), 1.0, ContigType::Linear),
        ];
        let mut stats = AssemblyStats::default();
        stats.record_contigs(&contigs);
        assert_eq!(stats.num_contigs, 2);
        assert_eq!(stats.total_contig_length, 11);
        assert_eq!(stats.n50, 8);
    }
}
