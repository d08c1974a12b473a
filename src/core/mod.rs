pub mod data_structures;
pub mod kmer;
pub mod paired_reads;

// Re-export key types for assembly and scaffolding
pub use data_structures::{
    calculate_n50, AssembledRead, AssemblyStats, Contig, ContigType, ReadMap, ReadOverlap,
    Scaffold, ScaffoldPlacement, SequenceRead, Strand,
};
pub use kmer::{reverse_complement, KmerIter, PackedKmer, MAX_KMER_LENGTH};
pub use paired_reads::{extract_pair_id, pair_reads, MateId, MatePair, ReadOrientation};
