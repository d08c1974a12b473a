//! Parallel De Bruijn graph construction
//! =====================================
//!
//! Reads are split across the rayon pool and every k-mer window is counted
//! under its canonical form. Two counting strategies are available:
//!
//! - `ThreadLocalMerge`: every worker folds into its own `AHashMap`, fragments
//!   are merged pairwise with `reduce`.
//! - `SharedIndex`: all workers increment one sharded `DashMap`.
//!
//! Both produce the same node set and coverages. The arena is then sorted by
//! canonical k-mer and linked in a second parallel pass.

use ahash::{AHashMap, RandomState};
use anyhow::Result;
use dashmap::DashMap;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

use crate::assembly::graph::{DeBruijnGraph, DeBruijnNode};
use crate::core::data_structures::SequenceRead;
use crate::core::kmer::{KmerIter, PackedKmer};
use crate::utils::configuration::{validate_kmer_length, BuildStrategy};

/// Counters collected while building
#[derive(Debug, Default)]
pub struct BuildStats {
    pub reads_processed: AtomicUsize,
    pub reads_too_short: AtomicUsize,
    pub kmer_windows: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub reads_processed: usize,
    pub reads_too_short: usize,
    pub kmer_windows: usize,
    pub nodes: usize,
    pub edges: usize,
}

#[derive(Debug, Clone)]
pub struct GraphBuilder {
    k: usize,
    strategy: BuildStrategy,
}

impl GraphBuilder {
    pub fn new(k: usize) -> Result<Self> {
        validate_kmer_length(k)?;
        Ok(Self {
            k,
            strategy: BuildStrategy::ThreadLocalMerge,
        })
    }

    pub fn with_strategy(mut self, strategy: BuildStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn kmer_length(&self) -> usize {
        self.k
    }

    /// Build the graph on the current rayon pool.
    pub fn build(&self, reads: &[SequenceRead]) -> Result<(DeBruijnGraph, BuildSummary)> {
        let stats = BuildStats::default();

        let counts = match self.strategy {
            BuildStrategy::ThreadLocalMerge => self.count_thread_local(reads, &stats),
            BuildStrategy::SharedIndex => self.count_shared(reads, &stats),
        };
        debug!(
            "Counted {} distinct canonical k-mers with {:?}",
            counts.len(),
            self.strategy
        );

        let mut kmers: Vec<(PackedKmer, u32)> = counts.into_iter().collect();
        kmers.par_sort_unstable_by_key(|(kmer, _)| *kmer);
        let nodes = kmers
            .into_iter()
            .map(|(kmer, count)| DeBruijnNode::new(kmer, count))
            .collect();

        let mut graph = DeBruijnGraph::from_nodes(self.k, nodes);
        graph.link_overlaps();

        let summary = BuildSummary {
            reads_processed: stats.reads_processed.load(Ordering::Relaxed),
            reads_too_short: stats.reads_too_short.load(Ordering::Relaxed),
            kmer_windows: stats.kmer_windows.load(Ordering::Relaxed),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
        };
        info!(
            "Built De Bruijn graph (k={}): {} nodes, {} edges from {} k-mer windows",
            self.k, summary.nodes, summary.edges, summary.kmer_windows
        );
        if summary.reads_too_short > 0 {
            debug!("{} reads shorter than k contributed nothing", summary.reads_too_short);
        }

        Ok((graph, summary))
    }

    /// Canonical k-mers of one read, with window bookkeeping
    fn read_kmers<'a>(
        &self,
        read: &'a SequenceRead,
        stats: &'a BuildStats,
    ) -> impl Iterator<Item = PackedKmer> + 'a {
        let k = self.k;
        stats.reads_processed.fetch_add(1, Ordering::Relaxed);
        if read.len() < k {
            stats.reads_too_short.fetch_add(1, Ordering::Relaxed);
        }
        KmerIter::new(&read.sequence, k).map(move |(_, kmer)| {
            stats.kmer_windows.fetch_add(1, Ordering::Relaxed);
            kmer.canonical(k).0
        })
    }

    fn count_thread_local(
        &self,
        reads: &[SequenceRead],
        stats: &BuildStats,
    ) -> AHashMap<PackedKmer, u32> {
        reads
            .par_iter()
            .fold(AHashMap::new, |mut local: AHashMap<PackedKmer, u32>, read| {
                for kmer in self.read_kmers(read, stats) {
                    *local.entry(kmer).or_insert(0) += 1;
                }
                local
            })
            .reduce(AHashMap::new, |a, b| {
                let (mut big, small) = if a.len() >= b.len() { (a, b) } else { (b, a) };
                for (kmer, count) in small {
                    *big.entry(kmer).or_insert(0) += count;
                }
                big
            })
    }

    fn count_shared(&self, reads: &[SequenceRead], stats: &BuildStats) -> AHashMap<PackedKmer, u32> {
        let index: DashMap<PackedKmer, u32, RandomState> = DashMap::with_hasher(RandomState::new());
        reads.par_iter().for_each(|read| {
            for kmer in self.read_kmers(read, stats) {
                *index.entry(kmer).or_insert(0) += 1;
            }
        });
        index.into_iter().collect()
    }
}
