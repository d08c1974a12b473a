//! De novo assembly pipeline
//! =========================
//!
//! `DeNovoAssembler` runs the whole pipeline on a dedicated rayon pool:
//!
//! 1. drop reads with ambiguous bases
//! 2. pick k (configured or estimated from read lengths) and build the graph
//! 3. derive unset thresholds from the k-mer coverage distribution
//! 4. undangle, purge redundant paths, undangle again, purge low-coverage contigs
//! 5. build contigs and map the reads back onto them
//! 6. optionally build scaffolds from mate pairs
//!
//! Every interchangeable step is a boxed strategy that can be replaced before
//! the run with the `with_*` builder methods.

use anyhow::{anyhow, Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assembly::contig_builder::{ContigBuilder, LowCoverageContigPurger, SimplePathContigBuilder};
use crate::assembly::graph::DeBruijnGraph;
use crate::assembly::graph_construction::GraphBuilder;
use crate::assembly::simplification::{Eroder, GraphErrorPurger, RedundantPathPurger};
use crate::core::data_structures::{
    AssembledRead, AssemblyStats, Contig, ReadOverlap, Scaffold, SequenceRead,
};
use crate::core::kmer::MAX_KMER_LENGTH;
use crate::scaffold::builder::{GraphScaffoldBuilder, ScaffoldBuilder};
use crate::scaffold::clone_library::CloneLibrary;
use crate::scaffold::read_mapper::{ReadContigMapper, ReadMappings};
use crate::utils::configuration::{AssemblerConfiguration, AssemblyError};

/// Everything one assembly run produces
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblyResult {
    pub contigs: Vec<Contig>,
    pub scaffolds: Vec<Scaffold>,
    pub stats: AssemblyStats,
}

impl AssemblyResult {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize assembly result")
    }
}

/// Thresholds resolved for one run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedThresholds {
    pub dangle: usize,
    pub redundant_path: usize,
    pub erosion: Option<u32>,
    pub contig_coverage: Option<f64>,
}

pub struct DeNovoAssembler {
    config: AssemblerConfiguration,
    dangling_purger: Box<dyn GraphErrorPurger>,
    redundant_purger: Box<dyn GraphErrorPurger>,
    contig_builder: Box<dyn ContigBuilder>,
    low_coverage_purger: Box<dyn LowCoverageContigPurger>,
    scaffold_builder: Option<Box<dyn ScaffoldBuilder>>,
}

impl DeNovoAssembler {
    /// Assembler with the default strategies. Scaffolding is set up when the
    /// configuration enables it.
    pub fn new(config: AssemblerConfiguration) -> Result<Self> {
        config.validate()?;

        let scaffold_builder: Option<Box<dyn ScaffoldBuilder>> = if config.scaffold.enabled {
            let library = CloneLibrary::from_config(&config.scaffold.libraries)?;
            Some(Box::new(GraphScaffoldBuilder::new(
                library,
                config.scaffold.depth,
                config.scaffold.redundancy,
            )))
        } else {
            None
        };

        Ok(Self {
            config,
            dangling_purger: Box::new(Eroder::new(1)),
            redundant_purger: Box::new(RedundantPathPurger::new(3)),
            contig_builder: Box::new(SimplePathContigBuilder::new()),
            low_coverage_purger: Box::new(SimplePathContigBuilder::new()),
            scaffold_builder,
        })
    }

    pub fn with_dangling_purger(mut self, purger: Box<dyn GraphErrorPurger>) -> Self {
        self.dangling_purger = purger;
        self
    }

    pub fn with_redundant_path_purger(mut self, purger: Box<dyn GraphErrorPurger>) -> Self {
        self.redundant_purger = purger;
        self
    }

    pub fn with_contig_builder(mut self, builder: Box<dyn ContigBuilder>) -> Self {
        self.contig_builder = builder;
        self
    }

    pub fn with_low_coverage_purger(mut self, purger: Box<dyn LowCoverageContigPurger>) -> Self {
        self.low_coverage_purger = purger;
        self
    }

    pub fn with_scaffold_builder(mut self, builder: Box<dyn ScaffoldBuilder>) -> Self {
        self.scaffold_builder = Some(builder);
        self
    }

    pub fn without_scaffolding(mut self) -> Self {
        self.scaffold_builder = None;
        self
    }

    pub fn config(&self) -> &AssemblerConfiguration {
        &self.config
    }

    /// Run the full pipeline on a pool sized by `performance.num_threads`.
    pub fn assemble(&mut self, reads: &[SequenceRead]) -> Result<AssemblyResult> {
        let threads = self.config.performance.resolved_threads();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("asm-worker-{i}"))
            .build()
            .context("Failed to build assembly thread pool")?;
        info!("Assembling {} reads on {} worker threads", reads.len(), threads);
        pool.install(|| self.run(reads))
    }

    fn run(&mut self, reads: &[SequenceRead]) -> Result<AssemblyResult> {
        let mut stats = AssemblyStats {
            input_reads: reads.len(),
            ..Default::default()
        };
        if reads.is_empty() {
            warn!("No reads supplied, nothing to assemble");
            return Ok(AssemblyResult {
                stats,
                ..Default::default()
            });
        }

        stats.empty_reads_removed = reads.par_iter().filter(|read| read.is_empty()).count();
        let clean: Vec<SequenceRead> = reads
            .par_iter()
            .filter(|read| !read.is_empty() && read.is_unambiguous())
            .cloned()
            .collect();
        stats.ambiguous_reads_removed = reads.len() - stats.empty_reads_removed - clean.len();
        if stats.empty_reads_removed > 0 {
            warn!("Dropped {} empty reads", stats.empty_reads_removed);
        }
        if stats.ambiguous_reads_removed > 0 {
            info!(
                "Dropped {} reads containing ambiguous bases",
                stats.ambiguous_reads_removed
            );
        }
        if clean.is_empty() {
            warn!("No usable reads remain, nothing to assemble");
            stats.skipped_items = stats.empty_reads_removed;
            return Ok(AssemblyResult {
                stats,
                ..Default::default()
            });
        }

        let k = match self.config.assembly.kmer_length {
            Some(k) => k,
            None => estimate_kmer_length(&clean).ok_or_else(|| {
                anyhow!(AssemblyError::InvalidKmerLength {
                    k: 0,
                    reason: "no unambiguous reads to estimate from".to_string(),
                })
            })?,
        };
        if clean.iter().all(|read| read.len() < k) {
            return Err(anyhow!(AssemblyError::InvalidKmerLength {
                k,
                reason: "exceeds the length of every read".to_string(),
            }));
        }
        stats.kmer_length = k;

        let (mut graph, summary) = GraphBuilder::new(k)?
            .with_strategy(self.config.assembly.build_strategy)
            .build(&clean)
            .context("Graph construction failed")?;
        stats.kmer_windows = summary.kmer_windows;
        stats.graph_nodes = summary.nodes;
        stats.graph_edges = summary.edges;

        let thresholds = self.resolve_thresholds(k, &graph);
        info!(
            "k = {}, dangle threshold {}, redundant path threshold {}, erosion {:?}, contig coverage {:?}",
            k,
            thresholds.dangle,
            thresholds.redundant_path,
            thresholds.erosion,
            thresholds.contig_coverage
        );

        self.simplify(&mut graph, &thresholds, &mut stats);

        let mut contigs = self.contig_builder.build_contigs(&graph);
        drop(graph);

        let mapper = ReadContigMapper::new(&contigs, k)?;
        let mappings = mapper.map_reads(&clean);
        if self.config.assembly.record_read_placements {
            attach_read_placements(&mut contigs, &mappings);
        }
        stats.skipped_items = stats.empty_reads_removed + mappings.duplicates.len();

        let mut scaffolds = Vec::new();
        if let Some(builder) = &self.scaffold_builder {
            let output = builder
                .build_scaffolds(&contigs, &clean, &mappings)
                .with_context(|| format!("{} failed", builder.name()))?;
            stats.skipped_items += output.skipped;
            scaffolds = output.scaffolds;
        }

        stats.record_contigs(&contigs);
        stats.num_scaffolds = scaffolds.len();
        info!(
            "Assembly finished: {} contigs (N50 {}), {} scaffolds, {} items skipped",
            stats.num_contigs, stats.n50, stats.num_scaffolds, stats.skipped_items
        );

        Ok(AssemblyResult {
            contigs,
            scaffolds,
            stats,
        })
    }

    fn resolve_thresholds(&self, k: usize, graph: &DeBruijnGraph) -> ResolvedThresholds {
        let assembly = &self.config.assembly;
        let needs_estimate = (assembly.erosion_enabled && assembly.erosion_threshold.is_none())
            || (assembly.low_coverage_contig_removal && assembly.contig_coverage_threshold.is_none());
        let estimate = if needs_estimate {
            estimate_coverage_threshold(graph)
        } else {
            0.0
        };

        ResolvedThresholds {
            dangle: assembly.dangle_threshold.unwrap_or(k + 1),
            redundant_path: assembly
                .redundant_path_length_threshold
                .unwrap_or(3 * (k + 1)),
            erosion: assembly
                .erosion_enabled
                .then(|| assembly.erosion_threshold.unwrap_or(estimate.round() as u32)),
            contig_coverage: assembly
                .low_coverage_contig_removal
                .then(|| assembly.contig_coverage_threshold.unwrap_or(estimate)),
        }
    }

    fn simplify(
        &mut self,
        graph: &mut DeBruijnGraph,
        thresholds: &ResolvedThresholds,
        stats: &mut AssemblyStats,
    ) {
        let rounds = self.config.assembly.max_simplification_rounds;

        self.dangling_purger.set_length_threshold(thresholds.dangle);
        self.dangling_purger.set_coverage_threshold(thresholds.erosion);
        stats.dangling_nodes_removed = self.dangling_purger.purge(graph, rounds);

        self.redundant_purger
            .set_length_threshold(thresholds.redundant_path);
        stats.redundant_nodes_removed = self.redundant_purger.purge(graph, rounds);

        // erosion runs only on the first pass
        self.dangling_purger.set_coverage_threshold(None);
        stats.dangling_nodes_removed += self.dangling_purger.purge(graph, rounds);

        if let Some(threshold) = thresholds.contig_coverage {
            stats.low_coverage_nodes_removed = self
                .low_coverage_purger
                .remove_low_coverage_contigs(graph, threshold);
        }

        info!(
            "Simplified graph: {} nodes, {} edges ({} dangling, {} redundant, {} low coverage removed)",
            graph.node_count(),
            graph.edge_count(),
            stats.dangling_nodes_removed,
            stats.redundant_nodes_removed,
            stats.low_coverage_nodes_removed
        );
    }
}

/// Odd k from the read length distribution, capped at the packing limit.
///
/// Halfway between half the longest read and the shortest read, or the shortest
/// read length when that is smaller.
pub fn estimate_kmer_length(reads: &[SequenceRead]) -> Option<usize> {
    let lengths = || reads.iter().map(SequenceRead::len).filter(|&len| len > 0);
    let min_length = lengths().min()?;
    let max_length = lengths().max()?;

    let low = max_length as f64 / 2.0;
    let high = min_length as f64;
    let mut k = if low < high {
        ((low + high) / 2.0).ceil() as usize
    } else {
        min_length
    };

    if k % 2 == 0 {
        k -= 1;
    }
    Some(k.clamp(1, MAX_KMER_LENGTH))
}

/// Square root of the median coverage over nodes seen more than twice, or 2.
pub fn estimate_coverage_threshold(graph: &DeBruijnGraph) -> f64 {
    let mut coverages: Vec<u16> = graph
        .node_ids()
        .map(|id| graph.node(id).coverage)
        .filter(|&c| c > 2)
        .collect();
    if coverages.is_empty() {
        return 2.0;
    }
    coverages.par_sort_unstable();

    let middle = coverages.len() / 2;
    let median = if coverages.len() % 2 == 0 {
        (coverages[middle - 1] as f64 + coverages[middle] as f64) / 2.0
    } else {
        coverages[middle] as f64
    };
    median.sqrt()
}

fn attach_read_placements(contigs: &mut [Contig], mappings: &ReadMappings) {
    for (read_id, placements) in &mappings.placements {
        for (&contig, maps) in placements {
            let Some(target) = contigs.get_mut(contig) else {
                continue;
            };
            target.assembled_reads.extend(
                maps.iter()
                    .filter(|m| m.overlap == ReadOverlap::FullOverlap)
                    .map(|m| AssembledRead {
                        read_id: read_id.clone(),
                        contig_position: m.contig_start,
                        read_position: m.read_start,
                        length: m.length,
                        is_complemented: m.is_complemented,
                    }),
            );
        }
    }
    contigs.par_iter_mut().for_each(|contig| {
        contig.assembled_reads.sort_by(|a, b| {
            a.contig_position
                .cmp(&b.contig_position)
                .then_with(|| a.read_id.cmp(&b.read_id))
                .then_with(|| a.read_position.cmp(&b.read_position))
        })
    });
}
