//! Scaffold building from mate-pair evidence
//!
//! Mate pairs are placed on contigs, filtered by orientation, turned into
//! distance edges and walked into oriented contig chains. Each chain becomes one
//! scaffold sequence; every contig left over is emitted as a scaffold of its own.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::data_structures::{Contig, Scaffold, ScaffoldPlacement, SequenceRead};
use crate::core::kmer::reverse_complement;
use crate::core::paired_reads::pair_reads;
use crate::scaffold::clone_library::CloneLibrary;
use crate::scaffold::distance::DistanceCalculator;
use crate::scaffold::mate_pair_mapper::{pair_count, MatePairMapper};
use crate::scaffold::orientation_filter::OrientationBasedMatePairFilter;
use crate::scaffold::path_purger::PathPurger;
use crate::scaffold::read_mapper::ReadMappings;
use crate::scaffold::trace_path::{OrientedContig, ScaffoldGraph, ScaffoldPath, TracePath};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScaffoldOutput {
    pub scaffolds: Vec<Scaffold>,
    /// Mate pairs dropped for naming an unknown library
    pub skipped: usize,
}

pub trait ScaffoldBuilder: Send + Sync {
    fn name(&self) -> &'static str;

    fn build_scaffolds(
        &self,
        contigs: &[Contig],
        reads: &[SequenceRead],
        mappings: &ReadMappings,
    ) -> Result<ScaffoldOutput>;
}

pub struct GraphScaffoldBuilder {
    library: CloneLibrary,
    depth: usize,
    redundancy: usize,
}

impl GraphScaffoldBuilder {
    pub fn new(library: CloneLibrary, depth: usize, redundancy: usize) -> Self {
        Self {
            library,
            depth,
            redundancy,
        }
    }

    pub fn library(&self) -> &CloneLibrary {
        &self.library
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn redundancy(&self) -> usize {
        self.redundancy
    }
}

impl ScaffoldBuilder for GraphScaffoldBuilder {
    fn name(&self) -> &'static str {
        "GraphScaffoldBuilder"
    }

    fn build_scaffolds(
        &self,
        contigs: &[Contig],
        reads: &[SequenceRead],
        mappings: &ReadMappings,
    ) -> Result<ScaffoldOutput> {
        let mate_pairs = pair_reads(reads);
        let mapping =
            MatePairMapper::new(&self.library).map_contigs_to_mate_pairs(&mate_pairs, mappings, contigs);
        let mut filtered = OrientationBasedMatePairFilter::new(self.redundancy)
            .filter_paired_reads(mapping.pairs);
        info!(
            "{} mate pairs, {} placed pairs kept after orientation filter",
            mate_pairs.len(),
            pair_count(&filtered)
        );

        let distances = DistanceCalculator::new(&self.library).calculate_distance(&mut filtered, contigs);
        let graph = ScaffoldGraph::new(contigs.len(), &distances);
        let paths = TracePath::new(self.depth).find_paths(&graph);
        let paths = PathPurger::new().purge_paths(paths);

        let scaffolds = assemble_scaffolds(&paths, contigs);
        info!(
            "Built {} scaffolds ({} multi-contig) from {} scaffold edges",
            scaffolds.len(),
            paths.len(),
            graph.edge_count()
        );

        Ok(ScaffoldOutput {
            scaffolds,
            skipped: mapping.skipped,
        })
    }
}

/// Scaffolds for the given paths followed by singletons for unplaced contigs
pub fn assemble_scaffolds(paths: &[ScaffoldPath], contigs: &[Contig]) -> Vec<Scaffold> {
    let mut placed = vec![false; contigs.len()];
    let mut scaffolds = Vec::with_capacity(contigs.len());

    for path in paths {
        for node in &path.contigs {
            if let Some(flag) = placed.get_mut(node.contig) {
                *flag = true;
            }
        }
        scaffolds.push(scaffold_sequence(scaffolds.len(), path, contigs));
    }

    for index in (0..contigs.len()).filter(|&i| !placed[i]) {
        let single = ScaffoldPath::start(OrientedContig::new(index, true));
        scaffolds.push(scaffold_sequence(scaffolds.len(), &single, contigs));
    }
    scaffolds
}

/// Gap-filled sequence of one path. Positive gaps become runs of `N`, negative gaps
/// trim the head of the following contig.
pub fn scaffold_sequence(id: usize, path: &ScaffoldPath, contigs: &[Contig]) -> Scaffold {
    let mut sequence = String::new();
    let mut placements = Vec::with_capacity(path.len());

    for (index, node) in path.contigs.iter().enumerate() {
        let Some(contig) = contigs.get(node.contig) else {
            continue;
        };
        let oriented = if node.forward {
            contig.sequence.clone()
        } else {
            reverse_complement(&contig.sequence)
        };

        let gap = index.checked_sub(1).and_then(|g| path.gaps.get(g)).copied();
        let mut trimmed = 0;
        match gap {
            Some(distance) if distance > 0.0 => {
                sequence.extend(std::iter::repeat('N').take(distance.round() as usize));
            }
            Some(distance) if distance < 0.0 => {
                trimmed = (distance.abs().round() as usize).min(oriented.len());
            }
            _ => {}
        }

        placements.push(ScaffoldPlacement {
            contig: node.contig,
            is_complemented: !node.forward,
            gap,
            offset: sequence.len(),
            trimmed,
        });
        sequence.push_str(&oriented[trimmed..]);
    }

    Scaffold {
        id,
        sequence,
        placements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::data_structures::ContigType;
    use crate::scaffold::read_mapper::ReadContigMapper;

    const FIRST: &str = "ACGTTGCATCGGATCCTAGA";
    const SECOND: &str = "TAGAGCCATTGACGGTACAT";

    fn contigs() -> Vec<Contig> {
        vec![
            Contig::new(0, FIRST.to_string(), 4.0, ContigType::Linear),
            Contig::new(1, SECOND.to_string(), 4.0, ContigType::Linear),
        ]
    }

    /// Two identical pairs: forward mate on FIRST at 8, reverse mate on SECOND at 2..12
    fn mate_reads(library: &str) -> Vec<SequenceRead> {
        let forward = &FIRST[8..18];
        let reverse = reverse_complement(&SECOND[2..12]);
        ["p", "q"]
            .iter()
            .flat_map(|name| {
                [
                    SequenceRead::new(format!("{name}.x1:{library}"), forward),
                    SequenceRead::new(format!("{name}.y1:{library}"), reverse.clone()),
                ]
            })
            .collect()
    }

    fn build(library: &str, mean: f64) -> ScaffoldOutput {
        let contigs = contigs();
        let reads = mate_reads(library);
        let mappings = ReadContigMapper::new(&contigs, 7).unwrap().map_reads(&reads);
        let mut libraries = CloneLibrary::empty();
        libraries.add_library(library, mean, 2.0).unwrap();
        GraphScaffoldBuilder::new(libraries, 10, 2)
            .build_scaffolds(&contigs, &reads, &mappings)
            .unwrap()
    }

    #[test]
    fn test_positive_gap_filled_with_n() {
        let output = build("S29", 29.0);
        assert_eq!(output.scaffolds.len(), 1);
        let scaffold = &output.scaffolds[0];
        assert_eq!(scaffold.sequence, format!("{FIRST}NNNNN{SECOND}"));
        assert_eq!(scaffold.contig_indices(), vec![0, 1]);
        assert_eq!(scaffold.placements[1].gap, Some(5.0));
        assert_eq!(scaffold.placements[1].offset, 25);
        assert!(!scaffold.placements[1].is_complemented);
    }

    #[test]
    fn test_negative_gap_trims_next_contig() {
        let output = build("S20", 20.0);
        let scaffold = &output.scaffolds[0];
        assert_eq!(scaffold.sequence, format!("{FIRST}{}", &SECOND[4..]));
        assert!(!scaffold.sequence.contains('N'));
        assert_eq!(scaffold.placements[1].trimmed, 4);
        assert_eq!(scaffold.placements[1].offset, 20);
    }

    #[test]
    fn test_unknown_library_leaves_singletons() {
        let contigs = contigs();
        let reads = mate_reads("7K");
        let mappings = ReadContigMapper::new(&contigs, 7).unwrap().map_reads(&reads);
        let output = GraphScaffoldBuilder::new(CloneLibrary::with_defaults(), 10, 2)
            .build_scaffolds(&contigs, &reads, &mappings)
            .unwrap();
        assert_eq!(output.skipped, 2);
        assert_eq!(output.scaffolds.len(), 2);
        assert!(output.scaffolds.iter().all(Scaffold::is_singleton));
    }

    #[test]
    fn test_reverse_complemented_placement() {
        let path = ScaffoldPath {
            contigs: vec![OrientedContig::new(0, true), OrientedContig::new(1, false)],
            gaps: vec![2.0],
        };
        let scaffold = scaffold_sequence(0, &path, &contigs());
        assert_eq!(
            scaffold.sequence,
            format!("{FIRST}NN{}", reverse_complement(SECOND))
        );
        assert!(scaffold.placements[1].is_complemented);
        assert_eq!(scaffold.placements[0].gap, None);
    }

    #[test]
    fn test_overlap_longer_than_contig_trims_whole_contig() {
        let path = ScaffoldPath {
            contigs: vec![OrientedContig::new(0, true), OrientedContig::new(1, true)],
            gaps: vec![-50.0],
        };
        let scaffold = scaffold_sequence(0, &path, &contigs());
        assert_eq!(scaffold.sequence, FIRST);
        assert_eq!(scaffold.placements[1].trimmed, 20);
    }
}
