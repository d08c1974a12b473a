//! End-to-end assembly scenarios and graph invariants

use denovo_forge::assembly::{
    DeBruijnGraph, DeNovoAssembler, Eroder, GraphBuilder, GraphErrorPurger, RedundantPathPurger,
};
use denovo_forge::core::kmer::reverse_complement;
use denovo_forge::utils::{AssemblerConfiguration, BuildStrategy, LibraryConfig};
use denovo_forge::SequenceRead;

const SCENARIO_A: [&str; 5] = ["ATGCC", "TCCTA", "CCTATC", "TGCCTCC", "CCTCCT"];

const SCENARIO_B: [&str; 10] = [
    "ATCGCTAGCATCG",
    "CTAGCATCGAAC",
    "CATCGAACGATCATT",
    "GCTAGCATCGAAC",
    "CGCTAGCATCGAA",
    "ATCGAACGATGA",
    "CTAGCATCGAACGATC",
    "ATCGCTAGCATCGAA",
    "GCTAGCATCGAACGAT",
    "AGCATCGAACGATCAT",
];

const SCENARIO_C: [&str; 13] = [
    "ATGCCTCCTAT",
    "CCTCCTATCTT",
    "TCCTATCTT",
    "TGCCTCCTATC",
    "GCCTCCTATCTT",
    "CTTAGCGATG",
    "CTATCTTAGCGAT",
    "CTATCTTAGC",
    "GCCTCGTATCT",
    "AGCGATGCGGTGT",
    "TATCTTAGCGATGC",
    "ATCTTAGCGATGC",
    "TTAGCGATGCGG",
];

fn same_strandless(a: &str, b: &str) -> bool {
    a == b || a == reverse_complement(b)
}

fn configuration(k: Option<usize>, threads: usize) -> AssemblerConfiguration {
    let mut config = AssemblerConfiguration::default();
    config.assembly.kmer_length = k;
    config.performance.num_threads = Some(threads);
    config
}

fn build(sequences: &[&str], k: usize) -> DeBruijnGraph {
    GraphBuilder::new(k)
        .unwrap()
        .build(&SequenceRead::from_sequences(sequences))
        .unwrap()
        .0
}

#[test]
fn test_scenario_a_single_contig() {
    let reads = SequenceRead::from_sequences(&SCENARIO_A);
    let result = DeNovoAssembler::new(configuration(Some(5), 2))
        .unwrap()
        .assemble(&reads)
        .unwrap();

    assert_eq!(result.contigs.len(), 1);
    assert!(same_strandless(&result.contigs[0].sequence, "ATGCCTCCTATC"));
}

#[test]
fn test_scenario_b_dangling_link_removed() {
    let reads = SequenceRead::from_sequences(&SCENARIO_B);
    let mut config = configuration(Some(11), 2);
    config.assembly.dangle_threshold = Some(3);
    let result = DeNovoAssembler::new(config).unwrap().assemble(&reads).unwrap();

    assert_eq!(result.stats.graph_nodes, 15);
    assert_eq!(result.stats.dangling_nodes_removed, 2);
    assert_eq!(result.contigs.len(), 1);
    assert!(same_strandless(
        &result.contigs[0].sequence,
        "ATCGCTAGCATCGAACGATCATT"
    ));
}

#[test]
fn test_scenario_c_bubble_removed() {
    let mut graph = build(&SCENARIO_C, 5);
    assert_eq!(graph.node_count(), 28);
    assert_eq!(graph.edge_count(), 58);

    let removed = RedundantPathPurger::new(10).purge(&mut graph, 64);
    assert_eq!(removed, 5);
    assert_eq!(graph.node_count(), 23);
    assert_eq!(graph.edge_count(), 46);
    assert!(graph.is_symmetric());
}

#[test]
fn test_scenario_c_with_estimated_k() {
    let reads = SequenceRead::from_sequences(&SCENARIO_C);
    let result = DeNovoAssembler::new(configuration(None, 2))
        .unwrap()
        .assemble(&reads)
        .unwrap();

    assert_eq!(result.stats.kmer_length, 7);
    assert_eq!(result.contigs.len(), 1);
    assert!(same_strandless(
        &result.contigs[0].sequence,
        "ATGCCTCCTATCTTAGCGATGCGGTGT"
    ));
}

#[test]
fn test_graph_stays_symmetric_through_simplification() {
    let mut graph = build(&SCENARIO_B, 11);
    assert!(graph.is_symmetric());

    Eroder::new(3).purge(&mut graph, 64);
    assert!(graph.is_symmetric());

    let mut graph = build(&SCENARIO_C, 5);
    Eroder::new(6).with_erosion(2).purge(&mut graph, 64);
    assert!(graph.is_symmetric());
    RedundantPathPurger::new(18).purge(&mut graph, 64);
    assert_eq!(graph.symmetry_violations(), 0);
}

#[test]
fn test_coverage_conservation() {
    for (sequences, k) in [(&SCENARIO_B[..], 11), (&SCENARIO_C[..], 5)] {
        let reads = SequenceRead::from_sequences(sequences);
        let (graph, summary) = GraphBuilder::new(k).unwrap().build(&reads).unwrap();
        let windows: usize = reads.iter().map(|r| r.len() + 1 - k).sum();
        assert_eq!(summary.kmer_windows, windows);
        assert_eq!(graph.total_coverage(), windows as u64);
    }
}

#[test]
fn test_output_independent_of_workers_and_strategy() {
    let reads = SequenceRead::from_sequences(&SCENARIO_C);
    let mut baseline: Option<Vec<String>> = None;

    for threads in [1, 4] {
        for strategy in [BuildStrategy::ThreadLocalMerge, BuildStrategy::SharedIndex] {
            let mut config = configuration(Some(5), threads);
            config.assembly.build_strategy = strategy;
            let result = DeNovoAssembler::new(config).unwrap().assemble(&reads).unwrap();

            let mut contigs: Vec<String> = result
                .contigs
                .iter()
                .map(|c| c.canonical_sequence())
                .collect();
            contigs.sort();
            match &baseline {
                Some(expected) => assert_eq!(&contigs, expected, "{threads} threads, {strategy:?}"),
                None => baseline = Some(contigs),
            }
        }
    }
}

const LEFT_GENOME: &str = "TCGTTTGTGGAGGTGGTGTTATCCGGAGGATCGCCCTGAAACAGCGTGCGAGTGTTGCGGACCACGACGGCAGGCTACCTGTGGAGCAACGCCACGTAACTAGGAGTCCGACAGCAGCGA";
const RIGHT_GENOME: &str = "ACGACTAGCCAAGCGGCCAATACCCGGAAAGTTGGACTATGGCTGCTATTGACTTTGCAAACGACCCTGGTATGGCCTCATAAGTAGTCTTACGGACGGGAAAGAACCAGAGGGTTGTCT";

/// Tiled reads over two separate genomes plus mate pairs spanning a 50 base gap
fn mate_pair_reads() -> Vec<SequenceRead> {
    let mut reads = Vec::new();
    for genome in [LEFT_GENOME, RIGHT_GENOME] {
        for (i, start) in (0..=90).step_by(3).enumerate() {
            let read = &genome[start..start + 30];
            let sequence = if i % 2 == 0 {
                read.to_string()
            } else {
                reverse_complement(read)
            };
            reads.push(SequenceRead::new(format!("t{}", reads.len()), sequence));
        }
    }
    for pair in 0..3 {
        reads.push(SequenceRead::new(format!("m{pair}.f:ins"), &LEFT_GENOME[80..110]));
        reads.push(SequenceRead::new(
            format!("m{pair}.r:ins"),
            reverse_complement(&RIGHT_GENOME[10..40]),
        ));
    }
    reads
}

#[test]
fn test_scaffolds_independent_of_workers_and_strategy() {
    let reads = mate_pair_reads();
    let mut baseline = None;

    for threads in [1, 4] {
        for strategy in [BuildStrategy::ThreadLocalMerge, BuildStrategy::SharedIndex] {
            let mut config = configuration(None, threads);
            config.assembly.build_strategy = strategy;
            config.scaffold.enabled = true;
            config.scaffold.libraries.push(LibraryConfig {
                name: "ins".to_string(),
                mean_length: 130.0,
                standard_deviation: 10.0,
            });
            let result = DeNovoAssembler::new(config).unwrap().assemble(&reads).unwrap();

            assert_eq!(result.stats.kmer_length, 23);
            assert_eq!(result.contigs.len(), 2);
            assert_eq!(result.scaffolds.len(), 1);
            let scaffold = &result.scaffolds[0];
            assert_eq!(scaffold.placements.len(), 2);
            assert_eq!(scaffold.sequence.len(), 290);
            assert!(scaffold.sequence.contains(&"N".repeat(50)));
            let joined = format!("{LEFT_GENOME}{}{RIGHT_GENOME}", "N".repeat(50));
            assert!(scaffold.sequence == joined || scaffold.sequence == reverse_complement(&joined));

            let observed: Vec<_> = result
                .scaffolds
                .iter()
                .map(|s| (s.sequence.clone(), s.placements.clone()))
                .collect();
            match &baseline {
                Some(expected) => assert_eq!(&observed, expected, "{threads} threads, {strategy:?}"),
                None => baseline = Some(observed),
            }
        }
    }
}
