//! Read mapping, contig distances and scaffold construction

use denovo_forge::core::kmer::reverse_complement;
use denovo_forge::core::paired_reads::pair_reads;
use denovo_forge::scaffold::{
    CloneLibrary, ContigPairDistance, DistanceCalculator, GraphScaffoldBuilder, MatePairMapper,
    OrientationBasedMatePairFilter, ReadContigMapper, ScaffoldBuilder,
};
use denovo_forge::{Contig, ContigType, ReadOverlap, SequenceRead};

fn contig(id: usize, sequence: &str) -> Contig {
    Contig::new(id, sequence.to_string(), 1.0, ContigType::Linear)
}

fn distances(contigs: &[Contig], reads: &[SequenceRead]) -> Vec<ContigPairDistance> {
    let library = CloneLibrary::with_defaults();
    let mappings = ReadContigMapper::new(contigs, 6).unwrap().map_reads(reads);
    let mapping =
        MatePairMapper::new(&library).map_contigs_to_mate_pairs(&pair_reads(reads), &mappings, contigs);
    let mut filtered = OrientationBasedMatePairFilter::default().filter_paired_reads(mapping.pairs);
    DistanceCalculator::new(&library).calculate_distance(&mut filtered, contigs)
}

fn mate_reads(libraries: [&str; 3]) -> Vec<SequenceRead> {
    let [a, b, c] = libraries;
    vec![
        SequenceRead::new(format!("a.X1:{a}"), "GATCTGATAA"),
        SequenceRead::new(format!("b.F:{b}"), "ATCTGATAAG"),
        SequenceRead::new(format!("c.2:{c}"), "TCTGATAAGG"),
        SequenceRead::new(format!("a.Y1:{a}"), "TTTTTGATGG"),
        SequenceRead::new(format!("b.R:{b}"), "TTTTGATGGC"),
        SequenceRead::new(format!("c.1:{c}"), "TTTGATGGCA"),
    ]
}

#[test]
fn test_reads_mapped_on_either_strand() {
    let contigs = vec![contig(0, "GATGCCTCCTATC")];
    let mapper = ReadContigMapper::new(&contigs, 6).unwrap();

    for (read, start) in [("GCCTCCTAT", 3), ("TGCCTCCT", 2)] {
        for (sequence, complemented) in [(read.to_string(), false), (reverse_complement(read), true)] {
            let placements = mapper.map_read(&SequenceRead::new("r", sequence));
            let map = &placements[&0][0];
            assert_eq!(map.contig_start, start);
            assert_eq!(map.length, read.len());
            assert_eq!(map.overlap, ReadOverlap::FullOverlap);
            assert_eq!(map.is_complemented, complemented);
        }
    }
}

#[test]
fn test_distance_between_forward_contigs() {
    let contigs = vec![contig(0, "GATCTGATAAGG"), contig(1, "TTTTTGATGGCA")];
    let distances = distances(&contigs, &mate_reads(["0.5K"; 3]));

    assert_eq!(distances.len(), 1);
    let edge = &distances[0];
    assert_eq!((edge.from, edge.to), (0, 1));
    assert_eq!(edge.estimate.weight, 2);
    assert!((edge.estimate.distances[0] - 478.0).abs() < 1e-9);
    assert!((edge.estimate.distances[1] - 477.0).abs() < 1e-9);
    assert!((edge.estimate.standard_deviations[0] - 14.142_135_6).abs() < 1e-6);
    assert!(edge.reverse_complemented());
    assert!((edge.gap() - 477.0).abs() < 1e-9);
}

#[test]
fn test_distance_with_reverse_complemented_contig() {
    let contigs = vec![contig(0, "GATCTGATAAGG"), contig(1, "TGCCATCAAAAA")];
    let distances = distances(&contigs, &mate_reads(["0.5K"; 3]));

    let edge = &distances[0];
    assert_eq!((edge.from, edge.to), (0, 1));
    assert!((edge.estimate.distances[0] - 477.0).abs() < 1e-9);
    assert!((edge.estimate.distances[1] - 478.0).abs() < 1e-9);
    assert!(!edge.reverse_complemented());
    assert!((edge.gap() - 477.0).abs() < 1e-9);
}

#[test]
fn test_distance_across_libraries() {
    let contigs = vec![contig(0, "GATCTGATAAGG"), contig(1, "TTTTTGATGGCA")];
    let distances = distances(&contigs, &mate_reads(["2K", "0.5K", "0.5K"]));

    let edge = &distances[0];
    assert_eq!(edge.estimate.weight, 2);
    assert!((edge.estimate.distances[0] - 1228.0).abs() < 1e-9);
    assert!((edge.estimate.distances[1] - 1227.0).abs() < 1e-9);
    assert!((edge.estimate.standard_deviations[0] - 60.0).abs() < 1e-9);
}

const FIRST: &str = "ACGTTGCATCGGATCCTAGA";
const SECOND: &str = "TAGAGCCATTGACGGTACAT";

fn scaffold_reads(library: &str) -> Vec<SequenceRead> {
    let reverse = reverse_complement(&SECOND[2..12]);
    vec![
        SequenceRead::new(format!("p.f:{library}"), &FIRST[8..18]),
        SequenceRead::new(format!("p.r:{library}"), reverse.clone()),
        SequenceRead::new(format!("q.f:{library}"), &FIRST[8..18]),
        SequenceRead::new(format!("q.r:{library}"), reverse),
    ]
}

fn scaffold(mean: f64) -> denovo_forge::Scaffold {
    let contigs = vec![contig(0, FIRST), contig(1, SECOND)];
    let reads = scaffold_reads("GAP");
    let mappings = ReadContigMapper::new(&contigs, 7).unwrap().map_reads(&reads);
    let mut library = CloneLibrary::empty();
    library.add_library("gap", mean, 2.0).unwrap();

    let mut output = GraphScaffoldBuilder::new(library, 5, 2)
        .build_scaffolds(&contigs, &reads, &mappings)
        .unwrap();
    assert_eq!(output.scaffolds.len(), 1);
    output.scaffolds.remove(0)
}

#[test]
fn test_positive_gap_inserts_n() {
    let scaffold = scaffold(29.0);
    assert_eq!(scaffold.sequence, format!("{FIRST}NNNNN{SECOND}"));
    assert_eq!(scaffold.placements[1].gap, Some(5.0));
}

#[test]
fn test_negative_gap_overlaps_contigs() {
    let scaffold = scaffold(20.0);
    assert_eq!(scaffold.sequence, format!("{FIRST}{}", &SECOND[4..]));
    assert_eq!(scaffold.sequence.len(), 36);
    assert_eq!(scaffold.placements[1].trimmed, 4);
    assert!(scaffold.placements[1].gap.is_some_and(|gap| gap < 0.0));
}
