use ahash::AHashSet;
use tracing::debug;

use crate::scaffold::trace_path::ScaffoldPath;

/// Reduces traced paths to a set of disjoint contig chains.
///
/// Contained paths are dropped, overlapping paths are stitched end to end and
/// the survivors claim their contigs longest first. A path running into a contig
/// that was already claimed is split around it.
#[derive(Debug, Clone, Default)]
pub struct PathPurger;

impl PathPurger {
    pub fn new() -> Self {
        Self
    }

    pub fn purge_paths(&self, paths: Vec<ScaffoldPath>) -> Vec<ScaffoldPath> {
        let traced = paths.len();
        let mut paths = remove_contained(paths);
        while let Some((target, source, stitched)) = find_stitch(&paths) {
            paths[target] = stitched;
            paths.remove(source);
            paths = remove_contained(paths);
        }
        let disjoint = claim_contigs(paths);
        debug!("Path purger reduced {} traced paths to {}", traced, disjoint.len());
        disjoint
    }
}

fn by_length_then_contigs(paths: &mut [ScaffoldPath]) {
    paths.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.contigs.cmp(&b.contigs)));
}

fn contig_set(path: &ScaffoldPath) -> AHashSet<usize> {
    path.contigs.iter().map(|c| c.contig).collect()
}

/// Drop every path whose contigs all appear in an earlier, longer path
fn remove_contained(mut paths: Vec<ScaffoldPath>) -> Vec<ScaffoldPath> {
    by_length_then_contigs(&mut paths);
    let mut kept: Vec<(ScaffoldPath, AHashSet<usize>)> = Vec::with_capacity(paths.len());
    for path in paths {
        let contigs = contig_set(&path);
        if kept.iter().any(|(_, other)| contigs.is_subset(other)) {
            continue;
        }
        kept.push((path, contigs));
    }
    kept.into_iter().map(|(path, _)| path).collect()
}

/// First pair `(target, source)` where the tail of `target` is the head of `source`
/// in either reading direction, with the stitched result
fn find_stitch(paths: &[ScaffoldPath]) -> Option<(usize, usize, ScaffoldPath)> {
    for (target, head) in paths.iter().enumerate() {
        for (source, other) in paths.iter().enumerate() {
            if target == source {
                continue;
            }
            for candidate in [other.clone(), other.reversed()] {
                if let Some(stitched) = stitch(head, &candidate) {
                    return Some((target, source, stitched));
                }
            }
        }
    }
    None
}

fn stitch(head: &ScaffoldPath, tail: &ScaffoldPath) -> Option<ScaffoldPath> {
    let longest = head.len().min(tail.len().saturating_sub(1));
    let overlap = (1..=longest)
        .rev()
        .find(|&o| head.contigs[head.len() - o..] == tail.contigs[..o])?;

    let rest = &tail.contigs[overlap..];
    if rest.iter().any(|c| head.contains_contig(c.contig)) {
        return None;
    }

    let mut stitched = head.clone();
    for (node, gap) in rest.iter().zip(&tail.gaps[overlap - 1..]) {
        stitched.push(*node, *gap);
    }
    Some(stitched)
}

fn claim_contigs(mut paths: Vec<ScaffoldPath>) -> Vec<ScaffoldPath> {
    by_length_then_contigs(&mut paths);
    let mut claimed = AHashSet::new();
    let mut disjoint = Vec::new();

    for path in paths {
        let mut runs = Vec::new();
        let mut run: Option<ScaffoldPath> = None;
        for (index, node) in path.contigs.iter().enumerate() {
            if claimed.contains(&node.contig) {
                runs.extend(run.take());
                continue;
            }
            match run.as_mut() {
                Some(current) => current.push(*node, path.gaps[index - 1]),
                None => run = Some(ScaffoldPath::start(*node)),
            }
        }
        runs.extend(run);

        for scaffold in runs.into_iter().filter(|r| r.len() > 1) {
            claimed.extend(scaffold.contigs.iter().map(|c| c.contig));
            disjoint.push(scaffold);
        }
    }
    disjoint
}
