//! Mate-pair support
//!
//! Reads sequenced from the two ends of one DNA fragment carry ids of the form
//! `<name>.<suffix>:<library>`. The suffix tells which end the read came from:
//! `x1`, `f` or `1` for the forward read and `y1`, `r` or `2` for the reverse read
//! (case-insensitive). The library names an entry of the clone library table.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::data_structures::SequenceRead;

/// Which end of the fragment a read was sequenced from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadOrientation {
    Forward,
    Reverse,
}

/// Parsed mate-pair identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MateId {
    pub name: String,
    pub orientation: ReadOrientation,
    pub library: String,
}

/// Split a read id into pair name, orientation and library.
///
/// Returns `None` when the id does not follow the mate-pair naming convention.
pub fn extract_pair_id(header: &str) -> Option<MateId> {
    let header = header.strip_prefix('>').unwrap_or(header).trim();

    let (stem, library) = header.rsplit_once(':')?;
    let (name, suffix) = stem.rsplit_once('.')?;
    if name.is_empty() || library.is_empty() {
        return None;
    }

    let orientation = match suffix.to_ascii_lowercase().as_str() {
        "x1" | "f" | "1" => ReadOrientation::Forward,
        "y1" | "r" | "2" => ReadOrientation::Reverse,
        _ => return None,
    };

    Some(MateId {
        name: name.to_string(),
        orientation,
        library: library.to_string(),
    })
}

/// Two reads from opposite ends of one fragment, referenced by read id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatePair {
    pub forward_read_id: String,
    pub reverse_read_id: String,
    pub library: String,
}

/// Group reads into mate pairs.
///
/// Reads are matched on name and library. Unpaired reads and extra copies of an
/// already-seen end are ignored. The result is ordered by forward read id.
pub fn pair_reads(reads: &[SequenceRead]) -> Vec<MatePair> {
    let mut halves: AHashMap<(String, String), (Option<String>, Option<String>)> =
        AHashMap::new();

    for read in reads {
        let Some(mate) = extract_pair_id(&read.id) else {
            continue;
        };
        let entry = halves
            .entry((mate.name, mate.library.to_ascii_uppercase()))
            .or_insert((None, None));
        let slot = match mate.orientation {
            ReadOrientation::Forward => &mut entry.0,
            ReadOrientation::Reverse => &mut entry.1,
        };
        if slot.is_none() {
            *slot = Some(read.id.clone());
        } else {
            debug!("Ignoring repeated mate read {}", read.id);
        }
    }

    let mut pairs: Vec<MatePair> = halves
        .into_iter()
        .filter_map(|(_, (forward, reverse))| {
            let forward_read_id = forward?;
            let reverse_read_id = reverse?;
            let library = extract_pair_id(&forward_read_id)?.library;
            Some(MatePair {
                forward_read_id,
                reverse_read_id,
                library,
            })
        })
        .collect();

    pairs.sort_by(|a, b| a.forward_read_id.cmp(&b.forward_read_id));
    pairs
}
