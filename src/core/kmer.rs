//! Packed k-mer representation
//! ===========================
//!
//! K-mers are stored 2 bits per base in a single `u64`, first base in the most
//! significant position, so integer ordering equals lexicographic ordering for
//! k-mers of the same length. Encoding: A=00, C=01, G=10, T=11.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest k that fits into a single `u64` word.
pub const MAX_KMER_LENGTH: usize = 31;

const BASES: [u8; 4] = [b'A', b'C', b'G', b'T'];

/// Encode a nucleotide into its 2-bit code. Returns `None` for anything outside ACGT.
#[inline]
pub fn encode_base(base: u8) -> Option<u8> {
    match base {
        b'A' | b'a' => Some(0b00),
        b'C' | b'c' => Some(0b01),
        b'G' | b'g' => Some(0b10),
        b'T' | b't' => Some(0b11),
        _ => None,
    }
}

/// Decode a 2-bit code back into an uppercase nucleotide.
#[inline]
pub fn decode_base(code: u8) -> u8 {
    BASES[(code & 0b11) as usize]
}

/// Complement of a 2-bit code (A<->T, C<->G).
#[inline]
pub fn complement_code(code: u8) -> u8 {
    3 - (code & 0b11)
}

/// Reverse complement of a DNA string. Non-ACGT symbols are kept as `N`.
pub fn reverse_complement(sequence: &str) -> String {
    sequence
        .bytes()
        .rev()
        .map(|b| match encode_base(b) {
            Some(code) => decode_base(complement_code(code)) as char,
            None => 'N',
        })
        .collect()
}

/// True when every symbol of the sequence is one of ACGT (case-insensitive).
pub fn is_unambiguous(sequence: &str) -> bool {
    sequence.bytes().all(|b| encode_base(b).is_some())
}

/// A k-mer packed into a `u64`. The length is carried by the owning structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackedKmer(u64);

impl PackedKmer {
    #[inline]
    fn mask(k: usize) -> u64 {
        if k >= 32 {
            u64::MAX
        } else {
            (1u64 << (2 * k)) - 1
        }
    }

    /// Pack a DNA slice of length `k`.
    pub fn from_bytes(sequence: &[u8]) -> Result<Self> {
        let k = sequence.len();
        if k == 0 || k > MAX_KMER_LENGTH {
            return Err(anyhow!(
                "Invalid k-mer length: {} (must be 1-{})",
                k,
                MAX_KMER_LENGTH
            ));
        }

        let mut data = 0u64;
        for &nucleotide in sequence {
            let code = encode_base(nucleotide)
                .ok_or_else(|| anyhow!("Invalid nucleotide: {}", nucleotide as char))?;
            data = (data << 2) | code as u64;
        }
        Ok(Self(data))
    }

    /// Pack a DNA string of length `k`.
    pub fn from_sequence(sequence: &str) -> Result<Self> {
        Self::from_bytes(sequence.as_bytes())
    }

    #[inline]
    pub fn from_raw(data: u64) -> Self {
        Self(data)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }

    /// Reverse complement of a k-mer of length `k`.
    pub fn reverse_complement(self, k: usize) -> Self {
        let mut source = self.0;
        let mut rc = 0u64;
        for _ in 0..k {
            rc = (rc << 2) | (3 - (source & 0b11));
            source >>= 2;
        }
        Self(rc)
    }

    /// Canonical form plus whether `self` already was canonical.
    #[inline]
    pub fn canonical(self, k: usize) -> (Self, bool) {
        let rc = self.reverse_complement(k);
        if self <= rc {
            (self, true)
        } else {
            (rc, false)
        }
    }

    /// Palindromic k-mers equal their own reverse complement (only possible for even k).
    #[inline]
    pub fn is_palindrome(self, k: usize) -> bool {
        self == self.reverse_complement(k)
    }

    /// 2-bit code of the base at `position` (0 = first base).
    #[inline]
    pub fn base_at(self, position: usize, k: usize) -> u8 {
        ((self.0 >> (2 * (k - 1 - position))) & 0b11) as u8
    }

    #[inline]
    pub fn first_base(self, k: usize) -> u8 {
        self.base_at(0, k)
    }

    #[inline]
    pub fn last_base(self) -> u8 {
        (self.0 & 0b11) as u8
    }

    /// Drop the first base and append `code` on the right.
    #[inline]
    pub fn extend_right(self, code: u8, k: usize) -> Self {
        Self(((self.0 << 2) | code as u64) & Self::mask(k))
    }

    /// Drop the last base and prepend `code` on the left.
    #[inline]
    pub fn extend_left(self, code: u8, k: usize) -> Self {
        Self((self.0 >> 2) | ((code as u64) << (2 * (k - 1))))
    }

    /// Unpack into an uppercase DNA string.
    pub fn to_sequence(self, k: usize) -> String {
        (0..k)
            .map(|i| decode_base(self.base_at(i, k)) as char)
            .collect()
    }
}

impl fmt::Display for PackedKmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Rolling iterator over every valid k-mer window of a read.
///
/// Yields `(window_start, forward_kmer)`. Windows spanning a non-ACGT symbol are skipped.
pub struct KmerIter<'a> {
    sequence: &'a [u8],
    k: usize,
    position: usize,
    current: u64,
    valid: usize,
}

impl<'a> KmerIter<'a> {
    pub fn new(sequence: &'a str, k: usize) -> Self {
        Self {
            sequence: sequence.as_bytes(),
            k,
            position: 0,
            current: 0,
            valid: 0,
        }
    }
}

impl Iterator for KmerIter<'_> {
    type Item = (usize, PackedKmer);

    fn next(&mut self) -> Option<Self::Item> {
        if self.k == 0 || self.k > MAX_KMER_LENGTH {
            return None;
        }
        let mask = PackedKmer::mask(self.k);
        while self.position < self.sequence.len() {
            let nucleotide = self.sequence[self.position];
            self.position += 1;
            match encode_base(nucleotide) {
                Some(code) => {
                    self.current = ((self.current << 2) | code as u64) & mask;
                    self.valid += 1;
                    if self.valid >= self.k {
                        return Some((self.position - self.k, PackedKmer(self.current)));
                    }
                }
                None => {
                    self.current = 0;
                    self.valid = 0;
                }
            }
        }
        None
    }
}

/// Number of k-mer windows a read of `length` contributes.
#[inline]
pub fn window_count(length: usize, k: usize) -> usize {
    if k == 0 || length < k {
        0
    } else {
        length - k + 1
    }
}
