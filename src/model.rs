//! Data model for codon alignments, branches and masking plans.
//!
//! This module contains the core data structures shared by the parsers,
//! the window scanner and the masker:
//! - `Sequence` and `Alignment` (codon-aligned, species keyed)
//! - `BranchId` (a `a..b` edge label as printed by codeml)
//! - `MaskingPlan` (set of species × codon pairs to mask)

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Number of nucleotides in a codon.
pub const CODON_LEN: usize = 3;

/// Errors raised when sequences do not form a valid codon alignment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("Alignment contains no sequences")]
    Empty,

    #[error("Duplicate species name: '{0}'")]
    DuplicateSpecies(String),

    #[error("Sequence '{name}' has length {found}, expected {expected}")]
    UnequalLengths {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Alignment length {0} is not a multiple of 3 (not codon aligned)")]
    NotCodonAligned(usize),

    #[error("Sequence '{0}' is not valid UTF-8")]
    InvalidEncoding(String),
}

/// Represents a single sequence with its species name and nucleotide data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// The species name
    pub id: String,
    /// The nucleotide data
    pub data: String,
}

impl Sequence {
    /// Creates a new sequence.
    pub fn new(id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
        }
    }

    /// Creates a sequence from raw bytes.
    pub fn from_bytes(id: impl Into<String>, data: Vec<u8>) -> Result<Self, AlignmentError> {
        let id = id.into();
        match String::from_utf8(data) {
            Ok(data) => Ok(Self { id, data }),
            Err(_) => Err(AlignmentError::InvalidEncoding(id)),
        }
    }

    /// Returns the length of the sequence in nucleotides.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of complete codons.
    pub fn codon_count(&self) -> usize {
        self.data.len() / CODON_LEN
    }

    /// Returns the codon at a 0-based codon index.
    pub fn codon(&self, index: usize) -> Option<&str> {
        let start = index.checked_mul(CODON_LEN)?;
        self.data.get(start..start + CODON_LEN)
    }

    /// Iterates over all complete codons.
    pub fn codons(&self) -> impl Iterator<Item = &str> {
        (0..self.codon_count()).filter_map(move |i| self.codon(i))
    }

    /// Counts codons made only of the given mask character (e.g. `NNN`).
    pub fn masked_codon_count(&self, mask_char: char) -> usize {
        self.codons()
            .filter(|codon| codon.chars().all(|c| c.eq_ignore_ascii_case(&mask_char)))
            .count()
    }
}

/// A codon alignment: species in file order, all of equal codon length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    sequences: Vec<Sequence>,
    index: HashMap<String, usize>,
}

impl Alignment {
    /// Builds an alignment, enforcing unique names, equal lengths and
    /// a length that is a multiple of 3.
    pub fn from_sequences(sequences: Vec<Sequence>) -> Result<Self, AlignmentError> {
        let first_len = sequences.first().ok_or(AlignmentError::Empty)?.len();

        let mut index = HashMap::with_capacity(sequences.len());
        for (i, seq) in sequences.iter().enumerate() {
            if index.insert(seq.id.clone(), i).is_some() {
                return Err(AlignmentError::DuplicateSpecies(seq.id.clone()));
            }
            if seq.len() != first_len {
                return Err(AlignmentError::UnequalLengths {
                    name: seq.id.clone(),
                    expected: first_len,
                    found: seq.len(),
                });
            }
        }

        if first_len % CODON_LEN != 0 {
            return Err(AlignmentError::NotCodonAligned(first_len));
        }

        Ok(Self { sequences, index })
    }

    /// Returns the number of sequences.
    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// Returns the alignment length in nucleotides.
    pub fn alignment_length(&self) -> usize {
        self.sequences.first().map_or(0, Sequence::len)
    }

    /// Returns the alignment length in codon columns.
    pub fn codon_length(&self) -> usize {
        self.alignment_length() / CODON_LEN
    }

    /// Gets a sequence by species name.
    pub fn get(&self, species: &str) -> Option<&Sequence> {
        self.index.get(species).map(|&i| &self.sequences[i])
    }

    /// Returns true if the species is part of the alignment.
    pub fn contains(&self, species: &str) -> bool {
        self.index.contains_key(species)
    }

    /// Species names in file order.
    pub fn species(&self) -> impl Iterator<Item = &str> {
        self.sequences.iter().map(|s| s.id.as_str())
    }

    /// Sequences in file order.
    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Returns the maximum species name length in characters (for output padding).
    pub fn max_id_length(&self) -> usize {
        self.sequences
            .iter()
            .map(|s| s.id.chars().count())
            .max()
            .unwrap_or(0)
    }
}

/// Errors raised when parsing a branch identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid branch identifier '{0}': expected '<node>..<node>'")]
pub struct BranchIdError(pub String);

/// A directed tree edge as labelled by codeml, e.g. `5..7`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BranchId(String);

impl BranchId {
    /// Returns the label as written in the input files.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BranchId {
    type Err = BranchIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let is_node = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        match s.split_once("..") {
            Some((a, b)) if is_node(a) && is_node(b) => Ok(Self(s.to_string())),
            _ => Err(BranchIdError(s.to_string())),
        }
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Set of (species, 0-based codon index) pairs to mask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaskingPlan {
    codons: BTreeMap<String, BTreeSet<usize>>,
}

impl MaskingPlan {
    /// Creates an empty plan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pair; returns false if it was already planned.
    pub fn insert(&mut self, species: &str, codon: usize) -> bool {
        match self.codons.get_mut(species) {
            Some(set) => set.insert(codon),
            None => {
                self.codons
                    .insert(species.to_string(), BTreeSet::from([codon]));
                true
            }
        }
    }

    /// Returns true if the pair is planned.
    pub fn contains(&self, species: &str, codon: usize) -> bool {
        self.codons
            .get(species)
            .is_some_and(|set| set.contains(&codon))
    }

    /// Number of distinct (species, codon) pairs.
    pub fn len(&self) -> usize {
        self.codons.values().map(BTreeSet::len).sum()
    }

    /// Returns true if nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.codons.values().all(BTreeSet::is_empty)
    }

    /// Planned codon indices per species.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<usize>)> {
        self.codons.iter().map(|(s, set)| (s.as_str(), set))
    }

    /// Planned codon indices for one species.
    pub fn codons_for(&self, species: &str) -> Option<&BTreeSet<usize>> {
        self.codons.get(species)
    }
}
