//! Branch-code table parser.
//!
//! Maps each codeml branch label to the species that descend from it:
//! ```text
//! # branch   species
//! 5..6       homo,pongo
//! 6..1       homo
//! 5..7       papio, colobus
//! ```
//!
//! The branch label and the species list are separated by whitespace;
//! species are separated by commas. Blank lines and `#` comments are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use thiserror::Error;

use crate::model::{BranchId, BranchIdError};

/// Errors that can occur while parsing a branch-code table.
#[derive(Error, Debug)]
pub enum BranchCodeError {
    #[error("Line {line}: expected '<branch> <species>[,<species>...]', got '{content}'")]
    MalformedLine { line: usize, content: String },

    #[error("Line {line}: {source}")]
    InvalidBranch { line: usize, source: BranchIdError },

    #[error("Line {line}: empty or malformed species name in '{content}'")]
    InvalidSpecies { line: usize, content: String },

    #[error("Line {line}: duplicate branch '{branch}'")]
    DuplicateBranch { line: usize, branch: BranchId },
}

/// Branch label → species listed under it (never empty).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchCodeTable {
    branches: BTreeMap<BranchId, Vec<String>>,
}

impl BranchCodeTable {
    /// Species listed for a branch.
    pub fn species(&self, branch: &BranchId) -> Option<&[String]> {
        self.branches.get(branch).map(Vec::as_slice)
    }

    /// Species listed for a branch label given as text.
    pub fn get(&self, branch: &str) -> Option<&[String]> {
        branch.parse::<BranchId>().ok().and_then(|id| self.species(&id))
    }

    /// Iterates over branches in label order.
    pub fn iter(&self) -> impl Iterator<Item = (&BranchId, &[String])> {
        self.branches.iter().map(|(b, s)| (b, s.as_slice()))
    }

    /// Number of branches.
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Returns true if the table holds no branch.
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

/// Reads and parses a branch-code file.
pub fn parse_branch_codes_file<P: AsRef<Path>>(
    path: P,
) -> Result<BranchCodeTable, super::FormatError> {
    let path = path.as_ref();
    let content = super::read_to_string(path)?;
    parse_branch_codes_str(&content).map_err(|source| super::FormatError::BranchCodes {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses branch-code content from a string.
pub fn parse_branch_codes_str(content: &str) -> Result<BranchCodeTable, BranchCodeError> {
    let mut branches = BTreeMap::new();

    for (i, raw) in content.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let malformed = || BranchCodeError::MalformedLine {
            line: line_no,
            content: line.to_string(),
        };
        let (label, rest) = line.split_once(char::is_whitespace).ok_or_else(malformed)?;
        let rest = rest.trim();
        if rest.is_empty() {
            return Err(malformed());
        }

        let branch: BranchId = label.parse().map_err(|source| BranchCodeError::InvalidBranch {
            line: line_no,
            source,
        })?;

        let mut species: Vec<String> = Vec::new();
        for name in rest.split(',').map(str::trim) {
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(BranchCodeError::InvalidSpecies {
                    line: line_no,
                    content: line.to_string(),
                });
            }
            if !species.iter().any(|s| s == name) {
                species.push(name.to_string());
            }
        }

        if branches.contains_key(&branch) {
            return Err(BranchCodeError::DuplicateBranch {
                line: line_no,
                branch,
            });
        }
        branches.insert(branch, species);
    }

    Ok(BranchCodeTable { branches })
}
