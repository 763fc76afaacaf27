//! codeml `rst` report parser.
//!
//! Only the change summary is read; every other section of the report
//! (marginal reconstructions, per-site probabilities, sequence listings)
//! is skipped.
//!
//! ```text
//! Summary of changes along branches.
//! Check root for directions of change.
//!
//! Branch 1:    5..6  (n=  0.0 s=  0.0)
//!
//! Branch 2:    6..1 (homo)  (n=  2.0 s=  0.0)
//!
//!      5 CGC (R) 1.000 -> CAC (H) 1.000
//!      8 GAC (D) 0.912 -> AAC (N) 0.999
//!
//! List of extant and reconstructed sequences
//! ```
//!
//! Positions are 1-based codon columns of the alignment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};

use crate::genetic_code::GeneticCode;
use crate::model::{BranchId, BranchIdError};

/// File name codeml gives its reconstruction report.
pub const RST_FILE_NAME: &str = "rst";

const SECTION_START: &str = "Summary of changes along branches";
const SECTION_END: &str = "List of extant and reconstructed sequences";

/// Errors that can occur during `rst` parsing.
#[derive(Error, Debug)]
pub enum RstError {
    #[error("No 'Summary of changes along branches' section found")]
    MissingChangeSummary,

    #[error("Change summary lists no branches")]
    NoBranches,

    #[error("Line {line}: {source}")]
    InvalidBranch { line: usize, source: BranchIdError },

    #[error("Line {line}: branch '{branch}' listed twice")]
    DuplicateBranch { line: usize, branch: BranchId },

    #[error("Line {line}: substitution listed before any branch header")]
    OrphanSubstitution { line: usize },

    #[error("Line {line}: malformed substitution '{content}'")]
    MalformedSubstitution { line: usize, content: String },

    #[error("Line {line}: codon position must be >= 1")]
    ZeroPosition { line: usize },
}

/// Result type for `rst` operations.
pub type RstResult<T> = Result<T, RstError>;

/// Which substitutions count as events for the window scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubstitutionFilter {
    /// Only changes that alter the amino acid
    #[default]
    NonSynonymous,
    /// Every reconstructed codon change
    All,
}

/// Options controlling how substitutions are selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct RstOptions {
    pub filter: SubstitutionFilter,
    /// Code used when a line carries no amino acid annotation
    pub genetic_code: GeneticCode,
}

/// One reconstructed codon change on a branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    /// 1-based codon column
    pub position: usize,
    pub from_codon: String,
    pub to_codon: String,
    pub from_aa: Option<char>,
    pub to_aa: Option<char>,
    pub from_prob: Option<f64>,
    pub to_prob: Option<f64>,
}

impl Substitution {
    /// Whether the change keeps the amino acid. Uses the report's
    /// annotation when present, otherwise translates with `code`.
    /// Untranslatable codons count as non-synonymous.
    pub fn is_synonymous(&self, code: &GeneticCode) -> bool {
        match (self.from_aa, self.to_aa) {
            (Some(from), Some(to)) => from == to,
            _ => code
                .is_synonymous(&self.from_codon, &self.to_codon)
                .unwrap_or(false),
        }
    }
}

/// Branch → reconstructed substitutions, plus the selected event positions.
#[derive(Debug, Clone, Default)]
pub struct BranchEventIndex {
    substitutions: BTreeMap<BranchId, Vec<Substitution>>,
    events: BTreeMap<BranchId, Vec<usize>>,
}

impl BranchEventIndex {
    fn build(
        substitutions: BTreeMap<BranchId, Vec<Substitution>>,
        options: &RstOptions,
    ) -> Self {
        let events = substitutions
            .iter()
            .map(|(branch, subs)| {
                let mut positions: Vec<usize> = subs
                    .iter()
                    .filter(|s| match options.filter {
                        SubstitutionFilter::All => true,
                        SubstitutionFilter::NonSynonymous => !s.is_synonymous(&options.genetic_code),
                    })
                    .map(|s| s.position)
                    .collect();
                positions.sort_unstable();
                (branch.clone(), positions)
            })
            .collect();
        Self {
            substitutions,
            events,
        }
    }

    /// Builds an index directly from branch → event positions.
    pub fn from_positions<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (BranchId, Vec<usize>)>,
    {
        let events = entries
            .into_iter()
            .map(|(branch, mut positions)| {
                positions.sort_unstable();
                (branch, positions)
            })
            .collect();
        Self {
            substitutions: BTreeMap::new(),
            events,
        }
    }

    /// Sorted event positions of a branch (empty for a quiet branch).
    pub fn positions(&self, branch: &BranchId) -> Option<&[usize]> {
        self.events.get(branch).map(Vec::as_slice)
    }

    /// Sorted event positions for a branch label given as text.
    pub fn get(&self, branch: &str) -> Option<&[usize]> {
        branch
            .parse::<BranchId>()
            .ok()
            .and_then(|id| self.positions(&id))
    }

    /// All substitutions of a branch, synonymous ones included.
    pub fn substitutions(&self, branch: &BranchId) -> Option<&[Substitution]> {
        self.substitutions.get(branch).map(Vec::as_slice)
    }

    /// Iterates over branches and their event positions.
    pub fn iter(&self) -> impl Iterator<Item = (&BranchId, &[usize])> {
        self.events.iter().map(|(b, p)| (b, p.as_slice()))
    }

    /// Number of branches.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no branch is known.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total number of selected events over all branches.
    pub fn event_count(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }
}

/// The `rst` report that belongs to an alignment: codeml writes it next to
/// its input.
pub fn rst_path_for(alignment_path: &Path) -> PathBuf {
    alignment_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(RST_FILE_NAME)
}

/// Reads and parses an `rst` file.
pub fn parse_rst_file<P: AsRef<Path>>(
    path: P,
    options: &RstOptions,
) -> Result<BranchEventIndex, super::FormatError> {
    let path = path.as_ref();
    let content = super::read_to_string(path)?;
    let index = parse_rst_str(&content, options).map_err(|source| super::FormatError::Rst {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        path = %path.display(),
        branches = index.len(),
        events = index.event_count(),
        "parsed rst change summary"
    );
    Ok(index)
}

/// Parses the change summary of an `rst` report.
pub fn parse_rst_str(content: &str, options: &RstOptions) -> RstResult<BranchEventIndex> {
    let mut lines = content.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));
    lines
        .by_ref()
        .find(|(_, line)| line.starts_with(SECTION_START))
        .ok_or(RstError::MissingChangeSummary)?;

    let mut branches: BTreeMap<BranchId, Vec<Substitution>> = BTreeMap::new();
    let mut current: Option<BranchId> = None;

    for (line_no, line) in lines {
        if line.starts_with(SECTION_END) {
            break;
        }
        if line.is_empty() || line.starts_with("Check root") {
            continue;
        }

        if let Some(rest) = line.strip_prefix("Branch") {
            let branch = parse_branch_header(rest, line_no)?;
            if branches.contains_key(&branch) {
                return Err(RstError::DuplicateBranch {
                    line: line_no,
                    branch,
                });
            }
            trace!(branch = %branch, line = line_no, "rst branch header");
            branches.insert(branch.clone(), Vec::new());
            current = Some(branch);
        } else if line.starts_with(|c: char| c.is_ascii_digit()) {
            let branch = current
                .as_ref()
                .ok_or(RstError::OrphanSubstitution { line: line_no })?;
            let substitution = parse_substitution(line, line_no)?;
            if let Some(subs) = branches.get_mut(branch) {
                subs.push(substitution);
            }
        } else if !branches.is_empty() {
            // Next report heading
            break;
        }
    }

    if branches.is_empty() {
        return Err(RstError::NoBranches);
    }

    Ok(BranchEventIndex::build(branches, options))
}

/// Parses `" 2:    6..1 (homo)  (n=  2.0 s=  0.0)"` (after the `Branch` word).
fn parse_branch_header(rest: &str, line_no: usize) -> RstResult<BranchId> {
    let label = rest
        .split_whitespace()
        .nth(1)
        .unwrap_or_default();
    label.parse().map_err(|source| RstError::InvalidBranch {
        line: line_no,
        source,
    })
}

/// Parses `"5 CGC (R) 1.000 -> CAC (H) 1.000"`; amino acids and
/// probabilities are optional.
fn parse_substitution(line: &str, line_no: usize) -> RstResult<Substitution> {
    let malformed = || RstError::MalformedSubstitution {
        line: line_no,
        content: line.to_string(),
    };

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let arrow = tokens.iter().position(|&t| t == "->").ok_or_else(malformed)?;
    let (left, right) = (&tokens[..arrow], &tokens[arrow + 1..]);
    if left.len() < 2 || right.is_empty() {
        return Err(malformed());
    }

    let position: usize = left[0].parse().map_err(|_| malformed())?;
    if position == 0 {
        return Err(RstError::ZeroPosition { line: line_no });
    }

    let (from_aa, from_prob) = parse_state_tail(&left[2..]);
    let (to_aa, to_prob) = parse_state_tail(&right[1..]);

    Ok(Substitution {
        position,
        from_codon: left[1].to_string(),
        to_codon: right[0].to_string(),
        from_aa,
        to_aa,
        from_prob,
        to_prob,
    })
}

/// Reads the optional `(A) 0.999` that follows a codon.
fn parse_state_tail(tokens: &[&str]) -> (Option<char>, Option<f64>) {
    let mut aa = None;
    let mut prob = None;
    for token in tokens {
        if let Some(inner) = token.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
            aa = inner.chars().next();
        } else if let Ok(p) = token.parse::<f64>() {
            prob = Some(p);
        }
    }
    (aa, prob)
}
