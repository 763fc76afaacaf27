//! Per-file scan pipeline.
//!
//! `scan_file` runs, for one alignment:
//! parse → validate → read `rst` → window scan → mask → (short-sequence
//! masking) → write `<stem>_masked.<ext>` next to the input.
//!
//! Files in a batch are independent: each gets its own `FileOutcome`, and
//! one failure never stops or alters the others.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::formats::branch_codes::BranchCodeTable;
use crate::formats::phylip::{parse_phylip_file, write_phylip_file};
use crate::formats::rst::{parse_rst_file, rst_path_for, RstOptions};
use crate::formats::FormatError;
use crate::mask::{self, MaskError, MaskStyle};
use crate::model::{Alignment, MaskingPlan};
use crate::scan::{self, BranchScan, ScanParams, WindowError};
use crate::validate::{self, ValidationError};

/// Suffix inserted before the extension of masked output files.
pub const MASKED_SUFFIX: &str = "_masked";

/// Extensions picked up when walking an input directory.
const ALIGNMENT_EXTENSIONS: &[&str] = &["phy", "phylip"];

/// Everything that can abort the scan of one file.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Validation failed for '{}': {source}", path.display())]
    Validation {
        path: PathBuf,
        source: ValidationError,
    },

    #[error("Window scan failed for '{}': {source}", path.display())]
    Window { path: PathBuf, source: WindowError },

    #[error("Masking failed for '{}': {source}", path.display())]
    Mask { path: PathBuf, source: MaskError },
}

impl ScanError {
    /// Malformed or unreadable input file.
    pub fn is_format_error(&self) -> bool {
        matches!(self, ScanError::Format(_))
    }

    /// Branch codes missing or inconsistent with the alignment.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, ScanError::Validation { .. })
    }
}

/// Immutable settings shared by every file of a run.
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    pub params: ScanParams,
    pub mask_style: MaskStyle,
    /// Mask whole sequences left with fewer informative codons than this
    pub min_unmasked_codons: Option<usize>,
    pub rst: RstOptions,
}

impl ScanConfig {
    /// Default options around the given scan parameters.
    pub fn new(params: ScanParams) -> Self {
        Self {
            params,
            mask_style: MaskStyle::default(),
            min_unmasked_codons: None,
            rst: RstOptions::default(),
        }
    }
}

/// Summary of one scanned file.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub path: PathBuf,
    pub masked_path: PathBuf,
    pub codon_length: usize,
    /// Distinct (species, codon) pairs masked by the window scan
    pub masked_column_count: usize,
    pub branches: Vec<BranchScan>,
    /// Species masked entirely by the minimum-length rule
    pub fully_masked_species: Vec<String>,
}

/// Outcome of one file of a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<ScanResult, ScanError>,
}

/// `dir/44.phy` → `dir/44_masked.phy`.
pub fn masked_path_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, MASKED_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, MASKED_SUFFIX),
    };
    path.with_file_name(name)
}

/// Scans one alignment and writes its masked copy.
pub fn scan_file(
    path: &Path,
    config: &ScanConfig,
    branch_codes: Option<&BranchCodeTable>,
) -> Result<ScanResult, ScanError> {
    let alignment = parse_phylip_file(path)?;
    debug!(
        path = %path.display(),
        species = alignment.sequence_count(),
        codons = alignment.codon_length(),
        "parsed alignment"
    );

    let branch_codes =
        validate::check(branch_codes, &alignment).map_err(|source| ScanError::Validation {
            path: path.to_path_buf(),
            source,
        })?;

    let events = parse_rst_file(rst_path_for(path), &config.rst)?;
    for (branch, _) in branch_codes.iter() {
        if events.positions(branch).is_none() {
            debug!(branch = %branch, "branch code has no rst entry");
        }
    }

    let outcome = scan::scan(alignment.codon_length(), &events, branch_codes, &config.params)
        .map_err(|source| ScanError::Window {
            path: path.to_path_buf(),
            source,
        })?;

    let mask_err = |source| ScanError::Mask {
        path: path.to_path_buf(),
        source,
    };
    let mut masked = mask::apply(&alignment, &outcome.plan, config.mask_style).map_err(mask_err)?;

    let mut fully_masked_species = Vec::new();
    if let Some(min_codons) = config.min_unmasked_codons {
        let (filtered, short) =
            mask::mask_short_sequences(&masked, min_codons, config.mask_style).map_err(mask_err)?;
        if !short.is_empty() {
            warn!(path = %path.display(), species = ?short, min_codons, "sequences masked entirely");
        }
        masked = filtered;
        fully_masked_species = short;
    }

    let masked_path = masked_path_for(path);
    write_phylip_file(&masked_path, &masked)?;

    let result = ScanResult {
        path: path.to_path_buf(),
        masked_path,
        codon_length: alignment.codon_length(),
        masked_column_count: outcome.plan.len(),
        branches: outcome.branches,
        fully_masked_species,
    };
    info!(
        path = %result.path.display(),
        masked_columns = result.masked_column_count,
        output = %result.masked_path.display(),
        "scan complete"
    );
    Ok(result)
}

/// Scans each file independently.
pub fn scan_files<P: AsRef<Path>>(
    paths: &[P],
    config: &ScanConfig,
    branch_codes: Option<&BranchCodeTable>,
) -> Vec<FileOutcome> {
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let result = scan_file(path, config, branch_codes);
            if let Err(e) = &result {
                warn!(path = %path.display(), error = %e, "scan failed");
            }
            FileOutcome {
                path: path.to_path_buf(),
                result,
            }
        })
        .collect()
}

/// Masks codons given as 0-based codon index → species, with `NNN`.
pub fn mask_codons(
    alignment: &Alignment,
    codons_to_mask: &BTreeMap<usize, Vec<String>>,
) -> Result<Alignment, MaskError> {
    let mut plan = MaskingPlan::new();
    for (&codon, species) in codons_to_mask {
        for name in species {
            plan.insert(name, codon);
        }
    }
    mask::apply(alignment, &plan, MaskStyle::Unknown)
}

/// Lists the alignments to scan under `root`.
///
/// A file is returned as-is. A directory is walked recursively for
/// `.phy`/`.phylip` files, skipping earlier `_masked` outputs. Symlinked
/// directories are not entered.
pub fn discover_alignments(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if path.is_file() && is_alignment_input(&path) {
                found.push(path);
            } else if path.is_dir() {
                debug!(path = %path.display(), "not following directory symlink");
            }
        }
    }
    found.sort();
    Ok(found)
}

fn is_alignment_input(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ALIGNMENT_EXTENSIONS.contains(&e.to_lowercase().as_str()));
    let is_output = path
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(MASKED_SUFFIX));
    has_extension && !is_output
}
