//! Input and output file formats.
//!
//! - PHYLIP codon alignments (read and write)
//! - Branch-code tables (branch label → species)
//! - codeml `rst` reports (branch → substitution positions)
//!
//! Every parser reports its own error type; `FormatError` ties them to the
//! file they came from.

pub mod branch_codes;
pub mod phylip;
pub mod rst;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A malformed or unreadable input file.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Failed to access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Empty file: '{}'", .0.display())]
    EmptyFile(PathBuf),

    #[error("PHYLIP error in '{}': {source}", path.display())]
    Phylip {
        path: PathBuf,
        source: phylip::PhylipError,
    },

    #[error("Branch code error in '{}': {source}", path.display())]
    BranchCodes {
        path: PathBuf,
        source: branch_codes::BranchCodeError,
    },

    #[error("rst error in '{}': {source}", path.display())]
    Rst {
        path: PathBuf,
        source: rst::RstError,
    },
}

impl FormatError {
    /// Path of the offending file.
    pub fn path(&self) -> &Path {
        match self {
            FormatError::Io { path, .. }
            | FormatError::Phylip { path, .. }
            | FormatError::BranchCodes { path, .. }
            | FormatError::Rst { path, .. } => path,
            FormatError::EmptyFile(path) => path,
        }
    }
}

/// Reads a whole text file into memory.
pub(crate) fn read_to_string(path: &Path) -> Result<String, FormatError> {
    let io_err = |source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let file_size = file.metadata().map_err(io_err)?.len() as usize;
    if file_size == 0 {
        return Err(FormatError::EmptyFile(path.to_path_buf()));
    }

    let mut reader = BufReader::with_capacity(1024 * 1024, file);
    let mut content = String::with_capacity(file_size);
    reader.read_to_string(&mut content).map_err(io_err)?;
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_missing_file() {
        let err = read_to_string(Path::new("does/not/exist.phy")).unwrap_err();
        assert!(matches!(err, FormatError::Io { .. }));
        assert_eq!(err.path(), Path::new("does/not/exist.phy"));
    }

    #[test]
    fn test_read_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            read_to_string(file.path()),
            Err(FormatError::EmptyFile(_))
        ));
    }

    #[test]
    fn test_error_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.phy");
        std::fs::write(&path, "not a header\n").unwrap();

        let err = phylip::parse_phylip_file(&path).unwrap_err();
        assert!(matches!(err, FormatError::Phylip { .. }));
        assert!(err.to_string().contains("bad.phy"));
    }
}
