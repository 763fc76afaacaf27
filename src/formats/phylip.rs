//! PHYLIP codon alignment reader and writer.
//!
//! ## PHYLIP Format
//!
//! The first line contains the number of sequences and the sequence length
//! in nucleotides:
//! ```text
//!  4 12
//! homo      ATGCCCAAAGGG
//! pongo     ATGCCCAAGGGG
//! papio     ATGCCAAAAGGG
//! colobus   ATGCCTAAAGGG
//! ```
//!
//! Interleaved files are accepted too: the first block carries the names,
//! subsequent blocks continue the sequences in the same order.
//!
//! ## Relaxed Parsing
//!
//! Names are the first whitespace-delimited token of a record, without the
//! strict 10-character rule. The rest of the line (whitespace removed) is
//! sequence data.
//!
//! Written files use the same sequential layout, so that
//! `parse(write(parse(f))) == parse(f)`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::model::{Alignment, AlignmentError, Sequence};

/// Errors that can occur during PHYLIP parsing.
#[derive(Error, Debug)]
pub enum PhylipError {
    #[error("Empty PHYLIP file")]
    EmptyFile,

    #[error("Invalid header: expected 'ntax nchar' (two integers), got '{0}'")]
    InvalidHeader(String),

    #[error("Invalid sequence count in header: '{0}' is not a valid number")]
    InvalidSequenceCount(String),

    #[error("Invalid sequence length in header: '{0}' is not a valid number")]
    InvalidSequenceLength(String),

    #[error("Expected {expected} sequences but found {found}")]
    SequenceCountMismatch { expected: usize, found: usize },

    #[error("Sequence '{name}' has length {found}, expected {expected}")]
    SequenceLengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Sequence '{name}' contains invalid character '{character}' at position {position}")]
    InvalidCharacter {
        name: String,
        character: char,
        position: usize,
    },

    #[error("Line {line}: expected a species name followed by sequence data")]
    MissingSequence { line: usize },

    #[error("Line {line}: more sequence blocks than declared sequences")]
    UnexpectedData { line: usize },

    #[error(transparent)]
    Alignment(#[from] AlignmentError),
}

/// Result type for PHYLIP operations.
pub type PhylipResult<T> = Result<T, PhylipError>;

/// Checks if a character belongs to the nucleotide/gap alphabet.
///
/// IUPAC nucleotide codes (including ambiguity codes and `N`), gaps and
/// missing-data symbols, case-insensitive.
pub fn is_nucleotide_char(c: char) -> bool {
    matches!(
        c.to_ascii_uppercase(),
        'A' | 'C' | 'G' | 'T' | 'U' | 'R' | 'Y' | 'S' | 'W' | 'K' | 'M' | 'B' | 'D' | 'H'
            | 'V' | 'N' | '-' | '?' | '.'
    )
}

/// Reads and parses a PHYLIP file.
pub fn parse_phylip_file<P: AsRef<Path>>(path: P) -> Result<Alignment, super::FormatError> {
    let path = path.as_ref();
    let content = super::read_to_string(path)?;
    parse_phylip_str(&content).map_err(|source| super::FormatError::Phylip {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses PHYLIP content from a string.
pub fn parse_phylip_str(content: &str) -> PhylipResult<Alignment> {
    // Find the header line (first non-empty line)
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()));
    let (_, header) = lines
        .find(|(_, line)| !line.is_empty())
        .ok_or(PhylipError::EmptyFile)?;

    let parts: Vec<&str> = header.split_whitespace().collect();
    if parts.len() < 2 {
        return Err(PhylipError::InvalidHeader(header.to_string()));
    }

    let ntax: usize = parts[0]
        .parse()
        .map_err(|_| PhylipError::InvalidSequenceCount(parts[0].to_string()))?;
    let nchar: usize = parts[1]
        .parse()
        .map_err(|_| PhylipError::InvalidSequenceLength(parts[1].to_string()))?;

    if ntax == 0 {
        return Err(PhylipError::InvalidSequenceCount("0".to_string()));
    }

    let mut records: Vec<(String, String)> = Vec::with_capacity(ntax);
    let mut next_block_row = 0;

    for (line_no, line) in lines {
        if line.is_empty() {
            continue;
        }

        if records.len() < ntax {
            // First block: name, then sequence data
            let (name, rest) = line
                .split_once(char::is_whitespace)
                .ok_or(PhylipError::MissingSequence { line: line_no })?;
            let data: String = rest.chars().filter(|c| !c.is_whitespace()).collect();
            if data.is_empty() {
                return Err(PhylipError::MissingSequence { line: line_no });
            }
            records.push((name.to_string(), data));
        } else {
            // Interleaved continuation, rows in first-block order
            if records.iter().all(|(_, data)| data.len() >= nchar) {
                return Err(PhylipError::UnexpectedData { line: line_no });
            }
            let row = next_block_row % ntax;
            records[row]
                .1
                .extend(line.chars().filter(|c| !c.is_whitespace()));
            next_block_row += 1;
        }
    }

    if records.len() != ntax {
        return Err(PhylipError::SequenceCountMismatch {
            expected: ntax,
            found: records.len(),
        });
    }

    let mut sequences = Vec::with_capacity(ntax);
    for (name, data) in records {
        if data.len() != nchar {
            return Err(PhylipError::SequenceLengthMismatch {
                name,
                expected: nchar,
                found: data.len(),
            });
        }
        if let Some((position, character)) = data
            .chars()
            .enumerate()
            .find(|(_, c)| !is_nucleotide_char(*c))
        {
            return Err(PhylipError::InvalidCharacter {
                name,
                character,
                position: position + 1,
            });
        }
        sequences.push(Sequence::new(name, data));
    }

    Ok(Alignment::from_sequences(sequences)?)
}

/// Writes an alignment in sequential PHYLIP layout, preserving species order.
pub fn write_phylip<W: Write>(writer: &mut W, alignment: &Alignment) -> std::io::Result<()> {
    let width = alignment.max_id_length() + 2;
    writeln!(
        writer,
        " {} {}",
        alignment.sequence_count(),
        alignment.alignment_length()
    )?;
    for seq in alignment.sequences() {
        writeln!(writer, "{:<width$}{}", seq.id, seq.data, width = width)?;
    }
    Ok(())
}

/// Writes an alignment to a PHYLIP file, replacing any existing file.
pub fn write_phylip_file<P: AsRef<Path>>(
    path: P,
    alignment: &Alignment,
) -> Result<(), super::FormatError> {
    let path = path.as_ref();
    let io_err = |source| super::FormatError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    write_phylip(&mut writer, alignment).map_err(io_err)?;
    writer.flush().map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = " 4 12
homo      ATGCCCAAAGGG
pongo     ATGCCCAAGGGG
papio     ATGCCAAAAGGG
colobus   ATGCCTAAA---
";

    #[test]
    fn test_parse_sequential() {
        let alignment = parse_phylip_str(SAMPLE).unwrap();
        assert_eq!(alignment.sequence_count(), 4);
        assert_eq!(alignment.alignment_length(), 12);
        assert_eq!(alignment.codon_length(), 4);
        assert_eq!(alignment.get("pongo").unwrap().data, "ATGCCCAAGGGG");
        assert_eq!(
            alignment.species().collect::<Vec<_>>(),
            vec!["homo", "pongo", "papio", "colobus"]
        );
    }

    #[test]
    fn test_parse_long_names() {
        let content = "2 6\ncolobus_angolensis ATGAAA\nhomo_sapiens_sapiens\tATGAAG\n";
        let alignment = parse_phylip_str(content).unwrap();
        assert_eq!(alignment.get("colobus_angolensis").unwrap().data, "ATGAAA");
        assert_eq!(alignment.get("homo_sapiens_sapiens").unwrap().data, "ATGAAG");
    }

    #[test]
    fn test_parse_interleaved() {
        let content = " 2 12
homo   ATGCCC
pongo  ATGCCA

AAAGGG
AAGGGG
";
        let alignment = parse_phylip_str(content).unwrap();
        assert_eq!(alignment.get("homo").unwrap().data, "ATGCCCAAAGGG");
        assert_eq!(alignment.get("pongo").unwrap().data, "ATGCCAAAGGGG");
    }

    #[test]
    fn test_declared_length_mismatch() {
        let content = " 2 9\nhomo ATGCCCAAA\npongo ATGCCC\n";
        assert!(matches!(
            parse_phylip_str(content),
            Err(PhylipError::SequenceLengthMismatch { expected: 9, found: 6, .. })
        ));
    }

    #[test]
    fn test_invalid_alphabet() {
        let content = " 1 6\nhomo ATGCXC\n";
        assert!(matches!(
            parse_phylip_str(content),
            Err(PhylipError::InvalidCharacter { character: 'X', position: 5, .. })
        ));
    }

    #[test]
    fn test_not_codon_aligned() {
        let content = " 1 4\nhomo ATGC\n";
        assert!(matches!(
            parse_phylip_str(content),
            Err(PhylipError::Alignment(AlignmentError::NotCodonAligned(4)))
        ));
    }

    #[test]
    fn test_count_mismatch_and_header_errors() {
        assert!(matches!(parse_phylip_str(""), Err(PhylipError::EmptyFile)));
        assert!(matches!(
            parse_phylip_str("invalid\nhomo ATG\n"),
            Err(PhylipError::InvalidHeader(_))
        ));
        assert!(matches!(
            parse_phylip_str("x 3\nhomo ATG\n"),
            Err(PhylipError::InvalidSequenceCount(_))
        ));
        assert!(matches!(
            parse_phylip_str(" 3 3\nhomo ATG\npongo ATG\n"),
            Err(PhylipError::SequenceCountMismatch { expected: 3, found: 2 })
        ));
        assert!(matches!(
            parse_phylip_str(" 1 3\nhomo\n"),
            Err(PhylipError::MissingSequence { line: 2 })
        ));
    }

    #[test]
    fn test_round_trip() {
        let original = parse_phylip_str(SAMPLE).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.phy");
        write_phylip_file(&path, &original).unwrap();

        let reread = parse_phylip_file(&path).unwrap();
        assert_eq!(reread, original);
    }

    #[test]
    fn test_write_layout() {
        let alignment = parse_phylip_str(" 2 3\nhomo ATG\ncolobus ATA\n").unwrap();
        let mut out = Vec::new();
        write_phylip(&mut out, &alignment).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            " 2 3\nhomo     ATG\ncolobus  ATA\n"
        );
    }

    #[test]
    fn test_write_layout_non_ascii_names() {
        let alignment = Alignment::from_sequences(vec![
            Sequence::new("homo", "ATG"),
            Sequence::new("pongé", "ATA"),
        ])
        .unwrap();
        let mut out = Vec::new();
        write_phylip(&mut out, &alignment).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            " 2 3\nhomo   ATG\npongé  ATA\n"
        );
    }
}
