//! Applies masking plans to alignments.
//!
//! Masking never edits an alignment in place: every function returns a new
//! `Alignment` and leaves unplanned codons byte-for-byte untouched.

use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::model::{Alignment, AlignmentError, MaskingPlan, Sequence, CODON_LEN};

/// Errors raised by a plan that does not fit the alignment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MaskError {
    #[error("Cannot mask unknown species '{0}'")]
    UnknownSpecies(String),

    #[error("Cannot mask codon {codon} of '{species}': alignment has {codon_length} codons")]
    CodonOutOfRange {
        species: String,
        codon: usize,
        codon_length: usize,
    },

    #[error(transparent)]
    Alignment(#[from] AlignmentError),
}

/// Triplet written over masked codons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskStyle {
    /// `NNN`: unknown nucleotides
    #[default]
    Unknown,
    /// `---`: alignment gap
    Gap,
}

impl MaskStyle {
    /// Character repeated in the mask triplet.
    pub fn symbol(self) -> char {
        match self {
            MaskStyle::Unknown => 'N',
            MaskStyle::Gap => '-',
        }
    }

    pub fn triplet(self) -> &'static str {
        match self {
            MaskStyle::Unknown => "NNN",
            MaskStyle::Gap => "---",
        }
    }
}

impl fmt::Display for MaskStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.triplet())
    }
}

/// Returns a copy of `alignment` with every planned codon replaced by the
/// mask triplet.
pub fn apply(
    alignment: &Alignment,
    plan: &MaskingPlan,
    style: MaskStyle,
) -> Result<Alignment, MaskError> {
    let codon_length = alignment.codon_length();
    for (species, codons) in plan.iter() {
        if !alignment.contains(species) {
            return Err(MaskError::UnknownSpecies(species.to_string()));
        }
        if let Some(&codon) = codons.iter().find(|&&c| c >= codon_length) {
            return Err(MaskError::CodonOutOfRange {
                species: species.to_string(),
                codon,
                codon_length,
            });
        }
    }

    let triplet = style.triplet().as_bytes();
    let sequences = alignment
        .sequences()
        .iter()
        .map(|seq| match plan.codons_for(&seq.id) {
            Some(codons) if !codons.is_empty() => {
                let mut data = seq.data.clone().into_bytes();
                for &codon in codons {
                    let start = codon * CODON_LEN;
                    data[start..start + CODON_LEN].copy_from_slice(triplet);
                }
                Sequence::from_bytes(seq.id.clone(), data)
            }
            _ => Ok(seq.clone()),
        })
        .collect::<Result<Vec<_>, AlignmentError>>()?;

    debug!(masked = plan.len(), style = %style, "applied masking plan");
    Ok(Alignment::from_sequences(sequences)?)
}

/// Masks whole sequences that keep fewer than `min_codons` informative
/// codons (neither fully masked nor fully gapped).
///
/// Returns the new alignment and the names of the species masked entirely.
pub fn mask_short_sequences(
    alignment: &Alignment,
    min_codons: usize,
    style: MaskStyle,
) -> Result<(Alignment, Vec<String>), MaskError> {
    let mut plan = MaskingPlan::new();
    let mut short = Vec::new();

    for seq in alignment.sequences() {
        let informative = seq
            .codons()
            .filter(|codon| !is_uninformative(codon))
            .count();
        if informative < min_codons {
            debug!(species = %seq.id, informative, min_codons, "masking short sequence");
            short.push(seq.id.clone());
            for codon in 0..seq.codon_count() {
                plan.insert(&seq.id, codon);
            }
        }
    }

    let masked = apply(alignment, &plan, style)?;
    Ok((masked, short))
}

fn is_uninformative(codon: &str) -> bool {
    codon
        .chars()
        .all(|c| matches!(c.to_ascii_uppercase(), 'N' | '-' | '?'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alignment() -> Alignment {
        Alignment::from_sequences(vec![
            Sequence::new("homo", "ATGCCCAAAGGG"),
            Sequence::new("pongo", "ATGCCCAAGGGG"),
            Sequence::new("colobus", "ATG---NNNGGG"),
        ])
        .unwrap()
    }

    #[test]
    fn test_apply_masks_only_planned_codons() {
        let original = alignment();
        let mut plan = MaskingPlan::new();
        plan.insert("homo", 1);
        plan.insert("homo", 3);
        plan.insert("pongo", 0);

        let masked = apply(&original, &plan, MaskStyle::Unknown).unwrap();
        assert_eq!(masked.get("homo").unwrap().data, "ATGNNNAAANNN");
        assert_eq!(masked.get("pongo").unwrap().data, "NNNCCCAAGGGG");
        assert_eq!(masked.get("colobus").unwrap(), original.get("colobus").unwrap());

        // input untouched
        assert_eq!(original.get("homo").unwrap().data, "ATGCCCAAAGGG");
    }

    #[test]
    fn test_apply_gap_style() {
        let mut plan = MaskingPlan::new();
        plan.insert("homo", 2);
        let masked = apply(&alignment(), &plan, MaskStyle::Gap).unwrap();
        assert_eq!(masked.get("homo").unwrap().data, "ATGCCC---GGG");
        assert_eq!(masked.get("homo").unwrap().masked_codon_count(MaskStyle::Gap.symbol()), 1);
    }

    #[test]
    fn test_apply_rejects_bad_plans() {
        let mut plan = MaskingPlan::new();
        plan.insert("gorilla", 0);
        assert_eq!(
            apply(&alignment(), &plan, MaskStyle::Unknown),
            Err(MaskError::UnknownSpecies("gorilla".to_string()))
        );

        let mut plan = MaskingPlan::new();
        plan.insert("homo", 4);
        assert!(matches!(
            apply(&alignment(), &plan, MaskStyle::Unknown),
            Err(MaskError::CodonOutOfRange { codon: 4, codon_length: 4, .. })
        ));
    }

    #[test]
    fn test_apply_rejects_split_multibyte_characters() {
        let alignment = Alignment::from_sequences(vec![Sequence::new("homo", "ATGAAÉAA")]).unwrap();
        let mut plan = MaskingPlan::new();
        plan.insert("homo", 1);
        assert_eq!(
            apply(&alignment, &plan, MaskStyle::Unknown),
            Err(MaskError::Alignment(AlignmentError::InvalidEncoding(
                "homo".to_string()
            )))
        );
    }

    #[test]
    fn test_mask_short_sequences() {
        let (masked, short) = mask_short_sequences(&alignment(), 3, MaskStyle::Unknown).unwrap();
        assert_eq!(short, vec!["colobus".to_string()]);
        assert_eq!(masked.get("colobus").unwrap().data, "NNNNNNNNNNNN");
        assert_eq!(masked.get("homo").unwrap().data, "ATGCCCAAAGGG");

        let (_, short) = mask_short_sequences(&alignment(), 2, MaskStyle::Unknown).unwrap();
        assert!(short.is_empty());
    }
}
