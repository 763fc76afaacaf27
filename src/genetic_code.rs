//! Genetic code tables used to classify codon substitutions.
//!
//! codeml reports amino acids next to every reconstructed codon, but some
//! report variants omit them. In that case the codons are translated here to
//! decide whether a change is synonymous.

/// Nucleotide order of the NCBI 64-letter translation strings.
const BASES: [u8; 4] = [b'T', b'C', b'A', b'G'];

/// A genetic code table for translating codons to amino acids.
#[derive(Debug, Clone, Copy)]
pub struct GeneticCode {
    /// NCBI genetic code ID
    pub id: u8,
    /// Name of the genetic code
    pub name: &'static str,
    /// NCBI `ncbieaa` string (TTT, TTC, TTA, TTG, TCT, ...)
    amino_acids: &'static [u8; 64],
}

const CODES: &[GeneticCode] = &[
    GeneticCode::new(
        1,
        "Standard",
        b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        2,
        "Vertebrate Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSS**VVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        3,
        "Yeast Mitochondrial",
        b"FFLLSSSSYY**CCWWTTTTPPPPHHQQRRRRIIMMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        4,
        "Mold/Protozoan/Coelenterate Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        5,
        "Invertebrate Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSSSSVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        6,
        "Ciliate/Dasycladacean/Hexamita Nuclear",
        b"FFLLSSSSYYQQCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        9,
        "Echinoderm/Flatworm Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNNKSSSSVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        10,
        "Euplotid Nuclear",
        b"FFLLSSSSYY**CCCWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        11,
        "Bacterial/Archaeal/Plant Plastid",
        b"FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        12,
        "Alternative Yeast Nuclear",
        b"FFLLSSSSYY**CC*WLLLSPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        13,
        "Ascidian Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNKKSSGGVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        14,
        "Alternative Flatworm Mitochondrial",
        b"FFLLSSSSYYY*CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNNKSSSSVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        15,
        "Blepharisma Macronuclear",
        b"FFLLSSSSYY*QCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        16,
        "Chlorophycean Mitochondrial",
        b"FFLLSSSSYY*LCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        21,
        "Trematode Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIMMTTTTNNNKSSSSVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        22,
        "Scenedesmus obliquus Mitochondrial",
        b"FFLLSS*SYY*LCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        23,
        "Thraustochytrium Mitochondrial",
        b"FF*LSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        24,
        "Rhabdopleuridae Mitochondrial",
        b"FFLLSSSSYY**CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSSKVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        25,
        "Candidate Division SR1/Gracilibacteria",
        b"FFLLSSSSYY**CCGWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        26,
        "Pachysolen tannophilus Nuclear",
        b"FFLLSSSSYY**CC*WLLLAPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        27,
        "Karyorelict Nuclear",
        b"FFLLSSSSYYQQCCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        28,
        "Condylostoma Nuclear",
        b"FFLLSSSSYYQQCCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        29,
        "Mesodinium Nuclear",
        b"FFLLSSSSYYYYCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        30,
        "Peritrich Nuclear",
        b"FFLLSSSSYYEECC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        31,
        "Blastocrithidia Nuclear",
        b"FFLLSSSSYYEECCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        32,
        "Balanophoraceae Plastid",
        b"FFLLSSSSYY*WCC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG",
    ),
    GeneticCode::new(
        33,
        "Cephalodiscidae Mitochondrial",
        b"FFLLSSSSYYY*CCWWLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSSKVVVVAAAADDEEGGGG",
    ),
];

impl GeneticCode {
    const fn new(id: u8, name: &'static str, amino_acids: &'static [u8; 64]) -> Self {
        Self {
            id,
            name,
            amino_acids,
        }
    }

    /// Looks up a genetic code by NCBI ID.
    pub fn by_id(id: u8) -> Option<GeneticCode> {
        CODES.iter().copied().find(|code| code.id == id)
    }

    /// The standard code (NCBI 1).
    pub fn standard() -> GeneticCode {
        CODES[0]
    }

    /// IDs of all available codes.
    pub fn available_ids() -> impl Iterator<Item = u8> {
        CODES.iter().map(|code| code.id)
    }

    /// Translates a codon, or `None` for gaps, ambiguity codes or bad length.
    /// U is read as T; case is ignored.
    pub fn translate_codon(&self, codon: &str) -> Option<char> {
        let bytes = codon.as_bytes();
        if bytes.len() != 3 {
            return None;
        }

        let mut idx = 0;
        for &b in bytes {
            let b = match b.to_ascii_uppercase() {
                b'U' => b'T',
                other => other,
            };
            let base = BASES.iter().position(|&x| x == b)?;
            idx = idx * 4 + base;
        }
        Some(self.amino_acids[idx] as char)
    }

    /// Returns `Some(true)` when both codons encode the same amino acid,
    /// `None` if either cannot be translated.
    pub fn is_synonymous(&self, from: &str, to: &str) -> Option<bool> {
        Some(self.translate_codon(from)? == self.translate_codon(to)?)
    }
}

impl Default for GeneticCode {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_code_translation() {
        let standard = GeneticCode::standard();

        assert_eq!(standard.translate_codon("ATG"), Some('M')); // Start codon
        assert_eq!(standard.translate_codon("TAA"), Some('*')); // Stop codon
        assert_eq!(standard.translate_codon("TGA"), Some('*'));
        assert_eq!(standard.translate_codon("TTT"), Some('F'));
        assert_eq!(standard.translate_codon("GGG"), Some('G'));
        assert_eq!(standard.translate_codon("aug"), Some('M'));
    }

    #[test]
    fn test_untranslatable_codons() {
        let standard = GeneticCode::standard();
        assert_eq!(standard.translate_codon("---"), None);
        assert_eq!(standard.translate_codon("NNN"), None);
        assert_eq!(standard.translate_codon("CTR"), None);
        assert_eq!(standard.translate_codon("AT"), None);
    }

    #[test]
    fn test_synonymy() {
        let standard = GeneticCode::standard();
        assert_eq!(standard.is_synonymous("CTG", "CTA"), Some(true));
        assert_eq!(standard.is_synonymous("CGC", "CAC"), Some(false));
        assert_eq!(standard.is_synonymous("CGC", "C-C"), None);
    }

    #[test]
    fn test_different_genetic_codes() {
        // In vertebrate mitochondrial (code 2), TGA is Trp (W)
        let vert_mito = GeneticCode::by_id(2).unwrap();
        assert_eq!(vert_mito.translate_codon("TGA"), Some('W'));
        assert_eq!(GeneticCode::standard().is_synonymous("TGA", "TGG"), Some(false));
        assert_eq!(vert_mito.is_synonymous("TGA", "TGG"), Some(true));

        assert!(GeneticCode::by_id(7).is_none());
        assert!(GeneticCode::available_ids().any(|id| id == 11));
    }

    #[test]
    fn test_all_ncbi_codes_available() {
        let ids: Vec<u8> = GeneticCode::available_ids().collect();
        assert_eq!(ids.len(), 25);
        for id in [15, 16].into_iter().chain(21..=33) {
            assert!(GeneticCode::by_id(id).is_some(), "missing code {}", id);
        }

        // Blepharisma: TAG is Gln, Chlorophycean: TAG is Leu
        let blepharisma = GeneticCode::by_id(15).unwrap();
        assert_eq!(blepharisma.translate_codon("TAG"), Some('Q'));
        assert_eq!(blepharisma.is_synonymous("TAG", "CAA"), Some(true));
        assert_eq!(GeneticCode::by_id(16).unwrap().translate_codon("TAG"), Some('L'));
        assert_eq!(GeneticCode::by_id(33).unwrap().name, "Cephalodiscidae Mitochondrial");
    }
}
