//! # SWAMP - Sliding-window masking of codon alignments
//!
//! Masks alignment regions where a phylogenetic branch accumulates
//! suspiciously many reconstructed substitutions (codeml `rst` output).
//!
//! ## Architecture
//!
//! - `model`: Sequences, alignments, branch labels and masking plans
//! - `formats`: PHYLIP, branch-code and `rst` parsing (PHYLIP writing too)
//! - `genetic_code`: Codon translation used to tell synonymous changes apart
//! - `validate`: Branch codes vs. alignment consistency checks
//! - `scan`: The sliding-window scan producing a masking plan
//! - `mask`: Applying masking plans
//! - `orchestrator`: Per-file pipeline and batch runs
//! - `logging`: tracing subscriber setup for the binary

pub mod formats;
pub mod genetic_code;
pub mod logging;
pub mod mask;
pub mod model;
pub mod orchestrator;
pub mod scan;
pub mod validate;
