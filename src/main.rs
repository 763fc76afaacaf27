//! SWAMP - Sliding-window masking of codon alignments
//!
//! Masks codons in regions where a branch carries many reconstructed
//! non-synonymous substitutions.
//!
//! ## Usage
//!
//! ```bash
//! swamp data/ -b branchcodes.txt -t 2 -w 15
//! swamp data/44/44.phy -b branchcodes.txt -t 1 -w 10 -s
//! ```
//!
//! Every alignment needs the codeml `rst` report in its own directory.
//! Masked copies are written next to the input as `<name>_masked.phy`.

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};

use swamp::formats::branch_codes::parse_branch_codes_file;
use swamp::formats::rst::{RstOptions, SubstitutionFilter};
use swamp::genetic_code::GeneticCode;
use swamp::logging;
use swamp::mask::MaskStyle;
use swamp::orchestrator::{discover_alignments, scan_files, ScanConfig};
use swamp::scan::ScanParams;

/// Mask symbol specification for command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum MaskArg {
    /// Replace masked codons with NNN
    Unknown,
    /// Replace masked codons with ---
    Gap,
}

impl From<MaskArg> for MaskStyle {
    fn from(arg: MaskArg) -> Self {
        match arg {
            MaskArg::Unknown => MaskStyle::Unknown,
            MaskArg::Gap => MaskStyle::Gap,
        }
    }
}

/// SWAMP - mask alignment windows with dense branch-specific substitutions
///
/// INPUT is a PHYLIP alignment or a directory searched recursively for
/// .phy/.phylip files. Each alignment must sit next to its codeml `rst` file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Alignment file or directory of alignments
    input: PathBuf,

    /// Branch-code file mapping codeml branches to species
    #[arg(short = 'b', long = "branch-codes")]
    branch_codes: Option<PathBuf>,

    /// Minimum number of substitutions in a window that triggers masking
    #[arg(short = 't', long = "threshold")]
    threshold: usize,

    /// Window size in codons
    #[arg(short = 'w', long = "window-size")]
    window_size: usize,

    /// Also mask short gaps between hot windows of the same branch
    #[arg(short = 's', long = "interscan")]
    interscan: bool,

    /// Largest gap (codons) joined in interscan mode [default: window size]
    #[arg(long = "interscan-radius", requires = "interscan")]
    interscan_radius: Option<usize>,

    /// Mask whole sequences left with fewer informative codons than this
    #[arg(short = 'm', long = "min-seq-len")]
    min_seq_len: Option<usize>,

    /// Symbol written over masked codons
    #[arg(long = "mask-style", value_enum, default_value = "unknown")]
    mask_style: MaskArg,

    /// NCBI genetic code used when rst lines lack amino acids
    #[arg(short = 'g', long = "genetic-code", default_value = "1")]
    genetic_code: u8,

    /// Count synonymous substitutions too
    #[arg(long = "all-substitutions")]
    all_substitutions: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Builds the run configuration shared by every file.
    fn scan_config(&self) -> Result<ScanConfig> {
        let mut params = ScanParams::new(self.window_size, self.threshold, self.interscan)?;
        if let Some(radius) = self.interscan_radius {
            params = params.with_interscan_radius(radius);
        }

        let genetic_code = GeneticCode::by_id(self.genetic_code).ok_or_else(|| {
            let known: Vec<String> = GeneticCode::available_ids().map(|id| id.to_string()).collect();
            anyhow::anyhow!(
                "Unknown genetic code: {} (available: {})",
                self.genetic_code,
                known.join(", ")
            )
        })?;

        Ok(ScanConfig {
            params,
            mask_style: self.mask_style.into(),
            min_unmasked_codons: self.min_seq_len,
            rst: RstOptions {
                filter: if self.all_substitutions {
                    SubstitutionFilter::All
                } else {
                    SubstitutionFilter::NonSynonymous
                },
                genetic_code,
            },
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(args.verbose)?;

    let config = args.scan_config()?;

    // A missing table is reported per file by validation.
    let branch_codes = args
        .branch_codes
        .as_ref()
        .map(parse_branch_codes_file)
        .transpose()?;

    let inputs = discover_alignments(&args.input)
        .with_context(|| format!("Cannot read input '{}'", args.input.display()))?;
    if inputs.is_empty() {
        anyhow::bail!("No alignment files found under '{}'", args.input.display());
    }
    info!(files = inputs.len(), "starting window scan");

    let outcomes = scan_files(&inputs, &config, branch_codes.as_ref());

    let mut failures = 0;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(result) => {
                println!(
                    "{}\t{} masked codons\t{}",
                    result.path.display(),
                    result.masked_column_count,
                    result.masked_path.display()
                );
                for species in &result.fully_masked_species {
                    println!("{}\t{} fully masked", result.path.display(), species);
                }
            }
            Err(e) => {
                failures += 1;
                error!(path = %outcome.path.display(), "{}", e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} files failed", failures, outcomes.len());
    }
    Ok(())
}
