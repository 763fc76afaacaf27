//! Sliding-window scan of branch substitution density.
//!
//! For every branch that has both reconstructed events and a branch-code
//! entry, a window of `window_size` codons slides over columns `1..=L` one
//! column at a time. A window holding at least `threshold` events marks all
//! of its columns for every species under that branch.
//!
//! In interscan mode, marked stretches of the same branch that are separated
//! by at most `interscan_radius` unmarked columns are joined, so the columns
//! between two nearby hot windows are masked as well. This only ever adds
//! columns to the non-interscan result.

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::formats::branch_codes::BranchCodeTable;
use crate::formats::rst::BranchEventIndex;
use crate::model::{BranchId, MaskingPlan};

/// Invalid scan parameters or inconsistent event coordinates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("Window size must be at least 1 codon")]
    ZeroWindowSize,

    #[error("Threshold must be at least 1 substitution")]
    ZeroThreshold,

    #[error("Branch {branch}: substitution at codon {position} is outside the alignment (1..={codon_length})")]
    PositionOutOfRange {
        branch: BranchId,
        position: usize,
        codon_length: usize,
    },
}

/// Window scan parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParams {
    window_size: usize,
    threshold: usize,
    interscan: bool,
    interscan_radius: Option<usize>,
}

impl ScanParams {
    /// Creates parameters; window size and threshold must be positive.
    pub fn new(window_size: usize, threshold: usize, interscan: bool) -> Result<Self, WindowError> {
        if window_size == 0 {
            return Err(WindowError::ZeroWindowSize);
        }
        if threshold == 0 {
            return Err(WindowError::ZeroThreshold);
        }
        Ok(Self {
            window_size,
            threshold,
            interscan,
            interscan_radius: None,
        })
    }

    /// Sets the largest unmarked gap bridged in interscan mode.
    pub fn with_interscan_radius(mut self, radius: usize) -> Self {
        self.interscan_radius = Some(radius);
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn interscan(&self) -> bool {
        self.interscan
    }

    /// Gap bridged in interscan mode; defaults to the window size.
    pub fn interscan_radius(&self) -> usize {
        self.interscan_radius.unwrap_or(self.window_size)
    }
}

/// Per-branch scan statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchScan {
    pub branch: BranchId,
    /// Events considered on this branch
    pub events: usize,
    /// Windows that reached the threshold
    pub triggered_windows: usize,
    /// Codon columns marked for this branch (interscan columns included)
    pub marked_columns: usize,
    /// Columns added by interscan gap bridging
    pub interscan_columns: usize,
}

/// Result of scanning one alignment.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub plan: MaskingPlan,
    pub branches: Vec<BranchScan>,
}

/// Scans every branch of `events` and builds the masking plan.
///
/// `codon_length` is the alignment length in codons; event positions are
/// 1-based columns and must lie in `1..=codon_length`.
pub fn scan(
    codon_length: usize,
    events: &BranchEventIndex,
    branch_codes: &BranchCodeTable,
    params: &ScanParams,
) -> Result<ScanOutcome, WindowError> {
    let mut outcome = ScanOutcome::default();

    for (branch, positions) in events.iter() {
        let Some(species) = branch_codes.species(branch) else {
            warn!(branch = %branch, events = positions.len(), "branch has no branch code, skipped");
            continue;
        };

        if let Some(&position) = positions.iter().find(|&&p| p == 0 || p > codon_length) {
            return Err(WindowError::PositionOutOfRange {
                branch: branch.clone(),
                position,
                codon_length,
            });
        }

        let marks = mark_branch(positions, codon_length, params);
        for column in marks.columns() {
            for name in species {
                outcome.plan.insert(name, column);
            }
        }

        let summary = BranchScan {
            branch: branch.clone(),
            events: positions.len(),
            triggered_windows: marks.triggered_windows,
            marked_columns: marks.count(),
            interscan_columns: marks.interscan_columns,
        };
        trace!(?summary, "branch scanned");
        outcome.branches.push(summary);
    }

    debug!(
        codon_length,
        window_size = params.window_size,
        threshold = params.threshold,
        interscan = params.interscan,
        masked = outcome.plan.len(),
        "window scan done"
    );
    Ok(outcome)
}

/// Columns marked on one branch (0-based codon index).
struct BranchMarks {
    marked: Vec<bool>,
    triggered_windows: usize,
    interscan_columns: usize,
}

impl BranchMarks {
    fn columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.marked
            .iter()
            .enumerate()
            .filter_map(|(i, &m)| m.then_some(i))
    }

    fn count(&self) -> usize {
        self.marked.iter().filter(|&&m| m).count()
    }
}

/// Slides the window over one branch and marks hot columns.
fn mark_branch(positions: &[usize], codon_length: usize, params: &ScanParams) -> BranchMarks {
    let mut marks = BranchMarks {
        marked: vec![false; codon_length],
        triggered_windows: 0,
        interscan_columns: 0,
    };
    if codon_length == 0 || positions.is_empty() {
        return marks;
    }

    // prefix[c] = number of events at columns 1..=c
    let mut prefix = vec![0usize; codon_length + 1];
    for &p in positions {
        prefix[p] += 1;
    }
    for c in 1..=codon_length {
        prefix[c] += prefix[c - 1];
    }

    // A window wider than the alignment collapses to the whole alignment.
    let width = params.window_size.min(codon_length);
    let mut marked_until = 0; // last 1-based column already marked
    for start in 1..=codon_length - width + 1 {
        let end = start + width - 1;
        if prefix[end] - prefix[start - 1] < params.threshold {
            continue;
        }
        marks.triggered_windows += 1;
        for column in start.max(marked_until + 1)..=end {
            marks.marked[column - 1] = true;
        }
        marked_until = end;
    }

    if params.interscan {
        marks.interscan_columns = bridge_gaps(&mut marks.marked, params.interscan_radius());
    }
    marks
}

/// Marks unmarked gaps of at most `radius` columns lying between two marked
/// stretches. Returns the number of columns added.
fn bridge_gaps(marked: &mut [bool], radius: usize) -> usize {
    let mut added = 0;
    let mut last_marked: Option<usize> = None;

    for i in 0..marked.len() {
        if !marked[i] {
            continue;
        }
        if let Some(prev) = last_marked {
            let gap = i - prev - 1;
            if gap > 0 && gap <= radius {
                for slot in &mut marked[prev + 1..i] {
                    *slot = true;
                }
                added += gap;
            }
        }
        last_marked = Some(i);
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::branch_codes::parse_branch_codes_str;

    fn branch(label: &str) -> BranchId {
        label.parse().unwrap()
    }

    fn codes() -> BranchCodeTable {
        parse_branch_codes_str(
            "5..6 homo,pongo\n6..1 homo\n6..2 pongo\n5..7 papio,colobus\n7..3 papio\n7..4 colobus\n",
        )
        .unwrap()
    }

    fn events() -> BranchEventIndex {
        BranchEventIndex::from_positions([
            (branch("5..6"), vec![]),
            (branch("6..1"), vec![19, 5, 8]),
            (branch("5..7"), vec![25]),
            (branch("7..4"), vec![12]),
        ])
    }

    fn params(window: usize, threshold: usize, interscan: bool) -> ScanParams {
        ScanParams::new(window, threshold, interscan).unwrap()
    }

    fn columns(plan: &MaskingPlan, species: &str) -> Vec<usize> {
        plan.codons_for(species)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_threshold_two() {
        let outcome = scan(30, &events(), &codes(), &params(5, 2, false)).unwrap();

        // Only windows starting at 4 and 5 hold both events 5 and 8.
        assert_eq!(columns(&outcome.plan, "homo"), vec![3, 4, 5, 6, 7, 8]);
        assert_eq!(outcome.plan.len(), 6);

        let homo = outcome.branches.iter().find(|b| b.branch == branch("6..1")).unwrap();
        assert_eq!(homo.events, 3);
        assert_eq!(homo.triggered_windows, 2);
        assert_eq!(homo.marked_columns, 6);
    }

    #[test]
    fn test_threshold_one() {
        let outcome = scan(30, &events(), &codes(), &params(5, 1, false)).unwrap();

        // 6..1: columns 1..=12 and 15..=23
        let homo = columns(&outcome.plan, "homo");
        assert_eq!(homo.len(), 21);
        assert!(!homo.contains(&12) && !homo.contains(&13));

        // 5..7: columns 21..=29 for both papio and colobus
        assert_eq!(columns(&outcome.plan, "papio"), (20..29).collect::<Vec<_>>());
        // 7..4 adds columns 8..=16 for colobus
        assert_eq!(columns(&outcome.plan, "colobus").len(), 18);
        assert!(columns(&outcome.plan, "pongo").is_empty());

        assert_eq!(outcome.plan.len(), 48);
    }

    #[test]
    fn test_interscan_bridges_nearby_windows() {
        let plain = scan(30, &events(), &codes(), &params(5, 1, false)).unwrap();
        let inter = scan(30, &events(), &codes(), &params(5, 1, true)).unwrap();

        // Columns 13 and 14 sit between the two hot stretches of 6..1.
        assert!(inter.plan.contains("homo", 12));
        assert!(inter.plan.contains("homo", 13));
        assert_eq!(inter.plan.len(), 50);

        // colobus stretches come from different branches and stay apart
        assert!(!inter.plan.contains("colobus", 17));

        for (species, set) in plain.plan.iter() {
            for &codon in set {
                assert!(inter.plan.contains(species, codon));
            }
        }

        let homo = inter.branches.iter().find(|b| b.branch == branch("6..1")).unwrap();
        assert_eq!(homo.interscan_columns, 2);
    }

    #[test]
    fn test_interscan_radius_limits_bridging() {
        let narrow = params(5, 1, true).with_interscan_radius(1);
        let outcome = scan(30, &events(), &codes(), &narrow).unwrap();
        assert_eq!(outcome.plan.len(), 48);
    }

    #[test]
    fn test_high_threshold_masks_nothing() {
        let outcome = scan(30, &events(), &codes(), &params(20, 10, true)).unwrap();
        assert!(outcome.plan.is_empty());
    }

    #[test]
    fn test_window_larger_than_alignment() {
        let index = BranchEventIndex::from_positions([(branch("6..1"), vec![2])]);

        let outcome = scan(4, &index, &codes(), &params(10, 1, false)).unwrap();
        assert_eq!(columns(&outcome.plan, "homo"), vec![0, 1, 2, 3]);
        assert_eq!(outcome.branches[0].triggered_windows, 1);

        let outcome = scan(4, &index, &codes(), &params(10, 2, false)).unwrap();
        assert!(outcome.plan.is_empty());
    }

    #[test]
    fn test_empty_branch_never_triggers() {
        let index = BranchEventIndex::from_positions([(branch("5..6"), vec![])]);
        let outcome = scan(30, &index, &codes(), &params(1, 1, true)).unwrap();
        assert!(outcome.plan.is_empty());
        assert_eq!(outcome.branches[0].events, 0);
    }

    #[test]
    fn test_branch_without_code_is_skipped() {
        let index = BranchEventIndex::from_positions([(branch("9..8"), vec![3])]);
        let outcome = scan(30, &index, &codes(), &params(5, 1, false)).unwrap();
        assert!(outcome.plan.is_empty());
        assert!(outcome.branches.is_empty());
    }

    #[test]
    fn test_position_out_of_range() {
        let index = BranchEventIndex::from_positions([(branch("6..1"), vec![31])]);
        assert_eq!(
            scan(30, &index, &codes(), &params(5, 1, false)).unwrap_err(),
            WindowError::PositionOutOfRange {
                branch: branch("6..1"),
                position: 31,
                codon_length: 30,
            }
        );
    }

    #[test]
    fn test_invalid_params() {
        assert_eq!(ScanParams::new(0, 1, false), Err(WindowError::ZeroWindowSize));
        assert_eq!(ScanParams::new(5, 0, false), Err(WindowError::ZeroThreshold));
        assert_eq!(params(7, 1, true).interscan_radius(), 7);
    }
}
