//! Consistency checks between the branch-code table and an alignment.
//!
//! Runs before every window scan.

use thiserror::Error;

use crate::formats::branch_codes::BranchCodeTable;
use crate::model::{Alignment, BranchId};

/// Inputs that cannot be scanned together.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing branch codes: a branch-code table must be supplied")]
    MissingBranchCodes,

    #[error("Unknown species '{species}' listed for branch {branch} is not in the alignment")]
    UnknownSpecies { branch: BranchId, species: String },
}

/// Checks that a branch-code table is present and only names species of
/// the alignment. Returns the validated table.
pub fn check<'a>(
    branch_codes: Option<&'a BranchCodeTable>,
    alignment: &Alignment,
) -> Result<&'a BranchCodeTable, ValidationError> {
    let table = branch_codes
        .filter(|table| !table.is_empty())
        .ok_or(ValidationError::MissingBranchCodes)?;

    for (branch, species) in table.iter() {
        if let Some(unknown) = species.iter().find(|s| !alignment.contains(s)) {
            return Err(ValidationError::UnknownSpecies {
                branch: branch.clone(),
                species: unknown.clone(),
            });
        }
    }

    Ok(table)
}
