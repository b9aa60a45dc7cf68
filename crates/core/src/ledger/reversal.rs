//! Reversing entries.

use super::types::{JournalLineInput, ValidatedLine};

/// Description prefix applied to reversed lines and entries.
pub const REVERSAL_PREFIX: &str = "Reversal: ";

/// Builds the lines of a reversing entry by swapping debits and credits.
///
/// Line descriptions are prefixed with `"Reversal: "`; lines without a
/// description take `entry_description` instead.
#[must_use]
pub fn reverse_lines(lines: &[ValidatedLine], entry_description: &str) -> Vec<JournalLineInput> {
    lines
        .iter()
        .map(|line| JournalLineInput {
            account_id: Some(line.account_id),
            debit: line.credit,
            credit: line.debit,
            description: Some(format!(
                "{REVERSAL_PREFIX}{}",
                line.description.as_deref().unwrap_or(entry_description)
            )),
        })
        .collect()
}
