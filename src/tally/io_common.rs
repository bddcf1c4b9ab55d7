use std::path::Path;

use log::{debug, warn};
use rank_tally::builder::Builder;
use snafu::prelude::*;

use crate::tally::config_reader::RowColumns;
use crate::tally::*;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

/// One row of a spreadsheet-like source, with the cells already turned into text.
pub struct VoteRow {
    pub lineno: usize,
    pub cells: Vec<String>,
}

fn cell<'a>(row: &'a VoteRow, column: usize) -> RunResult<&'a str> {
    let s = row
        .cells
        .get(column - 1)
        .context(LineTooShortSnafu {
            lineno: row.lineno,
            column,
        })?;
    Ok(s.trim())
}

/// Adds the rows to the builder. Returns the number of votes that were added.
///
/// Empty rows are skipped. Rows with a task but without a voter or a vote are
/// skipped with a warning.
pub fn add_rows(
    rows: impl Iterator<Item = RunResult<VoteRow>>,
    columns: &RowColumns,
    builder: &mut Builder,
) -> RunResult<usize> {
    let mut count = 0;
    for row_r in rows {
        let row = row_r?;
        if row.cells.iter().all(|c| c.trim().is_empty()) {
            debug!("add_rows: skipping empty line {}", row.lineno);
            continue;
        }
        let task = cell(&row, columns.task)?;
        let voter = cell(&row, columns.voter)?;
        let vote = cell(&row, columns.vote)?;
        if voter.is_empty() || vote.is_empty() {
            warn!(
                "add_rows: line {}: missing voter or vote, skipping: {:?}",
                row.lineno, row.cells
            );
            continue;
        }
        builder
            .add_vote_simple(task, voter, vote)
            .context(InvalidRecordSnafu { lineno: row.lineno })?;
        count += 1;
    }
    Ok(count)
}
