// Primitives for reading CSV files.

use std::fs::File;

use log::debug;
use rank_tally::builder::Builder;
use snafu::prelude::*;

use crate::tally::config_reader::VoteSource;
use crate::tally::io_common::{add_rows, VoteRow};
use crate::tally::*;

pub fn read_csv_votes(path: &str, source: &VoteSource, builder: &mut Builder) -> RunResult<usize> {
    let columns = source.columns()?;
    let (records, first_row) = get_records(path, source)?;

    let rows = records.enumerate().map(|(idx, line_r)| -> RunResult<VoteRow> {
        let lineno = idx + first_row;
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        debug!("read_csv_votes: lineno: {:?} row: {:?}", lineno, line);
        Ok(VoteRow {
            lineno,
            cells: line.iter().map(|s| s.to_string()).collect(),
        })
    });
    add_rows(rows, &columns, builder)
}

fn get_records(path: &str, source: &VoteSource) -> RunResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = source.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut records = rdr.into_records();
    // The index starts at 1 to respect most conventions in the excel world
    for _ in 1..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}
