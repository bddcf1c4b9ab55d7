use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;
use rank_tally::builder::Builder;
use snafu::prelude::*;

use crate::tally::config_reader::VoteSource;
use crate::tally::io_common::{add_rows, VoteRow};
use crate::tally::*;

pub fn read_excel_votes(path: &str, source: &VoteSource, builder: &mut Builder) -> RunResult<usize> {
    let columns = source.columns()?;
    let first_row = source.first_vote_row_index()?;
    let wrange = get_range(path, source)?;

    // The range starts at the first non-empty cell of the worksheet.
    let (row_offset, col_offset) = wrange
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let rows = wrange
        .rows()
        .enumerate()
        .map(|(idx, row)| (idx + row_offset + 1, row))
        .filter(|(lineno, _)| *lineno >= first_row)
        .map(|(lineno, row)| -> RunResult<VoteRow> {
            debug!("read_excel_votes: lineno: {:?} row: {:?}", lineno, row);
            let mut cells: Vec<String> = vec![String::new(); col_offset];
            for elt in row.iter() {
                cells.push(read_cell(elt, lineno)?);
            }
            Ok(VoteRow { lineno, cells })
        });
    add_rows(rows, &columns, builder)
}

fn read_cell(cell: &DataType, lineno: usize) -> RunResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Empty => Ok(String::new()),
        // Numeric voter names come back as floats.
        DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Bool(b) => Ok(b.to_string()),
        _ => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}

fn get_range(path: &str, source: &VoteSource) -> RunResult<calamine::Range<DataType>> {
    debug!(
        "get_range: path: {:?} worksheet: {:?}",
        path, &source.excel_worksheet_name
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = source.excel_worksheet_name.as_ref() {
        workbook
            .worksheet_range(worksheet_name)
            .context(MissingWorksheetSnafu {
                name: worksheet_name.as_str(),
                path,
            })?
            .context(OpeningExcelSnafu { path })
    } else {
        workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })
    }
}
