use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::tally::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "tallyName")]
    pub tally_name: String,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

/// The header of the summary.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "tallyName")]
    pub tally_name: String,
    #[serde(rename = "countingMethod")]
    pub counting_method: String,
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: String,
    #[serde(rename = "randomSeed", skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct VoteSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "firstVoteRowIndex")]
    pub _first_vote_row_index: Option<JSValue>,
    #[serde(rename = "taskColumnIndex")]
    pub _task_column_index: Option<JSValue>,
    #[serde(rename = "voterColumnIndex")]
    pub _voter_column_index: Option<JSValue>,
    #[serde(rename = "voteColumnIndex")]
    pub _vote_column_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl VoteSource {
    /// A source with all the default positions.
    pub fn new(provider: &str, file_path: &str) -> VoteSource {
        VoteSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            _first_vote_row_index: None,
            _task_column_index: None,
            _voter_column_index: None,
            _vote_column_index: None,
            excel_worksheet_name: None,
        }
    }

    // All the positions start at 1, like in a spreadsheet.

    pub fn first_vote_row_index(&self) -> RunResult<usize> {
        read_js_int_or(&self._first_vote_row_index, 2)
    }

    pub fn task_column_index(&self) -> RunResult<usize> {
        read_js_int_or(&self._task_column_index, 1)
    }

    pub fn voter_column_index(&self) -> RunResult<usize> {
        read_js_int_or(&self._voter_column_index, 2)
    }

    pub fn vote_column_index(&self) -> RunResult<usize> {
        read_js_int_or(&self._vote_column_index, 3)
    }

    /// The positions of the task, voter and vote columns.
    pub fn columns(&self) -> RunResult<RowColumns> {
        Ok(RowColumns {
            task: self.task_column_index()?,
            voter: self.voter_column_index()?,
            vote: self.vote_column_index()?,
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct RowColumns {
    pub task: usize,
    pub voter: usize,
    pub vote: usize,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigRules {
    #[serde(rename = "countingMethod")]
    pub counting_method: Option<String>,
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: Option<String>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<String>,
    #[serde(rename = "maxWinners")]
    pub max_winners: Option<u32>,
    pub parallel: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(rename = "outputSettings")]
    pub output_settings: OutputSettings,
    #[serde(rename = "voteSources")]
    pub vote_sources: Vec<VoteSource>,
    #[serde(default)]
    pub rules: ConfigRules,
}

pub fn read_config(path: &str) -> RunResult<TallyConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: TallyConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(config)
}

pub fn read_summary(path: &str) -> RunResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

fn read_js_int_or(x: &Option<JSValue>, default: usize) -> RunResult<usize> {
    match x {
        None | Some(JSValue::Null) => Ok(default),
        Some(_) => read_js_int(x),
    }
}

/// A positive index, given as a number, a string with a number or an
/// Excel-style column name.
pub(crate) fn read_js_int(x: &Option<JSValue>) -> RunResult<usize> {
    let value = format!("{:?}", x);
    let res = match x {
        Some(JSValue::Number(n)) => n.as_u64().map(|x| x as usize),
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => {
            s.to_ascii_uppercase().chars().try_fold(0_usize, |acc, c| {
                acc.checked_mul(26)?
                    .checked_add(c as usize - 'A' as usize + 1)
            })
        }
        Some(JSValue::String(s)) => s.parse::<usize>().ok(),
        _ => None,
    };
    match res {
        Some(idx) if idx > 0 => Ok(idx),
        _ => ParsingJsonNumberSnafu { value }.fail(),
    }
}
