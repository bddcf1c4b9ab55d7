use std::collections::BTreeMap;
use std::fs;

use log::debug;
use rank_tally::builder::Builder;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::tally::*;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonRecord {
    vote: String,
    #[serde(default)]
    voters: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
struct JsonVotes {
    tasks: BTreeMap<String, Vec<JsonRecord>>,
}

/// Reads a file of vote records grouped by task. Tasks without any record are
/// still declared, so that they show up in the results.
pub fn read_json_votes(path: &str, builder: &mut Builder) -> RunResult<usize> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let votes: JsonVotes = serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    let mut count = 0;
    for (task, records) in votes.tasks.iter() {
        debug!("read_json_votes: task {:?}: {} records", task, records.len());
        builder.task(task).context(InvalidVotesSnafu { path })?;
        for record in records.iter() {
            builder
                .add_vote(task, &record.vote, &record.voters)
                .context(InvalidVotesSnafu { path })?;
            count += 1;
        }
    }
    Ok(count)
}
