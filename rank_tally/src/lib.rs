mod baldwin;
pub mod builder;
mod config;
mod counting;
mod grouping;
pub mod manual;
mod ordering;
mod runoff;
mod vote_key;

use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;

pub use crate::config::*;
pub use crate::grouping::{
    choice_universe, group_by_choice_and_rank, group_by_voter_and_rank, rankings_by_choice,
};
pub use crate::vote_key::{BracketMarker, VoteKeyParser};

/// Counts ranked votes, task by task.
///
/// A counter holds no state between calls: build one per tally run and hand
/// it to whoever needs it.
///
/// ```
/// use rank_tally::{RankVoteCounter, TallyInput, TallyRules, VoteRecord};
/// # use rank_tally::TallyError;
///
/// let mut input = TallyInput::default();
/// input.tasks.insert(
///     "Leader".to_string(),
///     vec![
///         VoteRecord::new("[1] Anna", &["u1", "u2"]),
///         VoteRecord::new("[2] Bob", &["u1", "u2"]),
///         VoteRecord::new("[1] Bob", &["u3"]),
///     ],
/// );
///
/// let counter = RankVoteCounter::new(&TallyRules::DEFAULT_RULES)?;
/// let outcome = counter.count(&input);
/// assert_eq!(outcome.winners()["Leader"], vec!["Anna", "Bob"]);
/// # Ok::<(), TallyError>(())
/// ```
pub struct RankVoteCounter<P: VoteKeyParser = BracketMarker> {
    rules: TallyRules,
    parser: P,
}

impl RankVoteCounter<BracketMarker> {
    pub fn new(rules: &TallyRules) -> Result<RankVoteCounter<BracketMarker>, TallyError> {
        RankVoteCounter::with_parser(rules, BracketMarker)
    }
}

impl<P: VoteKeyParser> RankVoteCounter<P> {
    /// Uses the given functions to split the vote keys into rank markers and
    /// choices.
    pub fn with_parser(rules: &TallyRules, parser: P) -> Result<RankVoteCounter<P>, TallyError> {
        rules.validate()?;
        Ok(RankVoteCounter {
            rules: rules.clone(),
            parser,
        })
    }

    pub fn rules(&self) -> &TallyRules {
        &self.rules
    }

    /// Ranks a single task of the input.
    pub fn rank_task(&self, input: &TallyInput, task: &str) -> Result<TaskResult, TallyError> {
        match input.tasks.get(task) {
            Some(records) => self.rank_records(task, records),
            None => InvalidTaskSnafu { task }.fail(),
        }
    }

    /// Ranks the given vote records, which all belong to `task`.
    pub fn rank_records(&self, task: &str, records: &[VoteRecord]) -> Result<TaskResult, TallyError> {
        info!(
            "Processing task {:?}: {} vote records, rules: {:?}",
            task,
            records.len(),
            self.rules
        );
        let rankings = group_by_voter_and_rank(task, records, &self.parser)?;
        if rankings.is_empty() {
            info!("Task {:?}: no voters", task);
            return Ok(TaskResult::default());
        }
        let res = match self.rules.counting_method {
            CountingMethod::Baldwin => baldwin::rank_task(&rankings, &self.rules),
            CountingMethod::InstantRunoff => runoff::rank_task(&rankings, &self.rules),
        };
        for round in res.rounds.iter() {
            debug!(
                "Task {:?}: position {} (winning threshold: {}): eliminated {:?}, winner {:?}",
                task, round.position, round.threshold, round.eliminated, round.winner
            );
        }
        info!("Task {:?}: winners: {:?}", task, res.winners);
        Ok(res)
    }

    /// Ranks every task of the input. A task that fails does not prevent the
    /// other ones from being counted.
    pub fn count(&self, input: &TallyInput) -> TallyOutcome {
        info!(
            "Counting {} tasks with {:?}",
            input.tasks.len(),
            self.rules.counting_method
        );
        let results: BTreeMap<String, Result<TaskResult, TallyError>> = if self.rules.parallel {
            input
                .tasks
                .par_iter()
                .map(|(task, records)| (task.clone(), self.rank_records(task, records)))
                .collect()
        } else {
            input
                .tasks
                .iter()
                .map(|(task, records)| (task.clone(), self.rank_records(task, records)))
                .collect()
        };
        for (task, res) in results.iter() {
            if let Err(e) = res {
                warn!("Task {:?} could not be counted: {}", task, e);
            }
        }
        TallyOutcome { results }
    }
}
