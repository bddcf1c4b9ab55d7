pub use crate::config::*;
use crate::RankVoteCounter;

use std::collections::{BTreeMap, BTreeSet};

/// A builder for collecting vote records one at a time.
///
/// Records with the same task and vote key are merged into one record.
///
/// ```
/// pub use rank_tally::builder::Builder;
/// pub use rank_tally::TallyRules;
/// # use rank_tally::TallyError;
///
/// let mut builder = Builder::new(&TallyRules::DEFAULT_RULES)?;
///
/// builder.add_vote_simple("Leader", "alice", "[1] Anna")?;
/// builder.add_vote_simple("Leader", "alice", "[2] Bob")?;
/// builder.add_vote("Leader", "[1] Bob", &["bob".to_string()])?;
///
/// let outcome = builder.count()?;
/// assert_eq!(outcome.winners()["Leader"].len(), 2);
///
/// # Ok::<(), TallyError>(())
/// ```
pub struct Builder {
    pub(crate) _rules: TallyRules,
    pub(crate) _tasks: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
}

impl Builder {
    pub fn new(rules: &TallyRules) -> Result<Builder, TallyError> {
        rules.validate()?;
        Ok(Builder {
            _rules: rules.clone(),
            _tasks: BTreeMap::new(),
        })
    }

    /// Declares a task, even if it ends up without any vote.
    pub fn task(&mut self, task: &str) -> Result<(), TallyError> {
        if task.trim().is_empty() {
            return InvalidTaskSnafu { task }.fail();
        }
        self._tasks.entry(task.to_string()).or_default();
        Ok(())
    }

    /// Adds one voter's vote line.
    ///
    /// It is the simplest use case for most cases.
    pub fn add_vote_simple(&mut self, task: &str, voter: &str, vote_key: &str) -> Result<(), TallyError> {
        self.add_vote(task, vote_key, &[voter.to_string()])
    }

    /// Adds a vote line along with all the voters who support it.
    pub fn add_vote(&mut self, task: &str, vote_key: &str, voters: &[String]) -> Result<(), TallyError> {
        self.task(task)?;
        self._tasks
            .entry(task.to_string())
            .or_default()
            .entry(vote_key.to_string())
            .or_default()
            .extend(voters.iter().cloned());
        Ok(())
    }

    pub fn add_record(&mut self, task: &str, record: &VoteRecord) -> Result<(), TallyError> {
        self.task(task)?;
        self._tasks
            .entry(task.to_string())
            .or_default()
            .entry(record.vote_key.clone())
            .or_default()
            .extend(record.voters.iter().cloned());
        Ok(())
    }

    pub fn rules(&self) -> &TallyRules {
        &self._rules
    }

    /// The collected records. Records of a task come sorted by vote key.
    pub fn input(&self) -> TallyInput {
        TallyInput {
            tasks: self
                ._tasks
                .iter()
                .map(|(task, votes)| {
                    let records: Vec<VoteRecord> = votes
                        .iter()
                        .map(|(vote_key, voters)| VoteRecord {
                            vote_key: vote_key.clone(),
                            voters: voters.clone(),
                        })
                        .collect();
                    (task.clone(), records)
                })
                .collect(),
        }
    }

    /// Counts the collected records with the default vote key notation.
    pub fn count(&self) -> Result<TallyOutcome, TallyError> {
        let counter = RankVoteCounter::new(&self._rules)?;
        Ok(counter.count(&self.input()))
    }
}
