// ********* Input data structures ***********

use snafu::Snafu;
use std::collections::{BTreeMap, BTreeSet};
use std::num::ParseIntError;

/// The rank a voter gave to a choice. 1 is the most preferred.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct Rank(pub u32);

impl Rank {
    /// Rank given to every choice that a voter did not rank explicitly.
    pub const UNRANKED: Rank = Rank(10);
}

/// One raw vote line, as produced by the forum parser: the full vote key
/// (rank marker and content) and all the voters who wrote that exact line.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteRecord {
    pub vote_key: String,
    pub voters: BTreeSet<String>,
}

impl VoteRecord {
    pub fn new(vote_key: &str, voters: &[&str]) -> VoteRecord {
        VoteRecord {
            vote_key: vote_key.to_string(),
            voters: voters.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// All the vote records of a tally, grouped by task.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct TallyInput {
    pub tasks: BTreeMap<String, Vec<VoteRecord>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct RankedVote {
    pub choice: String,
    pub rank: Rank,
}

/// The ballot of a single voter.
///
/// Invariant: a choice appears at most once in `ranked_votes`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoterRanking {
    pub voter: String,
    pub ranked_votes: Vec<RankedVote>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RankedVoters {
    pub rank: Rank,
    pub voters: BTreeSet<String>,
}

/// For one choice, the voters who placed it at each rank.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ChoiceRanks {
    pub choice: String,
    pub ranks: Vec<RankedVoters>,
}

// ******** Output data structures *********

/// Statistics for the selection of one winner.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SelectionRound {
    /// The position in the winner list this round was filling (starting at 1).
    pub position: u32,
    /// Number of first preferences needed for a majority.
    pub threshold: u64,
    /// Choices removed during this round, in elimination order.
    pub eliminated: Vec<String>,
    /// First preference counts when the round ended.
    pub tally: Vec<(String, u64)>,
    pub winner: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct TaskResult {
    pub winners: Vec<String>,
    pub rounds: Vec<SelectionRound>,
}

/// The outcome of a full tally. Every task succeeds or fails on its own.
#[derive(Debug, Default)]
pub struct TallyOutcome {
    pub results: BTreeMap<String, Result<TaskResult, TallyError>>,
}

impl TallyOutcome {
    /// The winner lists of all the tasks that could be counted.
    pub fn winners(&self) -> BTreeMap<String, Vec<String>> {
        self.results
            .iter()
            .filter_map(|(task, res)| match res {
                Ok(tr) => Some((task.clone(), tr.winners.clone())),
                Err(_) => None,
            })
            .collect()
    }

    pub fn failures(&self) -> BTreeMap<String, &TallyError> {
        self.results
            .iter()
            .filter_map(|(task, res)| match res {
                Ok(_) => None,
                Err(e) => Some((task.clone(), e)),
            })
            .collect()
    }
}

/// Errors that prevent a task from being counted.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TallyError {
    #[snafu(display(
        "Malformed ballot in task {task:?}: rank marker {marker:?} of vote {vote_key:?} is not a number"
    ))]
    MalformedBallot {
        task: String,
        vote_key: String,
        marker: String,
        source: ParseIntError,
    },
    #[snafu(display("Invalid task {task:?}"))]
    InvalidTask { task: String },
    #[snafu(display("Invalid counting rules: {message}"))]
    InvalidRules { message: String },
}

// ********* Configuration **********

/// How ties between choices are resolved.
///
/// Whatever the mode, the order is total and only depends on the choice names,
/// so identical inputs always produce identical results.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// Choices are ordered by name.
    Lexicographic,
    /// Choices are ordered by a hash of the seed, the winner position and the
    /// name. The order is hard to guess in advance but reproducible.
    Random(u32),
}

/// The strategy used to select one winner from a set of rankings.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CountingMethod {
    /// Eliminates the choice with the worst occurrence-scaled average rank
    /// until one choice holds a majority of first preferences.
    Baldwin,
    /// Eliminates the choice with the fewest first preferences.
    InstantRunoff,
}

/// The domain never needs more than this many ranked results.
pub const MAX_WINNERS: u32 = 9;

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyRules {
    pub counting_method: CountingMethod,
    pub tiebreak_mode: TieBreakMode,
    pub max_winners: u32,
    /// Count the tasks on the rayon thread pool.
    pub parallel: bool,
}

impl TallyRules {
    pub const DEFAULT_RULES: TallyRules = TallyRules {
        counting_method: CountingMethod::Baldwin,
        tiebreak_mode: TieBreakMode::Lexicographic,
        max_winners: MAX_WINNERS,
        parallel: false,
    };

    pub fn validate(&self) -> Result<(), TallyError> {
        if self.max_winners == 0 || self.max_winners > MAX_WINNERS {
            return InvalidRulesSnafu {
                message: format!(
                    "max_winners must be between 1 and {}, got {}",
                    MAX_WINNERS, self.max_winners
                ),
            }
            .fail();
        }
        Ok(())
    }
}

impl Default for TallyRules {
    fn default() -> Self {
        TallyRules::DEFAULT_RULES
    }
}
