use log::debug;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::*;
use crate::counting::*;
use crate::ordering::ChoiceOrder;

/// Average rank of a choice, divided once more by the number of ballots that
/// rank it. Higher is worse.
///
/// Compared as an exact fraction: total / occurrences².
#[derive(Debug, Clone, Copy)]
struct ScaledScore {
    rank_total: u64,
    occurrences: u64,
}

impl ScaledScore {
    const EMPTY: ScaledScore = ScaledScore {
        rank_total: 0,
        occurrences: 0,
    };
}

impl Ord for ScaledScore {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.rank_total as u128 * (other.occurrences as u128).pow(2);
        let rhs = other.rank_total as u128 * (self.occurrences as u128).pow(2);
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for ScaledScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScaledScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScaledScore {}

fn scaled_scores(rankings: &[VoterRanking]) -> BTreeMap<String, ScaledScore> {
    let mut scores: BTreeMap<String, ScaledScore> = BTreeMap::new();
    for vr in rankings.iter() {
        for rv in vr.ranked_votes.iter() {
            let s = scores
                .entry(rv.choice.clone())
                .or_insert(ScaledScore::EMPTY);
            s.rank_total += rv.rank.0 as u64;
            s.occurrences += 1;
        }
    }
    scores
}

/// The choice to eliminate: the one with the worst scaled score.
/// Ties go to the choice that comes last in the order.
fn least_preferred_choice(rankings: &[VoterRanking], order: &ChoiceOrder) -> Option<String> {
    let scores = scaled_scores(rankings);
    debug!("least_preferred_choice: scores: {:?}", scores);
    scores
        .into_iter()
        .max_by(|(c1, s1), (c2, s2)| s1.cmp(s2).then_with(|| order.compare(c1, c2)))
        .map(|(c, _)| c)
}

/// Runs the eliminations until one choice holds a majority of the first
/// preferences, or until no ballot can transfer anymore.
fn winning_choice(
    rankings: &[VoterRanking],
    chosen: &[String],
    all_choices: &BTreeSet<String>,
    order: &ChoiceOrder,
    position: u32,
) -> SelectionRound {
    let local = remove_choices(rankings, chosen, order);
    let mut local = pad_unranked(&local, all_choices, order);

    let vote_threshold = win_count(local.len());
    debug!(
        "winning_choice: position {}: {} ballots, vote_threshold: {:?}",
        position,
        local.len(),
        vote_threshold
    );

    let mut eliminated: Vec<String> = Vec::new();
    loop {
        let tally = preferred_counts(&local);
        debug!("winning_choice: tally: {:?}", tally);

        let winner = match best_choice(&tally, order) {
            None => None,
            Some((best, count)) if count >= vote_threshold => Some(best),
            // No elimination can move a lower preference up anymore.
            Some((best, _)) if !local.iter().any(|vr| vr.ranked_votes.len() > 1) => Some(best),
            Some(_) => {
                if let Some(worst) = least_preferred_choice(&local, order) {
                    debug!("winning_choice: eliminating {:?}", worst);
                    local = remove_choice(&local, &worst);
                    eliminated.push(worst);
                    continue;
                }
                None
            }
        };
        return SelectionRound {
            position,
            threshold: vote_threshold.0,
            eliminated,
            tally: tally_stats(&tally, order),
            winner,
        };
    }
}

/// Ranks the choices of one task with repeated Baldwin runoffs.
///
/// Every winner is removed from the ballots before the runoff for the next
/// position starts.
pub(crate) fn rank_task(rankings: &[VoterRanking], rules: &TallyRules) -> TaskResult {
    let mut all_choices = crate::grouping::choice_universe(rankings);
    let mut res = TaskResult::default();
    if rankings.is_empty() {
        return res;
    }

    for position in 1..=rules.max_winners {
        let order = ChoiceOrder::new(rules.tiebreak_mode, position);
        let round = winning_choice(rankings, &res.winners, &all_choices, &order, position);
        let winner = round.winner.clone();
        res.rounds.push(round);

        match winner {
            None => break,
            Some(w) => {
                debug!("rank_task: position {}: {:?}", position, w);
                all_choices.remove(&w);
                res.winners.push(w);
            }
        }
        if all_choices.is_empty() {
            break;
        }
    }
    res
}
