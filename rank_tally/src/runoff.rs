use log::debug;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::*;
use crate::counting::*;
use crate::ordering::ChoiceOrder;

// The choice with the fewest first preferences. Ties go to the choice that
// comes last in the order.
fn fewest_first_preferences(
    tally: &BTreeMap<String, VoteCount>,
    order: &ChoiceOrder,
) -> Option<String> {
    tally
        .iter()
        .min_by(|(c1, vc1), (c2, vc2)| vc1.cmp(vc2).then_with(|| order.compare(c2, c1)))
        .map(|(c, _)| c.clone())
}

fn winning_choice(
    rankings: &[VoterRanking],
    chosen: &[String],
    all_choices: &BTreeSet<String>,
    order: &ChoiceOrder,
    position: u32,
) -> SelectionRound {
    let mut local = remove_choices(rankings, chosen, order);
    let mut continuing: BTreeSet<String> = all_choices.clone();
    let mut eliminated: Vec<String> = Vec::new();

    loop {
        // Choices without any first preference still take part in the tally.
        let mut tally: BTreeMap<String, VoteCount> = continuing
            .iter()
            .map(|c| (c.clone(), VoteCount::EMPTY))
            .collect();
        for (c, vc) in preferred_counts(&local) {
            tally.insert(c, vc);
        }
        let active: VoteCount = tally.values().cloned().sum();
        let vote_threshold = win_count(active.0 as usize);
        debug!(
            "winning_choice: position {}: tally {:?}, vote_threshold: {:?}",
            position, tally, vote_threshold
        );

        let winner = match best_choice(&tally, order) {
            None => None,
            Some((best, _)) if tally.len() == 1 => Some(best),
            Some((best, count)) if count >= vote_threshold => Some(best),
            Some(_) => {
                if let Some(worst) = fewest_first_preferences(&tally, order) {
                    debug!("winning_choice: eliminating {:?}", worst);
                    local = remove_choice(&local, &worst);
                    continuing.remove(&worst);
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

/// Ranks the choices of one task with repeated instant runoffs.
///
/// Ballots are not padded: a ballot whose choices are all eliminated stops
/// counting for the rest of the runoff.
pub(crate) fn rank_task(rankings: &[VoterRanking], rules: &TallyRules) -> TaskResult {
    let mut all_choices = crate::grouping::choice_universe(rankings);
    let mut res = TaskResult::default();

    for position in 1..=rules.max_winners {
        if all_choices.is_empty() {
            break;
        }
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
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counting::tests::ballot;

    #[test]
    fn eliminates_fewest_first_preferences() {
        // X 2, Y 2, Z 1: Z goes and its voter moves to Y.
        let rankings = vec![
            ballot("A", &[("X", 1), ("Y", 2)]),
            ballot("B", &[("X", 1)]),
            ballot("C", &[("Y", 1)]),
            ballot("D", &[("Y", 1)]),
            ballot("E", &[("Z", 1), ("Y", 2)]),
        ];
        let res = rank_task(&rankings, &TallyRules::DEFAULT_RULES);
        assert_eq!(res.rounds[0].eliminated, vec!["Z".to_string()]);
        assert_eq!(res.winners[0], "Y");
    }

    #[test]
    fn zero_count_choices_go_first() {
        // W is only ever ranked second, so it has no first preference.
        let rankings = vec![
            ballot("A", &[("X", 1), ("W", 2)]),
            ballot("B", &[("Y", 1), ("W", 2)]),
            ballot("C", &[("Z", 1), ("W", 2)]),
        ];
        let res = rank_task(&rankings, &TallyRules::DEFAULT_RULES);
        assert_eq!(res.rounds[0].eliminated[0], "W");
    }

    #[test]
    fn exhausted_ballots_lower_the_threshold() {
        // Y and W tie with one vote: W comes first, Y is eliminated.
        // The ballot of C is then exhausted: X 2 against W 1, with 3 active
        // ballots.
        let rankings = vec![
            ballot("A", &[("X", 1)]),
            ballot("B", &[("X", 1)]),
            ballot("C", &[("Y", 1)]),
            ballot("D", &[("W", 1)]),
        ];
        let res = rank_task(&rankings, &TallyRules::DEFAULT_RULES);
        assert_eq!(res.rounds[0].eliminated, vec!["Y".to_string()]);
        assert_eq!(res.rounds[0].winner, Some("X".to_string()));
        assert_eq!(res.rounds[0].threshold, 2);
        assert_eq!(
            res.winners,
            vec!["X".to_string(), "W".to_string(), "Y".to_string()]
        );
    }

    #[test]
    fn no_voters() {
        assert!(rank_task(&[], &TallyRules::DEFAULT_RULES).winners.is_empty());
    }
}
