// Building blocks shared by the counting methods.
// All the functions are pure: ballots are copied, never modified in place.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::AddAssign;

use crate::config::*;
use crate::ordering::ChoiceOrder;

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
pub(crate) struct VoteCount(pub(crate) u64);

impl VoteCount {
    pub(crate) const EMPTY: VoteCount = VoteCount(0);
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

/// Number of first preferences needed for a majority.
pub(crate) fn win_count(voter_count: usize) -> VoteCount {
    VoteCount((voter_count as u64 / 2) + 1)
}

fn sort_ballot(ranked_votes: &mut [RankedVote], order: &ChoiceOrder) {
    ranked_votes.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then_with(|| order.compare(&a.choice, &b.choice))
    });
}

/// Copies the ballots without the choices that already won a position.
/// Each ballot is sorted again by rank.
pub(crate) fn remove_choices(
    rankings: &[VoterRanking],
    chosen: &[String],
    order: &ChoiceOrder,
) -> Vec<VoterRanking> {
    rankings
        .iter()
        .map(|vr| {
            let mut ranked_votes: Vec<RankedVote> = vr
                .ranked_votes
                .iter()
                .filter(|rv| !chosen.contains(&rv.choice))
                .cloned()
                .collect();
            sort_ballot(&mut ranked_votes, order);
            VoterRanking {
                voter: vr.voter.clone(),
                ranked_votes,
            }
        })
        .collect()
}

/// Removes one choice from every ballot.
pub(crate) fn remove_choice(rankings: &[VoterRanking], choice: &str) -> Vec<VoterRanking> {
    rankings
        .iter()
        .map(|vr| VoterRanking {
            voter: vr.voter.clone(),
            ranked_votes: vr
                .ranked_votes
                .iter()
                .filter(|rv| rv.choice != choice)
                .cloned()
                .collect(),
        })
        .collect()
}

/// Completes every ballot with the choices the voter did not rank, at the
/// unranked rank.
pub(crate) fn pad_unranked(
    rankings: &[VoterRanking],
    all_choices: &BTreeSet<String>,
    order: &ChoiceOrder,
) -> Vec<VoterRanking> {
    rankings
        .iter()
        .map(|vr| {
            let mut ranked_votes = vr.ranked_votes.clone();
            if ranked_votes.len() != all_choices.len() {
                let ranked: BTreeSet<&str> =
                    vr.ranked_votes.iter().map(|rv| rv.choice.as_str()).collect();
                for extra in all_choices.iter().filter(|c| !ranked.contains(c.as_str())) {
                    ranked_votes.push(RankedVote {
                        choice: extra.clone(),
                        rank: Rank::UNRANKED,
                    });
                }
                sort_ballot(&mut ranked_votes, order);
            }
            VoterRanking {
                voter: vr.voter.clone(),
                ranked_votes,
            }
        })
        .collect()
}

/// Number of ballots that put each choice first. Exhausted ballots are skipped.
pub(crate) fn preferred_counts(rankings: &[VoterRanking]) -> BTreeMap<String, VoteCount> {
    let mut tally: BTreeMap<String, VoteCount> = BTreeMap::new();
    for vr in rankings.iter() {
        if let Some(first) = vr.ranked_votes.first() {
            *tally.entry(first.choice.clone()).or_insert(VoteCount::EMPTY) += VoteCount(1);
        }
    }
    tally
}

/// The choice with the most first preferences. Ties go to the choice that
/// comes first in the order.
pub(crate) fn best_choice(
    tally: &BTreeMap<String, VoteCount>,
    order: &ChoiceOrder,
) -> Option<(String, VoteCount)> {
    tally
        .iter()
        .max_by(|(c1, vc1), (c2, vc2)| vc1.cmp(vc2).then_with(|| order.compare(c2, c1)))
        .map(|(c, vc)| (c.clone(), *vc))
}

/// The tally in the order of the choices, for reporting.
pub(crate) fn tally_stats(
    tally: &BTreeMap<String, VoteCount>,
    order: &ChoiceOrder,
) -> Vec<(String, u64)> {
    let mut res: Vec<(String, u64)> = tally.iter().map(|(c, vc)| (c.clone(), vc.0)).collect();
    res.sort_by(|(c1, _), (c2, _)| order.compare(c1, c2));
    res
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::TieBreakMode;

    pub(crate) fn ballot(voter: &str, ranks: &[(&str, u32)]) -> VoterRanking {
        VoterRanking {
            voter: voter.to_string(),
            ranked_votes: ranks
                .iter()
                .map(|(c, r)| RankedVote {
                    choice: c.to_string(),
                    rank: Rank(*r),
                })
                .collect(),
        }
    }

    fn choices(vr: &VoterRanking) -> Vec<(&str, u32)> {
        vr.ranked_votes
            .iter()
            .map(|rv| (rv.choice.as_str(), rv.rank.0))
            .collect()
    }

    fn lex() -> ChoiceOrder {
        ChoiceOrder::new(TieBreakMode::Lexicographic, 1)
    }

    #[test]
    fn thresholds() {
        assert_eq!(win_count(0), VoteCount(1));
        assert_eq!(win_count(1), VoteCount(1));
        assert_eq!(win_count(3), VoteCount(2));
        assert_eq!(win_count(4), VoteCount(3));
    }

    #[test]
    fn remove_chosen_and_resort() {
        let rankings = vec![ballot("A", &[("Z", 3), ("X", 1), ("Y", 2)])];
        let res = remove_choices(&rankings, &["X".to_string()], &lex());
        assert_eq!(choices(&res[0]), vec![("Y", 2), ("Z", 3)]);
        // The input is untouched.
        assert_eq!(rankings[0].ranked_votes.len(), 3);
    }

    #[test]
    fn padding_adds_every_missing_choice_once() {
        let all: BTreeSet<String> = ["W", "X", "Y", "Z"].iter().map(|s| s.to_string()).collect();
        let rankings = vec![
            ballot("A", &[("Y", 1)]),
            ballot("B", &[("X", 1), ("W", 2), ("Z", 3), ("Y", 4)]),
            ballot("C", &[]),
        ];
        let res = pad_unranked(&rankings, &all, &lex());
        assert_eq!(
            choices(&res[0]),
            vec![("Y", 1), ("W", 10), ("X", 10), ("Z", 10)]
        );
        assert_eq!(choices(&res[1]), choices(&rankings[1]));
        for vr in res.iter() {
            let seen: BTreeSet<String> = vr.ranked_votes.iter().map(|rv| rv.choice.clone()).collect();
            assert_eq!(seen, all);
            assert_eq!(vr.ranked_votes.len(), all.len());
        }
    }

    #[test]
    fn padding_sorts_after_explicit_low_ranks() {
        let all: BTreeSet<String> = ["X", "Y"].iter().map(|s| s.to_string()).collect();
        let rankings = vec![ballot("A", &[("X", 12)])];
        let res = pad_unranked(&rankings, &all, &lex());
        assert_eq!(choices(&res[0]), vec![("Y", 10), ("X", 12)]);
    }

    #[test]
    fn first_preferences() {
        let rankings = vec![
            ballot("A", &[("X", 1), ("Y", 2)]),
            ballot("B", &[("X", 1)]),
            ballot("C", &[("Y", 1)]),
            ballot("D", &[]),
        ];
        let tally = preferred_counts(&rankings);
        assert_eq!(tally.get("X"), Some(&VoteCount(2)));
        assert_eq!(tally.get("Y"), Some(&VoteCount(1)));
        assert_eq!(tally.len(), 2);
    }

    #[test]
    fn best_choice_ties_use_order() {
        let mut tally = BTreeMap::new();
        tally.insert("B".to_string(), VoteCount(2));
        tally.insert("A".to_string(), VoteCount(2));
        tally.insert("C".to_string(), VoteCount(1));
        assert_eq!(
            best_choice(&tally, &lex()),
            Some(("A".to_string(), VoteCount(2)))
        );
        assert_eq!(best_choice(&BTreeMap::new(), &lex()), None);
    }

    #[test]
    fn remove_one_choice() {
        let rankings = vec![ballot("A", &[("X", 1), ("Y", 2)]), ballot("B", &[("Y", 1)])];
        let res = remove_choice(&rankings, "Y");
        assert_eq!(choices(&res[0]), vec![("X", 1)]);
        assert!(res[1].ranked_votes.is_empty());
    }
}
