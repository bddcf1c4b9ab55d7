use log::{debug, warn};
use snafu::ResultExt;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::*;
use crate::vote_key::VoteKeyParser;

fn parse_vote_key(
    task: &str,
    vote_key: &str,
    parser: &dyn VoteKeyParser,
) -> Result<RankedVote, TallyError> {
    let marker = parser.vote_marker(vote_key);
    let rank = marker.trim().parse::<u32>().context(MalformedBallotSnafu {
        task,
        vote_key,
        marker: marker.as_str(),
    })?;
    Ok(RankedVote {
        choice: parser.vote_content(vote_key).trim().to_string(),
        rank: Rank(rank),
    })
}

/// Builds the ballot of every voter of a task.
///
/// Voters come out sorted by name and each ballot is sorted by rank, then by
/// choice. If a voter ranked the same choice twice, only the best rank is kept.
pub fn group_by_voter_and_rank(
    task: &str,
    records: &[VoteRecord],
    parser: &dyn VoteKeyParser,
) -> Result<Vec<VoterRanking>, TallyError> {
    let mut by_voter: BTreeMap<&str, BTreeMap<String, Rank>> = BTreeMap::new();
    for record in records.iter() {
        let rv = parse_vote_key(task, &record.vote_key, parser)?;
        for voter in record.voters.iter() {
            let ranks = by_voter.entry(voter.as_str()).or_default();
            let rank = match ranks.get(&rv.choice) {
                Some(previous) => {
                    let best = std::cmp::min(*previous, rv.rank);
                    warn!(
                        "group_by_voter_and_rank: task {:?}: voter {:?} ranked {:?} twice, keeping rank {}",
                        task, voter, rv.choice, best.0
                    );
                    best
                }
                None => rv.rank,
            };
            ranks.insert(rv.choice.clone(), rank);
        }
    }

    let res: Vec<VoterRanking> = by_voter
        .into_iter()
        .map(|(voter, ranks)| {
            let mut ranked_votes: Vec<RankedVote> = ranks
                .into_iter()
                .map(|(choice, rank)| RankedVote { choice, rank })
                .collect();
            ranked_votes.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.choice.cmp(&b.choice)));
            VoterRanking {
                voter: voter.to_string(),
                ranked_votes,
            }
        })
        .collect();
    debug!(
        "group_by_voter_and_rank: task {:?}: {} records, {} voters",
        task,
        records.len(),
        res.len()
    );
    Ok(res)
}

/// For every choice of a task, the voters behind each rank, straight from the
/// vote records.
pub fn group_by_choice_and_rank(
    task: &str,
    records: &[VoteRecord],
    parser: &dyn VoteKeyParser,
) -> Result<Vec<ChoiceRanks>, TallyError> {
    let mut by_choice: BTreeMap<String, BTreeMap<Rank, BTreeSet<String>>> = BTreeMap::new();
    for record in records.iter() {
        let rv = parse_vote_key(task, &record.vote_key, parser)?;
        by_choice
            .entry(rv.choice)
            .or_default()
            .entry(rv.rank)
            .or_default()
            .extend(record.voters.iter().cloned());
    }
    Ok(into_choice_ranks(by_choice))
}

/// Same view as [group_by_choice_and_rank], rebuilt from voter ballots.
pub fn rankings_by_choice(rankings: &[VoterRanking]) -> Vec<ChoiceRanks> {
    let mut by_choice: BTreeMap<String, BTreeMap<Rank, BTreeSet<String>>> = BTreeMap::new();
    for vr in rankings.iter() {
        for rv in vr.ranked_votes.iter() {
            by_choice
                .entry(rv.choice.clone())
                .or_default()
                .entry(rv.rank)
                .or_default()
                .insert(vr.voter.clone());
        }
    }
    into_choice_ranks(by_choice)
}

fn into_choice_ranks(by_choice: BTreeMap<String, BTreeMap<Rank, BTreeSet<String>>>) -> Vec<ChoiceRanks> {
    by_choice
        .into_iter()
        .map(|(choice, ranks)| ChoiceRanks {
            choice,
            ranks: ranks
                .into_iter()
                .map(|(rank, voters)| RankedVoters { rank, voters })
                .collect(),
        })
        .collect()
}

/// All the distinct choices ranked by at least one voter.
pub fn choice_universe(rankings: &[VoterRanking]) -> BTreeSet<String> {
    rankings
        .iter()
        .flat_map(|vr| vr.ranked_votes.iter().map(|rv| rv.choice.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vote_key::BracketMarker;

    fn voters(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn records() -> Vec<VoteRecord> {
        vec![
            VoteRecord::new("[1] X", &["A", "B"]),
            VoteRecord::new("[2] Y", &["A", "B"]),
            VoteRecord::new("[1] Y", &["C"]),
            VoteRecord::new("[2] X", &["C"]),
        ]
    }

    #[test]
    fn voter_major() {
        let res = group_by_voter_and_rank("t", &records(), &BracketMarker).unwrap();
        assert_eq!(res.len(), 3);
        assert_eq!(res[0].voter, "A");
        assert_eq!(
            res[0].ranked_votes,
            vec![
                RankedVote {
                    choice: "X".to_string(),
                    rank: Rank(1)
                },
                RankedVote {
                    choice: "Y".to_string(),
                    rank: Rank(2)
                },
            ]
        );
        assert_eq!(res[2].voter, "C");
        assert_eq!(res[2].ranked_votes[0].choice, "Y");
    }

    #[test]
    fn voter_major_sorts_by_rank() {
        let recs = vec![
            VoteRecord::new("[3] C", &["A"]),
            VoteRecord::new("[1] B", &["A"]),
            VoteRecord::new("[2] A", &["A"]),
        ];
        let res = group_by_voter_and_rank("t", &recs, &BracketMarker).unwrap();
        let order: Vec<&str> = res[0].ranked_votes.iter().map(|rv| rv.choice.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
    }

    #[test]
    fn duplicate_choice_keeps_best_rank() {
        let recs = vec![
            VoteRecord::new("[3] X", &["A"]),
            VoteRecord::new("[1] X", &["A"]),
            VoteRecord::new("[2] X", &["A"]),
        ];
        let res = group_by_voter_and_rank("t", &recs, &BracketMarker).unwrap();
        assert_eq!(
            res[0].ranked_votes,
            vec![RankedVote {
                choice: "X".to_string(),
                rank: Rank(1)
            }]
        );
    }

    #[test]
    fn malformed_marker() {
        let recs = vec![
            VoteRecord::new("[1] X", &["A"]),
            VoteRecord::new("[x] Y", &["A"]),
        ];
        let err = group_by_voter_and_rank("t", &recs, &BracketMarker).unwrap_err();
        match err {
            TallyError::MalformedBallot {
                task,
                vote_key,
                marker,
                ..
            } => {
                assert_eq!(task, "t");
                assert_eq!(vote_key, "[x] Y");
                assert_eq!(marker, "x");
            }
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn negative_marker_is_malformed() {
        let recs = vec![VoteRecord::new("[-1] X", &["A"])];
        assert!(matches!(
            group_by_choice_and_rank("t", &recs, &BracketMarker),
            Err(TallyError::MalformedBallot { .. })
        ));
    }

    #[test]
    fn content_major() {
        let res = group_by_choice_and_rank("t", &records(), &BracketMarker).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].choice, "X");
        assert_eq!(res[0].ranks[0].rank, Rank(1));
        assert_eq!(res[0].ranks[0].voters, voters(&["A", "B"]));
        assert_eq!(res[0].ranks[1].rank, Rank(2));
        assert_eq!(res[0].ranks[1].voters, voters(&["C"]));
    }

    #[test]
    fn content_major_from_rankings_agrees() {
        let rankings = group_by_voter_and_rank("t", &records(), &BracketMarker).unwrap();
        assert_eq!(
            rankings_by_choice(&rankings),
            group_by_choice_and_rank("t", &records(), &BracketMarker).unwrap()
        );
    }

    #[test]
    fn universe() {
        let recs = vec![
            VoteRecord::new("[1] X", &["A"]),
            VoteRecord::new("[1] Z", &["B"]),
            VoteRecord::new("[2] Y", &["B"]),
            VoteRecord::new("[1] W", &[]),
        ];
        let rankings = group_by_voter_and_rank("t", &recs, &BracketMarker).unwrap();
        let u: Vec<String> = choice_universe(&rankings).into_iter().collect();
        // W has no voter, so nobody references it.
        assert_eq!(u, vec!["X", "Y", "Z"]);
    }
}
