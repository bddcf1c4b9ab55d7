/*!

This is the long-form manual for `rank_tally` and `ranktally`.

## Vote records

A tally is a set of tasks. Every task holds vote records: a vote key, as written
in a forum post, and the set of voters who wrote that exact line. The vote key
carries a rank marker and the content of the choice:

```text
[1] Build the tower
[2] Dig the moat
-[#3] Send a scout
```

The default notation takes the marker from the first pair of square brackets,
optionally preceded by dashes, and drops a `#` in front of the number. Any other
notation can be used by handing two functions to
[RankVoteCounter::with_parser](crate::RankVoteCounter::with_parser). A marker that
is not a non-negative integer fails the whole task with
[TallyError::MalformedBallot](crate::TallyError::MalformedBallot); the other tasks
are still counted.

## Counting methods

### `baldwin` (default)

For every position in the result, from the first one to the ninth one:
1. the choices that already won are removed from the ballots,
2. every ballot is completed with the choices the voter did not rank, at rank 10,
3. a choice that holds the first preference of a majority of voters
   (`voters / 2 + 1`) wins the position,
4. otherwise the choice with the worst scaled score is removed from all the
   ballots and the first preferences are counted again.

The scaled score is the sum of the ranks given to a choice, divided twice by the
number of ballots that rank it. A choice that few voters ranked is thus not
favoured over a choice that everybody ranked in the middle.

### `instantRunoff`

Same positions, but ballots are not completed: the choice with the fewest first
preferences is removed each time, and ballots without any remaining choice stop
counting.

## Ties

Ties are broken with a total order over the choices:
- `lexicographic` (default): by name. The first name wins a tie for the most
  votes, the last name loses a tie for the worst score.
- `random`: by a SHA-256 digest of the seed, the position and the name. The
  result is still reproducible with the same `randomSeed`.

## Input formats

### `json`

```text
{
  "tasks": {
    "Leader": [
      { "vote": "[1] Anna", "voters": ["u1", "u2"] },
      { "vote": "[1] Bob", "voters": ["u3"] }
    ]
  }
}
```

### `csv`

One line per voter and vote line. The columns are the task, the voter and the
vote key. The first row is a header by default.

```text
task,voter,vote
Leader,u1,[1] Anna
Leader,u1,[2] Bob
Leader,u3,[1] Bob
```

### `xlsx`

The same layout as `csv`, in an Excel worksheet (the first worksheet unless
`excelWorksheetName` is given).

## Configuration

```text
{
  "outputSettings": { "tallyName": "Weekly vote", "outputPath": "results.json" },
  "voteSources": [
    { "provider": "csv", "filePath": "votes.csv", "firstVoteRowIndex": 2,
      "taskColumnIndex": 1, "voterColumnIndex": 2, "voteColumnIndex": 3 }
  ],
  "rules": { "countingMethod": "baldwin", "tiebreakMode": "random",
             "randomSeed": "42", "maxWinners": 9, "parallel": true }
}
```

Indices start at 1 and may also be given as Excel column letters (`"A"`).
Paths are relative to the configuration file.

 */
