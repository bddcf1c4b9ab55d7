/// Splits a vote key into its rank marker and its content.
///
/// Both functions must be pure: the same key always gives the same marker and
/// content. The marker is parsed as a rank afterwards, so a parser does not need
/// to validate it.
pub trait VoteKeyParser: Sync {
    fn vote_marker(&self, vote_key: &str) -> String;
    fn vote_content(&self, vote_key: &str) -> String;
}

/// Parser for the usual forum notation: `[1] Some choice`.
///
/// Leading dashes (plan lines) and a `#` in front of the number are accepted:
/// `-[#2] Some choice` has the marker `2` and the content `Some choice`.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct BracketMarker;

impl BracketMarker {
    fn split(vote_key: &str) -> Option<(&str, &str)> {
        let open = vote_key.find('[')?;
        if !vote_key[..open].chars().all(|c| c == '-' || c.is_whitespace()) {
            return None;
        }
        let close = open + vote_key[open..].find(']')?;
        Some((&vote_key[open + 1..close], &vote_key[close + 1..]))
    }
}

impl VoteKeyParser for BracketMarker {
    fn vote_marker(&self, vote_key: &str) -> String {
        match BracketMarker::split(vote_key) {
            Some((marker, _)) => {
                let m = marker.trim();
                m.strip_prefix('#').unwrap_or(m).trim().to_string()
            }
            None => String::new(),
        }
    }

    fn vote_content(&self, vote_key: &str) -> String {
        match BracketMarker::split(vote_key) {
            Some((_, content)) => content.trim().to_string(),
            None => vote_key.trim().to_string(),
        }
    }
}

/// Any pair of functions `(marker, content)` is a parser.
impl<M, C> VoteKeyParser for (M, C)
where
    M: Fn(&str) -> String + Sync,
    C: Fn(&str) -> String + Sync,
{
    fn vote_marker(&self, vote_key: &str) -> String {
        (self.0)(vote_key)
    }

    fn vote_content(&self, vote_key: &str) -> String {
        (self.1)(vote_key)
    }
}
