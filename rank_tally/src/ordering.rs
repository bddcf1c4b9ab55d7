use std::cmp::Ordering;

use crate::config::TieBreakMode;

/// A total order over the choices of a task, used to break every tie.
///
/// Winners are picked from the front of the order and losers from the back.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub(crate) struct ChoiceOrder {
    mode: TieBreakMode,
    position: u32,
}

impl ChoiceOrder {
    /// The order used when selecting the winner at the given position.
    pub(crate) fn new(mode: TieBreakMode, position: u32) -> ChoiceOrder {
        ChoiceOrder { mode, position }
    }

    fn sort_key(&self, choice: &str) -> Option<String> {
        match self.mode {
            TieBreakMode::Lexicographic => None,
            // Unpredictable, but stable for a given seed and position.
            TieBreakMode::Random(seed) => Some(sha256::digest(
                format!("{:08}{:08}{}", seed, self.position, choice).as_str(),
            )),
        }
    }

    pub(crate) fn compare(&self, a: &str, b: &str) -> Ordering {
        self.sort_key(a)
            .cmp(&self.sort_key(b))
            .then_with(|| a.cmp(b))
    }
}
