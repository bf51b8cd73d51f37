//! Private memory of the film-curation agent.

use std::fmt::{self, Display};

/// Number of turns used as context for the film-curation agent.
pub const CONTEXT_TURNS: usize = 6;

/// Who said a line in the curator dialogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Speaker {
    /// The human.
    User,
    /// The film-curation agent.
    Curator,
}

impl Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => f.write_str("User"),
            Speaker::Curator => f.write_str("Curator"),
        }
    }
}

/// An append-only dialogue kept apart from the visible transcript.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct AgentHistory {
    turns: Vec<(Speaker, String)>,
}

impl AgentHistory {
    /// Appends a turn.
    #[inline]
    pub fn push<S: Into<String>>(&mut self, speaker: Speaker, text: S) {
        self.turns.push((speaker, text.into()));
    }

    /// Returns the last `k` turns, oldest first.
    #[inline]
    pub fn tail(&self, k: usize) -> &[(Speaker, String)] {
        let start = self.turns.len().saturating_sub(k);
        &self.turns[start..]
    }

    /// Removes every turn.
    #[inline]
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Returns the number of turns.
    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns `true` if no turn has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Renders the last [`CONTEXT_TURNS`] turns, followed by `pending`
    /// if given, as a labeled dialogue.
    ///
    /// `pending` takes part in the window without being recorded, so the
    /// caller can commit it only once the turn succeeded.
    pub fn render_dialogue(&self, pending: Option<(Speaker, &str)>) -> String {
        let keep = CONTEXT_TURNS - usize::from(pending.is_some());
        self.tail(keep)
            .iter()
            .map(|(speaker, text)| (*speaker, text.as_str()))
            .chain(pending)
            .map(|(speaker, text)| format!("{speaker}: {text}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail() {
        let mut history = AgentHistory::default();
        assert!(history.tail(6).is_empty());
        for i in 0..8 {
            history.push(Speaker::User, format!("turn {i}"));
        }
        let tail = history.tail(6);
        assert_eq!(tail.len(), 6);
        assert_eq!(tail[0].1, "turn 2");
        assert_eq!(tail[5].1, "turn 7");
    }

    #[test]
    fn test_render_dialogue_with_pending() {
        let mut history = AgentHistory::default();
        history.push(Speaker::Curator, "Did you like it?");
        assert_eq!(
            history.render_dialogue(Some((Speaker::User, "loved it"))),
            "Curator: Did you like it?\nUser: loved it"
        );
        // Pending turns are not recorded.
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_render_dialogue_window() {
        let mut history = AgentHistory::default();
        for i in 0..6 {
            history.push(Speaker::Curator, format!("q{i}"));
        }
        let rendered = history.render_dialogue(Some((Speaker::User, "a")));
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines.len(), CONTEXT_TURNS);
        assert_eq!(lines[0], "Curator: q1");
        assert_eq!(lines[5], "User: a");

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.render_dialogue(None), "");
    }
}
