use crate::signal::{Signal, SignalSet};

pub const GREETING: &str = "\
Hi! I'll put together a perfect 10-track playlist for you.
Tell me which genres and moods you like, a few favorite artists, the vocal \
language and the tempo (calm or energetic).
Once I know enough, I'll send the final NUMBERED list \"Artist — Song\".";

pub const MUSIC_SYSTEM_PROMPT: &str = "\
You are a music editor and an expert in picking tracks.
Our goal is to build the user a perfect playlist of 10 songs.

Rules:
1) First learn the user's taste (genres, artists, mood, language, tempo). \
After each answer ask exactly one clarifying question while the information \
is not sufficient.
2) When you know enough, reply strictly with a NUMBERED list of 10 lines:
   1. Artist — Song title
   2. Artist — Song title
   ...
   10. Artist — Song title
3) Add NOTHING but that list: no intro, no explanations, no emoji.";

pub const CURATOR_SYSTEM_PROMPT: &str = "\
You are a film curator.
You receive: (1) the user's final music playlist (a numbered list of 10 lines \
\"Artist — Song\"), (2) the user's reaction to the playlist and/or answers \
about their mood.

Algorithm:
- Decide whether the user liked the playlist and what their mood is.
- If they liked it: IMMEDIATELY suggest 5 films matching the mood of the \
playlist.
- If they did not: ask at most 1 short clarifying question about the wanted \
mood, genres or pace, then suggest 5 films.

Recommendation format, strictly:
- One short line summarizing the mood.
- Then a NUMBERED list of 5 lines:
  1. Title (Year) — Director
  2. ...
  5. ...
No extra blocks before or after the list. Questions go in a separate short \
message.";

pub const HANDOFF_QUESTION: &str = "\
Did you like this playlist? If so, describe its mood in a couple of words; \
if not, tell me what mood you're after.";

/// Returns the canned question asking about `missing`, or the catch-all
/// question when nothing is missing.
pub fn follow_up_question(missing: Option<Signal>) -> &'static str {
    match missing {
        Some(Signal::Genre) => {
            "Which genres or styles are closest to you? Two or three examples \
             are enough."
        }
        Some(Signal::Artist) => {
            "Any favorite artists or bands whose sound you'd like to catch?"
        }
        Some(Signal::Mood) => {
            "What mood should the playlist have: calm, melancholic, energetic?"
        }
        Some(Signal::Language) => {
            "Any preference for the vocal language: English, Russian or mixed?"
        }
        Some(Signal::Tempo) => {
            "Which tempo do you prefer: slow, moderate or fast?"
        }
        None => {
            "Any other wishes about the sound or the atmosphere of the \
             playlist?"
        }
    }
}

fn covered_label(signal: Signal) -> &'static str {
    match signal {
        Signal::Genre => "genres given",
        Signal::Artist => "artists given",
        Signal::Mood => "mood given",
        Signal::Language => "language given",
        Signal::Tempo => "tempo given",
    }
}

/// Builds the hidden prompt asking the music agent for the final list.
///
/// Only the covered categories are named, the values themselves travel
/// through the raw user answers.
pub fn finalize_prompt<'a>(
    signals: SignalSet,
    recent_user_texts: impl IntoIterator<Item = &'a str>,
) -> String {
    let covered = signals
        .iter()
        .map(covered_label)
        .collect::<Vec<_>>()
        .join(", ");
    let answers = recent_user_texts.into_iter().collect::<Vec<_>>().join(" \n ");
    format!(
        "Build a playlist of 10 songs based on the preferences below.
The answer MUST be only a numbered list from 1 to 10, each line being:
\"<number>. <Artist> — <Song title>\".
Add nothing but this list.

User data: {covered}.
Answers to analyze:
{answers}"
    )
}

/// Builds the hidden prompt of a film-curation turn.
pub fn handoff_prompt(playlist: &str, dialogue: &str) -> String {
    format!(
        "This is the user's playlist:
{playlist}

Dialogue:
{dialogue}"
    )
}
