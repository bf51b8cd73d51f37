//! Lexical detection of what the user has told about their taste.
//!
//! Five orthogonal topic categories are tracked. None of them is parsed
//! for its value, the orchestrator only needs to know whether a category
//! has been covered at all.

use std::fmt::{self, Debug};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::prompts;
use crate::transcript::Transcript;

/// How many of the latest user messages are scanned for signals.
pub const RECENT_USER_WINDOW: usize = 6;

/// How many distinct signals are enough to ask for the final playlist.
pub const FINALIZE_THRESHOLD: usize = 3;

/// A topic category inferred from user text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    /// Genre or style.
    Genre,
    /// A named artist or band.
    Artist,
    /// Mood of the music.
    Mood,
    /// Vocal language.
    Language,
    /// Tempo.
    Tempo,
}

impl Signal {
    /// All signals, in follow-up question priority order.
    pub const ALL: [Signal; 5] = [
        Signal::Genre,
        Signal::Artist,
        Signal::Mood,
        Signal::Language,
        Signal::Tempo,
    ];

    #[inline]
    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// A set of [`Signal`]s.
///
/// Iteration always follows the priority order of [`Signal::ALL`].
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SignalSet(u8);

impl SignalSet {
    /// The set of all five signals.
    pub const FULL: SignalSet = SignalSet(0b1_1111);

    /// Returns an empty set.
    #[inline]
    pub fn new() -> Self {
        Self(0)
    }

    /// Adds a signal.
    #[inline]
    pub fn insert(&mut self, signal: Signal) {
        self.0 |= signal.bit();
    }

    /// Returns `true` if `signal` is in the set.
    #[inline]
    pub fn contains(&self, signal: Signal) -> bool {
        self.0 & signal.bit() != 0
    }

    /// Returns the number of signals in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns `true` if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns the union of both sets.
    #[inline]
    pub fn union(self, other: SignalSet) -> SignalSet {
        SignalSet(self.0 | other.0)
    }

    /// Returns the signals of `self` that are not in `other`.
    #[inline]
    pub fn difference(self, other: SignalSet) -> SignalSet {
        SignalSet(self.0 & !other.0)
    }

    /// Iterates over the signals in priority order.
    pub fn iter(&self) -> impl Iterator<Item = Signal> + '_ {
        Signal::ALL.into_iter().filter(|s| self.contains(*s))
    }

    /// Returns the highest-priority signal in the set.
    #[inline]
    pub fn first(&self) -> Option<Signal> {
        self.iter().next()
    }
}

impl FromIterator<Signal> for SignalSet {
    fn from_iter<T: IntoIterator<Item = Signal>>(iter: T) -> Self {
        let mut set = SignalSet::new();
        for signal in iter {
            set.insert(signal);
        }
        set
    }
}

impl Debug for SignalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Detects signals in free text.
///
/// Implementations must be pure: the same text always yields the same set.
/// The provided methods aggregate detection over a transcript and should
/// rarely need overriding.
pub trait SignalDetector: Send + Sync {
    /// Returns the signals found in `text`.
    fn detect(&self, text: &str) -> SignalSet;

    /// Unions the signals of the last `k` user messages.
    fn collect_recent(&self, transcript: &Transcript, k: usize) -> SignalSet {
        transcript
            .recent_user_messages()
            .take(k)
            .fold(SignalSet::new(), |acc, text| acc.union(self.detect(text)))
    }

    /// Returns the signals not covered by the recent user messages.
    fn missing(&self, transcript: &Transcript) -> SignalSet {
        SignalSet::FULL
            .difference(self.collect_recent(transcript, RECENT_USER_WINDOW))
    }

    /// Returns `true` if the recent user messages cover enough signals to
    /// ask for the final playlist.
    fn should_finalize(&self, transcript: &Transcript) -> bool {
        self.collect_recent(transcript, RECENT_USER_WINDOW).len()
            >= FINALIZE_THRESHOLD
    }

    /// Builds one clarifying question about the highest-priority missing
    /// signal, or a catch-all question if nothing is missing.
    fn build_follow_up_question(&self, transcript: &Transcript) -> &'static str {
        prompts::follow_up_question(self.missing(transcript).first())
    }
}

const GENRE_WORDS: &[&str] = &[
    "pop", "indie", "rock", "metal", "punk", "jazz", "blues", "r&b", "soul",
    "hip-hop", "hiphop", "rap", "edm", "electronic", "house", "techno",
    "trance", "d&b", "drum and bass", "ambient", "lofi", "lo-fi", "synthwave",
    "folk", "country", "classical", "k-pop", "kpop", "j-pop", "jpop",
    "reggaeton", "latin", "funk", "disco", "grunge", "shoegaze",
    "поп", "инди", "рок", "метал", "панк", "джаз", "блюз", "соул", "хип-хоп",
    "рэп", "электронная", "хаус", "техно", "транс", "драм-н-бейс", "эмбиент",
    "лоуфай", "синтвейв", "фолк", "кантри", "классическая", "кей-поп",
    "джей-поп", "реггетон", "латино",
];

const MOOD_WORDS: &[&str] = &[
    "sad", "happy", "melanchol", "gloomy", "dark", "dreamy", "cheerful",
    "energetic", "calm", "uplifting", "chill", "romantic", "danceable",
    "meditative", "nostalgic", "atmospheric", "moody",
    "меланхолия", "меланхоличный", "грустный", "душевный", "атмосферный",
    "темный", "тёмный", "мрачный", "мечтательный", "веселый", "весёлый",
    "энергичный", "спокойный", "романтичный", "танцевальный", "медитативный",
];

const TEMPO_WORDS: &[&str] = &[
    "slow", "fast", "uptempo", "downtempo", "midtempo", "mid-tempo",
    "upbeat", "moderate", "bpm", "calm", "energetic",
    "медленный", "спокойный", "умеренный", "средний", "быстрый", "энергичный",
];

const LANGUAGE_WORDS: &[&str] = &[
    "english", "russian", "spanish", "korean", "japanese", "french", "german",
    "italian", "portuguese",
    "русский", "на русском", "английский", "на английском", "испанский",
    "корейский", "японский", "французский", "немецкий", "итальянский",
    "португальский",
];

const GREETINGS: &[&str] = &["Hi", "Hey", "Hello", "Привет", "Здравствуйте"];

static ARTIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b([A-ZА-ЯЁ][\p{L}\d'.-]+(?:\s+[A-ZА-ЯЁ][\p{L}\d'.-]+){0,2})\b",
    )
    .expect("artist pattern is valid")
});

/// The default detector: vocabulary lookup plus a capitalized-run
/// heuristic for artist names.
///
/// The artist heuristic fires on any run of capitalized words that is not
/// a greeting, sentence-initial words included. It is an approximation.
#[derive(Clone, Copy, Debug, Default)]
pub struct LexicalDetector;

impl LexicalDetector {
    fn has_artist(text: &str) -> bool {
        ARTIST_REGEX.find_iter(text).any(|m| {
            let name = m.as_str().trim();
            (2..=40).contains(&name.chars().count()) && !GREETINGS.contains(&name)
        })
    }
}

impl SignalDetector for LexicalDetector {
    fn detect(&self, text: &str) -> SignalSet {
        let lower = text.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

        let mut signals = SignalSet::new();
        if mentions(GENRE_WORDS) {
            signals.insert(Signal::Genre);
        }
        if Self::has_artist(text) {
            signals.insert(Signal::Artist);
        }
        if mentions(MOOD_WORDS) {
            signals.insert(Signal::Mood);
        }
        if mentions(LANGUAGE_WORDS) {
            signals.insert(Signal::Language);
        }
        if mentions(TEMPO_WORDS) {
            signals.insert(Signal::Tempo);
        }
        signals
    }
}
