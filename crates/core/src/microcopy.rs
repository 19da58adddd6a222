//! Short feedback lines shown after each answer.
//!
//! Phrase choice is keyed by a per-attempt seed through [`hash_seed`], so the
//! same attempt always reads the same way, and the result never exceeds the
//! caller's character budget.

use serde::{Deserialize, Serialize};

use crate::layout_math::hash_seed;

/// Default budget used by the session screen.
pub const DEFAULT_MAX_CHARS: usize = 92;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tone {
    Success,
    SuccessWithStreak,
    Encouragement,
}

struct PhraseBook {
    opener_salt: &'static str,
    openers: &'static [&'static str],
    core_salt: &'static str,
    cores: &'static [&'static str],
    tail_salt: &'static str,
    tails: &'static [&'static str],
}

static SUCCESS: PhraseBook = PhraseBook {
    opener_salt: "success",
    openers: &["Nice!", "Great job!", "You got it!"],
    core_salt: "success:core",
    cores: &[
        "That answer is spot on.",
        "You worked that out perfectly.",
        "Your thinking paid off.",
        "Exactly right.",
    ],
    tail_salt: "success:closer",
    tails: &["Keep going!", "On to the next one.", "Your brain is buzzing!"],
};

static STREAK: PhraseBook = PhraseBook {
    opener_salt: "streak",
    openers: &["Wow!", "Amazing!", "Unstoppable!"],
    core_salt: "streak:core",
    cores: &[
        "You nailed another one.",
        "Another correct answer.",
        "Right again.",
    ],
    tail_salt: "streak:bonus",
    tails: &[
        "That's three in a row, what a streak!",
        "Your streak is on fire, keep it burning!",
        "Hat trick! The streak keeps growing.",
    ],
};

static ENCOURAGEMENT: PhraseBook = PhraseBook {
    opener_salt: "encourage",
    openers: &["Almost!", "Good try!", "Not quite."],
    core_salt: "encourage:core",
    cores: &[
        "Let's look at this one together.",
        "Mistakes help your brain grow.",
        "Every try teaches you something new.",
    ],
    tail_salt: "encourage:closer",
    tails: &["You can do this!", "Here comes an easier one.", "Let's keep practicing."],
};

impl Tone {
    fn phrases(self) -> &'static PhraseBook {
        match self {
            Tone::Success => &SUCCESS,
            Tone::SuccessWithStreak => &STREAK,
            Tone::Encouragement => &ENCOURAGEMENT,
        }
    }
}

fn pick(seed: &str, salt: &str, pool: &'static [&'static str]) -> &'static str {
    if pool.is_empty() {
        return "";
    }
    let hash = hash_seed(&format!("{seed}|{salt}"));
    let index = usize::try_from(hash).unwrap_or(0) % pool.len();
    pool[index]
}

fn normalize(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| part.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    let cut: String = text.chars().take(max_chars).collect();
    cut.trim_end().to_string()
}

/// Picks a feedback line for `tone`, at most `max_chars` characters long.
///
/// Candidates are tried from most to least decorated; if none fits, the
/// opener alone is returned (cut to the budget if even that is too long).
#[must_use]
pub fn compose_microcopy(seed: &str, tone: Tone, max_chars: usize) -> String {
    let book = tone.phrases();
    let opener = pick(seed, book.opener_salt, book.openers);
    let core = pick(seed, book.core_salt, book.cores);
    let tail = pick(seed, book.tail_salt, book.tails);

    let candidates = [
        normalize(&[opener, core, tail]),
        normalize(&[opener, core]),
        normalize(&[core, tail]),
        normalize(&[core]),
    ];

    candidates
        .into_iter()
        .find(|candidate| !candidate.is_empty() && candidate.chars().count() <= max_chars)
        .unwrap_or_else(|| truncate_chars(&normalize(&[opener]), max_chars))
}
