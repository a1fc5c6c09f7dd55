//! MPI-AE assessment mode.
//!
//! In assessment mode the model is asked to answer an inventory item with a
//! single letter A-E. [`parse_choice`] maps the raw model output onto that
//! option set or onto [`Choice::Unknown`] when it does not fit.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Instruction block appended to the prompt when strict output is requested.
pub const MPI_AE_FORMAT: &str = "### EVALUATION FORMAT\n\
Choose exactly ONE option from (A/B/C/D/E).\n\
Output ONLY the single uppercase letter (A, B, C, D, or E) with no spaces, \
no punctuation, no explanations, no extra text.";

pub const DEFAULT_FORMAT_ID: &str = "MPI-120";

static STRICT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*([ABCDE])\s*$").unwrap());

// Tried in order once strict matching fails.
static LENIENT: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        // B.  (B)  B)  (B).
        Regex::new(r"^\s*\(?([ABCDE])\)?[.:)]?\s*$").unwrap(),
        // Answer: B / Option (C)
        Regex::new(r"(?i:answer|option)\s*[:\-]?\s*\(?([ABCDE])\b").unwrap(),
        // A. Very Accurate / (D) Moderately... / E - ...
        Regex::new(r"^\s*\(?([ABCDE])(?:\)|\.|:|\s+-)").unwrap(),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalType {
    #[default]
    None,
    MpiAe,
}

impl EvalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvalType::None => "none",
            EvalType::MpiAe => "mpi_ae",
        }
    }
}

/// Parsed answer to a single inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
    C,
    D,
    E,
    #[serde(rename = "UNK")]
    Unknown,
}

impl Choice {
    pub const ANSWERS: [Choice; 5] = [Choice::A, Choice::B, Choice::C, Choice::D, Choice::E];

    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
            Choice::C => "C",
            Choice::D => "D",
            Choice::E => "E",
            Choice::Unknown => "UNK",
        }
    }

    /// Likert score, A (very accurate) = 5 down to E = 1.
    pub fn score(&self) -> Option<u8> {
        match self {
            Choice::A => Some(5),
            Choice::B => Some(4),
            Choice::C => Some(3),
            Choice::D => Some(2),
            Choice::E => Some(1),
            Choice::Unknown => None,
        }
    }

    pub fn is_answer(&self) -> bool {
        !matches!(self, Choice::Unknown)
    }

    /// Read back a stored label; anything but A-E is [`Choice::Unknown`].
    pub fn from_label(label: &str) -> Choice {
        match label.trim() {
            "A" => Choice::A,
            "B" => Choice::B,
            "C" => Choice::C,
            "D" => Choice::D,
            "E" => Choice::E,
            _ => Choice::Unknown,
        }
    }
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map raw model output to a choice.
///
/// With `strict` the whole output, ignoring surrounding whitespace, must be a
/// single uppercase letter A-E. Otherwise a few common near-misses are
/// accepted as well.
pub fn parse_choice(raw: &str, strict: bool) -> Choice {
    if let Some(choice) = capture(&STRICT, raw) {
        return choice;
    }
    if strict {
        return Choice::Unknown;
    }

    LENIENT
        .iter()
        .find_map(|re| capture(re, raw))
        .unwrap_or(Choice::Unknown)
}

fn capture(re: &Regex, raw: &str) -> Option<Choice> {
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| Choice::from_label(m.as_str()))
}
