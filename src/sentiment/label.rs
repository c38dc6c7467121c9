//! Canonical sentiment labels and the ordinal rating scale they collapse from.

use serde::{Deserialize, Serialize};

// ── Canonical labels ─────────────────────────────────────────────

/// The three sentiment labels the system is allowed to output.
///
/// Every classification ends in exactly one of these — never a raw model
/// string, never an error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    /// 긍정
    Positive,
    /// 중립
    Neutral,
    /// 부정
    Negative,
}

impl Sentiment {
    /// All labels in display order.
    pub const ALL: &'static [Sentiment] =
        &[Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];

    /// Human-readable label shown to users.
    pub fn label(self) -> &'static str {
        match self {
            Sentiment::Positive => "긍정",
            Sentiment::Neutral => "중립",
            Sentiment::Negative => "부정",
        }
    }

    /// Stable ASCII identifier used in config, storage, and API payloads.
    pub fn id(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// Parse from the ASCII identifier.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }

    /// Scan free text for the earliest canonical label token.
    ///
    /// Model replies are prose, not structured output; the first token that
    /// appears wins. Returns `None` when no token is present at all.
    pub fn scan(text: &str) -> Option<Self> {
        Sentiment::ALL
            .iter()
            .filter_map(|s| text.find(s.label()).map(|pos| (pos, *s)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, s)| s)
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

// ── Ordinal rating scale ─────────────────────────────────────────

/// Five-class ordinal rating produced by the underlying local model,
/// equivalent to a 1–5 star review score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrdinalRating {
    /// 1 star
    VeryNegative,
    /// 2 stars
    Negative,
    /// 3 stars
    Neutral,
    /// 4 stars
    Positive,
    /// 5 stars
    VeryPositive,
}

impl OrdinalRating {
    /// Parse from a 1–5 star value.
    pub fn from_stars(stars: u8) -> Option<Self> {
        match stars {
            1 => Some(OrdinalRating::VeryNegative),
            2 => Some(OrdinalRating::Negative),
            3 => Some(OrdinalRating::Neutral),
            4 => Some(OrdinalRating::Positive),
            5 => Some(OrdinalRating::VeryPositive),
            _ => None,
        }
    }

    /// The 1–5 star value of this class.
    pub fn stars(self) -> u8 {
        match self {
            OrdinalRating::VeryNegative => 1,
            OrdinalRating::Negative => 2,
            OrdinalRating::Neutral => 3,
            OrdinalRating::Positive => 4,
            OrdinalRating::VeryPositive => 5,
        }
    }

    /// Collapse to the canonical three-label scale: 4–5 stars are positive,
    /// 3 stars neutral, 1–2 stars negative.
    pub fn bucket(self) -> Sentiment {
        match self {
            OrdinalRating::Positive | OrdinalRating::VeryPositive => Sentiment::Positive,
            OrdinalRating::Neutral => Sentiment::Neutral,
            OrdinalRating::Negative | OrdinalRating::VeryNegative => Sentiment::Negative,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for s in Sentiment::ALL {
            assert_eq!(Sentiment::from_id(s.id()), Some(*s));
            assert!(!s.label().is_empty());
        }
        assert!(Sentiment::from_id("unknown").is_none());
        assert!(Sentiment::from_id("").is_none());
    }

    #[test]
    fn display_matches_id() {
        for s in Sentiment::ALL {
            assert_eq!(format!("{s}"), s.id());
        }
    }

    #[test]
    fn scan_finds_single_token() {
        assert_eq!(Sentiment::scan("결과: 긍정"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::scan("이 리뷰는 부정적입니다"), Some(Sentiment::Negative));
        assert_eq!(Sentiment::scan("중립"), Some(Sentiment::Neutral));
    }

    #[test]
    fn scan_earliest_token_wins() {
        assert_eq!(
            Sentiment::scan("부정이 아니라 긍정입니다"),
            Some(Sentiment::Negative)
        );
        assert_eq!(
            Sentiment::scan("긍정 (부정 아님)"),
            Some(Sentiment::Positive)
        );
    }

    #[test]
    fn scan_no_token_is_none() {
        assert_eq!(Sentiment::scan("이 영화는 그냥 그랬다"), None);
        assert_eq!(Sentiment::scan(""), None);
        assert_eq!(Sentiment::scan("positive"), None);
    }

    #[test]
    fn stars_round_trip() {
        for stars in 1..=5u8 {
            let rating = OrdinalRating::from_stars(stars).unwrap();
            assert_eq!(rating.stars(), stars);
        }
        assert!(OrdinalRating::from_stars(0).is_none());
        assert!(OrdinalRating::from_stars(6).is_none());
    }

    #[test]
    fn bucket_collapses_the_scale() {
        assert_eq!(OrdinalRating::VeryPositive.bucket(), Sentiment::Positive);
        assert_eq!(OrdinalRating::Positive.bucket(), Sentiment::Positive);
        assert_eq!(OrdinalRating::Neutral.bucket(), Sentiment::Neutral);
        assert_eq!(OrdinalRating::Negative.bucket(), Sentiment::Negative);
        assert_eq!(OrdinalRating::VeryNegative.bucket(), Sentiment::Negative);
    }

    #[test]
    fn ordinal_ordering() {
        assert!(OrdinalRating::VeryPositive > OrdinalRating::Positive);
        assert!(OrdinalRating::Neutral > OrdinalRating::Negative);
        assert!(OrdinalRating::Negative > OrdinalRating::VeryNegative);
    }
}
