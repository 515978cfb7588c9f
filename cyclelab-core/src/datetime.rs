//! Date normalization — tolerant multi-format timestamp parsing with
//! diagnostics.
//!
//! Exchanges export inconsistent timestamp formats. A static ordered
//! registry of format variants is tried in order; the first recognizer that
//! matches transforms the string to the canonical `YYYY-MM-DD HH:mm:ss`
//! form, which chrono then validates as a real calendar instant. Failure is
//! a reported outcome, never an error: the caller decides whether a
//! malformed date invalidates a record or just degrades it.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// chrono pattern for the canonical `YYYY-MM-DD HH:mm:ss` form.
pub const CANONICAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Failure reason recorded when no registry entry produces a valid instant.
pub const NO_MATCHING_FORMAT: &str = "no matching format";

/// A registered timestamp format: a recognizer plus a pure transform to the
/// canonical form. Adding a format means adding a variant here — call sites
/// never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateFormat {
    /// Already canonical: `YYYY-MM-DD HH:mm:ss`. Registered first so
    /// re-normalizing a canonical string is idempotent.
    Iso,
    /// `DD-MM-YY HH:mm:ss`, two-digit year assumed to be 20xx.
    DdMmYy,
    /// `M/D/YYYY H:mm` — 1-or-2-digit month/day/hour, minute precision.
    /// Components are zero-padded and seconds default to `00`.
    MdYyyy,
}

/// Registration order. Recognition shapes are mutually exclusive, but the
/// contract is first-match-wins regardless.
pub const FORMAT_REGISTRY: [DateFormat; 3] =
    [DateFormat::Iso, DateFormat::DdMmYy, DateFormat::MdYyyy];

impl DateFormat {
    pub fn name(self) -> &'static str {
        match self {
            DateFormat::Iso => "YYYY-MM-DD",
            DateFormat::DdMmYy => "DD-MM-YY",
            DateFormat::MdYyyy => "M/D/YYYY",
        }
    }

    fn recognize(self, s: &str) -> bool {
        match self {
            DateFormat::Iso => matches_shape(s, "####-##-## ##:##:##"),
            DateFormat::DdMmYy => matches_shape(s, "##-##-## ##:##:##"),
            DateFormat::MdYyyy => recognize_md_yyyy(s),
        }
    }

    /// Rewrite a recognized string into the canonical form. Purely textual:
    /// calendar validity is checked afterwards by chrono.
    fn transform(self, s: &str) -> Option<String> {
        match self {
            DateFormat::Iso => Some(s.to_string()),
            DateFormat::DdMmYy => {
                let (date, time) = s.split_once(' ')?;
                let mut parts = date.split('-');
                let (dd, mm, yy) = (parts.next()?, parts.next()?, parts.next()?);
                Some(format!("20{yy}-{mm}-{dd} {time}"))
            }
            DateFormat::MdYyyy => {
                let (date, time) = s.split_once(' ')?;
                let mut parts = date.split('/');
                let (m, d, yyyy) = (parts.next()?, parts.next()?, parts.next()?);
                let (h, min) = time.split_once(':')?;
                Some(format!("{yyyy}-{m:0>2}-{d:0>2} {h:0>2}:{min}:00"))
            }
        }
    }
}

/// Byte-wise shape match: `#` is an ASCII digit, anything else is literal.
fn matches_shape(s: &str, shape: &str) -> bool {
    s.len() == shape.len()
        && s.bytes().zip(shape.bytes()).all(|(b, p)| match p {
            b'#' => b.is_ascii_digit(),
            _ => b == p,
        })
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `\d{1,2}/\d{1,2}/\d{4} \d{1,2}:\d{2}` — variable widths, so no fixed shape.
fn recognize_md_yyyy(s: &str) -> bool {
    let Some((date, time)) = s.split_once(' ') else {
        return false;
    };
    let date_parts: Vec<&str> = date.split('/').collect();
    let [m, d, yyyy] = date_parts[..] else {
        return false;
    };
    let Some((h, min)) = time.split_once(':') else {
        return false;
    };
    m.len() <= 2
        && d.len() <= 2
        && yyyy.len() == 4
        && h.len() <= 2
        && min.len() == 2
        && [m, d, yyyy, h, min].iter().all(|p| all_digits(p))
}

/// Normalization diagnostic attached to every order. Never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DateParseResult {
    pub original: String,
    pub outcome: ParseOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParseOutcome {
    Parsed {
        normalized: String,
        format: DateFormat,
        datetime: NaiveDateTime,
    },
    Unrecognized {
        reason: String,
    },
}

impl DateParseResult {
    pub fn success(&self) -> bool {
        matches!(self.outcome, ParseOutcome::Parsed { .. })
    }

    pub fn normalized(&self) -> Option<&str> {
        match &self.outcome {
            ParseOutcome::Parsed { normalized, .. } => Some(normalized),
            ParseOutcome::Unrecognized { .. } => None,
        }
    }

    pub fn datetime(&self) -> Option<NaiveDateTime> {
        match &self.outcome {
            ParseOutcome::Parsed { datetime, .. } => Some(*datetime),
            ParseOutcome::Unrecognized { .. } => None,
        }
    }

    /// Canonical string when parsing succeeded, otherwise the raw original.
    pub fn display_label(&self) -> &str {
        self.normalized().unwrap_or(&self.original)
    }
}

/// One recorded failure: the offending input and why it was rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseFailure {
    pub input: String,
    pub reason: String,
}

/// Running statistics for one ingestion batch. An explicit value, not
/// ambient state: callers wanting cumulative stats fold batches themselves.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingStats {
    pub total_processed: usize,
    pub successfully_parsed: usize,
    pub format_counts: BTreeMap<String, usize>,
    pub failures: Vec<ParseFailure>,
}

impl ParsingStats {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Failed fraction of processed timestamps, 0.0 for an empty batch.
    pub fn failure_rate(&self) -> f64 {
        if self.total_processed == 0 {
            return 0.0;
        }
        self.failures.len() as f64 / self.total_processed as f64
    }
}

/// Normalize one raw timestamp string, updating the batch statistics.
pub fn normalize(raw: &str, stats: &mut ParsingStats) -> DateParseResult {
    stats.total_processed += 1;

    for format in FORMAT_REGISTRY {
        if !format.recognize(raw) {
            continue;
        }
        // A matched-but-uninterpretable transform (month 13, day 32) falls
        // through to the same failure as a non-match.
        if let Some(normalized) = format.transform(raw) {
            if let Ok(datetime) = NaiveDateTime::parse_from_str(&normalized, CANONICAL_FORMAT) {
                stats.successfully_parsed += 1;
                *stats
                    .format_counts
                    .entry(format.name().to_string())
                    .or_insert(0) += 1;
                return DateParseResult {
                    original: raw.to_string(),
                    outcome: ParseOutcome::Parsed {
                        normalized,
                        format,
                        datetime,
                    },
                };
            }
        }
    }

    stats.failures.push(ParseFailure {
        input: raw.to_string(),
        reason: NO_MATCHING_FORMAT.to_string(),
    });
    DateParseResult {
        original: raw.to_string(),
        outcome: ParseOutcome::Unrecognized {
            reason: NO_MATCHING_FORMAT.to_string(),
        },
    }
}

/// Normalize without tracking statistics.
pub fn normalize_str(raw: &str) -> DateParseResult {
    let mut stats = ParsingStats::default();
    normalize(raw, &mut stats)
}
