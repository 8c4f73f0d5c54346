//! Date-range recognition for résumé text.
//!
//! Four formats are tried in a fixed order and the first one that matches
//! a fragment decides its meaning:
//!
//! 1. `MM/YYYY - MM/YYYY` (or `- present`)
//! 2. `Jan 2018 - Mar 2020` (full or abbreviated month names)
//! 3. `2018 - 2020` (January of the start year, December of the end year)
//! 4. `from Jan 2018 until Mar 2020` style sentences

use regex::{Captures, Regex};
use std::ops::Range;

use crate::errors::{DateParseError, FitError};
use crate::models::{DateRange, YearMonth};

const MONTH: &str = r"jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";
const YEAR: &str = r"(?:19|20)\d{2}";
const SEPARATOR: &str = r"\s*(?:-|–|—|\bto\b)\s*";
const SENTENCE_SEPARATOR: &str = r"\s*(?:-|–|—|\bto\b|\buntil\b|\bthrough\b|\band\b)\s*";
const PRESENT: &str = r"present|current";

const MONTHS: [(&str, &[&str]); 12] = [
    ("january", &["jan"]),
    ("february", &["feb"]),
    ("march", &["mar"]),
    ("april", &["apr"]),
    ("may", &[]),
    ("june", &["jun"]),
    ("july", &["jul"]),
    ("august", &["aug"]),
    ("september", &["sep", "sept"]),
    ("october", &["oct"]),
    ("november", &["nov"]),
    ("december", &["dec"]),
];

/// Map an English month name or abbreviation to 1-12.
pub fn month_index(name: &str) -> Option<u32> {
    let name = name.trim().trim_end_matches('.').to_lowercase();
    MONTHS
        .iter()
        .position(|(full, abbreviations)| *full == name || abbreviations.contains(&name.as_str()))
        .map(|i| i as u32 + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    Numeric,
    MonthName,
    YearOnly,
    Sentence,
}

#[derive(Debug)]
struct DatePattern {
    format: DateFormat,
    regex: Regex,
}

impl DatePattern {
    fn new(format: DateFormat) -> Result<Self, FitError> {
        let source = match format {
            DateFormat::Numeric => format!(
                r"(?i)\b(\d{{1,2}})/({YEAR}){SEPARATOR}(?:(\d{{1,2}})/({YEAR})|({PRESENT}))\b"
            ),
            DateFormat::MonthName => format!(
                r"(?i)\b({MONTH})\.?,?\s+({YEAR}){SEPARATOR}(?:({MONTH})\.?,?\s+({YEAR})|({PRESENT}))\b"
            ),
            DateFormat::YearOnly => {
                format!(r"(?i)\b({YEAR}){SEPARATOR}(?:({YEAR})|({PRESENT}))\b")
            }
            DateFormat::Sentence => format!(
                r"(?i)\b(?:from|between|since)\s+({MONTH})\.?\s+({YEAR}){SENTENCE_SEPARATOR}(?:({MONTH})\.?\s+({YEAR})|({PRESENT}))\b"
            ),
        };
        Ok(Self {
            format,
            regex: Regex::new(&source)?,
        })
    }

    fn build(&self, caps: &Captures, today: YearMonth) -> Result<DateRange, DateParseError> {
        let start = match self.format {
            DateFormat::Numeric => YearMonth::new(number(caps, 2)? as i32, number(caps, 1)?)?,
            DateFormat::MonthName | DateFormat::Sentence => {
                YearMonth::new(number(caps, 2)? as i32, month(caps, 1)?)?
            }
            DateFormat::YearOnly => YearMonth::new(number(caps, 1)? as i32, 1)?,
        };

        let present_group = match self.format {
            DateFormat::YearOnly => 3,
            _ => 5,
        };
        if caps.get(present_group).is_some() {
            return DateRange::new(start, today, true);
        }

        let end = match self.format {
            DateFormat::Numeric => YearMonth::new(number(caps, 4)? as i32, number(caps, 3)?)?,
            DateFormat::MonthName | DateFormat::Sentence => {
                YearMonth::new(number(caps, 4)? as i32, month(caps, 3)?)?
            }
            DateFormat::YearOnly => YearMonth::new(number(caps, 2)? as i32, 12)?,
        };
        DateRange::new(start, end, false)
    }
}

fn capture<'t>(caps: &Captures<'t>, group: usize) -> Result<&'t str, DateParseError> {
    caps.get(group).map(|m| m.as_str()).ok_or_else(|| no_match(caps))
}

fn number(caps: &Captures, group: usize) -> Result<u32, DateParseError> {
    capture(caps, group)?.parse().map_err(|_| no_match(caps))
}

fn month(caps: &Captures, group: usize) -> Result<u32, DateParseError> {
    month_index(capture(caps, group)?).ok_or_else(|| no_match(caps))
}

fn no_match(caps: &Captures) -> DateParseError {
    let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
    DateParseError::NoMatch(whole.to_string())
}

/// A date range found while scanning free text.
#[derive(Debug, Clone)]
pub struct DateMatch {
    pub span: Range<usize>,
    pub format: DateFormat,
    pub result: Result<DateRange, DateParseError>,
}

#[derive(Debug)]
pub struct DateParser {
    patterns: Vec<DatePattern>,
    today: YearMonth,
}

impl DateParser {
    /// `today` is what "present" and "current" resolve to.
    pub fn new(today: YearMonth) -> Result<Self, FitError> {
        let patterns = [
            DateFormat::Numeric,
            DateFormat::MonthName,
            DateFormat::YearOnly,
            DateFormat::Sentence,
        ]
        .into_iter()
        .map(DatePattern::new)
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns, today })
    }

    /// Parse the first date range in `fragment`. The first format that
    /// matches decides; an inverted range is rejected rather than retried
    /// with a looser format.
    pub fn parse(&self, fragment: &str) -> Result<DateRange, DateParseError> {
        for pattern in &self.patterns {
            if let Some(caps) = pattern.regex.captures(fragment) {
                return pattern.build(&caps, self.today);
            }
        }
        Err(DateParseError::NoMatch(fragment.trim().to_string()))
    }

    /// Every date range in `text`, ordered by position. Where matches of
    /// different formats overlap, the earlier format keeps the span.
    pub fn scan(&self, text: &str) -> Vec<DateMatch> {
        let mut found: Vec<DateMatch> = Vec::new();

        for pattern in &self.patterns {
            for caps in pattern.regex.captures_iter(text) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                let span = whole.range();
                if found.iter().any(|m| m.span.start < span.end && span.start < m.span.end) {
                    continue;
                }
                found.push(DateMatch {
                    span,
                    format: pattern.format,
                    result: pattern.build(&caps, self.today),
                });
            }
        }

        found.sort_by_key(|m| m.span.start);
        found
    }
}
