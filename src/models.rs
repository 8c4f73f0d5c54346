use chrono::{Datelike, Month};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::DateParseError;

/// A calendar month. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32, // 1-12
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, DateParseError> {
        if !(1..=12).contains(&month) {
            return Err(DateParseError::InvalidMonth(month));
        }
        Ok(Self { year, month })
    }

    /// The month the local clock is in.
    pub fn current() -> Self {
        let now = chrono::Local::now();
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(self, other: YearMonth) -> i32 {
        (other.year - self.year) * 12 + (other.month as i32 - self.month as i32)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Month::try_from(self.month as u8) {
            Ok(month) => write!(f, "{} {}", &month.name()[..3], self.year),
            Err(_) => write!(f, "{:02}/{}", self.month, self.year),
        }
    }
}

/// A validated start/end pair produced by the date parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: YearMonth,
    pub end: YearMonth,
    pub is_current: bool,
}

impl DateRange {
    pub fn new(start: YearMonth, end: YearMonth, is_current: bool) -> Result<Self, DateParseError> {
        if start > end {
            return Err(DateParseError::Inverted { start, end });
        }
        Ok(Self {
            start,
            end,
            is_current,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentPeriod {
    pub start: YearMonth,
    pub end: YearMonth,
    pub is_current: bool,
    /// Both boundary months count as worked: Jan-Dec of one year is 12.
    pub duration_months: u32,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub source_text: String,
}

impl EmploymentPeriod {
    pub fn new(
        range: DateRange,
        job_title: Option<String>,
        company: Option<String>,
        source_text: impl Into<String>,
    ) -> Self {
        let duration_months = (range.start.months_until(range.end) + 1).max(0) as u32;
        Self {
            start: range.start,
            end: range.end,
            is_current: range.is_current,
            duration_months,
            job_title: non_empty(job_title),
            company: non_empty(company),
            source_text: source_text.into(),
        }
    }

    /// Lower-cased company name, `"unknown"` when absent.
    pub fn company_key(&self) -> String {
        self.company
            .as_deref()
            .map(|c| c.to_lowercase())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Lower-cased job title, `"unknown"` when absent.
    pub fn title_key(&self) -> String {
        self.job_title
            .as_deref()
            .map(|t| t.to_lowercase())
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn is_complete(&self) -> bool {
        self.job_title.is_some() && self.company.is_some()
    }

    /// True when `other` lies entirely within this period's interval.
    pub fn contains(&self, other: &EmploymentPeriod) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareerGap {
    pub start: YearMonth,
    pub end: YearMonth,
    pub duration_months: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Stable,
    Upward,
    Varied,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Trend::Stable => "Stable",
            Trend::Upward => "Upward",
            Trend::Varied => "Varied",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionResult {
    pub has_progression: bool,
    pub trend: Trend,
    pub job_hopping: bool,
    pub pattern: String, // "Upward", "Varied, Frequent changes", ...
    pub average_job_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChronologyReport {
    pub employment_periods: Vec<EmploymentPeriod>,
    pub total_experience_months: u32,
    pub total_experience_years: String,
    pub career_gaps: Vec<CareerGap>,
    pub career_progression: ProgressionResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Proficiency {
    Unspecified,
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl fmt::Display for Proficiency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Proficiency::Unspecified => "unspecified",
            Proficiency::Beginner => "beginner",
            Proficiency::Intermediate => "intermediate",
            Proficiency::Advanced => "advanced",
            Proficiency::Expert => "expert",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMatch {
    pub skill: String,
    pub fuzzy: bool,
    pub proficiency: Proficiency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub name: String,
    pub score: f64, // 0.0 - 1.0
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub overall_percentage: f64,
    pub match_level: String,
    pub components: Vec<ComponentScore>,
    pub matched_skills: Vec<SkillMatch>,
    pub missing_skills: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub missing_keywords: Vec<String>,
    pub matched_soft_skills: Vec<String>,
    pub missing_soft_skills: Vec<String>,
    pub required_education: u8,
    pub candidate_education: u8,
    pub required_years: Option<u32>,
    pub candidate_years: f64,
    pub feedback: Vec<String>,
    pub chronology: ChronologyReport,
}
