use std::cmp::Ordering;

use crate::config::ChronologyConfig;
use crate::errors::FitError;
use crate::matching::RankedTerms;
use crate::models::{EmploymentPeriod, ProgressionResult, Trend};

const FREQUENT_CHANGES: &str = ", Frequent changes";

#[derive(Debug)]
pub struct ProgressionAnalyzer {
    levels: RankedTerms,
    default_level: u8,
    short_tenure_months: u32,
}

impl ProgressionAnalyzer {
    pub fn new(config: &ChronologyConfig) -> Result<Self, FitError> {
        Ok(Self {
            levels: RankedTerms::substrings(&config.seniority_levels)?,
            default_level: config.default_seniority,
            short_tenure_months: config.short_tenure_months,
        })
    }

    /// Highest level of any seniority term found in the title. Compound
    /// titles such as "Senior Lead Engineer" take the maximum (lead).
    pub fn seniority(&self, title: &str) -> u8 {
        self.levels.max_level(title).unwrap_or(self.default_level)
    }

    pub fn analyze(&self, periods: &[EmploymentPeriod]) -> ProgressionResult {
        let trend = self.trend(periods);

        let short = periods
            .iter()
            .filter(|p| p.duration_months < self.short_tenure_months)
            .count();
        let job_hopping = short >= 3 || (periods.len() >= 3 && short * 2 >= periods.len());

        let mut pattern = trend.to_string();
        if job_hopping {
            pattern.push_str(FREQUENT_CHANGES);
        }

        let average_job_duration = if periods.is_empty() {
            0.0
        } else {
            periods.iter().map(|p| p.duration_months as f64).sum::<f64>() / periods.len() as f64
        };

        ProgressionResult {
            has_progression: trend == Trend::Upward,
            trend,
            job_hopping,
            pattern,
            average_job_duration,
        }
    }

    fn trend(&self, periods: &[EmploymentPeriod]) -> Trend {
        let mut titled: Vec<&EmploymentPeriod> =
            periods.iter().filter(|p| p.job_title.is_some()).collect();
        if titled.len() < 2 {
            return Trend::Stable;
        }
        titled.sort_by_key(|p| (p.start, p.end));

        let levels: Vec<u8> = titled
            .iter()
            .filter_map(|p| p.job_title.as_deref())
            .map(|title| self.seniority(title))
            .collect();

        let (mut increases, mut decreases) = (0, 0);
        for pair in levels.windows(2) {
            match pair[1].cmp(&pair[0]) {
                Ordering::Greater => increases += 1,
                Ordering::Less => decreases += 1,
                Ordering::Equal => {}
            }
        }

        match increases.cmp(&decreases) {
            Ordering::Greater => Trend::Upward,
            Ordering::Less => Trend::Varied,
            Ordering::Equal => Trend::Stable,
        }
    }
}
