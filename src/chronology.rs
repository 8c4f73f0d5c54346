use tracing::info;

use crate::config::ChronologyConfig;
use crate::dates::DateParser;
use crate::dedup::deduplicate;
use crate::errors::FitError;
use crate::extract::EntryExtractor;
use crate::intervals::{find_gaps, total_experience_months};
use crate::models::{ChronologyReport, YearMonth};
use crate::progression::ProgressionAnalyzer;

/// Employment timeline of a résumé as of `today`.
///
/// Only a bad vocabulary in `config` can fail; résumé content never does.
pub fn analyze_chronology(
    text: &str,
    today: YearMonth,
    config: &ChronologyConfig,
) -> Result<ChronologyReport, FitError> {
    let dates = DateParser::new(today)?;
    let extractor = EntryExtractor::new(config, &dates)?;
    let progression = ProgressionAnalyzer::new(config)?;

    let periods = deduplicate(extractor.extract(text));
    let total = total_experience_months(&periods);
    let gaps = find_gaps(&periods, config.gap_threshold_months);
    let career_progression = progression.analyze(&periods);

    info!(
        "Chronology: {} periods, {} months, {} gaps, {}",
        periods.len(),
        total,
        gaps.len(),
        career_progression.pattern
    );

    Ok(ChronologyReport {
        employment_periods: periods,
        total_experience_months: total,
        total_experience_years: format!("{:.1}", total as f64 / 12.0),
        career_gaps: gaps,
        career_progression,
    })
}
