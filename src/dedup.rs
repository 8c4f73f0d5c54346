use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::debug;

use crate::models::{EmploymentPeriod, YearMonth};

/// Collapse repeated entries and entries restated inside a longer stint at
/// the same company. The result is ordered by start, then end.
pub fn deduplicate(periods: Vec<EmploymentPeriod>) -> Vec<EmploymentPeriod> {
    let before = periods.len();
    let unique = collapse_exact(periods);
    let mut kept = drop_contained(unique);
    kept.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

    if kept.len() < before {
        debug!("Deduplicated {} entries down to {}", before, kept.len());
    }
    kept
}

/// Entries with the same dates and title are one entry; the one that also
/// names a company wins.
fn collapse_exact(periods: Vec<EmploymentPeriod>) -> Vec<EmploymentPeriod> {
    let mut order: Vec<(YearMonth, YearMonth, String)> = Vec::new();
    let mut by_key: HashMap<(YearMonth, YearMonth, String), EmploymentPeriod> = HashMap::new();

    for period in periods {
        let key = (period.start, period.end, period.title_key());
        match by_key.get_mut(&key) {
            Some(existing) => {
                if !existing.is_complete() && period.is_complete() {
                    *existing = period;
                }
            }
            None => {
                order.push(key.clone());
                by_key.insert(key, period);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect()
}

/// Within each company, longest stints first; anything whose interval sits
/// inside an already kept stint is dropped.
fn drop_contained(periods: Vec<EmploymentPeriod>) -> Vec<EmploymentPeriod> {
    let mut groups: Vec<(String, Vec<EmploymentPeriod>)> = Vec::new();
    for period in periods {
        let company = period.company_key();
        match groups.iter_mut().find(|(key, _)| *key == company) {
            Some((_, group)) => group.push(period),
            None => groups.push((company, vec![period])),
        }
    }

    let mut kept = Vec::new();
    for (_, mut group) in groups {
        group.sort_by_key(|p| (Reverse(p.duration_months), Reverse(p.is_complete())));

        let mut survivors: Vec<EmploymentPeriod> = Vec::new();
        for period in group {
            if survivors.iter().any(|other| other.contains(&period)) {
                debug!(
                    "Dropping {} - {} at {}: inside a longer entry",
                    period.start,
                    period.end,
                    period.company_key()
                );
                continue;
            }
            survivors.push(period);
        }
        kept.extend(survivors);
    }
    kept
}
