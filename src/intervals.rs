use crate::models::{CareerGap, EmploymentPeriod};

/// Months of experience with overlapping stints counted once.
pub fn total_experience_months(periods: &[EmploymentPeriod]) -> u32 {
    let mut sorted: Vec<&EmploymentPeriod> = periods.iter().collect();
    sorted.sort_by_key(|p| p.start);

    let mut total = 0u32;
    let mut current_end = None;
    for period in sorted {
        match current_end {
            Some(end) if period.start <= end => {
                if period.end > end {
                    total += end.months_until(period.end) as u32;
                    current_end = Some(period.end);
                }
            }
            // first period, or a new block after a break
            _ => {
                total += period.duration_months;
                current_end = Some(period.end);
            }
        }
    }
    total
}

/// Breaks of at least `threshold_months` between one stint ending and the
/// next one starting.
pub fn find_gaps(periods: &[EmploymentPeriod], threshold_months: u32) -> Vec<CareerGap> {
    let mut sorted: Vec<&EmploymentPeriod> = periods.iter().collect();
    sorted.sort_by_key(|p| p.end);

    sorted
        .windows(2)
        .filter_map(|pair| {
            let (prev, next) = (pair[0], pair[1]);
            let months = prev.end.months_until(next.start);
            (months >= 0 && months as u32 >= threshold_months).then(|| CareerGap {
                start: prev.end,
                end: next.start,
                duration_months: months as u32,
            })
        })
        .collect()
}
