use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{ChronologyReport, FitReport};

const WIDTH: usize = 78;

pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize report")
}

pub fn render_fit(report: &FitReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Overall fit: {:.1}% ({} match)\n",
        report.overall_percentage, report.match_level
    ));
    out.push_str(&format!("{}\n", "=".repeat(WIDTH)));

    out.push_str(&format!("\n{:<22} {:>8} {:>8}\n", "COMPONENT", "SCORE", "WEIGHT"));
    out.push_str(&format!("{}\n", "-".repeat(40)));
    for c in &report.components {
        out.push_str(&format!(
            "{:<22} {:>7.0}% {:>8.2}\n",
            truncate(&c.name, 22),
            c.score * 100.0,
            c.weight
        ));
    }

    out.push_str("\nSkills\n");
    if report.matched_skills.is_empty() && report.missing_skills.is_empty() {
        out.push_str("  No technical skills named in the job description.\n");
    }
    for m in &report.matched_skills {
        let how = if m.fuzzy { "close match" } else { "found" };
        out.push_str(&format!("  + {:<24} {:<12} {}\n", truncate(&m.skill, 24), how, m.proficiency));
    }
    for skill in &report.missing_skills {
        out.push_str(&format!("  - {:<24} missing\n", truncate(skill, 24)));
    }

    let required_years = report
        .required_years
        .map(|y| y.to_string())
        .unwrap_or_else(|| "-".to_string());
    out.push_str(&format!(
        "\nExperience: {:.1} years (required: {})\n",
        report.candidate_years, required_years
    ));
    out.push_str(&format!(
        "Education level: {} (required: {})\n",
        report.candidate_education, report.required_education
    ));
    out.push_str(&format!(
        "Keywords: {} of {} found\n",
        report.matched_keywords.len(),
        report.matched_keywords.len() + report.missing_keywords.len()
    ));

    out.push('\n');
    out.push_str(&render_chronology(&report.chronology));

    if !report.feedback.is_empty() {
        out.push_str("\nFeedback\n");
        let options = textwrap::Options::new(WIDTH)
            .initial_indent("  * ")
            .subsequent_indent("    ");
        for line in &report.feedback {
            out.push_str(&format!("{}\n", textwrap::fill(line, &options)));
        }
    }

    out
}

pub fn render_chronology(report: &ChronologyReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Employment history: {} years ({} months)\n",
        report.total_experience_years, report.total_experience_months
    ));

    if report.employment_periods.is_empty() {
        out.push_str("  No dated employment entries found.\n");
        return out;
    }

    out.push_str(&format!("{:<19} {:<28} {:<22} {:>6}\n", "PERIOD", "TITLE", "COMPANY", "MONTHS"));
    out.push_str(&format!("{}\n", "-".repeat(WIDTH)));
    for p in &report.employment_periods {
        let end = if p.is_current {
            "Present".to_string()
        } else {
            p.end.to_string()
        };
        out.push_str(&format!(
            "{:<19} {:<28} {:<22} {:>6}\n",
            format!("{} - {}", p.start, end),
            truncate(p.job_title.as_deref().unwrap_or("?"), 28),
            truncate(p.company.as_deref().unwrap_or("?"), 22),
            p.duration_months
        ));
    }

    if !report.career_gaps.is_empty() {
        out.push_str("\nGaps\n");
        for gap in &report.career_gaps {
            out.push_str(&format!("  {} - {}: {} months\n", gap.start, gap.end, gap.duration_months));
        }
    }

    let progression = &report.career_progression;
    out.push_str(&format!(
        "\nProgression: {} (average tenure {:.1} months)\n",
        progression.pattern, progression.average_job_duration
    ));

    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
