use std::collections::HashSet;
use tracing::{debug, info};

use crate::chronology::analyze_chronology;
use crate::config::{Config, Weights};
use crate::embedding::{EmbeddingProvider, cosine_similarity};
use crate::errors::FitError;
use crate::matching::{TextMatcher, proficiency_credit, title_relevance, tokenize};
use crate::models::{
    ChronologyReport, ComponentScore, FitReport, Proficiency, SkillMatch, Trend, YearMonth,
};

pub const SEMANTIC: &str = "Semantic similarity";
pub const KEYWORDS: &str = "Keywords";
pub const SKILLS: &str = "Skills";
pub const EDUCATION: &str = "Education";
pub const EXPERIENCE: &str = "Experience";
pub const SOFT_SKILLS: &str = "Soft skills";
pub const TITLE: &str = "Title relevance";

const FUZZY_CREDIT: f64 = 0.8;
const STRENGTH_THRESHOLD: f64 = 0.75;
const IMPROVEMENT_THRESHOLD: f64 = 0.5;
const TITLE_PREFIXES: [&str; 4] = ["job title:", "title:", "position:", "role:"];
const MAX_TITLE_WORDS: usize = 8;

/// Scores a résumé against a job description.
pub struct Analyzer<'a> {
    config: &'a Config,
    embedder: &'a dyn EmbeddingProvider,
    matcher: TextMatcher,
}

impl<'a> Analyzer<'a> {
    pub fn new(config: &'a Config, embedder: &'a dyn EmbeddingProvider) -> Result<Self, FitError> {
        Ok(Self {
            config,
            embedder,
            matcher: TextMatcher::new(&config.matching)?,
        })
    }

    pub fn analyze(&self, job: &str, resume: &str, today: YearMonth) -> Result<FitReport, FitError> {
        if job.trim().is_empty() {
            return Err(FitError::InputValidation("job description"));
        }
        if resume.trim().is_empty() {
            return Err(FitError::InputValidation("resume"));
        }

        let chronology = analyze_chronology(resume, today, &self.config.chronology)?;

        info!("Embedding texts with {}", self.embedder.model_name());
        let resume_vector = self.embedder.embed(resume).map_err(FitError::EmbeddingService)?;
        let job_vector = self.embedder.embed(job).map_err(FitError::EmbeddingService)?;
        let semantic = cosine_similarity(&resume_vector, &job_vector).clamp(0.0, 1.0);

        let resume_tokens = tokenize(resume);
        let token_set: HashSet<&str> = resume_tokens.iter().map(|t| t.as_str()).collect();

        let (matched_keywords, missing_keywords): (Vec<String>, Vec<String>) = self
            .matcher
            .keywords(job)
            .into_iter()
            .partition(|k| token_set.contains(k.as_str()) || self.matcher.fuzzy_match(&resume_tokens, k));
        let keyword_score = ratio(
            matched_keywords.len() as f64,
            matched_keywords.len() + missing_keywords.len(),
        );

        let required_skills = self.matcher.skills.found_in(job);
        let mut matched_skills = Vec::new();
        let mut missing_skills = Vec::new();
        let mut skill_credit = 0.0;
        for skill in &required_skills {
            if self.matcher.skills.contains(resume, skill) {
                let proficiency = self.matcher.skill_proficiency(resume, skill);
                skill_credit += proficiency_credit(proficiency);
                matched_skills.push(SkillMatch {
                    skill: skill.clone(),
                    fuzzy: false,
                    proficiency,
                });
            } else if self.matcher.fuzzy_match(&resume_tokens, skill) {
                skill_credit += FUZZY_CREDIT * proficiency_credit(Proficiency::Unspecified);
                matched_skills.push(SkillMatch {
                    skill: skill.clone(),
                    fuzzy: true,
                    proficiency: Proficiency::Unspecified,
                });
            } else {
                missing_skills.push(skill.clone());
            }
        }
        let skill_score = ratio(skill_credit, required_skills.len());

        let required_education = self.matcher.education_level(job);
        let candidate_education = self.matcher.education_level(resume);
        let education_score = if required_education == 0 {
            1.0
        } else {
            (f64::from(candidate_education) / f64::from(required_education)).min(1.0)
        };

        let candidate_years = if chronology.total_experience_months > 0 {
            f64::from(chronology.total_experience_months) / 12.0
        } else {
            self.matcher.claimed_years(resume).unwrap_or(0.0)
        };
        let required_years = self.matcher.required_years(job);
        let experience_score = match required_years {
            Some(years) if years > 0 => (candidate_years / f64::from(years)).min(1.0),
            _ => 1.0,
        };

        let (matched_soft_skills, missing_soft_skills): (Vec<String>, Vec<String>) = self
            .matcher
            .soft_skills
            .found_in(job)
            .into_iter()
            .partition(|s| self.matcher.soft_skills.contains(resume, s));
        let soft_score = ratio(
            matched_soft_skills.len() as f64,
            matched_soft_skills.len() + missing_soft_skills.len(),
        );

        let titles: Vec<&str> = chronology
            .employment_periods
            .iter()
            .filter_map(|p| p.job_title.as_deref())
            .collect();
        let title_score = match job_title(job) {
            Some(wanted) => title_relevance(&wanted, &titles),
            None => 1.0,
        };

        let components = components(
            &self.config.weights,
            [
                semantic,
                keyword_score,
                skill_score,
                education_score,
                experience_score,
                soft_score,
                title_score,
            ],
        );
        for c in &components {
            debug!("{:<20} {:.2} (weight {:.2})", c.name, c.score, c.weight);
        }

        let overall_percentage = weighted_percentage(&components);
        info!("Overall fit {:.1}%", overall_percentage);

        let mut report = FitReport {
            overall_percentage,
            match_level: match_level(overall_percentage).to_string(),
            components,
            matched_skills,
            missing_skills,
            matched_keywords,
            missing_keywords,
            matched_soft_skills,
            missing_soft_skills,
            required_education,
            candidate_education,
            required_years,
            candidate_years,
            feedback: Vec::new(),
            chronology,
        };
        report.feedback = feedback(&report);
        Ok(report)
    }
}

fn components(weights: &Weights, scores: [f64; 7]) -> Vec<ComponentScore> {
    let named = [
        (SEMANTIC, weights.semantic),
        (KEYWORDS, weights.keywords),
        (SKILLS, weights.skills),
        (EDUCATION, weights.education),
        (EXPERIENCE, weights.experience),
        (SOFT_SKILLS, weights.soft_skills),
        (TITLE, weights.title),
    ];
    named
        .into_iter()
        .zip(scores)
        .map(|((name, weight), score)| ComponentScore {
            name: name.to_string(),
            score: score.clamp(0.0, 1.0),
            weight,
        })
        .collect()
}

/// `hits / total` capped at 1; nothing asked for counts as fully met.
fn ratio(hits: f64, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        (hits / total as f64).min(1.0)
    }
}

/// Weighted mean of the component scores as a percentage.
pub fn weighted_percentage(components: &[ComponentScore]) -> f64 {
    let total_weight: f64 = components.iter().map(|c| c.weight.max(0.0)).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = components.iter().map(|c| c.weight.max(0.0) * c.score).sum();
    weighted / total_weight * 100.0
}

pub fn match_level(percentage: f64) -> &'static str {
    if percentage >= 80.0 {
        "Excellent"
    } else if percentage >= 65.0 {
        "Good"
    } else if percentage >= 50.0 {
        "Fair"
    } else {
        "Weak"
    }
}

/// The advertised role: the first non-empty line of the job description,
/// minus a "Title:" style label, if it is short enough to be a title.
pub fn job_title(job: &str) -> Option<String> {
    let line = job
        .lines()
        .map(|l| l.trim().trim_start_matches('#').trim())
        .find(|l| !l.is_empty())?;
    let line = TITLE_PREFIXES
        .iter()
        .find_map(|prefix| {
            line.get(..prefix.len())
                .filter(|head| head.eq_ignore_ascii_case(prefix))
                .map(|_| line[prefix.len()..].trim())
        })
        .unwrap_or(line);

    let words = line.split_whitespace().count();
    (words > 0 && words <= MAX_TITLE_WORDS).then(|| line.to_string())
}

fn feedback(report: &FitReport) -> Vec<String> {
    let mut lines = Vec::new();

    for c in report.components.iter().filter(|c| c.weight > 0.0) {
        if c.score >= STRENGTH_THRESHOLD {
            lines.push(format!("Strength: {} ({:.0}%).", c.name.to_lowercase(), c.score * 100.0));
        } else if c.score < IMPROVEMENT_THRESHOLD {
            if let Some(line) = improvement(c.name.as_str(), report) {
                lines.push(line);
            }
        }
    }

    if !report.missing_skills.is_empty() {
        lines.push(format!("Missing skills: {}.", report.missing_skills.join(", ")));
    }
    let beginner: Vec<&str> = report
        .matched_skills
        .iter()
        .filter(|m| m.proficiency == Proficiency::Beginner)
        .map(|m| m.skill.as_str())
        .collect();
    if !beginner.is_empty() {
        lines.push(format!("Only beginner-level experience shown for: {}.", beginner.join(", ")));
    }
    if let Some(required) = report.required_years {
        if report.candidate_years < f64::from(required) {
            lines.push(format!(
                "Experience shortfall: {:.1} years against {} required.",
                report.candidate_years, required
            ));
        }
    }
    if report.candidate_education < report.required_education {
        lines.push("Education is below the level the job asks for.".to_string());
    }

    lines.extend(chronology_insights(&report.chronology));
    lines
}

fn improvement(component: &str, report: &FitReport) -> Option<String> {
    match component {
        SEMANTIC => Some(
            "Improve: the résumé reads differently from the job description; \
             reuse its wording where it honestly applies."
                .to_string(),
        ),
        KEYWORDS => {
            let sample: Vec<&str> = report.missing_keywords.iter().take(5).map(|k| k.as_str()).collect();
            Some(format!("Improve: cover more of the posting's key terms, such as {}.", sample.join(", ")))
        }
        SOFT_SKILLS => Some(format!(
            "Improve: give evidence of {}.",
            report.missing_soft_skills.join(", ")
        )),
        TITLE => Some(
            "Improve: past job titles differ from the advertised role; \
             highlight comparable responsibilities."
                .to_string(),
        ),
        // covered by the missing-skill and shortfall lines
        _ => None,
    }
}

fn chronology_insights(chronology: &ChronologyReport) -> Vec<String> {
    let mut lines = Vec::new();
    let periods = &chronology.employment_periods;

    if periods.is_empty() {
        lines.push("No dated employment history found; list roles with start and end dates.".to_string());
        return lines;
    }

    lines.push(format!(
        "Employment history: {} roles covering {} years.",
        periods.len(),
        chronology.total_experience_years
    ));
    for gap in &chronology.career_gaps {
        lines.push(format!(
            "Employment gap of {} months between {} and {}.",
            gap.duration_months, gap.start, gap.end
        ));
    }

    let progression = &chronology.career_progression;
    match progression.trend {
        Trend::Upward => lines.push("Career shows upward progression in seniority.".to_string()),
        Trend::Varied => lines.push(
            "Seniority has not moved steadily upward; be ready to explain role changes.".to_string(),
        ),
        Trend::Stable => {}
    }
    if progression.job_hopping {
        lines.push(format!(
            "Frequent job changes (average tenure {:.0} months).",
            progression.average_job_duration
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::Cell;

    const JOB: &str = include_str!("../tests/fixtures/job_description.txt");
    const RESUME: &str = include_str!("../tests/fixtures/resume.txt");

    /// Returns `[1, 0]` for texts mentioning Rust and `[0, 1]` otherwise.
    struct StubEmbedder {
        calls: Cell<usize>,
        fail: bool,
    }

    impl StubEmbedder {
        fn new() -> Self {
            Self { calls: Cell::new(0), fail: false }
        }

        fn failing() -> Self {
            Self { calls: Cell::new(0), fail: true }
        }
    }

    impl EmbeddingProvider for StubEmbedder {
        fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(anyhow!("connection refused"));
            }
            if text.contains("Rust") {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    fn today() -> YearMonth {
        YearMonth::new(2024, 6).unwrap()
    }

    fn score(job: &str, resume: &str) -> FitReport {
        let config = Config::default();
        let embedder = StubEmbedder::new();
        let analyzer = Analyzer::new(&config, &embedder).unwrap();
        analyzer.analyze(job, resume, today()).unwrap()
    }

    fn component(report: &FitReport, name: &str) -> f64 {
        report
            .components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.score)
            .unwrap()
    }

    #[test]
    fn test_fixture_is_a_strong_match() {
        let report = score(JOB, RESUME);

        assert_eq!(component(&report, SEMANTIC), 1.0);
        assert_eq!(component(&report, EDUCATION), 1.0);
        assert_eq!(component(&report, EXPERIENCE), 1.0);
        assert_eq!(component(&report, SOFT_SKILLS), 1.0);
        assert_eq!(report.missing_skills, vec!["kafka"]);
        assert!(report.matched_skills.iter().any(|m| m.skill == "rust" && m.proficiency == Proficiency::Expert));
        assert_eq!(report.required_years, Some(5));
        assert_eq!(report.candidate_years, 9.0);
        assert_eq!((report.required_education, report.candidate_education), (2, 2));
        assert_eq!(report.match_level, "Excellent");

        assert!(report.feedback.iter().any(|l| l == "Missing skills: kafka."));
        assert!(report.feedback.iter().any(|l| l.contains("upward progression")));
        assert!(report.feedback.iter().any(|l| l.contains("gap of 6 months")));
    }

    #[test]
    fn test_overall_is_weighted_mean_of_components() {
        let report = score(JOB, RESUME);
        assert_eq!(report.components.len(), 7);
        assert!((report.overall_percentage - weighted_percentage(&report.components)).abs() < 1e-9);
        assert!((0.0..=100.0).contains(&report.overall_percentage));
        for c in &report.components {
            assert!((0.0..=1.0).contains(&c.score), "{} out of range", c.name);
        }
    }

    #[test]
    fn test_unrelated_job_scores_low() {
        let job = "Registered Nurse\n\n\
                   We need a registered nurse with 3 years of hospital experience, \
                   a Bachelor of Science in Nursing, and excellent communication and teamwork.";
        let report = score(job, RESUME);

        assert_eq!(component(&report, SEMANTIC), 0.0);
        // no technical skills asked for
        assert_eq!(component(&report, SKILLS), 1.0);
        assert_eq!(report.matched_soft_skills, vec!["communication"]);
        assert_eq!(report.missing_soft_skills, vec!["teamwork"]);
        assert!(report.overall_percentage < 65.0);
        assert!(report.feedback.iter().any(|l| l.starts_with("Improve: the résumé reads differently")));
    }

    #[test]
    fn test_claimed_years_used_without_dated_history() {
        let resume = "Rust developer with 4 years of experience.\nSkills: Rust";
        let report = score("Rust Engineer\n\nRequires 8 years with Rust.", resume);
        assert!(report.chronology.employment_periods.is_empty());
        assert_eq!(report.candidate_years, 4.0);
        assert_eq!(component(&report, EXPERIENCE), 0.5);
        assert!(report.feedback.iter().any(|l| l.contains("4.0 years against 8 required")));
        assert!(report.feedback.iter().any(|l| l.contains("No dated employment history")));
    }

    #[test]
    fn test_blank_input_is_rejected_before_embedding() {
        let config = Config::default();
        let embedder = StubEmbedder::new();
        let analyzer = Analyzer::new(&config, &embedder).unwrap();

        let err = analyzer.analyze("  \n", RESUME, today()).unwrap_err();
        assert!(matches!(err, FitError::InputValidation("job description")));
        let err = analyzer.analyze(JOB, "", today()).unwrap_err();
        assert!(matches!(err, FitError::InputValidation("resume")));
        assert_eq!(embedder.calls.get(), 0);
    }

    #[test]
    fn test_embedding_failure_aborts() {
        let config = Config::default();
        let embedder = StubEmbedder::failing();
        let analyzer = Analyzer::new(&config, &embedder).unwrap();

        let err = analyzer.analyze(JOB, RESUME, today()).unwrap_err();
        assert!(matches!(err, FitError::EmbeddingService(_)));
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(embedder.calls.get(), 1);
    }

    #[test]
    fn test_weights_are_configurable() {
        let mut config = Config::default();
        config.weights = Weights {
            semantic: 1.0,
            keywords: 0.0,
            skills: 0.0,
            education: 0.0,
            experience: 0.0,
            soft_skills: 0.0,
            title: 0.0,
        };
        let embedder = StubEmbedder::new();
        let analyzer = Analyzer::new(&config, &embedder).unwrap();
        let report = analyzer.analyze(JOB, RESUME, today()).unwrap();
        assert_eq!(report.overall_percentage, 100.0);
    }

    #[test]
    fn test_weighted_percentage() {
        let components = vec![
            ComponentScore { name: "a".to_string(), score: 1.0, weight: 3.0 },
            ComponentScore { name: "b".to_string(), score: 0.0, weight: 1.0 },
        ];
        assert_eq!(weighted_percentage(&components), 75.0);

        let unweighted = vec![ComponentScore { name: "a".to_string(), score: 1.0, weight: 0.0 }];
        assert_eq!(weighted_percentage(&unweighted), 0.0);
        assert_eq!(weighted_percentage(&[]), 0.0);
    }

    #[test]
    fn test_match_level_boundaries() {
        assert_eq!(match_level(80.0), "Excellent");
        assert_eq!(match_level(79.9), "Good");
        assert_eq!(match_level(65.0), "Good");
        assert_eq!(match_level(64.9), "Fair");
        assert_eq!(match_level(50.0), "Fair");
        assert_eq!(match_level(49.9), "Weak");
        assert_eq!(match_level(0.0), "Weak");
    }

    #[test]
    fn test_job_title() {
        assert_eq!(job_title(JOB).as_deref(), Some("Senior Backend Engineer"));
        assert_eq!(job_title("\n# Job Title: Data Engineer\nmore").as_deref(), Some("Data Engineer"));
        assert_eq!(job_title("position: QA Engineer").as_deref(), Some("QA Engineer"));
        assert_eq!(
            job_title("We are a fast growing company looking for people who love building things"),
            None
        );
        assert_eq!(job_title("   \n"), None);
    }
}
