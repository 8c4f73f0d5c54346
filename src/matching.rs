use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use crate::config::{MatchingConfig, RankedTerm};
use crate::errors::FitError;
use crate::models::Proficiency;

/// Characters inspected on each side of a skill mention.
const PROFICIENCY_WINDOW: usize = 60;
/// Below this length fuzzy matching produces more noise than hits.
const MIN_FUZZY_LEN: usize = 4;

const LEVEL_WORDS: [(&str, Proficiency); 10] = [
    ("expert", Proficiency::Expert),
    ("mastery", Proficiency::Expert),
    ("advanced", Proficiency::Advanced),
    ("proficient", Proficiency::Advanced),
    ("intermediate", Proficiency::Intermediate),
    ("working knowledge", Proficiency::Intermediate),
    ("familiar", Proficiency::Beginner),
    ("basic", Proficiency::Beginner),
    ("beginner", Proficiency::Beginner),
    ("exposure", Proficiency::Beginner),
];

/// Regex alternation of `terms`, escaped, longest first so that
/// "software engineer" wins over "engineer".
pub fn term_alternation(terms: &[String]) -> String {
    let mut terms: Vec<&str> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        // matches nothing
        return r"\b\B".to_string();
    }
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    terms.dedup();
    terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|")
}

/// Case-insensitive match of `term` not glued to other word characters.
/// Unlike `\b` this works for terms such as "c++" or ".net".
fn term_regex(term: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(r"(?i)(?:^|\W){}(?:\W|$)", regex::escape(term.trim())))
}

/// `radius` characters either side of `span`, and the byte offset where
/// the window starts.
pub fn context_window(text: &str, span: Range<usize>, radius: usize) -> (&str, usize) {
    let start = if radius == 0 {
        span.start
    } else {
        text[..span.start]
            .char_indices()
            .rev()
            .take(radius)
            .last()
            .map(|(i, _)| i)
            .unwrap_or(span.start)
    };
    let end = text[span.end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| span.end + i)
        .unwrap_or(text.len());
    (&text[start..end], start)
}

/// Lower-cased word tokens. `+`, `#` and inner dots stay so that "c++",
/// "c#" and "node.js" survive.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.')))
        .map(|token| token.trim_matches('.'))
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// The most frequent meaningful words of `text`, ties broken
/// alphabetically.
pub fn extract_keywords(text: &str, stopwords: &[String], limit: usize) -> Vec<String> {
    let stopwords: HashSet<&str> = stopwords.iter().map(|s| s.as_str()).collect();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for token in tokenize(text) {
        if token.chars().count() < 3
            || stopwords.contains(token.as_str())
            || token.chars().all(|c| c.is_ascii_digit() || c == '.')
        {
            continue;
        }
        *counts.entry(token).or_default() += 1;
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(word, _)| word).collect()
}

/// Best Jaro-Winkler similarity between `term` and any run of the same
/// number of tokens in `tokens`.
pub fn fuzzy_similarity(tokens: &[String], term: &str) -> f64 {
    let term = term.trim().to_lowercase();
    let width = term.split_whitespace().count().max(1);
    if term.chars().count() < MIN_FUZZY_LEN || tokens.len() < width {
        return 0.0;
    }
    tokens
        .windows(width)
        .map(|run| strsim::jaro_winkler(&term, &run.join(" ")))
        .fold(0.0, f64::max)
}

/// Mean of token Jaccard overlap and Jaro-Winkler similarity against the
/// closest of `titles`.
pub fn title_relevance(job_title: &str, titles: &[&str]) -> f64 {
    let wanted: HashSet<String> = tokenize(job_title).into_iter().collect();
    if wanted.is_empty() {
        return 0.0;
    }
    let wanted_lower = job_title.trim().to_lowercase();

    titles
        .iter()
        .map(|title| {
            let have: HashSet<String> = tokenize(title).into_iter().collect();
            let union = wanted.union(&have).count();
            let jaccard = if union == 0 {
                0.0
            } else {
                wanted.intersection(&have).count() as f64 / union as f64
            };
            let similarity = strsim::jaro_winkler(&wanted_lower, &title.trim().to_lowercase());
            (jaccard + similarity) / 2.0
        })
        .fold(0.0, f64::max)
}

/// Share of skill credit a mention earns at a given proficiency.
pub fn proficiency_credit(level: Proficiency) -> f64 {
    match level {
        Proficiency::Expert | Proficiency::Advanced => 1.0,
        Proficiency::Intermediate | Proficiency::Unspecified => 0.9,
        Proficiency::Beginner => 0.7,
    }
}

/// A fixed vocabulary compiled for repeated lookups.
#[derive(Debug)]
pub struct TermSet {
    terms: Vec<(String, Regex)>,
}

impl TermSet {
    pub fn new(terms: &[String]) -> Result<Self, regex::Error> {
        let mut seen = HashSet::new();
        let terms = terms
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty() && seen.insert(t.clone()))
            .map(|t| term_regex(&t).map(|regex| (t, regex)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { terms })
    }

    /// Vocabulary entries present in `text`, in vocabulary order.
    pub fn found_in(&self, text: &str) -> Vec<String> {
        self.terms
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(term, _)| term.clone())
            .collect()
    }

    pub fn contains(&self, text: &str, term: &str) -> bool {
        self.mentions(text, term).next().is_some()
    }

    fn mentions<'s, 't>(&'s self, text: &'t str, term: &str) -> impl Iterator<Item = Range<usize>> + use<'s, 't> {
        let term = term.trim().to_lowercase();
        self.terms
            .iter()
            .filter(move |(t, _)| *t == term)
            .flat_map(move |(_, regex)| regex.find_iter(text).map(|m| m.range()))
    }
}

/// Vocabulary entries that carry a level; a text scores the highest level
/// it mentions.
#[derive(Debug)]
pub struct RankedTerms {
    terms: Vec<(Regex, u8)>,
}

impl RankedTerms {
    /// Terms match as whole words.
    pub fn new(terms: &[RankedTerm]) -> Result<Self, regex::Error> {
        Self::build(terms, term_regex)
    }

    /// Terms match anywhere in the text, so "Team Leader" counts as "lead".
    pub fn substrings(terms: &[RankedTerm]) -> Result<Self, regex::Error> {
        Self::build(terms, |term| Regex::new(&format!("(?i){}", regex::escape(term.trim()))))
    }

    fn build(
        terms: &[RankedTerm],
        pattern: impl Fn(&str) -> Result<Regex, regex::Error>,
    ) -> Result<Self, regex::Error> {
        let terms = terms
            .iter()
            .filter(|ranked| !ranked.term.trim().is_empty())
            .map(|ranked| pattern(&ranked.term).map(|regex| (regex, ranked.level)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { terms })
    }

    pub fn max_level(&self, text: &str) -> Option<u8> {
        self.terms
            .iter()
            .filter(|(regex, _)| regex.is_match(text))
            .map(|(_, level)| *level)
            .max()
    }
}

/// Compiled vocabularies and patterns used by the scorer.
#[derive(Debug)]
pub struct TextMatcher {
    pub skills: TermSet,
    pub soft_skills: TermSet,
    degrees: RankedTerms,
    required_years: Regex,
    claimed_years: Regex,
    years_near: Regex,
    stopwords: Vec<String>,
    fuzzy_threshold: f64,
    keyword_limit: usize,
}

impl TextMatcher {
    pub fn new(config: &MatchingConfig) -> Result<Self, FitError> {
        Ok(Self {
            skills: TermSet::new(&config.technical_skills)?,
            soft_skills: TermSet::new(&config.soft_skills)?,
            degrees: RankedTerms::new(&config.degree_levels)?,
            required_years: Regex::new(
                r"(?i)\b(\d{1,2})\s*\+?\s*(?:(?:-|–|to)\s*\d{1,2}\s*\+?\s*)?(?:years?|yrs?)\b",
            )?,
            claimed_years: Regex::new(
                r"(?i)\b(\d{1,2})\s*\+?\s*(?:years?|yrs?)\s+(?:of\s+)?(?:professional\s+|industry\s+|relevant\s+|hands-on\s+)?experience\b",
            )?,
            years_near: Regex::new(r"(?i)\b(\d{1,2})\s*\+?\s*(?:years?|yrs?)\b")?,
            stopwords: config.stopwords.clone(),
            fuzzy_threshold: config.fuzzy_threshold,
            keyword_limit: config.keyword_limit,
        })
    }

    pub fn keywords(&self, text: &str) -> Vec<String> {
        extract_keywords(text, &self.stopwords, self.keyword_limit)
    }

    /// Whether `term` appears in `tokens` closely enough to count.
    pub fn fuzzy_match(&self, tokens: &[String], term: &str) -> bool {
        fuzzy_similarity(tokens, term) >= self.fuzzy_threshold
    }

    /// Highest degree level mentioned; 0 when none is.
    pub fn education_level(&self, text: &str) -> u8 {
        self.degrees.max_level(text).unwrap_or(0)
    }

    /// Largest "N years" figure in a job description, ignoring anything
    /// above 40 (company age, salary bands and the like).
    pub fn required_years(&self, text: &str) -> Option<u32> {
        self.required_years
            .captures_iter(text)
            .filter_map(|caps| caps[1].parse::<u32>().ok())
            .filter(|years| (1..=40).contains(years))
            .max()
    }

    /// "N years of experience" claimed outright in a résumé.
    pub fn claimed_years(&self, text: &str) -> Option<f64> {
        self.claimed_years
            .captures_iter(text)
            .filter_map(|caps| caps[1].parse::<u32>().ok())
            .filter(|years| *years <= 50)
            .max()
            .map(f64::from)
    }

    /// Level hints around each mention of `skill` in `text`.
    pub fn skill_proficiency(&self, text: &str, skill: &str) -> Proficiency {
        let mut level = Proficiency::Unspecified;

        for span in self.skills.mentions(text, skill) {
            let (window, _) = context_window(text, span, PROFICIENCY_WINDOW);
            let window = window.to_lowercase();

            for (word, hint) in LEVEL_WORDS {
                if window.contains(word) {
                    level = level.max(hint);
                }
            }

            for caps in self.years_near.captures_iter(&window) {
                let hint = match caps[1].parse::<u32>() {
                    Ok(years) if years >= 5 => Proficiency::Expert,
                    Ok(years) if years >= 3 => Proficiency::Advanced,
                    Ok(years) if years >= 1 => Proficiency::Intermediate,
                    _ => continue,
                };
                level = level.max(hint);
            }
        }

        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> TextMatcher {
        TextMatcher::new(&MatchingConfig::default()).unwrap()
    }

    #[test]
    fn test_term_alternation_longest_first() {
        let terms = vec!["engineer".to_string(), "software engineer".to_string(), "c++".to_string()];
        assert_eq!(term_alternation(&terms), r"software engineer|engineer|c\+\+");
    }

    #[test]
    fn test_empty_alternation_matches_nothing() {
        let regex = Regex::new(&format!("(?:{})", term_alternation(&[]))).unwrap();
        assert!(!regex.is_match("anything at all"));
        assert!(!regex.is_match(""));
    }

    #[test]
    fn test_tokenize_keeps_symbol_languages() {
        assert_eq!(
            tokenize("Rust, C++ and Node.js (C#)."),
            vec!["rust", "c++", "and", "node.js", "c#"]
        );
    }

    #[test]
    fn test_extract_keywords_ranks_by_frequency() {
        let stopwords = vec!["the".to_string(), "and".to_string()];
        let text = "Kubernetes and Terraform. Kubernetes clusters, the kubernetes way. Terraform 2024.";
        let keywords = extract_keywords(text, &stopwords, 3);
        assert_eq!(keywords, vec!["kubernetes", "terraform", "clusters"]);
    }

    #[test]
    fn test_term_set_respects_symbol_boundaries() {
        let terms = TermSet::new(&["c++".to_string(), "go".to_string(), "rust".to_string()]).unwrap();
        assert_eq!(terms.found_in("Wrote C++ and Rust daily"), vec!["c++", "rust"]);
        // "go" inside "google" or "going" is not the language
        assert!(terms.found_in("Going to Google").is_empty());
        assert!(terms.contains("Go, Rust", "go"));
    }

    #[test]
    fn test_fuzzy_similarity() {
        let tokens = tokenize("Deployed services on kubernets with postgres");
        let m = matcher();
        assert!(m.fuzzy_match(&tokens, "kubernetes"));
        assert!(m.fuzzy_match(&tokens, "postgresql"));
        assert!(!m.fuzzy_match(&tokens, "terraform"));
        // short terms never fuzzy-match
        assert_eq!(fuzzy_similarity(&tokens, "go"), 0.0);
    }

    #[test]
    fn test_fuzzy_similarity_multi_word() {
        let tokens = tokenize("background in machine-learning research");
        assert!(fuzzy_similarity(&tokens, "machine learning") > 0.95);
    }

    #[test]
    fn test_ranked_terms_word_and_substring_modes() {
        let table = vec![
            RankedTerm { term: "lead".to_string(), level: 4 },
            RankedTerm { term: "cto".to_string(), level: 8 },
        ];
        let words = RankedTerms::new(&table).unwrap();
        let substrings = RankedTerms::substrings(&table).unwrap();

        assert_eq!(words.max_level("Team Leader"), None);
        assert_eq!(substrings.max_level("Team Leader"), Some(4));
        assert_eq!(words.max_level("Director"), None);
        assert_eq!(substrings.max_level("Director"), Some(8));
        assert_eq!(words.max_level("Tech Lead"), Some(4));
        assert_eq!(substrings.max_level("Engineer"), None);
    }

    #[test]
    fn test_education_level() {
        let m = matcher();
        assert_eq!(m.education_level("B.S. in Computer Science"), 2);
        assert_eq!(m.education_level("Master's degree or PhD preferred"), 4);
        assert_eq!(m.education_level("MBA, Wharton"), 3);
        assert_eq!(m.education_level("Self taught"), 0);
    }

    #[test]
    fn test_required_years() {
        let m = matcher();
        assert_eq!(m.required_years("5+ years of Rust, 3 years of Go"), Some(5));
        assert_eq!(m.required_years("3-5 years building APIs"), Some(3));
        assert_eq!(m.required_years("We have been around for 120 years"), None);
        assert_eq!(m.required_years("No experience needed"), None);
    }

    #[test]
    fn test_claimed_years() {
        let m = matcher();
        assert_eq!(m.claimed_years("Engineer with 7 years of professional experience"), Some(7.0));
        assert_eq!(m.claimed_years("Rust for 3 years"), None);
    }

    #[test]
    fn test_skill_proficiency_hints() {
        let m = matcher();
        assert_eq!(m.skill_proficiency("Expert in Rust and systems programming", "rust"), Proficiency::Expert);
        assert_eq!(m.skill_proficiency("Python (4 years)", "python"), Proficiency::Advanced);
        assert_eq!(m.skill_proficiency("Basic familiarity with Docker", "docker"), Proficiency::Beginner);
        assert_eq!(m.skill_proficiency("Used Redis for caching", "redis"), Proficiency::Unspecified);
        assert_eq!(m.skill_proficiency("No mention here", "redis"), Proficiency::Unspecified);
    }

    #[test]
    fn test_context_window_respects_char_boundaries() {
        let text = "ééééé 2019 - 2020 ééééé";
        let span = 11..22;
        assert_eq!(&text[span.clone()], "2019 - 2020");
        let (window, offset) = context_window(text, span, 3);
        assert_eq!(window, "éé 2019 - 2020 éé");
        assert_eq!(offset, 6);
    }

    #[test]
    fn test_title_relevance() {
        let exact = title_relevance("Senior Software Engineer", &["Senior Software Engineer"]);
        assert!((exact - 1.0).abs() < 1e-9);

        let close = title_relevance("Senior Software Engineer", &["Software Engineer", "Barista"]);
        let far = title_relevance("Senior Software Engineer", &["Barista"]);
        assert!(close > far);
        assert_eq!(title_relevance("Engineer", &[]), 0.0);
    }
}
