use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_EMBEDDING_PROVIDER: &str = "RESUME_FIT_EMBEDDING_PROVIDER";
pub const ENV_EMBEDDING_MODEL: &str = "RESUME_FIT_EMBEDDING_MODEL";
pub const ENV_EMBEDDING_URL: &str = "RESUME_FIT_EMBEDDING_URL";

/// Everything tunable about an analysis run. Every section falls back to
/// built-in defaults, so a config file only needs the keys it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub chronology: ChronologyConfig,
    pub matching: MatchingConfig,
    pub weights: Weights,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String, // "ollama" or "openai"
    pub model: String,
    /// Falls back to the provider's own endpoint when unset.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "nomic-embed-text".to_string(),
            base_url: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedTerm {
    pub term: String,
    pub level: u8,
}

impl RankedTerm {
    fn new(term: &str, level: u8) -> Self {
        Self {
            term: term.to_string(),
            level,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChronologyConfig {
    /// Headings that open the work-experience section.
    pub section_headings: Vec<String>,
    /// Headings that close it.
    pub section_terminators: Vec<String>,
    pub title_phrases: Vec<String>,
    /// Words that may precede a title phrase and belong to the title.
    pub title_modifiers: Vec<String>,
    pub seniority_levels: Vec<RankedTerm>,
    pub default_seniority: u8,
    pub education_markers: Vec<String>,
    pub gap_threshold_months: u32,
    pub short_tenure_months: u32,
    /// Characters inspected on each side of a date match.
    pub context_window: usize,
}

impl Default for ChronologyConfig {
    fn default() -> Self {
        Self {
            section_headings: strings(&[
                "work experience",
                "employment",
                "professional experience",
                "work history",
            ]),
            section_terminators: strings(&[
                "education",
                "skills",
                "certification",
                "language",
                "hobbies",
            ]),
            title_phrases: strings(&[
                "software engineer",
                "software developer",
                "backend engineer",
                "frontend engineer",
                "full stack developer",
                "data scientist",
                "data engineer",
                "data analyst",
                "devops engineer",
                "site reliability engineer",
                "machine learning engineer",
                "product manager",
                "project manager",
                "engineering manager",
                "qa engineer",
                "architect",
                "consultant",
                "developer",
                "engineer",
                "analyst",
                "designer",
                "manager",
                "director",
                "intern",
                "cto",
            ]),
            title_modifiers: strings(&[
                "junior", "jr.", "jr", "senior", "sr.", "sr", "lead", "staff", "principal", "head",
                "chief",
            ]),
            seniority_levels: vec![
                RankedTerm::new("junior", 1),
                RankedTerm::new("mid", 2),
                RankedTerm::new("senior", 3),
                RankedTerm::new("lead", 4),
                RankedTerm::new("principal", 5),
                RankedTerm::new("manager", 5),
                RankedTerm::new("director", 6),
                RankedTerm::new("vp", 7),
                RankedTerm::new("cto", 8),
            ],
            default_seniority: 2,
            education_markers: strings(&[
                "education",
                "university",
                "college",
                "school",
                "degree",
                "bachelors",
                "masters",
                "phd",
                "graduate",
            ]),
            gap_threshold_months: 3,
            short_tenure_months: 12,
            context_window: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub technical_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub stopwords: Vec<String>,
    pub degree_levels: Vec<RankedTerm>,
    /// Jaro-Winkler similarity needed for a fuzzy hit.
    pub fuzzy_threshold: f64,
    pub keyword_limit: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            technical_skills: strings(&[
                "rust", "python", "java", "javascript", "typescript", "go", "c++", "c#", "ruby",
                "kotlin", "swift", "scala", "sql", "react", "angular", "vue", "node.js", "django",
                "flask", "spring", "graphql", "rest", "grpc", "docker", "kubernetes", "terraform",
                "ansible", "aws", "azure", "gcp", "linux", "git", "ci/cd", "jenkins", "postgresql",
                "mysql", "mongodb", "redis", "kafka", "elasticsearch", "spark", "hadoop",
                "tensorflow", "pytorch", "machine learning", "microservices", "distributed systems",
                "agile", "scrum",
            ]),
            soft_skills: strings(&[
                "communication",
                "leadership",
                "teamwork",
                "collaboration",
                "problem solving",
                "mentoring",
                "adaptability",
                "time management",
                "critical thinking",
                "ownership",
                "creativity",
                "attention to detail",
            ]),
            stopwords: strings(&[
                "the", "and", "for", "with", "you", "your", "our", "are", "will", "have", "has",
                "this", "that", "from", "who", "what", "their", "they", "them", "but", "not",
                "all", "any", "can", "able", "into", "about", "more", "most", "such", "also",
                "including", "using", "work", "working", "team", "years", "year", "experience",
                "strong", "plus", "etc", "well", "must", "should", "would", "looking", "join",
                "role", "job", "position", "candidate", "ideal", "responsibilities",
                "requirements", "preferred", "required", "skills", "knowledge", "ability",
                "across", "within", "new", "other", "both", "least", "one", "two", "three",
            ]),
            degree_levels: vec![
                RankedTerm::new("associate", 1),
                RankedTerm::new("bachelor", 2),
                RankedTerm::new("bachelors", 2),
                RankedTerm::new("bachelor's", 2),
                RankedTerm::new("b.s.", 2),
                RankedTerm::new("bsc", 2),
                RankedTerm::new("master", 3),
                RankedTerm::new("masters", 3),
                RankedTerm::new("master's", 3),
                RankedTerm::new("m.s.", 3),
                RankedTerm::new("msc", 3),
                RankedTerm::new("mba", 3),
                RankedTerm::new("phd", 4),
                RankedTerm::new("ph.d", 4),
                RankedTerm::new("doctorate", 4),
            ],
            fuzzy_threshold: 0.9,
            keyword_limit: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub semantic: f64,
    pub keywords: f64,
    pub skills: f64,
    pub education: f64,
    pub experience: f64,
    pub soft_skills: f64,
    pub title: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            semantic: 0.30,
            keywords: 0.15,
            skills: 0.20,
            education: 0.10,
            experience: 0.10,
            soft_skills: 0.05,
            title: 0.10,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "resume-fit")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load from `explicit` if given, otherwise from the default location
    /// when a file exists there, otherwise built-in defaults. Environment
    /// overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_overrides(|key| env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = lookup(ENV_EMBEDDING_PROVIDER) {
            self.embedding.provider = provider;
        }
        if let Some(model) = lookup(ENV_EMBEDDING_MODEL) {
            self.embedding.model = model;
        }
        if let Some(url) = lookup(ENV_EMBEDDING_URL) {
            self.embedding.base_url = Some(url);
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_thresholds() {
        let config = Config::default();
        assert_eq!(config.chronology.gap_threshold_months, 3);
        assert_eq!(config.chronology.short_tenure_months, 12);
        assert_eq!(config.chronology.context_window, 100);
        let w = &config.weights;
        let total = w.semantic + w.keywords + w.skills + w.education + w.experience + w.soft_skills + w.title;
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "chronology": {{ "gap_threshold_months": 6 }}, "weights": {{ "semantic": 0.5 }} }}"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.chronology.gap_threshold_months, 6);
        assert_eq!(config.chronology.short_tenure_months, 12);
        assert!(!config.chronology.seniority_levels.is_empty());
        assert_eq!(config.weights.semantic, 0.5);
        assert_eq!(config.weights.skills, 0.20);
        assert_eq!(config.embedding.provider, "ollama");
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            ENV_EMBEDDING_MODEL => Some("all-minilm".to_string()),
            ENV_EMBEDDING_URL => Some("http://embed.local:8080".to_string()),
            _ => None,
        });
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.embedding.model, "all-minilm");
        assert_eq!(config.embedding.base_url.as_deref(), Some("http://embed.local:8080"));
    }
}
