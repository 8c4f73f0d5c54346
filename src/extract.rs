use regex::Regex;
use std::ops::Range;
use tracing::debug;

use crate::config::ChronologyConfig;
use crate::dates::{DateParser, month_index};
use crate::errors::FitError;
use crate::matching::{context_window, term_alternation};
use crate::models::EmploymentPeriod;

const BULLETS: [char; 3] = ['-', '•', '*'];

/// Layouts recognised for a single résumé line, tried in order.
#[derive(Debug)]
struct LineFormat {
    name: &'static str,
    regex: Regex,
}

impl LineFormat {
    fn all() -> Result<Vec<Self>, FitError> {
        Ok(vec![
            // Senior Engineer | Acme Corp | Jan 2019 - Present
            LineFormat {
                name: "pipe",
                regex: Regex::new(
                    r"^(?P<title>[^|]+?)\s*\|\s*(?P<company>[^|]+?)\s*\|\s*(?P<dates>.+)$",
                )?,
            },
            // Senior Engineer at Acme Corp (Jan 2019 - Present)
            LineFormat {
                name: "at",
                regex: Regex::new(
                    r"^(?P<title>.+?)\s+(?i:at)\s+(?P<company>.+?)\s*\((?P<dates>[^)]+)\)\s*$",
                )?,
            },
            // Senior Engineer, Acme Corp, Jan 2019 - Present
            LineFormat {
                name: "comma",
                regex: Regex::new(r"^(?P<title>[^,]+?),\s*(?P<company>[^,]+?),\s*(?P<dates>.+)$")?,
            },
        ])
    }
}

/// Finds employment periods in résumé text.
///
/// Structured lines inside the work-experience section are preferred. When
/// none are found, every date range in the section (or in the whole text
/// if there is no section) becomes a period, with title and company
/// guessed from the surrounding text.
#[derive(Debug)]
pub struct EntryExtractor<'a> {
    config: &'a ChronologyConfig,
    dates: &'a DateParser,
    heading: Regex,
    terminator: Regex,
    education: Regex,
    title: Regex,
    companies: Vec<Regex>,
    line_formats: Vec<LineFormat>,
}

impl<'a> EntryExtractor<'a> {
    pub fn new(config: &'a ChronologyConfig, dates: &'a DateParser) -> Result<Self, FitError> {
        let heading = heading_regex(&config.section_headings)?;
        let terminator = heading_regex(&config.section_terminators)?;
        let education = Regex::new(&format!(
            r"(?i)\b(?:{})\b",
            term_alternation(&config.education_markers)
        ))?;
        let title = Regex::new(&format!(
            r"(?i)\b(?:(?:{})\s+)*(?:{})\b",
            term_alternation(&config.title_modifiers),
            term_alternation(&config.title_phrases)
        ))?;
        let company_name = r"[A-Z][\w&'.-]*(?:[ \t]+[A-Z][\w&'.-]*)*";
        let companies = vec![
            Regex::new(&format!(r"\bat\s+({company_name})"))?,
            Regex::new(&format!(r"\b(?:with|for)\s+({company_name})"))?,
        ];

        Ok(Self {
            config,
            dates,
            heading,
            terminator,
            education,
            title,
            companies,
            line_formats: LineFormat::all()?,
        })
    }

    pub fn extract(&self, text: &str) -> Vec<EmploymentPeriod> {
        let section = self.locate_section(text);

        if let Some(section) = section {
            let entries = self.extract_structured(section);
            if !entries.is_empty() {
                debug!("Found {} structured entries", entries.len());
                return entries;
            }
        }

        let entries = self.extract_from_dates(section.unwrap_or(text), section.is_some());
        debug!(
            "Found {} entries from date scan (work section: {})",
            entries.len(),
            section.is_some()
        );
        entries
    }

    /// The text between the work-experience heading and the next section
    /// heading (or the end of the text).
    pub fn locate_section<'t>(&self, text: &'t str) -> Option<&'t str> {
        let heading = self.heading.find(text)?;
        let rest = &text[heading.end()..];
        let end = self
            .terminator
            .find(rest)
            .map(|m| m.start())
            .unwrap_or(rest.len());
        Some(&rest[..end])
    }

    fn extract_structured(&self, section: &str) -> Vec<EmploymentPeriod> {
        let mut entries = Vec::new();

        for line in section.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(BULLETS) {
                continue;
            }

            let Some((format, caps)) = self
                .line_formats
                .iter()
                .find_map(|f| f.regex.captures(line).map(|caps| (f.name, caps)))
            else {
                continue;
            };

            match self.dates.parse(&caps["dates"]) {
                Ok(range) => entries.push(EmploymentPeriod::new(
                    range,
                    Some(caps["title"].to_string()),
                    Some(caps["company"].to_string()),
                    line,
                )),
                Err(e) => debug!("Skipping {} line {:?}: {}", format, line, e),
            }
        }

        entries
    }

    fn extract_from_dates(&self, region: &str, section_found: bool) -> Vec<EmploymentPeriod> {
        let mut entries = Vec::new();

        for found in self.dates.scan(region) {
            let range = match found.result {
                Ok(range) => range,
                Err(e) => {
                    debug!("Skipping {:?} date match: {}", found.format, e);
                    continue;
                }
            };

            let (window, offset) = context_window(region, found.span.clone(), self.config.context_window);
            if !section_found && self.education.is_match(window) {
                debug!("Skipping education dates: {:?}", &region[found.span.clone()]);
                continue;
            }

            let anchor = found.span.start - offset;
            let title = self.infer_title(window, anchor);
            let company = self.infer_company(window, anchor);
            entries.push(EmploymentPeriod::new(range, title, company, window.trim()));
        }

        entries
    }

    /// The title phrase closest to `anchor`, longer phrases winning ties.
    fn infer_title(&self, window: &str, anchor: usize) -> Option<String> {
        self.title
            .find_iter(window)
            .min_by_key(|m| (distance(m.range(), anchor), std::cmp::Reverse(m.len())))
            .map(|m| m.as_str().trim().to_string())
    }

    fn infer_company(&self, window: &str, anchor: usize) -> Option<String> {
        self.companies.iter().find_map(|pattern| {
            pattern
                .captures_iter(window)
                .filter_map(|caps| caps.get(1))
                .filter_map(|m| clean_company(m.as_str()).map(|name| (distance(m.range(), anchor), name)))
                .min_by_key(|(d, _)| *d)
                .map(|(_, name)| name)
        })
    }
}

/// Matches a heading line: optional markdown hashes, one of `terms`, up
/// to three more plain words such as "& Certifications", and an optional
/// ":". Lines with digits, commas or pipes are entries, not headings.
fn heading_regex(terms: &[String]) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?im)^[ \t]*#*[ \t]*(?:{})\w*(?:[ \t]+[A-Za-z&]+){{0,3}}[ \t]*:?[ \t]*$",
        term_alternation(terms)
    ))
}

fn distance(range: Range<usize>, anchor: usize) -> usize {
    if range.end <= anchor {
        anchor - range.end
    } else {
        range.start.saturating_sub(anchor)
    }
}

/// Cut a captured company name before any month or year that the
/// capitalised-phrase pattern ran into.
fn clean_company(raw: &str) -> Option<String> {
    let name = raw
        .split_whitespace()
        .take_while(|word| {
            month_index(word).is_none() && !word.chars().next().is_some_and(|c| c.is_ascii_digit())
        })
        .collect::<Vec<_>>()
        .join(" ");
    let name = name.trim_end_matches(['.', ',', ';', ':']).to_string();
    if name.is_empty() { None } else { Some(name) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::YearMonth;

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn extract(text: &str) -> Vec<EmploymentPeriod> {
        let config = ChronologyConfig::default();
        let dates = DateParser::new(ym(2024, 6)).unwrap();
        let extractor = EntryExtractor::new(&config, &dates).unwrap();
        extractor.extract(text)
    }

    #[test]
    fn test_locate_section_stops_at_next_heading() {
        let config = ChronologyConfig::default();
        let dates = DateParser::new(ym(2024, 6)).unwrap();
        let extractor = EntryExtractor::new(&config, &dates).unwrap();

        let text = "Jane Doe\n\n## Professional Experience\nEngineer | Acme | 2019 - 2020\n\nEDUCATION\nBSc, State University, 2010 - 2014\n";
        let section = extractor.locate_section(text).unwrap();
        assert!(section.contains("Acme"));
        assert!(!section.contains("State University"));

        assert!(extractor.locate_section("Jane Doe\nSkills: Rust").is_none());
    }

    #[test]
    fn test_entries_starting_with_section_words_stay_in_section() {
        let text = "Work Experience\n\
                    Senior Engineer | Acme | 2019 - 2021\n\
                    Language Tutor, Berlitz, 2015 - 2016\n\
                    Engineer | Globex | 2017 - 2018\n\
                    Skills Trainer | Initech | 2012 - 2013\n\
                    \n\
                    Skills & Tools:\n\
                    Rust, Go, 2010 - 2011\n";
        let companies: Vec<_> = extract(text)
            .into_iter()
            .filter_map(|entry| entry.company)
            .collect();
        assert_eq!(companies, vec!["Acme", "Berlitz", "Globex", "Initech"]);
    }

    #[test]
    fn test_entry_line_does_not_open_section() {
        let config = ChronologyConfig::default();
        let dates = DateParser::new(ym(2024, 6)).unwrap();
        let extractor = EntryExtractor::new(&config, &dates).unwrap();

        assert!(extractor.locate_section("Employment Lawyer, Dewey, 2010 - 2012\n").is_none());
        assert!(extractor.locate_section("EMPLOYMENT HISTORY:\nLawyer, Dewey, 2010 - 2012\n").is_some());
    }

    #[test]
    fn test_structured_formats() {
        let text = "WORK EXPERIENCE\n\
                    Senior Engineer | Acme Corp | Jan 2021 - Present\n\
                    - Built the billing pipeline, 2021 - 2022\n\
                    Software Engineer at Globex (03/2018 - 12/2020)\n\
                    Intern, Initech, 2017 - 2017\n\
                    Consultant | Nowhere | sometime\n\
                    \n\
                    Skills\n\
                    Rust, Go\n";
        let entries = extract(text);
        assert_eq!(entries.len(), 3);

        assert_eq!(entries[0].job_title.as_deref(), Some("Senior Engineer"));
        assert_eq!(entries[0].company.as_deref(), Some("Acme Corp"));
        assert_eq!(entries[0].start, ym(2021, 1));
        assert!(entries[0].is_current);

        assert_eq!(entries[1].job_title.as_deref(), Some("Software Engineer"));
        assert_eq!(entries[1].company.as_deref(), Some("Globex"));
        assert_eq!(entries[1].end, ym(2020, 12));

        assert_eq!(entries[2].company.as_deref(), Some("Initech"));
        assert_eq!(entries[2].duration_months, 12);
    }

    #[test]
    fn test_inverted_structured_dates_are_dropped() {
        let text = "Employment\nEngineer | Acme | Dec 2020 - Jan 2019\nEngineer | Globex | 2015 - 2016\n";
        let entries = extract(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].company.as_deref(), Some("Globex"));
    }

    #[test]
    fn test_unstructured_section_infers_title_and_company() {
        let text = "Work History\n\
                    I worked as a Senior Software Engineer at Globex Corporation from March 2016 until May 2019, \
                    leading the payments team.\n\
                    Education\n\
                    BSc, State University, 2010 - 2014\n";
        let entries = extract(text);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.job_title.as_deref(), Some("Senior Software Engineer"));
        assert_eq!(entry.company.as_deref(), Some("Globex Corporation"));
        assert_eq!(entry.start, ym(2016, 3));
        assert_eq!(entry.end, ym(2019, 5));
    }

    #[test]
    fn test_company_stops_before_month_name() {
        let text = "Experience summary: Data Engineer at Umbrella Labs Jan 2019 - Dec 2020.";
        let entries = extract(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].company.as_deref(), Some("Umbrella Labs"));
        assert_eq!(entries[0].job_title.as_deref(), Some("Data Engineer"));
    }

    #[test]
    fn test_no_section_skips_schooling_dates() {
        let text = "Jane Doe\nSkills: Rust, SQL\nBSc Computer Science, State University 2012 - 2016\n";
        assert!(extract(text).is_empty());
    }

    #[test]
    fn test_no_section_keeps_job_dates_away_from_schooling() {
        let text = format!(
            "Jane Doe\nDeveloper for Hooli, 2019 - 2021.{}\nBSc, State University 2012 - 2016\n",
            " Shipped features.".repeat(10)
        );
        let entries = extract(&text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].job_title.as_deref(), Some("Developer"));
        assert_eq!(entries[0].company.as_deref(), Some("Hooli"));
    }

    #[test]
    fn test_section_keeps_dates_near_education_words() {
        let text = "Employment\nTaught at Springfield College as an Analyst, 2014 - 2016.\n";
        let entries = extract(text);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].company.as_deref(), Some("Springfield College"));
    }
}
