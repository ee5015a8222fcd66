//! Job board definitions.
//!
//! A board is data: a domain to restrict searches to and, for each job field,
//! an ordered list of extraction rules. Adding a board means adding an entry
//! to a boards file, not code. Rules are compiled and validated when the file
//! is loaded so a bad selector fails the run before any request is made.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use ja_core::{Error, Result};
use crate::search::host_matches;

const BUILTIN_BOARDS: &str = include_str!("default_boards.json");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRule {
    /// CSS selector; the first matching element is used
    pub selector: String,
    /// Attribute to read instead of the element text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectorConfig {
    #[serde(default)]
    pub title: Vec<FieldRule>,
    #[serde(default)]
    pub company: Vec<FieldRule>,
    #[serde(default)]
    pub posted_date: Vec<FieldRule>,
    #[serde(default)]
    pub description: Vec<FieldRule>,
}

impl SelectorConfig {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.company.is_empty()
            && self.posted_date.is_empty()
            && self.description.is_empty()
    }

    fn compile(&self, owner: &str) -> Result<FieldRules> {
        Ok(FieldRules {
            title: compile_rules(&self.title, owner, Field::Title)?,
            company: compile_rules(&self.company, owner, Field::Company)?,
            posted_date: compile_rules(&self.posted_date, owner, Field::PostedDate)?,
            description: compile_rules(&self.description, owner, Field::Description)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoardsFile {
    /// Generic rules tried after a board's own rules and its structured data
    #[serde(default)]
    pub fallback: SelectorConfig,
    pub boards: Vec<BoardConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Company,
    PostedDate,
    Description,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Title => "title",
            Field::Company => "company",
            Field::PostedDate => "posted_date",
            Field::Description => "description",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub selector: Selector,
    pub source: String,
    pub attribute: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    title: Vec<CompiledRule>,
    company: Vec<CompiledRule>,
    posted_date: Vec<CompiledRule>,
    description: Vec<CompiledRule>,
}

impl FieldRules {
    pub fn get(&self, field: Field) -> &[CompiledRule] {
        match field {
            Field::Title => &self.title,
            Field::Company => &self.company,
            Field::PostedDate => &self.posted_date,
            Field::Description => &self.description,
        }
    }
}

fn compile_rules(rules: &[FieldRule], owner: &str, field: Field) -> Result<Vec<CompiledRule>> {
    rules
        .iter()
        .map(|rule| {
            let selector = Selector::parse(&rule.selector).map_err(|e| {
                Error::Configuration(format!(
                    "{}: invalid {} selector '{}': {}",
                    owner, field, rule.selector, e
                ))
            })?;
            let attribute = match rule.attribute.as_deref().map(str::trim) {
                Some("") => {
                    return Err(Error::Configuration(format!(
                        "{}: empty attribute name for {} selector '{}'",
                        owner, field, rule.selector
                    )))
                }
                other => other.map(str::to_string),
            };
            Ok(CompiledRule {
                selector,
                source: rule.selector.clone(),
                attribute,
            })
        })
        .collect()
}

/// A validated board: its own rules plus the shared fallback rules.
#[derive(Debug, Clone)]
pub struct Board {
    pub name: String,
    pub domain: String,
    pub rules: FieldRules,
    pub fallback: FieldRules,
}

impl Board {
    pub fn can_handle(&self, url: &str) -> bool {
        !self.domain.is_empty() && host_matches(url, &self.domain)
    }
}

#[derive(Debug, Clone)]
pub struct BoardRegistry {
    boards: Vec<Board>,
    fallback: FieldRules,
}

impl BoardRegistry {
    /// The boards shipped with the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_BOARDS)
    }

    /// Loads a boards file. When the file defines no fallback rules the
    /// built-in ones are used.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read boards file {}: {}", path.display(), e))
        })?;
        let mut file = parse_boards(&text)?;
        if file.fallback.is_empty() {
            file.fallback = parse_boards(BUILTIN_BOARDS)?.fallback;
        }
        Self::from_config(file)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_config(parse_boards(text)?)
    }

    pub fn from_config(file: BoardsFile) -> Result<Self> {
        let fallback = file.fallback.compile("fallback")?;
        let mut seen = HashSet::new();
        let mut boards = Vec::with_capacity(file.boards.len());

        for config in file.boards {
            let name = config.name.trim().to_string();
            if name.is_empty() {
                return Err(Error::Configuration(format!(
                    "board for domain '{}' has no name",
                    config.domain
                )));
            }
            let domain = validate_domain(&name, &config.domain)?;
            if !seen.insert(domain.clone()) {
                return Err(Error::Configuration(format!("duplicate board domain '{}'", domain)));
            }

            let rules = config.selectors.compile(&name)?;
            for field in [Field::Title, Field::Description] {
                if rules.get(field).is_empty() && fallback.get(field).is_empty() {
                    return Err(Error::Configuration(format!(
                        "{}: no {} rule and no fallback for it",
                        name, field
                    )));
                }
            }

            boards.push(Board {
                name,
                domain,
                rules,
                fallback: fallback.clone(),
            });
        }

        if boards.is_empty() {
            return Err(Error::Configuration("no job boards configured".to_string()));
        }

        Ok(Self { boards, fallback })
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    /// Boards restricted to `domains`, in the order given. An empty list
    /// selects every board.
    pub fn select(&self, domains: &[String]) -> Result<Vec<Board>> {
        if domains.is_empty() {
            return Ok(self.boards.clone());
        }
        domains
            .iter()
            .map(|domain| {
                let wanted = domain.trim().to_lowercase();
                self.boards
                    .iter()
                    .find(|b| b.domain == wanted || b.name.eq_ignore_ascii_case(domain.trim()))
                    .cloned()
                    .ok_or_else(|| {
                        Error::Configuration(format!(
                            "unknown board '{}'. Available boards: {}",
                            domain,
                            self.boards.iter().map(|b| b.domain.as_str()).collect::<Vec<_>>().join(", ")
                        ))
                    })
            })
            .collect()
    }

    /// The most specific board whose domain covers `url`, or a generic board
    /// using only the fallback rules.
    pub fn board_for_url(&self, url: &str) -> Board {
        self.boards
            .iter()
            .filter(|b| b.can_handle(url))
            .max_by_key(|b| b.domain.len())
            .cloned()
            .unwrap_or_else(|| Board {
                name: "generic".to_string(),
                domain: String::new(),
                rules: FieldRules::default(),
                fallback: self.fallback.clone(),
            })
    }
}

fn parse_boards(text: &str) -> Result<BoardsFile> {
    serde_json::from_str(text)
        .map_err(|e| Error::Configuration(format!("Invalid boards file: {}", e)))
}

fn validate_domain(name: &str, domain: &str) -> Result<String> {
    let domain = domain.trim().to_lowercase();
    let valid = !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if !valid {
        return Err(Error::Configuration(format!(
            "{}: '{}' is not a bare domain (expected e.g. jobs.lever.co)",
            name, domain
        )));
    }
    Ok(domain)
}
