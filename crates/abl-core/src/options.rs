//! Ability options and configuration
//!
//! Loads the rc-style option file: `OPTIONS=` lists, slot rules and
//! confirmation patterns.

use std::path::Path;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::slots::{DEFAULT_FIRST_LETTER, letter_to_index};

/// Default bound on recursive slot evictions.
pub const DEFAULT_EVICTION_DEPTH: usize = 8;

/// Case-insensitive ability-name pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamePattern {
    regex: Regex,
}

impl NamePattern {
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(source).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl TryFrom<String> for NamePattern {
    type Error = regex::Error;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Self::new(&source)
    }
}

impl From<NamePattern> for String {
    fn from(pattern: NamePattern) -> Self {
        pattern.as_str().to_string()
    }
}

/// One `ABILITY_SLOT` rule: a name pattern and the letters it prefers.
///
/// `letters` may contain `+` and `-`, which switch overwrite mode on and off
/// for the letters that follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotRule {
    pub pattern: NamePattern,
    pub letters: String,
}

impl SlotRule {
    pub fn new(pattern: &str, letters: &str) -> Result<Self, OptionsError> {
        let pattern = NamePattern::new(pattern)
            .map_err(|_| OptionsError::InvalidValue("ABILITY_SLOT".into(), pattern.into()))?;
        if letters.is_empty() {
            return Err(OptionsError::MissingValue("ABILITY_SLOT".into()));
        }
        if let Some(bad) = letters
            .chars()
            .find(|&c| c != '+' && c != '-' && letter_to_index(c).is_none())
        {
            return Err(OptionsError::InvalidValue(
                "ABILITY_SLOT".into(),
                bad.to_string(),
            ));
        }
        Ok(Self {
            pattern,
            letters: letters.to_string(),
        })
    }
}

/// User-configurable ability options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityOptions {
    /// Scales selected piety costs (the sprint difficulty hook)
    pub sprint: bool,
    /// Drop the generic failure message
    pub quiet_failures: bool,
    /// Where the allocator starts scanning for a free slot
    pub first_letter: char,
    pub eviction_depth: usize,
    pub slot_rules: Vec<SlotRule>,
    pub confirm_patterns: Vec<NamePattern>,
}

impl Default for AbilityOptions {
    fn default() -> Self {
        Self {
            sprint: false,
            quiet_failures: false,
            first_letter: DEFAULT_FIRST_LETTER,
            eviction_depth: DEFAULT_EVICTION_DEPTH,
            slot_rules: Vec::new(),
            confirm_patterns: Vec::new(),
        }
    }
}

impl AbilityOptions {
    /// Load options from a file
    pub fn load_from_file(path: &Path) -> Result<Self, OptionsError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| OptionsError::IoError(e.to_string()))?;

        Self::parse_config(&contents)
    }

    /// Parse options from a config string
    pub fn parse_config(contents: &str) -> Result<Self, OptionsError> {
        let mut options = Self::default();

        for line in contents.lines() {
            let line = line.trim();

            // Skip comments and empty lines
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some(opts) = line.strip_prefix("OPTIONS=") {
                for opt in opts.split(',') {
                    let opt = opt.trim();
                    if !opt.is_empty() {
                        options.parse_option(opt)?;
                    }
                }
            } else if let Some(rule) = line.strip_prefix("ABILITY_SLOT=") {
                // The pattern may itself contain ':'
                let (pattern, letters) = rule
                    .rsplit_once(':')
                    .ok_or_else(|| OptionsError::ParseError(line.to_string()))?;
                options
                    .slot_rules
                    .push(SlotRule::new(pattern.trim(), letters.trim())?);
            } else if let Some(pattern) = line.strip_prefix("ABILITY_CONFIRM=") {
                let pattern = pattern.trim();
                let compiled = NamePattern::new(pattern).map_err(|_| {
                    OptionsError::InvalidValue("ABILITY_CONFIRM".into(), pattern.into())
                })?;
                options.confirm_patterns.push(compiled);
            }
        }

        Ok(options)
    }

    /// Parse a single option
    fn parse_option(&mut self, opt: &str) -> Result<(), OptionsError> {
        if let Some((key, value)) = opt.split_once(':') {
            return self.set_option(key.trim(), Some(value.trim()));
        }
        if let Some((key, value)) = opt.split_once('=') {
            return self.set_option(key.trim(), Some(value.trim()));
        }

        let (negated, opt_name) = if let Some(name) = opt.strip_prefix('!') {
            (true, name)
        } else if let Some(name) = opt.strip_prefix("no") {
            (true, name)
        } else {
            (false, opt)
        };

        self.set_bool_option(opt_name, !negated)
    }

    fn set_bool_option(&mut self, name: &str, value: bool) -> Result<(), OptionsError> {
        match name {
            "sprint" => self.sprint = value,
            "quiet_failures" => self.quiet_failures = value,
            _ => return Err(OptionsError::UnknownOption(name.to_string())),
        }
        Ok(())
    }

    fn set_option(&mut self, name: &str, value: Option<&str>) -> Result<(), OptionsError> {
        let value = value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| OptionsError::MissingValue(name.to_string()))?;
        let invalid = || OptionsError::InvalidValue(name.to_string(), value.to_string());

        match name {
            "first_letter" => {
                let mut chars = value.chars();
                self.first_letter = match (chars.next(), chars.next()) {
                    (Some(c), None) if letter_to_index(c).is_some() => c,
                    _ => return Err(invalid()),
                };
            }
            "eviction_depth" => {
                self.eviction_depth = value.parse().map_err(|_| invalid())?;
            }
            "sprint" | "quiet_failures" => {
                let flag = match value.to_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => true,
                    "false" | "no" | "off" | "0" => false,
                    _ => return Err(invalid()),
                };
                self.set_bool_option(name, flag)?;
            }
            _ => return Err(OptionsError::UnknownOption(name.to_string())),
        }
        Ok(())
    }

    /// Whether activating `name` needs an explicit yes.
    pub fn needs_confirmation(&self, name: &str) -> bool {
        self.confirm_patterns.iter().any(|p| p.matches(name))
    }

    /// Save options to a file
    pub fn save_to_file(&self, path: &Path) -> Result<(), OptionsError> {
        let contents = self.to_config_string();
        std::fs::write(path, contents).map_err(|e| OptionsError::IoError(e.to_string()))
    }

    /// Convert options to config file format
    pub fn to_config_string(&self) -> String {
        let mut lines = Vec::new();
        lines.push("# Ability engine configuration file".to_string());
        lines.push(String::new());

        lines.push(format!(
            "OPTIONS={},{}",
            if self.sprint { "sprint" } else { "!sprint" },
            if self.quiet_failures {
                "quiet_failures"
            } else {
                "!quiet_failures"
            }
        ));
        lines.push(format!(
            "OPTIONS=first_letter:{},eviction_depth:{}",
            self.first_letter, self.eviction_depth
        ));

        if !self.slot_rules.is_empty() {
            lines.push(String::new());
            lines.push("# Slot rules".to_string());
            for rule in &self.slot_rules {
                lines.push(format!(
                    "ABILITY_SLOT={}:{}",
                    rule.pattern.as_str(),
                    rule.letters
                ));
            }
        }

        if !self.confirm_patterns.is_empty() {
            lines.push(String::new());
            lines.push("# Confirmation prompts".to_string());
            for pattern in &self.confirm_patterns {
                lines.push(format!("ABILITY_CONFIRM={}", pattern.as_str()));
            }
        }

        lines.join("\n")
    }
}

/// Options parsing error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    #[error("Invalid value '{1}' for option '{0}'")]
    InvalidValue(String, String),
    #[error("Missing value for option '{0}'")]
    MissingValue(String),
}
