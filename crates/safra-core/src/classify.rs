//! Transaction classification into spending macro-groups
//!
//! The classification table is data, not code: an embedded TOML default that
//! users can override from their data directory. Classification itself is a
//! pure function over a [`ClassifierConfig`]:
//!
//! 1. exact, case-insensitive match of the category label
//! 2. keyword fragment contained in the normalized description
//!
//! Both passes walk groups in [`MacroGroup`] declaration order, so the first
//! group in that order wins ties regardless of how the table was written.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::MacroGroup;
use crate::normalize::normalize_name;

/// Default classification table
const DEFAULT_TABLE: &str = include_str!("../../../config/macrogroups.toml");

/// Matching rules for one macro-group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupRule {
    /// Lowercased category labels
    pub categories: Vec<String>,
    /// Normalized keyword fragments
    pub keywords: Vec<String>,
}

impl GroupRule {
    pub fn new<C, K>(categories: C, keywords: K) -> Self
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        Self {
            categories: categories
                .into_iter()
                .map(|c| c.as_ref().trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
            keywords: keywords
                .into_iter()
                .map(|k| normalize_name(k.as_ref()))
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }
}

/// Macro-group table, keyed in precedence order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifierConfig {
    rules: BTreeMap<MacroGroup, GroupRule>,
}

impl ClassifierConfig {
    /// The table shipped with the crate
    pub fn embedded() -> Result<Self> {
        parse_config(DEFAULT_TABLE)
    }

    /// Override file if present, embedded table otherwise
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let path = override_path
            .map(Path::to_path_buf)
            .or_else(default_config_path)
            .filter(|p| p.exists());

        match path {
            Some(path) => {
                debug!(path = %path.display(), "Loading macro-group table override");
                let content = fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                parse_config(&content)
            }
            None => Self::embedded(),
        }
    }

    pub fn with_rule(mut self, group: MacroGroup, rule: GroupRule) -> Self {
        self.rules.insert(group, rule);
        self
    }

    pub fn rule(&self, group: MacroGroup) -> Option<&GroupRule> {
        self.rules.get(&group)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("safra").join("config").join("macrogroups.toml"))
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    groups: Option<HashMap<String, RawGroup>>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    keywords: Vec<String>,
}

fn parse_config(content: &str) -> Result<ClassifierConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    let mut config = ClassifierConfig::default();

    for (name, group) in raw.groups.unwrap_or_default() {
        let Ok(macro_group) = name.parse::<MacroGroup>() else {
            warn!(group = %name, "Skipping unknown macro-group in classification table");
            continue;
        };
        config
            .rules
            .insert(macro_group, GroupRule::new(group.categories, group.keywords));
    }

    Ok(config)
}

/// Pure classifier over a loaded table
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    /// Load the table from the user override or the embedded default
    pub fn new() -> Result<Self> {
        Ok(Self::with_config(ClassifierConfig::load(None)?))
    }

    pub fn with_config(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Classify into one of the five cost groups
    pub fn classify(&self, category: &str, description: &str) -> Option<MacroGroup> {
        self.classify_among(&MacroGroup::COSTS, category, description)
    }

    /// Classify into the cost groups or revenue
    pub fn classify_with_revenue(&self, category: &str, description: &str) -> Option<MacroGroup> {
        self.classify_among(&MacroGroup::ALL, category, description)
    }

    fn classify_among(
        &self,
        groups: &[MacroGroup],
        category: &str,
        description: &str,
    ) -> Option<MacroGroup> {
        let category = category.trim().to_lowercase();
        if !category.is_empty() {
            for group in groups {
                if let Some(rule) = self.config.rule(*group) {
                    if rule.categories.iter().any(|c| *c == category) {
                        return Some(*group);
                    }
                }
            }
        }

        let description = normalize_name(description);
        if description.is_empty() {
            return None;
        }

        groups.iter().copied().find(|group| {
            self.config
                .rule(*group)
                .is_some_and(|rule| rule.keywords.iter().any(|k| description.contains(k.as_str())))
        })
    }
}
