//! Serialized shape of the exported catalog document.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::model::{Language, LocalizedNames, STAT_NAMES};

#[derive(Debug, Clone, Serialize)]
pub struct CatalogDocument {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub pokemon: Vec<DocumentEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentEntry {
    pub id: u32,
    pub slug: String,
    pub names: DisplayNames,
    pub display_name: String,
    pub sprite: String,
    pub description: String,
    pub types: Vec<String>,
    pub abilities: Vec<AbilityView>,
    pub stats: Vec<StatView>,
    pub egg_groups: Vec<String>,
    pub height: Option<u32>,
    pub weight: Option<u32>,
    pub base_experience: Option<u32>,
    pub evolution_chain: Vec<Vec<ChainMemberView>>,
}

/// Names with every language filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayNames {
    pub en: String,
    pub ja: String,
    pub zh: String,
}

impl DisplayNames {
    /// `en` falls back to the slug; `ja` and `zh` fall back to `en`.
    pub fn with_fallbacks(names: &LocalizedNames, slug: &str) -> Self {
        Self {
            en: names.resolve(Language::En, slug).to_string(),
            ja: names.resolve(Language::Ja, slug).to_string(),
            zh: names.resolve(Language::Zh, slug).to_string(),
        }
    }

    /// The name shown by the browsing client
    pub fn display_name(&self) -> &str {
        &self.zh
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbilityView {
    pub name: String,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatView {
    pub label: String,
    pub base: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainMemberView {
    pub id: u32,
    pub slug: String,
    pub names: DisplayNames,
    pub display_name: String,
}

/// `special-attack` -> `SPECIAL ATTACK`
pub fn stat_label(name: &str) -> String {
    name.to_uppercase().replace('-', " ")
}

/// The six stats in display order, all zero
pub fn neutral_stats() -> Vec<StatView> {
    ordered_stats(&HashMap::new())
}

/// The six stats in display order; anything missing from `bases` is zero.
pub fn ordered_stats(bases: &HashMap<String, u32>) -> Vec<StatView> {
    STAT_NAMES
        .iter()
        .map(|name| StatView {
            label: stat_label(name),
            base: bases.get(*name).copied().unwrap_or(0),
        })
        .collect()
}
