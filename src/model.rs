//! Typed shapes produced by the resolver and consumed by the snapshot writer.

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// The six base statistics, in display order
pub const STAT_NAMES: [&str; 6] = [
    "hp",
    "attack",
    "defense",
    "special-attack",
    "special-defense",
    "speed",
];

/// Verbatim upstream JSON, kept for later reprocessing and never parsed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload(String);

impl RawPayload {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    En,
    Ja,
    Zh,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Ja, Language::Zh];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ja => "ja",
            Language::Zh => "zh",
        }
    }
}

/// Display names by language; any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalizedNames {
    pub en: Option<String>,
    pub ja: Option<String>,
    pub zh: Option<String>,
}

impl LocalizedNames {
    pub fn get(&self, lang: Language) -> Option<&str> {
        match lang {
            Language::En => self.en.as_deref(),
            Language::Ja => self.ja.as_deref(),
            Language::Zh => self.zh.as_deref(),
        }
    }

    /// Name in `lang`, falling back to English, then to `slug`.
    pub fn resolve<'a>(&'a self, lang: Language, slug: &'a str) -> &'a str {
        self.get(lang)
            .or_else(|| self.get(Language::En))
            .unwrap_or(slug)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ability {
    pub name: String,
    pub is_hidden: bool,
    pub slot: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseStat {
    pub name: String,
    pub base: u32,
    pub effort: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveLearn {
    pub name: String,
    pub version_group: String,
    pub learn_method: String,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeldItem {
    pub name: String,
    pub version: String,
    pub rarity: u32,
}

/// Primary catalog record built from the detail endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub id: u32,
    pub slug: String,
    /// Slot order; the first entry is the primary type
    pub types: Vec<String>,
    pub abilities: Vec<Ability>,
    pub stats: Vec<BaseStat>,
    pub moves: Vec<MoveLearn>,
    pub held_items: Vec<HeldItem>,
    pub height: Option<u32>,
    pub weight: Option<u32>,
    pub base_experience: Option<u32>,
    pub order: Option<i64>,
    pub is_default: Option<bool>,
    pub sprite: Option<String>,
    pub raw: RawPayload,
    pub synced_at: DateTime<Utc>,
}

/// Species-level facts that are not part of the detail payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeciesProfile {
    pub color: Option<String>,
    pub habitat: Option<String>,
    pub shape: Option<String>,
    pub generation: Option<String>,
    pub growth_rate: Option<String>,
    pub capture_rate: Option<u32>,
    pub base_happiness: Option<u32>,
    pub gender_rate: Option<i64>,
    pub hatch_counter: Option<u32>,
    pub is_baby: Option<bool>,
    pub is_legendary: Option<bool>,
    pub is_mythical: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesExtension {
    pub name: String,
    pub names: LocalizedNames,
    pub description: Option<String>,
    pub egg_groups: Vec<String>,
    pub evolution_chain_id: Option<u32>,
    pub evolves_from: Option<String>,
    pub profile: SpeciesProfile,
    pub raw: RawPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMember {
    pub species_id: u32,
    pub species_name: String,
}

/// Evolution tree flattened into depth levels; members keep source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvolutionChain {
    pub id: u32,
    pub stages: Vec<Vec<ChainMember>>,
}

impl EvolutionChain {
    pub fn stage_sizes(&self) -> Vec<usize> {
        self.stages.iter().map(Vec::len).collect()
    }

    pub fn members(&self) -> impl Iterator<Item = (usize, usize, &ChainMember)> {
        self.stages.iter().enumerate().flat_map(|(stage, members)| {
            members
                .iter()
                .enumerate()
                .map(move |(position, member)| (stage, position, member))
        })
    }
}

/// Everything known about one catalog entry after a successful resolve.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedEntity {
    pub entry: CatalogEntry,
    pub species: SpeciesExtension,
    pub chain: Option<Arc<EvolutionChain>>,
}
