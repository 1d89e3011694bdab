//! Serde views of the upstream detail, species and evolution-chain payloads.
//!
//! Only the fields the snapshot uses are declared; everything else stays in
//! the raw payload.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UrlResource {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct PokemonPayload {
    pub id: u32,
    pub name: String,
    pub base_experience: Option<u32>,
    pub height: Option<u32>,
    pub weight: Option<u32>,
    pub order: Option<i64>,
    pub is_default: Option<bool>,
    pub species: Option<NamedResource>,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub abilities: Vec<AbilitySlot>,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
    #[serde(default)]
    pub moves: Vec<MoveEntry>,
    #[serde(default)]
    pub held_items: Vec<HeldItemEntry>,
    #[serde(default)]
    pub sprites: Value,
}

#[derive(Debug, Deserialize)]
pub struct TypeSlot {
    pub slot: u32,
    #[serde(rename = "type")]
    pub kind: NamedResource,
}

#[derive(Debug, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
    pub is_hidden: bool,
    pub slot: u32,
}

#[derive(Debug, Deserialize)]
pub struct StatEntry {
    pub stat: NamedResource,
    pub base_stat: u32,
    pub effort: u32,
}

#[derive(Debug, Deserialize)]
pub struct MoveEntry {
    #[serde(rename = "move")]
    pub learned: NamedResource,
    #[serde(default)]
    pub version_group_details: Vec<VersionGroupDetail>,
}

#[derive(Debug, Deserialize)]
pub struct VersionGroupDetail {
    pub version_group: NamedResource,
    pub move_learn_method: NamedResource,
    pub level_learned_at: u32,
}

#[derive(Debug, Deserialize)]
pub struct HeldItemEntry {
    pub item: NamedResource,
    #[serde(default)]
    pub version_details: Vec<HeldItemVersion>,
}

#[derive(Debug, Deserialize)]
pub struct HeldItemVersion {
    pub version: NamedResource,
    pub rarity: u32,
}

#[derive(Debug, Deserialize)]
pub struct SpeciesPayload {
    pub name: String,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorText>,
    #[serde(default)]
    pub egg_groups: Vec<NamedResource>,
    pub evolution_chain: Option<UrlResource>,
    pub evolves_from_species: Option<NamedResource>,
    pub color: Option<NamedResource>,
    pub habitat: Option<NamedResource>,
    pub shape: Option<NamedResource>,
    pub generation: Option<NamedResource>,
    pub growth_rate: Option<NamedResource>,
    pub capture_rate: Option<u32>,
    pub base_happiness: Option<u32>,
    pub gender_rate: Option<i64>,
    pub hatch_counter: Option<u32>,
    pub is_baby: Option<bool>,
    pub is_legendary: Option<bool>,
    pub is_mythical: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LocalizedName {
    pub name: String,
    pub language: NamedResource,
}

#[derive(Debug, Deserialize)]
pub struct FlavorText {
    pub flavor_text: String,
    pub language: NamedResource,
}

#[derive(Debug, Deserialize)]
pub struct ChainPayload {
    pub id: Option<u32>,
    pub chain: ChainLink,
}

/// One node of the upstream evolution tree
#[derive(Debug, Clone, Deserialize)]
pub struct ChainLink {
    pub species: NamedResource,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}
