//! Table definitions for the catalog snapshot

use super::types::*;

// =============================================================================
// Primary table
// =============================================================================

pub static POKEMON: TableSchema = TableSchema {
    name: "pokemon",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("name", ColumnType::Text).unique(),
        Column::new("species_name", ColumnType::Text),
        Column::new("display_name", ColumnType::Localized),
        Column::new("description", ColumnType::Text),
        Column::new("base_experience", ColumnType::Integer),
        Column::new("height", ColumnType::Integer),
        Column::new("weight", ColumnType::Integer),
        Column::new("pokemon_order", ColumnType::Integer),
        Column::new("is_default", ColumnType::Boolean),
        Column::new("sprite_url", ColumnType::Text),
        Column::new("evolution_chain_id", ColumnType::Integer),
        Column::new("evolves_from", ColumnType::Text),
        Column::new("color", ColumnType::Text),
        Column::new("habitat", ColumnType::Text),
        Column::new("shape", ColumnType::Text),
        Column::new("generation", ColumnType::Text),
        Column::new("growth_rate", ColumnType::Text),
        Column::new("capture_rate", ColumnType::Integer),
        Column::new("base_happiness", ColumnType::Integer),
        Column::new("gender_rate", ColumnType::Integer),
        Column::new("hatch_counter", ColumnType::Integer),
        Column::new("is_baby", ColumnType::Boolean),
        Column::new("is_legendary", ColumnType::Boolean),
        Column::new("is_mythical", ColumnType::Boolean),
        Column::required("pokemon_json", ColumnType::Json),
        Column::required("species_json", ColumnType::Json),
        Column::required("synced_at", ColumnType::Timestamp),
    ],
    primary_key: &["id"],
    foreign_keys: &[],
    indexes: &[
        Index::on(&["species_name"]),
        Index::on(&["evolution_chain_id"]),
    ],
    owner_column: None,
};

// =============================================================================
// Relation tables (replaced wholesale per entity)
// =============================================================================

const POKEMON_FK: &[ForeignKey] = &[ForeignKey::new("pokemon_id", "pokemon")];

pub static POKEMON_TYPES: TableSchema = TableSchema {
    name: "pokemon_types",
    columns: &[
        Column::required("pokemon_id", ColumnType::Integer),
        Column::required("type_name", ColumnType::Text),
        Column::required("slot", ColumnType::Integer),
    ],
    primary_key: &["pokemon_id", "type_name"],
    foreign_keys: POKEMON_FK,
    indexes: &[],
    owner_column: Some("pokemon_id"),
};

pub static POKEMON_ABILITIES: TableSchema = TableSchema {
    name: "pokemon_abilities",
    columns: &[
        Column::required("pokemon_id", ColumnType::Integer),
        Column::required("ability_name", ColumnType::Text),
        Column::required("slot", ColumnType::Integer),
        Column::required("is_hidden", ColumnType::Boolean),
    ],
    primary_key: &["pokemon_id", "ability_name"],
    foreign_keys: POKEMON_FK,
    indexes: &[],
    owner_column: Some("pokemon_id"),
};

pub static POKEMON_STATS: TableSchema = TableSchema {
    name: "pokemon_stats",
    columns: &[
        Column::required("pokemon_id", ColumnType::Integer),
        Column::required("stat_name", ColumnType::Text),
        Column::required("base_stat", ColumnType::Integer),
        Column::required("effort", ColumnType::Integer),
    ],
    primary_key: &["pokemon_id", "stat_name"],
    foreign_keys: POKEMON_FK,
    indexes: &[],
    owner_column: Some("pokemon_id"),
};

pub static POKEMON_MOVES: TableSchema = TableSchema {
    name: "pokemon_moves",
    columns: &[
        Column::required("pokemon_id", ColumnType::Integer),
        Column::required("move_name", ColumnType::Text),
        Column::required("version_group", ColumnType::Text),
        Column::required("learn_method", ColumnType::Text),
        Column::required("level_learned_at", ColumnType::Integer),
    ],
    primary_key: &[
        "pokemon_id",
        "move_name",
        "version_group",
        "learn_method",
        "level_learned_at",
    ],
    foreign_keys: POKEMON_FK,
    indexes: &[],
    owner_column: Some("pokemon_id"),
};

pub static POKEMON_HELD_ITEMS: TableSchema = TableSchema {
    name: "pokemon_held_items",
    columns: &[
        Column::required("pokemon_id", ColumnType::Integer),
        Column::required("item_name", ColumnType::Text),
        Column::required("version_name", ColumnType::Text),
        Column::required("rarity", ColumnType::Integer),
    ],
    primary_key: &["pokemon_id", "item_name", "version_name"],
    foreign_keys: POKEMON_FK,
    indexes: &[],
    owner_column: Some("pokemon_id"),
};

pub static POKEMON_EGG_GROUPS: TableSchema = TableSchema {
    name: "pokemon_egg_groups",
    columns: &[
        Column::required("pokemon_id", ColumnType::Integer),
        Column::required("egg_group", ColumnType::Text),
        Column::required("position", ColumnType::Integer),
    ],
    primary_key: &["pokemon_id", "egg_group"],
    foreign_keys: POKEMON_FK,
    indexes: &[],
    owner_column: Some("pokemon_id"),
};

// =============================================================================
// Evolution chains (shared by several entries)
// =============================================================================

pub static EVOLUTION_CHAINS: TableSchema = TableSchema {
    name: "evolution_chains",
    columns: &[
        Column::required("id", ColumnType::Integer),
        Column::required("synced_at", ColumnType::Timestamp),
    ],
    primary_key: &["id"],
    foreign_keys: &[],
    indexes: &[],
    owner_column: None,
};

pub static EVOLUTION_CHAIN_MEMBERS: TableSchema = TableSchema {
    name: "evolution_chain_members",
    columns: &[
        Column::required("chain_id", ColumnType::Integer),
        Column::required("species_name", ColumnType::Text),
        Column::required("species_id", ColumnType::Integer),
        Column::required("stage", ColumnType::Integer),
        Column::required("position", ColumnType::Integer),
    ],
    primary_key: &["chain_id", "species_name"],
    foreign_keys: &[ForeignKey::new("chain_id", "evolution_chains")],
    indexes: &[Index::on(&["species_name"])],
    owner_column: Some("chain_id"),
};

/// Every table, parents before children
pub static ALL_TABLES: &[&TableSchema] = &[
    &POKEMON,
    &POKEMON_TYPES,
    &POKEMON_ABILITIES,
    &POKEMON_STATS,
    &POKEMON_MOVES,
    &POKEMON_HELD_ITEMS,
    &POKEMON_EGG_GROUPS,
    &EVOLUTION_CHAINS,
    &EVOLUTION_CHAIN_MEMBERS,
];
