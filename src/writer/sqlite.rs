use rusqlite::{params, Connection, Transaction};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use super::schema_gen::{generate_create_table, generate_indexes, generate_insert, generate_upsert};
use crate::error::WriteError;
use crate::model::{EvolutionChain, Language, ResolvedEntity};
use crate::schema::{
    TableSchema, ALL_TABLES, EVOLUTION_CHAINS, EVOLUTION_CHAIN_MEMBERS, POKEMON,
    POKEMON_ABILITIES, POKEMON_EGG_GROUPS, POKEMON_HELD_ITEMS, POKEMON_MOVES, POKEMON_STATS,
    POKEMON_TYPES,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Text(String),
}

impl SqlValue {
    pub fn bind_to(&self, idx: usize, stmt: &mut rusqlite::Statement) -> rusqlite::Result<()> {
        match self {
            SqlValue::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null)?,
            SqlValue::Integer(i) => stmt.raw_bind_parameter(idx, i)?,
            SqlValue::Text(s) => stmt.raw_bind_parameter(idx, s.as_str())?,
        }
        Ok(())
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Integer(v)
    }
}

impl From<usize> for SqlValue {
    fn from(v: usize) -> Self {
        SqlValue::Integer(v as i64)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Integer(i64::from(v))
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Column values for one row, keyed by physical column name
#[derive(Debug, Default)]
pub struct RowValues {
    values: HashMap<String, SqlValue>,
}

impl RowValues {
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> &mut Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Values in the table's column order; unset columns are NULL
    fn ordered(&self, schema: &TableSchema) -> Vec<SqlValue> {
        schema
            .column_names()
            .iter()
            .map(|c| self.values.get(c).cloned().unwrap_or(SqlValue::Null))
            .collect()
    }
}

/// A relation table and the full set of rows one owner should have in it.
pub struct RelationSet<'a> {
    pub table: &'a TableSchema,
    pub owner_id: u32,
    /// Each row lists values for every column, owner column first
    pub rows: Vec<Vec<SqlValue>>,
}

/// Make `set.table` hold exactly `set.rows` for `set.owner_id`.
///
/// Must run inside the caller's transaction; rows with a duplicate key
/// collapse to the first occurrence.
pub fn replace_relation_set(tx: &Transaction, set: &RelationSet) -> rusqlite::Result<()> {
    let Some(owner) = set.table.owner_column else {
        return Err(rusqlite::Error::InvalidColumnName(format!(
            "{} is not a relation table",
            set.table.name
        )));
    };

    tx.prepare_cached(&format!("DELETE FROM {} WHERE {} = ?1", set.table.name, owner))?
        .execute([set.owner_id])?;

    let mut stmt = tx.prepare_cached(&generate_insert(set.table, "OR IGNORE"))?;
    for row in &set.rows {
        for (idx, value) in row.iter().enumerate() {
            value.bind_to(idx + 1, &mut stmt)?;
        }
        stmt.raw_execute()?;
    }

    Ok(())
}

/// Sole writer of the catalog snapshot.
pub struct SnapshotWriter {
    conn: Connection,
}

impl SnapshotWriter {
    pub fn open(db_path: &Path) -> Result<Self, WriteError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(WriteError::CreateDir)?;
        }
        let conn = Connection::open(db_path).map_err(WriteError::Open)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, WriteError> {
        Self::with_connection(Connection::open_in_memory().map_err(WriteError::Open)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, WriteError> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(WriteError::Open)?;

        let writer = Self { conn };
        writer.create_tables(ALL_TABLES)?;
        Ok(writer)
    }

    /// Create all tables that do not exist yet
    pub fn create_tables(&self, schemas: &[&TableSchema]) -> Result<(), WriteError> {
        for schema in schemas {
            let schema_err = |source| WriteError::Schema {
                table: schema.name,
                source,
            };
            self.conn
                .execute(&generate_create_table(schema), [])
                .map_err(schema_err)?;

            for index_sql in generate_indexes(schema) {
                self.conn.execute(&index_sql, []).map_err(schema_err)?;
            }
        }

        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Replace everything stored for one entity in a single transaction.
    pub fn upsert(&mut self, entity: &ResolvedEntity) -> Result<(), WriteError> {
        let entity_id = entity.entry.id;
        let failure = |source| WriteError::WriteFailure { entity_id, source };

        let tx = self.conn.transaction().map_err(failure)?;
        write_entity(&tx, entity).map_err(failure)?;
        tx.commit().map_err(failure)?;

        debug!(id = entity_id, name = %entity.entry.slug, "entity committed");
        Ok(())
    }

    /// Row counts per table, in schema order
    pub fn table_counts(&self) -> Result<Vec<(&'static str, u64)>, WriteError> {
        table_counts(&self.conn)
    }
}

pub fn table_counts(conn: &Connection) -> Result<Vec<(&'static str, u64)>, WriteError> {
    ALL_TABLES
        .iter()
        .map(|t| {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", t.name), [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|count| (t.name, count as u64))
            .map_err(WriteError::Read)
        })
        .collect()
}

fn write_entity(tx: &Transaction, entity: &ResolvedEntity) -> rusqlite::Result<()> {
    let values = pokemon_row(entity).ordered(&POKEMON);
    let mut stmt = tx.prepare_cached(&generate_upsert(&POKEMON))?;
    for (idx, value) in values.iter().enumerate() {
        value.bind_to(idx + 1, &mut stmt)?;
    }
    stmt.raw_execute()?;

    for set in relation_sets(entity) {
        replace_relation_set(tx, &set)?;
    }

    if let Some(chain) = &entity.chain {
        write_chain(tx, chain, &entity.entry.synced_at.to_rfc3339())?;
    }

    Ok(())
}

fn write_chain(tx: &Transaction, chain: &EvolutionChain, synced_at: &str) -> rusqlite::Result<()> {
    tx.prepare_cached(&generate_upsert(&EVOLUTION_CHAINS))?
        .execute(params![chain.id, synced_at])?;

    let rows: Vec<Vec<SqlValue>> = chain
        .members()
        .map(|(stage, position, member)| {
            vec![
                chain.id.into(),
                member.species_name.as_str().into(),
                member.species_id.into(),
                stage.into(),
                position.into(),
            ]
        })
        .collect();

    replace_relation_set(
        tx,
        &RelationSet {
            table: &EVOLUTION_CHAIN_MEMBERS,
            owner_id: chain.id,
            rows,
        },
    )
}

fn pokemon_row(entity: &ResolvedEntity) -> RowValues {
    let entry = &entity.entry;
    let species = &entity.species;
    let profile = &species.profile;

    let mut row = RowValues::default();
    row.set("id", entry.id)
        .set("name", entry.slug.as_str())
        .set("species_name", species.name.as_str())
        .set("description", species.description.clone())
        .set("base_experience", entry.base_experience)
        .set("height", entry.height)
        .set("weight", entry.weight)
        .set("pokemon_order", entry.order)
        .set("is_default", entry.is_default)
        .set("sprite_url", entry.sprite.clone())
        .set("evolution_chain_id", species.evolution_chain_id)
        .set("evolves_from", species.evolves_from.clone())
        .set("color", profile.color.clone())
        .set("habitat", profile.habitat.clone())
        .set("shape", profile.shape.clone())
        .set("generation", profile.generation.clone())
        .set("growth_rate", profile.growth_rate.clone())
        .set("capture_rate", profile.capture_rate)
        .set("base_happiness", profile.base_happiness)
        .set("gender_rate", profile.gender_rate)
        .set("hatch_counter", profile.hatch_counter)
        .set("is_baby", profile.is_baby)
        .set("is_legendary", profile.is_legendary)
        .set("is_mythical", profile.is_mythical)
        .set("pokemon_json", entry.raw.as_str())
        .set("species_json", species.raw.as_str())
        .set("synced_at", entry.synced_at.to_rfc3339());

    for lang in Language::ALL {
        row.set(
            format!("display_name_{}", lang.code()),
            species.names.get(lang),
        );
    }

    row
}

fn relation_sets(entity: &ResolvedEntity) -> Vec<RelationSet<'static>> {
    let entry = &entity.entry;
    let id = entry.id;
    let owner = SqlValue::from(id);

    let types: Vec<Vec<SqlValue>> = entry
        .types
        .iter()
        .enumerate()
        .map(|(slot, name)| vec![owner.clone(), name.as_str().into(), (slot + 1).into()])
        .collect();

    let abilities: Vec<Vec<SqlValue>> = entry
        .abilities
        .iter()
        .map(|a| {
            vec![
                owner.clone(),
                a.name.as_str().into(),
                a.slot.into(),
                a.is_hidden.into(),
            ]
        })
        .collect();

    let stats: Vec<Vec<SqlValue>> = entry
        .stats
        .iter()
        .map(|s| vec![owner.clone(), s.name.as_str().into(), s.base.into(), s.effort.into()])
        .collect();

    let moves: Vec<Vec<SqlValue>> = entry
        .moves
        .iter()
        .map(|m| {
            vec![
                owner.clone(),
                m.name.as_str().into(),
                m.version_group.as_str().into(),
                m.learn_method.as_str().into(),
                m.level.into(),
            ]
        })
        .collect();

    let held_items: Vec<Vec<SqlValue>> = entry
        .held_items
        .iter()
        .map(|h| {
            vec![
                owner.clone(),
                h.name.as_str().into(),
                h.version.as_str().into(),
                h.rarity.into(),
            ]
        })
        .collect();

    let egg_groups: Vec<Vec<SqlValue>> = entity
        .species
        .egg_groups
        .iter()
        .enumerate()
        .map(|(position, group)| vec![owner.clone(), group.as_str().into(), position.into()])
        .collect();

    vec![
        RelationSet { table: &POKEMON_TYPES, owner_id: id, rows: types },
        RelationSet { table: &POKEMON_ABILITIES, owner_id: id, rows: abilities },
        RelationSet { table: &POKEMON_STATS, owner_id: id, rows: stats },
        RelationSet { table: &POKEMON_MOVES, owner_id: id, rows: moves },
        RelationSet { table: &POKEMON_HELD_ITEMS, owner_id: id, rows: held_items },
        RelationSet { table: &POKEMON_EGG_GROUPS, owner_id: id, rows: egg_groups },
    ]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::*;
    use chrono::Utc;
    use std::sync::Arc;

    pub(crate) fn sample_entity(id: u32, slug: &str, abilities: &[&str]) -> ResolvedEntity {
        ResolvedEntity {
            entry: CatalogEntry {
                id,
                slug: slug.to_string(),
                types: vec!["grass".into(), "poison".into()],
                abilities: abilities
                    .iter()
                    .enumerate()
                    .map(|(i, name)| Ability {
                        name: name.to_string(),
                        is_hidden: i > 0,
                        slot: i as u32 + 1,
                    })
                    .collect(),
                stats: vec![BaseStat {
                    name: "hp".into(),
                    base: 45,
                    effort: 0,
                }],
                moves: vec![MoveLearn {
                    name: "tackle".into(),
                    version_group: "red-blue".into(),
                    learn_method: "level-up".into(),
                    level: 1,
                }],
                held_items: vec![],
                height: Some(7),
                weight: Some(69),
                base_experience: None,
                order: Some(1),
                is_default: Some(true),
                sprite: None,
                raw: RawPayload::new(format!("{{\"id\":{id}}}")),
                synced_at: Utc::now(),
            },
            species: SpeciesExtension {
                name: slug.to_string(),
                names: LocalizedNames {
                    en: Some(slug.to_uppercase()),
                    ja: None,
                    zh: None,
                },
                description: None,
                egg_groups: vec!["monster".into(), "plant".into()],
                evolution_chain_id: Some(1),
                evolves_from: None,
                profile: SpeciesProfile::default(),
                raw: RawPayload::new("{}"),
            },
            chain: Some(Arc::new(EvolutionChain {
                id: 1,
                stages: vec![vec![ChainMember {
                    species_id: id,
                    species_name: slug.to_string(),
                }]],
            })),
        }
    }

    fn abilities(writer: &SnapshotWriter, id: u32) -> Vec<String> {
        let mut stmt = writer
            .connection()
            .prepare("SELECT ability_name FROM pokemon_abilities WHERE pokemon_id = ?1 ORDER BY ability_name")
            .unwrap();
        stmt.query_map([id], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<Vec<String>>>()
            .unwrap()
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut writer = SnapshotWriter::open_in_memory().unwrap();
        let entity = sample_entity(1, "bulbasaur", &["overgrow", "chlorophyll"]);

        writer.upsert(&entity).unwrap();
        let first = writer.table_counts().unwrap();
        writer.upsert(&entity).unwrap();
        let second = writer.table_counts().unwrap();

        assert_eq!(first, second);
        assert!(first.contains(&("pokemon", 1)));
        assert!(first.contains(&("pokemon_abilities", 2)));
        assert!(first.contains(&("pokemon_egg_groups", 2)));
        assert!(first.contains(&("evolution_chain_members", 1)));
    }

    #[test]
    fn test_upsert_reconciles_relations() {
        let mut writer = SnapshotWriter::open_in_memory().unwrap();
        writer
            .upsert(&sample_entity(1, "bulbasaur", &["overgrow", "chlorophyll"]))
            .unwrap();

        writer
            .upsert(&sample_entity(1, "bulbasaur", &["overgrow", "thick-fat"]))
            .unwrap();

        assert_eq!(abilities(&writer, 1), vec!["overgrow", "thick-fat"]);
    }

    #[test]
    fn test_duplicate_relation_values_collapse() {
        let mut writer = SnapshotWriter::open_in_memory().unwrap();
        let mut entity = sample_entity(4, "charmander", &["blaze"]);
        entity.entry.types = vec!["fire".into(), "fire".into()];

        writer.upsert(&entity).unwrap();

        let count: i64 = writer
            .connection()
            .query_row("SELECT COUNT(*) FROM pokemon_types WHERE pokemon_id = 4", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let mut writer = SnapshotWriter::open_in_memory().unwrap();
        writer.upsert(&sample_entity(1, "bulbasaur", &["overgrow"])).unwrap();

        // same slug under another id violates the UNIQUE name constraint
        let err = writer
            .upsert(&sample_entity(2, "bulbasaur", &["overgrow"]))
            .unwrap_err();

        assert!(matches!(err, WriteError::WriteFailure { entity_id: 2, .. }));
        let counts = writer.table_counts().unwrap();
        assert!(counts.contains(&("pokemon", 1)));
        assert!(counts.contains(&("pokemon_abilities", 1)));
    }

    #[test]
    fn test_stored_scalars_and_names() {
        let mut writer = SnapshotWriter::open_in_memory().unwrap();
        writer.upsert(&sample_entity(1, "bulbasaur", &["overgrow"])).unwrap();

        let (en, ja, exp): (Option<String>, Option<String>, Option<i64>) = writer
            .connection()
            .query_row(
                "SELECT display_name_en, display_name_ja, base_experience FROM pokemon WHERE id = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(en.as_deref(), Some("BULBASAUR"));
        assert_eq!(ja, None);
        assert_eq!(exp, None);
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pokeindex.db");

        let writer = SnapshotWriter::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(writer.table_counts().unwrap().len(), ALL_TABLES.len());
    }
}
