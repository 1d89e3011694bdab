//! Flattens the snapshot into one self-contained JSON document.
//!
//! The exporter only reads the snapshot. Relation rows are grouped per entity,
//! evolution chains are expanded into per-stage member stubs, and localized
//! names get their fallbacks applied here rather than in storage.

pub mod document;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OpenFlags, Row};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::model::LocalizedNames;
pub use document::*;

/// Scalar columns of one stored entity
#[derive(Debug)]
struct EntityRow {
    slug: String,
    species_name: Option<String>,
    names: DisplayNames,
    description: Option<String>,
    sprite: Option<String>,
    height: Option<u32>,
    weight: Option<u32>,
    base_experience: Option<u32>,
    chain_id: Option<u32>,
    is_default: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub total: usize,
    pub output: PathBuf,
}

/// Open `snapshot` read-only and write the document to `output`.
///
/// The file is written to a sibling temp file first and renamed into place.
pub fn export_to_file(snapshot: &Path, output: &Path) -> Result<ExportSummary> {
    if !snapshot.exists() {
        bail!("Snapshot not found: {}", snapshot.display());
    }
    let conn = Connection::open_with_flags(snapshot, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open snapshot {}", snapshot.display()))?;

    let document = build_document(&conn)?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let payload = serde_json::to_vec_pretty(&document).context("Failed to serialize document")?;
    let tmp = output.with_extension("json.tmp");
    fs::write(&tmp, &payload).with_context(|| format!("Failed to write {}", tmp.display()))?;
    fs::rename(&tmp, output)
        .with_context(|| format!("Failed to move document into {}", output.display()))?;

    info!(total = document.total, output = %output.display(), "exported catalog");
    Ok(ExportSummary {
        total: document.total,
        output: output.to_path_buf(),
    })
}

/// Project every stored entity into the document, ascending by id.
pub fn build_document(conn: &Connection) -> Result<CatalogDocument> {
    let entities = load_entities(conn)?;

    let types = collect_owned(
        conn,
        "pokemon_types",
        "SELECT pokemon_id, type_name FROM pokemon_types ORDER BY pokemon_id, slot",
        &entities,
        |row| row.get::<_, String>(1),
    )?;
    let abilities = collect_owned(
        conn,
        "pokemon_abilities",
        "SELECT pokemon_id, ability_name, is_hidden FROM pokemon_abilities
         ORDER BY pokemon_id, slot",
        &entities,
        |row| {
            Ok(AbilityView {
                name: row.get(1)?,
                is_hidden: row.get(2)?,
            })
        },
    )?;
    let stats = collect_owned(
        conn,
        "pokemon_stats",
        "SELECT pokemon_id, stat_name, base_stat FROM pokemon_stats ORDER BY pokemon_id",
        &entities,
        |row| Ok((row.get::<_, String>(1)?, row.get::<_, u32>(2)?)),
    )?;
    let egg_groups = collect_owned(
        conn,
        "pokemon_egg_groups",
        "SELECT pokemon_id, egg_group FROM pokemon_egg_groups ORDER BY pokemon_id, position",
        &entities,
        |row| row.get::<_, String>(1),
    )?;
    let chains = load_chains(conn, &entities)?;

    let pokemon: Vec<DocumentEntry> = entities
        .iter()
        .map(|(&id, row)| {
            let stats = match stats.get(&id) {
                Some(pairs) => ordered_stats(&pairs.iter().cloned().collect()),
                None => neutral_stats(),
            };
            let evolution_chain = row
                .chain_id
                .and_then(|chain_id| chains.get(&chain_id))
                .cloned()
                .unwrap_or_default();

            DocumentEntry {
                id,
                slug: row.slug.clone(),
                display_name: row.names.display_name().to_string(),
                names: row.names.clone(),
                sprite: row.sprite.clone().unwrap_or_default(),
                description: row.description.clone().unwrap_or_default(),
                types: types.get(&id).cloned().unwrap_or_default(),
                abilities: abilities.get(&id).cloned().unwrap_or_default(),
                stats,
                egg_groups: egg_groups.get(&id).cloned().unwrap_or_default(),
                height: row.height,
                weight: row.weight,
                base_experience: row.base_experience,
                evolution_chain,
            }
        })
        .collect();

    debug!(entries = pokemon.len(), chains = chains.len(), "document built");
    Ok(CatalogDocument {
        generated_at: Utc::now(),
        total: pokemon.len(),
        pokemon,
    })
}

fn load_entities(conn: &Connection) -> Result<BTreeMap<u32, EntityRow>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, species_name, display_name_en, display_name_ja, display_name_zh,
                    description, sprite_url, height, weight, base_experience,
                    evolution_chain_id, is_default
             FROM pokemon ORDER BY id",
        )
        .context("Failed to query pokemon")?;

    let rows = stmt.query_map([], |row| {
        let slug: String = row.get(1)?;
        let names = LocalizedNames {
            en: row.get(3)?,
            ja: row.get(4)?,
            zh: row.get(5)?,
        };
        Ok((
            row.get::<_, u32>(0)?,
            EntityRow {
                names: DisplayNames::with_fallbacks(&names, &slug),
                slug,
                species_name: row.get(2)?,
                description: row.get(6)?,
                sprite: row.get(7)?,
                height: row.get(8)?,
                weight: row.get(9)?,
                base_experience: row.get(10)?,
                chain_id: row.get(11)?,
                is_default: row.get(12)?,
            },
        ))
    })?;

    let mut entities = BTreeMap::new();
    for row in rows {
        let (id, entity) = row?;
        entities.insert(id, entity);
    }
    Ok(entities)
}

/// Group rows of a relation table by their owning entity (column 0).
///
/// Rows whose owner is not a stored entity are skipped.
fn collect_owned<T, F>(
    conn: &Connection,
    table: &str,
    sql: &str,
    entities: &BTreeMap<u32, EntityRow>,
    mut read: F,
) -> Result<HashMap<u32, Vec<T>>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("Failed to query {}", table))?;
    let mut rows = stmt.query([])?;

    let mut grouped: HashMap<u32, Vec<T>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let owner: u32 = row.get(0)?;
        if !entities.contains_key(&owner) {
            warn!(table, pokemon_id = owner, "skipping row for missing entity");
            continue;
        }
        grouped.entry(owner).or_default().push(read(row)?);
    }
    Ok(grouped)
}

/// Expand every stored chain into stages of member stubs.
fn load_chains(
    conn: &Connection,
    entities: &BTreeMap<u32, EntityRow>,
) -> Result<HashMap<u32, Vec<Vec<ChainMemberView>>>> {
    // species name -> entity representing it (default form, then lowest id)
    let mut by_species: HashMap<&str, (u32, &EntityRow)> = HashMap::new();
    for (&id, row) in entities {
        let Some(species) = row.species_name.as_deref() else {
            continue;
        };
        let replace = match by_species.get(species) {
            None => true,
            Some((_, current)) => current.is_default != Some(true) && row.is_default == Some(true),
        };
        if replace {
            by_species.insert(species, (id, row));
        }
    }

    let mut stmt = conn
        .prepare(
            "SELECT chain_id, species_name, stage FROM evolution_chain_members
             ORDER BY chain_id, stage, position",
        )
        .context("Failed to query evolution_chain_members")?;
    let mut rows = stmt.query([])?;

    let mut chains: HashMap<u32, BTreeMap<u32, Vec<ChainMemberView>>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let chain_id: u32 = row.get(0)?;
        let species: String = row.get(1)?;
        let stage: u32 = row.get(2)?;

        let Some((id, entity)) = by_species.get(species.as_str()) else {
            warn!(chain_id, species = %species, "chain member not in snapshot, skipping");
            continue;
        };
        chains
            .entry(chain_id)
            .or_default()
            .entry(stage)
            .or_default()
            .push(ChainMemberView {
                id: *id,
                slug: entity.slug.clone(),
                display_name: entity.names.display_name().to_string(),
                names: entity.names.clone(),
            });
    }

    Ok(chains
        .into_iter()
        .map(|(chain_id, stages)| (chain_id, stages.into_values().collect()))
        .collect())
}
