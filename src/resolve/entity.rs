use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::chain::{resolve_chain, ChainCache};
use super::source::{FlavorText, LocalizedName, PokemonPayload, SpeciesPayload};
use crate::error::SyncError;
use crate::fetch::{resource_id, EntrySummary, RateLimitedClient};
use crate::model::{
    Ability, BaseStat, CatalogEntry, HeldItem, LocalizedNames, MoveLearn, RawPayload,
    ResolvedEntity, SpeciesExtension, SpeciesProfile,
};

/// Flavor-text languages in order of preference
const DESCRIPTION_LANGUAGES: &[&str] = &["zh-hans", "zh-hant", "ja", "ja-hrkt", "en"];

/// Sprite locations in order of preference, as JSON pointers into `sprites`
const SPRITE_POINTERS: &[&str] = &[
    "/other/official-artwork/front_default",
    "/other/home/front_default",
    "/other/dream_world/front_default",
    "/front_default",
];

/// Turns list summaries into fully resolved entities for one sync run.
pub struct EntityResolver<'a> {
    client: &'a RateLimitedClient,
    chains: &'a mut ChainCache,
}

impl<'a> EntityResolver<'a> {
    pub fn new(client: &'a RateLimitedClient, chains: &'a mut ChainCache) -> Self {
        Self { client, chains }
    }

    pub fn resolve(&mut self, summary: &EntrySummary) -> Result<ResolvedEntity, SyncError> {
        let (pokemon, pokemon_raw) = self.fetch_json::<PokemonPayload>(&summary.url)?;

        let species_url = pokemon
            .species
            .as_ref()
            .map(|s| s.url.clone())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SyncError::MissingSpecies {
                entity: pokemon.name.clone(),
            })?;
        let (species, species_raw) = self.fetch_json::<SpeciesPayload>(&species_url)?;

        let chain_url = species.evolution_chain.as_ref().map(|c| c.url.clone());
        let chain = match chain_url.as_deref() {
            Some(url) => Some(resolve_chain(self.client, self.chains, url)?),
            None => None,
        };

        debug!(id = pokemon.id, name = %pokemon.name, "resolved entity");
        Ok(ResolvedEntity {
            entry: build_entry(pokemon, pokemon_raw),
            species: build_species(species, species_raw, chain_url.as_deref()),
            chain,
        })
    }

    fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> Result<(T, RawPayload), SyncError> {
        let body = self.client.fetch(url)?;
        let parsed = serde_json::from_str(&body).map_err(|source| SyncError::Decode {
            url: url.to_string(),
            source,
        })?;
        Ok((parsed, RawPayload::new(body)))
    }
}

pub fn build_entry(pokemon: PokemonPayload, raw: RawPayload) -> CatalogEntry {
    let mut types = pokemon.types;
    types.sort_by_key(|t| t.slot);

    let mut abilities: Vec<Ability> = pokemon
        .abilities
        .into_iter()
        .map(|a| Ability {
            name: a.ability.name,
            is_hidden: a.is_hidden,
            slot: a.slot,
        })
        .collect();
    abilities.sort_by_key(|a| a.slot);

    let moves = pokemon
        .moves
        .into_iter()
        .flat_map(|m| {
            let name = m.learned.name;
            m.version_group_details
                .into_iter()
                .map(move |detail| MoveLearn {
                    name: name.clone(),
                    version_group: detail.version_group.name,
                    learn_method: detail.move_learn_method.name,
                    level: detail.level_learned_at,
                })
        })
        .collect();

    let held_items = pokemon
        .held_items
        .into_iter()
        .flat_map(|h| {
            let name = h.item.name;
            h.version_details.into_iter().map(move |v| HeldItem {
                name: name.clone(),
                version: v.version.name,
                rarity: v.rarity,
            })
        })
        .collect();

    CatalogEntry {
        id: pokemon.id,
        slug: pokemon.name,
        types: types.into_iter().map(|t| t.kind.name).collect(),
        abilities,
        stats: pokemon
            .stats
            .into_iter()
            .map(|s| BaseStat {
                name: s.stat.name,
                base: s.base_stat,
                effort: s.effort,
            })
            .collect(),
        moves,
        held_items,
        height: pokemon.height,
        weight: pokemon.weight,
        base_experience: pokemon.base_experience,
        order: pokemon.order,
        is_default: pokemon.is_default,
        sprite: pick_sprite(&pokemon.sprites),
        raw,
        synced_at: Utc::now(),
    }
}

pub fn build_species(
    species: SpeciesPayload,
    raw: RawPayload,
    chain_url: Option<&str>,
) -> SpeciesExtension {
    let named = |r: Option<super::source::NamedResource>| r.map(|r| r.name);

    SpeciesExtension {
        names: localized_names(&species.names),
        description: pick_description(&species.flavor_text_entries),
        egg_groups: dedup_ordered(species.egg_groups.into_iter().map(|g| g.name)),
        evolution_chain_id: chain_url.and_then(resource_id),
        evolves_from: named(species.evolves_from_species),
        profile: SpeciesProfile {
            color: named(species.color),
            habitat: named(species.habitat),
            shape: named(species.shape),
            generation: named(species.generation),
            growth_rate: named(species.growth_rate),
            capture_rate: species.capture_rate,
            base_happiness: species.base_happiness,
            gender_rate: species.gender_rate,
            hatch_counter: species.hatch_counter,
            is_baby: species.is_baby,
            is_legendary: species.is_legendary,
            is_mythical: species.is_mythical,
        },
        name: species.name,
        raw,
    }
}

/// Collect English, Japanese and Chinese names; Simplified wins over Traditional.
pub fn localized_names(entries: &[LocalizedName]) -> LocalizedNames {
    let mut names = LocalizedNames::default();
    let mut zh_hans = None;
    let mut zh_hant = None;

    for entry in entries {
        if entry.name.is_empty() {
            continue;
        }
        let value = Some(entry.name.clone());
        match entry.language.name.to_lowercase().as_str() {
            "en" => names.en = value,
            "ja" | "ja-hrkt" => {
                if names.ja.is_none() {
                    names.ja = value;
                }
            }
            "zh-hans" => zh_hans = value,
            "zh-hant" => zh_hant = value,
            _ => {}
        }
    }

    names.zh = zh_hans.or(zh_hant);
    names
}

/// First non-empty flavor text in the preferred languages, else the first seen.
pub fn pick_description(entries: &[FlavorText]) -> Option<String> {
    let mut first_by_language: Vec<(String, &str)> = Vec::new();

    for entry in entries {
        let lang = entry.language.name.to_lowercase();
        if lang.is_empty() || entry.flavor_text.trim().is_empty() {
            continue;
        }
        if !first_by_language.iter().any(|(l, _)| *l == lang) {
            first_by_language.push((lang, entry.flavor_text.as_str()));
        }
    }

    DESCRIPTION_LANGUAGES
        .iter()
        .find_map(|preferred| {
            first_by_language
                .iter()
                .find(|(lang, _)| lang == preferred)
                .map(|(_, text)| *text)
        })
        .or_else(|| first_by_language.first().map(|(_, text)| *text))
        .map(clean_flavor_text)
}

fn clean_flavor_text(text: &str) -> String {
    text.replace(['\n', '\u{000c}'], " ")
}

pub fn pick_sprite(sprites: &Value) -> Option<String> {
    SPRITE_POINTERS
        .iter()
        .filter_map(|pointer| sprites.pointer(pointer).and_then(Value::as_str))
        .find(|url| !url.is_empty())
        .map(str::to_string)
}

fn dedup_ordered(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::stub::{ManualClock, StubTransport};
    use crate::fetch::RetryPolicy;
    use crate::resolve::source::NamedResource;
    use serde_json::json;
    use std::rc::Rc;

    const BASE: &str = "https://example.org/api/v2";

    fn lang(name: &str) -> NamedResource {
        NamedResource {
            name: name.to_string(),
            url: String::new(),
        }
    }

    fn flavor(text: &str, language: &str) -> FlavorText {
        FlavorText {
            flavor_text: text.to_string(),
            language: lang(language),
        }
    }

    #[test]
    fn test_localized_names_partial_mapping() {
        let entries = vec![
            LocalizedName {
                name: "Pikachu".into(),
                language: lang("en"),
            },
            LocalizedName {
                name: "皮卡丘".into(),
                language: lang("zh-Hant"),
            },
        ];

        let names = localized_names(&entries);

        assert_eq!(names.en.as_deref(), Some("Pikachu"));
        assert_eq!(names.ja, None);
        assert_eq!(names.zh.as_deref(), Some("皮卡丘"));
    }

    #[test]
    fn test_localized_names_prefers_simplified() {
        let entries = vec![
            LocalizedName {
                name: "妙蛙種子".into(),
                language: lang("zh-Hant"),
            },
            LocalizedName {
                name: "妙蛙种子".into(),
                language: lang("zh-Hans"),
            },
            LocalizedName {
                name: "フシギダネ".into(),
                language: lang("ja-Hrkt"),
            },
        ];

        let names = localized_names(&entries);

        assert_eq!(names.zh.as_deref(), Some("妙蛙种子"));
        assert_eq!(names.ja.as_deref(), Some("フシギダネ"));
    }

    #[test]
    fn test_pick_description_preference_and_cleanup() {
        let entries = vec![
            flavor("Loves\nberries.", "en"),
            flavor("", "ja"),
            flavor("きのみが\u{000c}すき。", "ja"),
        ];
        assert_eq!(
            pick_description(&entries).as_deref(),
            Some("きのみが すき。")
        );

        let only_french = vec![flavor("Adore les baies.", "fr")];
        assert_eq!(
            pick_description(&only_french).as_deref(),
            Some("Adore les baies.")
        );
        assert_eq!(pick_description(&[]), None);
    }

    #[test]
    fn test_pick_sprite_order() {
        let sprites = json!({
            "front_default": "front.png",
            "other": {
                "official-artwork": {"front_default": null},
                "home": {"front_default": "home.png"}
            }
        });
        assert_eq!(pick_sprite(&sprites).as_deref(), Some("home.png"));
        assert_eq!(pick_sprite(&Value::Null), None);
    }

    fn pikachu_detail() -> String {
        json!({
            "id": 25,
            "name": "pikachu",
            "base_experience": null,
            "height": 4,
            "weight": 60,
            "species": {"name": "pikachu", "url": format!("{BASE}/pokemon-species/25/")},
            "types": [{"slot": 1, "type": {"name": "electric", "url": ""}}],
            "abilities": [
                {"slot": 3, "is_hidden": true, "ability": {"name": "lightning-rod", "url": ""}},
                {"slot": 1, "is_hidden": false, "ability": {"name": "static", "url": ""}}
            ],
            "stats": [{"base_stat": 35, "effort": 0, "stat": {"name": "hp", "url": ""}}],
            "moves": [{
                "move": {"name": "thunder-shock", "url": ""},
                "version_group_details": [
                    {"level_learned_at": 1, "version_group": {"name": "red-blue", "url": ""},
                     "move_learn_method": {"name": "level-up", "url": ""}},
                    {"level_learned_at": 1, "version_group": {"name": "yellow", "url": ""},
                     "move_learn_method": {"name": "level-up", "url": ""}}
                ]
            }],
            "held_items": [{
                "item": {"name": "light-ball", "url": ""},
                "version_details": [{"rarity": 5, "version": {"name": "yellow", "url": ""}}]
            }],
            "sprites": {"front_default": "pikachu.png"}
        })
        .to_string()
    }

    #[test]
    fn test_resolve_merges_detail_species_and_chain() {
        let transport = Rc::new(StubTransport::new());
        transport.serve(&format!("{BASE}/pokemon/25/"), pikachu_detail());
        transport.serve(
            &format!("{BASE}/pokemon-species/25/"),
            json!({
                "name": "pikachu",
                "names": [{"name": "Pikachu", "language": {"name": "en", "url": ""}}],
                "flavor_text_entries": [{"flavor_text": "Stores electricity.", "language": {"name": "en", "url": ""}}],
                "egg_groups": [{"name": "ground", "url": ""}, {"name": "fairy", "url": ""}],
                "evolution_chain": {"url": format!("{BASE}/evolution-chain/10/")},
                "evolves_from_species": {"name": "pichu", "url": ""},
                "capture_rate": 190,
                "is_legendary": false
            })
            .to_string(),
        );
        transport.serve(
            &format!("{BASE}/evolution-chain/10/"),
            json!({"id": 10, "chain": {
                "species": {"name": "pichu", "url": format!("{BASE}/pokemon-species/172/")},
                "evolves_to": [{
                    "species": {"name": "pikachu", "url": format!("{BASE}/pokemon-species/25/")},
                    "evolves_to": [{"species": {"name": "raichu", "url": format!("{BASE}/pokemon-species/26/")}, "evolves_to": []}]
                }]
            }})
            .to_string(),
        );
        let client = RateLimitedClient::new(
            Box::new(transport.clone()),
            Box::new(ManualClock::new()),
            RetryPolicy::default(),
        );
        let mut cache = ChainCache::new();
        let summary = EntrySummary {
            name: "pikachu".into(),
            url: format!("{BASE}/pokemon/25/"),
        };

        let entity = EntityResolver::new(&client, &mut cache)
            .resolve(&summary)
            .unwrap();

        let entry = &entity.entry;
        assert_eq!(entry.id, 25);
        assert_eq!(entry.types, vec!["electric"]);
        assert_eq!(entry.abilities[0].name, "static");
        assert!(entry.abilities[1].is_hidden);
        assert_eq!(entry.base_experience, None);
        assert_eq!(entry.moves.len(), 2);
        assert_eq!(entry.held_items[0].rarity, 5);
        assert_eq!(entry.sprite.as_deref(), Some("pikachu.png"));
        assert!(entry.raw.as_str().contains("\"pikachu\""));

        let species = &entity.species;
        assert_eq!(species.names.ja, None);
        assert_eq!(species.description.as_deref(), Some("Stores electricity."));
        assert_eq!(species.egg_groups, vec!["ground", "fairy"]);
        assert_eq!(species.evolution_chain_id, Some(10));
        assert_eq!(species.evolves_from.as_deref(), Some("pichu"));
        assert_eq!(species.profile.capture_rate, Some(190));

        let chain = entity.chain.expect("chain resolved");
        assert_eq!(chain.stage_sizes(), vec![1, 1, 1]);
        assert_eq!(transport.requested().len(), 3);
    }

    #[test]
    fn test_missing_species_reference() {
        let transport = Rc::new(StubTransport::new());
        transport.serve(
            &format!("{BASE}/pokemon/1/"),
            json!({"id": 1, "name": "bulbasaur"}).to_string(),
        );
        let client = RateLimitedClient::new(
            Box::new(transport),
            Box::new(ManualClock::new()),
            RetryPolicy::default(),
        );
        let mut cache = ChainCache::new();

        let err = EntityResolver::new(&client, &mut cache)
            .resolve(&EntrySummary {
                name: "bulbasaur".into(),
                url: format!("{BASE}/pokemon/1/"),
            })
            .unwrap_err();

        assert!(matches!(err, SyncError::MissingSpecies { .. }));
    }

    #[test]
    fn test_absent_learn_level_is_a_decode_error() {
        let transport = Rc::new(StubTransport::new());
        transport.serve(
            &format!("{BASE}/pokemon/1/"),
            json!({
                "id": 1,
                "name": "bulbasaur",
                "species": {"name": "bulbasaur", "url": format!("{BASE}/pokemon-species/1/")},
                "moves": [{
                    "move": {"name": "tackle", "url": ""},
                    "version_group_details": [{
                        "version_group": {"name": "red-blue", "url": ""},
                        "move_learn_method": {"name": "level-up", "url": ""}
                    }]
                }]
            })
            .to_string(),
        );
        let client = RateLimitedClient::new(
            Box::new(transport.clone()),
            Box::new(ManualClock::new()),
            RetryPolicy::default(),
        );
        let mut cache = ChainCache::new();

        let err = EntityResolver::new(&client, &mut cache)
            .resolve(&EntrySummary {
                name: "bulbasaur".into(),
                url: format!("{BASE}/pokemon/1/"),
            })
            .unwrap_err();

        assert!(matches!(err, SyncError::Decode { .. }));
        assert_eq!(transport.calls(&format!("{BASE}/pokemon-species/1/")), 0);
    }
}
