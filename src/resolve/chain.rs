use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

use super::source::{ChainLink, ChainPayload};
use crate::error::SyncError;
use crate::fetch::{resource_id, RateLimitedClient};
use crate::model::{ChainMember, EvolutionChain};

/// Chains resolved during one sync run, keyed by chain id.
///
/// Created by the run and lent to the resolver; dropped when the run ends.
#[derive(Debug, Default)]
pub struct ChainCache {
    chains: HashMap<u32, Arc<EvolutionChain>>,
    fetches: usize,
}

impl ChainCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u32) -> Option<Arc<EvolutionChain>> {
        self.chains.get(&id).cloned()
    }

    pub fn insert(&mut self, chain: EvolutionChain) -> Arc<EvolutionChain> {
        let chain = Arc::new(chain);
        self.chains.insert(chain.id, Arc::clone(&chain));
        chain
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Network fetches performed through this cache
    pub fn fetches(&self) -> usize {
        self.fetches
    }
}

/// Return the chain behind `chain_url`, fetching it only on a cache miss.
pub fn resolve_chain(
    client: &RateLimitedClient,
    cache: &mut ChainCache,
    chain_url: &str,
) -> Result<Arc<EvolutionChain>, SyncError> {
    let id = resource_id(chain_url).ok_or_else(|| SyncError::MalformedChain {
        chain: chain_url.to_string(),
        reason: "chain URL has no numeric id".to_string(),
    })?;

    if let Some(chain) = cache.get(id) {
        debug!(chain = id, "evolution chain cache hit");
        return Ok(chain);
    }

    cache.fetches += 1;
    let body = client.fetch(chain_url)?;
    let payload: ChainPayload =
        serde_json::from_str(&body).map_err(|source| SyncError::Decode {
            url: chain_url.to_string(),
            source,
        })?;

    if let Some(payload_id) = payload.id {
        if payload_id != id {
            return Err(SyncError::MalformedChain {
                chain: id.to_string(),
                reason: format!("payload reports id {payload_id}"),
            });
        }
    }

    let chain = flatten_chain(id, &payload.chain)?;
    debug!(chain = id, stages = chain.stages.len(), "evolution chain resolved");
    Ok(cache.insert(chain))
}

/// Flatten the tree rooted at `root` into breadth-first depth levels.
pub fn flatten_chain(id: u32, root: &ChainLink) -> Result<EvolutionChain, SyncError> {
    let malformed = |reason: String| SyncError::MalformedChain {
        chain: id.to_string(),
        reason,
    };

    let mut stages: Vec<Vec<ChainMember>> = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<(usize, &ChainLink)> = VecDeque::from([(0, root)]);

    while let Some((depth, node)) = queue.pop_front() {
        let name = node.species.name.as_str();
        if !visited.insert(name) {
            return Err(malformed(format!("species {name} appears more than once")));
        }

        let species_id = resource_id(&node.species.url)
            .ok_or_else(|| malformed(format!("species {name} has no numeric id")))?;

        if stages.len() == depth {
            stages.push(Vec::new());
        }
        stages[depth].push(ChainMember {
            species_id,
            species_name: name.to_string(),
        });

        for child in &node.evolves_to {
            queue.push_back((depth + 1, child));
        }
    }

    Ok(EvolutionChain { id, stages })
}
