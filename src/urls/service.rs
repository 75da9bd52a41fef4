//! The canonical URL service.
//!
//! One generator per permalink-bearing route, arbitrated centrally: for
//! every resource, the highest-priority generator that wants it and can
//! render a path owns its canonical URL. Lower-priority claims are
//! suppressed and recorded. A reverse path → resource map answers the
//! router's entry lookups.
//!
//! Reloads bump a generation counter and run a full regeneration pass;
//! until the pass for the current generation completes, `url_for`
//! answers [`UrlLookup::Pending`] rather than a stale value. A pass
//! superseded by a newer reload abandons its remaining work.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use tokio::sync::watch;

use crate::config::schema::SiteIdentity;
use crate::index::resource::ResourceId;
use crate::index::store::ResourceIndex;
use crate::routing::route::MatcherRank;
use crate::routing::table::{EntryResolver, RouteTable};
use crate::urls::generator::UrlGenerator;

/// Result of a canonical URL lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlLookup {
    /// The resource's canonical path.
    Known(String),

    /// No route addresses this resource.
    None,

    /// A regeneration pass is in flight; the answer is not yet known.
    Pending,
}

/// A resource's current URL ownership.
#[derive(Debug, Clone)]
struct OwnedUrl {
    rank: MatcherRank,
    path: String,
}

/// Central URL state: generators, ownership maps, settle signalling.
pub struct UrlService {
    index: ResourceIndex,
    generators: RwLock<Arc<Vec<UrlGenerator>>>,

    owners: DashMap<ResourceId, OwnedUrl>,
    by_path: DashMap<String, (ResourceId, MatcherRank)>,

    /// Generation of the most recent install.
    current_generation: AtomicU64,

    /// Generation whose regeneration pass has completed.
    settled_tx: watch::Sender<u64>,
}

impl UrlService {
    pub fn new(index: ResourceIndex) -> Arc<Self> {
        let (settled_tx, _) = watch::channel(0);
        Arc::new(Self {
            index,
            generators: RwLock::new(Arc::new(Vec::new())),
            owners: DashMap::new(),
            by_path: DashMap::new(),
            current_generation: AtomicU64::new(0),
            settled_tx,
        })
    }

    /// Install the generators derived from a route table and bump the
    /// generation. Lookups answer `Pending` until [`Self::regenerate`]
    /// completes for the returned generation.
    pub fn install(&self, table: &RouteTable) -> u64 {
        let generators: Vec<UrlGenerator> = table
            .matchers()
            .iter()
            .filter_map(UrlGenerator::from_matcher)
            .collect();

        *self.generators.write().expect("generators lock") = Arc::new(generators);
        let generation = self.current_generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(generation, "url generators installed");
        generation
    }

    /// Run a full regeneration pass for `generation`. Abandons without
    /// touching further state as soon as a newer generation is installed.
    pub fn regenerate(&self, generation: u64) {
        let ids: Vec<ResourceId> = self.index.all().into_iter().map(|r| r.id).collect();

        for id in &ids {
            if self.superseded(generation) {
                tracing::info!(generation, "regeneration pass superseded, abandoning");
                return;
            }
            self.recompute(id);
        }

        // drop ownership of resources that left the index
        let orphans: Vec<ResourceId> = self
            .owners
            .iter()
            .map(|e| e.key().clone())
            .filter(|id| self.index.get(id).is_none())
            .collect();
        for id in orphans {
            self.recompute(&id);
        }

        if !self.superseded(generation) {
            self.settled_tx.send_replace(generation);
            metrics::counter!("masthead_url_regenerations_total").increment(1);
            tracing::info!(generation, urls = self.owners.len(), "url service settled");
        }
    }

    /// Recompute ownership for one resource: the shared arbitration
    /// step. Generators are consulted in priority-rank order; the first
    /// that wants the resource and renders a path wins. Called from the
    /// index consumer on every change and from regeneration passes.
    pub fn recompute(&self, resource_id: &str) {
        let generators = self.generators.read().expect("generators lock").clone();
        let resource = self.index.get(resource_id);

        let mut chosen: Option<OwnedUrl> = None;
        let mut claimants = 0usize;

        if let Some(resource) = &resource {
            for generator in generators.iter() {
                if !generator.wants(resource) {
                    continue;
                }
                match generator.generate(resource) {
                    Ok(path) => {
                        claimants += 1;
                        if chosen.is_none() {
                            chosen = Some(OwnedUrl {
                                rank: generator.rank,
                                path,
                            });
                        }
                    }
                    // expected: the resource is simply unreachable here
                    Err(e) => {
                        tracing::trace!(resource = resource_id, error = %e, "no url from route");
                    }
                }
            }
        }

        if claimants > 1 {
            // arbitration broke a tie; observable but not an error
            let winner = chosen.as_ref().map(|o| o.rank).unwrap_or_default();
            tracing::debug!(
                resource = resource_id,
                claimants,
                winner_rank = winner,
                "ambiguous url ownership, highest-priority route wins"
            );
            metrics::counter!("masthead_ambiguous_ownership_total").increment(1);
        }

        self.store_ownership(resource_id, chosen);
    }

    fn store_ownership(&self, resource_id: &str, chosen: Option<OwnedUrl>) {
        let previous = match &chosen {
            Some(owned) => self
                .owners
                .insert(resource_id.to_string(), owned.clone()),
            None => self.owners.remove(resource_id).map(|(_, o)| o),
        };

        if let Some(old) = previous {
            let changed = chosen.as_ref().map(|o| o.path != old.path).unwrap_or(true);
            if changed {
                self.by_path
                    .remove_if(&old.path, |_, (id, _)| id == resource_id);
            }
        }

        if let Some(owned) = chosen {
            if let Some(existing) = self.by_path.get(&owned.path) {
                if existing.value().0 != resource_id {
                    tracing::warn!(
                        path = %owned.path,
                        "two resources generated the same canonical path"
                    );
                }
            }
            self.by_path
                .insert(owned.path, (resource_id.to_string(), owned.rank));
        }
    }

    fn superseded(&self, generation: u64) -> bool {
        self.current_generation.load(Ordering::SeqCst) != generation
    }

    /// Generation of the most recent install.
    pub fn generation(&self) -> u64 {
        self.current_generation.load(Ordering::SeqCst)
    }

    /// Whether the current generation has settled.
    pub fn is_settled(&self) -> bool {
        *self.settled_tx.borrow() == self.current_generation.load(Ordering::SeqCst)
    }

    /// Canonical path lookup. Never blocks and never serves a stale
    /// value: answers `Pending` while a regeneration pass is due.
    pub fn url_for(&self, resource_id: &str) -> UrlLookup {
        if !self.is_settled() {
            return UrlLookup::Pending;
        }
        match self.owners.get(resource_id) {
            Some(owned) => UrlLookup::Known(owned.path.clone()),
            None => UrlLookup::None,
        }
    }

    /// Absolute canonical URL against the site's configured base.
    pub fn absolute_url_for(&self, resource_id: &str, site: &SiteIdentity) -> Option<url::Url> {
        match self.url_for(resource_id) {
            UrlLookup::Known(path) => url::Url::parse(&site.url)
                .ok()
                .and_then(|base| base.join(path.trim_start_matches('/')).ok()),
            _ => None,
        }
    }

    /// Wait until the current generation settles.
    pub async fn wait_settled(&self) {
        let mut rx = self.settled_tx.subscribe();
        let target = self.current_generation.load(Ordering::SeqCst);
        let _ = rx.wait_for(|settled| *settled >= target).await;
    }
}

impl EntryResolver for UrlService {
    fn resource_at(&self, path: &str) -> Option<(ResourceId, MatcherRank)> {
        self.by_path.get(path).map(|e| e.value().clone())
    }
}
