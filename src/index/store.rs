//! The in-memory resource index.
//!
//! An eventually-consistent mirror of queryable content. Populated by a
//! bulk load at startup, kept current by applying change events on a
//! single consumer task, which serializes updates per resource id by
//! construction. Reads are lock-free snapshots.

use std::sync::Arc;

use dashmap::DashMap;

use crate::index::events::{ContentStore, ResourceEvent, StoreError};
use crate::index::resource::{Resource, ResourceId, ResourceKind};
use crate::routing::filter::FilterExpr;

/// Concurrent index of resources by id.
#[derive(Clone, Default)]
pub struct ResourceIndex {
    inner: Arc<DashMap<ResourceId, Resource>>,
}

impl ResourceIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Bulk-load every resource kind from the store.
    pub fn load_from(&self, store: &dyn ContentStore) -> Result<(), StoreError> {
        for kind in [
            ResourceKind::Post,
            ResourceKind::Page,
            ResourceKind::Tag,
            ResourceKind::Author,
        ] {
            for resource in store.list_resources(kind)? {
                self.upsert(resource);
            }
        }
        tracing::info!(resources = self.len(), "resource index loaded");
        Ok(())
    }

    /// Insert or replace a resource. Idempotent by id.
    pub fn upsert(&self, resource: Resource) {
        self.inner.insert(resource.id.clone(), resource);
        metrics::gauge!("masthead_index_resources").set(self.inner.len() as f64);
    }

    /// Remove a resource. Removing an unknown id is a no-op.
    pub fn remove(&self, id: &str) -> Option<Resource> {
        let removed = self.inner.remove(id).map(|(_, r)| r);
        if removed.is_none() {
            tracing::debug!(id, "remove for unknown resource, skipping");
        }
        metrics::gauge!("masthead_index_resources").set(self.inner.len() as f64);
        removed
    }

    /// Look up one resource by id.
    pub fn get(&self, id: &str) -> Option<Resource> {
        self.inner.get(id).map(|r| r.value().clone())
    }

    /// Snapshot of resources of the given kinds matching the filter.
    pub fn query(&self, kinds: &[ResourceKind], filter: Option<&FilterExpr>) -> Vec<Resource> {
        self.inner
            .iter()
            .filter(|r| kinds.contains(&r.kind))
            .filter(|r| filter.map(|f| f.matches(r)).unwrap_or(true))
            .map(|r| r.value().clone())
            .collect()
    }

    /// Snapshot of every indexed resource.
    pub fn all(&self) -> Vec<Resource> {
        self.inner.iter().map(|r| r.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Apply one change event.
    pub fn apply(&self, event: ResourceEvent) {
        match event {
            ResourceEvent::Added(resource) | ResourceEvent::Updated(resource) => {
                self.upsert(resource)
            }
            ResourceEvent::Deleted { id } => {
                self.remove(&id);
            }
        }
    }

    /// Consume the event stream until the sender closes. Run this on its
    /// own task; being the only consumer keeps per-id ordering.
    /// `on_applied` fires after each event lands, with the affected id.
    pub async fn run(
        &self,
        mut events: tokio::sync::mpsc::UnboundedReceiver<ResourceEvent>,
        on_applied: impl Fn(&str),
    ) {
        while let Some(event) = events.recv().await {
            let id = event.resource_id().to_string();
            self.apply(event);
            on_applied(&id);
        }
        tracing::info!("resource event stream closed");
    }
}
