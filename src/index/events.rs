//! Change notifications from the persistence layer.
//!
//! The routing core never talks to storage directly: a [`ContentStore`]
//! bulk-loads the minimal resource fields at startup and streams change
//! events over an explicit channel afterwards. The index subscribes to
//! that channel; nothing else mutates it.

use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::index::resource::{Resource, ResourceId, ResourceKind};

/// Errors surfaced by a content store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error reading content: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed content snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A change to one resource.
#[derive(Debug, Clone)]
pub enum ResourceEvent {
    Added(Resource),
    Updated(Resource),
    Deleted { id: ResourceId },
}

impl ResourceEvent {
    /// Identifier of the affected resource.
    pub fn resource_id(&self) -> &str {
        match self {
            ResourceEvent::Added(r) | ResourceEvent::Updated(r) => &r.id,
            ResourceEvent::Deleted { id } => id,
        }
    }
}

/// The persistence seam the index consumes.
pub trait ContentStore: Send + Sync {
    /// Bulk-load all resources of one kind.
    fn list_resources(&self, kind: ResourceKind) -> Result<Vec<Resource>, StoreError>;

    /// Take the change-event stream. Yields `None` once when called
    /// again; the stream has a single consumer.
    fn events(&self) -> Option<mpsc::UnboundedReceiver<ResourceEvent>>;
}

/// A content store backed by a JSON snapshot file.
///
/// Used by the binary's preview mode and by tests; a real deployment
/// implements [`ContentStore`] against its persistence layer. The
/// snapshot is a JSON array of resources. Events pushed through
/// [`JsonContentStore::sender`] reach the index like any other store's.
pub struct JsonContentStore {
    resources: Vec<Resource>,
    event_tx: mpsc::UnboundedSender<ResourceEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<ResourceEvent>>>,
}

impl JsonContentStore {
    /// Load a snapshot from disk.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let resources: Vec<Resource> = serde_json::from_str(&raw)?;
        Ok(Self::from_resources(resources))
    }

    /// Build a store from in-memory resources.
    pub fn from_resources(resources: Vec<Resource>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            resources,
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
        }
    }

    /// Sender half of the event stream, for pushing live changes.
    pub fn sender(&self) -> mpsc::UnboundedSender<ResourceEvent> {
        self.event_tx.clone()
    }
}

impl ContentStore for JsonContentStore {
    fn list_resources(&self, kind: ResourceKind) -> Result<Vec<Resource>, StoreError> {
        Ok(self
            .resources
            .iter()
            .filter(|r| r.kind == kind)
            .cloned()
            .collect())
    }

    fn events(&self) -> Option<mpsc::UnboundedReceiver<ResourceEvent>> {
        self.event_rx.lock().expect("event receiver lock").take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::resource::{Status, Visibility};

    fn post(id: &str) -> Resource {
        Resource {
            id: id.to_string(),
            kind: ResourceKind::Post,
            slug: id.to_string(),
            status: Status::Published,
            visibility: Visibility::Public,
            featured: false,
            tags: Vec::new(),
            authors: Vec::new(),
            published_at: None,
            templates: Vec::new(),
        }
    }

    #[test]
    fn json_store_lists_by_kind() {
        let mut tag = post("t1");
        tag.kind = ResourceKind::Tag;
        let store = JsonContentStore::from_resources(vec![post("p1"), post("p2"), tag]);

        assert_eq!(store.list_resources(ResourceKind::Post).unwrap().len(), 2);
        assert_eq!(store.list_resources(ResourceKind::Tag).unwrap().len(), 1);
        assert!(store.list_resources(ResourceKind::Author).unwrap().is_empty());
    }

    #[test]
    fn event_stream_is_single_consumer() {
        let store = JsonContentStore::from_resources(Vec::new());
        assert!(store.events().is_some());
        assert!(store.events().is_none());
    }

    #[tokio::test]
    async fn pushed_events_reach_the_receiver() {
        let store = JsonContentStore::from_resources(Vec::new());
        let mut rx = store.events().unwrap();

        store.sender().send(ResourceEvent::Added(post("p1"))).unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.resource_id(), "p1");
    }
}
