//! Shared test helpers for drover integration tests.
//!
//! Provides an in-memory `RecordStore`, a recording `HookRegistry`, and
//! utilities for spinning up primary/replica nodes on localhost TCP.

// Each test binary compiles this module independently and only uses a subset
// of exports, so unused items are expected.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use drover::{
    Config, DroverNode, EntityKind, HookRegistry, Notification, RecordStore, StoreError, WriteHook,
};

// ============================================================================
// MemoryStore — in-memory record store
// ============================================================================

/// Stored record fields.
pub type Fields = HashMap<String, String>;

/// A `RecordStore` over nested hash maps, seeded with the two collections
/// the propagation core writes to.
pub struct MemoryStore {
    collections: Mutex<HashMap<String, HashMap<String, Fields>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut collections = HashMap::new();
        collections.insert("messages".to_string(), HashMap::new());
        collections.insert("users".to_string(), HashMap::new());
        Self {
            collections: Mutex::new(collections),
        }
    }

    /// Fetch a stored record, if present.
    pub fn get(&self, collection: &str, id: &str) -> Option<Fields> {
        self.collections
            .lock()
            .unwrap()
            .get(collection)?
            .get(id)
            .cloned()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .lock()
            .unwrap()
            .get(collection)
            .map_or(0, |records| records.len())
    }
}

impl RecordStore for MemoryStore {
    type Collection = String;

    fn find_collection(&self, name: &str) -> Result<String, StoreError> {
        if self.collections.lock().unwrap().contains_key(name) {
            Ok(name.to_string())
        } else {
            Err(StoreError::CollectionNotFound(name.to_string()))
        }
    }

    fn upsert(
        &self,
        collection: &String,
        id: &str,
        fields: &[(&str, &str)],
    ) -> Result<(), StoreError> {
        if id.is_empty() {
            return Err(StoreError::Validation("id must not be empty".to_string()));
        }
        let mut collections = self.collections.lock().unwrap();
        let records = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.clone()))?;
        let record = records.entry(id.to_string()).or_default();
        record.clear();
        for (name, value) in fields {
            record.insert((*name).to_string(), (*value).to_string());
        }
        Ok(())
    }
}

// ============================================================================
// RecordingHooks — captures hook registrations
// ============================================================================

/// A `HookRegistry` that records every registration for inspection and
/// lets tests drive the hooks directly.
#[derive(Default)]
pub struct RecordingHooks {
    pub before: Vec<(Vec<EntityKind>, WriteHook)>,
    pub after: Vec<(Vec<EntityKind>, WriteHook)>,
}

impl HookRegistry for RecordingHooks {
    fn before_create(&mut self, kinds: &[EntityKind], hook: WriteHook) {
        self.before.push((kinds.to_vec(), hook));
    }

    fn after_create(&mut self, kinds: &[EntityKind], hook: WriteHook) {
        self.after.push((kinds.to_vec(), hook));
    }
}

// ============================================================================
// Node construction
// ============================================================================

/// Bind to port 0 and return the OS-assigned port.
///
/// The listener is dropped immediately so the port is available for the
/// node to bind. There's a small race window, but it's fine for tests.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Config pointing at localhost with a fast dial backoff.
pub fn test_config(port: u16) -> Config {
    Config {
        primary_host: "127.0.0.1".to_string(),
        port,
        dial_backoff: Duration::from_millis(50),
    }
}

/// Build a node without starting its leader locator.
pub fn build_node(port: u16) -> Arc<DroverNode<MemoryStore>> {
    DroverNode::new(test_config(port), MemoryStore::new())
}

/// Build a node and start its leader locator (the normal startup path).
pub fn spawn_node(port: u16) -> Arc<DroverNode<MemoryStore>> {
    let node = build_node(port);
    node.start();
    node
}

// ============================================================================
// Notification constructors
// ============================================================================

pub fn message(id: &str, content: &str, author: &str) -> Notification {
    Notification::Message {
        id: id.to_string(),
        content: content.to_string(),
        author: author.to_string(),
    }
}

pub fn user(id: &str, username: &str) -> Notification {
    Notification::User {
        id: id.to_string(),
        username: username.to_string(),
    }
}

// ============================================================================
// Wait helpers
// ============================================================================

/// Poll `cond` until it holds (up to `timeout`).
pub async fn wait_for<F: Fn() -> bool>(cond: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if cond() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Wait until `node` reports exactly `expected` connected followers.
pub async fn wait_for_followers(
    node: &Arc<DroverNode<MemoryStore>>,
    expected: usize,
    timeout: Duration,
) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if node.follower_count().await == expected {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Wait until `node`'s store holds a record at `collection`/`id`.
pub async fn wait_for_record(
    node: &Arc<DroverNode<MemoryStore>>,
    collection: &str,
    id: &str,
    timeout: Duration,
) -> Option<Fields> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(record) = node.store().get(collection, id) {
            return Some(record);
        }
        if tokio::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
