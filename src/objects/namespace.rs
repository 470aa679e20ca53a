//! Object namespace
//!
//! Maps object ids to live actors. The first lookup of an id spawns its
//! actor; later lookups return a stub to the same actor. An actor that stays
//! idle past the configured timeout removes its own entry, and the next
//! lookup spawns a fresh one.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::error::ObjectError;
use super::id::ObjectId;
use super::object::{self, GreetingObject, ObjectStub};
use super::storage::StorageLocation;
use crate::logger;

/// Snapshot of one live object
#[derive(Debug, Clone, Serialize)]
pub struct ObjectInfo {
    #[serde(flatten)]
    pub id: ObjectId,
    pub created_at: DateTime<Local>,
    pub invocations: u64,
}

struct Entry {
    stub: ObjectStub,
    created_at: DateTime<Local>,
    invocations: Arc<AtomicU64>,
    /// Distinguishes successive actors spawned for the same id
    generation: u64,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<ObjectId, Entry>,
    closed: bool,
    next_generation: u64,
}

pub struct ObjectNamespace {
    location: Arc<StorageLocation>,
    mailbox_capacity: usize,
    idle_timeout: Option<Duration>,
    registry: Arc<Mutex<Registry>>,
}

impl ObjectNamespace {
    /// `idle_timeout` of `None` keeps every actor until shutdown.
    pub fn new(
        location: StorageLocation,
        mailbox_capacity: usize,
        idle_timeout: Option<Duration>,
    ) -> Self {
        Self {
            location: Arc::new(location),
            mailbox_capacity: mailbox_capacity.max(1),
            idle_timeout,
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    pub fn id_from_name(&self, name: &str) -> ObjectId {
        ObjectId::from_name(name)
    }

    /// Get the stub for `id`, spawning its actor on first use.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn get(&self, id: &ObjectId) -> Result<ObjectStub, ObjectError> {
        let mut registry = self.lock();
        if registry.closed {
            return Err(ObjectError::Unavailable { id: id.clone() });
        }

        if let Some(entry) = registry.entries.get(id) {
            if !entry.stub.is_closed() {
                return Ok(entry.stub.clone());
            }
            logger::log_warning(&format!(
                "Object {} ({}) stopped unexpectedly, recreating",
                id.name(),
                id
            ));
        }

        let generation = registry.next_generation;
        registry.next_generation += 1;

        let (tx, rx) = mpsc::channel(self.mailbox_capacity);
        let invocations = Arc::new(AtomicU64::new(0));
        let object = GreetingObject::new(id.clone(), Arc::clone(&self.location));
        let retire = {
            let registry = Arc::downgrade(&self.registry);
            let id = id.clone();
            move || evict(&registry, &id, generation)
        };
        let task = tokio::spawn(object::run(
            object,
            rx,
            Arc::clone(&invocations),
            self.idle_timeout,
            retire,
        ));
        let stub = ObjectStub::new(id.clone(), tx);

        registry.entries.insert(
            id.clone(),
            Entry {
                stub: stub.clone(),
                created_at: Local::now(),
                invocations,
                generation,
                task,
            },
        );
        logger::log_object_created(id.name(), id.as_str());

        Ok(stub)
    }

    /// Run `op` against the object for `id`.
    ///
    /// An idle actor may retire between the lookup and the delivery of the
    /// message. The message was then never queued, so `op` is retried once
    /// on a freshly spawned actor.
    pub async fn with_object<T, F, Fut>(&self, id: &ObjectId, op: F) -> Result<T, ObjectError>
    where
        F: Fn(ObjectStub) -> Fut,
        Fut: Future<Output = Result<T, ObjectError>>,
    {
        match op(self.get(id)?).await {
            Err(ObjectError::Unavailable { .. }) => op(self.get(id)?).await,
            result => result,
        }
    }

    /// Live objects sorted by name
    pub fn list(&self) -> Vec<ObjectInfo> {
        let registry = self.lock();
        let mut objects: Vec<ObjectInfo> = registry
            .entries
            .iter()
            .map(|(id, entry)| ObjectInfo {
                id: id.clone(),
                created_at: entry.created_at,
                invocations: entry.invocations.load(Ordering::Relaxed),
            })
            .collect();
        objects.sort_by(|a, b| a.id.name().cmp(b.id.name()));
        objects
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Stop accepting lookups, close every mailbox and wait for the actors
    /// to finish their queued work.
    pub async fn shutdown(&self) {
        let entries: Vec<Entry> = {
            let mut registry = self.lock();
            registry.closed = true;
            registry.entries.drain().map(|(_, entry)| entry).collect()
        };

        let count = entries.len();
        let tasks: Vec<JoinHandle<()>> = entries
            .into_iter()
            .map(|entry| {
                drop(entry.stub);
                entry.task
            })
            .collect();

        for task in tasks {
            if let Err(e) = task.await {
                logger::log_error(&format!("Object task failed during shutdown: {e}"));
            }
        }
        logger::log_info(&format!("[Objects] {count} object(s) stopped"));
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        lock_registry(&self.registry)
    }
}

fn lock_registry(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drop the entry for `id` if it still belongs to actor `generation`
fn evict(registry: &Weak<Mutex<Registry>>, id: &ObjectId, generation: u64) {
    let Some(shared) = registry.upgrade() else {
        return;
    };
    let mut registry = lock_registry(&shared);
    if registry
        .entries
        .get(id)
        .is_some_and(|entry| entry.generation == generation)
    {
        registry.entries.remove(id);
        logger::log_object_evicted(id.name(), id.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::greeting::GreetingRequest;

    fn namespace() -> ObjectNamespace {
        ObjectNamespace::new(StorageLocation::Memory, 16, None)
    }

    fn evicting_namespace() -> ObjectNamespace {
        ObjectNamespace::new(StorageLocation::Memory, 16, Some(Duration::from_millis(50)))
    }

    #[tokio::test]
    async fn test_get_is_idempotent() {
        let ns = namespace();
        let id = ns.id_from_name("/greet");
        let a = ns.get(&id).unwrap();
        let b = ns.get(&ns.id_from_name("/greet")).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(ns.len(), 1);
        assert!(!ns.is_empty());

        a.get_greeting(GreetingRequest::default()).await.unwrap();
        b.get_greeting(GreetingRequest::default()).await.unwrap();
        let objects = ns.list();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].invocations, 2);
    }

    #[tokio::test]
    async fn test_distinct_names_distinct_objects() {
        let ns = namespace();
        let a = ns.get(&ns.id_from_name("/a")).unwrap();
        let b = ns.get(&ns.id_from_name("/b")).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(ns.len(), 2);

        let names: Vec<String> = ns.list().iter().map(|o| o.id.name().to_string()).collect();
        assert_eq!(names, vec!["/a", "/b"]);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_object() {
        let ns = Arc::new(namespace());
        let mut handles = Vec::new();
        for i in 0..32 {
            let ns = Arc::clone(&ns);
            handles.push(tokio::spawn(async move {
                let stub = ns.get(&ns.id_from_name("/shared")).unwrap();
                let request = GreetingRequest {
                    loaded: true,
                    signed_in: true,
                    full_name: Some(format!("user{i}")),
                };
                stub.get_greeting(request).await.unwrap()
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), format!("Hello user{i}!"));
        }

        assert_eq!(ns.len(), 1);
        assert_eq!(ns.list()[0].invocations, 32);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_lookups() {
        let ns = namespace();
        let stub = ns.get(&ns.id_from_name("/greet")).unwrap();
        assert_eq!(stub.say_hello().await.unwrap(), "Hello, World!");
        drop(stub);

        ns.shutdown().await;
        assert!(ns.is_empty());
        let err = ns.get(&ns.id_from_name("/greet")).err().unwrap();
        assert!(matches!(err, ObjectError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_idle_objects_are_evicted() {
        let ns = evicting_namespace();
        for i in 0..200 {
            let stub = ns.get(&ns.id_from_name(&format!("/p{i}"))).unwrap();
            stub.get_greeting(GreetingRequest::default()).await.unwrap();
        }
        assert_eq!(ns.len(), 200);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(ns.is_empty());

        // The next lookup starts over with a fresh actor
        let stub = ns.get(&ns.id_from_name("/p0")).unwrap();
        stub.get_greeting(GreetingRequest::default()).await.unwrap();
        assert_eq!(ns.len(), 1);
        assert_eq!(ns.list()[0].invocations, 1);
    }

    #[tokio::test]
    async fn test_busy_object_survives_idle_timeout() {
        let ns = ObjectNamespace::new(StorageLocation::Memory, 16, Some(Duration::from_millis(250)));
        let id = ns.id_from_name("/busy");
        ns.get(&id).unwrap();
        let created_at = ns.list()[0].created_at;
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            ns.with_object(&id, |stub| async move {
                stub.get_greeting(GreetingRequest::default()).await
            })
            .await
            .unwrap();
        }
        let objects = ns.list();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].created_at, created_at);
        assert_eq!(objects[0].invocations, 10);
    }

    #[tokio::test]
    async fn test_with_object_respawns_retired_actor() {
        let ns = evicting_namespace();
        let id = ns.id_from_name("/stale");
        let stale = ns.get(&id).unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(stale.is_closed());

        let greeting = ns
            .with_object(&id, |stub| async move { stub.say_hello().await })
            .await
            .unwrap();
        assert_eq!(greeting, "Hello, World!");
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn test_object_info_serializes_flat() {
        let info = ObjectInfo {
            id: ObjectId::from_name("/greet"),
            created_at: Local::now(),
            invocations: 3,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["name"], "/greet");
        assert_eq!(json["id"].as_str().unwrap().len(), 64);
        assert_eq!(json["invocations"], 3);
    }
}
