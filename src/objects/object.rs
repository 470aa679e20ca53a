//! Greeting object and its actor loop
//!
//! Every object is owned by exactly one task. Callers talk to it through an
//! [`ObjectStub`], which posts messages into the object's mailbox and waits
//! for the reply, so operations on one object never overlap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use super::error::{ObjectError, StorageError};
use super::id::ObjectId;
use super::storage::{SqlStorage, StorageLocation};
use crate::greeting::GreetingRequest;

const HELLO_QUERY: &str = "SELECT 'Hello, World!' as greeting";

/// Per-object state
pub struct GreetingObject {
    id: ObjectId,
    location: Arc<StorageLocation>,
    storage: Option<SqlStorage>,
}

impl GreetingObject {
    pub const fn new(id: ObjectId, location: Arc<StorageLocation>) -> Self {
        Self {
            id,
            location,
            storage: None,
        }
    }

    pub fn get_greeting(&self, request: &GreetingRequest) -> String {
        request.decide()
    }

    /// Static greeting read back from the object's store
    pub async fn say_hello(&mut self) -> Result<String, StorageError> {
        let storage = self.storage().await?;
        let row = storage.query_one(HELLO_QUERY).await?;
        SqlStorage::text_column(&row, "greeting")
    }

    /// The store is opened on first use and kept for the object's lifetime.
    async fn storage(&mut self) -> Result<&SqlStorage, StorageError> {
        let storage = match self.storage.take() {
            Some(storage) => storage,
            None => SqlStorage::open(&self.location, &self.id).await?,
        };
        Ok(&*self.storage.insert(storage))
    }

    async fn close(&mut self) {
        if let Some(storage) = self.storage.take() {
            storage.close().await;
        }
    }
}

pub(super) enum Envelope {
    GetGreeting {
        request: GreetingRequest,
        reply: oneshot::Sender<String>,
    },
    SayHello {
        reply: oneshot::Sender<Result<String, StorageError>>,
    },
}

/// Drain the mailbox one message at a time until every stub is dropped.
///
/// With an idle timeout the actor also stops after a quiet period: it calls
/// `retire` so no new stubs are handed out, closes its mailbox and still
/// answers whatever was queued before the close.
pub(super) async fn run<F>(
    mut object: GreetingObject,
    mut mailbox: mpsc::Receiver<Envelope>,
    invocations: Arc<AtomicU64>,
    idle_timeout: Option<Duration>,
    retire: F,
) where
    F: FnOnce(),
{
    let mut retire = Some(retire);
    loop {
        let next = match idle_timeout.filter(|_| retire.is_some()) {
            Some(idle) => match tokio::time::timeout(idle, mailbox.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    if let Some(retire) = retire.take() {
                        retire();
                    }
                    mailbox.close();
                    continue;
                }
            },
            None => mailbox.recv().await,
        };
        let Some(envelope) = next else { break };

        invocations.fetch_add(1, Ordering::Relaxed);
        // A dropped reply receiver means the caller went away; nothing to do.
        match envelope {
            Envelope::GetGreeting { request, reply } => {
                let _ = reply.send(object.get_greeting(&request));
            }
            Envelope::SayHello { reply } => {
                let _ = reply.send(object.say_hello().await);
            }
        }
    }
    object.close().await;
}

/// Handle to a single object
#[derive(Clone)]
pub struct ObjectStub {
    id: ObjectId,
    mailbox: mpsc::Sender<Envelope>,
}

impl ObjectStub {
    pub(super) const fn new(id: ObjectId, mailbox: mpsc::Sender<Envelope>) -> Self {
        Self { id, mailbox }
    }

    pub const fn id(&self) -> &ObjectId {
        &self.id
    }

    pub(super) fn is_closed(&self) -> bool {
        self.mailbox.is_closed()
    }

    pub async fn get_greeting(&self, request: GreetingRequest) -> Result<String, ObjectError> {
        let (reply, response) = oneshot::channel();
        self.post(Envelope::GetGreeting { request, reply }).await?;
        response.await.map_err(|_| self.unavailable())
    }

    pub async fn say_hello(&self) -> Result<String, ObjectError> {
        let (reply, response) = oneshot::channel();
        self.post(Envelope::SayHello { reply }).await?;
        let greeting = response.await.map_err(|_| self.unavailable())??;
        Ok(greeting)
    }

    async fn post(&self, envelope: Envelope) -> Result<(), ObjectError> {
        self.mailbox
            .send(envelope)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> ObjectError {
        ObjectError::Unavailable {
            id: self.id.clone(),
        }
    }
}
