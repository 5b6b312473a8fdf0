//! # Generic Actor Server
//!
//! `ResourceActor` owns the store for one entity type and processes requests strictly one at
//! a time. Sequential processing is what makes every mutation of a given entity linearizable:
//! two clients racing on the same cart are simply served in arrival order.

use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::ResourceRequest;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The generic actor that manages a collection of entities.
///
/// # Usage Pattern
///
/// 1. **Create**: `ResourceActor::new()` returns the actor (server) and a client.
/// 2. **Wire**: pass dependencies into `actor.run(context)`.
/// 3. **Run**: spawn the run loop in a background task.
///
/// # Implementation Details
///
/// * `store` maps ids to entities; `next_id` generates ids.
/// * `index` maps each live secondary key to the id holding it.
/// * **Create** builds the entity, claims its key, runs `on_create` and claims again (the hook
///   may change the key). A taken key fails with [`FrameworkError::Conflict`] and nothing is
///   stored.
/// * **Update** / **Action** clone the entity into a draft, run the hook on the draft, claim
///   the draft's key and only then replace the stored entity.
/// * **Find** resolves a key through the index.
/// * **Delete** runs `on_delete`, then drops the entity and its key.
pub struct ResourceActor<T: ActorEntity> {
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    index: HashMap<T::Key, T::Id>,
    next_id: u32,
}

impl<T: ActorEntity> ResourceActor<T> {
    /// Creates a new `ResourceActor` and its associated `ResourceClient`.
    ///
    /// `buffer_size` is the capacity of the request channel; when it is full, client calls
    /// wait for space.
    pub fn new(buffer_size: usize) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
            index: HashMap::new(),
            next_id: 1,
        };
        let client = ResourceClient::new(sender);
        (actor, client)
    }

    /// Fails if `candidate`'s key is held by an entity other than `id`.
    fn claim_key(&self, id: &T::Id, candidate: &T) -> Result<(), FrameworkError> {
        match candidate.key() {
            Some(key) => match self.index.get(&key) {
                Some(holder) if holder != id => Err(FrameworkError::Conflict(format!("{key:?}"))),
                _ => Ok(()),
            },
            None => Ok(()),
        }
    }

    fn commit(&mut self, id: T::Id, item: T) {
        if let Some(previous) = self.store.get(&id).and_then(T::key) {
            if self.index.get(&previous) == Some(&id) {
                self.index.remove(&previous);
            }
        }
        if let Some(key) = item.key() {
            self.index.insert(key, id.clone());
        }
        self.store.insert(id, item);
    }

    fn evict(&mut self, id: &T::Id) {
        if let Some(item) = self.store.remove(id) {
            if let Some(key) = item.key() {
                self.index.remove(&key);
            }
        }
    }

    /// Runs the actor's event loop, processing messages until the channel closes.
    ///
    /// The `context` argument is handed to every entity hook.
    pub async fn run(mut self, context: T::Context) {
        // Extract just the type name (e.g., "Cart" instead of "checkout_engine::model::cart::Cart")
        let entity_type = std::any::type_name::<T>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        info!(entity_type, "Actor started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create { params, respond_to } => {
                    debug!(entity_type, ?params, "Create");
                    let id = T::Id::from(self.next_id);
                    self.next_id += 1;

                    let mut item = match T::from_create_params(id.clone(), params) {
                        Ok(item) => item,
                        Err(e) => {
                            warn!(entity_type, error = %e, "Create failed");
                            let _ = respond_to.send(Err(FrameworkError::EntityError(Box::new(e))));
                            continue;
                        }
                    };
                    // Checked before the hook so a duplicate never triggers its side effects.
                    if let Err(e) = self.claim_key(&id, &item) {
                        warn!(entity_type, %id, error = %e, "Create rejected");
                        let _ = respond_to.send(Err(e));
                        continue;
                    }
                    if let Err(e) = item.on_create(&context).await {
                        warn!(entity_type, error = %e, "on_create failed");
                        let _ = respond_to.send(Err(FrameworkError::EntityError(Box::new(e))));
                        continue;
                    }
                    if let Err(e) = self.claim_key(&id, &item) {
                        warn!(entity_type, %id, error = %e, "Create rejected");
                        let _ = respond_to.send(Err(e));
                        continue;
                    }
                    self.commit(id.clone(), item);
                    info!(entity_type, %id, size = self.store.len(), "Created");
                    let _ = respond_to.send(Ok(id));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let item = self.store.get(&id).cloned();
                    let found = item.is_some();
                    debug!(entity_type, %id, found, "Get");
                    let _ = respond_to.send(Ok(item));
                }
                ResourceRequest::Find { key, respond_to } => {
                    let item = self
                        .index
                        .get(&key)
                        .and_then(|id| self.store.get(id))
                        .cloned();
                    debug!(entity_type, ?key, found = item.is_some(), "Find");
                    let _ = respond_to.send(Ok(item));
                }
                ResourceRequest::Update {
                    id,
                    update,
                    respond_to,
                } => {
                    debug!(entity_type, %id, ?update, "Update");
                    let Some(mut draft) = self.store.get(&id).cloned() else {
                        warn!(entity_type, %id, "Not found");
                        let _ = respond_to.send(Err(FrameworkError::NotFound(id.to_string())));
                        continue;
                    };
                    if let Err(e) = draft.on_update(update, &context).await {
                        warn!(entity_type, %id, error = %e, "Update failed");
                        let _ = respond_to.send(Err(FrameworkError::EntityError(Box::new(e))));
                        continue;
                    }
                    if let Err(e) = self.claim_key(&id, &draft) {
                        warn!(entity_type, %id, error = %e, "Update rejected");
                        let _ = respond_to.send(Err(e));
                        continue;
                    }
                    self.commit(id.clone(), draft.clone());
                    info!(entity_type, %id, "Updated");
                    let _ = respond_to.send(Ok(draft));
                }
                ResourceRequest::Delete { id, respond_to } => {
                    debug!(entity_type, %id, "Delete");
                    if let Some(item) = self.store.get(&id) {
                        if let Err(e) = item.on_delete(&context).await {
                            warn!(entity_type, %id, error = %e, "on_delete failed");
                            let _ = respond_to.send(Err(FrameworkError::EntityError(Box::new(e))));
                            continue;
                        }
                        self.evict(&id);
                        info!(entity_type, %id, size = self.store.len(), "Deleted");
                        let _ = respond_to.send(Ok(()));
                    } else {
                        warn!(entity_type, %id, "Not found");
                        let _ = respond_to.send(Err(FrameworkError::NotFound(id.to_string())));
                    }
                }
                ResourceRequest::Action {
                    id,
                    action,
                    respond_to,
                } => {
                    debug!(entity_type, %id, ?action, "Action");
                    let Some(mut draft) = self.store.get(&id).cloned() else {
                        warn!(entity_type, %id, "Not found");
                        let _ = respond_to.send(Err(FrameworkError::NotFound(id.to_string())));
                        continue;
                    };
                    let result = match draft.handle_action(action, &context).await {
                        Ok(value) => self.claim_key(&id, &draft).map(|()| {
                            self.commit(id.clone(), draft);
                            value
                        }),
                        Err(e) => Err(FrameworkError::EntityError(Box::new(e))),
                    };
                    match &result {
                        Ok(_) => info!(entity_type, %id, "Action ok"),
                        Err(e) => warn!(entity_type, %id, error = %e, "Action failed"),
                    }
                    let _ = respond_to.send(result);
                }
            }
        }

        info!(entity_type, size = self.store.len(), "Shutdown");
    }
}
