//! # Generic Client
//!
//! The cloneable, type-safe handle used to talk to a `ResourceActor`.

use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::{ResourceRequest, Response};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// A type-safe client for interacting with a `ResourceActor`.
///
/// Cloning only clones the channel sender. With [`ResourceClient::with_timeout`] every request
/// gives up after the given duration and reports [`FrameworkError::Timeout`]; a request that
/// already reached the actor may still be applied, so callers must not assume it was not.
#[derive(Clone)]
pub struct ResourceClient<T: ActorEntity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
    timeout: Option<Duration>,
}

impl<T: ActorEntity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self {
            sender,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn request<R, F>(&self, build: F) -> Result<R, FrameworkError>
    where
        R: Send,
        F: FnOnce(Response<R>) -> ResourceRequest<T> + Send,
    {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| FrameworkError::ActorClosed)?;
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, response)
                .await
                .map_err(|_| FrameworkError::Timeout(limit))?
                .map_err(|_| FrameworkError::ActorDropped)?,
            None => response.await.map_err(|_| FrameworkError::ActorDropped)?,
        }
    }

    pub async fn create(&self, params: T::Create) -> Result<T::Id, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Create { params, respond_to })
            .await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Get { id, respond_to })
            .await
    }

    pub async fn find(&self, key: T::Key) -> Result<Option<T>, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Find { key, respond_to })
            .await
    }

    pub async fn update(&self, id: T::Id, update: T::Update) -> Result<T, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Update {
            id,
            update,
            respond_to,
        })
        .await
    }

    pub async fn delete(&self, id: T::Id) -> Result<(), FrameworkError> {
        self.request(|respond_to| ResourceRequest::Delete { id, respond_to })
            .await
    }

    pub async fn perform_action(
        &self,
        id: T::Id,
        action: T::Action,
    ) -> Result<T::ActionResult, FrameworkError> {
        self.request(|respond_to| ResourceRequest::Action {
            id,
            action,
            respond_to,
        })
        .await
    }
}
