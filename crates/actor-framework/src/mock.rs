//! # Mock Framework & Testing Guide
//!
//! `MockClient<T>` hands out a real `ResourceClient<T>` whose requests are answered from a
//! queue of scripted expectations instead of a running actor. Use it to test the logic that
//! lives *around* a client (error mapping, result unpacking, retries) without spawning actors.
//!
//! | Feature | MockClient | Real Actor |
//! |---------|------------|------------|
//! | **Speed** | Instant (in-memory) | Fast (but involves tokio spawn) |
//! | **State** | No real state (expectations) | Real state management |
//! | **Error Injection** | Easy (`return_err`) | Hard (requires specific state) |
//!
//! Expectations are consumed in order. A request that does not match the next expectation
//! (wrong operation, id or key) panics the mock task, which the caller observes as
//! [`FrameworkError::ActorDropped`].
//!
//! ```rust
//! use actor_framework::mock::MockClient;
//! use actor_framework::{ActorEntity, FrameworkError};
//! use async_trait::async_trait;
//!
//! #[derive(Clone, Debug)] struct Shelf { id: u32, label: String }
//! #[derive(Debug, thiserror::Error)] #[error("shelf error")] struct ShelfError;
//!
//! #[async_trait]
//! impl ActorEntity for Shelf {
//!     type Id = u32; type Key = String; type Create = String; type Update = ();
//!     type Action = (); type ActionResult = (); type Context = (); type Error = ShelfError;
//!     fn from_create_params(id: u32, label: String) -> Result<Self, Self::Error> {
//!         Ok(Self { id, label })
//!     }
//!     fn key(&self) -> Option<String> { Some(self.label.clone()) }
//!     async fn on_update(&mut self, _: (), _: &()) -> Result<(), Self::Error> { Ok(()) }
//!     async fn handle_action(&mut self, _: (), _: &()) -> Result<(), Self::Error> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockClient::<Shelf>::new();
//!     mock.expect_find("a1".to_string())
//!         .return_ok(Some(Shelf { id: 7, label: "a1".into() }));
//!     mock.expect_get(8).return_err(FrameworkError::ActorClosed);
//!
//!     let client = mock.client();
//!     let found = client.find("a1".to_string()).await.unwrap();
//!     assert_eq!(found.map(|shelf| shelf.id), Some(7));
//!     assert!(matches!(client.get(8).await, Err(FrameworkError::ActorClosed)));
//!     mock.verify();
//! }
//! ```
//!
//! For request inspection (asserting on the exact payload a wrapper sends) use
//! [`create_mock_client`] with the `expect_*` helpers at the bottom of this module.

use crate::client::ResourceClient;
use crate::entity::ActorEntity;
use crate::error::FrameworkError;
use crate::message::ResourceRequest;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// A scripted response, matched against the next incoming request.
enum Expectation<T: ActorEntity> {
    Get {
        id: T::Id,
        response: Result<Option<T>, FrameworkError>,
    },
    Find {
        key: T::Key,
        response: Result<Option<T>, FrameworkError>,
    },
    Create {
        response: Result<T::Id, FrameworkError>,
    },
    Update {
        id: T::Id,
        response: Result<T, FrameworkError>,
    },
    Delete {
        id: T::Id,
        response: Result<(), FrameworkError>,
    },
    Action {
        id: T::Id,
        response: Result<T::ActionResult, FrameworkError>,
    },
}

type Expectations<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

fn lock<T: ActorEntity>(expectations: &Expectations<T>) -> MutexGuard<'_, VecDeque<Expectation<T>>> {
    expectations.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A mock client with expectation tracking for fluent testing.
pub struct MockClient<T: ActorEntity> {
    client: ResourceClient<T>,
    expectations: Expectations<T>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: ActorEntity> Default for MockClient<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ActorEntity> MockClient<T> {
    /// Creates a new mock client with no expectations.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ResourceRequest<T>>(100);
        let expectations: Expectations<T> = Arc::new(Mutex::new(VecDeque::new()));
        let queue = expectations.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = lock(&queue).pop_front();

                match (request, expectation) {
                    (
                        ResourceRequest::Get { id, respond_to },
                        Some(Expectation::Get {
                            id: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(id, expected, "get called with unexpected id");
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Find { key, respond_to },
                        Some(Expectation::Find {
                            key: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(key, expected, "find called with unexpected key");
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Create { respond_to, .. },
                        Some(Expectation::Create { response }),
                    ) => {
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Update { id, respond_to, .. },
                        Some(Expectation::Update {
                            id: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(id, expected, "update called with unexpected id");
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Delete { id, respond_to },
                        Some(Expectation::Delete {
                            id: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(id, expected, "delete called with unexpected id");
                        let _ = respond_to.send(response);
                    }
                    (
                        ResourceRequest::Action { id, respond_to, .. },
                        Some(Expectation::Action {
                            id: expected,
                            response,
                        }),
                    ) => {
                        assert_eq!(id, expected, "action called with unexpected id");
                        let _ = respond_to.send(response);
                    }
                    _ => {
                        panic!("Unexpected request or expectation mismatch");
                    }
                }
            }
        });

        Self {
            client: ResourceClient::new(sender),
            expectations,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ResourceClient<T> {
        self.client.clone()
    }

    pub fn expect_get(&mut self, id: T::Id) -> GetExpectationBuilder<T> {
        GetExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_find(&mut self, key: T::Key) -> FindExpectationBuilder<T> {
        FindExpectationBuilder {
            key,
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_create(&mut self) -> CreateExpectationBuilder<T> {
        CreateExpectationBuilder {
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_update(&mut self, id: T::Id) -> UpdateExpectationBuilder<T> {
        UpdateExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_delete(&mut self, id: T::Id) -> DeleteExpectationBuilder<T> {
        DeleteExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_action(&mut self, id: T::Id) -> ActionExpectationBuilder<T> {
        ActionExpectationBuilder {
            id,
            expectations: self.expectations.clone(),
        }
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let remaining = lock(&self.expectations).len();
        if remaining > 0 {
            panic!("Not all expectations were met. {remaining} remaining");
        }
    }
}

macro_rules! expectation_builder {
    ($variant:ident, $ok:ty $(, $field:ident : $field_ty:ty)?) => {
        paste::paste! {
            #[doc = "Builder for `" $variant "` expectations."]
            pub struct [<$variant ExpectationBuilder>]<T: ActorEntity> {
                $($field: $field_ty,)?
                expectations: Expectations<T>,
            }

            impl<T: ActorEntity> [<$variant ExpectationBuilder>]<T> {
                /// Queues a successful response.
                pub fn return_ok(self, value: $ok) {
                    self.push(Ok(value));
                }

                /// Queues an error response.
                pub fn return_err(self, error: FrameworkError) {
                    self.push(Err(error));
                }

                fn push(self, response: Result<$ok, FrameworkError>) {
                    lock(&self.expectations).push_back(Expectation::$variant {
                        $($field: self.$field,)?
                        response,
                    });
                }
            }
        }
    };
}

expectation_builder!(Get, Option<T>, id: T::Id);
expectation_builder!(Find, Option<T>, key: T::Key);
expectation_builder!(Create, T::Id);
expectation_builder!(Update, T, id: T::Id);
expectation_builder!(Delete, (), id: T::Id);
expectation_builder!(Action, T::ActionResult, id: T::Id);

// =============================================================================
// REQUEST INSPECTION HELPERS
// =============================================================================

/// Creates a client and the receiver its requests land on.
///
/// Tests drive the receiver by hand: pull the next request with one of the `expect_*`
/// helpers, assert on its payload and answer through the returned responder.
pub fn create_mock_client<T: ActorEntity>(
    buffer_size: usize,
) -> (ResourceClient<T>, mpsc::Receiver<ResourceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ResourceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Create request
pub async fn expect_create<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Create, oneshot::Sender<Result<T::Id, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Create { params, respond_to }) => Some((params, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Get request
pub async fn expect_get<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, oneshot::Sender<Result<Option<T>, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Get { id, respond_to }) => Some((id, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Find request
pub async fn expect_find<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Key, oneshot::Sender<Result<Option<T>, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Find { key, respond_to }) => Some((key, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Update request
pub async fn expect_update<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(T::Id, T::Update, oneshot::Sender<Result<T, FrameworkError>>)> {
    match receiver.recv().await {
        Some(ResourceRequest::Update {
            id,
            update,
            respond_to,
        }) => Some((id, update, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request
pub async fn expect_action<T: ActorEntity>(
    receiver: &mut mpsc::Receiver<ResourceRequest<T>>,
) -> Option<(
    T::Id,
    T::Action,
    oneshot::Sender<Result<T::ActionResult, FrameworkError>>,
)> {
    match receiver.recv().await {
        Some(ResourceRequest::Action {
            id,
            action,
            respond_to,
        }) => Some((id, action, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Clone, Debug, PartialEq)]
    struct Locker {
        id: u32,
        tag: String,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("Locker error")]
    struct LockerError;

    #[async_trait]
    impl ActorEntity for Locker {
        type Id = u32;
        type Key = String;
        type Create = String;
        type Update = String;
        type Action = ();
        type ActionResult = bool;
        type Context = ();
        type Error = LockerError;

        fn from_create_params(id: u32, tag: String) -> Result<Self, Self::Error> {
            Ok(Self { id, tag })
        }

        fn key(&self) -> Option<String> {
            Some(self.tag.clone())
        }

        async fn on_update(&mut self, tag: String, _ctx: &()) -> Result<(), Self::Error> {
            self.tag = tag;
            Ok(())
        }

        async fn handle_action(&mut self, _action: (), _ctx: &()) -> Result<bool, Self::Error> {
            Ok(true)
        }
    }

    #[tokio::test]
    async fn test_mock_client() {
        let (client, mut receiver) = create_mock_client::<Locker>(10);

        let create_task = tokio::spawn(async move { client.create("b7".to_string()).await });

        let (payload, responder) = expect_create(&mut receiver)
            .await
            .expect("Expected Create request");
        assert_eq!(payload, "b7");
        responder.send(Ok(1)).unwrap();

        let result = create_task.await.unwrap();
        assert!(matches!(result, Ok(1)));
    }

    #[tokio::test]
    async fn test_mock_client_with_expectations() {
        let mut mock = MockClient::<Locker>::new();

        mock.expect_create().return_ok(1);
        mock.expect_find("b7".to_string()).return_ok(Some(Locker {
            id: 1,
            tag: "b7".to_string(),
        }));
        mock.expect_update(1).return_ok(Locker {
            id: 1,
            tag: "c2".to_string(),
        });
        mock.expect_action(1)
            .return_err(FrameworkError::NotFound("1".to_string()));

        let client = mock.client();

        assert_eq!(client.create("b7".to_string()).await.unwrap(), 1);
        let found = client.find("b7".to_string()).await.unwrap();
        assert_eq!(found.map(|locker| locker.id), Some(1));
        let updated = client.update(1, "c2".to_string()).await.unwrap();
        assert_eq!(updated.tag, "c2");
        let action = client.perform_action(1, ()).await;
        assert!(matches!(action, Err(FrameworkError::NotFound(_))));

        mock.verify();
    }

    #[tokio::test]
    async fn test_mismatched_request_drops_responder() {
        let mut mock = MockClient::<Locker>::new();
        mock.expect_get(1).return_ok(None);

        let result = mock.client().delete(1).await;
        assert!(matches!(result, Err(FrameworkError::ActorDropped)));
    }
}
