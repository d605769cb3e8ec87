//! Live data layer for a document database emulator console.
//!
//! The console browses collections of an emulated document store. This crate
//! provides the store itself ([`store::DocumentStore`]), the live view state
//! a collection panel pulls from ([`sync::CollectionSync`]), and the request
//! log backing the console's request table ([`requests::RequestLog`]).
//! Rendering and routing live elsewhere; the navigation base path enters
//! only as an explicit parameter.

pub mod error;
pub mod model;
pub mod requests;
pub mod store;
pub mod sync;

pub use error::{ConsoleError, ConsoleErrorCode, ConsoleResult};
pub use model::{DocumentKey, ResourcePath};
pub use store::{
    CollectionReference, CollectionSnapshot, DocumentReference, DocumentSnapshot, DocumentStore,
    ListenerRegistration, SnapshotCallback,
};
pub use sync::{CollectionAction, CollectionSync, DocumentHandle, SnapshotSource, ViewState};
