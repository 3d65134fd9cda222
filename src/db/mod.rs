//! Document store access.
//!
//! `DocumentStore` is the backend seam (Firestore or in-memory);
//! `DbOperations` maps it onto the users, contact and plots collections.

pub mod credentials;
pub mod firestore;
pub mod models;
pub mod operations;
pub mod store;

pub use credentials::{ServiceAccountKey, TokenProvider};
pub use firestore::FirestoreStore;
pub use models::{ContactSubmission, Plot, User};
pub use operations::DbOperations;
pub use store::{Document, DocumentStore, FieldFilter, MemoryStore};
