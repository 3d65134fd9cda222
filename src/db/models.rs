use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::store::Document;
use crate::error::StoreError;

pub const USERS: &str = "users";
pub const CONTACT: &str = "contact";
pub const PLOTS: &str = "plots";

/// A registered account, keyed by email.
///
/// Attributes are stored with whatever JSON type the client sent. The
/// password is kept exactly as submitted; login compares it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: Value,
    pub phone: Value,
    pub email: String,
    pub password: Value,
    pub address: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub first_name: Value,
    pub last_name: Value,
    pub email: Value,
    pub phone: Value,
    pub message: Value,
}

/// Plots are populated outside this service, so they stay schemaless.
pub type Plot = Document;

pub(crate) fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Decode(format!("expected an object, got {}", other))),
    }
}

pub(crate) fn from_document<T: for<'de> Deserialize<'de>>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}
