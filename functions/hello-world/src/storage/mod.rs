//! Storage gateway: the CRUD contract the router depends on.

use std::future::Future;

use serde_json::{Map, Value};
use thiserror::Error;

pub mod dynamodb;

pub use dynamodb::DynamoDbGateway;

/// A stored record. Opaque to the router apart from its `id` field.
pub type Record = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage request failed: {0}")]
    Request(String),
    #[error("record could not be converted: {0}")]
    Serialization(#[from] serde_dynamo::Error),
}

/// Classified result of a storage call.
#[derive(Debug)]
pub enum Outcome<T> {
    Success(T),
    NotFound,
    Failure(StorageError),
}

impl<T> Outcome<T> {
    pub fn from_result(result: Result<T, StorageError>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(error) => Outcome::Failure(error),
        }
    }

    /// Like [`Outcome::from_result`], with `None` classified as [`Outcome::NotFound`].
    pub fn from_lookup(result: Result<Option<T>, StorageError>) -> Self {
        match result {
            Ok(Some(value)) => Outcome::Success(value),
            Ok(None) => Outcome::NotFound,
            Err(error) => Outcome::Failure(error),
        }
    }
}

pub trait StorageGateway {
    /// Writes `record`, replacing any record with the same `id`.
    fn create_or_update(&self, table: &str, record: Record) -> impl Future<Output = Outcome<Record>> + Send;

    fn list_all(&self, table: &str) -> impl Future<Output = Outcome<Vec<Record>>> + Send;

    fn get_by_id(&self, table: &str, id: &str) -> impl Future<Output = Outcome<Record>> + Send;

    fn delete_by_id(&self, table: &str, id: &str) -> impl Future<Output = Outcome<()>> + Send;
}
