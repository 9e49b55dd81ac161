use std::collections::HashMap;

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, from_items, to_item};

use super::{Outcome, Record, StorageError, StorageGateway};

const KEY_ATTRIBUTE: &str = "id";

type Item = HashMap<String, AttributeValue>;

/// DynamoDB-backed gateway. Records are keyed by the string attribute `id`.
#[derive(Debug, Clone)]
pub struct DynamoDbGateway {
    client: Client,
}

impl DynamoDbGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn put(&self, table: &str, record: Record) -> Result<Record, StorageError> {
        let item: Item = to_item(&record)?;
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|error| request_error("put_item", table, error))?;
        Ok(record)
    }

    async fn scan(&self, table: &str) -> Result<Vec<Record>, StorageError> {
        let mut records = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|error| request_error("scan", table, error))?;

            let page: Vec<Record> = from_items(output.items().to_vec())?;
            records.extend(page);

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(records)
    }

    async fn get(&self, table: &str, id: &str) -> Result<Option<Record>, StorageError> {
        let output = self
            .client
            .get_item()
            .table_name(table)
            .key(KEY_ATTRIBUTE, AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|error| request_error("get_item", table, error))?;

        match output.item() {
            Some(item) => Ok(Some(from_item(item.clone())?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, table: &str, id: &str) -> Result<(), StorageError> {
        self.client
            .delete_item()
            .table_name(table)
            .key(KEY_ATTRIBUTE, AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|error| request_error("delete_item", table, error))?;
        Ok(())
    }
}

impl StorageGateway for DynamoDbGateway {
    async fn create_or_update(&self, table: &str, record: Record) -> Outcome<Record> {
        Outcome::from_result(self.put(table, record).await)
    }

    async fn list_all(&self, table: &str) -> Outcome<Vec<Record>> {
        Outcome::from_result(self.scan(table).await)
    }

    async fn get_by_id(&self, table: &str, id: &str) -> Outcome<Record> {
        Outcome::from_lookup(self.get(table, id).await)
    }

    async fn delete_by_id(&self, table: &str, id: &str) -> Outcome<()> {
        Outcome::from_result(self.delete(table, id).await)
    }
}

fn request_error<E>(operation: &'static str, table: &str, error: E) -> StorageError
where
    E: std::error::Error + 'static,
{
    let message = DisplayErrorContext(error).to_string();
    tracing::error!(operation, table, error = %message, "dynamodb request failed");
    StorageError::Request(message)
}
