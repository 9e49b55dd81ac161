//! The helloworld CRUD function: routes API Gateway HTTP API requests to a
//! single DynamoDB table.

pub mod config;
pub mod context;
pub mod metrics;
pub mod performance;
pub mod response;
pub mod router;
pub mod storage;
pub mod telemetry;
