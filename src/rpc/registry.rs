//! Operation registry.
//!
//! # Responsibilities
//! - Hold the named domain operations supplied at startup
//! - Look up an operation by name for dispatch
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Operations are opaque callables: the gateway never inspects their
//!   parameter schemas or touches the external service they call
//! - Trait objects keep registration open to any handler shape; a closure
//!   adapter covers the common case

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Structured domain-failure description returned by an operation.
///
/// Forwarded to the client unmodified inside an error event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{kind}: {message}")]
pub struct OperationError {
    /// Machine-readable failure kind (e.g., "unknown_operation").
    pub kind: String,
    /// Human-readable detail.
    pub message: String,
}

impl OperationError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// A named domain operation: parameters in, payload or failure out.
pub trait Operation: Send + Sync {
    fn call(&self, parameters: Value) -> BoxFuture<'static, Result<Value, OperationError>>;
}

/// Adapter so plain async closures can be registered as operations.
struct FnOperation<F>(F);

impl<F, Fut> Operation for FnOperation<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<Value, OperationError>> + Send + 'static,
{
    fn call(&self, parameters: Value) -> BoxFuture<'static, Result<Value, OperationError>> {
        Box::pin((self.0)(parameters))
    }
}

/// Mapping from operation name to callable; read-only after startup.
#[derive(Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<dyn Operation>>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an operation under a name, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, operation: Arc<dyn Operation>) {
        self.operations.insert(name.into(), operation);
    }

    /// Register an async closure as an operation.
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        self.register(name, Arc::new(FnOperation(f)));
    }

    /// Look up an operation by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Operation>> {
        self.operations.get(name).cloned()
    }

    /// Registered operation names, for startup logging.
    pub fn names(&self) -> Vec<&str> {
        self.operations.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
