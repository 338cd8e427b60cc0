// Handler trait and adapters

use crate::router::error::{HandlerError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// An operation implementation
///
/// Receives params that already passed schema and security validation.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn run(&self, params: Map<String, Value>) -> Result<Value>;
}

/// Handler backed by a closure over the raw parameter map
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Map<String, Value>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn run(&self, params: Map<String, Value>) -> Result<Value> {
        (self.f)(params).await
    }
}

/// Handler that deserializes params into `P` before calling the closure
///
/// Validation has already enforced the schema, so a deserialization failure
/// here means schema and struct disagree.
pub struct TypedHandler<P, F> {
    f: F,
    _params: PhantomData<fn() -> P>,
}

impl<P, F> TypedHandler<P, F> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _params: PhantomData,
        }
    }
}

#[async_trait]
impl<P, F, Fut> Handler for TypedHandler<P, F>
where
    P: DeserializeOwned + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    async fn run(&self, params: Map<String, Value>) -> Result<Value> {
        let typed: P = serde_json::from_value(Value::Object(params))
            .map_err(|e| HandlerError::InvalidParameters(e.to_string()))?;
        (self.f)(typed).await
    }
}

/// Wrap a closure taking typed params as a shareable handler
pub fn typed<P, F, Fut>(f: F) -> Arc<dyn Handler>
where
    P: DeserializeOwned + Send + 'static,
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(TypedHandler::new(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Greeting {
        name: String,
        #[serde(default)]
        times: u32,
    }

    #[tokio::test]
    async fn test_typed_handler_receives_struct() {
        let handler = typed(|p: Greeting| async move {
            Ok(json!({ "greeting": format!("hello {}", p.name), "times": p.times }))
        });
        let params = json!({"name": "world"}).as_object().cloned().unwrap();
        let out = handler.run(params).await.unwrap();
        assert_eq!(out["greeting"], "hello world");
        assert_eq!(out["times"], 0);
    }

    #[tokio::test]
    async fn test_typed_handler_rejects_mismatch() {
        let handler = typed(|_: Greeting| async move { Ok(Value::Null) });
        let params = json!({"name": 3}).as_object().cloned().unwrap();
        let err = handler.run(params).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_fn_handler_passes_map() {
        let handler = FnHandler::new(|params: Map<String, Value>| async move {
            Ok(json!({ "keys": params.len() }))
        });
        let params = json!({"a": 1, "b": 2}).as_object().cloned().unwrap();
        assert_eq!(handler.run(params).await.unwrap()["keys"], 2);
    }
}
