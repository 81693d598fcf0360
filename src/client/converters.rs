//! Registry of JSON converters for a method's parameters and return value,
//! keyed by method name and slot. Actors decode their own `args_blob`
//! directly, but clients and diagnostic tooling that don't share the
//! actor's concrete types need a way to inspect envelope payloads generically
//! — this registry is that seam.

use std::marker::PhantomData;
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{QuarkError, Result};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    Param(usize),
    Return,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConverterKey {
    pub method: String,
    pub slot: Slot,
}

impl ConverterKey {
    pub fn param(method: impl Into<String>, index: usize) -> Self {
        ConverterKey {
            method: method.into(),
            slot: Slot::Param(index),
        }
    }

    pub fn returning(method: impl Into<String>) -> Self {
        ConverterKey {
            method: method.into(),
            slot: Slot::Return,
        }
    }
}

/// Converts one method slot's wire bytes to and from a `serde_json::Value`
/// for generic inspection, without either side needing the concrete Rust type.
pub trait MessageConverter: Send + Sync {
    fn to_json(&self, blob: &[u8]) -> Result<serde_json::Value>;
    fn from_json(&self, value: serde_json::Value) -> Result<Vec<u8>>;
}

pub struct JsonConverter<T>(PhantomData<fn() -> T>);

impl<T> JsonConverter<T> {
    pub fn new() -> Self {
        JsonConverter(PhantomData)
    }
}

impl<T> Default for JsonConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MessageConverter for JsonConverter<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn to_json(&self, blob: &[u8]) -> Result<serde_json::Value> {
        let value: T = serde_json::from_slice(blob).map_err(|e| QuarkError::TransportFailed { reason: e.to_string() })?;
        serde_json::to_value(value).map_err(|e| QuarkError::TransportFailed { reason: e.to_string() })
    }

    fn from_json(&self, value: serde_json::Value) -> Result<Vec<u8>> {
        let typed: T = serde_json::from_value(value).map_err(|e| QuarkError::TransportFailed { reason: e.to_string() })?;
        serde_json::to_vec(&typed).map_err(|e| QuarkError::TransportFailed { reason: e.to_string() })
    }
}

#[derive(Default, Clone)]
pub struct ConverterRegistry {
    converters: Arc<DashMap<ConverterKey, Arc<dyn MessageConverter>>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, key: ConverterKey, converter: Arc<dyn MessageConverter>) {
        self.converters.insert(key, converter);
    }

    pub fn get(&self, key: &ConverterKey) -> Option<Arc<dyn MessageConverter>> {
        self.converters.get(key).map(|c| c.clone())
    }
}
