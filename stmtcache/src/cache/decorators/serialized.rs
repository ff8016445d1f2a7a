use crate::cache::{Cache, CacheKey, SharedCache};
use crate::core::{CacheError, Result, Value};

/// Stores values as bincode bytes so every reader gets its own copy
pub struct SerializedCache {
    delegate: SharedCache,
}

impl SerializedCache {
    pub fn new(delegate: SharedCache) -> Self {
        Self { delegate }
    }

    fn serialize(value: &Value) -> Result<Vec<u8>> {
        bincode::serde::encode_to_vec(value, bincode::config::standard())
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    fn deserialize(bytes: &[u8]) -> Result<Value> {
        let (value, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;
        Ok(value)
    }
}

impl Cache for SerializedCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: Value) -> Result<()> {
        if value.is_null() {
            return self.delegate.put(key, value);
        }
        let bytes = Self::serialize(&value)?;
        self.delegate.put(key, Value::Bytes(bytes))
    }

    fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        match self.delegate.get(key)? {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(Value::Null)),
            Some(Value::Bytes(bytes)) => Self::deserialize(&bytes).map(Some),
            Some(other) => Err(CacheError::Deserialization(format!(
                "expected serialized bytes in cache {}, found {}",
                self.id(),
                other
            ))),
        }
    }

    fn remove(&self, key: &CacheKey) -> Option<Value> {
        match self.delegate.remove(key)? {
            Value::Bytes(bytes) => Self::deserialize(&bytes).ok(),
            other => Some(other),
        }
    }

    fn clear(&self) {
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn hit_ratio(&self) -> Option<f64> {
        self.delegate.hit_ratio()
    }
}
