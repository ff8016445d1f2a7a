//! Cache Key
//!
//! Order-sensitive fingerprint of a query: statement id, row bounds, SQL
//! text, bound parameter values and environment id folded one at a time.

use crate::core::{RowBounds, Value};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::warn;

const DEFAULT_MULTIPLIER: i32 = 37;
const DEFAULT_HASHCODE: i32 = 17;

/// Rolling fingerprint plus the ordered list of every folded element
#[derive(Debug, Clone)]
pub struct CacheKey {
    multiplier: i32,
    hashcode: i32,
    checksum: i64,
    count: i32,
    update_list: Vec<Value>,
    /// Set only on the null key, which must never be extended
    sealed: bool,
}

impl CacheKey {
    pub fn new() -> Self {
        Self {
            multiplier: DEFAULT_MULTIPLIER,
            hashcode: DEFAULT_HASHCODE,
            checksum: 0,
            count: 0,
            update_list: Vec::new(),
            sealed: false,
        }
    }

    /// The zero-length key meaning "no identity". Updates on it are ignored.
    pub fn null_key() -> Self {
        Self {
            sealed: true,
            ..Self::new()
        }
    }

    /// Build a key by folding every value in order
    pub fn from_parts<I, V>(parts: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut key = Self::new();
        key.update_all(parts);
        key
    }

    /// Fold one value into the key. Lists are decomposed element by element.
    ///
    /// Flattening drops list boundaries, so adjacent list values such as
    /// `[[1, 2], [3]]` and `[[1], [2, 3]]` fold to equal keys.
    pub fn update(&mut self, value: impl Into<Value>) -> &mut Self {
        if self.sealed {
            warn!("Ignoring update on the null cache key");
            return self;
        }

        match value.into() {
            Value::List(items) => {
                for item in items {
                    self.update(item);
                }
            }
            other => self.fold(other),
        }
        self
    }

    pub fn update_all<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        for value in values {
            self.update(value);
        }
        self
    }

    fn fold(&mut self, value: Value) {
        self.count = self.count.wrapping_add(1);

        let base = element_hash(&value);
        self.checksum = self.checksum.wrapping_add(i64::from(base));

        let weighted = base.wrapping_mul(self.count);
        self.hashcode = self
            .multiplier
            .wrapping_mul(self.hashcode)
            .wrapping_add(weighted);

        self.update_list.push(value);
    }

    pub fn hashcode(&self) -> i32 {
        self.hashcode
    }

    pub fn checksum(&self) -> i64 {
        self.checksum
    }

    pub fn count(&self) -> usize {
        self.update_list.len()
    }

    /// Elements in the order they were folded
    pub fn update_list(&self) -> &[Value] {
        &self.update_list
    }

    pub fn is_null_key(&self) -> bool {
        self.sealed
    }
}

impl Default for CacheKey {
    fn default() -> Self {
        Self::new()
    }
}

/// Null contributes 1 so that it still shifts the rolling hash.
fn element_hash(value: &Value) -> i32 {
    if value.is_null() {
        return 1;
    }
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    let h = hasher.finish();
    (h ^ (h >> 32)) as i32
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        if self.hashcode != other.hashcode
            || self.checksum != other.checksum
            || self.count != other.count
        {
            return false;
        }
        // Rolling hashes can collide; the element list is the final word.
        self.update_list == other.update_list
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i32(self.hashcode);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hashcode, self.checksum)?;
        for value in &self.update_list {
            write!(f, ":{}", value)?;
        }
        Ok(())
    }
}

/// Fingerprint a query the way the executor does
pub fn compute_cache_key(
    statement_id: &str,
    bounds: RowBounds,
    sql: &str,
    bound_values: &[Value],
    environment_id: Option<&str>,
) -> CacheKey {
    let mut key = CacheKey::new();
    key.update(statement_id)
        .update(bound_as_value(bounds.offset))
        .update(bound_as_value(bounds.limit))
        .update(sql);
    for value in bound_values {
        key.update(value.clone());
    }
    if let Some(env) = environment_id {
        key.update(env);
    }
    key
}

fn bound_as_value(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_sequence_same_key() {
        let a = CacheKey::from_parts(["select", "x"]);
        let b = CacheKey::from_parts(["select", "x"]);

        assert_eq!(a, b);
        assert_eq!(a.hashcode(), b.hashcode());
        assert_eq!(a.checksum(), b.checksum());
        assert_eq!(a.count(), 2);
        assert_eq!(a.update_list(), b.update_list());
    }

    #[test]
    fn test_order_matters() {
        let a = CacheKey::from_parts([Value::Int(1), Value::Int(2)]);
        let b = CacheKey::from_parts([Value::Int(2), Value::Int(1)]);

        // Same elements, same checksum, different position weighting
        assert_eq!(a.checksum(), b.checksum());
        assert_ne!(a, b);
    }

    #[test]
    fn test_null_is_folded_and_positional() {
        let mut a = CacheKey::new();
        a.update(Value::Null).update("x");
        let mut b = CacheKey::new();
        b.update("x").update(Value::Null);

        assert_eq!(a.count(), 2);
        assert_eq!(a.update_list()[0], Value::Null);
        assert_ne!(a, b);

        let mut single = CacheKey::new();
        single.update(Value::Null);
        assert_eq!(single.checksum(), 1);
        assert_eq!(single.hashcode(), 37 * 17 + 1);
    }

    #[test]
    fn test_lists_are_decomposed() {
        let mut from_list = CacheKey::new();
        from_list.update(Value::List(vec![Value::Int(1), Value::Int(2)]));
        let from_parts = CacheKey::from_parts([Value::Int(1), Value::Int(2)]);

        assert_eq!(from_list, from_parts);
        assert_eq!(from_list.count(), 2);
    }

    #[test]
    fn test_adjacent_lists_lose_boundaries() {
        let list = |items: &[i64]| Value::List(items.iter().copied().map(Value::Int).collect());
        let a = CacheKey::from_parts([list(&[1, 2]), list(&[3])]);
        let b = CacheKey::from_parts([list(&[1]), list(&[2, 3])]);

        assert_eq!(a, b);
    }

    #[test]
    fn test_colliding_hash_still_compares_elements() {
        let a = CacheKey::from_parts(["left"]);
        let mut b = CacheKey::from_parts(["right"]);
        b.hashcode = a.hashcode;
        b.checksum = a.checksum;

        assert_ne!(a, b);
    }

    #[test]
    fn test_null_key_is_sealed() {
        let mut key = CacheKey::null_key();
        key.update("ignored");

        assert!(key.is_null_key());
        assert_eq!(key.count(), 0);
        assert_eq!(key, CacheKey::new());
    }

    #[test]
    fn test_clone_copies_elements() {
        let original = CacheKey::from_parts(["a", "b"]);
        let mut copy = original.clone();
        copy.update("c");

        assert_eq!(original.count(), 2);
        assert_eq!(copy.count(), 3);
        assert_ne!(original, copy);
    }

    #[test]
    fn test_compute_cache_key_layout() {
        let key = compute_cache_key(
            "blog.selectById",
            RowBounds::DEFAULT,
            "SELECT * FROM blog WHERE id = ?",
            &[Value::Int(5)],
            Some("dev"),
        );

        assert_eq!(key.count(), 6);
        assert_eq!(key.update_list()[0], Value::from("blog.selectById"));
        assert_eq!(key.update_list()[1], Value::Int(0));
        assert_eq!(key.update_list()[4], Value::Int(5));
        assert_eq!(key.update_list()[5], Value::from("dev"));

        let other_env = compute_cache_key(
            "blog.selectById",
            RowBounds::DEFAULT,
            "SELECT * FROM blog WHERE id = ?",
            &[Value::Int(5)],
            Some("prod"),
        );
        assert_ne!(key, other_env);
    }

    #[test]
    fn test_display() {
        let key = CacheKey::from_parts([Value::from("a"), Value::Int(1)]);
        let text = key.to_string();
        assert!(text.ends_with(":a:1"));
        assert!(text.starts_with(&format!("{}:{}", key.hashcode(), key.checksum())));
    }
}
