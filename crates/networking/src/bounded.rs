//! Ordered sequences with a fixed upper bound on their length
//!
//! Network configurations are delivered to members that reserve a fixed
//! number of slots for rules, routes and certificates. Appending past that
//! bound is an error rather than a silent truncation.

use std::borrow::Cow;
use std::ops::Deref;
use serde::{Serialize, Deserialize};

use crate::error::{Result, NetworkError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawBoundedVec<T>", bound(deserialize = "T: Deserialize<'de>"))]
pub struct BoundedVec<T> {
    items: Vec<T>,
    capacity: usize,
    what: Cow<'static, str>,
}

/// Wire form, checked against its capacity before it becomes a `BoundedVec`
#[derive(Deserialize)]
struct RawBoundedVec<T> {
    items: Vec<T>,
    capacity: usize,
    #[serde(default = "unnamed")]
    what: Cow<'static, str>,
}

fn unnamed() -> Cow<'static, str> {
    Cow::Borrowed("elements")
}

impl<T> TryFrom<RawBoundedVec<T>> for BoundedVec<T> {
    type Error = NetworkError;

    fn try_from(raw: RawBoundedVec<T>) -> Result<Self> {
        if raw.items.len() > raw.capacity {
            return Err(NetworkError::CapacityExceeded {
                what: raw.what.into_owned(),
                capacity: raw.capacity,
            });
        }
        Ok(Self {
            items: raw.items,
            capacity: raw.capacity,
            what: raw.what,
        })
    }
}

impl<T> BoundedVec<T> {
    /// Create an empty sequence holding at most `capacity` items
    pub fn new(what: &'static str, capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
            what: Cow::Borrowed(what),
        }
    }

    /// Append an item, failing once the sequence is full
    pub fn push(&mut self, item: T) -> Result<()> {
        if self.items.len() >= self.capacity {
            return Err(NetworkError::CapacityExceeded {
                what: self.what.to_string(),
                capacity: self.capacity,
            });
        }
        self.items.push(item);
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Label used in capacity errors
    pub fn what(&self) -> &str {
        &self.what
    }
}

impl<T: PartialEq> PartialEq for BoundedVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity && self.items == other.items
    }
}

impl<T: Eq> Eq for BoundedVec<T> {}

impl<T> Deref for BoundedVec<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<'a, T> IntoIterator for &'a BoundedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut routes = BoundedVec::new("routes", 2);
        routes.push(1).unwrap();
        routes.push(2).unwrap();
        assert!(routes.is_full());

        let err = routes.push(3).unwrap_err();
        assert_eq!(err, NetworkError::CapacityExceeded { what: "routes".to_string(), capacity: 2 });
        assert_eq!(err.to_string(), "Capacity exceeded: at most 2 routes allowed");
        assert_eq!(&routes[..], &[1, 2]);
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let mut rules: BoundedVec<u8> = BoundedVec::new("rules", 0);
        assert!(rules.push(0).is_err());
        assert!(rules.is_empty());
    }

    #[test]
    fn test_deserialize_checks_capacity() {
        let err = serde_json::from_str::<BoundedVec<u8>>(r#"{"items":[1,2,3],"capacity":1,"what":"rules"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("at most 1 rules allowed"), "{}", err);

        let routes: BoundedVec<u8> = serde_json::from_str(r#"{"items":[1,2],"capacity":2}"#).unwrap();
        assert_eq!(routes.len(), 2);
        assert!(routes.is_full());
        assert_eq!(routes.what(), "elements");
    }

    #[test]
    fn test_serde_keeps_label() {
        let mut routes = BoundedVec::new("routes", 1);
        routes.push(7u8).unwrap();
        let json = serde_json::to_string(&routes).unwrap();

        let mut decoded: BoundedVec<u8> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, routes);
        assert_eq!(decoded.what(), "routes");
        assert_eq!(
            decoded.push(8).unwrap_err(),
            NetworkError::CapacityExceeded { what: "routes".to_string(), capacity: 1 }
        );
    }
}
