// Item & Queue Domain Model

use serde::{Deserialize, Serialize};

/// A single unit of work.
///
/// Wraps a JSON value so equality is by full structural value: objects
/// compare as key/value sets, arrays compare element-wise in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(serde_json::Value);

impl Item {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for Item {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered remaining work of one job. The checkpoint payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Queue(Vec<Item>);

impl Queue {
    pub fn new(items: Vec<Item>) -> Self {
        Self(items)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.0.iter()
    }

    pub fn into_items(self) -> Vec<Item> {
        self.0
    }

    /// Remove every item structurally equal to `item`, keeping the relative
    /// order of the rest. Returns how many copies were removed.
    pub fn remove_all(&mut self, item: &Item) -> usize {
        let before = self.0.len();
        self.0.retain(|existing| existing != item);
        before - self.0.len()
    }
}

impl FromIterator<Item> for Queue {
    fn from_iter<T: IntoIterator<Item = Item>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Queue {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(v: serde_json::Value) -> Item {
        Item::new(v)
    }

    #[test]
    fn test_remove_unique_item_preserves_order() {
        let mut queue: Queue = ["A", "B", "C", "D"]
            .iter()
            .map(|s| item(json!({ "name": s })))
            .collect();

        let removed = queue.remove_all(&item(json!({"name": "B"})));

        assert_eq!(removed, 1);
        assert_eq!(queue.len(), 3);
        let names: Vec<_> = queue.iter().map(|i| i.as_value()["name"].clone()).collect();
        assert_eq!(names, vec![json!("A"), json!("C"), json!("D")]);
    }

    #[test]
    fn test_remove_drops_every_structural_duplicate() {
        let dup = item(json!({"email": "a@example.com", "role": "admin"}));
        let mut queue = Queue::new(vec![
            dup.clone(),
            item(json!({"email": "b@example.com"})),
            dup.clone(),
            dup.clone(),
        ]);

        assert_eq!(queue.remove_all(&dup), 3);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_equality_is_structural_not_key_order() {
        let a: Item = serde_json::from_str(r#"{"a": 1, "b": [1, 2]}"#).unwrap();
        let b: Item = serde_json::from_str(r#"{"b": [1, 2], "a": 1}"#).unwrap();
        let c: Item = serde_json::from_str(r#"{"b": [2, 1], "a": 1}"#).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_remove_missing_item_is_noop() {
        let mut queue = Queue::new(vec![item(json!(1)), item(json!(2))]);
        assert_eq!(queue.remove_all(&item(json!(3))), 0);
        assert_eq!(queue.len(), 2);
    }
}
