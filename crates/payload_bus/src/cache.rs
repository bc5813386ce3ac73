//! Sliding-window text store.
//!
//! Every posted message generates one text entry, so the store keeps a fixed
//! window of the most recently inserted keys and evicts from the front.
//! Eviction is FIFO by insertion: `put` refreshes a key's position, reads do not.

use crate::error::BusError;
use std::collections::{HashMap, VecDeque};

/// Window size used when no other capacity is configured.
pub const DEFAULT_WINDOW_SIZE: usize = 144;

/// Bounded key -> text map with FIFO + dedup eviction.
///
/// `entries` and `order` always hold the same key set, each key once in
/// `order`, most recently inserted at the back.
#[derive(Debug, Clone)]
pub struct TextWindow {
    capacity: usize,
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl TextWindow {
    /// Creates a window holding at most `capacity` keys (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Inserts or refreshes `key`, returning the key evicted to make room.
    pub fn put(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>, BusError> {
        let key = key.into();
        if key.is_empty() {
            return Err(BusError::EmptyCacheKey);
        }

        if self.entries.contains_key(&key) {
            self.remove(&key);
        }

        let mut evicted = None;
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
                evicted = Some(oldest);
            }
        }

        self.entries.insert(key.clone(), value.into());
        self.order.push_back(key);
        Ok(evicted)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let value = self.entries.remove(key)?;
        if let Some(position) = self.order.iter().position(|k| k == key) {
            self.order.remove(position);
        }
        Some(value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Live keys, oldest first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl Default for TextWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_consistent(window: &TextWindow) {
        assert_eq!(window.len(), window.entries.len());
        for key in window.keys() {
            assert!(window.entries.contains_key(key));
        }
        let mut keys: Vec<&str> = window.keys().collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), window.len());
    }

    #[test]
    fn test_overflow_evicts_first_inserted() {
        let mut window = TextWindow::default();
        for i in 0..=DEFAULT_WINDOW_SIZE {
            window.put(format!("key-{i}"), "text").unwrap();
        }

        assert_eq!(window.len(), DEFAULT_WINDOW_SIZE);
        assert!(!window.contains("key-0"));
        assert!(window.contains("key-1"));
        assert!(window.contains(&format!("key-{DEFAULT_WINDOW_SIZE}")));
        assert_consistent(&window);
    }

    #[test]
    fn test_reput_refreshes_position() {
        let mut window = TextWindow::new(3);
        window.put("a", "1").unwrap();
        window.put("b", "2").unwrap();
        window.put("c", "3").unwrap();
        window.put("a", "1b").unwrap();

        let evicted = window.put("d", "4").unwrap();
        assert_eq!(evicted.as_deref(), Some("b"));
        assert_eq!(window.get("a"), Some("1b"));
        assert_eq!(window.keys().collect::<Vec<_>>(), vec!["c", "a", "d"]);
        assert_consistent(&window);
    }

    #[test]
    fn test_reads_do_not_refresh() {
        let mut window = TextWindow::new(2);
        window.put("a", "1").unwrap();
        window.put("b", "2").unwrap();
        assert_eq!(window.get("a"), Some("1"));

        window.put("c", "3").unwrap();
        assert!(!window.contains("a"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let mut window = TextWindow::new(2);
        assert_eq!(window.put("", "x"), Err(BusError::EmptyCacheKey));
        assert!(window.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut window = TextWindow::new(4);
        window.put("a", "1").unwrap();
        window.put("b", "2").unwrap();

        assert_eq!(window.remove("a").as_deref(), Some("1"));
        assert_eq!(window.remove("a"), None);
        assert_eq!(window.len(), 1);
        assert_consistent(&window);

        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), 4);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut window = TextWindow::new(0);
        window.put("a", "1").unwrap();
        window.put("b", "2").unwrap();
        assert_eq!(window.len(), 1);
        assert!(window.contains("b"));
    }
}
