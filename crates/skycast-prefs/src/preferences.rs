//! Typed preference operations on top of a [`KeyValueStore`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use skycast_core::{StorageError, TemperatureUnit};

use crate::store::{KeyValueStore, StoreResult};

/// Number of recent searches kept.
pub const MAX_HISTORY: usize = 5;

const KEY_FAVORITES: &str = "favorites";
const KEY_HISTORY: &str = "search_history";
const KEY_UNIT: &str = "temperature_unit";
const KEY_COMPARISONS: &str = "comparison_locations";

fn normalize(name: &str) -> Option<String> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn contains_ignore_case(list: &[String], name: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(name))
}

pub struct Preferences<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Preferences<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read a JSON value; missing keys and unreadable JSON both yield `None`.
    fn load<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!("Ignoring corrupt preference '{}': {}", key, e);
                Ok(None)
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let raw =
            serde_json::to_string(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.set(key, &raw)
    }

    fn load_list(&self, key: &str) -> StoreResult<Vec<String>> {
        Ok(self.load(key)?.unwrap_or_default())
    }

    // Favorites

    pub fn favorites(&self) -> StoreResult<Vec<String>> {
        self.load_list(KEY_FAVORITES)
    }

    pub fn is_favorite(&self, name: &str) -> StoreResult<bool> {
        Ok(contains_ignore_case(&self.favorites()?, name.trim()))
    }

    /// Returns `false` when the city was already a favorite or the name is blank.
    pub fn add_favorite(&self, name: &str) -> StoreResult<bool> {
        let Some(name) = normalize(name) else {
            return Ok(false);
        };
        let mut favorites = self.favorites()?;
        if contains_ignore_case(&favorites, &name) {
            return Ok(false);
        }
        favorites.push(name);
        self.save(KEY_FAVORITES, &favorites)?;
        Ok(true)
    }

    /// Returns `false` when nothing was removed.
    pub fn remove_favorite(&self, name: &str) -> StoreResult<bool> {
        let name = name.trim();
        let mut favorites = self.favorites()?;
        let before = favorites.len();
        favorites.retain(|item| !item.eq_ignore_ascii_case(name));
        if favorites.len() == before {
            return Ok(false);
        }
        self.save(KEY_FAVORITES, &favorites)?;
        Ok(true)
    }

    /// Add or remove; returns whether the city is a favorite afterwards.
    pub fn toggle_favorite(&self, name: &str) -> StoreResult<bool> {
        if self.is_favorite(name)? {
            self.remove_favorite(name)?;
            Ok(false)
        } else {
            self.add_favorite(name)
        }
    }

    // Search history

    /// Most recent first.
    pub fn search_history(&self) -> StoreResult<Vec<String>> {
        self.load_list(KEY_HISTORY)
    }

    pub fn record_search(&self, query: &str) -> StoreResult<()> {
        let Some(query) = normalize(query) else {
            return Ok(());
        };
        let mut history = self.search_history()?;
        history.retain(|item| !item.eq_ignore_ascii_case(&query));
        history.insert(0, query);
        history.truncate(MAX_HISTORY);
        self.save(KEY_HISTORY, &history)
    }

    pub fn clear_history(&self) -> StoreResult<()> {
        self.store.remove(KEY_HISTORY)
    }

    // Temperature unit

    pub fn temperature_unit(&self) -> StoreResult<TemperatureUnit> {
        Ok(self.load(KEY_UNIT)?.unwrap_or_default())
    }

    /// Stored unit, or `fallback` when none has been saved yet.
    pub fn temperature_unit_or(&self, fallback: TemperatureUnit) -> StoreResult<TemperatureUnit> {
        Ok(self.load(KEY_UNIT)?.unwrap_or(fallback))
    }

    pub fn set_temperature_unit(&self, unit: TemperatureUnit) -> StoreResult<()> {
        self.save(KEY_UNIT, &unit)
    }

    // Comparison locations

    pub fn comparisons(&self) -> StoreResult<Vec<String>> {
        self.load_list(KEY_COMPARISONS)
    }

    pub fn add_comparison(&self, name: &str) -> StoreResult<bool> {
        let Some(name) = normalize(name) else {
            return Ok(false);
        };
        let mut comparisons = self.comparisons()?;
        if contains_ignore_case(&comparisons, &name) {
            return Ok(false);
        }
        comparisons.push(name);
        self.save(KEY_COMPARISONS, &comparisons)?;
        Ok(true)
    }

    pub fn remove_comparison(&self, name: &str) -> StoreResult<bool> {
        let name = name.trim();
        let mut comparisons = self.comparisons()?;
        let before = comparisons.len();
        comparisons.retain(|item| !item.eq_ignore_ascii_case(name));
        if comparisons.len() == before {
            return Ok(false);
        }
        self.save(KEY_COMPARISONS, &comparisons)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::store::MemoryStore;

    fn prefs() -> Preferences<MemoryStore> {
        Preferences::new(MemoryStore::new())
    }

    #[test]
    fn test_favorites_add_and_remove() {
        let prefs = prefs();
        assert!(prefs.add_favorite("Paris").unwrap());
        assert!(prefs.add_favorite(" Tokyo ").unwrap());
        assert!(!prefs.add_favorite("paris").unwrap());
        assert!(!prefs.add_favorite("   ").unwrap());
        assert_eq!(prefs.favorites().unwrap(), vec!["Paris", "Tokyo"]);

        assert!(prefs.is_favorite("TOKYO").unwrap());
        assert!(prefs.remove_favorite("tokyo").unwrap());
        assert!(!prefs.remove_favorite("Tokyo").unwrap());
        assert_eq!(prefs.favorites().unwrap(), vec!["Paris"]);
    }

    #[test]
    fn test_toggle_favorite() {
        let prefs = prefs();
        assert!(prefs.toggle_favorite("Oslo").unwrap());
        assert!(prefs.is_favorite("Oslo").unwrap());
        assert!(!prefs.toggle_favorite("oslo").unwrap());
        assert!(prefs.favorites().unwrap().is_empty());
    }

    #[test]
    fn test_history_is_most_recent_first_and_capped() {
        let prefs = prefs();
        for city in ["A", "B", "C", "D", "E", "F"] {
            prefs.record_search(city).unwrap();
        }
        assert_eq!(prefs.search_history().unwrap(), vec!["F", "E", "D", "C", "B"]);
    }

    #[test]
    fn test_history_dedupes_and_ignores_blank() {
        let prefs = prefs();
        prefs.record_search("London").unwrap();
        prefs.record_search("Paris").unwrap();
        prefs.record_search("  london ").unwrap();
        prefs.record_search("").unwrap();
        assert_eq!(prefs.search_history().unwrap(), vec!["london", "Paris"]);

        prefs.clear_history().unwrap();
        assert!(prefs.search_history().unwrap().is_empty());
    }

    #[test]
    fn test_temperature_unit_defaults_to_celsius() {
        let prefs = prefs();
        assert_eq!(prefs.temperature_unit().unwrap(), TemperatureUnit::Celsius);
        assert_eq!(
            prefs.temperature_unit_or(TemperatureUnit::Fahrenheit).unwrap(),
            TemperatureUnit::Fahrenheit
        );

        prefs.set_temperature_unit(TemperatureUnit::Fahrenheit).unwrap();
        assert_eq!(prefs.temperature_unit().unwrap(), TemperatureUnit::Fahrenheit);
        assert_eq!(prefs.store().get(KEY_UNIT).unwrap().as_deref(), Some("\"fahrenheit\""));
    }

    #[test]
    fn test_comparisons_reject_duplicates() {
        let prefs = prefs();
        assert!(prefs.add_comparison("Berlin").unwrap());
        assert!(!prefs.add_comparison("BERLIN").unwrap());
        assert!(prefs.add_comparison("Rome").unwrap());
        assert!(prefs.remove_comparison("berlin").unwrap());
        assert_eq!(prefs.comparisons().unwrap(), vec!["Rome"]);
    }

    #[test]
    fn test_corrupt_value_reads_as_empty() {
        let prefs = prefs();
        prefs.store().set(KEY_FAVORITES, "{not json").unwrap();
        assert!(prefs.favorites().unwrap().is_empty());

        assert!(prefs.add_favorite("Cairo").unwrap());
        assert_eq!(prefs.favorites().unwrap(), vec!["Cairo"]);
    }
}
