//! Per-session disclosure preferences.

use vaultgate_types::{DisclosureCategory, DisclosureLevel, DisclosurePreferences};

use crate::{Namespace, Result};

/// Storage key for the preferences map.
pub const PREFERENCES_KEY: &str = "disclosure:preferences";

/// Outcome of [`DisclosureRegistry::set_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisclosureChange {
    pub category: DisclosureCategory,
    pub previous: DisclosureLevel,
    pub preferences: DisclosurePreferences,
}

impl DisclosureChange {
    pub fn current(&self) -> DisclosureLevel {
        self.preferences.get(self.category)
    }
}

#[derive(Clone)]
pub struct DisclosureRegistry {
    ns: Namespace,
}

impl DisclosureRegistry {
    pub fn new(ns: Namespace) -> Self {
        Self { ns }
    }

    /// Current preferences; categories never set are `summary`.
    pub async fn get_preferences(&self) -> Result<DisclosurePreferences> {
        let stored: Option<DisclosurePreferences> = self.ns.get(PREFERENCES_KEY).await?;
        Ok(stored.unwrap_or_default())
    }

    pub async fn get_level(&self, category: DisclosureCategory) -> Result<DisclosureLevel> {
        Ok(self.get_preferences().await?.get(category))
    }

    /// Re-level one category.
    pub async fn set_level(
        &self,
        category: DisclosureCategory,
        level: DisclosureLevel,
    ) -> Result<DisclosureChange> {
        let change = self
            .ns
            .update::<DisclosurePreferences, _, _>(PREFERENCES_KEY, move |current| {
                let mut prefs = current.unwrap_or_default();
                let previous = prefs.get(category);
                prefs.set(category, level);
                (
                    prefs,
                    DisclosureChange {
                        category,
                        previous,
                        preferences: prefs,
                    },
                )
            })
            .await?;

        tracing::info!(
            namespace = %self.ns.name(),
            category = %category,
            from = %change.previous,
            to = %level,
            "Disclosure level changed"
        );
        Ok(change)
    }
}
