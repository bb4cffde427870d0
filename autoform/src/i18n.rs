//! Translation lookup for the few user-facing strings the engine emits.

use shared_types::{MSG_LOAD_ERROR, MSG_SAVE, MSG_SUBMIT_ERROR, MSG_SUBMIT_IN_PROGRESS};
use std::collections::HashMap;

pub trait Translator: Send + Sync {
    fn t(&self, key: &str) -> String;
}

/// Static key → message table. Unknown keys translate to themselves.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    messages: HashMap<String, String>,
}

impl Catalog {
    pub fn english() -> Self {
        Self::from_pairs([
            (
                MSG_SUBMIT_IN_PROGRESS,
                "Changes are being saved. Leaving now may lose them.",
            ),
            (MSG_SUBMIT_ERROR, "Failed to save changes"),
            (MSG_LOAD_ERROR, "Failed to load form values"),
            (MSG_SAVE, "Save"),
        ])
    }

    pub fn french() -> Self {
        Self::from_pairs([
            (
                MSG_SUBMIT_IN_PROGRESS,
                "Enregistrement en cours. Quitter maintenant peut entraîner une perte de données.",
            ),
            (MSG_SUBMIT_ERROR, "Échec de l'enregistrement des modifications"),
            (MSG_LOAD_ERROR, "Échec du chargement des valeurs du formulaire"),
            (MSG_SAVE, "Enregistrer"),
        ])
    }

    /// Catalog for a locale tag such as `fr` or `fr-FR`; English otherwise.
    pub fn for_locale(locale: &str) -> Self {
        match locale.split(['-', '_']).next().unwrap_or("") {
            "fr" => Self::french(),
            _ => Self::english(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            messages: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, message: impl Into<String>) -> Self {
        self.messages.insert(key.into(), message.into());
        self
    }
}

impl Translator for Catalog {
    fn t(&self, key: &str) -> String {
        self.messages
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
