// src/i18n.rs
//! Translation lookup with a persisted language preference.
//!
//! `translate` resolves `lang -> en -> key`; an unknown key comes back as-is.

use std::str::FromStr;
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::storage::{KeyValueStore, LANGUAGE_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    #[default]
    En,
    Es,
    It,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Es, Language::It];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::It => "it",
        }
    }

    /// Display name in the language itself.
    pub fn native_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Es => "Español",
            Language::It => "Italiano",
        }
    }

    fn table(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Language::En => EN,
            Language::Es => ES,
            Language::It => IT,
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "es" => Ok(Language::Es),
            "it" => Ok(Language::It),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

fn lookup(lang: Language, key: &str) -> Option<&'static str> {
    lang.table()
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
}

pub fn translate<'a>(lang: Language, key: &'a str) -> &'a str {
    lookup(lang, key)
        .or_else(|| lookup(Language::En, key))
        .unwrap_or(key)
}

/// The active language, backed by client storage under `preferred-language`.
pub struct LanguagePreference {
    storage: Arc<dyn KeyValueStore>,
    current: RwLock<Language>,
}

impl LanguagePreference {
    /// Reads the stored code; anything missing or unknown means English.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let current = storage
            .get(LANGUAGE_KEY)
            .and_then(|code| code.parse().ok())
            .unwrap_or_default();
        Self {
            storage,
            current: RwLock::new(current),
        }
    }

    pub fn current(&self) -> Language {
        *self.current.read().unwrap_or_else(|p| p.into_inner())
    }

    pub fn set(&self, lang: Language) {
        *self.current.write().unwrap_or_else(|p| p.into_inner()) = lang;
        if let Err(e) = self.storage.set(LANGUAGE_KEY, lang.code()) {
            warn!(error = ?e, lang = lang.code(), "failed to persist language preference");
        }
    }

    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        translate(self.current(), key)
    }
}

const EN: &[(&str, &str)] = &[
    ("dashboard", "Dashboard"),
    ("liveNow", "Live Now"),
    ("smartMoney", "Smart Money"),
    ("policies", "Policies"),
    ("about", "About"),
    ("admin", "Admin"),
    ("privacy", "Privacy"),
    ("title", "CryptoAI Digest"),
    ("subtitle", "All Financial Intelligence in One Place"),
    ("marketClosed", "MARKET CLOSED"),
    ("live", "LIVE"),
    ("allNews", "All News"),
    ("finance", "Finance"),
    ("cryptocurrency", "Cryptocurrency"),
    ("policyUpdates", "Policy Updates"),
    ("refresh", "Refresh"),
    ("loading", "Loading"),
    ("loadingNews", "Loading latest financial news..."),
    ("noLiveStreams", "No Live Streams"),
    ("refreshStreams", "Refresh Streams"),
    ("language", "Language"),
];

const ES: &[(&str, &str)] = &[
    ("dashboard", "Panel"),
    ("liveNow", "En Vivo"),
    ("smartMoney", "Dinero Inteligente"),
    ("policies", "Políticas"),
    ("about", "Acerca de"),
    ("admin", "Admin"),
    ("privacy", "Privacidad"),
    ("subtitle", "Toda la Inteligencia Financiera en Un Lugar"),
    ("marketClosed", "MERCADO CERRADO"),
    ("live", "EN VIVO"),
    ("allNews", "Todas las Noticias"),
    ("finance", "Finanzas"),
    ("cryptocurrency", "Criptomonedas"),
    ("policyUpdates", "Actualizaciones de Políticas"),
    ("refresh", "Actualizar"),
    ("loading", "Cargando"),
    ("loadingNews", "Cargando las últimas noticias financieras..."),
    ("noLiveStreams", "Sin Transmisiones en Vivo"),
    ("refreshStreams", "Actualizar Transmisiones"),
    ("language", "Idioma"),
];

const IT: &[(&str, &str)] = &[
    ("liveNow", "Live Ora"),
    ("policies", "Politiche"),
    ("about", "Chi Siamo"),
    ("subtitle", "Tutta l'Intelligenza Finanziaria in Un Posto"),
    ("marketClosed", "MERCATO CHIUSO"),
    ("allNews", "Tutte le Notizie"),
    ("finance", "Finanza"),
    ("cryptocurrency", "Criptovalute"),
    ("policyUpdates", "Aggiornamenti Politiche"),
    ("refresh", "Aggiorna"),
    ("loading", "Caricamento"),
    ("loadingNews", "Caricamento ultime notizie finanziarie..."),
    ("noLiveStreams", "Nessuno Streaming Live"),
    ("refreshStreams", "Aggiorna Streaming"),
    ("language", "Lingua"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn falls_back_to_english_then_key() {
        assert_eq!(translate(Language::Es, "liveNow"), "En Vivo");
        // Italian table has no entry; English fills in.
        assert_eq!(translate(Language::It, "dashboard"), "Dashboard");
        assert_eq!(translate(Language::It, "noSuchKey"), "noSuchKey");
    }

    #[test]
    fn preference_persists_and_ignores_junk() {
        let store = Arc::new(MemoryStore::with_entry(LANGUAGE_KEY, "xx"));
        let pref = LanguagePreference::load(store.clone());
        assert_eq!(pref.current(), Language::En);

        pref.set(Language::It);
        assert_eq!(store.get(LANGUAGE_KEY).as_deref(), Some("it"));
        assert_eq!(LanguagePreference::load(store).t("about"), "Chi Siamo");
    }
}
