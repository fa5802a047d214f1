//! The per-installation account profile.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Row id of the singleton account configuration.
pub const ACCOUNT_ROW_ID: i64 = 1;

/// Display language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    #[default]
    En,
    Pt,
    Es,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::Pt => "PT",
            Language::Es => "ES",
        }
    }

    /// Pick the language for a BCP 47 tag such as `pt-BR`. Unknown
    /// languages fall back to English.
    pub fn from_locale(tag: &str) -> Self {
        match locale_parts(tag).0.as_str() {
            "pt" => Language::Pt,
            "es" => Language::Es,
            _ => Language::En,
        }
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EN" => Ok(Language::En),
            "PT" => Ok(Language::Pt),
            "ES" => Ok(Language::Es),
            other => Err(Error::UnknownLanguage(other.to_string())),
        }
    }
}

/// Display currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Brl,
    Eur,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Brl => "BRL",
            Currency::Eur => "EUR",
        }
    }

    /// Pick the currency for the region of a BCP 47 tag. Unknown regions
    /// fall back to US dollars.
    pub fn from_locale(tag: &str) -> Self {
        match locale_parts(tag).1.as_deref() {
            Some("BR") => Currency::Brl,
            Some("ES") | Some("PT") => Currency::Eur,
            _ => Currency::Usd,
        }
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "BRL" => Ok(Currency::Brl),
            "EUR" => Ok(Currency::Eur),
            other => Err(Error::UnknownCurrency(other.to_string())),
        }
    }
}

/// Split `pt-BR`, `pt_BR` or `pt_BR.UTF-8` into (`pt`, Some(`BR`)).
fn locale_parts(tag: &str) -> (String, Option<String>) {
    let tag = tag.split('.').next().unwrap_or_default();
    let mut parts = tag.split(['-', '_']);
    let language = parts.next().unwrap_or_default().to_ascii_lowercase();
    let region = parts
        .find(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_alphabetic()))
        .map(|p| p.to_ascii_uppercase());
    (language, region)
}

/// Singleton account profile. Absence of the row means first run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountConfig {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub language: Language,
    pub currency: Currency,
    /// Cached reflection of the auth state
    pub is_logged_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_path: Option<String>,
}

impl AccountConfig {
    /// First-run profile with defaults derived from the device locale.
    pub fn from_locale(tag: &str, display_name: Option<String>) -> Self {
        Self {
            id: ACCOUNT_ROW_ID,
            display_name,
            language: Language::from_locale(tag),
            currency: Currency::from_locale(tag),
            is_logged_in: false,
            avatar_path: None,
        }
    }

    /// Apply a single profile edit.
    pub fn apply(&mut self, patch: AccountPatch) {
        match patch {
            AccountPatch::DisplayName(name) => self.display_name = Some(name),
            AccountPatch::Language(language) => self.language = language,
            AccountPatch::Currency(currency) => self.currency = currency,
            AccountPatch::AvatarPath(path) => self.avatar_path = Some(path),
            AccountPatch::LoggedIn(logged_in) => self.is_logged_in = logged_in,
        }
    }

    /// Profile left behind after a full account erasure: preferences are
    /// kept, identity is dropped.
    pub fn erased(&self, display_name: Option<String>) -> Self {
        Self {
            id: ACCOUNT_ROW_ID,
            display_name,
            language: self.language,
            currency: self.currency,
            is_logged_in: false,
            avatar_path: None,
        }
    }
}

/// The part of the account profile that follows the user across devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub language: Language,
    pub currency: Currency,
}

impl AccountConfig {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            display_name: self.display_name.clone(),
            language: self.language,
            currency: self.currency,
        }
    }

    /// Take over a profile stored elsewhere. A missing name keeps ours.
    pub fn adopt_profile(&mut self, profile: UserProfile) {
        if profile.display_name.is_some() {
            self.display_name = profile.display_name;
        }
        self.language = profile.language;
        self.currency = profile.currency;
    }
}

/// One field-level edit of the account profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum AccountPatch {
    DisplayName(String),
    Language(Language),
    Currency(Currency),
    AvatarPath(String),
    LoggedIn(bool),
}

impl AccountPatch {
    /// Whether the edit touches a field of [`UserProfile`].
    pub fn touches_profile(&self) -> bool {
        matches!(
            self,
            AccountPatch::DisplayName(_) | AccountPatch::Language(_) | AccountPatch::Currency(_)
        )
    }
}
