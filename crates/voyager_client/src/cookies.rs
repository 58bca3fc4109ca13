use std::{collections::HashMap, sync::RwLock};

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, SET_COOKIE};
use tracing::debug;

/// Session cookie; its value doubles as the CSRF token.
pub const JSESSIONID: &str = "JSESSIONID";
pub const LI_AT: &str = "li_at";

#[derive(Debug, Default)]
pub struct CookieJar {
    store: RwLock<HashMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SetCookie {
    name: String,
    value: String,
    max_age: Option<i64>,
    expires: Option<DateTime<Utc>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_cookie_string(raw: &str) -> Self {
        let jar = Self::new();
        jar.load_from_string(raw);
        jar
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.read(|store| store.get(name).cloned())
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.write(|store| {
            store.insert(name.into(), value.into());
        });
    }

    pub fn is_empty(&self, name: &str) -> bool {
        self.read(|store| store.get(name).map_or(true, |value| value.is_empty()))
    }

    pub fn clear(&self) {
        self.write(HashMap::clear);
    }

    pub fn serialize(&self) -> String {
        self.read(|store| {
            store
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ")
        })
    }

    pub fn load_from_string(&self, raw: &str) {
        let parsed: Vec<(String, String)> = raw
            .split(';')
            .filter_map(|pair| parse_pair(pair.trim()))
            .collect();
        self.write(|store| {
            for (name, value) in parsed {
                store.insert(name, value);
            }
        });
    }

    pub fn update_from_response_headers(&self, headers: &HeaderMap) {
        let now = Utc::now();
        let updates: Vec<SetCookie> = headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(parse_set_cookie)
            .collect();
        if updates.is_empty() {
            return;
        }

        self.write(|store| {
            for cookie in updates {
                if cookie.is_expired(now) {
                    debug!(name = %cookie.name, "cookies: evicting expired cookie");
                    store.remove(&cookie.name);
                } else {
                    store.insert(cookie.name, cookie.value);
                }
            }
        });
    }

    fn read<T>(&self, f: impl FnOnce(&HashMap<String, String>) -> T) -> T {
        let guard = self
            .store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> T) -> T {
        let mut guard = self
            .store
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl SetCookie {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        // Max-Age takes precedence over Expires.
        if let Some(max_age) = self.max_age {
            return max_age <= 0;
        }
        self.expires.is_some_and(|expires| expires < now)
    }
}

pub fn has_session_cookie(raw: &str) -> bool {
    raw.split(';')
        .filter_map(|pair| parse_pair(pair.trim()))
        .any(|(name, value)| name == JSESSIONID && !value.is_empty())
}

fn parse_pair(pair: &str) -> Option<(String, String)> {
    let (name, value) = pair.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), unquote(value.trim()).to_string()))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_set_cookie(raw: &str) -> Option<SetCookie> {
    let mut parts = raw.split(';');
    let (name, value) = parse_pair(parts.next()?.trim())?;
    let mut cookie = SetCookie {
        name,
        value,
        max_age: None,
        expires: None,
    };

    for attribute in parts {
        let attribute = attribute.trim();
        let (key, value) = attribute.split_once('=').unwrap_or((attribute, ""));
        if key.eq_ignore_ascii_case("max-age") {
            cookie.max_age = value.trim().parse().ok();
        } else if key.eq_ignore_ascii_case("expires") {
            cookie.expires = parse_http_date(value.trim());
        }
    }
    Some(cookie)
}

fn parse_http_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%a, %d-%b-%Y %H:%M:%S GMT")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[path = "tests/cookies_tests.rs"]
mod tests;
