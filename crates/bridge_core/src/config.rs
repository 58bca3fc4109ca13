use std::{fs, path::Path, time::Duration};

use toml::{Table, Value};
use tracing::{debug, warn};
use voyager_client::{types::BASE_URL, ClientOptions};

pub const DEFAULT_SETTINGS_FILE: &str = "linkedin-bridge.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeSettings {
    /// Supports `{first_name}` and `{last_name}` placeholders.
    pub displayname_template: String,
    pub base_url: String,
    pub proxy: Option<String>,
    pub request_timeout_secs: u64,
    pub retry_backoff_millis: u64,
    pub reconnect_backoff_millis: u64,
    pub max_reconnect_attempts: u32,
    pub sync_initial_messages: bool,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            displayname_template: "{first_name} {last_name}".into(),
            base_url: BASE_URL.into(),
            proxy: None,
            request_timeout_secs: 60,
            retry_backoff_millis: 3000,
            reconnect_backoff_millis: 5000,
            max_reconnect_attempts: 10,
            sync_initial_messages: true,
        }
    }
}

impl BridgeSettings {
    pub fn format_displayname(&self, first_name: &str, last_name: &str) -> String {
        format_displayname(&self.displayname_template, first_name, last_name)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.base_url.clone(),
            proxy: self.proxy.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            retry_backoff_unit: Duration::from_millis(self.retry_backoff_millis),
        }
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_millis)
    }

    fn apply(&mut self, key: &str, value: &str) {
        match key {
            "displayname_template" => self.displayname_template = value.to_string(),
            "base_url" => self.base_url = value.to_string(),
            "proxy" => {
                self.proxy = (!value.is_empty()).then(|| value.to_string());
            }
            "request_timeout_secs" => set_parsed(&mut self.request_timeout_secs, key, value),
            "retry_backoff_millis" => set_parsed(&mut self.retry_backoff_millis, key, value),
            "reconnect_backoff_millis" => {
                set_parsed(&mut self.reconnect_backoff_millis, key, value)
            }
            "max_reconnect_attempts" => set_parsed(&mut self.max_reconnect_attempts, key, value),
            "sync_initial_messages" => set_parsed(&mut self.sync_initial_messages, key, value),
            other => debug!(key = other, "config: ignoring unknown setting"),
        }
    }

    fn apply_file(&mut self, raw: &str) {
        let file_cfg = match raw.parse::<Table>() {
            Ok(file_cfg) => file_cfg,
            Err(err) => {
                warn!(error = %err, "config: ignoring malformed settings file");
                return;
            }
        };
        for (key, value) in &file_cfg {
            match value {
                Value::String(text) => self.apply(key, text),
                Value::Integer(_) | Value::Float(_) | Value::Boolean(_) => {
                    self.apply(key, &value.to_string())
                }
                _ => warn!(key = %key, "config: ignoring non-scalar setting"),
            }
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in SETTING_KEYS {
            let name = format!("APP__{}", key.to_ascii_uppercase());
            if let Some(value) = lookup(&name) {
                self.apply(key, &value);
            }
        }
    }
}

const SETTING_KEYS: [&str; 8] = [
    "displayname_template",
    "base_url",
    "proxy",
    "request_timeout_secs",
    "retry_backoff_millis",
    "reconnect_backoff_millis",
    "max_reconnect_attempts",
    "sync_initial_messages",
];

pub fn format_displayname(template: &str, first_name: &str, last_name: &str) -> String {
    template
        .replace("{first_name}", first_name)
        .replace("{last_name}", last_name)
        .trim()
        .to_string()
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, key: &str, value: &str) {
    match value.trim().parse() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key, value, "config: ignoring unparsable setting"),
    }
}

pub fn load_settings() -> BridgeSettings {
    load_settings_from(DEFAULT_SETTINGS_FILE)
}

pub fn load_settings_from(path: impl AsRef<Path>) -> BridgeSettings {
    let mut settings = BridgeSettings::default();
    if let Ok(raw) = fs::read_to_string(path.as_ref()) {
        settings.apply_file(&raw);
    }
    settings.apply_env(|name| std::env::var(name).ok());
    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
