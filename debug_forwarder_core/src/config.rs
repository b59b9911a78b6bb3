/**
 * Forwarder configuration.
 *
 * Two settings live under the `debugDataForwarder` namespace:
 *
 * - `serverUrl` — collector URL, default `http://localhost:8001/debug-data`
 * - `enabled` — master switch, default `true`
 *
 * Settings are read through a `ConfigSource` on **every** send, so a host
 * that changes its configuration at runtime is picked up on the next event.
 * Absent settings silently fall back to their defaults. URLs are not
 * validated here; a bad URL fails at send time like any other transport
 * error.
 */
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::constants::{CONFIG_NAMESPACE, DEFAULT_SERVER_URL};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// A snapshot of the forwarder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub server_url: String,
    pub enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            enabled: true,
        }
    }
}

impl Settings {
    pub fn with_server_url(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// ConfigSource
// ---------------------------------------------------------------------------

/**
 * Where settings come from. Implementations must return the *current*
 * values each time — callers never cache the result across sends.
 */
pub trait ConfigSource: Send + Sync {
    fn settings(&self) -> Settings;
}

/// A fixed snapshot is its own source.
impl ConfigSource for Settings {
    fn settings(&self) -> Settings {
        self.clone()
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Arc<T> {
    fn settings(&self) -> Settings {
        (**self).settings()
    }
}

// ---------------------------------------------------------------------------
// LiveSettings — host-updated, RwLock-guarded
// ---------------------------------------------------------------------------

/**
 * Settings the host can change while the relay runs.
 *
 * Reads take a shared lock, writes an exclusive one. A poisoned lock is
 * treated as "no configuration" and yields the defaults.
 */
#[derive(Debug, Default)]
pub struct LiveSettings {
    inner: RwLock<Settings>,
}

impl LiveSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    pub fn set_server_url(&self, server_url: impl Into<String>) {
        if let Ok(mut inner) = self.inner.write() {
            inner.server_url = server_url.into();
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        if let Ok(mut inner) = self.inner.write() {
            inner.enabled = enabled;
        }
    }

    pub fn replace(&self, settings: Settings) {
        if let Ok(mut inner) = self.inner.write() {
            *inner = settings;
        }
    }
}

impl ConfigSource for LiveSettings {
    fn settings(&self) -> Settings {
        self.inner
            .read()
            .map(|inner| inner.clone())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// SettingsFile — a JSON settings file, re-read on every access
// ---------------------------------------------------------------------------

/**
 * Reads settings from an editor-style JSON settings file.
 *
 * Both layouts are accepted; flat dotted keys win over the nested form:
 *
 * ```json
 * { "debugDataForwarder.serverUrl": "http://localhost:8001/sse", "debugDataForwarder.enabled": true }
 * { "debugDataForwarder": { "serverUrl": "http://localhost:8001/sse", "enabled": true } }
 * ```
 *
 * A missing file, unparseable JSON, or a value of the wrong type falls back
 * to the default for the affected setting(s). Other keys in the file are
 * ignored.
 */
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load_root(&self) -> Option<Value> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                log::debug!(
                    "No settings at {} ({e}), using defaults",
                    self.path.display()
                );
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(root) => Some(root),
            Err(e) => {
                log::warn!(
                    "Failed to parse settings file {}: {e}; using defaults",
                    self.path.display()
                );
                None
            }
        }
    }
}

impl ConfigSource for SettingsFile {
    fn settings(&self) -> Settings {
        let defaults = Settings::default();
        let Some(root) = self.load_root() else {
            return defaults;
        };

        let server_url = match lookup(&root, "serverUrl") {
            Some(Value::String(url)) => url.clone(),
            Some(other) => {
                log::warn!("Ignoring non-string {CONFIG_NAMESPACE}.serverUrl: {other}");
                defaults.server_url
            }
            None => defaults.server_url,
        };

        let enabled = match lookup(&root, "enabled") {
            Some(Value::Bool(enabled)) => *enabled,
            Some(other) => {
                log::warn!("Ignoring non-boolean {CONFIG_NAMESPACE}.enabled: {other}");
                defaults.enabled
            }
            None => defaults.enabled,
        };

        Settings {
            server_url,
            enabled,
        }
    }
}

/// Looks a setting up as `"<ns>.<key>"` first, then as `<ns> → <key>`.
fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    let dotted = format!("{CONFIG_NAMESPACE}.{key}");
    root.get(dotted.as_str())
        .or_else(|| root.get(CONFIG_NAMESPACE).and_then(|ns| ns.get(key)))
}

// ---------------------------------------------------------------------------
// Overrides — fixed values layered over another source
// ---------------------------------------------------------------------------

/**
 * Wraps a source and pins individual settings, e.g. from command-line
 * flags. Unpinned settings keep flowing through from the inner source.
 */
pub struct Overrides<S> {
    inner: S,
    pub server_url: Option<String>,
    pub enabled: Option<bool>,
}

impl<S: ConfigSource> Overrides<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            server_url: None,
            enabled: None,
        }
    }
}

impl<S: ConfigSource> ConfigSource for Overrides<S> {
    fn settings(&self) -> Settings {
        let mut settings = self.inner.settings();
        if let Some(ref url) = self.server_url {
            settings.server_url = url.clone();
        }
        if let Some(enabled) = self.enabled {
            settings.enabled = enabled;
        }
        settings
    }
}
