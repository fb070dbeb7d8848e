//! Named prompt templates with `{placeholder}` substitution (spec.md §4.4).
//!
//! Templates live under a read-only asset directory as `<name>.txt` and are
//! cached on first read in a `DashMap` guarding process-wide shared state.

use graphmind_core::error::{GraphMindError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A loaded template body plus its source path, for diagnostics.
#[derive(Debug, Clone)]
struct Template {
    body: Arc<str>,
}

/// A named, cached collection of prompt templates.
pub struct PromptRegistry {
    asset_dir: PathBuf,
    cache: dashmap::DashMap<String, Template>,
    builtin: HashMap<&'static str, &'static str>,
}

impl PromptRegistry {
    /// Create a registry that reads `<asset_dir>/<name>.txt` on cache miss,
    /// falling back to the built-in templates when a file is absent.
    #[must_use]
    pub fn new(asset_dir: impl Into<PathBuf>) -> Self {
        Self {
            asset_dir: asset_dir.into(),
            cache: dashmap::DashMap::new(),
            builtin: builtin_templates(),
        }
    }

    /// A registry backed only by the built-in templates, for tests and for
    /// deployments with no asset directory configured.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            asset_dir: PathBuf::new(),
            cache: dashmap::DashMap::new(),
            builtin: builtin_templates(),
        }
    }

    /// Render `name` with `values`, substituting `{key}` tokens. Missing
    /// keys become empty strings, matching spec.md §4.4's single-pass rule.
    ///
    /// # Errors
    /// Returns [`GraphMindError::Input`] if `name` has no template on disk
    /// and no built-in fallback.
    pub fn render(&self, name: &str, values: &HashMap<String, String>) -> Result<String> {
        let body = self.load(name)?;
        Ok(substitute(&body, values))
    }

    fn load(&self, name: &str) -> Result<Arc<str>> {
        if let Some(t) = self.cache.get(name) {
            return Ok(Arc::clone(&t.body));
        }

        let body: Arc<str> = match self.read_asset(name) {
            Some(text) => text.into(),
            None => match self.builtin.get(name) {
                Some(text) => (*text).into(),
                None => {
                    return Err(GraphMindError::Input(format!(
                        "unknown prompt template: {name}"
                    )))
                }
            },
        };

        self.cache.insert(
            name.to_string(),
            Template {
                body: Arc::clone(&body),
            },
        );
        Ok(body)
    }

    fn read_asset(&self, name: &str) -> Option<String> {
        if self.asset_dir.as_os_str().is_empty() {
            return None;
        }
        let path: PathBuf = Path::new(&self.asset_dir).join(format!("{name}.txt"));
        std::fs::read_to_string(path).ok()
    }

    /// Drop the cached copy of one template; the next render re-reads it.
    pub fn reload(&self, name: &str) {
        debug!(template = name, "prompt template reloaded");
        self.cache.remove(name);
    }

    /// Drop every cached template.
    pub fn clear(&self) {
        debug!("prompt registry cache cleared");
        self.cache.clear();
    }
}

fn substitute(template: &str, values: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = template[i + 1..].find('}') {
                let key = &template[i + 1..i + 1 + end];
                out.push_str(values.get(key).map_or("", String::as_str));
                i += end + 2;
                continue;
            }
        }
        let ch = template[i..].chars().next().unwrap();
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

fn builtin_templates() -> HashMap<&'static str, &'static str> {
    let mut m = HashMap::new();
    m.insert(
        "entity-extraction",
        include_str!("../assets/entity-extraction.txt"),
    );
    m.insert(
        "answer-generation",
        include_str!("../assets/answer-generation.txt"),
    );
    m.insert(
        "path-explanation",
        include_str!("../assets/path-explanation.txt"),
    );
    m
}
