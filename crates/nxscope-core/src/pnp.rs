//! Yarn Plug'n'Play resolution.
//!
//! A PnP install has no `node_modules`; package locations live in the
//! runtime state written next to `.pnp.cjs`. Only the subset needed to map
//! a top-level dependency to its on-disk directory is read here.

use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::fs::{file_exists, parse_jsonc};

/// Marker files that identify a PnP install, in lookup order.
pub const PNP_MARKERS: &[&str] = &[".pnp.cjs", ".pnp.js"];

const PNP_DATA_FILE: &str = ".pnp.data.json";

static RAW_RUNTIME_STATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)RAW_RUNTIME_STATE\s*=\s*'((?:[^'\\]|\\.)*)'"#).expect("static pattern")
});

/// Return the PnP marker file of a workspace, if it uses Plug'n'Play.
pub async fn pnp_marker(workspace_root: &Path) -> Option<PathBuf> {
    for marker in PNP_MARKERS {
        let path = workspace_root.join(marker);
        if file_exists(&path).await {
            return Some(path);
        }
    }
    None
}

/// Parsed PnP runtime state.
#[derive(Debug, Clone)]
pub struct PnpState {
    root: PathBuf,
    data: Value,
}

impl PnpState {
    /// Load the runtime state for `workspace_root`.
    ///
    /// Prefers `.pnp.data.json` and falls back to the literal embedded in
    /// the marker script. Returns `None` when neither can be read.
    pub async fn load(workspace_root: &Path, marker: &Path) -> Option<Self> {
        let data_file = workspace_root.join(PNP_DATA_FILE);
        if let Ok(content) = tokio::fs::read_to_string(&data_file).await {
            match parse_jsonc(&content) {
                Ok(data) => return Some(Self::from_value(workspace_root, data)),
                Err(e) => debug!("ignoring malformed {:?}: {}", data_file, e),
            }
        }

        let script = tokio::fs::read_to_string(marker).await.ok()?;
        let data = extract_runtime_state(&script)?;
        Some(Self::from_value(workspace_root, data))
    }

    pub fn from_value(workspace_root: &Path, data: Value) -> Self {
        Self {
            root: workspace_root.to_path_buf(),
            data,
        }
    }

    /// Directory of `dependency` as seen from the top-level workspace package.
    ///
    /// Virtual paths are collapsed to the real package directory.
    pub fn resolve_package_dir(&self, dependency: &str) -> Option<PathBuf> {
        let top_level = self.find_package(None, None)?;
        let reference = top_level
            .get("packageDependencies")?
            .as_array()?
            .iter()
            .filter_map(Value::as_array)
            .find(|pair| pair.first().and_then(Value::as_str) == Some(dependency))
            .and_then(|pair| pair.get(1))?;

        // aliased dependencies are stored as [name, reference]
        let (name, reference) = match reference {
            Value::String(r) => (dependency, r.as_str()),
            Value::Array(alias) => (
                alias.first().and_then(Value::as_str)?,
                alias.get(1).and_then(Value::as_str)?,
            ),
            _ => return None,
        };

        let info = self.find_package(Some(name), Some(reference))?;
        let location = info.get("packageLocation")?.as_str()?;
        let resolved = normalize(&self.root.join(location));
        Some(resolve_virtual(&resolved))
    }

    fn find_package(&self, name: Option<&str>, reference: Option<&str>) -> Option<&Value> {
        self.data
            .get("packageRegistryData")?
            .as_array()?
            .iter()
            .filter_map(Value::as_array)
            .find(|entry| entry.first().map(Value::as_str) == Some(name))
            .and_then(|entry| entry.get(1))
            .and_then(Value::as_array)?
            .iter()
            .filter_map(Value::as_array)
            .find(|store| store.first().map(Value::as_str) == Some(reference))
            .and_then(|store| store.get(1))
    }
}

/// Pull the JSON payload out of a `.pnp.cjs` script.
pub fn extract_runtime_state(script: &str) -> Option<Value> {
    let literal = RAW_RUNTIME_STATE.captures(script)?.get(1)?.as_str();
    serde_json::from_str(&unescape_js_single_quoted(literal)).ok()
}

fn unescape_js_single_quoted(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            // line continuation
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Collapse one `__virtual__/<hash>/<depth>/<rest>` indirection.
///
/// `depth` counts how many directories above the `__virtual__` parent the
/// real path starts.
pub fn resolve_virtual(path: &Path) -> PathBuf {
    let components: Vec<Component<'_>> = path.components().collect();
    let Some(index) = components
        .iter()
        .position(|c| c.as_os_str() == "__virtual__")
    else {
        return path.to_path_buf();
    };

    // needs <hash>/<depth> after the marker
    let Some(depth) = components
        .get(index + 2)
        .and_then(|c| c.as_os_str().to_str())
        .and_then(|s| s.parse::<usize>().ok())
    else {
        return path.to_path_buf();
    };

    let mut base: PathBuf = components[..index].iter().collect();
    for _ in 0..depth {
        base.pop();
    }
    for component in &components[index + 3..] {
        base.push(component);
    }
    base
}

/// Lexically resolve `.` and `..` without touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
