//! Workspace file access.
//!
//! JSON configuration files in an Nx workspace may contain comments and
//! trailing commas. [`parse_jsonc`] accepts both; [`JsonFileCache`] keeps
//! parsed files around until a watcher asks for them to be dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::trace;

use crate::error::JsonFileError;

/// Parse JSON that may contain `//` and `/* */` comments and trailing commas.
pub fn parse_jsonc(content: &str) -> Result<Value, serde_json::Error> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let without_comments = strip_comments(content);
    let cleaned = strip_trailing_commas(&without_comments);
    serde_json::from_str(&cleaned)
}

/// Replace comments with whitespace, leaving string literals untouched.
fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    // keep line numbers stable for parse errors
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

/// Drop commas that are directly followed (modulo whitespace) by `}` or `]`.
fn strip_trailing_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                i += 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }

    out
}

/// Cache of parsed JSON files keyed by absolute path.
///
/// Thread-safe: all methods take `&self`.
#[derive(Debug, Default)]
pub struct JsonFileCache {
    entries: DashMap<PathBuf, Arc<Value>>,
}

impl JsonFileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `base/file`, returning the cached parse when present.
    pub async fn read(
        &self,
        base: &Path,
        file: impl AsRef<Path>,
    ) -> Result<Arc<Value>, JsonFileError> {
        let path = base.join(file);
        if let Some(hit) = self.entries.get(&path) {
            trace!("json cache hit for {:?}", path);
            return Ok(Arc::clone(hit.value()));
        }

        let value = Arc::new(read_jsonc_file(&path).await?);
        self.entries.insert(path, Arc::clone(&value));
        Ok(value)
    }

    /// Read and deserialize into `T`, bypassing nothing: the raw value is cached.
    pub async fn read_as<T: serde::de::DeserializeOwned>(
        &self,
        base: &Path,
        file: impl AsRef<Path>,
    ) -> Result<T, JsonFileError> {
        let path = base.join(file.as_ref());
        let value = self.read(base, file).await?;
        T::deserialize(value.as_ref()).map_err(|e| JsonFileError::parse(path, e))
    }

    /// Forget a single file.
    pub fn clear(&self, base: &Path, file: impl AsRef<Path>) {
        self.entries.remove(&base.join(file));
    }

    /// Forget every file that lives under `root`.
    pub fn clear_under(&self, root: &Path) {
        self.entries.retain(|path, _| !path.starts_with(root));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read and parse a JSONC file without caching.
pub async fn read_jsonc_file(path: &Path) -> Result<Value, JsonFileError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| JsonFileError::read(path, e))?;
    parse_jsonc(&content).map_err(|e| JsonFileError::parse(path, e))
}

/// Whether `path` exists as a file.
pub async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

/// Whether `path` exists as a directory.
pub async fn directory_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_parse_plain_json() {
        assert_eq!(parse_jsonc(r#"{"a": 1}"#).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_parse_comments_and_trailing_commas() {
        let content = r#"
        {
          // line comment
          "npmScope": "acme", /* block
             comment */
          "plugins": ["@nx/js",],
          "url": "http://example.com//not-a-comment",
        }
        "#;
        assert_eq!(
            parse_jsonc(content).unwrap(),
            json!({
                "npmScope": "acme",
                "plugins": ["@nx/js"],
                "url": "http://example.com//not-a-comment"
            })
        );
    }

    #[test]
    fn test_comma_inside_string_is_kept() {
        let value = parse_jsonc(r#"{"a": "x, }", "b": "q\"," }"#).unwrap();
        assert_eq!(value["a"], "x, }");
        assert_eq!(value["b"], "q\",");
    }

    #[test]
    fn test_bom_is_ignored() {
        assert_eq!(parse_jsonc("\u{feff}{}").unwrap(), json!({}));
    }

    #[test]
    fn test_malformed_json_fails() {
        assert!(parse_jsonc("{ \"a\": }").is_err());
    }

    #[tokio::test]
    async fn test_cache_serves_stale_until_cleared() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("nx.json"), r#"{"v": 1}"#).unwrap();

        let cache = JsonFileCache::new();
        assert_eq!(cache.read(temp.path(), "nx.json").await.unwrap()["v"], 1);

        std::fs::write(temp.path().join("nx.json"), r#"{"v": 2}"#).unwrap();
        assert_eq!(cache.read(temp.path(), "nx.json").await.unwrap()["v"], 1);

        cache.clear(temp.path(), "nx.json");
        assert_eq!(cache.read(temp.path(), "nx.json").await.unwrap()["v"], 2);
    }

    #[tokio::test]
    async fn test_clear_under_only_touches_root() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        std::fs::write(a.path().join("x.json"), "{}").unwrap();
        std::fs::write(b.path().join("x.json"), "{}").unwrap();

        let cache = JsonFileCache::new();
        cache.read(a.path(), "x.json").await.unwrap();
        cache.read(b.path(), "x.json").await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear_under(a.path());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let cache = JsonFileCache::new();
        let err = cache.read(temp.path(), "nope.json").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(cache.is_empty());
    }
}
