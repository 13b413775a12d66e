//! Grounding context for a plan run.
//!
//! Context is gathered once per run and passed by reference to every task
//! prompt; it is never stored on the engine.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::workspace::{is_glob_pattern, Workspace};

/// Workspace-relative path → file content for one plan run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatheredContext {
    files: BTreeMap<String, String>,
}

impl GatheredContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, replacing any earlier content for the same path.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render every file as a labeled block, truncating each to `max_chars`.
    pub fn render(&self, max_chars: usize) -> String {
        let mut out = String::new();
        for (path, content) in &self.files {
            out.push_str(&format!("### File: {path}\n```\n"));
            out.push_str(&truncate_chars(content, max_chars));
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n\n");
        }
        out
    }
}

/// Truncate to at most `max_chars` characters, marking the cut.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}... [truncated]", &text[..byte_index]),
        None => text.to_string(),
    }
}

/// Resolves context patterns against a workspace.
pub struct ContextGatherer<'a> {
    workspace: &'a dyn Workspace,
}

impl<'a> ContextGatherer<'a> {
    pub fn new(workspace: &'a dyn Workspace) -> Self {
        Self { workspace }
    }

    /// Read every file named by `patterns`.
    ///
    /// Glob patterns are expanded through the workspace; anything else is a
    /// literal path. Unreadable files are skipped with a warning. Later
    /// patterns overwrite earlier ones for the same path.
    pub async fn gather(&self, patterns: &[String]) -> GatheredContext {
        let mut context = GatheredContext::new();

        for pattern in patterns {
            let paths = if is_glob_pattern(pattern) {
                match self.workspace.list_files(pattern).await {
                    Ok(paths) => paths,
                    Err(e) => {
                        tracing::warn!(pattern = %pattern, error = %e, "Failed to expand context pattern");
                        continue;
                    }
                }
            } else {
                vec![PathBuf::from(pattern)]
            };

            for path in paths {
                match self.workspace.read_file(&path).await {
                    Ok(content) => {
                        context.insert(self.relative_label(&path), content);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable context file");
                    }
                }
            }
        }

        tracing::debug!(files = context.len(), "Gathered plan context");
        context
    }

    fn relative_label(&self, path: &Path) -> String {
        path.strip_prefix(self.workspace.root())
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::LocalWorkspace;
    use tempfile::TempDir;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello... [truncated]");
        assert_eq!(truncate_chars("héllo", 2), "hé... [truncated]");
    }

    #[test]
    fn test_render_labels_files() {
        let mut ctx = GatheredContext::new();
        ctx.insert("src/a.rs", "fn a() {}");
        let rendered = ctx.render(100);
        assert!(rendered.contains("### File: src/a.rs"));
        assert!(rendered.contains("fn a() {}\n```"));
    }

    #[tokio::test]
    async fn test_gather_literal_glob_and_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/a.rs"), "a").unwrap();
        std::fs::write(dir.path().join("src/b.rs"), "b").unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "[package]").unwrap();

        let ws = LocalWorkspace::new(dir.path());
        let ctx = ContextGatherer::new(&ws)
            .gather(&[
                "Cargo.toml".to_string(),
                "src/*.rs".to_string(),
                "does/not/exist.rs".to_string(),
            ])
            .await;

        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.get("Cargo.toml"), Some("[package]"));
        assert_eq!(ctx.get("src/a.rs"), Some("a"));
        assert_eq!(ctx.get("src/b.rs"), Some("b"));
    }

    #[tokio::test]
    async fn test_gather_absolute_path_is_relativized() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.md"), "notes").unwrap();

        let ws = LocalWorkspace::new(dir.path());
        let absolute = dir.path().join("notes.md").to_string_lossy().into_owned();
        let ctx = ContextGatherer::new(&ws).gather(&[absolute]).await;

        assert_eq!(ctx.get("notes.md"), Some("notes"));
    }

    #[tokio::test]
    async fn test_gather_empty_patterns() {
        let ws = LocalWorkspace::new(".");
        let ctx = ContextGatherer::new(&ws).gather(&[]).await;
        assert!(ctx.is_empty());
    }
}
