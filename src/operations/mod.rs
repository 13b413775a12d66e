//! Operation extraction and application.
//!
//! Turns a backend response into file mutations. The engine treats this as
//! opaque: it only looks at the returned operation ids and touched paths.
//!
//! ## Block grammar
//!
//! A fenced code block whose info string carries a `file:<relative path>`
//! token replaces that file with the block body:
//!
//! ````text
//! ```rust file:src/lib.rs
//! pub fn hello() {}
//! ```
//! ````

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of applying the operations embedded in one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// Handles for every applied operation
    pub operation_ids: Vec<String>,

    /// Workspace-relative paths touched
    pub file_paths: Vec<String>,

    /// False if any operation failed to apply
    pub success: bool,
}

impl OperationOutcome {
    /// Whether at least one operation was applied.
    pub fn has_effect(&self) -> bool {
        !self.operation_ids.is_empty()
    }
}

/// Parses a response for embedded operations and performs them.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn apply_operations(&self, response: &str) -> anyhow::Result<OperationOutcome>;
}

/// A whole-file write parsed from a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlock {
    pub path: String,
    pub content: String,
}

/// Parse every `file:`-tagged fenced block in `text`.
///
/// A block closes on a bare fence at least as long as its opener. Fences with
/// an info string inside the body open a nested block whose bare closer stays
/// part of the content, so embedded code samples survive intact. Unterminated
/// blocks are ignored.
pub fn parse_file_blocks(text: &str) -> Vec<FileBlock> {
    let mut blocks = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let Some((fence_len, info)) = fence(line) else {
            continue;
        };
        let path = info.split_whitespace().find_map(|token| token.strip_prefix("file:"));

        let mut body = Vec::new();
        let mut nested = 0usize;
        let mut closed = false;
        for body_line in lines.by_ref() {
            if let Some((len, inner_info)) = fence(body_line) {
                if len >= fence_len {
                    if !inner_info.trim().is_empty() {
                        nested += 1;
                    } else if nested > 0 {
                        nested -= 1;
                    } else {
                        closed = true;
                        break;
                    }
                }
            }
            body.push(body_line);
        }

        if let (Some(path), true) = (path, closed) {
            if path.is_empty() {
                continue;
            }
            let mut content = body.join("\n");
            content.push('\n');
            blocks.push(FileBlock { path: path.to_string(), content });
        }
    }

    blocks
}

/// Backtick run length and info string of a fence line.
fn fence(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let len = trimmed.chars().take_while(|&c| c == '`').count();
    (len >= 3).then(|| (len, &trimmed[len..]))
}

/// Reject absolute paths and paths escaping the workspace.
fn sanitize_relative(path: &str) -> Option<PathBuf> {
    let candidate = Path::new(path);
    let safe = candidate.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe && !path.is_empty() {
        Some(candidate.to_path_buf())
    } else {
        None
    }
}

/// Default [`OperationHandler`] that writes `file:` blocks under a root directory.
#[derive(Debug, Clone)]
pub struct FileBlockApplier {
    root: PathBuf,
    dry_run: bool,
}

impl FileBlockApplier {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), dry_run: false }
    }

    /// Record operations without writing to disk.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[async_trait]
impl OperationHandler for FileBlockApplier {
    async fn apply_operations(&self, response: &str) -> anyhow::Result<OperationOutcome> {
        let mut outcome = OperationOutcome { success: true, ..Default::default() };

        for block in parse_file_blocks(response) {
            let Some(relative) = sanitize_relative(&block.path) else {
                tracing::warn!(path = %block.path, "Refusing to write outside the workspace");
                outcome.success = false;
                continue;
            };

            if !self.dry_run {
                let target = self.root.join(&relative);
                if let Some(parent) = target.parent() {
                    if let Err(e) = tokio::fs::create_dir_all(parent).await {
                        tracing::warn!(path = %block.path, error = %e, "Failed to create directory");
                        outcome.success = false;
                        continue;
                    }
                }
                if let Err(e) = tokio::fs::write(&target, &block.content).await {
                    tracing::warn!(path = %block.path, error = %e, "Failed to write file");
                    outcome.success = false;
                    continue;
                }
            }

            tracing::debug!(path = %block.path, dry_run = self.dry_run, "Applied file operation");
            outcome.operation_ids.push(uuid::Uuid::new_v4().to_string());
            outcome.file_paths.push(block.path);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_file_blocks() {
        let text = "Intro\n```rust file:src/lib.rs\npub fn a() {}\n```\n\
                    ```bash\necho hi\n```\n```file:README.md\n# Title\n\nBody\n```\n";
        let blocks = parse_file_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].path, "src/lib.rs");
        assert_eq!(blocks[0].content, "pub fn a() {}\n");
        assert_eq!(blocks[1].path, "README.md");
        assert_eq!(blocks[1].content, "# Title\n\nBody\n");
    }

    #[test]
    fn test_nested_fence_kept_in_content() {
        let text = "```markdown file:README.md\n# Tool\n\n```bash\ncargo run\n```\n\nMore docs\n```\n";
        let blocks = parse_file_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "# Tool\n\n```bash\ncargo run\n```\n\nMore docs\n");
    }

    #[test]
    fn test_longer_outer_fence() {
        let text = "````markdown file:docs/usage.md\nRun:\n```\nplanrun run x\n```\nDone\n````\nTrailing prose\n";
        let blocks = parse_file_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].path, "docs/usage.md");
        assert_eq!(blocks[0].content, "Run:\n```\nplanrun run x\n```\nDone\n");
    }

    #[tokio::test]
    async fn test_applier_writes_nested_fences_whole() {
        let dir = TempDir::new().unwrap();
        let applier = FileBlockApplier::new(dir.path());

        let outcome = applier
            .apply_operations("```markdown file:README.md\n# Tool\n\n```bash\ncargo run\n```\n\nMore docs\n```\n")
            .await
            .unwrap();

        assert_eq!(outcome.operation_ids.len(), 1);
        let written = std::fs::read_to_string(dir.path().join("README.md")).unwrap();
        assert!(written.ends_with("More docs\n"));
    }

    #[test]
    fn test_unterminated_block_ignored() {
        let blocks = parse_file_blocks("```rust file:src/lib.rs\npub fn a() {}\n");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_sanitize_relative() {
        assert!(sanitize_relative("src/lib.rs").is_some());
        assert!(sanitize_relative("./src/lib.rs").is_some());
        assert!(sanitize_relative("../escape.rs").is_none());
        assert!(sanitize_relative("/etc/passwd").is_none());
        assert!(sanitize_relative("").is_none());
    }

    #[tokio::test]
    async fn test_applier_writes_files() {
        let dir = TempDir::new().unwrap();
        let applier = FileBlockApplier::new(dir.path());

        let outcome = applier
            .apply_operations("```text file:notes/todo.txt\nbuy milk\n```")
            .await
            .unwrap();

        assert!(outcome.success);
        assert!(outcome.has_effect());
        assert_eq!(outcome.file_paths, vec!["notes/todo.txt".to_string()]);
        let written = std::fs::read_to_string(dir.path().join("notes/todo.txt")).unwrap();
        assert_eq!(written, "buy milk\n");
    }

    #[tokio::test]
    async fn test_applier_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let applier = FileBlockApplier::new(dir.path());

        let outcome = applier.apply_operations("```file:../x.txt\nnope\n```").await.unwrap();
        assert!(!outcome.success);
        assert!(!outcome.has_effect());
    }

    #[tokio::test]
    async fn test_applier_dry_run() {
        let dir = TempDir::new().unwrap();
        let applier = FileBlockApplier::new(dir.path()).with_dry_run(true);

        let outcome = applier.apply_operations("```file:a.txt\nA\n```").await.unwrap();
        assert!(outcome.has_effect());
        assert!(!dir.path().join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_applier_no_blocks() {
        let dir = TempDir::new().unwrap();
        let outcome = FileBlockApplier::new(dir.path())
            .apply_operations("The code looks fine, no changes needed.")
            .await
            .unwrap();
        assert!(outcome.success);
        assert!(!outcome.has_effect());
    }
}
