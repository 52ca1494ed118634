use crate::llm::types::ToolDef;
use crate::tools::file_read::resolve_path;
use crate::tools::{Tool, required_str};
use anyhow::{Context, Result, bail};
use diffy::create_patch;
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub fn tool_def() -> ToolDef {
    ToolDef::function(
        "file_write",
        "Writes or overwrites a text file. Relative paths are resolved against the project root and missing parent directories are created. Returns the number of bytes written and a unified diff against the previous content.",
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "content": {"type": "string"}
            },
            "required": ["path", "content"]
        }),
    )
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FileWriteResult {
    pub path: String,
    pub bytes_written: usize,
    pub created: bool,
    pub diff: String,
}

pub fn file_write(root: &Path, path: &str, content: &str) -> Result<FileWriteResult> {
    if content.as_bytes().contains(&0) {
        bail!("binary content is not allowed");
    }
    let p = resolve_path(root, path);

    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create parent directories for {}", p.display()))?;
    }

    let created = !p.exists();
    let old_content = if created {
        String::new()
    } else {
        fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?
    };

    let patch = create_patch(&old_content, content);
    let diff = if patch.hunks().is_empty() {
        String::new()
    } else {
        patch.to_string()
    };
    debug!(path = %p.display(), created, "writing file");

    fs::write(&p, content).with_context(|| format!("write {}", p.display()))?;
    Ok(FileWriteResult {
        path: p.display().to_string(),
        bytes_written: content.len(),
        created,
        diff,
    })
}

pub struct FileWrite {
    root: PathBuf,
}

impl FileWrite {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait::async_trait]
impl Tool for FileWrite {
    fn name(&self) -> &'static str {
        "file_write"
    }

    fn tool_def(&self) -> ToolDef {
        tool_def()
    }

    async fn call(&self, args: &Value) -> Result<Value> {
        let path = required_str(args, "path")?;
        let content = required_str(args, "content")?;
        Ok(serde_json::to_value(file_write(&self.root, path, content)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::file_read::file_read;
    use tempfile::tempdir;

    #[test]
    fn test_file_write_creates_parents() {
        let dir = tempdir().unwrap();
        let result = file_write(dir.path(), "nested/deeper/out.txt", "Hello, Rust!").unwrap();
        assert!(result.created);
        assert_eq!(result.bytes_written, 12);
        let read_back = file_read(dir.path(), "nested/deeper/out.txt", None, None).unwrap();
        assert_eq!(read_back.content, "Hello, Rust!");
    }

    #[test]
    fn test_file_write_binary_content_error() {
        let dir = tempdir().unwrap();
        let result = file_write(dir.path(), "binary.txt", "hello\0world");
        assert!(result.is_err());
        assert!(!dir.path().join("binary.txt").exists());
    }

    #[test]
    fn test_file_write_reports_diff() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("diff_test.txt");
        fs::write(&file_path, "Old content\n").unwrap();

        let result = file_write(dir.path(), file_path.to_str().unwrap(), "New content\n").unwrap();
        assert!(!result.created);
        assert!(result.diff.contains("-Old content"));
        assert!(result.diff.contains("+New content"));
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "New content\n");
    }

    #[test]
    fn test_file_write_same_content_has_empty_diff() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("same.txt"), "same\n").unwrap();
        let result = file_write(dir.path(), "same.txt", "same\n").unwrap();
        assert!(result.diff.is_empty());
    }
}
