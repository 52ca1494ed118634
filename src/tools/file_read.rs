use crate::llm::types::ToolDef;
use crate::tools::{Tool, optional_usize, required_str};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_LINE_LIMIT: usize = 2_000;

pub fn tool_def() -> ToolDef {
    ToolDef::function(
        "file_read",
        "Reads a UTF-8 text file. Relative paths are resolved against the project root. Optionally pass a 0-based start_line and a maximum number of lines to read a slice of a large file.",
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "start_line": {"type": "integer", "description": "0-based first line to return"},
                "limit": {"type": "integer", "description": "Maximum number of lines (default 2000)"}
            },
            "required": ["path"]
        }),
    )
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FileReadResult {
    pub path: String,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    pub total_lines: usize,
    pub truncated: bool,
}

/// Joins relative paths onto `root`; absolute paths are used as given.
pub fn resolve_path(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

pub fn file_read(
    root: &Path,
    path: &str,
    start_line: Option<usize>,
    limit: Option<usize>,
) -> Result<FileReadResult> {
    let p = resolve_path(root, path);
    let meta = fs::metadata(&p).with_context(|| format!("metadata {}", p.display()))?;
    if !meta.is_file() {
        anyhow::bail!("not a file: {}", p.display());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;

    let lines: Vec<&str> = s.lines().collect();
    let total_lines = lines.len();
    let start_line = start_line.unwrap_or(0).min(total_lines);
    let end_line = start_line
        .saturating_add(limit.unwrap_or(DEFAULT_LINE_LIMIT))
        .min(total_lines);

    Ok(FileReadResult {
        path: p.display().to_string(),
        content: lines[start_line..end_line].join("\n"),
        start_line,
        end_line,
        total_lines,
        truncated: end_line < total_lines,
    })
}

pub struct FileRead {
    root: PathBuf,
}

impl FileRead {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait::async_trait]
impl Tool for FileRead {
    fn name(&self) -> &'static str {
        "file_read"
    }

    fn tool_def(&self) -> ToolDef {
        tool_def()
    }

    async fn call(&self, args: &Value) -> Result<Value> {
        let path = required_str(args, "path")?;
        let result = file_read(
            &self.root,
            path,
            optional_usize(args, "start_line"),
            optional_usize(args, "limit"),
        )?;
        Ok(serde_json::to_value(result)?)
    }
}
