// Copyright 2022-2023 VMware, Inc.
// SPDX-License-Identifier: BSD-2-Clause

//! Query files: parsing raw query files and writing per-invocation query
//! artifacts.
//!
//! A query file holds one query per line. A block comment (`/* ... */`, which
//! may span several lines) labels the query that follows it; the label is used
//! to describe the query's result. Blank lines and `//` line comments are
//! skipped, and a trailing comment with no query after it is ignored.

use std::{
    fs,
    io::{self, Write},
    path::Path,
};
use tempfile::NamedTempFile;

/// One query read from a query file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryLine {
    /// The query text, as passed to the verifier
    pub query: String,
    /// The contents of the block comment before the query, if any
    pub label: Option<String>,
}

fn normalize_label(buf: &str) -> Option<String> {
    let label = buf.split_whitespace().collect::<Vec<_>>().join(" ");
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

/// Parse the queries of a query file.
pub fn parse_queries(text: &str) -> Vec<QueryLine> {
    let mut queries = vec![];
    let mut label: Option<String> = None;
    // contents of an unterminated block comment
    let mut comment: Option<String> = None;
    for line in text.lines() {
        let mut rest = line;
        loop {
            if let Some(mut buf) = comment.take() {
                match rest.find("*/") {
                    Some(i) => {
                        buf.push_str(&rest[..i]);
                        label = normalize_label(&buf);
                        rest = &rest[i + 2..];
                    }
                    None => {
                        buf.push_str(rest);
                        buf.push(' ');
                        comment = Some(buf);
                        break;
                    }
                }
            } else {
                let trimmed = rest.trim();
                if let Some(after) = trimmed.strip_prefix("/*") {
                    comment = Some(String::new());
                    rest = after;
                    continue;
                }
                if !trimmed.is_empty() && !trimmed.starts_with("//") {
                    queries.push(QueryLine {
                        query: trimmed.to_string(),
                        label: label.take(),
                    });
                }
                break;
            }
        }
    }
    queries
}

/// Read and parse a query file.
pub fn read_queries(path: &Path) -> io::Result<Vec<QueryLine>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_queries(&text))
}

/// Combine several queries into the contents of a single query file, so they
/// are checked in one verifier invocation.
pub fn combine<I, S>(queries: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut combined = String::new();
    for q in queries {
        combined.push_str(q.as_ref());
        combined.push('\n');
    }
    // trim the last separator
    combined.pop();
    combined
}

/// A query written to a hidden file next to the model, for the duration of
/// one verifier invocation. The file is removed when the artifact is dropped.
#[derive(Debug)]
pub struct QueryArtifact {
    file: NamedTempFile,
}

impl QueryArtifact {
    /// Write `query` to a fresh file in the model's directory.
    pub fn create(model: &Path, query: &str, extension: &str) -> io::Result<Self> {
        let dir = match model.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let stem = model
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "query".to_string());
        let mut file = tempfile::Builder::new()
            .prefix(&format!(".{stem}-"))
            .suffix(&format!(".{extension}"))
            .tempfile_in(dir)?;
        file.write_all(query.as_bytes())?;
        file.flush()?;
        Ok(Self { file })
    }

    /// Path of the query file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
