use std::collections::BTreeMap;

use futures_util::{StreamExt, TryStreamExt, stream};
use gitcms_core::{EntryType, GitlabClient, GitlabError, TreeEntry};
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_FETCH_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Entry {
    pub path: String,
    pub raw: String,
    pub data: BTreeMap<String, String>,
    pub body: String,
}

impl Entry {
    pub fn parse(path: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let (data, body) = split_front_matter(&raw);
        Self {
            path: path.into(),
            raw,
            data,
            body,
        }
    }
}

pub(crate) async fn materialize_blobs(
    client: &GitlabClient,
    reference: &str,
    entries: &[TreeEntry],
    concurrency: usize,
) -> Result<Vec<Entry>, GitlabError> {
    let paths = entries
        .iter()
        .filter(|entry| entry.entry_type == EntryType::Blob)
        .map(|entry| entry.path.clone())
        .collect();
    fetch_paths(client, reference, paths, concurrency).await
}

pub(crate) async fn fetch_paths(
    client: &GitlabClient,
    reference: &str,
    paths: Vec<String>,
    concurrency: usize,
) -> Result<Vec<Entry>, GitlabError> {
    stream::iter(paths.into_iter().map(|path| {
        let client = client.clone();
        let reference = reference.to_string();
        async move {
            let raw = client.raw_file(&path, &reference).await?;
            Ok(Entry::parse(path, raw))
        }
    }))
    .buffered(concurrency.max(1))
    .try_collect()
    .await
}

fn split_front_matter(raw: &str) -> (BTreeMap<String, String>, String) {
    let Some(after_open) = raw.strip_prefix("---\n") else {
        return (BTreeMap::new(), raw.to_string());
    };
    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let data = after_open[..offset]
                .lines()
                .filter_map(scalar_field)
                .collect();
            let body = &after_open[offset + line.len()..];
            return (data, body.to_string());
        }
        offset += line.len();
    }
    (BTreeMap::new(), raw.to_string())
}

fn scalar_field(line: &str) -> Option<(String, String)> {
    if line.starts_with(' ') || line.starts_with('\t') {
        return None;
    }
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key.to_string(), unquote(value).to_string()))
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    if value.len() >= 2 {
        let quoted_double = value.starts_with('"') && value.ends_with('"');
        let quoted_single = value.starts_with('\'') && value.ends_with('\'');
        if quoted_double || quoted_single {
            return &value[1..value.len() - 1];
        }
    }
    value
}
