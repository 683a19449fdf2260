//! The job-key index: `KEY` and `ID` files under a results root.
//!
//! `KEY` maps opaque job keys to numeric job ids, one whitespace-separated
//! pair per line. `ID` holds the next id the simulator will allocate. Both
//! are owned by the simulator; this crate only rewrites them during
//! [merge](crate::insert).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

use crate::error::ResolveError;
use crate::resolve::{ID_FILE, KEY_INDEX};

/// Load the key -> id index from `<root>/KEY`.
///
/// An empty results tree has no `KEY` file yet; that case yields an empty
/// map with a warning rather than an error.
pub fn load_job_keys(root: &Path) -> Result<BTreeMap<String, u32>, ResolveError> {
    let path = root.join(KEY_INDEX);
    if !path.is_file() {
        warn!(
            results = %root.display(),
            "results directory has no KEY file, returning no job keys"
        );
        return Ok(BTreeMap::new());
    }

    let contents = fs::read_to_string(&path).map_err(|source| ResolveError::KeyIndexRead {
        path: path.clone(),
        source,
    })?;

    let mut keys = BTreeMap::new();
    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let entry = match (fields.next(), fields.next(), fields.next()) {
            (Some(key), Some(id), None) => id.parse::<u32>().ok().map(|id| (key, id)),
            _ => None,
        };
        let Some((key, id)) = entry else {
            return Err(ResolveError::MalformedKeyIndex {
                path,
                line: index + 1,
            });
        };
        keys.insert(key.to_string(), id);
    }
    Ok(keys)
}

/// Look up the job id for `key` in `<root>/KEY`.
pub fn job_id_for_key(root: &Path, key: &str) -> Result<u32, ResolveError> {
    let keys = load_job_keys(root)?;
    keys.get(key)
        .copied()
        .ok_or_else(|| ResolveError::UnknownJobKey {
            key: key.to_string(),
            results: root.to_path_buf(),
        })
}

/// Rewrite `<root>/KEY` and `<root>/ID` from `keys`.
///
/// Entries are written in ascending id order; `ID` becomes the highest id
/// plus one (or 1 when the map is empty). Both files are replaced via a temp
/// file and rename so readers never observe a partial index.
pub fn write_job_keys(root: &Path, keys: &BTreeMap<String, u32>) -> Result<()> {
    let mut entries: Vec<(&String, u32)> = keys.iter().map(|(key, id)| (key, *id)).collect();
    entries.sort_by_key(|(_, id)| *id);

    let mut index = String::new();
    for (key, id) in &entries {
        index.push_str(&format!("{key} {id}\n"));
    }
    write_atomic(&root.join(KEY_INDEX), &index)?;

    let next_id = entries.last().map_or(1, |(_, id)| id + 1);
    write_atomic(&root.join(ID_FILE), &format!("{next_id}\n"))?;
    Ok(())
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp index {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
