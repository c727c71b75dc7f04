use std::collections::BTreeMap;

use serde::{Deserialize, de::DeserializeOwned};

use crate::{Error, Result};

/// Deserialize the top-level block `key` of `doc` into `T`.
///
/// A missing block yields `T::default()`.
pub fn section<T>(doc: &serde_json::Value, key: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match doc.get(key) {
        None | Some(serde_json::Value::Null) => Ok(T::default()),
        Some(value) => T::deserialize(value).map_err(|e| Error::section(key, e)),
    }
}

/// Collect the `enable` flag of every top-level block.
///
/// Blocks without the flag count as disabled. Top-level values that are not
/// tables are ignored.
pub fn enabled_blocks(doc: &serde_json::Value) -> Result<BTreeMap<String, bool>> {
    let Some(root) = doc.as_object() else {
        return Err(Error::Message(
            "config document must be a table at the top level".into(),
        ));
    };

    let mut enabled = BTreeMap::new();
    for (name, block) in root {
        let Some(block) = block.as_object() else {
            continue;
        };
        let flag = match block.get("enable") {
            None => false,
            Some(value) => bool::deserialize(value).map_err(|e| Error::section(name, e))?,
        };
        enabled.insert(name.clone(), flag);
    }
    Ok(enabled)
}
