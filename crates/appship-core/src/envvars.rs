use indexmap::IndexMap;

/// String key/value pairs from an `env_variables` or `build_env_variables`
/// block. Iteration follows insertion order so rewritten manifests stay
/// readable.
pub type EnvVarBlock = IndexMap<String, String>;

/// Combine a manifest's existing block with caller overrides.
///
/// Existing keys keep their position; overridden keys take the override's
/// value, new keys are appended in override order. An absent block is treated
/// as empty.
pub fn merge(existing: Option<&EnvVarBlock>, overrides: &EnvVarBlock) -> EnvVarBlock {
    let mut merged = match existing {
        Some(block) => block.clone(),
        None => EnvVarBlock::new(),
    };
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Parse `KEY=VALUE` pairs separated by commas or newlines.
///
/// Only the first `=` separates key from value. Blank entries are skipped; a
/// later duplicate key replaces the earlier value.
pub fn parse_pairs(raw: &str) -> crate::Result<EnvVarBlock> {
    let mut block = EnvVarBlock::new();
    for entry in raw.split([',', '\n']) {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| crate::Error::InvalidEnvPair {
                pair: entry.to_owned(),
                reason: "expected KEY=VALUE",
            })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(crate::Error::InvalidEnvPair {
                pair: entry.to_owned(),
                reason: "key is empty",
            });
        }

        block.insert(key.to_owned(), value.trim().to_owned());
    }
    Ok(block)
}
