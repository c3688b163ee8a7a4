//! App Engine manifest discovery and temporary rewriting.
//!
//! A deploy may list several deliverables (`app.yaml`, `cron.yaml`,
//! `dispatch.yaml`, ...). Only the service manifest declares both `runtime`
//! and `service`; [`find_manifest`] picks it out so environment overrides can
//! be written into it. Rewrites are undone by [`ManifestGuard`].

use crate::envvars::{self, EnvVarBlock};
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};

const REQUIRED_KEYS: [&str; 2] = ["runtime", "service"];

/// Manifest key holding runtime environment variables.
pub const ENV_VARIABLES_KEY: &str = "env_variables";

/// Manifest key holding build-time environment variables.
pub const BUILD_ENV_VARIABLES_KEY: &str = "build_env_variables";

/// Fail with [`crate::Error::DeliverableMissing`] for the first deliverable
/// that does not exist under `working_dir`.
pub fn ensure_deliverables_exist(working_dir: &Path, deliverables: &[String]) -> crate::Result<()> {
    for deliverable in deliverables {
        let path = working_dir.join(deliverable);
        if !path.exists() {
            return Err(crate::Error::DeliverableMissing {
                path: PathBuf::from(deliverable),
            });
        }
    }
    Ok(())
}

/// Return the first candidate whose content is a mapping with both `runtime`
/// and `service` keys.
///
/// Candidates are read concurrently, but selection follows the given order:
/// a valid candidate earlier in the list always wins over a later one.
/// Unreadable or unparseable candidates are skipped.
pub async fn find_manifest(candidates: &[PathBuf]) -> crate::Result<PathBuf> {
    let checks = candidates.iter().map(|path| is_service_manifest(path));
    let verdicts = futures::future::join_all(checks).await;

    candidates
        .iter()
        .zip(verdicts)
        .find_map(|(path, valid)| valid.then(|| path.clone()))
        .ok_or_else(|| crate::Error::ManifestNotFound {
            candidates: candidates.to_vec(),
        })
}

async fn is_service_manifest(path: &Path) -> bool {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "skipping unreadable deliverable");
            return false;
        }
    };

    match serde_yaml::from_str::<Value>(&content) {
        Ok(Value::Mapping(doc)) => REQUIRED_KEYS.iter().all(|key| doc.contains_key(*key)),
        Ok(_) => false,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "skipping unparseable deliverable");
            false
        }
    }
}

/// In-memory copy of a manifest plus the exact bytes it was loaded from.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    document: Mapping,
    original: Vec<u8>,
}

impl Manifest {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let original = std::fs::read(path).map_err(|e| crate::Error::ManifestRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let value: Value =
            serde_yaml::from_slice(&original).map_err(|e| crate::Error::ManifestParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        let Value::Mapping(document) = value else {
            return Err(crate::Error::ManifestShape {
                path: path.to_path_buf(),
            });
        };

        Ok(Self {
            path: path.to_path_buf(),
            document,
            original,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a string block such as `env_variables`. Scalar values that are
    /// not strings (numbers, booleans) are rendered as their YAML text.
    pub fn env_block(&self, key: &str) -> Option<EnvVarBlock> {
        let Some(Value::Mapping(block)) = self.document.get(key) else {
            return None;
        };

        Some(
            block
                .iter()
                .filter_map(|(k, v)| Some((scalar_to_string(k)?, scalar_to_string(v)?)))
                .collect(),
        )
    }

    /// Merge `overrides` into the block at `key`. An empty result removes the
    /// block instead of leaving `key: {}` behind.
    pub fn merge_env_block(&mut self, key: &str, overrides: &EnvVarBlock) {
        let merged = envvars::merge(self.env_block(key).as_ref(), overrides);

        if merged.is_empty() {
            self.document.remove(key);
            return;
        }

        let block: Mapping = merged
            .into_iter()
            .map(|(k, v)| (Value::String(k), Value::String(v)))
            .collect();
        self.document.insert(Value::String(key.to_owned()), Value::Mapping(block));
    }

    /// Write the current document to disk. The returned guard puts the
    /// original bytes back when restored or dropped.
    pub fn rewrite(self) -> crate::Result<ManifestGuard> {
        let rendered = serde_yaml::to_string(&Value::Mapping(self.document)).map_err(|e| {
            crate::Error::ManifestSerialize {
                path: self.path.clone(),
                source: e,
            }
        })?;

        // Hold the guard before writing so a partial write is still undone.
        let guard = ManifestGuard {
            path: self.path,
            original: Some(self.original),
        };

        std::fs::write(&guard.path, rendered).map_err(|e| crate::Error::ManifestWrite {
            path: guard.path.clone(),
            source: e,
        })?;

        tracing::info!(path = %guard.path.display(), "rewrote manifest with environment overrides");
        Ok(guard)
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Restores a rewritten manifest to its original bytes.
///
/// Call [`ManifestGuard::restore`] to observe restore failures; dropping the
/// guard restores as well and logs any failure.
#[derive(Debug)]
#[must_use = "dropping the guard restores the manifest immediately"]
pub struct ManifestGuard {
    path: PathBuf,
    original: Option<Vec<u8>>,
}

impl ManifestGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn restore(mut self) -> crate::Result<()> {
        self.restore_inner()
    }

    fn restore_inner(&mut self) -> crate::Result<()> {
        let Some(original) = self.original.take() else {
            return Ok(());
        };

        std::fs::write(&self.path, original).map_err(|e| crate::Error::ManifestWrite {
            path: self.path.clone(),
            source: e,
        })?;

        tracing::info!(path = %self.path.display(), "restored original manifest");
        Ok(())
    }
}

impl Drop for ManifestGuard {
    fn drop(&mut self) {
        // arch-lint: allow(no-error-swallowing) reason="drop cannot return an error; callers that need it use restore()"
        if let Err(e) = self.restore_inner() {
            tracing::error!(error = %e, "failed to restore manifest");
        }
    }
}
