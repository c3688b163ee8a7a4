use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Deliverables / manifest ──
    #[error(
        "Deliverable {path} can not be found. \
         Check `working_directory` and `deliverables` input paths."
    )]
    DeliverableMissing { path: PathBuf },

    #[error(
        "could not find an App Engine manifest (a file with `runtime` and `service` keys) in: {}",
        format_candidates(candidates)
    )]
    ManifestNotFound { candidates: Vec<PathBuf> },

    #[error("failed to read manifest {path}")]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}")]
    ManifestParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("manifest {path} is not a mapping at the top level")]
    ManifestShape { path: PathBuf },

    #[error("failed to serialize manifest {path}")]
    ManifestSerialize {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("failed to write manifest {path}")]
    ManifestWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Input validation ──
    #[error("invalid gcloud component {0:?}: expected \"alpha\" or \"beta\"")]
    InvalidChannel(String),

    #[error("invalid environment variable pair {pair:?}: {reason}")]
    InvalidEnvPair { pair: String, reason: &'static str },
}

/// Failure categories surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid caller input.
    Validation,
    /// A deliverable, manifest, or other required file is absent.
    NotFound,
    /// An external command or filesystem operation failed.
    Execution,
    /// Malformed JSON, YAML, or TOML.
    Parse,
    /// Well-formed output lacking required fields.
    MissingData,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidChannel(_) | Self::InvalidEnvPair { .. } => ErrorKind::Validation,
            Self::DeliverableMissing { .. } | Self::ManifestNotFound { .. } => ErrorKind::NotFound,
            Self::ConfigParse { .. }
            | Self::ManifestParse { .. }
            | Self::ManifestShape { .. }
            | Self::ManifestSerialize { .. } => ErrorKind::Parse,
            Self::ConfigLoad { .. } | Self::ManifestRead { .. } | Self::ManifestWrite { .. } => {
                ErrorKind::Execution
            }
        }
    }

    /// True for failures caused by caller input rather than the environment.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// True when a required file or manifest could not be located.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

fn format_candidates(candidates: &[PathBuf]) -> String {
    if candidates.is_empty() {
        "(none)".to_owned()
    } else {
        candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
