use std::fmt;

/// Repository path is missing or does not point at a git repository.
#[derive(Debug, Clone)]
pub struct PathError(pub String);

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for PathError {}

/// Revision resolution, object read, or diff computation failure.
#[derive(Debug, Clone)]
pub struct GitError(pub String);

impl fmt::Display for GitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for GitError {}

impl From<git2::Error> for GitError {
    fn from(value: git2::Error) -> Self {
        GitError(value.message().to_string())
    }
}

/// Invalid pattern or malformed Config combination.
#[derive(Debug, Clone)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConfigError {}

impl From<ignore::Error> for ConfigError {
    fn from(value: ignore::Error) -> Self {
        ConfigError(value.to_string())
    }
}

/// Pattern-group YAML failed to parse.
#[derive(Debug, Clone)]
pub struct YamlError(pub String);

impl fmt::Display for YamlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for YamlError {}

impl From<serde_yaml::Error> for YamlError {
    fn from(value: serde_yaml::Error) -> Self {
        YamlError(value.to_string())
    }
}

/// FileRecovery failed to extract a blob.
#[derive(Debug, Clone)]
pub struct RecoveryError(pub String);

impl fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RecoveryError {}

impl From<std::io::Error> for RecoveryError {
    fn from(value: std::io::Error) -> Self {
        RecoveryError(value.to_string())
    }
}

impl From<git2::Error> for RecoveryError {
    fn from(value: git2::Error) -> Self {
        RecoveryError(value.message().to_string())
    }
}

/// Transport failure, cancellation, or other unexpected runtime fault.
#[derive(Debug, Clone)]
pub struct RuntimeError(pub String);

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for RuntimeError {}

impl RuntimeError {
    pub fn cancelled() -> Self {
        RuntimeError("operation cancelled".to_string())
    }
}

impl From<reqwest::Error> for RuntimeError {
    fn from(value: reqwest::Error) -> Self {
        RuntimeError(value.to_string())
    }
}

/// A resolved revision lies beyond the shallow-clone boundary.
#[derive(Debug, Clone)]
pub struct ShallowCloneError {
    pub missing_endpoint: String,
}

impl fmt::Display for ShallowCloneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "revision `{}` lies beyond the shallow clone boundary",
            self.missing_endpoint
        )
    }
}

impl std::error::Error for ShallowCloneError {}

/// Abstract parent of every error this crate raises.
#[derive(Debug, Clone)]
pub enum LeChangeError {
    Path(PathError),
    Git(GitError),
    Config(ConfigError),
    Yaml(YamlError),
    Recovery(RecoveryError),
    Runtime(RuntimeError),
    ShallowClone(ShallowCloneError),
}

impl fmt::Display for LeChangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeChangeError::Path(e) => write!(f, "{e}"),
            LeChangeError::Git(e) => write!(f, "{e}"),
            LeChangeError::Config(e) => write!(f, "{e}"),
            LeChangeError::Yaml(e) => write!(f, "{e}"),
            LeChangeError::Recovery(e) => write!(f, "{e}"),
            LeChangeError::Runtime(e) => write!(f, "{e}"),
            LeChangeError::ShallowClone(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LeChangeError {}

macro_rules! impl_from_leaf {
    ($leaf:ty, $variant:ident) => {
        impl From<$leaf> for LeChangeError {
            fn from(value: $leaf) -> Self {
                LeChangeError::$variant(value)
            }
        }
    };
}

impl_from_leaf!(PathError, Path);
impl_from_leaf!(GitError, Git);
impl_from_leaf!(ConfigError, Config);
impl_from_leaf!(YamlError, Yaml);
impl_from_leaf!(RecoveryError, Recovery);
impl_from_leaf!(RuntimeError, Runtime);
impl_from_leaf!(ShallowCloneError, ShallowClone);
