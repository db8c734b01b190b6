use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ForensicateError {
    #[error("Cannot read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read stdin: {source}")]
    StdinRead {
        #[source]
        source: std::io::Error,
    },

    #[error("stdin input exceeds 64 MiB size limit")]
    StdinTooLarge,

    #[error("input file '{path}' exceeds 64 MiB size limit")]
    FileTooLarge { path: PathBuf },

    #[error("Cannot parse config at '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config: {0}")]
    ConfigInvalid(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Cannot write output to '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "community")]
    #[error("community rule fetch failed: {0}")]
    CommunityFetch(String),

    #[cfg(feature = "community")]
    #[error("community rule validation failed for '{id}': {reason}")]
    CommunityValidation { id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ForensicateError>;

impl ForensicateError {
    /// Fails if `path` already exists as a symlink, so a caller writing
    /// output there never silently follows it onto an unintended target.
    pub fn guard_symlink(path: &str) -> Result<()> {
        match std::fs::symlink_metadata(path) {
            Ok(meta) if meta.file_type().is_symlink() => Err(ForensicateError::FileWrite {
                path: path.into(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "refusing to write through a symlink",
                ),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn guard_symlink_rejects_symlink_but_allows_plain_path() {
        use std::os::unix::fs::symlink;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target.txt");
        std::fs::write(&target, "original").unwrap();
        let link = dir.path().join("link.txt");
        symlink(&target, &link).unwrap();

        assert!(ForensicateError::guard_symlink(link.to_str().unwrap()).is_err());
        assert!(ForensicateError::guard_symlink(target.to_str().unwrap()).is_ok());

        let missing = dir.path().join("does-not-exist.txt");
        assert!(ForensicateError::guard_symlink(missing.to_str().unwrap()).is_ok());
    }
}

/// Exit codes for the CLI.
/// 0  = success (no positive finding, or finding below threshold)
/// 1  = I/O error
/// 2  = config / rule parse error
/// 10 = positive finding (used with --fail)
pub mod exit_code {
    #[allow(dead_code)]
    pub const SUCCESS: i32 = 0;
    pub const IO_ERROR: i32 = 1;
    pub const CONFIG_ERROR: i32 = 2;
    pub const FINDINGS: i32 = 10;
}
