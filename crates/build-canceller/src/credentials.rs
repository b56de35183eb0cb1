//! Bearer token resolution.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Where the bearer token for a sweep came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Supplied explicitly by configuration.
    Configured,
    /// Read from a mounted service account token file.
    ServiceAccount(PathBuf),
    /// Nothing available; requests go out with an empty bearer token.
    Anonymous,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configured => write!(f, "configured token"),
            Self::ServiceAccount(path) => write!(f, "service account token {}", path.display()),
            Self::Anonymous => write!(f, "no token"),
        }
    }
}

/// A resolved bearer token and its origin.
#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: String,
    pub source: CredentialSource,
}

// Keep the token itself out of logs.
impl std::fmt::Debug for ResolvedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedToken")
            .field("token", &if self.token.is_empty() { "" } else { "***" })
            .field("source", &self.source)
            .finish()
    }
}

/// Resolve the bearer token for a sweep.
///
/// A non-empty `configured` token always wins and is returned verbatim.
/// Otherwise the token file at `token_path` is read once. If the file is
/// missing or unreadable the token is empty and the server decides what an
/// unauthenticated caller may do.
pub fn resolve_token(configured: &str, token_path: &Path) -> ResolvedToken {
    if !configured.is_empty() {
        debug!("Using configured auth token");
        return ResolvedToken {
            token: configured.to_string(),
            source: CredentialSource::Configured,
        };
    }

    match std::fs::read_to_string(token_path) {
        Ok(contents) => {
            let token = contents.trim().to_string();
            if token.is_empty() {
                warn!(path = %token_path.display(), "Service account token file is empty");
                return ResolvedToken {
                    token,
                    source: CredentialSource::Anonymous,
                };
            }
            debug!(path = %token_path.display(), "Using service account token");
            ResolvedToken {
                token,
                source: CredentialSource::ServiceAccount(token_path.to_path_buf()),
            }
        }
        Err(e) => {
            debug!(
                path = %token_path.display(),
                error = %e,
                "No service account token available"
            );
            ResolvedToken {
                token: String::new(),
                source: CredentialSource::Anonymous,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_configured_token_wins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "ambient-token").unwrap();

        let resolved = resolve_token("explicit-token", file.path());
        assert_eq!(resolved.token, "explicit-token");
        assert_eq!(resolved.source, CredentialSource::Configured);
    }

    #[test]
    fn test_configured_token_is_used_verbatim() {
        let resolved = resolve_token("  padded token\n", Path::new("/nonexistent/token"));
        assert_eq!(resolved.token, "  padded token\n");
    }

    #[test]
    fn test_falls_back_to_service_account_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "sa-token").unwrap();

        let resolved = resolve_token("", file.path());
        assert_eq!(resolved.token, "sa-token");
        assert_eq!(
            resolved.source,
            CredentialSource::ServiceAccount(file.path().to_path_buf())
        );
    }

    #[test]
    fn test_missing_file_yields_empty_token() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_token("", &dir.path().join("token"));
        assert!(resolved.token.is_empty());
        assert_eq!(resolved.source, CredentialSource::Anonymous);
    }

    #[test]
    fn test_empty_file_yields_empty_token() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let resolved = resolve_token("", file.path());
        assert!(resolved.token.is_empty());
        assert_eq!(resolved.source, CredentialSource::Anonymous);
    }

    #[test]
    fn test_debug_redacts_token() {
        let resolved = resolve_token("secret", Path::new("/nonexistent"));
        let rendered = format!("{resolved:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("***"));
    }
}
