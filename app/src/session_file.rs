//! Persists the signed-in principal between invocations.
//!
//! A command-line process lives for one command, so the identity provider's
//! "restore the previous session" step is a JSON file in the user's home
//! directory. Loading it is what resolves the [`AuthSession`] at start-up.

use anyhow::Context;
use horizon_todo_core::identity::{AuthSession, Principal};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name under the home directory.
pub const SESSION_FILE_NAME: &str = ".horizon-todo-session.json";

/// Location of the session file: `$HOME`, falling back to the working directory.
#[must_use]
pub fn default_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(SESSION_FILE_NAME)
}

/// Reads the stored principal; a missing file means signed out.
///
/// # Errors
///
/// Returns error if the file exists but cannot be read or decoded.
pub fn load(path: &Path) -> anyhow::Result<Option<Principal>> {
    match std::fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text)
            .map(Some)
            .with_context(|| format!("corrupt session file {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Writes `principal`, replacing any stored one.
///
/// The file holds bearer credentials, so on unix it is readable by its owner
/// only, including when an older file with wider permissions is replaced.
///
/// # Errors
///
/// Returns error if the file cannot be written.
pub fn save(path: &Path, principal: &Principal) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(principal)?;
    let context = || format!("failed to write {}", path.display());

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).with_context(context)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .with_context(context)?;
    }
    file.write_all(text.as_bytes()).with_context(context)
}

/// Saves the session's principal if it differs from `restored`.
///
/// Token refreshes during a command replace the principal; this keeps the
/// file in step so the next invocation starts from the new tokens.
///
/// # Errors
///
/// Returns error if the file cannot be written.
pub fn persist_changes(
    session: &AuthSession,
    restored: Option<&Principal>,
    path: &Path,
) -> anyhow::Result<()> {
    match session.snapshot() {
        Some(current) if restored != Some(&current) => {
            tracing::debug!(uid = %current.uid, "saving refreshed session");
            save(path, &current)
        }
        _ => Ok(()),
    }
}

/// Forgets the stored principal.
///
/// # Errors
///
/// Returns error if the file exists but cannot be removed.
pub fn clear(path: &Path) -> anyhow::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}

/// Resolves `session` from the file at `path`.
///
/// # Errors
///
/// Returns error if the file exists but cannot be read or decoded.
pub fn restore(session: &AuthSession, path: &Path) -> anyhow::Result<()> {
    let principal = load(path)?;
    tracing::debug!(signed_in = principal.is_some(), "restored session");
    session.publish(principal);
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use horizon_todo_testing::fixtures::principal;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("horizon-todo-{name}-{}.json", std::process::id()))
    }

    #[tokio::test]
    async fn save_then_restore_resolves_session() {
        let path = temp_path("roundtrip");
        save(&path, &principal("u1")).unwrap();

        let session = AuthSession::new();
        restore(&session, &path).unwrap();
        assert_eq!(session.current().await, Some(principal("u1")));

        clear(&path).unwrap();
        assert_eq!(load(&path).unwrap(), None);
    }

    #[tokio::test]
    async fn missing_file_resolves_signed_out() {
        let path = temp_path("missing");
        clear(&path).unwrap();

        let session = AuthSession::new();
        restore(&session, &path).unwrap();
        assert!(session.is_resolved());
        assert_eq!(session.current().await, None);
    }

    #[cfg(unix)]
    #[test]
    fn saved_credentials_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let path = temp_path("mode");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        save(&path, &principal("u1")).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(load(&path).unwrap(), Some(principal("u1")));
        clear(&path).unwrap();
    }

    #[test]
    fn refreshed_principal_is_written_back() {
        let path = temp_path("refreshed");
        let restored = principal("u1");
        save(&path, &restored).unwrap();

        let session = AuthSession::resolved(Some(restored.clone()));
        persist_changes(&session, Some(&restored), &path).unwrap();
        assert_eq!(load(&path).unwrap(), Some(restored.clone()));

        let refreshed = restored.clone().with_id_token("fresh-token");
        session.publish(Some(refreshed.clone()));
        persist_changes(&session, Some(&restored), &path).unwrap();
        assert_eq!(load(&path).unwrap(), Some(refreshed));
        clear(&path).unwrap();
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{not json").unwrap();
        assert!(load(&path).is_err());
        clear(&path).unwrap();
    }
}
