// Where the catalog lives when no path is given.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable naming the catalog file.
pub const CATALOG_ENV: &str = "CASCO_CATALOG";

/// Catalog file name looked up in the working directory.
pub const LOCAL_CATALOG: &str = "casco.toml";

/// `<config dir>/casco/catalog.toml`, when the platform has a config dir.
pub fn user_catalog_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("casco").join("catalog.toml"))
}

/// Resolve the catalog path: explicit path, then `CASCO_CATALOG`, then
/// `./casco.toml`, then the user config dir.
///
/// An explicit or environment path is returned even if it does not exist,
/// so loading reports the real read error.
pub fn discover(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let from_env = std::env::var_os(CATALOG_ENV).map(PathBuf::from);
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    discover_in(explicit, from_env, &cwd, user_catalog_path())
}

pub(crate) fn discover_in(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    cwd: &Path,
    user_path: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
        log::debug!("catalog from {}: {}", CATALOG_ENV, path.display());
        return Ok(path);
    }

    let mut searched = vec![cwd.join(LOCAL_CATALOG)];
    searched.extend(user_path);
    match searched.iter().find(|p| p.is_file()) {
        Some(found) => Ok(found.clone()),
        None => Err(ConfigError::NotFound { searched }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = PathBuf::from("/tmp/x/catalog.toml");
        let found = discover_in(
            Some(&explicit),
            Some(PathBuf::from("/env/catalog.toml")),
            dir.path(),
            None,
        )
        .unwrap();
        assert_eq!(found, explicit);
    }

    #[test]
    fn env_before_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOCAL_CATALOG), "").unwrap();
        let found = discover_in(None, Some(PathBuf::from("/env/catalog.toml")), dir.path(), None).unwrap();
        assert_eq!(found, PathBuf::from("/env/catalog.toml"));
    }

    #[test]
    fn working_dir_before_user_dir() {
        let dir = tempfile::tempdir().unwrap();
        let user = dir.path().join("user.toml");
        std::fs::write(&user, "").unwrap();
        assert_eq!(
            discover_in(None, None, dir.path(), Some(user.clone())).unwrap(),
            user
        );

        std::fs::write(dir.path().join(LOCAL_CATALOG), "").unwrap();
        assert_eq!(
            discover_in(None, None, dir.path(), Some(user)).unwrap(),
            dir.path().join(LOCAL_CATALOG)
        );
    }

    #[test]
    fn nothing_found_lists_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_in(None, None, dir.path(), Some(dir.path().join("nope.toml"))).unwrap_err();
        match err {
            ConfigError::NotFound { searched } => assert_eq!(searched.len(), 2),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
