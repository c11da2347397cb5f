//! Where the config file lives
//!
//! `MISSION_CONTROL_CONFIG` names the file outright. Otherwise the file is
//! looked up in `MISSION_CONTROL_CONFIG_DIR` (or the user config directory)
//! as `config.json`, `config.json5` or `config.toml`, first match wins.

use std::path::PathBuf;

use super::types::files::expand_home;

const CONFIG_FILE_ENV: &str = "MISSION_CONTROL_CONFIG";
const CONFIG_DIR_ENV: &str = "MISSION_CONTROL_CONFIG_DIR";
const APP_DIR: &str = "mission-control";

/// Candidate file names, in lookup order; the first is the default
const CONFIG_FILES: [&str; 3] = ["config.json", "config.json5", "config.toml"];

/// Directory searched for the config file
pub fn config_dir() -> PathBuf {
    config_dir_from(env_lookup)
}

/// Config file to load; may not exist
pub fn config_path() -> PathBuf {
    config_path_from(env_lookup)
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

pub(crate) fn config_dir_from<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return expand_home(&dir);
    }

    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .map(|base| base.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".mission-control"))
}

pub(crate) fn config_path_from<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = lookup(CONFIG_FILE_ENV).filter(|v| !v.is_empty()) {
        return expand_home(&path);
    }

    let dir = config_dir_from(&lookup);
    CONFIG_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| dir.join(CONFIG_FILES[0]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "").unwrap();
        let lookup = vars(&[
            (CONFIG_FILE_ENV, "/etc/mc/custom.toml"),
            (CONFIG_DIR_ENV, dir.path().to_str().unwrap()),
        ]);
        assert_eq!(config_path_from(lookup), PathBuf::from("/etc/mc/custom.toml"));
    }

    #[test]
    fn test_finds_existing_file_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        let lookup = vars(&[(CONFIG_DIR_ENV, dir.path().to_str().unwrap())]);

        // Nothing there yet: default name
        assert_eq!(config_path_from(&lookup), dir.path().join("config.json"));

        std::fs::write(dir.path().join("config.toml"), "").unwrap();
        assert_eq!(config_path_from(&lookup), dir.path().join("config.toml"));

        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        assert_eq!(config_path_from(&lookup), dir.path().join("config.json"));
    }

    #[test]
    fn test_empty_override_is_ignored() {
        let lookup = vars(&[(CONFIG_DIR_ENV, ""), (CONFIG_FILE_ENV, "")]);
        let dir = config_dir_from(&lookup);
        assert!(dir.ends_with(APP_DIR) || dir == PathBuf::from(".mission-control"));
        assert!(config_path_from(&lookup).starts_with(&dir));
    }
}
