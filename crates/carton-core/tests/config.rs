use carton_core::config::{dirs_path, GlobalConfig};
use carton_util::errors::CartonError;

#[test]
fn test_global_config_default_jobs() {
    let config = GlobalConfig::default();
    assert_eq!(config.resolve.jobs, 8);
}

#[test]
fn test_global_config_default_cache_dir() {
    let config = GlobalConfig::default();
    assert_eq!(config.git.cache_dir, "~/.carton/repositories");
    assert!(config.git.cache_path().ends_with(".carton/repositories"));
    assert_eq!(config.git.github_url, "https://github.com");
}

#[test]
fn test_global_config_defaults_from_empty_toml() {
    let config: GlobalConfig = toml::from_str("").unwrap();
    assert_eq!(config.resolve.jobs, 8);
}

#[test]
fn test_dirs_path_contains_carton() {
    assert!(dirs_path().ends_with(".carton"));
}

#[test]
fn test_global_config_parse_from_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[resolve]
jobs = 2

[git]
cache-dir = "/custom/repos"
github-url = "https://mirror.example.com"
"#,
    )
    .unwrap();
    let config = GlobalConfig::load_from(&path).unwrap();
    assert_eq!(config.resolve.jobs, 2);
    assert_eq!(config.git.cache_path(), std::path::PathBuf::from("/custom/repos"));
    assert_eq!(config.git.github_url, "https://mirror.example.com");
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = GlobalConfig::load_from(&tmp.path().join("absent.toml")).unwrap();
    assert_eq!(config.resolve.jobs, 8);
}

#[test]
fn test_zero_jobs_rejected() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[resolve]\njobs = 0\n").unwrap();
    assert!(matches!(
        GlobalConfig::load_from(&path),
        Err(CartonError::Config { .. })
    ));
}
