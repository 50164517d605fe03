//! Configuration loading and validation.
//!
//! Configuration is merged from, in increasing order of precedence:
//! 1. built-in defaults,
//! 2. `config.toml`, `config.yaml` or `config.json` in the platform
//!    configuration directory (e.g. `~/.config/shelf/` on Linux),
//! 3. a file passed explicitly (e.g. with `--config`), its format chosen by
//!    extension,
//! 4. environment variables prefixed with `SHELF_`, with `__` separating
//!    nested keys (e.g. `SHELF_DATABASE__PATH`).
//!
//! ```toml
//! lookup_timeout_secs = 10
//!
//! [[sources]]
//! kind = "google"
//! api_key = "..."
//!
//! [[sources]]
//! kind = "ndl"
//!
//! [database]
//! path = "/var/lib/shelf/shelf.sqlite"
//!
//! [assets]
//! path = "/var/lib/shelf/images"
//! url_prefix = "/images"
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "SHELF_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deadline for each metadata source lookup (and each cover download).
    pub lookup_timeout_secs: u64,
    /// Metadata sources, in order of precedence.
    pub sources: Vec<SourceConfig>,
    pub database: DatabaseConfig,
    pub assets: AssetsConfig,
}

/// A metadata source, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Google Books. Works without an API key, at a much lower rate limit.
    Google {
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        endpoint: Option<String>,
    },
    /// National Diet Library Search.
    Ndl {
        #[serde(default)]
        endpoint: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Directory covers are stored in. Must be absolute.
    pub path: PathBuf,
    /// Where `path` is served from over HTTP.
    pub url_prefix: String,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "shelf")
}

fn data_dir() -> PathBuf {
    project_dirs().map_or_else(|| PathBuf::from("."), |dirs| dirs.data_dir().to_path_buf())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lookup_timeout_secs: 10,
            sources: vec![
                SourceConfig::Google {
                    api_key: None,
                    endpoint: None,
                },
                SourceConfig::Ndl { endpoint: None },
            ],
            database: DatabaseConfig::default(),
            assets: AssetsConfig::default(),
        }
    }
}
impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("shelf.sqlite"),
        }
    }
}
impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("images"),
            url_prefix: "/images".to_string(),
        }
    }
}

impl Config {
    /// Load, merge and validate the configuration.
    ///
    /// `explicit` is an additional configuration file that must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_dir = project_dirs().map(|dirs| dirs.config_dir().to_path_buf());
        Self::load_from(config_dir.as_deref(), explicit)
    }

    /// Like [`load`](Self::load), looking for configuration files in
    /// `config_dir` instead of the platform configuration directory.
    pub fn load_from(config_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let config: Self = Self::figment(config_dir, explicit)?
            .extract()
            .or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dir) = config_dir {
            // Each of these is optional; `file_exact` fails on a missing file.
            let toml = dir.join("config.toml");
            let yaml = dir.join("config.yaml");
            let json = dir.join("config.json");
            if toml.is_file() {
                figment = figment.merge(Toml::file_exact(toml));
            }
            if yaml.is_file() {
                figment = figment.merge(Yaml::file_exact(yaml));
            }
            if json.is_file() {
                figment = figment.merge(Json::file_exact(json));
            }
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("toml") => figment.merge(Toml::file_exact(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn validate(&self) -> Result<()> {
        if self.lookup_timeout_secs == 0 {
            exn::bail!(ErrorKind::Invalid {
                field: "lookup_timeout_secs",
                reason: "must be greater than zero",
            });
        }
        if !self.assets.path.is_absolute() {
            exn::bail!(ErrorKind::Invalid {
                field: "assets.path",
                reason: "must be an absolute path",
            });
        }
        if self.sources.is_empty() {
            tracing::warn!("No metadata sources configured; every lookup will fail");
        }
        Ok(())
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn load(jail: &Jail, explicit: Option<&str>) -> Result<Config> {
        Config::load_from(Some(jail.directory()), explicit.map(Path::new))
    }

    #[test]
    fn test_defaults() {
        Jail::expect_with(|jail| {
            let config = load(jail, None).unwrap();
            assert_eq!(config.lookup_timeout(), Duration::from_secs(10));
            assert_eq!(config.sources.len(), 2);
            assert_eq!(config.assets.url_prefix, "/images");
            assert!(config.database.path.ends_with("shelf.sqlite"));
            Ok(())
        });
    }

    #[test]
    fn test_config_dir_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    lookup_timeout_secs = 3

                    [[sources]]
                    kind = "ndl"
                    endpoint = "http://localhost:8080"

                    [assets]
                    path = "/srv/covers"
                "#,
            )?;
            let config = load(jail, None).unwrap();
            assert_eq!(config.lookup_timeout_secs, 3);
            assert_eq!(
                config.sources,
                vec![SourceConfig::Ndl {
                    endpoint: Some("http://localhost:8080".to_string())
                }]
            );
            assert_eq!(config.assets.path, PathBuf::from("/srv/covers"));
            // Untouched nested keys keep their defaults.
            assert_eq!(config.assets.url_prefix, "/images");
            Ok(())
        });
    }

    #[test]
    fn test_missing_config_dir() {
        Jail::expect_with(|jail| {
            let config = Config::load_from(Some(&jail.directory().join("missing")), None).unwrap();
            assert_eq!(config.lookup_timeout_secs, 10);
            Ok(())
        });
    }

    #[rstest]
    #[case("config.toml", "lookup_timeout_secs = 4")]
    #[case("config.yaml", "lookup_timeout_secs: 4")]
    #[case("config.json", r#"{"lookup_timeout_secs": 4}"#)]
    fn test_single_config_dir_file(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file(name, contents)?;
            let config = load(jail, None).unwrap();
            assert_eq!(config.lookup_timeout_secs, 4);
            assert_eq!(config.assets.url_prefix, "/images");
            Ok(())
        });
    }

    #[rstest]
    #[case("shelf.toml", "[database]\npath = \"/tmp/explicit.sqlite\"")]
    #[case("shelf.yaml", "database:\n  path: /tmp/explicit.sqlite")]
    #[case("shelf.yml", "database:\n  path: /tmp/explicit.sqlite")]
    #[case("shelf.json", r#"{"database": {"path": "/tmp/explicit.sqlite"}}"#)]
    fn test_explicit_file_formats(#[case] name: &str, #[case] contents: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[database]\npath = \"/tmp/dir.sqlite\"")?;
            jail.create_file(name, contents)?;
            let config = load(jail, Some(name)).unwrap();
            assert_eq!(config.database.path, PathBuf::from("/tmp/explicit.sqlite"));
            Ok(())
        });
    }

    #[test]
    fn test_environment_wins() {
        Jail::expect_with(|jail| {
            jail.create_file("shelf.toml", "lookup_timeout_secs = 3")?;
            jail.set_env("SHELF_LOOKUP_TIMEOUT_SECS", "7");
            jail.set_env("SHELF_ASSETS__URL_PREFIX", "/covers");
            let config = load(jail, Some("shelf.toml")).unwrap();
            assert_eq!(config.lookup_timeout_secs, 7);
            assert_eq!(config.assets.url_prefix, "/covers");
            Ok(())
        });
    }

    #[test]
    fn test_google_source() {
        Jail::expect_with(|jail| {
            jail.create_file("config.yaml", "sources:\n  - kind: google\n    api_key: secret\n")?;
            let config = load(jail, None).unwrap();
            assert_eq!(
                config.sources,
                vec![SourceConfig::Google {
                    api_key: Some("secret".to_string()),
                    endpoint: None
                }]
            );
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        Jail::expect_with(|jail| {
            let err = load(jail, Some("missing.toml")).unwrap_err();
            assert!(matches!(&*err, ErrorKind::NotFound(_)));
            Ok(())
        });
    }

    #[test]
    fn test_unsupported_format() {
        Jail::expect_with(|jail| {
            jail.create_file("shelf.ini", "timeout=3")?;
            let err = load(jail, Some("shelf.ini")).unwrap_err();
            assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
            Ok(())
        });
    }

    #[rstest]
    #[case("lookup_timeout_secs = 0", "lookup_timeout_secs")]
    #[case("[assets]\npath = \"relative/images\"", "assets.path")]
    fn test_invalid(#[case] contents: &str, #[case] expected: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", contents)?;
            let err = load(jail, None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Invalid { field, .. } if *field == expected));
            Ok(())
        });
    }

    #[test]
    fn test_unknown_source_kind() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[[sources]]\nkind = \"amazon\"")?;
            let err = load(jail, None).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Load));
            Ok(())
        });
    }
}
