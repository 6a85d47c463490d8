use crate::error::{ErrorKind, Result};
use crate::{Config, ENV_PREFIX, Overrides};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::path::{Path, PathBuf};

const FILE_STEM: &str = "config";
const EXTENSIONS: [&str; 4] = ["toml", "yaml", "yml", "json"];

/// Platform config directory, e.g. `~/.config/bilicache` on Linux.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "bilicache").map(|dirs| dirs.config_dir().to_path_buf())
}

impl Config {
    /// Merges every layer and validates the result.
    ///
    /// `file` replaces the search of [`config_dir`]; unlike the default
    /// location, an explicit file that doesn't exist is an error.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let config: Config = Self::figment(file)?
            .merge(Serialized::defaults(overrides))
            .extract()
            .map_err(|e| exn::Exn::from(ErrorKind::Invalid(e.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    fn figment(file: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match file {
            Some(path) => {
                if !path.is_file() {
                    exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
                }
                figment = merge_file(figment, path)?;
            },
            None => {
                for path in config_dir().into_iter().flat_map(|dir| EXTENSIONS.map(|ext| dir.join(format!("{FILE_STEM}.{ext}")))) {
                    if path.is_file() {
                        tracing::debug!(path = %path.display(), "Loading config file");
                        figment = merge_file(figment, &path)?;
                    }
                }
            },
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Rejects values that would only fail later, mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            exn::bail!(ErrorKind::Validation("`jobs` must be at least 1"));
        }
        if self.naming.max_length == 0 {
            exn::bail!(ErrorKind::Validation("`naming.max_length` must be at least 1"));
        }
        if self.patch.magic.is_empty() {
            exn::bail!(ErrorKind::Validation("`patch.magic` must not be empty"));
        }
        let extension = self.transcoder.extension.trim_matches('.');
        if extension.is_empty() || extension.contains(['/', '\\']) {
            exn::bail!(ErrorKind::Validation("`transcoder.extension` must be a file extension"));
        }
        if self.transcoder.timeout == 0 {
            exn::bail!(ErrorKind::Validation("`transcoder.timeout` must be at least 1 second"));
        }
        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}
