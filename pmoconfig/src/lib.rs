//! # PMOMusic Configuration Module
//!
//! Configuration du gestionnaire de files d'attente :
//! - chargement d'un fichier `config.yaml`
//! - fusion avec la configuration par défaut intégrée au binaire
//! - surcharge par variables d'environnement (`PMOMUSIC_CONFIG__SECTION__CLE=valeur`)
//! - accesseurs typés avec valeur par défaut
//!
//! Il n'y a pas d'instance globale : le binaire charge une [`Config`] au
//! démarrage et la passe (dans un `Arc`) aux crates qui en ont besoin, via
//! leurs traits d'extension (`PlaylistConfigExt`, `AudioCacheConfigExt`, ...).
//!
//! ## Usage
//!
//! ```no_run
//! use pmoconfig::Config;
//!
//! let config = Config::load_config(None)?;
//! let window = config.get_usize(&["playlists", "prefetch_window"], 3);
//! let cache_dir = config.get_managed_dir(&["audio_cache", "directory"], "cache_audio")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, Result};
use dirs::home_dir;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};
use tracing::{debug, info};

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("pmomusic.yaml");

const ENV_CONFIG_DIR: &str = "PMOMUSIC_CONFIG";
const ENV_PREFIX: &str = "PMOMUSIC_CONFIG__";
const CONFIG_DIR_NAME: &str = ".pmomusic";

const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Configuration manager
///
/// The YAML tree lives behind a mutex; every setter writes the whole tree
/// back to `config.yaml` so that values chosen at runtime (managed
/// directories, for instance) survive a restart.
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    path: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: Option<&Path>) -> PathBuf {
        if let Some(dir) = directory {
            return dir.to_path_buf();
        }

        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        let local = Path::new(CONFIG_DIR_NAME);
        if local.exists() {
            return local.to_path_buf();
        }

        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config;
            }
        }

        local.to_path_buf()
    }

    /// Creates the directory if needed and checks that it is writable
    fn validate_config_dir(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        if !path.is_dir() {
            return Err(anyhow!("{} n'est pas un répertoire", path.display()));
        }

        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        Ok(())
    }

    /// Loads the configuration
    ///
    /// The directory is searched in the following order:
    /// 1. `directory` if given
    /// 2. the `PMOMUSIC_CONFIG` environment variable
    /// 3. `.pmomusic` in the current directory
    /// 4. `.pmomusic` in the user's home directory
    ///
    /// The embedded defaults are merged with `config.yaml` (if present),
    /// keys are lower-cased, `PMOMUSIC_CONFIG__*` overrides are applied and
    /// the merged tree is written back.
    pub fn load_config(directory: Option<&Path>) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        Self::validate_config_dir(&config_dir)?;
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join("config.yaml");

        let mut value = lower_keys(serde_yaml::from_str(DEFAULT_CONFIG)?);
        match fs::read(&path) {
            Ok(data) => {
                info!(config_file = %path.display(), "Loaded config file");
                // Keys are compared lower-cased on both sides of the merge
                let external = lower_keys(serde_yaml::from_slice(&data)?);
                merge_yaml(&mut value, &external);
            }
            Err(_) => {
                info!(config_file = %path.display(), "Config file not found, using embedded defaults");
            }
        }

        apply_overrides(&mut value, env::vars());

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(value),
        };
        config.save()?;
        Ok(config)
    }

    /// Directory holding `config.yaml`, used to resolve relative paths
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn data(&self) -> MutexGuard<'_, Value> {
        self.data.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Writes the current tree to `config.yaml`
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data())?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a value (e.g. `&["playlists", "prefetch_window"]`) and saves
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        set_value_internal(&mut self.data(), path, value)?;
        self.save()
    }

    /// Gets the raw YAML value stored at `path`
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        get_value_internal(&self.data(), path)
    }

    /// Deserializes the value at `path`, falling back to `default` when the
    /// key is missing or has the wrong shape
    pub fn get_or<T: DeserializeOwned>(&self, path: &[&str], default: T) -> T {
        match self.get_value(path) {
            Ok(value) => match serde_yaml::from_value(value) {
                Ok(v) => v,
                Err(err) => {
                    debug!(key = %path.join("."), error = %err, "Invalid config value, using default");
                    default
                }
            },
            Err(_) => default,
        }
    }

    pub fn get_usize(&self, path: &[&str], default: usize) -> usize {
        self.get_or(path, default)
    }

    pub fn get_u64(&self, path: &[&str], default: u64) -> u64 {
        self.get_or(path, default)
    }

    pub fn get_f64(&self, path: &[&str], default: f64) -> f64 {
        self.get_or(path, default)
    }

    pub fn get_bool(&self, path: &[&str], default: bool) -> bool {
        self.get_or(path, default)
    }

    pub fn get_string(&self, path: &[&str], default: &str) -> String {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => default.to_string(),
        }
    }

    pub fn set_usize(&self, path: &[&str], value: usize) -> Result<()> {
        self.set_value(path, Value::Number(Number::from(value as u64)))
    }

    pub fn set_bool(&self, path: &[&str], value: bool) -> Result<()> {
        self.set_value(path, Value::Bool(value))
    }

    /// Récupère un répertoire géré par la configuration
    ///
    /// Le répertoire peut être absolu ou relatif au répertoire de
    /// configuration. Il est créé s'il n'existe pas ; si la clé est absente,
    /// `default` est enregistré dans la configuration.
    ///
    /// ```no_run
    /// # let config = pmoconfig::Config::load_config(None)?;
    /// let dir = config.get_managed_dir(&["playlists", "directory"], "playlists")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<PathBuf> {
        let dir = match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => {
                self.set_managed_dir(path, default)?;
                default.to_string()
            }
        };
        self.resolve_and_create_dir(&dir)
    }

    /// Définit un répertoire géré (absolu ou relatif au répertoire de configuration)
    pub fn set_managed_dir(&self, path: &[&str], directory: &str) -> Result<()> {
        self.set_value(path, Value::String(directory.to_string()))
    }

    fn resolve_and_create_dir(&self, dir: &str) -> Result<PathBuf> {
        let path = Path::new(dir);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        };

        if !absolute.exists() {
            fs::create_dir_all(&absolute)?;
            info!(directory = %absolute.display(), "Created managed directory");
        }

        Ok(absolute)
    }

    /// Niveau de log minimum (`host.logger.min_level`)
    pub fn get_log_min_level(&self) -> String {
        self.get_string(&["host", "logger", "min_level"], DEFAULT_LOG_MIN_LEVEL)
    }

    pub fn set_log_min_level(&self, level: &str) -> Result<()> {
        self.set_value(
            &["host", "logger", "min_level"],
            Value::String(level.to_string()),
        )
    }

    pub fn get_log_enable_console(&self) -> bool {
        self.get_bool(
            &["host", "logger", "enable_console"],
            DEFAULT_LOG_ENABLE_CONSOLE,
        )
    }
}

fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((head, rest)) = path.split_first() else {
        *data = value;
        return Ok(());
    };

    let Value::Mapping(map) = data else {
        return Err(anyhow!("Current node is not a map"));
    };

    let key = Value::String(head.to_lowercase());
    if rest.is_empty() {
        map.insert(key, value);
        Ok(())
    } else {
        let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
        set_value_internal(entry, rest, value)
    }
}

fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
    let mut current = data;
    for (i, key) in path.iter().enumerate() {
        let Value::Mapping(map) = current else {
            return Err(anyhow!("Path {} is not a map", path[..i].join(".")));
        };
        current = map
            .get(&Value::String(key.to_lowercase()))
            .ok_or_else(|| anyhow!("Path {} does not exist", path[..=i].join(".")))?;
    }
    Ok(current.clone())
}

/// Applies `PMOMUSIC_CONFIG__A__B=value` pairs onto the tree
///
/// Values are parsed as YAML scalars, so `3` becomes a number and `true` a
/// boolean.
fn apply_overrides<I>(config: &mut Value, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    for (key, raw) in vars {
        let Some(stripped) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let key_path: Vec<&str> = stripped.split("__").collect();
        let value = serde_yaml::from_str::<Value>(&raw).unwrap_or(Value::String(raw.clone()));
        if let Err(err) = set_value_internal(config, &key_path, value) {
            debug!(key = %key, error = %err, "Ignoring env override");
        }
    }
}

fn lower_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lower_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys).collect()),
        other => other,
    }
}

/// Merges `external` into `default`: mappings are merged key by key,
/// scalars and sequences are replaced
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_replaces_scalars_and_keeps_siblings() {
        let mut base: Value = serde_yaml::from_str("a: {x: 1, y: 2}\nb: [1, 2]").unwrap();
        let ext: Value = serde_yaml::from_str("a: {y: 5}\nb: [9]").unwrap();
        merge_yaml(&mut base, &ext);

        assert_eq!(get_value_internal(&base, &["a", "x"]).unwrap(), Value::from(1));
        assert_eq!(get_value_internal(&base, &["a", "y"]).unwrap(), Value::from(5));
        assert_eq!(
            get_value_internal(&base, &["b"]).unwrap(),
            serde_yaml::from_str::<Value>("[9]").unwrap()
        );
    }

    #[test]
    fn overrides_parse_scalars_and_ignore_foreign_vars() {
        let mut base: Value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        apply_overrides(
            &mut base,
            vec![
                ("PMOMUSIC_CONFIG__PLAYLISTS__PREFETCH_WINDOW".into(), "5".into()),
                ("PMOMUSIC_CONFIG__PLAYER__NEW_KEY".into(), "hello".into()),
                ("HOME".into(), "/root".into()),
            ],
        );

        assert_eq!(
            get_value_internal(&base, &["playlists", "prefetch_window"]).unwrap(),
            Value::from(5)
        );
        assert_eq!(
            get_value_internal(&base, &["player", "new_key"]).unwrap(),
            Value::from("hello")
        );
        assert!(get_value_internal(&base, &["home"]).is_err());
    }

    #[test]
    fn keys_are_lowercased_recursively() {
        let value: Value = serde_yaml::from_str("Host: {Logger: {MIN_LEVEL: debug}}").unwrap();
        let value = lower_keys(value);
        assert_eq!(
            get_value_internal(&value, &["host", "logger", "min_level"]).unwrap(),
            Value::from("debug")
        );
    }
}
