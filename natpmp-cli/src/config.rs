//! Configuration for the natpmp CLI.

use std::{
    env,
    net::Ipv4Addr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use tracing::debug;

const ENV_CONFIG_DIR: &str = "NATPMP_CONFIG_DIR";
const ENV_GATEWAY: &str = "NATPMP_GATEWAY";
const ENV_ATTEMPTS: &str = "NATPMP_ATTEMPTS";

/// CONFIG_FILE_NAME is the name of the optional config file located in the natpmp config directory
pub(crate) const CONFIG_FILE_NAME: &str = "natpmp.config.toml";

/// Name of directory that wraps all natpmp files in a given application directory
const NATPMP_DIR: &str = "natpmp";

/// Defaults used by every command.
#[derive(PartialEq, Eq, Debug, Deserialize, Clone)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct CliConfig {
    /// Gateway to contact. Discovered from the routing table when unset.
    pub(crate) gateway: Option<Ipv4Addr>,
    /// Number of times a request is sent before giving up.
    pub(crate) attempts: u32,
    /// Base of the per attempt timeout, in milliseconds.
    pub(crate) retry_increment_ms: u64,
    /// Lifetime of new mappings, in seconds.
    pub(crate) lifetime: u32,
    /// Ignore responses with an unknown protocol version.
    pub(crate) strict_version: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        let defaults = natpmp::Config::default();
        Self {
            gateway: None,
            attempts: defaults.max_attempts,
            retry_increment_ms: defaults.retry_increment.as_millis() as u64,
            lifetime: natpmp::client::DEFAULT_LIFETIME_SECONDS,
            strict_version: defaults.strict_version,
        }
    }
}

impl CliConfig {
    /// Creates a config from default config file.
    ///
    /// If the *file* is `Some` the configuration will be read from it.  Otherwise the
    /// default config file will be loaded.  If that is not present the default config will
    /// be used. Environment variables override the values of the file.
    pub(crate) async fn load(file: Option<&Path>) -> Result<CliConfig> {
        Self::load_with_env(file, |key| match env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(e.into()),
        })
        .await
    }

    /// Like [`CliConfig::load`], reading environment variables with `var`.
    async fn load_with_env(
        file: Option<&Path>,
        var: impl Fn(&str) -> Result<Option<String>>,
    ) -> Result<CliConfig> {
        let config_file = match file {
            Some(file) => Some(file.to_path_buf()),
            None => {
                let default_config = natpmp_config_path(CONFIG_FILE_NAME)?;
                default_config.exists().then_some(default_config)
            }
        };
        let mut config = if let Some(file) = config_file {
            debug!("loading config from {}", file.display());
            let config = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            Self::load_toml(&config)?
        } else {
            debug!("using default config");
            Self::default()
        };

        config.override_from_env(var)?;
        Ok(config)
    }

    fn load_toml(s: &str) -> Result<CliConfig> {
        let config = toml::from_str(s)?;
        Ok(config)
    }

    fn override_from_env(
        &mut self,
        var: impl Fn(&str) -> Result<Option<String>>,
    ) -> Result<()> {
        if let Some(gateway) = var(ENV_GATEWAY)? {
            self.gateway = Some(
                gateway
                    .parse()
                    .with_context(|| format!("{ENV_GATEWAY} must be an IPv4 address"))?,
            );
        }
        if let Some(attempts) = var(ENV_ATTEMPTS)? {
            self.attempts = attempts
                .parse()
                .with_context(|| format!("{ENV_ATTEMPTS} must be a number"))?;
        }
        Ok(())
    }

    /// Configuration of the [`natpmp::Client`] used by the commands.
    pub(crate) fn client_config(&self) -> natpmp::Config {
        natpmp::Config {
            max_attempts: self.attempts,
            retry_increment: Duration::from_millis(self.retry_increment_ms),
            strict_version: self.strict_version,
            ..Default::default()
        }
    }
}

/// Returns the path to the user's natpmp config directory.
///
/// If the `NATPMP_CONFIG_DIR` environment variable is set it will be used unconditionally.
/// Otherwise the returned value depends on the operating system according to the following
/// table.
///
/// | Platform | Value                                        | Example                                          |
/// | -------- | -------------------------------------------- | ------------------------------------------------ |
/// | Linux    | `$XDG_CONFIG_HOME` or `$HOME`/.config/natpmp | /home/alice/.config/natpmp                       |
/// | macOS    | `$HOME`/Library/Application Support/natpmp   | /Users/Alice/Library/Application Support/natpmp  |
/// | Windows  | `{FOLDERID_RoamingAppData}`/natpmp           | C:\Users\Alice\AppData\Roaming\natpmp            |
pub(crate) fn natpmp_config_root() -> Result<PathBuf> {
    if let Some(val) = env::var_os(ENV_CONFIG_DIR) {
        return Ok(PathBuf::from(val));
    }
    let cfg = dirs_next::config_dir()
        .ok_or_else(|| anyhow!("operating environment provides no directory for configuration"))?;
    Ok(cfg.join(NATPMP_DIR))
}

/// Path that leads to a file in the natpmp config directory.
pub(crate) fn natpmp_config_path(file_name: impl AsRef<Path>) -> Result<PathBuf> {
    let path = natpmp_config_root()?.join(file_name);
    Ok(path)
}
