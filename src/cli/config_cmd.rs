//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;
use crate::domain::output::OutputFormat;
use crate::domain::recording::Duration;

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => handle_path(store, presenter),
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;

    store.save(&config).await?;
    presenter.success(&format!("{} = {}", key, value));

    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;

    let config = store.load().await?;
    presenter.output(config_value(&config, key).as_deref().unwrap_or(NOT_SET));

    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;

    for key in VALID_CONFIG_KEYS {
        presenter.key_value(key, config_value(&config, key).as_deref().unwrap_or(NOT_SET));
    }

    Ok(())
}

fn handle_path<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    presenter.output(&store.path().to_string_lossy());
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        return Ok(());
    }
    Err(ConfigError::ValidationError {
        key: key.to_string(),
        message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
    })
}

/// Validate `value` for `key` and store it in `config`
fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "sample_rate" => config.sample_rate = Some(parse_positive(key, value)?),
        "channels" => config.channels = Some(parse_positive(key, value)?),
        "block_size" => config.block_size = Some(parse_positive(key, value)?),
        "queue_capacity" => config.queue_capacity = Some(parse_positive(key, value)?),
        "device" => {
            let index = value
                .parse()
                .map_err(|_| invalid(key, "Value must be a device index"))?;
            config.device = Some(index);
        }
        "format" => {
            let format: OutputFormat = value.parse().map_err(|e| invalid(key, e))?;
            config.format = Some(format.to_string());
        }
        "bitrate" => {
            validate_bitrate(key, value)?;
            config.bitrate = Some(value.to_string());
        }
        "output_dir" => {
            if value.trim().is_empty() {
                return Err(invalid(key, "Value must not be empty"));
            }
            config.output_dir = Some(value.to_string());
        }
        "drain_timeout" | "encode_timeout" => {
            let duration: Duration = value.parse().map_err(|e| invalid(key, e))?;
            let value = Some(duration.to_string());
            if key == "drain_timeout" {
                config.drain_timeout = value;
            } else {
                config.encode_timeout = value;
            }
        }
        _ => return check_key(key),
    }
    Ok(())
}

fn config_value(config: &AppConfig, key: &str) -> Option<String> {
    match key {
        "sample_rate" => config.sample_rate.map(|v| v.to_string()),
        "channels" => config.channels.map(|v| v.to_string()),
        "block_size" => config.block_size.map(|v| v.to_string()),
        "device" => config.device.map(|v| v.to_string()),
        "format" => config.format.clone(),
        "bitrate" => config.bitrate.clone(),
        "output_dir" => config.output_dir.clone(),
        "queue_capacity" => config.queue_capacity.map(|v| v.to_string()),
        "drain_timeout" => config.drain_timeout.clone(),
        "encode_timeout" => config.encode_timeout.clone(),
        _ => None,
    }
}

/// Parse an integer greater than zero
fn parse_positive<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(invalid(key, "Value must be a positive integer")),
    }
}

/// Bitrates look like `192k` or `128000`
fn validate_bitrate(key: &str, value: &str) -> Result<(), ConfigError> {
    let digits = value
        .strip_suffix('k')
        .or_else(|| value.strip_suffix('K'))
        .unwrap_or(value);
    match digits.parse::<u32>() {
        Ok(n) if n > 0 => Ok(()),
        _ => Err(invalid(key, "Value must look like 192k or 128000")),
    }
}

fn invalid(key: &str, message: impl ToString) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.to_string(),
    }
}
