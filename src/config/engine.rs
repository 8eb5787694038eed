// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{path::Path, time::Duration};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::engine::{settings, Settings};

/// A YAML representation of the engine tuning. Every field is optional.
#[derive(Deserialize, Clone, Default)]
pub struct Engine {
    /// Drift tolerated before a follower is nudged (default: 50ms).
    soft_threshold: Option<String>,

    /// Drift at which a follower is snapped to the master (default: 500ms).
    hard_threshold: Option<String>,

    /// Rate for followers ahead of the master (default: 0.95).
    slow_rate: Option<f64>,

    /// Rate for followers behind the master (default: 1.05).
    fast_rate: Option<f64>,

    /// How often drift is corrected (default: 16ms).
    sync_interval: Option<String>,

    /// How often the current time is published (default: 100ms).
    state_interval: Option<String>,

    /// Starting playback this close to the end starts over (default: 500ms).
    replay_margin: Option<String>,
}

impl Engine {
    /// Parse an engine configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Engine, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Engine>()?)
    }

    /// Converts the configuration into validated engine settings.
    pub fn to_settings(&self) -> Result<Settings, ConfigError> {
        let settings = Settings {
            soft_threshold: duration(
                "soft_threshold",
                &self.soft_threshold,
                Duration::from_secs_f64(settings::DEFAULT_SOFT_THRESHOLD),
            )?
            .as_secs_f64(),
            hard_threshold: duration(
                "hard_threshold",
                &self.hard_threshold,
                Duration::from_secs_f64(settings::DEFAULT_HARD_THRESHOLD),
            )?
            .as_secs_f64(),
            slow_rate: self.slow_rate.unwrap_or(settings::DEFAULT_SLOW_RATE),
            fast_rate: self.fast_rate.unwrap_or(settings::DEFAULT_FAST_RATE),
            sync_interval: duration(
                "sync_interval",
                &self.sync_interval,
                settings::DEFAULT_SYNC_INTERVAL,
            )?,
            state_interval: duration(
                "state_interval",
                &self.state_interval,
                settings::DEFAULT_STATE_INTERVAL,
            )?,
            replay_margin: duration(
                "replay_margin",
                &self.replay_margin,
                Duration::from_secs_f64(settings::DEFAULT_REPLAY_MARGIN),
            )?
            .as_secs_f64(),
        };

        settings.validate().map_err(ConfigError::Invalid)?;
        Ok(settings)
    }
}

/// Parses an optional duration string, falling back to the default.
fn duration(
    field: &'static str,
    value: &Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => match DurationString::from_string(value.clone()) {
            Ok(parsed) => Ok(parsed.into()),
            Err(e) => Err(ConfigError::InvalidDuration {
                field,
                value: value.clone(),
                reason: e.to_string(),
            }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use config::{Config, File, FileFormat};

    use super::*;

    fn parse(yaml: &str) -> Engine {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = Engine::default().to_settings().unwrap();
        assert_eq!(Settings::default(), settings);
    }

    #[test]
    fn test_engine_deserialize() {
        let engine = parse(
            r#"
            soft_threshold: 20ms
            hard_threshold: 1s
            slow_rate: 0.98
            fast_rate: 1.02
            sync_interval: 10ms
            state_interval: 250ms
            replay_margin: 2s
        "#,
        );

        let settings = engine.to_settings().unwrap();
        assert_eq!(0.02, settings.soft_threshold);
        assert_eq!(1.0, settings.hard_threshold);
        assert_eq!(0.98, settings.slow_rate);
        assert_eq!(1.02, settings.fast_rate);
        assert_eq!(Duration::from_millis(10), settings.sync_interval);
        assert_eq!(Duration::from_millis(250), settings.state_interval);
        assert_eq!(2.0, settings.replay_margin);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let settings = parse("hard_threshold: 750ms").to_settings().unwrap();
        assert_eq!(0.75, settings.hard_threshold);
        assert_eq!(settings::DEFAULT_SOFT_THRESHOLD, settings.soft_threshold);
        assert_eq!(settings::DEFAULT_SYNC_INTERVAL, settings.sync_interval);
    }

    #[test]
    fn test_invalid_duration() {
        let result = parse("soft_threshold: soon").to_settings();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidDuration {
                field: "soft_threshold",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_thresholds() {
        let result = parse("soft_threshold: 1s").to_settings();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = parse("slow_rate: 1.2").to_settings();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_deserialize_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(file, "state_interval: 50ms").unwrap();

        let engine = Engine::deserialize(file.path()).unwrap();
        assert_eq!(
            Duration::from_millis(50),
            engine.to_settings().unwrap().state_interval
        );

        assert!(matches!(
            Engine::deserialize(Path::new("does/not/exist.yaml")),
            Err(ConfigError::Load(_))
        ));
    }
}
