use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming an optional TOML mission file.
pub const CONFIG_PATH_ENV: &str = "SKYWARD_CONFIG";
/// Environment override for [`MissionConfig::target_apoapsis_altitude`].
pub const TARGET_APOAPSIS_ENV: &str = "SKYWARD_TARGET_APOAPSIS";
/// Environment override for [`MissionConfig::target_body`].
pub const TARGET_BODY_ENV: &str = "SKYWARD_TARGET_BODY";

/// Tuning constants of the guidance laws and the maneuver executor.
///
/// Every value is empirical, the defaults are the flight-proven numbers.
/// Durations are given in seconds of simulated time.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// Margin before the burn window the warp stops at.
    pub lead_time: f64,
    /// Angular lead of the departure burn compensating gravitational deflection (rad).
    pub lead_angle: f64,
    pub coarse_poll: f64,
    pub fine_poll: f64,
    /// Part of the burn left to the trim phase.
    pub full_throttle_margin: f64,
    pub trim_throttle: f64,
    pub max_trim_duration: f64,
    pub attitude_lock_timeout: f64,
    pub turn_start_altitude: f64,
    pub turn_end_altitude: f64,
    /// Minimum pitch change in degrees before a new pitch command is issued.
    pub pitch_hysteresis: f64,
    pub staging_threshold: f64,
    pub throttle_ramp_step: f64,
    pub coarse_cutoff_fraction: f64,
    pub fine_cutoff_throttle: f64,
    pub launch_throttle: f64,
    pub settle_time: f64,
    pub autopilot_gains: (f64, f64, f64),
    pub booster_resource: String,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            lead_time: 10.0,
            lead_angle: 0.1,
            coarse_poll: 1.0,
            fine_poll: 0.1,
            full_throttle_margin: 0.5,
            trim_throttle: 0.05,
            max_trim_duration: 120.0,
            attitude_lock_timeout: 120.0,
            turn_start_altitude: 1000.0,
            turn_end_altitude: 70000.0,
            pitch_hysteresis: 0.5,
            staging_threshold: 0.1,
            throttle_ramp_step: 0.1,
            coarse_cutoff_fraction: 0.9,
            fine_cutoff_throttle: 0.25,
            launch_throttle: 0.5,
            settle_time: 2.0,
            autopilot_gains: (20.0, 5.0, 5.0),
            booster_resource: String::from("SolidFuel"),
        }
    }
}

impl GuidanceConfig {
    pub fn coarse_poll_dt(&self) -> Duration { Duration::from_secs_f64(self.coarse_poll) }
    pub fn fine_poll_dt(&self) -> Duration { Duration::from_secs_f64(self.fine_poll) }
    pub fn settle_dt(&self) -> Duration { Duration::from_secs_f64(self.settle_time) }
    pub fn attitude_lock_dt(&self) -> Duration { Duration::from_secs_f64(self.attitude_lock_timeout) }

    /// Checks that every constant is finite and inside its physical range,
    /// and that every time span is representable as a [`Duration`].
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("lead_time", self.lead_time),
            ("coarse_poll", self.coarse_poll),
            ("fine_poll", self.fine_poll),
            ("max_trim_duration", self.max_trim_duration),
            ("attitude_lock_timeout", self.attitude_lock_timeout),
            ("turn_end_altitude", self.turn_end_altitude),
            ("throttle_ramp_step", self.throttle_ramp_step),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidValue(name, value.to_string()));
            }
        }
        let non_negative = [
            ("lead_angle", self.lead_angle),
            ("full_throttle_margin", self.full_throttle_margin),
            ("turn_start_altitude", self.turn_start_altitude),
            ("pitch_hysteresis", self.pitch_hysteresis),
            ("staging_threshold", self.staging_threshold),
            ("settle_time", self.settle_time),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue(name, value.to_string()));
            }
        }
        let throttles = [
            ("trim_throttle", self.trim_throttle),
            ("fine_cutoff_throttle", self.fine_cutoff_throttle),
            ("launch_throttle", self.launch_throttle),
        ];
        for (name, value) in throttles {
            if !(0.0..=1.0).contains(&value) || value == 0.0 {
                return Err(ConfigError::InvalidValue(name, value.to_string()));
            }
        }
        if self.turn_start_altitude >= self.turn_end_altitude {
            return Err(ConfigError::InvalidValue(
                "turn_start_altitude",
                self.turn_start_altitude.to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.coarse_cutoff_fraction) {
            return Err(ConfigError::InvalidValue(
                "coarse_cutoff_fraction",
                self.coarse_cutoff_fraction.to_string(),
            ));
        }
        let durations = [
            ("coarse_poll", self.coarse_poll),
            ("fine_poll", self.fine_poll),
            ("settle_time", self.settle_time),
            ("max_trim_duration", self.max_trim_duration),
            ("attitude_lock_timeout", self.attitude_lock_timeout),
        ];
        for (name, value) in durations {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::InvalidValue(name, value.to_string()));
            }
        }
        Ok(())
    }
}

/// Mission parameters of one flight.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    pub target_apoapsis_altitude: f64,
    pub target_body: String,
    pub guidance: GuidanceConfig,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            target_apoapsis_altitude: 150_000.0,
            target_body: String::from("Mun"),
            guidance: GuidanceConfig::default(),
        }
    }
}

impl MissionConfig {
    /// Builds the mission from the optional file named by `SKYWARD_CONFIG`
    /// and the `SKYWARD_TARGET_*` overrides.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if the file cannot be read or parsed, or an
    /// override or the resulting configuration is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(
            std::env::var(TARGET_APOAPSIS_ENV).ok().as_deref(),
            std::env::var(TARGET_BODY_ENV).ok().as_deref(),
        )?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML mission file.
    ///
    /// # Errors
    /// [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parses TOML text, missing keys fall back to the defaults.
    ///
    /// # Errors
    /// [`ConfigError::Parse`] on malformed input.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> { Ok(toml::from_str(contents)?) }

    /// Applies the raw override values, `None` keeps the current setting.
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] if the apoapsis is not a number or the body is blank.
    pub fn apply_overrides(
        &mut self,
        apoapsis: Option<&str>,
        body: Option<&str>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = apoapsis {
            self.target_apoapsis_altitude = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("target_apoapsis_altitude", raw.to_string()))?;
        }
        if let Some(raw) = body {
            let name = raw.trim();
            if name.is_empty() {
                return Err(ConfigError::InvalidValue("target_body", raw.to_string()));
            }
            self.target_body = name.to_string();
        }
        Ok(())
    }

    /// # Errors
    /// [`ConfigError::InvalidValue`] for a non-positive target or invalid guidance constants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.target_apoapsis_altitude.is_finite() || self.target_apoapsis_altitude <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "target_apoapsis_altitude",
                self.target_apoapsis_altitude.to_string(),
            ));
        }
        self.guidance.validate()
    }
}

/// Errors raised while assembling a [`MissionConfig`].
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    InvalidValue(&'static str, String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "failed to read mission file: {err}"),
            ConfigError::Parse(err) => write!(f, "failed to parse mission file: {err}"),
            ConfigError::InvalidValue(key, value) => write!(f, "invalid value for {key}: '{value}'"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            ConfigError::InvalidValue(..) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self { ConfigError::Io(value) }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self { ConfigError::Parse(value) }
}
