//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::control::ResponsePolicy;
use crate::error::ControlError;
use crate::optimal_start::{
    MAX_LEAD_MINUTES, ModelForm, PerDegreeStart, SmoothingPolicy, StartWindow, WarmupSettings,
};
use crate::sim::schedule::OccupancySchedule;

/// Longest accepted control interval: one day.
pub const MAX_TICK_SECONDS: u64 = 86_400;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run timing and global parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Duct static pressure loop (in. WC).
    #[serde(default)]
    pub pressure: LoopConfig,
    /// Supply air temperature loop (°F).
    #[serde(default)]
    pub temperature: TemperatureConfig,
    /// Warm-up model estimation and lead-time prediction.
    #[serde(default)]
    pub optimal_start: OptimalStartConfig,
    /// Weekly occupancy window.
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Warm-up detection in zone trend logs.
    #[serde(default)]
    pub warmup: WarmupConfig,
}

/// Run timing and global parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of control intervals to run (must be > 0).
    pub steps: usize,
    /// Control interval length in seconds (must be > 0).
    pub tick_seconds: u64,
    /// Master random seed for simulated sensors.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: 48,
            tick_seconds: 300,
            seed: 42,
        }
    }
}

/// One trim-and-respond loop plus the simulated sensors feeding it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopConfig {
    /// Run this loop at all.
    pub enabled: bool,
    pub initial: f64,
    pub min: f64,
    pub max: f64,
    /// Signed change applied on a tick with no requests.
    pub trim: f64,
    /// Signed change per request (proportional) or per tick with requests (fixed).
    pub response: f64,
    pub max_step: f64,
    /// Highest samples discarded as rogue zones.
    pub ignore_count: usize,
    /// A remaining sample at or above this value is a request.
    pub threshold: f64,
    pub policy: ResponsePolicy,
    /// Number of simulated sensors.
    pub sensor_count: usize,
    pub sensor_low: f64,
    pub sensor_high: f64,
    /// Physical range outside which a sample is rejected.
    pub valid_range: Option<[f64; 2]>,
    /// Seconds after the air handler starts before the first adjustment.
    pub startup_delay_seconds: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::static_pressure()
    }
}

impl LoopConfig {
    /// Duct static pressure reset driven by VAV damper positions.
    pub fn static_pressure() -> Self {
        Self {
            enabled: true,
            initial: 1.0,
            min: 0.5,
            max: 1.5,
            trim: -0.02,
            response: 0.06,
            max_step: 0.15,
            ignore_count: 2,
            threshold: 0.85,
            policy: ResponsePolicy::Proportional,
            sensor_count: 40,
            sensor_low: 0.3,
            sensor_high: 0.95,
            valid_range: Some([0.0, 1.0]),
            startup_delay_seconds: 300,
        }
    }

    /// Supply air temperature reset driven by zone temperatures.
    pub fn supply_air_temp() -> Self {
        Self {
            enabled: true,
            initial: 60.0,
            min: 55.0,
            max: 65.0,
            trim: 0.2,
            response: -0.3,
            max_step: 1.0,
            ignore_count: 2,
            threshold: 75.0,
            policy: ResponsePolicy::Proportional,
            sensor_count: 40,
            sensor_low: 65.0,
            sensor_high: 78.0,
            valid_range: Some([40.0, 100.0]),
            startup_delay_seconds: 600,
        }
    }

    fn validate_into(&self, section: &str, errors: &mut Vec<ConfigError>) {
        let mut push = |field: &str, message: String| {
            errors.push(ConfigError::new(format!("{section}.{field}"), message));
        };

        for (field, value) in [
            ("initial", self.initial),
            ("min", self.min),
            ("max", self.max),
            ("trim", self.trim),
            ("response", self.response),
            ("max_step", self.max_step),
            ("threshold", self.threshold),
            ("sensor_low", self.sensor_low),
            ("sensor_high", self.sensor_high),
        ] {
            if !value.is_finite() {
                push(field, format!("must be finite, got {value}"));
            }
        }
        if self.min > self.max {
            push("min", format!("must be <= {section}.max"));
        }
        if !(self.min..=self.max).contains(&self.initial) {
            push("initial", format!("must be within [{}, {}]", self.min, self.max));
        }
        if self.max_step < 0.0 {
            push("max_step", "must be >= 0".into());
        }
        if self.sensor_low > self.sensor_high {
            push("sensor_low", format!("must be <= {section}.sensor_high"));
        }
        if let Some([low, high]) = self.valid_range {
            if !(low.is_finite() && high.is_finite()) || low > high {
                push("valid_range", "must be finite [low, high] with low <= high".into());
            }
        }
    }
}

/// Supply air temperature loop with its optional outdoor-air reset.
///
/// Same keys as [`LoopConfig`] plus an `[temperature.outdoor_reset]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemperatureConfig {
    pub enabled: bool,
    pub initial: f64,
    pub min: f64,
    pub max: f64,
    pub trim: f64,
    pub response: f64,
    pub max_step: f64,
    pub ignore_count: usize,
    pub threshold: f64,
    pub policy: ResponsePolicy,
    pub sensor_count: usize,
    pub sensor_low: f64,
    pub sensor_high: f64,
    pub valid_range: Option<[f64; 2]>,
    pub startup_delay_seconds: u64,
    /// Outdoor-air reset of the loop's upper limit.
    pub outdoor_reset: Option<OutdoorResetConfig>,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        let l = LoopConfig::supply_air_temp();
        Self {
            enabled: l.enabled,
            initial: l.initial,
            min: l.min,
            max: l.max,
            trim: l.trim,
            response: l.response,
            max_step: l.max_step,
            ignore_count: l.ignore_count,
            threshold: l.threshold,
            policy: l.policy,
            sensor_count: l.sensor_count,
            sensor_low: l.sensor_low,
            sensor_high: l.sensor_high,
            valid_range: l.valid_range,
            startup_delay_seconds: l.startup_delay_seconds,
            outdoor_reset: Some(OutdoorResetConfig::default()),
        }
    }
}

impl TemperatureConfig {
    /// The loop settings without the reset.
    pub fn as_loop(&self) -> LoopConfig {
        LoopConfig {
            enabled: self.enabled,
            initial: self.initial,
            min: self.min,
            max: self.max,
            trim: self.trim,
            response: self.response,
            max_step: self.max_step,
            ignore_count: self.ignore_count,
            threshold: self.threshold,
            policy: self.policy,
            sensor_count: self.sensor_count,
            sensor_low: self.sensor_low,
            sensor_high: self.sensor_high,
            valid_range: self.valid_range,
            startup_delay_seconds: self.startup_delay_seconds,
        }
    }

    fn validate_into(&self, errors: &mut Vec<ConfigError>) {
        self.as_loop().validate_into("temperature", errors);
        if let Some(reset) = &self.outdoor_reset {
            let mut push = |field: &str, message: &str| {
                errors.push(ConfigError::new(
                    format!("temperature.outdoor_reset.{field}"),
                    message,
                ));
            };
            if !(reset.oat_min < reset.oat_max) {
                push("oat_min", "must be < outdoor_reset.oat_max");
            }
            if !(reset.value_at_min.is_finite() && reset.value_at_max.is_finite()) {
                push("value_at_min", "reset values must be finite");
            }
            if !(reset.sensor_low <= reset.sensor_high) {
                push("sensor_low", "must be <= outdoor_reset.sensor_high");
            }
        }
    }
}

/// Outdoor air reset curve and the simulated outdoor sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutdoorResetConfig {
    pub oat_min: f64,
    pub oat_max: f64,
    /// Loop ceiling at or below `oat_min`.
    pub value_at_min: f64,
    /// Loop ceiling at or above `oat_max`.
    pub value_at_max: f64,
    pub sensor_low: f64,
    pub sensor_high: f64,
}

impl Default for OutdoorResetConfig {
    fn default() -> Self {
        Self {
            oat_min: 60.0,
            oat_max: 80.0,
            value_at_min: 65.0,
            value_at_max: 60.0,
            sensor_low: 50.0,
            sensor_high: 90.0,
        }
    }
}

/// How historical coefficients are smoothed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingKind {
    Batch,
    Forgetting,
}

/// Which lead-time rule produces the start time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMethod {
    /// Fitted warm-up model.
    #[default]
    Model,
    /// Inverse-distance blend of the two closest past mornings.
    Interpolated,
    /// Fixed minutes per degree outside the comfort band.
    PerDegree,
}

/// Optimal-start estimation and prediction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimalStartConfig {
    pub method: StartMethod,
    /// Occupied setpoint the history was recorded against (°F).
    pub setpoint: f64,
    /// Minimum lead time in minutes (latest start).
    pub late_start_limit: f64,
    /// Maximum lead time in minutes (earliest start).
    pub early_start_limit: f64,
    pub smoothing: SmoothingKind,
    /// Forgetting factor lambda, used when `smoothing = "forgetting"`.
    pub forgetting_factor: f64,
    /// Fixed batch smoothing constant; derived from the batch length when absent.
    pub batch_smoothing: Option<f64>,
    pub model: ModelForm,
    pub alpha_a: f64,
    pub alpha_b: f64,
    pub alpha_d: f64,
    /// Current zone temperature (°F).
    pub zone_temp: f64,
    /// Current outdoor temperature (°F).
    pub outdoor_temp: f64,
    /// Date to compute a start time for (`YYYY-MM-DD`); today when absent.
    pub date: Option<String>,
    /// Only the newest this many history days are used.
    pub max_days_of_data: usize,
    /// Settings for `method = "per_degree"`.
    pub per_degree: PerDegreeConfig,
}

impl Default for OptimalStartConfig {
    fn default() -> Self {
        Self {
            method: StartMethod::Model,
            setpoint: 70.0,
            late_start_limit: 10.0,
            early_start_limit: 180.0,
            smoothing: SmoothingKind::Batch,
            forgetting_factor: 0.1,
            batch_smoothing: None,
            model: ModelForm::Literal,
            alpha_a: 10.0,
            alpha_b: 5.0,
            alpha_d: 0.0,
            zone_temp: 49.0,
            outdoor_temp: 11.0,
            date: None,
            max_days_of_data: 10,
            per_degree: PerDegreeConfig::default(),
        }
    }
}

impl OptimalStartConfig {
    pub fn smoothing_policy(&self) -> SmoothingPolicy {
        match self.smoothing {
            SmoothingKind::Batch => SmoothingPolicy::BatchWeighted {
                smoothing: self.batch_smoothing,
            },
            SmoothingKind::Forgetting => SmoothingPolicy::ForgettingFactor {
                lambda: self.forgetting_factor,
            },
        }
    }

    pub fn start_window(&self) -> Result<StartWindow, ControlError> {
        StartWindow::new(self.late_start_limit, self.early_start_limit)
    }

    /// Parsed `date`, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `date` is not `YYYY-MM-DD`.
    pub fn parsed_date(&self) -> Result<Option<NaiveDate>, ConfigError> {
        self.date
            .as_deref()
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d").map_err(|e| {
                    ConfigError::new("optimal_start.date", format!("\"{d}\": {e}"))
                })
            })
            .transpose()
    }
}

/// Runtime-per-degree rule and its earliest start.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PerDegreeConfig {
    pub lower_comfort: f64,
    pub upper_comfort: f64,
    /// Minutes per degree above `upper_comfort`.
    pub cooling_rate: f64,
    /// Minutes per degree below `lower_comfort`.
    pub heating_rate: f64,
    /// `HH:MM`; the start is never commanded earlier on the occupancy date.
    pub earliest_start: String,
}

impl Default for PerDegreeConfig {
    fn default() -> Self {
        let p = PerDegreeStart::default();
        Self {
            lower_comfort: p.lower_comfort,
            upper_comfort: p.upper_comfort,
            cooling_rate: p.cooling_rate,
            heating_rate: p.heating_rate,
            earliest_start: "05:00".to_string(),
        }
    }
}

impl PerDegreeConfig {
    pub fn to_rule(&self) -> PerDegreeStart {
        PerDegreeStart {
            lower_comfort: self.lower_comfort,
            upper_comfort: self.upper_comfort,
            cooling_rate: self.cooling_rate,
            heating_rate: self.heating_rate,
        }
    }

    /// # Errors
    ///
    /// Returns a `ConfigError` if `earliest_start` is not `HH:MM`.
    pub fn earliest(&self) -> Result<NaiveTime, ConfigError> {
        parse_time("optimal_start.per_degree.earliest_start", &self.earliest_start)
    }
}

/// Warm-up detection thresholds for `--trend` logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WarmupConfig {
    pub proximity: f64,
    pub steep_rise: f64,
    pub rolling_window: usize,
    /// Trend interval in minutes.
    pub minutes_per_step: f64,
    /// Day names left out of the analysis.
    pub exclude_days: Vec<String>,
    /// `HH:MM` of the reading paired with each day's warm-up.
    pub reading_time: String,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        let w = WarmupSettings::default();
        Self {
            proximity: w.proximity,
            steep_rise: w.steep_rise,
            rolling_window: w.rolling_window,
            minutes_per_step: w.minutes_per_step,
            exclude_days: ["sat", "sun", "mon"].map(String::from).to_vec(),
            reading_time: "04:00".to_string(),
        }
    }
}

impl WarmupConfig {
    /// Builds and validates the extraction settings.
    ///
    /// # Errors
    ///
    /// Returns the first field that does not parse or is out of range.
    pub fn to_settings(&self) -> Result<WarmupSettings, ConfigError> {
        let settings = WarmupSettings {
            proximity: self.proximity,
            steep_rise: self.steep_rise,
            rolling_window: self.rolling_window,
            minutes_per_step: self.minutes_per_step,
            excluded_days: parse_days("warmup.exclude_days", &self.exclude_days)?,
            reading_time: parse_time("warmup.reading_time", &self.reading_time)?,
        };
        settings
            .validate()
            .map_err(|e| ConfigError::from_control("warmup", e))?;
        Ok(settings)
    }
}

fn parse_time(field: &str, s: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|e| ConfigError::new(field, format!("\"{s}\": {e}")))
}

fn parse_days(field: &str, days: &[String]) -> Result<Vec<Weekday>, ConfigError> {
    days.iter()
        .map(|d| {
            d.parse::<Weekday>()
                .map_err(|_| ConfigError::new(field, format!("unknown day \"{d}\"")))
        })
        .collect()
}

/// Weekly occupancy window as written in TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// `HH:MM`, inclusive.
    pub start: String,
    /// `HH:MM`, inclusive.
    pub end: String,
    /// Day names such as `"mon"` or `"Tuesday"`.
    pub days: Vec<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            start: "07:00".to_string(),
            end: "18:00".to_string(),
            days: ["mon", "tue", "wed", "thu", "fri"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl ScheduleConfig {
    /// Builds the runtime schedule.
    ///
    /// # Errors
    ///
    /// Returns the first field that does not parse.
    pub fn to_schedule(&self) -> Result<OccupancySchedule, ConfigError> {
        let start = parse_time("schedule.start", &self.start)?;
        let end = parse_time("schedule.end", &self.end)?;
        let days = parse_days("schedule.days", &self.days)?;
        Ok(OccupancySchedule::new(start, end, days))
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"pressure.max_step"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Re-homes a core `Configuration` error under a TOML section.
    fn from_control(section: &str, err: ControlError) -> Self {
        match err {
            ControlError::Configuration { field, message } => {
                Self::new(format!("{section}.{field}"), message)
            }
            other => Self::new(section, other.to_string()),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            pressure: LoopConfig::static_pressure(),
            temperature: TemperatureConfig::default(),
            optimal_start: OptimalStartConfig::default(),
            schedule: ScheduleConfig::default(),
            warmup: WarmupConfig::default(),
        }
    }

    /// Returns the conservative preset: lower pressure floor, gentler response.
    pub fn conservative() -> Self {
        Self {
            pressure: LoopConfig {
                min: 0.15,
                response: 0.04,
                max_step: 0.06,
                ..LoopConfig::static_pressure()
            },
            ..Self::baseline()
        }
    }

    /// Returns the fixed-response preset: one response step per tick with
    /// requests, and per-sample forgetting-factor smoothing.
    pub fn fixed_response() -> Self {
        Self {
            pressure: LoopConfig {
                policy: ResponsePolicy::Fixed,
                ..LoopConfig::static_pressure()
            },
            temperature: TemperatureConfig {
                policy: ResponsePolicy::Fixed,
                ..TemperatureConfig::default()
            },
            optimal_start: OptimalStartConfig {
                smoothing: SmoothingKind::Forgetting,
                ..OptimalStartConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "conservative", "fixed_response"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "conservative" => Ok(Self::conservative()),
            "fixed_response" => Ok(Self::fixed_response()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns every violation found.
    ///
    /// Returns an empty vector if the configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.steps == 0 {
            errors.push(ConfigError::new("simulation.steps", "must be > 0"));
        }
        if !(1..=MAX_TICK_SECONDS).contains(&s.tick_seconds) {
            errors.push(ConfigError::new(
                "simulation.tick_seconds",
                format!("must be in [1, {MAX_TICK_SECONDS}], got {}", s.tick_seconds),
            ));
        }

        self.pressure.validate_into("pressure", &mut errors);
        self.temperature.validate_into(&mut errors);

        let os = &self.optimal_start;
        for (field, value) in [
            ("setpoint", os.setpoint),
            ("alpha_a", os.alpha_a),
            ("alpha_b", os.alpha_b),
            ("alpha_d", os.alpha_d),
            ("zone_temp", os.zone_temp),
            ("outdoor_temp", os.outdoor_temp),
        ] {
            if !value.is_finite() {
                errors.push(ConfigError::new(
                    format!("optimal_start.{field}"),
                    format!("must be finite, got {value}"),
                ));
            }
        }
        if !(os.late_start_limit >= 0.0 && os.late_start_limit <= os.early_start_limit)
            || !os.early_start_limit.is_finite()
        {
            errors.push(ConfigError::new(
                "optimal_start.late_start_limit",
                "must satisfy 0 <= late_start_limit <= early_start_limit (finite)",
            ));
        }
        if os.early_start_limit > MAX_LEAD_MINUTES {
            errors.push(ConfigError::new(
                "optimal_start.early_start_limit",
                format!("must be <= {MAX_LEAD_MINUTES}, got {}", os.early_start_limit),
            ));
        }
        if os.max_days_of_data == 0 {
            errors.push(ConfigError::new("optimal_start.max_days_of_data", "must be > 0"));
        }
        if let Err(e) = os.per_degree.to_rule().validate() {
            errors.push(ConfigError::from_control("optimal_start.per_degree", e));
        }
        if let Err(e) = os.per_degree.earliest() {
            errors.push(e);
        }
        if !(os.forgetting_factor > 0.0 && os.forgetting_factor < 1.0) {
            errors.push(ConfigError::new(
                "optimal_start.forgetting_factor",
                format!("must be in (0, 1), got {}", os.forgetting_factor),
            ));
        }
        if let Some(k) = os.batch_smoothing {
            if !(k > 0.0 && k <= 1.0) {
                errors.push(ConfigError::new(
                    "optimal_start.batch_smoothing",
                    format!("must be in (0, 1], got {k}"),
                ));
            }
        }
        if let Err(e) = os.parsed_date() {
            errors.push(e);
        }

        if let Err(e) = self.schedule.to_schedule() {
            errors.push(e);
        }
        if let Err(e) = self.warmup.to_settings() {
            errors.push(e);
        }

        errors
    }
}
