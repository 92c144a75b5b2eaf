//! Configuration structures for the haulage simulator
//!
//! This module contains the simulation configuration structure, the command line
//! surface that feeds it, and the validation logic that rejects malformed setups
//! before the event loop starts.

use super::{Activity, AdmissionMode};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default timing constants, in simulation time units
pub mod defaults {
    /// Forming duration range
    pub const FORMING_RANGE: (f64, f64) = (2.0, 7.0);
    /// Loading duration range
    pub const LOADING_RANGE: (f64, f64) = (1.0, 3.0);
    /// Loaded travel duration range
    pub const TRAVEL_RANGE: (f64, f64) = (2.0, 3.0);
    /// Unloading duration range
    pub const UNLOADING_RANGE: (f64, f64) = (1.0, 3.0);
    /// Empty return duration range
    pub const RETURNING_RANGE: (f64, f64) = (2.0, 3.0);
    /// Mean time between order arrivals
    pub const ORDER_INTERARRIVAL_MEAN: f64 = 50.0;
    /// Upper bound on periodic sample boundaries in one run
    pub const MAX_SAMPLE_BOUNDARIES: f64 = 10_000_000.0;
    /// Upper bound on expected forming completions in one run
    pub const MAX_FORMING_COMPLETIONS: f64 = 100_000_000.0;
}

/// Distribution an activity duration is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DurationDistribution {
    /// Exponential with the given mean
    Exponential {
        /// Mean duration
        mean: f64,
    },
    /// Uniform over `[min, max]`
    Uniform {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },
}

impl DurationDistribution {
    /// Expected value of the distribution
    pub fn mean(&self) -> f64 {
        match *self {
            DurationDistribution::Exponential { mean } => mean,
            DurationDistribution::Uniform { min, max } => (min + max) / 2.0,
        }
    }
}

/// Duration parameters for one activity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityTiming {
    /// Distribution used for stochastic draws
    pub distribution: DurationDistribution,
    /// When false the distribution mean is used as a fixed duration
    #[serde(default = "default_stochastic")]
    pub stochastic: bool,
}

fn default_stochastic() -> bool {
    true
}

impl ActivityTiming {
    /// Stochastic exponential timing
    pub fn exponential(mean: f64) -> Self {
        Self { distribution: DurationDistribution::Exponential { mean }, stochastic: true }
    }

    /// Stochastic uniform timing
    pub fn uniform(min: f64, max: f64) -> Self {
        Self { distribution: DurationDistribution::Uniform { min, max }, stochastic: true }
    }

    /// Constant duration, never drawn from the random source
    pub fn fixed(value: f64) -> Self {
        Self {
            distribution: DurationDistribution::Uniform { min: value, max: value },
            stochastic: false,
        }
    }

    /// The value used when the timing is not stochastic
    pub fn fixed_value(&self) -> f64 {
        self.distribution.mean()
    }

    /// Copy of this timing with stochastic draws disabled
    pub fn deterministic(self) -> Self {
        Self { stochastic: false, ..self }
    }
}

/// Parameters of the order-tracking variant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderConfig {
    /// Time between consecutive order arrivals
    pub interarrival: ActivityTiming,
    /// Minimum pile-pairs an order requires
    pub min_pairs: u32,
    /// Maximum pile-pairs an order requires
    pub max_pairs: u32,
    /// Total number of orders that will arrive during a run
    pub max_orders: u32,
    /// Stop once this many orders are completed
    #[serde(default)]
    pub order_target: Option<u32>,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            interarrival: ActivityTiming::exponential(defaults::ORDER_INTERARRIVAL_MEAN),
            min_pairs: 2,
            max_pairs: 4,
            max_orders: 10,
            order_target: None,
        }
    }
}

/// Command line arguments structure
#[derive(Debug, Clone, Parser)]
#[command(
    name = "earthworks-sim",
    version = "0.1.0",
    about = "Earthworks haulage simulator - discrete-event model of pile forming, loading and hauling",
    long_about = "Simulates a pile-forming machine, a pool of loading crews and a fleet of haul vehicles cycling through load, travel, unload and return, and reports throughput and resource utilization.

EXAMPLES:
    # Run with default settings
    earthworks-sim

    # Use a configuration file
    earthworks-sim --config site.json

    # Override specific settings
    earthworks-sim --fleet-size 6 --crew-capacity 3 --horizon 2000

    # Generate configuration template
    earthworks-sim --print-config > site.json

    # Reproducible run with a transition trace
    earthworks-sim --seed 12345 --trace --trace-output trace.log

CONFIGURATION:
    Configuration can be provided via:
    1. Command line arguments (highest priority)
    2. Configuration file (--config flag)
    3. Default values (lowest priority)

    Supported configuration file formats: JSON (.json)"
)]
pub struct CliArgs {
    /// Configuration file path (JSON format)
    #[arg(
        short,
        long,
        help = "Configuration file path (JSON format)",
        long_help = "Path to a JSON configuration file. CLI arguments will override file settings."
    )]
    pub config: Option<String>,

    /// Number of haul vehicles
    #[arg(long, help = "Number of haul vehicles (must be > 0)")]
    pub fleet_size: Option<u32>,

    /// Number of loading crews
    #[arg(
        long,
        help = "Number of loading crews",
        long_help = "Number of loading crews that can work concurrently. Zero is allowed and means no loading ever starts. Default: 2"
    )]
    pub crew_capacity: Option<u32>,

    /// Number of pile-forming machines
    #[arg(long, help = "Number of pile-forming machines (must be > 0)")]
    pub forming_machines: Option<u32>,

    /// Piles on site at time zero
    #[arg(long, help = "Piles available at time zero")]
    pub initial_piles: Option<u64>,

    /// Simulation horizon
    #[arg(long, help = "Simulated time at which the run stops")]
    pub horizon: Option<f64>,

    /// Stop after this many completed haul cycles
    #[arg(long, help = "Stop after this many completed haul cycles")]
    pub cycle_target: Option<u64>,

    /// Interval between periodic samples
    #[arg(long, help = "Simulated time between periodic samples")]
    pub report_interval: Option<f64>,

    /// Upper bound on retained periodic samples
    #[arg(long, help = "Maximum number of periodic samples kept in memory")]
    pub max_samples: Option<usize>,

    /// Random seed for reproducible results
    #[arg(long, help = "Random seed for reproducible results")]
    pub seed: Option<u64>,

    /// Admission policy (greedy or single)
    #[arg(
        long,
        help = "Admission policy (greedy or single)",
        long_help = "greedy admits waiting vehicles in id order until no more fit; single admits at most one vehicle each time the policy runs. Default: greedy"
    )]
    pub admission: Option<String>,

    /// Enable order tracking with default order parameters
    #[arg(long, help = "Enable order tracking with default order parameters")]
    pub orders: bool,

    /// Use every activity's mean instead of random draws
    #[arg(long, help = "Use fixed mean durations for every activity")]
    pub deterministic: bool,

    /// Record a transition trace
    #[arg(long, help = "Record a line per state transition")]
    pub trace: bool,

    /// Where to write the transition trace
    #[arg(long, help = "Write the transition trace to this file instead of stderr")]
    pub trace_output: Option<String>,

    /// Where to write the JSON report
    #[arg(short, long, help = "Write the JSON report to this file")]
    pub output: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, help = "Enable debug logging")]
    pub debug: bool,

    /// Dry run mode - validate configuration without running simulation
    #[arg(long, help = "Validate configuration without running simulation")]
    pub dry_run: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in JSON format and exit")]
    pub print_config: bool,
}

/// Configuration file structure (allows partial configuration)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Number of pile-forming machines
    pub forming_machines: Option<u32>,
    /// Number of loading crews
    pub crew_capacity: Option<u32>,
    /// Number of haul vehicles
    pub fleet_size: Option<u32>,
    /// Piles available at time zero
    pub initial_piles: Option<u64>,
    /// Forming timing
    pub forming: Option<ActivityTiming>,
    /// Loading timing
    pub loading: Option<ActivityTiming>,
    /// Travel timing
    pub travel: Option<ActivityTiming>,
    /// Unloading timing
    pub unloading: Option<ActivityTiming>,
    /// Return timing
    pub returning: Option<ActivityTiming>,
    /// Simulation horizon
    pub horizon: Option<f64>,
    /// Completed-cycle stop target
    pub cycle_target: Option<u64>,
    /// Interval between periodic samples
    pub report_interval: Option<f64>,
    /// Upper bound on retained samples
    pub max_samples: Option<usize>,
    /// Random seed
    pub seed: Option<u64>,
    /// Transition trace toggle
    pub trace: Option<bool>,
    /// Admission policy
    pub admission: Option<AdmissionMode>,
    /// Order tracking parameters
    pub orders: Option<OrderConfig>,
}

/// Configuration for a haulage simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of pile-forming machines
    pub forming_machines: u32,
    /// Number of loading crews
    pub crew_capacity: u32,
    /// Number of haul vehicles
    pub fleet_size: u32,
    /// Piles available at time zero
    pub initial_piles: u64,
    /// Forming timing
    pub forming: ActivityTiming,
    /// Loading timing
    pub loading: ActivityTiming,
    /// Travel timing
    pub travel: ActivityTiming,
    /// Unloading timing
    pub unloading: ActivityTiming,
    /// Return timing
    pub returning: ActivityTiming,
    /// Simulation horizon
    pub horizon: f64,
    /// Completed-cycle stop target
    pub cycle_target: Option<u64>,
    /// Interval between periodic samples
    pub report_interval: f64,
    /// Upper bound on retained samples
    pub max_samples: usize,
    /// Random seed for reproducible results
    pub seed: Option<u64>,
    /// Record a transition trace
    pub trace: bool,
    /// Admission policy
    pub admission: AdmissionMode,
    /// Order tracking parameters, `None` for a single implicit demand stream
    pub orders: Option<OrderConfig>,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Configuration file read error
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unsupported configuration file format
    #[error("Unsupported configuration file format: {0} (supported: .json)")]
    UnsupportedFormat(String),

    /// A CLI value could not be interpreted
    #[error("Invalid command line value: {0}")]
    InvalidArgument(String),
}

/// Validation errors for simulation configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    /// A resource capacity that must be positive is zero
    #[error("Capacity of {resource} must be greater than 0, got {value}")]
    InvalidCapacity {
        /// Name of the resource
        resource: String,
        /// The rejected capacity
        value: u32,
    },

    /// An activity duration is malformed
    #[error("Invalid {activity} duration: {reason}")]
    InvalidDuration {
        /// Name of the activity
        activity: String,
        /// What is wrong with it
        reason: String,
    },

    /// Horizon is not a positive finite number
    #[error("Horizon must be a positive finite number, got {0}")]
    InvalidHorizon(f64),

    /// Report interval is not a positive finite number
    #[error("Report interval must be a positive finite number, got {0}")]
    InvalidReportInterval(f64),

    /// Report interval is so small the run would spend its time sampling
    #[error("Report interval {interval} yields more than {limit} samples over horizon {horizon}")]
    ReportIntervalTooFine {
        /// The rejected interval
        interval: f64,
        /// Configured horizon
        horizon: f64,
        /// Largest allowed sample count
        limit: f64,
    },

    /// Cycle target of zero would stop before anything happens
    #[error("Cycle target must be greater than 0")]
    InvalidCycleTarget,

    /// Sample buffer would hold nothing
    #[error("Maximum sample count must be greater than 0")]
    InvalidMaxSamples,

    /// Order size range is empty or starts at zero
    #[error("Invalid order size range: min ({0}) must be > 0 and <= max ({1})")]
    InvalidOrderRange(u32, u32),

    /// No orders would ever arrive
    #[error("Maximum order count must be greater than 0")]
    InvalidMaxOrders,

    /// Order target can never be met
    #[error("Order target {target} must be between 1 and the maximum order count {max_orders}")]
    InvalidOrderTarget {
        /// Requested target
        target: u32,
        /// Orders that will ever arrive
        max_orders: u32,
    },
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            forming_machines: 1,
            crew_capacity: 2,
            fleet_size: 4,
            initial_piles: 0,
            forming: ActivityTiming::uniform(defaults::FORMING_RANGE.0, defaults::FORMING_RANGE.1),
            loading: ActivityTiming::uniform(defaults::LOADING_RANGE.0, defaults::LOADING_RANGE.1),
            travel: ActivityTiming::uniform(defaults::TRAVEL_RANGE.0, defaults::TRAVEL_RANGE.1),
            unloading: ActivityTiming::uniform(
                defaults::UNLOADING_RANGE.0,
                defaults::UNLOADING_RANGE.1,
            ),
            returning: ActivityTiming::uniform(
                defaults::RETURNING_RANGE.0,
                defaults::RETURNING_RANGE.1,
            ),
            horizon: 500.0,
            cycle_target: None,
            report_interval: 5.0,
            max_samples: 10_000,
            seed: None,
            trace: false,
            admission: AdmissionMode::Greedy,
            orders: None,
        }
    }
}

impl SimulationConfig {
    /// Create a new configuration from command line arguments and optional config file
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::from_cli_args(args)
    }

    /// Create configuration from parsed CLI arguments
    pub fn from_cli_args(args: CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(config_path) = &args.config {
            config = Self::from_file(config_path)?;
        }

        // CLI takes precedence over the file
        Self::apply_cli_overrides(&mut config, args)?;

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let config_file: ConfigFile = serde_json::from_str(&content)?;
                Ok(Self::from_config_file(config_file))
            }
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }
    }

    /// Create configuration from a config file, merging with defaults
    fn from_config_file(config_file: ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            forming_machines: config_file.forming_machines.unwrap_or(defaults.forming_machines),
            crew_capacity: config_file.crew_capacity.unwrap_or(defaults.crew_capacity),
            fleet_size: config_file.fleet_size.unwrap_or(defaults.fleet_size),
            initial_piles: config_file.initial_piles.unwrap_or(defaults.initial_piles),
            forming: config_file.forming.unwrap_or(defaults.forming),
            loading: config_file.loading.unwrap_or(defaults.loading),
            travel: config_file.travel.unwrap_or(defaults.travel),
            unloading: config_file.unloading.unwrap_or(defaults.unloading),
            returning: config_file.returning.unwrap_or(defaults.returning),
            horizon: config_file.horizon.unwrap_or(defaults.horizon),
            cycle_target: config_file.cycle_target.or(defaults.cycle_target),
            report_interval: config_file.report_interval.unwrap_or(defaults.report_interval),
            max_samples: config_file.max_samples.unwrap_or(defaults.max_samples),
            seed: config_file.seed.or(defaults.seed),
            trace: config_file.trace.unwrap_or(defaults.trace),
            admission: config_file.admission.unwrap_or(defaults.admission),
            orders: config_file.orders.or(defaults.orders),
        }
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(config: &mut Self, args: CliArgs) -> Result<(), ConfigError> {
        if let Some(value) = args.forming_machines {
            config.forming_machines = value;
        }
        if let Some(value) = args.crew_capacity {
            config.crew_capacity = value;
        }
        if let Some(value) = args.fleet_size {
            config.fleet_size = value;
        }
        if let Some(value) = args.initial_piles {
            config.initial_piles = value;
        }
        if let Some(value) = args.horizon {
            config.horizon = value;
        }
        if let Some(value) = args.cycle_target {
            config.cycle_target = Some(value);
        }
        if let Some(value) = args.report_interval {
            config.report_interval = value;
        }
        if let Some(value) = args.max_samples {
            config.max_samples = value;
        }
        if let Some(value) = args.seed {
            config.seed = Some(value);
        }
        if let Some(value) = args.admission {
            config.admission = value.parse().map_err(ConfigError::InvalidArgument)?;
        }
        if args.orders && config.orders.is_none() {
            config.orders = Some(OrderConfig::default());
        }
        if args.trace {
            config.trace = true;
        }
        if args.deterministic {
            config.make_deterministic();
        }

        Ok(())
    }

    /// Turn every activity, order arrivals included, into its fixed mean
    pub fn make_deterministic(&mut self) {
        for activity in Activity::ALL {
            let timing = self.timing_mut(activity);
            *timing = timing.deterministic();
        }
        if let Some(orders) = self.orders.as_mut() {
            orders.interarrival = orders.interarrival.deterministic();
        }
    }

    /// Timing parameters of an activity
    pub fn timing(&self, activity: Activity) -> &ActivityTiming {
        match activity {
            Activity::Forming => &self.forming,
            Activity::Loading => &self.loading,
            Activity::Travel => &self.travel,
            Activity::Unloading => &self.unloading,
            Activity::Returning => &self.returning,
        }
    }

    fn timing_mut(&mut self, activity: Activity) -> &mut ActivityTiming {
        match activity {
            Activity::Forming => &mut self.forming,
            Activity::Loading => &mut self.loading,
            Activity::Travel => &mut self.travel,
            Activity::Unloading => &mut self.unloading,
            Activity::Returning => &mut self.returning,
        }
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Print configuration as JSON
    pub fn print_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.forming_machines == 0 {
            return Err(ConfigValidationError::InvalidCapacity {
                resource: "forming_machines".to_string(),
                value: self.forming_machines,
            });
        }
        if self.fleet_size == 0 {
            return Err(ConfigValidationError::InvalidCapacity {
                resource: "fleet_size".to_string(),
                value: self.fleet_size,
            });
        }

        for activity in Activity::ALL {
            Self::validate_timing(&activity.to_string(), self.timing(activity))?;
        }

        // A zero-length forming loop would re-arm forever without advancing time
        if self.forming.fixed_value() <= 0.0 {
            return Err(ConfigValidationError::InvalidDuration {
                activity: Activity::Forming.to_string(),
                reason: "mean duration must be positive".to_string(),
            });
        }

        if !self.horizon.is_finite() || self.horizon <= 0.0 {
            return Err(ConfigValidationError::InvalidHorizon(self.horizon));
        }
        if !self.report_interval.is_finite() || self.report_interval <= 0.0 {
            return Err(ConfigValidationError::InvalidReportInterval(self.report_interval));
        }
        // Sampling walks every boundary even when the ring buffer drops most of them
        if self.horizon / self.report_interval > defaults::MAX_SAMPLE_BOUNDARIES {
            return Err(ConfigValidationError::ReportIntervalTooFine {
                interval: self.report_interval,
                horizon: self.horizon,
                limit: defaults::MAX_SAMPLE_BOUNDARIES,
            });
        }
        // A near-zero forming mean never lets the clock reach the horizon
        let expected_forming =
            self.horizon * f64::from(self.forming_machines) / self.forming.fixed_value();
        if expected_forming > defaults::MAX_FORMING_COMPLETIONS {
            return Err(ConfigValidationError::InvalidDuration {
                activity: Activity::Forming.to_string(),
                reason: format!(
                    "mean {} implies more than {} completions over horizon {}",
                    self.forming.fixed_value(),
                    defaults::MAX_FORMING_COMPLETIONS,
                    self.horizon
                ),
            });
        }
        if self.cycle_target == Some(0) {
            return Err(ConfigValidationError::InvalidCycleTarget);
        }
        if self.max_samples == 0 {
            return Err(ConfigValidationError::InvalidMaxSamples);
        }

        if let Some(orders) = &self.orders {
            Self::validate_orders(orders)?;
        }

        Ok(())
    }

    fn validate_orders(orders: &OrderConfig) -> Result<(), ConfigValidationError> {
        Self::validate_timing("order interarrival", &orders.interarrival)?;
        if orders.min_pairs == 0 || orders.min_pairs > orders.max_pairs {
            return Err(ConfigValidationError::InvalidOrderRange(orders.min_pairs, orders.max_pairs));
        }
        if orders.max_orders == 0 {
            return Err(ConfigValidationError::InvalidMaxOrders);
        }
        if let Some(target) = orders.order_target {
            if target == 0 || target > orders.max_orders {
                return Err(ConfigValidationError::InvalidOrderTarget {
                    target,
                    max_orders: orders.max_orders,
                });
            }
        }
        Ok(())
    }

    /// Helper method to validate one activity's timing
    fn validate_timing(activity: &str, timing: &ActivityTiming) -> Result<(), ConfigValidationError> {
        let invalid = |reason: String| ConfigValidationError::InvalidDuration {
            activity: activity.to_string(),
            reason,
        };

        match timing.distribution {
            DurationDistribution::Exponential { mean } => {
                if !mean.is_finite() || mean < 0.0 {
                    return Err(invalid(format!("mean must be a non-negative finite number, got {}", mean)));
                }
                if timing.stochastic && mean == 0.0 {
                    return Err(invalid("exponential mean must be positive".to_string()));
                }
            }
            DurationDistribution::Uniform { min, max } => {
                if !min.is_finite() || !max.is_finite() || min < 0.0 {
                    return Err(invalid(format!(
                        "range must be non-negative and finite, got [{}, {}]",
                        min, max
                    )));
                }
                if min > max {
                    return Err(invalid(format!("min ({}) must be <= max ({})", min, max)));
                }
            }
        }
        Ok(())
    }
}
