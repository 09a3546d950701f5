use clap::builder::TypedValueParser as _;
use clap::{Parser, ValueEnum};
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::time::Duration;

use crate::auth::UserCredentials;
use crate::error::Error;

const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_FORM_PHONE: &str = "+34666777888";
const DEFAULT_AUTH_FLOW_PHONE: &str = "+34111222333";
const DEFAULT_REPEAT_PHONES: &str = "+34111111111,+34222222222,+34333333333";
const DEFAULT_SETTLE_DELAY_MS: u64 = 500;
const DEFAULT_ITERATION_PAUSE_MS: u64 = 1000;

/// Which scenario (or group of scenarios) a run executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ScenarioChoice {
    /// Login, read, update and immediately re-read the profile
    AuthFlow,
    /// One profile form round trip with a settle delay before verifying
    SingleFlow,
    /// The single flow repeated once per phone in the repeat list
    RepeatedUpdates,
    /// Single flow, then repeated updates if it passed
    FormSuite,
    /// Update with an invalid token must be rejected and change nothing
    RejectedUpdate,
    /// Login with a wrong password must fail without issuing a token
    InvalidLogin,
    /// Every scenario above
    All,
}

impl fmt::Display for ScenarioChoice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => write!(f, "{}", value.get_name()),
            None => write!(f, "{:?}", self),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Base URL of the web frontend whose API routes are exercised.
    #[arg(short, long, env, default_value = DEFAULT_FRONTEND_URL)]
    frontend_url: String,

    /// Email of the account used to log in.
    #[arg(short, long, env, required_unless_present = "credentials")]
    email: Option<String>,

    /// Password of the account used to log in.
    #[arg(
        short,
        long,
        env,
        hide_env_values = true,
        required_unless_present = "credentials"
    )]
    password: Option<String>,

    /// Email and password in one value (format: email:password)
    #[arg(
        short,
        long,
        env,
        hide_env_values = true,
        conflicts_with_all = ["email", "password"]
    )]
    credentials: Option<String>,

    /// Scenario to run
    #[arg(short, long, env, value_enum, default_value_t = ScenarioChoice::FormSuite)]
    pub scenario: ScenarioChoice,

    /// Phone number written by the single profile form flow.
    #[arg(long, env, default_value = DEFAULT_FORM_PHONE)]
    phone: String,

    /// Phone number written by the auth flow.
    #[arg(long, env, default_value = DEFAULT_AUTH_FLOW_PHONE)]
    auth_flow_phone: String,

    /// Phone numbers written, in order, by the repeated update scenario.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = DEFAULT_REPEAT_PHONES
    )]
    repeat_phones: Vec<String>,

    /// Milliseconds to wait between an update and its verifying read
    #[arg(long, env, default_value_t = DEFAULT_SETTLE_DELAY_MS)]
    pub settle_delay_ms: u64,

    /// Milliseconds to pause between repeated update iterations
    #[arg(long, env, default_value_t = DEFAULT_ITERATION_PAUSE_MS)]
    pub iteration_pause_ms: u64,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Builds a config for the given frontend and account without touching the
    /// command line or the environment. Every other setting takes its default.
    pub fn for_frontend(frontend_url: &str, email: &str, password: &str) -> Self {
        Config {
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
            credentials: None,
            scenario: ScenarioChoice::FormSuite,
            phone: DEFAULT_FORM_PHONE.to_string(),
            auth_flow_phone: DEFAULT_AUTH_FLOW_PHONE.to_string(),
            repeat_phones: DEFAULT_REPEAT_PHONES
                .split(',')
                .map(str::to_string)
                .collect(),
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            iteration_pause_ms: DEFAULT_ITERATION_PAUSE_MS,
            log_level_filter: LevelFilter::Info,
        }
    }

    pub fn set_scenario(mut self, scenario: ScenarioChoice) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn set_phone(mut self, phone: &str) -> Self {
        self.phone = phone.to_string();
        self
    }

    /// Zeroes both waits. Used when the backend is local and deterministic.
    pub fn without_delays(mut self) -> Self {
        self.settle_delay_ms = 0;
        self.iteration_pause_ms = 0;
        self
    }

    pub fn frontend_url(&self) -> &str {
        self.frontend_url.trim_end_matches('/')
    }

    /// The login account, from `--credentials` when given, otherwise from
    /// `--email` and `--password`.
    pub fn credentials(&self) -> Result<UserCredentials, Error> {
        match &self.credentials {
            Some(combined) => UserCredentials::parse(combined),
            None => UserCredentials::new(
                self.email.as_deref().unwrap_or(""),
                self.password.as_deref().unwrap_or(""),
            ),
        }
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn auth_flow_phone(&self) -> &str {
        &self.auth_flow_phone
    }

    pub fn repeat_phones(&self) -> &[String] {
        &self.repeat_phones
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn iteration_pause(&self) -> Duration {
        Duration::from_millis(self.iteration_pause_ms)
    }
}
