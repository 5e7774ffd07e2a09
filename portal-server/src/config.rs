use serde::Deserialize;
use timeslot::{Interval, TimeOfDay};

fn default_port() -> u16 {
    8080
}

fn default_session_ttl_hours() -> i64 {
    24
}

fn default_secure_cookies() -> bool {
    true
}

fn default_session_sweep_interval_secs() -> u64 {
    600
}

fn default_working_day_start() -> TimeOfDay {
    TimeOfDay::from_hm(9, 0).unwrap_or(TimeOfDay::MIDNIGHT)
}

fn default_working_day_end() -> TimeOfDay {
    TimeOfDay::from_hm(17, 0).unwrap_or(TimeOfDay::MIDNIGHT)
}

fn default_meeting_slot_minutes() -> u32 {
    30
}

fn default_pool_max_size() -> usize {
    16
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub port: u16,
    /// Comma separated list of origins allowed to call the API with credentials.
    #[serde(default)]
    pub cors_origins: String,

    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,
    #[serde(default = "default_session_sweep_interval_secs")]
    pub session_sweep_interval_secs: u64,

    #[serde(default = "default_working_day_start")]
    pub working_day_start: TimeOfDay,
    #[serde(default = "default_working_day_end")]
    pub working_day_end: TimeOfDay,
    #[serde(default = "default_meeting_slot_minutes")]
    pub meeting_slot_minutes: u32,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config: Self = ::config::Config::builder()
            .add_source(::config::Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// The working day must be non-empty and fit at least one meeting slot.
    pub fn validate(&self) -> anyhow::Result<()> {
        let working_day = self.working_day()?;
        let window = u32::from(working_day.duration_minutes());
        anyhow::ensure!(
            (1..=window).contains(&self.meeting_slot_minutes),
            "MEETING_SLOT_MINUTES must be between 1 and {window}, got {}",
            self.meeting_slot_minutes
        );

        Ok(())
    }

    /// Defaults for everything except the database.
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            port: default_port(),
            cors_origins: String::new(),
            session_ttl_hours: default_session_ttl_hours(),
            secure_cookies: default_secure_cookies(),
            session_sweep_interval_secs: default_session_sweep_interval_secs(),
            working_day_start: default_working_day_start(),
            working_day_end: default_working_day_end(),
            meeting_slot_minutes: default_meeting_slot_minutes(),
            pool_max_size: default_pool_max_size(),
        }
    }

    pub fn cors_origins(&self) -> impl Iterator<Item = &str> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
    }

    pub fn working_day(&self) -> Result<Interval, timeslot::Error> {
        Interval::new(self.working_day_start, self.working_day_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_origins_skip_blanks() {
        let mut config = Config::with_database_url("postgres://localhost/portal");
        config.cors_origins = " http://localhost:3000, ,https://cse.example.edu ".to_string();

        assert_eq!(
            config.cors_origins().collect::<Vec<_>>(),
            ["http://localhost:3000", "https://cse.example.edu"]
        );
    }

    #[test]
    fn default_working_day_is_nine_to_five() {
        let config = Config::with_database_url("postgres://localhost/portal");
        assert_eq!(config.working_day().unwrap().to_string(), "09:00-17:00");
    }

    #[test]
    fn inverted_working_day_is_rejected() {
        let mut config = Config::with_database_url("postgres://localhost/portal");
        config.working_day_end = "08:00".parse().unwrap();
        assert!(config.working_day().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn meeting_slot_must_fit_the_working_day() {
        let mut config = Config::with_database_url("postgres://localhost/portal");
        assert!(config.validate().is_ok());

        config.meeting_slot_minutes = 8 * 60;
        assert!(config.validate().is_ok());

        for minutes in [0, 8 * 60 + 1, u32::MAX] {
            config.meeting_slot_minutes = minutes;
            assert!(config.validate().is_err(), "{minutes} should be rejected");
        }
    }
}
