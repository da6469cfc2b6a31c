use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;

use crate::availability::horizon::ScanLimits;
use crate::availability::timezone::{TimezoneAdapter, DEFAULT_OFFSET_MINUTES};
use crate::error::AgendaError;

#[derive(Debug, Clone)]
pub struct AgendaConfig {
    pub tick_minutes: u32,
    pub timezone: TimezoneAdapter,
    pub limits: ScanLimits,
    pub scan_deadline: Option<Duration>,
    pub log_level: tracing::Level,
}

impl Default for AgendaConfig {
    fn default() -> Self {
        Self {
            tick_minutes: 30,
            timezone: TimezoneAdapter::default(),
            limits: ScanLimits::default(),
            scan_deadline: None,
            log_level: tracing::Level::INFO,
        }
    }
}

impl AgendaConfig {
    pub fn from_env() -> Result<Self, AgendaError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AgendaError> {
        let defaults = Self::default();

        let timezone = match lookup("AGENDA_TIMEZONE") {
            Some(name) => TimezoneAdapter::from_zone_name(&name, Utc::now())?,
            None => TimezoneAdapter::from_offset_minutes(parse_or(
                &lookup,
                "AGENDA_UTC_OFFSET_MINUTES",
                DEFAULT_OFFSET_MINUTES,
            )?)?,
        };

        let scan_deadline = lookup("AGENDA_SCAN_DEADLINE_MS")
            .map(|raw| parse_value::<u64>("AGENDA_SCAN_DEADLINE_MS", &raw))
            .transpose()?
            .map(Duration::from_millis);

        Ok(Self {
            tick_minutes: parse_or(&lookup, "AGENDA_TICK_MINUTES", defaults.tick_minutes)?,
            timezone,
            limits: ScanLimits {
                horizon_days: parse_or(&lookup, "AGENDA_HORIZON_DAYS", defaults.limits.horizon_days)?,
                target_days: parse_or(&lookup, "AGENDA_TARGET_DAYS", defaults.limits.target_days)?,
                workers: parse_or(&lookup, "AGENDA_SCAN_WORKERS", defaults.limits.workers)?,
            },
            scan_deadline,
            log_level: parse_or(&lookup, "AGENDA_LOG_LEVEL", defaults.log_level)?,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AgendaError> {
    match lookup(name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T, AgendaError> {
    raw.trim()
        .parse()
        .map_err(|_| AgendaError::Config(format!("{name} has an invalid value: '{raw}'")))
}
