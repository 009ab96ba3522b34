//! Threat forecast: seven daily threat records plus the single most potential threat.

use crate::lenient;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

pub const FORECAST_DAYS: u8 = 7;

/// One day of the outlook, four categorized lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyThreat {
    pub day: u8,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub critical_infrastructure_problems: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub public_health_risks: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub economic_disruptions: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub environmental_concerns: Vec<String>,
}

/// Named threat with a 0–10 score. Used for the forecast's most potential threat and
/// for the follow-up threat of an analysis round. Field names follow the oracle schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatRecord {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(
        default,
        rename = "threat_description",
        alias = "description",
        deserialize_with = "lenient::string"
    )]
    pub description: String,
    #[serde(
        default,
        rename = "threat_score",
        alias = "score",
        deserialize_with = "lenient::score"
    )]
    pub score: u8,
}

impl ThreatRecord {
    /// A record with a blank name does not count as a threat.
    pub fn is_named(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreatForecast {
    #[serde(default = "default_time_horizon")]
    pub time_horizon: String,
    pub daily_threats: Vec<DailyThreat>,
    #[serde(default)]
    pub most_potential_threat: ThreatRecord,
}

fn default_time_horizon() -> String {
    "1 week".to_string()
}

/// Why a synthesized `final_answer` is not yet an acceptable forecast.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ForecastDefect {
    #[error("final_answer is malformed: {0}")]
    Malformed(String),

    #[error("daily_threats has {0} entries, expected {expected}", expected = FORECAST_DAYS)]
    WrongLength(usize),

    #[error("day {0} is outside 1-{max}", max = FORECAST_DAYS)]
    DayOutOfRange(u8),

    #[error("day {0} appears more than once")]
    DuplicateDay(u8),
}

impl ThreatForecast {
    /// Parse and validate the oracle's `final_answer`. On success the days are sorted 1..=7.
    pub fn from_final_answer(value: &serde_json::Value) -> Result<Self, ForecastDefect> {
        let mut forecast: ThreatForecast = serde_json::from_value(value.clone())
            .map_err(|e| ForecastDefect::Malformed(e.to_string()))?;
        check_days(&forecast.daily_threats)?;
        forecast.daily_threats.sort_by_key(|d| d.day);
        Ok(forecast)
    }
}

/// Exactly seven entries, days 1–7 each present once.
pub fn check_days(days: &[DailyThreat]) -> Result<(), ForecastDefect> {
    if days.len() != usize::from(FORECAST_DAYS) {
        return Err(ForecastDefect::WrongLength(days.len()));
    }
    let mut seen = BTreeSet::new();
    for d in days {
        if !(1..=FORECAST_DAYS).contains(&d.day) {
            return Err(ForecastDefect::DayOutOfRange(d.day));
        }
        if !seen.insert(d.day) {
            return Err(ForecastDefect::DuplicateDay(d.day));
        }
    }
    Ok(())
}
