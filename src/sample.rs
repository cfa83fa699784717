//! Synthetic air-quality datasets.
//!
//! City datasets combine an annual sine, a weekend dip and uniform noise
//! around a per-city base level. The PM series reproduces the standalone
//! window demo: a 48-step cycle on a slow upward trend.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::Rng;

use crate::types::{Observation, Series};

/// Default number of generated days.
pub const DEFAULT_DAYS: usize = 100;

/// Base level and start date of a sample city.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CityProfile {
    pub key: &'static str,
    pub location: &'static str,
    /// Dataset title shown to users.
    pub title: &'static str,
    pub base: f64,
    pub start_year: i32,
}

pub const CITIES: [CityProfile; 3] = [
    CityProfile {
        key: "beijing",
        location: "Beijing, China",
        title: "Beijing Air Quality (2013-2017)",
        base: 80.0,
        start_year: 2013,
    },
    CityProfile {
        key: "london",
        location: "London, UK",
        title: "London Air Quality (2018-2022)",
        base: 40.0,
        start_year: 2018,
    },
    CityProfile {
        key: "delhi",
        location: "Delhi, India",
        title: "Delhi Air Quality (2019-2023)",
        base: 100.0,
        start_year: 2019,
    },
];

pub const DEFAULT_CITY: CityProfile = CityProfile {
    key: "sample",
    location: "Sample City",
    title: "Sample Air Quality Data",
    base: 60.0,
    start_year: 2020,
};

/// Profile for `key` (case-insensitive); unknown keys get the default city.
pub fn city_profile(key: &str) -> CityProfile {
    let key = key.trim().to_ascii_lowercase();
    CITIES
        .iter()
        .find(|c| c.key == key)
        .copied()
        .unwrap_or(DEFAULT_CITY)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `days` consecutive daily observations for `city`, starting on Jan 1 of
/// its start year.
///
/// Each day carries `pm25`, `pm10`, `aqi`, `o3`, `no2`, `so2` and `co`.
pub fn city_series<R: Rng>(city: &CityProfile, days: usize, rng: &mut R) -> Series {
    let Some(start) = NaiveDate::from_ymd_opt(city.start_year, 1, 1) else {
        return Series::default();
    };

    let observations = (0..days as u64)
        .filter_map(|i| start.checked_add_days(Days::new(i)))
        .map(|date| {
            let seasonal = (f64::from(date.ordinal()) / 365.0 * 2.0 * std::f64::consts::PI).sin() * 30.0;
            let weekend = match date.weekday() {
                Weekday::Sat | Weekday::Sun => -15.0,
                _ => 0.0,
            };
            let noise = rng.gen::<f64>() * 20.0 - 10.0;
            let value = (city.base + seasonal + weekend + noise).round().max(10.0);

            let mut obs = Observation::new(date)
                .with("pm25", (value * 0.8).round())
                .with("pm10", value)
                .with("o3", round_to(rng.gen::<f64>() * 0.04 + 0.02, 3))
                .with("no2", (rng.gen::<f64>() * 30.0 + 20.0).round())
                .with("so2", (rng.gen::<f64>() * 10.0 + 5.0).round())
                .with("co", round_to(rng.gen::<f64>() * 1.5 + 0.5, 1))
                .with("aqi", value);
            obs.location = Some(city.location.to_string());
            obs
        })
        .collect();

    Series::new(observations)
}

/// `n` PM2.5-like readings: `30 + 10 sin(2πi/48) + 0.02i` plus noise in ±2.
pub fn synthetic_pm<R: Rng>(n: usize, rng: &mut R) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let i = i as f64;
            let seasonal = 10.0 * (i * 2.0 * std::f64::consts::PI / 48.0).sin();
            let trend = 0.02 * i;
            let noise = (rng.gen::<f64>() - 0.5) * 4.0;
            30.0 + seasonal + trend + noise
        })
        .collect()
}
