//! Simulated sample source
//!
//! Stands in for the probe hardware: readings drift a few degrees around
//! the configured baselines and carry the current UTC time.

use chrono::Utc;
use rand::Rng;
use stream_station_shared::SensorReading;

/// Maximum drift from the baseline, in degrees
const MAX_DRIFT: i32 = 2;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct SimulatedSensor {
    air_baseline: i32,
    water_baseline: i32,
}

impl SimulatedSensor {
    pub fn new(air_baseline: i32, water_baseline: i32) -> Self {
        Self {
            air_baseline,
            water_baseline,
        }
    }

    pub fn sample(&self) -> SensorReading {
        let mut rng = rand::thread_rng();
        SensorReading {
            air_temp: self.air_baseline + rng.gen_range(-MAX_DRIFT..=MAX_DRIFT),
            water_temp: self.water_baseline + rng.gen_range(-MAX_DRIFT..=MAX_DRIFT),
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_readings_stay_near_baseline() {
        let sensor = SimulatedSensor::new(72, 55);
        for _ in 0..100 {
            let reading = sensor.sample();
            assert!((70..=74).contains(&reading.air_temp));
            assert!((53..=57).contains(&reading.water_temp));
        }
    }

    #[test]
    fn test_timestamp_format() {
        let reading = SimulatedSensor::new(0, 0).sample();
        assert_eq!(reading.timestamp.len(), "2024-01-01T00:00:00".len());
        assert!(NaiveDateTime::parse_from_str(&reading.timestamp, TIMESTAMP_FORMAT).is_ok());
    }
}
