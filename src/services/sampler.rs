// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geolocation sampling gate.
//!
//! Wraps the device location stream: raw fixes arrive at whatever rate
//! the platform delivers them, and only fixes that clear the sampling
//! interval and minimum-movement thresholds are handed to the tracker.

use crate::models::LocationPoint;

/// Sampling thresholds applied before a fix reaches the tracker.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    /// Minimum interval between emitted fixes (milliseconds)
    pub interval_ms: i64,
    /// Minimum movement before a new fix is considered (meters)
    pub min_movement_m: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            min_movement_m: 3.0,
        }
    }
}

/// Gate over the raw device location stream.
#[derive(Debug, Default)]
pub struct GeoSampler {
    config: SamplerConfig,
    last_emitted: Option<LocationPoint>,
}

impl GeoSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self {
            config,
            last_emitted: None,
        }
    }

    /// The most recent fix that cleared the gate, used as the start
    /// precondition for a tracking session.
    pub fn last_known(&self) -> Option<LocationPoint> {
        self.last_emitted
    }

    /// Offer a raw fix. Returns the fix if it clears the interval and
    /// movement thresholds, `None` if it was swallowed.
    pub fn offer(&mut self, fix: LocationPoint) -> Option<LocationPoint> {
        if let Some(last) = self.last_emitted {
            if fix.timestamp_ms - last.timestamp_ms < self.config.interval_ms {
                return None;
            }
            if last.distance_m(&fix) < self.config.min_movement_m {
                return None;
            }
        }

        self.last_emitted = Some(fix);
        Some(fix)
    }
}
