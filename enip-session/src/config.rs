//! Session configuration

use crate::error::{EnipError, EnipResult};
use std::time::Duration;

/// Timing and sizing of one encapsulation session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Nominal keep-alive interval
    pub keep_alive_interval: Duration,
    /// Fraction of the interval after which idle sessions send a NOP
    pub keep_alive_fraction: f64,
    /// Fraction used for the first NOP after the worker starts
    pub initial_keep_alive_fraction: f64,
    /// Ceiling on the wait for a RegisterSession reply
    pub registration_timeout: Duration,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Delay between sending UnRegisterSession and stopping the worker
    pub unregister_grace: Duration,
    /// Capacity of each outbound queue
    pub queue_capacity: usize,
    /// Largest response identifier before wrapping
    pub response_id_ceiling: u64,
    /// Encapsulation protocol version sent in RegisterSession
    pub protocol_version: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keep_alive_interval: Duration::from_secs(60),
            keep_alive_fraction: 0.9,
            initial_keep_alive_fraction: 0.5,
            registration_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
            unregister_grace: Duration::from_millis(200),
            queue_capacity: 50,
            response_id_ceiling: 10_000,
            protocol_version: 1,
        }
    }
}

impl SessionConfig {
    /// Idle time after which a NOP is due
    pub fn keep_alive_period(&self) -> Duration {
        self.keep_alive_interval.mul_f64(self.keep_alive_fraction)
    }

    /// Delay before the first NOP
    pub fn initial_keep_alive_period(&self) -> Duration {
        self.keep_alive_interval
            .mul_f64(self.initial_keep_alive_fraction)
    }

    /// Check the configuration for values the worker cannot run with
    pub fn validate(&self) -> EnipResult<()> {
        if self.keep_alive_interval.is_zero() {
            return Err(EnipError::InvalidData(
                "keep_alive_interval must be nonzero".to_string(),
            ));
        }
        for (name, fraction) in [
            ("keep_alive_fraction", self.keep_alive_fraction),
            ("initial_keep_alive_fraction", self.initial_keep_alive_fraction),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(EnipError::InvalidData(format!(
                    "{} must be in (0, 1], got {}",
                    name, fraction
                )));
            }
        }
        if self.registration_timeout.is_zero() {
            return Err(EnipError::InvalidData(
                "registration_timeout must be nonzero".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(EnipError::InvalidData(
                "queue_capacity must be nonzero".to_string(),
            ));
        }
        if self.response_id_ceiling < crate::identifiers::FIRST_RESPONSE_ID {
            return Err(EnipError::InvalidData(format!(
                "response_id_ceiling must be at least {}",
                crate::identifiers::FIRST_RESPONSE_ID
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_periods() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.keep_alive_period().as_secs_f64() - 54.0).abs() < 1e-6);
        assert_eq!(config.initial_keep_alive_period(), Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = SessionConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            keep_alive_fraction: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SessionConfig {
            keep_alive_fraction: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
