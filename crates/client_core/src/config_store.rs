//! Job parameters with tier-dependent bounds.
//!
//! Every write clamps into the bound active at the time of the write, so a
//! reader never observes an out-of-range value.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shared::domain::{AnalysisType, OutputLanguage};
use tracing::{debug, info};

use crate::error::ConfigError;

pub const MIN_TOTAL_BATCHES: u32 = 1;
pub const MIN_SECONDS_PER_BATCH: u32 = 10;
pub const MIN_FRAME_INTERVAL_SECONDS: u32 = 1;
pub const TIER_UNLOCK_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    pub batch_ceiling: u32,
    pub seconds_ceiling: u32,
}

pub const BASE_LIMITS: TierLimits = TierLimits {
    batch_ceiling: 3,
    seconds_ceiling: 60,
};

pub const EXTENDED_LIMITS: TierLimits = TierLimits {
    batch_ceiling: 10,
    seconds_ceiling: 600,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfiguration {
    pub analysis_type: AnalysisType,
    pub output_language: OutputLanguage,
    pub total_batches: u32,
    pub seconds_per_batch: u32,
    pub frame_interval_seconds: u32,
    pub tier_unlocked: bool,
}

impl Default for JobConfiguration {
    fn default() -> Self {
        Self {
            analysis_type: AnalysisType::Meeting,
            output_language: OutputLanguage::Turkish,
            total_batches: 3,
            seconds_per_batch: 60,
            frame_interval_seconds: 10,
            tier_unlocked: false,
        }
    }
}

impl JobConfiguration {
    pub fn limits(&self) -> TierLimits {
        if self.tier_unlocked {
            EXTENDED_LIMITS
        } else {
            BASE_LIMITS
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    AnalysisType,
    OutputLanguage,
    TotalBatches,
    SecondsPerBatch,
    FrameInterval,
}

impl ConfigField {
    pub fn name(self) -> &'static str {
        match self {
            Self::AnalysisType => "analysisType",
            Self::OutputLanguage => "outputLanguage",
            Self::TotalBatches => "totalBatches",
            Self::SecondsPerBatch => "secondsPerBatch",
            Self::FrameInterval => "frameInterval",
        }
    }
}

impl FromStr for ConfigField {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "analysistype" => Ok(Self::AnalysisType),
            "outputlanguage" | "language" => Ok(Self::OutputLanguage),
            "totalbatches" | "batches" => Ok(Self::TotalBatches),
            "secondsperbatch" | "seconds" => Ok(Self::SecondsPerBatch),
            "frameinterval" | "frameintervalseconds" => Ok(Self::FrameInterval),
            _ => Err(ConfigError::UnknownField(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    config: JobConfiguration,
    tier_activations: u32,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &JobConfiguration {
        &self.config
    }

    pub fn limits(&self) -> TierLimits {
        self.config.limits()
    }

    /// Parses `raw` for `field` and stores the clamped value.
    pub fn set_field(
        &mut self,
        field: ConfigField,
        raw: &str,
    ) -> Result<&JobConfiguration, ConfigError> {
        match field {
            ConfigField::AnalysisType => self.config.analysis_type = raw.parse()?,
            ConfigField::OutputLanguage => self.config.output_language = raw.parse()?,
            ConfigField::TotalBatches => {
                let value = parse_whole_number(field, raw)?;
                self.set_total_batches(value);
            }
            ConfigField::SecondsPerBatch => {
                let value = parse_whole_number(field, raw)?;
                self.set_seconds_per_batch(value);
            }
            ConfigField::FrameInterval => {
                let value = parse_whole_number(field, raw)?;
                self.set_frame_interval_seconds(value);
            }
        }
        debug!(field = field.name(), raw, "configuration field updated");
        Ok(&self.config)
    }

    pub fn set_total_batches(&mut self, value: i64) -> u32 {
        let ceiling = self.limits().batch_ceiling;
        self.config.total_batches = clamp(value, MIN_TOTAL_BATCHES, ceiling);
        self.config.total_batches
    }

    pub fn set_seconds_per_batch(&mut self, value: i64) -> u32 {
        let ceiling = self.limits().seconds_ceiling;
        self.config.seconds_per_batch = clamp(value, MIN_SECONDS_PER_BATCH, ceiling);
        self.config.seconds_per_batch
    }

    pub fn set_frame_interval_seconds(&mut self, value: i64) -> u32 {
        self.config.frame_interval_seconds = clamp(value, MIN_FRAME_INTERVAL_SECONDS, u32::MAX);
        self.config.frame_interval_seconds
    }

    /// Counts one activation of the hidden unlock signal. Returns true only
    /// for the activation that performs the unlock.
    pub fn activate_tier_signal(&mut self) -> bool {
        if self.config.tier_unlocked {
            return false;
        }
        self.tier_activations = self.tier_activations.saturating_add(1);
        if self.tier_activations < TIER_UNLOCK_THRESHOLD {
            debug!(activations = self.tier_activations, "tier unlock signal");
            return false;
        }
        self.config.tier_unlocked = true;
        info!("extended configuration limits unlocked");
        true
    }

    /// Returns to the base tier and pulls any extended value back under the
    /// base ceilings.
    pub fn lock_tier(&mut self) {
        self.config.tier_unlocked = false;
        self.tier_activations = 0;
        let batches = i64::from(self.config.total_batches);
        let seconds = i64::from(self.config.seconds_per_batch);
        self.set_total_batches(batches);
        self.set_seconds_per_batch(seconds);
        info!(
            total_batches = self.config.total_batches,
            seconds_per_batch = self.config.seconds_per_batch,
            "extended configuration limits revoked"
        );
    }
}

fn parse_whole_number(field: ConfigField, raw: &str) -> Result<i64, ConfigError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ConfigError::NotANumber {
            field: field.name(),
            raw: raw.to_string(),
        })
}

fn clamp(value: i64, min: u32, max: u32) -> u32 {
    value.clamp(i64::from(min), i64::from(max)) as u32
}

#[cfg(test)]
#[path = "tests/config_store_tests.rs"]
mod tests;
