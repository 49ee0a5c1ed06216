use std::time::Duration;

use crate::error::{BufferError, BufferResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Number of slots. Must be at least one.
    pub capacity: usize,
}

impl BufferConfig {
    /// Build from a signed request, as read from a command line or env var.
    pub fn from_signed(capacity: i64) -> BufferResult<Self> {
        if capacity <= 0 {
            return Err(BufferError::InvalidCapacity(capacity));
        }
        let capacity = usize::try_from(capacity)
            .map_err(|_| BufferError::Config(format!("capacity {} out of range", capacity)))?;
        Ok(BufferConfig { capacity })
    }

    pub fn validate(&self) -> BufferResult<()> {
        if self.capacity == 0 {
            return Err(BufferError::InvalidCapacity(0));
        }
        Ok(())
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig { capacity: 16 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub buffer: BufferConfig,
    pub producers: usize,
    pub consumers: usize,
    pub items_per_producer: u64,
    /// Upper bound of a random pause between operations. None => no pause.
    pub jitter: Option<Duration>,
}

impl PipelineConfig {
    pub fn validate(&self) -> BufferResult<()> {
        self.buffer.validate()?;
        if self.producers == 0 {
            return Err(BufferError::Config(
                "pipeline needs at least one producer".to_string(),
            ));
        }
        if self.consumers == 0 {
            return Err(BufferError::Config(
                "pipeline needs at least one consumer".to_string(),
            ));
        }
        if self.total_items().is_none() {
            return Err(BufferError::Config(format!(
                "{} producers x {} items overflows the value range",
                self.producers, self.items_per_producer
            )));
        }
        Ok(())
    }

    /// None when the producers' value ranges would not fit in a u64.
    pub fn total_items(&self) -> Option<u64> {
        u64::try_from(self.producers)
            .ok()?
            .checked_mul(self.items_per_producer)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            buffer: BufferConfig::default(),
            producers: 1,
            consumers: 1,
            items_per_producer: 1000,
            jitter: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_capacity_must_be_positive() {
        assert!(matches!(
            BufferConfig::from_signed(0),
            Err(BufferError::InvalidCapacity(0))
        ));
        assert!(matches!(
            BufferConfig::from_signed(-3),
            Err(BufferError::InvalidCapacity(-3))
        ));
        assert_eq!(BufferConfig::from_signed(8).unwrap().capacity, 8);
    }

    #[test]
    fn pipeline_requires_both_sides() {
        let mut config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        config.consumers = 0;
        assert!(matches!(config.validate(), Err(BufferError::Config(_))));
        config.consumers = 2;
        config.producers = 0;
        assert!(matches!(config.validate(), Err(BufferError::Config(_))));
    }

    #[test]
    fn oversized_item_ranges_rejected() {
        let config = PipelineConfig {
            producers: 2,
            items_per_producer: 1 << 63,
            ..PipelineConfig::default()
        };
        assert_eq!(config.total_items(), None);
        assert!(matches!(config.validate(), Err(BufferError::Config(_))));

        let config = PipelineConfig {
            producers: 1,
            items_per_producer: u64::MAX,
            ..PipelineConfig::default()
        };
        assert_eq!(config.total_items(), Some(u64::MAX));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_capacity_rejected_by_validate() {
        let config = BufferConfig { capacity: 0 };
        assert!(matches!(
            config.validate(),
            Err(BufferError::InvalidCapacity(0))
        ));
    }
}
