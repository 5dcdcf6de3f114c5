use crate::error::LifeError;

/// Hash table size on creation, as a power of two.
pub const INITIAL_TABLE_LOG2: u32 = 16;

/// Past this size the table stops growing and bucket chains get longer instead.
pub const MAX_TABLE_LOG2: u32 = 24;

/// Fraction of the table that may be filled before it is rehashed.
pub const LOAD_FACTOR: f64 = 0.9;

/// Tuning knobs of the canonicalization store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniverseConfig {
    /// The table starts with `2^initial_table_log2 - 1` buckets.
    pub initial_table_log2: u32,

    /// The table never grows beyond `2^max_table_log2 - 1` buckets.
    pub max_table_log2: u32,

    /// Ratio of nodes to buckets that triggers a rehash.
    pub load_factor: f64,
}

impl Default for UniverseConfig {
    fn default() -> Self {
        Self {
            initial_table_log2: INITIAL_TABLE_LOG2,
            max_table_log2: MAX_TABLE_LOG2,
            load_factor: LOAD_FACTOR,
        }
    }
}

impl UniverseConfig {
    pub fn validate(&self) -> Result<(), LifeError> {
        if !(2..=30).contains(&self.initial_table_log2) {
            return Err(LifeError::InvalidConfig {
                reason: "initial_table_log2 must lie in 2..=30",
            });
        }

        if self.max_table_log2 < self.initial_table_log2 || self.max_table_log2 > 30 {
            return Err(LifeError::InvalidConfig {
                reason: "max_table_log2 must lie in initial_table_log2..=30",
            });
        }

        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(LifeError::InvalidConfig {
                reason: "load_factor must lie in (0, 1]",
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::UniverseConfig;

    #[test]
    fn default_is_valid() {
        assert!(UniverseConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_table_sizes() {
        let config = UniverseConfig {
            initial_table_log2: 20,
            max_table_log2: 10,
            ..Default::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_load_factor() {
        for load_factor in [0.0, -1.0, 1.5, f64::NAN] {
            let config = UniverseConfig {
                load_factor,
                ..Default::default()
            };

            assert!(config.validate().is_err(), "accepted {load_factor}");
        }
    }
}
