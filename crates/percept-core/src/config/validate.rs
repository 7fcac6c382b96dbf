//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !(-1.0..=1.0).contains(&self.tagging.min_score) {
            return Err(ConfigError::ValidationError(
                "tagging.min_score must be between -1.0 and 1.0".into(),
            ));
        }
        if self.tagging.max_tags == 0 {
            return Err(ConfigError::ValidationError(
                "tagging.max_tags must be > 0".into(),
            ));
        }
        if self.tagging.max_tags < self.tagging.min_tags_per_image {
            return Err(ConfigError::ValidationError(
                "tagging.max_tags must be >= tagging.min_tags_per_image".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.tagging.min_score_drop_pct) {
            return Err(ConfigError::ValidationError(
                "tagging.min_score_drop_pct must be between 0.0 and 1.0".into(),
            ));
        }
        if self.tagging.fallback_k == 0 {
            return Err(ConfigError::ValidationError(
                "tagging.fallback_k must be > 0".into(),
            ));
        }
        if self.hub.top_n == 0 {
            return Err(ConfigError::ValidationError(
                "hub.top_n must be > 0".into(),
            ));
        }
        if self.hub.threshold_multiplier <= 0.0 {
            return Err(ConfigError::ValidationError(
                "hub.threshold_multiplier must be > 0".into(),
            ));
        }
        if self.hub.embed_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "hub.embed_batch_size must be > 0".into(),
            ));
        }
        if self.hub.max_derived_queries == 0 {
            return Err(ConfigError::ValidationError(
                "hub.max_derived_queries must be > 0".into(),
            ));
        }
        if self.scheduler.debounce_ms == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.debounce_ms must be > 0".into(),
            ));
        }
        if self.embedding.dimension == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimension must be > 0".into(),
            ));
        }
        if self.embedding.embed_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.embed_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_max_tags() {
        let mut config = Config::default();
        config.tagging.max_tags = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_tags"));
    }

    #[test]
    fn test_validate_rejects_max_tags_below_floor() {
        let mut config = Config::default();
        config.tagging.max_tags = 4;
        config.tagging.min_tags_per_image = 8;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("min_tags_per_image"));
    }

    #[test]
    fn test_validate_rejects_out_of_range_min_score() {
        let mut config = Config::default();
        config.tagging.min_score = 1.5;
        assert!(config.validate().is_err());

        config.tagging.min_score = -1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_top_n() {
        let mut config = Config::default();
        config.hub.top_n = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("top_n"));
    }

    #[test]
    fn test_validate_rejects_nonpositive_multiplier() {
        let mut config = Config::default();
        config.hub.threshold_multiplier = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("threshold_multiplier"));
    }

    #[test]
    fn test_validate_rejects_zero_debounce() {
        let mut config = Config::default();
        config.scheduler.debounce_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("debounce_ms"));
    }

    #[test]
    fn test_validate_allows_zero_min_interval() {
        let mut config = Config::default();
        config.scheduler.min_interval_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_embed_timeout() {
        let mut config = Config::default();
        config.embedding.embed_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("embed_timeout_ms"));
    }
}
