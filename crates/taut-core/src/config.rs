use jiff::SignedDuration;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Static configuration for the link engine, read once at startup and
/// passed into each component's constructor.
#[derive(Debug, Clone, TypedBuilder)]
pub struct LinkConfig {
    /// Length of auto-derived short codes, in hex characters.
    #[builder(default = 6)]
    pub code_length: usize,

    /// How many times code generation is re-seeded after a collision
    /// before the create fails with an exhausted-retries error.
    #[builder(default = 5)]
    pub generation_attempts: u32,

    /// Server-side constant mixed into the seed on each retry, so an
    /// attacker cannot predict the retry sequence from the URL alone.
    #[builder(setter(into))]
    pub generation_secret: String,

    /// Inactivity TTL: a link with no absolute expiry becomes eligible
    /// for sweeping once it has been neither updated nor used for this
    /// long.
    #[builder(default = SignedDuration::from_hours(7 * 24))]
    pub inactivity_ttl: SignedDuration,

    /// TTL for cached redirect destinations.
    #[builder(default = Duration::from_secs(5 * 60))]
    pub redirect_cache_ttl: Duration,

    /// Pause between sweeper runs. The short default suits demo and
    /// test cycles; production deployments raise it to minutes or hours.
    #[builder(default = Duration::from_secs(10))]
    pub sweep_interval: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_fills_reference_defaults() {
        let config = LinkConfig::builder().generation_secret("s3cret").build();

        assert_eq!(config.code_length, 6);
        assert_eq!(config.generation_attempts, 5);
        assert_eq!(config.generation_secret, "s3cret");
        assert_eq!(config.inactivity_ttl, SignedDuration::from_hours(168));
        assert_eq!(config.redirect_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.sweep_interval, Duration::from_secs(10));
    }

    #[test]
    fn builder_accepts_overrides() {
        let config = LinkConfig::builder()
            .generation_secret("s")
            .code_length(10)
            .generation_attempts(3)
            .build();

        assert_eq!(config.code_length, 10);
        assert_eq!(config.generation_attempts, 3);
    }
}
