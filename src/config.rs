//! Runtime settings. Every flag can also come from the environment (or a `.env` file loaded by
//! the binary).

use clap::Args;
use std::time::Duration;

use crate::model::Money;
use crate::retry::ReadPolicy;

const WEEK_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Args)]
pub struct CheckoutConfig {
    /// Currency new carts are priced in
    #[arg(long, env = "CHECKOUT_CURRENCY", default_value = "UAH")]
    pub currency: String,

    /// Name of the guest session cookie
    #[arg(long, env = "CHECKOUT_SESSION_COOKIE", default_value = "cart_session")]
    pub session_cookie: String,

    /// Guest session cookie lifetime, in seconds
    #[arg(long, env = "CHECKOUT_SESSION_TTL_SECS", default_value_t = WEEK_SECS)]
    pub session_ttl_secs: u64,

    /// Timeout for every actor and collaborator call, in milliseconds
    #[arg(long, env = "CHECKOUT_REQUEST_TIMEOUT_MS", default_value_t = 5_000)]
    pub request_timeout_ms: u64,

    /// Attempts for idempotent reads that fail transiently
    #[arg(long, env = "CHECKOUT_READ_ATTEMPTS", default_value_t = 3)]
    pub read_attempts: u32,

    /// Delay before an error redirect, in milliseconds
    #[arg(long, env = "CHECKOUT_REDIRECT_DELAY_MS", default_value_t = 2_000)]
    pub redirect_delay_ms: u64,

    /// Tax on the subtotal, in basis points
    #[arg(long, env = "CHECKOUT_TAX_RATE_BPS", default_value_t = 0)]
    pub tax_rate_bps: u32,

    /// Country code for phone numbers entered without one
    #[arg(long, env = "CHECKOUT_COUNTRY_CODE", default_value = "380")]
    pub country_code: String,

    /// Base delivery fee for a city, as `City=amount` (repeatable)
    #[arg(
        long = "city-fee",
        env = "CHECKOUT_CITY_FEES",
        value_delimiter = ',',
        value_parser = parse_city_fee
    )]
    pub city_fees: Vec<(String, Money)>,

    /// Channel capacity of each actor
    #[arg(long, env = "CHECKOUT_BUFFER_SIZE", default_value_t = 32)]
    pub buffer_size: usize,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: "UAH".to_string(),
            session_cookie: "cart_session".to_string(),
            session_ttl_secs: WEEK_SECS,
            request_timeout_ms: 5_000,
            read_attempts: 3,
            redirect_delay_ms: 2_000,
            tax_rate_bps: 0,
            country_code: "380".to_string(),
            city_fees: Vec::new(),
            buffer_size: 32,
        }
    }
}

impl CheckoutConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub fn read_policy(&self) -> ReadPolicy {
        ReadPolicy {
            timeout: self.request_timeout(),
            attempts: self.read_attempts,
        }
    }
}

/// Parses `City=amount`.
pub fn parse_city_fee(raw: &str) -> Result<(String, Money), String> {
    let (city, fee) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected City=amount, got `{raw}`"))?;
    let city = city.trim();
    if city.is_empty() {
        return Err(format!("missing city in `{raw}`"));
    }
    let fee = fee
        .trim()
        .parse::<Money>()
        .map_err(|e| format!("invalid fee in `{raw}`: {e}"))?;
    Ok((city.to_string(), fee))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        config: CheckoutConfig,
    }

    #[test]
    fn defaults_match_parsed_defaults() {
        let parsed = Cli::try_parse_from(["demo"]).unwrap().config;
        let default = CheckoutConfig::default();

        assert_eq!(parsed.session_ttl(), Duration::from_secs(WEEK_SECS));
        assert_eq!(parsed.request_timeout(), default.request_timeout());
        assert_eq!(parsed.redirect_delay(), Duration::from_secs(2));
        assert_eq!(parsed.read_attempts, default.read_attempts);
        assert_eq!(parsed.country_code, default.country_code);
    }

    #[test]
    fn city_fees_are_repeatable() {
        let parsed = Cli::try_parse_from([
            "demo",
            "--city-fee",
            "Kyiv=5000",
            "--city-fee",
            "Lviv = 4500",
        ])
        .unwrap()
        .config;
        assert_eq!(
            parsed.city_fees,
            vec![("Kyiv".to_string(), 5_000), ("Lviv".to_string(), 4_500)]
        );
    }

    #[test]
    fn malformed_city_fee_is_refused() {
        assert!(parse_city_fee("Kyiv").is_err());
        assert!(parse_city_fee("=10").is_err());
        assert!(parse_city_fee("Kyiv=ten").is_err());
    }
}
