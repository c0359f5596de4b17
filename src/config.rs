//! Gateway configuration.
//!
//! Merchant code, signing secret and URLs are explicit configuration passed
//! into the codec at call time, never object-level constants: the host app
//! loads them from its own config layer and hands them to [`GatewayConfig`].

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The merchant's shared HMAC signing secret.
///
/// Wiped from memory on drop and redacted in `Debug` output so the secret
/// never leaks through logs or crash reports.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashSecret(String);

impl HashSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Expose the raw secret for keying the HMAC.
    pub fn reveal(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for HashSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashSecret(<redacted>)")
    }
}

impl From<&str> for HashSecret {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

/// Static configuration for one VNPay merchant integration.
///
/// The protocol fields (`version`, `command`, `curr_code`, `locale`,
/// `order_type`) default to the values the gateway expects for a standard
/// "pay" flow and rarely need overriding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Terminal (merchant) code issued by VNPay.
    pub tmn_code: String,
    /// Shared HMAC-SHA512 signing secret.
    pub hash_secret: HashSecret,
    /// Base URL of the hosted payment page.
    pub payment_url: String,
    /// URL the payment page redirects back to, typically an app deep link.
    pub return_url: String,
    /// Protocol version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Gateway command name.
    #[serde(default = "default_command")]
    pub command: String,
    /// ISO currency code.
    #[serde(default = "default_curr_code")]
    pub curr_code: String,
    /// Payment page locale.
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Merchant order category.
    #[serde(default = "default_order_type")]
    pub order_type: String,
    /// Minutes until an outbound payment URL expires.
    #[serde(default = "default_expire_minutes")]
    pub expire_minutes: i64,
    /// Business-timezone offset from UTC, in minutes. The gateway expects
    /// timestamps in Vietnam local time (UTC+7).
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

fn default_version() -> String {
    "2.1.0".to_string()
}

fn default_command() -> String {
    "pay".to_string()
}

fn default_curr_code() -> String {
    "VND".to_string()
}

fn default_locale() -> String {
    "vn".to_string()
}

fn default_order_type() -> String {
    "other".to_string()
}

fn default_expire_minutes() -> i64 {
    15
}

fn default_utc_offset_minutes() -> i32 {
    7 * 60
}

impl GatewayConfig {
    /// Create a config with protocol defaults for a standard "pay" flow.
    pub fn new(
        tmn_code: impl Into<String>,
        hash_secret: impl Into<String>,
        payment_url: impl Into<String>,
        return_url: impl Into<String>,
    ) -> Self {
        Self {
            tmn_code: tmn_code.into(),
            hash_secret: HashSecret::new(hash_secret),
            payment_url: payment_url.into(),
            return_url: return_url.into(),
            version: default_version(),
            command: default_command(),
            curr_code: default_curr_code(),
            locale: default_locale(),
            order_type: default_order_type(),
            expire_minutes: default_expire_minutes(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}
