//! # VNPay Payment Codec
//!
//! ## Security Model
//!
//! This crate implements the integrity scheme of VNPay's query-string based
//! payment gateway protocol:
//! - Deterministic canonicalization (sorted keys, value-only percent-encoding)
//! - HMAC-SHA512 over the canonical string, keyed with the merchant secret
//! - Symmetric verification of return callbacks, constant-time comparison
//!
//! The canonical string encodes **values only**, while the final payment URL
//! encodes both keys and values. The remote verifier recomputes the signature
//! the same value-only-encoded way, so this asymmetry is part of the wire
//! contract and must not be normalized away.
//!
//! All codec operations are synchronous and pure: no I/O, no shared state,
//! safe to call from any thread.
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use vnpay_codec::{GatewayConfig, PaymentAttempt, PaymentOrder};
//!
//! let config = GatewayConfig::new(
//!     "DEMOV210",
//!     "supersecret",
//!     "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
//!     "grocerymart://payment-return",
//! );
//! let mut attempt = PaymentAttempt::new(config);
//! let url = attempt.start(&PaymentOrder {
//!     amount: 100_000,
//!     txn_ref: "1705312200123".to_string(),
//!     order_info: "Thanh toan don hang 1705312200123".to_string(),
//!     client_ip: "127.0.0.1".to_string(),
//!     created_at: Utc::now(),
//!     bank_code: None,
//! })?;
//! assert!(url.contains("vnp_SecureHash="));
//! # Ok::<(), vnpay_codec::VnpayError>(())
//! ```

pub mod attempt;
pub mod codec;
pub mod config;
pub mod params;

pub use attempt::{AttemptState, PaymentAttempt, PaymentOutcome};
pub use codec::{build_payment_url, canonical_string, sign, verify_callback};
pub use config::{GatewayConfig, HashSecret};
pub use params::{CallbackParams, PaymentOrder, RequestParams};

pub type Result<T> = std::result::Result<T, VnpayError>;

#[derive(thiserror::Error, Debug)]
pub enum VnpayError {
    /// HMAC key or primitive unavailable. Fatal to the current payment
    /// attempt; never downgraded to an unkeyed hash.
    #[error("cryptographic error: {0}")]
    Crypto(String),
    /// A caller-supplied value failed validation.
    #[error("invalid {field}: {reason}")]
    InvalidData { field: String, reason: String },
    /// Operation not allowed in the attempt's current state.
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),
}

impl VnpayError {
    /// Create an invalid data error.
    pub fn invalid_data(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VnpayError::invalid_data("amount", "must be positive");
        assert_eq!(err.to_string(), "invalid amount: must be positive");

        let err = VnpayError::Crypto("empty signing secret".to_string());
        assert!(err.to_string().contains("cryptographic error"));
    }
}
