//! Payment attempt lifecycle.
//!
//! A thin state machine around the codec, mirroring what the host app's
//! checkout screen observes: `Idle -> GeneratingUrl -> UrlGenerated ->
//! ProcessingReturn -> Completed(outcome)`, with `reset` back to `Idle` from
//! anywhere. All trust decisions (reference correlation, signature check,
//! response-code mapping) live here so the UI layer only renders outcomes.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::GatewayConfig;
use crate::params::{
    CallbackParams, PaymentOrder, RequestParams, RESPONSE_CODE_CANCELLED, RESPONSE_CODE_SUCCESS,
};
use crate::{Result, VnpayError};

/// Terminal result of a payment attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// Reference matched, signature verified, gateway reported success.
    Success,
    /// Reference mismatch, bad signature, or a non-success gateway code.
    Failed,
    /// The user abandoned payment, on the gateway page or in the app.
    Cancelled,
    /// URL generation or signing failed before the gateway was reached.
    Error,
}

/// Observable state of a [`PaymentAttempt`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    GeneratingUrl,
    UrlGenerated { url: String },
    ProcessingReturn,
    Completed(PaymentOutcome),
}

/// One payment attempt against the gateway.
///
/// Owns the merchant configuration and remembers the transaction reference
/// issued at start so the return callback can be correlated before any of
/// its contents are trusted.
#[derive(Clone, Debug)]
pub struct PaymentAttempt {
    config: GatewayConfig,
    state: AttemptState,
    txn_ref: Option<String>,
}

impl PaymentAttempt {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            state: AttemptState::Idle,
            txn_ref: None,
        }
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    /// Terminal outcome, once reached.
    pub fn outcome(&self) -> Option<&PaymentOutcome> {
        match &self.state {
            AttemptState::Completed(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Build and sign the payment URL for `order`.
    ///
    /// Allowed from `Idle` only. On success the attempt holds the order's
    /// transaction reference and moves to `UrlGenerated`; on failure it
    /// terminates with [`PaymentOutcome::Error`] and returns the cause.
    pub fn start(&mut self, order: &PaymentOrder) -> Result<String> {
        if self.state != AttemptState::Idle {
            return Err(VnpayError::InvalidTransition(format!(
                "start called in {:?}",
                self.state
            )));
        }
        self.state = AttemptState::GeneratingUrl;
        debug!(txn_ref = %order.txn_ref, amount = order.amount, "generating payment url");
        let built = RequestParams::from_order(&self.config, order).and_then(|params| {
            codec::build_payment_url(&self.config.payment_url, &params, &self.config.hash_secret)
        });
        match built {
            Ok(url) => {
                self.txn_ref = Some(order.txn_ref.clone());
                self.state = AttemptState::UrlGenerated { url: url.clone() };
                Ok(url)
            }
            Err(err) => {
                warn!(error = %err, "payment url generation failed");
                self.state = AttemptState::Completed(PaymentOutcome::Error);
                Err(err)
            }
        }
    }

    /// Consume the gateway's return redirect and settle the attempt.
    ///
    /// Accepts the full return URL or its query string. Allowed from
    /// `UrlGenerated` only; always leaves the attempt in a terminal state.
    pub fn process_return(&mut self, raw_return: &str) -> Result<PaymentOutcome> {
        if !matches!(self.state, AttemptState::UrlGenerated { .. }) {
            return Err(VnpayError::InvalidTransition(format!(
                "process_return called in {:?}",
                self.state
            )));
        }
        self.state = AttemptState::ProcessingReturn;
        let callback = CallbackParams::parse(raw_return);
        let outcome = self.settle(&callback);
        info!(outcome = ?outcome, "payment attempt settled");
        self.state = AttemptState::Completed(outcome.clone());
        Ok(outcome)
    }

    /// The user backed out before any callback arrived.
    pub fn cancel(&mut self) {
        info!("payment attempt cancelled by caller");
        self.state = AttemptState::Completed(PaymentOutcome::Cancelled);
    }

    /// Back to `Idle`, dropping the recorded reference. Allowed from any state.
    pub fn reset(&mut self) {
        self.state = AttemptState::Idle;
        self.txn_ref = None;
    }

    fn settle(&self, callback: &CallbackParams) -> PaymentOutcome {
        if callback.response_code() == Some(RESPONSE_CODE_CANCELLED) {
            return PaymentOutcome::Cancelled;
        }
        match (self.txn_ref.as_deref(), callback.txn_ref()) {
            (Some(local), Some(remote)) if local == remote => {}
            (local, remote) => {
                warn!(?local, ?remote, "transaction reference mismatch");
                return PaymentOutcome::Failed;
            }
        }
        if !codec::verify_callback(callback, &self.config.hash_secret) {
            return PaymentOutcome::Failed;
        }
        if callback.response_code() != Some(RESPONSE_CODE_SUCCESS) {
            return PaymentOutcome::Failed;
        }
        // Transaction status is optional; when present it must also agree.
        if let Some(status) = callback.transaction_status() {
            if status != RESPONSE_CODE_SUCCESS {
                return PaymentOutcome::Failed;
            }
        }
        PaymentOutcome::Success
    }
}
