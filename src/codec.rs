//! Canonicalization and HMAC-SHA512 signing for VNPay's query-string
//! integrity scheme.
//!
//! ## Security Model
//!
//! The gateway authenticates requests and callbacks with an HMAC-SHA512 over
//! a canonical string: entries sorted by key, empty values dropped, values
//! percent-encoded, keys left raw. The final payment URL percent-encodes
//! both keys and values. The remote verifier recomputes the digest over the
//! value-only-encoded form, so the two encodings must stay asymmetric; this
//! is a wire contract, not an implementation quirk.
//!
//! Verification never panics on malformed input and compares digests in
//! constant time.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha512;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::config::HashSecret;
use crate::params::{field, CallbackParams, RequestParams};
use crate::{Result, VnpayError};

type HmacSha512 = Hmac<Sha512>;

/// Build the canonical hashing string for a parameter set.
///
/// Entries are re-sorted by key regardless of input order, empty-valued
/// entries are dropped, and each remaining entry is rendered as
/// `key=percentEncodedValue`, joined with `&`. Keys are NOT encoded here;
/// only [`build_payment_url`] encodes them.
pub fn canonical_string<'a>(params: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let sorted: BTreeMap<&str, &str> = params
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .collect();
    let mut canonical = String::new();
    for (key, value) in sorted {
        if !canonical.is_empty() {
            canonical.push('&');
        }
        canonical.push_str(key);
        canonical.push('=');
        canonical.push_str(&urlencoding::encode(value));
    }
    canonical
}

/// HMAC-SHA512 the canonical string, rendered as lowercase hex.
///
/// # Errors
///
/// - [`VnpayError::Crypto`] for an empty secret or an unavailable HMAC
///   primitive; never falls back to an unkeyed hash.
/// - [`VnpayError::InvalidData`] for an empty canonical string: an
///   entirely-empty parameter set is a caller bug and is refused rather than
///   silently signed.
pub fn sign(secret: &HashSecret, canonical: &str) -> Result<String> {
    if secret.is_empty() {
        return Err(VnpayError::Crypto("empty signing secret".to_string()));
    }
    if canonical.is_empty() {
        return Err(VnpayError::invalid_data("parameters", "nothing to sign"));
    }
    let mut mac = HmacSha512::new_from_slice(secret.reveal().as_bytes())
        .map_err(|e| VnpayError::Crypto(format!("HMAC-SHA512 init failed: {}", e)))?;
    mac.update(canonical.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build the signed payment URL for an outbound request.
///
/// The signature covers the value-only-encoded canonical string; the final
/// query then encodes BOTH keys and values of every non-empty parameter,
/// appends the `vnp_SecureHash` pair, and joins onto `base_url?`.
pub fn build_payment_url(
    base_url: &str,
    params: &RequestParams,
    secret: &HashSecret,
) -> Result<String> {
    let canonical = canonical_string(params.iter());
    debug!(canonical = %canonical, "built hash data for outbound request");
    let signature = sign(secret, &canonical)?;

    let mut query = String::new();
    for (key, value) in params.iter() {
        if value.is_empty() {
            continue;
        }
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&urlencoding::encode(key));
        query.push('=');
        query.push_str(&urlencoding::encode(value));
    }
    query.push('&');
    query.push_str(&urlencoding::encode(field::SECURE_HASH));
    query.push('=');
    query.push_str(&urlencoding::encode(&signature));

    let url = format!("{}?{}", base_url, query);
    debug!(url = %url, "built outbound payment url");
    Ok(url)
}

/// Verify the signature of an inbound return callback.
///
/// Strips the signature and signature-type fields, rebuilds the canonical
/// string from the remaining (already-decoded) values, recomputes the HMAC
/// and compares to the received digest case-insensitively in constant time.
///
/// Returns `false` for a missing signature, an unverifiable parameter set or
/// a mismatch; never panics.
pub fn verify_callback(callback: &CallbackParams, secret: &HashSecret) -> bool {
    let Some(received) = callback.secure_hash() else {
        warn!("callback has no signature field");
        return false;
    };
    let canonical = canonical_string(
        callback
            .iter()
            .filter(|(key, _)| *key != field::SECURE_HASH && *key != field::SECURE_HASH_TYPE),
    );
    let computed = match sign(secret, &canonical) {
        Ok(digest) => digest,
        Err(err) => {
            warn!(error = %err, "unable to recompute callback signature");
            return false;
        }
    };
    let received = received.to_ascii_lowercase();
    let valid = bool::from(computed.as_bytes().ct_eq(received.as_bytes()));
    if !valid {
        warn!("callback signature mismatch");
    }
    valid
}
