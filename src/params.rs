//! Request and callback parameter sets.
//!
//! Parameters are held in `BTreeMap`s so lexicographic key order is a
//! structural property rather than a sort performed at hash time.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::{GatewayConfig, Result, VnpayError};

/// Fixed VNPay query-string field names.
pub mod field {
    /// Protocol version.
    pub const VERSION: &str = "vnp_Version";
    /// Gateway command.
    pub const COMMAND: &str = "vnp_Command";
    /// Terminal (merchant) code.
    pub const TMN_CODE: &str = "vnp_TmnCode";
    /// Amount in minor units (VND x 100).
    pub const AMOUNT: &str = "vnp_Amount";
    /// ISO currency code.
    pub const CURR_CODE: &str = "vnp_CurrCode";
    /// Caller-generated transaction reference.
    pub const TXN_REF: &str = "vnp_TxnRef";
    /// Order description.
    pub const ORDER_INFO: &str = "vnp_OrderInfo";
    /// Merchant order category.
    pub const ORDER_TYPE: &str = "vnp_OrderType";
    /// Payment page locale.
    pub const LOCALE: &str = "vnp_Locale";
    /// Redirect target after payment.
    pub const RETURN_URL: &str = "vnp_ReturnUrl";
    /// Client IP address.
    pub const IP_ADDR: &str = "vnp_IpAddr";
    /// Creation timestamp, `yyyyMMddHHmmss` local time.
    pub const CREATE_DATE: &str = "vnp_CreateDate";
    /// Expiration timestamp, same format as [`CREATE_DATE`].
    pub const EXPIRE_DATE: &str = "vnp_ExpireDate";
    /// Optional preselected bank.
    pub const BANK_CODE: &str = "vnp_BankCode";
    /// HMAC-SHA512 signature, lowercase hex.
    pub const SECURE_HASH: &str = "vnp_SecureHash";
    /// Signature algorithm label; excluded from hashing like the hash itself.
    pub const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";
    /// Gateway response code on the return callback.
    pub const RESPONSE_CODE: &str = "vnp_ResponseCode";
    /// Transaction status on the return callback.
    pub const TRANSACTION_STATUS: &str = "vnp_TransactionStatus";
}

/// Response code / transaction status meaning "success".
pub const RESPONSE_CODE_SUCCESS: &str = "00";

/// Response code meaning the user cancelled on the payment page.
pub const RESPONSE_CODE_CANCELLED: &str = "24";

/// `yyyyMMddHHmmss`, as the gateway expects.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Caller inputs for one payment attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Amount in whole VND. Converted to minor units (x100) on the wire.
    pub amount: u64,
    /// Unique reference correlating this request with its return callback.
    pub txn_ref: String,
    /// Human-readable order description.
    pub order_info: String,
    /// IP address of the paying client.
    pub client_ip: String,
    /// When the attempt was created.
    pub created_at: DateTime<Utc>,
    /// Preselected bank, if the user chose one.
    #[serde(default)]
    pub bank_code: Option<String>,
}

/// Outbound request parameters, sorted by field name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestParams(BTreeMap<String, String>);

impl RequestParams {
    /// Build the full outbound parameter set from config and order.
    ///
    /// # Errors
    ///
    /// Returns [`VnpayError::InvalidData`] for a zero amount, an amount that
    /// overflows minor-unit conversion, an empty transaction reference, or an
    /// unrepresentable timezone offset.
    pub fn from_order(config: &GatewayConfig, order: &PaymentOrder) -> Result<Self> {
        if order.amount == 0 {
            return Err(VnpayError::invalid_data("amount", "must be positive"));
        }
        let minor_units = order
            .amount
            .checked_mul(100)
            .ok_or_else(|| VnpayError::invalid_data("amount", "overflows minor units"))?;
        if order.txn_ref.is_empty() {
            return Err(VnpayError::invalid_data("txn_ref", "must not be empty"));
        }
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).ok_or_else(|| {
            VnpayError::invalid_data("utc_offset_minutes", "out of range for a timezone offset")
        })?;
        let created = order.created_at.with_timezone(&offset);
        let expires = created + Duration::minutes(config.expire_minutes);

        let mut params = Self::default();
        params.insert(field::VERSION, config.version.as_str());
        params.insert(field::COMMAND, config.command.as_str());
        params.insert(field::TMN_CODE, config.tmn_code.as_str());
        params.insert(field::AMOUNT, minor_units.to_string());
        params.insert(field::CURR_CODE, config.curr_code.as_str());
        params.insert(field::TXN_REF, order.txn_ref.as_str());
        params.insert(field::ORDER_INFO, order.order_info.as_str());
        params.insert(field::ORDER_TYPE, config.order_type.as_str());
        params.insert(field::LOCALE, config.locale.as_str());
        params.insert(field::RETURN_URL, config.return_url.as_str());
        params.insert(field::IP_ADDR, order.client_ip.as_str());
        params.insert(field::CREATE_DATE, created.format(TIMESTAMP_FORMAT).to_string());
        params.insert(field::EXPIRE_DATE, expires.format(TIMESTAMP_FORMAT).to_string());
        if let Some(bank_code) = &order.bank_code {
            params.insert(field::BANK_CODE, bank_code.as_str());
        }
        Ok(params)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Entries in lexicographic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for RequestParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Decoded parameters of an inbound return callback.
///
/// Holds the gateway's fields as plain strings, percent-decoding already
/// applied, plus typed accessors for the fields the payment flow inspects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackParams(BTreeMap<String, String>);

impl CallbackParams {
    /// Parse a return URL or bare query string.
    ///
    /// Accepts either the full redirect URL (`app://return?vnp_...`) or just
    /// its query part. Values are form-decoded (`+` as space, then
    /// percent-decoded); a value that fails to decode is kept verbatim so a
    /// malformed callback still reaches signature verification and fails
    /// there instead of panicking.
    pub fn parse(raw: &str) -> Self {
        let query = raw.split_once('?').map(|(_, q)| q).unwrap_or(raw);
        let mut params = BTreeMap::new();
        for pair in query.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            let value = value.replace('+', " ");
            let decoded = urlencoding::decode(&value)
                .map(|v| v.into_owned())
                .unwrap_or(value);
            params.insert(key.to_string(), decoded);
        }
        Self(params)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Entries in lexicographic key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn secure_hash(&self) -> Option<&str> {
        self.get(field::SECURE_HASH)
    }

    pub fn secure_hash_type(&self) -> Option<&str> {
        self.get(field::SECURE_HASH_TYPE)
    }

    pub fn response_code(&self) -> Option<&str> {
        self.get(field::RESPONSE_CODE)
    }

    pub fn transaction_status(&self) -> Option<&str> {
        self.get(field::TRANSACTION_STATUS)
    }

    pub fn txn_ref(&self) -> Option<&str> {
        self.get(field::TXN_REF)
    }
}

impl FromIterator<(String, String)> for CallbackParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_config() -> GatewayConfig {
        GatewayConfig::new(
            "DEMOV210",
            "abc",
            "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
            "grocerymart://payment-return",
        )
    }

    fn test_order() -> PaymentOrder {
        PaymentOrder {
            amount: 100_000,
            txn_ref: "TEST123".to_string(),
            order_info: "Thanh toan don hang TEST123".to_string(),
            client_ip: "127.0.0.1".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 15, 3, 30, 0).unwrap(),
            bank_code: None,
        }
    }

    #[test]
    fn test_from_order_builds_full_field_set() {
        let params = RequestParams::from_order(&test_config(), &test_order()).unwrap();
        assert_eq!(params.get(field::VERSION), Some("2.1.0"));
        assert_eq!(params.get(field::COMMAND), Some("pay"));
        assert_eq!(params.get(field::TMN_CODE), Some("DEMOV210"));
        assert_eq!(params.get(field::AMOUNT), Some("10000000"));
        assert_eq!(params.get(field::CURR_CODE), Some("VND"));
        assert_eq!(params.get(field::TXN_REF), Some("TEST123"));
        assert_eq!(params.get(field::LOCALE), Some("vn"));
        assert_eq!(params.get(field::IP_ADDR), Some("127.0.0.1"));
        assert_eq!(params.get(field::BANK_CODE), None);
        assert_eq!(params.len(), 13);
    }

    #[test]
    fn test_timestamps_in_business_timezone() {
        // 03:30 UTC is 10:30 in UTC+7; expiry is creation + 15 minutes.
        let params = RequestParams::from_order(&test_config(), &test_order()).unwrap();
        assert_eq!(params.get(field::CREATE_DATE), Some("20240115103000"));
        assert_eq!(params.get(field::EXPIRE_DATE), Some("20240115104500"));
    }

    #[test]
    fn test_amount_converted_to_minor_units() {
        let mut order = test_order();
        order.amount = 25_500;
        let params = RequestParams::from_order(&test_config(), &order).unwrap();
        assert_eq!(params.get(field::AMOUNT), Some("2550000"));
    }

    #[test]
    fn test_rejects_zero_amount() {
        let mut order = test_order();
        order.amount = 0;
        let err = RequestParams::from_order(&test_config(), &order).unwrap_err();
        assert!(err.to_string().contains("amount"));
    }

    #[test]
    fn test_rejects_minor_unit_overflow() {
        let mut order = test_order();
        order.amount = u64::MAX;
        assert!(RequestParams::from_order(&test_config(), &order).is_err());
    }

    #[test]
    fn test_rejects_empty_txn_ref() {
        let mut order = test_order();
        order.txn_ref = String::new();
        assert!(RequestParams::from_order(&test_config(), &order).is_err());
    }

    #[test]
    fn test_bank_code_included_when_present() {
        let mut order = test_order();
        order.bank_code = Some("NCB".to_string());
        let params = RequestParams::from_order(&test_config(), &order).unwrap();
        assert_eq!(params.get(field::BANK_CODE), Some("NCB"));
    }

    #[test]
    fn test_callback_parse_decodes_values() {
        let callback = CallbackParams::parse(
            "grocerymart://payment-return?vnp_TxnRef=TEST123&vnp_OrderInfo=Thanh%20toan&vnp_ResponseCode=00",
        );
        assert_eq!(callback.txn_ref(), Some("TEST123"));
        assert_eq!(callback.get(field::ORDER_INFO), Some("Thanh toan"));
        assert_eq!(callback.response_code(), Some("00"));
    }

    #[test]
    fn test_callback_parse_form_decodes_plus_as_space() {
        let callback = CallbackParams::parse("vnp_OrderInfo=Thanh+toan+don+hang");
        assert_eq!(callback.get(field::ORDER_INFO), Some("Thanh toan don hang"));
    }

    #[test]
    fn test_callback_parse_tolerates_malformed_pairs() {
        let callback = CallbackParams::parse("vnp_TxnRef=TEST123&justakey&=orphanvalue&vnp_Bad=%ZZ");
        assert_eq!(callback.txn_ref(), Some("TEST123"));
        assert_eq!(callback.get("justakey"), None);
        // Undecodable percent sequence kept verbatim.
        assert_eq!(callback.get("vnp_Bad"), Some("%ZZ"));
    }
}
