//! Payment-provider events: signature check and payload normalization.
//!
//! The provider delivers at least once and signs the raw body with
//! HMAC-SHA512 keyed by the shared secret. Only `charge.success` events with
//! status `success` move money; the database side lives in
//! `ops::funding`.

use std::fmt;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha512;

use crate::{EngineError, LedgerCategory, Money, ResultEngine};

/// Header carrying the hex signature of the raw body.
pub const SIGNATURE_HEADER: &str = "x-paystack-signature";

const CHARGE_SUCCESS: &str = "charge.success";
const STATUS_SUCCESS: &str = "success";
const CREDIT: &str = "credit";

type HmacSha512 = Hmac<Sha512>;

/// Verifies provider signatures against the shared secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    mac: HmacSha512,
}

impl fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookVerifier { .. }")
    }
}

impl WebhookVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> ResultEngine<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(EngineError::Unauthorized(
                "webhook secret must not be empty".to_string(),
            ));
        }
        let mac = HmacSha512::new_from_slice(secret)
            .map_err(|_| EngineError::Unauthorized("invalid webhook secret".to_string()))?;
        Ok(Self { mac })
    }

    /// Hex HMAC-SHA512 of `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison of `signature` (hex) with the expected MAC.
    pub fn verify(&self, signature: &str, body: &[u8]) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }
}

/// A confirmed wallet funding, normalized from the provider payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundingEvent {
    pub reference: String,
    pub amount: Money,
    pub user_id: i64,
    pub category: LedgerCategory,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    Charge(FundingEvent),
    /// Anything but a successful charge. Acknowledged without side effects.
    Ignored { event: String, status: String },
}

/// What the reconciler did with a delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FundingOutcome {
    Processed { user_id: i64, amount: Money },
    Duplicate { reference: String },
    Ignored,
}

#[derive(Deserialize)]
struct RawEvent {
    event: String,
    #[serde(default)]
    data: RawData,
}

#[derive(Default, Deserialize)]
struct RawData {
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    amount: Option<i64>,
    #[serde(default)]
    metadata: Option<Value>,
    #[serde(default)]
    status: String,
}

/// Parses a verified body.
///
/// Malformed JSON fails with [`EngineError::InvalidPayload`]; a successful
/// charge whose metadata cannot be trusted fails with
/// [`EngineError::BadMetadata`].
pub fn parse_event(body: &[u8]) -> ResultEngine<ProviderEvent> {
    let raw: RawEvent = serde_json::from_slice(body)
        .map_err(|err| EngineError::InvalidPayload(err.to_string()))?;

    if raw.event != CHARGE_SUCCESS || raw.data.status != STATUS_SUCCESS {
        return Ok(ProviderEvent::Ignored {
            event: raw.event,
            status: raw.data.status,
        });
    }

    let reference = raw
        .data
        .reference
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .ok_or_else(|| EngineError::InvalidPayload("missing reference".to_string()))?;

    let amount = raw
        .data
        .amount
        .map(Money::new)
        .filter(|a| a.is_positive())
        .ok_or_else(|| EngineError::BadMetadata("amount must be > 0".to_string()))?;

    let metadata = raw
        .data
        .metadata
        .ok_or_else(|| EngineError::BadMetadata("missing metadata".to_string()))?;

    let transaction_type = metadata_str(&metadata, "transaction_type")?;
    if transaction_type != CREDIT {
        return Err(EngineError::BadMetadata(format!(
            "unsupported transaction_type: {transaction_type}"
        )));
    }
    let category = LedgerCategory::try_from(metadata_str(&metadata, "category")?)
        .map_err(|_| EngineError::BadMetadata("unsupported category".to_string()))?;
    let description = metadata_str(&metadata, "description")?.to_string();
    let user_id = metadata_user_id(&metadata)?;

    Ok(ProviderEvent::Charge(FundingEvent {
        reference,
        amount,
        user_id,
        category,
        description,
    }))
}

fn metadata_str<'a>(metadata: &'a Value, key: &str) -> ResultEngine<&'a str> {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::BadMetadata(format!("{key} missing or not a string")))
}

/// Accepts `user_id` or `userId` as an integer, an integral float or a
/// numeric string.
fn metadata_user_id(metadata: &Value) -> ResultEngine<i64> {
    let bad = || EngineError::BadMetadata("user id missing or invalid".to_string());
    let value = metadata
        .get("user_id")
        .or_else(|| metadata.get("userId"))
        .ok_or_else(bad)?;

    let id = match value {
        Value::Number(n) => match n.as_i64() {
            Some(id) => id,
            None => {
                let f = n.as_f64().ok_or_else(bad)?;
                if f.fract() != 0.0 || f < 1.0 || f > i64::MAX as f64 {
                    return Err(bad());
                }
                f as i64
            }
        },
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| bad())?,
        _ => return Err(bad()),
    };
    if id <= 0 {
        return Err(bad());
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn charge(metadata: Value) -> Vec<u8> {
        json!({
            "event": "charge.success",
            "data": {
                "reference": "ref-1",
                "amount": 500000,
                "status": "success",
                "metadata": metadata,
            }
        })
        .to_string()
        .into_bytes()
    }

    fn metadata(user_id: Value) -> Value {
        json!({
            "userId": user_id,
            "transaction_type": "credit",
            "category": "fund",
            "description": "top up",
        })
    }

    #[test]
    fn signature_round_trip_and_mismatch() {
        let verifier = WebhookVerifier::new("sk_test").unwrap();
        let body = br#"{"event":"charge.success"}"#;
        let signature = verifier.sign(body);
        assert_eq!(signature.len(), 128);
        assert!(verifier.verify(&signature, body));
        assert!(!verifier.verify(&signature, b"{}"));
        assert!(!verifier.verify("not-hex", body));

        let other = WebhookVerifier::new("sk_other").unwrap();
        assert!(!other.verify(&signature, body));
    }

    #[test]
    fn empty_secret_rejected() {
        assert!(WebhookVerifier::new("").is_err());
    }

    #[test]
    fn user_id_accepts_int_float_and_string() {
        for raw in [json!(7), json!(7.0), json!("7")] {
            let ProviderEvent::Charge(event) = parse_event(&charge(metadata(raw))).unwrap() else {
                panic!("expected a charge");
            };
            assert_eq!(event.user_id, 7);
            assert_eq!(event.amount, Money::new(500_000));
            assert_eq!(event.reference, "ref-1");
            assert_eq!(event.category, LedgerCategory::Fund);
        }
    }

    #[test]
    fn snake_case_user_id_is_accepted() {
        let meta = json!({
            "user_id": 3,
            "transaction_type": "credit",
            "category": "fund",
            "description": "",
        });
        let ProviderEvent::Charge(event) = parse_event(&charge(meta)).unwrap() else {
            panic!("expected a charge");
        };
        assert_eq!(event.user_id, 3);
    }

    #[test]
    fn bad_metadata_is_rejected() {
        for raw in [json!(7.5), json!("seven"), json!(null), json!(-1)] {
            assert!(matches!(
                parse_event(&charge(metadata(raw))),
                Err(EngineError::BadMetadata(_))
            ));
        }

        let debit = json!({
            "userId": 1,
            "transaction_type": "debit",
            "category": "fund",
            "description": "",
        });
        assert!(matches!(
            parse_event(&charge(debit)),
            Err(EngineError::BadMetadata(_))
        ));

        let no_description = json!({
            "userId": 1,
            "transaction_type": "credit",
            "category": "fund",
        });
        assert!(matches!(
            parse_event(&charge(no_description)),
            Err(EngineError::BadMetadata(_))
        ));
    }

    #[test]
    fn other_events_are_ignored() {
        let body = json!({
            "event": "transfer.success",
            "data": { "status": "success" }
        })
        .to_string();
        assert!(matches!(
            parse_event(body.as_bytes()),
            Ok(ProviderEvent::Ignored { .. })
        ));

        let failed = json!({
            "event": "charge.success",
            "data": { "reference": "r", "amount": 100, "status": "failed" }
        })
        .to_string();
        assert!(matches!(
            parse_event(failed.as_bytes()),
            Ok(ProviderEvent::Ignored { .. })
        ));
    }

    #[test]
    fn malformed_json_is_invalid_payload() {
        assert!(matches!(
            parse_event(b"{not json"),
            Err(EngineError::InvalidPayload(_))
        ));
    }
}
