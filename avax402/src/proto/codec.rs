//! Schema-validating decoder for facilitator request bodies.
//!
//! Decoding walks the JSON tree by hand rather than through derived
//! `Deserialize` impls so that every failure names the exact dotted path of the
//! offending field. A `null` value is treated the same as an absent key.

use std::str::FromStr;

use alloy_primitives::{Address, B256, U256};
use serde_json::{Map, Value};

use super::{
    ExactPayload, PaymentAuthorization, PaymentPayload, PaymentRequest, PaymentRequirement,
    SchemaError, SettleRequest, VerifyRequest,
};

/// Decodes a `/verify` request body.
///
/// # Errors
///
/// Returns [`SchemaError`] if the body is not valid JSON or any field is
/// missing or malformed.
pub fn decode_verify_request(body: &[u8]) -> Result<VerifyRequest, SchemaError> {
    decode_payment_request(body)
}

/// Decodes a `/settle` request body.
///
/// # Errors
///
/// Returns [`SchemaError`] if the body is not valid JSON or any field is
/// missing or malformed.
pub fn decode_settle_request(body: &[u8]) -> Result<SettleRequest, SchemaError> {
    decode_payment_request(body)
}

/// Decodes a standalone payment payload.
///
/// Field paths in errors are relative to the payload itself.
///
/// # Errors
///
/// Returns [`SchemaError`] on the first missing or malformed field.
pub fn decode_payment_payload(value: &Value) -> Result<PaymentPayload, SchemaError> {
    payment_payload(&Object::root(value, "")?)
}

/// Decodes a standalone payment requirement.
///
/// # Errors
///
/// Returns [`SchemaError`] on the first missing or malformed field.
pub fn decode_payment_requirement(value: &Value) -> Result<PaymentRequirement, SchemaError> {
    payment_requirement(&Object::root(value, "")?)
}

fn decode_payment_request(body: &[u8]) -> Result<PaymentRequest, SchemaError> {
    let value: Value = serde_json::from_slice(body)?;
    let root = Object::root(&value, "")?;
    Ok(PaymentRequest {
        x402_version: root.u64("x402Version")?,
        payment_payload: payment_payload(&root.object("paymentPayload")?)?,
        payment_requirements: payment_requirement(&root.object("paymentRequirements")?)?,
    })
}

fn payment_payload(obj: &Object<'_>) -> Result<PaymentPayload, SchemaError> {
    let x402_version = obj.u64("x402Version")?;
    let scheme = obj.string("scheme")?.to_owned();
    let network = obj.string("network")?.to_owned();

    let payload = obj.object("payload")?;
    let signature = payload.parse("signature", hex_string)?;
    let auth = payload.object("authorization")?;
    let authorization = PaymentAuthorization {
        from: auth.parse("from", address)?,
        to: auth.parse("to", address)?,
        value: auth.parse("value", decimal)?,
        valid_after: auth.parse("validAfter", decimal)?,
        valid_before: auth.parse("validBefore", decimal)?,
        nonce: auth.parse("nonce", bytes32)?,
    };

    Ok(PaymentPayload {
        x402_version,
        scheme,
        network,
        payload: ExactPayload {
            signature,
            authorization,
        },
    })
}

fn payment_requirement(obj: &Object<'_>) -> Result<PaymentRequirement, SchemaError> {
    Ok(PaymentRequirement {
        scheme: obj.string("scheme")?.to_owned(),
        network: obj.string("network")?.to_owned(),
        max_amount_required: obj.parse_optional("maxAmountRequired", decimal)?,
        pay_to: obj.parse_optional("payTo", address)?,
        asset: obj.parse_optional("asset", address)?,
        resource: obj.optional_string("resource")?.map(str::to_owned),
        description: obj.optional_string("description")?.map(str::to_owned),
        mime_type: obj.optional_string("mimeType")?.map(str::to_owned),
        max_timeout_seconds: obj.optional_u64("maxTimeoutSeconds")?,
    })
}

/// A JSON object together with its dotted path from the document root.
struct Object<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Object<'a> {
    fn root(value: &'a Value, path: &str) -> Result<Self, SchemaError> {
        let field = if path.is_empty() { SchemaError::ROOT } else { path };
        value
            .as_object()
            .map(|map| Self {
                map,
                path: path.to_owned(),
            })
            .ok_or_else(|| SchemaError::new(field, "expected an object"))
    }

    fn field_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_owned()
        } else {
            format!("{}.{key}", self.path)
        }
    }

    fn error(&self, key: &str, reason: impl Into<String>) -> SchemaError {
        SchemaError::new(self.field_path(key), reason)
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    fn required(&self, key: &str) -> Result<&'a Value, SchemaError> {
        self.get(key).ok_or_else(|| self.error(key, "is required"))
    }

    fn object(&self, key: &str) -> Result<Self, SchemaError> {
        Self::root(self.required(key)?, &self.field_path(key))
    }

    fn string(&self, key: &str) -> Result<&'a str, SchemaError> {
        self.required(key)?
            .as_str()
            .ok_or_else(|| self.error(key, "expected a string"))
    }

    fn optional_string(&self, key: &str) -> Result<Option<&'a str>, SchemaError> {
        self.get(key)
            .map(|v| v.as_str().ok_or_else(|| self.error(key, "expected a string")))
            .transpose()
    }

    fn u64(&self, key: &str) -> Result<u64, SchemaError> {
        self.required(key)?
            .as_u64()
            .ok_or_else(|| self.error(key, "expected a non-negative integer"))
    }

    fn optional_u64(&self, key: &str) -> Result<Option<u64>, SchemaError> {
        self.get(key)
            .map(|v| {
                v.as_u64()
                    .ok_or_else(|| self.error(key, "expected a non-negative integer"))
            })
            .transpose()
    }

    fn parse<T>(
        &self,
        key: &str,
        parser: fn(&str) -> Result<T, &'static str>,
    ) -> Result<T, SchemaError> {
        parser(self.string(key)?).map_err(|reason| self.error(key, reason))
    }

    fn parse_optional<T>(
        &self,
        key: &str,
        parser: fn(&str) -> Result<T, &'static str>,
    ) -> Result<Option<T>, SchemaError> {
        self.optional_string(key)?
            .map(|s| parser(s).map_err(|reason| self.error(key, reason)))
            .transpose()
    }
}

fn strip_hex_prefix(s: &str) -> Result<&str, &'static str> {
    s.strip_prefix("0x").ok_or("expected a 0x-prefixed hex string")
}

fn fixed_hex(s: &str, len: usize) -> Result<&str, &'static str> {
    let digits = strip_hex_prefix(s)?;
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err("contains non-hex characters");
    }
    if digits.len() != len {
        return Err(match len {
            40 => "expected 20 bytes of hex",
            _ => "expected 32 bytes of hex",
        });
    }
    Ok(s)
}

fn address(s: &str) -> Result<Address, &'static str> {
    Address::from_str(fixed_hex(s, 40)?).map_err(|_| "invalid address")
}

fn bytes32(s: &str) -> Result<B256, &'static str> {
    B256::from_str(fixed_hex(s, 64)?).map_err(|_| "invalid 32-byte value")
}

fn decimal(s: &str) -> Result<U256, &'static str> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err("expected a decimal integer string");
    }
    U256::from_str_radix(s, 10).map_err(|_| "does not fit in 256 bits")
}

fn hex_string(s: &str) -> Result<String, &'static str> {
    let digits = strip_hex_prefix(s)?;
    if digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(s.to_owned())
    } else {
        Err("contains non-hex characters")
    }
}
