//! Splitting 65-byte ECDSA signatures into the `(v, r, s)` triple.
//!
//! USDC's `transferWithAuthorization` overload used for settlement takes the
//! signature components as separate arguments. The layout is `r ++ s ++ v`,
//! with `v` passed through verbatim (27/28 or 0/1, whatever the wallet
//! produced).

use alloy_primitives::{B256, hex};

/// Length of a raw ECDSA signature.
pub const SIGNATURE_LEN: usize = 65;

/// The components of a 65-byte signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitSignature {
    /// Final byte, unmodified.
    pub v: u8,
    /// Bytes `0..32`.
    pub r: B256,
    /// Bytes `32..64`.
    pub s: B256,
}

/// The signature is not 65 bytes of hex.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedSignature {
    /// Wrong number of hex characters after the prefix.
    #[error("expected 130 hex characters, got {0}")]
    Length(usize),
    /// Not valid hex.
    #[error("signature is not valid hex")]
    Hex,
}

impl SplitSignature {
    /// Reassembles the signature as `r ++ s ++ v`.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut out = [0u8; SIGNATURE_LEN];
        out[..32].copy_from_slice(self.r.as_slice());
        out[32..64].copy_from_slice(self.s.as_slice());
        out[64] = self.v;
        out
    }
}

/// Splits a hex signature, with or without `0x`, into `(v, r, s)`.
///
/// # Errors
///
/// Returns [`MalformedSignature`] unless the input is exactly 130 hex digits
/// after the optional prefix.
pub fn split_signature(signature: &str) -> Result<SplitSignature, MalformedSignature> {
    let digits = signature.strip_prefix("0x").unwrap_or(signature);
    if digits.len() != SIGNATURE_LEN * 2 {
        return Err(MalformedSignature::Length(digits.len()));
    }
    let mut bytes = [0u8; SIGNATURE_LEN];
    hex::decode_to_slice(digits, &mut bytes).map_err(|_| MalformedSignature::Hex)?;
    Ok(SplitSignature {
        r: B256::from_slice(&bytes[..32]),
        s: B256::from_slice(&bytes[32..64]),
        v: bytes[64],
    })
}
