// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! RSA public key reconstruction from published key components.
//!
//! A key set entry carries the modulus `n` and exponent `e` as base64url
//! encoded big-endian unsigned integers. [`decode`] turns them into a
//! [`DecodedPublicKey`] that can verify RSASSA-PKCS1-v1_5 signatures.

use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::Algorithm;
use ring::signature::{self, RsaParameters, RsaPublicKeyComponents};

use super::error::AuthError;

/// An RSA public key reconstructed from a published key record.
///
/// Immutable once built; the key directory shares it behind an `Arc`.
/// The published byte strings are kept as-is so they can be re-encoded
/// exactly; leading zero bytes are only dropped when verifying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPublicKey {
    /// Big-endian modulus as published
    modulus: Vec<u8>,
    /// Big-endian exponent as published
    exponent_bytes: Vec<u8>,
    /// Public exponent value
    exponent: u64,
    /// Algorithm pinned by the key record, if it declared one
    algorithm: Option<Algorithm>,
}

/// Smallest modulus the verifier accepts, in bits.
pub const MIN_MODULUS_BITS: usize = 2048;

/// Largest modulus the verifier accepts, in bits.
pub const MAX_MODULUS_BITS: usize = 8192;

/// Largest public exponent the verifier accepts (2^33 - 1).
pub const MAX_EXPONENT: u64 = (1 << 33) - 1;

/// Decode a base64url modulus/exponent pair into an RSA public key.
///
/// Only keys that can actually verify are returned: the modulus must be
/// 2048 to 8192 bits and the exponent an odd value in `3..=2^33-1`.
pub fn decode(modulus_text: &str, exponent_text: &str) -> Result<DecodedPublicKey, AuthError> {
    let modulus_bytes = decode_component("modulus", modulus_text)?;
    let exponent_bytes = decode_component("exponent", exponent_text)?;

    let modulus_bits = bit_length(&modulus_bytes);
    if modulus_bits == 0 {
        return Err(AuthError::MalformedKeyMaterial("modulus is zero".to_string()));
    }
    if !(MIN_MODULUS_BITS..=MAX_MODULUS_BITS).contains(&modulus_bits) {
        return Err(AuthError::MalformedKeyMaterial(format!(
            "{modulus_bits}-bit modulus is outside {MIN_MODULUS_BITS}..={MAX_MODULUS_BITS} bits"
        )));
    }

    // value = value * 256 + byte, over the whole byte string
    let exponent = exponent_bytes.iter().try_fold(0u64, |value, byte| {
        value
            .checked_mul(256)
            .and_then(|v| v.checked_add(u64::from(*byte)))
            .ok_or_else(|| AuthError::MalformedKeyMaterial("exponent overflows u64".to_string()))
    })?;
    if exponent < 3 || exponent % 2 == 0 || exponent > MAX_EXPONENT {
        return Err(AuthError::MalformedKeyMaterial(format!(
            "exponent {exponent} is not a valid RSA public exponent"
        )));
    }

    Ok(DecodedPublicKey {
        modulus: modulus_bytes,
        exponent_bytes,
        exponent,
        algorithm: None,
    })
}

/// `bytes` without leading zero bytes.
fn significant(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

/// Bit length of a big-endian unsigned integer.
fn bit_length(bytes: &[u8]) -> usize {
    let bytes = significant(bytes);
    let leading = bytes.first().map_or(0, |b| b.leading_zeros() as usize);
    bytes.len() * 8 - leading
}

fn decode_component(name: &str, text: &str) -> Result<Vec<u8>, AuthError> {
    let bytes = Base64UrlUnpadded::decode_vec(text)
        .map_err(|e| AuthError::MalformedKeyMaterial(format!("{name} is not base64url: {e}")))?;
    if bytes.is_empty() {
        return Err(AuthError::MalformedKeyMaterial(format!("{name} is empty")));
    }
    Ok(bytes)
}

/// Whether `alg` belongs to the RSA PKCS#1 v1.5 family this engine verifies.
pub fn is_supported_algorithm(alg: Algorithm) -> bool {
    rsa_parameters(alg).is_some()
}

fn rsa_parameters(alg: Algorithm) -> Option<&'static RsaParameters> {
    match alg {
        Algorithm::RS256 => Some(&signature::RSA_PKCS1_2048_8192_SHA256),
        Algorithm::RS384 => Some(&signature::RSA_PKCS1_2048_8192_SHA384),
        Algorithm::RS512 => Some(&signature::RSA_PKCS1_2048_8192_SHA512),
        _ => None,
    }
}

impl DecodedPublicKey {
    /// Pin the key to the algorithm its record declared.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    /// Algorithm the key record declared, if any.
    pub fn algorithm(&self) -> Option<Algorithm> {
        self.algorithm
    }

    /// Big-endian modulus bytes, exactly as published.
    pub fn modulus_be(&self) -> &[u8] {
        &self.modulus
    }

    pub fn exponent(&self) -> u64 {
        self.exponent
    }

    /// Big-endian exponent bytes, exactly as published.
    pub fn exponent_be(&self) -> &[u8] {
        &self.exponent_bytes
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        bit_length(&self.modulus)
    }

    /// Verify `signature` over `message` with the given RSA algorithm.
    ///
    /// Fails with `UnsupportedAlgorithm` outside the RSA PKCS#1 v1.5 family
    /// and `InvalidSignature` on any verification failure.
    pub fn verify(&self, alg: Algorithm, message: &[u8], signature: &[u8]) -> Result<(), AuthError> {
        let params = rsa_parameters(alg).ok_or(AuthError::UnsupportedAlgorithm)?;
        let components = RsaPublicKeyComponents {
            n: significant(&self.modulus),
            e: significant(&self.exponent_bytes),
        };
        components
            .verify(params, message, signature)
            .map_err(|_| AuthError::InvalidSignature)
    }
}
