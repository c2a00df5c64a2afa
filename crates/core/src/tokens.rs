//! Bearer credential minting and comparison.
//!
//! Two kinds of credentials circulate outside the advisor's authenticated
//! session:
//!
//! - **Signature session tokens**: 256 bits of randomness, hex encoded, stored
//!   alongside the session and compared in constant time. The public session
//!   id is a separate, non-secret identifier.
//! - **Onboarding tokens**: 256 bits of randomness embedded in the shareable
//!   link. Only the SHA-256 hash is persisted.

use chrono::{SubsecRound, Utc};
use rand::Rng;
use subtle::ConstantTimeEq;

use crate::hashing::{hex_encode, sha256_hex};
use crate::types::Timestamp;

/// Random bytes behind every bearer token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Length of the random suffix in a signature session id.
const SESSION_ID_SUFFIX_LEN: usize = 10;

/// Prefix of every signature session id.
pub const SESSION_ID_PREFIX: &str = "sig";

/// Generate a 256-bit random token, hex encoded (64 characters).
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    hex_encode(bytes)
}

/// Generate a collision-resistant signature session id from the creation
/// time and a random suffix, e.g. `sig-192b3f0c2a1-k3v9x0q2mz`.
///
/// The id is not a secret; possession of it grants nothing without the token.
pub fn generate_session_id(now: Timestamp) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(SESSION_ID_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{SESSION_ID_PREFIX}-{:x}-{suffix}", now.timestamp_millis())
}

/// A freshly minted onboarding token.
pub struct GeneratedOnboardingToken {
    /// Goes into the link; never persisted.
    pub plaintext: String,
    /// SHA-256 hex digest of `plaintext`; this is what the database stores.
    pub hash: String,
}

/// Mint a new onboarding token.
pub fn generate_onboarding_token() -> GeneratedOnboardingToken {
    let plaintext = generate_token();
    let hash = hash_onboarding_token(&plaintext);
    GeneratedOnboardingToken { plaintext, hash }
}

/// Hash a presented onboarding token for lookup.
pub fn hash_onboarding_token(token: &str) -> String {
    sha256_hex(token.trim().as_bytes())
}

/// Compare a presented token against the stored one in constant time.
///
/// Length is not secret (all tokens are 64 hex chars), so a length mismatch
/// short-circuits. An empty stored token never matches.
pub fn tokens_match(presented: &str, expected: &str) -> bool {
    let presented = presented.as_bytes();
    let expected = expected.as_bytes();
    !expected.is_empty()
        && presented.len() == expected.len()
        && bool::from(presented.ct_eq(expected))
}

/// Pick the bearer token from the places a mobile client may put it.
///
/// Tried in order: form/body field, `?token=` query parameter, then an
/// `Authorization: Bearer ...` header. Blank values are skipped.
pub fn resolve_presented_token(
    body: Option<&str>,
    query: Option<&str>,
    authorization: Option<&str>,
) -> Option<String> {
    let from_header = authorization.and_then(|h| h.strip_prefix("Bearer "));
    [body, query, from_header]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|t| !t.is_empty())
        .map(str::to_string)
}

/// Build the shareable onboarding URL for a token.
pub fn onboarding_link(base_url: &str, token: &str) -> String {
    format!("{}/onboarding?token={token}", base_url.trim_end_matches('/'))
}

/// Current time at microsecond precision, the resolution `TIMESTAMPTZ` stores,
/// so a value survives a round trip through the database unchanged.
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}
