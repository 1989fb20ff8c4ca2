// Signing helpers for the preview mode cookies.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

// Domain separation so a preview signature can't be replayed as anything else.
const PREVIEW_DOMAIN: &[u8] = b"SANITYPREVIEW";

fn keyed_mac(secret: &str) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(PREVIEW_DOMAIN);
    mac
}

/// Hex-encoded HMAC-SHA256 of `payload` keyed by `secret`.
pub fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac = keyed_mac(secret);
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature produced by [`sign`].
pub fn verify(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac = keyed_mac(secret);
    mac.update(payload);
    mac.verify_slice(&signature).is_ok()
}

/// Packs `payload` as `<base64url>.<hex signature>`.
pub fn seal(secret: &str, payload: &[u8]) -> String {
    format!("{}.{}", URL_SAFE_NO_PAD.encode(payload), sign(secret, payload))
}

/// Reverses [`seal`]; `None` if the value is malformed or the signature is wrong.
pub fn unseal(secret: &str, sealed: &str) -> Option<Vec<u8>> {
    let (encoded, signature) = sealed.rsplit_once('.')?;
    let payload = URL_SAFE_NO_PAD.decode(encoded).ok()?;
    verify(secret, &payload, signature).then_some(payload)
}

/// 32 random bytes, hex encoded.
pub fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
