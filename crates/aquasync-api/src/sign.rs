// ── Request signing ──
//
// The cloud API authenticates every request with an HMAC-SHA256
// signature over a vendor-mandated string-to-sign. The layout must
// match byte-for-byte:
//
//   {client_id}{access_token}{timestamp}{nonce}{method}\n{sha256(body)}
//   \n{key}:{value}          (one line per query parameter, in order)
//   \n\n{request_path}

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// SHA-256 of the empty string. Kept as an explicit constant so the
/// empty-body case is auditable against the vendor documentation.
pub const EMPTY_BODY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Lowercase hex SHA-256 of a request body.
///
/// An empty body short-circuits to [`EMPTY_BODY_SHA256`].
pub fn sha256_hex(data: &str) -> String {
    if data.is_empty() {
        return EMPTY_BODY_SHA256.to_owned();
    }
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compute the request signature.
///
/// `access_token` is empty for the token-issuance call itself. `params`
/// are the query parameters in the order they appear on the request --
/// iteration order is part of the signed material. Returns uppercase hex.
///
/// Pure and deterministic; safe to call concurrently.
#[allow(clippy::too_many_arguments)]
pub fn sign(
    client_id: &str,
    secret: &str,
    timestamp_millis: i64,
    nonce: &str,
    method: &str,
    request_path: &str,
    access_token: &str,
    body: &str,
    params: &[(&str, &str)],
) -> String {
    let mut string_to_sign = format!(
        "{client_id}{access_token}{timestamp_millis}{nonce}{method}\n{}",
        sha256_hex(body)
    );
    for (key, value) in params {
        string_to_sign.push('\n');
        string_to_sign.push_str(key);
        string_to_sign.push(':');
        string_to_sign.push_str(value);
    }
    string_to_sign.push_str("\n\n");
    string_to_sign.push_str(request_path);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(string_to_sign.as_bytes());
    hex::encode_upper(mac.finalize().into_bytes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // Golden vectors from the vendor signing documentation.
    const CLIENT_ID: &str = "1KAD46OrT9HafiKdsXeg";
    const SECRET: &str = "4OHBOnWOqaEC1mWXOpVL3yV50s0qGSRC";
    const TIMESTAMP: i64 = 1_588_925_778_000;
    const NONCE: &str = "5138cc3a9033d69856923fd07b491173";
    const PARAMS: &[(&str, &str)] = &[
        ("area_id", "29a33e8796834b1efa6"),
        ("call_id", "8afdb70ab2ed11eb85290242ac130003"),
    ];

    #[test]
    fn empty_body_hash_is_the_well_known_constant() {
        assert_eq!(sha256_hex(""), EMPTY_BODY_SHA256);
    }

    #[test]
    fn nonempty_body_hash_differs_from_the_constant() {
        assert_ne!(sha256_hex("{}"), EMPTY_BODY_SHA256);
    }

    #[test]
    fn signature_without_token() {
        let sig = sign(
            CLIENT_ID,
            SECRET,
            TIMESTAMP,
            NONCE,
            "GET",
            "/v1.0/token?grant_type=1",
            "",
            "",
            PARAMS,
        );
        assert_eq!(
            sig,
            "9E48A3E93B302EEECC803C7241985D0A34EB944F40FB573C7B5C2A82158AF13E"
        );
    }

    #[test]
    fn signature_with_token() {
        let sig = sign(
            CLIENT_ID,
            SECRET,
            TIMESTAMP,
            NONCE,
            "GET",
            "/v2.0/apps/schema/users?page_no=1&page_size=50",
            "3f4eda2bdec17232f67c0b188af3eec1",
            "",
            PARAMS,
        );
        assert_eq!(
            sig,
            "AE4481C692AA80B25F3A7E12C3A5FD9BBF6251539DD78E565A1A72A508A88784"
        );
    }

    #[test]
    fn signing_is_deterministic() {
        let once = sign(CLIENT_ID, SECRET, TIMESTAMP, NONCE, "GET", "/v1.0/x", "", "", &[]);
        let twice = sign(CLIENT_ID, SECRET, TIMESTAMP, NONCE, "GET", "/v1.0/x", "", "", &[]);
        assert_eq!(once, twice);
    }

    #[test]
    fn parameter_order_is_signed_material() {
        let forward = sign(CLIENT_ID, SECRET, TIMESTAMP, NONCE, "GET", "/v1.0/x", "", "", PARAMS);
        let reversed: Vec<(&str, &str)> = PARAMS.iter().rev().copied().collect();
        let backward =
            sign(CLIENT_ID, SECRET, TIMESTAMP, NONCE, "GET", "/v1.0/x", "", "", &reversed);
        assert_ne!(forward, backward);
    }
}
