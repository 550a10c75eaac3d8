//! AWS Signature Version 4 for the S3 REST API.
//!
//! Two flavours are needed: header signing for the requests the server makes
//! itself, and query-string presigning for download links handed to browsers.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

pub struct Signer<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub session_token: Option<&'a str>,
    pub region: &'a str,
}

impl Signer<'_> {
    /// Headers to attach to a request: `x-amz-date`, `x-amz-content-sha256`,
    /// the session token if any, and `authorization`.
    pub fn sign_request(
        &self,
        method: &str,
        host: &str,
        path: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Vec<(&'static str, String)> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = sha256_hex(payload);

        let mut headers = vec![
            ("host", host.to_string()),
            ("x-amz-content-sha256", payload_hash.clone()),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(token) = self.session_token {
            headers.push(("x-amz-security-token", token.to_string()));
        }

        let canonical_headers: String = headers
            .iter()
            .map(|(name, value)| format!("{name}:{}\n", value.trim()))
            .collect();
        let signed_headers = headers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "{method}\n{}\n\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
            canonical_path(path)
        );
        let signature = self.signature(&canonical_request, now);

        let authorization = format!(
            "{ALGORITHM} Credential={}/{}, SignedHeaders={signed_headers}, Signature={signature}",
            self.access_key_id,
            self.scope(now)
        );

        headers.retain(|(name, _)| *name != "host");
        headers.push(("authorization", authorization));
        headers
    }

    /// Query string (without the leading `?`) granting `method` on `path`
    /// for `expires_secs` seconds from `now`.
    pub fn presign(
        &self,
        method: &str,
        host: &str,
        path: &str,
        expires_secs: u64,
        now: DateTime<Utc>,
    ) -> String {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let credential = format!("{}/{}", self.access_key_id, self.scope(now));

        let mut params = vec![
            ("X-Amz-Algorithm", ALGORITHM.to_string()),
            ("X-Amz-Credential", credential),
            ("X-Amz-Date", amz_date),
            ("X-Amz-Expires", expires_secs.to_string()),
            ("X-Amz-SignedHeaders", "host".to_string()),
        ];
        if let Some(token) = self.session_token {
            params.push(("X-Amz-Security-Token", token.to_string()));
        }
        params.sort_by(|a, b| a.0.cmp(b.0));

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_request = format!(
            "{method}\n{}\n{query}\nhost:{host}\n\nhost\n{UNSIGNED_PAYLOAD}",
            canonical_path(path)
        );
        let signature = self.signature(&canonical_request, now);

        format!("{query}&X-Amz-Signature={signature}")
    }

    fn scope(&self, now: DateTime<Utc>) -> String {
        format!(
            "{}/{}/{SERVICE}/aws4_request",
            now.format("%Y%m%d"),
            self.region
        )
    }

    fn signature(&self, canonical_request: &str, now: DateTime<Utc>) -> String {
        let string_to_sign = format!(
            "{ALGORITHM}\n{}\n{}\n{}",
            now.format("%Y%m%dT%H%M%SZ"),
            self.scope(now),
            sha256_hex(canonical_request.as_bytes())
        );

        let date_key = hmac(
            format!("AWS4{}", self.secret_access_key).as_bytes(),
            now.format("%Y%m%d").to_string().as_bytes(),
        );
        let region_key = hmac(&date_key, self.region.as_bytes());
        let service_key = hmac(&region_key, SERVICE.as_bytes());
        let signing_key = hmac(&service_key, b"aws4_request");

        hex::encode(hmac(&signing_key, string_to_sign.as_bytes()))
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn canonical_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    uri_encode(path, false)
}

/// RFC 3986 encoding as S3 expects it: everything but unreserved characters
/// is percent-encoded, `/` only when `encode_slash` is set.
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
