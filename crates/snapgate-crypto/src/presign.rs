//! Presigned object-storage URLs
//!
//! Query-string signing in the S3 SigV4 form accepted by R2 and other
//! S3-compatible stores. The payload is never hashed: uploads are streamed
//! by the client after signing, so the payload hash is always that of the
//! empty string.
//!
//! Every intermediate string is exposed on [`PresignedUrl`] so a single
//! wrong byte can be pinned down against a reference vector.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use snapgate_core::{ObjectStoreConfig, Result, SnapError};
use zeroize::Zeroizing;

type HmacSha256 = Hmac<Sha256>;

/// Signature algorithm identifier
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service component of the credential scope
pub const SERVICE: &str = "s3";

/// Terminator component of the credential scope
pub const TERMINATOR: &str = "aws4_request";

/// SHA-256 of the empty string
pub const EMPTY_PAYLOAD_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Longest lifetime the signature scheme accepts (7 days)
pub const MAX_EXPIRES_SECS: u64 = 604_800;

/// A signed URL together with the strings that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    /// Full URL to hand to the uploading client
    pub url: String,
    /// Canonical request that was hashed
    pub canonical_request: String,
    /// String that was signed
    pub string_to_sign: String,
    /// Hex signature
    pub signature: String,
}

/// Signs requests against one bucket with one set of credentials
#[derive(Clone)]
pub struct RequestSigner {
    scheme: String,
    host: String,
    bucket: String,
    region: String,
    access_key_id: String,
    secret_access_key: Zeroizing<String>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("host", &self.host)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Build a signer from object store configuration
    pub fn new(config: &ObjectStoreConfig) -> Result<Self> {
        let (scheme, rest) = config
            .endpoint
            .trim()
            .split_once("://")
            .ok_or_else(|| SnapError::bad_request("object store endpoint must include a scheme"))?;
        let host = rest.trim_end_matches('/');
        if host.is_empty() || host.contains('/') {
            return Err(SnapError::bad_request(
                "object store endpoint must be scheme://host[:port]",
            ));
        }
        if config.bucket.is_empty() {
            return Err(SnapError::bad_request("object store bucket is required"));
        }
        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_ascii_lowercase(),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            access_key_id: config.access_key_id.clone(),
            secret_access_key: Zeroizing::new(config.secret_access_key.expose().to_string()),
        })
    }

    /// Host header value the URLs are signed for
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Presign a PUT of `key` valid for `ttl_secs` from `now_ms`
    pub fn presign_put(
        &self,
        key: &str,
        content_type: Option<&str>,
        ttl_secs: u64,
        now_ms: u64,
    ) -> Result<PresignedUrl> {
        self.presign("PUT", key, content_type, ttl_secs, now_ms)
    }

    /// Presign an arbitrary method on `key`
    pub fn presign(
        &self,
        method: &str,
        key: &str,
        content_type: Option<&str>,
        ttl_secs: u64,
        now_ms: u64,
    ) -> Result<PresignedUrl> {
        if ttl_secs == 0 || ttl_secs > MAX_EXPIRES_SECS {
            return Err(SnapError::bad_request(format!(
                "presign lifetime must be within 1..={MAX_EXPIRES_SECS} seconds"
            )));
        }
        let now = DateTime::<Utc>::from_timestamp_millis(now_ms as i64)
            .ok_or_else(|| SnapError::internal("timestamp out of range"))?;
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = credential_scope(&date, &self.region);

        let mut headers: Vec<(&str, &str)> = Vec::with_capacity(2);
        if let Some(content_type) = content_type.map(str::trim).filter(|c| !c.is_empty()) {
            headers.push(("content-type", content_type));
        }
        headers.push(("host", self.host.as_str()));
        let signed_headers = headers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");

        let credential = format!("{}/{scope}", self.access_key_id);
        let expires = ttl_secs.to_string();
        let query = canonical_query(&[
            ("X-Amz-Algorithm", ALGORITHM),
            ("X-Amz-Credential", credential.as_str()),
            ("X-Amz-Date", amz_date.as_str()),
            ("X-Amz-Expires", expires.as_str()),
            ("X-Amz-SignedHeaders", signed_headers.as_str()),
        ]);

        let uri = canonical_uri(&self.bucket, key);
        let canonical_request =
            canonical_request(method, &uri, &query, &headers, &signed_headers);
        let string_to_sign = string_to_sign(&amz_date, &scope, &canonical_request);
        let key_bytes = signing_key(&self.secret_access_key, &date, &self.region, SERVICE);
        let signature = hex::encode(hmac_sha256(&key_bytes, string_to_sign.as_bytes()));

        let url = format!(
            "{}://{}{uri}?{query}&X-Amz-Signature={signature}",
            self.scheme, self.host
        );
        tracing::debug!(key, method, ttl_secs, "presigned object request");

        Ok(PresignedUrl {
            url,
            canonical_request,
            string_to_sign,
            signature,
        })
    }
}

/// `date/region/service/aws4_request`
pub fn credential_scope(date: &str, region: &str) -> String {
    format!("{date}/{region}/{SERVICE}/{TERMINATOR}")
}

/// Path-style URI `/bucket/key` with every segment percent-encoded
pub fn canonical_uri(bucket: &str, key: &str) -> String {
    let mut uri = String::with_capacity(bucket.len() + key.len() + 2);
    uri.push('/');
    uri.push_str(&urlencoding::encode(bucket));
    for segment in key.split('/') {
        uri.push('/');
        uri.push_str(&urlencoding::encode(segment));
    }
    uri
}

/// Percent-encode keys and values and join them sorted by encoded key
pub fn canonical_query(params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (urlencoding::encode(k).into_owned(), urlencoding::encode(v).into_owned()))
        .collect();
    encoded.sort();
    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical request over pre-sorted, lower-case headers
pub fn canonical_request(
    method: &str,
    uri: &str,
    query: &str,
    headers: &[(&str, &str)],
    signed_headers: &str,
) -> String {
    let header_block: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    format!("{method}\n{uri}\n{query}\n{header_block}\n{signed_headers}\n{EMPTY_PAYLOAD_SHA256}")
}

/// Algorithm, timestamp, scope and hash of the canonical request
pub fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    let hashed = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    format!("{ALGORITHM}\n{amz_date}\n{scope}\n{hashed}")
}

/// HMAC chain `AWS4<secret>` -> date -> region -> service -> terminator
pub fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Zeroizing<Vec<u8>> {
    let seed = Zeroizing::new(format!("AWS4{secret}"));
    let k_date = Zeroizing::new(hmac_sha256(seed.as_bytes(), date.as_bytes()));
    let k_region = Zeroizing::new(hmac_sha256(&k_date, region.as_bytes()));
    let k_service = Zeroizing::new(hmac_sha256(&k_region, service.as_bytes()));
    Zeroizing::new(hmac_sha256(&k_service, TERMINATOR.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        unreachable!("HMAC accepts keys of any length");
    };
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
