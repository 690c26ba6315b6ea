//! AWS Signature V2 primitives
//!
//! String-to-sign construction and HMAC-SHA1 signing shared by the header,
//! presigned-query and POST policy engines.
//! Reference: https://docs.aws.amazon.com/AmazonS3/latest/userguide/RESTAuthentication.html

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, NaiveDateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;

use crate::request::AuthRequest;

type HmacSha1 = Hmac<Sha1>;

/// Sub-resources that should be included in the canonical resource
const SUB_RESOURCES: &[&str] = &[
    "acl",
    "cors",
    "delete",
    "lifecycle",
    "location",
    "logging",
    "notification",
    "partNumber",
    "policy",
    "requestPayment",
    "response-cache-control",
    "response-content-disposition",
    "response-content-encoding",
    "response-content-language",
    "response-content-type",
    "response-expires",
    "restore",
    "tagging",
    "torrent",
    "uploadId",
    "uploads",
    "versionId",
    "versioning",
    "versions",
    "website",
];

/// Build the V2 string to sign.
///
/// `date_field` is the `Date` header for header auth, the `Expires` value for
/// presigned URLs, and empty when `x-amz-date` is signed instead.
pub fn string_to_sign(request: &AuthRequest<'_>, date_field: &str) -> String {
    let content_md5 = request.header("content-md5").unwrap_or("");
    let content_type = request.header("content-type").unwrap_or("");

    format!(
        "{}\n{}\n{}\n{}\n{}{}",
        request.method,
        content_md5,
        content_type,
        date_field,
        canonicalized_amz_headers(request),
        canonicalized_resource(request)
    )
}

/// Base64 HMAC-SHA1 of `data` under `secret_key`
pub fn sign(secret_key: &str, data: &str) -> String {
    let mut mac =
        HmacSha1::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// Parse the date formats V2 clients send
pub fn parse_http_date(date_str: &str) -> Option<DateTime<Utc>> {
    // RFC 2822: "Tue, 27 Mar 2007 19:36:42 +0000"
    if let Ok(dt) = DateTime::parse_from_rfc2822(date_str) {
        return Some(dt.with_timezone(&Utc));
    }

    // ISO 8601 basic, used by some clients in x-amz-date
    if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, "%Y%m%dT%H%M%SZ") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
    }

    // RFC 7231 IMF-fixdate
    NaiveDateTime::parse_from_str(date_str, "%a, %d %b %Y %H:%M:%S GMT")
        .ok()
        .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
}

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

fn canonicalized_amz_headers(request: &AuthRequest<'_>) -> String {
    let mut amz_headers: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for (name, value) in request.headers {
        let name_lower = name.as_str().to_lowercase();
        if name_lower.starts_with("x-amz-")
            && let Ok(value_str) = value.to_str()
        {
            // Trim whitespace and collapse multiple spaces
            let trimmed = value_str.split_whitespace().collect::<Vec<_>>().join(" ");
            amz_headers.entry(name_lower).or_default().push(trimmed);
        }
    }

    amz_headers
        .into_iter()
        .map(|(name, values)| format!("{}:{}\n", name, values.join(",")))
        .collect()
}

fn canonicalized_resource(request: &AuthRequest<'_>) -> String {
    let mut resource = if request.path.is_empty() {
        "/".to_string()
    } else {
        request.path.to_string()
    };

    let mut sub_resources: Vec<(&str, Option<String>)> = request
        .query_params()
        .filter(|(key, _)| SUB_RESOURCES.contains(key))
        .map(|(key, value)| (key, value.map(|v| v.into_owned())))
        .collect();

    if !sub_resources.is_empty() {
        sub_resources.sort_by(|a, b| a.0.cmp(b.0));

        let rendered: Vec<String> = sub_resources
            .into_iter()
            .map(|(k, v)| match v {
                Some(val) if !val.is_empty() => format!("{k}={val}"),
                _ => k.to_string(),
            })
            .collect();

        resource.push('?');
        resource.push_str(&rendered.join("&"));
    }

    resource
}
