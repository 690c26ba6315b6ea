//! Protocol-neutral view of an inbound request
//!
//! The wire layer parses the raw request; extractors and engines only ever
//! see this borrowed view of it.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::net::IpAddr;

/// Header carrying an OpenStack Swift session token
pub const X_AUTH_TOKEN: &str = "x-auth-token";
/// Legacy Swift spelling of the token header
pub const X_STORAGE_TOKEN: &str = "x-storage-token";

/// Query parameters that carry presigned-URL credentials
const QUERY_CREDENTIAL_PARAMS: &[&str] = &[
    "AWSAccessKeyId",
    "Signature",
    "X-Amz-Credential",
    "X-Amz-Signature",
];

/// Form fields that carry POST policy credentials
const FORM_CREDENTIAL_FIELDS: &[&str] = &[
    "AWSAccessKeyId",
    "Signature",
    "Policy",
    "X-Amz-Signature",
];

/// Request context for authentication
#[derive(Debug, Clone, Copy)]
pub struct AuthRequest<'a> {
    /// HTTP method
    pub method: &'a str,
    /// Request path, still percent-encoded
    pub path: &'a str,
    /// HTTP headers
    pub headers: &'a http::HeaderMap,
    /// Raw query string
    pub query: Option<&'a str>,
    /// Decoded form fields of a browser-based POST upload
    pub form: Option<&'a BTreeMap<String, String>>,
    /// Source IP address
    pub source_ip: Option<IpAddr>,
}

impl<'a> AuthRequest<'a> {
    /// Create a new auth request
    pub fn new(method: &'a str, path: &'a str, headers: &'a http::HeaderMap) -> Self {
        Self {
            method,
            path,
            headers,
            query: None,
            form: None,
            source_ip: None,
        }
    }

    /// Set query string
    pub fn with_query(mut self, query: &'a str) -> Self {
        self.query = Some(query);
        self
    }

    /// Set POST form fields
    pub fn with_form(mut self, form: &'a BTreeMap<String, String>) -> Self {
        self.form = Some(form);
        self
    }

    /// Set source IP
    pub fn with_source_ip(mut self, ip: IpAddr) -> Self {
        self.source_ip = Some(ip);
        self
    }

    /// Header value as a string, `None` when absent or not valid ASCII
    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get Authorization header value
    pub fn authorization_header(&self) -> Option<&'a str> {
        self.header("authorization")
    }

    /// Decoded query parameters in request order
    pub fn query_params(&self) -> impl Iterator<Item = (&'a str, Option<Cow<'a, str>>)> {
        self.query
            .unwrap_or("")
            .split('&')
            .filter(|param| !param.is_empty())
            .map(|param| {
                let mut parts = param.splitn(2, '=');
                let key = parts.next().unwrap_or("");
                let value = parts
                    .next()
                    .map(|v| urlencoding::decode(v).unwrap_or(Cow::Borrowed(v)));
                (key, value)
            })
    }

    /// First decoded value of a query parameter
    pub fn query_param(&self, name: &str) -> Option<Cow<'a, str>> {
        self.query_params()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.unwrap_or(Cow::Borrowed("")))
    }

    /// Form field lookup, case-insensitive on the field name
    pub fn form_field(&self, name: &str) -> Option<&'a str> {
        self.form?
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Check if the request carries a Swift session token header
    pub fn has_token_header(&self) -> bool {
        self.headers.contains_key(X_AUTH_TOKEN) || self.headers.contains_key(X_STORAGE_TOKEN)
    }

    /// Check if the request carries credentials of any recognised kind
    pub fn has_any_credentials(&self) -> bool {
        if self.headers.contains_key("authorization") || self.has_token_header() {
            return true;
        }

        if self
            .query_params()
            .any(|(key, _)| QUERY_CREDENTIAL_PARAMS.contains(&key))
        {
            return true;
        }

        FORM_CREDENTIAL_FIELDS
            .iter()
            .any(|field| self.form_field(field).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_param_decoding() {
        let headers = http::HeaderMap::new();
        let request = AuthRequest::new("GET", "/bucket/key", &headers)
            .with_query("acl&Signature=abc%2Bdef%3D&Expires=1700000000");

        assert_eq!(request.query_param("Signature").as_deref(), Some("abc+def="));
        assert_eq!(request.query_param("acl").as_deref(), Some(""));
        assert_eq!(request.query_param("Expires").as_deref(), Some("1700000000"));
        assert!(request.query_param("missing").is_none());
    }

    #[test]
    fn test_form_field_is_case_insensitive() {
        let headers = http::HeaderMap::new();
        let mut form = BTreeMap::new();
        form.insert("awsaccesskeyid".to_string(), "AKIA".to_string());
        let request = AuthRequest::new("POST", "/bucket", &headers).with_form(&form);

        assert_eq!(request.form_field("AWSAccessKeyId"), Some("AKIA"));
        assert!(request.has_any_credentials());
    }

    #[test]
    fn test_has_any_credentials() {
        let mut headers = http::HeaderMap::new();
        let request = AuthRequest::new("GET", "/bucket/key", &headers);
        assert!(!request.has_any_credentials());

        let request = request.with_query("prefix=a&X-Amz-Signature=ff");
        assert!(request.has_any_credentials());

        headers.insert(X_AUTH_TOKEN, "tk".parse().unwrap());
        let request = AuthRequest::new("GET", "/v1/acct", &headers);
        assert!(request.has_token_header());
        assert!(request.has_any_credentials());
    }
}
