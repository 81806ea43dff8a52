//! OAuth 1.0a HMAC-SHA1 request signing (RFC 5849 §3.4).
//!
//! Signing happens in three stages that can be driven independently:
//! [`SigningSupport::common_oauth_parameters`] produces the protocol
//! parameters, [`SigningSupport::build_base_string`] normalizes a request into
//! the signature base string, and
//! [`SigningSupport::build_authorization_header_value`] signs it and renders
//! the `Authorization` header.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use thiserror::Error;
use url::Url;

use super::credentials::OAuth1Credentials;
use super::encoding::{Charset, EncodingError, percent_encode, percent_encode_opt};
use super::timestamp::{SystemTimestampGenerator, TimestampGenerator};

type HmacSha1 = Hmac<Sha1>;

pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
pub const OAUTH_SIGNATURE_METHOD: &str = "oauth_signature_method";
pub const OAUTH_TIMESTAMP: &str = "oauth_timestamp";
pub const OAUTH_NONCE: &str = "oauth_nonce";
pub const OAUTH_VERSION: &str = "oauth_version";
pub const OAUTH_TOKEN: &str = "oauth_token";
pub const OAUTH_SIGNATURE: &str = "oauth_signature";

pub const HMAC_SHA1_SIGNATURE_NAME: &str = "HMAC-SHA1";
pub const OAUTH_VERSION_1_0: &str = "1.0";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Fixed rendering order of the header parameters; `oauth_signature` is last.
const HEADER_PARAMETER_ORDER: [&str; 6] = [
    OAUTH_VERSION,
    OAUTH_NONCE,
    OAUTH_SIGNATURE_METHOD,
    OAUTH_CONSUMER_KEY,
    OAUTH_TOKEN,
    OAUTH_TIMESTAMP,
];

/// Multi-valued parameter map. Values under one name keep insertion order
/// until normalization sorts them.
pub type ParameterMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("invalid OAuth credentials: {reason}")]
    InvalidCredentials { reason: &'static str },
    #[error("invalid request URI '{uri}': {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request URI '{uri}' has no host to sign against")]
    UnsupportedUri { uri: String },
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("authorization header contains characters not allowed in a header value")]
    InvalidHeader,
}

/// Appends `value` under `name`.
pub fn add_parameter(parameters: &mut ParameterMap, name: impl Into<String>, value: impl Into<String>) {
    parameters.entry(name.into()).or_default().push(value.into());
}

/// Decodes an `application/x-www-form-urlencoded` body into parameters.
pub fn form_parameters(body: &[u8]) -> ParameterMap {
    let mut parameters = ParameterMap::new();
    for (name, value) in url::form_urlencoded::parse(body) {
        add_parameter(&mut parameters, name, value);
    }
    parameters
}

/// Collects the full signing parameter set: protocol parameters, the decoded
/// query string of `uri`, and any additional (form body) parameters.
///
/// `oauth_signature` is never part of the signed set, whichever source
/// carries it.
pub fn collect_parameters(
    oauth_parameters: &BTreeMap<String, String>,
    uri: &Url,
    additional_parameters: &ParameterMap,
) -> ParameterMap {
    let mut collected = ParameterMap::new();
    for (name, value) in oauth_parameters {
        add_parameter(&mut collected, name.as_str(), value.as_str());
    }
    for (name, value) in uri.query_pairs() {
        add_parameter(&mut collected, name, value);
    }
    for (name, values) in additional_parameters {
        for value in values {
            add_parameter(&mut collected, name.as_str(), value.as_str());
        }
    }
    collected.remove(OAUTH_SIGNATURE);
    collected
}

fn parse_uri(uri: &str) -> Result<Url, SigningError> {
    Url::parse(uri).map_err(|source| SigningError::InvalidUri {
        uri: uri.to_string(),
        source,
    })
}

/// Scheme, host, non-default port and path; no query or fragment.
fn base_string_uri(uri: &Url) -> Result<String, SigningError> {
    let host = uri.host_str().ok_or_else(|| SigningError::UnsupportedUri {
        uri: uri.to_string(),
    })?;
    let port = uri.port().map(|port| format!(":{port}")).unwrap_or_default();
    Ok(format!("{}://{}{}{}", uri.scheme(), host, port, uri.path()))
}

fn is_form_encoded(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|value| value.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// Builds OAuth 1.0a signatures and `Authorization` headers.
#[derive(Clone)]
pub struct SigningSupport {
    timestamp_generator: Arc<dyn TimestampGenerator>,
    charset: Charset,
}

impl SigningSupport {
    /// Signing with wall-clock timestamps and UTF-8 encoding.
    pub fn new() -> Self {
        Self::with_timestamp_generator(Arc::new(SystemTimestampGenerator))
    }

    pub fn with_timestamp_generator(timestamp_generator: Arc<dyn TimestampGenerator>) -> Self {
        Self {
            timestamp_generator,
            charset: Charset::Utf8,
        }
    }

    /// Charset used to transcode names and values before percent-encoding.
    pub fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// The protocol parameters every signed request carries.
    pub fn common_oauth_parameters(
        &self,
        consumer_key: &str,
    ) -> Result<BTreeMap<String, String>, SigningError> {
        if consumer_key.is_empty() {
            return Err(SigningError::InvalidCredentials {
                reason: "consumer key is empty",
            });
        }

        let timestamp = self.timestamp_generator.generate_timestamp();
        let nonce = self.timestamp_generator.generate_nonce(timestamp);

        let mut parameters = BTreeMap::new();
        parameters.insert(OAUTH_CONSUMER_KEY.to_string(), consumer_key.to_string());
        parameters.insert(
            OAUTH_SIGNATURE_METHOD.to_string(),
            HMAC_SHA1_SIGNATURE_NAME.to_string(),
        );
        parameters.insert(OAUTH_TIMESTAMP.to_string(), timestamp.to_string());
        parameters.insert(OAUTH_NONCE.to_string(), nonce.to_string());
        parameters.insert(OAUTH_VERSION.to_string(), OAUTH_VERSION_1_0.to_string());
        Ok(parameters)
    }

    /// Normalizes a request into the signature base string.
    ///
    /// `parameters` must already hold every parameter that takes part in the
    /// signature (see [`collect_parameters`]). Any query string on `uri` is
    /// left out of the base URI.
    pub fn build_base_string(
        &self,
        method: &Method,
        uri: &str,
        parameters: &ParameterMap,
    ) -> Result<String, SigningError> {
        let uri = parse_uri(uri)?;
        self.base_string_for(method, &uri, parameters)
    }

    fn base_string_for(
        &self,
        method: &Method,
        uri: &Url,
        parameters: &ParameterMap,
    ) -> Result<String, SigningError> {
        let mut encoded = Vec::new();
        for (name, values) in parameters {
            let encoded_name = percent_encode(name, self.charset)?;
            for value in values {
                encoded.push((encoded_name.clone(), percent_encode(value, self.charset)?));
            }
        }
        encoded.sort();

        let normalized = encoded
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        Ok(format!(
            "{}&{}&{}",
            method.as_str().to_ascii_uppercase(),
            percent_encode(&base_string_uri(uri)?, self.charset)?,
            percent_encode(&normalized, self.charset)?,
        ))
    }

    /// HMAC-SHA1 over `base_string`, Base64 then percent-encoded.
    pub fn calculate_signature(
        &self,
        base_string: &str,
        consumer_secret: &str,
        token_secret: Option<&str>,
    ) -> Result<String, SigningError> {
        let key = format!(
            "{}&{}",
            percent_encode(consumer_secret, self.charset)?,
            percent_encode_opt(token_secret, self.charset)?
        );

        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).map_err(|_| SigningError::InvalidCredentials {
                reason: "signing key rejected",
            })?;
        mac.update(base_string.as_bytes());
        let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        Ok(percent_encode(&signature, self.charset)?)
    }

    /// Checks a presented, percent-encoded signature in constant time.
    pub fn verify_signature(
        &self,
        base_string: &str,
        consumer_secret: &str,
        token_secret: Option<&str>,
        presented: &str,
    ) -> Result<bool, SigningError> {
        let expected = self.calculate_signature(base_string, consumer_secret, token_secret)?;
        Ok(expected.as_bytes().ct_eq(presented.as_bytes()).into())
    }

    /// Signs a request and renders the `Authorization` header value.
    ///
    /// The query parameters of `uri` and `additional_parameters` take part in
    /// the signature but never appear in the header.
    pub fn build_authorization_header_value(
        &self,
        method: &Method,
        uri: &str,
        oauth_parameters: &BTreeMap<String, String>,
        additional_parameters: &ParameterMap,
        consumer_secret: &str,
        token_secret: Option<&str>,
    ) -> Result<String, SigningError> {
        if consumer_secret.is_empty() {
            return Err(SigningError::InvalidCredentials {
                reason: "consumer secret is empty",
            });
        }
        if oauth_parameters
            .get(OAUTH_CONSUMER_KEY)
            .is_none_or(|key| key.is_empty())
        {
            return Err(SigningError::InvalidCredentials {
                reason: "consumer key is empty",
            });
        }

        let uri = parse_uri(uri)?;
        let collected = collect_parameters(oauth_parameters, &uri, additional_parameters);
        let base_string = self.base_string_for(method, &uri, &collected)?;
        let signature = self.calculate_signature(&base_string, consumer_secret, token_secret)?;

        let mut parts = Vec::with_capacity(oauth_parameters.len() + 1);
        for name in HEADER_PARAMETER_ORDER {
            if let Some(value) = oauth_parameters.get(name) {
                parts.push(format!("{name}=\"{value}\""));
            }
        }
        for (name, value) in oauth_parameters {
            if HEADER_PARAMETER_ORDER.contains(&name.as_str()) || name == OAUTH_SIGNATURE {
                continue;
            }
            parts.push(format!(
                "{}=\"{}\"",
                percent_encode(name, self.charset)?,
                percent_encode(value, self.charset)?
            ));
        }
        parts.push(format!("{OAUTH_SIGNATURE}=\"{signature}\""));

        Ok(format!("OAuth {}", parts.join(", ")))
    }

    /// Builds the header for a request described by its parts. Body
    /// parameters are signed only for form-encoded bodies.
    pub fn authorization_header_for(
        &self,
        method: &Method,
        uri: &str,
        content_type: Option<&str>,
        body: &[u8],
        credentials: &OAuth1Credentials,
    ) -> Result<String, SigningError> {
        credentials.validate()?;

        let mut oauth_parameters = self.common_oauth_parameters(&credentials.consumer_key)?;
        if let Some(token) = credentials.access_token.as_deref() {
            oauth_parameters.insert(OAUTH_TOKEN.to_string(), token.to_string());
        }

        let additional_parameters = if is_form_encoded(content_type) {
            form_parameters(body)
        } else {
            ParameterMap::new()
        };

        self.build_authorization_header_value(
            method,
            uri,
            &oauth_parameters,
            &additional_parameters,
            &credentials.consumer_secret,
            credentials.token_secret.as_deref(),
        )
    }
}

impl Default for SigningSupport {
    fn default() -> Self {
        Self::new()
    }
}

/// Adds an OAuth 1.0a `Authorization` header to outgoing requests.
///
/// Only the header is touched; sending the request is up to the caller.
#[derive(Clone)]
pub struct OAuth1RequestSigner {
    signing_support: SigningSupport,
    credentials: OAuth1Credentials,
}

impl OAuth1RequestSigner {
    pub fn new(credentials: OAuth1Credentials) -> Self {
        Self::with_signing_support(credentials, SigningSupport::new())
    }

    pub fn with_signing_support(credentials: OAuth1Credentials, signing_support: SigningSupport) -> Self {
        Self {
            signing_support,
            credentials,
        }
    }

    pub fn credentials(&self) -> &OAuth1Credentials {
        &self.credentials
    }

    pub fn sign(&self, request: &mut reqwest::Request) -> Result<(), SigningError> {
        let content_type = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        let body = request
            .body()
            .and_then(|body| body.as_bytes())
            .unwrap_or_default();

        let header = self.signing_support.authorization_header_for(
            request.method(),
            request.url().as_str(),
            content_type,
            body,
            &self.credentials,
        )?;
        let value = HeaderValue::from_str(&header).map_err(|_| SigningError::InvalidHeader)?;

        tracing::trace!(
            method = %request.method(),
            url = %request.url(),
            "Signed OAuth1 request"
        );
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth1::timestamp::FixedTimestampGenerator;

    const RFC_EXAMPLE_BASE_STRING: &str = "POST&http%3A%2F%2Fexample.com%2Frequest&a2%3Dr%2520b%26a3%3D2%2520q%26a3%3Da%26b5%3D%253D%26c%2540%3D%26c2%3D%26oauth_consumer_key%3D9djdj82h48djs9d2%26oauth_nonce%3D1357924680%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D2468013579%26oauth_token%3Dkkk9d7dh3k39sjv7%26oauth_version%3D1.0";

    fn fixed(timestamp: u64, nonce: u64) -> SigningSupport {
        SigningSupport::with_timestamp_generator(Arc::new(FixedTimestampGenerator::new(
            timestamp, nonce,
        )))
    }

    fn example_oauth_parameters() -> BTreeMap<String, String> {
        let mut parameters = fixed(2468013579, 1357924680)
            .common_oauth_parameters("9djdj82h48djs9d2")
            .unwrap();
        parameters.insert(OAUTH_TOKEN.to_string(), "kkk9d7dh3k39sjv7".to_string());
        parameters
    }

    #[test]
    fn common_parameters_use_generator_in_order() {
        let parameters = fixed(1234567890, 987654321)
            .common_oauth_parameters("consumer")
            .unwrap();

        assert_eq!(parameters.len(), 5);
        assert_eq!(parameters[OAUTH_CONSUMER_KEY], "consumer");
        assert_eq!(parameters[OAUTH_SIGNATURE_METHOD], "HMAC-SHA1");
        assert_eq!(parameters[OAUTH_TIMESTAMP], "1234567890");
        assert_eq!(parameters[OAUTH_NONCE], "987654321");
        assert_eq!(parameters[OAUTH_VERSION], "1.0");
    }

    #[test]
    fn common_parameters_require_consumer_key() {
        assert!(matches!(
            SigningSupport::new().common_oauth_parameters(""),
            Err(SigningError::InvalidCredentials { .. })
        ));
    }

    #[test]
    fn base_string_matches_rfc_example() {
        let mut parameters = ParameterMap::new();
        for (name, value) in example_oauth_parameters() {
            add_parameter(&mut parameters, name, value);
        }
        // Duplicate names supplied out of order on purpose
        add_parameter(&mut parameters, "a3", "a");
        add_parameter(&mut parameters, "a3", "2 q");
        add_parameter(&mut parameters, "b5", "=");
        add_parameter(&mut parameters, "a2", "r b");
        add_parameter(&mut parameters, "c@", "");
        add_parameter(&mut parameters, "c2", "");

        let base_string = SigningSupport::new()
            .build_base_string(&Method::POST, "http://example.com/request", &parameters)
            .unwrap();
        assert_eq!(base_string, RFC_EXAMPLE_BASE_STRING);
    }

    #[test]
    fn base_string_collects_query_and_form_parameters() {
        let uri = Url::parse("http://example.com/request?b5=%3D&a3=a&c%40=&a2=r%20b").unwrap();
        let body = form_parameters(b"c2&a3=2+q");
        let collected = collect_parameters(&example_oauth_parameters(), &uri, &body);

        let base_string = SigningSupport::new()
            .build_base_string(&Method::POST, uri.as_str(), &collected)
            .unwrap();
        assert_eq!(base_string, RFC_EXAMPLE_BASE_STRING);
    }

    #[test]
    fn previous_signature_is_excluded_from_signed_parameters() {
        let uri =
            Url::parse("http://example.com/request?b5=%3D&a3=a&c%40=&a2=r%20b&oauth_signature=stale")
                .unwrap();
        let mut oauth = example_oauth_parameters();
        oauth.insert(OAUTH_SIGNATURE.to_string(), "stale".to_string());
        let mut body = form_parameters(b"c2&a3=2+q");
        add_parameter(&mut body, OAUTH_SIGNATURE, "also-stale");

        let collected = collect_parameters(&oauth, &uri, &body);
        assert!(!collected.contains_key(OAUTH_SIGNATURE));

        let base_string = SigningSupport::new()
            .build_base_string(&Method::POST, "http://example.com/request", &collected)
            .unwrap();
        assert_eq!(base_string, RFC_EXAMPLE_BASE_STRING);
    }

    #[test]
    fn base_string_is_stable_across_calls_and_input_order() {
        let signing = SigningSupport::new();
        let mut first = ParameterMap::new();
        add_parameter(&mut first, "z", "1");
        add_parameter(&mut first, "a", "2");
        add_parameter(&mut first, "a", "1");
        let mut second = ParameterMap::new();
        add_parameter(&mut second, "a", "1");
        add_parameter(&mut second, "z", "1");
        add_parameter(&mut second, "a", "2");

        let a = signing
            .build_base_string(&Method::GET, "https://example.com/x", &first)
            .unwrap();
        let b = signing
            .build_base_string(&Method::GET, "https://example.com/x", &first)
            .unwrap();
        let c = signing
            .build_base_string(&Method::GET, "https://example.com/x", &second)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a, "GET&https%3A%2F%2Fexample.com%2Fx&a%3D1%26a%3D2%26z%3D1");
    }

    #[test]
    fn base_uri_normalizes_scheme_host_and_port() {
        let signing = SigningSupport::new();
        let mut parameters = ParameterMap::new();
        add_parameter(&mut parameters, "id", "123");

        let default_port = signing
            .build_base_string(&Method::GET, "HTTP://Example.COM:80/r%20v/X?id=123#frag", &parameters)
            .unwrap();
        assert_eq!(default_port, "GET&http%3A%2F%2Fexample.com%2Fr%2520v%2FX&id%3D123");

        let custom_port = signing
            .build_base_string(&Method::GET, "https://www.example.net:8080/?q=1", &ParameterMap::new())
            .unwrap();
        assert_eq!(custom_port, "GET&https%3A%2F%2Fwww.example.net%3A8080%2F&");
    }

    #[test]
    fn malformed_uri_is_rejected() {
        let result = SigningSupport::new().build_base_string(&Method::GET, "not a uri", &ParameterMap::new());
        assert!(matches!(result, Err(SigningError::InvalidUri { .. })));
    }

    #[test]
    fn non_ascii_parameters_fail_with_ascii_charset() {
        let mut parameters = ParameterMap::new();
        add_parameter(&mut parameters, "status", "héllo");
        let result = SigningSupport::new()
            .with_charset(Charset::UsAscii)
            .build_base_string(&Method::POST, "https://example.com/", &parameters);
        assert!(matches!(result, Err(SigningError::Encoding(_))));
    }

    #[test]
    fn signature_for_known_base_string() {
        let signing = SigningSupport::new();
        assert_eq!(
            signing
                .calculate_signature(RFC_EXAMPLE_BASE_STRING, "consumer_secret", Some("token_secret"))
                .unwrap(),
            "30aefcWd8I1Vj9oGNQhxsDV4gW0%3D"
        );

        // Published RFC 5849 §3.4.1 example
        let rfc = "POST&http%3A%2F%2Fexample.com%2Frequest&a2%3Dr%2520b%26a3%3D2%2520q%26a3%3Da%26b5%3D%253D%25253D%26c%2540%3D%26c2%3D%26oauth_consumer_key%3D9djdj82h48djs9d2%26oauth_nonce%3D7d8f3e4a%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D137131201%26oauth_token%3Dkkk9d7dh3k39sjv7";
        assert_eq!(
            signing
                .calculate_signature(rfc, "j49sk3j29djd", Some("dh893hdasih9"))
                .unwrap(),
            "r6%2FTJjbCOr97%2F%2BUU0NsvSne7s5g%3D"
        );
    }

    #[test]
    fn verify_signature_compares_encoded_form() {
        let signing = SigningSupport::new();
        assert!(signing
            .verify_signature(
                RFC_EXAMPLE_BASE_STRING,
                "consumer_secret",
                Some("token_secret"),
                "30aefcWd8I1Vj9oGNQhxsDV4gW0%3D"
            )
            .unwrap());
        assert!(!signing
            .verify_signature(
                RFC_EXAMPLE_BASE_STRING,
                "consumer_secret",
                None,
                "30aefcWd8I1Vj9oGNQhxsDV4gW0%3D"
            )
            .unwrap());
    }

    #[test]
    fn authorization_header_with_token_has_fixed_order() {
        let signing = fixed(1234567890, 1234567891);
        let mut oauth = signing.common_oauth_parameters("9djdj82h48djs9d2").unwrap();
        oauth.insert(OAUTH_TOKEN.to_string(), "kkk9d7dh3k39sjv7".to_string());

        let header = signing
            .build_authorization_header_value(
                &Method::GET,
                "https://api.example.com/1/statuses/home_timeline.json?count=20",
                &oauth,
                &ParameterMap::new(),
                "consumer_secret",
                Some("token_secret"),
            )
            .unwrap();

        assert_eq!(
            header,
            "OAuth oauth_version=\"1.0\", oauth_nonce=\"1234567891\", oauth_signature_method=\"HMAC-SHA1\", oauth_consumer_key=\"9djdj82h48djs9d2\", oauth_token=\"kkk9d7dh3k39sjv7\", oauth_timestamp=\"1234567890\", oauth_signature=\"apir0F9jDwnwm3BUnOfl4hwM%2Bwo%3D\""
        );
    }

    #[test]
    fn authorization_header_signs_form_body_without_token() {
        let signing = fixed(1318622958, 42);
        let credentials = OAuth1Credentials::consumer(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
        );

        let header = signing
            .authorization_header_for(
                &Method::POST,
                "https://api.example.com/1.1/statuses/update.json?include_entities=true",
                Some("application/x-www-form-urlencoded; charset=UTF-8"),
                b"status=Hello%20Ladies%20%2B%20Gentlemen%2C%20a%20signed%20OAuth%20request%21",
                &credentials,
            )
            .unwrap();

        assert_eq!(
            header,
            "OAuth oauth_version=\"1.0\", oauth_nonce=\"42\", oauth_signature_method=\"HMAC-SHA1\", oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\", oauth_timestamp=\"1318622958\", oauth_signature=\"%2F7ewccLxe9bcg7MA5%2FSc4rBO%2BXE%3D\""
        );
    }

    #[test]
    fn non_form_body_is_not_signed() {
        let signing = fixed(1318622958, 42);
        let credentials = OAuth1Credentials::consumer("key", "secret");
        let uri = "https://api.example.com/1.1/statuses/update.json";
        let body = b"status=hello";

        let json = signing
            .authorization_header_for(&Method::POST, uri, Some("application/json"), body, &credentials)
            .unwrap();
        let empty = signing
            .authorization_header_for(&Method::POST, uri, None, b"", &credentials)
            .unwrap();
        let form = signing
            .authorization_header_for(&Method::POST, uri, Some(FORM_CONTENT_TYPE), body, &credentials)
            .unwrap();

        assert_eq!(json, empty);
        assert_ne!(json, form);
    }

    #[test]
    fn extra_protocol_parameters_follow_timestamp() {
        let signing = fixed(1, 2);
        let mut oauth = signing.common_oauth_parameters("key").unwrap();
        oauth.insert("oauth_callback".to_string(), "https://app.example.com/cb".to_string());

        let header = signing
            .build_authorization_header_value(
                &Method::POST,
                "https://api.example.com/oauth/request_token",
                &oauth,
                &ParameterMap::new(),
                "secret",
                None,
            )
            .unwrap();

        let timestamp = header.find("oauth_timestamp=").unwrap();
        let callback = header
            .find("oauth_callback=\"https%3A%2F%2Fapp.example.com%2Fcb\"")
            .unwrap();
        let signature = header.find("oauth_signature=").unwrap();
        assert!(timestamp < callback && callback < signature);
        assert!(!header.contains("oauth_token="));
    }

    #[test]
    fn missing_consumer_secret_is_rejected() {
        let signing = fixed(1, 2);
        let oauth = signing.common_oauth_parameters("key").unwrap();
        let result = signing.build_authorization_header_value(
            &Method::GET,
            "https://example.com/",
            &oauth,
            &ParameterMap::new(),
            "",
            None,
        );
        assert!(matches!(result, Err(SigningError::InvalidCredentials { .. })));
    }

    #[test]
    fn request_signer_inserts_authorization_header() {
        let credentials = OAuth1Credentials::consumer(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
        );
        let signer = OAuth1RequestSigner::with_signing_support(credentials, fixed(1318622958, 42));

        let url = Url::parse("https://api.example.com/1.1/statuses/update.json?include_entities=true")
            .unwrap();
        let mut request = reqwest::Request::new(Method::POST, url);
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
        *request.body_mut() = Some(reqwest::Body::from(
            "status=Hello%20Ladies%20%2B%20Gentlemen%2C%20a%20signed%20OAuth%20request%21",
        ));

        signer.sign(&mut request).unwrap();

        let header = request.headers()[AUTHORIZATION].to_str().unwrap();
        assert!(header.ends_with("oauth_signature=\"%2F7ewccLxe9bcg7MA5%2FSc4rBO%2BXE%3D\""));
    }
}
