//! OAuth 1.0a request signing
//!
//! - [`encoding`]: RFC 3986 percent-encoding
//! - [`signing`]: base string, HMAC-SHA1 signature and `Authorization` header
//! - [`timestamp`]: pluggable timestamp/nonce sources
//! - [`credentials`]: consumer and token credentials

pub mod credentials;
pub mod encoding;
pub mod signing;
pub mod timestamp;

pub use credentials::OAuth1Credentials;
pub use encoding::{Charset, EncodingError, form_encode, percent_encode, percent_encode_opt};
pub use signing::{OAuth1RequestSigner, ParameterMap, SigningError, SigningSupport};
pub use timestamp::{FixedTimestampGenerator, SystemTimestampGenerator, TimestampGenerator};
