//! HTTP vocabulary shared by the handler and the transport engine.
//!
//! # Design
//! The handler never touches the wire itself. It only needs to name a method,
//! build the `api_key:` credentials string and encode a form body; the engine
//! turns those into an `Authorization` header and a request body.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Content type sent with POST/PUT form bodies.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Empty parameter list for `post`/`put` calls that carry no fields.
pub const NO_PARAMS: [(&str, &str); 0] = [];

/// HTTP method forced onto a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials string for an API key: the key is the user name and the
/// password is always empty.
pub fn credentials(api_key: &str) -> String {
    format!("{api_key}:")
}

/// `Authorization` header value for a `user:password` string (RFC 7617).
pub fn basic_auth(user_pwd: &str) -> String {
    format!("Basic {}", BASE64.encode(user_pwd))
}

/// Encode parameters as `key=value&key=value`, keeping iteration order.
///
/// Spaces become `+` and everything outside `[A-Za-z0-9*-._]` is
/// percent-encoded. An empty parameter list yields an empty string.
pub fn encode_form<I, K, V>(params: I) -> Result<String, serde_urlencoded::ser::Error>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let pairs: Vec<(String, String)> = params
        .into_iter()
        .map(|(k, v)| (k.as_ref().to_owned(), v.as_ref().to_owned()))
        .collect();
    serde_urlencoded::to_string(&pairs)
}
