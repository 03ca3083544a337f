//! Typed transport options and the option mapping applied to a session.
//!
//! # Design
//! Each `TransportOption` variant carries its own value type, so a key can
//! never hold a value of the wrong shape. `OptionList` keys entries by
//! `OptionKey`, which makes keys unique and every `set` last-write-wins.
//! Values are still checked by the engine when applied (a URL may not parse,
//! a timeout may be zero), which is where rejections come from.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::http::HttpMethod;

/// Identifies an option slot in an `OptionList`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    ReturnTransfer,
    ConnectTimeout,
    Timeout,
    SslVerifyPeer,
    HttpAuth,
    HttpHeader,
    Url,
    CustomRequest,
    UserPwd,
    PostFields,
}

impl OptionKey {
    pub fn name(&self) -> &'static str {
        match self {
            OptionKey::ReturnTransfer => "return_transfer",
            OptionKey::ConnectTimeout => "connect_timeout",
            OptionKey::Timeout => "timeout",
            OptionKey::SslVerifyPeer => "ssl_verify_peer",
            OptionKey::HttpAuth => "http_auth",
            OptionKey::HttpHeader => "http_header",
            OptionKey::Url => "url",
            OptionKey::CustomRequest => "custom_request",
            OptionKey::UserPwd => "user_pwd",
            OptionKey::PostFields => "post_fields",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// HTTP authentication scheme requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    Basic,
    Digest,
}

/// A single engine setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOption {
    /// Return the body to the caller instead of writing it to stdout.
    ReturnTransfer(bool),
    ConnectTimeout(Duration),
    /// Deadline for the whole request.
    Timeout(Duration),
    SslVerifyPeer(bool),
    HttpAuth(AuthScheme),
    /// Extra request headers as `(name, value)` pairs.
    HttpHeader(Vec<(String, String)>),
    Url(String),
    CustomRequest(HttpMethod),
    /// `user:password` credentials.
    UserPwd(String),
    /// Pre-encoded request body.
    PostFields(String),
}

impl TransportOption {
    pub fn key(&self) -> OptionKey {
        match self {
            TransportOption::ReturnTransfer(_) => OptionKey::ReturnTransfer,
            TransportOption::ConnectTimeout(_) => OptionKey::ConnectTimeout,
            TransportOption::Timeout(_) => OptionKey::Timeout,
            TransportOption::SslVerifyPeer(_) => OptionKey::SslVerifyPeer,
            TransportOption::HttpAuth(_) => OptionKey::HttpAuth,
            TransportOption::HttpHeader(_) => OptionKey::HttpHeader,
            TransportOption::Url(_) => OptionKey::Url,
            TransportOption::CustomRequest(_) => OptionKey::CustomRequest,
            TransportOption::UserPwd(_) => OptionKey::UserPwd,
            TransportOption::PostFields(_) => OptionKey::PostFields,
        }
    }
}

/// Mapping from option key to option value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionList {
    entries: BTreeMap<OptionKey, TransportOption>,
}

impl OptionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `option`, returning whatever it replaced.
    pub fn set(&mut self, option: TransportOption) -> Option<TransportOption> {
        self.entries.insert(option.key(), option)
    }

    /// Builder form of `set`.
    pub fn with(mut self, option: TransportOption) -> Self {
        self.set(option);
        self
    }

    pub fn get(&self, key: OptionKey) -> Option<&TransportOption> {
        self.entries.get(&key)
    }

    pub fn remove(&mut self, key: OptionKey) -> Option<TransportOption> {
        self.entries.remove(&key)
    }

    pub fn contains(&self, key: OptionKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransportOption> {
        self.entries.values()
    }

    pub fn url(&self) -> Option<&str> {
        match self.get(OptionKey::Url) {
            Some(TransportOption::Url(url)) => Some(url),
            _ => None,
        }
    }

    pub fn method(&self) -> Option<HttpMethod> {
        match self.get(OptionKey::CustomRequest) {
            Some(TransportOption::CustomRequest(method)) => Some(*method),
            _ => None,
        }
    }

    pub fn user_pwd(&self) -> Option<&str> {
        match self.get(OptionKey::UserPwd) {
            Some(TransportOption::UserPwd(user_pwd)) => Some(user_pwd),
            _ => None,
        }
    }

    pub fn post_fields(&self) -> Option<&str> {
        match self.get(OptionKey::PostFields) {
            Some(TransportOption::PostFields(body)) => Some(body),
            _ => None,
        }
    }

    pub fn headers(&self) -> &[(String, String)] {
        match self.get(OptionKey::HttpHeader) {
            Some(TransportOption::HttpHeader(headers)) => headers,
            _ => &[],
        }
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        match self.get(OptionKey::ConnectTimeout) {
            Some(TransportOption::ConnectTimeout(timeout)) => Some(*timeout),
            _ => None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.get(OptionKey::Timeout) {
            Some(TransportOption::Timeout(timeout)) => Some(*timeout),
            _ => None,
        }
    }

    /// Peer verification is on unless explicitly turned off.
    pub fn verify_peer(&self) -> bool {
        !matches!(self.get(OptionKey::SslVerifyPeer), Some(TransportOption::SslVerifyPeer(false)))
    }

    /// Bodies are written to stdout unless this is explicitly turned on.
    pub fn return_transfer(&self) -> bool {
        matches!(self.get(OptionKey::ReturnTransfer), Some(TransportOption::ReturnTransfer(true)))
    }

    pub fn auth_scheme(&self) -> Option<AuthScheme> {
        match self.get(OptionKey::HttpAuth) {
            Some(TransportOption::HttpAuth(scheme)) => Some(*scheme),
            _ => None,
        }
    }
}

impl FromIterator<TransportOption> for OptionList {
    fn from_iter<I: IntoIterator<Item = TransportOption>>(iter: I) -> Self {
        let mut list = OptionList::new();
        list.extend(iter);
        list
    }
}

impl Extend<TransportOption> for OptionList {
    fn extend<I: IntoIterator<Item = TransportOption>>(&mut self, iter: I) {
        for option in iter {
            self.set(option);
        }
    }
}
