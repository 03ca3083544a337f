//! `ureq`-backed transport engine.
//!
//! # Design
//! A session keeps the last applied `OptionList` and builds a `ureq::Agent`
//! from its connection settings. The agent is reused until those settings
//! change. Failures are reported with curl-compatible error codes so callers
//! see the same numbers whatever engine is underneath.

use std::fmt;
use std::io::{self, Write};
use std::net::ToSocketAddrs;
use std::time::Duration;

use tracing::{debug, warn};
use ureq::tls::TlsConfig;
use ureq::{Agent, RequestBuilder};
use url::Url;

use crate::error::{EngineFailure, TransportError};
use crate::http::{basic_auth, HttpMethod, FORM_CONTENT_TYPE};
use crate::options::{AuthScheme, OptionList, TransportOption};
use crate::transport::{Session, Transport};

/// Engine error codes, numbered as libcurl numbers them.
pub mod codes {
    pub const FAILED_INIT: u32 = 2;
    pub const URL_MALFORMAT: u32 = 3;
    pub const COULDNT_RESOLVE_HOST: u32 = 6;
    pub const COULDNT_CONNECT: u32 = 7;
    pub const WRITE_ERROR: u32 = 23;
    pub const OPERATION_TIMEDOUT: u32 = 28;
    pub const SSL_CONNECT_ERROR: u32 = 35;
    pub const TOO_MANY_REDIRECTS: u32 = 47;
    pub const RECV_ERROR: u32 = 56;
}

/// Transport engine performing blocking requests with `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for UreqTransport {
    type Session = UreqSession;

    fn open(&self) -> Result<UreqSession, TransportError> {
        Ok(UreqSession::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AgentSettings {
    connect_timeout: Option<Duration>,
    timeout: Option<Duration>,
    verify_peer: bool,
}

impl AgentSettings {
    fn from_options(options: &OptionList) -> Self {
        Self {
            connect_timeout: options.connect_timeout(),
            timeout: options.timeout(),
            verify_peer: options.verify_peer(),
        }
    }

    fn build_agent(&self) -> Agent {
        if !self.verify_peer {
            warn!("TLS peer verification is disabled");
        }
        let tls = TlsConfig::builder()
            .disable_verification(!self.verify_peer)
            .build();
        Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_connect(self.connect_timeout)
            .timeout_global(self.timeout)
            .tls_config(tls)
            .build()
            .new_agent()
    }
}

/// Session state for `UreqTransport`.
#[derive(Default)]
pub struct UreqSession {
    options: OptionList,
    agent: Option<(AgentSettings, Agent)>,
}

impl fmt::Debug for UreqSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqSession")
            .field("options", &self.options)
            .field("agent", &self.agent.as_ref().map(|(settings, _)| settings))
            .finish()
    }
}

impl UreqSession {
    /// Options currently installed on the session.
    pub fn options(&self) -> &OptionList {
        &self.options
    }

    fn agent(&mut self) -> Agent {
        let settings = AgentSettings::from_options(&self.options);
        match &self.agent {
            Some((current, agent)) if *current == settings => agent.clone(),
            _ => {
                debug!(
                    connect_timeout = ?settings.connect_timeout,
                    timeout = ?settings.timeout,
                    "building transport agent"
                );
                let agent = settings.build_agent();
                self.agent = Some((settings, agent.clone()));
                agent
            }
        }
    }

    fn headers(&self) -> Vec<(String, String)> {
        let mut headers = self.options.headers().to_vec();
        if let Some(user_pwd) = self.options.user_pwd() {
            headers.push(("Authorization".to_string(), basic_auth(user_pwd)));
        }
        headers
    }

    /// An explicit method wins; otherwise a body implies POST.
    fn method(&self) -> HttpMethod {
        match (self.options.method(), self.options.post_fields()) {
            (Some(method), _) => method,
            (None, Some(_)) => HttpMethod::Post,
            (None, None) => HttpMethod::Get,
        }
    }
}

impl Session for UreqSession {
    fn reset(&mut self) {
        self.options = OptionList::new();
        self.agent = None;
    }

    fn apply(&mut self, options: &OptionList) -> Result<(), TransportError> {
        for option in options.iter() {
            validate(option)?;
        }
        self.options = options.clone();
        Ok(())
    }

    fn execute(&mut self) -> Result<Vec<u8>, EngineFailure> {
        let url = self
            .options
            .url()
            .ok_or_else(|| EngineFailure::new(codes::URL_MALFORMAT, "No URL set"))?
            .to_owned();
        let method = self.method();
        let headers = self.headers();
        let agent = self.agent();

        let result = match method {
            HttpMethod::Get => with_headers(agent.get(&url), &headers).call(),
            HttpMethod::Post | HttpMethod::Put => {
                let builder = if method == HttpMethod::Post {
                    agent.post(&url)
                } else {
                    agent.put(&url)
                };
                let body = self.options.post_fields().unwrap_or_default();
                with_headers(builder, &headers)
                    .content_type(FORM_CONTENT_TYPE)
                    .send(body.as_bytes())
            }
        };

        let mut response = result.map_err(|e| engine_failure(&url, e))?;
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| engine_failure(&url, e))?;
        debug!(%method, status = response.status().as_u16(), "request completed");

        if self.options.return_transfer() {
            return Ok(body);
        }
        io::stdout()
            .write_all(&body)
            .map_err(|e| EngineFailure::new(codes::WRITE_ERROR, format!("Failed writing body: {e}")))?;
        Ok(Vec::new())
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn validate(option: &TransportOption) -> Result<(), TransportError> {
    let key = option.key();
    match option {
        TransportOption::Url(raw) => {
            let url = Url::parse(raw).map_err(|e| TransportError::rejected(key, e.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(TransportError::rejected(
                    key,
                    format!("unsupported scheme {:?}", url.scheme()),
                ));
            }
        }
        TransportOption::ConnectTimeout(timeout) | TransportOption::Timeout(timeout) => {
            if timeout.is_zero() {
                return Err(TransportError::rejected(key, "timeout must be greater than zero"));
            }
        }
        TransportOption::HttpAuth(AuthScheme::Digest) => {
            return Err(TransportError::rejected(key, "only basic authentication is supported"));
        }
        TransportOption::HttpHeader(headers) => {
            for (name, value) in headers {
                if name.is_empty() || !name.bytes().all(is_token_byte) {
                    return Err(TransportError::rejected(key, format!("invalid header name {name:?}")));
                }
                if value.bytes().any(|b| b == b'\r' || b == b'\n') {
                    return Err(TransportError::rejected(
                        key,
                        format!("header {name} contains a line break"),
                    ));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn engine_failure(url: &str, error: ureq::Error) -> EngineFailure {
    let failure = match &error {
        ureq::Error::HostNotFound => unresolved_host(url),
        ureq::Error::BadUri(_) => EngineFailure::new(codes::URL_MALFORMAT, error.to_string()),
        ureq::Error::ConnectionFailed => EngineFailure::new(codes::COULDNT_CONNECT, error.to_string()),
        ureq::Error::Timeout(_) => EngineFailure::new(codes::OPERATION_TIMEDOUT, error.to_string()),
        ureq::Error::Tls(_) => EngineFailure::new(codes::SSL_CONNECT_ERROR, error.to_string()),
        ureq::Error::TooManyRedirects => EngineFailure::new(codes::TOO_MANY_REDIRECTS, error.to_string()),
        ureq::Error::Io(io_error) => match io_error.kind() {
            io::ErrorKind::ConnectionRefused => EngineFailure::new(codes::COULDNT_CONNECT, error.to_string()),
            io::ErrorKind::TimedOut => EngineFailure::new(codes::OPERATION_TIMEDOUT, error.to_string()),
            // Resolver failures surface as plain io errors.
            _ if !resolves(url) => unresolved_host(url),
            _ => EngineFailure::new(codes::RECV_ERROR, error.to_string()),
        },
        _ => EngineFailure::new(codes::FAILED_INIT, error.to_string()),
    };
    debug!(code = failure.code, "transport failure: {}", failure.message);
    failure
}

fn host_of(url: &str) -> Option<(String, u16)> {
    let url = Url::parse(url).ok()?;
    let host = url
        .host_str()?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_owned();
    let port = url.port_or_known_default()?;
    Some((host, port))
}

/// Whether the URL's host resolves to at least one address.
fn resolves(url: &str) -> bool {
    match host_of(url) {
        Some((host, port)) => (host.as_str(), port)
            .to_socket_addrs()
            .map(|mut addrs| addrs.next().is_some())
            .unwrap_or(false),
        None => true,
    }
}

fn unresolved_host(url: &str) -> EngineFailure {
    let host = host_of(url).map(|(host, _)| host).unwrap_or_default();
    EngineFailure::new(codes::COULDNT_RESOLVE_HOST, format!("Could not resolve host: {host}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::options::OptionKey;

    fn session() -> UreqSession {
        UreqTransport::new().open().unwrap()
    }

    #[test]
    fn apply_installs_options() {
        let mut s = session();
        let options = OptionList::new()
            .with(TransportOption::Url("https://api.example.com/v1/users".into()))
            .with(TransportOption::CustomRequest(HttpMethod::Get));
        s.apply(&options).unwrap();
        assert_eq!(s.options(), &options);
    }

    #[test]
    fn apply_replaces_previous_options() {
        let mut s = session();
        s.apply(&OptionList::new().with(TransportOption::PostFields("a=1".into())))
            .unwrap();
        s.apply(&OptionList::new().with(TransportOption::Url("http://localhost/".into())))
            .unwrap();
        assert_eq!(s.options().post_fields(), None);
    }

    #[test]
    fn apply_rejects_relative_url_and_keeps_state() {
        let mut s = session();
        let good = OptionList::new().with(TransportOption::UserPwd("key:".into()));
        s.apply(&good).unwrap();

        let bad = OptionList::new()
            .with(TransportOption::UserPwd("other:".into()))
            .with(TransportOption::Url("not a url".into()));
        let err = s.apply(&bad).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OptionApplicationFailure);
        assert!(matches!(
            err,
            TransportError::OptionApplicationFailure { option: OptionKey::Url, .. }
        ));
        assert_eq!(s.options(), &good);
    }

    #[test]
    fn apply_rejects_non_http_scheme() {
        let mut s = session();
        let err = s
            .apply(&OptionList::new().with(TransportOption::Url("ftp://example.com/".into())))
            .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn apply_rejects_zero_timeout() {
        let mut s = session();
        let err = s
            .apply(&OptionList::new().with(TransportOption::Timeout(Duration::ZERO)))
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::OptionApplicationFailure { option: OptionKey::Timeout, .. }
        ));
    }

    #[test]
    fn apply_rejects_digest_auth() {
        let mut s = session();
        let err = s
            .apply(&OptionList::new().with(TransportOption::HttpAuth(AuthScheme::Digest)))
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::OptionApplicationFailure { option: OptionKey::HttpAuth, .. }
        ));
    }

    #[test]
    fn apply_rejects_bad_headers() {
        let mut s = session();
        let bad_name = OptionList::new().with(TransportOption::HttpHeader(vec![(
            "Bad Header".into(),
            "1".into(),
        )]));
        assert!(s.apply(&bad_name).is_err());

        let bad_value = OptionList::new().with(TransportOption::HttpHeader(vec![(
            "X-Ok".into(),
            "1\r\nX-Injected: 2".into(),
        )]));
        assert!(s.apply(&bad_value).is_err());
    }

    #[test]
    fn execute_without_url_fails() {
        let mut s = session();
        let failure = s.execute().unwrap_err();
        assert_eq!(failure.code, codes::URL_MALFORMAT);
        assert_eq!(failure.message, "No URL set");
    }

    #[test]
    fn reset_clears_options() {
        let mut s = session();
        s.apply(&OptionList::new().with(TransportOption::UserPwd("key:".into())))
            .unwrap();
        s.reset();
        assert!(s.options().is_empty());
    }

    #[test]
    fn body_implies_post_without_explicit_method() {
        let mut s = session();
        s.apply(&OptionList::new().with(TransportOption::PostFields("a=1".into())))
            .unwrap();
        assert_eq!(s.method(), HttpMethod::Post);

        s.apply(&OptionList::new()
            .with(TransportOption::PostFields("a=1".into()))
            .with(TransportOption::CustomRequest(HttpMethod::Put)))
            .unwrap();
        assert_eq!(s.method(), HttpMethod::Put);

        s.reset();
        assert_eq!(s.method(), HttpMethod::Get);
    }

    #[test]
    fn credentials_become_basic_authorization() {
        let mut s = session();
        s.apply(&OptionList::new()
            .with(TransportOption::HttpHeader(vec![(
                "eFrontPro-SDK-Version".into(),
                "2.0".into(),
            )]))
            .with(TransportOption::UserPwd("abc123:".into())))
            .unwrap();
        assert_eq!(
            s.headers(),
            vec![
                ("eFrontPro-SDK-Version".to_string(), "2.0".to_string()),
                ("Authorization".to_string(), "Basic YWJjMTIzOg==".to_string()),
            ]
        );
    }

    #[test]
    fn agent_is_reused_until_settings_change() {
        let mut s = session();
        s.apply(&OptionList::new().with(TransportOption::Timeout(Duration::from_secs(60))))
            .unwrap();
        s.agent();
        let first = s.agent.as_ref().map(|(settings, _)| *settings);
        s.agent();
        assert_eq!(s.agent.as_ref().map(|(settings, _)| *settings), first);

        s.apply(&OptionList::new().with(TransportOption::Timeout(Duration::from_secs(5))))
            .unwrap();
        s.agent();
        let rebuilt = s.agent.as_ref().map(|(settings, _)| settings.timeout);
        assert_eq!(rebuilt, Some(Some(Duration::from_secs(5))));
    }

    #[test]
    fn host_not_found_maps_to_resolve_code() {
        let failure = engine_failure("http://api.example.test/Users", ureq::Error::HostNotFound);
        assert_eq!(failure.code, codes::COULDNT_RESOLVE_HOST);
        assert_eq!(failure.message, "Could not resolve host: api.example.test");
    }

    #[test]
    fn io_error_for_unresolvable_host_maps_to_resolve_code() {
        let error = ureq::Error::Io(io::Error::new(
            io::ErrorKind::Other,
            "failed to lookup address information: Name or service not known",
        ));
        let failure = engine_failure("http://no-such-host.invalid/", error);
        assert_eq!(failure.code, codes::COULDNT_RESOLVE_HOST);
        assert_eq!(failure.message, "Could not resolve host: no-such-host.invalid");
    }

    #[test]
    fn io_error_for_resolvable_host_is_receive_error() {
        let error = ureq::Error::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        let failure = engine_failure("http://127.0.0.1:8080/", error);
        assert_eq!(failure.code, codes::RECV_ERROR);
    }

    #[test]
    fn refused_connection_maps_to_connect_code() {
        let error = ureq::Error::Io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert_eq!(engine_failure("http://127.0.0.1:1/", error).code, codes::COULDNT_CONNECT);
        assert_eq!(
            engine_failure("http://127.0.0.1:1/", ureq::Error::ConnectionFailed).code,
            codes::COULDNT_CONNECT
        );
    }

    #[test]
    fn timeouts_map_to_timeout_code() {
        let failure = engine_failure("http://127.0.0.1/", ureq::Error::Timeout(ureq::Timeout::Global));
        assert_eq!(failure.code, codes::OPERATION_TIMEDOUT);

        let error = ureq::Error::Io(io::Error::new(io::ErrorKind::TimedOut, "timed out"));
        assert_eq!(engine_failure("http://127.0.0.1/", error).code, codes::OPERATION_TIMEDOUT);
    }

    #[test]
    fn other_failures_keep_their_codes() {
        assert_eq!(
            engine_failure("http://127.0.0.1/", ureq::Error::TooManyRedirects).code,
            codes::TOO_MANY_REDIRECTS
        );
        assert_eq!(
            engine_failure("http://127.0.0.1/", ureq::Error::BadUri("x".into())).code,
            codes::URL_MALFORMAT
        );
    }

    #[test]
    fn ipv6_literal_resolves() {
        assert!(resolves("http://[::1]:8080/"));
        assert!(resolves("http://127.0.0.1/"));
    }
}
