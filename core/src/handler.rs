//! The SDK's request handler.
//!
//! # Design
//! `RequestHandler` owns at most one engine session plus the persistent
//! option list installed by `init` or `set_option_list`. Verbs never mutate
//! that list: each call clones it, layers its own URL, method, credentials
//! and body on top, and applies the result to the session in one step. A
//! POST body therefore cannot leak into a later GET.
//!
//! The session is released when `close` is called or when the handler is
//! dropped.

use tracing::debug;

use crate::config::HandlerConfig;
use crate::engine::UreqTransport;
use crate::error::TransportError;
use crate::http::{credentials, encode_form, HttpMethod};
use crate::options::{AuthScheme, OptionKey, OptionList, TransportOption};
use crate::transport::{Session, Transport};

/// Header carrying the SDK version on every request.
pub const SDK_VERSION_HEADER: &str = "eFrontPro-SDK-Version";

/// Synchronous request handler bound to one transport engine.
pub struct RequestHandler<T: Transport = UreqTransport> {
    transport: T,
    session: Option<T::Session>,
    options: OptionList,
}

impl RequestHandler<UreqTransport> {
    /// Handler backed by the `ureq` engine.
    pub fn with_ureq() -> Result<Self, TransportError> {
        Self::new(UreqTransport::new())
    }
}

impl<T: Transport> RequestHandler<T> {
    /// Fails with `ExtensionUnavailable` if the engine cannot be used. No
    /// session is opened until `init`.
    pub fn new(transport: T) -> Result<Self, TransportError> {
        if !transport.is_available() {
            return Err(TransportError::ExtensionUnavailable);
        }
        Ok(Self {
            transport,
            session: None,
            options: OptionList::new(),
        })
    }

    /// Open the session if needed, reset it and install the default options.
    pub fn init(&mut self, sdk_version: &str) -> Result<&mut Self, TransportError> {
        self.init_with(sdk_version, &HandlerConfig::default())
    }

    /// `init` with timeouts and peer verification taken from `config`.
    pub fn init_with(
        &mut self,
        sdk_version: &str,
        config: &HandlerConfig,
    ) -> Result<&mut Self, TransportError> {
        if sdk_version.trim().is_empty() {
            return Err(TransportError::InitializationFailure(
                "SDK version must not be empty".to_string(),
            ));
        }
        if self.session.is_none() {
            self.session = Some(self.transport.open()?);
            debug!(sdk_version, "opened transport session");
        }
        let defaults = default_options(sdk_version, config);
        Ok(self.reset().set_option_list(defaults))
    }

    pub fn get(&mut self, url: &str, api_key: &str) -> Result<Vec<u8>, TransportError> {
        let options = self.request_options(HttpMethod::Get, url, api_key);
        self.execute(options)
    }

    /// POST `params` as a form body. Pass `NO_PARAMS` for an empty body.
    pub fn post<I, K, V>(&mut self, url: &str, api_key: &str, params: I) -> Result<Vec<u8>, TransportError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.send_form(HttpMethod::Post, url, api_key, params)
    }

    /// PUT `params` as a form body. Pass `NO_PARAMS` for an empty body.
    pub fn put<I, K, V>(&mut self, url: &str, api_key: &str, params: I) -> Result<Vec<u8>, TransportError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.send_form(HttpMethod::Put, url, api_key, params)
    }

    /// Replace the persistent option list.
    pub fn set_option_list(&mut self, options: OptionList) -> &mut Self {
        self.options = options;
        self
    }

    /// Clear engine-side state of the open session. The persistent option
    /// list is left alone.
    pub fn reset(&mut self) -> &mut Self {
        if let Some(session) = self.session.as_mut() {
            session.reset();
            debug!("reset transport session");
        }
        self
    }

    /// Release the session. Calling it again is a no-op.
    pub fn close(&mut self) -> &mut Self {
        if self.session.take().is_some() {
            debug!("closed transport session");
        }
        self
    }

    pub fn options(&self) -> &OptionList {
        &self.options
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&T::Session> {
        self.session.as_ref()
    }

    fn send_form<I, K, V>(
        &mut self,
        method: HttpMethod,
        url: &str,
        api_key: &str,
        params: I,
    ) -> Result<Vec<u8>, TransportError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let body = encode_form(params)
            .map_err(|e| TransportError::rejected(OptionKey::PostFields, e.to_string()))?;
        let options = self
            .request_options(method, url, api_key)
            .with(TransportOption::PostFields(body));
        self.execute(options)
    }

    fn request_options(&self, method: HttpMethod, url: &str, api_key: &str) -> OptionList {
        self.options
            .clone()
            .with(TransportOption::Url(url.to_string()))
            .with(TransportOption::CustomRequest(method))
            .with(TransportOption::UserPwd(credentials(api_key)))
    }

    fn execute(&mut self, options: OptionList) -> Result<Vec<u8>, TransportError> {
        let session = self
            .session
            .as_mut()
            .ok_or(TransportError::IllegalState("no open session, call init first"))?;
        session.apply(&options)?;
        debug!(
            method = ?options.method(),
            url = options.url().unwrap_or_default(),
            "executing request"
        );
        Ok(session.execute()?)
    }
}

fn default_options(sdk_version: &str, config: &HandlerConfig) -> OptionList {
    [
        TransportOption::ReturnTransfer(true),
        TransportOption::ConnectTimeout(config.connect_timeout),
        TransportOption::Timeout(config.timeout),
        TransportOption::SslVerifyPeer(config.verify_peer),
        TransportOption::HttpAuth(AuthScheme::Basic),
        TransportOption::HttpHeader(vec![(
            SDK_VERSION_HEADER.to_string(),
            sdk_version.to_string(),
        )]),
    ]
    .into_iter()
    .collect()
}
