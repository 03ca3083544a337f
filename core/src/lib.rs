//! Request handler used by the eFront SDK to call the remote API.
//!
//! # Overview
//! `RequestHandler` performs blocking GET/POST/PUT requests authenticated
//! with HTTP basic auth (API key as user name, empty password) and returns
//! the raw response body. It does not parse responses or look at status
//! codes; that is left to the SDK layer above.
//!
//! # Design
//! - The handler talks to a transport engine through the `Transport` and
//!   `Session` traits. `UreqTransport` is the production engine; tests plug
//!   in their own.
//! - Engine settings are typed `TransportOption` values collected in an
//!   `OptionList` and applied to the session in one step before each
//!   request.
//! - Every failure is a `TransportError`; engine failures keep their native
//!   message and numeric code.
//!
//! ```no_run
//! use efront_request::{RequestHandler, NO_PARAMS};
//!
//! # fn main() -> Result<(), efront_request::TransportError> {
//! let mut handler = RequestHandler::with_ureq()?;
//! handler.init("2.0.0")?;
//! let users = handler.get("https://lms.example.com/API/v1.0/Users", "api-key")?;
//! handler.post("https://lms.example.com/API/v1.0/User", "api-key", [("login", "jdoe")])?;
//! handler.put("https://lms.example.com/API/v1.0/User/7/Activate", "api-key", NO_PARAMS)?;
//! handler.close();
//! # let _ = users;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod http;
pub mod options;
pub mod transport;

pub use config::HandlerConfig;
pub use engine::{UreqSession, UreqTransport};
pub use error::{ConfigError, EngineFailure, ErrorKind, TransportError};
pub use handler::{RequestHandler, SDK_VERSION_HEADER};
pub use http::{HttpMethod, NO_PARAMS};
pub use options::{AuthScheme, OptionKey, OptionList, TransportOption};
pub use transport::{Session, Transport};
