//! How a session identifier travels between client and server.
//!
//! Two strategies share the [`IdTransport`] shape:
//!
//! - [`QueryTransport`] reads the id from a URL query parameter, or from an
//!   urlencoded form body, and never writes anything back; the application
//!   renders the id into its links and forms.
//! - [`CookieTransport`] reads the id from a cookie and sets that cookie
//!   whenever a new session is created.
//!
//! Both percent-decode what they read. A missing, empty or badly encoded
//! value is reported as absent.

use std::fmt;
use std::str::FromStr;

use axum::http::{header, request, response, HeaderMap, HeaderValue, Request, Response};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use super::SessionId;
use crate::error::SessionError;

/// Everything except the unreserved URL characters is escaped.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode a value for use in a query string or cookie.
pub fn encode_component(raw: &str) -> String {
    utf8_percent_encode(raw, QUERY_ESCAPE).to_string()
}

/// Decode a query-escaped value. `+` becomes a space.
///
/// Returns `None` for truncated or non-hex escapes and for byte sequences
/// that are not UTF-8.
pub fn decode_component(encoded: &str) -> Option<String> {
    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = encoded.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Decoded value of the first `name=value` pair in an urlencoded string.
fn find_encoded_pair<'a>(encoded: &'a str, name: &str) -> Option<&'a str> {
    encoded
        .split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key)? == name).then_some(value)
        })
        .next()
}

/// Which transport a manager uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    /// Identifier in a URL query parameter.
    QueryParameter,
    /// Identifier in an HTTP-only cookie.
    #[default]
    Cookie,
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::QueryParameter => f.write_str("query"),
            TransportMode::Cookie => f.write_str("cookie"),
        }
    }
}

impl FromStr for TransportMode {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "query" | "url" | "query_parameter" => Ok(TransportMode::QueryParameter),
            "cookie" => Ok(TransportMode::Cookie),
            _ => Err(SessionError::InvalidTransportMode(s.to_string())),
        }
    }
}

/// Read access to the parts of an inbound request a transport needs.
pub trait SessionRequest {
    /// Raw (still encoded) query string, without the leading `?`.
    fn query(&self) -> Option<&str>;
    fn headers(&self) -> &HeaderMap;

    /// Raw `application/x-www-form-urlencoded` body, if one was read.
    fn form(&self) -> Option<&str> {
        None
    }
}

impl SessionRequest for request::Parts {
    fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl<B> SessionRequest for Request<B> {
    fn query(&self) -> Option<&str> {
        self.uri().query()
    }

    fn headers(&self) -> &HeaderMap {
        Request::headers(self)
    }
}

/// A request head together with its already-buffered body.
///
/// The body counts as form data only when the request declares
/// `application/x-www-form-urlencoded` and the bytes are UTF-8.
#[derive(Debug)]
pub struct FormRequest<'a> {
    parts: &'a request::Parts,
    form: Option<&'a str>,
}

impl<'a> FormRequest<'a> {
    pub fn new(parts: &'a request::Parts, body: &'a [u8]) -> Self {
        let is_form = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .is_some_and(|mime| {
                mime.trim()
                    .eq_ignore_ascii_case("application/x-www-form-urlencoded")
            });

        let form = if is_form {
            std::str::from_utf8(body).ok()
        } else {
            None
        };
        Self { parts, form }
    }
}

impl SessionRequest for FormRequest<'_> {
    fn query(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    fn form(&self) -> Option<&str> {
        self.form
    }
}

/// Write access to the response headers, for setting cookies.
pub trait SessionResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap;
}

impl SessionResponse for HeaderMap {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self
    }
}

impl SessionResponse for response::Parts {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }
}

impl<B> SessionResponse for Response<B> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        Response::headers_mut(self)
    }
}

/// Moves identifiers between the wire and the manager.
pub trait IdTransport: Send + Sync {
    /// The decoded candidate identifier, if the request carries one.
    fn extract(&self, request: &dyn SessionRequest) -> Option<String>;

    /// Hand a newly created identifier back to the client.
    fn emit(&self, response: &mut dyn SessionResponse, id: &SessionId);

    /// Tell the client to forget its identifier.
    fn revoke(&self, response: &mut dyn SessionResponse);
}

/// Identifier carried in a query parameter.
#[derive(Debug, Clone)]
pub struct QueryTransport {
    name: String,
}

impl QueryTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl IdTransport for QueryTransport {
    /// The query string wins over the form body.
    fn extract(&self, request: &dyn SessionRequest) -> Option<String> {
        let raw = request
            .query()
            .and_then(|query| find_encoded_pair(query, &self.name))
            .or_else(|| {
                request
                    .form()
                    .and_then(|form| find_encoded_pair(form, &self.name))
            })?;

        decode_component(raw).filter(|id| !id.is_empty())
    }

    fn emit(&self, _response: &mut dyn SessionResponse, _id: &SessionId) {}

    fn revoke(&self, _response: &mut dyn SessionResponse) {}
}

/// Identifier carried in an HTTP-only cookie.
#[derive(Debug, Clone)]
pub struct CookieTransport {
    name: String,
    max_age_secs: u64,
}

impl CookieTransport {
    pub fn new(name: impl Into<String>, max_age_secs: u64) -> Self {
        Self {
            name: name.into(),
            max_age_secs,
        }
    }

    fn append(&self, response: &mut dyn SessionResponse, cookie: SessionCookie<'_>) {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(cookie = %self.name, error = %e, "unrepresentable cookie"),
        }
    }
}

impl IdTransport for CookieTransport {
    fn extract(&self, request: &dyn SessionRequest) -> Option<String> {
        let raw = request
            .headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|line| line.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim_matches('"'))?;

        decode_component(raw).filter(|id| !id.is_empty())
    }

    fn emit(&self, response: &mut dyn SessionResponse, id: &SessionId) {
        let value = encode_component(id.as_str());
        self.append(
            response,
            SessionCookie {
                name: &self.name,
                value: &value,
                max_age_secs: self.max_age_secs,
            },
        );
    }

    fn revoke(&self, response: &mut dyn SessionResponse) {
        self.append(
            response,
            SessionCookie {
                name: &self.name,
                value: "",
                max_age_secs: 0,
            },
        );
    }
}

/// A `Set-Cookie` value for the session cookie: path `/`, HTTP-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCookie<'a> {
    pub name: &'a str,
    pub value: &'a str,
    pub max_age_secs: u64,
}

impl fmt::Display for SessionCookie<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}={}; Path=/; Max-Age={}; HttpOnly",
            self.name, self.value, self.max_age_secs
        )
    }
}
