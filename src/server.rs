use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};

use tracing::{debug, info, warn};

use crate::output::escape_html;
use crate::types::REDIRECT_HOST;
use crate::{KeywordIdeasError, Result};

/// Upper bound on the bytes read from the redirect request
pub const MAX_REQUEST_BYTES: usize = 1024;

const CONFIG_HOWTO_URL: &str =
    "https://developers.google.com/google-ads/api/docs/oauth/overview";

/// Query parameters captured from the redirect request line
///
/// Keys and values are kept exactly as they appeared on the wire; nothing is
/// percent-decoded here.
pub type RedirectParams = HashMap<String, String>;

/// Outcome of a captured redirect, handed to the HTML renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    /// `code` present and `state` matched
    Success { code: String },
    /// No `code`; the provider sent an `error` parameter instead
    Error { reason: String },
    /// Neither `code` nor `error` were present
    MissingCode,
    /// `state` absent or different from the expected token
    StateMismatch,
    /// The request line could not be read or parsed
    Malformed,
}

impl CallbackEvent {
    /// Convert the event into the value returned to the waiting flow
    pub fn into_result(self) -> Result<String> {
        match self {
            CallbackEvent::Success { code } => Ok(code),
            CallbackEvent::Error { reason } => Err(KeywordIdeasError::Authorization(format!(
                "Failed to retrieve authorization code. Error: {}",
                reason
            ))),
            CallbackEvent::MissingCode => Err(KeywordIdeasError::Authorization(
                "Failed to retrieve authorization code. Error: none".to_string(),
            )),
            CallbackEvent::StateMismatch => Err(KeywordIdeasError::Authorization(
                "State token does not match the expected state (possible CSRF)".to_string(),
            )),
            CallbackEvent::Malformed => Err(KeywordIdeasError::Authorization(
                "Malformed redirect request".to_string(),
            )),
        }
    }
}

/// Whether something already accepts connections on the loopback port
pub fn port_in_use(port: u16) -> bool {
    TcpStream::connect((REDIRECT_HOST, port)).is_ok()
}

/// First free loopback port at or above `start`
pub fn find_free_port(start: u16) -> Result<u16> {
    find_free_port_with(start, port_in_use)
}

/// Linear probe from `start` upward using the supplied availability check
///
/// Ports are tried one at a time in increasing order; the first one for which
/// `in_use` returns `false` is returned.
pub fn find_free_port_with(start: u16, mut in_use: impl FnMut(u16) -> bool) -> Result<u16> {
    let mut port = start;
    loop {
        if !in_use(port) {
            debug!(port, "Found free redirect port");
            return Ok(port);
        }
        debug!(port, "Redirect port in use, trying next");
        port = port.checked_add(1).ok_or_else(|| {
            KeywordIdeasError::CallbackServer(format!("No free port at or above {}", start))
        })?;
    }
}

/// Extract the query parameters from a raw `GET /?... HTTP/1.1` request
///
/// Returns `None` when the first line is not a GET for a path carrying a
/// query string. Pairs without `=` map to an empty value and a repeated key
/// keeps its last value.
pub fn parse_raw_query_params(data: &[u8]) -> Option<RedirectParams> {
    let text = String::from_utf8_lossy(data);
    let request_line = text.lines().next()?;
    let target = request_line.strip_prefix("GET /?")?;
    let (query, _version) = target.rsplit_once(' ')?;

    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect();
    Some(params)
}

/// Validate captured parameters against the expected anti-forgery token
///
/// Checks run in a fixed order: a missing `code` fails first, then the
/// `state` comparison.
pub fn validate_redirect(params: &RedirectParams, expected_state: &str) -> CallbackEvent {
    let code = params.get("code").filter(|code| !code.is_empty());
    let Some(code) = code else {
        return match params.get("error") {
            Some(reason) => CallbackEvent::Error {
                reason: reason.clone(),
            },
            None => CallbackEvent::MissingCode,
        };
    };

    if params.get("state").map(String::as_str) != Some(expected_state) {
        return CallbackEvent::StateMismatch;
    }

    CallbackEvent::Success { code: code.clone() }
}

/// Bind the loopback port and wait for one redirect
///
/// Blocks until the browser hits the listener; there is no timeout. Returns
/// the raw (still percent-encoded) authorization code.
pub fn wait_for_code(port: u16, expected_state: &str) -> Result<String> {
    wait_for_code_with_html(port, expected_state, default_html)
}

/// Same as [`wait_for_code`] with a caller-provided page for each outcome
pub fn wait_for_code_with_html<F>(port: u16, expected_state: &str, render: F) -> Result<String>
where
    F: Fn(&CallbackEvent) -> String,
{
    // std enables SO_REUSEADDR on Unix listeners
    let listener = TcpListener::bind((REDIRECT_HOST, port)).map_err(|e| {
        KeywordIdeasError::CallbackServer(format!(
            "Failed to bind to {}:{}: {}",
            REDIRECT_HOST, port, e
        ))
    })?;
    capture_redirect(listener, expected_state, render)
}

/// Accept exactly one connection on an already bound listener
///
/// The browser always receives a `200 OK` page, whatever the outcome. Both
/// the connection and the listener are closed before this returns.
pub fn capture_redirect<F>(listener: TcpListener, expected_state: &str, render: F) -> Result<String>
where
    F: Fn(&CallbackEvent) -> String,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Waiting for authorization redirect");
    }

    let (mut stream, peer) = listener
        .accept()
        .map_err(|e| KeywordIdeasError::CallbackServer(format!("Failed to accept: {}", e)))?;
    drop(listener);
    debug!(%peer, "Accepted redirect connection");

    let mut buf = [0u8; MAX_REQUEST_BYTES];
    let event = match stream.read(&mut buf) {
        Ok(read) => match parse_raw_query_params(&buf[..read]) {
            Some(params) => validate_redirect(&params, expected_state),
            None => CallbackEvent::Malformed,
        },
        Err(e) => {
            warn!(error = %e, "Failed to read redirect request");
            CallbackEvent::Malformed
        }
    };

    let body = render(&event);
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    if let Err(e) = stream.write_all(response.as_bytes()).and_then(|_| stream.flush()) {
        warn!(error = %e, "Failed to send redirect response to browser");
    }
    drop(stream);

    event.into_result()
}

/// Page shown in the browser after the redirect is handled
pub fn default_html(event: &CallbackEvent) -> String {
    let message = match event {
        CallbackEvent::Success { .. } => format!(
            "<b>Authorization code was successfully retrieved.</b>\
             <p>You can find the refresh token in the <b>console</b> output.</p>\
             <p>Add it to your configuration file <b>{path}</b> as described here:<br/>\
             <a target=\"_blank\" href=\"{url}\">{url}</a></p>",
            path = crate::config::CREDENTIALS_PATH,
            url = CONFIG_HOWTO_URL,
        ),
        CallbackEvent::Error { reason } => format!(
            "<b>Failed to retrieve authorization code. Error: {}</b>",
            escape_html(reason)
        ),
        CallbackEvent::MissingCode => {
            "<b>Failed to retrieve authorization code. No code was received.</b>".to_string()
        }
        CallbackEvent::StateMismatch => {
            "<b>State token does not match the expected state.</b>".to_string()
        }
        CallbackEvent::Malformed => "<b>Malformed authorization redirect.</b>".to_string(),
    };
    format!(
        "<html><head><title>Authorization</title></head><body>{}\
         <p>You can close this window.</p></body></html>",
        message
    )
}
