// Provisioning portal helpers
// Window timing and form decoding for the soft-AP credential portal

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub const MAX_SSID_LEN: usize = 32;
pub const MAX_PASSWORD_LEN: usize = 64;

/// How long the portal may stay open. Without a timeout it never expires.
#[derive(Debug, Clone, Copy)]
pub struct ProvisioningWindow {
    started: Instant,
    timeout: Option<Duration>,
}

impl ProvisioningWindow {
    pub fn open(started: Instant, timeout: Option<Duration>) -> Self {
        Self { started, timeout }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match self.timeout {
            Some(timeout) => now.saturating_duration_since(self.started) >= timeout,
            None => false,
        }
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.timeout
            .map(|timeout| timeout.saturating_sub(now.saturating_duration_since(self.started)))
    }
}

/// Network credentials as submitted through the portal and kept in flash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    MissingSsid,
    SsidTooLong(usize),
    PasswordTooLong(usize),
    BadEncoding,
}

impl fmt::Display for FormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormError::MissingSsid => write!(f, "SSID is required"),
            FormError::SsidTooLong(len) => {
                write!(f, "SSID too long: {} bytes (max {})", len, MAX_SSID_LEN)
            }
            FormError::PasswordTooLong(len) => {
                write!(f, "Password too long: {} bytes (max {})", len, MAX_PASSWORD_LEN)
            }
            FormError::BadEncoding => write!(f, "Form is not valid UTF-8 url encoding"),
        }
    }
}

impl std::error::Error for FormError {}

/// Decodes an `application/x-www-form-urlencoded` body with `ssid` and
/// `password` fields. A missing password means an open network.
pub fn parse_credentials_form(body: &str) -> Result<WifiCredentials, FormError> {
    let mut ssid = None;
    let mut password = String::new();

    for pair in body.trim().split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        match key {
            "ssid" => ssid = Some(url_decode(value)?),
            "password" => password = url_decode(value)?,
            _ => {}
        }
    }

    let ssid = ssid.filter(|s| !s.is_empty()).ok_or(FormError::MissingSsid)?;
    if ssid.len() > MAX_SSID_LEN {
        return Err(FormError::SsidTooLong(ssid.len()));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(FormError::PasswordTooLong(password.len()));
    }

    Ok(WifiCredentials { ssid, password })
}

fn url_decode(value: &str) -> Result<String, FormError> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' => {
                let hex = bytes.get(i + 1..i + 3).ok_or(FormError::BadEncoding)?;
                // from_str_radix alone would take a sign, e.g. "%+1"
                if !hex.iter().all(u8::is_ascii_hexdigit) {
                    return Err(FormError::BadEncoding);
                }
                let hex = std::str::from_utf8(hex).map_err(|_| FormError::BadEncoding)?;
                let byte = u8::from_str_radix(hex, 16).map_err(|_| FormError::BadEncoding)?;
                out.push(byte);
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }

    String::from_utf8(out).map_err(|_| FormError::BadEncoding)
}
