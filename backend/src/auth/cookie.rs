//! Refresh token cookie handling.
//!
//! The same path, HttpOnly, Secure and SameSite attributes are written when
//! the cookie is set and when it is cleared, otherwise browsers keep the old
//! cookie around.

use axum::http::{HeaderMap, HeaderValue, header};

use crate::config::CookieConfig;

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;
const EPOCH: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

#[derive(Debug, Clone)]
pub struct CookieService {
    config: CookieConfig,
}

impl CookieService {
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }

    /// Builds the `Set-Cookie` value carrying a refresh token.
    ///
    /// With `remember_me` the cookie outlives the browser session for the
    /// configured number of days; otherwise it is a session cookie.
    pub fn set_cookie(&self, refresh_token: &str, remember_me: bool) -> String {
        let mut cookie = format!("{}={}", self.config.name, refresh_token);
        if remember_me {
            cookie.push_str(&format!(
                "; Max-Age={}",
                self.config.max_age_days * SECONDS_PER_DAY
            ));
        }
        self.push_attributes(&mut cookie);
        cookie
    }

    /// Builds the `Set-Cookie` value that removes the refresh token.
    pub fn clear_cookie(&self) -> String {
        let mut cookie = format!("{}=; Max-Age=0; Expires={}", self.config.name, EPOCH);
        self.push_attributes(&mut cookie);
        cookie
    }

    /// Reads the refresh token from the request's `Cookie` headers.
    ///
    /// An empty value counts as absent.
    pub fn get_cookie(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.config.name)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Header value form of [`CookieService::set_cookie`].
    pub fn set_header(&self, refresh_token: &str, remember_me: bool) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.set_cookie(refresh_token, remember_me)).ok()
    }

    /// Header value form of [`CookieService::clear_cookie`].
    pub fn clear_header(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.clear_cookie()).ok()
    }

    fn push_attributes(&self, cookie: &mut String) {
        cookie.push_str(&format!("; Path={}", self.config.path));
        if self.config.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.config.same_site.as_str()));
    }
}
