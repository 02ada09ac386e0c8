//! Cookie service: set and clear the httpOnly session cookies.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use villa_core::models::auth::TokenPair;

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "villa_access";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "villa_refresh";

/// Absolute lifetime of stored session cookies, independent of token TTLs.
pub const SESSION_COOKIE_DAYS: i64 = 60;

fn session_cookie(
    name: &'static str,
    value: String,
    max_age: Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

/// Add both token cookies to `jar`.
pub fn store_tokens(jar: CookieJar, pair: &TokenPair, secure: bool) -> CookieJar {
    let max_age = Duration::days(SESSION_COOKIE_DAYS);
    jar.add(session_cookie(ACCESS_COOKIE, pair.access_token.clone(), max_age, secure))
        .add(session_cookie(REFRESH_COOKIE, pair.refresh_token.clone(), max_age, secure))
}

/// Overwrite both token cookies with expired blanks.
pub fn clear_tokens(jar: CookieJar, secure: bool) -> CookieJar {
    jar.add(session_cookie(ACCESS_COOKIE, String::new(), Duration::ZERO, secure))
        .add(session_cookie(REFRESH_COOKIE, String::new(), Duration::ZERO, secure))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_cookies_are_http_only_and_long_lived() {
        let jar = store_tokens(CookieJar::new(), &TokenPair::new("a", "r"), false);
        let access = jar.get(ACCESS_COOKIE).unwrap();
        assert_eq!(access.value(), "a");
        assert_eq!(access.http_only(), Some(true));
        assert_eq!(access.secure(), Some(false));
        assert_eq!(access.max_age(), Some(Duration::days(60)));
        assert_eq!(jar.get(REFRESH_COOKIE).unwrap().value(), "r");
    }

    #[test]
    fn secure_flag_follows_setting() {
        let jar = store_tokens(CookieJar::new(), &TokenPair::new("a", "r"), true);
        assert_eq!(jar.get(ACCESS_COOKIE).unwrap().secure(), Some(true));
        assert_eq!(jar.get(REFRESH_COOKIE).unwrap().secure(), Some(true));

        let jar = clear_tokens(jar, true);
        assert_eq!(jar.get(REFRESH_COOKIE).unwrap().secure(), Some(true));
    }

    #[test]
    fn cleared_cookies_are_blank_and_expired() {
        let jar = clear_tokens(
            store_tokens(CookieJar::new(), &TokenPair::new("a", "r"), false),
            false,
        );
        let refresh = jar.get(REFRESH_COOKIE).unwrap();
        assert_eq!(refresh.value(), "");
        assert_eq!(refresh.max_age(), Some(Duration::ZERO));
    }
}
