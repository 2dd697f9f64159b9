//! Refresh-cookie builders.
//!
//! The raw refresh token only ever travels in this http-only cookie; the
//! access token goes back in the response body.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Attributes applied to the refresh cookie, resolved once from config.
#[derive(Clone, Debug)]
pub struct CookieOptions {
    /// Domain attribute; `None` leaves it host-only.
    pub domain: Option<String>,
    pub secure: bool,
    pub same_site: SameSite,
    /// Max-Age in seconds; normally the refresh-token lifetime.
    pub max_age_secs: i64,
}

fn build(value: String, opts: &CookieOptions, max_age: Duration) -> Cookie<'static> {
    let mut builder = Cookie::build((REFRESH_TOKEN_COOKIE, value))
        .path("/")
        .max_age(max_age)
        .http_only(true)
        .secure(opts.secure)
        .same_site(opts.same_site);
    if let Some(domain) = &opts.domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}

/// Set the refresh-token cookie on the jar.
///
/// ```
/// use axum_extra::extract::cookie::{CookieJar, SameSite};
/// use gatehouse_auth_types::cookie::{CookieOptions, REFRESH_TOKEN_COOKIE, set_refresh_token_cookie};
///
/// let opts = CookieOptions {
///     domain: None,
///     secure: true,
///     same_site: SameSite::Lax,
///     max_age_secs: 604800,
/// };
/// let jar = set_refresh_token_cookie(CookieJar::new(), "raw-token".to_string(), &opts);
/// let cookie = jar.get(REFRESH_TOKEN_COOKIE).unwrap();
/// assert_eq!(cookie.path(), Some("/"));
/// assert!(cookie.http_only().unwrap_or(false));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(604800)));
/// ```
pub fn set_refresh_token_cookie(jar: CookieJar, value: String, opts: &CookieOptions) -> CookieJar {
    jar.add(build(value, opts, Duration::seconds(opts.max_age_secs)))
}

/// Clear the refresh-token cookie by setting Max-Age to 0.
///
/// ```
/// use axum_extra::extract::cookie::{CookieJar, SameSite};
/// use gatehouse_auth_types::cookie::{
///     CookieOptions, REFRESH_TOKEN_COOKIE, clear_refresh_token_cookie, set_refresh_token_cookie,
/// };
///
/// let opts = CookieOptions {
///     domain: None,
///     secure: false,
///     same_site: SameSite::Lax,
///     max_age_secs: 604800,
/// };
/// let jar = set_refresh_token_cookie(CookieJar::new(), "raw-token".to_string(), &opts);
/// let jar = clear_refresh_token_cookie(jar, &opts);
/// let cookie = jar.get(REFRESH_TOKEN_COOKIE).unwrap();
/// assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_refresh_token_cookie(jar: CookieJar, opts: &CookieOptions) -> CookieJar {
    jar.add(build(String::new(), opts, Duration::ZERO))
}
