//! Locale resolution.
//!
//! Every request gets a [`Locale`] extension, chosen in this order:
//! 1. `?lang=` query argument (answered with a redirect to the bare path)
//! 2. `lang` cookie
//! 3. First five characters of `Accept-Language`
//! 4. Configured default locale
//!
//! Unsupported values are ignored; an unsupported `?lang=` also discards the
//! cookie. The cookie is written whenever the choice did not come from it.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{self, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;

use crate::handlers::found;
use crate::state::AppState;

/// Cookie and query argument name.
const LANG_KEY: &str = "lang";

/// Cookie lifetime in seconds (`2^31 - 1`).
const COOKIE_MAX_AGE: u32 = 2_147_483_647;

/// Locale of the current request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Locale(pub(crate) String);

/// Outcome of locale resolution.
#[derive(Debug, PartialEq, Eq)]
struct Choice {
    locale: String,
    /// Chosen from the query; answer with a redirect.
    redirect: bool,
    /// Request carried no valid cookie.
    set_cookie: bool,
}

fn choose(
    query: Option<&str>,
    cookie: Option<&str>,
    accept_language: Option<&str>,
    is_supported: impl Fn(&str) -> bool,
    default: &str,
) -> Choice {
    if let Some(lang) = query.filter(|&l| is_supported(l)) {
        return Choice {
            locale: lang.to_owned(),
            redirect: true,
            set_cookie: true,
        };
    }
    let cookie = if query.is_some() { None } else { cookie };
    if let Some(lang) = cookie.filter(|&l| is_supported(l)) {
        return Choice {
            locale: lang.to_owned(),
            redirect: false,
            set_cookie: false,
        };
    }

    let locale = accept_language
        .and_then(|al| al.get(..5))
        .filter(|&l| is_supported(l))
        .unwrap_or(default);
    Choice {
        locale: locale.to_owned(),
        redirect: false,
        set_cookie: true,
    }
}

fn query_lang(query: Option<&str>) -> Option<String> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query?).ok()?;
    pairs
        .into_iter()
        .find(|(key, value)| key == LANG_KEY && !value.is_empty())
        .map(|(_, value)| value)
}

fn cookie_lang(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == LANG_KEY)
        .map(|(_, value)| value)
}

fn lang_cookie(locale: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{LANG_KEY}={locale}; Path=/; Max-Age={COOKIE_MAX_AGE}"
    ))
    .ok()
}

/// Resolve the request locale and attach it as an extension.
pub(crate) async fn resolve_locale(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let query = query_lang(request.uri().query());
    let headers = request.headers();
    let choice = choose(
        query.as_deref(),
        cookie_lang(headers),
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
        |lang| state.site.has_locale(lang),
        &state.default_locale,
    );

    let mut response = if choice.redirect {
        found(request.uri().path())
    } else {
        request
            .extensions_mut()
            .insert(Locale(choice.locale.clone()));
        next.run(request).await
    };

    if choice.set_cookie
        && let Some(cookie) = lang_cookie(&choice.locale)
    {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}
