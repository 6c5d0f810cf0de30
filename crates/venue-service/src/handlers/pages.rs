//! Server-rendered pages and htmx fragments.
//!
//! Every route here sits behind the cookie-session gate, so handlers always
//! find an [`AuthenticatedIdentity`] (possibly anonymous) in extensions.
//! Form failures render a 200 error fragment for htmx to swap in; success
//! is signalled with `HX-Redirect`.

use crate::auth::AuthenticatedIdentity;
use crate::errors::ServiceError;
use crate::middleware::cookies::{
    append_set_cookies, cleared_session_cookies, refresh_cookie, session_cookie_at,
    ID_TOKEN_COOKIE,
};
use crate::models::{NewVenue, Venue, VenuePage};
use crate::routes::AppState;
use crate::services::venues::is_http_url;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use common::secret::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::instrument;

const SITE_TITLE: &str = "Courtside";

const HX_REDIRECT: HeaderName = HeaderName::from_static("hx-redirect");

/// Escape text for HTML element content and quoted attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(identity: &AuthenticatedIdentity, content: &str) -> Html<String> {
    let nav = if identity.is_authenticated {
        format!(
            r#"<span class="user">{}</span> <button hx-post="/logout">Log out</button>"#,
            escape_html(&identity.email)
        )
    } else {
        r#"<a href="/login">Log in</a> <a href="/register">Register</a>"#.to_string()
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{SITE_TITLE}</title>
<script src="https://unpkg.com/htmx.org@1.9.12"></script>
</head>
<body>
<nav><a href="/">{SITE_TITLE}</a> <a href="/wheretoplay">Where to play</a> {nav}</nav>
<main>
{content}
</main>
</body>
</html>"#
    ))
}

fn error_fragment(message: &str) -> Html<String> {
    Html(format!(
        r#"<div class="error">{}</div>"#,
        escape_html(message)
    ))
}

/// Empty 200 that tells htmx to navigate.
fn hx_redirect(location: &'static str) -> Response {
    let mut response = StatusCode::OK.into_response();
    response
        .headers_mut()
        .insert(HX_REDIRECT, HeaderValue::from_static(location));
    response
}

fn service_error_fragment(err: &ServiceError) -> Response {
    if err.status_code().is_server_error() {
        tracing::warn!(target: "venue.handlers.pages", error = %err, "Form submission failed");
    }
    error_fragment(&err.client_message()).into_response()
}

// ============================================================================
// Home, login, logout, register
// ============================================================================

#[instrument(skip_all, name = "venue.pages.home")]
pub async fn home(Extension(identity): Extension<AuthenticatedIdentity>) -> Html<String> {
    let greeting = if identity.is_authenticated {
        format!(
            "<h1>Welcome back, {}</h1>",
            escape_html(&identity.email)
        )
    } else {
        r#"<h1>Find a place to play</h1><p><a href="/login">Log in</a> to add venues.</p>"#
            .to_string()
    };
    layout(&identity, &greeting)
}

pub async fn login_page(Extension(identity): Extension<AuthenticatedIdentity>) -> Html<String> {
    layout(
        &identity,
        r##"<h1>Log in</h1>
<form hx-post="/login" hx-target="#login-error">
<input type="email" name="email" placeholder="Email">
<input type="password" name="password" placeholder="Password">
<button type="submit">Log in</button>
</form>
<div id="login-error"></div>"##,
    )
}

#[derive(Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: Option<SecretString>,
}

impl CredentialsForm {
    fn password(&self) -> SecretString {
        self.password
            .clone()
            .unwrap_or_else(|| SecretString::from(String::new()))
    }
}

/// Sign in and set both session cookies.
///
/// `idToken` expires with the token; `refreshToken` after the configured
/// number of days.
#[instrument(skip_all, name = "venue.pages.login")]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let credentials = match state
        .user_service
        .sign_in(&form.email, &form.password())
        .await
    {
        Ok(credentials) => credentials,
        Err(e) => return service_error_fragment(&e),
    };

    let now = state.clock.now_unix();
    let id_cookie = session_cookie_at(
        ID_TOKEN_COOKIE,
        &credentials.id_token,
        now.saturating_add(credentials.expires_in),
    );
    let refresh = refresh_cookie(
        credentials.refresh_token.expose_secret(),
        now,
        state.config.refresh_cookie_ttl_days,
    );

    tracing::info!(target: "venue.handlers.pages", "User signed in");

    let mut response = hx_redirect("/");
    append_set_cookies(response.headers_mut(), [id_cookie, refresh]);
    response
}

#[instrument(skip_all, name = "venue.pages.logout")]
pub async fn logout() -> Response {
    let mut response = hx_redirect("/");
    append_set_cookies(response.headers_mut(), cleared_session_cookies());
    response
}

pub async fn register_page(Extension(identity): Extension<AuthenticatedIdentity>) -> Html<String> {
    layout(
        &identity,
        r##"<h1>Register</h1>
<form hx-post="/register" hx-target="#register-error">
<input type="email" name="email" placeholder="Email">
<input type="password" name="password" placeholder="Password (6+ characters)">
<button type="submit">Register</button>
</form>
<div id="register-error"></div>"##,
    )
}

#[instrument(skip_all, name = "venue.pages.register")]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Form(form): Form<CredentialsForm>,
) -> Response {
    match state
        .user_service
        .register(&form.email, &form.password())
        .await
    {
        Ok(_) => hx_redirect("/login"),
        Err(e) => service_error_fragment(&e),
    }
}

// ============================================================================
// Where to play
// ============================================================================

pub async fn where_to_play(Extension(identity): Extension<AuthenticatedIdentity>) -> Html<String> {
    let add_link = if identity.is_authenticated {
        r#"<p><a href="/wheretoplay/new">Add a venue</a></p>"#
    } else {
        ""
    };
    layout(
        &identity,
        &format!(
            r##"<h1>Where to play</h1>
{add_link}
<form hx-get="/wheretoplay/search" hx-target="#results">
<input type="text" name="cityPlaceId" placeholder="City">
<input type="text" name="sport" placeholder="Sport">
<button type="submit">Search</button>
</form>
<div id="results"></div>"##
        ),
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub city_place_id: String,
    #[serde(default)]
    pub sport: String,
    pub cursor: Option<String>,
    pub page_size: Option<usize>,
}

/// Results fragment. A "more" button is rendered while a cursor remains.
#[instrument(skip_all, name = "venue.pages.search")]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Html<String> {
    match state
        .venue_service
        .search(
            &query.city_place_id,
            &query.sport,
            query.cursor.as_deref(),
            query.page_size,
        )
        .await
    {
        Ok(page) => Html(render_results(&query, &page)),
        Err(e) => error_fragment(&e.client_message()),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NextPageQuery<'a> {
    city_place_id: &'a str,
    sport: &'a str,
    cursor: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_size: Option<usize>,
}

/// Escaped URL for an `href`/`src` attribute, empty unless http(s).
fn attr_url(value: &str) -> String {
    if is_http_url(value) {
        escape_html(value)
    } else {
        String::new()
    }
}

fn render_results(query: &SearchQuery, page: &VenuePage) -> String {
    if page.results.is_empty() {
        return r#"<p class="empty">No venues yet.</p>"#.to_string();
    }

    let mut html = String::from("<ul class=\"venues\">");
    for venue in &page.results {
        let _ = write!(
            html,
            r#"<li><a href="/wheretoplay/{sport}/{id}"><img src="{thumb}" alt=""> {name}</a></li>"#,
            sport = escape_html(&venue.sport_type.to_lowercase()),
            id = venue.id,
            thumb = attr_url(&venue.thumbnail_url),
            name = escape_html(&venue.name),
        );
    }
    html.push_str("</ul>");

    if let Some(cursor) = &page.cursor {
        let next = NextPageQuery {
            city_place_id: &query.city_place_id,
            sport: &query.sport,
            cursor,
            page_size: query.page_size,
        };
        match serde_urlencoded::to_string(&next) {
            Ok(qs) => {
                let _ = write!(
                    html,
                    r#"<button hx-get="/wheretoplay/search?{}" hx-swap="outerHTML">More</button>"#,
                    escape_html(&qs),
                );
            }
            Err(e) => {
                tracing::warn!(target: "venue.handlers.pages", error = %e, "Failed to encode next page query");
            }
        }
    }

    html
}

fn new_venue_form() -> &'static str {
    r##"<h1>Add a venue</h1>
<form hx-post="/wheretoplay/new" hx-target="#new-error">
<input type="text" name="name" placeholder="Name">
<input type="text" name="address" placeholder="Address">
<input type="text" name="website" placeholder="Website">
<input type="text" name="cityPlaceId" placeholder="City">
<input type="text" name="googlePlaceId" placeholder="Google place id">
<input type="text" name="sport" placeholder="Sport">
<input type="url" name="thumbnailUrl" placeholder="Thumbnail URL">
<textarea name="description" placeholder="Description (50+ characters)"></textarea>
<textarea name="note" placeholder="Note (optional, 50+ characters)"></textarea>
<button type="submit">Add</button>
</form>
<div id="new-error"></div>"##
}

/// Form for a new venue. Anonymous visitors are sent to `/login`.
pub async fn new_venue_page(Extension(identity): Extension<AuthenticatedIdentity>) -> Response {
    if !identity.is_authenticated {
        return Redirect::to("/login").into_response();
    }
    layout(&identity, new_venue_form()).into_response()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewVenueForm {
    pub name: String,
    pub address: String,
    pub website: String,
    pub city_place_id: String,
    pub google_place_id: String,
    pub sport: String,
    pub thumbnail_url: String,
    pub description: String,
    pub note: String,
}

impl From<NewVenueForm> for NewVenue {
    fn from(form: NewVenueForm) -> Self {
        Self {
            name: form.name,
            address: form.address,
            website: form.website,
            city_id: form.city_place_id,
            google_place_id: Some(form.google_place_id),
            sport_type: form.sport,
            thumbnail_url: form.thumbnail_url,
            description: form.description,
            note: form.note,
        }
    }
}

#[instrument(skip_all, name = "venue.pages.create_venue")]
pub async fn create_venue(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Form(form): Form<NewVenueForm>,
) -> Response {
    if !identity.is_authenticated {
        return Redirect::to("/login").into_response();
    }

    match state
        .venue_service
        .create(&identity.user_id, NewVenue::from(form))
        .await
    {
        Ok(_) => hx_redirect("/wheretoplay"),
        Err(e) => service_error_fragment(&e),
    }
}

fn render_venue(venue: &Venue) -> String {
    let mut html = format!(
        r#"<h1>{name}</h1>
<img src="{thumb}" alt="">
<p class="sport">{sport}</p>
<p class="description">{description}</p>"#,
        name = escape_html(&venue.name),
        thumb = attr_url(&venue.thumbnail_url),
        sport = escape_html(&venue.sport_type),
        description = escape_html(&venue.description),
    );
    if !venue.address.is_empty() {
        let _ = write!(html, r#"<p class="address">{}</p>"#, escape_html(&venue.address));
    }
    if is_http_url(&venue.website) {
        let _ = write!(
            html,
            r#"<p class="website"><a href="{0}" rel="nofollow noopener">{0}</a></p>"#,
            attr_url(&venue.website)
        );
    } else if !venue.website.is_empty() {
        let _ = write!(html, r#"<p class="website">{}</p>"#, escape_html(&venue.website));
    }
    if !venue.note.is_empty() {
        let _ = write!(html, r#"<p class="note">{}</p>"#, escape_html(&venue.note));
    }
    html
}

/// Venue details. Unknown ids, and a sport segment that does not match
/// the venue, render the not-found page.
#[instrument(skip_all, name = "venue.pages.venue_details")]
pub async fn venue_details(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Path((sport, venue_id)): Path<(String, String)>,
) -> Response {
    match state.venue_service.get(&venue_id).await {
        Some(venue) if venue.sport_type.eq_ignore_ascii_case(&sport) => {
            layout(&identity, &render_venue(&venue)).into_response()
        }
        _ => (
            StatusCode::NOT_FOUND,
            layout(
                &identity,
                r#"<h1>Venue not found</h1><p><a href="/wheretoplay">Back to search</a></p>"#,
            ),
        )
            .into_response(),
    }
}
