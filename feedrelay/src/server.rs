use std::io::Cursor;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::{get, routes, Build, Rocket, State};
use serde::Serialize;

use common::Config;

use crate::extraction::FeedItem;
use crate::ingestion::{self, FetchOutcome};

/// Application state stored inside Rocket managed state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub client: reqwest::Client,
}

impl AppState {
    /// Validates the configuration before building the shared HTTP client.
    pub fn new(config: Arc<Config>) -> Result<Self> {
        config.validate()?;
        let client = ingestion::build_client(&config.fetch)?;
        Ok(Self { config, client })
    }
}

/// Feed entry as shown without `debug=1`: failures are indistinguishable from empty feeds.
#[derive(Serialize)]
struct PublicFeed<'a> {
    source: &'a str,
    items: &'a [FeedItem],
}

#[derive(Serialize)]
#[serde(untagged)]
enum FeedsView<'a> {
    Debug(&'a [FetchOutcome]),
    Public(Vec<PublicFeed<'a>>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a> {
    feeds: FeedsView<'a>,
    generated_at: String,
}

/// Parse `count` like JavaScript `parseInt`: skip leading whitespace, optional sign, then the
/// leading digits. Missing or non-numeric input gives `default`; numbers are clamped to `[1, max]`.
pub fn effective_limit(raw: Option<&str>, default: usize, max: usize) -> usize {
    let Some(raw) = raw.map(str::trim_start).filter(|s| !s.is_empty()) else {
        return default;
    };

    let (negative, rest) = match raw.as_bytes()[0] {
        b'-' => (true, &raw[1..]),
        b'+' => (false, &raw[1..]),
        _ => (false, raw),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return default;
    }

    // Anything that doesn't fit is far outside the range anyway.
    let magnitude = rest[..digits].parse::<usize>().unwrap_or(usize::MAX);
    if negative && magnitude > 0 {
        1
    } else {
        magnitude.clamp(1, max.max(1))
    }
}

/// Serialize the envelope: pretty (2-space) with full outcomes in debug mode, minified otherwise.
pub fn render_body(outcomes: &[FetchOutcome], debug_view: bool) -> Result<String> {
    let feeds = if debug_view {
        FeedsView::Debug(outcomes)
    } else {
        FeedsView::Public(
            outcomes
                .iter()
                .map(|o| PublicFeed {
                    source: &o.source,
                    items: &o.items,
                })
                .collect(),
        )
    };

    let envelope = Envelope {
        feeds,
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    let body = if debug_view {
        serde_json::to_string_pretty(&envelope)
    } else {
        serde_json::to_string(&envelope)
    };
    body.context("failed to serialize feeds response")
}

/// JSON body with the content type and downstream cache policy of the feeds endpoint.
pub struct FeedsJson(pub String);

impl<'r> Responder<'r, 'static> for FeedsJson {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        Response::build()
            .status(Status::Ok)
            .raw_header("Content-Type", "application/json; charset=utf-8")
            .raw_header("Cache-Control", "public, max-age=300")
            .sized_body(self.0.len(), Cursor::new(self.0))
            .ok()
    }
}

/// First value of a possibly repeated query parameter, as `URLSearchParams.get` would return.
fn first_value(values: &Option<Vec<String>>) -> Option<&str> {
    values.as_ref().and_then(|v| v.first()).map(String::as_str)
}

/// `GET /api/feeds?count=&debug=`: fetch every configured feed and return normalized items.
#[get("/api/feeds?<count>&<debug>")]
async fn feeds(
    state: &State<AppState>,
    count: Option<Vec<String>>,
    debug: Option<Vec<String>>,
) -> Result<FeedsJson, Status> {
    let limits = &state.config.limits;
    let limit = effective_limit(first_value(&count), limits.default_count, limits.max_count);
    let debug_view = first_value(&debug) == Some("1");

    let outcomes = ingestion::fetch_all(&state.client, &state.config.feeds, limit).await;
    let ok = outcomes.iter().filter(|o| o.ok).count();
    tracing::info!(limit, debug = debug_view, ok, total = outcomes.len(), "feeds request served");

    render_body(&outcomes, debug_view).map(FeedsJson).map_err(|e| {
        tracing::error!("{:#}", e);
        Status::InternalServerError
    })
}

/// Build the Rocket instance with managed state and the feeds route mounted.
/// Bind address and port come from the `[server]` section.
pub fn build_rocket(state: AppState) -> Rocket<Build> {
    let fig = rocket::Config::figment()
        .merge(("address", state.config.server.bind.clone()))
        .merge(("port", state.config.server.port));

    rocket::custom(fig).manage(state).mount("/", routes![feeds])
}

/// Build and launch the Rocket server.
///
/// This function blocks until the Rocket server shuts down (it awaits `rocket.launch().await`)
/// and returns an error if Rocket fails to start.
pub async fn launch_rocket(config: Arc<Config>) -> Result<()> {
    let state = AppState::new(config)?;

    tracing::info!("Starting Rocket HTTP server");
    build_rocket(state)
        .launch()
        .await
        .map_err(|e| anyhow!("Rocket failed: {}", e))?;

    tracing::info!("Rocket HTTP server has shut down");
    Ok(())
}
