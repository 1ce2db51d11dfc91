use std::io;
use std::sync::{MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::access::LanguagePrefs;
use crate::data::store::TileRecord;
use crate::error::TileError;
use crate::i18n::{get_text, get_text_by_name, Locale, MessageKey};
use crate::reconcile::{InboundReport, SavedReport, TileView};
use crate::report::CountVector;
use crate::server::AppContext;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0}")]
    BadRequest(String),
    #[error("failed to update user state: {0}")]
    UserState(#[from] io::Error),
    #[error("{0}")]
    MissingLocation(String),
    /// A core failure with its localized explanation.
    #[error("{message}")]
    Tile {
        source: TileError,
        code: &'static str,
        message: String,
    },
}

impl ApiError {
    fn tile(locale: Locale, source: TileError) -> Self {
        let (key, code) = match &source {
            TileError::InvalidReport => (MessageKey::InvalidMessage, "invalid_message"),
            TileError::NotForwarded => (MessageKey::MessageForwarded, "message_forwarded"),
            TileError::Unauthorized(_) => (MessageKey::NoPermission, "no_permission"),
            TileError::LocationNotFound(_) => (MessageKey::NoInfoFound, "no_info_found"),
            TileError::StoreLoad { .. }
            | TileError::Persistence { .. }
            | TileError::MalformedTimestamp(_) => (MessageKey::ExportError, "export_error"),
        };
        let detail = source.to_string();
        let location = match &source {
            TileError::LocationNotFound(location) => location.as_str(),
            _ => "",
        };
        let message = get_text(locale, key, &[("location", location), ("error", &detail)]);
        if matches!(key, MessageKey::ExportError) {
            log::error!("{detail}");
        } else {
            log::warn!("request declined: {detail}");
        }
        ApiError::Tile {
            source,
            code,
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    #[serde(flatten)]
    report: InboundReport,
    #[serde(default)]
    lang: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitResponse<'a> {
    status: &'static str,
    created: bool,
    location: &'a str,
    counts: CountVector,
    record: &'a TileRecord,
    message: String,
}

#[derive(Debug, Serialize)]
struct TileResponse<'a> {
    status: &'static str,
    tile: &'a TileView,
    message: String,
}

#[derive(Debug, Deserialize)]
struct LanguageRequest {
    language: String,
}

fn prefs(ctx: &AppContext) -> MutexGuard<'_, LanguagePrefs> {
    ctx.prefs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Value of `name` in a raw `a=1&b=2` query string.
pub fn query_param<'a>(query: &'a str, name: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Explicit `lang` wins, then the user's stored preference, then the client language tag.
fn resolve_locale(
    ctx: &AppContext,
    explicit: Option<&str>,
    user_id: Option<i64>,
    language_code: Option<&str>,
) -> Locale {
    explicit
        .and_then(Locale::from_code)
        .unwrap_or_else(|| prefs(ctx).resolve(user_id, language_code))
}

fn query_locale(ctx: &AppContext, query: &str) -> Locale {
    let user_id = query_param(query, "user_id").and_then(|raw| raw.parse::<i64>().ok());
    resolve_locale(ctx, query_param(query, "lang"), user_id, None)
}

pub fn count_lines(locale: Locale, counts: &CountVector) -> String {
    counts
        .iter()
        .map(|(faction, count)| {
            get_text(
                locale,
                MessageKey::ColorCount,
                &[("symbol", faction.symbol()), ("count", &count.to_string())],
            )
        })
        .collect()
}

pub fn saved_text(locale: Locale, saved: &SavedReport) -> String {
    let details = count_lines(locale, &saved.counts);
    let poster = saved.record.poster.as_deref().unwrap_or("-");
    get_text(
        locale,
        MessageKey::SavedSuccessfully,
        &[
            ("location", saved.location.as_str()),
            ("details", &details),
            ("user", poster),
        ],
    )
}

fn footer(locale: Locale, view: &TileView) -> String {
    get_text(
        locale,
        MessageKey::SimpleInfoFooter,
        &[
            ("minutes", &view.elapsed_minutes.to_string()),
            ("user", view.poster.as_deref().unwrap_or("-")),
        ],
    )
}

/// Location header, one line per faction, then freshness and poster.
pub fn tile_summary_text(locale: Locale, view: &TileView) -> String {
    let header = get_text(
        locale,
        MessageKey::SimpleInfoHeader,
        &[("location", view.location.as_str())],
    );
    format!("{header}{}{}", count_lines(locale, &view.counts), footer(locale, view))
}

/// The stored report text followed by freshness and poster.
pub fn tile_report_text(locale: Locale, view: &TileView) -> String {
    format!("{}\n{}", view.text, footer(locale, view))
}

pub fn health_payload(ctx: &AppContext) -> Result<String, ApiError> {
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "service": "tilewatch-api",
        "version": env!("CARGO_PKG_VERSION"),
        "store": ctx.service.store_path().display().to_string(),
        "authorization_required": ctx.config.require_authorization,
    }))?)
}

pub fn submit_report_payload(ctx: &AppContext, body: &str) -> Result<String, ApiError> {
    let request: SubmitRequest = serde_json::from_str(body)?;
    let report = request.report;
    let locale = resolve_locale(
        ctx,
        request.lang.as_deref(),
        report.user_id,
        report.language_code.as_deref(),
    );

    if ctx.config.require_authorization {
        let user_id = report.user_id.ok_or_else(|| {
            ApiError::BadRequest("user_id is required when authorization is enforced".to_string())
        })?;
        let authorized = ctx
            .access
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_authorized(user_id);
        if !authorized {
            return Err(ApiError::tile(locale, TileError::Unauthorized(user_id)));
        }
    }

    let saved = ctx
        .service
        .submit(&report)
        .map_err(|err| ApiError::tile(locale, err))?;
    let response = SubmitResponse {
        status: "ok",
        created: saved.created,
        location: saved.location.as_str(),
        counts: saved.counts,
        record: &saved.record,
        message: saved_text(locale, &saved),
    };
    Ok(serde_json::to_string_pretty(&response)?)
}

fn lookup(ctx: &AppContext, location: &str, locale: Locale) -> Result<TileView, ApiError> {
    ctx.service
        .lookup(location)
        .map_err(|err| ApiError::tile(locale, err))
}

pub fn missing_location_payload(ctx: &AppContext, query: &str) -> Result<String, ApiError> {
    let locale = query_locale(ctx, query);
    Err(ApiError::MissingLocation(get_text(
        locale,
        MessageKey::ProvideLocation,
        &[],
    )))
}

pub fn tile_payload(ctx: &AppContext, location: &str, query: &str) -> Result<String, ApiError> {
    let locale = query_locale(ctx, query);
    let view = lookup(ctx, location, locale)?;
    let response = TileResponse {
        status: "ok",
        message: tile_summary_text(locale, &view),
        tile: &view,
    };
    Ok(serde_json::to_string_pretty(&response)?)
}

pub fn tile_text_payload(
    ctx: &AppContext,
    location: &str,
    query: &str,
) -> Result<String, ApiError> {
    let locale = query_locale(ctx, query);
    let view = lookup(ctx, location, locale)?;
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "location": view.location,
        "text": view.text,
        "elapsed_minutes": view.elapsed_minutes,
        "message": tile_report_text(locale, &view),
    }))?)
}

pub fn export_payload(ctx: &AppContext, query: &str) -> Result<String, ApiError> {
    ctx.service
        .export_csv()
        .map_err(|err| ApiError::tile(query_locale(ctx, query), err))
}

pub fn help_payload(ctx: &AppContext, query: &str) -> Result<String, ApiError> {
    let locale = query_locale(ctx, query);
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "locale": locale,
        "message": get_text(locale, MessageKey::HelpMessage, &[]),
    }))?)
}

/// Renders a named template. Query pairs other than `lang` and `user_id` fill its placeholders.
pub fn message_payload(ctx: &AppContext, name: &str, query: &str) -> Result<String, ApiError> {
    let locale = query_locale(ctx, query);
    let params: Vec<(&str, &str)> = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !matches!(*key, "lang" | "user_id"))
        .collect();
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "locale": locale,
        "key": name,
        "known": MessageKey::from_name(name).is_some(),
        "message": get_text_by_name(locale, name, &params),
    }))?)
}

pub fn authorize_payload(ctx: &AppContext, raw_id: &str) -> Result<String, ApiError> {
    let user_id = raw_id
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("invalid user id '{raw_id}'")))?;
    let added = ctx
        .access
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .authorize(user_id)?;
    if added {
        log::info!("user {user_id} authorized");
    }
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "user_id": user_id,
        "added": added,
    }))?)
}

pub fn set_language_payload(ctx: &AppContext, raw_id: &str, body: &str) -> Result<String, ApiError> {
    let user_id = raw_id
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("invalid user id '{raw_id}'")))?;
    let request: LanguageRequest = serde_json::from_str(body)?;
    let locale = Locale::from_code(&request.language).ok_or_else(|| {
        ApiError::BadRequest(format!("unsupported language '{}'", request.language))
    })?;
    prefs(ctx).set(user_id, locale)?;
    log::info!("user {user_id} language set to {}", locale.code());
    Ok(serde_json::to_string_pretty(&serde_json::json!({
        "status": "ok",
        "user_id": user_id,
        "language": locale,
    }))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::LocationKey;

    fn view() -> TileView {
        TileView {
            location: LocationKey::from_query("gy2"),
            counts: CountVector::new(3, 2, 0, 0),
            total: 5,
            text: "You looked to the GY2".to_string(),
            saved_at: Some("2024-05-01 12:00:00".to_string()),
            poster: Some("alice".to_string()),
            elapsed_minutes: 15,
        }
    }

    #[test]
    fn query_param_ignores_empty_values() {
        assert_eq!(query_param("lang=es&user_id=4", "user_id"), Some("4"));
        assert_eq!(query_param("lang=", "lang"), None);
        assert_eq!(query_param("", "lang"), None);
    }

    #[test]
    fn summary_text_lists_every_faction() {
        let text = tile_summary_text(Locale::En, &view());
        assert_eq!(
            text,
            "Location: gy2\n🇲🇴 -> 3\n🇻🇦 -> 2\n🇮🇲 -> 0\n🇪🇺 -> 0\nElapsed time: 15 minutes\nPosted by: alice"
        );
    }

    #[test]
    fn report_text_appends_localized_footer() {
        let text = tile_report_text(Locale::Es, &view());
        assert!(text.starts_with("You looked to the GY2\n"));
        assert!(text.contains("Tiempo transcurrido: 15 minutos"));
    }

    #[test]
    fn saved_text_names_location_and_poster() {
        let saved = SavedReport {
            location: LocationKey::from_query("rg123"),
            counts: CountVector::new(3, 2, 0, 0),
            record: TileRecord {
                location: LocationKey::from_query("rg123"),
                counts: CountVector::new(3, 2, 0, 0),
                text: String::new(),
                saved_at: None,
                poster: Some("alice".to_string()),
            },
            created: true,
        };
        let text = saved_text(Locale::En, &saved);
        assert!(text.starts_with("Saved!\nLocation: rg123\nColor Details: \n🇲🇴 -> 3"));
        assert!(text.ends_with("Posted By: alice"));
    }
}
