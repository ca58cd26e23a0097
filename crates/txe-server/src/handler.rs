use axum::extract::{Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use txe_store::{FetchAction, NamedFetch, TransactionStore, TEXT_XML};
use txe_types::ItemUri;

use crate::error::ServerError;
use crate::state::{AppState, Exchange};

/// Banner returned when no operation matches the request.
const BANNER: &str = "txe-server";

/// Diagnostic when the incoming folder is not configured or unusable.
const NO_INCOMING_FOLDER: &str =
    "Error: no usable incoming folder is configured; the exchange cannot process requests.";

/// Diagnostic when no maximum package size is configured.
const NO_MAXIMUM_SIZE: &str =
    "Error: no maximum package size is configured; the exchange cannot process requests.";

/// Query parameters of the exchange endpoint, under the wire names the
/// deployment client sends.
#[derive(Debug, Default, Deserialize)]
pub struct ExchangeParams {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
    pub action: Option<String>,
    #[serde(rename = "transactionid")]
    pub transaction_id: Option<String>,
    pub extension: Option<String>,
    #[serde(rename = "batchFiles")]
    pub batch_files: Option<String>,
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET side of the exchange endpoint: every operation except uploads.
pub async fn exchange_get(
    State(state): State<AppState>,
    Query(params): Query<ExchangeParams>,
) -> Response {
    dispatch(&state, params, None).await
}

/// POST side: multipart uploads, falling through to the query operations
/// for clients that POST their polls.
pub async fn exchange_post(
    State(state): State<AppState>,
    Query(params): Query<ExchangeParams>,
    multipart: Option<Multipart>,
) -> Response {
    dispatch(&state, params, multipart).await
}

/// One operation per request, first match wins: upload, list, batch,
/// transaction fetch, named fetch, banner.
async fn dispatch(
    state: &AppState,
    params: ExchangeParams,
    multipart: Option<Multipart>,
) -> Response {
    let Some(exchange) = state.exchange.as_deref() else {
        return plain(NO_INCOMING_FOLDER);
    };
    let Some(max_size) = exchange.max_upload_size() else {
        return plain(NO_MAXIMUM_SIZE);
    };

    if let Some(multipart) = multipart {
        if let Some(response) = handle_upload(exchange, max_size, multipart).await {
            return response;
        }
    }

    let action = params.action.as_deref().unwrap_or("");
    if action.eq_ignore_ascii_case("list") {
        return handle_list(exchange, params.extension.as_deref().unwrap_or(""));
    }
    if action.eq_ignore_ascii_case("batch") {
        return handle_batch(exchange, params.batch_files.as_deref().unwrap_or(""));
    }
    if let Some(id) = params.transaction_id.as_deref().filter(|id| !id.is_empty()) {
        return handle_transaction(exchange, id);
    }
    if let Some(name) = params.file_name.as_deref().filter(|n| !n.is_empty()) {
        return handle_named(exchange, name, action);
    }
    plain(BANNER)
}

/// Store every file field within the size limit. `None` when the body
/// carried no file fields at all, so the caller can fall through to the
/// query operations.
async fn handle_upload(
    exchange: &Exchange,
    max_size: u64,
    mut multipart: Multipart,
) -> Option<Response> {
    let mut saw_file = false;
    let mut stored = 0usize;
    let mut oversized = 0usize;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "could not read multipart field");
                break;
            }
        };
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(package = file_name, error = %e, "could not read upload body");
                continue;
            }
        };
        saw_file = true;

        if bytes.len() as u64 > max_size {
            warn!(
                package = file_name,
                size = bytes.len(),
                max_size,
                "upload exceeds maximum package size"
            );
            oversized += 1;
            continue;
        }
        match exchange.store().store_package(&file_name, &bytes) {
            Ok(name) => {
                info!(package = name, "package received");
                stored += 1;
            }
            Err(e) => warn!(package = file_name, error = %e, "could not store package"),
        }
    }

    if !saw_file {
        return None;
    }
    debug!(stored, oversized, "upload handled");
    if oversized > 0 {
        return Some(
            (StatusCode::PAYLOAD_TOO_LARGE, "Maximum filesize exceeded").into_response(),
        );
    }
    Some(plain("Upload successful"))
}

/// Package listing: each matching name followed by `:`, concatenated.
fn handle_list(exchange: &Exchange, extension: &str) -> Response {
    info!(extension, "file list requested");
    match exchange.store().list_by_extension(extension) {
        Ok(names) => {
            let mut body = String::new();
            for name in &names {
                body.push_str(name);
                body.push(':');
            }
            plain(body)
        }
        Err(e) => internal_error(e.into()),
    }
}

fn handle_batch(exchange: &Exchange, batch_files: &str) -> Response {
    info!("batch status requested");
    match exchange.aggregator().aggregate(batch_files) {
        Ok(document) => xml(document),
        Err(e) => internal_error(e.into()),
    }
}

fn handle_transaction(exchange: &Exchange, id: &str) -> Response {
    let uri = match ItemUri::parse(id) {
        Ok(uri) => uri,
        Err(e) => {
            debug!(id, error = %e, "transaction id is not a valid item uri");
            return no_content();
        }
    };
    match exchange.store().fetch_transaction(&uri) {
        Ok(Some(content)) => xml(content.into_bytes()),
        Ok(None) => no_content(),
        Err(e) => internal_error(e.into()),
    }
}

fn handle_named(exchange: &Exchange, name: &str, action: &str) -> Response {
    // A poller about to read the metadata document observes a freshly
    // swept directory.
    if TransactionStore::is_meta(name) {
        exchange.sweeper().run();
    }

    let fetch_action = if action.eq_ignore_ascii_case("remove") {
        FetchAction::Remove
    } else {
        FetchAction::Serve
    };
    match exchange.store().fetch_named(name, fetch_action) {
        Ok(NamedFetch::Served { body, content_type }) => {
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Ok(NamedFetch::Removed) => plain("File removed"),
        Ok(NamedFetch::NoContent) => no_content(),
        Err(e) => internal_error(e.into()),
    }
}

fn plain(text: impl Into<String>) -> Response {
    (StatusCode::OK, text.into()).into_response()
}

fn xml(body: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, TEXT_XML)], body).into_response()
}

fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

fn internal_error(e: ServerError) -> Response {
    error!(error = %e, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
}
