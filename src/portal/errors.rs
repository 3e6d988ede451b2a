use axum::Json;
use axum::http::StatusCode;
use serde::Serialize;

use crate::render::html;
use crate::soap::SoapError;

#[derive(Debug, Serialize)]
pub(super) struct ErrorBody {
    pub error: String,
}

pub(super) fn status_for(e: &SoapError) -> StatusCode {
    match e {
        SoapError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        SoapError::Fault { code, .. } if code.ends_with("Client") => StatusCode::BAD_REQUEST,
        SoapError::Network { source, .. } if source.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

pub(super) fn soap_to_json(e: SoapError) -> (StatusCode, Json<ErrorBody>) {
    (
        status_for(&e),
        Json(ErrorBody {
            error: e.to_string(),
        }),
    )
}

/// One-line error shown in place of results.
pub(super) fn soap_to_html(e: &SoapError) -> String {
    html::error_paragraph(&e.to_string())
}

/// Full request/response dump for the debug page.
pub(super) fn soap_to_diagnostics(e: &SoapError) -> String {
    html::diagnostics(e.exchange(), &e.to_string())
}
