//! HTTP surface.
//!
//! ```text
//! GET  /printers
//! GET  /printers/{serialNumber}
//! POST /printers/{serialNumber}?tape=D1_12_MM&preview=false   (multipart: multipartFile)
//! ```

use axum::{
    body::Body,
    extract::{
        multipart::MultipartError, rejection::QueryRejection, DefaultBodyLimit, Multipart, Path,
        Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{error, warn};
use serde::{de, Deserialize, Deserializer};
use serde_json::json;
use std::sync::Arc;

use crate::{
    config::parse_bool,
    error::LabelError,
    handler::{LabelService, PrintRequest},
    printer::Printer,
    tape::TapeKind,
};

/// Name of the multipart part carrying the image.
pub const IMAGE_PART: &str = "multipartFile";

/// Error response: `{"status": "error", "error": message}`.
#[derive(Debug)]
pub struct ApiError(LabelError);

impl From<LabelError> for ApiError {
    fn from(err: LabelError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LabelError::NotFound => StatusCode::NOT_FOUND,
            LabelError::BadRequest(_) => StatusCode::BAD_REQUEST,
            LabelError::InternalError(msg) => {
                error!("internal error: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({ "status": "error", "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Deserialize)]
pub struct PrintParams {
    #[serde(default)]
    tape: TapeKind,
    /// Accepts the same spellings as boolean settings: `true`/`false`,
    /// `yes`/`no`, `on`/`off`, `1`/`0`.
    #[serde(default, deserialize_with = "deserialize_flag")]
    preview: bool,
}

pub fn create_router(service: Arc<LabelService>, max_upload: usize) -> Router {
    Router::new()
        .route("/printers", get(list_printers))
        .route("/printers/{serial_number}", get(get_printer).post(print_label))
        .layer(DefaultBodyLimit::max(max_upload))
        .with_state(service)
}

/// Run `f` on the blocking pool; enumeration and printing talk to USB.
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, LabelError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(err) => Err(LabelError::InternalError(err.to_string()).into()),
    }
}

/// GET /printers
async fn list_printers(State(service): State<Arc<LabelService>>) -> ApiResult<Json<Vec<Printer>>> {
    let printers = blocking(move || service.list_printers()).await?;
    Ok(Json(printers))
}

/// GET /printers/{serialNumber}
async fn get_printer(
    State(service): State<Arc<LabelService>>,
    Path(serial_number): Path<String>,
) -> ApiResult<Json<Printer>> {
    let printer = blocking(move || service.find_printer(&serial_number)).await?;
    Ok(Json(printer))
}

/// POST /printers/{serialNumber}
async fn print_label(
    State(service): State<Arc<LabelService>>,
    Path(serial_number): Path<String>,
    params: Result<Query<PrintParams>, QueryRejection>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let Query(params) = params.map_err(|err| {
        warn!("rejected query: {}", err);
        LabelError::BadRequest(err.body_text())
    })?;
    let image = read_image_part(multipart).await?;

    let request = PrintRequest {
        serial_number,
        tape: params.tape,
        image,
        preview: params.preview,
    };
    let preview = blocking(move || service.print_label(&request)).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, preview.content_type())
        .header(header::CONTENT_LENGTH, preview.content_length())
        .body(Body::from(preview.into_bytes()))
        .map_err(|err| LabelError::InternalError(err.to_string()).into())
}

async fn read_image_part(mut multipart: Multipart) -> ApiResult<Vec<u8>> {
    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(multipart_error)?;
        let field = match field {
            Some(field) => field,
            None => {
                return Err(LabelError::BadRequest(format!("Missing {} part", IMAGE_PART)).into())
            }
        };
        if field.name() == Some(IMAGE_PART) {
            let bytes = field
                .bytes()
                .await
                .map_err(multipart_error)?;
            return Ok(bytes.to_vec());
        }
    }
}

/// Oversized or malformed uploads are the client's fault; only server side
/// read failures are internal.
fn multipart_error(err: MultipartError) -> LabelError {
    if err.status().is_client_error() {
        warn!("rejected upload: {}", err.body_text());
        LabelError::BadRequest(err.body_text())
    } else {
        LabelError::InternalError(err.body_text())
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    parse_bool(&value).map_err(de::Error::custom)
}
