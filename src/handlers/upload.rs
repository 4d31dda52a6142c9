use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::AppState;
use crate::error::ServiceError;
use crate::models::dashboard::UploadResponse;
use crate::models::validation::ValidationResponse;

/// Fields of an upload form: a `file` part and an optional `title`.
#[derive(Default)]
struct UploadForm {
    file_name: Option<String>,
    file: Option<Bytes>,
    title: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, (StatusCode, String)> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") => {
                    form.file_name = field.file_name().map(str::to_string);
                    form.file = Some(
                        field
                            .bytes()
                            .await
                            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
                    );
                }
                Some("title") => {
                    form.title = Some(
                        field
                            .text()
                            .await
                            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
                    );
                }
                _ => {}
            }
        }
        Ok(form)
    }

    fn csv(&self) -> Result<&[u8], (StatusCode, String)> {
        match &self.file {
            Some(bytes) if !bytes.is_empty() => Ok(&bytes[..]),
            _ => Err((StatusCode::BAD_REQUEST, "CSV file is required".to_string())),
        }
    }
}

fn service_error(e: ServiceError) -> (StatusCode, String) {
    let status = match &e {
        ServiceError::Csv(_) => StatusCode::BAD_REQUEST,
        ServiceError::Publish(p) if p.is_configuration() => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Publish(_) => StatusCode::BAD_GATEWAY,
    };
    tracing::error!("dashboard request failed: {e}");
    (status, e.to_string())
}

pub async fn upload_csv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let form = UploadForm::read(multipart).await?;
    let created = state
        .service
        .create_from_csv(form.csv()?, form.file_name.as_deref(), form.title.as_deref())
        .await
        .map_err(service_error)?;
    Ok(Json(UploadResponse::from(created)))
}

pub async fn validate_csv(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let form = UploadForm::read(multipart).await?;
    let results = state
        .service
        .validate_csv(form.csv()?)
        .await
        .map_err(service_error)?;
    Ok(Json(ValidationResponse { results }))
}
