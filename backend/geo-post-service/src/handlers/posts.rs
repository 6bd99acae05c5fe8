use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use bytes::BytesMut;
use futures_util::stream::StreamExt;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

use super::AppState;
use crate::error::{AppError, Result};
use crate::models::{ImageUpload, RawPost};

/// Limit for the plain text form fields.
const MAX_TEXT_FIELD_BYTES: usize = 64 * 1024;

/// Query parameters of `GET /search`. `range` is a radius in km unless it
/// carries a unit.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub lat: String,
    #[serde(default)]
    pub lon: String,
    #[serde(default)]
    pub range: String,
}

/// Create a post
/// POST /post (multipart: user, message, lat, lon, image)
pub async fn create_post(state: web::Data<AppState>, payload: Multipart) -> Result<HttpResponse> {
    let limits = state.limits;

    with_deadline(limits.request_timeout, async {
        let (raw, image) = read_post_form(payload, limits.max_image_bytes).await?;
        let image = image.ok_or(AppError::MissingImage)?;
        state.pipeline.ingest(raw, image).await?;
        Ok::<_, AppError>(())
    })
    .await?;

    Ok(HttpResponse::Ok().finish())
}

/// Search posts around a point
/// GET /search?lat=&lon=&range=
pub async fn search_posts(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();

    let posts = with_deadline(state.limits.request_timeout, async {
        Ok::<_, AppError>(state
            .query
            .search_at(&query.lat, &query.lon, &query.range)
            .await?)
    })
    .await?;

    Ok(HttpResponse::Ok().json(posts))
}

/// Run `work` under the request deadline. Expiry drops the future, which
/// cancels any backend call still in flight.
async fn with_deadline<T, F>(deadline: Duration, work: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, work).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(timeout_secs = deadline.as_secs(), "request deadline exceeded");
            Err(AppError::Timeout)
        }
    }
}

async fn read_post_form(
    mut payload: Multipart,
    max_image_bytes: usize,
) -> Result<(RawPost, Option<ImageUpload>)> {
    let mut raw = RawPost::default();
    let mut image = None;

    while let Some(field) = payload.next().await {
        let field = field?;
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "image" => {
                let content_type = field.content_type().map(|m| m.to_string());
                let data = read_field(field, max_image_bytes)
                    .await?
                    .ok_or(AppError::PayloadTooLarge(max_image_bytes))?;
                image = Some(ImageUpload::new(data.freeze(), content_type));
            }
            "user" => raw.user = read_text(field).await?,
            "message" => raw.message = read_text(field).await?,
            "lat" => raw.lat = read_text(field).await?,
            "lon" => raw.lon = read_text(field).await?,
            _ => {
                // Drain unknown fields so the stream can advance
                read_field(field, MAX_TEXT_FIELD_BYTES)
                    .await?
                    .ok_or_else(|| AppError::FieldTooLarge {
                        field: name.clone(),
                        limit: MAX_TEXT_FIELD_BYTES,
                    })?;
            }
        }
    }

    Ok((raw, image))
}

/// Collect a field body. `None` means it grew past `limit`.
async fn read_field(mut field: Field, limit: usize) -> Result<Option<BytesMut>> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Ok(None);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Some(buf))
}

async fn read_text(field: Field) -> Result<String> {
    let name = field.name().unwrap_or_default().to_string();
    let data = read_field(field, MAX_TEXT_FIELD_BYTES)
        .await?
        .ok_or_else(|| AppError::FieldTooLarge {
            field: name.clone(),
            limit: MAX_TEXT_FIELD_BYTES,
        })?;
    String::from_utf8(data.to_vec())
        .map_err(|_| AppError::BadRequest(format!("field {name} is not valid UTF-8")))
}
