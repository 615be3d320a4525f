// src/handlers.rs
use crate::services::image_encoder::resolve_image_mime;
use crate::{AppState, errors::StyleError, models::*};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use base64::{Engine as _, engine::general_purpose};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/sessions", web::post().to(create_session))
            .route("/sessions/{session_id}", web::delete().to(close_session))
            .route("/sessions/{session_id}/tab", web::put().to(select_tab))
            .route("/sessions/{session_id}/try-on", web::get().to(try_on_state))
            .route(
                "/sessions/{session_id}/try-on/images/{slot}",
                web::post().to(select_image),
            )
            .route(
                "/sessions/{session_id}/try-on/compose",
                web::post().to(compose_try_on),
            )
            .route("/sessions/{session_id}/try-on/edit", web::post().to(edit_image))
            .route(
                "/sessions/{session_id}/try-on/image",
                web::get().to(generated_image),
            )
            .route("/sessions/{session_id}/advisor", web::get().to(advisor_state))
            .route(
                "/sessions/{session_id}/advisor/messages",
                web::post().to(send_message),
            )
            .route(
                "/sessions/{session_id}/advisor/input",
                web::put().to(save_draft),
            ),
    );
}

pub async fn create_session(data: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let session = data.sessions.create().await;
    Ok(HttpResponse::Created().json(session.summary().await))
}

pub async fn close_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.sessions.remove(&path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn select_tab(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<TabRequest>,
) -> Result<HttpResponse, Error> {
    let session = data.sessions.get(&path.into_inner()).await?;
    session.set_active_tab(body.tab).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "session": session.summary().await,
        "label": body.tab.label()
    })))
}

pub async fn try_on_state(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = data.sessions.get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(session.try_on.snapshot().await))
}

pub async fn select_image(
    path: web::Path<(Uuid, ImageSlot)>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let (session_id, slot) = path.into_inner();
    let session = data.sessions.get(&session_id).await?;

    let mut field = payload
        .try_next()
        .await?
        .ok_or_else(|| StyleError::Validation("No file provided".to_string()))?;

    let filename = field
        .content_disposition()
        .get_filename()
        .unwrap_or("upload")
        .to_string();
    let declared_type = field.content_type().map(|ct| ct.to_string());

    let mut image_data = BytesMut::new();
    while let Some(chunk) = field.try_next().await? {
        if image_data.len() + chunk.len() > data.max_upload_bytes {
            return Err(StyleError::PayloadTooLarge(data.max_upload_bytes).into());
        }
        image_data.extend_from_slice(&chunk);
    }

    match resolve_image_mime(declared_type.as_deref(), &image_data) {
        Ok(mime_type) => {
            let image = SelectedImage::new(filename, mime_type, image_data.freeze());
            session.try_on.select_image(slot, Some(image)).await;
            Ok(HttpResponse::Ok().json(session.try_on.snapshot().await))
        }
        Err(e) => {
            session.try_on.select_image(slot, None).await;
            Err(e.into())
        }
    }
}

/// Starts a composition in the background (202), or with `?wait=true` runs it
/// to completion and returns the final state (200). 409 when the guard rejects.
pub async fn compose_try_on(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    options: web::Query<RunOptions>,
) -> Result<HttpResponse, Error> {
    let session = data.sessions.get(&path.into_inner()).await?;

    if options.wait {
        let accepted = session.try_on.compose().await;
        return Ok(finished(accepted, session.try_on.snapshot().await));
    }

    match session.try_on.begin_compose().await {
        Some(job) => {
            let try_on = session.try_on.clone();
            actix_web::rt::spawn(async move { try_on.run_compose(job).await });
            Ok(HttpResponse::Accepted().json(session.try_on.snapshot().await))
        }
        None => Ok(HttpResponse::Conflict().json(session.try_on.snapshot().await)),
    }
}

pub async fn edit_image(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<EditRequest>,
    options: web::Query<RunOptions>,
) -> Result<HttpResponse, Error> {
    if body.instruction.trim().is_empty() {
        return Err(StyleError::Validation("Edit instruction is empty".to_string()).into());
    }
    let session = data.sessions.get(&path.into_inner()).await?;

    if options.wait {
        let accepted = session.try_on.edit(&body.instruction).await;
        return Ok(finished(accepted, session.try_on.snapshot().await));
    }

    match session.try_on.begin_edit(&body.instruction).await {
        Some(job) => {
            let try_on = session.try_on.clone();
            actix_web::rt::spawn(async move { try_on.run_edit(job).await });
            Ok(HttpResponse::Accepted().json(session.try_on.snapshot().await))
        }
        None => Ok(HttpResponse::Conflict().json(session.try_on.snapshot().await)),
    }
}

fn finished(accepted: bool, snapshot: TryOnSnapshot) -> HttpResponse {
    if accepted {
        HttpResponse::Ok().json(snapshot)
    } else {
        HttpResponse::Conflict().json(snapshot)
    }
}

pub async fn generated_image(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = data.sessions.get(&path.into_inner()).await?;

    let Some(image) = session.try_on.generated_image().await else {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "Not found",
            "message": "No image has been generated yet"
        })));
    };

    let bytes = general_purpose::STANDARD
        .decode(&image.data)
        .map_err(|e| StyleError::Upstream(format!("Failed to decode image: {}", e)))?;

    Ok(HttpResponse::Ok().content_type(image.mime_type).body(bytes))
}

pub async fn advisor_state(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = data.sessions.get(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(session.advisor.snapshot().await))
}

pub async fn save_draft(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<AdviceRequest>,
) -> Result<HttpResponse, Error> {
    let session = data.sessions.get(&path.into_inner()).await?;
    session.advisor.set_input(&body.text).await;
    Ok(HttpResponse::Ok().json(session.advisor.snapshot().await))
}

pub async fn send_message(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
    body: web::Json<AdviceRequest>,
) -> Result<HttpResponse, Error> {
    if body.text.trim().is_empty() {
        return Err(StyleError::Validation("Message is empty".to_string()).into());
    }
    let session = data.sessions.get(&path.into_inner()).await?;

    let accepted = session.advisor.send(&body.text).await;
    let snapshot = session.advisor.snapshot().await;
    if accepted {
        Ok(HttpResponse::Ok().json(snapshot))
    } else {
        Ok(HttpResponse::Conflict().json(snapshot))
    }
}
