use actix_web::{web, HttpResponse};

use crate::{
    error::Result,
    models::{MessageResponse, SessionHistoryResponse, SessionInfo},
    services::SessionStore,
};

pub fn sessions_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/session/{session_id}")
            .route(web::get().to(get_session))
            .route(web::delete().to(delete_session)),
    )
    .service(web::resource("/session/{session_id}/history").route(web::get().to(get_history)))
    .service(web::resource("/history/{session_id}").route(web::get().to(get_history)));
}

pub async fn get_session(
    session_id: web::Path<String>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse> {
    let session = sessions.get(&session_id).await?;
    Ok(HttpResponse::Ok().json(SessionInfo::from_session(&session_id, &session)))
}

/// Every step reached so far, oldest first.
pub async fn get_history(
    session_id: web::Path<String>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse> {
    let session = sessions.get(&session_id).await?;
    let history = session.recipe_history;

    Ok(HttpResponse::Ok().json(SessionHistoryResponse {
        session_id: session_id.into_inner(),
        total_completed_steps: history.len(),
        history,
        success: true,
    }))
}

pub async fn delete_session(
    session_id: web::Path<String>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse> {
    sessions.delete(&session_id).await?;
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Session deleted successfully".to_string(),
        success: true,
    }))
}
