use actix_web::{web, HttpResponse};
use log::info;

use crate::{
    error::Result,
    models::{GenerationType, ImageResponse, SessionQuery, SkipResponse, StepAdvance, StepResponse},
    services::{BackendKind, ImageGenerator, SessionStore},
};

pub fn steps_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/step/next").route(web::post().to(next_step)))
        .service(web::resource("/step/skip").route(web::post().to(skip_to_alternatives)))
        .service(web::resource("/step/image").route(web::post().to(local_step_image)))
        .service(web::resource("/step/gemini_image").route(web::post().to(gemini_step_image)));
}

/// Move the cursor forward and return the step it lands on.
pub async fn next_step(
    query: web::Query<SessionQuery>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse> {
    let (advance, tips) = sessions
        .modify(&query.session_id, |s| (s.advance(), s.tips.clone()))
        .await?;

    let response = match advance? {
        StepAdvance::Step {
            number,
            text,
            total,
        } => StepResponse {
            step: Some(text),
            step_number: number,
            total_steps: total,
            completed: false,
            message: "Success".to_string(),
            tips: None,
        },
        StepAdvance::Completed { total } => StepResponse {
            step: None,
            step_number: total,
            total_steps: total,
            completed: true,
            message: "All steps completed!".to_string(),
            tips: Some(tips),
        },
    };

    Ok(HttpResponse::Ok().json(response))
}

pub async fn skip_to_alternatives(
    query: web::Query<SessionQuery>,
    sessions: web::Data<SessionStore>,
) -> Result<HttpResponse> {
    let tips = sessions
        .modify(&query.session_id, |s| {
            s.skip();
            s.tips.clone()
        })
        .await?;

    Ok(HttpResponse::Ok().json(SkipResponse {
        message: "Skipped to ingredient alternatives section".to_string(),
        success: true,
        tips,
    }))
}

pub async fn local_step_image(
    query: web::Query<SessionQuery>,
    sessions: web::Data<SessionStore>,
    images: web::Data<ImageGenerator>,
) -> Result<HttpResponse> {
    step_image(&query.session_id, &sessions, &images, BackendKind::StableDiffusion).await
}

pub async fn gemini_step_image(
    query: web::Query<SessionQuery>,
    sessions: web::Data<SessionStore>,
    images: web::Data<ImageGenerator>,
) -> Result<HttpResponse> {
    step_image(&query.session_id, &sessions, &images, BackendKind::Gemini).await
}

async fn step_image(
    session_id: &str,
    sessions: &SessionStore,
    images: &ImageGenerator,
    kind: BackendKind,
) -> Result<HttpResponse> {
    let session = sessions.get(session_id).await?;
    let (step_number, step) = session.image_step()?;
    let recipe_name = session.current_recipe.clone().unwrap_or_default();

    let generated = images.generate(&recipe_name, step, kind).await?;

    let prompt = generated.prompt.clone();
    sessions
        .modify(session_id, move |s| s.mark_image(step_number, &prompt))
        .await?;

    let generation_type = match (&generated.image_base64, kind) {
        (None, _) => GenerationType::TextOnly,
        (Some(_), BackendKind::Gemini) => GenerationType::Gemini,
        (Some(_), BackendKind::StableDiffusion) => GenerationType::StableDiffusion,
    };
    info!("🖼️ Step {} image: {:?}", step_number, generation_type);

    Ok(HttpResponse::Ok().json(ImageResponse {
        image_data: generated.image_base64,
        description: generated.prompt,
        success: true,
        generation_type,
    }))
}
