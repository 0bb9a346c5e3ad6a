//! The HTTP shell: server-rendered showcase and style pages plus JSON
//! endpoints. Composition only; the carousel and the pipeline own all state.

use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::WebOptions;
use crate::events::{SelectCar, ShowcaseState};
use crate::images::ImageLibrary;
use crate::suggest::{
    ANIMATION_STYLE_OPTIONS, CAR_BRAND_OPTIONS, COLOR_SCHEME_OPTIONS, FieldError, FormField,
    PreferenceForm, REQUEST_FAILED_MESSAGE, SubmitError, SuggestionPipeline, SuggestionResult,
};

#[derive(Clone)]
pub struct AppState {
    catalog: Arc<Catalog>,
    images: Arc<ImageLibrary>,
    select_tx: mpsc::Sender<SelectCar>,
    showcase: watch::Receiver<ShowcaseState>,
    accent: watch::Receiver<String>,
    pipeline: Arc<Mutex<SuggestionPipeline>>,
}

impl AppState {
    pub fn new(
        catalog: Arc<Catalog>,
        images: Arc<ImageLibrary>,
        select_tx: mpsc::Sender<SelectCar>,
        showcase: watch::Receiver<ShowcaseState>,
        accent: watch::Receiver<String>,
        pipeline: Arc<Mutex<SuggestionPipeline>>,
    ) -> Self {
        Self {
            catalog,
            images,
            select_tx,
            showcase,
            accent,
            pipeline,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(showcase_page))
        .route("/select", post(handle_select))
        .route("/style", get(style_page).post(handle_style_submit))
        .route("/style/reset", post(handle_style_reset))
        .route("/showcase.json", get(showcase_json))
        .route("/cars.json", get(cars_json))
        .route("/suggestions.json", post(suggestions_json))
        .with_state(state)
}

pub async fn serve(state: AppState, options: &WebOptions, cancel: CancellationToken) -> Result<()> {
    let addr = SocketAddr::new(options.bind_address.parse()?, options.port);
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind web listener on {addr}"))?;
    info!(?addr, "web server listening");

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("web server exited")?;
    Ok(())
}

async fn showcase_page(State(state): State<AppState>) -> Html<String> {
    let showcase = *state.showcase.borrow();
    let accent = state.accent.borrow().clone();

    let mut hero = String::new();
    if let Some(car) = state.catalog.get(showcase.displayed_index) {
        let image_tag = state
            .images
            .resolve(car)
            .map(|asset| {
                format!(
                    "<img class='hero-image' src='{}' alt='{}'>",
                    asset.url,
                    escape_html(&asset.description)
                )
            })
            .unwrap_or_default();
        let _ = write!(
            hero,
            "<section class='hero'><div class='hero-copy'><h1>{} <span class='accent'>{}</span></h1><p>{}</p><a class='cta' href='#'>Discover More</a></div>{}</section>",
            escape_html(&car.brand),
            escape_html(&car.name),
            escape_html(&car.description),
            image_tag
        );
    }

    let mut thumbs = String::new();
    for (index, car) in state.catalog.items().iter().enumerate() {
        // Items without a resolvable image are skipped, not rendered broken.
        let Some(asset) = state.images.resolve(car) else {
            continue;
        };
        let class = if index == showcase.active_index {
            "thumb active"
        } else {
            "thumb"
        };
        let _ = write!(
            thumbs,
            "<form method='post' action='/select'><input type='hidden' name='index' value='{index}'><button type='submit' class='{class}'><img src='{}' alt='{}'></button></form>",
            asset.url,
            escape_html(&asset.description)
        );
    }

    let body = format!(
        "<!doctype html><html lang='en'><head><meta charset='utf-8'><meta name='viewport' content='width=device-width,initial-scale=1'>\
<title>CARZONA</title><style>{}</style></head><body style=\"background:radial-gradient(circle at 50% 65%, {}20 0%, #0b0f14 50%)\"><main>{}{}<nav class='thumbs'>{}</nav><p class='style-link'><a href='/style'>AI Style Suggestions</a></p></main></body></html>",
        styles(),
        accent,
        header(),
        hero,
        thumbs
    );
    Html(body)
}

#[derive(Deserialize)]
struct SelectForm {
    index: usize,
}

async fn handle_select(State(state): State<AppState>, Form(form): Form<SelectForm>) -> Response {
    if form.index >= state.catalog.len() {
        return (StatusCode::BAD_REQUEST, "no such car").into_response();
    }
    if state.select_tx.send(SelectCar(form.index)).await.is_err() {
        warn!("showcase task gone, dropping selection");
        return (StatusCode::SERVICE_UNAVAILABLE, "showcase unavailable").into_response();
    }
    Redirect::to("/").into_response()
}

async fn style_page(State(state): State<AppState>) -> Html<String> {
    let Ok(pipeline) = state.pipeline.try_lock() else {
        return Html(busy_page());
    };
    match pipeline.result() {
        Some(result) => Html(style_result_page(result)),
        None => Html(style_form_page(pipeline.form(), &[], None)),
    }
}

async fn handle_style_submit(
    State(state): State<AppState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let form = preference_form_from_pairs(&pairs);
    let Ok(mut pipeline) = state.pipeline.try_lock() else {
        return (StatusCode::CONFLICT, Html(busy_page())).into_response();
    };
    match pipeline.submit(form.clone()).await {
        Ok(result) => Html(style_result_page(&result)).into_response(),
        Err(SubmitError::Validation(errors)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(style_form_page(&form, &errors, None)),
        )
            .into_response(),
        Err(SubmitError::Request) => (
            StatusCode::BAD_GATEWAY,
            Html(style_form_page(&form, &[], Some(REQUEST_FAILED_MESSAGE))),
        )
            .into_response(),
    }
}

async fn handle_style_reset(State(state): State<AppState>) -> Redirect {
    state.pipeline.lock().await.reset();
    Redirect::to("/style")
}

async fn showcase_json(State(state): State<AppState>) -> Json<serde_json::Value> {
    let showcase = *state.showcase.borrow();
    let accent = state.accent.borrow().clone();
    Json(json!({
        "activeIndex": showcase.active_index,
        "displayedIndex": showcase.displayed_index,
        "transitioning": showcase.transitioning,
        "accentColor": accent,
    }))
}

async fn cars_json(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cars: Vec<serde_json::Value> = state
        .catalog
        .items()
        .iter()
        .filter_map(|car| {
            let asset = state.images.resolve(car)?;
            Some(json!({
                "id": car.id,
                "name": car.name,
                "brand": car.brand,
                "description": car.description,
                "accentColor": car.accent_color,
                "image": asset,
            }))
        })
        .collect();
    Json(json!({ "cars": cars }))
}

async fn suggestions_json(
    State(state): State<AppState>,
    Json(form): Json<PreferenceForm>,
) -> Response {
    let Ok(mut pipeline) = state.pipeline.try_lock() else {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "error": "A suggestion request is already in progress." })),
        )
            .into_response();
    };
    match pipeline.submit(form).await {
        Ok(result) => Json(result).into_response(),
        Err(SubmitError::Validation(errors)) => {
            let errors: Vec<serde_json::Value> = errors
                .iter()
                .map(|e| json!({ "field": e.field.name(), "message": e.message() }))
                .collect();
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response()
        }
        Err(SubmitError::Request) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": REQUEST_FAILED_MESSAGE })),
        )
            .into_response(),
    }
}

/// Fold raw urlencoded pairs into a preference form. Checkbox groups repeat
/// the same key once per ticked option.
fn preference_form_from_pairs(pairs: &[(String, String)]) -> PreferenceForm {
    let mut form = PreferenceForm::default();
    for (key, value) in pairs {
        match key.as_str() {
            "preferredCarBrands" => form.preferred_car_brands.push(value.clone()),
            "preferredColorSchemes" => form.preferred_color_schemes.push(value.clone()),
            "preferredAnimationStyles" => form.preferred_animation_styles.push(value.clone()),
            "userDescription" => form.user_description = value.clone(),
            _ => {}
        }
    }
    form
}

fn header() -> &'static str {
    "<header><a class='wordmark' href='/'>CARZONA</a><nav><a href='/'>Home</a><a href='#'>Brands</a><a href='#'>Cars</a><a href='#'>About</a></nav></header>"
}

fn checkbox_group(
    out: &mut String,
    label: &str,
    field: FormField,
    options: &[&str],
    selected: &[String],
    errors: &[FieldError],
) {
    let _ = write!(out, "<fieldset><legend>{label}</legend>");
    for option in options {
        let checked = if selected.iter().any(|s| s.as_str() == *option) {
            " checked"
        } else {
            ""
        };
        let _ = write!(
            out,
            "<label><input type='checkbox' name='{}' value='{option}'{checked}> {option}</label>",
            field.name()
        );
    }
    if let Some(error) = errors.iter().find(|e| e.field == field) {
        let _ = write!(out, "<p class='field-error'>{}</p>", error.message());
    }
    let _ = write!(out, "</fieldset>");
}

fn style_form_page(form: &PreferenceForm, errors: &[FieldError], banner: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(message) = banner {
        let _ = write!(body, "<div class='banner error'>{message}</div>");
    }
    let _ = write!(
        body,
        "<section class='panel'><h1>AI Style Suggestor</h1><p>Tell us your preferences, and our AI will generate a unique visual style for your car showcase.</p><form method='post' action='/style'>"
    );
    checkbox_group(
        &mut body,
        "Preferred Car Brands",
        FormField::CarBrands,
        CAR_BRAND_OPTIONS,
        &form.preferred_car_brands,
        errors,
    );
    checkbox_group(
        &mut body,
        "Preferred Color Schemes",
        FormField::ColorSchemes,
        COLOR_SCHEME_OPTIONS,
        &form.preferred_color_schemes,
        errors,
    );
    checkbox_group(
        &mut body,
        "Preferred Animation Styles",
        FormField::AnimationStyles,
        ANIMATION_STYLE_OPTIONS,
        &form.preferred_animation_styles,
        errors,
    );
    let _ = write!(
        body,
        "<fieldset><legend>Describe your style</legend><textarea name='userDescription' rows='4' placeholder='e.g., I like clean, futuristic designs with a bit of a retro vibe...'>{}</textarea>",
        escape_html(&form.user_description)
    );
    if let Some(error) = errors.iter().find(|e| e.field == FormField::Description) {
        let _ = write!(body, "<p class='field-error'>{}</p>", error.message());
    }
    let _ = write!(
        body,
        "</fieldset><button type='submit' class='cta'>Generate Suggestions</button></form><p class='back'><a href='/'>Back to showcase</a></p></section>"
    );
    page("AI Style Suggestor", &body)
}

fn style_result_page(result: &SuggestionResult) -> String {
    let mut body = String::new();
    let _ = write!(
        body,
        "<section class='panel'><h1>Your Personalized Suggestions</h1><blockquote>{}</blockquote>",
        escape_html(&result.reasoning)
    );
    for (title, entries) in [
        ("Suggested Animations", &result.suggested_animations),
        ("Suggested Backgrounds", &result.suggested_background_images),
        (
            "Suggested Interactive Elements",
            &result.suggested_interactive_elements,
        ),
    ] {
        let _ = write!(body, "<h2>{title}</h2><ul>");
        for entry in entries {
            let _ = write!(body, "<li>{}</li>", escape_html(entry));
        }
        let _ = write!(body, "</ul>");
    }
    let _ = write!(
        body,
        "<form method='post' action='/style/reset'><button type='submit' class='cta'>Start Over</button></form><p class='back'><a href='/'>Back to showcase</a></p></section>"
    );
    page("Your Personalized Suggestions", &body)
}

fn busy_page() -> String {
    page(
        "Generating…",
        "<section class='panel'><h1>Generating…</h1><p>A suggestion request is already in progress. This page will have the result shortly.</p><p class='back'><a href='/style'>Refresh</a></p></section>",
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html lang='en'><head><meta charset='utf-8'><meta name='viewport' content='width=device-width,initial-scale=1'><title>{title} · CARZONA</title><style>{}</style></head><body><main>{}{body}</main></body></html>",
        styles(),
        header()
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn styles() -> &'static str {
    "body{font-family:'Inter',system-ui,sans-serif;margin:0;background:#0b0f14;color:#f7f9fb;}main{max-width:960px;margin:0 auto;padding:2rem 1.5rem;}header{display:flex;align-items:center;justify-content:space-between;padding-bottom:2rem;}a.wordmark{font-size:1.8rem;font-weight:800;color:#f7f9fb;text-decoration:none;letter-spacing:0.1em;}header nav a{color:#aab4c0;text-decoration:none;margin-left:1.2rem;font-size:0.95rem;}header nav a:hover{color:#f7f9fb;}section.hero{display:flex;gap:2rem;align-items:center;}div.hero-copy h1{font-size:2.6rem;margin:0 0 1rem;}h1 .accent{color:#4cc9f0;}div.hero-copy p{line-height:1.6;color:#cfd8e3;max-width:28rem;}img.hero-image{max-width:46%;border-radius:18px;}a.cta,button.cta{display:inline-block;margin-top:1rem;padding:0.8rem 1.4rem;border:none;border-radius:14px;font-size:1rem;font-weight:700;background:linear-gradient(135deg,#4cc9f0,#4361ee);color:#fff;cursor:pointer;text-decoration:none;}nav.thumbs{display:flex;gap:0.8rem;margin-top:2.5rem;}nav.thumbs form{margin:0;}button.thumb{padding:0;border:2px solid transparent;border-radius:10px;background:none;cursor:pointer;overflow:hidden;width:7rem;height:5rem;}button.thumb img{width:100%;height:100%;object-fit:cover;display:block;opacity:0.55;}button.thumb.active{border-color:#4cc9f0;}button.thumb.active img{opacity:1;}p.style-link{margin-top:2rem;}p.style-link a{color:#4cc9f0;text-decoration:none;font-weight:600;}section.panel{background:#121a24;padding:2rem;border-radius:18px;box-shadow:0 20px 45px rgba(0,0,0,0.25);}section.panel fieldset{border:none;margin:0 0 1.2rem;padding:0;}section.panel legend{font-weight:700;margin-bottom:0.5rem;}section.panel label{display:block;margin:0.3rem 0;color:#cfd8e3;}section.panel textarea{width:100%;border-radius:12px;border:none;background:#0b0f14;color:#f7f9fb;padding:0.75rem;font-size:1rem;}p.field-error{color:#ef476f;font-size:0.9rem;margin:0.3rem 0 0;}div.banner.error{background:#2b121d;border:1px solid #ef476f;border-radius:12px;padding:0.8rem 1rem;margin-bottom:1.2rem;}blockquote{font-style:italic;color:#cfd8e3;border-left:3px solid #4cc9f0;margin:0 0 1rem;padding-left:1rem;}p.back a{color:#4cc9f0;text-decoration:none;font-weight:600;}"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_repeated_checkbox_keys() {
        let pairs = vec![
            ("preferredCarBrands".to_string(), "Sports".to_string()),
            ("preferredCarBrands".to_string(), "Electric".to_string()),
            (
                "preferredColorSchemes".to_string(),
                "Dark & Moody".to_string(),
            ),
            (
                "preferredAnimationStyles".to_string(),
                "Minimalistic".to_string(),
            ),
            (
                "userDescription".to_string(),
                "Futuristic neon-lit aesthetic".to_string(),
            ),
            ("unknown".to_string(), "ignored".to_string()),
        ];
        let form = preference_form_from_pairs(&pairs);
        assert_eq!(form.preferred_car_brands, vec!["Sports", "Electric"]);
        assert_eq!(form.preferred_color_schemes, vec!["Dark & Moody"]);
        assert_eq!(form.preferred_animation_styles, vec!["Minimalistic"]);
        assert_eq!(form.user_description, "Futuristic neon-lit aesthetic");
    }

    #[test]
    fn escapes_markup_in_user_text() {
        assert_eq!(
            escape_html("<b>&'\"</b>"),
            "&lt;b&gt;&amp;&#39;&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn form_page_marks_failing_fields_inline() {
        let form = PreferenceForm::default();
        let errors = vec![FieldError::new(FormField::CarBrands)];
        let html = style_form_page(&form, &errors, None);
        assert!(html.contains("You have to select at least one car brand."));
        assert!(!html.contains("You have to select at least one color scheme."));
    }
}
