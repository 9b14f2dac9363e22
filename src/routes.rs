use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use include_dir::{Dir, include_dir};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use uuid::Uuid;

use crate::{
    client::GenerationService,
    models::{ImageUpload, StateSnapshot},
    preview::PreviewStore,
    render::render_page,
    view::{self, RoomDesignerView, SharedView, Submission},
};

static ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets");

#[derive(Clone)]
pub struct AppState {
    pub view: SharedView,
    pub previews: PreviewStore,
    pub service: Arc<dyn GenerationService>,
}

impl AppState {
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        let previews = PreviewStore::new();
        Self { view: RoomDesignerView::shared(previews.clone()), previews, service }
    }
}

#[derive(Debug, Deserialize)]
pub struct PromptForm {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub prompt: Option<String>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/image", post(upload_image).layer(DefaultBodyLimit::disable()))
        .route("/prompt", post(update_prompt))
        .route("/generate", post(generate))
        .route(
            "/preview/:id",
            // Served under the browser-declared type: never sniffed, never scripted.
            get(preview)
                .layer::<_, std::convert::Infallible>(SetResponseHeaderLayer::overriding(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")))
                .layer(SetResponseHeaderLayer::overriding(header::CONTENT_SECURITY_POLICY, HeaderValue::from_static("sandbox"))),
        )
        .route("/api/state", get(api_state))
        .route("/assets/*file", get(asset))
        .with_state(state)
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let presentation = state.view.read().presentation();
    Html(render_page(&presentation))
}

pub async fn upload_image(State(state): State<AppState>, mut multipart: Multipart) -> Result<Redirect, StatusCode> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Malformed multipart upload: {}", e);
        StatusCode::BAD_REQUEST
    })? {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let media_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read uploaded image: {}", e);
            StatusCode::BAD_REQUEST
        })?;
        upload = Some(ImageUpload::new(file_name, media_type.as_deref(), bytes));
        break;
    }

    // An empty file input still reaches the view so it can report the invalid selection.
    let upload = upload.unwrap_or_else(|| ImageUpload::new("", None, Vec::new()));
    let _ = state.view.write().select_image(upload);
    Ok(Redirect::to("/"))
}

pub async fn update_prompt(State(state): State<AppState>, Form(body): Form<PromptForm>) -> StatusCode {
    state.view.write().set_prompt(body.prompt);
    StatusCode::NO_CONTENT
}

pub async fn generate(State(state): State<AppState>, Form(body): Form<GenerateForm>) -> Redirect {
    let submission = {
        if let Some(prompt) = body.prompt {
            state.view.write().set_prompt(prompt);
        }
        view::begin(&state.view)
    };

    match submission {
        Submission::Started(flight) => {
            let service = state.service.clone();
            tokio::spawn(async move {
                let _ = flight.run(service.as_ref()).await;
            });
        }
        Submission::Rejected(e) => tracing::info!("Generation rejected: {}", e),
        Submission::Disabled => tracing::info!("Generation already in flight; ignoring press"),
    }
    Redirect::to("/")
}

pub async fn preview(Path(id): Path<Uuid>, State(state): State<AppState>) -> Response {
    match state.previews.get(id) {
        Some(image) => ([(header::CONTENT_TYPE, image.media_type)], image.bytes).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn api_state(State(state): State<AppState>) -> Json<StateSnapshot> {
    Json(state.view.read().snapshot())
}

pub async fn asset(Path(file): Path<String>) -> Response {
    let Some(entry) = ASSETS.get_file(&file) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let content_type = match file.rsplit_once('.').map(|(_, ext)| ext) {
        Some("css") => "text/css; charset=utf-8",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    };
    ([(header::CONTENT_TYPE, content_type)], entry.contents()).into_response()
}
