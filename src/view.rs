//! State and event handlers of the room designer page.
//!
//! All UI state lives in one [`RoomDesignerView`]. Browser events are applied
//! to it synchronously; the only suspension point is the generation request,
//! which runs with the lock released and settles through an [`InFlight`] guard.

use crate::{
    client::{ClientError, GenerationService},
    models::{GenerationRequest, ImageUpload, SelectedImage, StateSnapshot},
    preview::{PreviewRef, PreviewStore},
    render::Presentation,
};
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DesignerError {
    #[error("Please select a valid image file.")] InvalidFileType,
    #[error("Please upload an image and enter a prompt.")] MissingInput,
    #[error("Failed to generate image. Please ensure the backend server is running.")] RequestFailed,
}

/// Result of pressing the generate control.
#[derive(Debug)]
pub enum Submission<T> {
    Started(T),
    Rejected(DesignerError),
    /// A request is already in flight; the control is disabled.
    Disabled,
}

pub type SharedView = Arc<RwLock<RoomDesignerView>>;

#[derive(Debug)]
pub struct RoomDesignerView {
    previews: PreviewStore,
    selected_image: Option<SelectedImage>,
    preview: Option<PreviewRef>,
    prompt: String,
    output_image: Option<String>,
    is_loading: bool,
    error: Option<DesignerError>,
}

impl RoomDesignerView {
    pub fn new(previews: PreviewStore) -> Self {
        Self {
            previews,
            selected_image: None,
            preview: None,
            prompt: String::new(),
            output_image: None,
            is_loading: false,
            error: None,
        }
    }

    pub fn shared(previews: PreviewStore) -> SharedView {
        Arc::new(RwLock::new(Self::new(previews)))
    }

    pub fn selected_image(&self) -> Option<&SelectedImage> { self.selected_image.as_ref() }
    pub fn preview(&self) -> Option<PreviewRef> { self.preview }
    pub fn prompt(&self) -> &str { &self.prompt }
    pub fn output_image(&self) -> Option<&str> { self.output_image.as_deref() }
    pub fn is_loading(&self) -> bool { self.is_loading }
    pub fn error(&self) -> Option<DesignerError> { self.error }

    /// Applies a file-input change. Non-image files leave the current
    /// selection alone and only set the error.
    pub fn select_image(&mut self, upload: ImageUpload) -> Result<PreviewRef, DesignerError> {
        let media_type = match upload.media_type {
            Some(ref t) if upload.is_image() => t.clone(),
            _ => {
                warn!("⚠️ Rejected '{}' with media type {:?}", upload.file_name, upload.media_type);
                self.error = Some(DesignerError::InvalidFileType);
                return Err(DesignerError::InvalidFileType);
            }
        };

        let preview = self.previews.create(&media_type, upload.bytes.clone());
        if let Some(old) = self.preview.replace(preview) {
            self.previews.revoke(old);
        }
        info!("📷 Selected '{}' ({}, {} bytes)", upload.file_name, media_type, upload.bytes.len());
        self.selected_image = Some(SelectedImage {
            file_name: upload.file_name,
            media_type,
            bytes: upload.bytes,
        });
        self.output_image = None;
        self.error = None;
        Ok(preview)
    }

    pub fn set_prompt(&mut self, text: impl Into<String>) {
        self.prompt = text.into();
    }

    /// Synchronous half of a generation attempt.
    pub fn begin_generation(&mut self) -> Submission<GenerationRequest> {
        if self.is_loading {
            return Submission::Disabled;
        }
        let image = match &self.selected_image {
            Some(image) if !self.prompt.is_empty() => image.clone(),
            _ => {
                warn!("⚠️ Generate pressed without image and prompt");
                self.error = Some(DesignerError::MissingInput);
                return Submission::Rejected(DesignerError::MissingInput);
            }
        };

        self.is_loading = true;
        self.output_image = None;
        self.error = None;
        info!("🚀 Starting generation for '{}' with prompt: {}", image.file_name, self.prompt);
        Submission::Started(GenerationRequest {
            image,
            prompt: self.prompt.clone(),
            started_at: Utc::now(),
        })
    }

    /// Records the outcome of the attempt started by [`begin_generation`](Self::begin_generation).
    pub fn complete_generation(&mut self, outcome: Result<Option<String>, ClientError>) -> Result<Option<String>, DesignerError> {
        self.is_loading = false;
        match outcome {
            Ok(url) => {
                self.output_image = url.clone();
                Ok(url)
            }
            Err(e) => {
                error!("❌ Failed to generate image: {}", e);
                self.error = Some(DesignerError::RequestFailed);
                Err(DesignerError::RequestFailed)
            }
        }
    }

    pub fn presentation(&self) -> Presentation {
        Presentation {
            preview_url: self.preview.map(|p| p.url()),
            prompt: self.prompt.clone(),
            output_image: self.output_image.clone(),
            is_loading: self.is_loading,
            error: self.error.map(|e| e.to_string()),
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let p = self.presentation();
        StateSnapshot {
            preview_url: p.preview_url,
            prompt: p.prompt,
            output_image: p.output_image,
            is_loading: p.is_loading,
            error: p.error,
        }
    }
}

/// An attempt whose request has been handed out but not yet settled.
///
/// Dropping it unsettled (task aborted, service panicked) still clears the
/// loading flag, so the generate control never stays disabled because of it.
pub struct InFlight {
    view: SharedView,
    request: GenerationRequest,
    settled: bool,
}

impl InFlight {
    pub fn request(&self) -> &GenerationRequest { &self.request }

    pub async fn run(mut self, service: &dyn GenerationService) -> Result<Option<String>, DesignerError> {
        let outcome = service.generate(&self.request).await;
        let elapsed = Utc::now() - self.request.started_at;
        info!("⏱️ Generation settled after {} ms", elapsed.num_milliseconds());
        self.settled = true;
        self.view.write().complete_generation(outcome)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if !self.settled {
            warn!("⚠️ Generation dropped before settling");
            self.view.write().is_loading = false;
        }
    }
}

pub fn begin(view: &SharedView) -> Submission<InFlight> {
    let submission = view.write().begin_generation();
    match submission {
        Submission::Started(request) => Submission::Started(InFlight { view: view.clone(), request, settled: false }),
        Submission::Rejected(e) => Submission::Rejected(e),
        Submission::Disabled => Submission::Disabled,
    }
}

/// Runs one full attempt against `service`.
pub async fn generate(view: &SharedView, service: &dyn GenerationService) -> Submission<Result<Option<String>, DesignerError>> {
    match begin(view) {
        Submission::Started(flight) => Submission::Started(flight.run(service).await),
        Submission::Rejected(e) => Submission::Rejected(e),
        Submission::Disabled => Submission::Disabled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tokio::sync::oneshot;

    fn jpeg(name: &str) -> ImageUpload {
        ImageUpload::new(name, Some("image/jpeg"), b"\xff\xd8jpeg".to_vec())
    }

    fn ready_view() -> SharedView {
        let view = RoomDesignerView::shared(PreviewStore::new());
        view.write().select_image(jpeg("room.jpg")).unwrap();
        view.write().set_prompt("cozy cabin");
        view
    }

    /// Replays canned outcomes and records what it saw.
    struct Scripted {
        view: Option<SharedView>,
        outcomes: Mutex<Vec<Result<Option<String>, ClientError>>>,
        seen: Mutex<Vec<(String, String, bool)>>,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<Option<String>, ClientError>>) -> Self {
            Self { view: None, outcomes: Mutex::new(outcomes), seen: Mutex::new(Vec::new()) }
        }

        fn watching(mut self, view: &SharedView) -> Self {
            self.view = Some(view.clone());
            self
        }
    }

    #[async_trait]
    impl GenerationService for Scripted {
        async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, ClientError> {
            let loading = self.view.as_ref().is_some_and(|v| v.read().is_loading());
            self.seen.lock().push((request.image.file_name.clone(), request.prompt.clone(), loading));
            self.outcomes.lock().remove(0)
        }
    }

    #[test]
    fn non_image_file_is_rejected_without_touching_selection() {
        let mut view = RoomDesignerView::new(PreviewStore::new());
        let first = view.select_image(jpeg("room.jpg")).unwrap();

        let err = view.select_image(ImageUpload::new("notes.txt", Some("text/plain"), b"hi".to_vec()));
        assert_eq!(err, Err(DesignerError::InvalidFileType));
        assert_eq!(view.selected_image().map(|i| i.file_name.as_str()), Some("room.jpg"));
        assert_eq!(view.preview(), Some(first));
        assert_eq!(view.error().map(|e| e.to_string()), Some("Please select a valid image file.".to_string()));
    }

    #[test]
    fn missing_media_type_counts_as_invalid() {
        let mut view = RoomDesignerView::new(PreviewStore::new());
        assert_eq!(view.select_image(ImageUpload::new("blob", None, Vec::new())), Err(DesignerError::InvalidFileType));
        assert!(view.selected_image().is_none());
        assert!(view.preview().is_none());
    }

    #[test]
    fn image_selection_clears_output_and_error_and_revokes_old_preview() {
        let previews = PreviewStore::new();
        let mut view = RoomDesignerView::new(previews.clone());
        let first = view.select_image(jpeg("a.jpg")).unwrap();
        view.complete_generation(Ok(Some("https://x/old.png".into()))).unwrap();
        let _ = view.select_image(ImageUpload::new("bad.pdf", Some("application/pdf"), Vec::new()));
        assert!(view.error().is_some());

        let second = view.select_image(ImageUpload::new("b.png", Some("image/png"), b"png".to_vec())).unwrap();
        assert_ne!(first, second);
        assert_eq!(view.output_image(), None);
        assert_eq!(view.error(), None);
        assert!(previews.get(first.id()).is_none());
        assert_eq!(previews.len(), 1);
        assert_eq!(view.selected_image().map(|i| i.media_type.as_str()), Some("image/png"));
    }

    #[test]
    fn prompt_is_stored_verbatim() {
        let mut view = RoomDesignerView::new(PreviewStore::new());
        view.set_prompt("  Mid-century <modern>\n");
        assert_eq!(view.prompt(), "  Mid-century <modern>\n");
        view.set_prompt("");
        assert_eq!(view.prompt(), "");
    }

    #[test]
    fn begin_without_inputs_is_rejected() {
        let mut view = RoomDesignerView::new(PreviewStore::new());
        assert!(matches!(view.begin_generation(), Submission::Rejected(DesignerError::MissingInput)));
        assert!(!view.is_loading());
        assert_eq!(view.error().map(|e| e.to_string()), Some("Please upload an image and enter a prompt.".to_string()));

        view.select_image(jpeg("room.jpg")).unwrap();
        assert!(matches!(view.begin_generation(), Submission::Rejected(DesignerError::MissingInput)));

        let mut prompt_only = RoomDesignerView::new(PreviewStore::new());
        prompt_only.set_prompt("cozy cabin");
        assert!(matches!(prompt_only.begin_generation(), Submission::Rejected(DesignerError::MissingInput)));
    }

    #[test]
    fn whitespace_prompt_is_accepted() {
        let mut view = RoomDesignerView::new(PreviewStore::new());
        view.select_image(jpeg("room.jpg")).unwrap();
        view.set_prompt(" ");
        assert!(matches!(view.begin_generation(), Submission::Started(_)));
    }

    #[test]
    fn begin_sets_loading_clears_state_and_disables_control() {
        let mut view = RoomDesignerView::new(PreviewStore::new());
        view.select_image(jpeg("room.jpg")).unwrap();
        view.set_prompt("cozy cabin");
        view.complete_generation(Ok(Some("https://x/old.png".into()))).unwrap();

        let Submission::Started(request) = view.begin_generation() else { panic!("expected start") };
        assert_eq!(request.prompt, "cozy cabin");
        assert_eq!(request.image.file_name, "room.jpg");
        assert!(view.is_loading());
        assert_eq!(view.output_image(), None);
        assert_eq!(view.error(), None);

        assert!(matches!(view.begin_generation(), Submission::Disabled));
        assert!(view.is_loading());
    }

    #[tokio::test]
    async fn successful_generation_stores_image_reference() {
        let view = ready_view();
        let service = Scripted::new(vec![Ok(Some("https://x/out.png".into()))]).watching(&view);

        let outcome = generate(&view, &service).await;
        assert!(matches!(outcome, Submission::Started(Ok(Some(ref url))) if url == "https://x/out.png"));

        let v = view.read();
        assert_eq!(v.output_image(), Some("https://x/out.png"));
        assert_eq!(v.error(), None);
        assert!(!v.is_loading());
        assert_eq!(*service.seen.lock(), vec![("room.jpg".to_string(), "cozy cabin".to_string(), true)]);
    }

    #[tokio::test]
    async fn success_without_reference_leaves_output_empty_and_no_error() {
        let view = ready_view();
        view.write().complete_generation(Ok(Some("https://x/old.png".into()))).unwrap();
        let service = Scripted::new(vec![Ok(None)]);

        let outcome = generate(&view, &service).await;
        assert!(matches!(outcome, Submission::Started(Ok(None))));

        let v = view.read();
        assert_eq!(v.output_image(), None);
        assert_eq!(v.error(), None);
        assert!(!v.is_loading());
    }

    #[tokio::test]
    async fn failed_generation_sets_fixed_message() {
        let view = ready_view();
        let service = Scripted::new(vec![
            Err(ClientError::Status { status: 500, body: "boom".into() }),
            Err(ClientError::Http("connection refused".into())),
            Err(ClientError::Parse("expected value".into())),
        ]);

        for _ in 0..3 {
            let outcome = generate(&view, &service).await;
            assert!(matches!(outcome, Submission::Started(Err(DesignerError::RequestFailed))));
            let v = view.read();
            assert_eq!(v.output_image(), None);
            assert!(!v.is_loading());
            assert_eq!(
                v.error().map(|e| e.to_string()),
                Some("Failed to generate image. Please ensure the backend server is running.".to_string())
            );
        }
    }

    #[tokio::test]
    async fn repeated_attempts_leave_no_residue() {
        let view = ready_view();
        let service = Scripted::new(vec![
            Err(ClientError::Http("down".into())),
            Ok(Some("https://x/1.png".into())),
            Err(ClientError::Http("down".into())),
        ]);

        generate(&view, &service).await;
        assert!(view.read().error().is_some());

        generate(&view, &service).await;
        assert_eq!(view.read().output_image(), Some("https://x/1.png"));
        assert_eq!(view.read().error(), None);

        generate(&view, &service).await;
        assert_eq!(view.read().output_image(), None);
        assert_eq!(view.read().error(), Some(DesignerError::RequestFailed));
    }

    struct Gate(Mutex<Option<oneshot::Receiver<Result<Option<String>, ClientError>>>>);

    #[async_trait]
    impl GenerationService for Gate {
        async fn generate(&self, _request: &GenerationRequest) -> Result<Option<String>, ClientError> {
            let rx = self.0.lock().take().expect("gate used once");
            rx.await.unwrap_or_else(|_| Err(ClientError::Http("gate closed".into())))
        }
    }

    #[tokio::test]
    async fn second_press_is_ignored_while_in_flight() {
        let view = ready_view();
        let (tx, rx) = oneshot::channel();
        let service = Arc::new(Gate(Mutex::new(Some(rx))));

        let task = {
            let (view, service) = (view.clone(), service.clone());
            tokio::spawn(async move { generate(&view, service.as_ref()).await })
        };
        while !view.read().is_loading() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(begin(&view), Submission::Disabled));
        view.write().set_prompt("still typing");
        assert!(view.read().is_loading());

        tx.send(Ok(Some("https://x/late.png".into()))).unwrap();
        let outcome = task.await.unwrap();
        assert!(matches!(outcome, Submission::Started(Ok(_))));
        assert!(!view.read().is_loading());
        assert_eq!(view.read().prompt(), "still typing");
    }

    #[tokio::test]
    async fn aborted_attempt_still_clears_loading() {
        let view = ready_view();
        let (_tx, rx) = oneshot::channel();
        let service = Arc::new(Gate(Mutex::new(Some(rx))));

        let task = {
            let (view, service) = (view.clone(), service.clone());
            tokio::spawn(async move { generate(&view, service.as_ref()).await })
        };
        while !view.read().is_loading() {
            tokio::task::yield_now().await;
        }

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!view.read().is_loading());
        assert_eq!(view.read().output_image(), None);
    }

    #[test]
    fn snapshot_mirrors_state() {
        let view = ready_view();
        let snap = view.read().snapshot();
        assert_eq!(snap.prompt, "cozy cabin");
        assert!(snap.preview_url.as_deref().is_some_and(|u| u.starts_with("/preview/")));
        assert_eq!(snap.output_image, None);
        assert!(!snap.is_loading);
        assert_eq!(snap.error, None);
    }
}
