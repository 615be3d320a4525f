// src/flows/try_on.rs
use crate::flows::status::{
    COMPOSE_INTERVAL, COMPOSE_MESSAGES, EDIT_INTERVAL, EDIT_MESSAGES, StatusCycle, StatusTicker,
};
use crate::models::{EncodedImagePart, ImageSlot, SelectedImage, TryOnPhase, TryOnSnapshot};
use crate::services::StyleService;
use crate::services::image_encoder::encode_selected;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

struct TryOnState {
    phase: TryOnPhase,
    model_image: Option<SelectedImage>,
    clothing_image: Option<SelectedImage>,
    generated: Option<EncodedImagePart>,
    edit_prompt: String,
    error: Option<String>,
    status: Option<StatusCycle>,
    ticker: StatusTicker,
    disposed: bool,
}

impl TryOnState {
    fn new() -> Self {
        Self {
            phase: TryOnPhase::Idle,
            model_image: None,
            clothing_image: None,
            generated: None,
            edit_prompt: String::new(),
            error: None,
            status: None,
            ticker: StatusTicker::default(),
            disposed: false,
        }
    }

    fn stop_status(&mut self) {
        self.ticker.stop();
        self.status = None;
    }
}

/// Inputs captured when a composition starts.
pub struct ComposeJob {
    model: SelectedImage,
    clothing: SelectedImage,
}

/// Inputs captured when an edit starts.
pub struct EditJob {
    base: EncodedImagePart,
    instruction: String,
}

/// Image-composition workflow for one session: two input slots, the latest
/// generated image, and the progress/error state around each call.
#[derive(Clone)]
pub struct TryOnController {
    service: Arc<dyn StyleService>,
    state: Arc<Mutex<TryOnState>>,
}

impl TryOnController {
    pub fn new(service: Arc<dyn StyleService>) -> Self {
        Self {
            service,
            state: Arc::new(Mutex::new(TryOnState::new())),
        }
    }

    /// Replaces one input slot. Never touches the generated image.
    pub async fn select_image(&self, slot: ImageSlot, image: Option<SelectedImage>) {
        let mut state = self.state.lock().await;
        match slot {
            ImageSlot::Model => state.model_image = image,
            ImageSlot::Clothing => state.clothing_image = image,
        }
    }

    pub async fn snapshot(&self) -> TryOnSnapshot {
        let state = self.state.lock().await;
        TryOnSnapshot {
            phase: state.phase,
            status_message: state.status.as_ref().map(|s| s.current().to_string()),
            status_step: state.status.as_ref().map(StatusCycle::index),
            error: state.error.clone(),
            model_image: state.model_image.as_ref().map(SelectedImage::summary),
            clothing_image: state.clothing_image.as_ref().map(SelectedImage::summary),
            generated_image: state.generated.clone(),
            edit_prompt: state.edit_prompt.clone(),
        }
    }

    pub async fn generated_image(&self) -> Option<EncodedImagePart> {
        self.state.lock().await.generated.clone()
    }

    pub async fn compose(&self) -> bool {
        match self.begin_compose().await {
            Some(job) => {
                self.run_compose(job).await;
                true
            }
            None => false,
        }
    }

    /// Enters `ComposeInFlight` if both images are selected and nothing is in
    /// flight. The previous result and error are cleared on entry.
    pub async fn begin_compose(&self) -> Option<ComposeJob> {
        let mut state = self.state.lock().await;
        if state.disposed || state.phase.is_busy() {
            return None;
        }
        let (Some(model), Some(clothing)) =
            (state.model_image.clone(), state.clothing_image.clone())
        else {
            return None;
        };

        state.generated = None;
        state.error = None;
        state.phase = TryOnPhase::ComposeInFlight;
        self.start_status(&mut state, COMPOSE_MESSAGES, COMPOSE_INTERVAL);
        info!(
            "Composing try-on from {} and {}",
            model.file_name, clothing.file_name
        );

        Some(ComposeJob { model, clothing })
    }

    pub async fn run_compose(&self, job: ComposeJob) {
        let result = async {
            let model = encode_selected(&job.model).await?;
            let clothing = encode_selected(&job.clothing).await?;
            self.service.compose_try_on(&model, &clothing).await
        }
        .await;

        let mut state = self.state.lock().await;
        state.stop_status();
        if state.disposed {
            return;
        }
        match result {
            Ok(image) => {
                state.generated = Some(image);
                state.phase = TryOnPhase::Ready;
            }
            Err(e) => {
                warn!("Try-on composition failed: {}", e);
                state.error = Some(e.to_string());
                state.phase = TryOnPhase::Failed;
            }
        }
    }

    pub async fn edit(&self, instruction: &str) -> bool {
        match self.begin_edit(instruction).await {
            Some(job) => {
                self.run_edit(job).await;
                true
            }
            None => false,
        }
    }

    /// Enters `EditInFlight` if a generated image exists, the trimmed
    /// instruction is non-empty, and nothing is in flight.
    pub async fn begin_edit(&self, instruction: &str) -> Option<EditJob> {
        let instruction = instruction.trim();
        let mut state = self.state.lock().await;
        if state.disposed || state.phase.is_busy() || instruction.is_empty() {
            return None;
        }
        let base = state.generated.clone()?;

        state.edit_prompt = instruction.to_string();
        state.error = None;
        state.phase = TryOnPhase::EditInFlight;
        self.start_status(&mut state, EDIT_MESSAGES, EDIT_INTERVAL);
        info!("Editing generated image: {}", instruction);

        Some(EditJob {
            base,
            instruction: instruction.to_string(),
        })
    }

    pub async fn run_edit(&self, job: EditJob) {
        let result = self.service.edit_image(&job.base, &job.instruction).await;

        let mut state = self.state.lock().await;
        state.stop_status();
        if state.disposed {
            return;
        }
        match result {
            Ok(image) => {
                state.generated = Some(image);
                state.edit_prompt.clear();
                state.phase = TryOnPhase::Ready;
            }
            Err(e) => {
                warn!("Image edit failed: {}", e);
                state.error = Some(e.to_string());
                state.phase = TryOnPhase::Failed;
            }
        }
    }

    /// Cancels the status timer; results that land afterwards are discarded.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.disposed = true;
        if state.ticker.is_running() {
            debug!("Cancelling status timer on teardown");
        }
        state.stop_status();
    }

    fn start_status(
        &self,
        state: &mut TryOnState,
        messages: &'static [&'static str],
        period: Duration,
    ) {
        state.status = Some(StatusCycle::new(messages));
        state
            .ticker
            .start(Arc::downgrade(&self.state), period, |s: &mut TryOnState| {
                if let Some(status) = s.status.as_mut() {
                    status.advance();
                }
            });
    }
}
