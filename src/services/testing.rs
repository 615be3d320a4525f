// src/services/testing.rs
use crate::errors::StyleError;
use crate::models::{EncodedImagePart, StyleAdvice};
use crate::services::StyleService;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Compose {
        model: EncodedImagePart,
        clothing: EncodedImagePart,
    },
    Edit {
        base: EncodedImagePart,
        instruction: String,
    },
    Advice {
        prompt: String,
    },
}

/// Replays queued results in order and records every call it receives.
#[derive(Default)]
pub struct ScriptedService {
    images: Mutex<VecDeque<Result<EncodedImagePart, StyleError>>>,
    advice: Mutex<VecDeque<Result<StyleAdvice, StyleError>>>,
    calls: Mutex<Vec<Call>>,
    call_count: AtomicUsize,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_image(&self, result: Result<EncodedImagePart, StyleError>) -> &Self {
        self.images.lock().unwrap().push_back(result);
        self
    }

    pub fn push_advice(&self, result: Result<StyleAdvice, StyleError>) -> &Self {
        self.advice.lock().unwrap().push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(call);
    }

    fn next_image(&self) -> Result<EncodedImagePart, StyleError> {
        self.images
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(StyleError::Upstream("no scripted image".to_string())))
    }
}

#[async_trait]
impl StyleService for ScriptedService {
    async fn compose_try_on(
        &self,
        model: &EncodedImagePart,
        clothing: &EncodedImagePart,
    ) -> Result<EncodedImagePart, StyleError> {
        self.record(Call::Compose {
            model: model.clone(),
            clothing: clothing.clone(),
        });
        self.next_image()
    }

    async fn edit_image(
        &self,
        base: &EncodedImagePart,
        instruction: &str,
    ) -> Result<EncodedImagePart, StyleError> {
        self.record(Call::Edit {
            base: base.clone(),
            instruction: instruction.to_string(),
        });
        self.next_image()
    }

    async fn style_advice(&self, prompt: &str) -> Result<StyleAdvice, StyleError> {
        self.record(Call::Advice {
            prompt: prompt.to_string(),
        });
        self.advice
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(StyleError::Upstream("no scripted advice".to_string())))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
