use std::collections::HashMap;
use std::sync::Mutex;

use crate::codec::decode_payload;
use crate::error::{AnalysisError, AnalysisResult};
use crate::providers::{VisionProvider, VisionReply, VisionRequest};

pub(crate) enum Scripted {
    Reply(String),
    Fail(fn() -> AnalysisError),
    Panic,
}

/// Answers by the bytes of the first image in the request; requests with no
/// scripted image get the fallback. Every request is recorded.
pub(crate) struct ScriptedProvider {
    by_image: HashMap<Vec<u8>, Scripted>,
    fallback: Scripted,
    seen: Mutex<Vec<VisionRequest>>,
}

impl ScriptedProvider {
    pub(crate) fn replying(fallback: impl Into<String>) -> Self {
        Self {
            by_image: HashMap::new(),
            fallback: Scripted::Reply(fallback.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn on_image(mut self, bytes: &[u8], scripted: Scripted) -> Self {
        self.by_image.insert(bytes.to_vec(), scripted);
        self
    }

    pub(crate) fn requests(&self) -> Vec<VisionRequest> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl VisionProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn complete(&self, request: &VisionRequest) -> AnalysisResult<VisionReply> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.clone());
        }
        let key = request
            .images()
            .next()
            .and_then(|image| decode_payload(image).ok());
        let scripted = key
            .and_then(|bytes| self.by_image.get(&bytes))
            .unwrap_or(&self.fallback);
        match scripted {
            Scripted::Reply(text) => Ok(VisionReply {
                text: text.clone(),
                model: "scripted-1".to_string(),
                input_tokens: None,
                output_tokens: None,
            }),
            Scripted::Fail(make) => Err(make()),
            Scripted::Panic => panic!("scripted provider panic"),
        }
    }
}
