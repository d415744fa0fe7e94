//! Fake upstream models shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use chat_relay::config::Config;
use chat_relay::server::AppState;
use chat_relay::upstream::{FragmentStream, GenerateContentRequest, GenerativeModel, UpstreamError};

/// One scripted upstream event.
#[derive(Debug, Clone)]
pub enum Step {
    Text(&'static str),
    Fail(&'static str),
}

/// Replays a fixed script and records every request it receives.
#[derive(Default)]
pub struct ScriptedModel {
    pub steps: Vec<Step>,
    pub refuse: bool,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<GenerateContentRequest>>,
}

impl ScriptedModel {
    pub fn replying(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps,
            ..Self::default()
        })
    }

    /// Fails when the stream is opened, before any fragment.
    pub fn refusing() -> Arc<Self> {
        Arc::new(Self {
            refuse: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> String {
        let requests = self.requests.lock().unwrap();
        let request = requests.last().expect("no upstream request recorded");
        request.contents[0].parts[0].text.clone().unwrap_or_default()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn stream_generate(
        &self,
        request: GenerateContentRequest,
    ) -> Result<FragmentStream, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);

        if self.refuse {
            return Err(UpstreamError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }

        let items: Vec<Result<String, UpstreamError>> = self
            .steps
            .iter()
            .map(|step| match step {
                Step::Text(text) => Ok(text.to_string()),
                Step::Fail(reason) => Err(UpstreamError::Blocked(reason.to_string())),
            })
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }
}

/// Streams whatever the test pushes into the paired sender.
pub struct ChannelModel {
    rx: Mutex<Option<mpsc::Receiver<Result<String, UpstreamError>>>>,
}

impl ChannelModel {
    pub fn new() -> (Arc<Self>, mpsc::Sender<Result<String, UpstreamError>>) {
        let (tx, rx) = mpsc::channel(8);
        (
            Arc::new(Self {
                rx: Mutex::new(Some(rx)),
            }),
            tx,
        )
    }
}

#[async_trait]
impl GenerativeModel for ChannelModel {
    fn model_name(&self) -> &str {
        "channel"
    }

    async fn stream_generate(
        &self,
        _request: GenerateContentRequest,
    ) -> Result<FragmentStream, UpstreamError> {
        let rx = self
            .rx
            .lock()
            .unwrap()
            .take()
            .expect("channel model used twice");
        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

pub fn state_with(model: Option<Arc<dyn GenerativeModel>>) -> Arc<AppState> {
    Arc::new(AppState::new(&Config::default(), model))
}
