use anyhow::{anyhow, Result};
use assistant::context::EMPTY_BUFFER_ERROR;
use assistant::{Assistant, ChatContext, Model};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Processing(Model),
    Error(String),
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestState::Idle => write!(f, "Idle"),
            RequestState::Processing(model) => write!(f, "In Progress ({})", model),
            RequestState::Error(message) => write!(f, "Error: {}", message),
        }
    }
}

/// Result of a finished background request.
#[derive(Debug)]
pub struct RequestOutcome {
    pub model: Model,
    pub result: Result<String>,
}

/// Runs model requests on the tokio runtime and hands results back to the
/// UI loop through a channel.
pub struct RequestHandler {
    assistant: Arc<Assistant>,
    state: RequestState,
    sender: mpsc::UnboundedSender<RequestOutcome>,
    receiver: mpsc::UnboundedReceiver<RequestOutcome>,
}

impl RequestHandler {
    pub fn new(assistant: Assistant) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            assistant: Arc::new(assistant),
            state: RequestState::Idle,
            sender,
            receiver,
        }
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.state, RequestState::Processing(_))
    }

    pub fn assistant(&self) -> &Assistant {
        &self.assistant
    }

    /// Starts a request for the question pending in `buffer_text`.
    pub fn send(&mut self, buffer_text: String, model: Model, context: ChatContext) -> Result<()> {
        if buffer_text.trim().is_empty() {
            self.state = RequestState::Error(EMPTY_BUFFER_ERROR.to_string());
            return Err(anyhow!(EMPTY_BUFFER_ERROR));
        }

        if let RequestState::Processing(current) = &self.state {
            return Err(anyhow!("A request to {} is already in progress", current));
        }

        log::info!("Sending request to {}", model);
        self.state = RequestState::Processing(model);

        let assistant = Arc::clone(&self.assistant);
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let result = assistant.ask(model, &context, &buffer_text).await;
            if let Err(e) = &result {
                log::error!("Request to {} failed: {}", model, e);
            }
            if sender.send(RequestOutcome { model, result }).is_err() {
                log::warn!("Request result dropped, receiver closed");
            }
        });

        Ok(())
    }

    /// Non-blocking check for a finished request.
    pub fn poll(&mut self) -> Option<RequestOutcome> {
        let outcome = self.receiver.try_recv().ok()?;
        self.state = match &outcome.result {
            Ok(_) => RequestState::Idle,
            Err(e) => RequestState::Error(e.to_string()),
        };
        Some(outcome)
    }

    /// Clears a stale error once the user moves on.
    pub fn acknowledge_error(&mut self) {
        if matches!(self.state, RequestState::Error(_)) {
            self.state = RequestState::Idle;
        }
    }
}
