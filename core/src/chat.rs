//! Chat relay: one POST per user message, streamed tokens back.
//!
//! WIRE: the endpoint answers with SSE-style lines. `data: {"token": ".."}`
//! appends to the assistant reply, `data: {"done": true}` ends it. Any
//! other line, or a `data:` payload that is not valid JSON, is skipped.

use crate::{
    error::{HubError, HubResult},
    session::Session,
    types::Identity,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};

pub const CONNECTION_APOLOGY: &str = "Sorry, I'm having trouble connecting to the server.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_id: Identity,
    pub message: String,
    pub tier:    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role:      Role,
    pub content:   String,
    pub timestamp: DateTime<Utc>,
}

/// One parsed stream line.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token(String),
    Done,
}

#[derive(Deserialize)]
struct Frame {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    done:  bool,
}

/// Parse one line of the stream. `None` for anything that is not a
/// well-formed data frame.
pub fn parse_stream_line(line: &str) -> Option<StreamEvent> {
    let payload = line.trim_end_matches(['\r', '\n']).strip_prefix("data: ")?;
    let frame: Frame = serde_json::from_str(payload).ok()?;
    match frame.token {
        Some(token) if !token.is_empty() => Some(StreamEvent::Token(token)),
        _ if frame.done => Some(StreamEvent::Done),
        _ => None,
    }
}

/// Opens the response stream for one request.
pub trait ChatTransport {
    fn open(&self, request: &ChatRequest) -> HubResult<Box<dyn BufRead>>;
}

pub struct HttpChatTransport {
    client:   reqwest::blocking::Client,
    endpoint: String,
}

impl HttpChatTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl ChatTransport for HttpChatTransport {
    fn open(&self, request: &ChatRequest) -> HubResult<Box<dyn BufRead>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|e| HubError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(HubError::Transport(format!("HTTP error! status: {status}")));
        }
        Ok(Box::new(BufReader::new(response)))
    }
}

/// The message list of one chat panel.
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    loading:  bool,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Send `text` and stream the reply into the message list.
    /// `on_token` sees the reply as it grows. Signed out: nothing happens.
    pub fn send(
        &mut self,
        session: Option<&Session>,
        text: &str,
        transport: &dyn ChatTransport,
        mut on_token: impl FnMut(&str),
    ) {
        let Some(session) = session else {
            return;
        };
        self.messages.push(ChatMessage {
            role: Role::User,
            content: text.to_string(),
            timestamp: Utc::now(),
        });
        self.loading = true;

        let request = ChatRequest {
            user_id: session.identity.clone(),
            message: text.to_string(),
            tier: session.tier.as_str().to_string(),
        };
        if let Err(e) = self.stream_reply(&request, transport, &mut on_token) {
            log::error!("chat error: {e}");
            self.messages.push(ChatMessage {
                role: Role::Assistant,
                content: CONNECTION_APOLOGY.to_string(),
                timestamp: Utc::now(),
            });
        }
        self.loading = false;
    }

    fn stream_reply(
        &mut self,
        request: &ChatRequest,
        transport: &dyn ChatTransport,
        on_token: &mut dyn FnMut(&str),
    ) -> HubResult<()> {
        let reader = transport.open(request)?;
        let mut reply: Option<usize> = None;
        for line in reader.lines() {
            match parse_stream_line(&line?) {
                Some(StreamEvent::Token(token)) => {
                    let idx = *reply.get_or_insert_with(|| {
                        self.messages.push(ChatMessage {
                            role: Role::Assistant,
                            content: String::new(),
                            timestamp: Utc::now(),
                        });
                        self.messages.len() - 1
                    });
                    let message = &mut self.messages[idx];
                    message.content.push_str(&token);
                    on_token(&message.content);
                }
                Some(StreamEvent::Done) => break,
                None => {}
            }
        }
        Ok(())
    }
}
