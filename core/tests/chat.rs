//! Chat relay: stream parsing and message list growth.

use finguard_core::{
    chat::{
        parse_stream_line, ChatRequest, ChatSession, ChatTransport, HttpChatTransport, Role,
        StreamEvent, CONNECTION_APOLOGY,
    },
    config::HubConfig,
    error::{HubError, HubResult},
    session::Session,
    types::Tier,
};
use std::{
    cell::RefCell,
    io::{BufRead, BufReader, Cursor, Read, Write},
    net::TcpListener,
    sync::mpsc,
    thread,
};

/// Replays a canned body and records what was sent.
struct FakeTransport {
    body: Option<&'static str>,
    sent: RefCell<Vec<ChatRequest>>,
}

impl FakeTransport {
    fn replying(body: &'static str) -> Self {
        Self { body: Some(body), sent: RefCell::new(Vec::new()) }
    }

    fn offline() -> Self {
        Self { body: None, sent: RefCell::new(Vec::new()) }
    }
}

impl ChatTransport for FakeTransport {
    fn open(&self, request: &ChatRequest) -> HubResult<Box<dyn BufRead>> {
        self.sent.borrow_mut().push(request.clone());
        match self.body {
            Some(body) => Ok(Box::new(Cursor::new(body.as_bytes()))),
            None => Err(HubError::Transport("HTTP error! status: 503".into())),
        }
    }
}

fn analyst() -> Session {
    Session::new("ana", Tier::Analyst, "ana@firm.test")
}

#[test]
fn stream_lines_parse_tokens_and_done() {
    assert_eq!(
        parse_stream_line(r#"data: {"token": "Hel"}"#),
        Some(StreamEvent::Token("Hel".into()))
    );
    assert_eq!(parse_stream_line("data: {\"done\": true}\r\n"), Some(StreamEvent::Done));
    assert_eq!(parse_stream_line(r#"data: {"token": "#), None);
    assert_eq!(parse_stream_line(": keep-alive"), None);
    assert_eq!(parse_stream_line(r#"event: {"token": "x"}"#), None);
    assert_eq!(parse_stream_line(""), None);
}

#[test]
fn tokens_grow_a_single_assistant_message() {
    let transport = FakeTransport::replying(concat!(
        "data: {\"token\": \"Your \"}\n",
        "\n",
        "data: {\"token\": \"risk is \"}\n",
        "data: not json\n",
        "data: {\"token\": \"low.\"}\n",
        "data: {\"done\": true}\n",
        "data: {\"token\": \"ignored\"}\n",
    ));
    let mut chat = ChatSession::new();
    let mut seen = Vec::new();
    chat.send(Some(&analyst()), "How risky am I?", &transport, |partial| {
        seen.push(partial.to_string())
    });

    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "How risky am I?");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Your risk is low.");
    assert_eq!(seen, ["Your ", "Your risk is ", "Your risk is low."]);
    assert!(!chat.is_loading());

    let sent = transport.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].user_id, "ana");
    assert_eq!(sent[0].tier, "analyst");
    assert_eq!(sent[0].message, "How risky am I?");
}

#[test]
fn request_body_uses_camel_case_keys() {
    let request = ChatRequest {
        user_id: "u1".into(),
        message: "hi".into(),
        tier: "consumer".into(),
    };
    let body = serde_json::to_value(&request).expect("serialize");
    assert_eq!(body, serde_json::json!({ "userId": "u1", "message": "hi", "tier": "consumer" }));
}

#[test]
fn transport_failure_appends_apology() {
    let transport = FakeTransport::offline();
    let mut chat = ChatSession::new();
    chat.send(Some(&analyst()), "hello?", &transport, |_| {});

    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, CONNECTION_APOLOGY);
}

#[test]
fn signed_out_send_is_a_no_op() {
    let transport = FakeTransport::replying("data: {\"token\": \"x\"}\n");
    let mut chat = ChatSession::new();
    chat.send(None, "hello", &transport, |_| {});
    assert!(chat.messages().is_empty());
    assert!(transport.sent.borrow().is_empty());
}

#[test]
fn empty_reply_adds_no_assistant_message() {
    let transport = FakeTransport::replying("data: {\"done\": true}\n");
    let mut chat = ChatSession::new();
    chat.send(Some(&analyst()), "anyone?", &transport, |_| {});
    assert_eq!(chat.messages().len(), 1);
}

/// Serve one HTTP request on a local port. Sends back the parsed JSON
/// request body and answers with `status` and `body`.
fn serve_once(status: &'static str, body: &'static str) -> (String, mpsc::Receiver<serde_json::Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!("http://{}/chat_stream", listener.local_addr().expect("addr"));
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        let mut content_length = 0usize;
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).expect("header line");
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                if name.eq_ignore_ascii_case("content-length") {
                    content_length = value.trim().parse().expect("content length");
                }
            }
        }
        let mut raw = vec![0u8; content_length];
        reader.read_exact(&mut raw).expect("body");
        tx.send(serde_json::from_slice(&raw).expect("json body")).expect("send body");

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
        .expect("write response");
    });
    (url, rx)
}

#[test]
fn http_transport_posts_json_and_streams_reply() {
    let (url, body) = serve_once(
        "200 OK",
        "data: {\"token\": \"Hi \"}\n\ndata: {\"token\": \"there\"}\n\ndata: {\"done\": true}\n\n",
    );
    let config = HubConfig { chat_endpoint: url, ..HubConfig::default_test() };
    let transport = HttpChatTransport::new(&config.chat_endpoint);

    let mut chat = ChatSession::new();
    chat.send(Some(&analyst()), "status?", &transport, |_| {});

    assert_eq!(
        body.recv().expect("request body"),
        serde_json::json!({ "userId": "ana", "message": "status?", "tier": "analyst" })
    );
    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hi there");
}

#[test]
fn http_error_status_appends_apology() {
    let (url, _body) = serve_once("503 Service Unavailable", "");
    let transport = HttpChatTransport::new(url);

    let mut chat = ChatSession::new();
    chat.send(Some(&analyst()), "hello?", &transport, |_| {});

    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, CONNECTION_APOLOGY);
}
