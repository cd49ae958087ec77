use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use promptline::http::{HttpMethod, HttpRequest, HttpResponse, HttpStreamResponse, HttpTransport};
use promptline::{
    ErrorKind, GenerationClient, GenerationConfig, GenerationRequest, InlineImage, LLMError,
    Locale, StreamChunk,
};
use serde_json::Value;

/// One canned reply; streaming replies are delivered chunk by chunk.
struct Reply {
    status: u16,
    chunks: Vec<Result<Vec<u8>, String>>,
    headers: HashMap<String, String>,
}

impl Reply {
    fn ok(chunks: &[&str]) -> Self {
        Self::status(200, chunks)
    }

    fn status(status: u16, chunks: &[&str]) -> Self {
        Self {
            status,
            chunks: chunks.iter().map(|chunk| Ok(chunk.as_bytes().to_vec())).collect(),
            headers: HashMap::new(),
        }
    }
}

/// 按顺序返回预设响应并记录请求的 transport
#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn with(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn next_reply(&self, request: HttpRequest) -> Reply {
        self.requests.lock().expect("lock").push(request);
        self.replies
            .lock()
            .expect("lock")
            .pop_front()
            .expect("unexpected extra request")
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("lock").clone()
    }

    fn last_body(&self) -> Value {
        let requests = self.requests();
        let body = requests
            .last()
            .and_then(|request| request.body.clone())
            .expect("request body");
        serde_json::from_slice(&body).expect("json body")
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, LLMError> {
        let reply = self.next_reply(request);
        let mut body = Vec::new();
        for chunk in reply.chunks {
            body.extend(chunk.map_err(LLMError::transport)?);
        }
        Ok(HttpResponse {
            status: reply.status,
            headers: reply.headers,
            body,
        })
    }

    async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, LLMError> {
        let reply = self.next_reply(request);
        let chunks: Vec<Result<Vec<u8>, LLMError>> = reply
            .chunks
            .into_iter()
            .map(|chunk| chunk.map_err(LLMError::transport))
            .collect();
        Ok(HttpStreamResponse {
            status: reply.status,
            headers: reply.headers,
            body: Box::pin(stream::iter(chunks)),
        })
    }
}

fn gemini_frame(text: &str) -> String {
    format!("data: {{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"{text}\"}}]}}}}]}}\n\n")
}

fn gemini_request() -> GenerationRequest {
    GenerationRequest::new("Say hello", "gemini-2.0-flash", "test-key")
}

#[tokio::test]
async fn gemini_stream_reports_hel_lo_then_completion() {
    let hel = gemini_frame("Hel");
    let lo = gemini_frame("lo");
    let transport = ScriptedTransport::with(vec![Reply::ok(&[&hel, &lo, "data: [DONE]\n"])]);
    let client = GenerationClient::new(transport.clone());

    let mut calls = Vec::new();
    let result = client
        .generate_streaming(&gemini_request(), |chunk| calls.push(chunk.clone()))
        .await;

    assert!(result.is_success());
    assert_eq!(result.text, "Hello");
    let triples: Vec<(&str, &str, bool)> = calls
        .iter()
        .map(|chunk| (chunk.delta.as_str(), chunk.full_text.as_str(), chunk.is_complete))
        .collect();
    assert_eq!(
        triples,
        vec![("Hel", "Hel", false), ("lo", "Hello", false), ("", "Hello", true)]
    );

    let requests = transport.requests();
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(
        requests[0].url,
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse&key=test-key"
    );
}

#[tokio::test]
async fn frames_split_across_chunks_decode_identically() {
    let whole = format!("{}{}data: [DONE]\n", gemini_frame("Hel"), gemini_frame("lo"));
    let (left, right) = whole.split_at(17);
    let transport = ScriptedTransport::with(vec![Reply::ok(&[left, right])]);
    let client = GenerationClient::new(transport);

    let mut deltas = Vec::new();
    let result = client
        .generate_streaming(&gemini_request(), |chunk| deltas.push(chunk.delta.clone()))
        .await;
    assert_eq!(result.text, "Hello");
    assert_eq!(deltas, vec!["Hel", "lo", ""]);
}

#[tokio::test]
async fn lazy_stream_ends_with_single_completion() {
    let transport = ScriptedTransport::with(vec![Reply::ok(&[
        &gemini_frame("a"),
        &gemini_frame("b"),
        &gemini_frame("c"),
    ])]);
    let client = GenerationClient::new(transport);

    let stream = client.stream(&gemini_request()).await.expect("stream");
    let chunks: Vec<StreamChunk> = stream
        .map(|item| item.expect("chunk"))
        .collect()
        .await;
    assert_eq!(chunks.len(), 4);
    assert_eq!(chunks.iter().filter(|chunk| chunk.is_complete).count(), 1);
    let last = chunks.last().expect("completion");
    assert!(last.is_complete);
    assert_eq!(last.full_text, "abc");
}

#[tokio::test]
async fn gemini_buffered_call_returns_text() {
    let transport = ScriptedTransport::with(vec![Reply::ok(&[
        r#"{"candidates":[{"content":{"parts":[{"text":"Hi "},{"text":"there"}]}}]}"#,
    ])]);
    let client = GenerationClient::new(transport.clone());
    let request = gemini_request()
        .with_system_instruction("Be brief.")
        .with_image(InlineImage::from_bytes("image/png", b"png"))
        .reduced_capacity(true);

    let result = client.generate(&request).await;
    assert_eq!(result.text, "Hi there");
    assert_eq!(result.error, None);

    let body = transport.last_body();
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
    assert_eq!(body["contents"][0]["parts"][0]["text"], "Say hello");
    assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/png");
    assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["data"], "cG5n");
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
}

#[tokio::test]
async fn http_failures_map_to_error_kinds() {
    let cases = [
        (
            401,
            r#"{"error":{"code":401,"message":"API key not valid.","status":"UNAUTHENTICATED"}}"#,
            ErrorKind::Auth,
        ),
        (
            429,
            r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#,
            ErrorKind::RateLimit,
        ),
        (
            404,
            r#"{"error":{"code":404,"message":"models/gemini-x is not found","status":"NOT_FOUND"}}"#,
            ErrorKind::ModelNotFound,
        ),
        (500, "internal", ErrorKind::Unknown),
    ];
    for (status, body, expected) in cases {
        let transport = ScriptedTransport::with(vec![Reply::status(status, &[body])]);
        let client = GenerationClient::new(transport);

        let result = client.generate(&gemini_request()).await;
        assert_eq!(result.error, Some(expected), "status {status}");
        assert!(!result.text.trim().is_empty());
    }
}

#[tokio::test]
async fn streaming_rejection_is_reported_without_callbacks() {
    let transport = ScriptedTransport::with(vec![Reply::status(
        401,
        &[r#"{"error":{"message":"Incorrect API key provided","code":"invalid_api_key"}}"#],
    )]);
    let client = GenerationClient::new(transport);
    let request = GenerationRequest::new("hi", "gpt-4o-mini", "sk-bad");

    let mut calls = 0;
    let result = client.generate_streaming(&request, |_| calls += 1).await;
    assert_eq!(result.error, Some(ErrorKind::Auth));
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn whitespace_only_output_is_empty_response() {
    let transport = ScriptedTransport::with(vec![
        Reply::ok(&[r#"{"candidates":[{"content":{"parts":[{"text":"  \n "}]}}]}"#]),
        Reply::ok(&[&gemini_frame(" "), "data: [DONE]\n"]),
    ]);
    let client = GenerationClient::new(transport);

    let buffered = client.generate(&gemini_request()).await;
    assert_eq!(buffered.error, Some(ErrorKind::EmptyResponse));

    let mut completions = 0;
    let streamed = client
        .generate_streaming(&gemini_request(), |chunk| {
            if chunk.is_complete {
                completions += 1;
            }
        })
        .await;
    assert_eq!(streamed.error, Some(ErrorKind::EmptyResponse));
    assert_eq!(completions, 1);
}

#[tokio::test]
async fn blank_stream_ends_with_completion_callback() {
    let transport = ScriptedTransport::with(vec![Reply::ok(&[
        "data:{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"  \"}]}}]}\n",
        "data: [DONE]\n",
    ])]);
    let client = GenerationClient::new(transport);

    let mut calls = Vec::new();
    let result = client
        .generate_streaming(&gemini_request(), |chunk| calls.push(chunk.clone()))
        .await;
    assert_eq!(result.error, Some(ErrorKind::EmptyResponse));
    let triples: Vec<(&str, &str, bool)> = calls
        .iter()
        .map(|chunk| (chunk.delta.as_str(), chunk.full_text.as_str(), chunk.is_complete))
        .collect();
    assert_eq!(triples, vec![("  ", "  ", false), ("", "  ", true)]);
}

#[tokio::test]
async fn rejected_key_with_binary_body_is_auth_on_both_paths() {
    let binary = || Reply {
        status: 401,
        chunks: vec![Ok(vec![0xff, 0xfe, b'x'])],
        headers: HashMap::new(),
    };
    let transport = ScriptedTransport::with(vec![binary(), binary()]);
    let client = GenerationClient::new(transport);
    let request = GenerationRequest::new("hi", "gpt-4o-mini", "sk-bad");

    let buffered = client.generate(&request).await;
    assert_eq!(buffered.error, Some(ErrorKind::Auth));

    let mut calls = 0;
    let streamed = client.generate_streaming(&request, |_| calls += 1).await;
    assert_eq!(streamed.error, Some(ErrorKind::Auth));
    assert_eq!(calls, 0);
}

#[tokio::test]
async fn transport_failure_mid_stream_is_network_error() {
    let transport = ScriptedTransport::with(vec![Reply {
        status: 200,
        chunks: vec![
            Ok(gemini_frame("partial").into_bytes()),
            Err("connection reset".to_string()),
        ],
        headers: HashMap::new(),
    }]);
    let client = GenerationClient::new(transport);

    let mut seen = Vec::new();
    let result = client
        .generate_streaming(&gemini_request(), |chunk| seen.push(chunk.clone()))
        .await;
    assert_eq!(result.error, Some(ErrorKind::Network));
    assert_eq!(seen.len(), 1);
    assert!(!seen[0].is_complete);
}

#[tokio::test]
async fn openai_compatible_stream_uses_bearer_and_chat_body() {
    let transport = ScriptedTransport::with(vec![Reply::ok(&[
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n",
        "data:{\"choices\":[{\"delta\":{\"content\":\" there\"},\"finish_reason\":\"stop\"}]}\n",
        "data: [DONE]\n",
    ])]);
    let client = GenerationClient::new(transport.clone());
    let request = GenerationRequest::new("Greet me", "deepseek-chat", "sk-live")
        .with_base_url("https://api.deepseek.com/v1")
        .with_system_instruction("Be warm.");

    let mut deltas = Vec::new();
    let result = client
        .generate_streaming(&request, |chunk| deltas.push(chunk.delta.clone()))
        .await;
    assert_eq!(result.text, "Hi there");
    assert_eq!(deltas, vec!["Hi", " there", ""]);

    let requests = transport.requests();
    assert_eq!(requests[0].url, "https://api.deepseek.com/v1/chat/completions");
    assert_eq!(
        requests[0].headers.get("Authorization"),
        Some(&"Bearer sk-live".to_string())
    );
    let body = transport.last_body();
    assert_eq!(body["stream"], true);
    assert_eq!(body["model"], "deepseek-chat");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "Greet me");
    assert_eq!(body["max_tokens"], 8192);
}

#[tokio::test]
async fn gemini_host_wins_over_model_name() {
    let transport = ScriptedTransport::with(vec![Reply::ok(&[
        r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#,
    ])]);
    let client = GenerationClient::new(transport.clone());
    let request = GenerationRequest::new("ping", "tuned-model", "key")
        .with_base_url("https://generativelanguage.googleapis.com/v1beta");

    let result = client.generate(&request).await;
    assert_eq!(result.text, "ok");
    assert!(transport.requests()[0].url.contains(":generateContent?key=key"));
}

#[tokio::test]
async fn connection_probe_reports_models_and_failures() {
    let transport = ScriptedTransport::with(vec![
        Reply::ok(&[
            r#"{"models":[{"name":"models/gemini-2.0-flash","displayName":"Gemini 2.0 Flash"}]}"#,
        ]),
        Reply::status(404, &["not found"]),
    ]);
    let config = GenerationConfig::default().with_locale(Locale::English);
    let client = GenerationClient::new(transport.clone())
        .with_config(config)
        .expect("config");

    let ok = client.check_connection("key", None, "gemini-2.0-flash").await;
    assert!(ok.ok);
    assert_eq!(ok.models[0].id, "gemini-2.0-flash");
    assert_eq!(ok.message, "Connection succeeded (1 models available).");
    assert_eq!(
        transport.requests()[0].url,
        "https://generativelanguage.googleapis.com/v1beta/models?key=key"
    );

    let missing = client
        .check_connection("key", Some("https://proxy.example.com/v1"), "gpt-4o")
        .await;
    assert!(!missing.ok);
    assert_eq!(missing.status, Some(404));
    assert!(missing.message.contains("endpoint not found"));
}
