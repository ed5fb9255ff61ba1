use deep_research::llm::ollama::OllamaClient;
use deep_research::llm::openai::OpenAIClient;
use deep_research::llm::{GenerationParams, LLMClient, ProviderRegistry};
use deep_research::types::{AppError, ChatMessage, ToolDefinition};
use deep_research::ResearchConfig;
use futures::StreamExt;
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn openai_client(server: &MockServer) -> OpenAIClient {
    OpenAIClient::new(
        "sk-test".to_string(),
        format!("{}/v1", server.uri()),
        "gpt-4o-mini".to_string(),
        GenerationParams::default(),
    )
    .unwrap()
}

fn ollama_client(server: &MockServer) -> OllamaClient {
    OllamaClient::new(server.uri(), "llama3.1".to_string(), GenerationParams::default()).unwrap()
}

fn search_definition() -> ToolDefinition {
    ToolDefinition {
        name: "web_search".to_string(),
        description: "Search the web".to_string(),
        parameters: json!({"type": "object", "properties": {"query": {"type": "string"}}}),
    }
}

async fn collect_stream(client: &dyn LLMClient) -> Vec<String> {
    let stream = client
        .stream_with_history(&[ChatMessage::user("Hi")])
        .await
        .unwrap();
    stream.map(|chunk| chunk.unwrap()).collect().await
}

// ============= OpenAI =============

#[tokio::test]
async fn test_openai_generate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-4o-mini", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "4"}, "finish_reason": "stop"}]
        })))
        .mount(&server)
        .await;

    let answer = openai_client(&server).generate("What is 2+2?").await.unwrap();
    assert_eq!(answer, "4");
}

#[tokio::test]
async fn test_openai_tool_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"tool_choice": "auto"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "web_search", "arguments": "{\"query\":\"tokio\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .mount(&server)
        .await;

    let response = openai_client(&server)
        .generate_with_tools(&[ChatMessage::user("Find tokio")], &[search_definition()])
        .await
        .unwrap();

    assert!(response.has_tool_calls());
    assert_eq!(response.tool_calls[0].id, "call_1");
    assert_eq!(response.tool_calls[0].arguments, json!({"query": "tokio"}));
}

#[tokio::test]
async fn test_openai_stream() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"2 + 2\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" = 4\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let chunks = collect_stream(&openai_client(&server)).await;
    assert_eq!(chunks, vec!["2 + 2", " = 4"]);
}

#[tokio::test]
async fn test_openai_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let err = openai_client(&server).generate("Hi").await.unwrap_err();
    assert!(matches!(err, AppError::LLM(_)));
    assert!(err.to_string().contains("401"));
}

// ============= Ollama =============

#[tokio::test]
async fn test_ollama_generate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "llama3.1", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "Hello!"},
            "done": true,
            "done_reason": "stop"
        })))
        .mount(&server)
        .await;

    let answer = ollama_client(&server)
        .generate_with_system("Be brief", "Hi")
        .await
        .unwrap();
    assert_eq!(answer, "Hello!");
}

#[tokio::test]
async fn test_ollama_stream() {
    let server = MockServer::start().await;
    let body = concat!(
        "{\"message\":{\"content\":\"Hel\"},\"done\":false}\n",
        "{\"message\":{\"content\":\"lo\"},\"done\":false}\n",
        "{\"message\":{\"content\":\"\"},\"done\":true}\n",
    );
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/x-ndjson"))
        .mount(&server)
        .await;

    let chunks = collect_stream(&ollama_client(&server)).await;
    assert_eq!(chunks.concat(), "Hello");
}

// ============= Provider Registry =============

#[tokio::test]
async fn test_registry_builds_working_client() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"model": "qwen2.5", "options": {"num_predict": 256}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "ok"},
            "done": true
        })))
        .mount(&server)
        .await;

    let config = ResearchConfig::from_toml_str(&format!(
        r#"
[providers.local]
type = "ollama"
base_url = "{}"
default_model = "llama3.1"

[models.small]
provider = "local"
model = "qwen2.5"
max_tokens = 256

[agents.lead]
model = "small"
[agents.subagent]
model = "small"
[agents.chat]
model = "small"
"#,
        server.uri()
    ))
    .unwrap();

    let registry = ProviderRegistry::from_config(&config);
    let client = registry.create_client_for_model("small").unwrap();

    assert_eq!(client.model_name(), "qwen2.5");
    assert_eq!(client.generate("ping").await.unwrap(), "ok");
    assert!(registry.create_client_for_model("missing").is_err());
}

// ============= Timeouts =============

fn short_timeout() -> GenerationParams {
    GenerationParams {
        timeout: Duration::from_millis(300),
        ..GenerationParams::default()
    }
}

/// Read one HTTP request (headers plus `Content-Length` body) from `socket`.
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }
}

/// Serve one NDJSON stream whose lines are spaced `gap` apart.
async fn trickle_server(lines: Vec<&'static str>, gap: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\ntransfer-encoding: chunked\r\n\r\n",
            )
            .await
            .unwrap();
        for line in lines {
            tokio::time::sleep(gap).await;
            let data = format!("{}\n", line);
            let frame = format!("{:x}\r\n{}\r\n", data.len(), data);
            socket.write_all(frame.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
        }
        socket.write_all(b"0\r\n\r\n").await.unwrap();
        socket.flush().await.unwrap();
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_stream_outlives_timeout_while_tokens_arrive() {
    // five gaps of 150ms: well past the 300ms timeout in total, never idle for it
    let base_url = trickle_server(
        vec![
            r#"{"message":{"content":"The "},"done":false}"#,
            r#"{"message":{"content":"long "},"done":false}"#,
            r#"{"message":{"content":"answer"},"done":false}"#,
            r#"{"message":{"content":"."},"done":false}"#,
            r#"{"message":{"content":""},"done":true}"#,
        ],
        Duration::from_millis(150),
    )
    .await;
    let client = OllamaClient::new(base_url, "llama3.1".to_string(), short_timeout()).unwrap();

    let chunks = collect_stream(&client).await;

    assert_eq!(chunks.concat(), "The long answer.");
}

#[tokio::test]
async fn test_one_shot_call_still_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"message": {"content": "late"}, "done": true}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let client = OllamaClient::new(server.uri(), "llama3.1".to_string(), short_timeout()).unwrap();

    let err = client.generate("Hi").await.unwrap_err();

    assert!(matches!(err, AppError::LLM(_)));
}
