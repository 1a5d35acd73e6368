use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::llm::{CompletionRequest, LlmProvider};
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const TIMEOUT: Duration = Duration::from_secs(60);

/// Google Gemini `generateContent` client.
pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| Error::Llm(format!("failed to build Gemini HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Point the client at another endpoint, e.g. a proxy.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, request: &CompletionRequest<'_>) -> String {
        format!("{}/{}:generateContent", self.base_url, request.model.id())
    }
}

impl LlmProvider for GeminiProvider {
    fn complete(&self, request: &CompletionRequest<'_>) -> Result<String> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(self.api_key.trim())
                .map_err(|_| Error::Llm("invalid Gemini API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        };

        tracing::debug!(model = %request.model, prompt_bytes = request.prompt.len(), "calling Gemini");
        let resp = self
            .client
            .post(self.endpoint(request))
            .headers(headers)
            .json(&body)
            .send()
            .map_err(|e| Error::Llm(format!("failed to call Gemini: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::Llm(format!("Gemini returned {status}: {text}")));
        }

        let parsed: GenerateResponse = resp
            .json()
            .map_err(|e| Error::Llm(format!("failed to parse Gemini response: {e}")))?;
        parsed.into_text()
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(Error::Llm(format!("Gemini returned no answer: {reason}")));
        };

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "empty".to_string());
            return Err(Error::Llm(format!("Gemini response missing text content ({reason})")));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;
    use crate::llm::Model;

    /// Serve one HTTP response and hand back the raw request.
    fn serve_once(status: &str, body: &str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut head = String::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap();
                }
                head.push_str(&line);
                if line == "\r\n" {
                    break;
                }
            }
            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();
            reader.get_mut().write_all(response.as_bytes()).unwrap();
            head + &String::from_utf8(body).unwrap()
        });
        (format!("http://{addr}"), handle)
    }

    fn request(prompt: &str) -> CompletionRequest<'_> {
        CompletionRequest {
            prompt,
            model: Model::Gemini25Flash,
            temperature: 0.2,
        }
    }

    #[test]
    fn test_complete_sends_prompt_and_reads_text() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"Refunds "},{"text":"take 30 days [1]."}]},"finishReason":"STOP"}]}"#,
        );
        let provider = GeminiProvider::new("test-key").unwrap().with_base_url(url);

        let answer = provider.complete(&request("What is the refund policy?")).unwrap();
        assert_eq!(answer, "Refunds take 30 days [1].");

        let raw = server.join().unwrap();
        assert!(raw.starts_with("POST /models/gemini-2.5-flash:generateContent"));
        assert!(raw.to_ascii_lowercase().contains("x-goog-api-key: test-key"));
        assert!(raw.contains("What is the refund policy?"));
        assert!(raw.contains(r#""temperature":0.2"#));
    }

    #[test]
    fn test_http_error_is_llm_error() {
        let (url, server) = serve_once("429 Too Many Requests", r#"{"error":"quota"}"#);
        let provider = GeminiProvider::new("k").unwrap().with_base_url(url);

        let err = provider.complete(&request("hi")).unwrap_err();
        assert!(matches!(err, Error::Llm(ref m) if m.contains("429")));
        server.join().unwrap();
    }

    #[test]
    fn test_blocked_prompt() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        let err = parsed.into_text().unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_empty_candidate_text() {
        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#).unwrap();
        let err = parsed.into_text().unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));
    }
}
