// src/llm_extract.rs

use crate::config::{LlmBackend, LlmSection};
use crate::heuristics;
use crate::order::OrderRecord;
use crate::pdf_extract::{PdfContent, extract_text_from_pdf};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Instructions for turning a purchase order into the record the sheet is built from.
const EXTRACTION_PROMPT: &str = r#"You extract data from purchase-order PDFs for sachet filling orders.
Return ONLY one JSON object, no markdown fences and no commentary.
Translate every value into Slovak, except item names which stay in their original language.
Use null for anything that is not in the document.

Header fields:
- "Client Name": the client's company name only, without address.
- "Order Number": the purchase order number.
- "Foil": the foil specification from the ORDER SPECIFICATIONS section.
- "Return of Bulk Containers": the value of the "Return of bulk containers" line.
- "Microbiological Analysis": the value of the "Microbiological analysis" line.
- "Specific order requirements": every other dash-led line of ORDER SPECIFICATIONS
  (not foil, print, microbiology or bulk return), dash removed, trimmed, translated,
  joined with "\n".

"Items": one object per product row of the item table, in document order. Only use
text inside a product's own row (a product may continue on the next page):
- "Item Name": product name from the first line, including any Art. number, excluding product IDs.
- "Sachet Size": dimensions from "Sachet size / filling volume:", e.g. "60x100" (no units).
- "Filling Volume": the part after the slash of the same line, decimal comma as dot, e.g. "3.5ml (+/-0.2ml)".
- "Products Heating": value of the heating line.
- "Embossing Data": value of the embossing line.
- "Required Bulk Quantity": amount with unit, decimal comma as dot, e.g. "25.5kg".
- "Qty": total pieces, quantity multiplied by unit ("25 1000 pcs" = "25000").

Schema:
{"Client Name": "...", "Order Number": "...", "Foil": "...",
 "Return of Bulk Containers": "...", "Microbiological Analysis": "...",
 "Specific order requirements": "...",
 "Items": [{"Item Name": "...", "Sachet Size": "...", "Filling Volume": "...",
            "Products Heating": "...", "Embossing Data": "...",
            "Required Bulk Quantity": "...", "Qty": "..."}]}"#;

/// Truncate very long texts to stay within context limits.
const MAX_TEXT_CHARS: usize = 12_000;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("LLM API error {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not parse model response: {0}")]
    Parse(String),

    #[error("PDF cannot be used with this backend: {0}")]
    Pdf(String),

    #[error("{0}")]
    Config(String),

    #[error("no usable answer after {attempts} attempts, last error: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl ExtractError {
    /// Whether another attempt could change the outcome.
    fn is_retryable(&self) -> bool {
        !matches!(self, ExtractError::Pdf(_) | ExtractError::Config(_))
    }
}

// --- OpenAI-compatible chat ---

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

// --- Gemini generateContent ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

/// Resolved endpoint configuration ready to make API calls.
struct ResolvedEndpoint {
    base_url: String,
    model: String,
    api_key: String,
}

/// Resolve the LLM config section into a concrete endpoint.
///
/// The heuristics backend has no endpoint.
fn resolve_endpoint(llm: &LlmSection) -> Result<Option<ResolvedEndpoint>, ExtractError> {
    let (section, api_key) = match llm.backend {
        LlmBackend::Gemini => {
            let key = std::env::var("GEMINI_API_KEY").map_err(|_| {
                ExtractError::Config("GEMINI_API_KEY env var required for gemini backend".into())
            })?;
            (&llm.gemini, key)
        }
        LlmBackend::Ollama => (&llm.ollama, "ollama".to_string()), // required by API but ignored
        LlmBackend::Remote => {
            let key = std::env::var("LLM_API_KEY").map_err(|_| {
                ExtractError::Config("LLM_API_KEY env var required for remote backend".into())
            })?;
            (&llm.remote, key)
        }
        LlmBackend::Heuristics => return Ok(None),
    };
    info!(
        backend = ?llm.backend,
        url = %section.base_url,
        model = %section.model,
        "Using LLM backend"
    );
    Ok(Some(ResolvedEndpoint {
        base_url: section.base_url.trim_end_matches('/').to_string(),
        model: section.model.clone(),
        api_key,
    }))
}

/// Check if the Ollama server is reachable.
async fn check_ollama_health(client: &Client, base_url: &str) -> bool {
    // Ollama's health endpoint is at the root (not under /v1)
    let health_url = base_url.trim_end_matches('/').trim_end_matches("/v1");

    match client
        .get(health_url)
        .timeout(Duration::from_secs(3))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            info!("Ollama server is reachable");
            true
        }
        Ok(resp) => {
            warn!(status = %resp.status(), "Ollama server returned non-OK status");
            false
        }
        Err(e) => {
            warn!(error = %e, "Ollama server not reachable");
            false
        }
    }
}

/// Turns purchase-order PDFs into [`OrderRecord`]s with the configured backend.
pub struct Extractor {
    client: Client,
    backend: LlmBackend,
    endpoint: Option<ResolvedEndpoint>,
    max_retries: u32,
    initial_delay: Duration,
}

impl Extractor {
    pub fn new(llm: &LlmSection) -> Result<Self, ExtractError> {
        Ok(Self {
            client: Client::new(),
            backend: llm.backend,
            endpoint: resolve_endpoint(llm)?,
            max_retries: llm.max_retries.max(1),
            initial_delay: Duration::from_millis(llm.initial_delay_ms),
        })
    }

    /// Fail early when a local backend is not running.
    pub async fn preflight(&self) -> Result<(), ExtractError> {
        if let (LlmBackend::Ollama, Some(endpoint)) = (self.backend, &self.endpoint) {
            if !check_ollama_health(&self.client, &endpoint.base_url).await {
                return Err(ExtractError::Config(format!(
                    "Ollama is not running at {}. Start it with: ollama serve",
                    endpoint.base_url
                )));
            }
        }
        Ok(())
    }

    /// Extract one order, retrying on rate limits and unusable answers.
    pub async fn extract(&self, pdf_bytes: &[u8]) -> Result<OrderRecord, ExtractError> {
        let mut last = String::new();
        for attempt in 0..self.max_retries {
            match self.extract_once(pdf_bytes).await {
                Ok(order) => {
                    let (filled, total) = order.coverage();
                    info!(
                        filled,
                        total,
                        attempt,
                        items = order.items.len(),
                        order_number = %order.order_number,
                        "Extraction result"
                    );
                    return Ok(order);
                }
                Err(ExtractError::RateLimited(body)) => {
                    last = body;
                    let Some(wait) = self.retry_wait(attempt) else {
                        warn!(attempt = attempt + 1, max = self.max_retries, "Rate limit exceeded");
                        break;
                    };
                    warn!(
                        wait_ms = wait.as_millis() as u64,
                        attempt = attempt + 1,
                        max = self.max_retries,
                        "Rate limit exceeded, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) if e.is_retryable() => {
                    warn!(error = %e, attempt = attempt + 1, max = self.max_retries, "Extraction attempt failed");
                    last = e.to_string();
                }
                Err(e) => return Err(e),
            }
        }
        Err(ExtractError::Exhausted {
            attempts: self.max_retries,
            last,
        })
    }

    /// Backoff before the next attempt; `None` after the last one.
    fn retry_wait(&self, attempt: u32) -> Option<Duration> {
        (attempt + 1 < self.max_retries)
            .then(|| backoff_delay(self.initial_delay, attempt, rand::random::<f64>()))
    }

    async fn extract_once(&self, pdf_bytes: &[u8]) -> Result<OrderRecord, ExtractError> {
        match (self.backend, &self.endpoint) {
            (LlmBackend::Heuristics, _) | (_, None) => {
                let text = pdf_text(pdf_bytes)?;
                Ok(heuristics::extract_order(&text))
            }
            (LlmBackend::Gemini, Some(endpoint)) => {
                let content = self.ask_gemini(endpoint, pdf_bytes).await?;
                parse_order(&content)
            }
            (_, Some(endpoint)) => {
                let text = pdf_text(pdf_bytes)?;
                let content = self.ask_chat(endpoint, &text).await?;
                parse_order(&content)
            }
        }
    }

    async fn ask_gemini(
        &self,
        endpoint: &ResolvedEndpoint,
        pdf_bytes: &[u8],
    ) -> Result<String, ExtractError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart {
                        text: Some(EXTRACTION_PROMPT.to_string()),
                        inline_data: None,
                    },
                    GeminiPart {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: "application/pdf".to_string(),
                            data: STANDARD.encode(pdf_bytes),
                        }),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                top_p: 0.1,
                top_k: 16,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent",
            endpoint.base_url, endpoint.model
        );
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &endpoint.api_key)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let body: GeminiResponse = response.json().await?;
        body.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| ExtractError::Parse("Empty response from Gemini".into()))
    }

    async fn ask_chat(&self, endpoint: &ResolvedEndpoint, text: &str) -> Result<String, ExtractError> {
        let text = truncate_chars(text, MAX_TEXT_CHARS);
        let request = ChatRequest {
            model: endpoint.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: EXTRACTION_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: format!("Extract the order from the following PDF text:\n\n{text}"),
                },
            ],
            temperature: 0.0,
        };

        let url = format!("{}/chat/completions", endpoint.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", endpoint.api_key))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        let chat_response: ChatResponse = response.json().await?;
        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ExtractError::Parse("Empty response from LLM".into()))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ExtractError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ExtractError::RateLimited(body));
    }
    Err(ExtractError::Api { status, body })
}

/// Text backends need a text layer; scanned PDFs only work with Gemini.
fn pdf_text(pdf_bytes: &[u8]) -> Result<String, ExtractError> {
    match extract_text_from_pdf(pdf_bytes) {
        PdfContent::Text(text) => Ok(text),
        PdfContent::ScannedImage => Err(ExtractError::Pdf(
            "scanned / image-only PDF needs the gemini backend".into(),
        )),
        PdfContent::Error(e) => Err(ExtractError::Pdf(e)),
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// `initial · 2^attempt + jitter`, jitter given in seconds (0..1).
fn backoff_delay(initial: Duration, attempt: u32, jitter: f64) -> Duration {
    initial.saturating_mul(2u32.saturating_pow(attempt)) + Duration::from_secs_f64(jitter.clamp(0.0, 1.0))
}

/// Parse a model answer into an order record.
pub fn parse_order(content: &str) -> Result<OrderRecord, ExtractError> {
    // Strip markdown fences if the model added them despite instructions
    let json_str = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let json_str = extract_json_object(json_str)?;

    serde_json::from_str(json_str).map_err(|e| {
        ExtractError::Parse(format!("{e}\nRaw: {json_str}"))
    })
}

/// Extract the outermost JSON object from a string that may contain
/// surrounding text (e.g. thinking tokens).
fn extract_json_object(s: &str) -> Result<&str, ExtractError> {
    let start = s
        .find('{')
        .ok_or_else(|| ExtractError::Parse("No '{' found in LLM response".into()))?;
    let end = s
        .rfind('}')
        .ok_or_else(|| ExtractError::Parse("No '}' found in LLM response".into()))?;
    if end <= start {
        return Err(ExtractError::Parse("Malformed JSON in LLM response".into()));
    }
    Ok(&s[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fenced_answer() {
        let answer = "```json\n{\"Client Name\": \"Dr. Kelen\", \"Items\": [{\"Item Name\": \"A\"}]}\n```";
        let order = parse_order(answer).unwrap();
        assert_eq!(order.client, "Dr. Kelen");
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, "");
    }

    #[test]
    fn test_parse_with_leading_reasoning() {
        let answer = "<think>the order has one item</think>\n{\"Order Number\": \"PO-9\"}";
        let order = parse_order(answer).unwrap();
        assert_eq!(order.order_number, "PO-9");
        assert!(order.items.is_empty());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_order("no json here"), Err(ExtractError::Parse(_))));
        assert!(matches!(parse_order("} {"), Err(ExtractError::Parse(_))));
        assert!(matches!(parse_order("{\"Items\": 5}"), Err(ExtractError::Parse(_))));
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let initial = Duration::from_millis(1000);
        assert_eq!(backoff_delay(initial, 0, 0.0), Duration::from_secs(1));
        assert_eq!(backoff_delay(initial, 3, 0.0), Duration::from_secs(8));
        assert_eq!(backoff_delay(initial, 1, 0.5), Duration::from_millis(2500));
        assert_eq!(backoff_delay(initial, 0, 7.0), Duration::from_secs(2));
    }

    #[test]
    fn test_retry_classification() {
        assert!(ExtractError::Parse("x".into()).is_retryable());
        assert!(ExtractError::RateLimited(String::new()).is_retryable());
        assert!(!ExtractError::Pdf("scanned".into()).is_retryable());
        assert!(!ExtractError::Config("key".into()).is_retryable());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("áéíóú", 3), "áéí");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn test_gemini_request_shape() {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: None,
                    inline_data: Some(InlineData {
                        mime_type: "application/pdf".into(),
                        data: STANDARD.encode(b"%PDF"),
                    }),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                top_p: 0.1,
                top_k: 16,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(json["contents"][0]["parts"][0]["inlineData"]["data"], "JVBERg==");
        assert!(json["contents"][0]["parts"][0].get("text").is_none());
        assert_eq!(json["generationConfig"]["topK"], 16);
    }

    #[test]
    fn test_no_backoff_after_last_attempt() {
        let llm = LlmSection {
            backend: LlmBackend::Heuristics,
            max_retries: 3,
            initial_delay_ms: 100,
            ..LlmSection::default()
        };
        let extractor = Extractor::new(&llm).unwrap();
        let first = extractor.retry_wait(0).unwrap();
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(1100));
        assert!(extractor.retry_wait(1).is_some());
        assert!(extractor.retry_wait(2).is_none());
    }

    #[test]
    fn test_heuristics_backend_needs_no_key() {
        let llm = LlmSection {
            backend: LlmBackend::Heuristics,
            ..LlmSection::default()
        };
        let extractor = Extractor::new(&llm).unwrap();
        assert!(extractor.endpoint.is_none());
    }
}
