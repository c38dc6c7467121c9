//! Remote sentiment arbiter.
//!
//! Issues one bounded request per escalation to an OpenAI-compatible
//! Responses endpoint and scans the reply for a canonical label token.
//! Every failure mode — transport error, non-2xx status, malformed body,
//! or a reply with no recognizable token — becomes an [`ArbiterError`]
//! sentinel; nothing here ever reaches the caller as a panic or a raw
//! transport error.

use super::label::Sentiment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default API base for the arbiter service.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default arbiter model.
pub const DEFAULT_ARBITER_MODEL: &str = "gpt-5-mini";

/// Default cap on arbiter reply tokens. The reply only needs to carry a
/// single label token.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 256;

/// Default request timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Connect timeout (seconds).
const CONNECT_TIMEOUT_SECS: u64 = 5;

// ── Error sentinels ──────────────────────────────────────────────

/// Internal arbiter failure modes. Callers treat both variants the same
/// way (fall back to the local label); they are distinguished for logging.
#[derive(Debug, thiserror::Error)]
pub enum ArbiterError {
    /// The network/service call failed: transport error, timeout, non-2xx
    /// status, or an unreadable body.
    #[error("arbiter call failed: {0}")]
    Call(#[source] anyhow::Error),
    /// A reply arrived but contained no canonical label token.
    #[error("arbiter reply contained no canonical sentiment token")]
    Parse,
}

// ── Arbiter seam ─────────────────────────────────────────────────

/// A second-opinion sentiment source consulted on escalation.
#[async_trait]
pub trait Arbiter: Send + Sync {
    async fn arbitrate(&self, text: &str) -> Result<Sentiment, ArbiterError>;
}

// ── Wire types ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: String,
    max_output_tokens: u32,
}

/// Reply envelope. The service emits two shapes — a structured `output`
/// item list and a flat `output_text` field — and is not consistent about
/// which one carries the text, so both are modeled and both are scanned.
#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    output_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

impl OutputItem {
    /// Every text-bearing field of this item: the item-level text plus all
    /// nested text-typed content parts.
    fn texts(&self) -> impl Iterator<Item = &str> {
        self.text
            .as_deref()
            .into_iter()
            .chain(
                self.content
                    .iter()
                    .filter(|p| matches!(p.kind.as_str(), "text" | "output_text"))
                    .map(|p| p.text.as_str()),
            )
    }
}

/// The two reply shapes, scanned in order: structured items first, the
/// flat text field as a fallback.
enum ReplyShape<'a> {
    StructuredParts(&'a [OutputItem]),
    FlatText(&'a str),
}

impl ReplyShape<'_> {
    fn find_label(&self) -> Option<Sentiment> {
        match self {
            ReplyShape::StructuredParts(items) => {
                items.iter().flat_map(OutputItem::texts).find_map(Sentiment::scan)
            }
            ReplyShape::FlatText(text) => Sentiment::scan(text),
        }
    }
}

fn extract_label(reply: &ResponsesReply) -> Option<Sentiment> {
    let shapes = [
        ReplyShape::StructuredParts(&reply.output),
        ReplyShape::FlatText(reply.output_text.as_deref().unwrap_or_default()),
    ];
    shapes.iter().find_map(ReplyShape::find_label)
}

// ── Key check ────────────────────────────────────────────────────

/// Outcome of a credential check against the models endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    /// Key accepted; the account can list these models.
    Valid { models: Vec<String> },
    /// The service rejected the key itself.
    AuthFailed,
    /// Key accepted but the account lacks model access.
    PermissionDenied,
    /// Key accepted but the account is currently rate limited.
    RateLimited,
    /// The service could not be reached or answered unexpectedly.
    Unreachable(String),
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    #[serde(default)]
    id: String,
}

// ── Remote arbiter ───────────────────────────────────────────────

/// HTTP-backed arbiter implementation.
pub struct RemoteArbiter {
    api_base: String,
    api_key: String,
    model: String,
    max_output_tokens: u32,
    client: reqwest::Client,
}

impl RemoteArbiter {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_output_tokens: u32,
        timeout_secs: u64,
    ) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_output_tokens,
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .connect_timeout(std::time::Duration::from_secs(CONNECT_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// The instruction prompt embedding the review text. The model is told
    /// to answer with exactly one label token.
    fn build_prompt(text: &str) -> String {
        format!(
            "영화 리뷰 감성 분석. 무조건 '긍정', '부정', '중립' 중 하나만 출력.\n\n리뷰: {text}\n결과:"
        )
    }

    /// Validate the configured credential by listing available models.
    pub async fn check_key(&self) -> KeyStatus {
        let url = format!("{}/models", self.api_base);
        let resp = match self.client.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(resp) => resp,
            Err(e) => return KeyStatus::Unreachable(e.to_string()),
        };

        match resp.status().as_u16() {
            200 => match resp.json::<ModelList>().await {
                Ok(list) => {
                    let mut models: Vec<String> =
                        list.data.into_iter().map(|m| m.id).collect();
                    models.sort();
                    KeyStatus::Valid { models }
                }
                Err(e) => KeyStatus::Unreachable(format!("malformed model list: {e}")),
            },
            401 => KeyStatus::AuthFailed,
            403 => KeyStatus::PermissionDenied,
            429 => KeyStatus::RateLimited,
            status => KeyStatus::Unreachable(format!("unexpected status {status}")),
        }
    }
}

#[async_trait]
impl Arbiter for RemoteArbiter {
    async fn arbitrate(&self, text: &str) -> Result<Sentiment, ArbiterError> {
        let url = format!("{}/responses", self.api_base);
        let body = ResponsesRequest {
            model: &self.model,
            input: Self::build_prompt(text),
            max_output_tokens: self.max_output_tokens,
        };

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ArbiterError::Call(e.into()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ArbiterError::Call(anyhow::anyhow!(
                "arbiter service returned status {status}"
            )));
        }

        let reply: ResponsesReply = resp
            .json()
            .await
            .map_err(|e| ArbiterError::Call(e.into()))?;

        extract_label(&reply).ok_or(ArbiterError::Parse)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_arbiter(base: &str) -> RemoteArbiter {
        RemoteArbiter::new(base, "test-key", DEFAULT_ARBITER_MODEL, 256, 5)
    }

    #[test]
    fn extract_label_structured_shape() {
        let reply: ResponsesReply = serde_json::from_value(json!({
            "output": [
                {"type": "message", "content": [
                    {"type": "output_text", "text": "결과: 긍정"}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(extract_label(&reply), Some(Sentiment::Positive));
    }

    #[test]
    fn extract_label_item_level_text() {
        let reply: ResponsesReply = serde_json::from_value(json!({
            "output": [{"type": "output_text", "text": "부정"}]
        }))
        .unwrap();
        assert_eq!(extract_label(&reply), Some(Sentiment::Negative));
    }

    #[test]
    fn extract_label_flat_shape_fallback() {
        let reply: ResponsesReply = serde_json::from_value(json!({
            "output": [],
            "output_text": "중립입니다"
        }))
        .unwrap();
        assert_eq!(extract_label(&reply), Some(Sentiment::Neutral));
    }

    #[test]
    fn structured_shape_takes_priority_over_flat() {
        let reply: ResponsesReply = serde_json::from_value(json!({
            "output": [
                {"content": [{"type": "text", "text": "긍정"}]}
            ],
            "output_text": "부정"
        }))
        .unwrap();
        assert_eq!(extract_label(&reply), Some(Sentiment::Positive));
    }

    #[test]
    fn non_text_parts_are_skipped() {
        let reply: ResponsesReply = serde_json::from_value(json!({
            "output": [
                {"content": [
                    {"type": "reasoning", "text": "긍정"},
                    {"type": "output_text", "text": "부정"}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(extract_label(&reply), Some(Sentiment::Negative));
    }

    #[test]
    fn extract_label_none_when_no_token() {
        let reply: ResponsesReply = serde_json::from_value(json!({
            "output": [{"content": [{"type": "output_text", "text": "잘 모르겠어요"}]}],
            "output_text": "no label here"
        }))
        .unwrap();
        assert_eq!(extract_label(&reply), None);
    }

    #[tokio::test]
    async fn arbitrate_parses_structured_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": DEFAULT_ARBITER_MODEL,
                "max_output_tokens": 256
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": [
                    {"type": "message", "content": [
                        {"type": "output_text", "text": "긍정"}
                    ]}
                ]
            })))
            .mount(&server)
            .await;

        let arbiter = make_arbiter(&server.uri());
        let label = arbiter.arbitrate("최고의 영화").await.unwrap();
        assert_eq!(label, Sentiment::Positive);
    }

    #[tokio::test]
    async fn arbitrate_parses_flat_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output_text": "결과: 부정"
            })))
            .mount(&server)
            .await;

        let arbiter = make_arbiter(&server.uri());
        let label = arbiter.arbitrate("시간 낭비").await.unwrap();
        assert_eq!(label, Sentiment::Negative);
    }

    #[tokio::test]
    async fn arbitrate_unrecognizable_reply_is_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output_text": "I cannot help with that"
            })))
            .mount(&server)
            .await;

        let arbiter = make_arbiter(&server.uri());
        let err = arbiter.arbitrate("애매한 리뷰").await.unwrap_err();
        assert!(matches!(err, ArbiterError::Parse));
    }

    #[tokio::test]
    async fn arbitrate_non_2xx_is_call_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let arbiter = make_arbiter(&server.uri());
        let err = arbiter.arbitrate("리뷰").await.unwrap_err();
        assert!(matches!(err, ArbiterError::Call(_)));
    }

    #[tokio::test]
    async fn arbitrate_garbage_body_is_call_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let arbiter = make_arbiter(&server.uri());
        let err = arbiter.arbitrate("리뷰").await.unwrap_err();
        assert!(matches!(err, ArbiterError::Call(_)));
    }

    #[tokio::test]
    async fn arbitrate_unreachable_service_is_call_failure() {
        // Nothing listens on this port.
        let arbiter = make_arbiter("http://127.0.0.1:9");
        let err = arbiter.arbitrate("리뷰").await.unwrap_err();
        assert!(matches!(err, ArbiterError::Call(_)));
    }

    #[tokio::test]
    async fn check_key_valid_lists_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "gpt-5-mini"}, {"id": "gpt-5"}]
            })))
            .mount(&server)
            .await;

        let arbiter = make_arbiter(&server.uri());
        match arbiter.check_key().await {
            KeyStatus::Valid { models } => {
                assert_eq!(models, vec!["gpt-5".to_string(), "gpt-5-mini".to_string()]);
            }
            other => panic!("unexpected status: {other:?}"),
        }
    }

    #[tokio::test]
    async fn check_key_classifies_failures() {
        for (status, expected) in [
            (401, KeyStatus::AuthFailed),
            (403, KeyStatus::PermissionDenied),
            (429, KeyStatus::RateLimited),
        ] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/models"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let arbiter = make_arbiter(&server.uri());
            assert_eq!(arbiter.check_key().await, expected);
        }
    }

    #[test]
    fn prompt_embeds_the_review_text() {
        let prompt = RemoteArbiter::build_prompt("배우 연기가 좋았다");
        assert!(prompt.contains("배우 연기가 좋았다"));
        assert!(prompt.contains("'긍정', '부정', '중립'"));
    }

    #[test]
    fn trailing_slash_in_base_is_normalized() {
        let arbiter = RemoteArbiter::new("http://localhost:1234/v1/", "k", "m", 16, 1);
        assert_eq!(arbiter.api_base, "http://localhost:1234/v1");
    }
}
