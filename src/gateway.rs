use anyhow::Context as _;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use engine::{gateway::APPLICATION_JSON, Document, ExtractionGateway};
use http_body_util::{BodyExt as _, Full, Limited};
use hyper::{
    body::Bytes,
    header::{HeaderValue, CONTENT_TYPE},
    Request, StatusCode, Uri,
};
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde_json::{json, Value};

/// Upper bound on a `generateContent` response body.
const MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;

const PROMPT: &str = "\
You are given a multiple-choice exam as a PDF. Extract every question in the document. \
Respond with a single JSON object of the form \
{\"questions\": [{\"questionNumber\": 1, \"questionText\": \"...\", \"passage\": \"...\", \
\"options\": [{\"key\": \"A\", \"value\": \"...\"}], \"correctAnswer\": \"A\", \"questionType\": \"...\"}]}. \
Copy any reading passage shared by several questions into the `passage` of each of them and \
leave it empty otherwise. Use the answer key of the document for `correctAnswer`. \
Classify every question with a short `questionType` such as \"Vocabulary\" or \"Grammar\". \
Do not add commentary outside the JSON.";

type HttpClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Asks a Gemini model to turn a PDF into a question payload.
pub struct GeminiGateway {
    client: HttpClient,
    endpoint: Uri,
    api_key: HeaderValue,
}

impl GeminiGateway {
    pub fn new(api_key: &str, model: &str) -> anyhow::Result<Self> {
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .context("cannot load the native root certificates")?
            .https_only()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(https);
        let endpoint =
            format!("https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent").parse()?;
        let mut api_key = HeaderValue::from_str(api_key)?;
        api_key.set_sensitive(true);
        Ok(Self { client, endpoint, api_key })
    }

    fn request_body(document: &Document) -> Value {
        json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": &*document.mime, "data": STANDARD.encode(&document.bytes) } },
                    { "text": PROMPT },
                ]
            }],
            "generationConfig": { "responseMimeType": APPLICATION_JSON },
        })
    }

    async fn generate(&self, document: &Document) -> anyhow::Result<String> {
        let body = serde_json::to_vec(&Self::request_body(document))?;
        let req = Request::post(self.endpoint.clone())
            .header(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON))
            .header("x-goog-api-key", self.api_key.clone())
            .body(Full::new(Bytes::from(body)))?;

        let res = self.client.request(req).await?;
        let status = res.status();
        let is_json = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with(APPLICATION_JSON));

        let bytes = Limited::new(res.into_body(), MAX_RESPONSE_BYTES)
            .collect()
            .await
            .map_err(|err| anyhow::anyhow!("cannot read the response body: {err}"))?
            .to_bytes();

        anyhow::ensure!(status == StatusCode::OK, "the model responded with {status}");
        anyhow::ensure!(is_json, "the model did not respond with JSON");

        let response: Value = serde_json::from_slice(&bytes)?;
        let text = candidate_text(&response).context("the response holds no candidate text")?;
        Ok(String::from(unfence(text)))
    }
}

impl ExtractionGateway for GeminiGateway {
    async fn extract(&self, document: Document) -> anyhow::Result<String> {
        anyhow::ensure!(document.is_pdf(), "only PDF documents can be sent to the model");
        self.generate(&document).await
    }
}

/// Routes PDFs to the model and replays documents that already are a question payload.
pub struct DocumentGateway {
    gemini: Option<GeminiGateway>,
}

impl DocumentGateway {
    pub const fn new(gemini: Option<GeminiGateway>) -> Self {
        Self { gemini }
    }
}

impl ExtractionGateway for DocumentGateway {
    async fn extract(&self, document: Document) -> anyhow::Result<String> {
        if &*document.mime == APPLICATION_JSON {
            log::debug!("Replaying the pre-extracted payload `{}`.", document.name);
            return Ok(String::from_utf8(document.bytes.into_vec())?);
        }
        let gemini = self.gemini.as_ref().context("GEMINI_API_KEY is required to import PDF documents")?;
        gemini.extract(document).await
    }
}

/// First text part of the first candidate of a `generateContent` response.
fn candidate_text(response: &Value) -> Option<&str> {
    response
        .pointer("/candidates/0/content/parts")?
        .as_array()?
        .iter()
        .find_map(|part| part.get("text")?.as_str())
}

/// Strips a surrounding Markdown code fence, if any.
fn unfence(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the info string of the opening fence.
    let inner = inner.split_once('\n').map_or("", |(_, rest)| rest);
    inner.trim_end().strip_suffix("```").unwrap_or(inner).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfence_plain_json() {
        assert_eq!(unfence("  {\"questions\":[]}\n"), "{\"questions\":[]}");
    }

    #[test]
    fn unfence_code_block() {
        assert_eq!(unfence("```json\n{\"questions\":[]}\n```"), "{\"questions\":[]}");
        assert_eq!(unfence("```\n{}\n```\n"), "{}");
    }

    #[test]
    fn unfence_unterminated_block() {
        assert_eq!(unfence("```json\n{}"), "{}");
    }

    #[test]
    fn finds_candidate_text() {
        let response = json!({
            "candidates": [{
                "content": { "parts": [{ "inlineData": {} }, { "text": "{\"questions\":[]}" }] }
            }]
        });
        assert_eq!(candidate_text(&response), Some("{\"questions\":[]}"));
    }

    #[test]
    fn missing_candidates() {
        assert_eq!(candidate_text(&json!({ "promptFeedback": { "blockReason": "OTHER" } })), None);
        assert_eq!(candidate_text(&json!({ "candidates": [] })), None);
    }

    #[test]
    fn request_inlines_the_document() {
        let document = Document::pdf("exam.pdf", b"%PDF".to_vec());
        let body = GeminiGateway::request_body(&document);
        let inline = &body["contents"][0]["parts"][0]["inlineData"];
        assert_eq!(inline["mimeType"], "application/pdf");
        assert_eq!(inline["data"], "JVBERg==");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[tokio::test]
    async fn replays_json_documents() {
        let gateway = DocumentGateway::new(None);
        let document = Document::new("exam.json", APPLICATION_JSON, b"{\"questions\":[]}".to_vec());
        assert_eq!(gateway.extract(document).await.unwrap(), "{\"questions\":[]}");
    }

    #[tokio::test]
    async fn pdf_requires_a_model() {
        let gateway = DocumentGateway::new(None);
        assert!(gateway.extract(Document::pdf("exam.pdf", b"%PDF".to_vec())).await.is_err());
    }
}
