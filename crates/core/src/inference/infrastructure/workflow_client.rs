use std::io::Cursor;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::inference::domain::prediction::{Prediction, PredictionValue};
use crate::inference::domain::segmentation_model::SegmentationModel;
use crate::shared::frame::{Frame, PixelFormat};

const BASE64_TYPE: &str = "base64";
const DEFAULT_JPEG_QUALITY: u8 = 90;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("failed to encode frame as JPEG: {0}")]
    Encode(#[source] image::ImageError),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("workflow returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed workflow response: {0}")]
    Response(String),
    #[error("failed to decode image output '{field}': {message}")]
    ImageOutput { field: String, message: String },
}

/// Connection settings for a hosted workflow.
#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub api_url: String,
    pub workspace: String,
    pub workflow_id: String,
    pub api_key: String,
    pub jpeg_quality: u8,
    pub timeout: Duration,
}

impl WorkflowConfig {
    pub fn new(api_url: &str, workspace: &str, workflow_id: &str, api_key: &str) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            workspace: workspace.to_string(),
            workflow_id: workflow_id.to_string(),
            api_key: api_key.to_string(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}/workflows/{}",
            self.api_url, self.workspace, self.workflow_id
        )
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ImagePayload {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

#[derive(Serialize)]
struct WorkflowInputs {
    image: ImagePayload,
}

#[derive(Serialize)]
struct WorkflowRequest<'a> {
    api_key: &'a str,
    inputs: WorkflowInputs,
}

#[derive(Deserialize)]
struct WorkflowResponse {
    outputs: Vec<serde_json::Map<String, serde_json::Value>>,
}

/// Runs a hosted segmentation workflow over HTTP, one request per frame.
///
/// Frames are sent as base64 JPEG. Outputs shaped like
/// `{"type": "base64", "value": ...}` are decoded into RGB frames; every
/// other output is kept as JSON.
pub struct WorkflowClient {
    config: WorkflowConfig,
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl WorkflowClient {
    pub fn new(config: WorkflowConfig) -> Result<Self, WorkflowError> {
        let endpoint = config.endpoint();
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| WorkflowError::Request {
                url: endpoint.clone(),
                source,
            })?;
        log::info!(
            "Workflow client for {}/{} at {}",
            config.workspace,
            config.workflow_id,
            config.api_url
        );
        Ok(Self {
            config,
            endpoint,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn run(&self, frame: &Frame) -> Result<Prediction, WorkflowError> {
        let body = request_body(&self.config.api_key, frame, self.config.jpeg_quality)?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .map_err(|source| WorkflowError::Request {
                url: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        let text = response.text().map_err(|source| WorkflowError::Request {
            url: self.endpoint.clone(),
            source,
        })?;
        if !status.is_success() {
            return Err(WorkflowError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(&text, frame.index())
    }
}

impl SegmentationModel for WorkflowClient {
    fn infer(&mut self, frame: &Frame) -> Result<Prediction, Box<dyn std::error::Error>> {
        Ok(self.run(frame)?)
    }
}

fn request_body(api_key: &str, frame: &Frame, quality: u8) -> Result<Vec<u8>, WorkflowError> {
    let jpeg = encode_jpeg(frame, quality)?;
    let request = WorkflowRequest {
        api_key,
        inputs: WorkflowInputs {
            image: ImagePayload {
                kind: BASE64_TYPE.to_string(),
                value: STANDARD.encode(jpeg),
            },
        },
    };
    serde_json::to_vec(&request).map_err(|e| WorkflowError::Response(e.to_string()))
}

fn encode_jpeg(frame: &Frame, quality: u8) -> Result<Vec<u8>, WorkflowError> {
    let rgb;
    let pixels = match frame.format() {
        PixelFormat::Rgb24 => frame.data(),
        PixelFormat::Bgr24 => {
            rgb = frame.clone().into_rgb();
            rgb.data()
        }
    };

    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    image::ImageEncoder::write_image(
        encoder,
        pixels,
        frame.width(),
        frame.height(),
        image::ExtendedColorType::Rgb8,
    )
    .map_err(WorkflowError::Encode)?;
    Ok(buf.into_inner())
}

/// Parses the first workflow output into a [`Prediction`].
fn parse_response(text: &str, frame_index: usize) -> Result<Prediction, WorkflowError> {
    let response: WorkflowResponse =
        serde_json::from_str(text).map_err(|e| WorkflowError::Response(e.to_string()))?;
    let outputs = response
        .outputs
        .into_iter()
        .next()
        .ok_or_else(|| WorkflowError::Response("no outputs".into()))?;

    let mut prediction = Prediction::new();
    for (name, value) in outputs {
        let field = match serde_json::from_value::<ImagePayload>(value.clone()) {
            Ok(payload) if payload.kind == BASE64_TYPE => {
                PredictionValue::Image(decode_image(&name, &payload.value, frame_index)?)
            }
            _ => PredictionValue::Json(value),
        };
        prediction.insert(&name, field);
    }
    Ok(prediction)
}

fn decode_image(field: &str, encoded: &str, frame_index: usize) -> Result<Frame, WorkflowError> {
    let err = |message: String| WorkflowError::ImageOutput {
        field: field.to_string(),
        message,
    };
    let bytes = STANDARD.decode(encoded).map_err(|e| err(e.to_string()))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| err(e.to_string()))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Frame::rgb(img.into_raw(), width, height, frame_index))
}
