use std::collections::BTreeMap;

use crate::shared::frame::Frame;

/// One named output of an inference run.
#[derive(Clone, Debug)]
pub enum PredictionValue {
    Image(Frame),
    Json(serde_json::Value),
}

/// Result of running a model on one frame: named output fields.
#[derive(Clone, Debug, Default)]
pub struct Prediction {
    fields: BTreeMap<String, PredictionValue>,
}

impl Prediction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, name: &str, frame: Frame) -> Self {
        self.insert(name, PredictionValue::Image(frame));
        self
    }

    pub fn with_json(mut self, name: &str, value: serde_json::Value) -> Self {
        self.insert(name, PredictionValue::Json(value));
        self
    }

    pub fn insert(&mut self, name: &str, value: PredictionValue) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&PredictionValue> {
        self.fields.get(name)
    }

    /// Returns the named field if it holds an image.
    pub fn image(&self, name: &str) -> Option<&Frame> {
        match self.fields.get(name) {
            Some(PredictionValue::Image(frame)) => Some(frame),
            _ => None,
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
