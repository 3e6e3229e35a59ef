use crate::dataset::domain::dataset_error::DatasetError;
use crate::shared::frame::Frame;

/// Tabular fields stored alongside each frame, read without touching video.
#[derive(Clone, Debug, PartialEq)]
pub struct RawRecord {
    pub episode_index: u64,
    pub timestamp: f64,
}

/// One fully materialized dataset item: every camera stream decoded at
/// the item's timestamp.
#[derive(Clone, Debug)]
pub struct Sample {
    pub index: usize,
    pub record: RawRecord,
    pub images: Vec<(String, Frame)>,
}

/// Random-access view over a frame dataset.
///
/// `get` may fail for an individual index without the dataset as a whole
/// being unusable. `raw` is a cheaper accessor used for diagnostics.
pub trait FrameDataset {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&mut self, index: usize) -> Result<Sample, DatasetError>;

    fn raw(&self, index: usize) -> Result<RawRecord, DatasetError>;
}
