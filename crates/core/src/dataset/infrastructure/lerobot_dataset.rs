use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::dataset::domain::dataset_error::DatasetError;
use crate::dataset::domain::frame_dataset::{FrameDataset, RawRecord, Sample};
use crate::dataset::infrastructure::dataset_info::{load_episodes, DatasetInfo, EpisodeIndex};
use crate::shared::constants::TIMESTAMP_TOLERANCE_S;
use crate::video::infrastructure::ffmpeg_frame_seeker::FfmpegFrameSeeker;

const LEROBOT_HOME_ENV: &str = "HF_LEROBOT_HOME";

/// Local root of a downloaded dataset: `$HF_LEROBOT_HOME/<repo_id>`, or
/// `~/.cache/huggingface/lerobot/<repo_id>` when the variable is unset.
pub fn default_root(repo_id: &str) -> Result<PathBuf, DatasetError> {
    if let Some(home) = std::env::var_os(LEROBOT_HOME_ENV) {
        return Ok(PathBuf::from(home).join(repo_id));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| DatasetError::Metadata("could not determine home directory".into()))?;
    Ok(root_under_home(&home, repo_id))
}

fn root_under_home(home: &Path, repo_id: &str) -> PathBuf {
    home.join(".cache")
        .join("huggingface")
        .join("lerobot")
        .join(repo_id)
}

/// A LeRobot (v2.x layout) dataset stored on local disk.
///
/// Frame `i` is the `i`-th row across all episodes in episode order.
/// Materializing a frame decodes every camera stream at the row's
/// timestamp; tabular data is not loaded.
pub struct LeRobotDataset {
    root: PathBuf,
    info: DatasetInfo,
    index: EpisodeIndex,
    video_keys: Vec<String>,
    tolerance_s: f64,
    /// Open decoder per camera, tagged with the episode it belongs to.
    cursors: HashMap<String, (u64, FfmpegFrameSeeker)>,
}

impl LeRobotDataset {
    pub fn open(root: &Path) -> Result<Self, DatasetError> {
        let info = DatasetInfo::load(root)?;
        let episodes = load_episodes(root)?;
        let index = EpisodeIndex::new(&episodes, info.fps);
        let video_keys = info.video_keys();

        if let Some(expected) = info.total_frames {
            if expected != index.len() {
                log::warn!(
                    "info.json reports {expected} frames but episodes.jsonl sums to {}",
                    index.len()
                );
            }
        }
        if let Some(expected) = info.total_episodes {
            if expected != episodes.len() {
                log::warn!(
                    "info.json reports {expected} episodes but episodes.jsonl lists {}",
                    episodes.len()
                );
            }
        }
        log::info!(
            "Opened dataset {} (format {}, {} episodes, {} frames, {} fps, cameras: {})",
            root.display(),
            info.codebase_version.as_deref().unwrap_or("unversioned"),
            episodes.len(),
            index.len(),
            info.fps,
            video_keys.join(", ")
        );

        Ok(Self {
            root: root.to_path_buf(),
            info,
            index,
            video_keys,
            tolerance_s: TIMESTAMP_TOLERANCE_S,
            cursors: HashMap::new(),
        })
    }

    pub fn with_tolerance(mut self, tolerance_s: f64) -> Self {
        self.tolerance_s = tolerance_s;
        self
    }

    pub fn video_keys(&self) -> &[String] {
        &self.video_keys
    }

    fn cursor(&mut self, key: &str, episode: u64) -> Result<&mut FfmpegFrameSeeker, DatasetError> {
        let stale = !matches!(self.cursors.get(key), Some((ep, _)) if *ep == episode);
        if stale {
            let path = self.info.video_file(&self.root, key, episode)?;
            let seeker = FfmpegFrameSeeker::open(&path)?;
            self.cursors.insert(key.to_string(), (episode, seeker));
        }
        match self.cursors.get_mut(key) {
            Some((_, seeker)) => Ok(seeker),
            None => Err(DatasetError::Metadata(format!("no decoder for {key}"))),
        }
    }
}

impl FrameDataset for LeRobotDataset {
    fn len(&self) -> usize {
        self.index.len()
    }

    fn get(&mut self, index: usize) -> Result<Sample, DatasetError> {
        let record = self.index.record(index)?;
        let tolerance = self.tolerance_s;

        let mut images = Vec::with_capacity(self.video_keys.len());
        for key in self.video_keys.clone() {
            let seeker = self.cursor(&key, record.episode_index)?;
            let frame = seeker.frame_at(record.timestamp, tolerance)?;
            images.push((key, frame));
        }

        Ok(Sample {
            index,
            record,
            images,
        })
    }

    fn raw(&self, index: usize) -> Result<RawRecord, DatasetError> {
        self.index.record(index)
    }
}
