use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dataset::domain::dataset_error::DatasetError;
use crate::dataset::domain::frame_dataset::RawRecord;

/// Subset of `meta/info.json` needed to locate frames.
#[derive(Clone, Debug, Deserialize)]
pub struct DatasetInfo {
    #[serde(default)]
    pub codebase_version: Option<String>,
    pub fps: f64,
    #[serde(default)]
    pub total_frames: Option<usize>,
    #[serde(default)]
    pub total_episodes: Option<usize>,
    #[serde(default = "default_chunks_size")]
    pub chunks_size: u64,
    pub video_path: Option<String>,
    #[serde(default)]
    pub features: BTreeMap<String, Feature>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Feature {
    pub dtype: String,
}

/// One line of `meta/episodes.jsonl`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct EpisodeEntry {
    pub episode_index: u64,
    pub length: usize,
}

fn default_chunks_size() -> u64 {
    1000
}

impl DatasetInfo {
    pub fn load(root: &Path) -> Result<Self, DatasetError> {
        let path = root.join("meta").join("info.json");
        let text = fs::read_to_string(&path)
            .map_err(|e| DatasetError::Metadata(format!("{}: {e}", path.display())))?;
        let info: DatasetInfo = serde_json::from_str(&text)
            .map_err(|e| DatasetError::Metadata(format!("{}: {e}", path.display())))?;
        if info.fps <= 0.0 {
            return Err(DatasetError::Metadata(format!(
                "fps must be positive, got {}",
                info.fps
            )));
        }
        Ok(info)
    }

    /// Keys of features stored as video, in sorted order.
    pub fn video_keys(&self) -> Vec<String> {
        self.features
            .iter()
            .filter(|(_, f)| f.dtype == "video")
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Resolves the video file for one camera of one episode.
    pub fn video_file(
        &self,
        root: &Path,
        video_key: &str,
        episode_index: u64,
    ) -> Result<PathBuf, DatasetError> {
        let template = self
            .video_path
            .as_deref()
            .ok_or_else(|| DatasetError::Metadata("info.json has no video_path".into()))?;
        let chunk = episode_index / self.chunks_size.max(1);
        let relative = render_path_template(
            template,
            &[
                ("episode_chunk", TemplateValue::Int(chunk)),
                ("episode_index", TemplateValue::Int(episode_index)),
                ("video_key", TemplateValue::Str(video_key)),
            ],
        )?;
        Ok(root.join(relative))
    }
}

pub fn load_episodes(root: &Path) -> Result<Vec<EpisodeEntry>, DatasetError> {
    let path = root.join("meta").join("episodes.jsonl");
    let text = fs::read_to_string(&path)
        .map_err(|e| DatasetError::Metadata(format!("{}: {e}", path.display())))?;
    let mut episodes = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: EpisodeEntry = serde_json::from_str(line).map_err(|e| {
            DatasetError::Metadata(format!("{}:{}: {e}", path.display(), line_no + 1))
        })?;
        episodes.push(entry);
    }
    episodes.sort_by_key(|e| e.episode_index);
    Ok(episodes)
}

pub enum TemplateValue<'a> {
    Int(u64),
    Str(&'a str),
}

/// Renders a Python-style path template such as
/// `videos/chunk-{episode_chunk:03d}/{video_key}/episode_{episode_index:06d}.mp4`.
///
/// Supports plain `{name}` and zero-padded integer `{name:0Nd}` fields.
pub fn render_path_template(
    template: &str,
    values: &[(&str, TemplateValue<'_>)],
) -> Result<String, DatasetError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let close = rest[open..]
            .find('}')
            .map(|i| open + i)
            .ok_or_else(|| DatasetError::Metadata(format!("unclosed field in '{template}'")))?;
        let field = &rest[open + 1..close];
        let (name, spec) = match field.split_once(':') {
            Some((n, s)) => (n, Some(s)),
            None => (field, None),
        };
        let value = values
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
            .ok_or_else(|| DatasetError::Metadata(format!("unknown field '{name}' in '{template}'")))?;

        match (value, spec) {
            (TemplateValue::Int(n), Some(spec)) => {
                let (zero_pad, width) = parse_int_width(spec).ok_or_else(|| {
                    DatasetError::Metadata(format!("unsupported format '{spec}' in '{template}'"))
                })?;
                if zero_pad {
                    out.push_str(&format!("{n:0width$}"));
                } else {
                    out.push_str(&format!("{n:width$}"));
                }
            }
            (TemplateValue::Int(n), None) => out.push_str(&n.to_string()),
            (TemplateValue::Str(s), None) => out.push_str(s),
            (TemplateValue::Str(_), Some(spec)) => {
                return Err(DatasetError::Metadata(format!(
                    "format '{spec}' not valid for string field '{name}'"
                )))
            }
        }
        rest = &rest[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Parses `0Nd` / `Nd` / `d` into `(zero_pad, minimum width)`.
fn parse_int_width(spec: &str) -> Option<(bool, usize)> {
    let digits = spec.strip_suffix('d')?;
    let (zero_pad, width) = match digits.strip_prefix('0') {
        Some(rest) => (true, rest),
        None => (false, digits),
    };
    if width.is_empty() {
        return Some((zero_pad, 0));
    }
    if !width.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    width.parse().ok().map(|w| (zero_pad, w))
}

/// Maps global frame indices onto `(episode, frame_in_episode)` pairs.
#[derive(Clone, Debug)]
pub struct EpisodeIndex {
    /// `(episode_index, first_global_index, length)` in episode order.
    spans: Vec<(u64, usize, usize)>,
    total: usize,
    fps: f64,
}

impl EpisodeIndex {
    pub fn new(episodes: &[EpisodeEntry], fps: f64) -> Self {
        let mut spans = Vec::with_capacity(episodes.len());
        let mut start = 0;
        for e in episodes {
            spans.push((e.episode_index, start, e.length));
            start += e.length;
        }
        Self {
            spans,
            total: start,
            fps,
        }
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Returns `(episode_index, frame_in_episode)` for a global index.
    pub fn locate(&self, index: usize) -> Result<(u64, usize), DatasetError> {
        if index >= self.total {
            return Err(DatasetError::IndexOutOfRange {
                index,
                len: self.total,
            });
        }
        // Spans are sorted by start, so the owner is the last span starting at or before `index`.
        let pos = self.spans.partition_point(|&(_, start, _)| start <= index) - 1;
        let (episode, start, _) = self.spans[pos];
        Ok((episode, index - start))
    }

    pub fn record(&self, index: usize) -> Result<RawRecord, DatasetError> {
        let (episode_index, offset) = self.locate(index)?;
        Ok(RawRecord {
            episode_index,
            timestamp: offset as f64 / self.fps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    const LEROBOT_TEMPLATE: &str =
        "videos/chunk-{episode_chunk:03d}/{video_key}/episode_{episode_index:06d}.mp4";

    fn episodes(lengths: &[usize]) -> Vec<EpisodeEntry> {
        lengths
            .iter()
            .enumerate()
            .map(|(i, &length)| EpisodeEntry {
                episode_index: i as u64,
                length,
            })
            .collect()
    }

    #[test]
    fn test_render_lerobot_template() {
        let path = render_path_template(
            LEROBOT_TEMPLATE,
            &[
                ("episode_chunk", TemplateValue::Int(0)),
                ("episode_index", TemplateValue::Int(42)),
                ("video_key", TemplateValue::Str("observation.images.wrist")),
            ],
        )
        .unwrap();
        assert_eq!(
            path,
            "videos/chunk-000/observation.images.wrist/episode_000042.mp4"
        );
    }

    #[rstest]
    #[case::plain("{n}", "7")]
    #[case::padded("{n:04d}", "0007")]
    #[case::no_zero("{n:d}", "7")]
    #[case::unpadded_width("{n:3d}", "  7")]
    #[case::zero_only("{n:0d}", "7")]
    #[case::literal_only("abc", "abc")]
    fn test_render_int_formats(#[case] template: &str, #[case] expected: &str) {
        let out = render_path_template(template, &[("n", TemplateValue::Int(7))]).unwrap();
        assert_eq!(out, expected);
    }

    #[rstest]
    #[case("{n:xyzd}")]
    #[case("{n:0x3d}")]
    #[case("{n:-3d}")]
    #[case("{n:03}")]
    fn test_render_malformed_int_format_is_error(#[case] template: &str) {
        let err = render_path_template(template, &[("n", TemplateValue::Int(7))]).unwrap_err();
        assert!(err.to_string().contains("unsupported format"), "{err}");
    }

    #[test]
    fn test_render_unknown_field_is_error() {
        let result = render_path_template("{missing}", &[("n", TemplateValue::Int(1))]);
        assert!(matches!(result, Err(DatasetError::Metadata(_))));
    }

    #[test]
    fn test_render_unclosed_field_is_error() {
        let result = render_path_template("chunk-{n", &[("n", TemplateValue::Int(1))]);
        assert!(result.is_err());
    }

    #[test]
    fn test_locate_across_episodes() {
        let index = EpisodeIndex::new(&episodes(&[3, 2, 4]), 30.0);
        assert_eq!(index.len(), 9);
        assert_eq!(index.locate(0).unwrap(), (0, 0));
        assert_eq!(index.locate(2).unwrap(), (0, 2));
        assert_eq!(index.locate(3).unwrap(), (1, 0));
        assert_eq!(index.locate(4).unwrap(), (1, 1));
        assert_eq!(index.locate(5).unwrap(), (2, 0));
        assert_eq!(index.locate(8).unwrap(), (2, 3));
    }

    #[test]
    fn test_locate_skips_empty_episodes() {
        let index = EpisodeIndex::new(&episodes(&[2, 0, 1]), 10.0);
        assert_eq!(index.locate(2).unwrap(), (2, 0));
    }

    #[test]
    fn test_locate_out_of_range() {
        let index = EpisodeIndex::new(&episodes(&[2]), 10.0);
        let err = index.locate(2).unwrap_err();
        assert_eq!(err.kind(), "IndexOutOfRange");
    }

    #[test]
    fn test_record_timestamp_from_offset() {
        let index = EpisodeIndex::new(&episodes(&[30, 30]), 30.0);
        let rec = index.record(45).unwrap();
        assert_eq!(rec.episode_index, 1);
        assert_relative_eq!(rec.timestamp, 0.5);
    }

    #[test]
    fn test_info_load_and_video_keys() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("meta")).unwrap();
        fs::write(
            dir.path().join("meta/info.json"),
            r#"{
                "codebase_version": "v2.1",
                "fps": 30,
                "total_frames": 5,
                "total_episodes": 2,
                "chunks_size": 1000,
                "video_path": "videos/chunk-{episode_chunk:03d}/{video_key}/episode_{episode_index:06d}.mp4",
                "features": {
                    "observation.images.top": {"dtype": "video"},
                    "observation.state": {"dtype": "float32"},
                    "observation.images.wrist": {"dtype": "video"}
                }
            }"#,
        )
        .unwrap();

        let info = DatasetInfo::load(dir.path()).unwrap();
        assert_relative_eq!(info.fps, 30.0);
        assert_eq!(info.codebase_version.as_deref(), Some("v2.1"));
        assert_eq!(info.total_episodes, Some(2));
        assert_eq!(
            info.video_keys(),
            vec!["observation.images.top", "observation.images.wrist"]
        );
        let file = info
            .video_file(dir.path(), "observation.images.top", 1234)
            .unwrap();
        assert_eq!(
            file,
            dir.path()
                .join("videos/chunk-001/observation.images.top/episode_001234.mp4")
        );
    }

    #[test]
    fn test_info_rejects_zero_fps() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("meta")).unwrap();
        fs::write(dir.path().join("meta/info.json"), r#"{"fps": 0}"#).unwrap();
        assert!(DatasetInfo::load(dir.path()).is_err());
    }

    #[test]
    fn test_load_episodes_sorted_and_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("meta")).unwrap();
        fs::write(
            dir.path().join("meta/episodes.jsonl"),
            "{\"episode_index\": 1, \"tasks\": [\"insert\"], \"length\": 4}\n\n{\"episode_index\": 0, \"length\": 2}\n",
        )
        .unwrap();
        let eps = load_episodes(dir.path()).unwrap();
        assert_eq!(
            eps,
            vec![
                EpisodeEntry {
                    episode_index: 0,
                    length: 2
                },
                EpisodeEntry {
                    episode_index: 1,
                    length: 4
                },
            ]
        );
    }
}
