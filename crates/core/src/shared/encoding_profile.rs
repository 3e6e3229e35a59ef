use crate::shared::constants::{
    DEFAULT_CODEC, DEFAULT_CRF, DEFAULT_KEYFRAME_INTERVAL, DEFAULT_OUTPUT_FPS, DEFAULT_PRESET,
};

/// Encoder settings applied when an output stream is created.
///
/// The defaults reproduce the LeRobot video profile (SVT-AV1, crf 30,
/// keyframe every 2 frames, preset 12) so re-encoded clips can be dropped
/// into a training dataset unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodingProfile {
    pub codec: String,
    pub fps: u32,
    pub crf: Option<u32>,
    pub keyframe_interval: Option<u32>,
    pub preset: Option<u32>,
}

impl EncodingProfile {
    pub fn with_codec(mut self, codec: &str) -> Self {
        self.codec = codec.to_string();
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_crf(mut self, crf: u32) -> Self {
        self.crf = Some(crf);
        self
    }

    pub fn with_preset(mut self, preset: u32) -> Self {
        self.preset = Some(preset);
        self
    }

    /// Profile with no codec-private options, for encoders that reject them.
    pub fn bare(codec: &str, fps: u32) -> Self {
        Self {
            codec: codec.to_string(),
            fps,
            crf: None,
            keyframe_interval: None,
            preset: None,
        }
    }

    /// Encoder options as `(key, value)` pairs, in ffmpeg option names.
    pub fn options(&self) -> Vec<(&'static str, String)> {
        let mut options = Vec::new();
        if let Some(crf) = self.crf {
            options.push(("crf", crf.to_string()));
        }
        if let Some(g) = self.keyframe_interval {
            options.push(("g", g.to_string()));
        }
        if let Some(preset) = self.preset {
            options.push(("preset", preset.to_string()));
        }
        options
    }

    /// Human-readable option list, e.g. `crf=30, g=2, preset=12`.
    pub fn describe_options(&self) -> String {
        self.options()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self {
            codec: DEFAULT_CODEC.to_string(),
            fps: DEFAULT_OUTPUT_FPS,
            crf: Some(DEFAULT_CRF),
            keyframe_interval: Some(DEFAULT_KEYFRAME_INTERVAL),
            preset: Some(DEFAULT_PRESET),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_lerobot_profile() {
        let profile = EncodingProfile::default();
        assert_eq!(profile.codec, "libsvtav1");
        assert_eq!(profile.fps, 30);
        assert_eq!(
            profile.options(),
            vec![
                ("crf", "30".to_string()),
                ("g", "2".to_string()),
                ("preset", "12".to_string()),
            ]
        );
    }

    #[test]
    fn test_describe_options() {
        let profile = EncodingProfile::default();
        assert_eq!(profile.describe_options(), "crf=30, g=2, preset=12");
    }

    #[test]
    fn test_bare_profile_has_no_options() {
        let profile = EncodingProfile::bare("mpeg4", 25);
        assert!(profile.options().is_empty());
        assert_eq!(profile.describe_options(), "");
    }

    #[test]
    fn test_builders_override_fields() {
        let profile = EncodingProfile::default()
            .with_codec("libx264")
            .with_fps(60)
            .with_crf(18)
            .with_preset(4);
        assert_eq!(profile.codec, "libx264");
        assert_eq!(profile.fps, 60);
        assert_eq!(profile.crf, Some(18));
        assert_eq!(profile.preset, Some(4));
        assert_eq!(profile.keyframe_interval, Some(2));
    }
}
