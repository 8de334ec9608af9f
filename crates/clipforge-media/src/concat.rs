//! CTA clip harmonization and concatenation.
//!
//! A CTA clip is made structurally compatible with the primary output
//! (resolution, frame rate, audio-track presence) before being appended
//! with the concat demuxer. The append itself is a stream copy since
//! both segments are encoded with the same profile by then.

use std::path::{Path, PathBuf};

use crate::command::FfmpegCommand;
use clipforge_models::{EncodingConfig, PadColor, VideoAsset};

/// Lavfi source synthesizing a silent stereo track.
pub const SILENT_AUDIO_SOURCE: &str = "anullsrc=channel_layout=stereo:sample_rate=44100";

/// Resolved harmonization decisions for one primary/CTA pair.
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonizePlan {
    /// Primary output resolution the CTA must match exactly
    pub target_width: u32,
    pub target_height: u32,
    /// Primary frame rate the CTA is resampled to
    pub target_fps: f64,
    /// Whether the concatenated output carries audio at all
    pub output_has_audio: bool,
    /// Whether a silent track must be synthesized for the CTA
    pub cta_needs_silence: bool,
    /// Whether a silent track must be synthesized for the primary
    pub primary_needs_silence: bool,
}

/// Decide how to harmonize a CTA clip against the primary output.
///
/// The output has audio if either input does; whichever side lacks a
/// track gets silence so the whole stream makes one audio decision.
pub fn plan_harmonization(primary: &VideoAsset, cta: &VideoAsset) -> HarmonizePlan {
    let output_has_audio = primary.has_audio || cta.has_audio;

    HarmonizePlan {
        target_width: primary.width,
        target_height: primary.height,
        target_fps: primary.fps,
        output_has_audio,
        cta_needs_silence: output_has_audio && !cta.has_audio,
        primary_needs_silence: output_has_audio && !primary.has_audio,
    }
}

impl HarmonizePlan {
    /// Filter chain fitting the CTA into the primary's canvas.
    ///
    /// Scale-to-fit plus centered solid padding (same math as the Pad
    /// compositor path), then frame-rate resampling.
    pub fn video_filter(&self, pad_color: PadColor) -> String {
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,\
             pad={w}:{h}:(ow-iw)/2:(oh-ih)/2:color={color},\
             fps={fps:.3}",
            w = self.target_width,
            h = self.target_height,
            color = pad_color.to_ffmpeg(),
            fps = self.target_fps,
        )
    }
}

/// Build the command re-rendering the CTA into a compatible segment.
pub fn harmonize_cta_command(
    cta_path: &Path,
    output: &Path,
    plan: &HarmonizePlan,
    pad_color: PadColor,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    let cmd = FfmpegCommand::new(cta_path, output).video_filter(plan.video_filter(pad_color));

    if plan.cta_needs_silence {
        cmd.add_lavfi_input(SILENT_AUDIO_SOURCE)
            .map("0:v")
            .map("1:a")
            .shortest()
            .encoding(encoding)
    } else if plan.output_has_audio {
        cmd.map("0:v").map("0:a").encoding(encoding)
    } else {
        cmd.map("0:v").encoding(encoding)
    }
}

/// Build the command attaching a silent track to an already-rendered
/// segment without touching its video stream.
pub fn add_silent_audio_command(
    input: &Path,
    output: &Path,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    FfmpegCommand::new(input, output)
        .add_lavfi_input(SILENT_AUDIO_SOURCE)
        .map("0:v")
        .map("1:a")
        .shortest()
        .output_args(["-c:v", "copy"])
        .output_args([
            "-c:a".to_string(),
            encoding.audio_codec.clone(),
            "-b:a".to_string(),
            encoding.audio_bitrate.clone(),
        ])
}

/// Concat demuxer list contents for a set of segments.
pub fn concat_list_content(segments: &[PathBuf]) -> String {
    segments
        .iter()
        .map(|p| format!("file '{}'", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the stream-copy concatenation command.
pub fn concat_command(list_path: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new(list_path, output)
        .input_args(["-f", "concat", "-safe", "0"])
        .codec_copy()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(width: u32, height: u32, fps: f64, has_audio: bool) -> VideoAsset {
        VideoAsset {
            id: "test".into(),
            path: PathBuf::from("/tmp/test.mp4"),
            duration: 10.0,
            width,
            height,
            fps,
            has_audio,
        }
    }

    #[test]
    fn test_audio_decision_matrix() {
        let cases = [
            // (primary, cta) -> (out, cta_silence, primary_silence)
            (true, true, true, false, false),
            (true, false, true, true, false),
            (false, true, true, false, true),
            (false, false, false, false, false),
        ];
        for (primary_audio, cta_audio, out, cta_silence, primary_silence) in cases {
            let plan = plan_harmonization(
                &asset(1080, 1920, 30.0, primary_audio),
                &asset(1920, 1080, 25.0, cta_audio),
            );
            assert_eq!(plan.output_has_audio, out);
            assert_eq!(plan.cta_needs_silence, cta_silence);
            assert_eq!(plan.primary_needs_silence, primary_silence);
        }
    }

    #[test]
    fn test_harmonize_targets_primary() {
        let plan = plan_harmonization(
            &asset(1080, 1920, 30.0, true),
            &asset(1280, 720, 24.0, true),
        );
        assert_eq!((plan.target_width, plan.target_height), (1080, 1920));
        assert_eq!(plan.target_fps, 30.0);

        let filter = plan.video_filter(PadColor::BLACK);
        assert!(filter.contains("scale=1080:1920:force_original_aspect_ratio=decrease"));
        assert!(filter.contains("pad=1080:1920"));
        assert!(filter.contains("fps=30.000"));
    }

    #[test]
    fn test_harmonize_command_with_silence() {
        let plan = plan_harmonization(
            &asset(1080, 1920, 30.0, true),
            &asset(1920, 1080, 30.0, false),
        );
        let cmd = harmonize_cta_command(
            Path::new("cta.mp4"),
            Path::new("cta_h.mp4"),
            &plan,
            PadColor::BLACK,
            &EncodingConfig::default(),
        );
        let args = cmd.build_args();
        assert!(args.iter().any(|a| a.starts_with("anullsrc")));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(args.contains(&"1:a".to_string()));
    }

    #[test]
    fn test_concat_list() {
        let content = concat_list_content(&[
            PathBuf::from("/tmp/a/main.mp4"),
            PathBuf::from("/tmp/a/cta.mp4"),
        ]);
        assert_eq!(content, "file '/tmp/a/main.mp4'\nfile '/tmp/a/cta.mp4'");
    }

    #[test]
    fn test_concat_command_is_stream_copy() {
        let cmd = concat_command(Path::new("list.txt"), Path::new("out.mp4"));
        let args = cmd.build_args();
        assert!(args.contains(&"concat".to_string()));
        assert!(args.contains(&"copy".to_string()));
        // No re-encode flags
        assert!(!args.contains(&"-crf".to_string()));
    }
}
