//! Pipeline orchestration.
//!
//! Sequences probe, planning, trim, compositing, watermarking,
//! concatenation and the final encode into one job with all-or-nothing
//! completion. Stages run strictly sequentially; each writes its
//! artifact into the job's private arena and the next reads it. On
//! failure every artifact is purged before the error surfaces; on
//! success only the final artifact leaves the arena. Uploaded assets
//! are never mutated.

use metrics::{counter, histogram};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::arena::JobArena;
use crate::command::FfmpegCommand;
use crate::compositor::{plan_filter, CompositeFilter};
use crate::concat::{
    add_silent_audio_command, concat_command, concat_list_content, harmonize_cta_command,
    plan_harmonization,
};
use crate::error::{MediaError, MediaResult, PipelineError, StageResultExt};
use crate::geometry::{GeometryPlan, DEFAULT_MAX_DIMENSION};
use crate::preview::generate_preview;
use crate::transcoder::{FfmpegTranscoder, RenderOptions, Transcoder};
use crate::trim::TrimDirective;
use crate::watermark::{check_watermark, overlay_filter_complex};
use clipforge_models::spec::SpecError;
use clipforge_models::{Job, ProcessingSpec, Stage, VideoAsset};

/// Filter label for the watermarked stream.
const WATERMARK_OUTPUT_LABEL: &str = "wmout";

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory for per-job arenas
    pub temp_root: PathBuf,
    /// Directory receiving final artifacts
    pub output_dir: PathBuf,
    /// Fixed component of the engine invocation timeout
    pub timeout_base_secs: u64,
    /// Timeout added per second of input media
    pub timeout_secs_per_input_second: f64,
    /// Longest canvas side emitted by geometry planning
    pub max_dimension: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let temp = std::env::temp_dir().join("clipforge");
        Self {
            temp_root: temp.join("work"),
            output_dir: temp.join("out"),
            timeout_base_secs: 120,
            timeout_secs_per_input_second: 2.0,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// Result of a finished job.
#[derive(Debug)]
pub struct PipelineOutput {
    /// Path of the final artifact
    pub output_path: PathBuf,
    /// Probed metadata of the final artifact
    pub asset: VideoAsset,
    /// Terminal job record
    pub job: Job,
}

/// The pipeline orchestrator.
///
/// Independent jobs may run concurrently on one instance; each job's
/// writes stay inside its own arena.
pub struct Pipeline {
    config: PipelineConfig,
    transcoder: Arc<dyn Transcoder>,
}

impl Pipeline {
    /// Create a pipeline driving FFmpeg.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_transcoder(config, Arc::new(FfmpegTranscoder))
    }

    /// Create a pipeline with a custom engine implementation.
    pub fn with_transcoder(config: PipelineConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        Self { config, transcoder }
    }

    /// Execute one processing job to completion.
    pub async fn process(
        &self,
        spec: ProcessingSpec,
        main_path: &Path,
        cta_path: Option<&Path>,
    ) -> Result<PipelineOutput, PipelineError> {
        self.process_cancellable(spec, main_path, cta_path, None)
            .await
    }

    /// Execute one processing job with caller-initiated cancellation.
    ///
    /// Flipping the watch value to `true` terminates any in-flight
    /// engine invocation and discards the arena.
    pub async fn process_cancellable(
        &self,
        spec: ProcessingSpec,
        main_path: &Path,
        cta_path: Option<&Path>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<PipelineOutput, PipelineError> {
        let started = Instant::now();
        counter!("pipeline_jobs_total", "status" => "started").increment(1);

        // Validation failures surface before any side effect
        validate_spec(&spec).at_stage(Stage::Planning)?;

        let mut job = Job::new(spec);
        info!(job_id = %job.id, "Accepted processing job");

        let arena = JobArena::create(&self.config.temp_root, &job.id)
            .await
            .at_stage(Stage::Planning)?;

        match self
            .run_stages(&mut job, &arena, main_path, cta_path, cancel)
            .await
        {
            Ok((final_artifact, asset)) => {
                let dest = self
                    .config
                    .output_dir
                    .join(format!("processed_{}.mp4", short_id(&job.id)));
                if let Err(e) = arena.release(&final_artifact, &dest).await {
                    let err = PipelineError::new(Stage::Encoding, e);
                    job.fail(err.to_string());
                    arena.purge().await;
                    counter!("pipeline_jobs_total", "status" => "failed").increment(1);
                    return Err(err);
                }

                job.succeed();
                counter!("pipeline_jobs_total", "status" => "succeeded").increment(1);
                histogram!("pipeline_job_seconds").record(started.elapsed().as_secs_f64());
                info!(job_id = %job.id, output = %dest.display(), "Job succeeded");
                Ok(PipelineOutput {
                    output_path: dest,
                    asset,
                    job,
                })
            }
            Err(err) => {
                job.fail(err.to_string());
                arena.purge().await;
                counter!("pipeline_jobs_total", "status" => "failed").increment(1);
                warn!(job_id = %job.id, stage = %err.stage, "Job failed: {}", err.source);
                Err(err)
            }
        }
    }

    /// Render a one-frame preview of the spec's geometry settings.
    pub async fn preview(
        &self,
        spec: &ProcessingSpec,
        main_path: &Path,
    ) -> Result<Vec<u8>, PipelineError> {
        validate_spec(spec).at_stage(Stage::Planning)?;

        let asset = self
            .transcoder
            .probe(main_path)
            .await
            .at_stage(Stage::Probing)?;

        generate_preview(
            self.transcoder.as_ref(),
            spec,
            &asset,
            &self.config.temp_root,
        )
        .await
        .at_stage(Stage::Compositing)
    }

    async fn run_stages(
        &self,
        job: &mut Job,
        arena: &JobArena,
        main_path: &Path,
        cta_path: Option<&Path>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<(PathBuf, VideoAsset), PipelineError> {
        let spec = job.spec.clone();
        let encoding = spec.quality_preset.resolve();

        // ------------------------------------------------------------
        // Probing
        // ------------------------------------------------------------
        job.enter_stage(Stage::Probing);
        let main_asset = self
            .transcoder
            .probe(main_path)
            .await
            .at_stage(Stage::Probing)?;
        info!(
            job_id = %job.id,
            main = %main_path.display(),
            dims = format!("{}x{}", main_asset.width, main_asset.height),
            fps = main_asset.fps,
            duration = main_asset.duration,
            has_audio = main_asset.has_audio,
            "Probed main asset"
        );

        let cta_asset = match (spec.enable_cta, cta_path) {
            (true, Some(path)) => {
                let cta_id = spec.cta_video_id.clone().unwrap_or_default();
                let asset = self
                    .transcoder
                    .probe(path)
                    .await
                    .map_err(|e| MediaError::incompatible(cta_id, e.to_string()))
                    .at_stage(Stage::Probing)?;
                Some(asset)
            }
            (true, None) => {
                return Err(MediaError::Spec(SpecError::MissingCtaVideo))
                    .at_stage(Stage::Probing)
            }
            _ => None,
        };

        // ------------------------------------------------------------
        // Planning
        // ------------------------------------------------------------
        job.enter_stage(Stage::Planning);
        let trim = spec
            .time_range()
            .map(|range| TrimDirective::resolve(range, main_asset.duration))
            .transpose()
            .at_stage(Stage::Planning)?;

        let geometry = spec
            .ratio_change()
            .map(|(ratio, method)| {
                GeometryPlan::compute_with_max(
                    main_asset.width,
                    main_asset.height,
                    ratio,
                    method,
                    self.config.max_dimension,
                )
            })
            .transpose()
            .at_stage(Stage::Planning)?;

        let watermark = spec.watermark();
        if let Some(wm) = &watermark {
            check_watermark(wm).at_stage(Stage::Planning)?;
        }

        let total_input_secs =
            main_asset.duration + cta_asset.as_ref().map(|a| a.duration).unwrap_or(0.0);
        let options = RenderOptions {
            timeout_secs: Some(
                self.config.timeout_base_secs
                    + (self.config.timeout_secs_per_input_second * total_input_secs).ceil() as u64,
            ),
            cancel,
        };

        let mut current = main_path.to_path_buf();
        let mut transformed = false;

        // ------------------------------------------------------------
        // Trimming
        // ------------------------------------------------------------
        if let Some(trim) = trim {
            job.enter_stage(Stage::Trimming);
            let out = arena.artifact("trimmed.mp4");
            let cmd = FfmpegCommand::new(&current, &out)
                .seek(trim.start)
                .duration(trim.duration)
                .encoding(&encoding);
            self.render(Stage::Trimming, &cmd, &options).await?;
            job.record_artifact(out.clone());
            current = out;
            transformed = true;
        }

        // ------------------------------------------------------------
        // Compositing
        // ------------------------------------------------------------
        if let Some(plan) = &geometry {
            let filter = plan_filter(plan, spec.pad_color, spec.blur_options().as_ref());
            if filter == CompositeFilter::Identity {
                debug!(job_id = %job.id, "Source already matches target ratio, skipping composite");
            } else {
                job.enter_stage(Stage::Compositing);
                let out = arena.artifact("composited.mp4");
                let cmd = match filter {
                    CompositeFilter::Chain(chain) => {
                        FfmpegCommand::new(&current, &out).video_filter(chain)
                    }
                    CompositeFilter::Graph {
                        filter,
                        output_label,
                    } => FfmpegCommand::new(&current, &out)
                        .filter_complex(filter)
                        .map(format!("[{output_label}]"))
                        .map("0:a?"),
                    CompositeFilter::Identity => unreachable!(),
                };
                self.render(Stage::Compositing, &cmd.encoding(&encoding), &options)
                    .await?;
                job.record_artifact(out.clone());
                current = out;
                transformed = true;
            }
        }

        // ------------------------------------------------------------
        // Watermarking
        // ------------------------------------------------------------
        if let Some(wm) = &watermark {
            job.enter_stage(Stage::Watermarking);
            let (canvas_width, canvas_height) = geometry
                .as_ref()
                .map(|p| (p.canvas_width, p.canvas_height))
                .unwrap_or((main_asset.width, main_asset.height));
            let filter = overlay_filter_complex(
                wm,
                canvas_width,
                canvas_height,
                "0:v",
                WATERMARK_OUTPUT_LABEL,
            );

            let out = arena.artifact("watermarked.mp4");
            let cmd = FfmpegCommand::new(&current, &out)
                .add_input(&wm.image_path)
                .filter_complex(filter)
                .map(format!("[{WATERMARK_OUTPUT_LABEL}]"))
                .map("0:a?")
                .encoding(&encoding);
            self.render(Stage::Watermarking, &cmd, &options).await?;
            job.record_artifact(out.clone());
            current = out;
            transformed = true;
        }

        // ------------------------------------------------------------
        // Concatenating
        // ------------------------------------------------------------
        if let Some(cta) = &cta_asset {
            job.enter_stage(Stage::Concatenating);

            // Stream-copy concatenation needs both segments on the same
            // profile; an untouched primary gets normalized first.
            let primary_path = if transformed {
                current.clone()
            } else {
                let normalized = arena.artifact("primary_normalized.mp4");
                let cmd = FfmpegCommand::new(&current, &normalized).encoding(&encoding);
                self.render(Stage::Concatenating, &cmd, &options).await?;
                job.record_artifact(normalized.clone());
                normalized
            };

            let primary = self
                .transcoder
                .probe(&primary_path)
                .await
                .at_stage(Stage::Concatenating)?;
            let harmonize = plan_harmonization(&primary, cta);
            debug!(job_id = %job.id, plan = ?harmonize, "Harmonizing CTA clip");

            let cta_out = arena.artifact("cta_harmonized.mp4");
            let cmd = harmonize_cta_command(
                &cta.path,
                &cta_out,
                &harmonize,
                spec.pad_color,
                &encoding,
            );
            self.render(Stage::Concatenating, &cmd, &options).await?;
            job.record_artifact(cta_out.clone());

            let primary_final = if harmonize.primary_needs_silence {
                let silenced = arena.artifact("primary_silenced.mp4");
                let cmd = add_silent_audio_command(&primary_path, &silenced, &encoding);
                self.render(Stage::Concatenating, &cmd, &options).await?;
                job.record_artifact(silenced.clone());
                silenced
            } else {
                primary_path
            };

            let list = arena.artifact("concat.txt");
            tokio::fs::write(&list, concat_list_content(&[primary_final, cta_out]))
                .await
                .map_err(MediaError::from)
                .at_stage(Stage::Concatenating)?;
            job.record_artifact(list.clone());

            let out = arena.artifact("concatenated.mp4");
            let cmd = concat_command(&list, &out);
            self.render(Stage::Concatenating, &cmd, &options).await?;
            job.record_artifact(out.clone());
            current = out;
        }

        // ------------------------------------------------------------
        // Encoding
        // ------------------------------------------------------------
        // Always re-encode to the resolved profile so the output is
        // playable regardless of the source container.
        job.enter_stage(Stage::Encoding);
        let final_out = arena.artifact("final.mp4");
        let cmd = FfmpegCommand::new(&current, &final_out)
            .encoding(&encoding)
            .faststart();
        self.render(Stage::Encoding, &cmd, &options).await?;
        job.record_artifact(final_out.clone());

        let output_asset = self
            .transcoder
            .probe(&final_out)
            .await
            .at_stage(Stage::Encoding)?;

        Ok((final_out, output_asset))
    }

    /// Run one engine invocation, recording its duration per stage.
    async fn render(
        &self,
        stage: Stage,
        cmd: &FfmpegCommand,
        options: &RenderOptions,
    ) -> Result<(), PipelineError> {
        let started = Instant::now();
        let result = self.transcoder.render_stream(cmd, options).await;
        histogram!("pipeline_stage_seconds", "stage" => stage.as_str())
            .record(started.elapsed().as_secs_f64());
        result.at_stage(stage)
    }
}

/// Full request validation: field ranges plus cross-field consistency.
fn validate_spec(spec: &ProcessingSpec) -> MediaResult<()> {
    spec.validate().map_err(SpecError::from)?;
    spec.check_consistency()?;
    Ok(())
}

fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcoder::MockTranscoder;
    use clipforge_models::{AspectRatio, JobStatus, QualityPreset, ResizeMethod, WatermarkPosition};
    use tempfile::TempDir;

    struct TestEnv {
        _base: TempDir,
        config: PipelineConfig,
    }

    fn test_env() -> TestEnv {
        let base = TempDir::new().unwrap();
        let config = PipelineConfig {
            temp_root: base.path().join("work"),
            output_dir: base.path().join("out"),
            ..Default::default()
        };
        TestEnv {
            _base: base,
            config,
        }
    }

    fn probe_result(path: &Path, has_audio: bool) -> MediaResult<VideoAsset> {
        Ok(VideoAsset {
            id: "probed".into(),
            path: path.to_path_buf(),
            duration: 30.0,
            width: 1920,
            height: 1080,
            fps: 30.0,
            has_audio,
        })
    }

    #[tokio::test]
    async fn test_minimal_job_normalizes_and_succeeds() {
        let env = test_env();
        let mut transcoder = MockTranscoder::new();
        transcoder
            .expect_probe()
            .times(2) // main asset + final artifact
            .returning(|path| probe_result(path, true));
        transcoder
            .expect_render_stream()
            .times(1) // final encode only
            .returning(|cmd, _| {
                std::fs::write(cmd.output_path(), b"rendered").unwrap();
                Ok(())
            });

        let pipeline = Pipeline::with_transcoder(env.config.clone(), Arc::new(transcoder));
        let output = pipeline
            .process(
                ProcessingSpec::default(),
                Path::new("/uploads/main.mp4"),
                None,
            )
            .await
            .unwrap();

        assert_eq!(output.job.status, JobStatus::Succeeded);
        assert!(output.output_path.exists());
        // Only the final artifact leaves the arena; the arena is gone
        let leftovers: Vec<_> = std::fs::read_dir(&env.config.temp_root)
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_full_pipeline_runs_all_stages() {
        let env = test_env();
        let watermark_file = env._base.path().join("logo.png");
        std::fs::write(&watermark_file, b"png").unwrap();

        let mut transcoder = MockTranscoder::new();
        // main, cta, primary artifact before harmonization, final
        transcoder
            .expect_probe()
            .times(4)
            .returning(|path| probe_result(path, true));
        // trim + composite + watermark + harmonize + concat + final
        transcoder
            .expect_render_stream()
            .times(6)
            .returning(|cmd, _| {
                std::fs::write(cmd.output_path(), b"rendered").unwrap();
                Ok(())
            });

        let spec = ProcessingSpec {
            enable_time_crop: true,
            start_time: Some(5.0),
            end_time: Some(15.0),
            enable_ratio_change: true,
            target_ratio: Some(AspectRatio::PORTRAIT),
            resize_method: ResizeMethod::Pad,
            blur_background: true,
            enable_cta: true,
            cta_video_id: Some("cta-1".into()),
            quality_preset: QualityPreset::Medium,
            watermark_file: Some(watermark_file),
            watermark_position: Some(WatermarkPosition::BottomRight),
            ..Default::default()
        };

        let pipeline = Pipeline::with_transcoder(env.config.clone(), Arc::new(transcoder));
        let output = pipeline
            .process(
                spec,
                Path::new("/uploads/main.mp4"),
                Some(Path::new("/uploads/cta.mp4")),
            )
            .await
            .unwrap();

        assert_eq!(output.job.status, JobStatus::Succeeded);
        assert_eq!(output.job.stage, Some(Stage::Encoding));
        // trimmed, composited, watermarked, cta_harmonized, concat.txt,
        // concatenated, final
        assert_eq!(output.job.temp_artifacts.len(), 7);
        assert!(output.output_path.exists());
    }

    #[tokio::test]
    async fn test_failure_purges_all_artifacts() {
        let env = test_env();
        let mut transcoder = MockTranscoder::new();
        transcoder
            .expect_probe()
            .returning(|path| probe_result(path, true));
        transcoder.expect_render_stream().returning(|_, _| {
            Err(MediaError::encoding_failed(
                "boom",
                Some("stderr tail".into()),
                Some(1),
            ))
        });

        let spec = ProcessingSpec {
            enable_time_crop: true,
            start_time: Some(5.0),
            end_time: Some(15.0),
            ..Default::default()
        };

        let pipeline = Pipeline::with_transcoder(env.config.clone(), Arc::new(transcoder));
        let err = pipeline
            .process(spec, Path::new("/uploads/main.mp4"), None)
            .await
            .unwrap_err();

        assert_eq!(err.stage, Stage::Trimming);
        assert!(matches!(err.source, MediaError::EncodingFailed { .. }));
        // No partial output, no leftover arena
        let leftovers: Vec<_> = std::fs::read_dir(&env.config.temp_root)
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
        assert!(!env.config.output_dir.exists()
            || std::fs::read_dir(&env.config.output_dir).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_validation_rejected_before_any_engine_call() {
        let env = test_env();
        // No expectations: any engine call would panic the test
        let transcoder = MockTranscoder::new();

        let spec = ProcessingSpec {
            enable_time_crop: true,
            // Missing start/end
            ..Default::default()
        };

        let pipeline = Pipeline::with_transcoder(env.config.clone(), Arc::new(transcoder));
        let err = pipeline
            .process(spec, Path::new("/uploads/main.mp4"), None)
            .await
            .unwrap_err();

        assert_eq!(err.stage, Stage::Planning);
        assert!(err.source.is_validation());
    }

    #[tokio::test]
    async fn test_out_of_range_blur_strength_rejected() {
        let env = test_env();
        let transcoder = MockTranscoder::new();

        let spec = ProcessingSpec {
            blur_strength: 99,
            ..Default::default()
        };

        let pipeline = Pipeline::with_transcoder(env.config.clone(), Arc::new(transcoder));
        let err = pipeline
            .process(spec, Path::new("/uploads/main.mp4"), None)
            .await
            .unwrap_err();
        assert!(err.source.is_validation());
    }

    #[tokio::test]
    async fn test_concat_synthesizes_silence_for_mute_primary() {
        let env = test_env();
        let mut transcoder = MockTranscoder::new();
        // Main video has no audio, CTA does
        transcoder.expect_probe().returning(|path| {
            let is_main_side = !path.to_string_lossy().contains("cta");
            probe_result(path, !is_main_side)
        });
        // normalize + harmonize + silence + concat + final
        transcoder
            .expect_render_stream()
            .times(5)
            .returning(|cmd, _| {
                std::fs::write(cmd.output_path(), b"rendered").unwrap();
                Ok(())
            });

        let spec = ProcessingSpec {
            enable_cta: true,
            cta_video_id: Some("cta-1".into()),
            ..Default::default()
        };

        let pipeline = Pipeline::with_transcoder(env.config.clone(), Arc::new(transcoder));
        let output = pipeline
            .process(
                spec,
                Path::new("/uploads/main.mp4"),
                Some(Path::new("/uploads/cta.mp4")),
            )
            .await
            .unwrap();

        assert!(output
            .job
            .temp_artifacts
            .iter()
            .any(|p| p.ends_with("primary_silenced.mp4")));
    }

    #[tokio::test]
    async fn test_cta_enabled_without_path_fails_cleanly() {
        let env = test_env();
        let mut transcoder = MockTranscoder::new();
        transcoder
            .expect_probe()
            .times(1)
            .returning(|path| probe_result(path, true));

        let spec = ProcessingSpec {
            enable_cta: true,
            cta_video_id: Some("cta-1".into()),
            ..Default::default()
        };

        let pipeline = Pipeline::with_transcoder(env.config.clone(), Arc::new(transcoder));
        let err = pipeline
            .process(spec, Path::new("/uploads/main.mp4"), None)
            .await
            .unwrap_err();
        assert_eq!(err.stage, Stage::Probing);
    }

    #[tokio::test]
    async fn test_preview_goes_through_transcoder_frame_path() {
        let env = test_env();
        let mut transcoder = MockTranscoder::new();
        transcoder
            .expect_probe()
            .times(1)
            .returning(|path| probe_result(path, true));
        transcoder
            .expect_render_frame()
            .times(1)
            .returning(|cmd, _| {
                std::fs::write(cmd.output_path(), b"frame").unwrap();
                Ok(())
            });

        let spec = ProcessingSpec {
            enable_ratio_change: true,
            target_ratio: Some(AspectRatio::PORTRAIT),
            resize_method: ResizeMethod::Crop,
            ..Default::default()
        };

        let pipeline = Pipeline::with_transcoder(env.config.clone(), Arc::new(transcoder));
        let bytes = pipeline
            .preview(&spec, Path::new("/uploads/main.mp4"))
            .await
            .unwrap();
        assert_eq!(bytes, b"frame");
    }
}
