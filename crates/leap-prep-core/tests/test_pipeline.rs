mod common;

use ndarray::{Array3, Axis};
use tempfile::TempDir;

use leap_prep_core::error::PrepError;
use leap_prep_core::frame::FrameRange;
use leap_prep_core::output::{to_output_tensor, write_stack};
use leap_prep_core::pipeline::config::{BackgroundMethod, MemoryStrategy, PrepConfig};
use leap_prep_core::pipeline::{
    prepare_stack, run_prep, run_prep_with_source, NoOpReporter, PipelineStage,
    ProgressReporter,
};
use leap_prep_core::source::MemorySource;

use common::{
    build_ser_from_stack, is_subject, read_npz_box, synthetic_video, write_test_ser,
    FailingSource,
};

const FRAMES: usize = 20;
const SIZE: usize = 8;

fn base_config(input: &std::path::Path, output: &std::path::Path) -> PrepConfig {
    let mut config = PrepConfig::new(input, output);
    config.bkg_sep = 2;
    config.memory = MemoryStrategy::Eager;
    config
}

fn run_to_bytes(config: &PrepConfig) -> (Vec<usize>, Vec<u8>) {
    run_prep(config).unwrap();
    read_npz_box(&config.output)
}

#[test]
fn test_end_to_end_ser_to_npz() {
    let video = synthetic_video(FRAMES, SIZE, SIZE);
    let ser = write_test_ser(&build_ser_from_stack(&video));
    let dir = TempDir::new().unwrap();
    let config = base_config(ser.path(), &dir.path().join("out.npz"));

    let output = run_prep(&config).unwrap();
    assert_eq!(output.total_frames, FRAMES);
    assert_eq!(output.range, FrameRange::full(FRAMES));
    assert!(!output.streamed);
    assert!((output.background_mean.unwrap() - 200.0).abs() < 1e-3);

    let (shape, data) = read_npz_box(&config.output);
    assert_eq!(shape, vec![FRAMES, SIZE, SIZE, 1]);
    assert_eq!(data.len(), FRAMES * SIZE * SIZE);
    for f in 0..FRAMES {
        for r in 0..SIZE {
            for c in 0..SIZE {
                let v = data[(f * SIZE + r) * SIZE + c];
                let expected = if is_subject(f, r, c, SIZE) { 255 } else { 5 };
                assert_eq!(v, expected, "frame {f} pixel ({r}, {c})");
            }
        }
    }
    assert!(!dir.path().join("out.npz.partial").exists());
}

#[test]
fn test_explicit_full_range_matches_default() {
    let video = synthetic_video(FRAMES, SIZE, SIZE);
    let ser = write_test_ser(&build_ser_from_stack(&video));
    let dir = TempDir::new().unwrap();

    let default = base_config(ser.path(), &dir.path().join("a.npz"));
    let mut explicit = base_config(ser.path(), &dir.path().join("b.npz"));
    explicit.frame_range = Some(FrameRange::new(0, FRAMES));

    assert_eq!(run_to_bytes(&default), run_to_bytes(&explicit));
}

#[test]
fn test_overlong_range_is_clamped() {
    let video = synthetic_video(FRAMES, SIZE, SIZE);
    let ser = write_test_ser(&build_ser_from_stack(&video));
    let dir = TempDir::new().unwrap();

    let mut config = base_config(ser.path(), &dir.path().join("out.npz"));
    config.frame_range = Some(FrameRange::new(0, FRAMES + 1000));
    let output = run_prep(&config).unwrap();
    assert_eq!(output.range, FrameRange::new(0, FRAMES));

    let (shape, _) = read_npz_box(&config.output);
    assert_eq!(shape[0], FRAMES);
}

#[test]
fn test_range_past_end_is_rejected() {
    let mut source = MemorySource::new(synthetic_video(4, SIZE, SIZE));
    let dir = TempDir::new().unwrap();
    let mut config = PrepConfig::new("mem", dir.path().join("out.npz"));
    config.frame_range = Some(FrameRange::new(4, 1));
    let err = run_prep_with_source(&config, &mut source, &NoOpReporter).unwrap_err();
    assert!(matches!(err, PrepError::InvalidRange { start: 4, total: 4 }));
}

#[test]
fn test_sub_range_uses_whole_video_background() {
    let video = synthetic_video(FRAMES, SIZE, SIZE);
    let mut config = PrepConfig::new("mem", "unused.npz");
    config.bkg_sep = 2;

    let full = prepare_stack(&config, &mut MemorySource::new(video.clone()), &NoOpReporter).unwrap();
    config.frame_range = Some(FrameRange::new(5, 4));
    let part = prepare_stack(&config, &mut MemorySource::new(video), &NoOpReporter).unwrap();

    assert_eq!(part.dim(), (4, SIZE, SIZE));
    for i in 0..4 {
        assert_eq!(
            part.index_axis(Axis(0), i),
            full.index_axis(Axis(0), 5 + i)
        );
    }
}

#[test]
fn test_streaming_matches_eager() {
    let video = synthetic_video(FRAMES, SIZE, SIZE);
    let ser = write_test_ser(&build_ser_from_stack(&video));
    let dir = TempDir::new().unwrap();

    for range in [None, Some(FrameRange::new(3, 7))] {
        let mut eager = base_config(ser.path(), &dir.path().join("eager.npz"));
        eager.frame_range = range;
        let mut streaming = base_config(ser.path(), &dir.path().join("streaming.npz"));
        streaming.frame_range = range;
        streaming.memory = MemoryStrategy::Streaming;

        let out = run_prep(&streaming).unwrap();
        assert!(out.streamed);
        assert_eq!(run_to_bytes(&eager), read_npz_box(&streaming.output));
    }
}

#[test]
fn test_subtraction_rejected_before_decoding() {
    let dir = TempDir::new().unwrap();
    let mut config = base_config(
        &dir.path().join("does-not-exist.ser"),
        &dir.path().join("out.npz"),
    );
    config.bkg_method = BackgroundMethod::Sub;
    let err = run_prep(&config).unwrap_err();
    assert!(matches!(err, PrepError::UnsupportedMethod(_)));

    // A source that would fail on its first decode is never touched.
    let mut source = FailingSource::new(synthetic_video(4, SIZE, SIZE), 0);
    let err = run_prep_with_source(&config, &mut source, &NoOpReporter).unwrap_err();
    assert!(matches!(err, PrepError::UnsupportedMethod(_)));
}

#[test]
fn test_decode_failure_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    for memory in [MemoryStrategy::Eager, MemoryStrategy::Streaming] {
        let out_path = dir.path().join("out.npz");
        let mut config = PrepConfig::new("mem", &out_path);
        config.memory = memory;

        let mut source = FailingSource::new(synthetic_video(100, SIZE, SIZE), 10);
        let err = run_prep_with_source(&config, &mut source, &NoOpReporter).unwrap_err();
        assert!(matches!(err, PrepError::Decode(_)), "{memory}: {err}");
        assert!(!out_path.exists(), "{memory}");
        assert!(!dir.path().join("out.npz.partial").exists(), "{memory}");
    }
}

#[test]
fn test_truncated_ser_is_a_decode_error() {
    let video = synthetic_video(5, SIZE, SIZE);
    let mut bytes = build_ser_from_stack(&video);
    bytes.truncate(bytes.len() - SIZE * SIZE);
    let ser = write_test_ser(&bytes);
    let dir = TempDir::new().unwrap();

    let config = base_config(ser.path(), &dir.path().join("out.npz"));
    assert!(matches!(run_prep(&config), Err(PrepError::Decode(_))));
}

#[test]
fn test_prenormalized_passthrough() {
    // Already normalized input: 1 = background, 0 = dark subject.
    let mut video = Array3::<u8>::ones((3, 4, 4));
    video[[1, 2, 2]] = 0;
    let mut config = PrepConfig::new("mem", "unused.npz");
    config.remove_bkg = false;
    // Ignored when the background is not removed.
    config.bkg_method = BackgroundMethod::Sub;

    let out = prepare_stack(&config, &mut MemorySource::new(video), &NoOpReporter).unwrap();
    let tensor = to_output_tensor(out.view());
    assert_eq!(tensor.dim(), (3, 4, 4, 1));
    assert_eq!(tensor[[1, 2, 2, 0]], 255);
    assert_eq!(tensor[[1, 0, 0, 0]], 5);
    assert!(tensor.index_axis(Axis(0), 0).iter().all(|&v| v == 5));
}

#[test]
fn test_output_overwrites_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("out.npz");
    std::fs::write(&path, b"stale").unwrap();

    let stack = Array3::<f32>::from_elem((2, 3, 3), 5.0);
    write_stack(&path, &stack).unwrap();
    let (shape, data) = read_npz_box(&path);
    assert_eq!(shape, vec![2, 3, 3, 1]);
    assert!(data.iter().all(|&v| v == 5));
}

#[cfg(not(feature = "hdf5"))]
#[test]
fn test_hdf5_output_requires_feature() {
    let dir = TempDir::new().unwrap();
    let stack = Array3::<f32>::zeros((1, 2, 2));
    let err = write_stack(&dir.path().join("out.h5"), &stack).unwrap_err();
    assert!(matches!(err, PrepError::Output(_)));
}

struct RecordingReporter {
    stages: std::cell::RefCell<Vec<PipelineStage>>,
}

impl ProgressReporter for RecordingReporter {
    fn begin_stage(&self, stage: PipelineStage, _total_items: Option<usize>) {
        self.stages.borrow_mut().push(stage);
    }
}

#[test]
fn test_reporter_sees_stages_in_order() {
    let dir = TempDir::new().unwrap();
    let config = {
        let mut c = PrepConfig::new("mem", dir.path().join("out.npz"));
        c.memory = MemoryStrategy::Eager;
        c.frame_range = Some(FrameRange::new(2, 3));
        c
    };
    let reporter = RecordingReporter {
        stages: Default::default(),
    };
    let mut source = MemorySource::new(synthetic_video(FRAMES, SIZE, SIZE));
    run_prep_with_source(&config, &mut source, &reporter).unwrap();

    assert_eq!(
        *reporter.stages.borrow(),
        vec![
            PipelineStage::Reading,
            PipelineStage::Background,
            PipelineStage::Normalizing,
            PipelineStage::Contrast,
            PipelineStage::Writing,
        ]
    );
}

#[cfg(feature = "hdf5")]
#[test]
fn test_hdf5_output_matches_npz() {
    let video = synthetic_video(FRAMES, SIZE, SIZE);
    let ser = write_test_ser(&build_ser_from_stack(&video));
    let dir = TempDir::new().unwrap();

    let npz = base_config(ser.path(), &dir.path().join("out.npz"));
    let mut h5 = base_config(ser.path(), &dir.path().join("out.h5"));
    h5.frame_range = Some(FrameRange::new(4, 6));
    let mut npz_range = npz.clone();
    npz_range.frame_range = h5.frame_range;

    run_prep(&h5).unwrap();
    let (shape, data) = common::read_h5_box(&h5.output);
    assert_eq!(shape, vec![6, SIZE, SIZE, 1]);
    assert_eq!((shape, data), run_to_bytes(&npz_range));
}

#[cfg(feature = "hdf5")]
#[test]
fn test_hdf5_is_the_default_container() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("training_box");
    let stack = Array3::<f32>::from_elem((2, 3, 4), 254.9);
    write_stack(&path, &stack).unwrap();

    let (shape, data) = common::read_h5_box(&path);
    assert_eq!(shape, vec![2, 3, 4, 1]);
    assert!(data.iter().all(|&v| v == 254));
}

#[cfg(feature = "hdf5")]
#[test]
fn test_hdf5_decode_failure_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    for memory in [MemoryStrategy::Eager, MemoryStrategy::Streaming] {
        let out_path = dir.path().join("out.h5");
        let mut config = PrepConfig::new("mem", &out_path);
        config.memory = memory;

        let mut source = FailingSource::new(synthetic_video(100, SIZE, SIZE), 10);
        assert!(run_prep_with_source(&config, &mut source, &NoOpReporter).is_err());
        assert!(!out_path.exists(), "{memory}");
    }
}

#[test]
fn test_empty_range_is_rejected() {
    let dir = TempDir::new().unwrap();
    let out_path = dir.path().join("out.npz");
    let mut config = PrepConfig::new("mem", &out_path);
    config.frame_range = Some(FrameRange::new(2, 0));

    let mut source = MemorySource::new(synthetic_video(8, SIZE, SIZE));
    let err = run_prep_with_source(&config, &mut source, &NoOpReporter).unwrap_err();
    assert!(matches!(err, PrepError::EmptyRange { start: 2 }));
    assert!(!out_path.exists());
}

#[test]
fn test_huge_range_count_is_clamped() {
    let dir = TempDir::new().unwrap();
    let mut config = PrepConfig::new("mem", dir.path().join("out.npz"));
    config.bkg_sep = 2;
    config.frame_range = Some(FrameRange::new(3, usize::MAX));

    let mut source = MemorySource::new(synthetic_video(FRAMES, SIZE, SIZE));
    let output = run_prep_with_source(&config, &mut source, &NoOpReporter).unwrap();
    assert_eq!(output.range, FrameRange::new(3, FRAMES - 3));
    let (shape, _) = read_npz_box(&config.output);
    assert_eq!(shape, vec![FRAMES - 3, SIZE, SIZE, 1]);
}
