//! # Integration Tests
//!
//! End-to-end tests over the full replay graph: synthetic recordings on
//! disk, parsed, synchronized, reconstructed, merged and dispatched.

pub mod synthetic;

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contracts_compile() {
        // The contracts crate is the frozen ICD; touch a few types
        let _ = contracts::ConfigVersion::V1;
        let _: contracts::DeviceId = "cam0".into();
        assert_eq!(contracts::StreamKind::Depth.tag(), b"RCST");
    }
}

#[cfg(test)]
mod seek_tests {
    use crate::synthetic::{write_device, MS};
    use aggregator::DevicePipeline;
    use contracts::PlaybackConfig;
    use tempfile::TempDir;

    #[test]
    fn test_backward_seek_replays_and_matches_forward() {
        let dir = TempDir::new().unwrap();
        let device = write_device(dir.path(), "A1", 4, 3, 30.0, 10, MS, 1000).unwrap();
        let mut pipeline = DevicePipeline::open(&device, &PlaybackConfig::default()).unwrap();

        // Forward to frame ~7, then back to frame ~2, then forward again
        let first = pipeline.seek_and_reconstruct(7 * 33 * MS).unwrap();
        let back = pipeline.seek_and_reconstruct(2 * 33 * MS).unwrap();
        let again = pipeline.seek_and_reconstruct(7 * 33 * MS).unwrap();

        assert_eq!(first.actual_ts_ns, again.actual_ts_ns);
        assert!(back.actual_ts_ns < first.actual_ts_ns);
        assert_eq!(first.points.len(), again.points.len());
    }

    #[test]
    fn test_frame_index_resolution_is_stable() {
        let dir = TempDir::new().unwrap();
        let device = write_device(dir.path(), "A1", 4, 3, 30.0, 10, MS, 1000).unwrap();
        let mut pipeline = DevicePipeline::open(&device, &PlaybackConfig::default()).unwrap();

        let ts_a = pipeline.timestamp_for_frame(4).unwrap();
        let ts_b = pipeline.timestamp_for_frame(4).unwrap();
        assert_eq!(ts_a, ts_b);

        let mut last = 0;
        for k in 0..12 {
            let ts = pipeline.timestamp_for_frame(k).unwrap();
            assert!(ts >= last);
            last = ts;
        }
    }
}

#[cfg(test)]
mod reconstruction_tests {
    use crate::synthetic::{write_color_stream, write_depth_stream, StreamSpec, MS};
    use calibration::CalibrationSet;
    use reconstruction::{ExecutionMode, PointCloudReconstructor, ReconstructOptions};
    use stream_parser::SensorStreamParser;
    use sync_engine::{FrameSeeker, StreamSynchronizer};
    use tempfile::TempDir;

    fn open_pair(dir: &TempDir, depth_raw: impl Fn(usize, u32, u32) -> u16) -> FrameSeeker {
        let depth_path = dir.path().join("d.rcs");
        let color_path = dir.path().join("c.rcs");
        let depth_spec = StreamSpec::at_rate("S1", 6, 4, 30.0, 4, 0);
        let color_spec = StreamSpec::at_rate("S1", 6, 4, 30.0, 4, MS);
        write_depth_stream(&depth_path, &depth_spec, depth_raw).unwrap();
        write_color_stream(&color_path, &color_spec, |_, u, v| {
            [(40 * u) as u8, (60 * v) as u8, 9]
        })
        .unwrap();

        let depth = SensorStreamParser::open(&depth_path).unwrap();
        let color = SensorStreamParser::open(&color_path).unwrap();
        FrameSeeker::new(depth, color, StreamSynchronizer::new(0.25, None))
    }

    fn calibration_for(seeker: &FrameSeeker) -> CalibrationSet {
        let device = crate::synthetic::device_config("S1", "d.rcs".into(), "c.rcs".into());
        CalibrationSet::assemble(seeker.depth_header(), seeker.color_header(), &device).unwrap()
    }

    #[test]
    fn test_sequential_and_batched_agree_on_disk_frames() {
        let dir = TempDir::new().unwrap();
        // Sparse depth with a zero hole pattern
        let mut seeker = open_pair(&dir, |_, u, v| if (u + v) % 3 == 0 { 0 } else { 900 + u as u16 });
        let calib = calibration_for(&seeker);

        seeker.seek_to_timestamp(0).unwrap();
        let (depth, color) = seeker.read_pair(false, false).unwrap();

        let sequential = PointCloudReconstructor::new(ReconstructOptions {
            execution: ExecutionMode::Sequential,
        })
        .reconstruct(depth, color, &calib)
        .unwrap();
        let batched = PointCloudReconstructor::new(ReconstructOptions {
            execution: ExecutionMode::Batched,
        })
        .reconstruct(depth, color, &calib)
        .unwrap();

        assert!(!sequential.is_empty());
        assert_eq!(sequential.len(), batched.len());
        for (s, b) in sequential.iter().zip(&batched) {
            assert_eq!(s.position, b.position);
            assert_eq!(s.color, b.color);
        }
        // 1/3 of the grid is zero depth and must be absent
        assert_eq!(sequential.len(), (6 * 4) - 8);
    }

    #[test]
    fn test_colors_come_from_projected_pixels() {
        let dir = TempDir::new().unwrap();
        let mut seeker = open_pair(&dir, |_, _, _| 1000);
        let calib = calibration_for(&seeker);

        seeker.seek_to_timestamp(0).unwrap();
        let (depth, color) = seeker.read_pair(false, false).unwrap();
        let points = PointCloudReconstructor::default()
            .reconstruct(depth, color, &calib)
            .unwrap();

        // Identity rig: every point lands in-bounds and carries color
        assert_eq!(points.len(), 6 * 4);
        assert!(points.iter().all(|p| p.has_color()));

        // JPEG is lossy; just require the red gradient to be increasing
        // across the first row
        let first_row: Vec<u8> = points[..6].iter().map(|p| p.color[0]).collect();
        assert!(first_row[5] > first_row[0]);
    }
}

#[cfg(test)]
mod e2e_tests {
    use crate::synthetic::{write_device, MS};
    use aggregator::MultiStreamAggregator;
    use contracts::{
        PlaybackConfig, RigBlueprint, SinkConfig, SinkType, TransformConfig,
    };
    use dispatcher::create_dispatcher;
    use observability::ReplayMetricsAggregator;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    const FPS: f64 = 30.0;
    const FRAMES: u64 = 10;

    /// Two-camera rig: 10 frames at 30 fps, each color stream 1ms behind
    /// its depth stream, camera B2 translated one meter along world x.
    fn two_camera_blueprint(dir: &TempDir) -> RigBlueprint {
        let cam1 = write_device(dir.path(), "A1", 4, 3, FPS, FRAMES, MS, 1000).unwrap();
        let mut cam2 = write_device(dir.path(), "B2", 4, 3, FPS, FRAMES, MS, 1000).unwrap();
        cam2.world_pose = Some(TransformConfig {
            rotation: TransformConfig::identity().rotation,
            translation_m: [1.0, 0.0, 0.0],
        });

        RigBlueprint {
            version: Default::default(),
            playback: PlaybackConfig::default(),
            devices: vec![cam1, cam2],
            sinks: vec![],
        }
    }

    #[test]
    fn test_two_camera_frame_five() {
        let dir = TempDir::new().unwrap();
        let aggregator = MultiStreamAggregator::open(&two_camera_blueprint(&dir)).unwrap();

        let target = aggregator.timestamp_for_frame(5).unwrap();
        let frame = aggregator.process_frame(target).unwrap();

        // Points from both cameras
        assert_eq!(frame.reports.len(), 2);
        assert_eq!(frame.failed_devices(), 0);
        assert_eq!(frame.points.len(), 2 * 4 * 3);

        // Camera 2's points are offset by its declared pose translation
        let cam1 = &frame.points[..4 * 3];
        let cam2 = &frame.points[4 * 3..];
        for (a, b) in cam1.iter().zip(cam2) {
            assert!((b.position.x - a.position.x - 1.0).abs() < 1e-6);
            assert!((b.position.y - a.position.y).abs() < 1e-6);
            assert!((b.position.z - a.position.z).abs() < 1e-6);
        }
    }

    #[test]
    fn test_playback_walks_the_whole_recording() {
        let dir = TempDir::new().unwrap();
        let aggregator = MultiStreamAggregator::open(&two_camera_blueprint(&dir)).unwrap();
        let period = aggregator.nominal_period_ns().unwrap();

        let mut metrics = ReplayMetricsAggregator::new();
        let mut target = aggregator.timestamp_for_frame(0).unwrap();
        let mut frames = 0u64;

        loop {
            match aggregator.process_frame(target) {
                Ok(frame) => {
                    metrics.update(&frame);
                    frames += 1;
                    target += period;
                }
                Err(contracts::ReplayError::SyncExhausted { .. }) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }

        assert_eq!(frames, FRAMES);
        let summary = metrics.summary();
        assert_eq!(summary.total_frames, FRAMES);
        assert_eq!(summary.total_points, FRAMES * 2 * 4 * 3);
        assert_eq!(summary.frames_with_failures, 0);
    }

    #[tokio::test]
    async fn test_frames_flow_to_ply_sink() {
        let dir = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        let mut blueprint = two_camera_blueprint(&dir);
        blueprint.sinks = vec![SinkConfig {
            name: "ply".into(),
            sink_type: SinkType::PlyFile,
            queue_capacity: 8,
            params: HashMap::from([(
                "base_path".to_string(),
                out_dir.path().display().to_string(),
            )]),
        }];

        let aggregator = MultiStreamAggregator::open(&blueprint).unwrap();
        let (tx, rx) = mpsc::channel(8);
        let dispatcher = create_dispatcher(blueprint.sinks.clone(), rx).unwrap();
        let dispatcher_handle = dispatcher.spawn();

        for k in [0u64, 1, 2] {
            let target = k * aggregator.nominal_period_ns().unwrap();
            let frame = aggregator.process_frame(target).unwrap();
            tx.send(Arc::new(frame)).await.unwrap();
        }
        drop(tx);
        dispatcher_handle.await.unwrap();

        for k in 1..=3u64 {
            let ply = out_dir.path().join(format!("frame_{k:06}.ply"));
            let manifest = out_dir.path().join(format!("frame_{k:06}.json"));
            assert!(ply.exists(), "missing {}", ply.display());
            assert!(manifest.exists(), "missing {}", manifest.display());
        }
    }

    #[test]
    fn test_partial_success_across_rig() {
        let dir = TempDir::new().unwrap();
        let cam1 = write_device(dir.path(), "A1", 4, 3, FPS, FRAMES, MS, 1000).unwrap();
        // Short second camera: exhausted halfway through
        let cam2 = write_device(dir.path(), "B2", 4, 3, FPS, 3, MS, 1000).unwrap();

        let blueprint = RigBlueprint {
            version: Default::default(),
            playback: PlaybackConfig::default(),
            devices: vec![cam1, cam2],
            sinks: vec![],
        };
        let aggregator = MultiStreamAggregator::open(&blueprint).unwrap();

        let target = aggregator.timestamp_for_frame(6).unwrap();
        let frame = aggregator.process_frame(target).unwrap();

        assert_eq!(frame.failed_devices(), 1);
        assert_eq!(frame.points.len(), 4 * 3);
        assert!(!frame.reports[0].is_failure());
        assert!(frame.reports[1].is_failure());
    }
}

#[cfg(test)]
mod calibration_tests {
    use crate::synthetic::{write_color_stream, write_depth_stream, StreamSpec};
    use calibration::{distort, CalibrationSet};
    use stream_parser::SensorStreamParser;
    use tempfile::TempDir;

    #[test]
    fn test_lut_round_trip_from_header_intrinsics() {
        let dir = TempDir::new().unwrap();
        let depth_path = dir.path().join("d.rcs");
        let color_path = dir.path().join("c.rcs");

        let mut depth_spec = StreamSpec::at_rate("S1", 16, 12, 30.0, 1, 0);
        depth_spec.intrinsics =
            Some("120,120,8,6,0.08,-0.01,0,0.2,0,0,0.0004,-0.0002".to_string());
        let color_spec = StreamSpec::at_rate("S1", 16, 12, 30.0, 1, 0);

        write_depth_stream(&depth_path, &depth_spec, |_, _, _| 500).unwrap();
        write_color_stream(&color_path, &color_spec, |_, _, _| [1, 2, 3]).unwrap();

        let depth = SensorStreamParser::open(&depth_path).unwrap();
        let color = SensorStreamParser::open(&color_path).unwrap();
        let device = crate::synthetic::device_config("S1", depth_path, color_path);
        let calib = CalibrationSet::assemble(depth.header(), color.header(), &device).unwrap();

        // The forward model through every LUT ray lands on its source pixel
        for v in 0..12 {
            for u in 0..16 {
                let ray = calib.lut.ray(u, v).expect("converged");
                let (xd, yd) = distort(&calib.depth_distortion, ray[0] as f64, ray[1] as f64);
                let (pu, pv) = calib.depth_intrinsics.denormalize(xd, yd);
                assert!((pu - u as f64).abs() < 1e-3, "({u},{v}) -> {pu}");
                assert!((pv - v as f64).abs() < 1e-3, "({u},{v}) -> {pv}");
            }
        }
    }
}
