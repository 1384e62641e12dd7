//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 协议常量快照测试
//! - 共享内存 → 感知 → 跟踪 → UDP 的端到端测试 (无需外部生产者)
//! - 进程内线程化流水线测试

#[cfg(test)]
mod contract_tests {
    use contracts::{CorrectionPacket, FrameHeader, HEADER_SIZE, PACKET_SIZE};

    #[test]
    fn test_wire_sizes() {
        assert_eq!(HEADER_SIZE, 48);
        assert_eq!(PACKET_SIZE, 20);
        assert_eq!(FrameHeader::new(1, 2, 2, 6, 0).encode().len(), 48);
        assert_eq!(CorrectionPacket::release(1).encode().len(), 20);
        trackloop_cli::pipeline::verify_protocol().unwrap();
    }

    #[test]
    fn test_default_mapping_size() {
        let region = contracts::RegionConfig::default();
        assert_eq!(region.mapping_size(), 196_656);
        assert_eq!(region.max_payload(), 196_608);
    }
}

#[cfg(test)]
mod support {
    use std::io::Write;
    use std::path::{Path, PathBuf};

    pub const MARKERS: &str = r#"{
        "name": "figure-markers",
        "markers": [
            { "class_id": 0, "label": "body", "color": [40, 200, 40], "tolerance": 24, "min_pixels": 12 },
            { "class_id": 1, "label": "head", "color": [40, 40, 220], "tolerance": 24, "min_pixels": 4 }
        ]
    }"#;

    pub fn write_markers(dir: &Path) -> PathBuf {
        let path = dir.join("markers.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(MARKERS.as_bytes()).unwrap();
        path
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;

    use contracts::{
        CorrectionPacket, ManualClock, ManualScheduler, MonotonicClock, RegionConfig,
        TrackerBlueprint, TransportKind,
    };
    use frame_channel::{
        render_figure, FigureStyle, FrameChannel, FrameWriter, MockProducer, MockProducerConfig,
    };
    use observability::Diagnostics;
    use tokio::net::UdpSocket;
    use tracker::Tracker;
    use trackloop_cli::perception::build_detector;
    use trackloop_cli::pipeline::{
        ControlLoop, LoopContext, LoopExit, LoopLimits, TokioScheduler,
    };
    use transport::{ConfiguredSink, TelemetryTransport};

    use super::support::write_markers;

    async fn recv_packet(socket: &UdpSocket, wait: Duration) -> Option<CorrectionPacket> {
        let mut buf = [0u8; 64];
        let n = tokio::time::timeout(wait, socket.recv(&mut buf))
            .await
            .ok()?
            .ok()?;
        Some(CorrectionPacket::decode(&buf[..n]).unwrap())
    }

    /// End-to-end: FrameWriter -> FrameChannel -> MarkerDetector -> Tracker -> UDP
    ///
    /// 验证完整的数据流：
    /// 1. 写端按 seqlock 协议发布人形色块帧
    /// 2. 控制循环读取、检测、跟踪并发送修正量
    /// 3. 接收端解码数据报；目标消失时恰好收到一个释放包
    #[tokio::test]
    async fn test_e2e_region_to_udp() {
        let dir = tempfile::tempdir().unwrap();
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut blueprint = TrackerBlueprint::default();
        blueprint.region = RegionConfig {
            path: dir.path().join("region"),
            max_roi: 256,
        };
        blueprint.transport.port = port;
        blueprint.perception.asset = write_markers(dir.path());

        let mut writer = FrameWriter::create(&blueprint.region.path, 256).unwrap();
        let sink = ConfiguredSink::from_config(&blueprint.transport).await.unwrap();
        let context = LoopContext::new(
            TelemetryTransport::new(sink, blueprint.transport.error_log_interval()),
            Diagnostics::new(&blueprint.diagnostics, MonotonicClock::new()),
            Duration::from_secs(1),
        );
        let mut control = ControlLoop::new(
            FrameChannel::open(&blueprint.region),
            build_detector(&blueprint.perception).unwrap(),
            Tracker::from_blueprint(&blueprint).unwrap(),
            context,
            ManualScheduler::new(ManualClock::new()),
            blueprint.runtime.poll_interval(),
        );

        // figure up and to the left of the frame center
        let style = FigureStyle::default();
        let mut packets = Vec::new();
        for frame_id in 1..=6u32 {
            let pixels = render_figure(256, 256, 96, 90, &style);
            writer.publish(frame_id, 256, 256, frame_id as u64 * 16_000, &pixels).unwrap();
            control.step().await;
            packets.push(recv_packet(&receiver, Duration::from_secs(2)).await.unwrap());
        }

        assert!(packets.iter().all(|p| p.has_target));
        assert_eq!(
            packets.iter().map(|p| p.frame_id).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 6]
        );
        let total_dx: f32 = packets.iter().map(|p| p.dx).sum();
        let total_dy: f32 = packets.iter().map(|p| p.dy).sum();
        assert!(total_dx < 0.0, "dx sum {total_dx}");
        assert!(total_dy < 0.0, "dy sum {total_dy}");
        assert!(packets.iter().all(|p| p.dx.fract() == 0.0 && p.dy.fract() == 0.0));

        // target gone: one release, then silence
        let empty = vec![60u8; 256 * 256 * 3];
        for frame_id in 7..=9u32 {
            writer.publish(frame_id, 256, 256, 0, &empty).unwrap();
            control.step().await;
        }
        let release = recv_packet(&receiver, Duration::from_secs(2)).await.unwrap();
        assert_eq!(release, CorrectionPacket::release(7));
        assert!(recv_packet(&receiver, Duration::from_millis(100)).await.is_none());

        let stats = control.shutdown().await;
        assert_eq!(stats.frames, 9);
        assert_eq!(stats.targets, 6);
        assert_eq!(stats.transport.sent, 7);
        assert_eq!(stats.transport.released, 1);
    }

    /// Synthetic producer thread + real-time loop until the frame limit
    #[tokio::test]
    async fn test_e2e_synthetic_producer_frame_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut blueprint = TrackerBlueprint::default();
        blueprint.region = RegionConfig {
            path: dir.path().join("region"),
            max_roi: 128,
        };
        blueprint.transport.kind = TransportKind::Log;
        blueprint.perception.asset = write_markers(dir.path());

        let writer = FrameWriter::create(&blueprint.region.path, 128).unwrap();
        let producer = MockProducer::new(MockProducerConfig {
            width: 128,
            height: 128,
            fps: 200.0,
            amplitude: 20.0,
            ..Default::default()
        });
        let handle = producer.start(writer);

        let sink = ConfiguredSink::from_config(&blueprint.transport).await.unwrap();
        let context = LoopContext::new(
            TelemetryTransport::new(sink, Duration::from_secs(1)),
            Diagnostics::disabled(MonotonicClock::new()),
            Duration::from_secs(1),
        );
        let mut control = ControlLoop::new(
            FrameChannel::open(&blueprint.region),
            build_detector(&blueprint.perception).unwrap(),
            Tracker::from_blueprint(&blueprint).unwrap(),
            context,
            TokioScheduler::new(),
            blueprint.runtime.poll_interval(),
        )
        .with_limits(LoopLimits {
            max_frames: Some(5),
            timeout: Some(Duration::from_secs(10)),
        });

        let stop = AtomicBool::new(false);
        let exit = control.run(&stop).await;
        producer.stop();
        handle.join().unwrap();

        assert_eq!(exit, LoopExit::FrameLimit);
        let stats = control.shutdown().await;
        assert_eq!(stats.frames, 5);
        assert!(stats.targets > 0);
        // strictly increasing ids mean duplicates were never re-processed
        assert!(stats.last_frame_id.unwrap() >= 5);
    }
}

#[cfg(test)]
mod config_tests {
    use std::io::Write;

    use config_loader::{ConfigFormat, ConfigLoader};
    use trackloop_cli::overrides::Overrides;

    const CONFIG: &str = r#"
[region]
path = "/dev/shm/trackloop_e2e"
max_roi = 320

[transport]
kind = "udp"
host = "127.0.0.1"
port = 40000

[control]
profile = "c"
distance_gain = 0.002

[control.profiles.A]
label = "stable"
base_gain = 0.015
gain_cap = 0.05
target_offset = 0.5

[control.profiles.C]
label = "no_filter"
filter_enabled = false
base_gain = 0.02
gain_cap = 0.06
target_offset = 0.34

[perception]
confidence = 0.5
fallback_asset = "portable.json"
"#;

    #[test]
    fn test_file_overrides_and_round_trip() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();

        let mut bp = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(bp.region.mapping_size(), 48 + 320 * 320 * 3);
        let (key, profile, fell_back) = bp.control.resolve_profile().unwrap();
        assert_eq!((key, fell_back), ("C", false));
        assert!(!profile.filter_enabled);

        Overrides {
            target: Some("127.0.0.1:40001".into()),
            profile: Some("missing".into()),
            ..Default::default()
        }
        .apply(&mut bp)
        .unwrap();
        let (key, _, fell_back) = bp.control.resolve_profile().unwrap();
        assert_eq!((key, fell_back), ("A", true));

        let json = ConfigLoader::to_json(&bp).unwrap();
        let reloaded = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(reloaded.transport.endpoint(), "127.0.0.1:40001");
        assert_eq!(reloaded.control.profiles.len(), 2);
        assert_eq!(
            reloaded.perception.fallback_asset.as_deref(),
            Some(std::path::Path::new("portable.json"))
        );
    }
}

#[cfg(test)]
mod threaded_tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use bytes::Bytes;
    use contracts::{ContractError, Frame, MonotonicClock, PerceptionConfig, TrackerBlueprint};
    use frame_channel::{render_figure, FigureStyle};
    use observability::Diagnostics;
    use parking_lot::Mutex;
    use tracker::{Actuator, FrameSource, MoveCommand, ThreadedConfig, ThreadedPipeline, Tracker};
    use trackloop_cli::perception::build_detector;

    use super::support::write_markers;

    /// Full-size frames with the figure right of center
    struct FigureSource {
        frame_id: u32,
    }

    impl FrameSource for FigureSource {
        fn capture(&mut self) -> Option<Frame> {
            std::thread::sleep(Duration::from_millis(2));
            self.frame_id += 1;
            let pixels = render_figure(512, 512, 300, 250, &FigureStyle::default());
            Some(Frame {
                frame_id: self.frame_id,
                width: 512,
                height: 512,
                timestamp_us: 0,
                roi_x: 0,
                roi_y: 0,
                data: Bytes::from(pixels),
            })
        }
    }

    struct RecordingActuator(Arc<Mutex<Vec<MoveCommand>>>);

    impl Actuator for RecordingActuator {
        fn emit(&mut self, command: &MoveCommand) -> Result<(), ContractError> {
            self.0.lock().push(*command);
            Ok(())
        }
    }

    #[test]
    fn test_threaded_pipeline_steers_toward_figure() {
        let dir = tempfile::tempdir().unwrap();
        let blueprint = TrackerBlueprint {
            perception: PerceptionConfig {
                asset: write_markers(dir.path()),
                ..Default::default()
            },
            ..Default::default()
        };

        let moves = Arc::new(Mutex::new(Vec::new()));
        let (_input_tx, input_rx) = crossbeam::channel::unbounded();
        let mut pipeline = ThreadedPipeline::spawn(
            ThreadedConfig::default(),
            FigureSource { frame_id: 0 },
            build_detector(&blueprint.perception).unwrap(),
            Tracker::from_blueprint(&blueprint).unwrap(),
            RecordingActuator(moves.clone()),
            input_rx,
            Arc::new(Diagnostics::disabled(MonotonicClock::new())),
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if moves.lock().iter().map(|m| m.dx).sum::<i32>() > 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        pipeline.stop();

        let moves = moves.lock();
        // head sits right of the 256x256 center crop's middle
        assert!(moves.iter().map(|m| m.dx).sum::<i32>() > 0);
    }
}
