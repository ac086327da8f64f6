//! End-to-end pipeline runs against synthetic sources and scripted
//! detections. No camera, microphone, network, or model is needed.

use std::sync::{Arc, Mutex};

use proctor_kernel::ingest::{AudioConfig, CameraConfig, CameraSource};
use proctor_kernel::{
    AudioMonitor, CandidateSession, FaceBox, FaceDetectorBackend, HttpReporter, RecordingSink,
    ScriptedBackend, ShutdownFlag, ViolationKind, ViolationSink, VisualMonitor,
};

fn stub_camera(frames: u32) -> CameraSource {
    CameraSource::new(CameraConfig {
        device: format!("stub://candidate?frames={frames}"),
        target_fps: 10,
        width: 640,
        height: 480,
    })
    .expect("stub camera")
}

fn session() -> CandidateSession {
    CandidateSession {
        student_id: 12,
        exam_id: 5,
    }
}

fn centered_face() -> FaceBox {
    FaceBox::new(280, 200, 80, 80)
}

#[test]
fn visual_monitor_reports_multi_face_frames_and_skips_failures() {
    let mut script = ScriptedBackend::new(vec![
        vec![centered_face(), FaceBox::new(0, 200, 60, 60)],
        vec![centered_face()],
    ]);
    script.push_failure("decoder hiccup");
    script.push_faces(vec![
        centered_face(),
        FaceBox::new(0, 200, 60, 60),
        FaceBox::new(560, 200, 60, 60),
    ]);
    script.push_faces(vec![]);
    let detector: Arc<Mutex<dyn FaceDetectorBackend>> = Arc::new(Mutex::new(script));

    let sink = Arc::new(RecordingSink::new());
    let mut monitor = VisualMonitor::new(
        stub_camera(5),
        detector,
        sink.clone(),
        session(),
        ShutdownFlag::new(),
    );
    monitor.run().expect("visual monitor run");

    let recorded = sink.take();
    assert_eq!(recorded.len(), 2, "one report per multi-face frame");
    assert_eq!(recorded[0].kind, ViolationKind::MultipleFaces);
    assert_eq!(recorded[0].details, "2 faces detected");
    assert_eq!(recorded[0].student_id, 12);
    assert_eq!(recorded[0].exam_id, 5);
    assert_eq!(recorded[1].details, "3 faces detected");
}

#[test]
fn visual_monitor_honors_shutdown_flag() {
    let shutdown = ShutdownFlag::new();
    shutdown.trip();

    let detector: Arc<Mutex<dyn FaceDetectorBackend>> =
        Arc::new(Mutex::new(ScriptedBackend::empty()));
    let sink = Arc::new(RecordingSink::new());
    // Unbudgeted source: only the tripped flag can end the loop.
    let camera = CameraSource::new(CameraConfig::default()).expect("stub camera");
    let mut monitor = VisualMonitor::new(camera, detector, sink.clone(), session(), shutdown);
    monitor.run().expect("visual monitor run");
    assert!(sink.take().is_empty());
}

#[test]
fn audio_monitor_reports_one_burst_per_fifty_chunks() {
    let sink = Arc::new(RecordingSink::new());
    let monitor = AudioMonitor::new(
        AudioConfig {
            device: "stub://microphone?chunks=50".to_string(),
            ..AudioConfig::default()
        },
        sink.clone(),
        session(),
        ShutdownFlag::new(),
    );
    monitor.run().expect("audio monitor run");

    let recorded = sink.take();
    assert_eq!(recorded.len(), 1, "exactly the one scripted burst");
    assert_eq!(recorded[0].kind, ViolationKind::BackgroundNoise);
    assert_eq!(recorded[0].details, "High audio level detected");
}

#[test]
fn audio_monitor_honors_shutdown_flag() {
    let shutdown = ShutdownFlag::new();
    shutdown.trip();

    let sink = Arc::new(RecordingSink::new());
    let monitor = AudioMonitor::new(AudioConfig::default(), sink.clone(), session(), shutdown);
    monitor.run().expect("audio monitor run");
    assert!(sink.take().is_empty());
}

#[test]
fn unreachable_endpoint_does_not_disrupt_the_loop() {
    // Discard port on loopback: the POST fails fast with a refused
    // connection. The reporter must swallow it.
    let reporter = HttpReporter::new("http://127.0.0.1:9/api/proctoring/log", "test-token")
        .expect("reporter");
    reporter.report(&session().violation(ViolationKind::BackgroundNoise, "High audio level detected"));

    // And a full loop iteration keeps going after the failed post.
    let detector: Arc<Mutex<dyn FaceDetectorBackend>> = Arc::new(Mutex::new(
        ScriptedBackend::new(vec![
            vec![centered_face(), FaceBox::new(0, 200, 60, 60)],
            vec![centered_face()],
        ]),
    ));
    let mut monitor = VisualMonitor::new(
        stub_camera(2),
        detector,
        Arc::new(reporter),
        session(),
        ShutdownFlag::new(),
    );
    monitor.run().expect("visual monitor run");
}
