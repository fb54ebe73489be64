use contackgen_env::{
    CaptureRequest, EnvState, EnvironmentController, EnvironmentError, SETTLE_DELAY,
};
use contackgen_test_utils::{tar_with, FakeRuntime, RecordingScenario, RuntimeCall, Step};
use pretty_assertions::assert_eq;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

const WINDOW: Duration = Duration::from_secs(30);

struct Harness {
    runtime: Arc<FakeRuntime>,
    scenario: Arc<RecordingScenario>,
    controller: EnvironmentController,
    dir: tempfile::TempDir,
}

impl Harness {
    fn new(runtime: FakeRuntime) -> Self {
        let runtime = Arc::new(runtime);
        let scenario = Arc::new(RecordingScenario::new());
        let controller = EnvironmentController::new(runtime.clone(), scenario.clone());
        Self {
            runtime,
            scenario,
            controller,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn request(&self) -> CaptureRequest {
        CaptureRequest::new(self.dir.path().join("capture.pcap")).with_window(WINDOW)
    }

    async fn run(&self) -> Result<contackgen_env::CaptureSession, EnvironmentError> {
        self.controller.run(&self.request()).await
    }
}

#[tokio::test(start_paused = true)]
async fn full_lifecycle_in_order() {
    let h = Harness::new(FakeRuntime::new().with_capture(b"captured bytes"));

    let session = h.run().await.unwrap();

    assert_eq!(
        h.runtime.calls(),
        vec![
            RuntimeCall::Create {
                image: "fersuy/contackgen-ubuntu2204:1.1.0".to_string(),
                name: "contackgen-ubuntu2204".to_string(),
            },
            RuntimeCall::Start,
            RuntimeCall::Exec(vec![
                "bash".to_string(),
                "-c".to_string(),
                "./payload.sh -d 30".to_string(),
            ]),
            RuntimeCall::InspectNetworkAddress,
            RuntimeCall::Stop,
            RuntimeCall::CopyArchive("/data/capture.pcap".to_string()),
            RuntimeCall::Remove,
        ]
    );
    assert_eq!(
        session.states,
        vec![
            EnvState::Created,
            EnvState::Started,
            EnvState::Seeded,
            EnvState::ScenarioActive,
            EnvState::Stopped,
            EnvState::ArtifactRetrieved,
            EnvState::Destroyed,
        ]
    );
    assert_eq!(session.address, "172.17.0.2".parse::<IpAddr>().unwrap());
    assert_eq!(h.scenario.targets(), vec![session.address]);
    assert_eq!(std::fs::read(&session.artifact_path).unwrap(), b"captured bytes");
}

#[tokio::test(start_paused = true)]
async fn settle_delays_and_window_are_slept() {
    let h = Harness::new(FakeRuntime::new());
    h.run().await.unwrap();

    let calls = h.runtime.timed_calls();
    let at = |wanted: &RuntimeCall| {
        calls
            .iter()
            .find(|(call, _)| call == wanted)
            .map(|(_, at)| *at)
            .unwrap()
    };

    let started = at(&RuntimeCall::Start);
    let inspected = at(&RuntimeCall::InspectNetworkAddress);
    let stopped = at(&RuntimeCall::Stop);
    let scenario_started = h.scenario.started_at().unwrap();

    assert!(inspected - started >= SETTLE_DELAY * 2);
    assert!(stopped - scenario_started >= WINDOW);
    assert!(stopped - scenario_started < WINDOW + Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn create_failure_removes_nothing() {
    let h = Harness::new(FakeRuntime::new().failing_at(Step::Create));

    let err = h.run().await.unwrap_err();

    assert_eq!(err.failed_state(), Some(EnvState::CreateFailed));
    assert_eq!(h.runtime.count(&RuntimeCall::Remove), 0);
}

#[tokio::test(start_paused = true)]
async fn start_failure_still_removes() {
    let h = Harness::new(FakeRuntime::new().failing_at(Step::Start));

    let err = h.run().await.unwrap_err();

    assert!(matches!(err, EnvironmentError::StartFailed(_)));
    assert_eq!(h.runtime.count(&RuntimeCall::Remove), 1);
    assert!(h.scenario.targets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_address_is_a_seed_failure() {
    let h = Harness::new(FakeRuntime::new().with_address(None));

    let err = h.run().await.unwrap_err();

    assert!(matches!(err, EnvironmentError::NoNetworkAddress { .. }));
    assert_eq!(err.failed_state(), Some(EnvState::SeedFailed));
    assert!(h.scenario.targets().is_empty());
    assert_eq!(h.runtime.count(&RuntimeCall::Remove), 1);
}

#[tokio::test(start_paused = true)]
async fn absent_capture_is_a_retrieval_failure() {
    let h = Harness::new(FakeRuntime::new().with_archive(tar_with("other.log", b"x")));

    let err = h.run().await.unwrap_err();

    assert_eq!(err.failed_state(), Some(EnvState::RetrievalFailed));
    assert!(!h.dir.path().join("capture.pcap").exists());
    assert_eq!(h.runtime.count(&RuntimeCall::Remove), 1);
}

#[tokio::test(start_paused = true)]
async fn copy_failure_is_a_retrieval_failure() {
    let h = Harness::new(FakeRuntime::new().failing_at(Step::CopyArchive));

    let err = h.run().await.unwrap_err();

    assert!(matches!(err, EnvironmentError::CopyFailed(_)));
    assert!(err.is_retrieval());
}

#[tokio::test(start_paused = true)]
async fn stop_and_remove_failures_do_not_fail_the_run() {
    let h = Harness::new(
        FakeRuntime::new()
            .failing_at(Step::Stop)
            .failing_at(Step::Remove),
    );

    let session = h.run().await.unwrap();

    assert_eq!(session.final_state(), Some(EnvState::Destroyed));
    assert_eq!(h.runtime.count(&RuntimeCall::Remove), 1);
}
