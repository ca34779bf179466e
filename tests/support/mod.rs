#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use archive_upload::{ArchiveArtifact, ArchiveError, ArchiveUploader};
use interviewer::controller::{FinalPersistPolicy, InterviewController};
use interviewer::{InterviewScript, Presenter};
use model_gateway::{ModelGateway, Role};
use model_gateway_mock::{MockGateway, MockTurn};
use tempfile::TempDir;
use time::macros::datetime;
use time::OffsetDateTime;
use transcript_store::{
    PersistTier, SessionSnapshot, StoreDirectories, TranscriptSink, TranscriptStore,
    TranscriptStoreError,
};

pub const STARTED: OffsetDateTime = datetime!(2024-06-03 09:00:00 UTC);

pub fn fixed_clock() -> OffsetDateTime {
    STARTED
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    Partial(String),
    ClearPartial,
    Message(Role, String),
    Notice(String),
    Warn(String),
}

#[derive(Debug, Default)]
pub struct PresenterSpy {
    pub events: Vec<PresenterEvent>,
}

impl PresenterSpy {
    pub fn partials(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresenterEvent::Partial(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<(Role, &str)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresenterEvent::Message(role, text) => Some((*role, text.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresenterEvent::Warn(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresenterEvent::Notice(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for PresenterSpy {
    fn show_partial(&mut self, text: &str) {
        self.events.push(PresenterEvent::Partial(text.to_string()));
    }

    fn clear_partial(&mut self) {
        self.events.push(PresenterEvent::ClearPartial);
    }

    fn show_message(&mut self, role: Role, text: &str) {
        self.events
            .push(PresenterEvent::Message(role, text.to_string()));
    }

    fn notice(&mut self, text: &str) {
        self.events.push(PresenterEvent::Notice(text.to_string()));
    }

    fn warn(&mut self, text: &str) {
        self.events.push(PresenterEvent::Warn(text.to_string()));
    }
}

#[derive(Debug, Default)]
pub struct SinkTrace {
    pub saves: Vec<PersistTier>,
    pub completion_checks: usize,
}

/// Wraps a real store and injects failures on request.
pub struct ScriptedSink {
    inner: TranscriptStore,
    fail_backups: bool,
    final_failures: Mutex<u32>,
    trace: Arc<Mutex<SinkTrace>>,
}

impl ScriptedSink {
    pub fn new(inner: TranscriptStore) -> (Self, Arc<Mutex<SinkTrace>>) {
        let trace = Arc::new(Mutex::new(SinkTrace::default()));
        (
            Self {
                inner,
                fail_backups: false,
                final_failures: Mutex::new(0),
                trace: Arc::clone(&trace),
            },
            trace,
        )
    }

    pub fn failing_backups(mut self) -> Self {
        self.fail_backups = true;
        self
    }

    /// The next `count` final saves fail before anything is written.
    pub fn failing_final_saves(self, count: u32) -> Self {
        *lock_unpoisoned(&self.final_failures) = count;
        self
    }
}

impl TranscriptSink for ScriptedSink {
    fn is_completed(&self, respondent_id: &str) -> Result<bool, TranscriptStoreError> {
        lock_unpoisoned(&self.trace).completion_checks += 1;
        self.inner.is_completed(respondent_id)
    }

    fn save(
        &self,
        tier: PersistTier,
        snapshot: &SessionSnapshot<'_>,
    ) -> Result<(), TranscriptStoreError> {
        lock_unpoisoned(&self.trace).saves.push(tier);

        let injected = match tier {
            PersistTier::Backup => self.fail_backups,
            PersistTier::Final => {
                let mut remaining = lock_unpoisoned(&self.final_failures);
                if *remaining > 0 {
                    *remaining -= 1;
                    true
                } else {
                    false
                }
            }
        };
        if injected {
            return Err(TranscriptStoreError::io(
                "writing record",
                "injected",
                std::io::Error::other("disk full"),
            ));
        }

        self.inner.save(tier, snapshot)
    }
}

#[derive(Debug, Default)]
pub struct RecordingUploader {
    pub uploads: Mutex<Vec<ArchiveArtifact>>,
}

impl ArchiveUploader for RecordingUploader {
    fn upload(&self, artifact: &ArchiveArtifact) -> Result<String, ArchiveError> {
        lock_unpoisoned(&self.uploads).push(artifact.clone());
        Ok(format!("archive://study/{}", artifact.file_name))
    }
}

#[derive(Debug, Default)]
pub struct FailingUploader;

impl ArchiveUploader for FailingUploader {
    fn upload(&self, _artifact: &ArchiveArtifact) -> Result<String, ArchiveError> {
        Err(ArchiveError::Rejected {
            status: 507,
            body: "quota exceeded".to_string(),
        })
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub gateway: Arc<MockGateway>,
    pub store: TranscriptStore,
    pub trace: Arc<Mutex<SinkTrace>>,
    pub presenter: PresenterSpy,
}

impl Harness {
    pub fn new(turns: Vec<MockTurn>) -> Self {
        Self::with_gateway(MockGateway::new(turns))
    }

    pub fn with_gateway(gateway: MockGateway) -> Self {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = TranscriptStore::open(StoreDirectories::under(dir.path()))
            .expect("store directories should be created");
        Self {
            dir,
            gateway: Arc::new(gateway),
            store,
            trace: Arc::new(Mutex::new(SinkTrace::default())),
            presenter: PresenterSpy::default(),
        }
    }

    /// Controller over a fresh sink whose trace replaces `self.trace`.
    pub fn controller(&mut self) -> InterviewController {
        self.controller_with_sink(|sink| sink)
    }

    pub fn controller_with_sink(
        &mut self,
        configure: impl FnOnce(ScriptedSink) -> ScriptedSink,
    ) -> InterviewController {
        let (sink, trace) = ScriptedSink::new(self.store.clone());
        self.trace = trace;
        let gateway: Arc<dyn ModelGateway> = Arc::clone(&self.gateway) as Arc<dyn ModelGateway>;
        InterviewController::new(gateway, Box::new(configure(sink)), InterviewScript::default())
            .with_clock(fixed_clock)
            .with_final_persist_policy(fast_retry_policy())
    }

    pub fn saves(&self) -> Vec<PersistTier> {
        lock_unpoisoned(&self.trace).saves.clone()
    }
}

pub fn fast_retry_policy() -> FinalPersistPolicy {
    FinalPersistPolicy {
        retry_interval: Duration::from_millis(1),
        alert_after: 3,
        max_attempts: Some(10),
    }
}

pub fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
