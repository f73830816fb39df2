mod snapshot;

pub use snapshot::{SessionId, Snapshot, Stage, State};

use crate::{
    config::Config,
    error::{Error, Result},
    gateway::{Document, ExtractionGateway, ResultSink},
    question_set::QuestionSet,
    session::QuizSession,
};
use model::{ExamResult, RawExam};
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

const TICK: Duration = Duration::from_secs(1);

enum Event {
    Answer { number: u32, key: String },
    Submit,
}

type Channel = mpsc::UnboundedSender<Event>;

/// Countdown task of a running quiz. Dropping the worker cancels the task.
struct Worker {
    events: Channel,
    task: JoinHandle<()>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

struct Current {
    id: SessionId,
    worker: Option<Worker>,
}

struct Inner<G, S> {
    gateway: G,
    sink: Arc<S>,
    config: Config,
    /// Guards session replacement so that a late gateway response can never install itself.
    current: Mutex<Current>,
    /// Published view of the current session, shared with the countdown task.
    snapshot: Arc<watch::Sender<Snapshot>>,
}

/// Drives a single exam session from document import to the graded result.
pub struct Importer<G, S> {
    inner: Arc<Inner<G, S>>,
}

impl<G, S> Clone for Importer<G, S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<G: ExtractionGateway, S: ResultSink> Importer<G, S> {
    pub fn new(gateway: G, sink: S, config: Config) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::idle(SessionId::default(), config.duration));
        let current = Mutex::new(Current { id: SessionId::default(), worker: None });
        let inner = Inner { gateway, sink: Arc::new(sink), config, current, snapshot: Arc::new(snapshot) };
        Self { inner: Arc::new(inner) }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Notified on every state change, answer and countdown tick.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.snapshot.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Current> {
        self.inner.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Moves to a fresh session. Dropping the old worker aborts its countdown.
    fn replace(&self, current: &mut Current, init: impl FnOnce(SessionId) -> Snapshot) -> SessionId {
        current.id = current.id.next();
        current.worker = None;
        self.inner.snapshot.send_replace(init(current.id));
        current.id
    }

    /// Discards the current session and imports a new document. Resolves once the quiz is
    /// running or the import has failed.
    pub async fn begin_import(&self, document: Document) -> Result<SessionId> {
        let duration = self.inner.config.duration;
        let id = {
            let mut current = self.lock();
            self.replace(&mut current, |id| Snapshot::processing(id, duration))
        };
        log::info!("Session {id} is importing `{}` ({} bytes).", document.name, document.len());

        let outcome = self.inner.gateway.extract(document).await;

        let mut current = self.lock();
        if current.id != id {
            log::info!("Ignoring the extraction for superseded session {id}.");
            return Err(Error::Superseded);
        }

        self.inner.snapshot.send_modify(|snap| snap.state = State::Processing(Stage::Parsing));
        let parsed = outcome
            .map_err(|err| {
                log::error!("Extraction failed for session {id}: {err:#}");
                Error::Gateway
            })
            .and_then(|text| Ok(serde_json::from_str::<RawExam>(&text)?))
            .and_then(QuestionSet::from_raw);
        let questions = match parsed {
            Ok(questions) => Arc::new(questions),
            Err(err) => {
                log::error!("Session {id} cannot start: {err}");
                self.inner.snapshot.send_replace(Snapshot::failed(id, duration, err));
                return Err(err);
            }
        };

        log::info!("Session {id} starts a {duration}s exam with {} questions.", questions.len());
        self.inner.snapshot.send_replace(Snapshot::quiz(id, duration, Arc::clone(&questions)));

        let (events, rx) = mpsc::unbounded_channel();
        let session = QuizSession::new(questions, duration);
        let snapshot = Arc::clone(&self.inner.snapshot);
        let sink = Arc::clone(&self.inner.sink);
        let task = tokio::spawn(run(id, session, rx, snapshot, sink));
        current.worker = Some(Worker { events, task });
        Ok(id)
    }

    /// Selects `key` for question `number`. Ignored unless a quiz is running.
    pub fn answer(&self, number: u32, key: impl Into<String>) {
        self.send(Event::Answer { number, key: key.into() });
    }

    /// Finishes the running quiz. Ignored unless a quiz is running.
    pub fn submit(&self) {
        self.send(Event::Submit);
    }

    fn send(&self, event: Event) {
        let current = self.lock();
        let delivered = current.worker.as_ref().is_some_and(|worker| worker.events.send(event).is_ok());
        if !delivered {
            log::debug!("Session {} is not running a quiz. Input ignored.", current.id);
        }
    }

    /// Drops the current session, whatever its state, and returns to idle.
    pub fn discard(&self) {
        let duration = self.inner.config.duration;
        let mut current = self.lock();
        let id = self.replace(&mut current, |id| Snapshot::idle(id, duration));
        log::info!("Discarded the previous session. Now idle as {id}.");
    }

    /// Waits for the current session to finish. Resolves to `None` when the session fails,
    /// is replaced or is not importing at all.
    pub async fn finished(&self) -> Option<Arc<ExamResult>> {
        let mut rx = self.subscribe();
        let id = rx.borrow().session;
        let snap = rx
            .wait_for(|snap| snap.session != id || snap.result.is_some() || snap.state == State::Idle)
            .await
            .ok()?;
        if snap.session != id {
            return None;
        }
        snap.result.clone()
    }

    /// Waits until the result of the current session has been handed to the sink. Resolves to
    /// whether the sink accepted it, or `None` when the session ends without a stored result.
    pub async fn stored(&self) -> Option<bool> {
        let mut rx = self.subscribe();
        let id = rx.borrow().session;
        let snap = rx
            .wait_for(|snap| snap.session != id || snap.stored.is_some() || snap.state == State::Idle)
            .await
            .ok()?;
        if snap.session != id {
            return None;
        }
        snap.stored
    }
}

/// Applies `update` only while `id` is still the published session.
fn publish(snapshot: &watch::Sender<Snapshot>, id: SessionId, update: impl FnOnce(&mut Snapshot)) -> bool {
    snapshot.send_if_modified(|snap| {
        if snap.session != id {
            return false;
        }
        update(snap);
        true
    })
}

async fn run<S: ResultSink>(
    id: SessionId,
    mut session: QuizSession,
    mut events: mpsc::UnboundedReceiver<Event>,
    snapshot: Arc<watch::Sender<Snapshot>>,
    sink: Arc<S>,
) {
    let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    let result = loop {
        let finished = tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(Event::Answer { number, key }) => {
                    if session.answer(number, key) {
                        publish(&snapshot, id, |snap| snap.answers = session.answers().clone());
                    } else {
                        log::debug!("Session {id} has no question {number}. Answer ignored.");
                    }
                    None
                }
                Some(Event::Submit) => session.submit(),
                // Every sender is gone: the session was discarded.
                None => return,
            },
            _ = ticker.tick() => {
                let expired = session.tick();
                publish(&snapshot, id, |snap| snap.remaining = session.remaining());
                expired
            }
        };
        if let Some(result) = finished {
            break result;
        }
    };

    // Stop the countdown and refuse further input before publishing anything.
    drop(ticker);
    events.close();

    let published = publish(&snapshot, id, |snap| {
        snap.state = State::Finished;
        snap.remaining = session.remaining();
        snap.answers = session.answers().clone();
        snap.result = Some(Arc::clone(&result));
    });
    if !published {
        log::info!("Session {id} finished after it was replaced. Result dropped.");
        return;
    }

    log::info!(
        "Session {id} finished: {}/{} correct in {}s.",
        result.score,
        result.total_questions,
        result.time_taken
    );

    // Storing outlives the session so that an immediate re-import cannot cut it short. The
    // outcome is published for as long as the session is still current.
    tokio::spawn(async move {
        let stored = match sink.store(&result).await {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Result {} of session {id} was not stored: {err:#}", result.id);
                false
            }
        };
        publish(&snapshot, id, |snap| snap.stored = Some(stored));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Tally;
    use tokio::sync::Notify;

    const EXAM: &str = r#"{"questions":[
        {"questionNumber":2,"questionText":"Two","options":{"A":"a","B":"b","C":"c"},"correctAnswer":"B","questionType":"A"},
        {"questionNumber":1,"questionText":"One","options":{"A":"a","B":"b","C":"c"},"correctAnswer":"A","questionType":"A"},
        {"questionNumber":3,"questionText":"Three","options":{"A":"a","B":"b","C":"c"},"correctAnswer":"C","questionType":"B"}
    ]}"#;

    struct FakeGateway {
        gate: Arc<Notify>,
    }

    impl ExtractionGateway for FakeGateway {
        async fn extract(&self, document: Document) -> anyhow::Result<String> {
            let payload = match &*document.name {
                "exam" => EXAM,
                "slow" => {
                    self.gate.notified().await;
                    EXAM
                }
                "empty" => r#"{"questions":[]}"#,
                "absent" => "{}",
                "prose" => "Sorry, I cannot read this file.",
                _ => anyhow::bail!("gateway is down"),
            };
            Ok(String::from(payload))
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ExamResult>>);

    impl Recorder {
        fn stored(&self) -> Vec<ExamResult> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ResultSink for Recorder {
        async fn store(&self, result: &ExamResult) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(result.clone());
            Ok(())
        }
    }

    struct Refusing;

    impl ResultSink for Refusing {
        async fn store(&self, _: &ExamResult) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    type TestImporter = Importer<FakeGateway, Arc<Recorder>>;

    fn importer(duration: u32) -> (TestImporter, Arc<Notify>, Arc<Recorder>) {
        let gate = Arc::new(Notify::new());
        let sink = Arc::new(Recorder::default());
        let gateway = FakeGateway { gate: Arc::clone(&gate) };
        let importer = Importer::new(gateway, Arc::clone(&sink), Config::with_duration(duration));
        (importer, gate, sink)
    }

    fn document(name: &str) -> Document {
        Document::pdf(name, Vec::new())
    }

    /// Lets every runnable task finish its work. Time only advances once the runtime is idle.
    async fn settle() {
        time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_grades_by_type() {
        let (importer, _, sink) = importer(Config::DEFAULT_DURATION_SECS);
        importer.begin_import(document("exam")).await.unwrap();

        let snap = importer.snapshot();
        assert_eq!(snap.state, State::Quiz);
        let numbers: Vec<_> = snap.questions.unwrap().iter().map(|q| q.number).collect();
        assert_eq!(numbers, [1, 2, 3]);

        importer.answer(1, "A");
        importer.answer(2, "A");
        time::sleep(Duration::from_millis(120_500)).await;
        assert_eq!(importer.snapshot().remaining, 5400 - 120);
        assert!(importer.snapshot().is_answered(2));

        importer.submit();
        let result = importer.finished().await.unwrap();
        assert_eq!(result.score, 1);
        assert_eq!(result.total_questions, 3);
        assert_eq!(result.time_taken, 120);
        assert_eq!(result.performance_by_type["A"], Tally { correct: 1, total: 2 });
        assert_eq!(result.performance_by_type["B"], Tally { correct: 0, total: 1 });
        assert_eq!(result.answer(3), None);

        settle().await;
        assert_eq!(sink.stored(), [(*result).clone()]);
    }

    #[tokio::test(start_paused = true)]
    async fn store_outcome_is_published() {
        let (importer, _, sink) = importer(600);
        importer.begin_import(document("exam")).await.unwrap();
        assert_eq!(importer.snapshot().stored, None);
        importer.submit();
        assert_eq!(importer.stored().await, Some(true));
        assert_eq!(sink.stored().len(), 1);
        assert_eq!(importer.snapshot().stored, Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn refused_store_is_reported() {
        let gateway = FakeGateway { gate: Arc::new(Notify::new()) };
        let importer = Importer::new(gateway, Refusing, Config::with_duration(600));
        importer.begin_import(document("exam")).await.unwrap();
        importer.submit();
        assert_eq!(importer.stored().await, Some(false));

        let snap = importer.snapshot();
        assert_eq!(snap.state, State::Finished);
        assert!(snap.result.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_import_has_nothing_to_store() {
        let (importer, _, _) = importer(600);
        assert!(importer.begin_import(document("empty")).await.is_err());
        assert_eq!(importer.stored().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_or_unusable_payload_returns_to_idle() {
        let (importer, _, sink) = importer(60);
        for (name, expected) in [
            ("empty", Error::EmptyResult),
            ("absent", Error::EmptyResult),
            ("prose", Error::Syntax),
            ("offline", Error::Gateway),
        ] {
            assert_eq!(importer.begin_import(document(name)).await, Err(expected));
            let snap = importer.snapshot();
            assert_eq!(snap.state, State::Idle);
            assert_eq!(snap.error, Some(expected));
            assert!(snap.questions.is_none());
            assert!(importer.finished().await.is_none());
        }

        settle().await;
        assert!(sink.stored().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timer_expiry_auto_submits() {
        let (importer, _, sink) = importer(90);
        importer.begin_import(document("exam")).await.unwrap();

        let result = importer.finished().await.unwrap();
        assert_eq!(result.time_taken, 90);
        assert_eq!(result.score, 0);

        let snap = importer.snapshot();
        assert_eq!(snap.state, State::Finished);
        assert_eq!(snap.remaining, 0);

        settle().await;
        assert_eq!(sink.stored().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_once_per_second() {
        let (importer, _, _) = importer(600);
        importer.begin_import(document("exam")).await.unwrap();
        let mut remaining = Vec::new();
        for _ in 0..5 {
            time::sleep(Duration::from_secs(1)).await;
            settle().await;
            remaining.push(importer.snapshot().remaining);
        }
        assert_eq!(remaining, [599, 598, 597, 596, 595]);
    }

    #[tokio::test(start_paused = true)]
    async fn reimport_cancels_the_old_timer() {
        let (importer, _, sink) = importer(600);
        let first = importer.begin_import(document("exam")).await.unwrap();
        time::sleep(Duration::from_millis(100_500)).await;
        assert_eq!(importer.snapshot().remaining, 500);

        let second = importer.begin_import(document("exam")).await.unwrap();
        assert_ne!(first, second);
        let snap = importer.snapshot();
        assert_eq!(snap.session, second);
        assert_eq!(snap.remaining, 600);

        // Past the moment the first session would have expired.
        time::sleep(Duration::from_millis(550_250)).await;
        assert_eq!(importer.snapshot().remaining, 50);
        assert!(sink.stored().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finished_session_ignores_input() {
        let (importer, _, sink) = importer(600);
        importer.begin_import(document("exam")).await.unwrap();
        importer.answer(3, "C");
        importer.submit();
        let result = importer.finished().await.unwrap();
        assert_eq!(result.score, 1);

        importer.answer(1, "A");
        importer.answer(3, "B");
        importer.submit();
        time::sleep(Duration::from_secs(30)).await;

        let snap = importer.snapshot();
        assert_eq!(snap.state, State::Finished);
        assert!(Arc::ptr_eq(snap.result.as_ref().unwrap(), &result));
        assert_eq!(snap.answers.get(3), Some("C"));
        assert!(!snap.is_answered(1));
        assert_eq!(sink.stored().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_extraction_is_ignored() {
        let (importer, gate, _) = importer(600);
        let slow = tokio::spawn({
            let importer = importer.clone();
            async move { importer.begin_import(document("slow")).await }
        });
        tokio::task::yield_now().await;
        assert_eq!(importer.snapshot().state, State::Processing(Stage::Uploading));

        let current = importer.begin_import(document("exam")).await.unwrap();
        gate.notify_one();
        assert_eq!(slow.await.unwrap(), Err(Error::Superseded));

        let snap = importer.snapshot();
        assert_eq!(snap.session, current);
        assert_eq!(snap.state, State::Quiz);
    }

    #[tokio::test(start_paused = true)]
    async fn input_while_processing_is_ignored() {
        let (importer, gate, _) = importer(600);
        let slow = tokio::spawn({
            let importer = importer.clone();
            async move { importer.begin_import(document("slow")).await }
        });
        tokio::task::yield_now().await;
        assert!(importer.snapshot().state.is_processing());

        importer.answer(1, "A");
        importer.submit();
        gate.notify_one();
        let id = slow.await.unwrap().unwrap();
        settle().await;

        let snap = importer.snapshot();
        assert_eq!(snap.session, id);
        assert_eq!(snap.state, State::Quiz);
        assert!(snap.answers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn discard_stops_the_quiz() {
        let (importer, _, sink) = importer(60);
        importer.begin_import(document("exam")).await.unwrap();
        importer.answer(1, "A");
        importer.discard();

        let snap = importer.snapshot();
        assert_eq!(snap.state, State::Idle);
        assert!(snap.answers.is_empty());
        assert!(snap.error.is_none());

        time::sleep(Duration::from_secs(120)).await;
        assert_eq!(importer.snapshot().remaining, 60);
        assert!(sink.stored().is_empty());
    }
}
