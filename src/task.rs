//! Background conversion: run a job on a worker thread and receive events.
//!
//! ## Why a thread and a channel?
//!
//! A conversion can take minutes (OCR at 300 DPI is slow) and pdfium must not
//! be driven from an async executor. [`Converter::start`] therefore runs the
//! job on a dedicated, named OS thread and returns a [`ConversionTask`] at
//! once. The worker reports through an unbounded `tokio` channel, which the
//! caller drains on its own thread:
//!
//! - `task.next_event().await` from async code
//! - `task.try_next_event()` from a UI tick that must not block
//! - `task.blocking_next_event()` from plain threads
//! - `task.into_stream()` for a [`Stream`](tokio_stream::Stream)
//!
//! Every job ends with exactly one terminal event, [`ConversionEvent::Succeeded`]
//! or [`ConversionEvent::Failed`]. A panic inside the worker is caught and
//! reported as `Failed`.
//!
//! A converter runs one job at a time. The guard is released just before the
//! terminal event is sent, so a caller reacting to that event can start the
//! next job immediately.

use crate::config::{ConversionMode, Strategy};
use crate::convert::Converter;
use crate::error::ConvertError;
use crate::output::{ConversionResult, ConversionStats, PageOrigin};
use crate::progress::ConversionProgressCallback;
use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error};

/// Something that happened during a background job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ConversionEvent {
    /// A strategy is being attempted. Page progress restarts at page 1
    /// after this event: when `auto` falls back from the structured pass,
    /// the per-page pass reports every page again.
    Strategy(Strategy),
    /// A page has been added to the document by the current strategy.
    Progress {
        current_page: usize,
        total_pages: usize,
        origin: PageOrigin,
    },
    /// The document was written.
    Succeeded {
        output_path: PathBuf,
        strategy: Strategy,
        stats: ConversionStats,
    },
    /// The job failed; nothing useful was written.
    Failed { message: String },
}

impl ConversionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConversionEvent::Succeeded { .. } | ConversionEvent::Failed { .. }
        )
    }
}

/// Lifecycle of a [`DocumentJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum JobStatus {
    Pending = 0,
    Running = 1,
    Succeeded = 2,
    Failed = 3,
}

impl JobStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => JobStatus::Pending,
            1 => JobStatus::Running,
            2 => JobStatus::Succeeded,
            _ => JobStatus::Failed,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// What a background job was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub mode: ConversionMode,
}

/// Handle to a running job.
pub struct ConversionTask {
    job: DocumentJob,
    status: Arc<AtomicU8>,
    events: UnboundedReceiver<ConversionEvent>,
    worker: Option<thread::JoinHandle<()>>,
}

impl ConversionTask {
    pub fn job(&self) -> &DocumentJob {
        &self.job
    }

    pub fn status(&self) -> JobStatus {
        JobStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Wait for the next event. `None` once the terminal event has been
    /// received and the worker has exited.
    pub async fn next_event(&mut self) -> Option<ConversionEvent> {
        self.events.recv().await
    }

    /// Take the next event if one is queued, without waiting.
    pub fn try_next_event(&mut self) -> Option<ConversionEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block the current thread until the next event. Must not be called
    /// from inside an async runtime.
    pub fn blocking_next_event(&mut self) -> Option<ConversionEvent> {
        self.events.blocking_recv()
    }

    /// Drain events until the terminal one and return it.
    pub async fn finish(mut self) -> ConversionEvent {
        while let Some(event) = self.events.recv().await {
            if event.is_terminal() {
                self.join();
                return event;
            }
        }
        ConversionEvent::Failed {
            message: "conversion worker exited without a result".to_string(),
        }
    }

    /// Consume the handle as a stream of events.
    pub fn into_stream(self) -> UnboundedReceiverStream<ConversionEvent> {
        UnboundedReceiverStream::new(self.events)
    }

    fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                error!("conversion worker thread panicked outside the job");
            }
        }
    }
}

/// Forwards pipeline callbacks into the event channel.
struct ChannelProgress {
    tx: UnboundedSender<ConversionEvent>,
}

impl ChannelProgress {
    fn send(&self, event: ConversionEvent) {
        // The receiver may be gone if the caller dropped the task handle.
        let _ = self.tx.send(event);
    }
}

impl ConversionProgressCallback for ChannelProgress {
    fn on_strategy_start(&self, strategy: Strategy) {
        self.send(ConversionEvent::Strategy(strategy));
    }

    fn on_page_complete(&self, page_num: usize, total_pages: usize, origin: PageOrigin) {
        self.send(ConversionEvent::Progress {
            current_page: page_num,
            total_pages,
            origin,
        });
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Converter {
    /// Start a conversion on a background worker thread.
    ///
    /// # Errors
    /// [`ConvertError::JobInProgress`] while another job started from this
    /// converter (or a clone of it) is still running.
    pub fn start(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        mode: ConversionMode,
    ) -> Result<ConversionTask, ConvertError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ConvertError::JobInProgress);
        }

        let job = DocumentJob {
            input_path: input.as_ref().to_path_buf(),
            output_path: output.as_ref().to_path_buf(),
            mode,
        };
        let status = Arc::new(AtomicU8::new(JobStatus::Pending as u8));
        let (tx, rx) = mpsc::unbounded_channel();

        let converter = self.clone();
        let worker_job = job.clone();
        let worker_status = Arc::clone(&status);
        let spawned = thread::Builder::new()
            .name("pdf2docx-worker".to_string())
            .spawn(move || {
                worker_status.store(JobStatus::Running as u8, Ordering::Release);
                let progress = ChannelProgress { tx: tx.clone() };

                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    converter.convert_with_progress(
                        &worker_job.input_path,
                        &worker_job.output_path,
                        worker_job.mode,
                        &progress,
                    )
                }));

                let (final_status, event) = match outcome {
                    Ok(ConversionResult {
                        success: true,
                        output_path,
                        strategy: Some(strategy),
                        stats,
                        ..
                    }) => (
                        JobStatus::Succeeded,
                        ConversionEvent::Succeeded {
                            output_path,
                            strategy,
                            stats,
                        },
                    ),
                    Ok(result) => (
                        JobStatus::Failed,
                        ConversionEvent::Failed {
                            message: result
                                .error
                                .unwrap_or_else(|| "conversion failed".to_string()),
                        },
                    ),
                    Err(payload) => {
                        let message = format!(
                            "conversion worker panicked: {}",
                            panic_message(payload.as_ref())
                        );
                        error!("{}", message);
                        (JobStatus::Failed, ConversionEvent::Failed { message })
                    }
                };

                worker_status.store(final_status as u8, Ordering::Release);
                converter.busy.store(false, Ordering::Release);
                debug!("Worker finished: {:?}", final_status);
                let _ = tx.send(event);
            });

        match spawned {
            Ok(handle) => Ok(ConversionTask {
                job,
                status,
                events: rx,
                worker: Some(handle),
            }),
            Err(e) => {
                self.busy.store(false, Ordering::Release);
                Err(ConvertError::Internal(format!(
                    "could not start worker thread: {e}"
                )))
            }
        }
    }

    /// Whether a background job is currently running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use crate::pipeline::layout::{StructuredConverter, StructuredReport};
    use std::sync::mpsc as std_mpsc;
    use std::sync::Mutex;

    const OUT: &str = "/nonexistent-pdf2docx-test-dir/out.docx";

    /// Structured converter that waits for a signal, then succeeds, fails or
    /// panics.
    struct Gate {
        release: Mutex<std_mpsc::Receiver<()>>,
        behaviour: &'static str,
    }

    impl Gate {
        fn new(behaviour: &'static str) -> (Arc<Self>, std_mpsc::Sender<()>) {
            let (tx, rx) = std_mpsc::channel();
            (
                Arc::new(Self {
                    release: Mutex::new(rx),
                    behaviour,
                }),
                tx,
            )
        }
    }

    impl StructuredConverter for Gate {
        fn convert_whole_document(
            &self,
            _input: &Path,
            _output: &Path,
            progress: &dyn ConversionProgressCallback,
        ) -> Result<StructuredReport, ConvertError> {
            let _ = self.release.lock().unwrap().recv();
            match self.behaviour {
                "panic" => panic!("layout engine exploded"),
                "fail" => Err(ConvertError::StructuredUnavailable {
                    reason: "page 1 has no text layer".into(),
                }),
                _ => {
                    progress.on_conversion_start(2);
                    progress.on_page_complete(1, 2, PageOrigin::TextLayer);
                    progress.on_page_complete(2, 2, PageOrigin::TextLayer);
                    Ok(StructuredReport {
                        pages: 2,
                        paragraphs: 3,
                        page_breaks: 1,
                    })
                }
            }
        }
    }

    fn converter(gate: Arc<Gate>) -> Converter {
        Converter::builder(ConversionConfig::default())
            .structured(gate)
            .build()
    }

    #[tokio::test]
    async fn events_arrive_in_order_and_end_with_success() {
        let (gate, release) = Gate::new("ok");
        let conv = converter(gate);
        let mut task = conv
            .start("in.pdf", OUT, ConversionMode::TextOnly)
            .unwrap();
        release.send(()).unwrap();

        let mut events = Vec::new();
        while let Some(e) = task.next_event().await {
            let done = e.is_terminal();
            events.push(e);
            if done {
                break;
            }
        }

        assert_eq!(events[0], ConversionEvent::Strategy(Strategy::Structured));
        let pages: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                ConversionEvent::Progress { current_page, .. } => Some(*current_page),
                _ => None,
            })
            .collect();
        assert_eq!(pages, vec![1, 2]);
        match events.last().unwrap() {
            ConversionEvent::Succeeded {
                output_path,
                strategy,
                stats,
            } => {
                assert_eq!(output_path, &PathBuf::from(OUT));
                assert_eq!(*strategy, Strategy::Structured);
                assert_eq!(stats.paragraphs, 3);
            }
            other => panic!("unexpected terminal event {other:?}"),
        }
        assert_eq!(task.status(), JobStatus::Succeeded);
        assert!(!conv.is_busy());
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_running() {
        let (gate, release) = Gate::new("ok");
        let conv = converter(gate);
        let task = conv
            .start("in.pdf", OUT, ConversionMode::TextOnly)
            .unwrap();

        let second = conv.clone().start("other.pdf", "other.docx", ConversionMode::Auto);
        assert!(matches!(second, Err(ConvertError::JobInProgress)));

        release.send(()).unwrap();
        assert!(matches!(task.finish().await, ConversionEvent::Succeeded { .. }));

        // The guard is free again once the terminal event is out.
        let again = conv
            .start("in.pdf", OUT, ConversionMode::TextOnly)
            .unwrap();
        release.send(()).unwrap();
        assert!(matches!(again.finish().await, ConversionEvent::Succeeded { .. }));
    }

    #[tokio::test]
    async fn failure_becomes_failed_event() {
        let (gate, release) = Gate::new("fail");
        let conv = converter(gate);
        let task = conv
            .start("in.pdf", OUT, ConversionMode::TextOnly)
            .unwrap();
        release.send(()).unwrap();

        match task.finish().await {
            ConversionEvent::Failed { message } => {
                assert!(message.contains("page 1 has no text layer"), "got {message}")
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn worker_panic_is_reported() {
        let (gate, release) = Gate::new("panic");
        let conv = converter(gate);
        let mut task = conv
            .start("in.pdf", OUT, ConversionMode::TextOnly)
            .unwrap();
        release.send(()).unwrap();

        let mut terminal = None;
        while let Some(e) = task.next_event().await {
            if e.is_terminal() {
                terminal = Some(e);
                break;
            }
        }
        match terminal {
            Some(ConversionEvent::Failed { message }) => {
                assert!(message.contains("layout engine exploded"), "got {message}")
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(task.status(), JobStatus::Failed);
        assert!(!conv.is_busy());
    }

    #[test]
    fn try_next_event_does_not_block() {
        let (gate, release) = Gate::new("ok");
        let conv = converter(gate);
        let mut task = conv
            .start("in.pdf", OUT, ConversionMode::TextOnly)
            .unwrap();

        // Nothing but (possibly) the strategy notice before release.
        while let Some(e) = task.try_next_event() {
            assert_eq!(e, ConversionEvent::Strategy(Strategy::Structured));
        }
        release.send(()).unwrap();

        let mut last = None;
        while let Some(e) = task.blocking_next_event() {
            let done = e.is_terminal();
            last = Some(e);
            if done {
                break;
            }
        }
        assert!(matches!(last, Some(ConversionEvent::Succeeded { .. })));
    }

    #[test]
    fn status_round_trips_through_u8() {
        for s in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Succeeded,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::from_u8(s as u8), s);
        }
        assert!(JobStatus::Failed.is_finished());
        assert!(!JobStatus::Running.is_finished());
    }
}
