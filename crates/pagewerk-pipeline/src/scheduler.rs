// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline scheduler — drives every page of a document through preprocessing
// and OCR on a pool of worker threads.
//
// Pages are fed to the pool through a shared FIFO queue; each worker owns one
// page from load to final status. Progress flows back over a second channel
// and is exposed as the `BatchRun` iterator. With a single worker pages are
// processed strictly in document order.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};
use image::GrayImage;
use pagewerk_core::{
    CancelToken, DataMode, Document, LanguageCode, LanguageOutcome, PageError, PageErrorKind,
    PageId, PageMetadata, PageSource, PageStatus, PipelineError, PreprocessingProfile,
    PressureSignal, ProfileName, Result,
};
use pagewerk_preprocess::{
    ImageDiagnostics, ProfileResolver, ResolveMode, load_page, run_stages_cancellable,
};
use serde::Serialize;
use tracing::{debug, error, info, info_span, instrument, warn};
use uuid::Uuid;

use crate::context::ExecutionContext;
use crate::ocr::{OcrJob, OcrService};
use crate::planner::ExecutionPlan;
use crate::retry::RetryPolicy;
use crate::spill::{SpillArea, SpilledPage};

// -- Public result types ---------------------------------------------------------

/// One progress update for one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult {
    pub page_id: PageId,
    pub status: PageStatus,
    /// Only languages that produced text.
    pub recognized_text_by_language: BTreeMap<LanguageCode, String>,
    pub error: Option<PageError>,
}

impl PageResult {
    fn status(page_id: PageId, status: PageStatus) -> Self {
        Self {
            page_id,
            status,
            recognized_text_by_language: BTreeMap::new(),
            error: None,
        }
    }
}

/// Overall verdict of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BatchOutcome {
    Completed,
    /// Every page reached a final state but at least one page or language failed.
    CompletedWithErrors,
    Cancelled,
    /// Stopped early by memory pressure or a failed disk spill.
    Aborted,
}

/// Summary handed back by [`BatchRun::finish`].
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    pub outcome: BatchOutcome,
    /// Final result of every page, in document order.
    pub pages: Vec<PageResult>,
    pub error: Option<String>,
}

impl BatchReport {
    /// `ResourceExhausted` if the batch was aborted.
    pub fn check_aborted(&self) -> Result<()> {
        match (&self.outcome, &self.error) {
            (BatchOutcome::Aborted, Some(reason)) => {
                Err(PipelineError::ResourceExhausted(reason.clone()))
            }
            (BatchOutcome::Aborted, None) => {
                Err(PipelineError::ResourceExhausted("batch aborted".into()))
            }
            _ => Ok(()),
        }
    }

    pub fn count(&self, status: PageStatus) -> usize {
        self.pages.iter().filter(|p| p.status == status).count()
    }
}

// -- Scheduler -------------------------------------------------------------------

/// Runs batches against one OCR service.
#[derive(Clone)]
pub struct PipelineScheduler {
    ocr: Arc<dyn OcrService>,
    retry: RetryPolicy,
}

impl PipelineScheduler {
    pub fn new(ocr: Arc<dyn OcrService>) -> Self {
        Self {
            ocr,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Start processing `document` according to `plan`.
    ///
    /// Returns once the workers are running. Errors here are batch-fatal and
    /// happen before any page is touched: a plan built for a different page
    /// count, an unresolvable manual profile, or an unusable spill root.
    #[instrument(skip_all, fields(run_id = %ctx.run_id, pages = document.len(), workers = plan.workers()))]
    pub fn run(
        &self,
        document: Document,
        plan: ExecutionPlan,
        ctx: ExecutionContext,
    ) -> Result<BatchRun> {
        if plan.batch_size() != document.len() {
            return Err(PipelineError::StalePlan {
                planned: plan.batch_size(),
                actual: document.len(),
            });
        }

        let fixed_profile = match &ctx.mode {
            ResolveMode::Manual(name) if *name != ProfileName::Automatic => {
                Some(ctx.resolver.resolve(&PageMetadata::default(), &ctx.mode)?)
            }
            _ => None,
        };

        let spill = match plan.data_mode() {
            DataMode::MemoryOnly => None,
            DataMode::DiskAssisted => {
                let root = plan
                    .spill_root()
                    .cloned()
                    .unwrap_or_else(std::env::temp_dir);
                Some(SpillArea::create(&root, ctx.run_id)?)
            }
        };

        let shared = Arc::new(Shared {
            ocr: Arc::clone(&self.ocr),
            retry: self.retry,
            languages: ctx.languages,
            resolver: ctx.resolver,
            fixed_profile,
            cancel: ctx.cancel,
            pressure: ctx.pressure,
            halt: AtomicBool::new(false),
            abort_reason: Mutex::new(None),
            spill,
        });

        let (job_tx, job_rx) = unbounded::<PageJob>();
        for page in &document.pages {
            // Receiver is alive; send cannot fail here.
            let _ = job_tx.send(PageJob {
                id: page.id,
                source: page.source.clone(),
                metadata: page.metadata.clone(),
            });
        }
        drop(job_tx);

        let (event_tx, event_rx) = unbounded::<Event>();
        let mut workers = Vec::with_capacity(plan.workers());
        for index in 0..plan.workers() {
            let shared = Arc::clone(&shared);
            let jobs = job_rx.clone();
            let events = event_tx.clone();
            let span = info_span!("worker", run_id = %ctx.run_id, index);
            let handle = thread::Builder::new()
                .name(format!("pagewerk-worker-{index}"))
                .spawn(move || {
                    let _guard = span.enter();
                    shared.work(&jobs, &events);
                })?;
            workers.push(handle);
        }
        drop(event_tx);

        info!(
            pages = document.len(),
            workers = workers.len(),
            data_mode = ?plan.data_mode(),
            "Batch started"
        );
        Ok(BatchRun {
            run_id: ctx.run_id,
            document,
            events: event_rx,
            workers,
            shared,
            finals: BTreeMap::new(),
        })
    }
}

// -- Worker side -------------------------------------------------------------------

struct PageJob {
    id: PageId,
    source: PageSource,
    metadata: PageMetadata,
}

/// Final state of one page, applied to the document when the run finishes.
struct PageUpdate {
    result: PageResult,
    metadata: PageMetadata,
    profile: Option<ProfileName>,
    outcomes: BTreeMap<LanguageCode, LanguageOutcome>,
}

impl PageUpdate {
    fn new(id: PageId, metadata: PageMetadata) -> Self {
        Self {
            result: PageResult::status(id, PageStatus::Pending),
            metadata,
            profile: None,
            outcomes: BTreeMap::new(),
        }
    }

    fn cancelled(mut self) -> Self {
        self.result.status = PageStatus::Cancelled;
        self
    }

    fn failed(mut self, err: &PipelineError) -> Self {
        self.result.status = PageStatus::Failed;
        self.result.error = Some(PageError::from(err));
        self
    }
}

/// A preprocessed page waiting for OCR.
enum Prepared {
    InMemory(GrayImage),
    Spilled(SpilledPage),
}

enum Event {
    Progress(PageResult),
    Finished(PageUpdate),
}

struct Shared {
    ocr: Arc<dyn OcrService>,
    retry: RetryPolicy,
    languages: Vec<LanguageCode>,
    resolver: ProfileResolver,
    /// Set in manual mode; automatic mode resolves per page.
    fixed_profile: Option<PreprocessingProfile>,
    cancel: CancelToken,
    pressure: PressureSignal,
    /// Internal stop after an abort.
    halt: AtomicBool,
    abort_reason: Mutex<Option<String>>,
    spill: Option<SpillArea>,
}

impl Shared {
    fn should_stop(&self) -> bool {
        self.cancel.is_cancelled() || self.halt.load(Ordering::SeqCst)
    }

    fn abort(&self, reason: &str) {
        if !self.halt.swap(true, Ordering::SeqCst) {
            error!(reason, "Batch aborted");
            if let Ok(mut slot) = self.abort_reason.lock() {
                *slot = Some(reason.to_string());
            }
        }
    }

    fn abort_reason(&self) -> Option<String> {
        self.abort_reason.lock().ok().and_then(|slot| slot.clone())
    }

    fn work(&self, jobs: &Receiver<PageJob>, events: &Sender<Event>) {
        while let Ok(job) = jobs.recv() {
            if self.pressure.is_raised() {
                self.abort("memory pressure reported by host");
            }
            let update = if self.should_stop() {
                debug!(page = %job.id, "Page skipped, batch stopping");
                PageUpdate::new(job.id, job.metadata).cancelled()
            } else {
                self.process(job, events)
            };
            // The receiver only disappears if the host dropped the run.
            let _ = events.send(Event::Finished(update));
        }
    }

    #[instrument(skip_all, fields(page = %job.id))]
    fn process(&self, job: PageJob, events: &Sender<Event>) -> PageUpdate {
        let mut update = PageUpdate::new(job.id, job.metadata);
        let _ = events.send(Event::Progress(PageResult::status(job.id, PageStatus::Preprocessing)));

        let prepared = match self.preprocess(job.id, &job.source, &mut update) {
            Ok(prepared) => prepared,
            Err(PipelineError::Cancelled) => return update.cancelled(),
            Err(err) => {
                warn!(error = %err, "Preprocessing failed");
                return update.failed(&err);
            }
        };
        if self.should_stop() {
            return update.cancelled();
        }

        let _ = events.send(Event::Progress(PageResult::status(job.id, PageStatus::Recognizing)));
        // A spilled page keeps its file until OCR on it has returned.
        let (image, spilled) = match prepared {
            Prepared::InMemory(image) => (image, None),
            Prepared::Spilled(spilled) => match spilled.load() {
                Ok(image) => (image, Some(spilled)),
                Err(err) => return update.failed(&self.spill_failed(err)),
            },
        };
        let mut ocr = OcrJob::new(job.id, &self.languages);
        ocr.run(self.ocr.as_ref(), &image, &self.retry);
        drop(image);
        drop(spilled);

        update.result.recognized_text_by_language = ocr
            .outcomes
            .iter()
            .filter_map(|(lang, outcome)| outcome.text().map(|t| (lang.clone(), t.to_string())))
            .collect();
        if ocr.any_succeeded() {
            update.result.status = PageStatus::Done;
        } else {
            update.result.status = PageStatus::Failed;
            update.result.error = Some(ocr.last_error().unwrap_or_else(|| {
                PageError::new(PageErrorKind::OcrFailure, "no OCR language configured")
            }));
        }
        update.outcomes = ocr.outcomes;
        info!(status = ?update.result.status, languages = update.outcomes.len(), "Page finished");
        update
    }

    fn preprocess(
        &self,
        id: PageId,
        source: &PageSource,
        update: &mut PageUpdate,
    ) -> Result<Prepared> {
        let gray = load_page(source)?;

        let profile = match &self.fixed_profile {
            Some(profile) => profile.clone(),
            None => {
                ImageDiagnostics::analyze(&gray).merge_into(&mut update.metadata);
                self.resolver.resolve(&update.metadata, &ResolveMode::Automatic)?
            }
        };
        debug!(profile = %profile.name, version = profile.version, "Profile resolved");
        update.profile = Some(profile.name.clone());

        let processed = run_stages_cancellable(gray, &profile.stages, &|| self.should_stop())?;

        match &self.spill {
            None => Ok(Prepared::InMemory(processed)),
            Some(area) => area
                .store(id, &processed)
                .map(Prepared::Spilled)
                .map_err(|err| self.spill_failed(err)),
        }
    }

    /// Losing the spill area mid-run exhausts the disk budget for the whole batch.
    fn spill_failed(&self, err: PipelineError) -> PipelineError {
        self.abort(&format!("disk spill failed: {err}"));
        err
    }
}

// -- Batch handle ------------------------------------------------------------------

/// A running batch. Iterate it for progress; call [`finish`](Self::finish)
/// for the updated document and the report. Not restartable.
pub struct BatchRun {
    run_id: Uuid,
    document: Document,
    events: Receiver<Event>,
    workers: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
    finals: BTreeMap<PageId, PageUpdate>,
}

impl BatchRun {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Drain remaining progress, join the workers and apply every page's
    /// final state to the document. Spill files are gone when this returns.
    #[instrument(skip_all, fields(run_id = %self.run_id))]
    pub fn finish(mut self) -> (Document, BatchReport) {
        for _ in self.by_ref() {}
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Worker thread panicked");
            }
        }

        let abort_reason = self.shared.abort_reason();
        let cancelled = self.shared.cancel.is_cancelled();
        drop(self.shared);

        let mut finals = self.finals;
        let mut document = self.document;
        let mut pages = Vec::with_capacity(document.len());
        for page in &mut document.pages {
            match finals.remove(&page.id) {
                Some(update) => {
                    page.status = update.result.status;
                    page.error = update.result.error.clone();
                    page.metadata = update.metadata;
                    page.profile = update.profile;
                    page.recognized = update.outcomes;
                    pages.push(update.result);
                }
                None => {
                    let error = PageError::new(
                        PageErrorKind::Internal,
                        "worker stopped before the page finished",
                    );
                    page.status = PageStatus::Failed;
                    page.error = Some(error.clone());
                    pages.push(PageResult {
                        page_id: page.id,
                        status: PageStatus::Failed,
                        recognized_text_by_language: BTreeMap::new(),
                        error: Some(error),
                    });
                }
            }
        }

        let outcome = if abort_reason.is_some() {
            BatchOutcome::Aborted
        } else if cancelled || pages.iter().any(|p| p.status == PageStatus::Cancelled) {
            BatchOutcome::Cancelled
        } else if document.pages.iter().any(|p| {
            p.status == PageStatus::Failed
                || p
                    .recognized
                    .values()
                    .any(|o| matches!(o, LanguageOutcome::Failed { .. }))
        }) {
            BatchOutcome::CompletedWithErrors
        } else {
            BatchOutcome::Completed
        };

        info!(?outcome, pages = pages.len(), "Batch finished");
        let report = BatchReport {
            run_id: self.run_id,
            outcome,
            pages,
            error: abort_reason,
        };
        (document, report)
    }
}

impl Iterator for BatchRun {
    type Item = PageResult;

    fn next(&mut self) -> Option<PageResult> {
        match self.events.recv().ok()? {
            Event::Progress(result) => Some(result),
            Event::Finished(update) => {
                let result = update.result.clone();
                self.finals.insert(result.page_id, update);
                Some(result)
            }
        }
    }
}
