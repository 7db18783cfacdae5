//! Batch fetch over a course list.
//!
//! Every course runs as its own task behind a semaphore that caps how many
//! are talking to the backend at once. Tasks never share a session and never
//! touch the result lists: rows and errors go through channels, each drained
//! by a single collector task.

use std::sync::Arc;

use futures::{stream::FuturesUnordered, StreamExt};
use log::{error, info, warn};
use tokio::sync::{mpsc, Semaphore};

use crate::{
    banner::{FetchSession, SessionFactory},
    error::{CourseError, Error, Result},
    model::{CourseIdentifier, CourseSection, ExportRow, SectionDetail},
    retry::{with_retry, RetryPolicy},
    settings::Settings,
};

const CHANNEL_CAPACITY: usize = 100;

/// Everything a batch run produced. Row order is unspecified.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub rows: Vec<ExportRow>,
    pub errors: Vec<CourseError>,
}

pub struct Pipeline {
    factory: Arc<dyn SessionFactory>,
    term: String,
    concurrency: usize,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(factory: Arc<dyn SessionFactory>, term: impl Into<String>) -> Self {
        Self {
            factory,
            term: term.into(),
            concurrency: 10,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_settings(factory: Arc<dyn SessionFactory>, settings: &Settings) -> Self {
        Self::new(factory, settings.term.as_str())
            .concurrency(settings.concurrency)
            .retry(settings.retry_policy())
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch every course. Failures are collected, never propagated; every
    /// input course contributes at least one row.
    pub async fn run(&self, courses: Vec<CourseIdentifier>) -> Aggregate {
        let (row_tx, row_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (error_tx, error_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let rows = tokio::spawn(collect(row_rx));
        let errors = tokio::spawn(collect(error_rx));

        let gate = Arc::new(Semaphore::new(self.concurrency));
        info!(
            "fetching {} courses for term {}, {} at a time",
            courses.len(),
            self.term,
            self.concurrency
        );

        let tasks: FuturesUnordered<_> = courses
            .into_iter()
            .map(|course| {
                let gate = Arc::clone(&gate);
                let task = CourseTask {
                    factory: Arc::clone(&self.factory),
                    term: self.term.clone(),
                    retry: self.retry,
                    rows: row_tx.clone(),
                    errors: error_tx.clone(),
                };

                tokio::spawn(async move {
                    // the gate is never closed
                    let Ok(_permit) = gate.acquire_owned().await else {
                        return;
                    };
                    task.run(course).await;
                })
            })
            .collect();

        // collectors finish once the last task drops its senders
        drop(row_tx);
        drop(error_tx);

        tasks
            .for_each(|joined| async move {
                if let Err(e) = joined {
                    error!("course task failed: {e}");
                }
            })
            .await;

        Aggregate {
            rows: rows.await.unwrap_or_else(|e| {
                error!("row collector failed: {e}");
                Vec::new()
            }),
            errors: errors.await.unwrap_or_else(|e| {
                error!("error collector failed: {e}");
                Vec::new()
            }),
        }
    }
}

async fn collect<T>(mut rx: mpsc::Receiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Some(item) = rx.recv().await {
        items.push(item);
    }
    items
}

struct CourseTask {
    factory: Arc<dyn SessionFactory>,
    term: String,
    retry: RetryPolicy,
    rows: mpsc::Sender<ExportRow>,
    errors: mpsc::Sender<CourseError>,
}

impl CourseTask {
    async fn run(self, course: CourseIdentifier) {
        info!("fetching {course}");

        let (session, sections) = match with_retry(&self.retry, || self.search(&course)).await {
            Ok(found) => found,
            Err(e) => {
                self.report(&course, None, e).await;
                self.emit(ExportRow::unavailable(&course, &self.term)).await;
                return;
            }
        };

        let mut emitted = 0;
        for section in sections.into_iter().filter(|section| !section.crn.is_empty()) {
            // sections of one course are fetched one after another
            match session.meeting_times(&section.crn).await {
                Ok(meetings) => {
                    let detail = SectionDetail { section, meetings };
                    for row in ExportRow::from_detail(&course, &detail) {
                        self.emit(row).await;
                        emitted += 1;
                    }
                }
                Err(e) => {
                    let crn = section.crn.clone();
                    self.report(&course, Some(crn), e).await;
                }
            }
        }

        if emitted == 0 {
            info!("{course} has no sections in {}", self.term);
            self.emit(ExportRow::unavailable(&course, &self.term)).await;
        }
    }

    /// A fresh session per attempt, so a retry never inherits broken cookie state.
    async fn search(
        &self,
        course: &CourseIdentifier,
    ) -> Result<(Box<dyn FetchSession>, Vec<CourseSection>)> {
        let session = self.factory.open(&self.term).await?;
        let sections = session.search(&course.subject, &course.number).await?;
        Ok((session, sections))
    }

    async fn emit(&self, row: ExportRow) {
        if self.rows.send(row).await.is_err() {
            error!("row collector is gone");
        }
    }

    async fn report(&self, course: &CourseIdentifier, crn: Option<String>, error: Error) {
        let error = CourseError {
            subject: course.subject.clone(),
            number: course.number.clone(),
            crn,
            error,
        };
        warn!("{error}");
        if self.errors.send(error).await.is_err() {
            error!("error collector is gone");
        }
    }
}
