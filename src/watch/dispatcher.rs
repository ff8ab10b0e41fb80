//! Event dispatch: classify -> settle -> process.
//!
//! The dispatcher owns the spec registry and the backend. Everything that
//! touches either runs on the thread calling [`Dispatcher::run`] (or
//! [`Dispatcher::ingest`]), so the registry needs no locking.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use notify::{Event, EventKind};
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use super::classify::{Classified, Classifier, FileKind};
use super::debounce::Debouncer;
use crate::load::{self, LoadError, LoadReport};
use crate::spec::{self, SpecError, SpecRegistry, TableSpec};
use crate::store::Backend;

/// How long a new file must stay quiet before it is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    pub spec: Duration,
    pub data: Duration,
}

impl SettleDelays {
    pub fn for_kind(&self, kind: FileKind) -> Duration {
        match kind {
            FileKind::Spec => self.spec,
            FileKind::Data => self.data,
        }
    }
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            spec: Duration::from_millis(3000),
            data: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug)]
pub enum Processed {
    Spec(TableSpec),
    Data(LoadReport),
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Spec(#[from] SpecError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

pub struct Dispatcher<B: Backend> {
    classifier: Classifier,
    settle: SettleDelays,
    registry: SpecRegistry,
    backend: B,
    debouncer: Debouncer,
}

impl<B: Backend> Dispatcher<B> {
    pub fn new(classifier: Classifier, settle: SettleDelays, backend: B) -> Self {
        Self {
            classifier,
            settle,
            registry: SpecRegistry::new(),
            backend,
            debouncer: Debouncer::new(),
        }
    }

    pub fn registry(&self) -> &SpecRegistry {
        &self.registry
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Files waiting out their settle delay.
    pub fn pending(&self) -> usize {
        self.debouncer.len()
    }

    /// Consume events until the source disconnects.
    ///
    /// Files still settling when the source goes away are waited for and
    /// processed before returning.
    pub fn run(&mut self, events: &Receiver<notify::Result<Event>>) {
        info!(
            specs = %self.classifier.specs_dir().display(),
            data = %self.classifier.data_dir().display(),
            "listening"
        );

        loop {
            let received = match self.debouncer.next_deadline() {
                Some(deadline) => events.recv_deadline(deadline),
                None => events.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(Ok(event)) => self.handle_event(&event, Instant::now()),
                Ok(Err(err)) => warn!(err = %err, "file watcher error"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.settle_remaining();
                    info!("event source closed");
                    return;
                }
            }

            self.process_due(Instant::now());
        }
    }

    /// Classify one watcher event and schedule or refresh matching files.
    pub fn handle_event(&mut self, event: &Event, now: Instant) {
        match event.kind {
            EventKind::Create(_) => {
                for path in &event.paths {
                    match self.classifier.classify(path) {
                        Ok(item) => {
                            let delay = self.settle.for_kind(item.kind);
                            debug!(path = %path.display(), table = %item.table, ?delay, "settling");
                            self.debouncer.schedule(item, delay, now);
                        }
                        Err(unmatched) => debug!("ignoring: {}", unmatched),
                    }
                }
            }
            EventKind::Modify(_) => {
                for path in &event.paths {
                    if self.debouncer.touch(path, now) {
                        trace!(path = %path.display(), "still being written");
                    }
                }
            }
            _ => trace!(kind = ?event.kind, "ignoring event"),
        }
    }

    /// Process every settled file. Returns how many were processed.
    pub fn process_due(&mut self, now: Instant) -> usize {
        let due = self.debouncer.drain_due(now);
        for item in &due {
            self.dispatch(item);
        }
        due.len()
    }

    /// Classify and process `paths` immediately, in order, without settling.
    /// Returns the number processed without error.
    pub fn ingest(&mut self, paths: &[PathBuf]) -> usize {
        let mut ok = 0;
        for path in paths {
            match self.classifier.classify(path) {
                Ok(item) => {
                    if self.dispatch(&item) {
                        ok += 1;
                    }
                }
                Err(unmatched) => warn!("skipping: {}", unmatched),
            }
        }
        ok
    }

    /// Run the compile or load path for one settled file.
    pub fn process(&mut self, item: &Classified) -> Result<Processed, ProcessError> {
        match item.kind {
            FileKind::Spec => {
                let spec = spec::compile(
                    &item.path,
                    &item.table,
                    &mut self.registry,
                    &mut self.backend,
                )?;
                Ok(Processed::Spec(spec))
            }
            FileKind::Data => {
                let report =
                    load::load_file(&item.path, &item.table, &self.registry, &mut self.backend)?;
                Ok(Processed::Data(report))
            }
        }
    }

    fn dispatch(&mut self, item: &Classified) -> bool {
        match self.process(item) {
            Ok(Processed::Spec(spec)) => {
                info!(table = %item.table, columns = spec.columns.len(), "table created");
                true
            }
            Ok(Processed::Data(report)) => {
                info!(
                    table = %item.table,
                    path = %item.path.display(),
                    inserted = report.inserted,
                    blank = report.blank,
                    undecodable = report.undecodable,
                    incomplete = report.incomplete,
                    failed = report.failed,
                    "data loaded"
                );
                true
            }
            Err(err) => {
                error!(
                    table = %item.table,
                    path = %item.path.display(),
                    err = %err,
                    "processing failed"
                );
                false
            }
        }
    }

    fn settle_remaining(&mut self) {
        while let Some(deadline) = self.debouncer.next_deadline() {
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            }
            self.process_due(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryBackend, Statement};
    use notify::event::{CreateKind, DataChange, ModifyKind};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const TESTER_SPEC: &str =
        "name,width,datatype\nname,10,TEXT\nvalid,1,BOOLEAN\ncount,3,INTEGER\n";

    struct Fixture {
        dir: TempDir,
        dispatcher: Dispatcher<MemoryBackend>,
    }

    impl Fixture {
        fn new(settle: SettleDelays) -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir(dir.path().join("specs")).unwrap();
            fs::create_dir(dir.path().join("data")).unwrap();
            let classifier = Classifier::new(
                &dir.path().join("specs"),
                &dir.path().join("data"),
                "csv",
                "txt",
            )
            .unwrap();
            Self {
                dispatcher: Dispatcher::new(classifier, settle, MemoryBackend::new()),
                dir,
            }
        }

        fn write(&self, rel: &str, contents: &str) -> PathBuf {
            let path = self.dir.path().join(rel);
            fs::write(&path, contents).unwrap();
            path
        }
    }

    fn created(path: &Path) -> Event {
        Event::new(EventKind::Create(CreateKind::File)).add_path(path.to_path_buf())
    }

    fn written(path: &Path) -> Event {
        Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(path.to_path_buf())
    }

    #[test]
    fn spec_then_data_end_to_end() {
        let mut fx = Fixture::new(SettleDelays::default());
        let spec = fx.write("specs/tester.csv", TESTER_SPEC);
        let data = fx.write("data/tester_2016-3-1.txt", "Foonyor 1 10\n\n");
        let t0 = Instant::now();

        fx.dispatcher.handle_event(&created(&spec), t0);
        fx.dispatcher.handle_event(&created(&data), t0);
        assert_eq!(fx.dispatcher.pending(), 2);

        assert_eq!(fx.dispatcher.process_due(t0 + Duration::from_millis(3000)), 1);
        assert_eq!(fx.dispatcher.registry().widths("tester"), Some(&[10, 1, 3][..]));

        assert_eq!(fx.dispatcher.process_due(t0 + Duration::from_millis(5000)), 1);
        let inserts: Vec<&Statement> = fx
            .dispatcher
            .backend()
            .statements()
            .iter()
            .filter(|s| matches!(s, Statement::Insert { .. }))
            .collect();
        assert_eq!(
            inserts,
            vec![&Statement::Insert {
                table: "tester".to_string(),
                values: vec!["Foonyor".to_string(), "1".to_string(), "10".to_string()],
            }]
        );
    }

    #[test]
    fn unmatched_event_touches_nothing() {
        let mut fx = Fixture::new(SettleDelays::default());
        let stray = fx.write("specs/notes.md", "hello");
        let t0 = Instant::now();

        fx.dispatcher.handle_event(&created(&stray), t0);
        fx.dispatcher.process_due(t0 + Duration::from_secs(60));

        assert_eq!(fx.dispatcher.pending(), 0);
        assert!(fx.dispatcher.registry().is_empty());
        assert!(fx.dispatcher.backend().statements().is_empty());
    }

    #[test]
    fn write_events_delay_processing() {
        let mut fx = Fixture::new(SettleDelays::default());
        let spec = fx.write("specs/tester.csv", TESTER_SPEC);
        let t0 = Instant::now();

        fx.dispatcher.handle_event(&created(&spec), t0);
        let t1 = t0 + Duration::from_millis(2500);
        fx.dispatcher.handle_event(&written(&spec), t1);

        assert_eq!(fx.dispatcher.process_due(t0 + Duration::from_millis(3000)), 0);
        assert_eq!(fx.dispatcher.process_due(t1 + Duration::from_millis(3000)), 1);
    }

    #[test]
    fn data_without_spec_inserts_nothing() {
        let mut fx = Fixture::new(SettleDelays::default());
        let data = fx.write("data/tester_1.txt", "Foonyor 1 10\n");

        let item = fx.dispatcher.classifier.classify(&data).unwrap();
        let err = fx.dispatcher.process(&item).unwrap_err();

        assert!(matches!(err, ProcessError::Load(LoadError::NoSpecRegistered(_))));
        assert!(fx.dispatcher.backend().statements().is_empty());
    }

    #[test]
    fn ingest_processes_in_given_order_and_skips_unmatched() {
        let mut fx = Fixture::new(SettleDelays::default());
        let spec = fx.write("specs/tester.csv", TESTER_SPEC);
        let data = fx.write("data/tester_a.txt", "Quuxitude 1103\n");
        let stray = fx.write("data/readme.txt", "x");

        let ok = fx.dispatcher.ingest(&[spec, stray, data]);

        assert_eq!(ok, 2);
        assert_eq!(
            fx.dispatcher.backend().rows("tester").unwrap(),
            &[vec!["Quuxitude".to_string(), "1".to_string(), "103".to_string()]]
        );
    }

    #[test]
    fn run_drains_pending_files_when_source_closes() {
        let settle = SettleDelays {
            spec: Duration::from_millis(10),
            data: Duration::from_millis(20),
        };
        let mut fx = Fixture::new(settle);
        let spec = fx.write("specs/tester.csv", TESTER_SPEC);
        let data = fx.write("data/tester_x.txt", "Foonyor 1 10\nBarzane 0 -12\n");

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(Ok(created(&data))).unwrap();
        tx.send(Ok(created(&spec))).unwrap();
        tx.send(Err(notify::Error::generic("boom"))).unwrap();
        drop(tx);

        fx.dispatcher.run(&rx);

        assert_eq!(fx.dispatcher.pending(), 0);
        assert_eq!(fx.dispatcher.backend().rows("tester").map(|r| r.len()), Some(2));
    }
}
