use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::consts::SOURCE_RETRY_BUDGET;
use crate::error::{LuminaError, Result};
use crate::frame::PartialFrame;

use super::{FrameSource, Translation};

struct Worker {
    name: String,
    translation: Translation,
    rx: Receiver<PartialFrame>,
    handle: Option<JoinHandle<()>>,
    finished: bool,
}

/// Runs one worker thread per source and gathers their output once per tick.
///
/// Each worker hands frames over through a single-slot channel, so a slow
/// coordinator makes the worker wait instead of queueing stale frames.
pub struct SourceHub {
    workers: Vec<Worker>,
    stop: Arc<AtomicBool>,
    refresh: Duration,
}

impl SourceHub {
    /// Spawn the workers. `refresh_rate` is the tick period in seconds.
    pub fn start(sources: Vec<(Box<dyn FrameSource>, Translation)>, refresh_rate: f64) -> Result<Self> {
        if !(refresh_rate.is_finite() && refresh_rate > 0.0) {
            return Err(LuminaError::InvalidConfig(format!(
                "Refresh rate must be positive, got {refresh_rate}"
            )));
        }
        let refresh = Duration::from_secs_f64(refresh_rate);
        let poll = refresh / SOURCE_RETRY_BUDGET;
        let stop = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(sources.len());
        for (source, translation) in sources {
            let name = source.name().to_string();
            let (tx, rx) = sync_channel(1);
            let stop_flag = Arc::clone(&stop);
            let handle = thread::Builder::new()
                .name(format!("source-{name}"))
                .spawn(move || run_source(source, &tx, &stop_flag, poll))?;
            info!(source = %name, %translation, "Source started");
            workers.push(Worker {
                name,
                translation,
                rx,
                handle: Some(handle),
                finished: false,
            });
        }

        Ok(Self { workers, stop, refresh })
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.workers.iter().map(|w| w.name.as_str()).collect()
    }

    /// Every worker has exited and its last frame has been collected.
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(|w| w.finished)
    }

    /// One entry per source, in source order. Sources that stay silent for a
    /// whole refresh period contribute an empty entry.
    pub fn collect_tick(&mut self) -> Vec<PartialFrame> {
        let refresh = self.refresh;
        self.workers
            .iter_mut()
            .map(|worker| {
                if worker.finished {
                    return PartialFrame::default();
                }
                match worker.rx.recv_timeout(refresh) {
                    Ok(partial) => partial.at(worker.translation.x, worker.translation.y),
                    Err(RecvTimeoutError::Timeout) => {
                        debug!(source = %worker.name, "No frame this tick");
                        PartialFrame::default()
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        info!(source = %worker.name, "Source finished");
                        worker.finished = true;
                        PartialFrame::default()
                    }
                }
            })
            .collect()
    }

    /// Stop and join all workers. Called on drop.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    warn!(source = %worker.name, "Source thread panicked");
                }
                info!(source = %worker.name, "Source stopped");
            }
        }
    }
}

impl Drop for SourceHub {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_source(mut source: Box<dyn FrameSource>, tx: &SyncSender<PartialFrame>, stop: &AtomicBool, poll: Duration) {
    if let Err(e) = source.connect() {
        warn!(source = %source.name(), "Connect failed: {e}");
        deliver(tx, PartialFrame::error(e.to_string()), stop, poll);
        return;
    }

    while !stop.load(Ordering::SeqCst) && !source.is_exhausted() {
        let partial = match source.fetch() {
            Ok(Some(partial)) => partial,
            Ok(None) => {
                thread::sleep(poll);
                continue;
            }
            Err(e) => PartialFrame::error(e.to_string()),
        };
        if !deliver(tx, partial, stop, poll) {
            break;
        }
    }
    source.disconnect();
}

/// Wait for the slot to free up. Returns false once the hub stops or goes away.
fn deliver(tx: &SyncSender<PartialFrame>, mut partial: PartialFrame, stop: &AtomicBool, poll: Duration) -> bool {
    loop {
        match tx.try_send(partial) {
            Ok(()) => return true,
            Err(TrySendError::Full(back)) => {
                if stop.load(Ordering::SeqCst) {
                    return false;
                }
                partial = back;
                thread::sleep(poll);
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }
    }
}
