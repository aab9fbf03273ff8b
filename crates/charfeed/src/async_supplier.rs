//! Background chunk production.
//!
//! [`AsyncChunkSupplier`] moves an underlying [`ChunkSupplier`] onto a
//! dedicated producer thread feeding a bounded FIFO channel, so reading
//! characters overlaps parsing them. Spent chunks travel back to the
//! producer over a recycle channel, giving the same steady-state
//! allocation profile as the rotating supplier without sharing storage.
//!
//! The producer sends `Ok(chunk)` items, one final `Ok(None)`-equivalent
//! end marker (channel disconnect), or a single poisoned `Err` envelope
//! that the consumer re-raises exactly once. Closing sets a stop flag,
//! drains the queue, and joins the thread; each producer-side put is
//! bounded by a timeout so the thread cannot wedge when the consumer
//! stops pulling without closing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use crate::error::{Error, Result};
use crate::supplier::ChunkSupplier;

/// Default bound on each producer-side queue put.
pub const DEFAULT_PUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default queue depth.
pub const DEFAULT_QUEUE_DEPTH: usize = 4;

type Item = std::result::Result<Vec<char>, Error>;

pub struct AsyncChunkSupplier {
    data_rx: Receiver<Item>,
    recycle_tx: Sender<Vec<char>>,
    stop: Arc<AtomicBool>,
    /// The producer carries any error swallowed while closing the inner
    /// supplier out through its return value.
    handle: Option<thread::JoinHandle<Option<Error>>>,
    done: bool,
    closed: bool,
    close_error_cb: Option<Box<dyn Fn(&Error) + Send>>,
}

impl std::fmt::Debug for AsyncChunkSupplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncChunkSupplier")
            .field("done", &self.done)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl AsyncChunkSupplier {
    /// Spawns a producer thread pulling from `inner` into a queue of the
    /// given depth.
    pub fn new<S>(inner: S, queue_depth: usize) -> Result<Self>
    where
        S: ChunkSupplier + Send + 'static,
    {
        Self::with_timeout(inner, queue_depth, DEFAULT_PUT_TIMEOUT)
    }

    pub fn with_timeout<S>(inner: S, queue_depth: usize, put_timeout: Duration) -> Result<Self>
    where
        S: ChunkSupplier + Send + 'static,
    {
        if queue_depth == 0 {
            return Err(Error::Usage("async queue depth must be at least 1"));
        }
        let (data_tx, data_rx) = bounded::<Item>(queue_depth);
        let (recycle_tx, recycle_rx) = unbounded::<Vec<char>>();
        let stop = Arc::new(AtomicBool::new(false));
        let producer_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("charfeed-reader".into())
            .spawn(move || produce(inner, &data_tx, &recycle_rx, &producer_stop, put_timeout))
            .map_err(Error::Io)?;
        Ok(Self {
            data_rx,
            recycle_tx,
            stop,
            handle: Some(handle),
            done: false,
            closed: false,
            close_error_cb: None,
        })
    }

    /// Installs a callback invoked with errors swallowed during close.
    pub fn on_close_error(&mut self, cb: impl Fn(&Error) + Send + 'static) {
        self.close_error_cb = Some(Box::new(cb));
    }

    fn join_producer(&mut self) {
        self.stop.store(true, Ordering::Release);
        // Drain so a producer blocked on a full queue can observe the flag.
        while self.data_rx.try_recv().is_ok() {}
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(None) => {}
                Ok(Some(err)) => self.report_close_error(&err),
                Err(_) => {
                    self.report_close_error(&Error::Usage("async producer thread panicked"));
                }
            }
        }
    }

    fn report_close_error(&self, err: &Error) {
        log::warn!("charfeed: error during close: {err}");
        if let Some(cb) = &self.close_error_cb {
            cb(err);
        }
    }
}

impl ChunkSupplier for AsyncChunkSupplier {
    fn next_chunk(&mut self, recycle: Option<Vec<char>>) -> Result<Option<Vec<char>>> {
        if self.done {
            return Ok(None);
        }
        if let Some(buf) = recycle {
            // Producer may already be gone; the buffer is then just dropped.
            let _ = self.recycle_tx.send(buf);
        }
        match self.data_rx.recv() {
            Ok(Ok(chunk)) => Ok(Some(chunk)),
            Ok(Err(err)) => {
                // Poisoned envelope: surface once, then behave as ended.
                self.done = true;
                self.join_producer();
                Err(err)
            }
            Err(_) => {
                self.done = true;
                self.join_producer();
                Ok(None)
            }
        }
    }

    /// Idempotent and non-throwing; secondary teardown errors go to the
    /// log and the optional close callback.
    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.done = true;
        self.join_producer();
        Ok(())
    }
}

impl Drop for AsyncChunkSupplier {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Returns any error swallowed while closing the inner supplier; the
/// consumer reports it through the close-error callback after joining.
fn produce<S: ChunkSupplier>(
    mut inner: S,
    data_tx: &Sender<Item>,
    recycle_rx: &Receiver<Vec<char>>,
    stop: &AtomicBool,
    put_timeout: Duration,
) -> Option<Error> {
    loop {
        if stop.load(Ordering::Acquire) {
            break;
        }
        let recycle = recycle_rx.try_recv().ok();
        let item = match inner.next_chunk(recycle) {
            Ok(Some(chunk)) => Ok(chunk),
            Ok(None) => break,
            Err(err) => Err(err),
        };
        let ends = item.is_err();
        let mut pending = item;
        loop {
            match data_tx.send_timeout(pending, put_timeout) {
                Ok(()) => break,
                Err(crossbeam_channel::SendTimeoutError::Timeout(item)) => {
                    if stop.load(Ordering::Acquire) {
                        return inner.close().err();
                    }
                    pending = item;
                }
                Err(crossbeam_channel::SendTimeoutError::Disconnected(_)) => {
                    return inner.close().err();
                }
            }
        }
        if ends {
            break;
        }
    }
    // Dropping data_tx disconnects the channel; the consumer reads the
    // disconnect as end of stream.
    inner.close().err()
}
