use super::accumulator::Accumulator;
use super::generator::Generator;
use super::hasher::DoubleSha256;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinSet;

const CHANNEL_CAPACITY: usize = 4;

/// One entropy event as it travels from a source task to its ingestion
/// task: a tagged, sequenced chunk of bytes destined for a pool.
struct EntropyEvent {
    source: u8,
    data: Vec<u8>,
}

/// The producer-facing handle for a registered entropy source. `send`
/// blocks when the channel is full — the intended back-pressure behavior,
/// not an error condition.
#[derive(Clone)]
pub struct SourceHandle {
    source: u8,
    tx: mpsc::Sender<EntropyEvent>,
}

impl SourceHandle {
    pub fn source_id(&self) -> u8 {
        self.source
    }

    pub async fn send(&self, data: Vec<u8>) {
        let _ = self
            .tx
            .send(EntropyEvent {
                source: self.source,
                data,
            })
            .await;
    }
}

/// Owns the ingestion tasks spawned for registered sources, and the
/// broadcast stop signal used to tear them all down together. This is the
/// Rust-idiomatic rendering of the specification's "bookkeeping latch":
/// `JoinSet` both tracks outstanding tasks and provides join semantics.
pub struct SourceHarness {
    accumulator: Arc<Accumulator>,
    stop_tx: broadcast::Sender<()>,
    tasks: JoinSet<()>,
}

impl SourceHarness {
    pub fn new(accumulator: Arc<Accumulator>) -> Self {
        let (stop_tx, _) = broadcast::channel(1);
        Self {
            accumulator,
            stop_tx,
            tasks: JoinSet::new(),
        }
    }

    /// Allocates a new source identifier, spawns its ingestion task, and
    /// returns the producer-facing handle.
    ///
    /// Takes its own clone of the generator handle rather than holding one
    /// permanently on the harness, so an engine with no sources registered
    /// keeps sole ownership of its generator (needed for
    /// `Engine::random_bytes_unlocked`).
    pub fn register_source(&mut self, generator: Arc<Mutex<Generator>>) -> SourceHandle {
        let source = self.accumulator.allocate_source();
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let accumulator = Arc::clone(&self.accumulator);
        let stop_rx = self.stop_tx.subscribe();
        self.tasks
            .spawn(ingestion_task(accumulator, generator, rx, stop_rx));
        SourceHandle { source, tx }
    }

    /// Broadcasts the stop signal and waits for every ingestion task to
    /// finish processing its in-flight event.
    pub async fn shutdown(mut self) {
        let _ = self.stop_tx.send(());
        while self.tasks.join_next().await.is_some() {}
    }
}

async fn ingestion_task(
    accumulator: Arc<Accumulator>,
    generator: Arc<Mutex<Generator>>,
    mut rx: mpsc::Receiver<EntropyEvent>,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut seq: u64 = 0;
    loop {
        tokio::select! {
            biased;
            _ = stop_rx.recv() => break,
            event = rx.recv() => {
                match event {
                    Some(event) => {
                        accumulator.add_event(event.source, seq, &event.data);
                        seq = seq.wrapping_add(1);
                        let mut gen = generator.lock().expect("generator mutex poisoned");
                        accumulator.check_reseed(&mut gen);
                    }
                    None => break,
                }
            }
        }
    }
}

/// Starts the two default sources the engine runs unconditionally:
/// (S1) four bytes of OS entropy, (S2) four bytes derived from a
/// long-lived hasher fed the wall-clock time, both on the same tick
/// interval.
pub fn spawn_default_sources(
    harness: &mut SourceHarness,
    generator: Arc<Mutex<Generator>>,
    tick_interval: std::time::Duration,
) {
    let os_entropy_handle = harness.register_source(Arc::clone(&generator));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_interval);
        loop {
            interval.tick().await;
            let mut buf = [0u8; 4];
            if getrandom::getrandom(&mut buf).is_ok() {
                os_entropy_handle.send(buf.to_vec()).await;
            }
        }
    });

    let clock_handle = harness.register_source(generator);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_interval);
        // Long-lived: never reset across ticks, so each tick's digest
        // reflects every timestamp written so far, not just the latest one.
        let mut hasher = DoubleSha256::new();
        loop {
            interval.tick().await;
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as i64)
                .unwrap_or(0);
            hasher.write(&nanos.to_be_bytes());
            let digest = hasher.sum();
            clock_handle.send(digest[28..].to_vec()).await;
        }
    });
}
