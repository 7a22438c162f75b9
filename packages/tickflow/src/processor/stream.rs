use super::Processor;
use crate::error::{EngineError, Result};
use crate::series::Series;
use crate::tick::Tick;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A running stream: the bounded output channel plus the worker that feeds it.
///
/// The worker hands the processor back through [`Streaming::join`] once it exits, so the
/// same instance can be reused for the next run.
#[derive(Debug)]
pub struct Streaming<P> {
    output: mpsc::Receiver<Tick>,
    handle: JoinHandle<Result<P>>,
}

impl<P> Streaming<P> {
    /// Next emitted tick; `None` once the worker has exited and the buffer is drained.
    pub async fn recv(&mut self) -> Option<Tick> {
        self.output.recv().await
    }

    pub fn output(&mut self) -> &mut mpsc::Receiver<Tick> {
        &mut self.output
    }

    pub fn into_parts(self) -> (mpsc::Receiver<Tick>, JoinHandle<Result<P>>) {
        (self.output, self.handle)
    }

    /// Drops the output side and waits for the worker.
    ///
    /// A worker still producing sees the closed channel and exits.
    pub async fn join(self) -> Result<P> {
        drop(self.output);
        join_worker(self.handle).await
    }

    /// Drains every emitted tick into a series in arrival order, then waits for the worker.
    pub async fn collect(mut self, name: impl Into<String>) -> Result<(Series, P)> {
        let mut out = Series::new(name);
        while let Some(tick) = self.output.recv().await {
            out.push(tick);
        }
        let processor = join_worker(self.handle).await?;
        Ok((out, processor))
    }
}

async fn join_worker<P>(handle: JoinHandle<Result<P>>) -> Result<P> {
    handle
        .await
        .map_err(|e| EngineError::WorkerAborted(e.to_string()))?
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    UpstreamClosed,
    Cancelled,
    DownstreamDropped,
}

pub(super) fn spawn<P>(
    mut processor: P,
    capacity: usize,
    cancel: CancellationToken,
    mut input: mpsc::Receiver<Tick>,
) -> Streaming<P>
where
    P: Processor + 'static,
{
    processor.reset();
    let (tx, output) = mpsc::channel(capacity);
    let handle = tokio::spawn(async move {
        pump(&mut processor, &cancel, &mut input, &tx).await?;
        Ok(processor)
    });
    Streaming { output, handle }
}

/// The worker loop. Both suspension points race the cancellation token.
async fn pump<P: Processor + ?Sized>(
    processor: &mut P,
    cancel: &CancellationToken,
    input: &mut mpsc::Receiver<Tick>,
    output: &mpsc::Sender<Tick>,
) -> Result<()> {
    let name = processor.name().to_string();
    let mut received = 0u64;
    let mut emitted = 0u64;
    tracing::debug!(processor = %name, "stream worker started");

    let exit = loop {
        let tick = tokio::select! {
            biased;
            () = cancel.cancelled() => break Exit::Cancelled,
            next = input.recv() => match next {
                Some(tick) => tick,
                None => break Exit::UpstreamClosed,
            },
        };
        received += 1;

        let out = processor.process(tick).map_err(|e| {
            tracing::warn!(processor = %name, received, error = %e, "stream worker failed");
            e
        })?;
        if out.is_empty() {
            continue;
        }
        if let Err(exit) = forward(out, cancel, output).await {
            break exit;
        }
        emitted += 1;
    };

    let exit = if exit == Exit::UpstreamClosed {
        let flushed = processor.flush().map_err(|e| {
            tracing::warn!(processor = %name, error = %e, "stream flush failed");
            e
        })?;
        let mut exit = exit;
        for tick in flushed.into_iter().filter(|t| !t.is_empty()) {
            if let Err(e) = forward(tick, cancel, output).await {
                exit = e;
                break;
            }
            emitted += 1;
        }
        exit
    } else {
        exit
    };

    tracing::debug!(processor = %name, ?exit, received, emitted, "stream worker stopped");
    Ok(())
}

async fn forward(
    tick: Tick,
    cancel: &CancellationToken,
    output: &mpsc::Sender<Tick>,
) -> std::result::Result<(), Exit> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Exit::Cancelled),
        sent = output.send(tick) => sent.map_err(|_| Exit::DownstreamDropped),
    }
}

/// Source helper: spawns a producer that sends `ticks` into a bounded channel in order,
/// closing it when the ticks run out or `cancel` fires.
///
/// Must be called from within a tokio runtime.
pub fn feed<I>(ticks: I, capacity: usize, cancel: CancellationToken) -> mpsc::Receiver<Tick>
where
    I: IntoIterator<Item = Tick>,
    I::IntoIter: Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let ticks = ticks.into_iter();
    tokio::spawn(async move {
        for tick in ticks {
            if forward(tick, &cancel, &tx).await.is_err() {
                break;
            }
        }
    });
    rx
}
