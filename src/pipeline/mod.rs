use std::collections::HashMap;
use std::ops::Range;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;

use crate::buffer::{BoundedBuffer, BufferStats, Interrupt};
use crate::config::PipelineConfig;
use crate::error::{BufferError, BufferResult, PutError, TakeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerKind {
    Producer,
    Consumer,
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerMetadata {
    pub kind: WorkerKind,
    pub index: usize,
}

impl WorkerMetadata {
    fn thread_name(&self) -> String {
        match self.kind {
            WorkerKind::Producer => format!("producer-{}", self.index),
            WorkerKind::Consumer => format!("consumer-{}", self.index),
        }
    }
}

/// A producer or consumer thread. Dropping the handle interrupts the worker
/// and waits for it.
pub struct WorkerHandle<R> {
    metadata: WorkerMetadata,
    interrupt: Interrupt,
    join_handle: Option<JoinHandle<BufferResult<R>>>,
}

impl<R> WorkerHandle<R> {
    pub fn metadata(&self) -> WorkerMetadata {
        self.metadata
    }

    /// Ask the worker to stop at its next buffer wait.
    pub fn shutdown(&self) {
        self.interrupt.raise();
    }

    pub fn join(mut self) -> BufferResult<R> {
        let Some(handle) = self.join_handle.take() else {
            return Err(BufferError::Worker(format!(
                "{} already joined",
                self.metadata.thread_name()
            )));
        };
        match handle.join() {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    "Worker {:?} terminated with panic: {:?}",
                    self.metadata.kind, err
                );
                Err(BufferError::Worker(format!(
                    "{} panicked",
                    self.metadata.thread_name()
                )))
            }
        }
    }
}

impl<R> Drop for WorkerHandle<R> {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            self.interrupt.raise();
            if handle.join().is_err() {
                warn!("Worker {:?} terminated with panic", self.metadata.kind);
            }
        }
    }
}

fn spawn_worker<R, F>(metadata: WorkerMetadata, body: F) -> BufferResult<WorkerHandle<R>>
where
    R: Send + 'static,
    F: FnOnce(Interrupt) -> BufferResult<R> + Send + 'static,
{
    let interrupt = Interrupt::new();
    let worker_interrupt = interrupt.clone();
    let name = metadata.thread_name();
    let join_handle = thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            debug!("{} started", name);
            let result = body(worker_interrupt);
            debug!("{} finished", name);
            result
        })?;
    Ok(WorkerHandle {
        metadata,
        interrupt,
        join_handle: Some(join_handle),
    })
}

fn pause(jitter: Option<Duration>) {
    let Some(max) = jitter else {
        return;
    };
    let max_us = max.as_micros() as u64;
    if max_us == 0 {
        return;
    }
    let us = rand::rng().random_range(0..=max_us);
    thread::sleep(Duration::from_micros(us));
}

/// Put every value of `values` into `buffer`, returning how many went in.
/// Stops early, without error, on interrupt or close.
pub fn spawn_producer(
    buffer: BoundedBuffer<u64>,
    index: usize,
    values: Range<u64>,
    jitter: Option<Duration>,
) -> BufferResult<WorkerHandle<u64>> {
    let metadata = WorkerMetadata {
        kind: WorkerKind::Producer,
        index,
    };
    spawn_worker(metadata, move |interrupt| {
        let mut produced = 0;
        for value in values {
            pause(jitter);
            match buffer.put_interruptible(value, &interrupt) {
                Ok(()) => produced += 1,
                Err(PutError::Interrupted(_)) | Err(PutError::Closed(_)) => {
                    debug!("producer-{} stopped after {} item(s)", index, produced);
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(produced)
    })
}

/// Take from `buffer` until it is closed and drained, or the worker is
/// interrupted. Returns items in the order they were taken.
pub fn spawn_consumer(
    buffer: BoundedBuffer<u64>,
    index: usize,
    jitter: Option<Duration>,
) -> BufferResult<WorkerHandle<Vec<u64>>> {
    let metadata = WorkerMetadata {
        kind: WorkerKind::Consumer,
        index,
    };
    spawn_worker(metadata, move |interrupt| {
        let mut taken = Vec::new();
        loop {
            pause(jitter);
            match buffer.take_interruptible(&interrupt) {
                Ok(value) => taken.push(value),
                Err(TakeError::Closed) | Err(TakeError::Interrupted) => break,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(taken)
    })
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub produced: u64,
    /// Items per consumer, in take order.
    pub consumed: Vec<Vec<u64>>,
    pub stats: BufferStats,
    items_per_producer: u64,
}

impl PipelineReport {
    pub fn total_consumed(&self) -> u64 {
        self.consumed.iter().map(|c| c.len() as u64).sum()
    }

    pub fn merged(&self) -> Vec<u64> {
        let mut all: Vec<u64> = self.consumed.iter().flatten().copied().collect();
        all.sort_unstable();
        all
    }

    /// Every produced value was consumed exactly once.
    pub fn is_lossless(&self) -> bool {
        self.total_consumed() == self.produced && self.merged().into_iter().eq(0..self.produced)
    }

    /// Within each consumer, values from the same producer appear in the
    /// order that producer emitted them.
    pub fn preserves_producer_order(&self) -> bool {
        let per = self.items_per_producer.max(1);
        self.consumed.iter().all(|taken| {
            let mut last: HashMap<u64, u64> = HashMap::new();
            taken.iter().all(|&value| {
                let producer = value / per;
                match last.insert(producer, value) {
                    Some(prev) => prev < value,
                    None => true,
                }
            })
        })
    }
}

/// Fixed set of producers and consumers sharing one buffer.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> BufferResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run to completion: producers emit, the buffer is closed once they are
    /// done, consumers drain what is left.
    pub fn run(&self) -> BufferResult<PipelineReport> {
        let cfg = self.config;
        let total = cfg.total_items().ok_or_else(|| {
            BufferError::Config("producer value ranges overflow".to_string())
        })?;
        let buffer = BoundedBuffer::with_config(cfg.buffer)?;
        info!(
            "pipeline start: capacity={} producers={} consumers={} items={}",
            cfg.buffer.capacity, cfg.producers, cfg.consumers, total
        );

        let mut consumers = Vec::with_capacity(cfg.consumers);
        for index in 0..cfg.consumers {
            consumers.push(spawn_consumer(buffer.clone(), index, cfg.jitter)?);
        }
        let mut producers = Vec::with_capacity(cfg.producers);
        let mut start = 0u64;
        for index in 0..cfg.producers {
            // start + items_per_producer <= total, checked above
            let values = start..start + cfg.items_per_producer;
            start = values.end;
            producers.push(spawn_producer(buffer.clone(), index, values, cfg.jitter)?);
        }

        let mut produced = 0;
        let mut first_err = None;
        for producer in producers {
            match producer.join() {
                Ok(n) => produced += n,
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        buffer.close();

        let mut consumed = Vec::with_capacity(cfg.consumers);
        for consumer in consumers {
            match consumer.join() {
                Ok(taken) => consumed.push(taken),
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_err {
            return Err(err);
        }

        let report = PipelineReport {
            produced,
            consumed,
            stats: buffer.stats(),
            items_per_producer: cfg.items_per_producer,
        };
        info!(
            "pipeline done: produced={} consumed={} blocked_puts={} blocked_takes={}",
            report.produced,
            report.total_consumed(),
            report.stats.blocked_puts,
            report.stats.blocked_takes
        );
        Ok(report)
    }
}
