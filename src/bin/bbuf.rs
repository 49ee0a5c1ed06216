use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;

use bounded_buffer::config::{BufferConfig, PipelineConfig};
use bounded_buffer::error::BufferResult;
use bounded_buffer::pipeline::Pipeline;

/// Run producers and consumers over one bounded buffer and check the handoff.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Number of buffer slots
    #[arg(short, long, default_value_t = 10, allow_negative_numbers = true)]
    capacity: i64,

    #[arg(short, long, default_value_t = 1)]
    producers: usize,

    #[arg(long, default_value_t = 1)]
    consumers: usize,

    /// Items emitted by each producer
    #[arg(short, long, default_value_t = 1000)]
    items: u64,

    /// Max random pause between operations, in microseconds
    #[arg(long)]
    jitter_us: Option<u64>,
}

fn run(cli: Cli) -> BufferResult<bool> {
    let config = PipelineConfig {
        buffer: BufferConfig::from_signed(cli.capacity)?,
        producers: cli.producers,
        consumers: cli.consumers,
        items_per_producer: cli.items,
        jitter: cli.jitter_us.map(Duration::from_micros),
    };
    let pipeline = Pipeline::new(config)?;

    let started = Instant::now();
    let report = pipeline.run()?;
    let elapsed = started.elapsed();

    println!("capacity:       {}", report.stats.capacity);
    println!("produced:       {}", report.produced);
    println!("consumed:       {}", report.total_consumed());
    for (i, taken) in report.consumed.iter().enumerate() {
        println!("  consumer-{}:   {}", i, taken.len());
    }
    println!("blocked puts:   {}", report.stats.blocked_puts);
    println!("blocked takes:  {}", report.stats.blocked_takes);
    println!("elapsed:        {:?}", elapsed);

    let ok = report.is_lossless() && report.preserves_producer_order();
    println!("lossless:       {}", ok);
    Ok(ok)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
