use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use commit_log::CommitLog;
use commit_log::Config;
use commit_log::LogError;

#[derive(Clone, Debug, PartialEq, Eq, clap::Parser)]
#[clap(about = "append to and read back from a CommitLog", author)]
pub struct Args {
    /// Directory of the log; it is removed when the bench finishes.
    #[arg(value_name = "DIR")]
    dir: String,

    #[arg(long, default_value_t = 1024 * 1024)]
    count: u64,

    /// Payload size in bytes.
    #[arg(long, default_value_t = 64)]
    size: usize,

    /// Report throughput every this many operations.
    #[arg(long, default_value_t = 100_000)]
    step: u64,

    #[arg(long)]
    max_store_bytes: Option<u64>,
}

fn main() -> Result<(), LogError> {
    let args = Args::parse();

    let config = Config {
        dir: args.dir.clone(),
        max_store_bytes: args.max_store_bytes,
        ..Default::default()
    };

    let log = CommitLog::open(Arc::new(config))?;
    let payload = vec![b'x'; args.size];
    let step = args.step.max(1);

    let total = Instant::now();
    let mut start = Instant::now();

    for i in 0..args.count {
        log.append(&payload)?;

        if i > 0 && i % step == 0 {
            report("append", i, step, start);
            start = Instant::now();
        }
    }

    log.flush()?;
    println!("append all: {:?}", total.elapsed());
    println!("{:#}", log.stat()?);

    let total = Instant::now();
    let mut start = Instant::now();

    for i in 0..args.count {
        let got = log.read(i)?;
        assert_eq!(args.size, got.len());

        if i > 0 && i % step == 0 {
            report("read", i, step, start);
            start = Instant::now();
        }
    }

    println!("read all: {:?}", total.elapsed());

    log.remove()?;
    Ok(())
}

fn report(op: &str, i: u64, step: u64, start: Instant) {
    let elapsed = start.elapsed();
    println!(
        "{} offset: {}, elapsed: {:?}, {:?}/op, {} ops/ms",
        op,
        i,
        elapsed,
        elapsed / (step as u32),
        step / (elapsed.as_millis() as u64 + 1)
    );
}
