use std::io;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info};
use tranx2_codec::{Passing, StreamError, Writer, MAX_TRANSPONDER_ID};

use crate::cmd::SimArgs;
use crate::exit::{stream_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};

const NOISE_LEVEL: u16 = 2000;
const NOISE_PERIOD: Duration = Duration::from_secs(5);

type SharedWriter = Arc<Mutex<Writer<io::Stdout>>>;

pub fn run(args: SimArgs) -> CliResult<i32> {
    if args.interval == 0 {
        return Err(CliError::new(USAGE, "--interval must be at least 1 ms"));
    }

    let writer: SharedWriter = Arc::new(Mutex::new(Writer::new(io::stdout())));
    let stop = Arc::new(Stop::default());
    install_ctrlc_handler(Arc::clone(&stop))?;

    let started = Instant::now();
    let ids = transponder_ids(args.transponders, args.seed);
    info!(
        transponders = ids.len(),
        interval_ms = args.interval,
        jitter_ms = args.jitter,
        "simulation started"
    );

    let mut workers = Vec::with_capacity(ids.len() + 1);
    workers.push(spawn("noise", {
        let writer = Arc::clone(&writer);
        let stop = Arc::clone(&stop);
        move || generate_noise(&writer, &stop)
    })?);
    for (index, id) in ids.into_iter().enumerate() {
        let writer = Arc::clone(&writer);
        let stop = Arc::clone(&stop);
        let schedule = Schedule {
            clock: args.clock,
            interval: args.interval,
            jitter: args.jitter,
        };
        let mut rng = SplitMix64::new(args.seed ^ ((index as u64 + 1) << 32));
        workers.push(spawn(&format!("transponder-{id}"), move || {
            generate_passings(&writer, &stop, schedule, id, &mut rng, started)
        })?);
    }

    match args.duration {
        Some(secs) => {
            stop.wait_timeout(Duration::from_secs(secs));
            stop.trigger();
        }
        None => stop.wait(),
    }

    let mut failure = None;
    for worker in workers {
        match worker.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                failure.get_or_insert(err);
            }
            Err(_) => {
                failure.get_or_insert(CliError::new(INTERNAL, "simulator thread panicked"));
            }
        }
    }

    info!(elapsed_ms = started.elapsed().as_millis() as u64, "simulation stopped");
    match failure {
        Some(err) => Err(err),
        None => Ok(SUCCESS),
    }
}

fn spawn(
    name: &str,
    f: impl FnOnce() -> CliResult<()> + Send + 'static,
) -> CliResult<thread::JoinHandle<CliResult<()>>> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|err| CliError::new(INTERNAL, format!("spawn {name}: {err}")))
}

fn generate_noise(writer: &SharedWriter, stop: &Stop) -> CliResult<()> {
    let mut next = Instant::now() + NOISE_PERIOD;
    while stop.sleep_until(next) {
        write_locked(writer, stop, |w| w.write_noise(NOISE_LEVEL))?;
        next += NOISE_PERIOD;
    }
    Ok(())
}

fn generate_passings(
    writer: &SharedWriter,
    stop: &Stop,
    schedule: Schedule,
    transponder_id: u32,
    rng: &mut SplitMix64,
    started: Instant,
) -> CliResult<()> {
    for round in 1u32.. {
        let offset = schedule.offset(round, rng.next_u32());
        if !stop.sleep_until(started + Duration::from_millis(u64::from(offset))) {
            break;
        }
        let rec = schedule.passing(transponder_id, offset, rng);
        write_locked(writer, stop, |w| w.write_passing(&rec))?;
        debug!(transponder_id, ticks = rec.passing_ticks, "passing written");
    }
    Ok(())
}

/// Write under the shared lock. A failed write stops every generator.
fn write_locked(
    writer: &SharedWriter,
    stop: &Stop,
    write: impl FnOnce(&mut Writer<io::Stdout>) -> Result<usize, StreamError>,
) -> CliResult<()> {
    let mut guard = writer.lock().unwrap_or_else(PoisonError::into_inner);
    write(&mut *guard).map(|_| ()).map_err(|err| {
        error!(error = %err, "write failed");
        stop.trigger();
        stream_error("write failed", err)
    })
}

/// Timing parameters shared by all transponders.
#[derive(Debug, Clone, Copy)]
struct Schedule {
    clock: u32,
    interval: u32,
    jitter: u32,
}

impl Schedule {
    /// Milliseconds from start until the given round's passing.
    ///
    /// `interval * round` shifted by up to `jitter / 2` either way. Arithmetic
    /// wraps like the decoder's 32-bit tick counter.
    fn offset(&self, round: u32, random: u32) -> u32 {
        let spread = match self.jitter.checked_add(1) {
            Some(modulus) => random % modulus,
            None => random,
        };
        self.interval
            .wrapping_mul(round)
            .wrapping_add(spread)
            .wrapping_sub(self.jitter / 2)
    }

    fn passing(&self, transponder_id: u32, offset: u32, rng: &mut SplitMix64) -> Passing {
        Passing {
            transponder_id,
            passing_ticks: self.clock.wrapping_add(offset),
            hits: (rng.next_u32() % 10) as u8 + 5,
            strength: (rng.next_u32() % 50) as u8 + 80,
            prefix: rng.next_u32() as u16,
            trailing: rng.next_u32() as u8,
        }
    }
}

fn transponder_ids(count: u32, seed: u64) -> Vec<u32> {
    let mut rng = SplitMix64::new(seed);
    (0..count)
        .map(|_| rng.next_u32() % (MAX_TRANSPONDER_ID + 1))
        .collect()
}

/// SplitMix64 generator. Small, seedable and good enough for test traffic.
struct SplitMix64(u64);

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }
}

/// One-shot stop signal shared by the generators and the main thread.
#[derive(Default)]
struct Stop {
    stopped: Mutex<bool>,
    cond: Condvar,
}

impl Stop {
    fn trigger(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.cond.notify_all();
    }

    /// Sleep until `deadline`. Returns false if stopped first.
    fn sleep_until(&self, deadline: Instant) -> bool {
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if *stopped {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            stopped = self
                .cond
                .wait_timeout(stopped, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn wait_timeout(&self, timeout: Duration) {
        let _ = self.sleep_until(Instant::now() + timeout);
    }

    fn wait(&self) {
        let mut stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        while !*stopped {
            stopped = self
                .cond
                .wait(stopped)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

fn install_ctrlc_handler(stop: Arc<Stop>) -> CliResult<()> {
    ctrlc::set_handler(move || stop.trigger()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
