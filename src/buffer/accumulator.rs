use super::batch::{Batch, BatchConfig, SealReason};
use super::clock::Clock;
use parking_lot::Mutex;
use std::mem;
use std::sync::Arc;

// Upper bound on the capacity reserved for a fresh batch.
const MAX_PREALLOCATED_RECORDS: usize = 1_024;

/// Whether the accumulator takes records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intake {
    /// Not opened yet; records are refused and nothing is ever sealed.
    Pending,
    /// Records are appended and seal conditions evaluated.
    Open,
    /// Closed for good.
    Closed,
}

/// A record refused because the accumulator was not open.
#[derive(Debug)]
pub struct Rejected<R> {
    pub record: R,
    pub intake: Intake,
}

impl<R> Rejected<R> {
    pub fn into_record(self) -> R {
        self.record
    }
}

struct AccumulatorState<R> {
    records: Vec<R>,
    last_seal_millis: u64,
    intake: Intake,
}

/// Owns the open batch and decides when it gets sealed.
///
/// Every operation takes the one lock, does O(1) work and releases it. A
/// sealed batch leaves the accumulator by value and is never seen again, so
/// concurrent callers of [`seal_if_due`](Self::seal_if_due) can never both
/// receive the same records.
pub struct BatchAccumulator<R> {
    state: Mutex<AccumulatorState<R>>,
    queue_depth: usize,
    seal_after_millis: u64,
    clock: Arc<dyn Clock>,
}

impl<R> BatchAccumulator<R> {
    pub fn new(config: &BatchConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now_millis();
        Self {
            state: Mutex::new(AccumulatorState {
                records: Vec::with_capacity(config.queue_depth.min(MAX_PREALLOCATED_RECORDS)),
                last_seal_millis: now,
                intake: Intake::Pending,
            }),
            queue_depth: config.queue_depth,
            seal_after_millis: config.seal_after_millis(),
            clock,
        }
    }

    /// Starts taking records. Returns the intake state seen before the call;
    /// only `Pending` transitions to `Open`.
    pub fn open(&self) -> Intake {
        let mut state = self.state.lock();
        let previous = state.intake;
        if previous == Intake::Pending {
            state.intake = Intake::Open;
            state.last_seal_millis = self.clock.now_millis();
        }
        previous
    }

    /// Appends a record and seals the batch if that made a seal due.
    pub fn append(&self, record: R) -> Result<Option<Batch<R>>, Rejected<R>> {
        let mut state = self.state.lock();
        if state.intake != Intake::Open {
            return Err(Rejected {
                record,
                intake: state.intake,
            });
        }

        state.records.push(record);
        let now = self.clock.now_millis();
        Ok(self.seal_reason(&state, now).map(|reason| self.take(&mut state, reason, now)))
    }

    /// Seals the open batch if it is full or stale.
    pub fn seal_if_due(&self) -> Option<Batch<R>> {
        let mut state = self.state.lock();
        let now = self.clock.now_millis();
        let reason = self.seal_reason(&state, now)?;
        Some(self.take(&mut state, reason, now))
    }

    /// Seals the open batch regardless of age or size, if it holds anything.
    pub fn force_seal(&self) -> Option<Batch<R>> {
        let mut state = self.state.lock();
        if state.records.is_empty() {
            return None;
        }
        let now = self.clock.now_millis();
        Some(self.take(&mut state, SealReason::Shutdown, now))
    }

    /// Stops taking records and seals whatever is left, in one critical
    /// section. Returns the intake state seen before the call.
    pub fn close(&self) -> (Intake, Option<Batch<R>>) {
        let mut state = self.state.lock();
        let previous = state.intake;
        state.intake = Intake::Closed;

        if state.records.is_empty() {
            return (previous, None);
        }
        let now = self.clock.now_millis();
        (previous, Some(self.take(&mut state, SealReason::Shutdown, now)))
    }

    pub fn intake(&self) -> Intake {
        self.state.lock().intake
    }

    /// Number of records in the open batch.
    pub fn pending(&self) -> usize {
        self.state.lock().records.len()
    }

    fn seal_reason(&self, state: &AccumulatorState<R>, now: u64) -> Option<SealReason> {
        if state.intake != Intake::Open || state.records.is_empty() {
            return None;
        }

        if state.records.len() >= self.queue_depth {
            Some(SealReason::SizeBased)
        } else if now.saturating_sub(state.last_seal_millis) > self.seal_after_millis {
            Some(SealReason::TimeBased)
        } else {
            None
        }
    }

    fn take(&self, state: &mut AccumulatorState<R>, reason: SealReason, now: u64) -> Batch<R> {
        let fresh = Vec::with_capacity(self.queue_depth.min(MAX_PREALLOCATED_RECORDS));
        let records = mem::replace(&mut state.records, fresh);
        state.last_seal_millis = now;
        Batch::new(records, reason, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ManualClock;
    use std::collections::HashSet;
    use std::time::Duration;

    fn accumulator(queue_depth: usize, interval_ms: u64) -> (BatchAccumulator<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let config = BatchConfig::new(queue_depth, interval_ms);
        (BatchAccumulator::new(&config, clock.clone()), clock)
    }

    #[test]
    fn test_refuses_records_before_open() {
        let (acc, _clock) = accumulator(3, 1_000);

        let rejected = acc.append(7).unwrap_err();
        assert_eq!(rejected.intake, Intake::Pending);
        assert_eq!(rejected.into_record(), 7);
        assert_eq!(acc.pending(), 0);
        assert!(acc.seal_if_due().is_none());
    }

    #[test]
    fn test_seals_exactly_at_queue_depth() {
        let (acc, _clock) = accumulator(3, 1_000);
        acc.open();

        assert!(acc.append(1).unwrap().is_none());
        assert!(acc.append(2).unwrap().is_none());
        let batch = acc.append(3).unwrap().expect("third record fills the batch");

        assert_eq!(batch.records(), &[1, 2, 3]);
        assert_eq!(batch.reason(), SealReason::SizeBased);
        assert_eq!(acc.pending(), 0);
    }

    #[test]
    fn test_time_seal_needs_strictly_more_than_half_interval() {
        let (acc, clock) = accumulator(100, 1_000);
        acc.open();
        acc.append(1).unwrap();

        clock.advance(Duration::from_millis(500));
        assert!(acc.seal_if_due().is_none(), "exactly half the interval is not stale yet");

        clock.advance(Duration::from_millis(1));
        let batch = acc.seal_if_due().expect("stale batch should seal");
        assert_eq!(batch.reason(), SealReason::TimeBased);
        assert_eq!(batch.sealed_at_millis(), 501);
    }

    #[test]
    fn test_empty_batch_never_time_sealed() {
        let (acc, clock) = accumulator(100, 1_000);
        acc.open();

        clock.advance(Duration::from_secs(60));
        assert!(acc.seal_if_due().is_none());
        assert!(acc.force_seal().is_none());
    }

    #[test]
    fn test_seal_resets_staleness_window() {
        let (acc, clock) = accumulator(2, 1_000);
        acc.open();

        clock.advance(Duration::from_millis(400));
        acc.append(1).unwrap();
        acc.append(2).unwrap().expect("size seal");

        // Window restarts at the size seal, not at open()
        clock.advance(Duration::from_millis(300));
        acc.append(3).unwrap();
        assert!(acc.seal_if_due().is_none());

        clock.advance(Duration::from_millis(201));
        assert_eq!(acc.seal_if_due().unwrap().records(), &[3]);
    }

    #[test]
    fn test_stale_batch_seals_on_append_path() {
        let (acc, clock) = accumulator(100, 1_000);
        acc.open();
        acc.append(1).unwrap();

        clock.advance(Duration::from_millis(600));
        let batch = acc.append(2).unwrap().expect("producer path sees the stale batch");
        assert_eq!(batch.records(), &[1, 2]);
        assert_eq!(batch.reason(), SealReason::TimeBased);
    }

    #[test]
    fn test_close_seals_remainder_and_refuses_more() {
        let (acc, _clock) = accumulator(100, 1_000);
        acc.open();
        for i in 0..5 {
            acc.append(i).unwrap();
        }

        let (previous, batch) = acc.close();
        assert_eq!(previous, Intake::Open);
        let batch = batch.expect("five buffered records");
        assert_eq!(batch.len(), 5);
        assert_eq!(batch.reason(), SealReason::Shutdown);

        assert_eq!(acc.append(9).unwrap_err().intake, Intake::Closed);
        let (again, rest) = acc.close();
        assert_eq!(again, Intake::Closed);
        assert!(rest.is_none());
    }

    #[test]
    fn test_open_is_one_shot() {
        let (acc, _clock) = accumulator(1, 1_000);
        assert_eq!(acc.open(), Intake::Pending);
        assert_eq!(acc.open(), Intake::Open);
        acc.close();
        assert_eq!(acc.open(), Intake::Closed);
        assert_eq!(acc.intake(), Intake::Closed);
    }

    #[test]
    fn test_concurrent_appends_and_seals_never_duplicate() {
        let (acc, clock) = accumulator(7, 10);
        let acc = Arc::new(acc);
        acc.open();

        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let acc = Arc::clone(&acc);
                std::thread::spawn(move || {
                    let mut sealed = Vec::new();
                    for i in 0..1_000u32 {
                        if let Some(batch) = acc.append(p * 10_000 + i).unwrap() {
                            sealed.push(batch);
                        }
                    }
                    sealed
                })
            })
            .collect();

        let ticker = {
            let acc = Arc::clone(&acc);
            let clock = Arc::clone(&clock);
            std::thread::spawn(move || {
                let mut sealed = Vec::new();
                for _ in 0..500 {
                    clock.advance(Duration::from_millis(3));
                    if let Some(batch) = acc.seal_if_due() {
                        sealed.push(batch);
                    }
                }
                sealed
            })
        };

        let mut batches: Vec<Batch<u32>> = producers
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        batches.extend(ticker.join().unwrap());
        batches.extend(acc.close().1);

        let mut seen = HashSet::new();
        for batch in &batches {
            assert!(batch.len() <= 7);
            for record in batch.records() {
                assert!(seen.insert(*record), "record {record} dispatched twice");
            }
        }
        assert_eq!(seen.len(), 4_000);
    }
}
