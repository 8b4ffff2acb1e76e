//! In-process transport: logical ranks simulated as threads.
//!
//! A [`ThreadUniverse`] spawns one scoped thread per rank and hands each a [`ThreadComm`].
//! Ranks talk through a shared mailbox keyed by `(context, source, dest, tag)`; each key is
//! a FIFO queue, so two messages between the same pair on the same communicator and tag are
//! never reordered. Collectives are built from those point-to-point messages and always
//! combine contributions in rank order, which keeps every sum deterministic.

use std::cell::Cell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use super::Comm;

const WORLD_CONTEXT: u64 = 0;

// User tags occupy the low 16 bits; collectives live above them.
const COLLECTIVE: u32 = 1 << 16;
const TAG_REDUCE: u32 = COLLECTIVE | 1;
const TAG_GATHER: u32 = COLLECTIVE | 2;
const TAG_BCAST: u32 = COLLECTIVE | 3;
const TAG_SPLIT: u32 = COLLECTIVE | 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Envelope {
    context: u64,
    source: usize,
    dest: usize,
    tag: u32,
}

#[derive(Debug)]
enum Payload {
    Values(Vec<f64>),
    Counts(Vec<usize>),
}

#[derive(Default)]
struct Mailbox {
    queues: Mutex<HashMap<Envelope, VecDeque<Payload>>>,
    arrived: Condvar,
}

impl Mailbox {
    fn post(&self, envelope: Envelope, payload: Payload) {
        let mut queues = self.queues.lock();
        queues.entry(envelope).or_default().push_back(payload);
        self.arrived.notify_all();
    }

    fn take(&self, envelope: Envelope) -> Payload {
        let mut queues = self.queues.lock();
        loop {
            if let Some(queue) = queues.get_mut(&envelope) {
                if let Some(payload) = queue.pop_front() {
                    if queue.is_empty() {
                        queues.remove(&envelope);
                    }
                    return payload;
                }
            }
            self.arrived.wait(&mut queues);
        }
    }
}

/// Communicator handle for one simulated rank.
///
/// Sub-communicators produced by [`Comm::split`] share the universe's mailbox but use a
/// fresh context id, so traffic on different communicators never mixes. Dropping the handle
/// releases the communicator.
pub struct ThreadComm {
    rank: usize,
    /// World rank of every member, indexed by rank within this communicator.
    members: Arc<[usize]>,
    context: u64,
    splits: Cell<u64>,
    mailbox: Arc<Mailbox>,
}

impl ThreadComm {
    /// Rank of this process in the universe, independent of any split.
    pub fn world_rank(&self) -> usize {
        self.members[self.rank]
    }

    fn envelope(&self, source: usize, dest: usize, tag: u32) -> Envelope {
        Envelope {
            context: self.context,
            source: self.members[source],
            dest: self.members[dest],
            tag,
        }
    }

    fn post(&self, dest: usize, tag: u32, payload: Payload) {
        self.mailbox.post(self.envelope(self.rank, dest, tag), payload);
    }

    fn take(&self, source: usize, tag: u32) -> Payload {
        self.mailbox.take(self.envelope(source, self.rank, tag))
    }

    fn take_values(&self, source: usize, tag: u32) -> Vec<f64> {
        match self.take(source, tag) {
            Payload::Values(values) => values,
            Payload::Counts(_) => unreachable!("count payload on value channel"),
        }
    }

    fn take_counts(&self, source: usize, tag: u32) -> Vec<usize> {
        match self.take(source, tag) {
            Payload::Counts(counts) => counts,
            Payload::Values(_) => unreachable!("value payload on count channel"),
        }
    }

    /// Gathers `mine` from every rank at rank 0 (concatenated in rank order) and fans the
    /// result back out.
    fn all_gather_counts(&self, mine: &[usize], tag: u32) -> Vec<usize> {
        if self.size() == 1 {
            return mine.to_vec();
        }
        if self.rank == 0 {
            let mut all = mine.to_vec();
            for source in 1..self.size() {
                all.extend(self.take_counts(source, tag));
            }
            for dest in 1..self.size() {
                self.post(dest, tag, Payload::Counts(all.clone()));
            }
            all
        } else {
            self.post(0, tag, Payload::Counts(mine.to_vec()));
            self.take_counts(0, tag)
        }
    }
}

impl Comm for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.members.len()
    }

    fn barrier(&self) {
        self.all_reduce(0.0);
    }

    fn all_reduce(&self, x: f64) -> f64 {
        if self.size() == 1 {
            return x;
        }
        if self.rank == 0 {
            let mut acc = x;
            for source in 1..self.size() {
                acc += self.take_values(source, TAG_REDUCE)[0];
            }
            for dest in 1..self.size() {
                self.post(dest, TAG_REDUCE, Payload::Values(vec![acc]));
            }
            acc
        } else {
            self.post(0, TAG_REDUCE, Payload::Values(vec![x]));
            self.take_values(0, TAG_REDUCE)[0]
        }
    }

    fn all_reduce_count(&self, n: usize) -> usize {
        self.all_gather_count(n).into_iter().sum()
    }

    fn all_gather_count(&self, n: usize) -> Vec<usize> {
        self.all_gather_counts(&[n], TAG_GATHER)
    }

    fn broadcast(&self, buf: &mut [f64], root: usize) {
        if self.size() == 1 {
            return;
        }
        if self.rank == root {
            for dest in (0..self.size()).filter(|&d| d != root) {
                self.post(dest, TAG_BCAST, Payload::Values(buf.to_vec()));
            }
        } else {
            let values = self.take_values(root, TAG_BCAST);
            buf.copy_from_slice(&values);
        }
    }

    fn send(&self, value: f64, dest: usize, tag: u16) {
        self.post(dest, u32::from(tag), Payload::Values(vec![value]));
    }

    fn receive(&self, source: usize, tag: u16) -> f64 {
        self.take_values(source, u32::from(tag))[0]
    }

    fn split(&self, color: usize, key: usize) -> Self {
        let sequence = self.splits.get();
        self.splits.set(sequence + 1);

        let pairs = self.all_gather_counts(&[color, key], TAG_SPLIT);
        let mut peers: Vec<(usize, usize)> = pairs
            .chunks_exact(2)
            .enumerate()
            .filter(|(_, pair)| pair[0] == color)
            .map(|(rank, pair)| (pair[1], rank))
            .collect();
        peers.sort_unstable();

        let rank = peers
            .iter()
            .position(|&(_, r)| r == self.rank)
            .unwrap_or_default();
        let members: Arc<[usize]> = peers.iter().map(|&(_, r)| self.members[r]).collect();

        let mut hasher = DefaultHasher::new();
        (self.context, sequence, color).hash(&mut hasher);

        ThreadComm {
            rank,
            members,
            context: hasher.finish(),
            splits: Cell::new(0),
            mailbox: Arc::clone(&self.mailbox),
        }
    }
}

/// A set of simulated ranks sharing one mailbox.
#[derive(Clone, Copy, Debug)]
pub struct ThreadUniverse {
    size: usize,
}

impl ThreadUniverse {
    /// Universe of `size` ranks.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "a universe needs at least one rank");
        Self { size }
    }

    /// Universe with one rank per available CPU.
    #[cfg(feature = "rayon")]
    pub fn with_available_cpus() -> Self {
        Self::new(num_cpus::get().max(1))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs `f` once per rank, each on its own thread, and returns the results in rank order.
    ///
    /// A panic on any rank is propagated once all threads have been joined.
    pub fn run<F, R>(&self, f: F) -> Vec<R>
    where
        F: Fn(ThreadComm) -> R + Sync,
        R: Send,
    {
        let mailbox = Arc::new(Mailbox::default());
        let members: Arc<[usize]> = (0..self.size).collect();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..self.size)
                .map(|rank| {
                    let comm = ThreadComm {
                        rank,
                        members: Arc::clone(&members),
                        context: WORLD_CONTEXT,
                        splits: Cell::new(0),
                        mailbox: Arc::clone(&mailbox),
                    };
                    let f = &f;
                    scope.spawn(move || f(comm))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }
}
