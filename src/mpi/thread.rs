/*
MIT License with GPAW Attribution

Copyright (c) 2025 gpaw-rs developers

Based on or developed using Distribution: GPAW
Copyright (c) 2003 CAMd, Department of Physics, Technical University of Denmark.
All rights reserved.
*/

//! In-process communicator with one OS thread per rank
//!
//! Every rank owns a mailbox fed by per-rank channels; sub-communicators
//! share the mailbox of their parent and are distinguished by a context
//! id carried in every message.  Synchronous sends block on an
//! acknowledgement that the receiver emits only when the message is
//! matched by a `receive` call, reproducing the rendezvous behavior that
//! the grid `collect` relies on to bound unreceived-message buildup.
//!
//! User tags must be non-negative; negative tags are reserved for the
//! built-in collectives.

use super::errors::{CommError, Result};
use super::{Communicator, Request};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Barrier, Mutex};

const TAG_REDUCE: i32 = -101;
const TAG_BCAST: i32 = -102;
const TAG_MAX: i32 = -103;

struct Message {
    src_world: usize,
    ctx: u64,
    tag: i32,
    data: Vec<f64>,
    ack: Option<Sender<()>>,
}

struct Mailbox {
    rx: Receiver<Message>,
    pending: Vec<Message>,
}

#[derive(Default)]
struct RendezvousEntry {
    ctx: u64,
    taken: HashSet<usize>,
}

struct WorldShared {
    senders: Vec<Sender<Message>>,
    next_ctx: AtomicU64,
    barriers: Mutex<HashMap<u64, Arc<Barrier>>>,
    rendezvous: Mutex<HashMap<(u64, Vec<usize>), VecDeque<RendezvousEntry>>>,
}

/// Communicator over in-process channels; see the module docs
pub struct ThreadCommunicator {
    world: Arc<WorldShared>,
    mailbox: Arc<Mutex<Mailbox>>,
    ctx: u64,
    rank: usize,
    /// World ranks of the members, indexed by communicator rank
    group: Vec<usize>,
    barrier: Arc<Barrier>,
}

impl ThreadCommunicator {
    fn world_rank(&self, rank: usize) -> Result<usize> {
        self.group
            .get(rank)
            .copied()
            .ok_or(CommError::RankOutOfRange {
                rank,
                size: self.group.len(),
            })
    }

    fn post(&self, data: &[f64], dest: usize, tag: i32, ack: Option<Sender<()>>) -> Result<()> {
        let dst_world = self.world_rank(dest)?;
        let msg = Message {
            src_world: self.group[self.rank],
            ctx: self.ctx,
            tag,
            data: data.to_vec(),
            ack,
        };
        self.world.senders[dst_world]
            .send(msg)
            .map_err(|_| CommError::Disconnected(format!("send to rank {}", dest)))
    }
}

impl Communicator for ThreadCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.group.len()
    }

    fn send(&self, data: &[f64], dest: usize, tag: i32) -> Result<()> {
        self.post(data, dest, tag, None)
    }

    fn ssend(&self, data: &[f64], dest: usize, tag: i32) -> Result<()> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.post(data, dest, tag, Some(ack_tx))?;
        ack_rx
            .recv()
            .map_err(|_| CommError::Disconnected(format!("ssend ack from rank {}", dest)))
    }

    fn isend(&self, data: &[f64], dest: usize, tag: i32) -> Result<Request> {
        // The payload is copied into the message, so the operation is
        // already complete from the sender's point of view.
        self.post(data, dest, tag, None)?;
        Ok(Request(0))
    }

    fn wait(&self, _request: Request) -> Result<()> {
        Ok(())
    }

    fn receive(&self, data: &mut [f64], source: usize, tag: i32) -> Result<()> {
        let src_world = self.world_rank(source)?;
        let mut mailbox = self.mailbox.lock().unwrap();

        let matches =
            |m: &Message| m.src_world == src_world && m.ctx == self.ctx && m.tag == tag;

        let msg = if let Some(pos) = mailbox.pending.iter().position(&matches) {
            mailbox.pending.remove(pos)
        } else {
            loop {
                let msg = mailbox
                    .rx
                    .recv()
                    .map_err(|_| CommError::Disconnected("mailbox closed".to_string()))?;
                if matches(&msg) {
                    break msg;
                }
                mailbox.pending.push(msg);
            }
        };
        drop(mailbox);

        if msg.data.len() != data.len() {
            return Err(CommError::SizeMismatch {
                expected: data.len(),
                got: msg.data.len(),
            });
        }
        data.copy_from_slice(&msg.data);
        // Rendezvous completes only when the message is matched.
        if let Some(ack) = msg.ack {
            let _ = ack.send(());
        }
        Ok(())
    }

    fn sum(&self, data: &mut [f64]) -> Result<()> {
        let size = self.size();
        if size == 1 {
            return Ok(());
        }
        if self.rank == 0 {
            let mut buf = vec![0.0; data.len()];
            for r in 1..size {
                self.receive(&mut buf, r, TAG_REDUCE)?;
                for (d, b) in data.iter_mut().zip(&buf) {
                    *d += b;
                }
            }
        } else {
            self.send(data, 0, TAG_REDUCE)?;
        }
        self.broadcast(data, 0)
    }

    fn max_scalar(&self, value: f64) -> Result<f64> {
        let size = self.size();
        if size == 1 {
            return Ok(value);
        }
        let mut buf = [value];
        if self.rank == 0 {
            let mut tmp = [0.0];
            for r in 1..size {
                self.receive(&mut tmp, r, TAG_MAX)?;
                buf[0] = buf[0].max(tmp[0]);
            }
        } else {
            self.send(&buf, 0, TAG_MAX)?;
        }
        self.broadcast(&mut buf, 0)?;
        Ok(buf[0])
    }

    fn broadcast(&self, data: &mut [f64], root: usize) -> Result<()> {
        let size = self.size();
        if size == 1 {
            return Ok(());
        }
        if self.rank == root {
            for r in 0..size {
                if r != root {
                    self.send(data, r, TAG_BCAST)?;
                }
            }
            Ok(())
        } else {
            self.receive(data, root, TAG_BCAST)
        }
    }

    fn barrier(&self) -> Result<()> {
        self.barrier.wait();
        Ok(())
    }

    fn new_communicator(&self, ranks: &[usize]) -> Result<Option<Arc<dyn Communicator>>> {
        let mut world_group = Vec::with_capacity(ranks.len());
        for &r in ranks {
            world_group.push(self.world_rank(r)?);
        }
        let position = match ranks.iter().position(|&r| r == self.rank) {
            Some(p) => p,
            None => return Ok(None),
        };

        let my_world = self.group[self.rank];
        let key = (self.ctx, world_group.clone());
        let ctx;
        {
            let mut rendezvous = self.world.rendezvous.lock().unwrap();
            let entries = rendezvous.entry(key.clone()).or_default();
            let idx = entries.iter().position(|e| !e.taken.contains(&my_world));
            let idx = match idx {
                Some(i) => i,
                None => {
                    let new_ctx = self.world.next_ctx.fetch_add(1, Ordering::SeqCst);
                    self.world
                        .barriers
                        .lock()
                        .unwrap()
                        .insert(new_ctx, Arc::new(Barrier::new(world_group.len())));
                    entries.push_back(RendezvousEntry {
                        ctx: new_ctx,
                        taken: HashSet::new(),
                    });
                    entries.len() - 1
                }
            };
            entries[idx].taken.insert(my_world);
            ctx = entries[idx].ctx;
            if entries[idx].taken.len() == world_group.len() {
                entries.remove(idx);
            }
        }

        let barrier = self.world.barriers.lock().unwrap()[&ctx].clone();
        Ok(Some(Arc::new(ThreadCommunicator {
            world: self.world.clone(),
            mailbox: self.mailbox.clone(),
            ctx,
            rank: position,
            group: world_group,
            barrier,
        })))
    }
}

/// Harness that runs one closure per rank, each on its own thread
pub struct ThreadWorld;

impl ThreadWorld {
    /// Run `f` on `size` ranks and collect the per-rank return values
    ///
    /// # Arguments
    ///
    /// * `size` - Number of ranks
    /// * `f` - Closure invoked once per rank with that rank's communicator
    pub fn run<F, T>(size: usize, f: F) -> Vec<T>
    where
        F: Fn(Arc<ThreadCommunicator>) -> T + Send + Sync,
        T: Send,
    {
        assert!(size > 0, "communicator needs at least one rank");

        let mut senders = Vec::with_capacity(size);
        let mut receivers = Vec::with_capacity(size);
        for _ in 0..size {
            let (tx, rx) = mpsc::channel();
            senders.push(tx);
            receivers.push(rx);
        }
        let mut barriers = HashMap::new();
        barriers.insert(0, Arc::new(Barrier::new(size)));
        let world = Arc::new(WorldShared {
            senders,
            next_ctx: AtomicU64::new(1),
            barriers: Mutex::new(barriers),
            rendezvous: Mutex::new(HashMap::new()),
        });

        let f = &f;
        let mut results: Vec<Option<T>> = (0..size).map(|_| None).collect();
        std::thread::scope(|scope| {
            let handles: Vec<_> = receivers
                .into_iter()
                .enumerate()
                .map(|(rank, rx)| {
                    let world = world.clone();
                    scope.spawn(move || {
                        let barrier = world.barriers.lock().unwrap()[&0].clone();
                        let comm = Arc::new(ThreadCommunicator {
                            world: world.clone(),
                            mailbox: Arc::new(Mutex::new(Mailbox {
                                rx,
                                pending: Vec::new(),
                            })),
                            ctx: 0,
                            rank,
                            group: (0..size).collect(),
                            barrier,
                        });
                        f(comm)
                    })
                })
                .collect();
            for (rank, handle) in handles.into_iter().enumerate() {
                results[rank] = Some(handle.join().expect("rank thread panicked"));
            }
        });
        results.into_iter().map(|r| r.unwrap()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_to_point() {
        let results = ThreadWorld::run(2, |comm| {
            if comm.rank() == 0 {
                comm.send(&[1.0, 2.0, 3.0], 1, 7).unwrap();
                0.0
            } else {
                let mut buf = [0.0; 3];
                comm.receive(&mut buf, 0, 7).unwrap();
                buf.iter().sum()
            }
        });
        assert_eq!(results[1], 6.0);
    }

    #[test]
    fn test_out_of_order_tags() {
        // Two messages with different tags must be matchable in either order
        let results = ThreadWorld::run(2, |comm| {
            if comm.rank() == 0 {
                comm.send(&[1.0], 1, 1).unwrap();
                comm.send(&[2.0], 1, 2).unwrap();
                0.0
            } else {
                let mut a = [0.0];
                let mut b = [0.0];
                comm.receive(&mut b, 0, 2).unwrap();
                comm.receive(&mut a, 0, 1).unwrap();
                a[0] * 10.0 + b[0]
            }
        });
        assert_eq!(results[1], 12.0);
    }

    #[test]
    fn test_sum_and_broadcast() {
        let results = ThreadWorld::run(4, |comm| {
            let mut data = [comm.rank() as f64, 1.0];
            comm.sum(&mut data).unwrap();
            data
        });
        for data in results {
            assert_eq!(data, [6.0, 4.0]);
        }
    }

    #[test]
    fn test_max_scalar() {
        let results = ThreadWorld::run(3, |comm| comm.max_scalar(comm.rank() as f64).unwrap());
        assert!(results.iter().all(|&v| v == 2.0));
    }

    #[test]
    fn test_ssend_rendezvous_completes() {
        let results = ThreadWorld::run(2, |comm| {
            if comm.rank() == 0 {
                comm.ssend(&[42.0], 1, 3).unwrap();
                true
            } else {
                let mut buf = [0.0];
                comm.receive(&mut buf, 0, 3).unwrap();
                buf[0] == 42.0
            }
        });
        assert!(results.iter().all(|&ok| ok));
    }

    #[test]
    fn test_sub_communicator() {
        let results = ThreadWorld::run(4, |comm| {
            let sub = comm.new_communicator(&[0, 2]).unwrap();
            match sub {
                Some(sub) => {
                    let mut v = [sub.rank() as f64 + 1.0];
                    sub.sum(&mut v).unwrap();
                    v[0]
                }
                None => -1.0,
            }
        });
        assert_eq!(results, vec![3.0, -1.0, 3.0, -1.0]);
    }
}
