// src/network.rs
//
// Message passing between participants. Each participant owns one mailbox;
// nothing else is shared.

use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::{Error, Result};

pub trait Transport<M> {
    fn participants(&self) -> usize;

    /// Deliver `msg` to participant `to`.
    fn send(&self, to: u32, msg: M) -> Result<()>;

    /// Deliver `msg` to every participant except `from`.
    fn broadcast(&self, from: u32, msg: M) -> Result<()>
    where
        M: Clone,
    {
        for to in 0..self.participants() as u32 {
            if to != from {
                self.send(to, msg.clone())?;
            }
        }
        Ok(())
    }

    /// Everything currently waiting in `at`'s mailbox, in arrival order.
    fn drain(&self, at: u32) -> Result<Vec<M>>;
}

/// In-process transport backed by one mpsc channel per participant.
pub struct MemoryNetwork<M> {
    outboxes: Vec<Sender<M>>,
    inboxes: Vec<Receiver<M>>,
}

impl<M> MemoryNetwork<M> {
    pub fn new(n: usize) -> Self {
        let (outboxes, inboxes) = (0..n).map(|_| channel()).unzip();
        Self { outboxes, inboxes }
    }
}

impl<M> Transport<M> for MemoryNetwork<M> {
    fn participants(&self) -> usize {
        self.outboxes.len()
    }

    fn send(&self, to: u32, msg: M) -> Result<()> {
        self.outboxes
            .get(to as usize)
            .ok_or(Error::IndexOutOfRange {
                index: to,
                n: self.outboxes.len(),
            })?
            .send(msg)
            .map_err(|e| Error::Transport(e.to_string()))
    }

    fn drain(&self, at: u32) -> Result<Vec<M>> {
        let inbox = self.inboxes.get(at as usize).ok_or(Error::IndexOutOfRange {
            index: at,
            n: self.inboxes.len(),
        })?;
        Ok(inbox.try_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_skips_sender_and_keeps_order() {
        let net = MemoryNetwork::<u32>::new(3);
        net.broadcast(1, 10).unwrap();
        net.send(1, 20).unwrap();
        net.broadcast(0, 30).unwrap();
        assert_eq!(net.drain(0).unwrap(), vec![10]);
        assert_eq!(net.drain(1).unwrap(), vec![20, 30]);
        assert_eq!(net.drain(2).unwrap(), vec![10, 30]);
        assert!(net.drain(2).unwrap().is_empty());
    }

    #[test]
    fn unknown_participant() {
        let net = MemoryNetwork::<u32>::new(2);
        assert_eq!(
            net.send(2, 1).unwrap_err(),
            Error::IndexOutOfRange { index: 2, n: 2 }
        );
        assert!(net.drain(5).is_err());
    }
}
