use std::collections::VecDeque;
use crate::error::BroadcastError;
use crate::types::Sample;

/// The serial/DMA output hardware, reduced to what the feeder needs. Clocking and pin routing are
/// done by whoever constructs the implementation.
pub trait OutputPeripheral {
    /// Point the hardware at the pool as one circular descriptor chain.
    fn attach(&mut self, pool: &TransmissionPool);

    /// The descriptor of the buffer the hardware just finished sending, if one completed.
    fn acquire(&mut self) -> Option<usize>;

    /// Hand a refilled buffer back to the hardware.
    fn mark_ready(&mut self, descriptor: usize, samples: &[Sample]);

    /// Enable or disable the completion interrupt.
    fn set_notifications(&mut self, enabled: bool);
}

/// The transmission buffers, one line each, allocated once as a single block.
pub struct TransmissionPool {
    samples: Box<[Sample]>,
    line_len: usize,
}

impl TransmissionPool {
    pub fn new(depth: usize, line_len: usize) -> Result<Self, BroadcastError> {
        if depth < 2 {
            return Err(BroadcastError::PoolTooShallow(depth));
        }
        let too_big = || BroadcastError::Allocation {
            what: "transmission pool",
            bytes: depth
                .saturating_mul(line_len)
                .saturating_mul(std::mem::size_of::<Sample>()),
        };
        let len = depth.checked_mul(line_len).ok_or_else(too_big)?;

        let mut samples = Vec::new();
        samples.try_reserve_exact(len).map_err(|_| too_big())?;
        samples.resize(len, 0);

        Ok(Self {
            samples: samples.into_boxed_slice(),
            line_len,
        })
    }

    pub fn depth(&self) -> usize {
        self.samples.len() / self.line_len
    }

    pub fn line_len(&self) -> usize {
        self.line_len
    }

    pub fn buffer(&self, descriptor: usize) -> Option<&[Sample]> {
        let start = descriptor.checked_mul(self.line_len)?;
        self.samples.get(start..start + self.line_len)
    }

    pub fn buffer_mut(&mut self, descriptor: usize) -> Option<&mut [Sample]> {
        let start = descriptor.checked_mul(self.line_len)?;
        self.samples.get_mut(start..start + self.line_len)
    }
}

/// A peripheral that completes buffers on demand and keeps a copy of everything it was given.
/// Stands in for the hardware in tests and in the preview window.
#[derive(Debug, Default)]
pub struct LoopbackOutput {
    depth: usize,
    next: usize,
    enabled: bool,
    sent: VecDeque<Vec<Sample>>,
}

impl LoopbackOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications_enabled(&self) -> bool {
        self.enabled
    }

    /// Lines handed back so far, oldest first.
    pub fn take_lines(&mut self) -> Vec<Vec<Sample>> {
        self.sent.drain(..).collect()
    }

    pub fn pending_lines(&self) -> usize {
        self.sent.len()
    }
}

impl OutputPeripheral for LoopbackOutput {
    fn attach(&mut self, pool: &TransmissionPool) {
        self.depth = pool.depth();
        self.next = 0;
    }

    fn acquire(&mut self) -> Option<usize> {
        if !self.enabled || self.depth == 0 {
            return None;
        }
        let descriptor = self.next;
        self.next = (self.next + 1) % self.depth;
        Some(descriptor)
    }

    fn mark_ready(&mut self, _descriptor: usize, samples: &[Sample]) {
        self.sent.push_back(samples.to_vec());
    }

    fn set_notifications(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_layout() {
        let mut pool = TransmissionPool::new(3, 159).unwrap();
        assert_eq!(pool.depth(), 3);
        pool.buffer_mut(1).unwrap()[0] = 7;
        assert_eq!(pool.buffer(0).unwrap()[0], 0);
        assert_eq!(pool.buffer(1).unwrap()[0], 7);
        assert_eq!(pool.buffer(2).unwrap().len(), 159);
        assert!(pool.buffer(3).is_none());
    }

    #[test]
    fn pool_needs_two_buffers() {
        assert_eq!(TransmissionPool::new(1, 160).err(), Some(BroadcastError::PoolTooShallow(1)));
    }

    #[test]
    fn oversized_pool_is_an_allocation_error() {
        let err = TransmissionPool::new(usize::MAX / 100, 159).err();
        assert!(matches!(err, Some(BroadcastError::Allocation { what: "transmission pool", .. })));

        let err = TransmissionPool::new(usize::MAX / 4 / 160, 160).err();
        assert!(matches!(err, Some(BroadcastError::Allocation { .. })));
    }

    #[test]
    fn loopback_cycles_descriptors() {
        let pool = TransmissionPool::new(3, 4).unwrap();
        let mut output = LoopbackOutput::new();
        output.attach(&pool);
        assert_eq!(output.acquire(), None);

        output.set_notifications(true);
        let order: Vec<_> = (0..5).filter_map(|_| output.acquire()).collect();
        assert_eq!(order, [0, 1, 2, 0, 1]);

        output.mark_ready(0, &[1, 2, 3, 4]);
        assert_eq!(output.take_lines(), vec![vec![1, 2, 3, 4]]);
        assert_eq!(output.pending_lines(), 0);
    }
}
