use crate::dispatch::PortSink;

/// Opaque, nonzero client identifier handed back to the front-end.
pub type ClientId = u32;

/// Per-variant transport parameters for a subscription.
pub enum NotifyType {
    /// Polled only via `check`/`peek`.
    Plain,
    /// Polled via `check`/`peek`, or by reading the name's external memory
    /// slot directly (no syscall).
    MemorySlot,
    Signal {
        pid: i32,
        signal: i32,
    },
    Descriptor {
        /// `None` once a write has failed — a permanent no-op until cancel.
        file: Option<std::fs::File>,
        token: u32,
    },
    Port {
        sink: Box<dyn PortSink>,
        token: u32,
    },
}

impl std::fmt::Debug for NotifyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyType::Plain => write!(f, "Plain"),
            NotifyType::MemorySlot => write!(f, "MemorySlot"),
            NotifyType::Signal { pid, signal } => {
                f.debug_struct("Signal").field("pid", pid).field("signal", signal).finish()
            }
            NotifyType::Descriptor { file, token } => f
                .debug_struct("Descriptor")
                .field("alive", &file.is_some())
                .field("token", token)
                .finish(),
            NotifyType::Port { token, .. } => f.debug_struct("Port").field("token", token).finish(),
        }
    }
}

/// A single registration instance.
pub struct ClientRecord {
    pub client_id: ClientId,
    pub name: String,
    pub notify_type: NotifyType,
    pub session: u64,
    pub lastval: u32,
}

/// Stable 32-bit id allocator with highest-id-first recycling.
///
/// `next_id` is a high-water mark (the largest id ever handed out that
/// hasn't been swept back). `free_list` holds released ids strictly
/// decreasing, so its head is always the largest id available for reuse.
#[derive(Default)]
pub struct IdAllocator {
    next_id: u32,
    free_list: Vec<u32>,
}

impl IdAllocator {
    pub fn alloc(&mut self) -> ClientId {
        if !self.free_list.is_empty() {
            self.free_list.remove(0)
        } else {
            self.next_id += 1;
            self.next_id
        }
    }

    /// Returns an id to the pool, recycling the high-water mark immediately
    /// and sweeping any now-contiguous tail of the free list back into it.
    pub fn release(&mut self, id: ClientId) {
        if id == self.next_id {
            self.next_id -= 1;

            while let Some(&top) = self.free_list.first() {
                if top != self.next_id {
                    break;
                }

                self.free_list.remove(0);
                self.next_id -= 1;
            }
        } else {
            let pos = self.free_list.partition_point(|&x| x > id);
            self.free_list.insert(pos, id);
        }
    }

    #[cfg(test)]
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    #[cfg(test)]
    pub fn free_list(&self) -> &[u32] {
        &self.free_list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_sequentially_from_empty() {
        let mut ids = IdAllocator::default();
        assert_eq!(ids.alloc(), 1);
        assert_eq!(ids.alloc(), 2);
        assert_eq!(ids.alloc(), 3);
    }

    fn cancel_in_order_2_1_3() {
        let mut ids = IdAllocator::default();
        ids.alloc();
        ids.alloc();
        ids.alloc();

        ids.release(2);
        assert_eq!(ids.free_list(), &[2]);
        assert_eq!(ids.next_id(), 3);

        ids.release(1);
        assert_eq!(ids.free_list(), &[2, 1]);
        assert_eq!(ids.next_id(), 3);

        ids.release(3);
        assert!(ids.free_list().is_empty());
        assert_eq!(ids.next_id(), 0);

        assert_eq!(ids.alloc(), 1);
    }

    #[test]
    fn id_recycling_scenario() {
        cancel_in_order_2_1_3();
    }

    #[test]
    fn free_list_stays_strictly_decreasing() {
        let mut ids = IdAllocator::default();
        for _ in 0..5 {
            ids.alloc();
        }

        ids.release(3);
        ids.release(1);
        ids.release(4);

        let free = ids.free_list();
        assert!(free.windows(2).all(|w| w[0] > w[1]));
    }
}
