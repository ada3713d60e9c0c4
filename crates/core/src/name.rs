use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use crate::{access::AccessMode, client::ClientId};

/// A stable handle onto a name's change counter, independent of the name
/// record's own lifetime.
///
/// Rust gives no address-of-a-moved-struct guarantee, so rather than expose
/// `&NameRecord::val` directly the counter lives behind an `Arc<AtomicU32>`;
/// holding a `CheckAddr` keeps the counter allocation alive even after the
/// owning `NameRecord` is freed by `cancel`/`release_name`.
#[derive(Clone)]
pub struct CheckAddr(Arc<AtomicU32>);

impl CheckAddr {
    pub fn load(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-name state: the change counter, opaque state word, ownership,
/// access bits, and the list of subscribed clients.
///
/// A record exists in the registry's name table iff `refcount() > 0`;
/// `refcount` is not stored redundantly, it is derived from `client_list`'s
/// length plus whether this name is pinned in the controlled-name list, so
/// the two can never drift apart.
pub struct NameRecord {
    pub name: String,
    val: Arc<AtomicU32>,
    pub state: u64,
    pub slot: Option<u32>,
    pub uid: u32,
    pub gid: u32,
    pub access: AccessMode,
    pub client_list: Vec<ClientId>,
    pub controlled: bool,
}

impl NameRecord {
    pub fn new(name: String) -> Self {
        Self {
            name,
            val: Arc::new(AtomicU32::new(1)),
            state: 0,
            slot: None,
            uid: 0,
            gid: 0,
            access: AccessMode::default(),
            client_list: Vec::new(),
            controlled: false,
        }
    }

    pub fn val(&self) -> u32 {
        self.val.load(Ordering::SeqCst)
    }

    pub fn set_val(&self, v: u32) {
        self.val.store(v, Ordering::SeqCst);
    }

    /// Increments the change counter, wrapping modulo 2^32.
    pub fn bump_val(&self) -> u32 {
        self.val.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    pub fn check_addr(&self) -> CheckAddr {
        CheckAddr(self.val.clone())
    }

    pub fn refcount(&self) -> usize {
        self.client_list.len() + if self.controlled { 1 } else { 0 }
    }

    /// Prepends a client, so post-order delivery visits the most-recently
    /// registered subscribers first.
    pub fn add_client(&mut self, id: ClientId) {
        self.client_list.insert(0, id);
    }

    pub fn remove_client(&mut self, id: ClientId) {
        self.client_list.retain(|&c| c != id);
    }
}
