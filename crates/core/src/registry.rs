use std::cell::UnsafeCell;

use parking_lot::Mutex;

use crate::{
    Config,
    access::{AccessInfo, AccessMode, ControlledList, Request, check_access},
    client::{ClientId, ClientRecord, IdAllocator, NotifyType},
    dispatch::{self, PortSink},
    error::{Result, Status},
    name::{CheckAddr, NameRecord},
    table::Table,
};

/// Everything the registry lock guards: both tables, the id allocator, and
/// the controlled-name list.
struct State {
    names: Table<String, NameRecord>,
    clients: Table<ClientId, ClientRecord>,
    ids: IdAllocator,
    controlled: ControlledList,
}

impl State {
    fn new(table_capacity: usize) -> Self {
        Self {
            names: Table::with_capacity(table_capacity),
            clients: Table::with_capacity(table_capacity),
            ids: IdAllocator::default(),
            controlled: ControlledList::default(),
        }
    }
}

/// Either a real mutex or a no-op single-threaded cell, chosen once at
/// construction from `Config::use_locks`. Kept as a runtime choice rather
/// than a generic parameter since `use_locks` is a construction-time
/// configuration flag, not a compile-time one.
enum Lock {
    Locked(Mutex<State>),
    Unlocked(UnsafeCell<State>),
}

// SAFETY: the `Unlocked` variant is only ever constructed from
// `Config::use_locks == false`, which is documented as a single-threaded-only
// mode; callers who share a `Registry` built that way across threads violate
// that contract, not this impl.
unsafe impl Sync for Lock {}

impl Lock {
    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        match self {
            Lock::Locked(mutex) => f(&mut mutex.lock()),
            Lock::Unlocked(cell) => {
                // SAFETY: see the `unsafe impl Sync` note above.
                f(unsafe { &mut *cell.get() })
            }
        }
    }
}

/// The registry facade: every public operation composing the name table,
/// client table, id allocator, and access controller under one lock.
pub struct Registry {
    lock: Lock,
}

impl Registry {
    pub fn new(config: Config) -> Self {
        let state = State::new(config.table_capacity);
        let lock = if config.use_locks {
            Lock::Locked(Mutex::new(state))
        } else {
            Lock::Unlocked(UnsafeCell::new(state))
        };
        Self { lock }
    }

    pub fn register_plain(
        &self,
        name: &str,
        session: u64,
        slot: Option<u32>,
        uid: u32,
        gid: u32,
    ) -> Result<ClientId> {
        log::debug!("register_plain name={name}");
        let notify_type = if slot.is_some() { NotifyType::MemorySlot } else { NotifyType::Plain };
        let result = self.lock.with(|state| {
            if !check_named_access(state, name, uid, gid, Request::Read) {
                return Err(Status::NotAuthorized);
            }
            let id = allocate(state, name, session, notify_type);
            if let Some(slot) = slot {
                state.names.get_mut(name).expect("just allocated").slot = Some(slot);
            }
            Ok(id)
        });
        warn_on_failure("register_plain", name, &result);
        result
    }

    pub fn register_signal(
        &self,
        name: &str,
        session: u64,
        pid: i32,
        signal: i32,
        uid: u32,
        gid: u32,
    ) -> Result<ClientId> {
        log::debug!("register_signal name={name} pid={pid}");
        let result = self.lock.with(|state| {
            if !check_named_access(state, name, uid, gid, Request::Read) {
                return Err(Status::NotAuthorized);
            }
            Ok(allocate(state, name, session, NotifyType::Signal { pid, signal }))
        });
        warn_on_failure("register_signal", name, &result);
        result
    }

    pub fn register_descriptor(
        &self,
        name: &str,
        session: u64,
        path: &str,
        token: u32,
        uid: u32,
        gid: u32,
    ) -> Result<ClientId> {
        log::debug!("register_descriptor name={name} path={path}");
        let result = self.lock.with(|state| {
            if !check_named_access(state, name, uid, gid, Request::Read) {
                return Err(Status::NotAuthorized);
            }
            let Some(file) = dispatch::open_descriptor(path) else {
                return Err(Status::InvalidFile);
            };
            Ok(allocate(state, name, session, NotifyType::Descriptor { file: Some(file), token }))
        });
        warn_on_failure("register_descriptor", name, &result);
        result
    }

    pub fn register_port(
        &self,
        name: &str,
        session: u64,
        sink: Box<dyn PortSink>,
        token: u32,
        uid: u32,
        gid: u32,
    ) -> Result<ClientId> {
        log::debug!("register_port name={name}");
        let result = self.lock.with(|state| {
            if !check_named_access(state, name, uid, gid, Request::Read) {
                return Err(Status::NotAuthorized);
            }
            Ok(allocate(state, name, session, NotifyType::Port { sink, token }))
        });
        warn_on_failure("register_port", name, &result);
        result
    }

    /// No-op if the id is unknown, never an error.
    pub fn cancel(&self, client_id: ClientId) -> Result<()> {
        log::debug!("cancel client={client_id}");
        self.lock.with(|state| cancel_one(state, client_id));
        Ok(())
    }

    /// Snapshot-then-act: collect every matching id before mutating anything,
    /// so removal never invalidates the traversal.
    pub fn cancel_session(&self, session: u64) -> Result<()> {
        log::debug!("cancel_session session={session}");
        self.lock.with(|state| {
            let matching: Vec<ClientId> = state
                .clients
                .snapshot_keys()
                .into_iter()
                .filter(|id| state.clients.get(id).is_some_and(|c| c.session == session))
                .collect();

            for id in matching {
                cancel_one(state, id);
            }
        });
        Ok(())
    }

    pub fn post(&self, name: &str, uid: u32, gid: u32) -> Result<()> {
        log::debug!("post name={name}");
        let result = self.lock.with(|state| {
            if !state.names.contains_key(name) {
                return Err(Status::InvalidName);
            }
            if !check_named_access(state, name, uid, gid, Request::Write) {
                return Err(Status::NotAuthorized);
            }

            state.names.get_mut(name).expect("checked above").bump_val();
            let subscribers = state.names.get(name).expect("checked above").client_list.clone();
            for id in subscribers {
                if let Some(client) = state.clients.get_mut(&id) {
                    dispatch::deliver(client);
                }
            }
            Ok(())
        });
        warn_on_failure("post", name, &result);
        result
    }

    /// Returns whether `val` has changed since this client's last `check`,
    /// updating `lastval` as a side effect.
    pub fn check(&self, client_id: ClientId) -> Result<bool> {
        self.lock.with(|state| {
            let client = state.clients.get_mut(&client_id).ok_or(Status::InvalidToken)?;
            let val = state.names.get(&client.name).map(NameRecord::val).ok_or(Status::InvalidName)?;

            if val != client.lastval {
                client.lastval = val;
                Ok(true)
            } else {
                Ok(false)
            }
        })
    }

    /// Reads `val` without touching `lastval`.
    pub fn peek(&self, client_id: ClientId) -> Result<u32> {
        self.lock.with(|state| {
            let client = state.clients.get(&client_id).ok_or(Status::InvalidToken)?;
            state.names.get(&client.name).map(NameRecord::val).ok_or(Status::InvalidName)
        })
    }

    pub fn get_val(&self, client_id: ClientId) -> Result<u32> {
        self.peek(client_id)
    }

    pub fn set_val(&self, client_id: ClientId, uid: u32, gid: u32, value: u32) -> Result<()> {
        self.lock.with(|state| {
            let name = state.clients.get(&client_id).ok_or(Status::InvalidToken)?.name.clone();
            if !check_named_access(state, &name, uid, gid, Request::Write) {
                return Err(Status::NotAuthorized);
            }
            state.names.get(&name).ok_or(Status::InvalidName)?.set_val(value);
            Ok(())
        })
    }

    pub fn get_state(&self, client_id: ClientId) -> Result<u64> {
        self.lock.with(|state| {
            let client = state.clients.get(&client_id).ok_or(Status::InvalidToken)?;
            state.names.get(&client.name).map(|n| n.state).ok_or(Status::InvalidName)
        })
    }

    pub fn set_state(&self, client_id: ClientId, uid: u32, gid: u32, value: u64) -> Result<()> {
        self.lock.with(|state| {
            let name = state.clients.get(&client_id).ok_or(Status::InvalidToken)?.name.clone();
            if !check_named_access(state, &name, uid, gid, Request::Write) {
                return Err(Status::NotAuthorized);
            }
            state.names.get_mut(&name).ok_or(Status::InvalidName)?.state = value;
            Ok(())
        })
    }

    /// A handle kept alive independent of the name record's lifetime, since
    /// Rust gives no address-of-a-moved-field guarantee.
    pub fn get_check_addr(&self, client_id: ClientId) -> Result<CheckAddr> {
        self.lock.with(|state| {
            let name = &state.clients.get(&client_id).ok_or(Status::InvalidToken)?.name;
            state.names.get(name).map(NameRecord::check_addr).ok_or(Status::InvalidName)
        })
    }

    pub fn set_owner(&self, name: &str, uid: u32, gid: u32) -> Result<()> {
        log::debug!("set_owner name={name} uid={uid} gid={gid}");
        self.lock.with(|state| {
            let record = state.names.entry(name.to_string()).or_insert_with(|| NameRecord::new(name.to_string()));
            record.uid = uid;
            record.gid = gid;
            record.controlled = true;
            state.controlled.insert(name);
            Ok(())
        })
    }

    pub fn set_access(&self, name: &str, mode: AccessMode) -> Result<()> {
        log::debug!("set_access name={name}");
        self.lock.with(|state| {
            let record = state.names.entry(name.to_string()).or_insert_with(|| NameRecord::new(name.to_string()));
            record.access = mode;
            record.controlled = true;
            state.controlled.insert(name);
            Ok(())
        })
    }

    /// Direct owner if registered, else the deepest controlling prefix's
    /// owner, else `(0, 0)`.
    pub fn get_owner(&self, name: &str) -> Result<(u32, u32)> {
        Ok(self.lock.with(|state| owner_lookup(state, name)))
    }

    pub fn get_access(&self, name: &str) -> Result<AccessMode> {
        Ok(self.lock.with(|state| access_lookup(state, name)))
    }

    /// Owner-or-root check, then unpins from the controlled list and
    /// decrements refcount, freeing the record if nothing else holds it.
    pub fn release_name(&self, name: &str, uid: u32, _gid: u32) -> Result<()> {
        log::debug!("release_name name={name}");
        let result = self.lock.with(|state| {
            let owner_uid = state.names.get(name).ok_or(Status::InvalidName)?.uid;
            if uid != 0 && uid != owner_uid {
                return Err(Status::NotAuthorized);
            }

            state.controlled.remove(name);
            let record = state.names.get_mut(name).expect("checked above");
            record.controlled = false;
            if record.refcount() == 0 {
                state.names.remove(name);
            }
            Ok(())
        });
        warn_on_failure("release_name", name, &result);
        result
    }
}

fn allocate(state: &mut State, name: &str, session: u64, notify_type: NotifyType) -> ClientId {
    let id = state.ids.alloc();
    let record = state.names.entry(name.to_string()).or_insert_with(|| NameRecord::new(name.to_string()));
    record.add_client(id);
    state.clients.insert(id, ClientRecord { client_id: id, name: name.to_string(), notify_type, session, lastval: 0 });
    id
}

fn cancel_one(state: &mut State, id: ClientId) {
    let Some(client) = state.clients.remove(&id) else { return };

    if let Some(record) = state.names.get_mut(&client.name) {
        record.remove_client(id);
        if record.refcount() == 0 {
            state.names.remove(&client.name);
        }
    }

    // `client` drops here: File/PortSink release their own resources.
    state.ids.release(id);
}

fn owner_lookup(state: &State, name: &str) -> (u32, u32) {
    if let Some(record) = state.names.get(name) {
        return (record.uid, record.gid);
    }

    for prefix in state.controlled.as_slice() {
        if !is_strict_prefix(prefix, name) {
            continue;
        }
        if let Some(record) = state.names.get(prefix) {
            return (record.uid, record.gid);
        }
    }

    (0, 0)
}

fn access_lookup(state: &State, name: &str) -> AccessMode {
    if let Some(record) = state.names.get(name) {
        return record.access;
    }

    for prefix in state.controlled.as_slice() {
        if !is_strict_prefix(prefix, name) {
            continue;
        }
        if let Some(record) = state.names.get(prefix) {
            return record.access;
        }
    }

    AccessMode::default()
}

fn is_strict_prefix(prefix: &str, name: &str) -> bool {
    prefix != name && prefix.len() < name.len() && name.starts_with(prefix)
}

fn check_named_access(state: &State, name: &str, uid: u32, gid: u32, req: Request) -> bool {
    let own = match state.names.get(name) {
        Some(record) => AccessInfo { uid: record.uid, gid: record.gid, mode: record.access },
        None => AccessInfo { uid: 0, gid: 0, mode: AccessMode::default() },
    };

    check_access(
        state.controlled.as_slice(),
        |prefix| state.names.get(prefix).map(|r| AccessInfo { uid: r.uid, gid: r.gid, mode: r.access }),
        name,
        own,
        uid,
        gid,
        req,
    )
}

fn warn_on_failure<T>(op: &str, name: &str, result: &Result<T>) {
    let Err(status) = result else { return };
    if matches!(status, Status::InvalidName | Status::InvalidToken) {
        return;
    }
    log::warn!("{op} name={name} failed: {status}");
}
