use std::io::Write;

use crate::client::{ClientRecord, NotifyType};

/// Abstract "deliver to client" capability for local message-port transport.
/// The concrete port implementation (a Mach port, a Unix domain socket
/// datagram, whatever the host platform offers) is supplied by the
/// front-end; the registry only knows it can hand a token to `send` and get
/// back whether the destination was reachable.
///
/// `send` must not block past a bounded timeout (~50ms) — that is the
/// implementor's contract to honor, not something the dispatcher enforces.
pub trait PortSink: Send + Sync {
    /// Returns `false` if the destination is gone (`INVALID_DEST`); the
    /// dispatcher treats that identically to success — cleanup is deferred
    /// to `cancel`.
    fn send(&self, token: u32) -> bool;
}

/// Performs the transport-specific delivery action for one subscriber.
///
/// Never returns an error: transport delivery failures are handled locally
/// and never surfaced to the caller of `post`.
pub fn deliver(client: &mut ClientRecord) {
    match &mut client.notify_type {
        NotifyType::Plain | NotifyType::MemorySlot => {}

        NotifyType::Signal { pid, signal } => {
            send_signal(*pid, *signal);
        }

        NotifyType::Descriptor { file, token } => {
            let Some(f) = file.as_mut() else { return };

            let wire = token.to_be_bytes();
            if f.write_all(&wire).is_err() {
                *file = None;
            }
        }

        NotifyType::Port { sink, token } => {
            // INVALID_DEST is ignored; the subscriber is presumed gone and
            // cleanup is deferred to `cancel`.
            let _ = sink.send(*token);
        }
    }
}

fn send_signal(pid: i32, signal: i32) {
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let Ok(sig) = Signal::try_from(signal) else {
        return;
    };

    // A dead or unreachable pid is not reported; delivery is fire-and-forget.
    let _ = signal::kill(Pid::from_raw(pid), sig);
}

/// Opens `path` write-only, non-blocking, for descriptor-based delivery.
pub fn open_descriptor(path: &str) -> Option<std::fs::File> {
    use std::os::fd::FromRawFd;

    use nix::fcntl::{OFlag, open};
    use nix::sys::stat::Mode;

    let fd = open(path, OFlag::O_WRONLY | OFlag::O_NONBLOCK, Mode::empty()).ok()?;

    // SAFETY: `open` just handed us exclusive ownership of this fd.
    Some(unsafe { std::fs::File::from_raw_fd(fd) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientRecord;

    struct AlwaysGone;

    impl PortSink for AlwaysGone {
        fn send(&self, _token: u32) -> bool {
            false
        }
    }

    #[test]
    fn port_delivery_ignores_invalid_dest() {
        let mut client = ClientRecord {
            client_id: 1,
            name: "a".into(),
            notify_type: NotifyType::Port {
                sink: Box::new(AlwaysGone),
                token: 7,
            },
            session: 0,
            lastval: 0,
        };

        // Must not panic; delivery to a gone destination is silently ignored.
        deliver(&mut client);
    }

    /// A failed write closes the descriptor and marks it dead, but does not
    /// panic or propagate an error.
    #[test]
    fn descriptor_delivery_failure_clears_the_file() {
        use std::os::fd::FromRawFd;

        let (read_fd, write_fd) = nix::unistd::pipe().unwrap();
        drop(read_fd); // closes the read end: the next write gets EPIPE.

        let file = unsafe { std::fs::File::from_raw_fd(std::os::fd::IntoRawFd::into_raw_fd(write_fd)) };

        let mut client = ClientRecord {
            client_id: 1,
            name: "a".into(),
            notify_type: NotifyType::Descriptor { file: Some(file), token: 7 },
            session: 0,
            lastval: 0,
        };

        deliver(&mut client);

        let NotifyType::Descriptor { file, .. } = &client.notify_type else {
            unreachable!()
        };
        assert!(file.is_none());
    }

    #[test]
    fn plain_delivery_is_a_no_op() {
        let mut client = ClientRecord {
            client_id: 1,
            name: "a".into(),
            notify_type: NotifyType::Plain,
            session: 0,
            lastval: 0,
        };

        deliver(&mut client);
    }
}
