/// 9-bit access mode: three 3-bit {read, write, reserved} triples for
/// user/group/other. Bit layout, least significant first: other-read,
/// other-write, other-reserved, group-read, group-write, group-reserved,
/// user-read, user-write, user-reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessMode(u16);

const OTHER_READ: u16 = 1 << 0;
const OTHER_WRITE: u16 = 1 << 1;
const GROUP_READ: u16 = 1 << 3;
const GROUP_WRITE: u16 = 1 << 4;
const USER_READ: u16 = 1 << 6;
const USER_WRITE: u16 = 1 << 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    User,
    Group,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Read,
    Write,
}

impl AccessMode {
    pub fn from_bits(bits: u16) -> Self {
        Self(bits & 0x1FF)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    /// Behavioral default: owner may read and write, everyone else may
    /// read. The literal bit pattern is an implementation choice, not a
    /// wire-level contract.
    pub fn default_mode() -> Self {
        Self(USER_READ | USER_WRITE | GROUP_READ | OTHER_READ)
    }

    pub fn permits(self, class: Class, req: Request) -> bool {
        let bit = match (class, req) {
            (Class::User, Request::Read) => USER_READ,
            (Class::User, Request::Write) => USER_WRITE,
            (Class::Group, Request::Read) => GROUP_READ,
            (Class::Group, Request::Write) => GROUP_WRITE,
            (Class::Other, Request::Read) => OTHER_READ,
            (Class::Other, Request::Write) => OTHER_WRITE,
        };

        self.0 & bit != 0
    }
}

impl Default for AccessMode {
    fn default() -> Self {
        Self::default_mode()
    }
}

/// Ownership/access facts needed to evaluate a single node (a name itself,
/// or an entry in the controlled-name list) during the permission check.
#[derive(Debug, Clone, Copy)]
pub struct AccessInfo {
    pub uid: u32,
    pub gid: u32,
    pub mode: AccessMode,
}

impl AccessInfo {
    fn grants(&self, uid: u32, gid: u32, req: Request) -> bool {
        (self.uid == uid && self.mode.permits(Class::User, req))
            || (self.gid == gid && self.mode.permits(Class::Group, req))
            || self.mode.permits(Class::Other, req)
    }
}

/// Evaluates the effective permission for `(name, uid, gid, req)` against
/// the controlled-name list and the name's own access info.
///
/// `controlled` must already be in reverse-lexicographic order (deepest
/// names first) with no duplicates; `lookup` resolves a controlled name to
/// its current ownership/access. The prefix scan stops at the first
/// matching entry (the deepest ancestor, by the list's ordering): a
/// *denying* match blocks access immediately, but a *granting* match only
/// clears the prefix scan — it does not short-circuit the decision, and the
/// name's own access bits are still consulted afterward.
pub fn check_access<F>(
    controlled: &[String],
    lookup: F,
    name: &str,
    own: AccessInfo,
    uid: u32,
    gid: u32,
    req: Request,
) -> bool
where
    F: Fn(&str) -> Option<AccessInfo>,
{
    if uid == 0 {
        return true;
    }

    for prefix in controlled {
        if prefix == name {
            continue;
        }

        if prefix.len() >= name.len() || !name.starts_with(prefix.as_str()) {
            continue;
        }

        let Some(info) = lookup(prefix) else { continue };
        if !info.grants(uid, gid, req) {
            return false;
        }
        break;
    }

    own.grants(uid, gid, req)
}

/// Maintains the controlled-name list's reverse-lexicographic, duplicate-free
/// invariant. Longer/later names sort first so a linear front-to-back scan
/// visits the deepest matching prefix first.
#[derive(Default)]
pub struct ControlledList(Vec<String>);

impl ControlledList {
    pub fn insert(&mut self, name: &str) {
        if self.0.iter().any(|n| n == name) {
            return;
        }

        let pos = self.0.partition_point(|existing| existing.as_str() > name);
        self.0.insert(pos, name.to_string());
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|n| n != name);
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_grants_owner_rw_others_read() {
        let mode = AccessMode::default_mode();
        assert!(mode.permits(Class::User, Request::Read));
        assert!(mode.permits(Class::User, Request::Write));
        assert!(mode.permits(Class::Group, Request::Read));
        assert!(!mode.permits(Class::Group, Request::Write));
        assert!(mode.permits(Class::Other, Request::Read));
        assert!(!mode.permits(Class::Other, Request::Write));
    }

    #[test]
    fn controlled_list_sorts_deepest_first() {
        let mut list = ControlledList::default();
        list.insert("com.x");
        list.insert("com.x.y");
        list.insert("com");

        assert_eq!(
            list.as_slice(),
            &["com.x.y".to_string(), "com.x".to_string(), "com".to_string()]
        );
    }

    #[test]
    fn controlled_list_insert_is_idempotent() {
        let mut list = ControlledList::default();
        list.insert("com.x");
        list.insert("com.x");
        assert_eq!(list.as_slice().len(), 1);
    }

    /// A denying prefix blocks access for non-owners but not for the owner.
    #[test]
    fn prefix_with_cleared_other_bit_blocks_non_owner() {
        let mut controlled = ControlledList::default();
        controlled.insert("com.x");

        let prefix_info = AccessInfo {
            uid: 501,
            gid: 20,
            mode: AccessMode::from_bits(USER_READ | USER_WRITE | GROUP_READ),
        };

        let lookup = |name: &str| if name == "com.x" { Some(prefix_info) } else { None };

        let own = AccessInfo {
            uid: 0,
            gid: 0,
            mode: AccessMode::default_mode(),
        };

        assert!(!check_access(
            controlled.as_slice(),
            lookup,
            "com.x.child",
            own,
            502,
            20,
            Request::Read
        ));

        assert!(check_access(
            controlled.as_slice(),
            lookup,
            "com.x.child",
            own,
            501,
            20,
            Request::Read
        ));
    }

    /// A granting ancestor only clears the prefix scan; it must not bypass
    /// a name's own restrictive access bits.
    #[test]
    fn granting_prefix_does_not_bypass_own_restrictive_access() {
        let mut controlled = ControlledList::default();
        controlled.insert("com");
        controlled.insert("com.secret");

        let ancestor = AccessInfo {
            uid: 1,
            gid: 1,
            mode: AccessMode::default_mode(),
        };

        let lookup = move |name: &str| match name {
            "com" => Some(ancestor),
            _ => None,
        };

        let own = AccessInfo {
            uid: 2,
            gid: 2,
            mode: AccessMode::from_bits(USER_READ | USER_WRITE),
        };

        assert!(!check_access(
            controlled.as_slice(),
            lookup,
            "com.secret",
            own,
            502,
            502,
            Request::Read
        ));

        assert!(check_access(
            controlled.as_slice(),
            lookup,
            "com.secret",
            own,
            2,
            2,
            Request::Read
        ));
    }
}
