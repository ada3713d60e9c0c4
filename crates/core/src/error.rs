/// Stable status codes returned by every `Registry` operation.
///
/// Discriminants are part of the public contract: front-ends across process
/// boundaries rely on the numeric value, not just the variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Status {
    Ok = 0,
    InvalidName = 1,
    InvalidToken = 2,
    InvalidFile = 3,
    NotAuthorized = 4,
    Failed = 5,
}

impl Status {
    pub fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }

    pub fn code(self) -> u32 {
        self as u32
    }
}

impl std::error::Error for Status {}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Status>;
