//! Time-ordered entity identifier
//!
//! An [`Id`] is 16 bytes:
//! - bytes 0..8: creation time as big-endian nanoseconds since the Unix epoch
//! - bytes 8..16: random tail taken from a v4 UUID
//!
//! Byte order therefore equals creation order. Ids minted by [`Id::new`] in
//! one process are strictly increasing even when the clock stalls or steps
//! backwards, since the timestamp never repeats or decreases.
//!
//! ## Range boundaries
//!
//! Date-window scans compare entity ids against synthetic boundary ids:
//! [`Id::lower_bound`] (zero tail) sorts before every real id minted in the
//! same nanosecond and [`Id::upper_bound`] (`0xFF` tail) sorts after them.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Width of an encoded [`Id`] in bytes
pub const ID_LEN: usize = 16;

/// Last timestamp handed out by [`Id::new`]
static LAST_NANOS: AtomicU64 = AtomicU64::new(0);

/// Time-ordered unique identifier
///
/// The nil id (all zero bytes) marks an entity that has not been saved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Id(Uuid);

impl Id {
    /// Mint a new id stamped with the current time
    pub fn new() -> Self {
        let now = nanos_since_epoch(Utc::now());
        let mut last = LAST_NANOS.load(Ordering::Relaxed);
        let stamp = loop {
            let next = now.max(last.saturating_add(1));
            match LAST_NANOS.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => break next,
                Err(observed) => last = observed,
            }
        };
        Self::with_tail(stamp, random_tail())
    }

    /// Mint an id stamped with an arbitrary time
    ///
    /// Unlike [`Id::new`] this does not take part in the monotonic sequence;
    /// two ids minted for the same instant only differ in their random tail.
    pub fn at(time: DateTime<Utc>) -> Self {
        Self::with_tail(nanos_since_epoch(time), random_tail())
    }

    /// Smallest possible id for `time`
    pub fn lower_bound(time: DateTime<Utc>) -> Self {
        Self::with_tail(nanos_since_epoch(time), [0x00; 8])
    }

    /// Largest possible id for `time`
    pub fn upper_bound(time: DateTime<Utc>) -> Self {
        Self::with_tail(nanos_since_epoch(time), [0xFF; 8])
    }

    /// The nil id
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Whether this is the nil id
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Create an id from raw bytes
    pub fn from_bytes(bytes: [u8; ID_LEN]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Create an id from a slice, which must be exactly [`ID_LEN`] bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; ID_LEN] = bytes.try_into().ok()?;
        Some(Self::from_bytes(bytes))
    }

    /// Raw bytes of this id, in sort order
    pub fn as_bytes(&self) -> &[u8; ID_LEN] {
        self.0.as_bytes()
    }

    /// Nanoseconds since the Unix epoch embedded in the id
    pub fn nanos(&self) -> u64 {
        BigEndian::read_u64(&self.as_bytes()[..8])
    }

    /// Creation time embedded in the id
    pub fn timestamp(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.nanos() as i64)
    }

    fn with_tail(nanos: u64, tail: [u8; 8]) -> Self {
        let mut bytes = [0u8; ID_LEN];
        BigEndian::write_u64(&mut bytes[..8], nanos);
        bytes[8..].copy_from_slice(&tail);
        Self::from_bytes(bytes)
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::nil()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Current time, never earlier than any id minted by [`Id::new`]
///
/// Ids may run slightly ahead of a coarse wall clock; scans bounded by
/// "now" use this so that freshly minted ids are always in range.
pub fn now() -> DateTime<Utc> {
    let wall = Utc::now();
    let last = LAST_NANOS.load(Ordering::Acquire);
    if nanos_since_epoch(wall) >= last {
        wall
    } else {
        Utc.timestamp_nanos(last as i64)
    }
}

/// Nanoseconds since the epoch, clamped to zero for earlier times
///
/// Times beyond the year 2262 saturate.
fn nanos_since_epoch(time: DateTime<Utc>) -> u64 {
    match time.timestamp_nanos_opt() {
        Some(nanos) => nanos.max(0) as u64,
        None if time.timestamp() < 0 => 0,
        None => i64::MAX as u64,
    }
}

fn random_tail() -> [u8; 8] {
    let random = Uuid::new_v4();
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&random.as_bytes()[8..]);
    tail
}
