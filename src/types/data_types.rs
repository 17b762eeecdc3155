/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store numbers and bytes, and do not have any major "active" behavior.

use std::{
    cmp::Ordering,
    fmt::{self, Debug, Display, Formatter},
    hash::Hash,
};

use borsh::{BorshDeserialize, BorshSerialize};

/// Number that identifies a consensus-protocol instance run by a group of replicas.
///
/// Instance 0 is the master instance, whose ordering is executed. Backup instances (1, 2, ...) order
/// the same requests only to monitor the performance of the master's primary. Every instance has its
/// own, independently-owned message request trackers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct InstanceID(u64);

impl InstanceID {
    /// Create a new `InstanceID` with an `int` value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the `u64` value of this `InstanceID`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for InstanceID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// View number. Starts at 0 and increases by 1 on every view change.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct ViewNumber(u64);

impl ViewNumber {
    /// Create a new `ViewNumber` wrapping `int`.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the initial `ViewNumber`, which is 0.
    pub const fn init() -> Self {
        Self(0)
    }

    /// Get the inner `u64` of this `ViewNumber`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for ViewNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Sequence number of a pre-prepare within a view.
///
/// Valid sequence numbers are positive. `SeqNumber::new(0)` is representable only so that
/// [`ThreePCKey::init`] can sit below every real slot, and so that requests carrying a zero sequence
/// number can be decoded and then rejected.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct SeqNumber(u64);

impl SeqNumber {
    /// Create a new `SeqNumber` wrapping `int`.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` of this `SeqNumber`.
    pub const fn int(&self) -> u64 {
        self.0
    }

    /// Whether this is a sequence number a real pre-prepare can carry, i.e., whether it is positive.
    pub const fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl Display for SeqNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Identifies one slot of the three-phase commit protocol.
///
/// # Ordering
///
/// Keys are ordered lexicographically: first by `view`, then by `seq`. So every slot of a later view
/// comes after every slot of an earlier view, regardless of sequence numbers. The derived `Ord` relies
/// on the field declaration order below, which must not be changed.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, BorshDeserialize, BorshSerialize,
)]
pub struct ThreePCKey {
    pub view: ViewNumber,
    pub seq: SeqNumber,
}

impl ThreePCKey {
    /// Create a new `ThreePCKey` identifying slot `seq` in `view`.
    pub const fn new(view: ViewNumber, seq: SeqNumber) -> Self {
        Self { view, seq }
    }

    /// The key that orders before every real slot: `(0, 0)`. A replica that has not ordered anything
    /// yet has this as its last-ordered key.
    pub const fn init() -> Self {
        Self {
            view: ViewNumber::init(),
            seq: SeqNumber::new(0),
        }
    }
}

impl Display for ThreePCKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.view, self.seq)
    }
}

impl From<(u64, u64)> for ThreePCKey {
    fn from((view, seq): (u64, u64)) -> Self {
        ThreePCKey::new(ViewNumber::new(view), SeqNumber::new(seq))
    }
}

/// Compare two 3PC keys under the protocol's total order.
///
/// `Ordering::Less` means `a` is an earlier slot than `b`.
pub fn compare_3pc_keys(a: &ThreePCKey, b: &ThreePCKey) -> Ordering {
    a.cmp(b)
}

/// 32-byte cryptographic hash.
///
/// Used for request digests, pre-prepare digests, and the state and transaction trie roots that a
/// pre-prepare commits to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    /// Create a new `CryptoHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 32]` value of this `CryptoHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl Display for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The content hashes that a pre-prepare (and every prepare agreeing with it) binds to.
///
/// When a replica requests a missing message while already holding trusted content for the slot (e.g.,
/// a stashed prepare quorum), it pins that content by attaching a `StashBinding` to the request. Any
/// reply whose hashes differ from the pinned ones is then rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct StashBinding {
    pub digest: CryptoHash,
    pub state_root_hash: CryptoHash,
    pub txn_root_hash: CryptoHash,
}

impl StashBinding {
    pub const fn new(
        digest: CryptoHash,
        state_root_hash: CryptoHash,
        txn_root_hash: CryptoHash,
    ) -> Self {
        Self {
            digest,
            state_root_hash,
            txn_root_hash,
        }
    }
}

/// Identifies the ledger whose transactions a pre-prepare orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct LedgerID(u32);

impl LedgerID {
    /// Create a new `LedgerID` wrapping `int`.
    pub const fn new(int: u32) -> Self {
        Self(int)
    }

    /// Get the inner `u32` of this `LedgerID`.
    pub const fn int(&self) -> u32 {
        self.0
    }
}

/// Seconds since the Unix Epoch, as set by the primary that created a pre-prepare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, BorshDeserialize, BorshSerialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a new `Timestamp` wrapping `secs`.
    pub const fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the inner number of seconds.
    pub const fn secs(&self) -> u64 {
        self.0
    }
}
