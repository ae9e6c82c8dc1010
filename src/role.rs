//! Node role tracking with a latched, race-safe promotion.

use std::sync::atomic::{AtomicU8, Ordering};

use tracing::info;

/// Role of this node behind the write-steering load balancer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Startup state: no dial attempt has resolved yet.
    Undetermined,
    /// At least one dial attempt has been made; the node expects to
    /// receive notifications rather than originate them.
    Replica,
    /// This node receives all writes and propagates them. Terminal.
    Primary,
}

const UNDETERMINED: u8 = 0;
const REPLICA: u8 = 1;
const PRIMARY: u8 = 2;

/// Single-writer role cell read by every task in the node.
///
/// Promotion is a one-way latch: [`try_promote`](RoleCell::try_promote)
/// returns `true` to exactly one caller per process lifetime, no matter
/// how many writes race on it. Nothing ever transitions out of Primary.
#[derive(Debug)]
pub(crate) struct RoleCell {
    state: AtomicU8,
}

impl RoleCell {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(UNDETERMINED),
        }
    }

    pub(crate) fn get(&self) -> Role {
        match self.state.load(Ordering::Acquire) {
            PRIMARY => Role::Primary,
            REPLICA => Role::Replica,
            _ => Role::Undetermined,
        }
    }

    /// Record that a dial attempt failed and the node is now retrying.
    ///
    /// Cosmetic: only moves `Undetermined` to `Replica`, never touches a
    /// role that is already determined.
    pub(crate) fn mark_replica(&self) {
        let _ = self.state.compare_exchange(
            UNDETERMINED,
            REPLICA,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Latch the role to `Primary`.
    ///
    /// Returns `true` for exactly one caller; every other caller (including
    /// concurrent ones mid-race) gets `false`.
    pub(crate) fn try_promote(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current == PRIMARY {
                return false;
            }
            match self.state.compare_exchange(
                current,
                PRIMARY,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    info!("Role latched to primary");
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }
}
