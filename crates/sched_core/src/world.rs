//! Narrow interfaces to the surrounding simulation.
//!
//! The scheduler reads one [`ResourceState`] per tick through [`WorldView`]
//! and writes commands back through [`CommandSink`]. Nothing else crosses
//! the boundary.

use serde::{Deserialize, Serialize};

use crate::resources::{ItemHandle, ResourceState};

/// Source of the per-tick snapshot.
pub trait WorldView {
    /// Build this tick's snapshot.
    fn snapshot(&self) -> ResourceState;
}

impl WorldView for ResourceState {
    fn snapshot(&self) -> ResourceState {
        self.clone()
    }
}

/// Commands the scheduler issues directly to the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimCommand {
    /// Cancel an in-progress item or reservation.
    Cancel(ItemHandle),
    /// Switch secondary resource collection on or off.
    SetGasCollection(bool),
}

/// Receiver for [`SimCommand`]s.
pub trait CommandSink {
    /// Cancel the item behind `handle`; its refund is credited by the world.
    fn cancel(&mut self, handle: ItemHandle);

    /// Switch secondary resource collection.
    fn set_gas_collection(&mut self, on: bool);
}

/// A sink that records commands in issue order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLog {
    /// Commands issued so far.
    pub commands: Vec<SimCommand>,
}

impl CommandLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the recorded commands, leaving the log empty.
    pub fn take(&mut self) -> Vec<SimCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Handles cancelled so far.
    #[must_use]
    pub fn cancelled(&self) -> Vec<ItemHandle> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                SimCommand::Cancel(h) => Some(*h),
                SimCommand::SetGasCollection(_) => None,
            })
            .collect()
    }
}

impl CommandSink for CommandLog {
    fn cancel(&mut self, handle: ItemHandle) {
        self.commands.push(SimCommand::Cancel(handle));
    }

    fn set_gas_collection(&mut self, on: bool) {
        self.commands.push(SimCommand::SetGasCollection(on));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_records_in_order() {
        let mut log = CommandLog::new();
        log.set_gas_collection(false);
        log.cancel(ItemHandle::new(3));
        log.set_gas_collection(true);
        assert_eq!(log.cancelled(), vec![ItemHandle::new(3)]);
        assert_eq!(
            log.take(),
            vec![
                SimCommand::SetGasCollection(false),
                SimCommand::Cancel(ItemHandle::new(3)),
                SimCommand::SetGasCollection(true),
            ]
        );
        assert!(log.commands.is_empty());
    }

    #[test]
    fn test_state_is_its_own_view() {
        let state = ResourceState {
            tick: 42,
            ..ResourceState::default()
        };
        assert_eq!(state.snapshot().tick, 42);
    }
}
