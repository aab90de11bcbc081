//! Production items and the priority queue handed to the execution layer.
//!
//! The queue is the scheduler's only output artifact. The execution layer
//! matches the front entry against idle producers; everything else in the
//! crate decides what goes in, in what order, and what gets dropped.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::catalog::{MacroCommand, Producer, TechKind, UnitKind, UpgradeKind};
use crate::resources::ItemHandle;

/// Coarse category of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    /// A unit or building.
    Unit,
    /// One-shot research.
    Tech,
    /// One level of an upgrade.
    Upgrade,
    /// A world command.
    Command,
}

/// Typed identity of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemTag {
    /// A unit or building.
    Unit(UnitKind),
    /// Research.
    Tech(TechKind),
    /// Upgrade.
    Upgrade(UpgradeKind),
    /// World command.
    Command(MacroCommand),
}

impl std::fmt::Display for ItemTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unit(kind) => write!(f, "{kind}"),
            Self::Tech(tech) => write!(f, "{tech:?}"),
            Self::Upgrade(up) => write!(f, "{up:?}"),
            Self::Command(cmd) => write!(f, "{cmd:?}"),
        }
    }
}

/// One production commitment. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductionItem {
    /// What to make.
    pub tag: ItemTag,
    /// Primary resource cost.
    pub primary_cost: u32,
    /// Secondary resource cost.
    pub secondary_cost: u32,
    /// Capacity change once made (negative for providers).
    pub capacity_delta: i32,
    /// Ticks from start to completion.
    pub build_duration: u32,
    /// What makes it.
    pub producer: Producer,
    /// First required structure, if any.
    pub prerequisite: Option<UnitKind>,
}

impl ProductionItem {
    /// Item for a unit or building, costed from the catalog.
    #[must_use]
    pub fn unit(kind: UnitKind) -> Self {
        let spec = kind.spec();
        Self {
            tag: ItemTag::Unit(kind),
            primary_cost: spec.primary,
            secondary_cost: spec.secondary,
            capacity_delta: kind.capacity_delta(),
            build_duration: spec.build_duration,
            producer: spec.producer,
            prerequisite: spec.requires.first().copied(),
        }
    }

    /// Item for research.
    #[must_use]
    pub fn tech(tech: TechKind) -> Self {
        let spec = tech.spec();
        Self {
            tag: ItemTag::Tech(tech),
            primary_cost: spec.primary,
            secondary_cost: spec.secondary,
            capacity_delta: 0,
            build_duration: spec.build_duration,
            producer: Producer::Building(spec.producer),
            prerequisite: Some(spec.producer),
        }
    }

    /// Item for the next level of an upgrade, given the level already owned.
    #[must_use]
    pub fn upgrade(upgrade: UpgradeKind, current_level: u8) -> Self {
        let spec = upgrade.spec();
        let (primary_cost, secondary_cost) = upgrade.cost_at(current_level);
        Self {
            tag: ItemTag::Upgrade(upgrade),
            primary_cost,
            secondary_cost,
            capacity_delta: 0,
            build_duration: spec.build_duration,
            producer: Producer::Building(spec.producer),
            prerequisite: Some(spec.producer),
        }
    }

    /// Item for a world command. Costs nothing.
    #[must_use]
    pub fn command(command: MacroCommand) -> Self {
        Self {
            tag: ItemTag::Command(command),
            primary_cost: 0,
            secondary_cost: 0,
            capacity_delta: 0,
            build_duration: 0,
            producer: Producer::World,
            prerequisite: None,
        }
    }

    /// Category of this item.
    #[must_use]
    pub const fn kind(&self) -> ItemKind {
        match self.tag {
            ItemTag::Unit(_) => ItemKind::Unit,
            ItemTag::Tech(_) => ItemKind::Tech,
            ItemTag::Upgrade(_) => ItemKind::Upgrade,
            ItemTag::Command(_) => ItemKind::Command,
        }
    }

    /// The unit kind, for unit items.
    #[must_use]
    pub const fn unit_kind(&self) -> Option<UnitKind> {
        match self.tag {
            ItemTag::Unit(kind) => Some(kind),
            _ => None,
        }
    }

    /// Whether this is the given unit kind.
    #[must_use]
    pub fn is_unit(&self, kind: UnitKind) -> bool {
        self.tag == ItemTag::Unit(kind)
    }

    /// Whether the item consumes a production slot.
    #[must_use]
    pub const fn uses_slot(&self) -> bool {
        matches!(self.producer, Producer::Larva)
    }
}

/// A queued item plus the world reservation attached to it, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueEntry {
    /// The commitment.
    pub item: ProductionItem,
    /// Set by the execution layer once it has committed resources.
    pub reservation: Option<ItemHandle>,
}

impl QueueEntry {
    /// Entry with no reservation.
    #[must_use]
    pub const fn new(item: ProductionItem) -> Self {
        Self {
            item,
            reservation: None,
        }
    }
}

/// Errors from queue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue is at its maximum length.
    Full,
    /// There is no front entry.
    Empty,
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "Production queue is full"),
            Self::Empty => write!(f, "Production queue is empty"),
        }
    }
}

impl std::error::Error for QueueError {}

/// Ordered production commitments, front first.
///
/// The same item may appear any number of times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionQueue {
    entries: VecDeque<QueueEntry>,
    /// Maximum number of entries.
    pub max_len: usize,
}

impl Default for ProductionQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductionQueue {
    /// Default maximum queue length.
    pub const DEFAULT_MAX_LEN: usize = 64;

    /// Create a new empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_len(Self::DEFAULT_MAX_LEN)
    }

    /// Create a queue with a specific maximum length.
    #[must_use]
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_len: max_len.max(1),
        }
    }

    /// Check if the queue is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_len
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Append at the back (lowest priority).
    ///
    /// Returns `Err` if the queue is full.
    pub fn push_back(&mut self, item: ProductionItem) -> Result<(), QueueError> {
        if self.is_full() {
            return Err(QueueError::Full);
        }
        self.entries.push_back(QueueEntry::new(item));
        Ok(())
    }

    /// Insert at the front (highest priority).
    ///
    /// Front insertions always succeed. When the queue is full the back
    /// entry is evicted and returned so its reservation can be recovered.
    pub fn push_front(&mut self, item: ProductionItem) -> Option<QueueEntry> {
        let evicted = if self.is_full() {
            self.entries.pop_back()
        } else {
            None
        };
        self.entries.push_front(QueueEntry::new(item));
        evicted
    }

    /// Insert several items at the front, keeping their order.
    ///
    /// Returns any entries evicted from the back.
    pub fn push_front_all(&mut self, items: &[ProductionItem]) -> Vec<QueueEntry> {
        items
            .iter()
            .rev()
            .filter_map(|item| self.push_front(*item))
            .collect()
    }

    /// Remove the front entry.
    pub fn pop_front(&mut self) -> Result<QueueEntry, QueueError> {
        self.entries.pop_front().ok_or(QueueError::Empty)
    }

    /// Remove the back entry.
    pub fn pop_back(&mut self) -> Option<QueueEntry> {
        self.entries.pop_back()
    }

    /// The next entry to execute.
    #[must_use]
    pub fn front(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    /// The next item to execute.
    #[must_use]
    pub fn front_item(&self) -> Option<&ProductionItem> {
        self.entries.front().map(|e| &e.item)
    }

    /// Attach a world reservation to the front entry.
    pub fn mark_reserved(&mut self, handle: ItemHandle) -> Result<(), QueueError> {
        let front = self.entries.front_mut().ok_or(QueueError::Empty)?;
        front.reservation = Some(handle);
        Ok(())
    }

    /// Read-only scan, front to back.
    pub fn iter(&self) -> impl Iterator<Item = &ProductionItem> {
        self.entries.iter().map(|e| &e.item)
    }

    /// Read-only scan of entries, front to back.
    pub fn entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    /// Number of queued items with this tag.
    #[must_use]
    pub fn count_of(&self, tag: ItemTag) -> usize {
        self.iter().filter(|i| i.tag == tag).count()
    }

    /// Whether any queued item has this tag.
    #[must_use]
    pub fn contains(&self, tag: ItemTag) -> bool {
        self.iter().any(|i| i.tag == tag)
    }

    /// Remove every entry, returning them front first.
    pub fn drain_all(&mut self) -> Vec<QueueEntry> {
        self.entries.drain(..).collect()
    }

    /// Drop entries from the back until at most `len` remain.
    ///
    /// Returns the removed entries.
    pub fn truncate(&mut self, len: usize) -> Vec<QueueEntry> {
        if self.entries.len() <= len {
            return Vec::new();
        }
        self.entries.split_off(len).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drone() -> ProductionItem {
        ProductionItem::unit(UnitKind::Drone)
    }

    fn ling() -> ProductionItem {
        ProductionItem::unit(UnitKind::Zergling)
    }

    #[test]
    fn test_item_from_catalog() {
        let item = ProductionItem::unit(UnitKind::Hydralisk);
        assert_eq!(item.kind(), ItemKind::Unit);
        assert_eq!(item.primary_cost, 75);
        assert_eq!(item.secondary_cost, 25);
        assert_eq!(item.capacity_delta, 2);
        assert_eq!(item.prerequisite, Some(UnitKind::HydraliskDen));
        assert!(item.uses_slot());
    }

    #[test]
    fn test_upgrade_item_cost_depends_on_level() {
        let first = ProductionItem::upgrade(UpgradeKind::MissileAttacks, 0);
        let third = ProductionItem::upgrade(UpgradeKind::MissileAttacks, 2);
        assert_eq!(first.primary_cost, 100);
        assert_eq!(third.primary_cost, 200);
        assert_eq!(third.kind(), ItemKind::Upgrade);
        assert!(!third.uses_slot());
    }

    #[test]
    fn test_command_is_free() {
        let cmd = ProductionItem::command(MacroCommand::StopGas);
        assert_eq!(cmd.kind(), ItemKind::Command);
        assert_eq!(cmd.primary_cost + cmd.secondary_cost, 0);
    }

    #[test]
    fn test_front_and_back() {
        let mut queue = ProductionQueue::new();
        queue.push_back(drone()).unwrap();
        queue.push_back(ling()).unwrap();
        queue.push_front(ProductionItem::unit(UnitKind::Overlord));

        let order: Vec<_> = queue.iter().map(|i| i.tag).collect();
        assert_eq!(
            order,
            vec![
                ItemTag::Unit(UnitKind::Overlord),
                ItemTag::Unit(UnitKind::Drone),
                ItemTag::Unit(UnitKind::Zergling),
            ]
        );
        assert_eq!(queue.pop_front().unwrap().item, ProductionItem::unit(UnitKind::Overlord));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_duplicates_allowed() {
        let mut queue = ProductionQueue::new();
        for _ in 0..3 {
            queue.push_back(drone()).unwrap();
        }
        assert_eq!(queue.count_of(ItemTag::Unit(UnitKind::Drone)), 3);
    }

    #[test]
    fn test_push_back_full() {
        let mut queue = ProductionQueue::with_max_len(2);
        queue.push_back(drone()).unwrap();
        queue.push_back(drone()).unwrap();
        assert_eq!(queue.push_back(drone()), Err(QueueError::Full));
    }

    #[test]
    fn test_push_front_evicts_back_when_full() {
        let mut queue = ProductionQueue::with_max_len(2);
        queue.push_back(drone()).unwrap();
        queue.push_back(ling()).unwrap();
        let evicted = queue.push_front(ProductionItem::unit(UnitKind::Overlord));
        assert_eq!(evicted.map(|e| e.item), Some(ling()));
        assert_eq!(queue.len(), 2);
        assert!(queue.front_item().unwrap().is_unit(UnitKind::Overlord));
    }

    #[test]
    fn test_push_front_all_keeps_order() {
        let mut queue = ProductionQueue::new();
        queue.push_back(ling()).unwrap();
        queue.push_front_all(&[drone(), drone(), ProductionItem::unit(UnitKind::Hatchery)]);
        let order: Vec<_> = queue.iter().filter_map(ProductionItem::unit_kind).collect();
        assert_eq!(
            order,
            vec![UnitKind::Drone, UnitKind::Drone, UnitKind::Hatchery, UnitKind::Zergling]
        );
    }

    #[test]
    fn test_pop_empty() {
        let mut queue = ProductionQueue::new();
        assert_eq!(queue.pop_front(), Err(QueueError::Empty));
        assert_eq!(queue.mark_reserved(ItemHandle::new(1)), Err(QueueError::Empty));
    }

    #[test]
    fn test_mark_reserved_and_drain() {
        let mut queue = ProductionQueue::new();
        queue.push_back(ProductionItem::unit(UnitKind::Extractor)).unwrap();
        queue.mark_reserved(ItemHandle::new(7)).unwrap();
        assert_eq!(queue.front().unwrap().reservation, Some(ItemHandle::new(7)));

        let drained = queue.drain_all();
        assert_eq!(drained.len(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_truncate_returns_tail() {
        let mut queue = ProductionQueue::new();
        for _ in 0..5 {
            queue.push_back(drone()).unwrap();
        }
        let removed = queue.truncate(2);
        assert_eq!(removed.len(), 3);
        assert_eq!(queue.len(), 2);
        assert!(queue.truncate(4).is_empty());
    }
}
