//! Placeholder arena.
//!
//! Entries live in slots addressed by a stable [`PlaceholderId`]; freed ids
//! are reused. A side index maps the host's placeholder handle to its id so
//! watcher callbacks resolve in constant time. Lookups by owner message or
//! by surface scan linearly; the registry holds a handful of entries per
//! conversation.

use hush_core::{MessageId, NodeId, SurfaceId};
use rustc_hash::FxHashMap;

/// Stable arena index of a placeholder entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceholderId(u32);

impl PlaceholderId {
    /// Raw slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

/// One detected fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderEntry {
    /// Host handle of the placeholder element.
    pub placeholder: NodeId,
    /// Decoded markup; surfaces are always rebuilt from this.
    pub raw_html: String,
    /// The mounted surface, if the placeholder is near the viewport.
    pub active: Option<SurfaceId>,
    /// Message whose rendering produced the fragment.
    pub owner: MessageId,
}

/// Arena of placeholder entries, indexed by id and by placeholder handle.
///
/// Ids of removed entries are reused.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderRegistry {
    slots: Vec<Option<PlaceholderEntry>>,
    by_node: FxHashMap<NodeId, PlaceholderId>,
    free_list: Vec<u32>,
}

impl PlaceholderRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry with no surface. A placeholder handle registered twice
    /// replaces the earlier entry.
    pub fn register(&mut self, placeholder: NodeId, raw_html: String, owner: MessageId) -> PlaceholderId {
        if let Some(stale) = self.lookup(placeholder) {
            self.remove(stale);
        }
        let entry = PlaceholderEntry {
            placeholder,
            raw_html,
            active: None,
            owner,
        };
        let id = match self.free_list.pop() {
            Some(index) => {
                self.slots[index as usize] = Some(entry);
                PlaceholderId(index)
            }
            None => {
                self.slots.push(Some(entry));
                PlaceholderId((self.slots.len() - 1) as u32)
            }
        };
        self.by_node.insert(placeholder, id);
        id
    }

    /// Entry for `id`, if still registered.
    #[must_use]
    pub fn get(&self, id: PlaceholderId) -> Option<&PlaceholderEntry> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Id of the entry for a placeholder handle.
    #[must_use]
    pub fn lookup(&self, placeholder: NodeId) -> Option<PlaceholderId> {
        self.by_node.get(&placeholder).copied()
    }

    /// Remove an entry and free its id.
    pub fn remove(&mut self, id: PlaceholderId) -> Option<PlaceholderEntry> {
        let entry = self.slots.get_mut(id.0 as usize)?.take()?;
        self.by_node.remove(&entry.placeholder);
        self.free_list.push(id.0);
        Some(entry)
    }

    /// Record a freshly mounted surface. Refused (returns `false`) when the
    /// entry already has one or does not exist.
    pub fn attach_surface(&mut self, id: PlaceholderId, surface: SurfaceId) -> bool {
        match self.slots.get_mut(id.0 as usize).and_then(Option::as_mut) {
            Some(entry) if entry.active.is_none() => {
                entry.active = Some(surface);
                true
            }
            _ => false,
        }
    }

    /// Forget the entry's surface, returning it.
    pub fn detach_surface(&mut self, id: PlaceholderId) -> Option<SurfaceId> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(Option::as_mut)
            .and_then(|entry| entry.active.take())
    }

    /// Entries owned by `owner`.
    #[must_use]
    pub fn owned_by(&self, owner: MessageId) -> Vec<PlaceholderId> {
        self.iter()
            .filter(|(_, entry)| entry.owner == owner)
            .map(|(id, _)| id)
            .collect()
    }

    /// The entry whose active surface is `surface`.
    #[must_use]
    pub fn find_by_surface(&self, surface: SurfaceId) -> Option<PlaceholderId> {
        self.iter()
            .find(|(_, entry)| entry.active == Some(surface))
            .map(|(id, _)| id)
    }

    /// Remove and return every entry.
    pub fn drain(&mut self) -> Vec<PlaceholderEntry> {
        let entries = self.slots.drain(..).flatten().collect();
        self.by_node.clear();
        self.free_list.clear();
        entries
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (PlaceholderId, &PlaceholderEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|entry| (PlaceholderId(i as u32), entry)))
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    /// Whether no entry is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }

    /// Number of entries with a mounted surface.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.iter().filter(|(_, entry)| entry.active.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(registry: &mut PlaceholderRegistry, node: u64, owner: u64) -> PlaceholderId {
        registry.register(NodeId(node), format!("<html>{node}</html>"), MessageId(owner))
    }

    #[test]
    fn register_and_lookup() {
        let mut r = PlaceholderRegistry::new();
        let id = reg(&mut r, 10, 1);
        assert_eq!(r.lookup(NodeId(10)), Some(id));
        assert_eq!(r.get(id).unwrap().raw_html, "<html>10</html>");
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn one_surface_per_entry() {
        let mut r = PlaceholderRegistry::new();
        let id = reg(&mut r, 10, 1);
        assert!(r.attach_surface(id, SurfaceId(1)));
        assert!(!r.attach_surface(id, SurfaceId(2)));
        assert_eq!(r.get(id).unwrap().active, Some(SurfaceId(1)));
        assert_eq!(r.detach_surface(id), Some(SurfaceId(1)));
        assert_eq!(r.detach_surface(id), None);
        assert!(r.attach_surface(id, SurfaceId(2)));
    }

    #[test]
    fn removed_ids_are_reused() {
        let mut r = PlaceholderRegistry::new();
        let a = reg(&mut r, 10, 1);
        reg(&mut r, 11, 1);
        assert!(r.remove(a).is_some());
        assert!(r.remove(a).is_none());
        assert_eq!(r.lookup(NodeId(10)), None);
        let c = reg(&mut r, 12, 2);
        assert_eq!(c, a);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn owner_and_surface_scans() {
        let mut r = PlaceholderRegistry::new();
        let a = reg(&mut r, 10, 1);
        let b = reg(&mut r, 11, 2);
        let c = reg(&mut r, 12, 1);
        r.attach_surface(b, SurfaceId(7));
        assert_eq!(r.owned_by(MessageId(1)), vec![a, c]);
        assert_eq!(r.find_by_surface(SurfaceId(7)), Some(b));
        assert_eq!(r.find_by_surface(SurfaceId(8)), None);
        assert_eq!(r.active_count(), 1);
    }

    #[test]
    fn reregistering_a_handle_replaces_it() {
        let mut r = PlaceholderRegistry::new();
        reg(&mut r, 10, 1);
        reg(&mut r, 10, 2);
        assert_eq!(r.len(), 1);
        assert!(r.owned_by(MessageId(1)).is_empty());
    }

    #[test]
    fn drain_empties_everything() {
        let mut r = PlaceholderRegistry::new();
        reg(&mut r, 10, 1);
        reg(&mut r, 11, 1);
        assert_eq!(r.drain().len(), 2);
        assert!(r.is_empty());
        assert_eq!(reg(&mut r, 12, 1).index(), 0);
    }
}
