use std::collections::HashMap;

use crate::error::HostError;

/// What the host remembers about one saved block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkEntry {
    /// The chunk id assigned on first save.
    pub id: u8,
    /// Source text of the last expression sent for this block, for
    /// display next to returned values.
    pub last_expression: Option<String>,
}

/// Host-private mapping from stable block identities to chunk ids.
///
/// Ids are handed out sequentially on first save and stay attached to
/// their block key for the life of the session; they are reused only
/// after `deleteAllCode` resets the registry. Id 255 is never assigned
/// (the device uses it for stdout output).
#[derive(Debug, Default)]
pub struct ChunkIds {
    next: u8,
    entries: HashMap<String, ChunkEntry>,
}

impl ChunkIds {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The chunk id for `block`, assigning the next free one on first
    /// sight.
    pub fn ensure(&mut self, block: &str) -> Result<u8, HostError> {
        if let Some(entry) = self.entries.get(block) {
            return Ok(entry.id);
        }
        if usize::from(self.next) >= usize::from(bloq_wire::STDOUT_CHUNK) {
            return Err(HostError::ChunkIdsExhausted);
        }
        let id = self.next;
        self.next += 1;
        self.entries.insert(
            block.to_string(),
            ChunkEntry {
                id,
                last_expression: None,
            },
        );
        Ok(id)
    }

    /// The chunk id for `block`, if it was ever saved.
    pub fn get(&self, block: &str) -> Option<u8> {
        self.entries.get(block).map(|e| e.id)
    }

    /// Remember the expression text shown with this block's results.
    pub fn set_last_expression(&mut self, block: &str, expression: &str) {
        if let Some(entry) = self.entries.get_mut(block) {
            entry.last_expression = Some(expression.to_string());
        }
    }

    /// The remembered expression text, if any.
    pub fn last_expression(&self, block: &str) -> Option<&str> {
        self.entries
            .get(block)?
            .last_expression
            .as_deref()
    }

    /// The block that owns a chunk id, for routing task reports back to
    /// the editor.
    pub fn block_for(&self, id: u8) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, e)| e.id == id)
            .map(|(block, _)| block.as_str())
    }

    /// Number of assigned ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was assigned yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every assignment; valid only alongside `deleteAllCode`.
    pub fn reset(&mut self) {
        self.next = 0;
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_and_sticky() {
        let mut ids = ChunkIds::new();
        assert_eq!(ids.ensure("block-a").unwrap(), 0);
        assert_eq!(ids.ensure("block-b").unwrap(), 1);
        // Saving again keeps the id.
        assert_eq!(ids.ensure("block-a").unwrap(), 0);
        assert_eq!(ids.len(), 2);
        assert_eq!(ids.block_for(1), Some("block-b"));
    }

    #[test]
    fn reset_frees_ids_for_reuse() {
        let mut ids = ChunkIds::new();
        ids.ensure("block-a").unwrap();
        ids.ensure("block-b").unwrap();
        ids.reset();
        assert!(ids.is_empty());
        assert_eq!(ids.ensure("block-c").unwrap(), 0);
    }

    #[test]
    fn id_255_is_never_assigned() {
        let mut ids = ChunkIds::new();
        for i in 0..255u32 {
            assert_eq!(ids.ensure(&format!("block-{i}")).unwrap(), i as u8);
        }
        assert!(matches!(
            ids.ensure("one-too-many"),
            Err(HostError::ChunkIdsExhausted)
        ));
    }

    #[test]
    fn last_expression_is_tracked_per_block() {
        let mut ids = ChunkIds::new();
        ids.ensure("block-a").unwrap();
        ids.set_last_expression("block-a", "21 * 2");
        assert_eq!(ids.last_expression("block-a"), Some("21 * 2"));
        assert_eq!(ids.last_expression("block-b"), None);
    }
}
