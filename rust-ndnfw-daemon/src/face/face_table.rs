//! Registry of active faces, keyed by id.

use crate::face::link_service::LinkService;
use crate::face::transport::Transport;
use crate::face::{Face, FaceId, FaceScope};
use log::info;
use std::collections::HashMap;

#[derive(Debug)]
pub struct FaceTable {
    faces: HashMap<FaceId, Face>,
    next_id: u64,
}

impl FaceTable {
    pub fn new() -> Self {
        Self {
            faces: HashMap::new(),
            // Id 0 is reserved as invalid.
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Creates a face around the given transport and registers it.
    pub fn add(
        &mut self,
        scope: FaceScope,
        link_service: LinkService,
        transport: Box<dyn Transport>,
    ) -> FaceId {
        let id = FaceId::new(self.next_id);
        self.next_id += 1;
        let face = Face::new(id, scope, link_service, transport);
        info!(
            "[face {}] created, local={} remote={}",
            id,
            face.local_uri(),
            face.remote_uri()
        );
        self.faces.insert(id, face);
        id
    }

    pub fn get(&self, id: FaceId) -> Option<&Face> {
        self.faces.get(&id)
    }

    pub fn get_mut(&mut self, id: FaceId) -> Option<&mut Face> {
        self.faces.get_mut(&id)
    }

    pub fn contains(&self, id: FaceId) -> bool {
        self.faces.contains_key(&id)
    }

    /// Unregisters and returns the face; the caller drives the close
    /// transition and table purges.
    pub fn remove(&mut self, id: FaceId) -> Option<Face> {
        self.faces.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Face> {
        self.faces.values()
    }

    pub fn ids(&self) -> Vec<FaceId> {
        self.faces.keys().copied().collect()
    }
}

impl Default for FaceTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::link_service::LinkServiceOptions;
    use crate::face::transport::DummyTransport;

    fn add_dummy(table: &mut FaceTable) -> FaceId {
        table.add(
            FaceScope::NonLocal,
            LinkService::new(LinkServiceOptions::default()),
            Box::new(DummyTransport::new()),
        )
    }

    #[test]
    fn test_ids_are_unique_and_nonzero() {
        let mut table = FaceTable::new();
        let id1 = add_dummy(&mut table);
        let id2 = add_dummy(&mut table);

        assert_ne!(id1, FaceId::INVALID);
        assert_ne!(id1, id2);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut table = FaceTable::new();
        let id1 = add_dummy(&mut table);
        table.remove(id1);
        let id2 = add_dummy(&mut table);

        assert_ne!(id1, id2);
        assert!(!table.contains(id1));
        assert!(table.contains(id2));
    }
}
