//! Mount generations.
//!
//! Every time a session's view is mounted it receives a token carrying a new
//! generation number. Async continuations compare their token against the
//! registry before applying UI effects; a stale token means "skip the UI part".

use std::collections::HashMap;

use parking_lot::Mutex;

use super::types::SessionId;

/// Identifies one mount of a session view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountToken {
    id: SessionId,
    generation: u64,
}

impl MountToken {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct MountState {
    generation: u64,
    mounted: bool,
}

#[derive(Debug, Default)]
struct Mounts {
    /// Generations are unique across all ids, so a token can never match a
    /// later mount of a forgotten id.
    next_generation: u64,
    states: HashMap<SessionId, MountState>,
}

#[derive(Debug, Default)]
pub struct MountRegistry {
    mounts: Mutex<Mounts>,
}

impl MountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new mount of `id`, invalidating any earlier token.
    pub fn mount(&self, id: &str) -> MountToken {
        let mut mounts = self.mounts.lock();
        mounts.next_generation += 1;
        let generation = mounts.next_generation;
        mounts.states.insert(
            id.to_string(),
            MountState {
                generation,
                mounted: true,
            },
        );
        MountToken {
            id: id.to_string(),
            generation,
        }
    }

    /// End the mount identified by `token`. A token from an older generation
    /// leaves a newer mount untouched.
    pub fn unmount(&self, token: &MountToken) {
        let mut mounts = self.mounts.lock();
        if let Some(state) = mounts.states.get_mut(&token.id) {
            if state.generation == token.generation {
                state.mounted = false;
            }
        }
    }

    pub fn is_current(&self, token: &MountToken) -> bool {
        self.mounts
            .lock()
            .states
            .get(&token.id)
            .is_some_and(|state| state.mounted && state.generation == token.generation)
    }

    pub fn forget(&self, id: &str) {
        self.mounts.lock().states.remove(id);
    }
}
