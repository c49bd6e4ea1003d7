//! Session instance pool.
//!
//! The pool owns every live terminal engine, keyed by session id, and keeps
//! it alive independently of whatever view currently shows it. Views only
//! ever hold ids; attach/detach move the rendering surface around without
//! touching engine state, and `dispose` is the single teardown path.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info};

use super::engine::{Subscription, TerminalEngine, Vt100Engine};
use super::mount::{MountRegistry, MountToken};
use super::surface::{HostRegion, RenderSurface};
use super::types::SessionId;

/// Builds a fresh engine for a session id.
pub type EngineFactory = Box<dyn Fn(&str) -> Box<dyn TerminalEngine> + Send + Sync>;

/// Set of session ids whose backing process has confirmed creation.
///
/// Cheap to clone; all clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct ReadinessSet {
    ids: Arc<Mutex<HashSet<SessionId>>>,
}

impl ReadinessSet {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.lock().contains(id)
    }

    fn insert(&self, id: &str) {
        self.ids.lock().insert(id.to_string());
    }

    fn remove(&self, id: &str) -> bool {
        self.ids.lock().remove(id)
    }
}

/// I/O subscriptions a demultiplexer attached to one engine.
#[derive(Debug, Default)]
pub struct IoSubscriptions {
    pub data: Option<Subscription>,
    pub title: Option<Subscription>,
    pub selection: Option<Subscription>,
}

impl IoSubscriptions {
    pub fn is_bound(&self) -> bool {
        self.data.is_some()
    }
}

/// An engine plus its detachable rendering surface.
pub struct PooledInstance {
    id: SessionId,
    engine: Mutex<Box<dyn TerminalEngine>>,
    surface: Mutex<RenderSurface>,
    io: Mutex<IoSubscriptions>,
}

impl PooledInstance {
    fn new(id: &str, engine: Box<dyn TerminalEngine>) -> Self {
        Self {
            id: id.to_string(),
            engine: Mutex::new(engine),
            surface: Mutex::new(RenderSurface::new()),
            io: Mutex::new(IoSubscriptions::default()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Run `f` against the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut dyn TerminalEngine) -> R) -> R {
        let mut engine = self.engine.lock();
        f(&mut **engine)
    }

    pub fn surface(&self) -> RenderSurface {
        self.surface.lock().clone()
    }

    pub fn host(&self) -> Option<HostRegion> {
        self.surface.lock().host().cloned()
    }

    pub fn io(&self) -> MutexGuard<'_, IoSubscriptions> {
        self.io.lock()
    }
}

impl std::fmt::Debug for PooledInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledInstance")
            .field("id", &self.id)
            .field("surface", &*self.surface.lock())
            .finish_non_exhaustive()
    }
}

/// Process-wide owner of terminal engines.
pub struct SessionPool {
    factory: EngineFactory,
    instances: Mutex<HashMap<SessionId, Arc<PooledInstance>>>,
    ready: ReadinessSet,
    mounts: MountRegistry,
}

impl SessionPool {
    pub fn new(factory: EngineFactory) -> Self {
        Self {
            factory,
            instances: Mutex::new(HashMap::new()),
            ready: ReadinessSet::default(),
            mounts: MountRegistry::new(),
        }
    }

    /// A pool of vt100 engines with `scrollback_lines` of history each.
    pub fn with_vt100(scrollback_lines: usize) -> Self {
        Self::new(Box::new(move |_id: &str| {
            Box::new(Vt100Engine::new(24, 80, scrollback_lines)) as Box<dyn TerminalEngine>
        }))
    }

    /// Return the pooled instance for `id`, constructing its engine on first
    /// use. Later calls return the same instance.
    pub fn get_or_create(&self, id: &str) -> Arc<PooledInstance> {
        let mut instances = self.instances.lock();
        if let Some(instance) = instances.get(id) {
            return Arc::clone(instance);
        }
        let instance = Arc::new(PooledInstance::new(id, (self.factory)(id)));
        instances.insert(id.to_string(), Arc::clone(&instance));
        debug!(session = %id, "pooled new terminal engine");
        instance
    }

    pub fn get(&self, id: &str) -> Option<Arc<PooledInstance>> {
        self.instances.lock().get(id).cloned()
    }

    pub fn has(&self, id: &str) -> bool {
        self.instances.lock().contains_key(id)
    }

    pub fn ids(&self) -> Vec<SessionId> {
        self.instances.lock().keys().cloned().collect()
    }

    pub fn instances(&self) -> Vec<Arc<PooledInstance>> {
        self.instances.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bind the instance's surface to `host` and refit the engine to it.
    ///
    /// Returns `None` if `id` was never pooled.
    pub fn attach(&self, id: &str, host: &HostRegion) -> Option<Arc<PooledInstance>> {
        let instance = self.get(id)?;
        let moved = instance.surface.lock().bind(host);
        if moved {
            instance.with_engine(|engine| {
                engine.resize_to_fit(host.area.width, host.area.height);
            });
        }
        Some(instance)
    }

    /// Unbind the instance's surface from its host, if any. The engine and
    /// readiness are untouched.
    pub fn detach(&self, id: &str) {
        if let Some(instance) = self.get(id) {
            instance.surface.lock().unbind();
        }
    }

    /// Tear down the engine for `id` and forget everything about it.
    ///
    /// Only an explicit session close may call this.
    pub fn dispose(&self, id: &str) -> bool {
        let Some(instance) = self.instances.lock().remove(id) else {
            return false;
        };
        // Drop I/O subscriptions before the engine goes away.
        *instance.io.lock() = IoSubscriptions::default();
        instance.with_engine(|engine| engine.dispose());
        instance.surface.lock().release();
        self.ready.remove(id);
        self.mounts.forget(id);
        info!(session = %id, "disposed terminal engine");
        true
    }

    pub fn readiness(&self) -> ReadinessSet {
        self.ready.clone()
    }

    pub fn is_ready(&self, id: &str) -> bool {
        self.ready.contains(id)
    }

    /// Mark `id` ready. Ignored for ids that are no longer pooled.
    ///
    /// Holds the instance map lock across the check so a concurrent
    /// [`dispose`](Self::dispose) either sees the flag and clears it or
    /// wins and leaves nothing to mark.
    pub fn mark_ready(&self, id: &str) -> bool {
        let instances = self.instances.lock();
        if !instances.contains_key(id) {
            return false;
        }
        self.ready.insert(id);
        true
    }

    pub fn clear_ready(&self, id: &str) -> bool {
        self.ready.remove(id)
    }

    pub fn mount(&self, id: &str) -> MountToken {
        self.mounts.mount(id)
    }

    pub fn unmount(&self, token: &MountToken) {
        self.mounts.unmount(token);
    }

    pub fn is_current(&self, token: &MountToken) -> bool {
        self.mounts.is_current(token)
    }
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("instances", &self.len())
            .finish_non_exhaustive()
    }
}
