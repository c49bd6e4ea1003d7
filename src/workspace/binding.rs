//! Binding of visible panels to pooled sessions.
//!
//! Each frame the application hands the binding the set of panels on screen
//! together with their content areas. The binding mounts newly visible
//! sessions (bind I/O, attach, initialize), unmounts hidden ones (detach
//! only) and forwards size changes. Engines are disposed only by [`close`].
//!
//! [`close`]: ViewBinding::close

use std::collections::HashMap;
use std::sync::Arc;

use ratatui::layout::Rect;
use tokio::task::JoinHandle;
use tracing::debug;

use super::model::Panel;
use super::Workspace;
use crate::layout::PanelId;
use crate::pty::{InitOutcome, IoDemux, Launch, PtyCoordinator};
use crate::session::{HostRegion, MountToken, SessionId, SessionPool};

/// A panel on screen showing its active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub panel_id: PanelId,
    /// Session to show; `launch.id` is its backend id and pool key.
    pub launch: Launch,
    /// Cell area for the terminal grid.
    pub area: Rect,
}

impl View {
    pub fn for_panel(panel: &Panel, area: Rect) -> Option<Self> {
        let session = panel.active_session()?;
        Some(Self {
            panel_id: panel.id.clone(),
            launch: Launch::new(
                session.pty_id.clone(),
                panel.cwd.clone(),
                session.command.clone(),
            ),
            area,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.launch.id
    }
}

/// Views for every panel in `rects` that exists in `workspace`.
pub fn views(workspace: &Workspace, rects: &[(PanelId, Rect)]) -> Vec<View> {
    rects
        .iter()
        .filter_map(|(id, area)| View::for_panel(workspace.panel(id)?, *area))
        .collect()
}

/// Background work started by a reconcile pass.
#[derive(Debug, Default)]
pub struct Reconcile {
    pub inits: Vec<JoinHandle<InitOutcome>>,
    pub resizes: Vec<JoinHandle<()>>,
}

impl Reconcile {
    pub fn is_empty(&self) -> bool {
        self.inits.is_empty() && self.resizes.is_empty()
    }

    /// Wait for everything to finish and collect the init outcomes.
    pub async fn settle(self) -> Vec<InitOutcome> {
        for resize in self.resizes {
            let _ = resize.await;
        }
        let mut outcomes = Vec::with_capacity(self.inits.len());
        for init in self.inits {
            if let Ok(outcome) = init.await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }
}

#[derive(Debug)]
struct Mounted {
    session_id: SessionId,
    token: MountToken,
    area: Rect,
}

pub struct ViewBinding {
    pool: Arc<SessionPool>,
    coordinator: Arc<PtyCoordinator>,
    demux: Arc<IoDemux>,
    mounted: HashMap<PanelId, Mounted>,
    focused: Option<SessionId>,
}

impl ViewBinding {
    pub fn new(coordinator: Arc<PtyCoordinator>, demux: Arc<IoDemux>) -> Self {
        Self {
            pool: Arc::clone(coordinator.pool()),
            coordinator,
            demux,
            mounted: HashMap::new(),
            focused: None,
        }
    }

    /// Session currently mounted in `panel_id`.
    pub fn mounted_session(&self, panel_id: &str) -> Option<&str> {
        self.mounted.get(panel_id).map(|m| m.session_id.as_str())
    }

    pub fn is_mounted(&self, session_id: &str) -> bool {
        self.mounted.values().any(|m| m.session_id == session_id)
    }

    pub fn focused(&self) -> Option<&str> {
        self.focused.as_deref()
    }

    /// Bring the mounted set in line with `views` and focus the session of
    /// `focused_panel`.
    ///
    /// Must be called from within a tokio runtime; initialization and
    /// resize requests run as spawned tasks.
    pub fn reconcile(&mut self, views: &[View], focused_panel: Option<&str>) -> Reconcile {
        let stale: Vec<PanelId> = self
            .mounted
            .iter()
            .filter(|(panel_id, mounted)| {
                !views
                    .iter()
                    .any(|v| &v.panel_id == *panel_id && v.session_id() == mounted.session_id)
            })
            .map(|(panel_id, _)| panel_id.clone())
            .collect();
        for panel_id in stale {
            self.unmount(&panel_id);
        }

        let mut work = Reconcile::default();
        for view in views {
            let shown = self.mounted.get(&view.panel_id).map(|m| m.area);
            match shown {
                Some(area) if area == view.area => {}
                Some(_) => work.resizes.extend(self.resize(&view.panel_id, view.area)),
                None => work.inits.push(self.mount(view)),
            }
        }

        let focused_session = focused_panel
            .and_then(|panel_id| self.mounted.get(panel_id))
            .map(|m| m.session_id.clone());
        self.focus(focused_session.as_deref());
        work
    }

    fn mount(&mut self, view: &View) -> JoinHandle<InitOutcome> {
        let id = view.session_id().to_string();
        let instance = self.pool.get_or_create(&id);
        self.demux.bind(&instance);
        self.pool
            .attach(&id, &HostRegion::new(view.panel_id.clone(), view.area));
        let token = self.pool.mount(&id);
        debug!(session = %id, panel = %view.panel_id, generation = token.generation(), "mounted session view");

        self.mounted.insert(
            view.panel_id.clone(),
            Mounted {
                session_id: id,
                token: token.clone(),
                area: view.area,
            },
        );

        let coordinator = Arc::clone(&self.coordinator);
        let launch = view.launch.clone();
        tokio::spawn(async move { coordinator.initialize(&launch, &token).await })
    }

    fn unmount(&mut self, panel_id: &str) {
        let Some(mounted) = self.mounted.remove(panel_id) else {
            return;
        };
        self.pool.unmount(&mounted.token);
        if let Some(instance) = self.pool.get(&mounted.session_id) {
            // Another panel may already host it.
            if instance.host().is_some_and(|host| host.id == panel_id) {
                self.pool.detach(&mounted.session_id);
            }
            if self.focused.as_deref() == Some(mounted.session_id.as_str()) {
                instance.with_engine(|engine| engine.blur());
                self.focused = None;
            }
        }
        debug!(session = %mounted.session_id, panel = %panel_id, "unmounted session view");
    }

    /// Refit the engine shown in `panel_id` to `area` and forward the new
    /// grid size to the backend once the session is ready.
    pub fn resize(&mut self, panel_id: &str, area: Rect) -> Option<JoinHandle<()>> {
        let mounted = self.mounted.get_mut(panel_id)?;
        mounted.area = area;
        let instance = self
            .pool
            .attach(&mounted.session_id, &HostRegion::new(panel_id, area))?;
        let (cols, rows) = instance.with_engine(|engine| (engine.cols(), engine.rows()));

        let coordinator = Arc::clone(&self.coordinator);
        let id = mounted.session_id.clone();
        Some(tokio::spawn(async move {
            coordinator.request_resize(&id, cols, rows).await;
        }))
    }

    /// Focus `session_id` and blur every other mounted session.
    pub fn focus(&mut self, session_id: Option<&str>) {
        for mounted in self.mounted.values() {
            let Some(instance) = self.pool.get(&mounted.session_id) else {
                continue;
            };
            if Some(mounted.session_id.as_str()) == session_id {
                instance.with_engine(|engine| engine.focus());
            } else {
                instance.with_engine(|engine| engine.blur());
            }
        }
        self.focused = session_id
            .filter(|id| self.is_mounted(id))
            .map(str::to_string);
    }

    /// Tear down a session the user closed: unmount it wherever it is shown
    /// and dispose its engine.
    pub fn close(&mut self, session_id: &str) -> bool {
        let panels: Vec<PanelId> = self
            .mounted
            .iter()
            .filter(|(_, m)| m.session_id == session_id)
            .map(|(panel_id, _)| panel_id.clone())
            .collect();
        for panel_id in panels {
            self.unmount(&panel_id);
        }
        self.pool.dispose(session_id)
    }

    /// Unmount everything without disposing.
    pub fn unmount_all(&mut self) {
        let panels: Vec<PanelId> = self.mounted.keys().cloned().collect();
        for panel_id in panels {
            self.unmount(&panel_id);
        }
    }
}
