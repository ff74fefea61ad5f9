use crate::dashboard::config::WidgetConfig;
use crate::dashboard::error::LoadError;
use eframe::egui;
use serde::de::DeserializeOwned;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

/// A mounted widget instance bound to one configuration.
pub trait Widget {
    fn render(&mut self, ui: &mut egui::Ui) -> anyhow::Result<()>;
}

/// Resolved implementation of a widget type, independent of configuration.
pub trait RenderableUnit: Send + Sync {
    /// Create a widget instance. Receives exactly the descriptor's config bag.
    fn mount(&self, config: &WidgetConfig) -> anyhow::Result<Box<dyn Widget>>;
}

/// Unit built from a typed config and a constructor, the way built-in widgets
/// are declared.
pub struct TypedUnit<C, W> {
    build: Box<dyn Fn(C) -> W + Send + Sync>,
}

impl<C, W> TypedUnit<C, W>
where
    C: DeserializeOwned + 'static,
    W: Widget + 'static,
{
    pub fn new(build: impl Fn(C) -> W + Send + Sync + 'static) -> Self {
        Self {
            build: Box::new(build),
        }
    }
}

impl<C, W> RenderableUnit for TypedUnit<C, W>
where
    C: DeserializeOwned + 'static,
    W: Widget + 'static,
{
    fn mount(&self, config: &WidgetConfig) -> anyhow::Result<Box<dyn Widget>> {
        let cfg: C = serde_json::from_value(serde_json::Value::Object(config.clone()))
            .map_err(|e| anyhow::anyhow!("invalid widget config: {e}"))?;
        Ok(Box::new((self.build)(cfg)))
    }
}

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executes resolution work off the UI path.
#[derive(Clone)]
pub struct Spawner(Arc<dyn Fn(Job) -> std::io::Result<()> + Send + Sync>);

impl Spawner {
    pub fn new(spawn: impl Fn(Job) + Send + Sync + 'static) -> Self {
        Self::fallible(move |job| {
            spawn(job);
            Ok(())
        })
    }

    /// Spawner that can refuse a job. A refused job is dropped unrun.
    pub fn fallible(spawn: impl Fn(Job) -> std::io::Result<()> + Send + Sync + 'static) -> Self {
        Self(Arc::new(spawn))
    }

    /// Run each job on its own named background thread.
    pub fn threaded(name: &str) -> Self {
        let name = name.to_string();
        Self::fallible(move |job| {
            std::thread::Builder::new()
                .name(name.clone())
                .spawn(job)
                .map(|_| ())
        })
    }

    /// Run jobs immediately on the calling thread.
    pub fn inline() -> Self {
        Self::new(|job| job())
    }

    pub fn spawn(&self, job: Job) -> std::io::Result<()> {
        (self.0)(job)
    }
}

type Resolver = Box<dyn FnOnce() -> Result<Arc<dyn RenderableUnit>, LoadError> + Send>;

enum Slot {
    Idle(Resolver),
    Pending,
    Ready(Arc<dyn RenderableUnit>),
    Failed(LoadError),
}

/// Observable state of a [`LazyUnit`].
#[derive(Clone)]
pub enum UnitStatus {
    Idle,
    Pending,
    Ready(Arc<dyn RenderableUnit>),
    Failed(LoadError),
}

impl UnitStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, UnitStatus::Idle | UnitStatus::Pending)
    }
}

impl std::fmt::Debug for UnitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitStatus::Idle => write!(f, "Idle"),
            UnitStatus::Pending => write!(f, "Pending"),
            UnitStatus::Ready(_) => write!(f, "Ready"),
            UnitStatus::Failed(e) => write!(f, "Failed({e})"),
        }
    }
}

/// Handle to a unit whose code is obtained on first use.
///
/// Nothing runs until [`LazyUnit::poll`] is called. The first poll moves the
/// handle from idle to pending and hands the resolver to the spawner; the
/// outcome, success or failure, is kept for the lifetime of the handle.
pub struct LazyUnit {
    label: String,
    slot: Mutex<Slot>,
    spawner: Spawner,
}

pub type UnitRef = Arc<LazyUnit>;

impl LazyUnit {
    pub fn new(
        label: impl Into<String>,
        spawner: Spawner,
        resolver: impl FnOnce() -> Result<Arc<dyn RenderableUnit>, LoadError> + Send + 'static,
    ) -> UnitRef {
        Arc::new(Self {
            label: label.into(),
            slot: Mutex::new(Slot::Idle(Box::new(resolver))),
            spawner,
        })
    }

    /// Handle that is already resolved.
    pub fn ready(label: impl Into<String>, unit: Arc<dyn RenderableUnit>) -> UnitRef {
        Arc::new(Self {
            label: label.into(),
            slot: Mutex::new(Slot::Ready(unit)),
            spawner: Spawner::inline(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current state without triggering resolution.
    pub fn status(&self) -> UnitStatus {
        match &*self.lock() {
            Slot::Idle(_) => UnitStatus::Idle,
            Slot::Pending => UnitStatus::Pending,
            Slot::Ready(unit) => UnitStatus::Ready(Arc::clone(unit)),
            Slot::Failed(e) => UnitStatus::Failed(e.clone()),
        }
    }

    /// Start resolution if nobody has yet and report the current state.
    /// `repaint` is asked to redraw once the outcome is known.
    pub fn poll(self: &Arc<Self>, repaint: Option<&egui::Context>) -> UnitStatus {
        let resolver = {
            let mut slot = self.lock();
            match std::mem::replace(&mut *slot, Slot::Pending) {
                Slot::Idle(resolver) => resolver,
                other => {
                    *slot = other;
                    drop(slot);
                    return self.status();
                }
            }
        };

        tracing::debug!(unit = %self.label, "resolving unit");
        let this = Arc::clone(self);
        let repaint = repaint.cloned();
        let spawned = self.spawner.spawn(Box::new(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(resolver)) {
                Ok(outcome) => outcome,
                Err(payload) => Err(LoadError::Crashed {
                    url: this.label.clone(),
                    reason: panic_message(payload.as_ref()),
                }),
            };
            {
                let mut slot = this.lock();
                *slot = match outcome {
                    Ok(unit) => {
                        tracing::debug!(unit = %this.label, "unit ready");
                        Slot::Ready(unit)
                    }
                    Err(e) => {
                        tracing::warn!(unit = %this.label, error = %e, "unit failed to load");
                        Slot::Failed(e)
                    }
                };
            }
            if let Some(ctx) = repaint {
                ctx.request_repaint();
            }
        }));
        if let Err(e) = spawned {
            tracing::error!(unit = %self.label, error = %e, "failed to start resolver");
            let mut slot = self.lock();
            if matches!(*slot, Slot::Pending) {
                *slot = Slot::Failed(LoadError::Spawn {
                    url: self.label.clone(),
                    reason: e.to_string(),
                });
            }
        }
        self.status()
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
