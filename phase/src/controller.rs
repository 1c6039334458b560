//! The phase controller: maps a load status onto a view and runs observed
//! loads.
//!
//! A controller is configured once with a loading view, an error view and an
//! optional error handler, and is then shared (by `Rc`) between any number of
//! call sites. Each call site owns its own [`LoadState`]; the controller itself
//! holds no per-load state.

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use crate::host::StateCell;
use crate::load::LoadState;

/// Lifecycle stage of the content a call site is loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::Display)]
pub enum Status {
    #[default]
    Loading,
    Error,
    Done,
}

/// What a refresh did, once it has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The load settled and its view was applied.
    Applied(Status),
    /// Another refresh was already in flight; nothing was started.
    Skipped,
    /// The owning instance was torn down before the load settled.
    Discarded,
}

/// The view shown when a load fails: either a fixed view or one derived from
/// the error.
pub enum ErrorView<V, E> {
    Static(V),
    Derived(Rc<dyn Fn(&E) -> V>),
}

impl<V, E> ErrorView<V, E> {
    pub fn derived(render: impl Fn(&E) -> V + 'static) -> Self {
        Self::Derived(Rc::new(render))
    }
}

impl<V: Clone, E> Clone for ErrorView<V, E> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(view) => Self::Static(view.clone()),
            Self::Derived(render) => Self::Derived(render.clone()),
        }
    }
}

impl<V: PartialEq, E> PartialEq for ErrorView<V, E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Static(a), Self::Static(b)) => a == b,
            (Self::Derived(a), Self::Derived(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<V: fmt::Debug, E> fmt::Debug for ErrorView<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(view) => f.debug_tuple("Static").field(view).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// Per-call overrides. Unset fields fall back to the controller defaults.
pub struct PhaseConfig<V, E> {
    pub loading_view: Option<V>,
    pub error_view: Option<ErrorView<V, E>>,
}

impl<V, E> PhaseConfig<V, E> {
    pub fn with_loading_view(mut self, view: V) -> Self {
        self.loading_view = Some(view);
        self
    }

    pub fn with_error_view(mut self, view: ErrorView<V, E>) -> Self {
        self.error_view = Some(view);
        self
    }
}

impl<V, E> Default for PhaseConfig<V, E> {
    fn default() -> Self {
        Self {
            loading_view: None,
            error_view: None,
        }
    }
}

impl<V: Clone, E> Clone for PhaseConfig<V, E> {
    fn clone(&self) -> Self {
        Self {
            loading_view: self.loading_view.clone(),
            error_view: self.error_view.clone(),
        }
    }
}

impl<V: PartialEq, E> PartialEq for PhaseConfig<V, E> {
    fn eq(&self, other: &Self) -> bool {
        self.loading_view == other.loading_view
            && self.error_view == other.error_view
    }
}

/// Controller-wide configuration, fixed at construction.
pub struct ControllerDefaults<V, E> {
    pub loading_view: V,
    pub error_view: ErrorView<V, E>,
    pub on_error: Option<Rc<dyn Fn(&E)>>,
}

impl<V, E> ControllerDefaults<V, E> {
    pub fn new(loading_view: V, error_view: ErrorView<V, E>) -> Self {
        Self {
            loading_view,
            error_view,
            on_error: None,
        }
    }

    pub fn with_on_error(mut self, on_error: impl Fn(&E) + 'static) -> Self {
        self.on_error = Some(Rc::new(on_error));
        self
    }
}

pub struct PhaseController<V, E> {
    defaults: ControllerDefaults<V, E>,
}

impl<V, E> PhaseController<V, E>
where
    V: Clone,
    E: fmt::Display,
{
    pub fn new(defaults: ControllerDefaults<V, E>) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &ControllerDefaults<V, E> {
        &self.defaults
    }

    pub fn loading_view(&self, config: &PhaseConfig<V, E>) -> V {
        config
            .loading_view
            .as_ref()
            .unwrap_or(&self.defaults.loading_view)
            .clone()
    }

    /// The error view for `error`. A derived view needs the error to render;
    /// without one it falls back to the loading view.
    pub fn error_view(
        &self,
        error: Option<&E>,
        config: &PhaseConfig<V, E>,
    ) -> V {
        let view = config
            .error_view
            .as_ref()
            .unwrap_or(&self.defaults.error_view);
        match (view, error) {
            (ErrorView::Static(view), _) => view.clone(),
            (ErrorView::Derived(render), Some(error)) => render(error),
            (ErrorView::Derived(_), None) => self.loading_view(config),
        }
    }

    /// Pick the view for a status.
    ///
    /// `Done` without a view renders as loading: a loader that produced
    /// nothing is treated as not ready yet rather than as a failure.
    pub fn resolve_view(
        &self,
        status: Status,
        done_view: Option<V>,
        error: Option<&E>,
        config: &PhaseConfig<V, E>,
    ) -> V {
        match (status, done_view) {
            (Status::Loading, _) | (Status::Done, None) => {
                self.loading_view(config)
            }
            (Status::Error, _) => self.error_view(error, config),
            (Status::Done, Some(view)) => view,
        }
    }

    pub fn report_error(&self, err: &E) {
        match &self.defaults.on_error {
            Some(on_error) => on_error(err),
            None => tracing::error!("{err}"),
        }
    }

    fn settle(
        &self,
        result: Result<Option<V>, E>,
        config: &PhaseConfig<V, E>,
    ) -> (Status, V) {
        match result {
            Ok(view) => (
                Status::Done,
                self.resolve_view(Status::Done, view, None, config),
            ),
            Err(err) => {
                self.report_error(&err);
                (
                    Status::Error,
                    self.resolve_view(Status::Error, None, Some(&err), config),
                )
            }
        }
    }

    /// Run a synchronous loader and resolve its view. Failures are reported
    /// and rendered as the error view.
    pub fn load_sync<F>(
        &self,
        loader: F,
        config: &PhaseConfig<V, E>,
    ) -> (Status, V)
    where
        F: FnOnce() -> Result<Option<V>, E>,
    {
        self.settle(loader(), config)
    }

    /// Run one guarded asynchronous refresh against `state`.
    ///
    /// Returns [`RefreshOutcome::Skipped`] without calling `loader` when a
    /// refresh is already in flight for this state. The in-flight flag is
    /// released however the returned future ends, including when it is
    /// dropped before completion.
    pub async fn load_async<C, F, Fut>(
        &self,
        state: &LoadState<C>,
        loader: F,
        config: &PhaseConfig<V, E>,
    ) -> RefreshOutcome
    where
        C: StateCell<V>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        let Some(_guard) = state.try_begin() else {
            tracing::debug!("refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        };

        state.apply(Status::Loading, self.loading_view(config));
        let result = loader().await;

        if !state.is_alive() {
            tracing::debug!("load settled after teardown, discarding result");
            return RefreshOutcome::Discarded;
        }

        let (status, view) = self.settle(result, config);
        state.apply(status, view);
        RefreshOutcome::Applied(status)
    }
}
