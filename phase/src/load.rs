//! Per-call-site load state and the framework-neutral `run_async` / `run_sync`
//! entry points.

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use futures::task::{LocalSpawn, LocalSpawnExt};

use crate::PhaseError;
use crate::controller::{PhaseConfig, PhaseController, RefreshOutcome, Status};
use crate::host::{EffectSlot, LocalCell, StateCell};

/// State owned by one call site: where views are published, the current
/// status, the in-flight guard and the liveness flag.
///
/// Clones share all of it, so a clone can be moved into a spawned refresh.
pub struct LoadState<C> {
    cell: C,
    status: Rc<Cell<Status>>,
    in_flight: Rc<Cell<bool>>,
    alive: Rc<Cell<bool>>,
}

impl<C> LoadState<C> {
    pub fn new(cell: C) -> Self {
        Self {
            cell,
            status: Rc::new(Cell::new(Status::Loading)),
            in_flight: Rc::new(Cell::new(false)),
            alive: Rc::new(Cell::new(true)),
        }
    }

    pub fn status(&self) -> Status {
        self.status.get()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    /// Mark the owner as gone. Nothing is published afterwards.
    pub fn teardown(&self) {
        self.alive.set(false);
    }

    /// Claim the in-flight flag, or `None` if a refresh already holds it.
    pub fn try_begin(&self) -> Option<InFlightGuard> {
        if self.in_flight.replace(true) {
            return None;
        }
        Some(InFlightGuard {
            flag: self.in_flight.clone(),
        })
    }

    /// Publish a view. Returns false, publishing nothing, after teardown.
    pub fn apply<V>(&self, status: Status, view: V) -> bool
    where
        C: StateCell<V>,
    {
        if !self.is_alive() {
            return false;
        }
        self.status.set(status);
        self.cell.set(view);
        true
    }
}

impl<C: Clone> Clone for LoadState<C> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            status: self.status.clone(),
            in_flight: self.in_flight.clone(),
            alive: self.alive.clone(),
        }
    }
}

impl<C> fmt::Debug for LoadState<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadState")
            .field("status", &self.status.get())
            .field("in_flight", &self.in_flight.get())
            .field("alive", &self.alive.get())
            .finish_non_exhaustive()
    }
}

/// Holds the in-flight flag; releases it on drop.
#[derive(Debug)]
pub struct InFlightGuard {
    flag: Rc<Cell<bool>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Manual refresh handle for an asynchronous call site.
#[derive(Clone)]
pub struct Refresh {
    run: Rc<dyn Fn() -> LocalBoxFuture<'static, RefreshOutcome>>,
}

impl Refresh {
    pub fn new(
        run: impl Fn() -> LocalBoxFuture<'static, RefreshOutcome> + 'static,
    ) -> Self {
        Self { run: Rc::new(run) }
    }

    /// Start a refresh. Nothing happens until the future is polled.
    pub fn run(&self) -> LocalBoxFuture<'static, RefreshOutcome> {
        (self.run)()
    }
}

impl fmt::Debug for Refresh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Refresh(..)")
    }
}

/// Build the refresh handle for one registration of `loader` and `config`.
pub fn refresh_handle<V, E, C, F, Fut>(
    controller: Rc<PhaseController<V, E>>,
    state: LoadState<C>,
    loader: F,
    config: PhaseConfig<V, E>,
) -> Refresh
where
    V: Clone + 'static,
    E: fmt::Display + 'static,
    C: StateCell<V> + Clone + 'static,
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = Result<Option<V>, E>> + 'static,
{
    let loader = Rc::new(loader);
    let config = Rc::new(config);
    Refresh::new(move || {
        let controller = controller.clone();
        let state = state.clone();
        let loader = loader.clone();
        let config = config.clone();
        async move { controller.load_async(&state, || loader(), &config).await }
            .boxed_local()
    })
}

/// One asynchronous call site, hosted without a UI framework.
///
/// `run` is called on every "render". Whenever the key differs from the last
/// registered one, the loader is registered and a refresh is spawned on the
/// host executor. A key change never cancels a refresh that is already in
/// flight: the automatic refresh for the new key is skipped and the in-flight
/// result still lands. Unmounting (or dropping) the site discards any result
/// that settles afterwards.
pub struct AsyncSite<K, V, E> {
    controller: Rc<PhaseController<V, E>>,
    spawner: Rc<dyn LocalSpawn>,
    cell: LocalCell<V>,
    state: LoadState<LocalCell<V>>,
    effect: EffectSlot<K>,
    refresh: Option<Refresh>,
}

impl<K, V, E> AsyncSite<K, V, E>
where
    K: PartialEq,
    V: Clone + 'static,
    E: fmt::Display + 'static,
{
    pub fn new(
        controller: Rc<PhaseController<V, E>>,
        spawner: impl LocalSpawn + 'static,
    ) -> Self {
        let cell =
            LocalCell::new(controller.loading_view(&PhaseConfig::default()));
        Self {
            controller,
            spawner: Rc::new(spawner),
            state: LoadState::new(cell.clone()),
            cell,
            effect: EffectSlot::new(),
            refresh: None,
        }
    }

    pub fn run<F, Fut>(
        &mut self,
        key: K,
        loader: F,
        config: PhaseConfig<V, E>,
    ) -> Result<(V, Refresh), PhaseError>
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<Option<V>, E>> + 'static,
    {
        let refresh = match &self.refresh {
            Some(refresh) if self.effect.is_current(&key) => refresh.clone(),
            _ => self.register(key, loader, config)?,
        };
        Ok((self.cell.get(), refresh))
    }

    fn register<F, Fut>(
        &mut self,
        key: K,
        loader: F,
        config: PhaseConfig<V, E>,
    ) -> Result<Refresh, PhaseError>
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<Option<V>, E>> + 'static,
    {
        if self.effect.key().is_none() && self.refresh.is_none() {
            self.state
                .apply(Status::Loading, self.controller.loading_view(&config));
        }

        let refresh = refresh_handle(
            self.controller.clone(),
            self.state.clone(),
            loader,
            config,
        );

        let mut spawned = Ok(());
        self.effect.register(key, |_| {
            let task = refresh.run();
            spawned = self.spawner.spawn_local(async move {
                let outcome = task.await;
                tracing::debug!(?outcome, "automatic refresh finished");
            });
            None
        });
        if let Err(e) = spawned {
            // forget the key so the next run retries the spawn
            self.effect.clear();
            return Err(e.into());
        }

        self.refresh = Some(refresh.clone());
        Ok(refresh)
    }

    pub fn view(&self) -> V {
        self.cell.get()
    }

    pub fn status(&self) -> Status {
        self.state.status()
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.is_in_flight()
    }

    /// Number of views published so far.
    pub fn writes(&self) -> usize {
        self.cell.writes()
    }

    /// Tear the site down. Loads that settle later are discarded.
    pub fn unmount(&mut self) {
        self.state.teardown();
        self.effect.clear();
    }
}

impl<K, V, E> Drop for AsyncSite<K, V, E> {
    fn drop(&mut self) {
        self.state.teardown();
    }
}

/// Manual refresh handle for a synchronous call site.
#[derive(Clone)]
pub struct SyncRefresh<V> {
    run: Rc<dyn Fn() -> V>,
}

impl<V> SyncRefresh<V> {
    /// Re-run the loader, publish and return the new view.
    pub fn run(&self) -> V {
        (self.run)()
    }
}

impl<V> fmt::Debug for SyncRefresh<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SyncRefresh(..)")
    }
}

/// One synchronous call site, hosted without a UI framework.
///
/// The loader runs immediately whenever the key changes; no guard is needed
/// since nothing suspends.
pub struct SyncSite<K, V, E> {
    controller: Rc<PhaseController<V, E>>,
    cell: LocalCell<V>,
    state: LoadState<LocalCell<V>>,
    effect: EffectSlot<K>,
    refresh: Option<SyncRefresh<V>>,
}

impl<K, V, E> SyncSite<K, V, E>
where
    K: PartialEq,
    V: Clone + 'static,
    E: fmt::Display + 'static,
{
    pub fn new(controller: Rc<PhaseController<V, E>>) -> Self {
        let cell =
            LocalCell::new(controller.loading_view(&PhaseConfig::default()));
        Self {
            controller,
            state: LoadState::new(cell.clone()),
            cell,
            effect: EffectSlot::new(),
            refresh: None,
        }
    }

    pub fn run<F>(
        &mut self,
        key: K,
        loader: F,
        config: PhaseConfig<V, E>,
    ) -> (V, SyncRefresh<V>)
    where
        F: Fn() -> Result<Option<V>, E> + 'static,
    {
        let refresh = match &self.refresh {
            Some(refresh) if self.effect.is_current(&key) => refresh.clone(),
            _ => {
                let controller = self.controller.clone();
                let state = self.state.clone();
                let refresh = SyncRefresh {
                    run: Rc::new(move || {
                        let (status, view) =
                            controller.load_sync(&loader, &config);
                        state.apply(status, view.clone());
                        view
                    }),
                };
                self.effect.register(key, |_| {
                    refresh.run();
                    None
                });
                self.refresh = Some(refresh.clone());
                refresh
            }
        };
        (self.cell.get(), refresh)
    }

    pub fn view(&self) -> V {
        self.cell.get()
    }

    pub fn status(&self) -> Status {
        self.state.status()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use futures::channel::oneshot;
    use futures::executor::LocalPool;

    use super::*;
    use crate::controller::{ControllerDefaults, ErrorView};
    use crate::test_support::capture_logs;

    type LoadResult = Result<Option<String>, String>;

    fn controller() -> Rc<PhaseController<String, String>> {
        Rc::new(PhaseController::new(ControllerDefaults::new(
            "L".to_string(),
            ErrorView::Static("E".to_string()),
        )))
    }

    /// A loader whose calls stay pending until the test resolves them, in
    /// call order.
    #[derive(Clone, Default)]
    struct Gate {
        pending: Rc<RefCell<VecDeque<oneshot::Sender<LoadResult>>>>,
        calls: Rc<Cell<usize>>,
    }

    impl Gate {
        fn loader(
            &self,
        ) -> impl Fn() -> LocalBoxFuture<'static, LoadResult> + 'static {
            let gate = self.clone();
            move || {
                let (tx, rx) = oneshot::channel();
                gate.pending.borrow_mut().push_back(tx);
                gate.calls.set(gate.calls.get() + 1);
                async move { rx.await.unwrap_or(Err("cancelled".into())) }
                    .boxed_local()
            }
        }

        fn resolve(&self, result: LoadResult) {
            let tx = self.pending.borrow_mut().pop_front();
            let _ = tx.map(|tx| tx.send(result));
        }

        fn calls(&self) -> usize {
            self.calls.get()
        }
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let state = LoadState::new(LocalCell::new(0));
        let guard = state.try_begin();
        assert!(guard.is_some());
        assert!(state.is_in_flight());
        assert!(state.try_begin().is_none());
        drop(guard);
        assert!(!state.is_in_flight());
        assert!(state.try_begin().is_some());
    }

    #[test]
    fn test_apply_after_teardown_is_ignored() {
        let cell = LocalCell::new(0);
        let state = LoadState::new(cell.clone());
        assert!(state.apply(Status::Done, 1));
        state.teardown();
        assert!(!state.apply(Status::Done, 2));
        assert_eq!(cell.get(), 1);
        assert_eq!(state.status(), Status::Done);
    }

    #[test]
    fn test_async_loads_on_mount() -> anyhow::Result<()> {
        let mut pool = LocalPool::new();
        let gate = Gate::default();
        let mut site = AsyncSite::new(controller(), pool.spawner());

        let (view, _) = site.run(1, gate.loader(), PhaseConfig::default())?;
        assert_eq!(view, "L");

        pool.run_until_stalled();
        assert_eq!(gate.calls(), 1);
        assert_eq!(site.status(), Status::Loading);

        gate.resolve(Ok(Some("V2".into())));
        pool.run_until_stalled();

        let (view, _) = site.run(1, gate.loader(), PhaseConfig::default())?;
        assert_eq!(view, "V2");
        assert_eq!(site.status(), Status::Done);
        assert_eq!(gate.calls(), 1);

        Ok(())
    }

    #[test]
    fn test_concurrent_refresh_is_noop() -> anyhow::Result<()> {
        let mut pool = LocalPool::new();
        let gate = Gate::default();
        let mut site = AsyncSite::new(controller(), pool.spawner());

        let (_, refresh) = site.run(1, gate.loader(), PhaseConfig::default())?;
        pool.run_until_stalled();
        assert!(site.is_in_flight());

        let outcome = pool.run_until(refresh.run());
        assert_eq!(outcome, RefreshOutcome::Skipped);
        assert_eq!(gate.calls(), 1);

        gate.resolve(Ok(Some("V1".into())));
        pool.run_until_stalled();
        assert!(!site.is_in_flight());
        assert_eq!(site.view(), "V1");

        // guard is clear again
        let next = pool.spawner().spawn_local_with_handle(refresh.run())?;
        pool.run_until_stalled();
        assert_eq!(gate.calls(), 2);
        assert_eq!(site.view(), "L");

        gate.resolve(Ok(Some("V2".into())));
        assert_eq!(pool.run_until(next), RefreshOutcome::Applied(Status::Done));
        assert_eq!(site.view(), "V2");

        Ok(())
    }

    #[test]
    fn test_failed_load_reports_once() -> anyhow::Result<()> {
        let reported = Rc::new(RefCell::new(Vec::new()));
        let phase = Rc::new(PhaseController::new(
            ControllerDefaults::new(
                "L".to_string(),
                ErrorView::Static("E".to_string()),
            )
            .with_on_error({
                let reported = reported.clone();
                move |err: &String| reported.borrow_mut().push(err.clone())
            }),
        ));
        let mut pool = LocalPool::new();
        let gate = Gate::default();
        let mut site = AsyncSite::new(phase, pool.spawner());

        let (_, refresh) = site.run((), gate.loader(), PhaseConfig::default())?;
        pool.run_until_stalled();
        gate.resolve(Err("E1".into()));
        pool.run_until_stalled();

        assert_eq!(*reported.borrow(), vec!["E1".to_string()]);
        assert_eq!(site.view(), "E");
        assert_eq!(site.status(), Status::Error);
        assert!(!site.is_in_flight());

        // a later successful refresh recovers
        let next = pool.spawner().spawn_local_with_handle(refresh.run())?;
        pool.run_until_stalled();
        gate.resolve(Ok(Some("V".into())));
        assert_eq!(pool.run_until(next), RefreshOutcome::Applied(Status::Done));
        assert_eq!(site.view(), "V");
        assert_eq!(reported.borrow().len(), 1);

        Ok(())
    }

    #[test]
    fn test_empty_result_shows_loading() -> anyhow::Result<()> {
        let mut pool = LocalPool::new();
        let gate = Gate::default();
        let mut site = AsyncSite::new(controller(), pool.spawner());

        site.run(1, gate.loader(), PhaseConfig::default())?;
        pool.run_until_stalled();
        gate.resolve(Ok(None));
        pool.run_until_stalled();

        assert_eq!(site.view(), "L");
        assert_eq!(site.status(), Status::Done);
        assert!(!site.is_in_flight());

        Ok(())
    }

    #[test]
    fn test_key_change_does_not_cancel() -> anyhow::Result<()> {
        let mut pool = LocalPool::new();
        let first = Gate::default();
        let second = Gate::default();
        let mut site = AsyncSite::new(controller(), pool.spawner());

        site.run(1, first.loader(), PhaseConfig::default())?;
        pool.run_until_stalled();

        let (view, _) = site.run(2, second.loader(), PhaseConfig::default())?;
        pool.run_until_stalled();
        assert_eq!(view, "L");
        assert_eq!(second.calls(), 0);

        first.resolve(Ok(Some("V2".into())));
        pool.run_until_stalled();
        assert_eq!(site.view(), "V2");

        // the refresh handle now belongs to key 2
        let (_, refresh) =
            site.run(2, second.loader(), PhaseConfig::default())?;
        let next = pool.spawner().spawn_local_with_handle(refresh.run())?;
        pool.run_until_stalled();
        assert_eq!(second.calls(), 1);
        second.resolve(Ok(Some("V3".into())));
        pool.run_until(next);
        assert_eq!(site.view(), "V3");

        Ok(())
    }

    #[test]
    fn test_unmount_discards_result() -> anyhow::Result<()> {
        let mut pool = LocalPool::new();
        let gate = Gate::default();
        let mut site = AsyncSite::new(controller(), pool.spawner());

        let (_, refresh) = site.run(1, gate.loader(), PhaseConfig::default())?;
        pool.run_until_stalled();
        let writes = site.writes();

        site.unmount();
        gate.resolve(Ok(Some("V2".into())));
        let ((), logs) = capture_logs(|| pool.run_until_stalled());

        assert_eq!(site.writes(), writes);
        assert_eq!(site.view(), "L");
        assert!(!site.is_in_flight());
        assert!(logs.contains("discarding"));

        // refreshing a dead site publishes nothing either
        let next = pool.spawner().spawn_local_with_handle(refresh.run())?;
        pool.run_until_stalled();
        gate.resolve(Ok(Some("V3".into())));
        assert_eq!(pool.run_until(next), RefreshOutcome::Discarded);
        assert_eq!(site.writes(), writes);

        Ok(())
    }

    #[test]
    fn test_dropped_refresh_releases_guard() -> anyhow::Result<()> {
        let mut pool = LocalPool::new();
        let gate = Gate::default();
        let mut site = AsyncSite::new(controller(), pool.spawner());

        let (_, refresh) = site.run(1, gate.loader(), PhaseConfig::default())?;
        pool.run_until_stalled();
        gate.resolve(Ok(Some("V".into())));
        pool.run_until_stalled();

        // poll once, then drop mid-flight
        assert!(refresh.run().now_or_never().is_none());
        assert!(!site.is_in_flight());
        assert_eq!(gate.calls(), 2);

        Ok(())
    }

    #[test]
    fn test_spawn_failure_is_retried() {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        drop(pool);
        let gate = Gate::default();
        let mut site = AsyncSite::new(controller(), spawner);

        for _ in 0..2 {
            let result = site.run(1, gate.loader(), PhaseConfig::default());
            assert!(matches!(result, Err(PhaseError::Spawn(_))));
        }
        assert!(site.effect.key().is_none());
        assert_eq!(gate.calls(), 0);
        assert_eq!(site.view(), "L");
    }

    #[test]
    fn test_config_loading_view_used_initially() -> anyhow::Result<()> {
        let pool = LocalPool::new();
        let gate = Gate::default();
        let mut site = AsyncSite::new(controller(), pool.spawner());
        let config = PhaseConfig::default().with_loading_view("wait".into());

        let (view, _) = site.run(1, gate.loader(), config)?;
        assert_eq!(view, "wait");

        Ok(())
    }

    #[test]
    fn test_sync_scenario() {
        let mut site = SyncSite::new(controller());

        let (view, _) =
            site.run(1, || Ok(Some("V1".into())), Default::default());
        assert_eq!(view, "V1");
        assert_eq!(site.status(), Status::Done);

        let ((view, _), logs) = capture_logs(|| {
            site.run(2, || Err("boom".into()), PhaseConfig::default())
        });
        assert_eq!(view, "E");
        assert_eq!(site.status(), Status::Error);
        assert!(logs.contains("boom"));
    }

    #[test]
    fn test_sync_reruns_only_on_key_change() {
        let calls = Rc::new(Cell::new(0));
        let loader = {
            let calls = calls.clone();
            move || {
                calls.set(calls.get() + 1);
                Ok(Some(format!("V{}", calls.get())))
            }
        };
        let mut site = SyncSite::new(controller());

        let (view, refresh) =
            site.run("a", loader.clone(), PhaseConfig::default());
        assert_eq!(view, "V1");
        let (view, _) = site.run("a", loader.clone(), PhaseConfig::default());
        assert_eq!(view, "V1");
        assert_eq!(calls.get(), 1);

        assert_eq!(refresh.run(), "V2");
        assert_eq!(site.view(), "V2");

        let (view, _) = site.run("b", loader, PhaseConfig::default());
        assert_eq!(view, "V3");
    }
}
