use std::fmt;
use std::future::Future;
use std::rc::Rc;

use yew::prelude::*;

use crate::controller::{PhaseConfig, PhaseController};
use crate::load::{LoadState, refresh_handle};

/// Phase-tracked async rendering.
///
/// Shows the loading view until `loader` settles, then its view, or the error
/// view if it failed. Loads automatically on mount and whenever `deps`
/// change; the returned callback refreshes manually. While a load is in
/// flight further refreshes are ignored, and results that settle after the
/// component unmounts are dropped.
///
/// The loader is captured when `deps` change, so anything it reads that can
/// change belongs in `deps`.
///
/// # Example
///
/// ```rust,ignore
/// #[function_component]
/// fn UserCard(props: &UserCardProps) -> Html {
///     let phase = use_context::<Rc<PhaseController<Html, ClientError>>>()
///         .expect("phase controller");
///     let user_id = props.user_id;
///     let (view, refresh) = use_phase_async(
///         &phase,
///         user_id,
///         move || async move {
///             let user: User = api_client()
///                 .get(&format!("/users/{user_id}"), &Default::default())
///                 .await?;
///             Ok(Some(html! { <p>{user.name}</p> }))
///         },
///         PhaseConfig::default(),
///     );
///     html! {
///         <div onclick={refresh.reform(|_| ())}>{view}</div>
///     }
/// }
/// ```
#[hook]
pub fn use_phase_async<E, D, F, Fut>(
    phase: &Rc<PhaseController<Html, E>>,
    deps: D,
    loader: F,
    config: PhaseConfig<Html, E>,
) -> (Html, Callback<()>)
where
    E: fmt::Display + 'static,
    D: PartialEq + Clone + 'static,
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = Result<Option<Html>, E>> + 'static,
{
    let view = {
        let phase = phase.clone();
        let config = config.clone();
        use_state(move || phase.loading_view(&config))
    };

    let load_state = {
        let setter = view.setter();
        use_memo((), move |_| LoadState::new(setter))
    };

    let refresh = {
        let phase = phase.clone();
        let load_state = (*load_state).clone();
        use_memo(deps.clone(), move |_| {
            refresh_handle(phase, load_state, loader, config)
        })
    };

    // Auto-refresh on mount and when deps change
    {
        let refresh = refresh.clone();
        use_effect_with(deps, move |_| {
            let task = refresh.run();
            yew::platform::spawn_local(async move {
                let outcome = task.await;
                tracing::debug!(?outcome, "automatic refresh finished");
            });
        });
    }

    // Drop late results once unmounted
    {
        let load_state = load_state.clone();
        use_effect_with((), move |_| on_unmount(load_state));
    }

    let refetch = Callback::from(move |_| {
        let task = refresh.run();
        yew::platform::spawn_local(async move {
            task.await;
        });
    });

    ((*view).clone(), refetch)
}

/// Cleanup of the mount effect. Loads that settle after it ran are discarded
/// by [`PhaseController::load_async`].
fn on_unmount<C: 'static>(state: Rc<LoadState<C>>) -> impl FnOnce() {
    move || state.teardown()
}

/// Phase-tracked synchronous rendering.
///
/// `loader` runs during render whenever `deps` change or the returned
/// callback is emitted. Failures are reported and rendered as the error view.
#[hook]
pub fn use_phase_sync<E, D, F>(
    phase: &Rc<PhaseController<Html, E>>,
    deps: D,
    loader: F,
    config: PhaseConfig<Html, E>,
) -> (Html, Callback<()>)
where
    E: fmt::Display + 'static,
    D: PartialEq + 'static,
    F: FnOnce() -> Result<Option<Html>, E>,
{
    let generation = use_state(|| 0_u32);

    let view = {
        let phase = phase.clone();
        use_memo((deps, *generation), move |_| {
            let (_, view) = phase.load_sync(loader, &config);
            view
        })
    };

    let refresh = Callback::from(move |_| {
        generation.set(generation.wrapping_add(1));
    });

    ((*view).clone(), refresh)
}
