use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use yew::prelude::*;

use crate::async_data::{AsyncData, MaybeAsync, get_async_data};

/// Load `loader(&deps)` into an [`AsyncData`], restarting when `deps` change.
///
/// The state goes back to `Loading` on every restart. A result that settles
/// after `deps` changed again, or after unmount, is dropped. Failures are
/// logged.
#[hook]
pub fn use_async_data<T, E, D, F, Fut>(deps: D, loader: F) -> AsyncData<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Display + 'static,
    D: PartialEq + 'static,
    F: FnOnce(&D) -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    let data = use_state(AsyncData::default);

    {
        let data = data.setter();
        use_effect_with(deps, move |deps| {
            let current = Rc::new(Cell::new(true));
            data.set(AsyncData::Loading);

            let task = loader(deps);
            let live = current.clone();
            yew::platform::spawn_local(async move {
                let result = get_async_data(task, None).await;
                if live.get() {
                    data.set(result);
                } else {
                    tracing::debug!("stale async data dropped");
                }
            });

            move || current.set(false)
        });
    }

    (*data).clone()
}

/// Like [`use_async_data`], but `data` may already be resolved.
///
/// Ready data is shown from the first render on. A pending future shows
/// `Loading` until it settles. When `deps` change, the `data` passed with
/// that render replaces the current state.
#[hook]
pub fn use_maybe_async_data<T, E, D, Fut>(
    deps: D,
    data: MaybeAsync<T, E, Fut>,
) -> AsyncData<T, E>
where
    T: Clone + 'static,
    E: Clone + fmt::Display + 'static,
    D: PartialEq + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    let state = {
        let initial = data.initial();
        use_state(move || initial)
    };

    {
        let state = state.setter();
        use_effect_with(deps, move |_| {
            let current = Rc::new(Cell::new(true));
            match data {
                MaybeAsync::Ready(data) => state.set(data),
                MaybeAsync::Pending(task) => {
                    state.set(AsyncData::Loading);
                    let live = current.clone();
                    yew::platform::spawn_local(async move {
                        let result = get_async_data(task, None).await;
                        if live.get() {
                            state.set(result);
                        }
                    });
                }
            }
            move || current.set(false)
        });
    }

    (*state).clone()
}
