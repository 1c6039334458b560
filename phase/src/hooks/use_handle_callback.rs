use std::future::Future;

use yew::prelude::*;

/// Run `task` with a loading flag around it.
///
/// `set_loading` receives `true` first. A task that returns `Ok(true)` has
/// taken over the loading state (it navigated away, started another load, ...)
/// and the flag is left as is. Otherwise the flag is cleared, after handing
/// any failure to `on_error`.
pub async fn handle_callback<E, Fut>(
    set_loading: Option<&Callback<bool>>,
    task: Fut,
    on_error: &Callback<E>,
) where
    Fut: Future<Output = Result<bool, E>>,
{
    if let Some(set_loading) = set_loading {
        set_loading.emit(true);
    }
    match task.await {
        Ok(true) => return,
        Ok(false) => {}
        Err(err) => on_error.emit(err),
    }
    if let Some(set_loading) = set_loading {
        set_loading.emit(false);
    }
}

/// A callback running `callback` through [`handle_callback`].
///
/// Like `use_callback`, the closure is only replaced when `deps` change.
#[hook]
pub fn use_handle_callback<E, D, F, Fut>(
    set_loading: Option<Callback<bool>>,
    callback: F,
    on_error: Callback<E>,
    deps: D,
) -> Callback<()>
where
    E: 'static,
    D: PartialEq + 'static,
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = Result<bool, E>> + 'static,
{
    use_handle_callback_with_args(
        set_loading,
        move |()| callback(),
        on_error,
        deps,
    )
}

/// Like [`use_handle_callback`], forwarding the emitted value to `callback`.
#[hook]
pub fn use_handle_callback_with_args<A, E, D, F, Fut>(
    set_loading: Option<Callback<bool>>,
    callback: F,
    on_error: Callback<E>,
    deps: D,
) -> Callback<A>
where
    A: 'static,
    E: 'static,
    D: PartialEq + 'static,
    F: Fn(A) -> Fut + 'static,
    Fut: Future<Output = Result<bool, E>> + 'static,
{
    use_callback(deps, move |args: A, _| {
        let task = callback(args);
        let set_loading = set_loading.clone();
        let on_error = on_error.clone();
        yew::platform::spawn_local(async move {
            handle_callback(set_loading.as_ref(), task, &on_error).await;
        });
    })
}
