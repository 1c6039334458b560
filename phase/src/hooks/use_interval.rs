use gloo_timers::callback::Interval;
use yew::prelude::*;

/// Call `callback` every `delay_ms` milliseconds while mounted.
///
/// A delay of 0 disables the timer. The timer restarts when `delay_ms` or
/// `deps` change; the latest `callback` is always the one invoked.
#[hook]
pub fn use_interval<D>(callback: Callback<()>, delay_ms: u32, deps: D)
where
    D: PartialEq + 'static,
{
    let latest = use_mut_ref(|| callback.clone());
    *latest.borrow_mut() = callback;

    use_effect_with((delay_ms, deps), move |(delay_ms, _)| {
        let interval = (*delay_ms > 0).then(|| {
            tracing::debug!(delay_ms, "starting interval");
            Interval::new(*delay_ms, move || latest.borrow().emit(()))
        });
        move || drop(interval)
    });
}
