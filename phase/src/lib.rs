//! Loading / error / done phases for asynchronously loaded views.
//!
//! A [`PhaseController`] is built once with a loading view, an error view and
//! an optional error handler, then shared by every component that loads
//! content. Components ask it for a view through the hooks in [`hooks`]
//! (`use_phase_async`, `use_phase_sync`), or, outside of Yew, through
//! [`AsyncSite`] and [`SyncSite`].
//!
//! ```rust,ignore
//! let phase = Rc::new(PhaseController::new(
//!     ControllerDefaults::new(
//!         html! { <Spinner /> },
//!         ErrorView::derived(|e: &ClientError| {
//!             html! { <p>{e.to_string()}</p> }
//!         }),
//!     )
//!     .with_on_error(|e| toast(e.to_string())),
//! ));
//! ```

mod async_data;
pub mod auth;
pub mod contexts;
mod controller;
mod error;
pub mod hooks;
pub mod host;
mod load;
pub mod logs;
#[cfg(test)]
mod test_support;

pub use async_data::{AsyncData, MaybeAsync, get_async_data};
pub use controller::{
    ControllerDefaults, ErrorView, PhaseConfig, PhaseController,
    RefreshOutcome, Status,
};
pub use error::PhaseError;
pub use host::{EffectSlot, LocalCell, StateCell};
pub use load::{
    AsyncSite, InFlightGuard, LoadState, Refresh, SyncRefresh, SyncSite,
    refresh_handle,
};
