pub mod use_async_data;
pub mod use_handle_callback;
pub mod use_interval;
pub mod use_phase;

pub use use_async_data::{use_async_data, use_maybe_async_data};
pub use use_handle_callback::{
    handle_callback, use_handle_callback, use_handle_callback_with_args,
};
pub use use_interval::use_interval;
pub use use_phase::{use_phase_async, use_phase_sync};
