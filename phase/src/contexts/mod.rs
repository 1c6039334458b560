pub mod auth;
pub mod handled;

pub use auth::{
    AuthActions, AuthContext, AuthProvider, AuthProviderProps, use_auth,
    use_auth_view, use_logged_view,
};
pub use handled::{HandledContext, ProviderScope, use_handled_context};
