use std::fmt;
use std::rc::Rc;

use yew::prelude::*;

use crate::PhaseError;
use crate::auth::{AuthSession, AuthStore};
use crate::contexts::use_handled_context;
use crate::controller::{PhaseConfig, PhaseController, Status};

#[derive(Clone, PartialEq)]
pub struct AuthActions<L: 'static> {
    /// Persists the value, then publishes it. Failures go to the provider's
    /// error handler.
    pub login: Callback<L>,
    pub logout: Callback<()>,
}

/// What an [`AuthProvider`] shares with its children.
#[derive(Clone, PartialEq)]
pub struct AuthContext<L: 'static> {
    pub logged: Option<L>,
    pub actions: AuthActions<L>,
}

type StoreContext<S> = AuthContext<<S as AuthStore>::Logged>;

#[derive(Properties)]
pub struct AuthProviderProps<S: AuthStore + 'static> {
    pub store: Rc<S>,
    /// Receives store failures, formatted with their error chain. Defaults
    /// to the error log.
    #[prop_or_default]
    pub on_error: Option<Callback<String>>,
    pub children: Children,
}

impl<S: AuthStore + 'static> PartialEq for AuthProviderProps<S> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
            && self.on_error == other.on_error
            && self.children == other.children
    }
}

/// Restores the saved login on mount and provides an [`AuthContext`].
///
/// The store is read once per provider lifetime.
#[function_component]
pub fn AuthProvider<S>(props: &AuthProviderProps<S>) -> Html
where
    S: AuthStore + 'static,
    S::Logged: Clone + PartialEq + 'static,
{
    let logged = use_state(|| None::<S::Logged>);

    let session = {
        let store = props.store.clone();
        let setter = logged.setter();
        let on_error = props.on_error.clone();
        use_memo((), move |_| {
            let session = AuthSession::new(store, setter);
            match on_error {
                Some(on_error) => session
                    .with_on_error(move |e| on_error.emit(format!("{e:#}"))),
                None => session,
            }
        })
    };

    {
        let session = session.clone();
        use_effect_with((), move |_| {
            yew::platform::spawn_local(async move {
                session.restore().await;
            });
        });
    }

    let actions = {
        let session = session.clone();
        use_memo((), move |_| AuthActions {
            login: {
                let session = session.clone();
                Callback::from(move |logged: S::Logged| {
                    let session = session.clone();
                    yew::platform::spawn_local(async move {
                        if let Err(e) = session.login(logged).await {
                            session.report(&e);
                        }
                    });
                })
            },
            logout: Callback::from(move |_| session.logout()),
        })
    };

    let context: StoreContext<S> = AuthContext {
        logged: (*logged).clone(),
        actions: (*actions).clone(),
    };

    html! {
        <ContextProvider<StoreContext<S>> {context}>
            {props.children.clone()}
        </ContextProvider<StoreContext<S>>>
    }
}

/// The nearest [`AuthContext`], or `MissingProvider` outside an
/// [`AuthProvider`].
#[hook]
pub fn use_auth<L>() -> Result<AuthContext<L>, PhaseError>
where
    L: Clone + PartialEq + 'static,
{
    use_handled_context::<AuthContext<L>>()
}

/// Render with the auth context, or the phase's loading view when there is
/// no provider yet.
#[hook]
pub fn use_auth_view<L, E, F>(
    phase: &Rc<PhaseController<Html, E>>,
    render: F,
) -> Html
where
    L: Clone + PartialEq + 'static,
    E: fmt::Display + 'static,
    F: FnOnce(&AuthContext<L>) -> Html,
{
    let auth = use_context::<AuthContext<L>>();
    let done = auth.as_ref().map(render);
    phase.resolve_view(Status::Done, done, None, &PhaseConfig::default())
}

/// Like [`use_auth_view`], but only renders for a logged-in user; logged-out
/// users get `on_not_logged`.
#[hook]
pub fn use_logged_view<L, E, F>(
    phase: &Rc<PhaseController<Html, E>>,
    on_not_logged: Html,
    render: F,
) -> Html
where
    L: Clone + PartialEq + 'static,
    E: fmt::Display + 'static,
    F: FnOnce(&AuthContext<L>, &L) -> Html,
{
    let auth = use_context::<AuthContext<L>>();
    let done = auth.as_ref().map(|context| match &context.logged {
        Some(logged) => render(context, logged),
        None => on_not_logged,
    });
    phase.resolve_view(Status::Done, done, None, &PhaseConfig::default())
}
