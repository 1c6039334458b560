//! Authentication session shared through a provider.
//!
//! The session only tracks *who* is logged in; persisting that value is the
//! job of an [`AuthStore`] supplied by the app (local storage, a cookie
//! check, ...).

use std::future::Future;
use std::rc::Rc;

use crate::host::StateCell;

/// Where the logged-in value is persisted between page loads.
pub trait AuthStore {
    type Logged;

    fn get_saved_logged(
        &self,
    ) -> impl Future<Output = anyhow::Result<Option<Self::Logged>>>;

    fn save_logged(
        &self,
        logged: &Self::Logged,
    ) -> impl Future<Output = anyhow::Result<()>>;
}

/// Log an error using the alternate selector, which emits the error chain.
pub fn log_error(e: &anyhow::Error) {
    tracing::error!("{e:#}");
}

/// Login/logout actions over a state cell holding the logged-in value.
pub struct AuthSession<S: AuthStore, C> {
    store: Rc<S>,
    cell: C,
    on_error: Option<Rc<dyn Fn(&anyhow::Error)>>,
}

impl<S, C> AuthSession<S, C>
where
    S: AuthStore,
    C: StateCell<Option<S::Logged>>,
{
    pub fn new(store: Rc<S>, cell: C) -> Self {
        Self {
            store,
            cell,
            on_error: None,
        }
    }

    pub fn with_on_error(
        mut self,
        on_error: impl Fn(&anyhow::Error) + 'static,
    ) -> Self {
        self.on_error = Some(Rc::new(on_error));
        self
    }

    pub fn report(&self, e: &anyhow::Error) {
        match &self.on_error {
            Some(on_error) => on_error(e),
            None => log_error(e),
        }
    }

    /// Load the saved value. A store failure is reported and leaves the
    /// session logged out.
    pub async fn restore(&self) {
        match self.store.get_saved_logged().await {
            Ok(logged) => {
                tracing::debug!(logged = logged.is_some(), "restored session");
                self.cell.set(logged);
            }
            Err(e) => {
                self.report(&e);
                self.logout();
            }
        }
    }

    /// Persist `logged`, then publish it. Nothing is published if saving
    /// fails.
    pub async fn login(&self, logged: S::Logged) -> anyhow::Result<()> {
        self.store.save_logged(&logged).await?;
        tracing::info!("Logged in");
        self.cell.set(Some(logged));
        Ok(())
    }

    pub fn logout(&self) {
        self.cell.set(None);
    }
}

impl<S: AuthStore, C: Clone> Clone for AuthSession<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cell: self.cell.clone(),
            on_error: self.on_error.clone(),
        }
    }
}
