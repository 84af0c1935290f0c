use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiError, FinanceApi, LOGIN_FAILED_MESSAGE};
use crate::config::Config;
use crate::model::{Credential, User};
use crate::router::{self, Resolution, Route};
use crate::screens::{
    Container, DashboardScreen, GoalsScreen, LoadState, LoansScreen, TransactionsScreen,
};
use crate::session::{SessionError, SessionStore};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not logged in")]
    NotAuthenticated,
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Login screen state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    /// Shown under the form after a failed attempt.
    pub error: Option<String>,
}

/// Application shell: session, API client, router state and one container
/// per screen.
pub struct App {
    config: Config,
    session: SessionStore,
    session_rx: watch::Receiver<Option<Credential>>,
    api: Arc<dyn FinanceApi>,
    route: Route,
    /// Credential the cached screen data belongs to.
    signed_in: Option<Credential>,
    pub login_form: LoginForm,
    pub dashboard: Container<DashboardScreen>,
    pub transactions: Container<TransactionsScreen>,
    pub loans: Container<LoansScreen>,
    pub goals: Container<GoalsScreen>,
}

impl App {
    pub fn new(config: Config, session: SessionStore, api: Arc<dyn FinanceApi>) -> Self {
        let mut session_rx = session.subscribe();
        let signed_in = session_rx.borrow_and_update().clone();
        Self {
            config,
            session,
            session_rx,
            api,
            route: Route::Login,
            signed_in,
            login_form: LoginForm::default(),
            dashboard: Container::default(),
            transactions: Container::default(),
            loans: Container::default(),
            goals: Container::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn route(&self) -> Route {
        self.route
    }

    /// Load phase of the screen currently shown; public screens report `Ready`.
    pub fn phase(&self) -> LoadState {
        match self.route {
            Route::Dashboard => self.dashboard.phase(),
            Route::Transactions => self.transactions.phase(),
            Route::Loans => self.loans.phase(),
            Route::Goals => self.goals.phase(),
            Route::Login | Route::Register => LoadState::Ready,
        }
    }

    /// Guard `path`, leave the current screen if it changes, and load the
    /// target screen unless it is already loaded for the current credential.
    pub async fn navigate(&mut self, path: &str) -> Resolution {
        self.adopt_session(self.session.get());
        let resolution = router::resolve(path, &self.session);
        let target = resolution.target();
        debug!(path, ?resolution, "navigate");

        if target != self.route {
            self.unmount(self.route);
            self.route = target;
        }

        if target.is_protected() {
            match self.session.get() {
                Some(credential) if !self.is_loaded_for(target, &credential) => {
                    self.load(target, &credential).await
                }
                Some(_) => {}
                None => self.abandon(),
            }
        }
        resolution
    }

    /// Refetch the current screen under a new mount.
    pub async fn refresh(&mut self) -> Result<LoadState, AppError> {
        let credential = self.credential()?;
        if self.route.is_protected() {
            self.load(self.route, &credential).await;
        }
        Ok(self.phase())
    }

    /// Exchange credentials for a session and go to the dashboard.
    ///
    /// On failure the session is untouched, the form shows the fixed message,
    /// and the route does not change.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<(), AppError> {
        self.login_form.username = username.to_string();
        self.login_form.password = password.to_string();

        match self.api.login(username, password).await {
            Ok(credential) => {
                if let Err(e) = self.session.set(credential.clone()) {
                    warn!(error = %e, "session not persisted");
                }
                // Our own write; nothing to react to.
                let _ = self.session_rx.borrow_and_update();
                self.adopt_session(Some(credential));
                self.login_form = LoginForm::default();
                info!(username, "logged in");
                self.navigate(Route::Dashboard.path()).await;
                Ok(())
            }
            Err(e) => {
                self.login_form.error = Some(LOGIN_FAILED_MESSAGE.to_string());
                Err(e.into())
            }
        }
    }

    /// Create an account, then land on the login screen.
    pub async fn register(&mut self, username: &str, password: &str) -> Result<User, AppError> {
        let user = self.api.register(username, password).await?;
        self.navigate(Route::Login.path()).await;
        Ok(user)
    }

    pub async fn current_user(&self) -> Result<User, AppError> {
        let credential = self.credential()?;
        Ok(self.api.current_user(&credential).await?)
    }

    /// Drop the session and leave any protected screen.
    pub fn logout(&mut self) -> Result<(), AppError> {
        let result = self.session.clear();
        let _ = self.session_rx.borrow_and_update();
        self.adopt_session(None);
        self.abandon();
        info!("logged out");
        Ok(result?)
    }

    /// React to the session being cleared or replaced through another handle.
    ///
    /// A cleared session abandons the protected screen; a replaced one reloads
    /// it under the new credential. Returns true when the current screen was
    /// abandoned or reloaded.
    pub async fn sync_session(&mut self) -> bool {
        if !self.session_rx.has_changed().unwrap_or(false) {
            return false;
        }
        let current = self.session_rx.borrow_and_update().clone();
        if !self.adopt_session(current.clone()) || !self.route.is_protected() {
            return false;
        }
        match current {
            Some(credential) => self.load(self.route, &credential).await,
            None => self.abandon(),
        }
        true
    }

    pub async fn submit_transaction(&mut self) -> Result<(), AppError> {
        let credential = self.credential()?;
        self.transactions
            .model_mut()
            .submit(self.api.as_ref(), &credential)
            .await?;
        Ok(())
    }

    pub async fn submit_loan(&mut self) -> Result<(), AppError> {
        let credential = self.credential()?;
        self.loans
            .model_mut()
            .submit(self.api.as_ref(), &credential)
            .await?;
        Ok(())
    }

    pub async fn submit_goal(&mut self) -> Result<(), AppError> {
        let credential = self.credential()?;
        self.goals
            .model_mut()
            .submit(self.api.as_ref(), &credential)
            .await?;
        Ok(())
    }

    fn credential(&self) -> Result<Credential, AppError> {
        self.session.get().ok_or(AppError::NotAuthenticated)
    }

    /// Switch to `current` if it differs from the credential the cached
    /// screens belong to. Every screen is reset so nothing from the previous
    /// session is shown under the new one.
    fn adopt_session(&mut self, current: Option<Credential>) -> bool {
        if current == self.signed_in {
            return false;
        }
        debug!(
            had_session = self.signed_in.is_some(),
            has_session = current.is_some(),
            "session changed"
        );
        self.signed_in = current;
        self.dashboard.reset();
        self.transactions.reset();
        self.loans.reset();
        self.goals.reset();
        true
    }

    fn abandon(&mut self) {
        self.unmount(self.route);
        self.route = Route::Login;
    }

    fn is_loaded_for(&self, route: Route, credential: &Credential) -> bool {
        match route {
            Route::Dashboard => self.dashboard.is_loaded_for(credential),
            Route::Transactions => self.transactions.is_loaded_for(credential),
            Route::Loans => self.loans.is_loaded_for(credential),
            Route::Goals => self.goals.is_loaded_for(credential),
            Route::Login | Route::Register => false,
        }
    }

    fn unmount(&mut self, route: Route) {
        match route {
            Route::Dashboard => self.dashboard.unmount(),
            Route::Transactions => self.transactions.unmount(),
            Route::Loans => self.loans.unmount(),
            Route::Goals => self.goals.unmount(),
            Route::Login | Route::Register => {}
        }
    }

    async fn load(&mut self, route: Route, credential: &Credential) {
        let api = self.api.as_ref();
        match route {
            Route::Dashboard => {
                self.dashboard.load(api, credential).await;
            }
            Route::Transactions => {
                self.transactions.load(api, credential).await;
            }
            Route::Loans => {
                self.loans.load(api, credential).await;
            }
            Route::Goals => {
                self.goals.load(api, credential).await;
            }
            Route::Login | Route::Register => {}
        }
    }
}
