use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fintrack_client::api::{ApiError, FinanceApi, LOGIN_FAILED_MESSAGE};
use fintrack_client::app::{App, AppError};
use fintrack_client::config::Config;
use fintrack_client::model::*;
use fintrack_client::router::{Resolution, Route};
use fintrack_client::screens::LoadState;
use fintrack_client::session::SessionStore;

/// In-memory finance API: one user, canned records, and call counters.
struct StubApi {
    fail_writes: bool,
    fail_reads: bool,
    stall_chart: bool,
    fetches: Arc<AtomicU32>,
    creates: Arc<AtomicU32>,
    seen_tokens: Mutex<Vec<String>>,
    last_transaction: Mutex<Option<TransactionDraft>>,
}

impl StubApi {
    fn new() -> Self {
        Self {
            fail_writes: false,
            fail_reads: false,
            stall_chart: false,
            fetches: Arc::new(AtomicU32::new(0)),
            creates: Arc::new(AtomicU32::new(0)),
            seen_tokens: Mutex::new(Vec::new()),
            last_transaction: Mutex::new(None),
        }
    }

    fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::new()
        }
    }

    fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Self::new()
        }
    }

    fn stalled_chart() -> Self {
        Self {
            stall_chart: true,
            ..Self::new()
        }
    }

    fn read(&self, credential: &Credential) -> Result<(), ApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.seen_tokens
            .lock()
            .unwrap()
            .push(credential.token().to_string());
        if self.fail_reads {
            return Err(ApiError::Transport("connection refused".into()));
        }
        Ok(())
    }

    fn write(&self) -> Result<(), ApiError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(ApiError::Status {
                status: 422,
                message: "field required".into(),
            });
        }
        Ok(())
    }
}

fn category(id: i64, name: &str) -> Category {
    Category {
        id,
        name: name.into(),
    }
}

fn transaction(id: i64, description: &str, amount: f64, kind: TransactionKind) -> Transaction {
    Transaction {
        id,
        description: description.into(),
        amount,
        kind,
        date: NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
        category: category(1, "Salary"),
    }
}

#[async_trait]
impl FinanceApi for StubApi {
    async fn login(&self, username: &str, password: &str) -> Result<Credential, ApiError> {
        if username == "alice" && password == "secret" {
            Ok(Credential::new("tok-alice"))
        } else if username == "bob" && password == "hunter2" {
            Ok(Credential::new("tok-bob"))
        } else {
            Err(ApiError::InvalidCredentials)
        }
    }

    async fn register(&self, username: &str, _password: &str) -> Result<User, ApiError> {
        if username == "alice" {
            return Err(ApiError::UsernameTaken);
        }
        Ok(User {
            id: 2,
            username: username.into(),
        })
    }

    async fn current_user(&self, credential: &Credential) -> Result<User, ApiError> {
        self.read(credential)?;
        Ok(User {
            id: 1,
            username: "alice".into(),
        })
    }

    async fn fetch_summary(&self, credential: &Credential) -> Result<Summary, ApiError> {
        self.read(credential)?;
        if credential.token() == "tok-bob" {
            return Ok(Summary {
                balance: 42.0,
                ..Summary::default()
            });
        }
        Ok(Summary {
            total_income: 5000.0,
            total_expense: 1200.0,
            balance: 3800.0,
            total_debt: 300.0,
            total_lent_outstanding: 150.0,
        })
    }

    async fn fetch_expense_by_category(
        &self,
        credential: &Credential,
    ) -> Result<Vec<CategoryTotal>, ApiError> {
        self.read(credential)?;
        if self.stall_chart {
            std::future::pending::<()>().await;
        }
        Ok(vec![
            CategoryTotal {
                category: "Food".into(),
                total: 900.0,
            },
            CategoryTotal {
                category: "Transport".into(),
                total: 300.0,
            },
        ])
    }

    async fn fetch_transactions(
        &self,
        credential: &Credential,
    ) -> Result<Vec<Transaction>, ApiError> {
        self.read(credential)?;
        Ok(vec![
            transaction(2, "Groceries", 40.0, TransactionKind::Expense),
            transaction(1, "Salary", 5000.0, TransactionKind::Income),
        ])
    }

    async fn fetch_categories(&self, credential: &Credential) -> Result<Vec<Category>, ApiError> {
        self.read(credential)?;
        Ok(vec![category(1, "Salary"), category(2, "Food")])
    }

    async fn create_transaction(
        &self,
        _credential: &Credential,
        draft: &TransactionDraft,
    ) -> Result<Transaction, ApiError> {
        self.write()?;
        *self.last_transaction.lock().unwrap() = Some(draft.clone());
        let mut created = transaction(99, &draft.description, draft.amount, draft.kind);
        created.category = category(draft.category_id.unwrap_or(1), "Food");
        Ok(created)
    }

    async fn fetch_loans(&self, credential: &Credential) -> Result<Vec<Loan>, ApiError> {
        self.read(credential)?;
        Ok(vec![
            Loan {
                id: 1,
                name: "Bank".into(),
                amount: 500.0,
                paid: 200.0,
                remaining: 300.0,
                direction: LoanDirection::Borrowed,
                date_taken: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                source: "Bank".into(),
            },
            Loan {
                id: 2,
                name: "Bob".into(),
                amount: 150.0,
                paid: 0.0,
                remaining: 150.0,
                direction: LoanDirection::Lent,
                date_taken: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                source: String::new(),
            },
        ])
    }

    async fn create_loan(
        &self,
        _credential: &Credential,
        draft: &LoanDraft,
    ) -> Result<Loan, ApiError> {
        self.write()?;
        Ok(Loan {
            id: 7,
            name: draft.name.clone(),
            amount: draft.amount,
            paid: draft.paid,
            remaining: draft.amount - draft.paid,
            direction: draft.direction,
            date_taken: draft.date_taken,
            source: draft.source.clone(),
        })
    }

    async fn fetch_goals(&self, credential: &Credential) -> Result<Vec<Goal>, ApiError> {
        self.read(credential)?;
        Ok(vec![Goal {
            id: 1,
            name: "Laptop".into(),
            target_amount: 50000.0,
            current_amount: 12500.0,
        }])
    }

    async fn create_goal(
        &self,
        _credential: &Credential,
        draft: &GoalDraft,
    ) -> Result<Goal, ApiError> {
        self.write()?;
        Ok(Goal {
            id: 5,
            name: draft.name.clone(),
            target_amount: draft.target_amount,
            current_amount: draft.current_amount,
        })
    }
}

fn app_with(api: Arc<StubApi>) -> App {
    App::new(Config::default(), SessionStore::in_memory(), api)
}

async fn logged_in(api: Arc<StubApi>) -> App {
    let mut app = app_with(api);
    app.login("alice", "secret").await.unwrap();
    app
}

#[tokio::test]
async fn test_login_success_stores_token_and_opens_dashboard() {
    let api = Arc::new(StubApi::new());
    let app = logged_in(api.clone()).await;

    assert_eq!(app.session().get(), Some(Credential::new("tok-alice")));
    assert_eq!(app.route(), Route::Dashboard);
    assert_eq!(app.phase(), LoadState::Ready);
    assert_eq!(app.login_form.error, None);

    let summary = app.dashboard.model().summary.clone().unwrap();
    assert_eq!(summary.balance, 3800.0);
    assert!(!app.dashboard.model().chart().is_placeholder());

    // Every protected fetch carried the new token.
    let tokens = api.seen_tokens.lock().unwrap();
    assert!(!tokens.is_empty());
    assert!(tokens.iter().all(|t| t == "tok-alice"));
}

#[tokio::test]
async fn test_login_failure_keeps_session_and_route() {
    let mut app = app_with(Arc::new(StubApi::new()));

    let err = app.login("alice", "wrong").await.unwrap_err();
    assert!(matches!(err, AppError::Api(ApiError::InvalidCredentials)));
    assert_eq!(app.session().get(), None);
    assert_eq!(app.route(), Route::Login);
    assert_eq!(app.login_form.error.as_deref(), Some(LOGIN_FAILED_MESSAGE));
    assert_eq!(
        app.login_form.error.as_deref(),
        Some("Invalid username or password.")
    );
}

#[tokio::test]
async fn test_guard_redirects_without_session() {
    let api = Arc::new(StubApi::new());
    let mut app = app_with(api.clone());

    for path in ["/dashboard", "/transactions", "/loans", "/goals"] {
        let resolution = app.navigate(path).await;
        assert_eq!(resolution, Resolution::Redirect(Route::Login));
        assert_eq!(app.route(), Route::Login);
    }
    assert_eq!(api.fetches.load(Ordering::SeqCst), 0);

    assert_eq!(
        app.navigate("/register").await,
        Resolution::Render(Route::Register)
    );
}

#[tokio::test]
async fn test_submit_transaction_prepends_server_echo() {
    let api = Arc::new(StubApi::new());
    let mut app = logged_in(api.clone()).await;
    app.navigate("/transactions").await;
    assert_eq!(app.phase(), LoadState::Ready);

    let before: Vec<i64> = app
        .transactions
        .model()
        .transactions
        .iter()
        .map(|t| t.id)
        .collect();
    // First category is preselected.
    assert_eq!(app.transactions.model().draft.category_id, Some(1));

    {
        let draft = &mut app.transactions.model_mut().draft;
        draft.description = "Coffee".into();
        draft.amount = 150.0;
        draft.kind = TransactionKind::Expense;
        draft.category_id = Some(2);
    }
    app.submit_transaction().await.unwrap();

    let sent = api.last_transaction.lock().unwrap().clone().unwrap();
    assert_eq!(sent.description, "Coffee");
    assert_eq!(sent.category_id, Some(2));

    let screen = app.transactions.model();
    assert_eq!(screen.transactions.len(), before.len() + 1);
    assert_eq!(screen.transactions[0].id, 99);
    assert_eq!(screen.transactions[0].description, "Coffee");
    let rest: Vec<i64> = screen.transactions[1..].iter().map(|t| t.id).collect();
    assert_eq!(rest, before);

    // Draft back to blank on the first category.
    assert_eq!(screen.draft, TransactionDraft::with_category(Some(1)));
}

#[tokio::test]
async fn test_failed_create_leaves_list_and_draft() {
    let api = Arc::new(StubApi::failing_writes());
    let mut app = logged_in(api.clone()).await;
    app.navigate("/goals").await;

    app.goals.model_mut().draft = GoalDraft {
        name: "Bike".into(),
        target_amount: 800.0,
        current_amount: 0.0,
    };
    let draft_before = app.goals.model().draft.clone();
    let goals_before = app.goals.model().goals.clone();

    let err = app.submit_goal().await.unwrap_err();
    assert!(matches!(err, AppError::Api(ApiError::Status { status: 422, .. })));
    assert_eq!(api.creates.load(Ordering::SeqCst), 1);
    assert_eq!(app.goals.model().goals, goals_before);
    assert_eq!(app.goals.model().draft, draft_before);
}

#[tokio::test]
async fn test_goal_cards_show_progress() {
    let mut app = logged_in(Arc::new(StubApi::new())).await;
    app.navigate("/goals").await;

    let cards = app.goals.model().cards();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].goal.name, "Laptop");
    assert_eq!(cards[0].progress, 25.0);
    assert_eq!(cards[0].bar_width, 25.0);
}

#[tokio::test]
async fn test_loans_partition_and_add() {
    let mut app = logged_in(Arc::new(StubApi::new())).await;
    app.navigate("/loans").await;

    {
        let parts = app.loans.model().partition();
        assert_eq!(parts.borrowed.len(), 1);
        assert_eq!(parts.lent.len(), 1);
        assert_eq!(parts.total_owed(), 300.0);
        assert_eq!(parts.total_owed_to_user(), 150.0);
    }

    {
        let draft = &mut app.loans.model_mut().draft;
        draft.name = "Carol".into();
        draft.amount = 80.0;
        draft.direction = LoanDirection::Lent;
    }
    app.submit_loan().await.unwrap();

    let loans = &app.loans.model().loans;
    assert_eq!(loans[0].id, 7);
    assert_eq!(loans[0].remaining, 80.0);
    assert_eq!(app.loans.model().partition().lent.len(), 2);
    assert_eq!(app.loans.model().draft.name, "");
}

#[tokio::test]
async fn test_failed_primary_fetch_marks_screen_failed() {
    let mut app = app_with(Arc::new(StubApi::failing_reads()));
    app.login("alice", "secret").await.unwrap();

    assert_eq!(app.route(), Route::Dashboard);
    assert_eq!(app.phase(), LoadState::Failed);
    assert!(app.dashboard.model().summary.is_none());
}

#[tokio::test]
async fn test_logout_abandons_protected_screen() {
    let api = Arc::new(StubApi::new());
    let mut app = logged_in(api.clone()).await;
    app.navigate("/transactions").await;
    assert!(app.transactions.is_mounted());

    app.logout().unwrap();
    assert_eq!(app.session().get(), None);
    assert_eq!(app.route(), Route::Login);
    assert!(!app.transactions.is_mounted());

    let fetches = api.fetches.load(Ordering::SeqCst);
    assert_eq!(
        app.navigate("/transactions").await,
        Resolution::Redirect(Route::Login)
    );
    assert_eq!(api.fetches.load(Ordering::SeqCst), fetches);
    assert!(matches!(
        app.submit_transaction().await,
        Err(AppError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_session_cleared_elsewhere_is_picked_up() {
    let mut app = logged_in(Arc::new(StubApi::new())).await;
    assert!(!app.sync_session().await);

    let other = app.session().clone();
    other.clear().unwrap();

    assert!(app.sync_session().await);
    assert_eq!(app.route(), Route::Login);
    assert!(!app.dashboard.is_mounted());
    assert!(!app.sync_session().await);
}

#[tokio::test]
async fn test_session_replaced_elsewhere_reloads_screen() {
    let mut app = logged_in(Arc::new(StubApi::new())).await;
    assert_eq!(app.dashboard.model().summary.as_ref().unwrap().balance, 3800.0);

    app.session().set(Credential::new("tok-bob")).unwrap();

    assert!(app.sync_session().await);
    assert_eq!(app.route(), Route::Dashboard);
    assert!(app.dashboard.is_loaded_for(&Credential::new("tok-bob")));
    assert_eq!(app.dashboard.model().summary.as_ref().unwrap().balance, 42.0);
}

#[tokio::test]
async fn test_second_login_reloads_under_new_credential() {
    let api = Arc::new(StubApi::new());
    let mut app = logged_in(api.clone()).await;
    assert_eq!(app.dashboard.model().summary.as_ref().unwrap().balance, 3800.0);

    app.login("bob", "hunter2").await.unwrap();

    assert_eq!(app.session().get(), Some(Credential::new("tok-bob")));
    assert_eq!(app.route(), Route::Dashboard);
    assert_eq!(app.phase(), LoadState::Ready);
    assert_eq!(app.dashboard.model().summary.as_ref().unwrap().balance, 42.0);
    assert_eq!(
        api.seen_tokens.lock().unwrap().last().map(String::as_str),
        Some("tok-bob")
    );
}

#[tokio::test]
async fn test_second_login_drops_previous_users_cache() {
    let api = Arc::new(StubApi::new());
    let mut app = logged_in(api).await;
    app.navigate("/goals").await;
    assert_eq!(app.goals.model().goals.len(), 1);
    app.navigate("/dashboard").await;

    app.login("bob", "hunter2").await.unwrap();

    // Goals were loaded for alice and have not been refetched for bob.
    assert!(app.goals.model().goals.is_empty());
    assert!(!app.goals.is_mounted());
}

#[tokio::test]
async fn test_summary_applied_while_chart_pending() {
    let mut app = app_with(Arc::new(StubApi::stalled_chart()));

    let finished = tokio::time::timeout(
        Duration::from_millis(200),
        app.login("alice", "secret"),
    )
    .await
    .is_ok();
    assert!(!finished);

    assert_eq!(app.route(), Route::Dashboard);
    assert_eq!(app.phase(), LoadState::Ready);
    assert_eq!(app.dashboard.model().summary.as_ref().unwrap().balance, 3800.0);
    assert!(app.dashboard.model().expense_by_category.is_none());
    assert!(app.dashboard.model().chart().is_placeholder());
}

#[tokio::test]
async fn test_navigating_to_mounted_screen_does_not_refetch() {
    let api = Arc::new(StubApi::new());
    let mut app = logged_in(api.clone()).await;
    let after_login = api.fetches.load(Ordering::SeqCst);

    app.navigate("/dashboard").await;
    assert_eq!(api.fetches.load(Ordering::SeqCst), after_login);

    app.refresh().await.unwrap();
    assert!(api.fetches.load(Ordering::SeqCst) > after_login);
}

#[tokio::test]
async fn test_register_then_login_screen() {
    let mut app = app_with(Arc::new(StubApi::new()));
    app.navigate("/register").await;

    let user = app.register("bob", "pw").await.unwrap();
    assert_eq!(user.username, "bob");
    assert_eq!(app.route(), Route::Login);

    let err = app.register("alice", "pw").await.unwrap_err();
    assert!(matches!(err, AppError::Api(ApiError::UsernameTaken)));
}

#[tokio::test]
async fn test_current_user_requires_session() {
    let mut app = app_with(Arc::new(StubApi::new()));
    assert!(matches!(
        app.current_user().await,
        Err(AppError::NotAuthenticated)
    ));
    app.login("alice", "secret").await.unwrap();
    assert_eq!(app.current_user().await.unwrap().username, "alice");
}
