use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use fintrack_client::api::HttpApiClient;
use fintrack_client::app::App;
use fintrack_client::config::Config;
use fintrack_client::display::{format_currency, format_transaction_amount, ExpenseChart};
use fintrack_client::model::{LoanDirection, TransactionKind};
use fintrack_client::router::Route;
use fintrack_client::screens::LoadState;
use fintrack_client::session::SessionStore;

/// FinTrack client - income, expenses, loans and savings goals
#[derive(Parser, Debug)]
#[command(name = "fintrack", version, about)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL (overrides config and FINTRACK_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and keep the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// End the session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Totals, expense breakdown and loan summary
    Dashboard,
    /// List or add transactions
    Transactions {
        #[command(subcommand)]
        action: Option<TransactionAction>,
    },
    /// List or add loans
    Loans {
        #[command(subcommand)]
        action: Option<LoanAction>,
    },
    /// List or add savings goals
    Goals {
        #[command(subcommand)]
        action: Option<GoalAction>,
    },
}

#[derive(Subcommand, Debug)]
enum TransactionAction {
    Add {
        #[arg(short, long)]
        description: String,
        #[arg(short, long)]
        amount: f64,
        #[arg(short = 't', long = "type", value_enum, default_value = "expense")]
        kind: KindArg,
        /// Category id; defaults to the first category
        #[arg(short, long)]
        category: Option<i64>,
    },
}

#[derive(Subcommand, Debug)]
enum LoanAction {
    Add {
        /// Person or source
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        amount: f64,
        #[arg(long, default_value_t = 0.0)]
        paid: f64,
        #[arg(short = 't', long = "type", value_enum, default_value = "borrowed")]
        direction: DirectionArg,
        /// Date taken (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<NaiveDate>,
        #[arg(short, long, default_value = "")]
        source: String,
    },
}

#[derive(Subcommand, Debug)]
enum GoalAction {
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        target: f64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Income,
    Expense,
}

impl From<KindArg> for TransactionKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Income => TransactionKind::Income,
            KindArg::Expense => TransactionKind::Expense,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum DirectionArg {
    Borrowed,
    Lent,
}

impl From<DirectionArg> for LoanDirection {
    fn from(d: DirectionArg) -> Self {
        match d {
            DirectionArg::Borrowed => LoanDirection::Borrowed,
            DirectionArg::Lent => LoanDirection::Lent,
        }
    }
}

fn default_session_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".fintrack")
        .join("session")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .with_env_overrides();
    if let Some(url) = &args.api_url {
        config.api.base_url = url.clone();
    }

    let session_path = config
        .session
        .path
        .clone()
        .unwrap_or_else(default_session_path);
    let session = SessionStore::open(session_path)?;
    let api = Arc::new(HttpApiClient::new(&config.api)?);
    info!(base_url = %api.base_url(), "fintrack client starting");

    let mut app = App::new(config, session, api);
    run(&mut app, args.command).await
}

async fn run(app: &mut App, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Login { username, password } => {
            if let Err(e) = app.login(&username, &password).await {
                if let Some(msg) = &app.login_form.error {
                    eprintln!("{}", msg);
                }
                return Err(e.into());
            }
            println!("Logged in as {}.", username);
        }
        Command::Register { username, password } => {
            let user = app.register(&username, &password).await?;
            println!("Registered {} (id {}). You can now log in.", user.username, user.id);
        }
        Command::Logout => {
            app.logout()?;
            println!("Logged out.");
        }
        Command::Whoami => {
            let user = app.current_user().await?;
            println!("{} (id {})", user.username, user.id);
        }
        Command::Dashboard => {
            if open(app, Route::Dashboard).await {
                print_dashboard(app);
            }
        }
        Command::Transactions { action } => {
            if !open(app, Route::Transactions).await {
                return Ok(());
            }
            if let Some(TransactionAction::Add {
                description,
                amount,
                kind,
                category,
            }) = action
            {
                let draft = &mut app.transactions.model_mut().draft;
                draft.description = description;
                draft.amount = amount;
                draft.kind = kind.into();
                if category.is_some() {
                    draft.category_id = category;
                }
                app.submit_transaction().await?;
            }
            print_transactions(app);
        }
        Command::Loans { action } => {
            if !open(app, Route::Loans).await {
                return Ok(());
            }
            if let Some(LoanAction::Add {
                name,
                amount,
                paid,
                direction,
                date,
                source,
            }) = action
            {
                let draft = &mut app.loans.model_mut().draft;
                draft.name = name;
                draft.amount = amount;
                draft.paid = paid;
                draft.direction = direction.into();
                if let Some(date) = date {
                    draft.date_taken = date;
                }
                draft.source = source;
                app.submit_loan().await?;
            }
            print_loans(app);
        }
        Command::Goals { action } => {
            if !open(app, Route::Goals).await {
                return Ok(());
            }
            if let Some(GoalAction::Add { name, target }) = action {
                let draft = &mut app.goals.model_mut().draft;
                draft.name = name;
                draft.target_amount = target;
                app.submit_goal().await?;
            }
            print_goals(app);
        }
    }
    Ok(())
}

/// Navigate to `route`; false when the guard redirected or loading failed.
async fn open(app: &mut App, route: Route) -> bool {
    let resolution = app.navigate(route.path()).await;
    if resolution.target() != route {
        eprintln!("Not logged in. Run `fintrack login` first.");
        return false;
    }
    match app.phase() {
        LoadState::Ready => true,
        phase => {
            error!(?route, ?phase, "screen did not load");
            eprintln!("Could not load {}.", route.path());
            false
        }
    }
}

fn print_dashboard(app: &App) {
    let symbol = app.config().display.currency_symbol.as_str();
    let screen = app.dashboard.model();
    let Some(summary) = &screen.summary else {
        println!("Loading...");
        return;
    };

    println!("Total Income     {}", format_currency(summary.total_income, symbol));
    println!("Total Expense    {}", format_currency(summary.total_expense, symbol));
    println!("Current Balance  {}", format_currency(summary.balance, symbol));
    println!();
    println!("Expense Breakdown");
    match screen.chart() {
        ExpenseChart::Placeholder(msg) => println!("  {}", msg),
        chart @ ExpenseChart::Series(_) => {
            for (label, share) in chart.shares() {
                println!("  {:<16} {:>5.1}%", label, share);
            }
        }
    }
    println!();
    println!("Total Debt (You Owe)        {}", format_currency(summary.total_debt, symbol));
    println!(
        "Total Lent (Owed to You)    {}",
        format_currency(summary.total_lent_outstanding, symbol)
    );
}

fn print_transactions(app: &App) {
    let symbol = app.config().display.currency_symbol.as_str();
    let screen = app.transactions.model();
    println!("{:<24} {:<12} {:<12} {:>14}", "Description", "Date", "Category", "Amount");
    for t in &screen.transactions {
        println!(
            "{:<24} {:<12} {:<12} {:>14}",
            t.description,
            t.date.format("%Y-%m-%d"),
            t.category.name,
            format_transaction_amount(t, symbol)
        );
    }
}

fn print_loans(app: &App) {
    let symbol = app.config().display.currency_symbol.as_str();
    let parts = app.loans.model().partition();
    for (title, loans) in [
        ("Money You Owe", &parts.borrowed),
        ("Money Owed to You", &parts.lent),
    ] {
        println!("{}", title);
        if loans.is_empty() {
            println!("  No records yet.");
        }
        for loan in loans.iter() {
            println!(
                "  {:<20} {:>12} {:>12}  {}",
                loan.name,
                format_currency(loan.amount, symbol),
                format_currency(loan.remaining, symbol),
                loan.date_taken.format("%Y-%m-%d")
            );
        }
        println!();
    }
}

fn print_goals(app: &App) {
    let symbol = app.config().display.currency_symbol.as_str();
    let cards = app.goals.model().cards();
    if cards.is_empty() {
        println!("You haven't set any goals yet. Create one to get started!");
        return;
    }
    for card in cards {
        let filled = (card.bar_width / 5.0).round() as usize;
        println!("{}", card.goal.name);
        println!(
            "  Saved {} of {}",
            format_currency(card.goal.current_amount, symbol),
            format_currency(card.goal.target_amount, symbol)
        );
        println!(
            "  [{}{}] {:.1}%",
            "#".repeat(filled),
            "-".repeat(20 - filled),
            card.progress
        );
    }
}
