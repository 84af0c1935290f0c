use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{info, warn};

use super::{EventSink, Outcome, ScreenModel};
use crate::api::{ApiError, FinanceApi};
use crate::display::LoanPartition;
use crate::model::{Credential, Loan, LoanDraft};

#[derive(Debug)]
pub enum LoansEvent {
    Loans(Result<Vec<Loan>, ApiError>),
}

/// Unified loan list (both directions) and the add-loan draft.
#[derive(Debug, Default)]
pub struct LoansScreen {
    pub loans: Vec<Loan>,
    pub draft: LoanDraft,
}

impl LoansScreen {
    /// Split into borrowed and lent on every call; never cached.
    pub fn partition(&self) -> LoanPartition<'_> {
        LoanPartition::new(&self.loans)
    }

    /// Blank draft dated `today`.
    pub fn reset_draft(&mut self, today: NaiveDate) {
        self.draft = LoanDraft::new(today);
    }

    pub fn record_created(&mut self, loan: Loan, today: NaiveDate) {
        self.loans.insert(0, loan);
        self.reset_draft(today);
    }

    /// Send the draft. The list and draft only change on success.
    pub async fn submit(
        &mut self,
        api: &dyn FinanceApi,
        credential: &Credential,
    ) -> Result<&Loan, ApiError> {
        match api.create_loan(credential, &self.draft).await {
            Ok(created) => {
                info!(id = created.id, direction = created.direction.as_str(), "loan added");
                self.record_created(created, chrono::Local::now().date_naive());
                Ok(&self.loans[0])
            }
            Err(e) => {
                warn!(error = %e, "error adding loan");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ScreenModel for LoansScreen {
    type Event = LoansEvent;
    const NAME: &'static str = "loans";

    async fn fetch(api: &dyn FinanceApi, credential: &Credential, sink: EventSink<Self::Event>) {
        let _ = sink.send(LoansEvent::Loans(api.fetch_loans(credential).await));
    }

    fn reduce(&mut self, event: Self::Event) -> Outcome {
        match event {
            LoansEvent::Loans(Ok(loans)) => {
                self.loans = loans;
                Outcome::PrimaryLoaded
            }
            LoansEvent::Loans(Err(e)) => {
                warn!(error = %e, "error fetching loans");
                Outcome::PrimaryFailed
            }
        }
    }
}
