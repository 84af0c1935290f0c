use async_trait::async_trait;
use tracing::{info, warn};

use super::{EventSink, Outcome, ScreenModel};
use crate::api::{ApiError, FinanceApi};
use crate::model::{Category, Credential, Transaction, TransactionDraft};

#[derive(Debug)]
pub enum TransactionsEvent {
    Transactions(Result<Vec<Transaction>, ApiError>),
    Categories(Result<Vec<Category>, ApiError>),
}

/// Transaction list, category choices and the add-transaction draft.
#[derive(Debug, Default)]
pub struct TransactionsScreen {
    /// Server order, newest first as delivered.
    pub transactions: Vec<Transaction>,
    pub categories: Vec<Category>,
    pub draft: TransactionDraft,
}

impl TransactionsScreen {
    fn default_category(&self) -> Option<i64> {
        self.categories.first().map(|c| c.id)
    }

    /// Name of a category by id, for rendering the draft's selection.
    pub fn category_name(&self, id: i64) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    /// Back to a blank draft on the first category.
    pub fn reset_draft(&mut self) {
        self.draft = TransactionDraft::with_category(self.default_category());
    }

    /// Put the server echo at the head of the list and reset the draft.
    pub fn record_created(&mut self, transaction: Transaction) {
        self.transactions.insert(0, transaction);
        self.reset_draft();
    }

    /// Send the draft. The list and draft only change on success.
    pub async fn submit(
        &mut self,
        api: &dyn FinanceApi,
        credential: &Credential,
    ) -> Result<&Transaction, ApiError> {
        match api.create_transaction(credential, &self.draft).await {
            Ok(created) => {
                info!(id = created.id, kind = created.kind.as_str(), "transaction added");
                self.record_created(created);
                Ok(&self.transactions[0])
            }
            Err(e) => {
                warn!(error = %e, "error adding transaction");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ScreenModel for TransactionsScreen {
    type Event = TransactionsEvent;
    const NAME: &'static str = "transactions";

    async fn fetch(api: &dyn FinanceApi, credential: &Credential, sink: EventSink<Self::Event>) {
        let transactions = async {
            let list = api.fetch_transactions(credential).await;
            let _ = sink.send(TransactionsEvent::Transactions(list));
        };
        let categories = async {
            let list = api.fetch_categories(credential).await;
            let _ = sink.send(TransactionsEvent::Categories(list));
        };
        tokio::join!(transactions, categories);
    }

    fn reduce(&mut self, event: Self::Event) -> Outcome {
        match event {
            TransactionsEvent::Transactions(Ok(list)) => {
                self.transactions = list;
                Outcome::PrimaryLoaded
            }
            TransactionsEvent::Transactions(Err(e)) => {
                warn!(error = %e, "error fetching transactions");
                Outcome::PrimaryFailed
            }
            TransactionsEvent::Categories(Ok(categories)) => {
                self.categories = categories;
                if let Some(first) = self.default_category() {
                    self.draft.category_id = Some(first);
                }
                Outcome::Secondary
            }
            TransactionsEvent::Categories(Err(e)) => {
                warn!(error = %e, "error fetching categories");
                Outcome::Secondary
            }
        }
    }
}
