use async_trait::async_trait;
use tracing::warn;

use super::{EventSink, Outcome, ScreenModel};
use crate::api::{ApiError, FinanceApi};
use crate::display::ExpenseChart;
use crate::model::{CategoryTotal, Credential, Summary};

#[derive(Debug)]
pub enum DashboardEvent {
    Summary(Result<Summary, ApiError>),
    ExpenseByCategory(Result<Vec<CategoryTotal>, ApiError>),
}

/// Totals and the expense breakdown. Ready once the summary arrives.
#[derive(Debug, Default)]
pub struct DashboardScreen {
    pub summary: Option<Summary>,
    /// `None` until the chart endpoint answers successfully.
    pub expense_by_category: Option<Vec<CategoryTotal>>,
}

impl DashboardScreen {
    /// Chart series for the breakdown, or the placeholder when empty/unknown.
    pub fn chart(&self) -> ExpenseChart {
        ExpenseChart::from_totals(self.expense_by_category.as_deref().unwrap_or_default())
    }
}

#[async_trait]
impl ScreenModel for DashboardScreen {
    type Event = DashboardEvent;
    const NAME: &'static str = "dashboard";

    async fn fetch(api: &dyn FinanceApi, credential: &Credential, sink: EventSink<Self::Event>) {
        let summary = async {
            let _ = sink.send(DashboardEvent::Summary(api.fetch_summary(credential).await));
        };
        let chart = async {
            let rows = api.fetch_expense_by_category(credential).await;
            let _ = sink.send(DashboardEvent::ExpenseByCategory(rows));
        };
        tokio::join!(summary, chart);
    }

    fn reduce(&mut self, event: Self::Event) -> Outcome {
        match event {
            DashboardEvent::Summary(Ok(summary)) => {
                self.summary = Some(summary);
                Outcome::PrimaryLoaded
            }
            DashboardEvent::Summary(Err(e)) => {
                warn!(error = %e, "error fetching summary");
                Outcome::PrimaryFailed
            }
            DashboardEvent::ExpenseByCategory(Ok(rows)) => {
                self.expense_by_category = Some(rows);
                Outcome::Secondary
            }
            DashboardEvent::ExpenseByCategory(Err(e)) => {
                warn!(error = %e, "error fetching chart data");
                Outcome::Secondary
            }
        }
    }
}
