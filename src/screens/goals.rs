use async_trait::async_trait;
use tracing::{info, warn};

use super::{EventSink, Outcome, ScreenModel};
use crate::api::{ApiError, FinanceApi};
use crate::display::{goal_bar_width, goal_progress};
use crate::model::{Credential, Goal, GoalDraft};

#[derive(Debug)]
pub enum GoalsEvent {
    Goals(Result<Vec<Goal>, ApiError>),
}

/// One rendered goal card.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalCard<'a> {
    pub goal: &'a Goal,
    /// Label value, may exceed 100.
    pub progress: f64,
    /// Bar fill, within `[0, 100]`.
    pub bar_width: f64,
}

#[derive(Debug, Default)]
pub struct GoalsScreen {
    pub goals: Vec<Goal>,
    pub draft: GoalDraft,
}

impl GoalsScreen {
    pub fn cards(&self) -> Vec<GoalCard<'_>> {
        self.goals
            .iter()
            .map(|goal| GoalCard {
                goal,
                progress: goal_progress(goal),
                bar_width: goal_bar_width(goal),
            })
            .collect()
    }

    pub fn record_created(&mut self, goal: Goal) {
        self.goals.insert(0, goal);
        self.draft = GoalDraft::default();
    }

    /// Send the draft. The list and draft only change on success.
    pub async fn submit(
        &mut self,
        api: &dyn FinanceApi,
        credential: &Credential,
    ) -> Result<&Goal, ApiError> {
        match api.create_goal(credential, &self.draft).await {
            Ok(created) => {
                info!(id = created.id, name = %created.name, "goal added");
                self.record_created(created);
                Ok(&self.goals[0])
            }
            Err(e) => {
                warn!(error = %e, "error adding goal");
                Err(e)
            }
        }
    }
}

#[async_trait]
impl ScreenModel for GoalsScreen {
    type Event = GoalsEvent;
    const NAME: &'static str = "goals";

    async fn fetch(api: &dyn FinanceApi, credential: &Credential, sink: EventSink<Self::Event>) {
        let _ = sink.send(GoalsEvent::Goals(api.fetch_goals(credential).await));
    }

    fn reduce(&mut self, event: Self::Event) -> Outcome {
        match event {
            GoalsEvent::Goals(Ok(goals)) => {
                self.goals = goals;
                Outcome::PrimaryLoaded
            }
            GoalsEvent::Goals(Err(e)) => {
                warn!(error = %e, "error fetching goals");
                Outcome::PrimaryFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screens::Container;

    #[test]
    fn test_laptop_goal_card() {
        let mut c: Container<GoalsScreen> = Container::default();
        let token = c.mount();
        c.deliver(
            &token,
            GoalsEvent::Goals(Ok(vec![Goal {
                id: 1,
                name: "Laptop".into(),
                target_amount: 50000.0,
                current_amount: 12500.0,
            }])),
        );
        let cards = c.model().cards();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].progress, 25.0);
        assert_eq!(cards[0].bar_width, 25.0);
    }

    #[test]
    fn test_record_created_resets_draft() {
        let mut screen = GoalsScreen {
            goals: Vec::new(),
            draft: GoalDraft {
                name: "Bike".into(),
                target_amount: 800.0,
                current_amount: 0.0,
            },
        };
        screen.record_created(Goal {
            id: 3,
            name: "Bike".into(),
            target_amount: 800.0,
            current_amount: 0.0,
        });
        assert_eq!(screen.goals[0].id, 3);
        assert_eq!(screen.draft, GoalDraft::default());
    }
}
