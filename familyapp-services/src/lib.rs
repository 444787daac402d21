//! familyapp-services: owner-scoped operations over a `RowStore`, the
//! scheduled notification job and the search debouncer.
//!
//! Public service calls never return `Err`; they resolve to a
//! `ServiceResponse { data, error }`.

pub mod budgets;
pub mod debounce;
pub mod error;
pub mod events;
pub mod expenses;
pub mod notifications;
pub mod owner;
pub mod profiles;
pub mod scheduler;
mod support;
pub mod tasks;

use std::sync::Arc;

use familyapp_store::RowStore;

pub use budgets::BudgetService;
pub use debounce::Debouncer;
pub use error::{ServiceError, ServiceResponse};
pub use events::EventService;
pub use expenses::{ExpenseDeletePolicy, ExpenseService};
pub use notifications::NotificationService;
pub use owner::OwnerId;
pub use profiles::ProfileService;
pub use scheduler::{BatchReport, DedupScheduler, Job, RunReport, SchedulerConfig, SchedulerError};
pub use tasks::TaskService;

/// Every service wired to one store.
#[derive(Clone)]
pub struct Services {
    pub budgets: BudgetService,
    pub expenses: ExpenseService,
    pub tasks: TaskService,
    pub events: EventService,
    pub notifications: NotificationService,
    pub profiles: ProfileService,
}

impl Services {
    pub fn new(store: Arc<dyn RowStore>, delete_policy: ExpenseDeletePolicy) -> Self {
        Self {
            budgets: BudgetService::new(store.clone()),
            expenses: ExpenseService::new(store.clone()).with_delete_policy(delete_policy),
            tasks: TaskService::new(store.clone()),
            events: EventService::new(store.clone()),
            notifications: NotificationService::new(store.clone()),
            profiles: ProfileService::new(store),
        }
    }
}
