use serde::{Deserialize, Serialize};
use std::fmt;

/// Named collections in the row store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Budgets,
    Expenses,
    Tasks,
    Events,
    Notifications,
    Profiles,
}

impl Table {
    pub const ALL: [Table; 6] = [
        Table::Budgets,
        Table::Expenses,
        Table::Tasks,
        Table::Events,
        Table::Notifications,
        Table::Profiles,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Budgets => "budgets",
            Table::Expenses => "expenses",
            Table::Tasks => "tasks",
            Table::Events => "events",
            Table::Notifications => "notifications",
            Table::Profiles => "profiles",
        }
    }

    /// Column holding the owning profile id.
    pub fn owner_column(&self) -> &'static str {
        match self {
            Table::Profiles => "id",
            _ => "owner_id",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
