//! Budget and expense records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// A spending target for one category.
///
/// `spent` is a running total maintained by expense writes; it is never
/// recomputed from the period boundaries (see `aggregation::recompute_spent`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Budget {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    /// Target amount
    #[serde(default, deserialize_with = "amount::deserialize")]
    pub amount: f64,
    /// Running total of matching expenses
    #[serde(default, deserialize_with = "amount::deserialize")]
    pub spent: f64,
    pub category: BudgetCategory,
    pub period: BudgetPeriod,
}

impl Budget {
    pub fn remaining(&self) -> f64 {
        self.amount - self.spent
    }
}

/// A single spend. Independent of any budget row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default, deserialize_with = "amount::deserialize")]
    pub amount: f64,
    pub date: NaiveDate,
    pub category: BudgetCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Set once the amount has been added to matching budgets.
    #[serde(default)]
    pub budget_applied: bool,
}

/// Fixed set of budget/expense categories.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum BudgetCategory {
    Groceries,
    Utilities,
    Housing,
    Transportation,
    Healthcare,
    Education,
    Childcare,
    Entertainment,
    Dining,
    Clothing,
    Savings,
    Other,
}

impl BudgetCategory {
    pub const ALL: [BudgetCategory; 12] = [
        BudgetCategory::Groceries,
        BudgetCategory::Utilities,
        BudgetCategory::Housing,
        BudgetCategory::Transportation,
        BudgetCategory::Healthcare,
        BudgetCategory::Education,
        BudgetCategory::Childcare,
        BudgetCategory::Entertainment,
        BudgetCategory::Dining,
        BudgetCategory::Clothing,
        BudgetCategory::Savings,
        BudgetCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetCategory::Groceries => "groceries",
            BudgetCategory::Utilities => "utilities",
            BudgetCategory::Housing => "housing",
            BudgetCategory::Transportation => "transportation",
            BudgetCategory::Healthcare => "healthcare",
            BudgetCategory::Education => "education",
            BudgetCategory::Childcare => "childcare",
            BudgetCategory::Entertainment => "entertainment",
            BudgetCategory::Dining => "dining",
            BudgetCategory::Clothing => "clothing",
            BudgetCategory::Savings => "savings",
            BudgetCategory::Other => "other",
        }
    }
}

impl fmt::Display for BudgetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "budget category",
                value: s.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BudgetPeriod {
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "yearly")]
    Yearly,
    #[serde(rename = "one-time")]
    OneTime,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
            BudgetPeriod::OneTime => "one-time",
        }
    }
}

impl FromStr for BudgetPeriod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(BudgetPeriod::Monthly),
            "yearly" => Ok(BudgetPeriod::Yearly),
            "one-time" | "onetime" => Ok(BudgetPeriod::OneTime),
            _ => Err(CoreError::UnknownVariant {
                kind: "budget period",
                value: s.to_string(),
            }),
        }
    }
}

/// User input for a new or edited budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetDraft {
    pub title: String,
    pub amount: f64,
    #[serde(default)]
    pub spent: f64,
    pub category: BudgetCategory,
    pub period: BudgetPeriod,
}

impl BudgetDraft {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::MissingField("title"));
        }
        validate_amount("amount", self.amount)
    }
}

/// User input for a new expense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpenseDraft {
    pub title: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: BudgetCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ExpenseDraft {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(CoreError::MissingField("title"));
        }
        validate_amount("amount", self.amount)
    }
}

fn validate_amount(field: &'static str, v: f64) -> Result<()> {
    if !v.is_finite() || v <= 0.0 {
        return Err(CoreError::InvalidField {
            field,
            reason: format!("must be a positive number, got {v}"),
        });
    }
    Ok(())
}

/// Coerce a stored amount into a usable number: NaN and infinities become 0.
pub fn normalize_amount(v: f64) -> f64 {
    if v.is_finite() { v } else { 0.0 }
}

/// Lenient decoding for numeric columns: numbers, numeric strings, `null`
/// and garbage all decode, the latter two as 0.
pub(crate) mod amount {
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;

    use super::normalize_amount;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }

    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number, a numeric string or null")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(normalize_amount(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            Ok(v.trim().parse::<f64>().map(normalize_amount).unwrap_or(0.0))
        }

        fn visit_bool<E: de::Error>(self, _: bool) -> Result<f64, E> {
            Ok(0.0)
        }

        fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
            Ok(0.0)
        }

        fn visit_none<E: de::Error>(self) -> Result<f64, E> {
            Ok(0.0)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<f64, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserialize(deserializer)
        }
    }
}
