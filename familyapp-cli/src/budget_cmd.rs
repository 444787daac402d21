use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use familyapp_core::{
    BudgetCategory, BudgetDraft, BudgetPeriod, CategoryFilter, DateRange, ExpenseDraft,
    ExpenseFilter, ExpenseSortKey, SortOrder, SortState,
};

use crate::{take, App};

#[derive(Subcommand, Debug)]
pub enum BudgetCommand {
    /// Create a budget
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        amount: f64,

        #[arg(long)]
        category: BudgetCategory,

        #[arg(long, default_value = "monthly")]
        period: BudgetPeriod,

        /// Starting spent total
        #[arg(long, default_value_t = 0.0)]
        spent: f64,
    },

    /// List budgets with their usage
    List,

    /// Totals across all budgets, grouped by category
    Summary,

    /// Delete a budget
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ExpenseCommand {
    /// Record an expense and add it to matching budgets
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        amount: f64,

        #[arg(long)]
        category: BudgetCategory,

        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List expenses
    List {
        /// Matches title or category
        #[arg(long, default_value = "")]
        search: String,

        /// all, week, month or year
        #[arg(long, default_value = "all")]
        range: DateRange,

        #[arg(long)]
        category: Option<BudgetCategory>,

        /// date, amount or category
        #[arg(long, default_value = "date")]
        sort: ExpenseSortKey,

        /// asc or desc (default: desc)
        #[arg(long)]
        order: Option<SortOrder>,
    },

    /// Delete an expense
    Delete { id: String },

    /// Re-apply an expense whose budget update did not complete
    Reconcile { id: String },

    /// This month against last month
    Trend,
}

pub async fn run_budget(app: &App, cmd: BudgetCommand) -> Result<()> {
    let owner = app.owner()?;
    let budgets = &app.services.budgets;

    match cmd {
        BudgetCommand::Add {
            title,
            amount,
            category,
            period,
            spent,
        } => {
            let draft = BudgetDraft {
                title,
                amount,
                spent,
                category,
                period,
            };
            let b = take(budgets.create(&owner, draft).await)?;
            app.print(&b, || println!("Created budget {} ({})", b.title, b.id))?;
        }
        BudgetCommand::List => {
            let all = take(budgets.list(&owner).await)?;
            app.print(&all, || {
                for b in &all {
                    println!(
                        "{} | {} | {} | ${:.2} of ${:.2} ({:.0}%)",
                        b.id,
                        b.title,
                        b.category,
                        b.spent,
                        b.amount,
                        familyapp_core::percentage(b.spent, b.amount)
                    );
                }
            })?;
        }
        BudgetCommand::Summary => {
            let s = take(budgets.summary(&owner).await)?;
            app.print(&s, || {
                println!(
                    "Budget ${:.2} | spent ${:.2} | remaining ${:.2}\n",
                    s.total_budget, s.total_spent, s.total_remaining
                );
                for (cat, t) in &s.category_totals {
                    println!(
                        "- {cat}: ${:.2} of ${:.2} ({:.0}%)",
                        t.spent,
                        t.amount,
                        t.percentage()
                    );
                }
            })?;
        }
        BudgetCommand::Delete { id } => {
            take(budgets.delete(&owner, &id).await)?;
            println!("Deleted budget {id}");
        }
    }
    Ok(())
}

pub async fn run_expense(app: &App, cmd: ExpenseCommand) -> Result<()> {
    let owner = app.owner()?;
    let expenses = &app.services.expenses;

    match cmd {
        ExpenseCommand::Add {
            title,
            amount,
            category,
            date,
            notes,
        } => {
            let date = match date {
                Some(d) => d,
                None => app.today(&owner).await?,
            };
            let draft = ExpenseDraft {
                title,
                amount,
                date,
                category,
                notes,
            };
            let e = take(expenses.add(&owner, draft).await)?;
            app.print(&e, || {
                println!("Recorded {} ${:.2} on {} ({})", e.title, e.amount, e.date, e.id)
            })?;
        }
        ExpenseCommand::List {
            search,
            range,
            category,
            sort,
            order,
        } => {
            let filter = ExpenseFilter {
                search,
                date_range: range,
                category: category.map_or(CategoryFilter::All, CategoryFilter::Only),
            };
            let sort = match order {
                Some(o) => SortState::with_order(sort, o),
                None => SortState::new(sort),
            };
            let today = app.today(&owner).await?;
            let rows = take(expenses.list(&owner, &filter, sort, today).await)?;
            app.print(&rows, || {
                for e in &rows {
                    println!(
                        "{} | {} | {} | {} | ${:.2}",
                        e.id, e.date, e.category, e.title, e.amount
                    );
                }
                println!("\n{} expenses", rows.len());
            })?;
        }
        ExpenseCommand::Delete { id } => {
            take(expenses.delete(&owner, &id).await)?;
            println!("Deleted expense {id}");
        }
        ExpenseCommand::Reconcile { id } => {
            let e = take(expenses.reconcile(&owner, &id).await)?;
            app.print(&e, || println!("Expense {} applied: {}", e.id, e.budget_applied))?;
        }
        ExpenseCommand::Trend => {
            let today = app.today(&owner).await?;
            let t = take(expenses.trend(&owner, today).await)?;
            app.print(&t, || {
                let change = match t.percent_change {
                    Some(p) => format!("{p:+.1}%"),
                    None => "n/a".to_string(),
                };
                println!(
                    "This month ${:.2} | last month ${:.2} | change {change}",
                    t.current_total, t.previous_total
                );
            })?;
        }
    }
    Ok(())
}
