//! Achievement evaluation: pure predicates over a snapshot of user data.

use std::collections::{HashMap, HashSet};

use rusqlite::Connection;
use time::{Date, Duration, Weekday};

use crate::{
    Error,
    achievement::{
        AchievementDefinition, Condition, list_unlocked_achievements, record_unlock,
    },
    budget::{Budget, list_budgets, month_key, spent_in_month},
    category::{Category, list_categories},
    database_id::{AchievementId, UserId},
    goal::{Goal, list_goals},
    transaction::{Transaction, list_transactions},
};

/// An immutable snapshot of everything the achievement predicates may look
/// at.
///
/// The evaluator is a pure function of this snapshot plus the injected
/// catalog; it holds no state of its own and never reads the wall clock.
#[derive(Debug)]
pub struct EvaluationSnapshot<'a> {
    /// All of the user's transactions.
    pub transactions: &'a [Transaction],
    /// All of the user's categories.
    pub categories: &'a [Category],
    /// All of the user's budgets, across all months.
    pub budgets: &'a [Budget],
    /// All of the user's goals.
    pub goals: &'a [Goal],
    /// The caller's idea of the current date.
    pub today: Date,
}

impl Condition {
    /// Whether this condition is satisfied by the given snapshot.
    ///
    /// Event-driven conditions (achievements earned by a UI interaction the
    /// data cannot observe) always return false here; they unlock through
    /// [unlock_for_condition] instead.
    pub fn holds(&self, snapshot: &EvaluationSnapshot) -> bool {
        let last_month = months_before(snapshot.today, 1);

        match self {
            Condition::FirstCategorization => snapshot
                .transactions
                .iter()
                .any(|transaction| transaction.category_id.is_some()),
            Condition::FirstCategoryCreated => !snapshot.categories.is_empty(),
            Condition::FirstBudgetCreated => !snapshot.budgets.is_empty(),
            Condition::Categorized100Transactions => {
                snapshot
                    .transactions
                    .iter()
                    .filter(|transaction| transaction.category_id.is_some())
                    .count()
                    > 100
            }
            Condition::CategorizedFullStatement => {
                !snapshot.transactions.is_empty()
                    && snapshot
                        .transactions
                        .iter()
                        .all(|transaction| transaction.category_id.is_some())
            }
            Condition::SpentUnderBudget => all_budgets_within(snapshot, &last_month, 1.0),
            Condition::Spent20PercentUnderBudget => all_budgets_within(snapshot, &last_month, 0.8),
            Condition::ReducedCategorySpendingBy15Percent => {
                let prior_month = months_before(snapshot.today, 2);

                snapshot.categories.iter().any(|category| {
                    let prior = spent_in_month(snapshot.transactions, category.id, &prior_month);
                    let last = spent_in_month(snapshot.transactions, category.id, &last_month);
                    prior > 0.0 && last <= 0.85 * prior
                })
            }
            Condition::ViewedTopSpendingCategory => false,
            Condition::NoSpendingInSuperfluousCategory => false,
            Condition::SavedMoreThan500 => {
                any_month_flow(snapshot, |flow| flow.net() > 500.0)
            }
            Condition::Saved100InMonth => any_month_flow(snapshot, |flow| flow.net() >= 100.0),
            Condition::Saved500InMonth => any_month_flow(snapshot, |flow| flow.net() >= 500.0),
            Condition::Saved1000InMonth => any_month_flow(snapshot, |flow| flow.net() >= 1000.0),
            Condition::Saved20PercentOfIncome => any_month_flow(snapshot, |flow| {
                flow.income > 0.0 && flow.net() >= 0.2 * flow.income
            }),
            Condition::NoSpendingFor24Hours => {
                let yesterday = snapshot.today - Duration::days(1);

                !snapshot.transactions.is_empty()
                    && snapshot
                        .transactions
                        .iter()
                        .filter(|transaction| transaction.amount < 0.0)
                        .all(|transaction| transaction.date < yesterday)
            }
            Condition::ConsistentSaver => budget_streak(snapshot, 3),
            Condition::OneYearAnniversary => snapshot
                .transactions
                .iter()
                .map(|transaction| transaction.date)
                .min()
                .is_some_and(|earliest| earliest <= snapshot.today - Duration::days(365)),
            Condition::LegendarySaver => budget_streak(snapshot, 12),
            Condition::CategorizedIncomeOnFriday => snapshot.transactions.iter().any(|transaction| {
                transaction.amount > 0.0
                    && transaction.category_id.is_some()
                    && transaction.date.weekday() == Weekday::Friday
            }),
        }
    }
}

/// Income and expense totals of one calendar month.
struct MonthFlow {
    income: f64,
    expenses: f64,
}

impl MonthFlow {
    /// Net savings: what came in minus what went out.
    fn net(&self) -> f64 {
        self.income - self.expenses
    }
}

fn any_month_flow(snapshot: &EvaluationSnapshot, predicate: impl Fn(&MonthFlow) -> bool) -> bool {
    let mut flows: HashMap<String, MonthFlow> = HashMap::new();

    for transaction in snapshot.transactions {
        let flow = flows
            .entry(month_key(transaction.date))
            .or_insert(MonthFlow {
                income: 0.0,
                expenses: 0.0,
            });

        if transaction.amount > 0.0 {
            flow.income += transaction.amount;
        } else {
            flow.expenses += transaction.amount.abs();
        }
    }

    flows.values().any(predicate)
}

/// True when `month` has at least one budget and every budget of that month
/// stayed at or below `factor` of its limit.
fn all_budgets_within(snapshot: &EvaluationSnapshot, month: &str, factor: f64) -> bool {
    let mut budgets = snapshot
        .budgets
        .iter()
        .filter(|budget| budget.month == month)
        .peekable();

    if budgets.peek().is_none() {
        return false;
    }

    budgets.all(|budget| {
        let spent = spent_in_month(snapshot.transactions, budget.category_id, month);
        spent <= factor * budget.limit
    })
}

/// True when each of the `length` months ending last month had at least one
/// budget and stayed within every limit. A month with no budget breaks the
/// streak.
fn budget_streak(snapshot: &EvaluationSnapshot, length: u32) -> bool {
    (1..=length).all(|months_back| {
        let month = months_before(snapshot.today, months_back);
        all_budgets_within(snapshot, &month, 1.0)
    })
}

/// The `YYYY-MM` key of the month `months_back` months before `today`'s.
fn months_before(today: Date, months_back: u32) -> String {
    let mut year = today.year();
    let mut month = i32::from(u8::from(today.month()));

    month -= months_back as i32;
    while month < 1 {
        month += 12;
        year -= 1;
    }

    format!("{year:04}-{month:02}")
}

/// Evaluate the whole catalog for a user and unlock every newly satisfied
/// achievement.
///
/// Already-unlocked achievements are skipped before their predicates run, so
/// evaluating twice with unchanged data returns an empty list the second
/// time and never duplicates an unlock record. Unmet conditions are no-ops.
///
/// Returns the IDs of the achievements unlocked by this call, in catalog
/// order.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is some SQL error.
pub fn evaluate_achievements(
    user_id: UserId,
    catalog: &[AchievementDefinition],
    today: Date,
    connection: &Connection,
) -> Result<Vec<AchievementId>, Error> {
    let transactions = list_transactions(user_id, connection)?;
    let categories = list_categories(user_id, connection)?;
    let budgets = list_budgets(user_id, connection)?;
    let goals = list_goals(user_id, connection)?;
    let unlocked: HashSet<String> = list_unlocked_achievements(user_id, connection)?
        .into_iter()
        .map(|unlock| unlock.achievement_id)
        .collect();

    let snapshot = EvaluationSnapshot {
        transactions: &transactions,
        categories: &categories,
        budgets: &budgets,
        goals: &goals,
        today,
    };

    let mut newly_unlocked = Vec::new();

    for definition in catalog {
        if unlocked.contains(definition.id) {
            continue;
        }

        if definition.condition.holds(&snapshot) {
            record_unlock(user_id, definition.id, today, connection)?;
            tracing::debug!("Unlocked achievement {} for user {user_id}", definition.id);
            newly_unlocked.push(definition.id);
        }
    }

    Ok(newly_unlocked)
}

/// Unlock the achievement behind an event-driven condition.
///
/// This is the entry point for conditions the data model cannot observe
/// (e.g. the user inspected their top spending category). Returns the
/// achievement ID on a fresh unlock, or `None` when it was already unlocked
/// (a no-op, never an error).
///
/// # Errors
/// This function will return a:
/// - [Error::UnknownCondition] if no achievement in `catalog` has this condition,
/// - or [Error::SqlError] if there is some SQL error.
pub fn unlock_for_condition(
    user_id: UserId,
    condition: Condition,
    catalog: &[AchievementDefinition],
    today: Date,
    connection: &Connection,
) -> Result<Option<AchievementId>, Error> {
    let definition = catalog
        .iter()
        .find(|definition| definition.condition == condition)
        .ok_or_else(|| Error::UnknownCondition(condition.as_tag().to_owned()))?;

    let already_unlocked = list_unlocked_achievements(user_id, connection)?
        .iter()
        .any(|unlock| unlock.achievement_id == definition.id);

    if already_unlocked {
        return Ok(None);
    }

    record_unlock(user_id, definition.id, today, connection)?;

    Ok(Some(definition.id))
}

#[cfg(test)]
mod predicate_tests {
    use time::{Date, macros::date};

    use crate::{
        achievement::{Condition, EvaluationSnapshot},
        budget::Budget,
        category::{Category, CategoryName},
        database_id::UserId,
        transaction::Transaction,
    };

    const TODAY: Date = date!(2024 - 08 - 15);

    fn transaction(amount: f64, date: Date, category_id: Option<i64>) -> Transaction {
        Transaction {
            id: 0,
            user_id: UserId::new(1),
            amount,
            date,
            description: "fixture".to_owned(),
            fingerprint: 0,
            category_id,
        }
    }

    fn category(id: i64) -> Category {
        Category {
            id,
            user_id: UserId::new(1),
            name: CategoryName::new_unchecked("Mercado"),
            icon: "shopping-cart".to_owned(),
            color: "#ff7a00".to_owned(),
        }
    }

    fn budget(category_id: i64, limit: f64, month: &str) -> Budget {
        Budget {
            id: 0,
            user_id: UserId::new(1),
            category_id,
            limit,
            month: month.to_owned(),
        }
    }

    fn snapshot<'a>(
        transactions: &'a [Transaction],
        categories: &'a [Category],
        budgets: &'a [Budget],
    ) -> EvaluationSnapshot<'a> {
        EvaluationSnapshot {
            transactions,
            categories,
            budgets,
            goals: &[],
            today: TODAY,
        }
    }

    #[test]
    fn first_budget_created_holds_once_a_budget_exists() {
        let budgets = vec![budget(1, 300.0, "2024-08")];

        assert!(!Condition::FirstBudgetCreated.holds(&snapshot(&[], &[], &[])));
        assert!(Condition::FirstBudgetCreated.holds(&snapshot(&[], &[], &budgets)));
    }

    #[test]
    fn first_categorization_needs_a_categorized_transaction() {
        let uncategorized = vec![transaction(-10.0, date!(2024 - 08 - 01), None)];
        let categorized = vec![transaction(-10.0, date!(2024 - 08 - 01), Some(1))];

        assert!(!Condition::FirstCategorization.holds(&snapshot(&uncategorized, &[], &[])));
        assert!(Condition::FirstCategorization.holds(&snapshot(&categorized, &[], &[])));
    }

    #[test]
    fn full_statement_requires_every_transaction_categorized() {
        let mixed = vec![
            transaction(-10.0, date!(2024 - 08 - 01), Some(1)),
            transaction(-20.0, date!(2024 - 08 - 02), None),
        ];
        let complete = vec![
            transaction(-10.0, date!(2024 - 08 - 01), Some(1)),
            transaction(-20.0, date!(2024 - 08 - 02), Some(1)),
        ];

        assert!(!Condition::CategorizedFullStatement.holds(&snapshot(&[], &[], &[])));
        assert!(!Condition::CategorizedFullStatement.holds(&snapshot(&mixed, &[], &[])));
        assert!(Condition::CategorizedFullStatement.holds(&snapshot(&complete, &[], &[])));
    }

    #[test]
    fn spent_under_budget_looks_at_last_month() {
        // Budget for July (last month relative to TODAY); spend within limit.
        let budgets = vec![budget(1, 300.0, "2024-07")];
        let within = vec![transaction(-250.0, date!(2024 - 07 - 10), Some(1))];
        let over = vec![transaction(-350.0, date!(2024 - 07 - 10), Some(1))];

        assert!(Condition::SpentUnderBudget.holds(&snapshot(&within, &[], &budgets)));
        assert!(!Condition::SpentUnderBudget.holds(&snapshot(&over, &[], &budgets)));
    }

    #[test]
    fn spent_under_budget_requires_a_budget_for_last_month() {
        let current_month_only = vec![budget(1, 300.0, "2024-08")];

        assert!(!Condition::SpentUnderBudget.holds(&snapshot(&[], &[], &current_month_only)));
    }

    #[test]
    fn spending_exactly_the_limit_still_counts_as_under_budget() {
        let budgets = vec![budget(1, 300.0, "2024-07")];
        let exact = vec![transaction(-300.0, date!(2024 - 07 - 10), Some(1))];

        assert!(Condition::SpentUnderBudget.holds(&snapshot(&exact, &[], &budgets)));
    }

    #[test]
    fn twenty_percent_under_budget_needs_the_bigger_margin() {
        let budgets = vec![budget(1, 300.0, "2024-07")];
        let frugal = vec![transaction(-240.0, date!(2024 - 07 - 10), Some(1))];
        let merely_within = vec![transaction(-280.0, date!(2024 - 07 - 10), Some(1))];

        assert!(Condition::Spent20PercentUnderBudget.holds(&snapshot(&frugal, &[], &budgets)));
        assert!(
            !Condition::Spent20PercentUnderBudget.holds(&snapshot(&merely_within, &[], &budgets))
        );
    }

    #[test]
    fn reduced_spending_compares_last_month_to_the_one_before() {
        let categories = vec![category(1)];
        // June: 200 spent; July: 160 spent = 20% reduction.
        let reduced = vec![
            transaction(-200.0, date!(2024 - 06 - 10), Some(1)),
            transaction(-160.0, date!(2024 - 07 - 10), Some(1)),
        ];
        // June: 200 spent; July: 190 spent = only 5% reduction.
        let not_enough = vec![
            transaction(-200.0, date!(2024 - 06 - 10), Some(1)),
            transaction(-190.0, date!(2024 - 07 - 10), Some(1)),
        ];

        assert!(
            Condition::ReducedCategorySpendingBy15Percent
                .holds(&snapshot(&reduced, &categories, &[]))
        );
        assert!(
            !Condition::ReducedCategorySpendingBy15Percent
                .holds(&snapshot(&not_enough, &categories, &[]))
        );
    }

    #[test]
    fn reduced_spending_needs_prior_month_spend() {
        let categories = vec![category(1)];
        let july_only = vec![transaction(-160.0, date!(2024 - 07 - 10), Some(1))];

        assert!(
            !Condition::ReducedCategorySpendingBy15Percent
                .holds(&snapshot(&july_only, &categories, &[]))
        );
    }

    #[test]
    fn net_savings_tiers() {
        // July: 2000 in, 1400 out, net 600.
        let transactions = vec![
            transaction(2000.0, date!(2024 - 07 - 01), None),
            transaction(-1400.0, date!(2024 - 07 - 15), None),
        ];
        let view = snapshot(&transactions, &[], &[]);

        assert!(Condition::Saved100InMonth.holds(&view));
        assert!(Condition::Saved500InMonth.holds(&view));
        assert!(Condition::SavedMoreThan500.holds(&view));
        assert!(!Condition::Saved1000InMonth.holds(&view));
    }

    #[test]
    fn saving_exactly_500_meets_the_tier_but_not_the_strict_threshold() {
        let transactions = vec![
            transaction(2000.0, date!(2024 - 07 - 01), None),
            transaction(-1500.0, date!(2024 - 07 - 15), None),
        ];
        let view = snapshot(&transactions, &[], &[]);

        assert!(Condition::Saved500InMonth.holds(&view));
        assert!(!Condition::SavedMoreThan500.holds(&view));
    }

    #[test]
    fn saved_twenty_percent_of_income() {
        let comfortable = vec![
            transaction(1000.0, date!(2024 - 07 - 01), None),
            transaction(-800.0, date!(2024 - 07 - 15), None),
        ];
        let tight = vec![
            transaction(1000.0, date!(2024 - 07 - 01), None),
            transaction(-900.0, date!(2024 - 07 - 15), None),
        ];

        assert!(Condition::Saved20PercentOfIncome.holds(&snapshot(&comfortable, &[], &[])));
        assert!(!Condition::Saved20PercentOfIncome.holds(&snapshot(&tight, &[], &[])));
    }

    #[test]
    fn no_spending_for_24_hours() {
        // Last expense three days ago.
        let quiet = vec![transaction(-10.0, date!(2024 - 08 - 12), None)];
        // Expense yesterday.
        let recent = vec![transaction(-10.0, date!(2024 - 08 - 14), None)];

        assert!(Condition::NoSpendingFor24Hours.holds(&snapshot(&quiet, &[], &[])));
        assert!(!Condition::NoSpendingFor24Hours.holds(&snapshot(&recent, &[], &[])));
        // A user with no data at all has not earned anything.
        assert!(!Condition::NoSpendingFor24Hours.holds(&snapshot(&[], &[], &[])));
    }

    #[test]
    fn consistent_saver_needs_three_budgeted_months_within_limit() {
        let budgets = vec![
            budget(1, 300.0, "2024-05"),
            budget(1, 300.0, "2024-06"),
            budget(1, 300.0, "2024-07"),
        ];
        let within = vec![
            transaction(-100.0, date!(2024 - 05 - 10), Some(1)),
            transaction(-100.0, date!(2024 - 06 - 10), Some(1)),
            transaction(-100.0, date!(2024 - 07 - 10), Some(1)),
        ];

        assert!(Condition::ConsistentSaver.holds(&snapshot(&within, &[], &budgets)));
    }

    #[test]
    fn a_month_without_a_budget_breaks_the_streak() {
        let budgets = vec![budget(1, 300.0, "2024-06"), budget(1, 300.0, "2024-07")];

        assert!(!Condition::ConsistentSaver.holds(&snapshot(&[], &[], &budgets)));
    }

    #[test]
    fn one_exceeded_month_breaks_the_streak() {
        let budgets = vec![
            budget(1, 300.0, "2024-05"),
            budget(1, 300.0, "2024-06"),
            budget(1, 300.0, "2024-07"),
        ];
        let overspent_june = vec![transaction(-400.0, date!(2024 - 06 - 10), Some(1))];

        assert!(!Condition::ConsistentSaver.holds(&snapshot(&overspent_june, &[], &budgets)));
    }

    #[test]
    fn one_year_anniversary_counts_from_the_earliest_transaction() {
        let veteran = vec![transaction(-10.0, date!(2023 - 08 - 01), None)];
        let newcomer = vec![transaction(-10.0, date!(2024 - 02 - 01), None)];

        assert!(Condition::OneYearAnniversary.holds(&snapshot(&veteran, &[], &[])));
        assert!(!Condition::OneYearAnniversary.holds(&snapshot(&newcomer, &[], &[])));
    }

    #[test]
    fn categorized_income_on_a_friday() {
        // 2024-07-05 was a Friday.
        let friday_income = vec![transaction(2000.0, date!(2024 - 07 - 05), Some(1))];
        let friday_expense = vec![transaction(-2000.0, date!(2024 - 07 - 05), Some(1))];
        let monday_income = vec![transaction(2000.0, date!(2024 - 07 - 01), Some(1))];

        assert!(Condition::CategorizedIncomeOnFriday.holds(&snapshot(&friday_income, &[], &[])));
        assert!(!Condition::CategorizedIncomeOnFriday.holds(&snapshot(&friday_expense, &[], &[])));
        assert!(!Condition::CategorizedIncomeOnFriday.holds(&snapshot(&monday_income, &[], &[])));
    }

    #[test]
    fn event_driven_conditions_never_hold_from_data() {
        let transactions = vec![transaction(-10.0, date!(2024 - 07 - 01), Some(1))];
        let view = snapshot(&transactions, &[], &[]);

        assert!(!Condition::ViewedTopSpendingCategory.holds(&view));
        assert!(!Condition::NoSpendingInSuperfluousCategory.holds(&view));
    }

    #[test]
    fn months_before_crosses_year_boundaries() {
        use super::months_before;

        assert_eq!(months_before(date!(2024 - 08 - 15), 1), "2024-07");
        assert_eq!(months_before(date!(2024 - 01 - 15), 1), "2023-12");
        assert_eq!(months_before(date!(2024 - 02 - 15), 14), "2022-12");
    }
}
