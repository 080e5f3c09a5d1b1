//! Savings goals and their caller-driven state machine.

mod core;

pub use self::core::{
    Goal, GoalStatus, add_contribution, create_goal, create_goal_table, delete_goal, get_goal,
    list_goals, sweep_overdue_goals, update_goal,
};
