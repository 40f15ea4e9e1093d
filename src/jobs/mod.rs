pub mod budget_monitor;
