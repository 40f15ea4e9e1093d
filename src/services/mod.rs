pub mod budget_enforcement;
pub mod credential_store;
pub mod dashboard_service;
pub mod enforcement_ledger;
pub mod identity_service;
pub mod marketplace_client;
pub mod supabase;
