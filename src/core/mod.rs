pub mod ledger_manager;
