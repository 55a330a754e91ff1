mod common;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use common::{date, entry, household, month};
use chrono::Utc;
use compta_core::{
    domain::{
        Account, AccountKind, AmountPolicy, DomainError, EntryDraft, EntryId, EntrySide, MonthKey,
        RecurringTemplate, TemplateId,
    },
    engine::CoreError,
    LedgerError, LedgerManager,
};
use rust_decimal_macros::dec;

fn core_error(err: LedgerError) -> CoreError {
    match err {
        LedgerError::Core(err) => err,
        other => panic!("expected an engine error, got {other:?}"),
    }
}

#[test]
fn overdraft_warning_through_the_manager() {
    let home = household();
    home.manager
        .load_entries([
            entry(date(2024, 2, 1), home.employer, home.checking, dec!(20)),
            entry(date(2024, 3, 11), home.checking, home.groceries, dec!(80)),
            entry(date(2024, 3, 12), home.employer, home.checking, dec!(100)),
            entry(date(2024, 3, 12), home.checking, home.landlord, dec!(170)),
        ])
        .expect("load entries");

    let critical = home
        .manager
        .critical_situation_today(home.checking)
        .expect("critical situation");
    assert_eq!(critical.date, date(2024, 3, 11));
    assert_eq!(critical.value, dec!(-130));
    assert_eq!(critical.first_negative, Some(date(2024, 3, 11)));

    let april = home
        .manager
        .critical_situation(home.checking, date(2024, 4, 1))
        .expect("critical situation in april");
    assert_eq!(april.date, date(2024, 4, 1));
    assert_eq!(april.value, dec!(-130));
}

#[test]
fn one_signal_per_successful_mutation() {
    let home = household();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let subscription = home
        .manager
        .subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .expect("subscribe");

    let id = home
        .manager
        .insert_entry(entry(date(2024, 3, 1), home.employer, home.checking, dec!(900)))
        .expect("insert");
    home.manager
        .update_entry(entry(date(2024, 3, 2), home.employer, home.checking, dec!(950)).with_id(id))
        .expect("update");
    assert!(home.manager.remove_entry(EntryId(99)).is_err());
    home.manager.remove_entry(id).expect("remove");
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    assert!(home.manager.unsubscribe(subscription).expect("unsubscribe"));
    assert!(!home.manager.unsubscribe(subscription).expect("unsubscribe twice"));
    home.manager
        .insert_entry(entry(date(2024, 3, 1), home.employer, home.checking, dec!(5)))
        .expect("insert");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn listeners_can_read_the_new_state() {
    let home = household();
    let manager = Arc::new(home.manager);
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let (reader, sink, checking) = (Arc::clone(&manager), Arc::clone(&seen), home.checking);
    manager
        .subscribe(move || {
            let value = reader
                .historique(checking, month(2024, 3))
                .expect("read inside listener");
            sink.lock().expect("lock").push(value);
        })
        .expect("subscribe");

    manager
        .insert_entry(entry(date(2024, 3, 1), home.employer, home.checking, dec!(40)))
        .expect("insert");

    assert_eq!(*seen.lock().expect("lock"), vec![Some(dec!(40))]);
}

#[test]
fn failed_generation_leaves_everything_unchanged() {
    let home = household();
    home.manager
        .insert_entry(entry(date(2024, 4, 2), home.employer, home.checking, dec!(300)))
        .expect("insert");
    let (cyclic_id, looped_id) = (TemplateId::new(), TemplateId::new());
    let payoff = RecurringTemplate::new("Payoff", home.checking, home.landlord, AmountPolicy::Payoff)
        .expect("template")
        .monthly_on(3)
        .expect("schedule");
    let cyclic = RecurringTemplate::new(
        "Cyclic",
        home.checking,
        home.groceries,
        AmountPolicy::Proportional {
            depends_on: looped_id,
            rate: dec!(10),
        },
    )
    .expect("template")
    .with_id(cyclic_id);
    let looped = RecurringTemplate::new(
        "Looped",
        home.landlord,
        home.checking,
        AmountPolicy::Proportional {
            depends_on: cyclic_id,
            rate: dec!(10),
        },
    )
    .expect("template")
    .with_id(looped_id);
    home.manager
        .load_templates([payoff, cyclic, looped])
        .expect("load templates");

    let before = home
        .manager
        .historique(home.checking, month(2024, 4))
        .expect("historique");
    let err = core_error(home.manager.generate_recurring(month(2024, 4)).unwrap_err());
    assert_eq!(err, CoreError::DependencyCycle(vec![cyclic_id, looped_id]));
    assert_eq!(
        home.manager
            .get_all_since(month(2024, 1))
            .expect("entries")
            .len(),
        1
    );
    assert_eq!(
        home.manager
            .historique(home.checking, month(2024, 4))
            .expect("historique"),
        before
    );
}

#[test]
fn raw_records_are_loaded_or_rejected_as_a_batch() {
    let home = household();
    let json = format!(
        r#"[
            {{ "date": "2024-01-03", "debit": "{employer}", "credit": "{checking}", "amount": "1200.00", "label": "Salary" }},
            {{ "date": "2024-01-09", "debit": "{checking}", "credit": "{groceries}", "amount": "64.30",
               "debit_cleared": "2024-01-12", "check_number": "0042" }}
        ]"#,
        employer = home.employer,
        checking = home.checking,
        groceries = home.groceries,
    );
    let drafts: Vec<EntryDraft> = serde_json::from_str(&json).expect("parse drafts");
    assert_eq!(home.manager.load_entry_drafts(drafts).expect("load drafts"), 2);

    assert_eq!(
        home.manager
            .historique(home.checking, month(2024, 1))
            .expect("historique"),
        Some(dec!(1135.70))
    );
    assert_eq!(
        home.manager
            .solde_a_vue(home.checking, month(2024, 2))
            .expect("solde a vue"),
        Some(dec!(-64.30))
    );
    let pointages = home.manager.get_pointages_to(month(2024, 1)).expect("pointages");
    assert_eq!(pointages.len(), 1);
    assert_eq!(pointages[0].side, EntrySide::Debit);

    let incomplete: Vec<EntryDraft> = serde_json::from_str(&format!(
        r#"[{{ "date": "2024-02-01", "debit": "{}", "amount": "5" }}]"#,
        home.checking
    ))
    .expect("parse drafts");
    let err = core_error(home.manager.load_entry_drafts(incomplete).unwrap_err());
    assert_eq!(err, CoreError::Domain(DomainError::MissingField("credit")));
    assert_eq!(home.manager.get_all_since(month(2024, 1)).expect("entries").len(), 2);
}

#[test]
fn config_drives_the_average() {
    let configs = common::config_manager();
    let mut config = configs.load().expect("load config");
    config.average_window = 3;
    configs.save(&config).expect("save config");

    let manager = LedgerManager::from_config(&configs).expect("manager");
    let accounts = [
        Account::new("Checking", AccountKind::Bank),
        Account::new("Fuel", AccountKind::Budget),
    ];
    let (checking, fuel) = (accounts[0].id(), accounts[1].id());
    manager.load_accounts(accounts).expect("load accounts");
    let this_month = MonthKey::from_date(Utc::now().date_naive());
    manager
        .insert_entry(entry(this_month.first_day(), fuel, checking, dec!(90)))
        .expect("insert");

    assert_eq!(
        manager.moyenne(fuel, this_month).expect("moyenne"),
        Some(dec!(30))
    );
    assert_eq!(manager.moyenne(checking, this_month).expect("moyenne"), None);
    assert_eq!(
        manager
            .historique(fuel, this_month.previous())
            .expect("historique"),
        None
    );
}

#[test]
fn largest_explicit_id_does_not_wedge_the_manager() {
    let home = household();
    home.manager
        .load_entries([entry(date(2024, 3, 1), home.employer, home.checking, dec!(50))
            .with_id(EntryId(u64::MAX))])
        .expect("load entry with the largest id");

    let err = home
        .manager
        .insert_entry(entry(date(2024, 3, 2), home.checking, home.groceries, dec!(5)))
        .unwrap_err();
    assert_eq!(core_error(err), CoreError::IdsExhausted);

    let stored = home
        .manager
        .entry(EntryId(u64::MAX))
        .expect("manager still readable")
        .expect("entry kept");
    assert_eq!(stored.amount(), dec!(50));
    assert_eq!(
        home.manager
            .historique(home.checking, month(2024, 3))
            .expect("historique"),
        Some(dec!(50))
    );
}
