use std::error::Error;
use std::path::Path;
use std::process::exit;
use std::sync::{Arc, Mutex};

use clap::Parser;
use rusqlite::Connection;
use time::{OffsetDateTime, macros::date};
use tracing_subscriber::{Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use financas_rs::{
    Competence, CompetenceMonth, DocumentStore, SQLiteDocumentStore, Session, UserId,
    category::save_category,
    fixed_expense::{DayOfMonth, LoadOutcome, TemplateInput, load_fixed_expenses, save_template},
    money::format_brl,
    savings_goal::{GoalInput, save_goal},
    stores::{OwnerScope, SHARED_OWNER, collections, sqlite::initialize},
    transaction::{
        TransactionInput, TransactionType, filter_by_competence, save_transaction, signed_total,
        transactions_from_snapshot,
    },
};

/// A utility for creating a populated demo store for financas_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a store for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_filter(filter::LevelFilter::INFO),
        )
        .init();

    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating store at {output_path:#?}");
    let connection = Connection::open(output_path)?;
    initialize(&connection)?;
    let store = SQLiteDocumentStore::new(Arc::new(Mutex::new(connection)));

    println!("Creating built-in categories...");

    // Built-in categories belong to the shared sentinel owner, so every
    // user sees them.
    let shared_session = Session::new(UserId::new(SHARED_OWNER));
    for name in ["Mercado", "Transporte", "Moradia", "Lazer", "Saúde"] {
        save_category(&store, &shared_session, name, None)?;
    }

    println!("Creating demo user data...");

    let session = Session::new(UserId::new("demo"));
    let now = OffsetDateTime::now_utc();
    let target = Competence::new(CompetenceMonth::Maio, 2025);

    save_transaction(
        &store,
        &session,
        &TransactionInput {
            amount: "3500".to_string(),
            kind: TransactionType::Receita,
            detail: "Salário".to_string(),
            competence_month: Some(target.month),
            competence_year: Some(target.year),
            ..TransactionInput::default()
        },
        None,
        now,
    )?;
    save_transaction(
        &store,
        &session,
        &TransactionInput {
            amount: "320.75".to_string(),
            kind: TransactionType::Gasto,
            detail: "Compras do mês".to_string(),
            competence_month: Some(target.month),
            competence_year: Some(target.year),
            category: Some("Mercado".to_string()),
            ..TransactionInput::default()
        },
        None,
        now,
    )?;

    save_template(
        &store,
        &session,
        &TemplateInput {
            description: "Aluguel".to_string(),
            kind: TransactionType::Despesa,
            day: Some(DayOfMonth::new(5)?),
            amount: "1200".to_string(),
            category: Some("Moradia".to_string()),
            ..TemplateInput::default()
        },
        None,
    )?;
    save_template(
        &store,
        &session,
        &TemplateInput {
            description: "Internet".to_string(),
            kind: TransactionType::Despesa,
            day: Some(DayOfMonth::new(15)?),
            amount: "99.9".to_string(),
            ..TemplateInput::default()
        },
        None,
    )?;

    println!("Loading fixed expenses into {target}...");

    match load_fixed_expenses(&store, &session, target, now)? {
        LoadOutcome::Loaded(count) => println!("Loaded {count} fixed expenses."),
        LoadOutcome::NothingToLoad => println!("No fixed expenses to load."),
    }

    save_goal(
        &store,
        &session,
        &GoalInput {
            title: "Viagem".to_string(),
            target_amount: "5000".to_string(),
            saved_amount: "1250".to_string(),
            target_date: Some(date!(2026 - 01 - 15)),
        },
        None,
    )?;

    let snapshot = store.query(
        collections::TRANSACTIONS,
        &OwnerScope::User(session.user_id.clone()),
    )?;
    let entries = filter_by_competence(&transactions_from_snapshot(&snapshot), target);
    println!(
        "{target} holds {} entries with a balance of {}.",
        entries.len(),
        format_brl(signed_total(&entries))
    );

    println!("Success!");

    Ok(())
}
