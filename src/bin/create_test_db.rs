use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use email_address::EmailAddress;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{OffsetDateTime, macros::datetime};

use ledgerly::{
    Amount, NewUser, PasswordHash, Transaction, TransactionKind, ValidatedPassword,
    count_transactions, create_transaction, create_user, initialize_db,
};

/// A utility for creating a test database for the REST API server of ledgerly.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// The demo user's transactions: kind, amount, description, category and date.
const SAMPLE_TRANSACTIONS: [(TransactionKind, i64, &str, &str, OffsetDateTime); 7] = [
    (
        TransactionKind::Income,
        5000,
        "Monthly Salary",
        "Salary",
        datetime!(2024-12-01 00:00 UTC),
    ),
    (
        TransactionKind::Expense,
        1200,
        "Rent Payment",
        "Bills & Utilities",
        datetime!(2024-12-01 00:00 UTC),
    ),
    (
        TransactionKind::Expense,
        300,
        "Grocery Shopping",
        "Food & Dining",
        datetime!(2024-12-02 00:00 UTC),
    ),
    (
        TransactionKind::Income,
        800,
        "Freelance Project",
        "Freelance",
        datetime!(2024-12-03 00:00 UTC),
    ),
    (
        TransactionKind::Expense,
        150,
        "Gas Station",
        "Transportation",
        datetime!(2024-12-03 00:00 UTC),
    ),
    (
        TransactionKind::Expense,
        80,
        "Movie Night",
        "Entertainment",
        datetime!(2024-12-04 00:00 UTC),
    ),
    (
        TransactionKind::Income,
        200,
        "Cash Gift",
        "Other Income",
        datetime!(2024-12-05 00:00 UTC),
    ),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
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

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("password123"),
        PasswordHash::DEFAULT_COST,
    )?;

    let user = create_user(
        NewUser {
            name: Some("Test User".to_owned()),
            email: EmailAddress::new_unchecked("test@example.com"),
            password_hash: Some(password_hash),
        },
        &conn,
    )?;

    println!("Adding sample transactions...");

    for (kind, amount, description, category, date) in SAMPLE_TRANSACTIONS {
        let amount = Amount::new(Decimal::from(amount))?;

        create_transaction(
            user.id,
            Transaction::build(kind, amount, description, category).date(Some(date)),
            &conn,
        )?;
    }

    println!(
        "Success! Log in as test@example.com with the password password123 to see {} transactions.",
        count_transactions(user.id, &conn)?
    );

    Ok(())
}
