use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;

use ledger_rs::{PasswordHash, ValidatedPassword, ensure_default_user, initialize_db};

/// A utility for creating a test database for the ledger server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,

    /// The username of the test user.
    #[arg(long, default_value = "admin")]
    username: String,

    /// The email of the test user.
    #[arg(long, default_value = "admin@example.com")]
    email: String,

    /// The password of the test user. It is not checked for strength.
    #[arg(long, default_value = "test")]
    password: String,
}

/// Create a database with the default categories, settings and a test user.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    if output_path
        .extension()
        .is_none_or(|extension| extension.is_empty())
    {
        eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
        exit(1);
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user {}...", args.username);

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked(&args.password),
        PasswordHash::DEFAULT_COST,
    )?;

    ensure_default_user(&args.username, &args.email, &password_hash, &conn)?;

    println!("Success!");

    Ok(())
}
