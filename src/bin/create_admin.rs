use std::{
    error::Error,
    io::{self, Write},
    path::Path,
    process::exit,
};

use clap::Parser;
use rusqlite::Connection;

use shopbooks::{
    PasswordHash, ValidatedPassword, initialize_db,
    user::{NewUser, Username, create_user, username_or_email_taken},
};

/// A utility for creating an administrator account.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let db_path = Path::new(&args.db_path);
    validate_db_path(db_path);

    let connection = Connection::open(db_path)
        .unwrap_or_else(|_| panic!("Could not open the database at {db_path:?}"));
    initialize_db(&connection)?;

    let username = prompt_username();
    let email = prompt_email();

    match username_or_email_taken(username.as_ref(), &email, &connection) {
        Ok(false) => {}
        Ok(true) => {
            print_error("A user with that username or email already exists.");
            exit(1);
        }
        Err(error) => {
            print_error(format!("Could not check for existing users: {error}"));
            exit(1);
        }
    }

    let password_hash = match get_password_hash() {
        Some(password_hash) => password_hash,
        None => return Ok(()),
    };

    let admin = create_user(
        NewUser {
            username,
            email,
            password_hash,
            is_admin: true,
            expiration: None,
            needs_password_change: false,
        },
        &connection,
    )?;

    println!("Created administrator {} (ID {})", admin.username, admin.id);

    Ok(())
}

fn validate_db_path(db_path: &Path) {
    match db_path.extension() {
        None => {
            print_error("Database path must include a file extension (e.g., 'shopbooks.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            print_error("Database path must include a file extension (e.g., 'shopbooks.db').");
            exit(1);
        }
        _ => {}
    }
}

fn prompt_line(prompt: &str) -> String {
    print!("{prompt}");
    io::stdout().flush().expect("Could not flush stdout");

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .expect("Could not read from stdin");

    line.trim().to_owned()
}

fn prompt_username() -> Username {
    loop {
        match Username::new(&prompt_line("Username for the administrator: ")) {
            Ok(username) => return username,
            Err(error) => print_error(error),
        }
    }
}

fn prompt_email() -> String {
    loop {
        let email = prompt_line("Email for the administrator: ");

        if !email.is_empty() && email.contains('@') {
            return email;
        }

        print_error("Enter a valid email address.");
    }
}

fn get_password_hash() -> Option<PasswordHash> {
    loop {
        println!();

        let first_password = match rpassword::prompt_password("Enter a password: ") {
            Ok(string) => string,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(error) => {
                print_error(format!("Could not read password from stdin: {error}"));
                return None;
            }
        };

        if let Err(error) = ValidatedPassword::new(&first_password) {
            print_error(error);
            continue;
        }

        let second_password = match rpassword::prompt_password("Enter the same password again: ") {
            Ok(string) => string,
            Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => {
                return None;
            }
            Err(error) => {
                print_error(format!("Could not read password from stdin: {error}"));
                return None;
            }
        };

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        let password_hash =
            match PasswordHash::from_raw_password(&first_password, PasswordHash::DEFAULT_COST) {
                Ok(password_hash) => password_hash,
                Err(error) => {
                    print_error(format!("Could not hash password: {error}. Try again."));
                    continue;
                }
            };

        return Some(password_hash);
    }
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        capitalise_first_char(&error.to_string())
    )
}

/// From https://crates.io/crates/capitalize
fn capitalise_first_char(string: &str) -> String {
    let mut chars = string.chars();
    let Some(first) = chars.next() else {
        return String::with_capacity(0);
    };
    first.to_uppercase().chain(chars).collect()
}
