//! Session commands.

use std::io::{BufRead, Write};

use secrecy::SecretString;

use shopfront_storefront::Storefront;
use shopfront_storefront::models::{Credentials, Registration};

use crate::CliError;

/// Create an account and log in, merging the guest cart.
///
/// # Errors
///
/// Returns an error if validation or registration fails. A cart error means
/// the account was created but the guest cart was only partly merged.
pub async fn register(
    storefront: &mut Storefront,
    name: String,
    email: String,
    password: Option<String>,
) -> Result<(), CliError> {
    let (password, confirm_password) = match password {
        Some(password) => (password, None),
        None => {
            let password = prompt("Password: ")?;
            let confirm = prompt("Confirm password: ")?;
            (password, Some(SecretString::from(confirm)))
        }
    };

    let user = storefront
        .register(&Registration {
            name,
            email,
            password: SecretString::from(password),
            confirm_password,
        })
        .await?;
    println!("Welcome, {}!", user.name);
    Ok(())
}

/// Log in, merging the guest cart.
///
/// # Errors
///
/// Returns an error if the credentials are rejected. A cart error means the
/// login succeeded but the guest cart was only partly merged.
pub async fn login(
    storefront: &mut Storefront,
    email: String,
    password: Option<String>,
) -> Result<(), CliError> {
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    let user = storefront
        .login(&Credentials {
            email,
            password: SecretString::from(password),
        })
        .await?;
    println!("Logged in as {} <{}>", user.name, user.email);
    if !storefront.cart().is_empty() {
        println!("Your cart has {} items.", storefront.cart().cart_count());
    }
    Ok(())
}

/// Log out.
///
/// # Errors
///
/// Returns an error if the stored token cannot be removed.
pub async fn logout(storefront: &mut Storefront) -> Result<(), CliError> {
    storefront.logout().await?;
    println!("Logged out.");
    Ok(())
}

/// Print the signed-in user.
pub fn whoami(storefront: &Storefront) {
    match storefront.session().current_user() {
        Some(user) => println!("{} <{}>", user.name, user.email),
        None => println!("Not logged in."),
    }
}

fn prompt(label: &str) -> Result<String, CliError> {
    let mut stderr = std::io::stderr();
    stderr.write_all(label.as_bytes())?;
    stderr.flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
