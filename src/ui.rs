// UI layer: provides a simple interactive menu using `dialoguer`.
// The functions are small and synchronous; every menu entry maps to one
// `User` operation and prints its outcome.

use crate::api::HttpTransport;
use crate::contact::Contact;
use crate::transfer::Transfer;
use crate::user::{User, UserOptions};
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Main interactive menu. Asks for a username, opens the account with the
/// given transport and runs a select loop until the user chooses "Exit".
///
/// Note: `Select::interact()` is keyboard-driven: you can use arrow keys
/// and Enter to choose an option.
pub fn main_menu(transport: HttpTransport) -> Result<()> {
    let username: String = Input::new().with_prompt("Username").interact_text()?;
    let mut user = User::open(&username, transport, UserOptions::default())
        .context("Failed to load account settings")?;

    loop {
        let items = vec![
            "Login",
            "Sent transfers",
            "Received transfers",
            "Account info",
            "Contacts",
            "Add contact",
            "Delete contact",
            "Logout",
            "Exit",
        ];
        let selection = Select::new().items(&items).default(0).interact()?;
        let outcome = match selection {
            0 => handle_login(&mut user),
            1 => {
                let expired = Confirm::new().with_prompt("Include expired?").interact()?;
                with_spinner("Fetching sent transfers...", || user.get_sent(expired, false))
                    .map(|transfers| print_transfers(&transfers))
            }
            2 => {
                let age: u32 = Input::new()
                    .with_prompt("Max age in days (0 = all)")
                    .default(0)
                    .interact_text()?;
                with_spinner("Fetching received transfers...", || {
                    user.get_received_files(Some(age), false)
                })
                .map(|transfers| print_transfers(&transfers))
            }
            3 => with_spinner("Fetching account info...", || user.get_user_info(true)).map(
                |info| {
                    for (key, value) in info {
                        println!("{key:>20}: {value}");
                    }
                },
            ),
            4 => with_spinner("Fetching contacts...", || user.get_contacts())
                .map(|contacts| contacts.iter().for_each(print_contact)),
            5 => {
                let name: String = Input::new().with_prompt("Name").interact_text()?;
                let email: String = Input::new().with_prompt("Email").interact_text()?;
                with_spinner("Adding contact...", || user.add_contact(&name, &email))
                    .map(|contact| print_contact(&contact))
            }
            6 => {
                let email: String = Input::new().with_prompt("Email").interact_text()?;
                with_spinner("Deleting contact...", || {
                    let contact = user.get_contact(&email)?;
                    user.delete_contact(&contact)
                })
                .map(|_| println!("{}", "Contact deleted".green()))
            }
            7 => with_spinner("Logging out...", || user.logout())
                .map(|_| println!("{}", "Logged out".green())),
            8 => break,
            _ => Ok(()),
        };
        if let Err(e) = outcome {
            println!("{} {:#}", "Error:".red(), e);
        }
    }
    Ok(())
}

/// Prompt for the password and log in.
fn handle_login(user: &mut User) -> Result<()> {
    // `Password` hides input in terminal for passwords.
    let password: String = Password::new().with_prompt("Password").interact()?;
    with_spinner("Logging in...", || user.login(&password))?;
    println!("{} {}!", "Welcome".green(), user.username());
    Ok(())
}

/// Show a spinner while `f` runs the blocking network call.
fn with_spinner<T>(msg: &'static str, f: impl FnOnce() -> crate::Result<T>) -> Result<T> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = f();
    spinner.finish_and_clear();
    Ok(result?)
}

fn print_transfers(transfers: &[Transfer]) {
    if transfers.is_empty() {
        println!("No transfers.");
        return;
    }
    for transfer in transfers {
        let from = match transfer.owner().name() {
            Some(name) if transfer.owner().is_local() => format!("{name} (you)"),
            Some(name) => name,
            None => "?".to_string(),
        };
        println!(
            "{}  from {}  {}  {} file(s)",
            transfer.id().unwrap_or("-").bold(),
            from,
            transfer.status().unwrap_or("-"),
            transfer.files().len()
        );
    }
}

fn print_contact(contact: &Contact) {
    println!("{}  {} <{}>", contact.contactid, contact.name, contact.email);
}
