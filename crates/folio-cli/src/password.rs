//! # Hash-Password Subcommand
//!
//! Prints the argon2id PHC string for a password, suitable for seeding a
//! `users` document by hand.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;

/// Arguments for the `folio hash-password` subcommand.
#[derive(Args, Debug)]
pub struct HashPasswordArgs {}

/// Execute the hash-password subcommand.
pub fn run_hash_password(_args: &HashPasswordArgs, out: &mut impl Write) -> Result<u8> {
    let password = crate::read_password(std::io::stdin().lock())?;
    let hash = folio_api::password::hash_password(&password).context("could not hash password")?;
    writeln!(out, "{hash}")?;
    Ok(0)
}

#[cfg(test)]
mod tests {
    use folio_api::password::{hash_password, verify_password};

    #[test]
    fn printed_hash_verifies() {
        let hash = hash_password("a long enough password").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("a long enough password", &hash).unwrap());
    }
}
