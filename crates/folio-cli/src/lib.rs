//! # folio-cli — Operator Tooling for Folio
//!
//! Provides the `folio` command-line interface for tasks that run outside
//! the HTTP server.
//!
//! ## Subcommands
//!
//! - `folio hash-password` — Print an argon2id hash for a password.
//! - `folio create-admin` — Create an admin user directly in the database.
//! - `folio slugify` — Preview the slug a title would get.
//!
//! Passwords are never taken as arguments, so they stay out of shell
//! history:
//!
//! ```bash
//! FOLIO_PASSWORD='correct horse battery' folio hash-password
//! echo 'correct horse battery' | DATABASE_URL=postgres://... \
//!     folio create-admin --email owner@example.com --name Owner
//! ```

pub mod admin;
pub mod password;
pub mod slug;

use std::io::BufRead;

use anyhow::{bail, Context, Result};
use zeroize::Zeroizing;

/// Environment variable checked before falling back to stdin.
pub const PASSWORD_ENV: &str = "FOLIO_PASSWORD";

/// Read a password from `FOLIO_PASSWORD`, else the first line of `input`.
pub fn read_password(input: impl BufRead) -> Result<Zeroizing<String>> {
    if let Ok(value) = std::env::var(PASSWORD_ENV) {
        if !value.is_empty() {
            return Ok(Zeroizing::new(value));
        }
    }
    read_password_line(input)
}

/// First line of `input` with the line ending stripped.
pub fn read_password_line(mut input: impl BufRead) -> Result<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    input
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let trimmed = line.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        bail!("no password given: set {PASSWORD_ENV} or pipe it on stdin");
    }
    Ok(Zeroizing::new(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_ending() {
        let password = read_password_line("s3cret pass\r\n".as_bytes()).unwrap();
        assert_eq!(password.as_str(), "s3cret pass");
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(read_password_line("".as_bytes()).is_err());
        assert!(read_password_line("\n".as_bytes()).is_err());
    }
}
