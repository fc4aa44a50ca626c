//! SecretMint CLI: operator tooling for sm1 envelopes
//!
//! Usage:
//!   secretmint keygen
//!   secretmint seal --secret <TEXT> [--address <ADDR>]
//!   secretmint open --envelope <ENV> --address <ADDR>
//!   secretmint inspect <ENV>

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use secretmint_envelope::{decrypt_secret, encrypt_secret, inspect, Address, EncodingError, OneTimeKey};
use tracing_subscriber::EnvFilter;

/// Seal and open SecretMint envelopes
#[derive(Parser, Debug)]
#[command(name = "secretmint")]
#[command(about = "One-time address envelopes (AES-256-GCM) for SecretMint NFTs")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", env = "SECRETMINT_LOG")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh one-time address (the private key is discarded)
    Keygen,
    /// Encrypt a secret exactly as given; generates a one-time address when
    /// none is given
    Seal {
        #[arg(long)]
        secret: String,
        #[arg(long)]
        address: Option<Address>,
    },
    /// Decrypt an envelope with its one-time address
    Open {
        #[arg(long)]
        envelope: String,
        #[arg(long)]
        address: Address,
    },
    /// Show envelope metadata (no decryption)
    Inspect { envelope: String },
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    if std::env::var("SECRETMINT_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).with_writer(std::io::stderr).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    match run(args.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Keygen => {
            let address = OneTimeKey::generate().into_address();
            println!("{}", address);
        }
        Command::Seal { secret, address } => {
            let generate = address.is_none();
            let (envelope, address) = seal(&secret, address)?;
            if generate {
                eprintln!("Random key address: {}", address);
            }
            tracing::info!(address = %address, bytes = secret.len(), "sealed secret");
            println!("{}", envelope);
        }
        Command::Open { envelope, address } => {
            let secret = decrypt_secret(envelope.trim(), &address)?;
            tracing::info!(address = %address, "opened envelope");
            println!("{}", secret);
        }
        Command::Inspect { envelope } => {
            let info = inspect(envelope.trim())?;
            println!("SecretMint Envelope");
            println!("===================");
            println!("Version:         {}", info.version);
            println!("Nonce Length:    {} bytes", info.nonce_len);
            println!("Ciphertext:      {} bytes", info.ciphertext_len);
            match info.plaintext_len {
                Some(n) => println!("Plaintext Size:  {} bytes", n),
                None => println!("Plaintext Size:  (truncated)"),
            }
            println!("Well-formed:     {}", info.is_well_formed());
        }
    }
    Ok(())
}

/// Envelope for `secret` (not trimmed) and the address it is sealed under.
fn seal(secret: &str, address: Option<Address>) -> Result<(String, Address), EncodingError> {
    let address = address.unwrap_or_else(|| OneTimeKey::generate().into_address());
    Ok((encrypt_secret(secret, &address)?, address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_keeps_whitespace() {
        let address = Address::from_bytes([7; 20]);
        let (envelope, used) = seal("  padded secret \n", Some(address)).unwrap();
        assert_eq!(used, address);
        assert_eq!(decrypt_secret(&envelope, &address).unwrap(), "  padded secret \n");
    }

    #[test]
    fn seal_generates_an_address() {
        let (envelope, address) = seal("", None).unwrap();
        assert_ne!(address, Address::ZERO);
        assert_eq!(decrypt_secret(&envelope, &address).unwrap(), "");
    }
}
