//! Credential blob commands

use anyhow::{Context, Result};
use clap::Parser;
use dbkit_core::{decrypt, encrypt, generate_iv, EncryptedSecret, SecretKey};

#[derive(Parser, Debug)]
pub struct EncryptArgs {
    /// Plaintext to encrypt
    pub text: String,

    /// IV length in bytes (12, 16 or 32)
    #[arg(long, default_value_t = 32, value_parser = parse_iv_len)]
    pub iv_bytes: usize,
}

fn parse_iv_len(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(len @ (12 | 16 | 32)) => Ok(len),
        _ => Err(format!("IV length must be 12, 16 or 32, got '{raw}'")),
    }
}

#[derive(Parser, Debug)]
pub struct DecryptArgs {
    /// Credential blob as JSON
    pub blob: String,
}

pub fn run_encrypt(args: EncryptArgs) -> Result<()> {
    let blob = encrypt(&args.text, &generate_iv(args.iv_bytes), &SecretKey::default())
        .context("Encryption failed")?;
    println!("{}", blob.to_json()?);
    Ok(())
}

pub fn run_decrypt(args: DecryptArgs) -> Result<()> {
    let blob = EncryptedSecret::from_json(&args.blob).context("Malformed credential blob")?;
    let text = decrypt(&blob, &SecretKey::default()).context("Decryption failed")?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_supported_iv_lengths_parse() {
        assert_eq!(parse_iv_len("12"), Ok(12));
        assert_eq!(parse_iv_len("32"), Ok(32));
        assert!(parse_iv_len("24").is_err());
        assert!(parse_iv_len("x").is_err());
    }
}
