//! Materialization of the reference prover program sources.
//!
//! The capability manager needs a guest program and a host script on disk
//! before it can build and run the real prover. If they are missing (fresh
//! deployment, wiped cache), a minimal reference implementation is written
//! out: the guest validates a chess move inside the zkVM and commits its
//! public outputs; the host script reads the move from environment variables,
//! drives the prover SDK, and prints the fixed-prefix marker lines the
//! [`parser`](crate::parser) consumes.
//!
//! Existing files are never overwritten, so a deployment can ship its own
//! program and still go through this path.

use std::fs;
use std::io;
use std::path::Path;

use crate::profile::ProverProfile;

/// Guest program: validates the move and commits public outputs.
const GUEST_MAIN_RS: &str = r#"#![no_main]
sp1_zkvm::entrypoint!(main);

use sp1_zkvm::io::{commit, read};

pub fn main() {
    let from_square: u8 = read();
    let to_square: u8 = read();
    let move_number: u32 = read();

    let in_bounds = from_square < 64 && to_square < 64;
    let distinct = from_square != to_square;
    let counted = move_number > 0;
    let is_valid = in_bounds && distinct && counted;

    commit(&is_valid);
    commit(&from_square);
    commit(&to_square);
    commit(&move_number);

    let checksum = from_square as u32 + to_square as u32 + move_number;
    commit(&checksum);
}
"#;

/// Guest program manifest.
const GUEST_CARGO_TOML: &str = r#"[package]
name = "gambit-chess-program"
version = "0.1.0"
edition = "2021"

[dependencies]
sp1-zkvm = "4.0"
"#;

/// Host script: reads the move from the environment, proves, verifies, and
/// prints the marker lines.
const SCRIPT_MAIN_RS: &str = r#"use sp1_sdk::{include_elf, ProverClient, SP1Stdin};
use std::env;

const ELF: &[u8] = include_elf!("gambit-chess-program");

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() {
    let from_square: u8 = env_or("FROM_SQUARE", 52);
    let to_square: u8 = env_or("TO_SQUARE", 36);
    let move_number: u32 = env_or("MOVE_NUMBER", 1);

    println!(
        "Proving chess move {} -> {} (move #{})",
        from_square, to_square, move_number
    );

    let mut stdin = SP1Stdin::new();
    stdin.write(&from_square);
    stdin.write(&to_square);
    stdin.write(&move_number);

    let client = ProverClient::from_env();
    println!("Setting up proving keys...");
    let (pk, vk) = client.setup(ELF);

    println!("Generating STARK proof...");
    let start = std::time::Instant::now();
    let proof = client
        .prove(&pk, &stdin)
        .compressed()
        .run()
        .expect("proof generation failed");
    let prove_time = start.elapsed();

    println!("Verifying proof...");
    let verify_start = std::time::Instant::now();
    client.verify(&proof, &vk).expect("proof verification failed");
    let verify_time = verify_start.elapsed();

    let is_valid = proof.public_values.read::<bool>();

    println!("PROOF_RESULT:SUCCESS");
    println!("PROOF_SIZE:{}", proof.bytes().len());
    println!("PROOF_TIME:{}", prove_time.as_millis());
    println!("PROOF_VERIFIED:{}", is_valid);
    println!("VERIFY_TIME:{}", verify_time.as_millis());
}
"#;

/// Host script manifest.
const SCRIPT_CARGO_TOML: &str = r#"[package]
name = "gambit-chess-script"
version = "0.1.0"
edition = "2021"

[dependencies]
sp1-sdk = "4.0"

[build-dependencies]
sp1-build = "4.0"
"#;

/// Host script build script, wiring the guest ELF into `include_elf!`.
const SCRIPT_BUILD_RS: &str = r#"fn main() {
    sp1_build::build_program("../program");
}
"#;

/// Ensures the prover program sources exist under the profile's program root.
///
/// Writes each missing file and leaves existing files untouched. Returns
/// `true` if anything was written.
///
/// # Errors
///
/// Propagates filesystem errors (unwritable directory, disk full).
pub fn ensure_sources(profile: &ProverProfile) -> io::Result<bool> {
    let guest_dir = profile.guest_dir();
    let script_dir = profile.script_dir();

    let mut wrote = false;
    wrote |= write_if_absent(&guest_dir.join("src/main.rs"), GUEST_MAIN_RS)?;
    wrote |= write_if_absent(&guest_dir.join("Cargo.toml"), GUEST_CARGO_TOML)?;
    wrote |= write_if_absent(&script_dir.join("src/main.rs"), SCRIPT_MAIN_RS)?;
    wrote |= write_if_absent(&script_dir.join("Cargo.toml"), SCRIPT_CARGO_TOML)?;
    wrote |= write_if_absent(&script_dir.join("build.rs"), SCRIPT_BUILD_RS)?;

    if wrote {
        tracing::info!(root = %profile.program_root.display(), "materialized prover program sources");
    }
    Ok(wrote)
}

fn write_if_absent(path: &Path, contents: &str) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProverProfile;

    #[test]
    fn writes_full_layout_into_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let profile = ProverProfile::sp1(dir.path());

        let wrote = ensure_sources(&profile).unwrap();
        assert!(wrote);
        assert!(profile.guest_dir().join("src/main.rs").is_file());
        assert!(profile.guest_dir().join("Cargo.toml").is_file());
        assert!(profile.script_dir().join("src/main.rs").is_file());
        assert!(profile.script_dir().join("Cargo.toml").is_file());
        assert!(profile.script_dir().join("build.rs").is_file());
    }

    #[test]
    fn second_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let profile = ProverProfile::sp1(dir.path());

        assert!(ensure_sources(&profile).unwrap());
        assert!(!ensure_sources(&profile).unwrap());
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let profile = ProverProfile::sp1(dir.path());
        let custom = profile.guest_dir().join("src/main.rs");
        fs::create_dir_all(custom.parent().unwrap()).unwrap();
        fs::write(&custom, "// custom guest\n").unwrap();

        ensure_sources(&profile).unwrap();
        assert_eq!(fs::read_to_string(&custom).unwrap(), "// custom guest\n");
    }

    #[test]
    fn script_emits_the_markers_the_parser_reads() {
        // The host script and the parser agree on the wire contract.
        for marker in [
            "PROOF_RESULT:",
            "PROOF_SIZE:",
            "PROOF_TIME:",
            "PROOF_VERIFIED:",
            "VERIFY_TIME:",
        ] {
            assert!(SCRIPT_MAIN_RS.contains(marker), "missing {marker}");
        }
    }

    #[test]
    fn script_reads_the_env_schema() {
        for var in ["FROM_SQUARE", "TO_SQUARE", "MOVE_NUMBER"] {
            assert!(SCRIPT_MAIN_RS.contains(var), "missing {var}");
        }
    }
}
