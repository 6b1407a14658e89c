//! # CLI - CinderKV Interactive Shell
//!
//! A REPL-style command-line interface for the CinderKV storage engine.
//! Reads commands from stdin, executes them against the store, and prints
//! results to stdout. Designed for both interactive use and scripted
//! testing (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! SET key value      Insert or update a key-value pair
//! GET key            Look up a key (prints value or "(nil)")
//! DEL key            Delete a key (writes a tombstone)
//! FLUSH              Force flush the memtable to an SSTable
//! STATS              Print store debug info
//! EXIT / QUIT        Shut down gracefully
//! ```
//!
//! ## Configuration
//!
//! All settings are controlled via environment variables:
//!
//! ```text
//! CINDER_ROOT      store root directory            (default: "data")
//! CINDER_MEM_MAX   memtable entry flush threshold  (default: 1000)
//! CINDER_WAL_SYNC  fsync every WAL append          (default: "true")
//! CINDER_MERGE_MS  background merge interval       (default: 1000)
//! CINDER_FLUSH_MS  background flush-check interval (default: 100)
//! ```
//!
//! Logging goes through `env_logger`; set `RUST_LOG=info` to watch flushes
//! and merges happen.

use anyhow::Result;
use engine::{Config, Store, StoreError};
use std::io::{self, BufRead, Write};
use std::time::Duration;

/// Reads a configuration value from the environment, falling back to
/// `default`.
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn config_from_env() -> Config {
    let defaults = Config::default();
    Config {
        max_memtable_entries: env_or("CINDER_MEM_MAX", "1000")
            .parse()
            .unwrap_or(defaults.max_memtable_entries),
        merge_interval: Duration::from_millis(
            env_or("CINDER_MERGE_MS", "1000")
                .parse()
                .unwrap_or(defaults.merge_interval.as_millis() as u64),
        ),
        flush_interval: Duration::from_millis(
            env_or("CINDER_FLUSH_MS", "100")
                .parse()
                .unwrap_or(defaults.flush_interval.as_millis() as u64),
        ),
        wal_sync: env_or("CINDER_WAL_SYNC", "true")
            .parse()
            .unwrap_or(defaults.wal_sync),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let root = env_or("CINDER_ROOT", "data");
    let config = config_from_env();
    let store = Store::open(&root, config)?;

    println!(
        "CinderKV started (root={}, tables={}, memtable={})",
        root,
        store.table_count(),
        store.memtable_len()
    );
    println!("Commands: SET key value | GET key | DEL key | FLUSH | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let mut parts = line.split_whitespace();
        if let Some(cmd) = parts.next() {
            match cmd.to_uppercase().as_str() {
                "SET" => {
                    if let Some(k) = parts.next() {
                        let v: String = parts.collect::<Vec<&str>>().join(" ");
                        if v.is_empty() {
                            println!("ERR usage: SET key value");
                        } else {
                            match store.set(k.as_bytes().to_vec(), v.into_bytes()) {
                                Ok(()) => println!("OK"),
                                Err(e) => println!("ERR set failed: {}", e),
                            }
                        }
                    } else {
                        println!("ERR usage: SET key value");
                    }
                }
                "GET" => {
                    if let Some(k) = parts.next() {
                        match store.get(k.as_bytes()) {
                            Ok(v) => println!("{}", String::from_utf8_lossy(&v)),
                            Err(StoreError::NotFound) => println!("(nil)"),
                            Err(e) => println!("ERR read failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: GET key");
                    }
                }
                "DEL" => {
                    if let Some(k) = parts.next() {
                        match store.delete(k.as_bytes().to_vec()) {
                            Ok(()) => println!("OK"),
                            Err(e) => println!("ERR del failed: {}", e),
                        }
                    } else {
                        println!("ERR usage: DEL key");
                    }
                }
                "FLUSH" => match store.flush() {
                    Ok(()) => println!("OK (tables={})", store.table_count()),
                    Err(e) => println!("ERR flush failed: {}", e),
                },
                "STATS" => {
                    println!("{:?}", store);
                }
                "EXIT" | "QUIT" => {
                    store.close();
                    println!("bye");
                    break;
                }
                other => {
                    println!("unknown command: {}", other);
                }
            }
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}
