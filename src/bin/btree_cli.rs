//! Interactive shell for exploring the in-memory B-tree.
//!
//! Usage:
//!   btree_cli [min_items]
//!
//! `min_items` falls back to the `BTREE_MIN_ITEMS` environment variable and
//! then to the library default. Commands are read from stdin, one per line:
//!   put <key> <value>
//!   get <key>
//!   delete <key>
//!   scan
//!   stats
//!   dump
//!   debug <key>
//!   bulk_insert <count>
//!   quit
//!
//! Set `RUST_LOG=btree_kv=trace` to watch splits, rotations and merges.

use btree_kv::{Config, Db, TreeError, DEFAULT_MIN_ITEMS};
use std::env;
use std::io::{self, BufRead, Write};
use std::process::exit;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let min_items = match parse_min_items() {
        Ok(n) => n,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            exit(1);
        }
    };

    let db = Db::open(Config::new().min_items(min_items));
    tracing::info!(min_items, "opened in-memory tree");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("ERROR: Failed to read input: {}", e);
                exit(1);
            }
        };

        let args: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = args.split_first() else {
            continue;
        };
        if command == "quit" || command == "exit" {
            break;
        }

        run_command(&db, command, args);
        let _ = stdout.flush();
    }
}

fn parse_min_items() -> Result<usize, String> {
    let raw = match env::args().nth(1) {
        Some(arg) => arg,
        None => match env::var("BTREE_MIN_ITEMS") {
            Ok(value) => value,
            Err(_) => return Ok(DEFAULT_MIN_ITEMS),
        },
    };
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("Invalid min_items: {}", raw)),
    }
}

fn run_command(db: &Db, command: &str, args: &[&str]) {
    match command {
        "put" => {
            if args.len() < 2 {
                eprintln!("Usage: put <key> <value>");
                return;
            }
            let value = args[1..].join(" ");
            match db.put(args[0], value.as_bytes()) {
                Some(_) => println!("UPDATED"),
                None => println!("OK"),
            }
        }

        "get" => {
            let Some(key) = args.first() else {
                eprintln!("Usage: get <key>");
                return;
            };
            match db.get(key) {
                Some(value) => match String::from_utf8(value) {
                    Ok(s) => println!("{}", s),
                    Err(_) => println!("<binary data>"),
                },
                None => println!("NOT_FOUND"),
            }
        }

        "delete" => {
            let Some(key) = args.first() else {
                eprintln!("Usage: delete <key>");
                return;
            };
            match db.delete(key) {
                Ok(_) => println!("DELETED"),
                Err(TreeError::KeyNotFound(_)) => println!("NOT_FOUND"),
                Err(e) => eprintln!("ERROR: {}", e),
            }
        }

        "scan" => {
            let results = db.iter();
            println!("COUNT: {}", results.len());
            for (key, value) in results {
                println!("{} -> {}", key, String::from_utf8_lossy(&value));
            }
        }

        "stats" => {
            let stats = db.stats();
            println!("len: {}", stats.len);
            println!("height: {}", stats.height);
            println!("node_count: {}", stats.node_count);
            println!("leaf_count: {}", stats.leaf_count);
            println!("min_items: {}", stats.min_items);
            println!("max_items: {}", stats.max_items);
        }

        "dump" => match serde_json::to_string_pretty(&db.export_tree()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("ERROR: {}", e),
        },

        "debug" => {
            let Some(key) = args.first() else {
                eprintln!("Usage: debug <key>");
                return;
            };
            for line in db.debug_get(key) {
                println!("{}", line);
            }
        }

        "bulk_insert" => {
            let count: usize = match args.first().map(|s| s.parse()) {
                Some(Ok(n)) => n,
                _ => {
                    eprintln!("Usage: bulk_insert <count>");
                    return;
                }
            };

            let start = std::time::Instant::now();
            for i in 0..count {
                let key = format!("key_{:08}", i);
                let value = format!("value_{}", i);
                db.put(&key, value.as_bytes());
            }
            let elapsed = start.elapsed();

            let ops_per_sec = count as f64 / elapsed.as_secs_f64();
            println!("INSERTED: {}", count);
            println!("TIME_MS: {}", elapsed.as_millis());
            println!("OPS_PER_SEC: {:.0}", ops_per_sec);
        }

        _ => eprintln!("Unknown command: {}", command),
    }
}
