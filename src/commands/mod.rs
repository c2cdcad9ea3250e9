//! CLI command implementations
//!
//! Every command works on a `BoardCollection` built from the deploy-time
//! configuration and a set of opened buses. Commands that need no hardware
//! (listing the table and transports) live in `list`.

pub mod clear;
mod list;
pub mod probe;
pub mod read;
pub mod write;

pub use list::{list_transports, list_types};

use boardid_core::BatchOutcome;

/// Print the outcome of a gated batch operation
pub fn print_outcome(action: &str, outcome: &BatchOutcome) {
    match outcome {
        BatchOutcome::Refused(refusal) => {
            eprintln!("Refusing to {}: {}", action, refusal);
        }
        BatchOutcome::Completed { processed, skipped } => {
            println!("{} {} board(s)", capitalize(action), processed.len());
            for name in processed {
                println!("  {}", name);
            }
            if !skipped.is_empty() {
                println!("Skipped (not present): {}", skipped.join(", "));
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
