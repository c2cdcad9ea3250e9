//! Man page generator for boardid
//!
//! Writes `boardid.1` plus one `boardid-<command>.1` page per subcommand,
//! so e.g. `man boardid-write` documents `--from-device` on its own.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;

fn render(cmd: clap::Command, title: &str, output_dir: &Path) -> std::io::Result<PathBuf> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd).title(title).render(&mut buffer)?;

    let path = output_dir.join(format!("{}.1", title));
    fs::write(&path, buffer)?;
    Ok(path)
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let mut pages = vec![render(cmd.clone(), "boardid", &output_dir)?];
    for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
        let title = format!("boardid-{}", sub.get_name());
        pages.push(render(sub.clone(), &title, &output_dir)?);
    }

    for page in &pages {
        println!("Generated {}", page.display());
    }
    println!("\nView with: man -l {}", pages[0].display());
    println!(
        "Install with: sudo cp {}/boardid*.1 /usr/local/share/man/man1/ && sudo mandb",
        output_dir.display()
    );

    Ok(())
}
