//! Write command implementation

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use boardid_core::{BoardCollection, BusSet, BusTransport, LineSource, ValueSource};

use super::print_outcome;
use crate::prompt::TerminalSource;

/// Collect values for every fitted board and program it
///
/// Answers come from `script` when given, otherwise from the terminal.
pub fn run_write<B: BusTransport>(
    collection: &mut BoardCollection,
    buses: &mut BusSet<B>,
    script: Option<&Path>,
    from_device: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut source: Box<dyn ValueSource> = match script {
        Some(path) => {
            let file = File::open(path)
                .map_err(|e| format!("Failed to open script {}: {}", path.display(), e))?;
            log::info!("Reading answers from {}", path.display());
            Box::new(LineSource::new(BufReader::new(file), io::stdout()))
        }
        None => Box::new(TerminalSource::new()?),
    };

    let outcome = collection.write_all(buses, source.as_mut(), from_device)?;
    print_outcome("write", &outcome);
    Ok(())
}
