//! Read command implementation

use boardid_core::{BoardCollection, BusSet, BusTransport};

/// Read every fitted board and print one line per slot
pub fn run_read<B: BusTransport>(
    collection: &mut BoardCollection,
    buses: &mut BusSet<B>,
) -> Result<(), Box<dyn std::error::Error>> {
    let reports = collection.read_all(buses);
    for report in &reports {
        println!("{}", report);
    }

    let missing: Vec<&str> = reports
        .iter()
        .filter(|r| r.is_missing_mandatory())
        .map(|r| r.name.as_str())
        .collect();
    if !missing.is_empty() {
        println!();
        println!("Mandatory board(s) missing: {}", missing.join(", "));
    }
    Ok(())
}
