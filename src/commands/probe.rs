//! Probe command implementation

use boardid_core::{BoardCollection, Presence};

/// Show what the construction-time probe found in every slot
pub fn run_probe(collection: &BoardCollection) -> Result<(), Box<dyn std::error::Error>> {
    println!("{:<12} {:>4} {:>8}  Status", "Slot", "Bus", "Address");
    println!("{}", "-".repeat(50));

    let mut missing = 0;
    for slot in collection.slots() {
        let status = match slot.presence() {
            Presence::Present => "present".to_string(),
            Presence::Absent if slot.is_optional() => "not present".to_string(),
            Presence::Absent | Presence::Unknown => {
                missing += 1;
                "NOT PRESENT (mandatory)".to_string()
            }
            Presence::Fault(e) => {
                if !slot.is_optional() {
                    missing += 1;
                }
                format!("FAULT: {}", e)
            }
        };
        println!(
            "{:<12} {:>4}     0x{:02X}  {}",
            slot.name(),
            slot.bus_id(),
            slot.address(),
            status
        );
    }

    if missing > 0 {
        log::warn!("{} mandatory board(s) not detected", missing);
    }
    Ok(())
}
