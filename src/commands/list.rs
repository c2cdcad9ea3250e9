//! List commands implementation

use boardid_core::BoardTypeTable;

use crate::transports;

/// List all available transports
pub fn list_transports() {
    println!("Supported transports:");
    println!();
    print!("{}", transports::transport_help());
}

/// List the board type table
pub fn list_types(table: &BoardTypeTable) {
    println!("{:<6} {:<20} Models", "Code", "Type");
    println!("{}", "-".repeat(60));

    for (code, name, models) in table.iter() {
        let models: Vec<String> = models
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}={}", i, m))
            .collect();
        println!("0x{:02X}   {:<20} {}", code, name, models.join(", "));
    }

    println!();
    println!("{} board type(s)", table.len());
}
