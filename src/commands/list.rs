//! List commands implementation

use crate::drivers;
use aseq_core::{Driver, Spectrometer};

/// List drivers compiled into this binary
pub fn list_drivers() {
    let drivers = drivers::available_drivers();
    if drivers.is_empty() {
        println!("No drivers available (recompile with driver features enabled)");
        return;
    }

    println!("Supported drivers:");
    println!();
    for d in &drivers {
        let aliases = if d.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", d.aliases.join(", "))
        };
        println!("  {:<10} - {}{}", d.name, d.description, aliases);
    }
}

/// List devices visible to `driver`
pub fn list_devices(driver: &dyn Driver) {
    let serials = Spectrometer::device_list(driver);
    println!("Number of devices: {}", Spectrometer::device_count(driver));
    if serials.is_empty() {
        return;
    }

    println!();
    println!("{:<6} {}", "Index", "Serial");
    println!("{}", "-".repeat(22));
    for (index, serial) in serials.iter().enumerate() {
        println!("{:<6} {}", index, serial);
    }
}
