//! Vendor drivers, matched on the manufacturer specific report.
//!
//! Adding a device means adding a module with its handlers and one entry in
//! [`DRIVERS`]; discovery does not need to know about it.

pub mod fibaro_fgr222;

use super::node::CommandHandler;

pub struct Driver {
    pub manufacturer: u16,
    pub product: u16,
    pub name: &'static str,
    /// Handlers that replace the generic ones, keyed by command class.
    pub handlers: fn() -> Vec<(u8, Box<dyn CommandHandler>)>,
}

pub static DRIVERS: &[Driver] = &[Driver {
    manufacturer: 271,
    product: 770,
    name: "Fibaro FGR-222",
    handlers: fibaro_fgr222::handlers,
}];

pub fn find(manufacturer: u16, product: u16) -> Option<&'static Driver> {
    DRIVERS
        .iter()
        .find(|driver| driver.manufacturer == manufacturer && driver.product == product)
}
