pub mod allocation;
pub mod commission;
pub mod kelly;
