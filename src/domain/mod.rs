// Domain layer: request/report models and the ports the core and adapters meet at.

pub mod model;
pub mod ports;
