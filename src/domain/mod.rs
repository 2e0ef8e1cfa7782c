// Domain layer: records, stats and the ports (traits) the adapter is built on.
// No I/O here; concrete stores live under adapters/.

pub mod model;
pub mod ports;
