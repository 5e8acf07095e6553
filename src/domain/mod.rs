// Domain layer: the click/expansion model and the ports the loader talks through.

pub mod model;
pub mod ports;
