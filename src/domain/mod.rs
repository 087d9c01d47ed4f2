// Domain layer: core models, ports (interfaces) and the pure profile classifier.
// No network or runtime dependencies here.

pub mod classifier;
pub mod model;
pub mod ports;
