//! Subscriber installation runs in its own test binary: it sets global state.

use atlas_daq::logging::{self, OutputFormat, TracingConfig};
use tracing::Level;

#[test]
fn test_init_is_idempotent() {
    logging::init(TracingConfig::new(Level::DEBUG).with_ansi(false));
    logging::init(TracingConfig::new(Level::INFO).with_format(OutputFormat::Json));
    tracing::info!("still logging after a second init");
}
