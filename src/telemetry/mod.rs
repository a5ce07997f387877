pub(crate) mod oltp;

use opentelemetry::{global, metrics::Meter};

pub use oltp::init_meter;

pub fn get_meter() -> Meter {
    global::meter_provider().meter("basalt")
}
