//! pdr-probe: checks that the Binance public market-data endpoints a trading
//! bot depends on are reachable from the current host.
pub mod probe;

pub use probe::steps::{PayloadSummary, ProbeStep};
pub use probe::transport::{HttpGet, HttpResponse, ReqwestTransport, TransportError};
pub use probe::{ConnectivityProbe, ProbeReport, StepOutcome, StepReport};
