//! Client wiring: logging, the event loop and the live dictation host.

mod host;
mod logging;
mod runtime;

pub use host::LiveDictationHost;
pub use logging::{
    crash_log_path, init_logging, log_debug, log_debug_content, log_file_path, log_panic,
    LogSettings,
};
pub use runtime::{ClientEvent, ClientRuntime, RuntimeConfig};
