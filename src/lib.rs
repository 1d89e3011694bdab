pub mod cli;
pub mod error;
pub mod export;
pub mod fetch;
pub mod filter;
pub mod logging;
pub mod model;
pub mod paths;
pub mod resolve;
pub mod schema;
pub mod sync;
pub mod ui;
pub mod writer;

pub use cli::{Cli, Commands};
pub use sync::{run_sync, SyncOptions, SyncReport};
pub use ui::{Phase, SilentUi, TracingUi, Ui, UiApp};
