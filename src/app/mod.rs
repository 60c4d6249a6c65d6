pub mod bootstrap;

pub use bootstrap::{
    build_service, resolve_symbols, run_portfolio, run_scan, spawn_shutdown_listener,
};
