//! # Kiosk Server
//!
//! A demo service that simulates self-service kiosk orders against a
//! workflow orchestration server, with a built-in load driver.
//!
//! ## Quick Start
//!
//! ```bash
//! # Show all available options
//! kiosk --help
//!
//! # Serve /start-workflow on port 3000
//! kiosk --endpoint https://conductor.example.com
//!
//! # Publish definitions, sweep leftovers and run 20 orders/s for a minute
//! kiosk --endpoint https://conductor.example.com --workflows-dir ./workflows \
//!     --cleanup --load-test --workflows-per-second 20 --duration 60
//!
//! # List all available environment variables
//! kiosk --list-env-vars
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Parse configuration (CLI > environment > defaults)
//! 2. Publish workflow definitions from `--workflows-dir`, if given
//! 3. Terminate RUNNING executions when `--cleanup` is set
//! 4. Start the HTTP listener
//! 5. Run the load test when `--load-test` is set; the listener stops once
//!    it completes
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │    HTTP     │     │  Load Test  │
//! │  Transport  │     │ (kiosk lib) │
//! └──────┬──────┘     └──────┬──────┘
//!        │                   │
//!        └─────────┬─────────┘
//!                  │
//!           ┌──────▼──────┐
//!           │KioskGateway │
//!           └──────┬──────┘
//!                  │ HTTP/1.1
//!         ┌────────▼────────┐
//!         │  Orchestration  │
//!         │     Server      │
//!         └─────────────────┘
//! ```

pub mod config;
pub mod metrics;
pub mod transport;
pub mod workflows;
