//! Headless turn host.
//!
//! Loads a saved game, generates one or more years with the standard step
//! pipeline, writes the game back out and reports what every player was
//! told. Also checks rules files before a game is created from them.
//!
//! # Example
//!
//! ```bash
//! # Generate two years and save next to the input
//! cargo run -p stellar_headless -- generate --game galaxy.ron --turns 2 --output galaxy-2.ron
//!
//! # Check a rules file
//! cargo run -p stellar_headless -- validate --rules rules.ron
//! ```
//!
//! Reports go to stdout as JSON. Logs go to stderr.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod report;
pub mod runner;

pub use report::{MessageLine, RunReport, TurnReport};
pub use runner::{HeadlessRunner, RunConfig, RunnerError};
