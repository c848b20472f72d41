//! JSON configuration of the demo tool and page fixtures.
//!
//! - [`engine`] is the tool configuration: input paths, output paths,
//!   engine parameters and linking constants.
//! - [`page`] is the page fixture: scale, slope and the per-system inputs.

pub mod engine;
pub mod page;

pub use engine::{load_config, OutputConfig, StemToolConfig};
pub use page::{load_page_fixture, PageFixture};
