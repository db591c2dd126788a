//! Page publishing workflow.
//!
//! [`PageUpdater`] turns a Markdown document into a new version of a wiki
//! page:
//!
//! 1. Prepare the Markdown and convert it in a temporary directory
//! 2. Fetch the current page
//! 3. Restore inline comments inside the managed region
//! 4. Compare content fingerprints
//! 5. Write the page and store the new fingerprint
//!
//! # Example
//!
//! ```ignore
//! use flc_config::Config;
//! use flc_confluence::updater::PageUpdater;
//!
//! let config = Config::load(None)?;
//! let updater = PageUpdater::new(&wiki, &converter, &config);
//!
//! // Perform update
//! let result = updater.update("# Title\n\nContent")?;
//! println!("{result}");
//!
//! // Or dry-run to preview changes
//! let dry_run = updater.dry_run("# Title\n\nContent")?;
//! ```

mod error;
mod executor;
mod result;

pub use error::UpdateError;
pub use executor::PageUpdater;
pub use result::{DryRunResult, UpdateResult};
