//! Durable outputs of a crawl.
//!
//! # Submodules
//!
//! - [`state`]: the resumable JSON state (URL map and story collection)
//! - [`images`]: the sink that stores story images
//!
//! # Output Structure
//!
//! ```text
//! state_dir/
//! ├── storyUrls.json
//! └── stories.json
//!
//! images_dir/
//! └── Jane-&-John.jpg
//! ```

pub mod images;
pub mod state;
