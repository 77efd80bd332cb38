//! Site-specific scraping rules.
//!
//! The phases are site-agnostic; everything tied to one site's markup
//! (listing paging, container matchers, link extraction) lives here.
//!
//! | Site | Module | Listing container | Story container |
//! |------|--------|-------------------|-----------------|
//! | RSVP success stories (Wayback snapshot) | [`rsvp`] | `ul[class="ui-extracts SS"]` | `article` |

pub mod rsvp;
