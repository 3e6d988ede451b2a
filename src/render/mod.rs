//! HTML output: page frame, query form, navigator and result items.

pub mod html;
pub mod nav;
pub mod transform;

pub use nav::{Navigator, PAGE_SIZE};
pub use transform::{ItemRenderer, Xsltproc};

/// Where the router mounts the single-document and similar-documents pages.
/// Result items link here from any page.
pub const DOCUMENT_PATH: &str = "/document";
pub const SIMILAR_PATH: &str = "/similar";
