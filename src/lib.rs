//! A reader for the MOBI/PalmDOC family of ebook container formats.
//!
//! Given a byte-addressable file, this crate validates the PalmDB
//! container, parses the PalmDOC and MOBI headers and the optional EXTH
//! metadata table, reconstructs the text body through one of the three
//! supported compression schemes, and enumerates embedded image records.
//! It is read-only: writing MOBI files, decrypting DRM-protected books,
//! and rendering the HTML body are all out of scope.
//!
//! ## Example
//! ```no_run
//! use mobicore::Book;
//!
//! # fn main() -> Result<(), mobicore::Error> {
//! let book = Book::open("book.mobi")?;
//! println!("{}", String::from_utf8_lossy(&book.title));
//! # Ok(())
//! # }
//! ```
mod book;
mod bytesource;
mod bitreader;
mod compression;
mod error;
mod headers;
mod image;
mod pdb;
mod trailer;

pub use crate::book::{Book, OpenOptions};
pub use crate::error::{Error, Result};
pub use crate::headers::{Compression, Encryption, Language, MobiType};
pub use crate::image::{Image, ImageFormat};
pub use crate::pdb::ContainerKind;
