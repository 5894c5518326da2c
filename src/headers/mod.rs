pub(crate) mod exth;
pub(crate) mod mobi;
pub(crate) mod palmdoc;

pub use self::mobi::{Language, MobiType};
pub use self::palmdoc::{Compression, Encryption};
