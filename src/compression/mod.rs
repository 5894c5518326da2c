//! Body-record decompression backends.
pub(crate) mod huffcdic;
pub(crate) mod palmdoc;
