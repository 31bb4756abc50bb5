//! Reading side of the PDF collaborator: backend access and the text walker.

pub mod backend;
pub mod cleanup;
pub mod text;
