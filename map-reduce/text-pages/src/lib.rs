// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Concrete collaborators for page map-reduce over plain-text documents.
//!
//! A document is a text file whose pages are separated by form feeds (`\x0c`),
//! the way `pdftotext` and line printers paginate text.

mod command_transform;
mod text_assembler;
mod text_page_source;

pub use command_transform::{CommandTransform, PassthroughTransform};
pub use text_assembler::TextAssembler;
pub use text_page_source::{split_pages, TextPageSource};
