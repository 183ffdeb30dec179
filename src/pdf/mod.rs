pub mod assemble;
pub mod document;

#[cfg(test)]
pub mod testing;

pub use assemble::PdfAssembler;
pub use document::PdfDocument;
