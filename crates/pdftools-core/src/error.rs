use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfToolsError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Cannot save a PDF with zero pages")]
    EmptyDocument,

    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Image error: {0}")]
    ImageError(String),

    #[error("Conversion failed: {0}")]
    ConversionError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<lopdf::Error> for PdfToolsError {
    fn from(err: lopdf::Error) -> Self {
        PdfToolsError::ParseError(err.to_string())
    }
}

impl From<image::ImageError> for PdfToolsError {
    fn from(err: image::ImageError) -> Self {
        PdfToolsError::ImageError(err.to_string())
    }
}

impl From<zip::result::ZipError> for PdfToolsError {
    fn from(err: zip::result::ZipError) -> Self {
        PdfToolsError::ConversionError(err.to_string())
    }
}
