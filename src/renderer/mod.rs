use thiserror::Error;

pub mod colours;
pub mod drawing;
pub mod fonts;
pub mod widgets;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to read font {path}: {source}")]
    FontRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid font data in {0}")]
    InvalidFont(String),
}
