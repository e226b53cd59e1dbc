//! Document rendering for the filled Appearance form as a PDF.

pub mod appearance;
pub mod writer;

pub use appearance::render_appearance_form;
