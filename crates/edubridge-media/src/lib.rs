pub mod image_gen;
pub mod pdf;
pub mod pptx;
pub mod video;
pub mod video_search;

pub use image_gen::{
    HuggingFaceImageGenerator, ImageGenerator, generate_or_placeholder, placeholder_png,
};
pub use pdf::render_pdf;
pub use pptx::{PPTX_MIME, Slide, render_pptx};
pub use video::{HttpVideoGenerator, VideoGenerator};
pub use video_search::{DuckDuckGoVideoSearcher, VideoResult, VideoSearcher};
