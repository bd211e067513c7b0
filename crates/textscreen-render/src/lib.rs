#![forbid(unsafe_code)]

//! Bitmap presentation: the [`presenter::Presenter`] and the byte-level
//! [`screen_model::ScreenModel`] used to check its output.

pub mod presenter;
pub mod screen_model;

pub use presenter::Presenter;
pub use screen_model::ScreenModel;
