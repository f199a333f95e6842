#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Screens and touch targets of the instrument's panel.
//!
//! Drawing goes through `powder_traits::DisplaySurface`; nothing here keeps state.
pub mod layout;
pub mod screens;

pub use layout::{Button, MainAction, MainButtons, font_height, map_range, text_width};
pub use screens::{
    AccessPointView, CalibrationPrompt, CalibrationView, MeasurementView, Screen,
    draw_access_point, draw_calibration, draw_measurement,
};
