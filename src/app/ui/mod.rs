pub mod main_panel;
pub mod status_bar;
pub mod tuning_panel;

pub use main_panel::render_main_panel;
pub use status_bar::{render_bottom_status_bar, render_status_bar};
pub use tuning_panel::render_tuning_panel;
