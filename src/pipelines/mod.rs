pub mod basic;
pub mod bundled;

pub use basic::{mk_bind_group_layouts, mk_render_pipeline};
