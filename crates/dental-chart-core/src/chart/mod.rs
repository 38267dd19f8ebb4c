//! Interactive teeth chart: per-tooth state, the chart model, and rendering.

mod model;
mod overlay;
mod svg;
mod tooth_state;

pub use model::*;
pub use overlay::*;
pub use svg::*;
pub use tooth_state::*;
