//! `use scene_navigation_tiles::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::navigation::{
	cost_model::*, nav_grid::*, path_finder::*, terrain::*, update_tracker::*, utilities::*,
	wrap::*, *,
};

#[doc(hidden)]
pub use crate::{
	error::*,
	plugin::{path_layer::*, terrain_layer::*, *},
	scene::*,
	scheduler::{path_request::*, *},
	settings::*,
};
