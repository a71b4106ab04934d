//! `use bevy_hierarchical_pathing_plugin::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::pathing::{
	cache::*,
	grid::*,
	heat::*,
	level::*,
	manager::{multipath::*, pending::*, *},
	mobility::*,
	overlay::*,
	search::{coarse::*, fine::*, *},
	terrain::*,
	*,
};

#[doc(hidden)]
pub use crate::plugin::*;
