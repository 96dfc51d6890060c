//! `use bevy_vector_field_plugin::prelude::*;` to import common structures and methods
//!

#[doc(hidden)]
pub use crate::flowfields::{
	error::*,
	fields::{direction_field::*, distance_field::*, *},
	grid::{occupancy_source::*, *},
	utilities::*,
};

#[doc(hidden)]
pub use crate::{
	plugin::{goal_layer::*, *},
	service::*,
};
