//! Navigation over destructible terrain made of materials.
//!
//! A scene is a bitmap where every pixel holds a material, air, dirt, rock, a door and so on.
//! Actors path across it with a dig strength, the amount of material resistance they are able to
//! tunnel through, and belong to a team which decides which doors will open for them.
//!
//! The bitmap is divided into square nodes of `node_size` pixels, indexed from the top-left
//! corner of the scene. Each node links to its 8 neighbours, on an axis that wraps the nodes of
//! one edge link to the nodes of the opposite edge:
//!
//! ```text
//!  _____________________________
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! |__|__|__|\_|_/|__|__|__|__|__|
//! |__|__|__|<-|->|__|__|__|__|__|
//! |__|__|__|/‾|‾\|__|__|__|__|__|
//! |__|__|__|__|__|__|__|__|__|__|
//! ```
//!
//! Definitions:
//!
//! * Material - identified by a [utilities::MaterialId], its resistance sets how hard it is to dig through and how expensive it is to cross
//! * Node - a block of pixels governed by its most resistant material
//! * Edge - a move from one node to a neighbour, priced by the [cost_model::CostModel] from the materials it touches
//! * Door - pixels only some teams may pass, a shut door cannot be dug through
//! * Dirty region - a rectangle of the bitmap which has changed since the nodes were last sampled
//!
//! Every team gets its own [path_finder::PathFinder] as doors bake into the edges differently per
//! team, with one more shared by requests made without a team.
//!

pub mod cost_model;
pub mod nav_grid;
pub mod path_finder;
pub mod terrain;
pub mod update_tracker;
pub mod utilities;
pub mod wrap;
