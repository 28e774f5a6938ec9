//! # Core Module
//!
//! The data model of a molecular entity and the structures derived from it.
//!
//! ## Overview
//!
//! Cartesian positions are the single source of truth. Everything else in
//! this module is either plain record data or derived from positions and
//! bonds, and is rebuilt when the store marks it dirty.
//!
//! ## Architecture
//!
//! - **Records and the store** ([`models`]) - Chains, residues, atoms, bonds,
//!   torsions and the `EntityStore` that owns them
//! - **Generic properties** ([`props`]) - Typed key/value bags attached to
//!   any record
//! - **Connector forest** ([`connectors`]) - Spanning forest of the bonded
//!   graph and the internal-coordinate cache
//! - **Spatial grid** ([`spatial`]) - Bucketed index for radius queries
//! - **Observers** ([`observer`]) - Change notifications raised after edits
//! - **Geometry** ([`utils`]) - Distances, angles, dihedrals and rigid
//!   transforms

pub mod connectors;
pub mod models;
pub mod observer;
pub mod props;
pub mod spatial;
pub mod utils;
