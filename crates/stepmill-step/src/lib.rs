#![warn(missing_docs)]

//! STEP (ISO 10303-21) reader for the AP214 boundary-representation subset.
//!
//! The pipeline is lexer, parser, reader: the lexer tokenizes the Part 21
//! exchange structure, the parser builds the entity graph, and the reader
//! resolves `MANIFOLD_SOLID_BREP` entities into [`Solid`] values backed by
//! the analytic geometry in `stepmill_geom`.
//!
//! ```no_run
//! use std::path::Path;
//!
//! let solids = stepmill_step::read_step(Path::new("part.step"))?;
//! for solid in &solids {
//!     println!("{}: {} faces", solid.name, solid.faces.len());
//! }
//! # Ok::<(), stepmill_step::StepError>(())
//! ```

mod entities;
mod error;
mod lexer;
mod parser;
mod reader;

pub use error::StepError;
pub use parser::{Entity, Parser, StepFile, Value};
pub use reader::{read_step, read_step_from_buffer, BoundaryEdge, BoundaryLoop, Face, Solid};
