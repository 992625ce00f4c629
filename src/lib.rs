//! Sitebake - build a deployable site tree from templates and layered TOML.
//!
//! This library provides the core functionality for sitebake, including:
//! - Dotted-key configuration documents and left-fold layer merging
//! - `.sitebake.toml` project discovery
//! - Build tree assembly from a source tree and a static tree
//! - Placeholder substitution across eligible text files
//!
//! # Example
//!
//! ```no_run
//! use sitebake::config::{LayerSource, discover_project};
//! use sitebake::pipeline::BuildPipeline;
//!
//! let cwd = std::env::current_dir().unwrap();
//! let project = discover_project(&cwd).unwrap();
//! let pipeline = BuildPipeline::from_project(&project).unwrap();
//!
//! let layers = [
//!     LayerSource::required(project.root.join("config.toml")),
//!     LayerSource::optional(project.root.join("server_secrets.toml")),
//! ];
//! let report = pipeline.run(&layers, true).unwrap();
//! println!("{} placeholders replaced", report.substitution.substitutions);
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod substitute;
pub mod tree;

pub use error::{Result, SitebakeError};
