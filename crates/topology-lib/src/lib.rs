//! Kubernetes topology library
//!
//! This crate provides the core functionality for:
//! - Building a topology model from a live cluster or YAML fixtures
//! - Correlating workloads with the storage claims they mount
//! - Deriving Service and volume relationships
//! - Rendering the topology as a D2 diagram
//! - Validating rendered diagrams against an expected model

pub mod builder;
pub mod correlate;
pub mod error;
pub mod filter;
pub mod model;
pub mod naming;
pub mod observability;
pub mod relationships;
pub mod render;
pub mod source;
pub mod validate;

pub use error::{Result, TopologyError};
pub use filter::SystemResourcePolicy;
pub use model::*;
pub use observability::TopologyLogger;
pub use relationships::{Connection, ConnectionKind};
pub use render::{render, render_to_string, RenderOptions};
pub use source::{
    fetch_topology, load_fixture_files, ClusterReader, FetchOptions, FixtureParser, KubeReader,
};
pub use validate::{D2Validator, DiagramGraph, ValidationFailure, ValidationReport};
