//! Where story data lives and how it is reached.
//!
//! One [`DataSource`] trait, two homes for the data: [`LocalDataSource`]
//! keeps everything in the storage layer, [`ApiDataSource`] forwards to the
//! REST backend. [`DataSourceFactory`] picks one from the configured mode.

/// REST-backed implementation.
pub mod api;
/// Mode-based construction.
pub mod factory;
/// Storage-backed implementation and its policy seam.
pub mod local;
/// The trait and its payload types.
pub mod types;

pub use api::ApiDataSource;
pub use factory::{DataSourceFactory, DataSourceFactoryConfig};
pub use local::{DemoPolicy, LocalDataSource, StoryPolicy, DEMO_PASSWORD};
pub use types::{
    AuthPayload, CreateProjectData, CreateTeamData, DataSource, DataSourceHandle,
    NotificationList, ProjectFilter, ProjectPatch, RegisterData, TeamPatch, UserPatch,
};
