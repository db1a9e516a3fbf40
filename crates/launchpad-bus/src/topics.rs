//! Lifecycle topic names published by the deploy pipeline.

pub const JOBS_CLONE: &str = "jobs.clone";
pub const JOBS_DEPLOY: &str = "jobs.deploy";
pub const JOBS_PARSE: &str = "jobs.parse";
pub const JOBS_CLUSTER: &str = "jobs.cluster";
pub const APP_CREATED: &str = "app.created";
pub const APP_DEPLOYED: &str = "app.deployed";

/// Every topic whose log-worthy payloads end up in the deploy log.
pub const LIFECYCLE: [&str; 6] = [
    JOBS_CLONE,
    JOBS_DEPLOY,
    JOBS_PARSE,
    APP_CREATED,
    APP_DEPLOYED,
    JOBS_CLUSTER,
];
