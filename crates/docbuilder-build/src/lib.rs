//! Build orchestration: configuration, trigger requests, the external
//! collaborator traits (VCS, transform, site generation), and the
//! orchestrator that drives them through the seven pipeline stages.

pub mod config;
pub mod orchestrator;
pub mod request;
pub mod site;
pub mod transform;
pub mod vcs;

pub use config::{
    load_config, BuildConfig, ConfigFile, DaemonConfig, DaemonMode, ListenerConfig,
    RateLimitConfig, ScheduleEntryConfig, ScheduleTriggerConfig, TlsConfig, WebhookConfig,
};
pub use orchestrator::Orchestrator;
pub use request::{BuildOutcome, BuildReport, BuildRequest, RepoOutcome, TriggerSource};
pub use site::{FakeSiteGenerator, HugoSiteGenerator, SiteGenerator};
pub use transform::{FakeTransformPipeline, MarkdownTransformPipeline, TransformPipeline, TransformedFile};
pub use vcs::{AcquiredRepo, FakeVcsProvider, GitVcsProvider, VcsProvider};
