pub mod schema;
pub mod traits;

pub use schema::{
    build_http_client, expand_path, resolve_config_dir, Config, HttpConfig, ReadinessValidator,
    SocialProviderConfig, CONFIG_DIR_ENV,
};
pub use traits::{ConfigIssue, ConfigIssueSeverity, ConfigValidator};
