mod settings;

pub use settings::{
    AuthFailurePolicy, OtelConfig, RoutingConfig, ServerConfig, SessionConfig, Settings,
    TemplateConfig,
};
