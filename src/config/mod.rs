//! Configuration module

mod site;

pub use site::BodyMode;
pub use site::OgImageConfig;
pub use site::SiteConfig;
