//! webapp-stager - Spring web application staging for Cloud Foundry
//!
//! Layers:
//! - `core`, `reader`: byte scanning, tokenizing and the event reader
//! - `dom`: arena tree with mutation and serialization
//! - `xpath`: namespace-aware XPath 1.0 subset used for every lookup
//! - `reconfig`: rules that inject the auto-reconfiguration bootstrap into `web.xml`
//! - `script`: the Tomcat startup script
//! - `stage`: the pipeline that assembles a runnable droplet

pub mod config;
pub mod core;
pub mod dom;
pub mod error;
pub mod reader;
pub mod reconfig;
pub mod script;
pub mod stage;
pub mod xpath;

pub use config::StagingConfig;
pub use dom::{Document, QueryContext};
pub use error::{StageError, XPathError, XmlError};
pub use reconfig::{Policy, ReconfigReport, Reconfigurator, Rule};
pub use stage::{StagedApp, Stager};
