//! Descriptor Reconfiguration Engine
//!
//! Rewrites a parsed `web.xml` so the application boots the platform's
//! configuration:
//! - the bootstrap class is registered in `contextInitializerClasses`
//! - the auto-reconfiguration resource (or, for annotation-style contexts,
//!   the annotation-aware class) joins the root `contextConfigLocation`
//! - every dispatcher servlet's own `contextConfigLocation` gets the same
//!
//! Each step is a [`Rule`]. Rules only add what is missing, so running the
//! engine twice leaves the second run with nothing to do.

pub mod params;
pub mod policy;
pub mod rules;
pub mod value_list;

pub use params::ParamScope;
pub use policy::Policy;
pub use rules::{InitializerClassesRule, RootConfigLocationsRule, ServletConfigLocationsRule};
pub use value_list::{Delimiter, ValueList};

use crate::dom::{Document, NodeId, QueryContext};
use crate::error::XPathError;
use tracing::debug;

/// One transformation of the descriptor tree
pub trait Rule: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Apply the rule to the tree rooted at `web_app`, returning whether it changed anything
    fn apply(&self, doc: &mut Document, ns: &QueryContext, policy: &Policy, web_app: NodeId) -> Result<bool, XPathError>;
}

/// What a reconfiguration run changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconfigReport {
    /// Rules that modified the tree, in the order they ran
    pub changed: Vec<&'static str>,
}

impl ReconfigReport {
    pub fn is_unchanged(&self) -> bool {
        self.changed.is_empty()
    }
}

/// An ordered list of rules sharing one [`Policy`]
pub struct Reconfigurator {
    policy: Policy,
    rules: Vec<Box<dyn Rule>>,
}

impl Reconfigurator {
    /// The standard rule set
    pub fn new(policy: Policy) -> Self {
        Self::with_rules(
            policy,
            vec![
                Box::new(InitializerClassesRule),
                Box::new(RootConfigLocationsRule),
                Box::new(ServletConfigLocationsRule),
            ],
        )
    }

    pub fn with_rules(policy: Policy, rules: Vec<Box<dyn Rule>>) -> Self {
        Reconfigurator { policy, rules }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Run every rule against the document's root element
    ///
    /// A document without a root element is left alone; callers check the
    /// root is a `web-app` before reconfiguring.
    pub fn reconfigure(&self, doc: &mut Document) -> Result<ReconfigReport, XPathError> {
        let mut report = ReconfigReport::default();
        let Some(web_app) = doc.root_element_id() else {
            return Ok(report);
        };
        let ns = QueryContext::for_document(doc);

        for rule in &self.rules {
            if rule.apply(doc, &ns, &self.policy, web_app)? {
                debug!(rule = rule.name(), "descriptor changed");
                report.changed.push(rule.name());
            }
        }
        Ok(report)
    }
}

impl Default for Reconfigurator {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}
