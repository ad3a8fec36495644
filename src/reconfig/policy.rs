//! Platform constants the reconfiguration rules inject.

use serde::Deserialize;

/// Context-param naming the initializer classes
pub const INITIALIZER_CLASSES_PARAM: &str = "contextInitializerClasses";
/// Context-param or init-param naming the configuration locations
pub const CONFIG_LOCATION_PARAM: &str = "contextConfigLocation";
/// Context-param or init-param naming the context implementation class
pub const CONTEXT_CLASS_PARAM: &str = "contextClass";

/// Placeholder replaced by the servlet name in [`Policy::default_servlet_location`]
pub const SERVLET_PLACEHOLDER: &str = "{servlet}";

/// Classes and resources injected into a descriptor
///
/// Every field defaults to the Cloud Foundry value; a `[policy]` table in
/// the staging configuration may override any of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policy {
    /// Registered as a root context initializer
    pub initializer_class: String,
    /// Appended to XML-style configuration location lists
    pub autoconfig_resource: String,
    /// Added to annotation-style configuration location lists
    pub annotation_initializer_class: String,
    /// `contextClass` value marking a context as annotation-style
    pub annotation_context_class: String,
    /// Servlets with this `servlet-class` are reconfigured
    pub dispatcher_servlet_class: String,
    /// Root context location used when none is declared
    pub default_root_location: String,
    /// Servlet context location used when none is declared
    pub default_servlet_location: String,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            initializer_class: "org.cloudfoundry.reconfiguration.spring.CloudApplicationContextInitializer"
                .to_string(),
            autoconfig_resource: "classpath:META-INF/cloud/cloudfoundry-auto-reconfiguration-context.xml"
                .to_string(),
            annotation_initializer_class:
                "org.cloudfoundry.reconfiguration.spring.web.CloudAppAnnotationConfigAutoReconfig".to_string(),
            annotation_context_class:
                "org.springframework.web.context.support.AnnotationConfigWebApplicationContext".to_string(),
            dispatcher_servlet_class: "org.springframework.web.servlet.DispatcherServlet".to_string(),
            default_root_location: "/WEB-INF/applicationContext.xml".to_string(),
            default_servlet_location: format!("/WEB-INF/{}-servlet.xml", SERVLET_PLACEHOLDER),
        }
    }
}

impl Policy {
    /// Default context location for the named servlet
    pub fn servlet_location(&self, servlet_name: &str) -> String {
        self.default_servlet_location
            .replace(SERVLET_PLACEHOLDER, servlet_name.trim())
    }

    /// Whether a `contextClass` value marks an annotation-style context
    pub fn is_annotation_context(&self, context_class: &str) -> bool {
        context_class.trim() == self.annotation_context_class
    }

    /// Whether a `servlet-class` value names the dispatcher servlet
    pub fn is_dispatcher(&self, servlet_class: &str) -> bool {
        servlet_class.trim() == self.dispatcher_servlet_class
    }
}
