//! The reconfiguration rules, applied in declaration order.

use super::params::ParamScope;
use super::policy::{Policy, CONFIG_LOCATION_PARAM, CONTEXT_CLASS_PARAM, INITIALIZER_CLASSES_PARAM};
use super::value_list::{Delimiter, ValueList};
use super::Rule;
use crate::dom::{Document, NodeId, QueryContext};
use crate::error::XPathError;
use crate::xpath;

/// Registers the bootstrap class as a root context initializer
#[derive(Debug, Default)]
pub struct InitializerClassesRule;

impl Rule for InitializerClassesRule {
    fn name(&self) -> &'static str {
        "initializer-classes"
    }

    fn apply(&self, doc: &mut Document, ns: &QueryContext, policy: &Policy, web_app: NodeId) -> Result<bool, XPathError> {
        ensure_entry(
            doc,
            ns,
            ParamScope::root(web_app),
            INITIALIZER_CLASSES_PARAM,
            Delimiter::Comma,
            &policy.initializer_class,
            &[policy.initializer_class.as_str()],
        )
    }
}

/// Adds the platform configuration to the root context locations
#[derive(Debug, Default)]
pub struct RootConfigLocationsRule;

impl Rule for RootConfigLocationsRule {
    fn name(&self) -> &'static str {
        "root-config-locations"
    }

    fn apply(&self, doc: &mut Document, ns: &QueryContext, policy: &Policy, web_app: NodeId) -> Result<bool, XPathError> {
        let scope = ParamScope::root(web_app);
        if is_annotation_scope(doc, ns, scope, policy)? {
            let class = policy.annotation_initializer_class.as_str();
            ensure_entry(doc, ns, scope, CONFIG_LOCATION_PARAM, Delimiter::Space, class, &[class])
        } else {
            ensure_entry(
                doc,
                ns,
                scope,
                CONFIG_LOCATION_PARAM,
                Delimiter::Space,
                &policy.autoconfig_resource,
                &[policy.default_root_location.as_str(), policy.autoconfig_resource.as_str()],
            )
        }
    }
}

/// Adds the platform configuration to every dispatcher servlet's locations
#[derive(Debug, Default)]
pub struct ServletConfigLocationsRule;

impl Rule for ServletConfigLocationsRule {
    fn name(&self) -> &'static str {
        "servlet-config-locations"
    }

    fn apply(&self, doc: &mut Document, ns: &QueryContext, policy: &Policy, web_app: NodeId) -> Result<bool, XPathError> {
        // Under an annotation-style root context, a servlet without its own
        // locations gets only the platform resource, not the per-servlet
        // default `/WEB-INF/<name>-servlet.xml`.
        let root_is_annotation = is_annotation_scope(doc, ns, ParamScope::root(web_app), policy)?;
        let mut changed = false;

        for servlet in dispatcher_servlets(doc, ns, policy, web_app)? {
            let scope = ParamScope::servlet(servlet);

            changed |= if is_annotation_scope(doc, ns, scope, policy)? {
                let class = policy.annotation_initializer_class.as_str();
                ensure_entry(doc, ns, scope, CONFIG_LOCATION_PARAM, Delimiter::Space, class, &[class])?
            } else {
                let resource = policy.autoconfig_resource.as_str();
                let mut initial = Vec::with_capacity(2);
                if !root_is_annotation {
                    let name = xpath::evaluate_string(doc, ns, servlet, &ns.qualify("servlet-name"))?;
                    initial.push(policy.servlet_location(&name));
                }
                initial.push(resource.to_string());
                ensure_entry(doc, ns, scope, CONFIG_LOCATION_PARAM, Delimiter::Space, resource, &initial)?
            };
        }

        Ok(changed)
    }
}

/// Servlets whose trimmed `servlet-class` is the dispatcher, in document order
pub fn dispatcher_servlets(
    doc: &Document,
    ns: &QueryContext,
    policy: &Policy,
    web_app: NodeId,
) -> Result<Vec<NodeId>, XPathError> {
    let class_path = ns.qualify("servlet-class");
    let mut matched = Vec::new();
    for servlet in xpath::select_nodes(doc, ns, web_app, &ns.qualify("servlet"))? {
        if policy.is_dispatcher(&xpath::evaluate_string(doc, ns, servlet, &class_path)?) {
            matched.push(servlet);
        }
    }
    Ok(matched)
}

/// Whether a scope's `contextClass` parameter names the annotation context
fn is_annotation_scope(doc: &Document, ns: &QueryContext, scope: ParamScope, policy: &Policy) -> Result<bool, XPathError> {
    Ok(scope
        .value(doc, ns, CONTEXT_CLASS_PARAM)?
        .is_some_and(|class| policy.is_annotation_context(&class)))
}

/// Union-append `entry` to parameter `name`, creating it with `initial` when absent
///
/// Returns whether the tree changed.
fn ensure_entry<S: AsRef<str>>(
    doc: &mut Document,
    ns: &QueryContext,
    scope: ParamScope,
    name: &str,
    delimiter: Delimiter,
    entry: &str,
    initial: &[S],
) -> Result<bool, XPathError> {
    match scope.consolidate(doc, ns, name, delimiter)? {
        Some(mut param) => {
            let added = param.value.push(entry);
            if added {
                scope.write(doc, ns, param.node, param.value.render())?;
            }
            Ok(added || param.merged)
        }
        None => {
            let value = ValueList::from_entries(initial, delimiter);
            scope.create(doc, ns, name, value.render())?;
            Ok(true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOTSTRAP: &str = "org.cloudfoundry.reconfiguration.spring.CloudApplicationContextInitializer";
    const RESOURCE: &str = "classpath:META-INF/cloud/cloudfoundry-auto-reconfiguration-context.xml";
    const ANNOTATION_RECONFIG: &str = "org.cloudfoundry.reconfiguration.spring.web.CloudAppAnnotationConfigAutoReconfig";
    const ANNOTATION_CONTEXT: &str = "org.springframework.web.context.support.AnnotationConfigWebApplicationContext";

    fn apply(rule: &dyn Rule, xml: &str) -> (Document, bool) {
        let mut doc = Document::parse_str(xml).unwrap();
        let ns = QueryContext::for_document(&doc);
        let root = doc.root_element_id().unwrap();
        let changed = rule.apply(&mut doc, &ns, &Policy::default(), root).unwrap();
        (doc, changed)
    }

    fn root_value(doc: &Document, name: &str) -> Option<String> {
        let ns = QueryContext::for_document(doc);
        ParamScope::root(doc.root_element_id().unwrap())
            .value(doc, &ns, name)
            .unwrap()
    }

    fn servlet_values(doc: &Document, name: &str) -> Vec<Option<String>> {
        let ns = QueryContext::for_document(doc);
        let root = doc.root_element_id().unwrap();
        dispatcher_servlets(doc, &ns, &Policy::default(), root)
            .unwrap()
            .into_iter()
            .map(|s| ParamScope::servlet(s).value(doc, &ns, name).unwrap())
            .collect()
    }

    #[test]
    fn test_initializer_created() {
        let (doc, changed) = apply(&InitializerClassesRule, "<web-app/>");
        assert!(changed);
        assert_eq!(root_value(&doc, INITIALIZER_CLASSES_PARAM).as_deref(), Some(BOOTSTRAP));
    }

    #[test]
    fn test_initializer_appended() {
        let (doc, _) = apply(
            &InitializerClassesRule,
            "<web-app><context-param><param-name>contextInitializerClasses</param-name><param-value>foo</param-value></context-param></web-app>",
        );
        assert_eq!(
            root_value(&doc, INITIALIZER_CLASSES_PARAM),
            Some(format!("foo, {}", BOOTSTRAP))
        );
    }

    #[test]
    fn test_initializer_already_present() {
        let xml = format!(
            "<web-app><context-param><param-name>contextInitializerClasses</param-name><param-value>{}, foo</param-value></context-param></web-app>",
            BOOTSTRAP
        );
        let (doc, changed) = apply(&InitializerClassesRule, &xml);
        assert!(!changed);
        assert_eq!(doc.to_xml(), xml);
    }

    #[test]
    fn test_root_locations_appended() {
        let (doc, _) = apply(
            &RootConfigLocationsRule,
            "<web-app><context-param><param-name>contextConfigLocation</param-name><param-value>foo</param-value></context-param></web-app>",
        );
        let value = root_value(&doc, CONFIG_LOCATION_PARAM).unwrap();
        assert_eq!(value, format!("foo {}", RESOURCE));
        assert!(value.find(RESOURCE).unwrap() > value.find("foo").unwrap() + "foo".len());
    }

    #[test]
    fn test_root_locations_default() {
        let (doc, _) = apply(&RootConfigLocationsRule, "<web-app/>");
        let value = root_value(&doc, CONFIG_LOCATION_PARAM).unwrap();
        assert_eq!(value, format!("/WEB-INF/applicationContext.xml {}", RESOURCE));
    }

    #[test]
    fn test_root_annotation_style() {
        let xml = format!(
            "<web-app><context-param><param-name>contextClass</param-name><param-value> {} </param-value></context-param><context-param><param-name>contextConfigLocation</param-name><param-value>com.example.AppConfig</param-value></context-param></web-app>",
            ANNOTATION_CONTEXT
        );
        let (doc, _) = apply(&RootConfigLocationsRule, &xml);
        assert_eq!(
            root_value(&doc, CONFIG_LOCATION_PARAM),
            Some(format!("com.example.AppConfig {}", ANNOTATION_RECONFIG))
        );
    }

    #[test]
    fn test_root_annotation_style_without_locations() {
        let xml = format!(
            "<web-app><context-param><param-name>contextClass</param-name><param-value>{}</param-value></context-param></web-app>",
            ANNOTATION_CONTEXT
        );
        let (doc, _) = apply(&RootConfigLocationsRule, &xml);
        assert_eq!(root_value(&doc, CONFIG_LOCATION_PARAM).as_deref(), Some(ANNOTATION_RECONFIG));
    }

    #[test]
    fn test_servlets_without_init_params() {
        let (doc, changed) = apply(
            &ServletConfigLocationsRule,
            "<web-app>\
               <servlet><servlet-name>one</servlet-name><servlet-class>org.springframework.web.servlet.DispatcherServlet</servlet-class></servlet>\
               <servlet><servlet-name>two</servlet-name><servlet-class> org.springframework.web.servlet.DispatcherServlet </servlet-class></servlet>\
             </web-app>",
        );
        assert!(changed);
        assert_eq!(
            servlet_values(&doc, CONFIG_LOCATION_PARAM),
            vec![
                Some(format!("/WEB-INF/one-servlet.xml {}", RESOURCE)),
                Some(format!("/WEB-INF/two-servlet.xml {}", RESOURCE)),
            ]
        );
    }

    #[test]
    fn test_other_servlets_untouched() {
        let xml = "<web-app><servlet><servlet-name>x</servlet-name><servlet-class>com.example.Other</servlet-class></servlet></web-app>";
        let (doc, changed) = apply(&ServletConfigLocationsRule, xml);
        assert!(!changed);
        assert_eq!(doc.to_xml(), xml);
    }

    #[test]
    fn test_servlet_existing_locations() {
        let (doc, _) = apply(
            &ServletConfigLocationsRule,
            "<web-app><servlet><servlet-name>s</servlet-name><servlet-class>org.springframework.web.servlet.DispatcherServlet</servlet-class>\
             <init-param><param-name>contextConfigLocation</param-name><param-value>/WEB-INF/a.xml</param-value></init-param></servlet></web-app>",
        );
        assert_eq!(
            servlet_values(&doc, CONFIG_LOCATION_PARAM),
            vec![Some(format!("/WEB-INF/a.xml {}", RESOURCE))]
        );
    }

    #[test]
    fn test_annotation_servlet() {
        let xml = format!(
            "<web-app><servlet><servlet-name>s</servlet-name><servlet-class>org.springframework.web.servlet.DispatcherServlet</servlet-class>\
             <init-param><param-name>contextClass</param-name><param-value>{}</param-value></init-param>\
             <init-param><param-name>contextConfigLocation</param-name><param-value>com.example.WebConfig</param-value></init-param></servlet></web-app>",
            ANNOTATION_CONTEXT
        );
        let (doc, _) = apply(&ServletConfigLocationsRule, &xml);
        assert_eq!(
            servlet_values(&doc, CONFIG_LOCATION_PARAM),
            vec![Some(format!("com.example.WebConfig {}", ANNOTATION_RECONFIG))]
        );
    }

    #[test]
    fn test_servlet_under_annotation_root() {
        let xml = format!(
            "<web-app><context-param><param-name>contextClass</param-name><param-value>{}</param-value></context-param>\
             <servlet><servlet-name>s</servlet-name><servlet-class>org.springframework.web.servlet.DispatcherServlet</servlet-class></servlet></web-app>",
            ANNOTATION_CONTEXT
        );
        let (doc, _) = apply(&ServletConfigLocationsRule, &xml);
        assert_eq!(servlet_values(&doc, CONFIG_LOCATION_PARAM), vec![Some(RESOURCE.to_string())]);
    }
}
