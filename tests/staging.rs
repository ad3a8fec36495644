//! End-to-end staging of exploded applications.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use webapp_stager::dom::{QueryContext, DOCUMENT_NODE};
use webapp_stager::stage::{load_descriptor, DESCRIPTOR, LIB_DIR, WEBAPP_ROOT};
use webapp_stager::{xpath, StageError, Stager, StagingConfig};

const BOOTSTRAP: &str = "org.cloudfoundry.reconfiguration.spring.CloudApplicationContextInitializer";
const RESOURCE: &str = "classpath:META-INF/cloud/cloudfoundry-auto-reconfiguration-context.xml";

const SPRING_APP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<web-app xmlns="http://java.sun.com/xml/ns/javaee"
         xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
         xsi:schemaLocation="http://java.sun.com/xml/ns/javaee http://java.sun.com/xml/ns/javaee/web-app_2_5.xsd"
         version="2.5">
  <display-name>hello-spring</display-name>
  <!-- root context -->
  <context-param>
    <param-name>contextInitializerClasses</param-name>
    <param-value>com.example.Init</param-value>
  </context-param>
  <listener>
    <listener-class>org.springframework.web.context.ContextLoaderListener</listener-class>
  </listener>
  <servlet>
    <servlet-name>hello</servlet-name>
    <servlet-class>org.springframework.web.servlet.DispatcherServlet</servlet-class>
    <load-on-startup>1</load-on-startup>
  </servlet>
  <servlet-mapping>
    <servlet-name>hello</servlet-name>
    <url-pattern>/</url-pattern>
  </servlet-mapping>
</web-app>
"#;

struct Fixture {
    dir: TempDir,
    app: PathBuf,
    jar: PathBuf,
}

impl Fixture {
    fn new(web_xml: Option<&str>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app");
        fs::create_dir_all(app.join("WEB-INF/classes")).unwrap();
        fs::write(app.join("WEB-INF/classes/app.properties"), "greeting=hi\n").unwrap();
        if let Some(xml) = web_xml {
            fs::write(app.join(DESCRIPTOR), xml).unwrap();
        }
        let jar = dir.path().join("auto-reconfiguration-0.6.5.jar");
        fs::write(&jar, b"PK\x03\x04").unwrap();
        Fixture { dir, app, jar }
    }

    fn out(&self) -> PathBuf {
        self.dir.path().join("staged")
    }

    fn config(&self) -> StagingConfig {
        StagingConfig::default().with_autoreconfig_jar(&self.jar)
    }
}

fn query(path: &Path, expr: &str) -> String {
    let doc = load_descriptor(path).unwrap();
    let ns = QueryContext::for_document(&doc);
    xpath::evaluate_string(&doc, &ns, DOCUMENT_NODE, expr).unwrap()
}

#[test]
fn test_stage_spring_application() {
    let fixture = Fixture::new(Some(SPRING_APP));
    let out = fixture.out();
    let staged = Stager::new(fixture.config()).stage(&fixture.app, &out).unwrap();

    let descriptor = out.join(WEBAPP_ROOT).join(DESCRIPTOR);
    assert_eq!(staged.descriptor, descriptor);
    assert_eq!(
        query(
            &descriptor,
            "/xmlns:web-app/xmlns:context-param[xmlns:param-name='contextInitializerClasses']/xmlns:param-value"
        ),
        format!("com.example.Init, {}", BOOTSTRAP)
    );
    assert_eq!(
        query(
            &descriptor,
            "/xmlns:web-app/xmlns:context-param[xmlns:param-name='contextConfigLocation']/xmlns:param-value"
        ),
        format!("/WEB-INF/applicationContext.xml {}", RESOURCE)
    );
    assert_eq!(
        query(&descriptor, "/xmlns:web-app/xmlns:servlet/xmlns:init-param/xmlns:param-value"),
        format!("/WEB-INF/hello-servlet.xml {}", RESOURCE)
    );

    // Everything else in the application is copied as-is
    assert_eq!(
        fs::read_to_string(out.join(WEBAPP_ROOT).join("WEB-INF/classes/app.properties")).unwrap(),
        "greeting=hi\n"
    );
    assert_eq!(
        fs::read(out.join(WEBAPP_ROOT).join(LIB_DIR).join("auto-reconfiguration-0.6.5.jar")).unwrap(),
        b"PK\x03\x04"
    );
    assert!(out.join("logs").is_dir());
}

#[test]
fn test_descriptor_preserves_untouched_content() {
    let fixture = Fixture::new(Some(SPRING_APP));
    let out = fixture.out();
    Stager::new(fixture.config()).stage(&fixture.app, &out).unwrap();

    let written = fs::read_to_string(out.join(WEBAPP_ROOT).join(DESCRIPTOR)).unwrap();
    assert!(written.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<web-app xmlns=\"http://java.sun.com/xml/ns/javaee\""));
    assert!(written.contains("<!-- root context -->"));
    assert!(written.contains(
        "  <servlet-mapping>\n    <servlet-name>hello</servlet-name>\n    <url-pattern>/</url-pattern>\n  </servlet-mapping>"
    ));
    // No element picked up an explicit namespace declaration
    assert_eq!(written.matches("xmlns=").count(), 1);
}

#[test]
fn test_default_script() {
    let fixture = Fixture::new(Some(SPRING_APP));
    let out = fixture.out();
    let staged = Stager::new(fixture.config()).stage(&fixture.app, &out).unwrap();

    let script = fs::read_to_string(&staged.script).unwrap();
    assert_eq!(script, webapp_stager::script::render(512));
    assert!(script.starts_with("#!/bin/bash\nexport CATALINA_OPTS=\"-Xms512m -Xmx512m\"\n"));

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&staged.script).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

#[test]
fn test_configured_memory() {
    let fixture = Fixture::new(Some(SPRING_APP));
    let config_path = fixture.dir.path().join("staging.toml");
    fs::write(
        &config_path,
        format!("memory_mb = 256\nautoreconfig_jar = {:?}\n", fixture.jar.display().to_string()),
    )
    .unwrap();

    let config = StagingConfig::from_file(&config_path).unwrap();
    let out = fixture.out();
    let staged = Stager::new(config).stage(&fixture.app, &out).unwrap();
    let script = fs::read_to_string(staged.script).unwrap();
    assert!(script.contains("export CATALINA_OPTS=\"-Xms256m -Xmx256m\"\n"));
}

#[test]
fn test_missing_descriptor_fails() {
    let fixture = Fixture::new(None);
    let out = fixture.out();
    let err = Stager::new(fixture.config()).stage(&fixture.app, &out).unwrap_err();
    assert!(matches!(err, StageError::MissingDescriptor(ref path) if path.ends_with("WEB-INF/web.xml")));
    assert!(!out.exists());
}

#[test]
fn test_malformed_descriptor_leaves_nothing_behind() {
    let fixture = Fixture::new(Some("<web-app><servlet></web-app>"));
    let out = fixture.out();
    let err = Stager::new(fixture.config()).stage(&fixture.app, &out).unwrap_err();
    match err {
        StageError::Parse { source, .. } => assert_eq!(source.line, 1),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!out.exists());
}

#[test]
fn test_restaging_is_stable() {
    let fixture = Fixture::new(Some(SPRING_APP));
    let stager = Stager::new(fixture.config());
    let first = fixture.out();
    stager.stage(&fixture.app, &first).unwrap();
    let once = fs::read_to_string(first.join(WEBAPP_ROOT).join(DESCRIPTOR)).unwrap();

    // Staging the staged application again changes nothing
    let second = fixture.dir.path().join("restaged");
    let staged = stager.stage(&first.join(WEBAPP_ROOT), &second).unwrap();
    assert!(staged.changed.is_empty());
    assert_eq!(fs::read_to_string(second.join(WEBAPP_ROOT).join(DESCRIPTOR)).unwrap(), once);
}

#[test]
fn test_stage_all() {
    let fixture = Fixture::new(Some(SPRING_APP));
    let stager = Stager::new(fixture.config());
    let jobs: Vec<(PathBuf, PathBuf)> = (0..4)
        .map(|i| (fixture.app.clone(), fixture.dir.path().join(format!("staged-{}", i))))
        .collect();

    let results = stager.stage_all(&jobs);
    assert_eq!(results.len(), 4);
    for (result, (_, out)) in results.iter().zip(&jobs) {
        assert_eq!(&result.as_ref().unwrap().root, out);
    }
}
