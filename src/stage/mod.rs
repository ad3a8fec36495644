//! Staging Pipeline
//!
//! Turns an exploded web application into a droplet Tomcat can run:
//!
//! ```text
//! <staged>/
//!   startup                              launch script (0755)
//!   logs/                                container stdout/stderr
//!   tomcat/webapps/ROOT/                 copy of the application
//!     WEB-INF/web.xml                    reconfigured descriptor
//!     WEB-INF/lib/<auto-reconfig jar>
//! ```
//!
//! Any failure removes what the failed run created.

pub mod parallel;

pub use parallel::stage_all;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::StagingConfig;
use crate::dom::Document;
use crate::error::StageError;
use crate::reconfig::Reconfigurator;
use crate::script;

/// Application root inside the staged directory
pub const WEBAPP_ROOT: &str = "tomcat/webapps/ROOT";
/// Descriptor path relative to an application root
pub const DESCRIPTOR: &str = "WEB-INF/web.xml";
/// Library directory relative to an application root
pub const LIB_DIR: &str = "WEB-INF/lib";
/// Container log directory inside the staged directory
pub const LOGS_DIR: &str = "logs";

/// Result of staging one application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedApp {
    pub root: PathBuf,
    pub descriptor: PathBuf,
    pub script: PathBuf,
    /// Reconfiguration rules that changed the descriptor
    pub changed: Vec<&'static str>,
}

/// Stages applications with one configuration
pub struct Stager {
    config: StagingConfig,
    engine: Reconfigurator,
}

impl Stager {
    pub fn new(config: StagingConfig) -> Self {
        let engine = Reconfigurator::new(config.policy.clone());
        Stager { config, engine }
    }

    pub fn config(&self) -> &StagingConfig {
        &self.config
    }

    /// Stage the application in `app_dir` into `staged_dir`
    pub fn stage(&self, app_dir: &Path, staged_dir: &Path) -> Result<StagedApp, StageError> {
        self.config.validate()?;

        let source_descriptor = app_dir.join(DESCRIPTOR);
        if !source_descriptor.is_file() {
            return Err(StageError::MissingDescriptor(source_descriptor));
        }
        let jar = &self.config.autoreconfig_jar;
        if !jar.is_file() {
            return Err(StageError::MissingLibrary(jar.clone()));
        }
        let jar_name = jar
            .file_name()
            .ok_or_else(|| StageError::Config(format!("{} has no file name", jar.display())))?;

        let mut guard = CleanupGuard::new(staged_dir);
        let webapp_root = staged_dir.join(WEBAPP_ROOT);
        guard.track(&webapp_root);
        copy_tree(app_dir, &webapp_root)?;

        let descriptor = webapp_root.join(DESCRIPTOR);
        let changed = self.reconfigure_file(&descriptor)?;

        let lib_dir = webapp_root.join(LIB_DIR);
        fs::create_dir_all(&lib_dir).map_err(|e| StageError::io(&lib_dir, e))?;
        let staged_jar = lib_dir.join(jar_name);
        fs::copy(jar, &staged_jar).map_err(|e| StageError::io(&staged_jar, e))?;

        let logs = staged_dir.join(LOGS_DIR);
        guard.track(&logs);
        fs::create_dir_all(&logs).map_err(|e| StageError::io(&logs, e))?;

        guard.track(&staged_dir.join(script::SCRIPT_NAME));
        let script = script::write(staged_dir, self.config.memory_mb)?;

        guard.disarm();
        info!(
            app = %app_dir.display(),
            staged = %staged_dir.display(),
            memory_mb = self.config.memory_mb,
            rules = ?changed,
            "staged application"
        );

        Ok(StagedApp {
            root: staged_dir.to_path_buf(),
            descriptor,
            script,
            changed,
        })
    }

    /// Stage several applications in parallel; see [`parallel::stage_all`]
    pub fn stage_all(&self, jobs: &[(PathBuf, PathBuf)]) -> Vec<Result<StagedApp, StageError>> {
        parallel::stage_all(self, jobs)
    }

    /// Reconfigure a descriptor file in place
    pub fn reconfigure_file(&self, path: &Path) -> Result<Vec<&'static str>, StageError> {
        let mut doc = load_descriptor(path)?;
        let report = self.engine.reconfigure(&mut doc)?;
        if report.is_unchanged() {
            debug!(path = %path.display(), "descriptor already reconfigured");
            return Ok(report.changed);
        }
        fs::write(path, doc.to_xml()).map_err(|e| StageError::io(path, e))?;
        Ok(report.changed)
    }

    /// Reconfigure descriptor text, returning the rewritten text
    pub fn reconfigure_str(&self, xml: &str, path: &Path) -> Result<String, StageError> {
        let mut doc = parse_descriptor(xml.as_bytes(), path)?;
        self.engine.reconfigure(&mut doc)?;
        Ok(doc.to_xml())
    }
}

/// Read and parse a descriptor, requiring a `web-app` root element
pub fn load_descriptor(path: &Path) -> Result<Document, StageError> {
    let bytes = fs::read(path).map_err(|e| StageError::io(path, e))?;
    parse_descriptor(&bytes, path)
}

fn parse_descriptor(bytes: &[u8], path: &Path) -> Result<Document, StageError> {
    let doc = Document::parse(bytes).map_err(|source| StageError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let root_name = doc.root_element_id().map(|root| doc.local_name(root)).unwrap_or("");
    if root_name != "web-app" {
        return Err(StageError::NotAWebApp(root_name.to_string()));
    }
    Ok(doc)
}

/// Recursively copy `from` into `to`, creating directories as needed
fn copy_tree(from: &Path, to: &Path) -> Result<(), StageError> {
    for entry in WalkDir::new(from).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            StageError::io(path, e.into())
        })?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| StageError::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| StageError::io(&target, e))?;
        }
    }
    Ok(())
}

/// Removes what a staging run created unless the run completes
struct CleanupGuard {
    staged_dir: PathBuf,
    /// The staged directory itself did not exist before the run
    owns_root: bool,
    created: Vec<PathBuf>,
    armed: bool,
}

impl CleanupGuard {
    fn new(staged_dir: &Path) -> Self {
        CleanupGuard {
            staged_dir: staged_dir.to_path_buf(),
            owns_root: !staged_dir.exists(),
            created: Vec::new(),
            armed: true,
        }
    }

    /// Remember a path the run is about to create, if it does not exist yet
    fn track(&mut self, path: &Path) {
        if !path.exists() {
            self.created.push(path.to_path_buf());
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let targets = if self.owns_root {
            vec![self.staged_dir.clone()]
        } else {
            std::mem::take(&mut self.created)
        };

        for path in targets.iter().rev() {
            let result = if path.is_dir() {
                fs::remove_dir_all(path)
            } else if path.exists() {
                fs::remove_file(path)
            } else {
                Ok(())
            };
            if let Err(e) = result {
                warn!(path = %path.display(), error = %e, "failed to clean up after staging failure");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEB_XML: &str = "<?xml version=\"1.0\"?>\n<web-app>\n  <display-name>app</display-name>\n</web-app>\n";

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn fixture(web_xml: &str) -> (tempfile::TempDir, PathBuf, StagingConfig) {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app");
        write(&app.join(DESCRIPTOR), web_xml);
        write(&app.join("index.jsp"), "<html/>");
        let jar = dir.path().join("auto-reconfiguration-0.6.5.jar");
        write(&jar, "PK");
        let config = StagingConfig::default().with_autoreconfig_jar(&jar);
        (dir, app, config)
    }

    #[test]
    fn test_stage_layout() {
        let (dir, app, config) = fixture(WEB_XML);
        let out = dir.path().join("out");
        let staged = Stager::new(config).stage(&app, &out).unwrap();

        assert_eq!(staged.descriptor, out.join(WEBAPP_ROOT).join(DESCRIPTOR));
        assert!(out.join(WEBAPP_ROOT).join("index.jsp").is_file());
        assert!(out.join(WEBAPP_ROOT).join(LIB_DIR).join("auto-reconfiguration-0.6.5.jar").is_file());
        assert!(out.join(LOGS_DIR).is_dir());
        assert_eq!(staged.script, out.join("startup"));
        assert_eq!(staged.changed.len(), 2);
    }

    #[test]
    fn test_not_a_web_app_cleans_up() {
        let (dir, app, config) = fixture("<beans/>");
        let out = dir.path().join("out");
        let err = Stager::new(config).stage(&app, &out).unwrap_err();
        assert!(matches!(err, StageError::NotAWebApp(ref name) if name == "beans"));
        assert!(!out.exists());
    }

    #[test]
    fn test_parse_error_keeps_existing_dir() {
        let (dir, app, config) = fixture("<web-app><servlet></web-app>");
        let out = dir.path().join("out");
        write(&out.join("tomcat/bin/catalina.sh"), "#!/bin/sh");

        let err = Stager::new(config).stage(&app, &out).unwrap_err();
        assert!(matches!(err, StageError::Parse { .. }));
        assert!(out.join("tomcat/bin/catalina.sh").is_file());
        assert!(!out.join(WEBAPP_ROOT).exists());
    }

    #[test]
    fn test_missing_library() {
        let (dir, app, config) = fixture(WEB_XML);
        let config = config.with_autoreconfig_jar(dir.path().join("missing.jar"));
        let err = Stager::new(config).stage(&app, &dir.path().join("out")).unwrap_err();
        assert!(matches!(err, StageError::MissingLibrary(_)));
    }

    #[test]
    fn test_declared_entities_survive_reconfiguration() {
        let stager = Stager::new(StagingConfig::default());
        let xml = "<!DOCTYPE web-app [<!ENTITY app \"demo\"><!ENTITY base \"/WEB-INF\">]>\n<web-app>\n  <display-name>&app;</display-name>\n  <context-param>\n    <param-name>contextConfigLocation</param-name>\n    <param-value>&base;/app.xml</param-value>\n  </context-param>\n</web-app>\n";
        let out = stager.reconfigure_str(xml, Path::new("web.xml")).unwrap();

        assert!(out.starts_with("<!DOCTYPE web-app [<!ENTITY app \"demo\"><!ENTITY base \"/WEB-INF\">]>\n<web-app>\n  <display-name>&app;</display-name>"));
        let resource = &stager.config().policy.autoconfig_resource;
        assert!(out.contains(&format!("<param-value>&base;/app.xml {}</param-value>", resource)));
        assert!(!out.contains("&amp;"));
    }

    #[test]
    fn test_stage_latin1_descriptor() {
        let (dir, app, config) = fixture(WEB_XML);
        fs::write(
            app.join(DESCRIPTOR),
            b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<web-app>\n  <display-name>caf\xE9</display-name>\n</web-app>\n",
        )
        .unwrap();
        let out = dir.path().join("out");
        let staged = Stager::new(config).stage(&app, &out).unwrap();

        let written = fs::read_to_string(&staged.descriptor).unwrap();
        assert!(written.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<web-app>\n  <display-name>caf\u{e9}</display-name>"));
        assert_eq!(staged.changed.len(), 2);
    }

    #[test]
    fn test_reconfigure_str() {
        let stager = Stager::new(StagingConfig::default());
        let out = stager.reconfigure_str(WEB_XML, Path::new("web.xml")).unwrap();
        assert!(out.contains("<param-name>contextInitializerClasses</param-name>"));
        assert!(matches!(
            stager.reconfigure_str("<beans/>", Path::new("web.xml")),
            Err(StageError::NotAWebApp(_))
        ));
    }
}
