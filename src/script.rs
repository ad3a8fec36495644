//! Startup script generation.
//!
//! The staged application is launched by a bash script that sizes the JVM
//! heap, asks the platform helpers for the environment and server.xml, then
//! runs Tomcat in the background and waits on it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StageError;

/// Heap size used when the staging configuration sets none
pub const DEFAULT_MEMORY_MB: u32 = 512;

/// File name of the script in the staged root
pub const SCRIPT_NAME: &str = "startup";

const SCRIPT_BODY: &str = r#"export CATALINA_OPTS="$CATALINA_OPTS `ruby resources/set_environment`"
env > env.log
PORT=-1
while getopts ":p:" opt; do
  case $opt in
    p)
      PORT=$OPTARG
      ;;
  esac
done
if [ $PORT -lt 0 ] ; then
  echo "Missing or invalid port (-p)"
  exit 1
fi
ruby resources/generate_server_xml $PORT
cd tomcat
./bin/catalina.sh run > ../logs/stdout.log 2> ../logs/stderr.log &
STARTED=$!
echo "$STARTED" >> ../run.pid
wait $STARTED
"#;

/// Render the startup script for a heap of `memory_mb` megabytes
pub fn render(memory_mb: u32) -> String {
    format!(
        "#!/bin/bash\nexport CATALINA_OPTS=\"-Xms{m}m -Xmx{m}m\"\n{body}",
        m = memory_mb,
        body = SCRIPT_BODY
    )
}

/// Write the script into `staged_root` and mark it executable
pub fn write(staged_root: &Path, memory_mb: u32) -> Result<PathBuf, StageError> {
    let path = staged_root.join(SCRIPT_NAME);
    fs::write(&path, render(memory_mb)).map_err(|e| StageError::io(&path, e))?;
    set_executable(&path)?;
    Ok(path)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), StageError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|e| StageError::io(path, e))
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<(), StageError> {
    Ok(())
}
