//! Best-effort termination of stale app processes

use serde::Serialize;
use tracing::{debug, info};

use crate::runner::{CommandRunner, Invocation};

/// What happened when asking the OS to kill one image name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Termination {
    pub image: String,
    pub terminated: bool,
}

/// Build the platform kill command for an image name such as `electron.exe`.
///
/// Windows gets `taskkill /F /IM <image> /T`; everywhere else the `.exe`
/// suffix is dropped and `pkill -x` is used.
pub fn kill_invocation(image: &str) -> Invocation {
    if cfg!(windows) {
        Invocation::program("taskkill", ["/F", "/IM", image, "/T"])
    } else {
        Invocation::program("pkill", ["-x", process_stem(image)])
    }
}

fn process_stem(image: &str) -> &str {
    let len = image.len();
    if len > 4 && image.is_char_boundary(len - 4) && image[len - 4..].eq_ignore_ascii_case(".exe") {
        &image[..len - 4]
    } else {
        image
    }
}

/// Kill every listed image. A process that is not running is not an error.
pub fn terminate_stale(runner: &dyn CommandRunner, images: &[String]) -> Vec<Termination> {
    images
        .iter()
        .map(|image| {
            let outcome = runner.run(&kill_invocation(image), None);
            if outcome.success {
                info!(image = %image, "terminated stale process");
            } else {
                debug!(image = %image, "no stale process to terminate");
            }
            Termination {
                image: image.clone(),
                terminated: outcome.success,
            }
        })
        .collect()
}
