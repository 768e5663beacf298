use std::process::{Command, Stdio};

use color_eyre::eyre::{Context, Result, eyre};

use crate::ports::browser::Browser;

/// Opens URLs with the platform's default handler.
pub struct SystemBrowser;

/// Program and leading arguments used to open a URL on this platform.
fn launcher() -> (&'static str, &'static [&'static str]) {
    if cfg!(target_os = "windows") {
        ("cmd", &["/C", "start", ""])
    } else if cfg!(target_os = "macos") {
        ("open", &[])
    } else {
        ("xdg-open", &[])
    }
}

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        let (program, args) = launcher();
        if which::which(program).is_err() {
            return Err(eyre!(
                "{} not found in PATH, open {} manually",
                program,
                url
            ));
        }

        Command::new(program)
            .args(args)
            .arg(url)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .wrap_err_with(|| format!("Failed to launch {}", program))?;
        Ok(())
    }
}
