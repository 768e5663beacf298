use color_eyre::eyre::Result;

/// Opens URLs for the user. Implemented by `services::browser::SystemBrowser`.
#[cfg_attr(test, mockall::automock)]
pub trait Browser: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}
