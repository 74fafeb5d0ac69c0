use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::types::Email;

/// Reads the email corpus: a single JSON array of email records.
pub async fn load_emails(path: &Path) -> Result<Vec<Email>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::NotFound(format!("email corpus {}", path.display())));
        }
        Err(e) => return Err(e.into()),
    };
    let emails: Vec<Email> = serde_json::from_slice(&bytes)?;
    info!(path = %path.display(), count = emails.len(), "loaded emails");
    Ok(emails)
}
