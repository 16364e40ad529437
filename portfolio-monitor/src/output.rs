use crate::types::{DigestReport, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Write the rendered digest (and optionally the report as JSON) into `dir`,
/// named after the report's generation time. Returns the written paths.
pub async fn save_digest(
    dir: &Path,
    report: &DigestReport,
    rendered: &str,
    write_json: bool,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;

    let stem = format!("digest_{}", report.generated_at.format("%Y%m%d_%H%M%S"));
    let mut written = Vec::new();

    let text_path = dir.join(format!("{}.txt", stem));
    tokio::fs::write(&text_path, rendered).await?;
    info!("Digest saved to: {}", text_path.display());
    written.push(text_path);

    if write_json {
        let json_path = dir.join(format!("{}.json", stem));
        let json = serde_json::to_string_pretty(report)?;
        tokio::fs::write(&json_path, json).await?;
        info!("Digest JSON saved to: {}", json_path.display());
        written.push(json_path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::DigestCompiler;

    #[tokio::test]
    async fn writes_text_and_json() {
        let dir = std::env::temp_dir().join(format!("portfolio-monitor-{}", uuid::Uuid::new_v4()));
        let report = DigestCompiler::new().compile(7, Vec::new());

        let written = save_digest(&dir, &report, "body", true).await.unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(tokio::fs::read_to_string(&written[0]).await.unwrap(), "body");

        let json = tokio::fs::read_to_string(&written[1]).await.unwrap();
        let parsed: DigestReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.run_id, report.run_id);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
