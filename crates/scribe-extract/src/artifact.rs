//! Output files, one per harvested item.

use crate::error::Result;
use crate::strategy::{Artifact, Method};
use scribe_core::{sanitize_filename, Item};
use std::path::PathBuf;

/// Characters of the id kept in file names.
const ID_PREFIX_LEN: usize = 15;
const RULE_WIDTH: usize = 60;

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
    filename_max_len: usize,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>, filename_max_len: usize) -> Self {
        Self {
            output_dir: output_dir.into(),
            filename_max_len,
        }
    }

    /// `{sanitized title}_{id prefix}.{ext}` inside the output directory.
    pub fn path_for(&self, item: &Item, extension: &str) -> PathBuf {
        let mut title = sanitize_filename(&item.title, self.filename_max_len);
        if title.is_empty() {
            title = "untitled".to_string();
        }
        self.output_dir.join(format!(
            "{}_{}.{}",
            title,
            item.id.prefix(ID_PREFIX_LEN),
            extension
        ))
    }

    /// Write the artifact and return its path and size in bytes.
    pub async fn write(
        &self,
        item: &Item,
        method: Method,
        artifact: &Artifact,
    ) -> Result<(PathBuf, u64)> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.path_for(item, artifact.extension());

        match artifact {
            Artifact::Text(text) => {
                let contents = format!("{}{}", header(item, method), text);
                tokio::fs::write(&path, contents).await?;
            }
            Artifact::Download(bytes) | Artifact::Image(bytes) => {
                tokio::fs::write(&path, bytes).await?;
            }
        }

        let size = tokio::fs::metadata(&path).await?.len();
        tracing::info!("[{}] Saved {} ({} bytes)", method, path.display(), size);
        Ok((path, size))
    }
}

fn header(item: &Item, method: Method) -> String {
    format!(
        "Title: {}\nURL: {}\nDownloaded: {}\nMethod: {}\n{}\n\n",
        item.title,
        item.url,
        chrono::Utc::now().to_rfc3339(),
        method,
        "=".repeat(RULE_WIDTH)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core::ItemId;
    use tempfile::TempDir;

    fn item(title: &str) -> Item {
        Item::new(
            ItemId::new("Xk3jdP9qLm2AbCdEfGh").unwrap(),
            title,
            "https://otter.ai/u/Xk3jdP9qLm2AbCdEfGh",
        )
    }

    #[test]
    fn test_path_uses_sanitized_title_and_id_prefix() {
        let writer = ArtifactWriter::new("/out", 80);
        assert_eq!(
            writer.path_for(&item("Q3 review: budget?"), "txt"),
            PathBuf::from("/out/Q3_review_budget_Xk3jdP9qLm2AbCd.txt")
        );
        assert_eq!(
            writer.path_for(&item("???"), "png"),
            PathBuf::from("/out/untitled_Xk3jdP9qLm2AbCd.png")
        );
    }

    #[tokio::test]
    async fn test_text_artifacts_carry_a_header() {
        let tmp = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(tmp.path().join("downloads"), 80);
        let item = item("Weekly sync");

        let (path, size) = writer
            .write(&item, Method::DirectText, &Artifact::Text("Alice: hi".into()))
            .await
            .unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines[0], "Title: Weekly sync");
        assert_eq!(lines[1], "URL: https://otter.ai/u/Xk3jdP9qLm2AbCdEfGh");
        assert!(lines[2].starts_with("Downloaded: "));
        assert_eq!(lines[3], "Method: direct_text");
        assert_eq!(lines[4], "=".repeat(60));
        assert_eq!(lines[5], "");
        assert_eq!(lines[6], "Alice: hi");
        assert_eq!(size, contents.len() as u64);
    }

    #[tokio::test]
    async fn test_binary_artifacts_are_written_verbatim() {
        let tmp = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(tmp.path(), 80);

        let (path, size) = writer
            .write(&item("Shot"), Method::Screenshot, &Artifact::Image(vec![1, 2, 3]))
            .await
            .unwrap();
        assert_eq!(path.extension().unwrap(), "png");
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert_eq!(size, 3);
    }
}
