// ============================================================
// Layer 4 — Stroke File Loader
// ============================================================
// Reads a handwriting corpus from a data directory:
//
//   data/
//     strokes.json    ← [[ [pen_up, dx, dy], ... ], ...]
//     sentences.txt   ← one transcription per line (optional)
//
// Line i of sentences.txt is the text written by sample i of
// strokes.json, so the two files must have the same count
// whenever text is requested.
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::stroke::{Handwriting, StrokePoint};
use crate::domain::traits::HandwritingSource;

pub const STROKES_FILE:   &str = "strokes.json";
pub const SENTENCES_FILE: &str = "sentences.txt";

/// Loads stroke samples (and optionally their transcriptions)
/// from a directory. Implements HandwritingSource from Layer 3.
pub struct StrokeFileLoader {
    dir:      PathBuf,
    text_req: bool,
}

impl StrokeFileLoader {
    /// `text_req` controls whether sentences.txt is read and paired
    pub fn new(dir: impl Into<PathBuf>, text_req: bool) -> Self {
        Self { dir: dir.into(), text_req }
    }

    fn read_strokes(&self) -> Result<Vec<Vec<StrokePoint>>> {
        let path = self.dir.join(STROKES_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read strokes from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("'{}' is not a list of [pen_up, dx, dy] sequences", path.display()))
    }

    fn read_sentences(&self) -> Result<Vec<String>> {
        let path = self.dir.join(SENTENCES_FILE);
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read transcriptions from '{}'", path.display()))?;
        Ok(raw.lines().map(clean_transcription).collect())
    }
}

impl HandwritingSource for StrokeFileLoader {
    fn load_all(&self) -> Result<Vec<Handwriting>> {
        if !Path::new(&self.dir).is_dir() {
            bail!("Data directory '{}' does not exist", self.dir.display());
        }

        let strokes = self.read_strokes()?;
        tracing::debug!("Read {} stroke sequences", strokes.len());

        let samples: Vec<Handwriting> = if self.text_req {
            let sentences = self.read_sentences()?;
            if sentences.len() != strokes.len() {
                bail!(
                    "{} has {} lines but {} has {} samples",
                    SENTENCES_FILE, sentences.len(), STROKES_FILE, strokes.len()
                );
            }
            strokes
                .into_iter()
                .zip(sentences)
                .map(|(points, text)| Handwriting::new(points, Some(text)))
                .collect()
        } else {
            strokes
                .into_iter()
                .map(|points| Handwriting::new(points, None))
                .collect()
        };

        tracing::info!(
            "Loaded {} handwriting samples from '{}'",
            samples.len(),
            self.dir.display()
        );
        Ok(samples)
    }
}

/// Trim line endings and collapse runs of whitespace to one space.
fn clean_transcription(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_corpus(dir: &Path, strokes: &str, sentences: Option<&str>) {
        fs::write(dir.join(STROKES_FILE), strokes).unwrap();
        if let Some(s) = sentences {
            fs::write(dir.join(SENTENCES_FILE), s).unwrap();
        }
    }

    #[test]
    fn test_loads_strokes_without_text() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), "[[[0,1,2],[1,3,4]],[[0,0,0]]]", None);

        let samples = StrokeFileLoader::new(dir.path(), false).load_all().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].points[1], StrokePoint::new(1.0, 3.0, 4.0));
        assert!(samples[0].text.is_none());
    }

    #[test]
    fn test_pairs_sentences_with_strokes() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), "[[[0,1,2]],[[1,0,0]]]", Some("hello  world\r\nbye\n"));

        let samples = StrokeFileLoader::new(dir.path(), true).load_all().unwrap();
        assert_eq!(samples[0].text.as_deref(), Some("hello world"));
        assert_eq!(samples[1].text.as_deref(), Some("bye"));
    }

    #[test]
    fn test_sentence_count_mismatch_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), "[[[0,1,2]],[[1,0,0]]]", Some("only one\n"));

        assert!(StrokeFileLoader::new(dir.path(), true).load_all().is_err());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let loader = StrokeFileLoader::new("/definitely/not/a/real/dir", false);
        assert!(loader.load_all().is_err());
    }
}
