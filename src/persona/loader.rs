//! 个人资料加载
//!
//! 启动时从 persona 目录读取一次：summary（纯文本）与 profile（PDF 或纯文本）。
//! 任一文件缺失都是启动期致命错误。

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersonaError {
    #[error("Persona file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to extract text from {path}: {message}")]
    Extract { path: PathBuf, message: String },
}

/// 进程内只读的个人资料快照
#[derive(Clone, Debug)]
pub struct PersonaKnowledgeBase {
    pub name: String,
    pub summary: String,
    pub profile: String,
}

impl PersonaKnowledgeBase {
    pub fn new(
        name: impl Into<String>,
        summary: impl Into<String>,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            summary: summary.into(),
            profile: profile.into(),
        }
    }

    /// 从目录加载：`dir/summary_file` 与 `dir/profile_file`
    pub fn load(
        name: &str,
        dir: &Path,
        summary_file: &str,
        profile_file: &str,
    ) -> Result<Self, PersonaError> {
        let summary = read_text(&dir.join(summary_file))?;
        let profile = read_profile(&dir.join(profile_file))?;
        tracing::info!(
            name,
            summary_chars = summary.chars().count(),
            profile_chars = profile.chars().count(),
            "Persona loaded"
        );
        Ok(Self::new(name, summary, profile))
    }
}

fn read_text(path: &Path) -> Result<String, PersonaError> {
    if !path.exists() {
        return Err(PersonaError::NotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| PersonaError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn read_profile(path: &Path) -> Result<String, PersonaError> {
    if !is_pdf(path) {
        return read_text(path);
    }
    if !path.exists() {
        return Err(PersonaError::NotFound(path.to_path_buf()));
    }
    extract_pdf(path)
}

#[cfg(feature = "pdf")]
fn extract_pdf(path: &Path) -> Result<String, PersonaError> {
    pdf_extract::extract_text(path).map_err(|e| PersonaError::Extract {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(path: &Path) -> Result<String, PersonaError> {
    Err(PersonaError::Extract {
        path: path.to_path_buf(),
        message: "built without the `pdf` feature; provide a text profile instead".to_string(),
    })
}
